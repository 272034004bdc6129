//! Target address type.

use std::fmt;
use std::ops::Add;

/// Address in the inspected process
///
/// Values that live in target memory carry one of these. Keeping addresses
/// out of plain `u64` stops sizes, counts and element indexes from being
/// mixed up with locations during field and element arithmetic.
///
/// ## Display
///
/// Addresses print the way debuggers show pointer values: lowercase hex
/// with a `0x` prefix and no padding.
///
/// ```rust
/// use ferros_inspect::types::Address;
///
/// let addr = Address::from(0x1000);
/// assert_eq!(addr.to_string(), "0x1000");
/// assert_eq!((addr + 0x10).value(), 0x1010);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Address(u64);

impl Address
{
    /// The null address
    pub const NULL: Self = Address(0);

    /// Create a new address, usable in const contexts.
    pub const fn new(value: u64) -> Self
    {
        Address(value)
    }

    /// Raw `u64` value of this address.
    pub const fn value(self) -> u64
    {
        self.0
    }

    /// Whether this is the null address.
    pub const fn is_null(self) -> bool
    {
        self.0 == 0
    }

    /// Move by a signed byte offset, checking for wrap-around.
    ///
    /// Element arithmetic uses signed offsets because arrays may have a
    /// non-zero (even negative) lower bound.
    ///
    /// ```rust
    /// use ferros_inspect::types::Address;
    ///
    /// let addr = Address::from(0x1000);
    /// assert_eq!(addr.checked_offset(-0x10), Some(Address::from(0xff0)));
    /// assert_eq!(Address::NULL.checked_offset(-1), None);
    /// ```
    pub fn checked_offset(self, offset: i64) -> Option<Self>
    {
        self.0.checked_add_signed(offset).map(Address)
    }
}

impl From<u64> for Address
{
    fn from(value: u64) -> Self
    {
        Address(value)
    }
}

impl From<Address> for u64
{
    fn from(address: Address) -> Self
    {
        address.0
    }
}

impl fmt::Display for Address
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "0x{:x}", self.0)
    }
}

impl Add<u64> for Address
{
    type Output = Address;

    fn add(self, rhs: u64) -> Self::Output
    {
        Address(self.0.wrapping_add(rhs))
    }
}
