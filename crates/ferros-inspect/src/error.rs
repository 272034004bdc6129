//! # Error Types
//!
//! Error handling for variable inspection.
//!
//! We use `thiserror` to generate the `Error` implementations and the
//! messages that end up in front of the user.

use thiserror::Error;

/// Main error type for inspection operations
///
/// ## Error Categories
///
/// 1. **Request errors**: OutOfRange, InvalidRange
/// 2. **Renderer errors**: Renderer (recovered by the raw-mode fallback)
/// 3. **Stale state**: StaleGroupValue (synthetic slot from a previous stop)
/// 4. **Target errors**: Evaluation, Memory, InvalidOperation, InvalidArgument, Frame
///
/// Request errors are reported to the caller as-is. Everything else raised
/// while rendering is considered local to one value and is recovered by
/// re-rendering that value with the structural renderers; see
/// [`InspectError::is_recoverable`]. A top-level expression that cannot be
/// evaluated fails before rendering starts and is never retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InspectError
{
    /// The expression could not be evaluated in the current context
    ///
    /// No handle is created when this happens.
    #[error("Cannot evaluate '{expression}': {message}")]
    Evaluation
    {
        /// Expression as typed by the user
        expression: String,
        /// Backend diagnostic
        message: String,
    },

    /// A handle id does not name a live variable
    ///
    /// This is also what callers see for ids issued before the last
    /// `clear_all()`.
    #[error("Var id is out of bounds: {id}")]
    OutOfRange
    {
        /// Requested id
        id: usize,
        /// Number of live handles
        len: usize,
    },

    /// A children window with `from > to`
    #[error("Wrong bounds: from={from}, to={to}")]
    InvalidRange
    {
        /// First requested index
        from: i64,
        /// One past the last requested index
        to: i64,
    },

    /// A specialized renderer failed while resolving, rendering or counting
    #[error("Renderer '{renderer}' failed: {message}")]
    Renderer
    {
        /// Name of the failing renderer
        renderer: String,
        /// What went wrong
        message: String,
    },

    /// A synthetic group value from a previous stop was dereferenced
    #[error("Group value slot is out of bounds: slot={slot}, upper_bound={bound}")]
    StaleGroupValue
    {
        /// Slot carried by the synthetic value
        slot: usize,
        /// Number of live slots
        bound: usize,
    },

    /// Target memory could not be read
    #[error("Cannot access memory at address 0x{address:x}")]
    Memory
    {
        /// First unreadable address
        address: u64,
        /// Requested length
        len: usize,
    },

    /// An operation that does not apply to the value's type
    ///
    /// Examples:
    /// - Dereferencing something that is not a pointer or reference
    /// - Indexing outside of an array's bounds
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Invalid argument passed to an inspection function
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The frame is gone or its scope cannot be read
    #[error("Frame error: {0}")]
    Frame(String),
}

impl InspectError
{
    /// Shorthand for renderer failures raised by renderer implementations.
    pub fn renderer(renderer: impl Into<String>, message: impl Into<String>) -> Self
    {
        Self::Renderer {
            renderer: renderer.into(),
            message: message.into(),
        }
    }

    /// Whether the raw-mode retry may recover from this error.
    ///
    /// Only a bad id or page window is final. Anything else raised while
    /// rendering, including a failed evaluation inside a renderer, is retried.
    #[must_use]
    pub fn is_recoverable(&self) -> bool
    {
        !matches!(self, Self::OutOfRange { .. } | Self::InvalidRange { .. })
    }
}

/// Convenience type alias for `Result<T, InspectError>`
///
/// ```rust
/// use ferros_inspect::error::InspectResult;
/// fn foo() -> InspectResult<()>
/// {
///     Ok(())
/// }
/// ```
pub type InspectResult<T> = std::result::Result<T, InspectError>;
