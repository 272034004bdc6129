use std::collections::HashSet;
use std::process;

use clap::{Parser, Subcommand};
use ferros_inspect::group::GROUP_NAME_PREFIX;
use ferros_inspect::{Inferior, InspectResult, InspectorConfig, VarRecord, VariableRegistry};
use ferros_utils::{LogFormat, LogLevel, LoggingConfig, debug, info, init_logging};

mod demo;

/// Inspect the variables of a stopped program.
#[derive(Parser, Debug)]
#[command(name = "ferros")]
#[command(version)]
#[command(about = "Inspect the variables of a stopped program", long_about = None)]
struct Cli
{
    /// Log level (overrides RUST_LOG)
    #[arg(long, global = true)]
    log_level: Option<LogLevel>,
    /// Log format: pretty or json (overrides FERROS_LOG_FORMAT)
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,
    #[command(subcommand)]
    command: Commands,
}

/// How deep and how wide to expand variables.
#[derive(clap::Args, Debug, Clone, Copy)]
struct TreeOptions
{
    /// Levels of children to expand
    #[arg(short, long, default_value_t = 2)]
    depth: usize,
    /// Children requested per page
    #[arg(short, long, default_value_t = 4)]
    page_size: usize,
    /// Maximum children shown per variable
    #[arg(long, default_value_t = 16)]
    max_children: usize,
    /// Render with structural renderers only
    #[arg(long, default_value_t = false)]
    raw: bool,
}

#[derive(Subcommand, Debug)]
enum Commands
{
    /// List the names of the variables visible in the selected frame
    Scope
    {
        /// Hide variables declared after the current line
        #[arg(long, default_value_t = false)]
        filter: bool,
    },
    /// Show every variable of the selected frame as a tree
    Locals
    {
        /// Hide variables declared after the current line
        #[arg(long, default_value_t = false)]
        filter: bool,
        #[command(flatten)]
        tree: TreeOptions,
    },
    /// Evaluate expressions in the selected frame and show them as trees
    Eval
    {
        /// Expressions to evaluate
        #[arg(required = true)]
        expressions: Vec<String>,
        #[command(flatten)]
        tree: TreeOptions,
    },
}

fn main()
{
    let cli = Cli::parse();

    let mut logging = LoggingConfig::from_env();
    if let Some(level) = cli.log_level {
        logging = logging.with_level(level);
    }
    if let Some(format) = cli.log_format {
        logging = logging.with_format(format);
    }
    let _guard = match init_logging(&logging) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            process::exit(1);
        }
    };

    if let Err(e) = run_command(cli.command) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run_command(command: Commands) -> InspectResult<()>
{
    let inferior = demo::program();
    let config = InspectorConfig::from_env();
    debug!(?config, "Inspector configuration");
    let mut registry = VariableRegistry::with_renderers(demo::renderers(), config);

    match command {
        Commands::Scope { filter } => {
            let listing = registry.list_scope(&inferior, filter);
            for name in &listing.variables {
                println!("{name}");
            }
            if filter && !listing.filtered {
                println!("(some variables could not be filtered)");
            }
            Ok(())
        }
        Commands::Locals { filter, tree } => {
            let listing = registry.list_scope(&inferior, filter);
            info!(count = listing.variables.len(), "Listing locals");
            for name in &listing.variables {
                let root = registry.create(&inferior, name, tree.raw)?;
                print_tree(&mut registry, &inferior, &root, 0, tree)?;
            }
            Ok(())
        }
        Commands::Eval { expressions, tree } => {
            for expression in &expressions {
                match registry.create(&inferior, expression, tree.raw) {
                    Ok(root) => print_tree(&mut registry, &inferior, &root, 0, tree)?,
                    Err(e) => println!("{expression}: {e}"),
                }
            }
            Ok(())
        }
    }
}

fn print_tree(registry: &mut VariableRegistry, inferior: &dyn Inferior, var: &VarRecord, level: usize, tree: TreeOptions) -> InspectResult<()>
{
    println!("{}{}", "  ".repeat(level), describe(var));

    let expandable = var.has_more.unwrap_or(false) || var.child_count.unwrap_or(0) > 0;
    if !expandable || level >= tree.depth {
        return Ok(());
    }

    let page_size = tree.page_size.max(1);
    let mut shown = 0;
    loop {
        if shown >= tree.max_children {
            println!("{}...", "  ".repeat(level + 1));
            break;
        }
        let from = i64::try_from(shown).unwrap_or(i64::MAX);
        let to = i64::try_from(shown + page_size).unwrap_or(i64::MAX);
        let page = registry.list_children(inferior, var.id, from, to, &HashSet::new())?;
        if page.renderer_failed {
            println!("{}(renderer failed, showing raw members)", "  ".repeat(level + 1));
        }
        for child in &page.children {
            print_tree(registry, inferior, child, level + 1, tree)?;
        }
        shown += page.children.len();
        if !page.has_more || page.children.is_empty() {
            break;
        }
    }
    Ok(())
}

fn describe(var: &VarRecord) -> String
{
    let name = var.expression.strip_prefix(GROUP_NAME_PREFIX).unwrap_or(&var.expression);
    let mut line = match &var.value {
        Some(value) if !value.is_empty() => format!("{name} = {value}"),
        _ => name.to_string(),
    };
    if !var.type_name.starts_with('<') {
        line.push_str(&format!(" ({})", var.type_name));
    }
    if let Some(hint) = &var.display_hint {
        line.push_str(&format!(" [{hint}]"));
    }
    line
}
