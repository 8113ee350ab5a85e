mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::process;
use std::sync::Once;

use commands::feasibility::ScenarioArgs;
use commands::state::ApplyArgs;
use output::OutputFormat;

/// Property development feasibility calculations
#[derive(Parser)]
#[command(
    name = "feaso",
    version,
    about = "Property development feasibility calculations",
    long_about = "Run a development feasibility over a scenario file: resolved costs, \
                  GST position, monthly cashflow, prioritised debt drawdown, project \
                  P&L with NPV/IRR, and the equity split. Money is in integer cents."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Log engine detail to stderr
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Full feasibility report (every view below in one document)
    Report(ScenarioArgs),
    /// Project P&L, funding position and return metrics
    Summary(ScenarioArgs),
    /// Monthly cashflow projection
    Cashflow(ScenarioArgs),
    /// Facility drawdown waterfall
    Drawdown(ScenarioArgs),
    /// Distribution of profit after tax to equity partners
    Equity(ScenarioArgs),
    /// GST collected, input credits and net position
    Gst(ScenarioArgs),
    /// Resolve every line item to its ex-GST amount
    Resolve(ScenarioArgs),
    /// Apply a list of edit actions to a scenario and print the result
    Apply(ApplyArgs),
    /// Print version information
    Version,
}

static TRACING_INIT: Once = Once::new();

/// Install the stderr subscriber. `RUST_LOG` wins over the defaults.
fn init_tracing(verbose: bool) {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, EnvFilter};

        let default = if verbose {
            "feasibility_core=debug"
        } else {
            "feasibility_core=warn"
        };
        let mut filter = EnvFilter::from_default_env();
        if let Ok(directive) = default.parse::<tracing_subscriber::filter::Directive>() {
            filter = filter.add_directive(directive);
        }

        fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
    });
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Report(args) => commands::feasibility::run_report(args),
        Commands::Summary(args) => commands::feasibility::run_summary(args),
        Commands::Cashflow(args) => commands::feasibility::run_cashflow(args),
        Commands::Drawdown(args) => commands::feasibility::run_drawdown(args),
        Commands::Equity(args) => commands::feasibility::run_equity(args),
        Commands::Gst(args) => commands::feasibility::run_gst(args),
        Commands::Resolve(args) => commands::feasibility::run_resolve(args),
        Commands::Apply(args) => commands::state::run_apply(args),
        Commands::Version => {
            println!("feaso {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
