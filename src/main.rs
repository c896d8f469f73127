use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use xconv::core::config::AppConfig;
use xconv::core::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl From<Commands> for xconv::AppCommand {
    fn from(cmd: Commands) -> xconv::AppCommand {
        match cmd {
            Commands::Serve => xconv::AppCommand::Serve,
            Commands::Convert { from, to, amount } => xconv::AppCommand::Convert {
                from,
                targets: to,
                amount,
            },
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Run the HTTP API
    Serve,
    /// Convert an amount into one or more currencies
    Convert {
        /// Source currency code, e.g. USD
        from: String,
        /// Target currency codes
        #[arg(required = true)]
        to: Vec<String>,
        /// Amount of the source currency
        #[arg(short, long, default_value_t = 1.0)]
        amount: f64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let result = match cli.command {
        Some(Commands::Setup) => {
            init_logging(cli.verbose, &Default::default())?;
            xconv::cli::setup::setup()
        }
        Some(cmd) => match AppConfig::load(cli.config_path.as_deref()) {
            Ok((config, sources)) => {
                init_logging(cli.verbose, &config.logging)?;
                sources.log();
                xconv::run_command(cmd.into(), &config).await
            }
            Err(e) => {
                init_logging(cli.verbose, &Default::default())?;
                Err(e)
            }
        },
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
