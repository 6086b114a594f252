use clap::Parser;
use std::process;
use taskboard::TaskboardConfig;

mod cli;
mod commands;
mod logging;

use cli::Cli;

const EXIT_SUCCESS: i32 = 0;
const EXIT_ERROR: i32 = 1;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match TaskboardConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: failed to load configuration: {e}");
            process::exit(EXIT_ERROR);
        }
    };
    logging::configure_logging(
        cli.verbose,
        cli.debug,
        cli.quiet,
        config.log_filter.as_deref(),
    );

    let code = match commands::run(&cli, &config).await {
        Ok(value) => match serde_json::to_string_pretty(&value) {
            Ok(json) => {
                println!("{json}");
                EXIT_SUCCESS
            }
            Err(e) => {
                eprintln!("Error: {e}");
                EXIT_ERROR
            }
        },
        Err(e) => {
            tracing::debug!(error = ?e, "command failed");
            eprintln!("Error: {e:#}");
            EXIT_ERROR
        }
    };
    process::exit(code);
}
