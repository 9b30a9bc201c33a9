//! # stockbook
//!
//! Terminal client for the stock ledger. Each invocation opens the store from
//! its snapshot slot, runs one command, prints the result on stdout and exits.
//! Errors are printed as `{"code": ..., "message": ...}` with exit status 1.

use clap::Parser;
use std::process::ExitCode;
use tracing::{error, info};

use stock_cli::cli::{self, Cli, Output};
use stock_cli::error::ApiError;
use stock_cli::state::ConfigState;
use stock_cli::{init_tracing, App};

#[tokio::main]
async fn main() -> ExitCode {
    let args = Cli::parse();
    init_tracing(args.verbose);

    match execute(args).await {
        Ok(output) => {
            match output {
                Output::Json(value) => match serde_json::to_string_pretty(&value) {
                    Ok(text) => println!("{}", text),
                    Err(e) => {
                        error!(error = %e, "Could not serialize output");
                        return ExitCode::FAILURE;
                    }
                },
                Output::Text(text) => println!("{}", text),
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            let body = serde_json::to_string_pretty(&err).unwrap_or_else(|_| err.to_string());
            eprintln!("{}", body);
            ExitCode::FAILURE
        }
    }
}

async fn execute(args: Cli) -> Result<Output, ApiError> {
    let mut config = ConfigState::from_env()?;
    if let Some(dir) = args.data_dir {
        config.data_dir = dir;
    }

    let app = App::start(config).await?;
    let result = cli::run(&app, args.command).await;

    app.shutdown().await;
    info!("Stockbook finished");
    result
}
