mod bbox;
mod cli;
mod credentials;
mod download;
mod error;
mod fetcher;
mod product;
mod request;
mod summary;

use std::process;

use anyhow::{Error, Result};
use chrono::Local;
use clap::Parser;
use cli::{command, Cli, Commands};
use summary::RunSummary;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Daily(args) => report(command::daily(args).await),
        Commands::Monthly(args) => report(command::monthly(args).await),
        Commands::Products {} => print!("{}", command::products(Local::now().date_naive())),
    }

    Ok(())
}

fn report(result: Result<RunSummary>) {
    match result {
        Ok(summary) => {
            println!("{}", summary);
            if !summary.is_complete() {
                process::exit(1);
            }
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(2);
        }
    }
}
