//! # jstp-cli
//!
//! An interactive command-line client for JSTP servers: dials a server,
//! authenticates via a configurable connect policy, and drops into a REPL
//! for calling methods, inspecting interfaces, and pinging the connection.

pub mod cli;
pub mod config;
pub mod error;
pub mod repl;

use clap::Parser;

use crate::error::CliResult;

/// Parses arguments, loads config, and runs the REPL to completion.
pub async fn run() -> CliResult<()> {
    let args = cli::Cli::parse();
    let settings = config::CliConfig::load()?;

    jstp::init_tracing(args.log_filter.as_deref().unwrap_or(&settings.log_filter));

    let application = args.application.unwrap_or(settings.default_application);
    let policy = repl::build_policy(application, &args.strategy, args.username, args.password)?;

    let address = args.address.or(Some(settings.default_address));
    repl::Repl::new(policy)?.run(address).await
}
