use std::env::var;
use std::io::stderr;
use std::process::ExitCode;

use clap::Parser;
use eyre::Result as EyreResult;
use tracing_subscriber::fmt::layer;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{registry, EnvFilter};
use xpr_rotate_key::cli::RootCommand;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    if let Err(err) = setup() {
        eprintln!("Failed to initialize: {err}");
        return ExitCode::FAILURE;
    }

    let command = match RootCommand::try_parse() {
        Ok(command) => command,
        Err(err) => {
            // Usage errors exit with 1, help and version with 0.
            let _ = err.print();
            return if err.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    command.run().await
}

fn setup() -> EyreResult<()> {
    let directives = match var("RUST_LOG") {
        Ok(value) if !value.trim().is_empty() => value,
        _ => "xpr_rotate_key=warn".to_owned(),
    };

    registry()
        .with(EnvFilter::builder().parse(directives)?)
        .with(layer().with_writer(stderr))
        .init();

    color_eyre::install()?;

    Ok(())
}
