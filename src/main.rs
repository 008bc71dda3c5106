use anyhow::Result;
use clap::Parser;
use pyreflect::cli::CliArgs;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = CliArgs::parse();
    pyreflect::run(args).await
}
