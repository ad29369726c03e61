use std::process;

use bedrock_samples::LONG_VERSION;
use bedrock_samples::commands::{InvocationArgs, invoke};
use bedrock_samples::logging;
use clap::Parser;

#[derive(Debug, Parser)]
#[command(
    name = "invoke-model",
    about = "Send a raw templated prompt and print the decoded response",
    version = LONG_VERSION
)]
struct Cli {
    #[command(flatten)]
    invocation: InvocationArgs,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init(cli.invocation.verbosity());

    if let Err(err) = invoke::run(cli.invocation).await {
        err.report();
        process::exit(1);
    }
}
