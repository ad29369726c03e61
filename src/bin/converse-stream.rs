use std::process;

use bedrock_samples::LONG_VERSION;
use bedrock_samples::commands::{InvocationArgs, converse};
use bedrock_samples::logging;
use clap::Parser;

#[derive(Debug, Parser)]
#[command(
    name = "converse-stream",
    about = "Stream a one-turn conversation and print tokens as they arrive",
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

    if let Err(err) = converse::run(cli.invocation).await {
        err.report();
        process::exit(1);
    }
}
