use std::io;
use std::process;

use bedrock_samples::LONG_VERSION;
use bedrock_samples::commands::config_check::{self, ConfigArgs};
use bedrock_samples::commands::endpoint::{self, EndpointArgs};
use bedrock_samples::commands::invoke_stream::{self, InvokeStreamArgs};
use bedrock_samples::commands::{InvocationArgs, converse, converse_tools, invoke};
use bedrock_samples::logging::{self, Verbosity};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, shells};

const ROOT_HELP_EXAMPLES: &str = "Examples:\n  bedrock-samples converse\n  bedrock-samples converse --model us.deepseek.r1-v1:0 \"Explain retries\"\n  bedrock-samples invoke --dry-run\n  bedrock-samples invoke-stream --top-k 40 \"Write a haiku\"\n  bedrock-samples converse-tools \"What is the weather in Paris?\"\n  bedrock-samples endpoint --endpoint-name my-endpoint \"Custom query text\"\n  bedrock-samples config check --profile dev\n  bedrock-samples completion bash > ~/.local/share/bash-completion/completions/bedrock-samples";

const CONVERSE_HELP_EXAMPLES: &str = "Examples:\n  bedrock-samples converse\n  bedrock-samples converse --region us-west-2 --max-tokens 256 \"Summarize TCP\"\n  bedrock-samples converse --dry-run \"Explain retries\"";

#[derive(Debug, Parser)]
#[command(
    name = "bedrock-samples",
    about = "Amazon Bedrock Runtime sample invocations",
    version = LONG_VERSION,
    after_help = ROOT_HELP_EXAMPLES
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(
        about = "Stream a one-turn conversation and print tokens as they arrive",
        after_help = CONVERSE_HELP_EXAMPLES
    )]
    Converse(InvocationArgs),
    #[command(about = "Send a raw templated prompt and print the decoded response")]
    Invoke(InvocationArgs),
    #[command(about = "Stream a model-native payload and print the text deltas")]
    InvokeStream(InvokeStreamArgs),
    #[command(about = "Send one turn with a weather tool and print the reply blocks")]
    ConverseTools(InvocationArgs),
    #[command(about = "Send text to a SageMaker endpoint (the first listed one by default)")]
    Endpoint(EndpointArgs),
    #[command(about = "Manage local config")]
    Config(ConfigArgs),
    #[command(about = "Generate shell completion script")]
    Completion {
        #[arg(value_enum)]
        shell: CompletionShell,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}

fn print_completion(shell: CompletionShell) {
    let mut cmd = Cli::command();
    let name = "bedrock-samples";
    match shell {
        CompletionShell::Bash => generate(shells::Bash, &mut cmd, name, &mut io::stdout()),
        CompletionShell::Zsh => generate(shells::Zsh, &mut cmd, name, &mut io::stdout()),
        CompletionShell::Fish => generate(shells::Fish, &mut cmd, name, &mut io::stdout()),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let verbosity = match &cli.command {
        Commands::Converse(args) | Commands::Invoke(args) | Commands::ConverseTools(args) => {
            args.verbosity()
        }
        Commands::InvokeStream(args) => args.invocation.verbosity(),
        Commands::Endpoint(args) => args.verbosity(),
        Commands::Config(_) | Commands::Completion { .. } => Verbosity::default(),
    };
    logging::init(verbosity);

    let result = match cli.command {
        Commands::Converse(args) => converse::run(args).await,
        Commands::Invoke(args) => invoke::run(args).await,
        Commands::InvokeStream(args) => invoke_stream::run(args).await,
        Commands::ConverseTools(args) => converse_tools::run(args).await,
        Commands::Endpoint(args) => endpoint::run(args).await,
        Commands::Config(args) => config_check::run(args),
        Commands::Completion { shell } => {
            print_completion(shell);
            Ok(())
        }
    };

    if let Err(err) = result {
        err.report();
        process::exit(1);
    }
}
