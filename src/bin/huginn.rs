//! huginn: review classifier CLI
//!
//! Terminal interface for huginnd.

use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use huginn::batch_input;
use huginn::client::ServiceClient;
use huginn::report::{self, BatchReport};

/// Huginn CLI client
#[derive(Parser)]
#[command(name = "huginn")]
#[command(version = huginn::PKG_VERSION)]
#[command(about = "Customer review classifier client")]
struct Args {
    /// Server address
    #[arg(
        short,
        long,
        env = "HUGINND_ADDRESS",
        default_value = huginn::client::DEFAULT_ADDRESS
    )]
    address: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check service health
    Health,

    /// Classify one review
    Classify {
        /// Review text (or omit to read from stdin)
        text: Option<String>,
    },

    /// Classify every review in a CSV file with a `review` or `text` column
    Batch {
        /// CSV file
        file: PathBuf,
        /// Record each result to the server's tracking sinks
        #[arg(long)]
        log: bool,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    // Initialise tracing (default: warn for CLI; override with RUST_LOG).
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let args = Args::parse();
    let client = ServiceClient::new(&args.address)?;

    match args.command {
        Command::Health => {
            let health = client.health().await?;
            println!("huginnd {} ({})", health.version, health.status);
            println!("model:      {}", health.model_id);
            println!("categories: {}", health.categories.join(", "));
        }

        Command::Classify { text } => {
            let text = resolve_text(text)?;
            let result = client.classify(&text).await?;
            print!("{}", report::render_scores(&result));
        }

        Command::Batch { file, log } => {
            // Column detection happens locally so a bad file never reaches the server.
            let outcome = match batch_input::read_reviews_from_path(&file) {
                Ok(reviews) => client
                    .classify_batch(&reviews, log)
                    .await
                    .map(|results| BatchReport::new(&reviews, &results)),
                Err(e) => Err(e),
            };

            match outcome {
                Ok(batch) => {
                    print!("{}", report::render_table(&batch));
                    println!();
                    print!("{}", report::render_distribution(&batch));
                }
                Err(e) => {
                    eprintln!("{}", report::render_batch_error(&e));
                    return Ok(ExitCode::FAILURE);
                }
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// Review text from the argument, else from piped stdin.
///
/// Piped input is taken verbatim apart from its final line ending, so an
/// empty pipe classifies the empty review.
fn resolve_text(arg: Option<String>) -> Result<String, Box<dyn std::error::Error>> {
    if let Some(text) = arg {
        return Ok(text);
    }

    if io::stdin().is_terminal() {
        return Err("classify: no input provided (pass text as argument or via stdin)".into());
    }

    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(strip_line_ending(&buf).to_string())
}

fn strip_line_ending(text: &str) -> &str {
    text.strip_suffix('\n')
        .map(|rest| rest.strip_suffix('\r').unwrap_or(rest))
        .unwrap_or(text)
}
