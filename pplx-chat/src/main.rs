mod settings;

use clap::{Parser, Subcommand};
use pplx::prelude::*;
use serde_json::Value;
use settings::{into_map, parse_setting};
use std::io::{self, BufRead, Write};
use tracing::{error, info};

const PROMPT: &str = "Enter a message. Enter 'exit' to quit: ";

#[derive(Parser)]
#[command(name = "pplx-chat")]
#[command(about = "A CLI for chatting with the Perplexity API")]
struct Cli {
    /// Model to use (defaults to PPLX_MODEL or "sonar")
    #[arg(short, long, global = true)]
    model: Option<String>,
    /// System role prepended to every conversation
    #[arg(short, long, global = true)]
    system_role: Option<String>,
    /// Request option as key=value, repeatable (e.g. --set temperature=0.5)
    #[arg(long = "set", value_parser = parse_setting, global = true)]
    settings: Vec<(String, Value)>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Have a conversation; each answer is kept in the history
    Chat,
    /// Ask a single question without history
    Ask {
        /// The question
        message: String,
        /// What to print: raw, text, json or llm_response
        #[arg(short, long, default_value = "llm_response")]
        format: String,
    },
    /// Print the effective request configuration as JSON
    Config,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = into_map(cli.settings);

    match cli.command.unwrap_or(Commands::Chat) {
        Commands::Config => print_config(&settings)?,
        Commands::Ask { message, format } => {
            let mut client = open_session(cli.model, cli.system_role, &settings)?;
            let response = client.ask_as(&message, AskOptions::new(), &format).await?;
            println!("{}", response.render());
            client.close();
        }
        Commands::Chat => {
            let mut client = open_session(cli.model, cli.system_role, &settings)?;
            interactive_chat(&mut client, io::stdin().lock(), &mut io::stdout()).await?;
            client.close();
        }
    }

    Ok(())
}

fn open_session(
    model: Option<String>,
    system_role: Option<String>,
    settings: &serde_json::Map<String, Value>,
) -> PerplexityResult<Perplexity> {
    let mut config = ClientConfig::from_env()?;
    if let Some(model) = model {
        config = config.with_model(model);
    }
    if let Some(system_role) = system_role {
        config = config.with_system_role(system_role);
    }

    let client = Perplexity::from_config(config)?.with_request_config(settings)?;
    info!("Session ready with model {}", client.model());
    Ok(client)
}

fn print_config(
    settings: &serde_json::Map<String, Value>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = RequestConfig::new();
    config.merge(settings)?;
    println!(
        "{}",
        serde_json::to_string_pretty(&Value::Object(config.effective()))?
    );
    Ok(())
}

async fn interactive_chat<R: BufRead, W: Write>(
    client: &mut Perplexity,
    input: R,
    output: &mut W,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut lines = input.lines();

    loop {
        write!(output, "{}", PROMPT)?;
        output.flush()?;

        let Some(line) = lines.next() else {
            break;
        };
        let message = line?;
        let message = message.trim();

        if message == "exit" {
            break;
        }
        if message.is_empty() {
            continue;
        }

        match client.chat(message).await {
            Ok(completion) => match completion.llm_response {
                Some(answer) => writeln!(output, "{}", answer)?,
                None => writeln!(output, "None")?,
            },
            Err(e) => {
                error!("Chat request failed: {}", e);
                writeln!(output, "Error: {}", e)?;
            }
        }
    }

    writeln!(output, "Goodbye!")?;
    Ok(())
}
