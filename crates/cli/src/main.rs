mod config;
mod error;

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use runtime::{ChatOrchestrator, OpenAiBackend, ToolHost, UtcpToolHost, bridge, tools};
use serde_json::{Value, json};
use tracing::info;
use tracing_subscriber::EnvFilter;

use config::Config;
use error::{Error, Result};

#[derive(Parser)]
#[command(name = "toolbridge")]
#[command(about = "Chat with a model that calls UTCP tools", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to the configuration file (default: ./toolbridge.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive chat session
    Chat,
    /// Send a single message and print the reply
    Ask {
        /// The message to send
        text: String,
        /// Print {"response": ...} or {"error": ...} as JSON
        #[arg(long)]
        json: bool,
    },
    /// List tools offered by the configured manuals
    Tools {
        /// Manual URL, replacing the configured ones (repeatable)
        #[arg(short, long)]
        manual: Vec<String>,
    },
    /// Call a tool directly, without a model
    Call {
        /// Tool name
        tool: String,
        /// Arguments as a JSON object
        #[arg(short, long, default_value = "{}")]
        args: String,
        /// Manual URL, replacing the configured ones (repeatable)
        #[arg(short, long)]
        manual: Vec<String>,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = Config::resolve(cli.config.as_deref())?;

    match cli.command {
        Some(Commands::Chat) | None => cmd_chat(&config).await,
        Some(Commands::Ask { text, json }) => cmd_ask(&config, &text, json).await,
        Some(Commands::Tools { manual }) => cmd_tools(&config, &manual).await,
        Some(Commands::Call { tool, args, manual }) => {
            cmd_call(&config, &tool, &args, &manual).await
        }
    }
}

/// `RUST_LOG` wins over `-v` when set.
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn tool_host(config: &Config, manual_overrides: &[String]) -> Result<UtcpToolHost> {
    let urls = config.manual_urls(manual_overrides)?;
    Ok(UtcpToolHost::new(config.manifest_client()?, urls))
}

fn orchestrator(config: &Config) -> Result<ChatOrchestrator<OpenAiBackend, UtcpToolHost>> {
    let backend = config.backend()?;
    let host = tool_host(config, &[])?;
    info!(%backend, manuals = host.manual_urls().len(), "orchestrator ready");

    Ok(ChatOrchestrator::new(backend, host)
        .with_system_prompt(config.chat.system_prompt.as_str())
        .with_discovery(config.utcp.discovery))
}

async fn cmd_chat(config: &Config) -> Result<()> {
    println!("toolbridge v{}", env!("CARGO_PKG_VERSION"));

    let chat = orchestrator(config)?;
    println!("Model: {}", config.backend.model);
    for url in chat.tools().manual_urls() {
        println!("Manual: {url}");
    }
    println!("Type 'quit' or Ctrl+D to exit.\n");

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("> ");
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            // EOF
            break;
        }

        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input == "quit" || input == "exit" {
            break;
        }

        match chat.exchange(input).await {
            Ok(exchange) => {
                if let Some(call) = &exchange.tool_call {
                    println!("\n[tool] {} {}", call.name, call.input);
                }
                println!("\n{}\n", exchange.text);
            }
            Err(e) => {
                eprintln!("Error: {e}\n");
            }
        }
    }

    println!("\nBye.");
    Ok(())
}

async fn cmd_ask(config: &Config, text: &str, as_json: bool) -> Result<()> {
    let result = async { orchestrator(config)?.send_message(text).await.map_err(Error::from) }.await;

    if !as_json {
        println!("{}", result?);
        return Ok(());
    }

    match result {
        Ok(response) => {
            println!("{}", json!({ "response": response }));
            Ok(())
        }
        Err(e) => {
            println!("{}", json!({ "error": e.to_string() }));
            Err(e)
        }
    }
}

async fn cmd_tools(config: &Config, manual: &[String]) -> Result<()> {
    let host = tool_host(config, manual)?;
    host.refresh().await?;

    let manifest = host.client().manifest().await?;
    println!("{} (manual {}, utcp {})", manifest.name, manifest.manual_version, manifest.utcp_version);
    if let Some(description) = &manifest.description {
        println!("{description}");
    }
    println!();

    let specs = host.specs().await?;
    if specs.is_empty() {
        println!("No tools found.");
        return Ok(());
    }

    for spec in specs {
        println!("{:<32}  {}", spec.name, spec.description);
        let required: Vec<&str> = spec.parameters["required"]
            .as_array()
            .map(|r| r.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();
        if let Some(properties) = spec.parameters["properties"].as_object() {
            for (name, schema) in properties {
                let kind = schema["type"].as_str().unwrap_or("string");
                let marker = if required.contains(&name.as_str()) { "*" } else { " " };
                println!("    {marker} {name}: {kind}");
            }
        }
    }

    Ok(())
}

async fn cmd_call(config: &Config, tool: &str, args: &str, manual: &[String]) -> Result<()> {
    let arguments: Value =
        serde_json::from_str(args).map_err(|e| Error::InvalidArguments(e.to_string()))?;
    if !arguments.is_object() {
        return Err(Error::InvalidArguments("expected a JSON object".into()));
    }

    let host = tool_host(config, manual)?;
    host.refresh().await?;

    let result = host
        .client()
        .call_tool_with(tool, |definition| bridge::to_parameter_mapping(definition, &arguments))
        .await?;

    eprintln!("{} in {}ms", result.status_code, result.duration_ms);
    let payload = tools::result_payload(tool, &result);
    println!("{}", serde_json::to_string_pretty(&payload)?);
    Ok(())
}
