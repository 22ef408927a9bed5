mod interactive;
mod memory_cmds;

use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use researcher_config::AppConfig;
use researcher_memory::InsightMemory;
use researcher_runtime::{ChatReply, ResearchRuntime};

const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

#[derive(Debug, Parser)]
#[command(
    name = "researcher",
    version,
    about = "A research assistant that remembers what it learns"
)]
struct Cli {
    /// Path to the TOML config file.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Write a default config file.
    Init {
        #[arg(long)]
        force: bool,
    },
    /// Ask a single question and print the answer.
    Ask {
        #[arg(required = true, num_args = 1..)]
        message: Vec<String>,
        /// Question a "The answer is: ..." message is teaching the answer to.
        #[arg(long)]
        previous_question: Option<String>,
        /// Print the full reply as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Interactive research session.
    Chat,
    /// Inspect the insight memory.
    Memory {
        #[command(subcommand)]
        command: MemoryCommands,
    },
    /// Show config, memory and provider status.
    Doctor,
}

#[derive(Debug, Subcommand)]
enum MemoryCommands {
    /// Most recent insights, newest first.
    List {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Insights the ranker would recall for a query.
    Search {
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
    },
    /// Totals, time span and most frequent tags.
    Stats,
    /// Print the insight file location.
    Path,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = AppConfig::load_from(&cli.config)?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.telemetry.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command.unwrap_or(Commands::Chat) {
        Commands::Init { force } => run_init(&cli.config, force)?,
        Commands::Ask {
            message,
            previous_question,
            json,
        } => {
            let runtime = ResearchRuntime::from_config(config)?;
            let reply = runtime
                .respond(&message.join(" "), previous_question.as_deref())
                .await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&reply)?);
            } else {
                print_reply(&reply);
            }
        }
        Commands::Chat => {
            let runtime = ResearchRuntime::from_config(config)?;
            interactive::run_chat_session(&runtime).await?;
        }
        Commands::Memory { command } => {
            let memory = InsightMemory::open(&config.memory.path)
                .with_recall_limit(config.memory.recall_limit);
            match command {
                MemoryCommands::List { limit } => memory_cmds::run_memory_list(&memory, limit.max(1)),
                MemoryCommands::Search { query } => {
                    memory_cmds::run_memory_search(&memory, &query.join(" "))
                }
                MemoryCommands::Stats => memory_cmds::run_memory_stats(&memory),
                MemoryCommands::Path => println!("{}", config.memory.path),
            }
        }
        Commands::Doctor => run_doctor(&cli.config, &config),
    }

    Ok(())
}

fn run_init(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!(
            "{} already exists (pass --force to overwrite)",
            path.display()
        );
    }
    AppConfig::default().save_to(path)?;
    println!("wrote default config to {}", path.display());
    println!("set LLM_API_KEY and YOU_API_KEY (or BRAVE_API_KEY) in .env to enable live answers");
    Ok(())
}

fn run_doctor(config_path: &Path, config: &AppConfig) {
    let memory = InsightMemory::open(&config.memory.path);
    let yes_no = |flag: bool| if flag { "yes" } else { "no" };

    println!("researcher doctor");
    println!(
        "- config: {} (exists: {})",
        config_path.display(),
        yes_no(config_path.exists())
    );
    println!("- memory store: {}", memory.store().describe());
    println!("- insights stored: {}", memory.all().len());
    println!("- recall limit: {}", config.memory.recall_limit);
    println!("- auto learn: {}", yes_no(config.memory.auto_learn));
    println!("- llm endpoint: {}", config.llm.base_url);
    println!("- llm model: {}", config.llm.model);
    println!("- llm key configured: {}", yes_no(config.llm_key_configured()));
    println!("- search provider: {}", config.search.provider);
    println!(
        "- search key configured: {}",
        yes_no(config.search_key_configured())
    );
}

pub(crate) fn print_reply(reply: &ChatReply) {
    println!("{}", reply.answer);

    if !reply.memory.is_empty() {
        println!();
        println!("── recalled insights ────────────────────────────────");
        for record in &reply.memory {
            println!("  [{}] {}", record.id_short(), record.insight);
        }
    }
    if !reply.search.is_empty() {
        println!();
        println!("── sources ──────────────────────────────────────────");
        for hit in &reply.search {
            println!("  {} <{}>", hit.title, hit.url);
        }
    }
    if let Some(learned) = &reply.new_insight {
        println!();
        println!("memory updated: {}", learned.insight);
    }
}
