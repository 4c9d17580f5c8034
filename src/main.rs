use std::path::PathBuf;

use clap::Parser;
use opsagent::{Assistant, AssistantConfig, Result, VerificationReport};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::info;

/// Plans, executes and verifies operational tasks written in natural language.
#[derive(Parser, Debug)]
#[command(name = "opsagent", version)]
struct Args {
    /// Task to run; omit for interactive mode
    task: Vec<String>,

    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Retries per step after the first attempt
    #[arg(short = 'r', long)]
    max_retries: Option<u32>,

    /// Print the available tools and exit
    #[arg(long)]
    list_tools: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Print the report as compact JSON
    #[arg(long)]
    compact: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();

    let mut config = AssistantConfig::load(args.config.as_deref())?;
    if let Some(level) = &args.log_level {
        config.log_level = level.clone();
    }

    tracing_subscriber::fmt()
        .with_max_level(config.log_level())
        .with_writer(std::io::stderr)
        .init();

    let assistant = Assistant::from_config(&config)?;

    if args.list_tools {
        println!("{}", assistant.available_tools());
        return Ok(());
    }

    if !args.task.is_empty() {
        let task = args.task.join(" ");
        let report = assistant.process_task(&task, args.max_retries).await;
        print_report(&report, args.compact)?;
        return Ok(());
    }

    interactive(&assistant, args.max_retries, args.compact).await
}

async fn interactive(assistant: &Assistant, max_retries: Option<u32>, compact: bool) -> Result<()> {
    println!("opsagent interactive mode. Type 'exit', 'quit' or 'q' to leave.\n");
    println!("{}", assistant.available_tools());

    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        stdout.write_all(b"\ntask> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let task = line.trim();
        if task.is_empty() {
            continue;
        }
        if matches!(task.to_ascii_lowercase().as_str(), "exit" | "quit" | "q") {
            break;
        }

        let report = assistant.process_task(task, max_retries).await;
        print_report(&report, compact)?;
    }

    info!("Leaving interactive mode");
    Ok(())
}

fn print_report(report: &VerificationReport, compact: bool) -> Result<()> {
    let rendered = if compact {
        serde_json::to_string(report)?
    } else {
        serde_json::to_string_pretty(report)?
    };
    println!("{rendered}");
    Ok(())
}
