use anyhow::{Result, bail};
use chrono::{Duration, Local, NaiveDate};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::sync::mpsc;
use std::thread;

use tally_core::{CancelToken, Error, Level, RunEvent, RunState};

mod auth;
mod config;
mod ledger;
mod llm;
mod review;
mod session;
mod state;

#[derive(Parser, Debug)]
#[command(name = "tally", version, about = "AI categorization companion for your ledger")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Review uncategorized transactions with model suggestions
    Run {
        /// Start of the date range (default: 30 days ago)
        #[arg(long)]
        start: Option<NaiveDate>,

        /// End of the date range, inclusive (default: today)
        #[arg(long)]
        end: Option<NaiveDate>,

        /// Review at most this many transactions
        #[arg(long)]
        limit: Option<usize>,

        /// Override the configured model for this run
        #[arg(long)]
        model: Option<String>,
    },

    /// Print the active category snapshot from the ledger
    Categories,

    /// Store credentials in ~/.tally/auth.json
    Auth {
        #[command(subcommand)]
        command: AuthCommand,
    },

    /// Manage ~/.tally/config.toml
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
enum AuthCommand {
    /// Paste the ledger server API key
    PasteLedgerKey,
    /// Paste an Anthropic API key
    PasteAnthropicKey,
    /// Paste an OpenAI API key
    PasteOpenaiKey,
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Write a default config if none exists
    Init,
    /// Print the effective config
    Show,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Run {
            start,
            end,
            limit,
            model,
        } => run_batch(start, end, limit, model).await?,

        Command::Categories => list_categories().await?,

        Command::Auth { command } => match command {
            AuthCommand::PasteLedgerKey => auth::paste_ledger_key()?,
            AuthCommand::PasteAnthropicKey => auth::paste_anthropic_key()?,
            AuthCommand::PasteOpenaiKey => auth::paste_openai_key()?,
        },

        Command::Config { command } => match command {
            ConfigCommand::Init => config::init_config()?,
            ConfigCommand::Show => config::show_config()?,
        },
    }

    Ok(())
}

async fn run_batch(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    limit: Option<usize>,
    model_override: Option<String>,
) -> Result<()> {
    let cfg = config::load_config()?;
    let auth = auth::load_auth()?;

    // configuration has to be complete before any network activity
    let model = model_override.unwrap_or_else(|| cfg.llm.model.clone());
    if model.trim().is_empty() {
        return Err(Error::config(
            "no model selected; set llm.model in ~/.tally/config.toml",
        )
        .into());
    }
    let provider = llm::Provider::parse(&cfg.llm.provider)?;
    let ledger_key = auth.ledger_api_key.clone().ok_or_else(|| {
        Error::config("missing ledger API key; run: tally auth paste-ledger-key")
    })?;
    match provider {
        llm::Provider::Anthropic if auth.anthropic_api_key.is_none() => {
            return Err(Error::config(
                "missing Anthropic API key; run: tally auth paste-anthropic-key",
            )
            .into());
        }
        llm::Provider::OpenAi if auth.openai_api_key.is_none() => {
            return Err(Error::config(
                "missing OpenAI API key; run: tally auth paste-openai-key",
            )
            .into());
        }
        _ => {}
    }

    let end = end.unwrap_or_else(|| Local::now().date_naive());
    let start = start.unwrap_or_else(|| end - Duration::days(30));
    if start > end {
        bail!("--start {} is after --end {}", start, end);
    }

    let cancel = CancelToken::new();
    let ledger = ledger::LedgerClient::new(cfg.ledger.base_url.clone(), ledger_key);
    let backend = llm::LlmBackend::new(
        llm::BackendConfig {
            provider,
            model,
            base_url: cfg.llm.base_url.clone(),
        },
        auth.clone(),
        cancel.clone(),
    );
    let mut gate = review::TuiGate::new(cancel.clone());

    let (events_tx, events_rx) = mpsc::channel();
    let printer = thread::spawn(move || {
        for event in events_rx {
            print_event(&event);
        }
    });

    let opts = session::SessionOptions { start, end, limit };
    let outcome = session::run_session(&ledger, &backend, &mut gate, &cancel, &events_tx, &opts).await;

    drop(events_tx);
    let _ = printer.join();
    let summary = outcome?;

    println!();
    match summary.state {
        RunState::Cancelled => println!("{}", "Run cancelled.".yellow()),
        _ => println!("{}", "Run complete.".green()),
    }
    println!(
        "{} committed, {} skipped, {} failed ({} fetched)",
        summary.committed, summary.skipped, summary.failed, summary.total
    );

    Ok(())
}

async fn list_categories() -> Result<()> {
    let cfg = config::load_config()?;
    let auth = auth::load_auth()?;
    let ledger_key = auth.ledger_api_key.ok_or_else(|| {
        Error::config("missing ledger API key; run: tally auth paste-ledger-key")
    })?;

    let ledger = ledger::LedgerClient::new(cfg.ledger.base_url, ledger_key);
    let categories = ledger.active_categories().await?;

    println!("{} active categories\n", categories.len());
    for c in &categories {
        match c.description.as_deref().map(str::trim) {
            Some(desc) if !desc.is_empty() => {
                println!("{:>6}  {}  {}", c.id, c.name, desc.dimmed())
            }
            _ => println!("{:>6}  {}", c.id, c.name),
        }
    }

    Ok(())
}

fn print_event(event: &RunEvent) {
    match event {
        RunEvent::Log(log) => {
            let ts = log
                .timestamp
                .with_timezone(&Local)
                .format("%H:%M:%S")
                .to_string();
            let tag = format!("{:>5}", log.level.label());
            let tag = match log.level {
                Level::Info => tag.normal(),
                Level::Ok => tag.green(),
                Level::Warn => tag.yellow(),
                Level::Error => tag.red(),
            };
            println!("{} {} {}", ts.dimmed(), tag, log.message);
        }
        RunEvent::Progress(p) => {
            println!("{}", format!("  [{}/{}]", p.completed, p.total).dimmed());
        }
    }
}
