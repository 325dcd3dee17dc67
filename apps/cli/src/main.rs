use std::{io::Write as _, path::PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use client_core::{
    chat::SUGGESTED_QUESTIONS, load_settings, ContractRevision, HttpBackend, ReviewBackend,
    WorkflowController,
};
use shared::domain::Status;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod commands;
mod render;

use commands::{parse_command, Command, HELP};

/// Search products across stores, analyze their reviews and ask questions about them.
#[derive(Parser, Debug)]
#[command(name = "opinionflow", version)]
struct Args {
    /// Backend API base, e.g. http://localhost:8081/api/v1
    #[arg(long)]
    api_base: Option<String>,
    /// Config file (defaults to ./opinionflow.toml when present)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Request shape expected by the backend: selection or session
    #[arg(long)]
    contract: Option<ContractRevision>,
    #[arg(long)]
    max_per_store: Option<u32>,
    /// Run this search immediately on startup
    #[arg(long)]
    query: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let mut settings = load_settings(args.config.as_deref()).context("loading settings")?;
    if let Some(api_base) = args.api_base {
        settings.api_base = api_base;
    }
    if let Some(contract) = args.contract {
        settings.contract = contract;
    }
    if let Some(max_per_store) = args.max_per_store {
        settings.max_per_store = max_per_store;
    }

    let backend = HttpBackend::new(&settings).context("configuring backend client")?;
    let mut controller = WorkflowController::from_settings(backend, &settings);
    info!(
        session_id = %controller.session_id(),
        api_base = %settings.api_base,
        contract = %settings.contract,
        "opinionflow session started"
    );

    println!("OpinionFlow: cross-store product review intelligence. Type 'help' for commands.");

    if let Some(query) = args.query {
        execute(
            &mut controller,
            Command::Search {
                query,
                max_per_store: None,
            },
        )
        .await;
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        match parse_command(&line, controller.stage()) {
            Ok(None) => {}
            Ok(Some(Command::Quit)) => break,
            Ok(Some(command)) => execute(&mut controller, command).await,
            Err(message) => println!("{message}"),
        }
    }

    Ok(())
}

async fn execute<B: ReviewBackend>(controller: &mut WorkflowController<B>, command: Command) {
    match command {
        Command::Search {
            query,
            max_per_store,
        } => {
            println!("Searching for products across stores...");
            // Failures are already reflected in the search status.
            let _ = controller.search(&query, max_per_store).await;
            print_status(controller.state().search_status.as_ref());
            if !controller.state().products.is_empty_result() {
                println!(
                    "{}",
                    render::listings(&controller.state().products, &controller.state().selected)
                );
            }
        }
        Command::List => println!(
            "{}",
            render::listings(&controller.state().products, &controller.state().selected)
        ),
        Command::Select { store, position } => {
            match controller.select_by_index(&store, position - 1) {
                Ok(listing) => println!("Selected for {store}: {}", listing.name),
                Err(err) => println!("{err}"),
            }
        }
        Command::Selected => println!("{}", render::selection(&controller.state().selected)),
        Command::Analyze => {
            println!("Extracting and analyzing reviews... This may take a moment.");
            let analyzed = controller.analyze().await.is_ok();
            print_status(controller.state().analysis_status.as_ref());
            if let (true, Some(result)) = (analyzed, &controller.state().analysis) {
                println!("{}", render::report(result, &controller.state().selected));
            }
        }
        Command::Report { json } => match &controller.state().analysis {
            Some(result) if json => match serde_json::to_string_pretty(result) {
                Ok(text) => println!("{text}"),
                Err(err) => println!("failed to encode report: {err}"),
            },
            Some(result) => println!("{}", render::report(result, &controller.state().selected)),
            None => println!("No analysis yet. Select products and run 'analyze'."),
        },
        Command::Ask { question } => {
            if let Some(turn) = controller.ask(&question).await {
                println!("{}", render::turn(turn));
            }
        }
        Command::Suggest => {
            println!("Try asking:");
            for question in SUGGESTED_QUESTIONS {
                println!("  {question}");
            }
        }
        Command::Status => println!("{}", render::statuses(controller.state())),
        Command::Transcript => {
            if controller.state().transcript.is_empty() {
                println!("No questions asked yet.");
            }
            for turn in &controller.state().transcript {
                println!("{}\n", render::turn(turn));
            }
        }
        Command::Help => println!("{HELP}"),
        Command::Quit => {}
    }
}

fn print_status(status: Option<&Status>) {
    if let Some(status) = status {
        println!("{}", render::status_line(status));
    }
}
