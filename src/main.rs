// src/main.rs

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use graft::identity::ContentIdentity;
use graft::recipe::{DataStepHandler, Recipe, RecipeRunner};
use graft::{Infoset, SqliteRepository, SqliteRunJournal, SqliteTransactions};
use std::rc::Rc;
use tracing::info;

#[derive(Parser)]
#[command(name = "graft")]
#[command(author, version, about = "Batched content importer with atomic transactions and dependency ordering", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the Graft database
    Init {
        /// Database path
        #[arg(short, long, default_value = "graft.db")]
        db_path: String,
    },
    /// Run a recipe file against the content database
    Run {
        /// Recipe XML file path
        recipe: String,
        /// Database path
        #[arg(short, long, default_value = "graft.db")]
        db_path: String,
        /// Override the batch size declared in the recipe
        #[arg(short, long, value_name = "N")]
        batch_size: Option<usize>,
    },
    /// Show an imported content item by identity
    Show {
        /// Content identity
        identity: String,
        /// Database path
        #[arg(short, long, default_value = "graft.db")]
        db_path: String,
    },
    /// Show recorded recipe runs
    History {
        /// Database path
        #[arg(short, long, default_value = "graft.db")]
        db_path: String,
    },
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn run_recipe(recipe_path: &str, db_path: &str, batch_size: Option<usize>) -> Result<()> {
    info!("Running recipe: {}", recipe_path);
    let recipe = Recipe::parse_file(recipe_path)?;

    let conn = Rc::new(graft::db::open(db_path)?);
    let repository = SqliteRepository::new(Rc::clone(&conn));
    let transactions = SqliteTransactions::new(Rc::clone(&conn));

    let mut handler = DataStepHandler::new(repository, transactions);
    if let Some(n) = batch_size {
        handler = handler.with_batch_size(n);
    }

    let mut runner = RecipeRunner::new();
    runner.register(Box::new(handler));

    let mut journal = SqliteRunJournal::new(Rc::clone(&conn));
    let report = runner.run_with_journal(&recipe, &mut journal)?;

    println!("Run {} finished", report.run_id);
    for outcome in &report.outcomes {
        match &outcome.detail {
            Some(detail) => println!("  {:8} {} ({})", outcome.status, outcome.step_name, detail),
            None => println!("  {:8} {}", outcome.status, outcome.step_name),
        }
    }
    Ok(())
}

fn print_parts(label: &str, document: &Infoset) {
    if document.is_empty() {
        return;
    }
    println!("  [{}]", label);
    for part in document.parts() {
        println!("  {}", part.name());
        for (name, value) in part.attrs() {
            println!("    {} = {}", name, value);
        }
    }
}

fn show_item(identity: &str, db_path: &str) -> Result<()> {
    let conn = Rc::new(graft::db::open(db_path)?);
    let repository = SqliteRepository::new(conn);
    let identity = ContentIdentity::new(identity)?;

    match repository.find_by_identity(&identity)? {
        Some(item) => {
            println!("{} ({})", item.identity, item.content_type);
            print_parts("data", &item.infoset);
            print_parts("version data", &item.version_infoset);
            Ok(())
        }
        None => Err(anyhow::anyhow!(
            "No content item with identity: {}",
            identity
        )),
    }
}

fn show_history(db_path: &str) -> Result<()> {
    let conn = graft::db::open(db_path)?;
    let records = graft::db::recent_runs(&conn, 50)?;

    if records.is_empty() {
        println!("No recorded runs");
        return Ok(());
    }
    for record in records {
        match &record.detail {
            Some(detail) => println!(
                "{} {} {:8} {} ({})",
                record.recorded_at, record.run_id, record.status, record.step_name, detail
            ),
            None => println!(
                "{} {} {:8} {}",
                record.recorded_at, record.run_id, record.status, record.step_name
            ),
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Init { db_path }) => {
            info!("Initializing content database at: {}", db_path);
            graft::db::init(&db_path)?;
            println!("Database initialized successfully at: {}", db_path);
            Ok(())
        }
        Some(Commands::Run {
            recipe,
            db_path,
            batch_size,
        }) => run_recipe(&recipe, &db_path, batch_size),
        Some(Commands::Show { identity, db_path }) => show_item(&identity, &db_path),
        Some(Commands::History { db_path }) => show_history(&db_path),
        Some(Commands::Completions { shell }) => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "graft", &mut std::io::stdout());
            Ok(())
        }
        None => {
            // No command provided, show help
            println!("Graft Content Importer v{}", env!("CARGO_PKG_VERSION"));
            println!("Run 'graft --help' for usage information");
            Ok(())
        }
    }
}
