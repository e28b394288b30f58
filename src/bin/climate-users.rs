//! Administration tool for the card preference table.
//!
//! Usage:
//!   cargo run --bin climate-users -- list
//!   cargo run --bin climate-users -- add <card-id> <winter> <summer>
//!   cargo run --bin climate-users -- delete <card-id>
//!   cargo run --bin climate-users -- clear

use clap::{Parser, Subcommand};
use climate_coordinator::config::{default_preferences_path, load_dotenv};
use climate_coordinator::error::Result;
use climate_coordinator::identity::{CardId, PreferenceStore};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "climate-users")]
#[command(about = "Manage the card holders known to the climate master")]
struct Cli {
    /// Preference table JSON file
    #[arg(long, env = "PREFERENCES_PATH")]
    path: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print every known card with its setpoints
    List,
    /// Add a card or replace its setpoints
    Add {
        card_id: CardId,
        /// Preferred temperature in winter (°C)
        winter: f32,
        /// Preferred temperature in summer (°C)
        summer: f32,
    },
    /// Remove a card
    Delete { card_id: CardId },
    /// Remove every card
    Clear,
}

fn run(store: &PreferenceStore, command: Commands) -> Result<()> {
    match command {
        Commands::List => {
            let table = store.table();
            if table.is_empty() {
                println!("No users in {}", store.path().display());
                return Ok(());
            }
            println!("{:>12}  {:>8}  {:>8}", "CARD ID", "WINTER", "SUMMER");
            for user in table.users() {
                println!(
                    "{:>12}  {:>8.1}  {:>8.1}",
                    user.card_id, user.winter_setpoint, user.summer_setpoint
                );
            }
        }
        Commands::Add {
            card_id,
            winter,
            summer,
        } => {
            let user = store.upsert(card_id, winter, summer)?;
            println!(
                "Saved card {} (winter {:.1} °C, summer {:.1} °C)",
                user.card_id, user.winter_setpoint, user.summer_setpoint
            );
        }
        Commands::Delete { card_id } => {
            if store.delete(card_id)? {
                println!("Deleted card {}", card_id);
            } else {
                println!("Card {} is not known", card_id);
            }
        }
        Commands::Clear => {
            store.clear()?;
            println!("Cleared {}", store.path().display());
        }
    }
    Ok(())
}

fn main() {
    load_dotenv();
    let cli = Cli::parse();
    let store = PreferenceStore::open(cli.path.unwrap_or_else(default_preferences_path));

    if let Err(e) = run(&store, cli.command) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
