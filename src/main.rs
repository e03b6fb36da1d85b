//! # Shaker CLI
//!
//! The `shaker` binary is the primary interface to the cocktail retrieval
//! engine.
//!
//! ## Usage
//!
//! ```bash
//! shaker --config ./config/shaker.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `shaker index` | Embed the corpus and persist the vector index |
//! | `shaker search "<query>"` | Semantic search over the corpus |
//! | `shaker similar <name>` | Rank cocktails by ingredient overlap with a named one |
//! | `shaker contains <ingredients>…` | Cocktails containing every listed ingredient |
//! | `shaker ingredients` | Most popular (or `--rarest`) ingredients |
//! | `shaker serve` | Start the HTTP chat server |

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use shaker::{config, engine::Engine, server};

/// Shaker — a local-first cocktail retrieval engine.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/shaker.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "shaker",
    about = "Shaker — a local-first cocktail retrieval engine",
    version,
    long_about = "Shaker loads a cocktail CSV, embeds every drink into a persisted \
    flat vector index, and answers queries by semantic nearest-neighbor search, \
    ingredient-overlap ranking, ingredient containment, and frequency aggregation."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/shaker.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build or refresh the persisted vector index.
    ///
    /// Embeds every cocktail's display text and writes the artifact pair.
    /// A consistent existing artifact is reused; a stale one is rebuilt.
    Index,

    /// Semantic search: the k most similar cocktails to a free-text query.
    Search {
        /// The search query string.
        query: String,

        /// Maximum number of results to return.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Rank other cocktails by ingredient overlap with a named one.
    ///
    /// Falls back to semantic search when the name has no exact match
    /// or no other cocktail shares an ingredient.
    Similar {
        /// Cocktail name (case-insensitive exact match).
        name: String,

        #[arg(long)]
        limit: Option<usize>,
    },

    /// Cocktails containing every listed ingredient (case-insensitive).
    Contains {
        /// Required ingredients.
        #[arg(required = true)]
        ingredients: Vec<String>,

        #[arg(long)]
        limit: Option<usize>,
    },

    /// Ingredient frequency across the corpus.
    Ingredients {
        /// Show the least common ingredients instead of the most common.
        #[arg(long)]
        rarest: bool,

        #[arg(long)]
        limit: Option<usize>,
    },

    /// Start the HTTP chat server.
    Serve,
}

fn print_results(results: &[String]) {
    if results.is_empty() {
        println!("No results.");
        return;
    }
    for line in results {
        println!("{}", line);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Index => {
            Engine::open(&cfg).await?;
        }
        Commands::Search { query, limit } => {
            let engine = Engine::open(&cfg).await?;
            let k = limit.unwrap_or(cfg.retrieval.default_k);
            print_results(&engine.retrieve(&query, k).await?);
        }
        Commands::Similar { name, limit } => {
            let engine = Engine::open(&cfg).await?;
            let k = limit.unwrap_or(cfg.retrieval.default_k);
            let overlapping = engine.search_similar(&name, k);
            if overlapping.is_empty() {
                println!(
                    "No exact ingredient overlap for '{}'. Semantically similar cocktails:",
                    name
                );
                print_results(&engine.retrieve(&name, k).await?);
            } else {
                print_results(&overlapping);
            }
        }
        Commands::Contains { ingredients, limit } => {
            let engine = Engine::open(&cfg).await?;
            let k = limit.unwrap_or(cfg.retrieval.default_k);
            print_results(&engine.search_by_ingredients(&ingredients, k));
        }
        Commands::Ingredients { rarest, limit } => {
            let engine = Engine::open(&cfg).await?;
            let n = limit.unwrap_or(cfg.retrieval.default_k);
            let counts = if rarest {
                engine.rarest(n)
            } else {
                engine.most_popular(n)
            };
            for (ingredient, count) in counts {
                println!("{}: {}", ingredient, count);
            }
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
