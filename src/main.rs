//! # Solr Product Search CLI (`sps`)
//!
//! ## Usage
//!
//! ```bash
//! sps --config ./config/sps.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `sps search "<query>"` | Search products |
//! | `sps serve` | Start the HTTP server |
//! | `sps index rebuild` | Rebuild the Solr index from the catalog |
//! | `sps index add <id>` | Index (or remove, if unpublished) one product |
//! | `sps index delete <id>` | Remove one product from the index |
//! | `sps completions <shell>` | Print shell completions |
//!
//! ## Examples
//!
//! ```bash
//! # German storefront search, falling back to English texts
//! sps search "laufschuh" --lang de-DE
//!
//! # Filter by two categories and one color option, JSON output
//! sps search shoe --facets "allcategories:3|7,SA2:10" --json
//! ```

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use solr_product_search::{config, index_cmd, search, server};

/// Solr Product Search: localized storefront product search over Solr.
///
/// All commands except `completions` read a TOML configuration file. See
/// `config/sps.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "sps",
    about = "Solr Product Search: localized storefront product search over Solr",
    version,
    long_about = "Composes localized Solr queries with a default-language fallback, \
    translates facet selections into filters and facet counts into display facets, \
    pins hero products, and keeps the index in sync with a JSON catalog."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/sps.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search products.
    ///
    /// Runs the localized query first and falls back to the default
    /// language when nothing matches.
    Search {
        /// The search query string.
        query: String,

        /// Language (short key or culture tag, e.g. `de` or `de-DE`).
        #[arg(long)]
        lang: Option<String>,

        /// Facet selection, e.g. `allcategories:3|7,SA2:10`.
        #[arg(long)]
        facets: Option<String>,

        /// Print the full response model as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Start the HTTP server on `[server].bind`.
    Serve,

    /// Maintain the Solr index.
    Index {
        #[command(subcommand)]
        action: IndexAction,
    },

    /// Print shell completion script to stdout.
    Completions {
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum IndexAction {
    /// Clear the index and add every published catalog product.
    Rebuild,
    /// Index one product by id; unpublished products are removed.
    Add {
        id: i64,
    },
    /// Remove one product from the index by id.
    Delete {
        id: i64,
    },
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,product_search_core=info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Commands that don't require config
    if let Commands::Completions { shell } = &cli.command {
        clap_complete::generate(*shell, &mut Cli::command(), "sps", &mut std::io::stdout());
        return Ok(());
    }

    init_tracing();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Search {
            query,
            lang,
            facets,
            json,
        } => {
            search::run_search(&cfg, &query, lang, facets, json).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
        Commands::Index { action } => match action {
            IndexAction::Rebuild => index_cmd::run_rebuild(&cfg).await?,
            IndexAction::Add { id } => index_cmd::run_add(&cfg, id).await?,
            IndexAction::Delete { id } => index_cmd::run_delete(&cfg, id).await?,
        },
        Commands::Completions { .. } => {}
    }

    Ok(())
}
