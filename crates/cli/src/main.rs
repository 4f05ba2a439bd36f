//! Loreweave CLI — the main entry point.
//!
//! Commands:
//! - `upload`        — Add a style sample or reference document
//! - `reindex`       — Rebuild one knowledge base, all of them, or a chapter
//! - `query`         — Rank one knowledge base
//! - `query-multi`   — Weighted query across knowledge bases
//! - `manifest`      — Build the context manifest for a scene
//! - `style-profile` — Derive a style guide from style samples
//! - `world-facts`   — World-lore lookup
//! - `seed-demo`     — Create and index the demo project
//! - `status`        — Show configuration and per-project chunk counts
//! - `config`        — Show or initialise configuration

use clap::{Parser, Subcommand};
use loreweave_core::QueryFilters;
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "loreweave",
    about = "Loreweave — retrieval and context budgeting for long-form writing",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Project to operate on
    #[arg(short, long, global = true, env = "LOREWEAVE_PROJECT", default_value = "demo_project_001")]
    project: String,

    /// Override the data directory from config
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a text file into kb_style or kb_docs
    Upload {
        /// Path of the UTF-8 text file
        file: PathBuf,

        /// `style_sample` or `doc`
        #[arg(short, long, default_value = "doc")]
        kind: String,
    },

    /// Rebuild indexes
    Reindex {
        /// `all` or a knowledge base id
        #[arg(default_value = "all")]
        target: String,

        /// Re-chunk a single edited chapter instead
        #[arg(long)]
        chapter: Option<String>,
    },

    /// Query a single knowledge base
    Query {
        /// Knowledge base id (kb_style, kb_docs, kb_manuscript, kb_world)
        kb: String,

        text: String,

        #[arg(short = 'k', long, default_value_t = 8)]
        top_k: usize,

        /// Only chunks from these assets
        #[arg(long = "asset")]
        assets: Vec<String>,

        /// Only chunks from these chapters
        #[arg(long = "chapter")]
        chapters: Vec<String>,

        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Query several knowledge bases and merge the results
    QueryMulti {
        text: String,

        #[arg(short = 'k', long, default_value_t = 8)]
        top_k: usize,

        /// `kb_id=weight`, repeatable. Defaults to the writing profile.
        #[arg(short, long = "source")]
        sources: Vec<String>,

        /// Use the critique profile when no sources are given
        #[arg(long)]
        critic: bool,

        #[arg(long)]
        json: bool,
    },

    /// Build the context manifest for a scene
    Manifest {
        chapter: String,

        /// Scene plan JSON file. Defaults to the first scene of the
        /// chapter blueprint.
        #[arg(long)]
        scene: Option<PathBuf>,

        /// Override the total token budget
        #[arg(long)]
        max_tokens: Option<usize>,
    },

    /// Derive a style guide from style samples
    StyleProfile {
        /// Style card to update (defaults to config)
        #[arg(long)]
        card: Option<String>,

        /// Style sample asset ids, repeatable. All samples when omitted.
        #[arg(long = "asset")]
        assets: Vec<String>,

        #[arg(long, default_value = "fast")]
        mode: String,
    },

    /// Look up world lore
    WorldFacts {
        text: String,

        #[arg(short = 'k', long, default_value_t = 8)]
        top_k: usize,

        /// Also search the shared `_global` project
        #[arg(long)]
        include_global: bool,

        #[arg(long)]
        json: bool,
    },

    /// Create and index the demo project
    SeedDemo,

    /// Show configuration and per-project chunk counts
    Status,

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Print the config file path
    Path,
    /// Write a default config file if none exists
    Init,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    if let Commands::Config { action } = &cli.command {
        return match action {
            ConfigAction::Show => commands::config_cmd::show().await,
            ConfigAction::Path => commands::config_cmd::path().await,
            ConfigAction::Init => commands::config_cmd::init().await,
        };
    }

    let engine = commands::Engine::open(cli.data_dir)?;
    let project = cli.project.as_str();

    match cli.command {
        Commands::Upload { file, kind } => commands::upload::run(&engine, project, &file, &kind).await?,
        Commands::Reindex { target, chapter } => {
            commands::reindex::run(&engine, project, &target, chapter.as_deref()).await?
        }
        Commands::Query {
            kb,
            text,
            top_k,
            assets,
            chapters,
            json,
        } => {
            let filters = QueryFilters::none()
                .with_asset_ids(assets)
                .with_chapter_ids(chapters);
            commands::query::single(&engine, project, &kb, &text, top_k, &filters, json).await?
        }
        Commands::QueryMulti {
            text,
            top_k,
            sources,
            critic,
            json,
        } => commands::query::multi(&engine, project, &text, top_k, &sources, critic, json).await?,
        Commands::Manifest {
            chapter,
            scene,
            max_tokens,
        } => commands::manifest::run(&engine, project, &chapter, scene.as_deref(), max_tokens).await?,
        Commands::StyleProfile { card, assets, mode } => {
            commands::style::run(&engine, project, card.as_deref(), &assets, &mode).await?
        }
        Commands::WorldFacts {
            text,
            top_k,
            include_global,
            json,
        } => commands::world::run(&engine, project, &text, top_k, include_global, json).await?,
        Commands::SeedDemo => commands::seed::run(&engine, project).await?,
        Commands::Status => commands::status::run(&engine).await?,
        Commands::Config { .. } => {}
    }

    Ok(())
}
