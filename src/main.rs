use board_site::{config, output, site, tasks};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn version_string() -> &'static str {
    let on_tag = env!("ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // clap needs a 'static version string; this runs once per process
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "board-site")]
#[command(about = "Build static site page templates from a Trello board")]
#[command(long_about = "\
Build static site page templates from a Trello board

Lists become sections and cards become pages. A card named like its list is
the section's intro. Lists named \"/something\" are folders: each card is
written to <dpc_root>/something/<card name> with the card description as its
content.

Board layout:

  Board \"Recipes\"                  → /            (description = home body)
  ├── List \"Starters\"              → /starters/
  │   ├── Card \"Starters\"          → intro text of /starters/
  │   └── Card \"Soup\"              → /starters/soup/
  ├── List \"/_styles\"              → folder <dpc_root>/_styles
  │   └── Card \"site.scss\"         → compiled to <dpc_output_dir>/css/site.css
  └── List \"/_dependencies\"        → folder <dpc_root>/_dependencies
      └── Card \"github.json\"       → {\"name\": \"https://…/archive.zip\"}

Card descriptions are Jinja templates rendered against the whole site as
`site`, then Markdown.

Run 'board-site gen-config' to generate a documented board-site.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Config file
    #[arg(long, default_value = "board-site.toml", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the full pipeline: build → render → materialize → tasks
    Build {
        /// Fetch the board from the API even when use_cache is set
        #[arg(long)]
        refresh: bool,
    },
    /// Refresh the board cache from the API
    Fetch,
    /// Print a stock board-site.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("board_site=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Build { refresh } => {
            let config = config::load_config(&cli.config)?;
            let source = site::board_source(&config, refresh)?;
            let registry = tasks::HandlerRegistry::with_defaults(&config)?;

            println!("==> Building {}", config.dpc_input_dir.display());
            let report = site::build(&config, source.as_ref(), &registry)?;
            output::print_build_report(&report);
            println!("==> Build complete: {}", config.dpc_input_dir.display());
        }
        Command::Fetch => {
            let config = config::load_config(&cli.config)?;
            let board = site::board_source(&config, true)?.fetch()?;
            output::print_fetch_output(&board);
            println!("==> Cache updated: {}", config.cache_dir().display());
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}
