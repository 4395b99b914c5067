use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, EnvFilter};

use crate::catalog::RecipeCatalog;
use crate::config::{ConfigLoader, CONFIG_ENV, DATA_ENV};
use crate::ids::UuidGenerator;
use crate::storage::{self, RecipeStore};

pub mod commands;

use self::commands::{CommandContext, DeleteArgs, EditArgs, ListArgs, NewArgs, ShowArgs};

#[derive(Parser, Debug)]
#[command(name = "recipebox", version, about = "Keep, search and edit your recipes")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Override the config file location (takes precedence over RECIPEBOX_CONFIG)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override the data directory (takes precedence over RECIPEBOX_DATA)
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Minimum log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List recipes, optionally filtered and sorted (default)
    List(ListArgs),
    /// Print one recipe in full
    Show(ShowArgs),
    /// Create a recipe
    New(NewArgs),
    /// Change an existing recipe
    Edit(EditArgs),
    /// Delete a recipe after confirmation
    Delete(DeleteArgs),
    /// Show the tag vocabulary and how often each tag is used
    Tags,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    if let Some(path) = &cli.config {
        env::set_var(CONFIG_ENV, path);
    }
    if let Some(path) = &cli.data_dir {
        env::set_var(DATA_ENV, path);
    }

    let loader = ConfigLoader::discover()?;
    loader.paths().ensure_directories()?;
    init_tracing(&cli.log_level)
        .with_context(|| format!("initialising logging at level {}", cli.log_level))?;
    let config = loader.load_or_init()?;
    let backend = storage::init(&config.storage).context("opening recipe database")?;
    let catalog = RecipeCatalog::open(RecipeStore::new(Arc::new(backend)))
        .context("loading recipes")?;

    let ctx = CommandContext {
        vocabulary: config.vocabulary(),
        config: Arc::new(config),
        catalog,
        ids: Arc::new(UuidGenerator),
    };
    let command = cli
        .command
        .unwrap_or_else(|| Commands::List(ListArgs::default()));
    match command {
        Commands::List(args) => commands::list_recipes(&ctx, args),
        Commands::Show(args) => commands::show_recipe(&ctx, args),
        Commands::New(args) => commands::new_recipe(&ctx, args),
        Commands::Edit(args) => commands::edit_recipe(&ctx, args),
        Commands::Delete(args) => commands::delete_recipe(&ctx, args),
        Commands::Tags => commands::list_tags(&ctx),
    }
}

fn init_tracing(level: &str) -> Result<()> {
    static INIT: OnceCell<()> = OnceCell::new();
    INIT.get_or_try_init(|| {
        let env_filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
        fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .try_init()
            .map_err(|err| anyhow::anyhow!(err))
    })
    .map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_edit_flags() {
        let cli = Cli::parse_from([
            "recipebox",
            "edit",
            "r-1",
            "--title",
            "Stew",
            "--toggle-tag",
            "quick",
            "--remove-ingredient",
            "i-1",
            "--minutes",
            "90",
        ]);
        assert_matches!(cli.command, Some(Commands::Edit(args)) => {
            assert_eq!(args.id, "r-1");
            assert_eq!(args.fields.title.as_deref(), Some("Stew"));
            assert_eq!(args.toggle_tags, vec!["quick".to_string()]);
            assert_eq!(args.remove_ingredients, vec!["i-1".to_string()]);
            assert_eq!(args.fields.minutes, Some(90));
        });
    }

    #[test]
    fn parses_sort_mode_names() {
        let cli = Cli::parse_from(["recipebox", "list", "--sort", "servingsHigh", "pie"]);
        assert_matches!(cli.command, Some(Commands::List(args)) => {
            assert_eq!(args.sort, Some(crate::search::SortMode::ServingsHigh));
            assert_eq!(args.query, vec!["pie".to_string()]);
        });
    }

    #[test]
    fn rejects_negative_durations_and_servings() {
        for flag in ["--days=-1", "--hours=-2", "--minutes=-30", "--servings=-4"] {
            let parsed = Cli::try_parse_from(["recipebox", "new", "--title", "Soup", flag]);
            assert!(parsed.is_err(), "{flag} should be rejected");
        }
        let parsed = Cli::try_parse_from(["recipebox", "new", "--title", "Soup", "--minutes", "0"]);
        assert!(parsed.is_ok());
    }

    #[test]
    fn bare_invocation_defaults_to_list() {
        let cli = Cli::parse_from(["recipebox"]);
        assert!(cli.command.is_none());
        assert_eq!(cli.log_level, "info");
    }
}
