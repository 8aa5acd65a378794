//! Thin CLI driver for the media-dl pipeline

use clap::{Parser, Subcommand, ValueEnum};
use media_dl::{Config, Identity, IdentityKind, MediaHarvester, RedditJsonSource, bulk};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "media-dl", version, about = "Harvest media from content-platform feeds")]
struct Cli {
    /// Path to the JSON configuration file
    #[arg(long, default_value = "./config.json")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch recent media posted by one user
    User {
        /// User name on the platform
        name: String,
        /// Maximum number of posts to list
        #[arg(long)]
        limit: Option<u32>,
        /// Override the configured download root
        #[arg(long)]
        download_directory: Option<PathBuf>,
        /// Emit per-post diagnostics
        #[arg(long)]
        verbose: bool,
    },
    /// Fetch recent media posted to one community
    Community {
        /// Community name on the platform
        name: String,
        /// Maximum number of posts to list
        #[arg(long)]
        limit: Option<u32>,
        /// Restrict to posts matching this query
        #[arg(long)]
        search: Option<String>,
        /// Override the configured download root
        #[arg(long)]
        download_directory: Option<PathBuf>,
        /// Emit per-post diagnostics
        #[arg(long)]
        verbose: bool,
    },
    /// Re-run the harvest for every identity folder under a root directory
    Bulk {
        /// Whether the folders are users or communities
        kind: BulkKind,
        /// Directory containing one folder per identity
        root: PathBuf,
        /// Maximum number of posts to list per identity
        #[arg(long)]
        limit: Option<u32>,
        /// Restrict to posts matching this query (communities only)
        #[arg(long)]
        search: Option<String>,
        /// Emit per-post diagnostics
        #[arg(long)]
        verbose: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum BulkKind {
    /// Folders hold user identities
    Users,
    /// Folders hold community identities
    Communities,
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "media_dl=debug,info"
    } else {
        "media_dl=info,warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn load_config(path: &PathBuf) -> media_dl::Result<Config> {
    if path.is_file() {
        Config::from_file(path)
    } else {
        Ok(Config::default())
    }
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        // The subscriber may not be installed yet if config loading failed.
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> media_dl::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::User {
            name,
            limit,
            download_directory,
            verbose,
        } => {
            let config = prepare(&cli.config, download_directory, verbose)?;
            let harvester = harvester(config)?;
            harvest_one(&harvester, Identity::user(name), limit, None).await
        }
        Command::Community {
            name,
            limit,
            search,
            download_directory,
            verbose,
        } => {
            let config = prepare(&cli.config, download_directory, verbose)?;
            let harvester = harvester(config)?;
            harvest_one(&harvester, Identity::community(name), limit, search.as_deref()).await
        }
        Command::Bulk {
            kind,
            root,
            limit,
            search,
            verbose,
        } => {
            let config = prepare(&cli.config, Some(root.clone()), verbose)?;
            let harvester = harvester(config)?;
            let kind = match kind {
                BulkKind::Users => IdentityKind::User,
                BulkKind::Communities => IdentityKind::Community,
            };
            bulk::update_directory(&harvester, &root, kind, limit, search.as_deref()).await
        }
    }
}

fn prepare(
    config_path: &PathBuf,
    download_directory: Option<PathBuf>,
    verbose: bool,
) -> media_dl::Result<Config> {
    let mut config = load_config(config_path)?;
    if let Some(dir) = download_directory {
        config.download_dir = dir;
    }
    config.verbose |= verbose;
    init_tracing(config.verbose);
    Ok(config)
}

fn harvester(config: Config) -> media_dl::Result<MediaHarvester> {
    let source = Arc::new(RedditJsonSource::new(reqwest::Client::new()));
    MediaHarvester::new(config, source)
}

async fn harvest_one(
    harvester: &MediaHarvester,
    identity: Identity,
    limit: Option<u32>,
    search: Option<&str>,
) -> media_dl::Result<()> {
    match harvester.harvest(&identity, limit, search).await {
        Ok(summary) => {
            tracing::info!(
                attempted = summary.attempted,
                written = summary.written,
                seconds = summary.elapsed.as_secs(),
                "Harvest finished"
            );
            Ok(())
        }
        // Reported, directory already cleaned up; not a process failure.
        Err(e) if e.is_identity_not_found() => {
            tracing::warn!(identity = %identity.name, "Identity does not exist on the platform");
            Ok(())
        }
        Err(e) => Err(e),
    }
}
