//! dependency-abstractor
//!
//! Collects the packages installed through APT, DNF or Flatpak, splits them
//! into user-installed and implicitly installed packages, and renders the
//! result as a DOT graph, a bar chart, a package listing or an interactive
//! browser.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use color_eyre::Result;
use dabs_core::distro::like_distro_ids;
use dabs_exec::{CommandExecutor, LocalExecutor};
use dabs_pkg::PackageManagerType;
use dabs_render::{
    Legend, RenderError, bar_chart, details, find_candidate, modal_print, print_text, render_dot,
};
use tracing::{debug, error, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod tui;

use config::Config;

/// Log file written by the browser with `--debug`
const TUI_LOG_FILE: &str = "dependency-abstractor.log";

/// Abstract dependency graph generator for user-installed packages
#[derive(Parser, Debug)]
#[command(
    name = "dependency-abstractor",
    version,
    about,
    after_help = "Example of use: dependency-abstractor dnf dot | sfdp -Tsvg > dnf.svg"
)]
struct Args {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Configuration file
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Package manager to query
    #[arg(value_enum)]
    package_manager: Backend,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Backend {
    Apt,
    Dnf,
    Flatpak,
}

impl From<Backend> for PackageManagerType {
    fn from(backend: Backend) -> Self {
        match backend {
            Backend::Apt => PackageManagerType::Apt,
            Backend::Dnf => PackageManagerType::Dnf,
            Backend::Flatpak => PackageManagerType::Flatpak,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// DOT language output
    Dot,
    /// Interactive package browser
    Tui,
    /// Text-based bar graph
    Bar,
    /// Package details
    Details {
        /// Package identifier or a unique prefix of it
        package: String,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Initialize error handling
    color_eyre::install()?;

    let args = Args::parse();
    let config = Config::load_default(args.config.as_deref())?;
    init_logging(&args, &config)?;
    debug!(?args, ?config, "starting");

    run(args, config).await
}

/// Install the tracing subscriber
///
/// `RUST_LOG` wins over `--debug`, which wins over the configured level. The
/// browser owns the terminal, so it only logs to a file and only with `--debug`.
fn init_logging(args: &Args, config: &Config) -> Result<()> {
    let level = if args.debug {
        "debug"
    } else {
        config.log_level.as_str()
    };
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;

    if matches!(args.command, Command::Tui) {
        if args.debug {
            let file = std::fs::File::create(TUI_LOG_FILE)?;
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(file).with_ansi(false))
                .init();
        }
        return Ok(());
    }

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
    Ok(())
}

/// Warn when a native backend does not belong to the running distribution
fn check_distro(manager: PackageManagerType) {
    let Some(family) = manager.distro_family() else {
        return;
    };
    let ids = like_distro_ids();
    debug!("os-release ids: {ids:?}");
    if let Some(message) = distro_warning(family, ids.as_deref()) {
        warn!("{message}");
    }
}

/// Mismatch warning, only when the os-release ids could be read
fn distro_warning(family: &str, ids: Option<&[String]>) -> Option<String> {
    let ids = ids?;
    (!ids.iter().any(|id| id == family)).then(|| format!("No distro id '{family}' in os-release"))
}

/// Exit quietly with status 1 when the reader of stdout went away
fn finish(result: std::result::Result<(), RenderError>) -> Result<ExitCode> {
    match result {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(RenderError::BrokenPipe) => Ok(ExitCode::FAILURE),
        Err(e) => Err(e.into()),
    }
}

async fn run(args: Args, config: Config) -> Result<ExitCode> {
    let manager = PackageManagerType::from(args.package_manager);
    check_distro(manager);

    let executor: Arc<dyn CommandExecutor> = Arc::new(LocalExecutor::new());
    let collector = dabs_pkg::create_collector(manager, executor, config.collect.clone());
    let collection = match dabs_pkg::build_collection(collector.as_ref()).await {
        Ok(collection) => collection,
        Err(e) if e.is_manager_not_found() => {
            error!("{e}");
            return Ok(ExitCode::FAILURE);
        }
        Err(e) => return Err(e.into()),
    };

    let legend = match manager {
        PackageManagerType::Flatpak => Legend::Flatpak,
        PackageManagerType::Apt | PackageManagerType::Dnf => Legend::Native,
    };
    let output = config.output;

    match args.command {
        Command::Dot => finish(print_text(&render_dot(&collection, &output)?)),
        Command::Bar => {
            let chart = bar_chart(&collection, legend, &output);
            finish(modal_print(&chart.lines(), true, true))
        }
        Command::Details { package } => match find_candidate(&collection, &package) {
            Ok(id) => {
                let lines = details(&collection, &id, &output)?;
                finish(modal_print(&lines, true, false))
            }
            Err(e) => {
                debug!("{e}");
                let mut text = e.suggestions().join("\n");
                text.push('\n');
                finish(print_text(&text)).map(|_| ExitCode::FAILURE)
            }
        },
        Command::Tui => {
            tui::run(collection, legend, output).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
