use anstyle::{AnsiColor, Color, Style};
use clap::{builder::Styles, Parser, Subcommand, ValueEnum};
use tracing_subscriber::filter::LevelFilter;

use crate::{commands, constants::DEFAULT_STORE_URL};

/// Styles for CLI
fn get_styles() -> Styles {
  Styles::styled()
    .header(
      Style::new()
        .bold()
        .underline()
        .fg_color(Some(Color::Ansi(AnsiColor::Green))),
    )
    .literal(Style::new().bold().fg_color(Some(Color::Ansi(AnsiColor::Cyan))))
    .usage(
      Style::new()
        .bold()
        .underline()
        .fg_color(Some(Color::Ansi(AnsiColor::Green))),
    )
    .placeholder(Style::new().bold().fg_color(Some(Color::Ansi(AnsiColor::Yellow))))
    .error(Style::new().bold().fg_color(Some(Color::Ansi(AnsiColor::BrightRed))))
}

#[derive(Debug, Parser)]
#[command(author, version, about)]
#[command(propagate_version = true)]
#[command(styles=get_styles())]
pub struct Cli {
  #[command(subcommand)]
  pub command: Commands,

  /// Store URL holding cluster state
  #[arg(long, global = true, env = "KAPTAIN_STORE", default_value = DEFAULT_STORE_URL)]
  pub store: String,

  /// Log verbosity
  #[arg(long, global = true, env = "KAPTAIN_LOG", value_enum, default_value_t)]
  pub log_level: LogLevel,

  /// Disable colors on logged output
  #[arg(long, global = true, default_value = "false")]
  pub no_color: bool,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
  /// Create a new cluster
  ///
  /// Generates all TLS assets and config files required by Kubernetes and
  /// uploads them to the store to be pulled by nodes later
  Create(commands::create::CreateCluster),

  /// Delete a cluster spec from the registry
  ///
  /// The operation removes every stored document of the cluster and cannot
  /// be undone
  Delete(commands::delete::DeleteCluster),

  /// Export a cluster spec as YAML on stdout
  ///
  /// The output contains all cluster spec, PKIs, token secrets and
  /// file/addon manifests; keep it in version control to recreate the
  /// cluster later
  Export(commands::export::ExportCluster),

  /// Import a cluster spec from a file
  ///
  /// Fails when a cluster with the imported name already exists in the
  /// registry
  Import(commands::import::ImportCluster),

  /// Export kubeconfig for accessing a cluster
  ExportConfig(commands::export_config::ExportConfig),

  /// Bootstrap a freshly deployed cluster
  ///
  /// Applies cluster networking, RBAC permissions, storageclass and the
  /// remaining addons once the apiserver is reachable
  Bootstrap(commands::bootstrap::BootstrapCluster),

  /// List clusters in the registry
  List(commands::list::ListClusters),
}

/// Log levels accepted by KAPTAIN_LOG. `panic` keeps only error output
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
  Debug,
  #[default]
  Info,
  Warn,
  Error,
  Panic,
}

impl LogLevel {
  pub fn filter(&self) -> LevelFilter {
    match self {
      LogLevel::Debug => LevelFilter::DEBUG,
      LogLevel::Info => LevelFilter::INFO,
      LogLevel::Warn => LevelFilter::WARN,
      LogLevel::Error | LogLevel::Panic => LevelFilter::ERROR,
    }
  }
}

impl std::str::FromStr for LogLevel {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "debug" => Ok(LogLevel::Debug),
      "info" => Ok(LogLevel::Info),
      "warn" => Ok(LogLevel::Warn),
      "error" => Ok(LogLevel::Error),
      "panic" => Ok(LogLevel::Panic),
      other => Err(format!("unknown log level: {other}")),
    }
  }
}
