use std::path::PathBuf;

use anstyle::{AnsiColor, Color, Style};
use clap::{builder::Styles, Parser, Subcommand};
use kaptain::LogLevel;

use crate::commands;

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

/// Sailor follows clusters created by kaptain and provisions config files on
/// the node it runs on. State is pulled from the same backend store; set
/// KAPTAIN_STORE or the config file to change it
#[derive(Debug, Parser)]
#[command(author, version, about)]
#[command(propagate_version = true)]
#[command(styles=get_styles())]
pub struct Cli {
  #[command(subcommand)]
  pub command: Commands,

  /// Config file (default is $HOME/.sailor.yaml)
  #[arg(long, global = true)]
  pub config: Option<PathBuf>,

  /// Store URL holding cluster state
  #[arg(long, global = true, env = "KAPTAIN_STORE")]
  pub store: Option<String>,

  /// Log verbosity
  #[arg(long, global = true, env = "KAPTAIN_LOG", value_enum)]
  pub log_level: Option<LogLevel>,

  /// Disable colors on logged output
  #[arg(long, global = true, default_value = "false")]
  pub no_color: bool,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
  /// Prepare the current Kubernetes node
  ///
  /// Downloads the config files and TLS assets of the node's role and writes
  /// them to the local filesystem
  Provision(commands::provision::Provision),
}
