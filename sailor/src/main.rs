use anyhow::Result;
use clap::Parser;
use kaptain::constants::DEFAULT_STORE_URL;
use sailor::{config::SailorConfig, Cli, Commands};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
  let cli = Cli::parse();
  let config = SailorConfig::load(cli.config.as_deref())?;

  let log_level = match cli.log_level {
    Some(level) => level,
    None => config.log_level()?.unwrap_or_default(),
  };
  let subscriber = FmtSubscriber::builder()
    .with_max_level(log_level.filter())
    .without_time()
    .with_ansi(!cli.no_color)
    .finish();
  tracing::subscriber::set_global_default(subscriber).expect("Setting default subscriber failed");

  let store_url = cli
    .store
    .clone()
    .or(config.store)
    .unwrap_or_else(|| DEFAULT_STORE_URL.to_owned());

  match &cli.command {
    Commands::Provision(provision) => provision.run(&store_url).await,
  }
}
