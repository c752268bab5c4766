use anyhow::Result;
use clap::Parser;
use kaptain::{Cli, Commands};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
  let cli = Cli::parse();
  let subscriber = FmtSubscriber::builder()
    .with_max_level(cli.log_level.filter())
    .without_time()
    .with_ansi(!cli.no_color)
    .finish();
  tracing::subscriber::set_global_default(subscriber).expect("Setting default subscriber failed");

  match &cli.command {
    Commands::Create(create) => create.run(&cli.store).await,
    Commands::Delete(delete) => delete.run(&cli.store).await,
    Commands::Export(export) => export.run(&cli.store).await,
    Commands::Import(import) => import.run(&cli.store).await,
    Commands::ExportConfig(export_config) => export_config.run(&cli.store).await,
    Commands::Bootstrap(bootstrap) => bootstrap.run(&cli.store).await,
    Commands::List(list) => list.run(&cli.store).await,
  }
}
