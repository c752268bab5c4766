use anyhow::{Context, Result};
use clap::Args;

use crate::{client::KaptainClient, registry::ClusterRegistry};

#[derive(Args, Debug)]
pub struct ExportCluster {
  /// Cluster name
  #[arg(short, long)]
  pub name: String,
}

impl ExportCluster {
  pub async fn run(&self, store_url: &str) -> Result<()> {
    let client = KaptainClient::new(ClusterRegistry::from_url(store_url).await?);

    let cluster = client.get(&self.name).await?;
    let data = serde_yaml::to_string(&cluster).context("failed to serialise cluster")?;

    println!("{data}");

    Ok(())
  }
}
