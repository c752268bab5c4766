use anyhow::{bail, Result};
use clap::Args;

use crate::{client::KaptainClient, registry::ClusterRegistry};

#[derive(Args, Debug)]
pub struct DeleteCluster {
  /// Cluster name
  #[arg(short, long)]
  pub name: String,
}

impl DeleteCluster {
  pub async fn run(&self, store_url: &str) -> Result<()> {
    let client = KaptainClient::new(ClusterRegistry::from_url(store_url).await?);

    if client.get(&self.name).await.is_err() {
      bail!("unable to delete cluster: cluster '{}' not found", self.name);
    }

    client.delete(&self.name).await
  }
}
