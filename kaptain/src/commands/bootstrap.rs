use anyhow::Result;
use clap::Args;

use crate::{client::KaptainClient, registry::ClusterRegistry};

#[derive(Args, Debug)]
pub struct BootstrapCluster {
  /// Cluster name of the cluster to be bootstrapped
  #[arg(short, long)]
  pub name: String,
}

impl BootstrapCluster {
  pub async fn run(&self, store_url: &str) -> Result<()> {
    let client = KaptainClient::new(ClusterRegistry::from_url(store_url).await?);

    client.bootstrap(&self.name).await
  }
}
