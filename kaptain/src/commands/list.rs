use anyhow::Result;
use clap::Args;

use crate::{client::KaptainClient, registry::ClusterRegistry};

#[derive(Args, Debug)]
pub struct ListClusters {}

impl ListClusters {
  pub async fn run(&self, store_url: &str) -> Result<()> {
    let client = KaptainClient::new(ClusterRegistry::from_url(store_url).await?);

    client.list().await
  }
}
