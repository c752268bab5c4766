use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;

use crate::{
  api::Cluster,
  client::KaptainClient,
  inflator::{self, InflateOptions},
  registry::ClusterRegistry,
};

#[derive(Args, Debug)]
pub struct ImportCluster {
  /// Cluster spec file to be applied
  #[arg(short, long)]
  pub file: PathBuf,

  /// Update missing cluster spec
  #[arg(long)]
  pub update_spec: bool,

  /// Update missing PKIs
  #[arg(long)]
  pub update_pkis: bool,

  /// Update missing tokens
  #[arg(long)]
  pub update_tokens: bool,

  /// Update asset manifest
  #[arg(long)]
  pub update_asset_manifest: bool,
}

impl ImportCluster {
  fn inflate_options(&self) -> InflateOptions {
    InflateOptions {
      update_spec: self.update_spec,
      update_pkis: self.update_pkis,
      update_tokens: self.update_tokens,
      update_asset_manifest: self.update_asset_manifest,
    }
  }

  pub async fn run(&self, store_url: &str) -> Result<()> {
    let data = std::fs::read(&self.file)
      .with_context(|| format!("failed to read {}", self.file.display()))?;
    let mut cluster: Cluster = serde_yaml::from_slice(&data)
      .with_context(|| format!("failed to parse cluster spec {}", self.file.display()))?;

    inflator::inflate_cluster(&mut cluster, &self.inflate_options())?;

    let client = KaptainClient::new(ClusterRegistry::from_url(store_url).await?);

    if client.get(cluster.name()).await.is_ok() {
      bail!("unable to import cluster: a cluster with the same name already exists");
    }

    client.create(&cluster, true).await
  }
}
