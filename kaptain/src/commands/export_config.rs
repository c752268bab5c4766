use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::Args;

use crate::{client::KaptainClient, registry::ClusterRegistry};

#[derive(Args, Debug)]
pub struct ExportConfig {
  /// Cluster name of the credential to be exported
  #[arg(short, long)]
  pub name: String,

  /// Username of the credential to be exported
  #[arg(short, long, default_value = "admin")]
  pub user: String,

  /// Path to the output kubeconfig (default ~/.kube/config)
  #[arg(short, long)]
  pub kubeconfig: Option<PathBuf>,

  /// Overwrite existing kubeconfig entries
  #[arg(short, long)]
  pub force: bool,
}

impl ExportConfig {
  pub async fn run(&self, store_url: &str) -> Result<()> {
    let kubeconfig = match &self.kubeconfig {
      Some(path) => path.clone(),
      None => dirs::home_dir()
        .ok_or_else(|| anyhow!("failed to get home directory"))?
        .join(".kube")
        .join("config"),
    };

    let client = KaptainClient::new(ClusterRegistry::from_url(store_url).await?);
    client.export_config(&self.name, &kubeconfig, &self.user, self.force).await
  }
}
