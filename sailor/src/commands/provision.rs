use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, ValueEnum};
use kaptain::registry::ClusterRegistry;
use tracing::{debug, info};

use crate::provisioner;

#[derive(Args, Debug)]
pub struct Provision {
  /// Cluster name
  #[arg(short, long)]
  pub name: String,

  /// Node role within the cluster
  #[arg(long, value_enum)]
  pub role: Role,

  /// Base directory for writing all the files to
  #[arg(long, default_value = "/")]
  pub prefix: PathBuf,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum Role {
  Etcd,
  Master,
  Worker,
}

impl Role {
  fn as_str(&self) -> &'static str {
    match self {
      Role::Etcd => "etcd",
      Role::Master => "master",
      Role::Worker => "worker",
    }
  }
}

impl Provision {
  pub async fn run(&self, store_url: &str) -> Result<()> {
    let role = self.role.as_str();
    info!(cluster = %self.name, role, "SAILOR: provisioning node");

    let registry = ClusterRegistry::from_url(store_url).await?;

    debug!(cluster = %self.name, role, "SAILOR: fetching cluster files");
    let cluster_files = registry.get_files(&self.name, role).await?;

    info!(cluster = %self.name, role, "SAILOR: writing all files with prefix: {}", self.prefix.display());
    provisioner::write_all(&self.prefix, &cluster_files.spec.files)
  }
}
