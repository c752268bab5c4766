use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use crate::{
  api::Cluster,
  kubeconfig, kubectl,
  registry::ClusterRegistry,
  renderer,
};

const ROLES: [&str; 4] = ["etcd", "master", "worker", "bootstrapper"];

/// Control-plane client driving the create/delete/export lifecycle through a
/// cluster registry
pub struct KaptainClient {
  pub registry: ClusterRegistry,
}

impl KaptainClient {
  pub fn new(registry: ClusterRegistry) -> Self {
    KaptainClient { registry }
  }

  pub async fn list(&self) -> Result<()> {
    let cluster_names = self.registry.list().await.context("failed to list clusters")?;

    println!("NAME");
    for name in cluster_names {
      println!("{name}");
    }

    Ok(())
  }

  /// Persist the cluster document, then render and persist the file set of
  /// every role. The cluster document is always written first so a partial
  /// failure never leaves role files referencing no cluster
  pub async fn create(&self, cluster: &Cluster, force: bool) -> Result<()> {
    self.registry.create(cluster, force).await?;

    for role in ROLES {
      let cluster_files = renderer::create_files_from_cluster(role, cluster)
        .with_context(|| format!("failed to render cluster files for {role}"))?;

      self
        .registry
        .set_files(cluster.name(), role, &cluster_files)
        .await
        .with_context(|| format!("failed to write cluster files for {role}"))?;
    }

    Ok(())
  }

  pub async fn delete(&self, cluster_name: &str) -> Result<()> {
    self.registry.delete(cluster_name).await.map_err(anyhow::Error::from)
  }

  pub async fn get(&self, cluster_name: &str) -> Result<Cluster> {
    self.registry.get(cluster_name).await.context("failed to read cluster")
  }

  /// Merge the named user's credential for the cluster into a kubeconfig
  /// file on disk
  pub async fn export_config(
    &self,
    cluster_name: &str,
    kube_config_path: &Path,
    username: &str,
    overwrite: bool,
  ) -> Result<()> {
    let cluster = self.get(cluster_name).await?;

    kubeconfig::export_kube_config(&cluster, kube_config_path, username, overwrite)
      .context("failed to export cluster config")
  }

  /// Apply the bootstrapper role's addon manifests to the running cluster
  /// once the apiserver answers
  pub async fn bootstrap(&self, cluster_name: &str) -> Result<()> {
    let addon_files = self
      .registry
      .get_files(cluster_name, "bootstrapper")
      .await
      .with_context(|| format!("failed to get addon files for {cluster_name}"))?;

    kubectl::kube_wait_for_apiserver(cluster_name).await?;

    for file in &addon_files.spec.files {
      let data = file.data()?;
      kubectl::kube_apply(cluster_name, &file.path, &data)
        .with_context(|| format!("failed to apply kube addon {}", file.path))?;
    }

    info!("cluster bootstrapped! The containers might take a few minutes to start.");

    Ok(())
  }
}
