use thiserror::Error;
use tracing::debug;

use crate::{
  api::{Cluster, ClusterFiles},
  store::{self, Store, StoreError},
};

const CLUSTER_SPEC_FILE: &str = "cluster.yaml";

/// Failures surfaced by registry operations, wrapping the underlying store
/// error with the action and key it happened on
#[derive(Debug, Error)]
pub enum RegistryError {
  #[error("cluster name cannot be empty")]
  EmptyName,

  #[error("cluster '{name}' already exists (use --force to override)")]
  AlreadyExists { name: String },

  #[error("failed to parse document at '{key}'")]
  Decode {
    key: String,
    #[source]
    source: serde_yaml::Error,
  },

  #[error("failed to encode document for '{key}'")]
  Encode {
    key: String,
    #[source]
    source: serde_yaml::Error,
  },

  #[error("failed to {action} '{key}'")]
  Store {
    action: &'static str,
    key: String,
    #[source]
    source: StoreError,
  },
}

impl RegistryError {
  fn store(action: &'static str, key: impl Into<String>, source: StoreError) -> Self {
    RegistryError::Store {
      action,
      key: key.into(),
      source,
    }
  }

  /// True when the failure is a plain missing key
  pub fn is_not_found(&self) -> bool {
    matches!(
      self,
      RegistryError::Store {
        source: StoreError::NotFound { .. },
        ..
      }
    )
  }
}

/// ClusterRegistry binds cluster identity to the store layout:
/// `<name>/cluster.yaml` for the cluster document and
/// `<name>/roles/<role>.yaml` for per-role file sets
pub struct ClusterRegistry {
  store: Box<dyn Store>,
}

fn cluster_spec_path(cluster_name: &str) -> String {
  format!("{cluster_name}/{CLUSTER_SPEC_FILE}")
}

fn cluster_files_path(cluster_name: &str, role: &str) -> String {
  format!("{cluster_name}/roles/{role}.yaml")
}

impl ClusterRegistry {
  pub fn new(store: Box<dyn Store>) -> Self {
    ClusterRegistry { store }
  }

  pub async fn from_url(store_url: &str) -> Result<Self, StoreError> {
    Ok(ClusterRegistry::new(store::from_url(store_url).await?))
  }

  /// Unique cluster names, i.e. the child directories of the store root
  pub async fn list(&self) -> Result<Vec<String>, RegistryError> {
    debug!("listing clusters");

    self
      .store
      .list("")
      .await
      .map_err(|err| RegistryError::store("list clusters under", "", err))
  }

  pub async fn exists(&self, cluster_name: &str) -> Result<bool, RegistryError> {
    debug!("checking cluster existence for '{cluster_name}'");

    let key = cluster_spec_path(cluster_name);
    self
      .store
      .exists(&key)
      .await
      .map_err(|err| RegistryError::store("check cluster", key, err))
  }

  pub async fn get(&self, cluster_name: &str) -> Result<Cluster, RegistryError> {
    debug!("getting cluster details for '{cluster_name}'");

    let key = cluster_spec_path(cluster_name);
    let data = self
      .store
      .get(&key)
      .await
      .map_err(|err| RegistryError::store("get cluster", key.clone(), err))?;

    serde_yaml::from_slice(&data).map_err(|err| RegistryError::Decode { key, source: err })
  }

  /// Persist the cluster document. An existing cluster of the same name is
  /// only overwritten when `force` is set
  pub async fn create(&self, cluster: &Cluster, force: bool) -> Result<(), RegistryError> {
    let cluster_name = cluster.name();
    if cluster_name.is_empty() {
      return Err(RegistryError::EmptyName);
    }

    if self.exists(cluster_name).await? && !force {
      return Err(RegistryError::AlreadyExists {
        name: cluster_name.to_owned(),
      });
    }

    debug!("creating new cluster '{cluster_name}'");

    let key = cluster_spec_path(cluster_name);
    let data = serde_yaml::to_string(cluster).map_err(|err| RegistryError::Encode {
      key: key.clone(),
      source: err,
    })?;

    self
      .store
      .set(&key, data.as_bytes())
      .await
      .map_err(|err| RegistryError::store("create cluster", key, err))
  }

  /// Remove the cluster document and every role file set under its name
  pub async fn delete(&self, cluster_name: &str) -> Result<(), RegistryError> {
    debug!("deleting cluster '{cluster_name}'");

    self
      .store
      .delete_all(cluster_name)
      .await
      .map_err(|err| RegistryError::store("delete cluster", cluster_name.to_owned(), err))
  }

  pub async fn get_files(&self, cluster_name: &str, role: &str) -> Result<ClusterFiles, RegistryError> {
    debug!("get cluster files for '{cluster_name}' as role '{role}'");

    let key = cluster_files_path(cluster_name, role);
    let data = self
      .store
      .get(&key)
      .await
      .map_err(|err| RegistryError::store("get cluster files", key.clone(), err))?;

    serde_yaml::from_slice(&data).map_err(|err| RegistryError::Decode { key, source: err })
  }

  pub async fn set_files(
    &self,
    cluster_name: &str,
    role: &str,
    cluster_files: &ClusterFiles,
  ) -> Result<(), RegistryError> {
    debug!("set cluster files for '{cluster_name}' as role '{role}'");

    let key = cluster_files_path(cluster_name, role);
    let data = serde_yaml::to_string(cluster_files).map_err(|err| RegistryError::Encode {
      key: key.clone(),
      source: err,
    })?;

    self
      .store
      .set(&key, data.as_bytes())
      .await
      .map_err(|err| RegistryError::store("set cluster files", key, err))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{api::ClusterFile, store::memory::MemoryStore};

  fn registry() -> ClusterRegistry {
    ClusterRegistry::new(Box::new(MemoryStore::new()))
  }

  fn named_cluster(name: &str) -> Cluster {
    let mut cluster = Cluster::new();
    cluster.metadata.name = name.to_owned();
    cluster
  }

  #[tokio::test]
  async fn it_round_trips_cluster_documents() {
    let registry = registry();
    let mut cluster = named_cluster("dev.test.waws");
    cluster.spec.kube_version = "v1.10.1".to_owned();

    registry.create(&cluster, false).await.unwrap();

    assert!(registry.exists("dev.test.waws").await.unwrap());
    let fetched = registry.get("dev.test.waws").await.unwrap();
    assert_eq!(fetched.metadata.name, "dev.test.waws");
    assert_eq!(fetched.spec.kube_version, "v1.10.1");
    assert_eq!(registry.list().await.unwrap(), vec!["dev.test.waws"]);
  }

  #[tokio::test]
  async fn it_refuses_overwrite_without_force() {
    let registry = registry();
    let mut cluster = named_cluster("dev.test.waws");
    cluster.spec.kube_version = "v1.10.1".to_owned();
    registry.create(&cluster, false).await.unwrap();

    let mut updated = cluster.clone();
    updated.spec.kube_version = "v1.11.0".to_owned();

    let err = registry.create(&updated, false).await.unwrap_err();
    assert!(matches!(err, RegistryError::AlreadyExists { .. }));

    // the stored document must be untouched
    let fetched = registry.get("dev.test.waws").await.unwrap();
    assert_eq!(fetched.spec.kube_version, "v1.10.1");

    registry.create(&updated, true).await.unwrap();
    let fetched = registry.get("dev.test.waws").await.unwrap();
    assert_eq!(fetched.spec.kube_version, "v1.11.0");
  }

  #[tokio::test]
  async fn it_rejects_empty_cluster_names() {
    let registry = registry();

    let err = registry.create(&Cluster::new(), false).await.unwrap_err();
    assert!(matches!(err, RegistryError::EmptyName));
  }

  #[tokio::test]
  async fn it_deletes_the_whole_cluster_tree() {
    let registry = registry();
    let cluster = named_cluster("dev.test.waws");
    registry.create(&cluster, false).await.unwrap();

    let mut files = ClusterFiles::new();
    files.spec.files.push(ClusterFile::new("etc/sysconfig/docker", b"OPTIONS="));
    registry.set_files("dev.test.waws", "worker", &files).await.unwrap();

    registry.delete("dev.test.waws").await.unwrap();

    assert!(!registry.exists("dev.test.waws").await.unwrap());
    assert!(registry.list().await.unwrap().is_empty());
    assert!(registry.get_files("dev.test.waws", "worker").await.unwrap_err().is_not_found());
  }

  #[tokio::test]
  async fn it_round_trips_role_files() {
    let registry = registry();

    let mut files = ClusterFiles::new();
    files.spec.files.push(ClusterFile::new("etc/pki/tls/certs/etcd-ca.pem", b"pem bytes"));
    registry.set_files("dev.test.waws", "etcd", &files).await.unwrap();

    let fetched = registry.get_files("dev.test.waws", "etcd").await.unwrap();
    assert_eq!(fetched.spec.files, files.spec.files);
  }

  #[tokio::test]
  async fn it_reports_missing_clusters_as_not_found() {
    let registry = registry();

    let err = registry.get("missing").await.unwrap_err();
    assert!(err.is_not_found());
  }
}
