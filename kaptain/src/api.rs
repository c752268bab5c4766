use std::collections::BTreeMap;

use anyhow::{Context, Result};
use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};

use crate::version;

const API_NAMESPACE: &str = "k8s.io/kaptain";

/// Cluster is the full representation of a Kubernetes cluster that can be
/// used to reproduce a cluster set up
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cluster {
  /// Kind is a string value representing the REST resource this object represents
  pub kind: String,

  /// APIVersion defines the versioned schema of this representation of an object
  pub api_version: String,

  #[serde(default)]
  pub metadata: ObjectMeta,

  pub spec: ClusterSpec,

  #[serde(default)]
  pub asset_manifest: AssetManifestSpec,

  #[serde(default)]
  pub secrets: ClusterSecrets,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
  #[serde(default)]
  pub name: String,

  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub annotations: BTreeMap<String, String>,
}

impl Cluster {
  /// Create an empty cluster document with build provenance annotations
  pub fn new() -> Self {
    let build = version::get_version();

    let mut annotations = BTreeMap::new();
    annotations.insert(annotation_full_name("version"), build.version);
    annotations.insert(annotation_full_name("git-commit"), build.git_commit);
    annotations.insert(annotation_full_name("git-tree-state"), build.git_tree_state);

    Cluster {
      kind: "Cluster".to_owned(),
      api_version: "v1".to_owned(),
      metadata: ObjectMeta {
        name: String::new(),
        annotations,
      },
      ..Cluster::default()
    }
  }

  pub fn name(&self) -> &str {
    &self.metadata.name
  }
}

fn annotation_full_name(field: &str) -> String {
  format!("{API_NAMESPACE}/{field}")
}

/// ClusterSpec is the spec that defines the property of a cluster
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSpec {
  /// Version of Kubernetes, of the form vX.Y.Z
  pub kube_version: String,

  /// Public hostname of the apiserver
  pub master_public_name: String,

  pub master_port: u16,

  pub dns_domain: String,

  #[serde(default, rename = "podCIDR")]
  pub pod_cidr: String,

  #[serde(default, rename = "serviceCIDR")]
  pub service_cidr: String,

  #[serde(default, rename = "dnsClusterIP")]
  pub dns_cluster_ip: String,

  /// Cloud provider selector, one of "aws" or "vsphere"
  pub cloud_provider: String,

  /// Path of the cloud-config file on master nodes
  #[serde(default)]
  pub cloud_config: String,

  /// Path of the cloud-config file on worker nodes, provided out-of-band by
  /// the tool that deploys the node
  #[serde(default)]
  pub worker_cloud_config: String,

  #[serde(default)]
  pub docker_opts: DockerOpts,

  #[serde(default)]
  pub vsphere_opts: VSphereOpts,

  #[serde(default)]
  pub pod_security_policy_opts: PodSecurityPolicyOpts,

  #[serde(default)]
  pub authentication_token_webhook_opts: AuthenticationTokenWebhookOpts,

  #[serde(default)]
  pub etcd_cluster: EtcdCluster,
}

/// ClusterSecrets stores PKI and token secrets used to secure the cluster
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSecrets {
  #[serde(default)]
  pub pkis: BTreeMap<String, CertPair>,

  #[serde(default)]
  pub token_secrets: BTreeMap<String, TokenSecret>,
}

/// DockerOpts is the configurable options for Docker
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DockerOpts {
  #[serde(default)]
  pub insecure_registries: Vec<String>,

  #[serde(default)]
  pub registry_mirrors: Vec<String>,

  #[serde(default)]
  pub kube_image_proxy: String,
}

/// VSphereOpts is the configuration options for when VSphere is used as the
/// cloud provider
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VSphereOpts {
  #[serde(default)]
  pub username: String,
  #[serde(default)]
  pub password: String,
  #[serde(default)]
  pub server: String,
  #[serde(default)]
  pub data_center: String,
  #[serde(default)]
  pub data_store: String,
  #[serde(default)]
  pub working_dir: String,
}

/// AuthenticationTokenWebhookOpts is the configurable options for when
/// authentication token webhook is used
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationTokenWebhookOpts {
  /// Base64 encoded content of the webhook config file
  #[serde(default)]
  pub config_data_base64: String,

  #[serde(default, rename = "cacheTTL")]
  pub cache_ttl: String,
}

/// PodSecurityPolicyOpts is the configurable options for PodSecurityPolicy
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodSecurityPolicyOpts {
  #[serde(default)]
  pub enabled: bool,
}

/// EtcdCluster contains information about the ETCD cluster used by Kubernetes
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EtcdCluster {
  #[serde(default)]
  pub members: Vec<EtcdMember>,
}

/// EtcdMember contains information about a single ETCD node. The FQDN of the
/// member is derived as `<hostname>.<dnsDomain>`
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EtcdMember {
  pub hostname: String,
}

/// CertPair contains base64 encoded PEM cert and key data
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertPair {
  pub cert_data: String,
  pub key_data: String,
}

impl CertPair {
  /// The x509 certificate PEM bytes
  pub fn cert_data(&self) -> Result<Vec<u8>> {
    general_purpose::STANDARD
      .decode(&self.cert_data)
      .context("failed to decode x509 cert data")
  }

  /// The RSA private key PEM bytes
  pub fn key_data(&self) -> Result<Vec<u8>> {
    general_purpose::STANDARD
      .decode(&self.key_data)
      .context("failed to decode x509 key data")
  }
}

/// TokenSecret contains information about a bearer token used for apiserver
/// authentication
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenSecret {
  pub username: String,
  pub token: String,
  pub uid: u32,
  pub groups: Vec<String>,
}

/// AssetManifest is the document form of the per-version asset manifest
/// embedded in the binary
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetManifest {
  #[serde(default)]
  pub kind: String,

  #[serde(default)]
  pub api_version: String,

  #[serde(default)]
  pub metadata: ObjectMeta,

  pub spec: AssetManifestSpec,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetManifestSpec {
  #[serde(default)]
  pub addons: Vec<NodeFile>,

  #[serde(default)]
  pub files: Vec<NodeFile>,
}

/// NodeFile pins a specific version of a node config file template from the
/// embedded asset bundle
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeFile {
  pub name: String,
  pub version: String,
}

impl std::fmt::Display for NodeFile {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}@{}", self.name, self.version)
  }
}

/// ClusterFiles is the per-role document holding every file a node of that
/// role needs on its filesystem
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterFiles {
  pub kind: String,

  pub api_version: String,

  #[serde(default)]
  pub metadata: ObjectMeta,

  pub spec: ClusterFilesSpec,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterFilesSpec {
  #[serde(default)]
  pub files: Vec<ClusterFile>,
}

impl ClusterFiles {
  pub fn new() -> Self {
    ClusterFiles {
      kind: "ClusterFiles".to_owned(),
      api_version: "v1".to_owned(),
      ..ClusterFiles::default()
    }
  }
}

/// ClusterFile represents a single file to be provisioned on a cluster node.
/// The path is relative to the node's provisioning prefix
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterFile {
  pub path: String,

  #[serde(rename = "data")]
  pub data_base64: String,
}

impl ClusterFile {
  pub fn new(path: &str, data: &[u8]) -> Self {
    ClusterFile {
      path: path.to_owned(),
      data_base64: general_purpose::STANDARD.encode(data),
    }
  }

  pub fn data(&self) -> Result<Vec<u8>> {
    general_purpose::STANDARD
      .decode(&self.data_base64)
      .with_context(|| format!("failed to decode data for {}", self.path))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn it_stamps_provenance_annotations() {
    let cluster = Cluster::new();

    assert_eq!(cluster.kind, "Cluster");
    assert_eq!(cluster.api_version, "v1");
    assert!(cluster.metadata.annotations.contains_key("k8s.io/kaptain/version"));
    assert!(cluster.metadata.annotations.contains_key("k8s.io/kaptain/git-commit"));
    assert!(cluster.metadata.annotations.contains_key("k8s.io/kaptain/git-tree-state"));
  }

  #[test]
  fn it_round_trips_cluster_yaml() {
    let mut cluster = Cluster::new();
    cluster.metadata.name = "dev.test.waws".to_owned();
    cluster.spec.kube_version = "v1.10.1".to_owned();
    cluster.spec.etcd_cluster.members = vec![EtcdMember {
      hostname: "etcd-k8s-0".to_owned(),
    }];
    cluster.secrets.token_secrets.insert(
      "admin".to_owned(),
      TokenSecret {
        username: "admin".to_owned(),
        token: "sEcReT".to_owned(),
        uid: 1,
        groups: vec!["system:masters".to_owned()],
      },
    );

    let encoded = serde_yaml::to_string(&cluster).unwrap();
    let decoded: Cluster = serde_yaml::from_str(&encoded).unwrap();

    assert_eq!(decoded.metadata.name, "dev.test.waws");
    assert_eq!(decoded.spec.kube_version, "v1.10.1");
    assert_eq!(decoded.spec.etcd_cluster.members[0].hostname, "etcd-k8s-0");
    assert_eq!(decoded.secrets.token_secrets, cluster.secrets.token_secrets);
  }

  #[test]
  fn it_round_trips_cluster_file_data() {
    let file = ClusterFile::new("etc/sysconfig/docker", b"OPTIONS=--log-driver=json-file");

    assert_eq!(file.data().unwrap(), b"OPTIONS=--log-driver=json-file");
  }

  #[test]
  fn it_formats_node_file_reference() {
    let nf = NodeFile {
      name: "manifest.kube-apiserver".to_owned(),
      version: "1.10.1".to_owned(),
    };

    assert_eq!(nf.to_string(), "manifest.kube-apiserver@1.10.1");
  }
}
