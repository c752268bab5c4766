use std::path::PathBuf;

use anyhow::{anyhow, bail, Result};
use base64::{engine::general_purpose, Engine as _};
use clap::Args;
use tracing::info;

use crate::{
  api::{Cluster, EtcdCluster, EtcdMember},
  client::KaptainClient,
  constants::{
    DEFAULT_CLOUD_PROVIDER, DEFAULT_ETCD_SERVERS, DEFAULT_KUBE_IMAGE_PROXY, DEFAULT_KUBE_VERSION,
    DEFAULT_MASTER_PORT,
  },
  inflator::{self, InflateOptions},
  registry::ClusterRegistry,
};

#[derive(Args, Debug, Default)]
pub struct CreateCluster {
  /// Cluster name
  #[arg(short, long)]
  pub name: String,

  /// Kubernetes version of the form vX.Y.Z
  #[arg(long, default_value = DEFAULT_KUBE_VERSION)]
  pub kube_version: String,

  /// DNS domain (default <cluster_name>)
  #[arg(long)]
  pub dns_domain: Option<String>,

  /// Cloud provider (aws or vsphere)
  #[arg(long, default_value = DEFAULT_CLOUD_PROVIDER)]
  pub cloud_provider: String,

  /// Comma-separated ETCD server hostnames
  #[arg(long, default_value = DEFAULT_ETCD_SERVERS)]
  pub etcd_servers: String,

  /// Use a proxy to download gcr.io images (e.g. gcr.io/google_containers/kube-apiserver)
  #[arg(long, default_value = DEFAULT_KUBE_IMAGE_PROXY)]
  pub docker_kube_image_proxy: String,

  /// Insecure Docker registry to allow, repeatable
  #[arg(long = "docker-insecure-registry")]
  pub docker_insecure_registries: Vec<String>,

  /// Docker registry mirror to add, repeatable
  #[arg(long = "docker-registry-mirror")]
  pub docker_registry_mirrors: Vec<String>,

  /// Kubernetes API server name (default api.<cluster_name>)
  #[arg(long = "apiserver")]
  pub apiserver: Option<String>,

  /// Kubernetes API server listen port
  #[arg(long = "apiserver-port", default_value_t = DEFAULT_MASTER_PORT)]
  pub apiserver_port: u16,

  /// VSphere username
  #[arg(long)]
  pub vsphere_username: Option<String>,

  /// VSphere password
  #[arg(long)]
  pub vsphere_password: Option<String>,

  /// VSphere server
  #[arg(long)]
  pub vsphere_server: Option<String>,

  /// VSphere datacenter
  #[arg(long)]
  pub vsphere_datacenter: Option<String>,

  /// VSphere datastore
  #[arg(long)]
  pub vsphere_datastore: Option<String>,

  /// VSphere working directory
  #[arg(long)]
  pub vsphere_workingdir: Option<String>,

  /// Kubernetes authentication webhook config file,
  /// see https://kubernetes.io/docs/admin/authentication/#webhook-token-authentication
  #[arg(long)]
  pub authentication_token_webhook_config_file: Option<PathBuf>,

  /// Kubernetes authentication webhook cache TTL
  #[arg(long, default_value = "2m0s")]
  pub authentication_token_webhook_cache_ttl: String,

  /// Enable PodSecurityPolicy, see 'cluster/pod-security-policy' for set up details
  #[arg(long)]
  pub enable_pod_security_policy: bool,
}

impl CreateCluster {
  /// Validate the flag combination and build the initial cluster document.
  /// Every validation failure here happens before the store is touched
  pub fn to_cluster(&self) -> Result<Cluster> {
    if self.name.is_empty() {
      bail!("--name must be set");
    }

    let mut cluster = Cluster::new();
    cluster.metadata.name = self.name.clone();
    cluster.spec.kube_version = self.kube_version.clone();
    cluster.spec.master_port = self.apiserver_port;
    cluster.spec.cloud_provider = self.cloud_provider.clone();
    cluster.spec.docker_opts.kube_image_proxy = self.docker_kube_image_proxy.clone();
    cluster.spec.docker_opts.insecure_registries = self.docker_insecure_registries.clone();
    cluster.spec.docker_opts.registry_mirrors = self.docker_registry_mirrors.clone();
    cluster.spec.pod_security_policy_opts.enabled = self.enable_pod_security_policy;
    cluster.spec.authentication_token_webhook_opts.cache_ttl =
      self.authentication_token_webhook_cache_ttl.clone();
    cluster.spec.etcd_cluster = new_etcd_cluster(&self.etcd_servers);

    cluster.spec.dns_domain = match &self.dns_domain {
      Some(dns_domain) => dns_domain.clone(),
      None => {
        info!("--dns-domain not specified, using cluster name '{}'", self.name);
        self.name.clone()
      }
    };

    cluster.spec.master_public_name = match &self.apiserver {
      Some(apiserver) => apiserver.clone(),
      None => {
        info!("--apiserver not specified, using default 'api.{}'", self.name);
        format!("api.{}", self.name)
      }
    };

    match self.cloud_provider.as_str() {
      "aws" => {}
      "vsphere" => {
        let vsphere = &mut cluster.spec.vsphere_opts;
        vsphere.username = require_flag(&self.vsphere_username, "--vsphere-username")?;
        vsphere.password = require_flag(&self.vsphere_password, "--vsphere-password")?;
        vsphere.server = require_flag(&self.vsphere_server, "--vsphere-server")?;
        vsphere.data_center = require_flag(&self.vsphere_datacenter, "--vsphere-datacenter")?;
        vsphere.data_store = require_flag(&self.vsphere_datastore, "--vsphere-datastore")?;
        vsphere.working_dir = require_flag(&self.vsphere_workingdir, "--vsphere-workingdir")?;

        cluster.spec.cloud_config = "/var/lib/kubernetes/cloud.conf".to_owned();
        // provided by the orchestration tool that deploys the node
        cluster.spec.worker_cloud_config = "/var/lib/kubelet/cloud.conf".to_owned();
      }
      _ => bail!("--cloud-provider must be one of 'aws' or 'vsphere'"),
    }

    if let Some(webhook_config_file) = &self.authentication_token_webhook_config_file {
      let webhook_config = std::fs::read(webhook_config_file)?;
      cluster.spec.authentication_token_webhook_opts.config_data_base64 =
        general_purpose::STANDARD.encode(webhook_config);
    }

    Ok(cluster)
  }

  pub async fn run(&self, store_url: &str) -> Result<()> {
    let mut cluster = self.to_cluster()?;

    inflator::inflate_cluster(&mut cluster, &InflateOptions::all())?;

    let client = KaptainClient::new(ClusterRegistry::from_url(store_url).await?);
    client.create(&cluster, false).await
  }
}

fn require_flag(value: &Option<String>, flag: &str) -> Result<String> {
  value
    .as_ref()
    .filter(|v| !v.is_empty())
    .cloned()
    .ok_or_else(|| anyhow!("{flag} must be set"))
}

fn new_etcd_cluster(etcd_servers: &str) -> EtcdCluster {
  EtcdCluster {
    members: etcd_servers
      .split(',')
      .map(|hostname| EtcdMember {
        hostname: hostname.to_owned(),
      })
      .collect(),
  }
}
