use std::collections::BTreeMap;

use anyhow::{anyhow, Context, Result};

use crate::{
  api::{Cluster, ClusterFile, ClusterFiles, NodeFile, TokenSecret},
  assets,
  constants::*,
  kubeconfig::{self, KubeConfig},
};

/// Project the cluster into the file set a node of the given role needs
pub fn create_files_from_cluster(role: &str, cluster: &Cluster) -> Result<ClusterFiles> {
  let mut r = Renderer::new(cluster);

  match role {
    "etcd" => create_etcd_files(&mut r),
    "master" => create_master_files(&mut r),
    "worker" => create_worker_files(&mut r),
    "bootstrapper" => create_bootstrapper_files(&mut r),
    _ => return Err(anyhow!("invalid role: {role}")),
  }

  r.finish()
}

fn create_etcd_files(r: &mut Renderer) {
  r.render_x509_cert("etcd-ca", ETCD_CA_CERT);
  r.render_x509_cert("etcd-server", ETCD_SERVER_CERT);
  r.render_x509_key("etcd-server", ETCD_SERVER_KEY);
}

fn create_master_files(r: &mut Renderer) {
  // common files
  create_kube_node_files(r);

  // master specific files
  r.render_node_file("sysconfig.kubelet.master", SYSCONFIG_KUBELET_EXTRA);

  // PKIs
  r.render_x509_cert("etcd-ca", KUBE_ETCD_CA);
  r.render_x509_cert("etcd-client", KUBE_ETCD_CLIENT_CERT);
  r.render_x509_key("etcd-client", KUBE_ETCD_CLIENT_KEY);
  r.render_x509_cert("kube-ca", KUBE_CA_CERT);
  r.render_x509_key("kube-ca", KUBE_CA_KEY);
  r.render_x509_cert("kubernetes", KUBE_CERT);
  r.render_x509_key("kubernetes", KUBE_KEY);

  // Tokens
  r.render_token_csv(KUBE_TOKEN_CSV);

  // Kubeconfigs
  r.render_kube_config(
    kubeconfig::make_x509_config(r.cluster, "kube-controller-manager"),
    KUBE_CONTROLLER_MANAGER_CONFIG,
  );
  r.render_kube_config(kubeconfig::make_x509_config(r.cluster, "kube-scheduler"), KUBE_SCHEDULER_CONFIG);
  r.render_kube_config(kubeconfig::make_kubelet_master_config(r.cluster), KUBELET_CONFIG);

  // Manifests
  r.render_node_file("manifest.kube-apiserver", KUBE_MANIFEST_APISERVER);
  r.render_node_file("manifest.kube-controller-manager", KUBE_MANIFEST_CONTROLLER_MANAGER);
  r.render_node_file("manifest.kube-scheduler", KUBE_MANIFEST_SCHEDULER);

  // Cloud provider specific config
  if r.cluster.spec.cloud_provider == "vsphere" {
    r.render_node_file("config.cloud-config.vsphere", KUBE_CLOUD_CONFIG);
  }

  // Auth token webhook specific config
  if !r.cluster.spec.authentication_token_webhook_opts.config_data_base64.is_empty() {
    let data = r.cluster.spec.authentication_token_webhook_opts.config_data_base64.clone();
    r.render_data_base64(&data, AUTH_TOKEN_WEBHOOK_CONFIG);
  }
}

fn create_worker_files(r: &mut Renderer) {
  // common files
  create_kube_node_files(r);

  // worker specific files
  r.render_node_file("sysconfig.kubelet.worker", SYSCONFIG_KUBELET_EXTRA);
  r.render_kube_config(kubeconfig::make_kubelet_bootstrap_config(r.cluster), KUBELET_BOOTSTRAP_CONFIG);
}

fn create_bootstrapper_files(r: &mut Renderer) {
  r.render_addon("rbac-kube-system");
  r.render_addon("rbac-node-bootstrap");
  r.render_addon("calico");
  r.render_addon("coredns");
  r.render_addon("heapster");
  r.render_addon("node-problem-detector");

  match r.cluster.spec.cloud_provider.as_str() {
    "aws" => r.render_addon("storageclass.aws"),
    "vsphere" => r.render_addon("storageclass.vsphere"),
    _ => {}
  }
}

fn create_kube_node_files(r: &mut Renderer) {
  r.render_node_file("config.docker-daemon", DOCKER_DAEMON_CONFIG);
  r.render_node_file("sysconfig.docker", SYSCONFIG_DOCKER);
  r.render_node_file("sysconfig.kubelet", SYSCONFIG_KUBELET);
  r.render_node_file("sysconfig.kube-proxy", SYSCONFIG_KUBE_PROXY);

  r.render_kube_config(kubeconfig::make_x509_config(r.cluster, "kube-proxy"), KUBE_PROXY_CONFIG);
}

/// Renderer accumulates cluster files until the first failure; once an
/// operation fails, every later operation is a no-op and the first error is
/// returned by `finish`
struct Renderer<'a> {
  cluster: &'a Cluster,

  files: BTreeMap<String, NodeFile>,
  addons: BTreeMap<String, NodeFile>,
  err: Option<anyhow::Error>,

  cluster_files: ClusterFiles,
}

fn index_by_name(files: &[NodeFile]) -> BTreeMap<String, NodeFile> {
  files.iter().map(|f| (f.name.clone(), f.clone())).collect()
}

impl<'a> Renderer<'a> {
  fn new(cluster: &'a Cluster) -> Self {
    Renderer {
      cluster,
      files: index_by_name(&cluster.asset_manifest.files),
      addons: index_by_name(&cluster.asset_manifest.addons),
      err: None,
      cluster_files: ClusterFiles::new(),
    }
  }

  fn finish(self) -> Result<ClusterFiles> {
    match self.err {
      Some(err) => Err(err),
      None => Ok(self.cluster_files),
    }
  }

  fn append(&mut self, file: ClusterFile) {
    self.cluster_files.spec.files.push(file);
  }

  fn latch<T>(&mut self, result: Result<T>) -> Option<T> {
    match result {
      Ok(value) => Some(value),
      Err(err) => {
        self.err = Some(err);
        None
      }
    }
  }

  fn render_node_file(&mut self, template_name: &str, path: &str) {
    if self.err.is_some() {
      return;
    }

    let node_file = match self.files.get(template_name) {
      Some(node_file) => node_file.clone(),
      None => {
        self.err = Some(anyhow!("node file template not found: {template_name}"));
        return;
      }
    };

    let template_path = format!("assets/files/{}/{}", node_file.name, node_file.version);
    if let Some(data) = self.latch(assets::render_template(&template_path, self.cluster)) {
      self.append(ClusterFile::new(path, &data));
    }
  }

  fn render_addon(&mut self, template_name: &str) {
    if self.err.is_some() {
      return;
    }

    let addon = match self.addons.get(template_name) {
      Some(addon) => addon.clone(),
      None => {
        self.err = Some(anyhow!("addon template not found: {template_name}"));
        return;
      }
    };

    let template_path = format!("assets/addons/{}/{}.yaml", addon.name, addon.version);
    if let Some(data) = self.latch(assets::render_template(&template_path, self.cluster)) {
      self.append(ClusterFile::new(&addon.name, &data));
    }
  }

  fn render_kube_config(&mut self, config: Result<KubeConfig>, path: &str) {
    if self.err.is_some() {
      return;
    }

    if let Some(data) = self.latch(config.and_then(|c| c.to_yaml())) {
      self.append(ClusterFile::new(path, &data));
    }
  }

  fn render_x509_cert(&mut self, name: &str, path: &str) {
    if self.err.is_some() {
      return;
    }

    let result = self
      .cluster
      .secrets
      .pkis
      .get(name)
      .ok_or_else(|| anyhow!("PKI not found: {name}"))
      .and_then(|pair| pair.cert_data());
    if let Some(data) = self.latch(result) {
      self.append(ClusterFile::new(path, &data));
    }
  }

  fn render_x509_key(&mut self, name: &str, path: &str) {
    if self.err.is_some() {
      return;
    }

    let result = self
      .cluster
      .secrets
      .pkis
      .get(name)
      .ok_or_else(|| anyhow!("PKI not found: {name}"))
      .and_then(|pair| pair.key_data());
    if let Some(data) = self.latch(result) {
      self.append(ClusterFile::new(path, &data));
    }
  }

  fn render_token_csv(&mut self, path: &str) {
    if self.err.is_some() {
      return;
    }

    if let Some(data) = self.latch(make_token_csv(&self.cluster.secrets.token_secrets)) {
      self.append(ClusterFile::new(path, &data));
    }
  }

  fn render_data_base64(&mut self, data_base64: &str, path: &str) {
    if self.err.is_some() {
      return;
    }

    self.append(ClusterFile {
      path: path.to_owned(),
      data_base64: data_base64.to_owned(),
    });
  }
}

/// token.csv for the apiserver: one row per token with the comma-joined
/// group list as the final quoted field
fn make_token_csv(token_secrets: &BTreeMap<String, TokenSecret>) -> Result<Vec<u8>> {
  let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(vec![]);

  for secret in token_secrets.values() {
    let uid = secret.uid.to_string();
    let groups = secret.groups.join(",");
    writer
      .write_record([secret.token.as_str(), secret.username.as_str(), uid.as_str(), groups.as_str()])
      .context("failed to write token.csv row")?;
  }

  writer
    .into_inner()
    .map_err(|err| anyhow!("failed to flush token.csv: {err}"))
}

#[cfg(test)]
mod tests {
  use std::sync::OnceLock;

  use base64::{engine::general_purpose, Engine as _};

  use super::*;
  use crate::{
    api::EtcdMember,
    inflator::{inflate_cluster, InflateOptions},
  };

  /// Inflating generates eight RSA keys, so tests share one cluster
  fn inflated_cluster() -> &'static Cluster {
    static CLUSTER: OnceLock<Cluster> = OnceLock::new();
    CLUSTER.get_or_init(|| {
      let mut cluster = Cluster::new();
      cluster.metadata.name = "dev.test.waws".to_owned();
      cluster.spec.kube_version = "v1.10.1".to_owned();
      cluster.spec.dns_domain = "dev.test.waws".to_owned();
      cluster.spec.master_public_name = "api.dev.test.waws".to_owned();
      cluster.spec.cloud_provider = "aws".to_owned();
      cluster.spec.docker_opts.kube_image_proxy = "gcr.io".to_owned();
      cluster.spec.etcd_cluster.members = vec![
        EtcdMember { hostname: "etcd-k8s-0".to_owned() },
        EtcdMember { hostname: "etcd-k8s-1".to_owned() },
        EtcdMember { hostname: "etcd-k8s-2".to_owned() },
      ];
      inflate_cluster(&mut cluster, &InflateOptions::all()).unwrap();
      cluster
    })
  }

  fn paths(files: &ClusterFiles) -> Vec<&str> {
    files.spec.files.iter().map(|f| f.path.as_str()).collect()
  }

  #[test]
  fn it_renders_the_etcd_file_set() {
    let files = create_files_from_cluster("etcd", inflated_cluster()).unwrap();

    assert_eq!(paths(&files), vec![ETCD_CA_CERT, ETCD_SERVER_CERT, ETCD_SERVER_KEY]);
  }

  #[test]
  fn it_renders_the_master_file_inventory_for_aws() {
    let files = create_files_from_cluster("master", inflated_cluster()).unwrap();
    let paths = paths(&files);

    let expected = vec![
      DOCKER_DAEMON_CONFIG,
      SYSCONFIG_DOCKER,
      SYSCONFIG_KUBELET,
      SYSCONFIG_KUBE_PROXY,
      KUBE_PROXY_CONFIG,
      SYSCONFIG_KUBELET_EXTRA,
      KUBE_ETCD_CA,
      KUBE_ETCD_CLIENT_CERT,
      KUBE_ETCD_CLIENT_KEY,
      KUBE_CA_CERT,
      KUBE_CA_KEY,
      KUBE_CERT,
      KUBE_KEY,
      KUBE_TOKEN_CSV,
      KUBE_CONTROLLER_MANAGER_CONFIG,
      KUBE_SCHEDULER_CONFIG,
      KUBELET_CONFIG,
      KUBE_MANIFEST_APISERVER,
      KUBE_MANIFEST_CONTROLLER_MANAGER,
      KUBE_MANIFEST_SCHEDULER,
    ];
    assert_eq!(paths, expected);
    assert!(!paths.contains(&KUBE_CLOUD_CONFIG));
    assert!(!paths.contains(&AUTH_TOKEN_WEBHOOK_CONFIG));
  }

  #[test]
  fn it_adds_cloud_config_and_webhook_for_vsphere() {
    let mut cluster = inflated_cluster().clone();
    cluster.spec.cloud_provider = "vsphere".to_owned();
    cluster.spec.vsphere_opts.username = "svc".to_owned();
    cluster.spec.vsphere_opts.password = "secret".to_owned();
    cluster.spec.vsphere_opts.server = "vcenter.example.com".to_owned();
    cluster.spec.vsphere_opts.data_center = "dc1".to_owned();
    cluster.spec.vsphere_opts.data_store = "ds1".to_owned();
    cluster.spec.vsphere_opts.working_dir = "kubernetes".to_owned();
    cluster.spec.authentication_token_webhook_opts.config_data_base64 =
      general_purpose::STANDARD.encode(b"webhook config");

    let files = create_files_from_cluster("master", &cluster).unwrap();
    let paths = paths(&files);

    assert!(paths.contains(&KUBE_CLOUD_CONFIG));
    assert!(paths.contains(&AUTH_TOKEN_WEBHOOK_CONFIG));

    let webhook = files.spec.files.iter().find(|f| f.path == AUTH_TOKEN_WEBHOOK_CONFIG).unwrap();
    assert_eq!(webhook.data().unwrap(), b"webhook config");
  }

  #[test]
  fn it_renders_the_worker_file_set_with_bootstrap_token() {
    let cluster = inflated_cluster();
    let files = create_files_from_cluster("worker", cluster).unwrap();
    let paths = paths(&files);

    assert!(paths.contains(&SYSCONFIG_KUBELET_EXTRA));
    assert!(paths.contains(&KUBELET_BOOTSTRAP_CONFIG));

    let bootstrap = files.spec.files.iter().find(|f| f.path == KUBELET_BOOTSTRAP_CONFIG).unwrap();
    let rendered = String::from_utf8(bootstrap.data().unwrap()).unwrap();
    assert!(rendered.contains(&cluster.secrets.token_secrets["kubelet-bootstrap"].token));
  }

  #[test]
  fn it_renders_bootstrapper_addons_per_cloud_provider() {
    let files = create_files_from_cluster("bootstrapper", inflated_cluster()).unwrap();

    assert_eq!(
      paths(&files),
      vec![
        "rbac-kube-system",
        "rbac-node-bootstrap",
        "calico",
        "coredns",
        "heapster",
        "node-problem-detector",
        "storageclass.aws",
      ]
    );

    let mut vsphere = inflated_cluster().clone();
    vsphere.spec.cloud_provider = "vsphere".to_owned();
    let files = create_files_from_cluster("bootstrapper", &vsphere).unwrap();
    assert!(paths(&files).contains(&"storageclass.vsphere"));
    assert!(!paths(&files).contains(&"storageclass.aws"));
  }

  #[test]
  fn it_rejects_unknown_roles() {
    assert!(create_files_from_cluster("gateway", inflated_cluster()).is_err());
  }

  #[test]
  fn it_renders_deterministically() {
    let cluster = inflated_cluster();

    let first = create_files_from_cluster("master", cluster).unwrap();
    let second = create_files_from_cluster("master", cluster).unwrap();

    assert_eq!(first.spec.files, second.spec.files);
  }

  #[test]
  fn it_latches_the_first_error() {
    let mut cluster = inflated_cluster().clone();
    // break the manifest so the very first render fails
    cluster.asset_manifest.files.retain(|f| f.name != "config.docker-daemon");

    let err = create_files_from_cluster("master", &cluster).unwrap_err();
    assert!(err.to_string().contains("config.docker-daemon"));
  }

  #[test]
  fn it_quotes_grouped_tokens_in_csv() {
    let mut tokens = BTreeMap::new();
    tokens.insert(
      "admin".to_owned(),
      TokenSecret {
        username: "admin".to_owned(),
        token: "t0k3n".to_owned(),
        uid: 1,
        groups: vec!["system:masters".to_owned(), "ops".to_owned()],
      },
    );

    let csv = String::from_utf8(make_token_csv(&tokens).unwrap()).unwrap();

    assert_eq!(csv, "t0k3n,admin,1,\"system:masters,ops\"\n");
  }
}
