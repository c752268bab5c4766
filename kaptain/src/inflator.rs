use std::time::Duration;

use anyhow::{Context, Result};
use base64::{engine::general_purpose, Engine as _};
use tracing::{debug, info};

use crate::{
  api::{CertPair, Cluster, TokenSecret},
  assets,
  constants::{
    DEFAULT_CA_EXPIRY_DAYS, DEFAULT_CERT_EXPIRY_DAYS, DEFAULT_DNS_CLUSTER_IP, DEFAULT_MASTER_SERVICE_IP,
    DEFAULT_POD_CIDR, DEFAULT_SERVICE_CIDR, DEFAULT_TOKEN_LENGTH,
  },
  pki::{self, CertBundle, CsrParams, SigningProfile},
  utils,
};

/// InflateOptions selects which parts of the cluster to update
///
/// Every update is idempotent and additive: values already set and secrets
/// already present are never touched
#[derive(Clone, Copy, Debug, Default)]
pub struct InflateOptions {
  pub update_spec: bool,
  pub update_pkis: bool,
  pub update_tokens: bool,
  pub update_asset_manifest: bool,
}

impl InflateOptions {
  pub fn all() -> Self {
    InflateOptions {
      update_spec: true,
      update_pkis: true,
      update_tokens: true,
      update_asset_manifest: true,
    }
  }
}

/// Inflate the cluster by setting default values, preparing the asset
/// manifest, and generating missing PKIs and token secrets
pub fn inflate_cluster(cluster: &mut Cluster, opts: &InflateOptions) -> Result<()> {
  if opts.update_spec {
    inflate_cluster_defaults(cluster);
  }

  if opts.update_asset_manifest {
    inflate_asset_manifest(cluster)?;
  }

  if opts.update_pkis {
    inflate_pkis(cluster)?;
  }

  if opts.update_tokens {
    inflate_tokens(cluster);
  }

  Ok(())
}

fn inflate_cluster_defaults(cluster: &mut Cluster) {
  info!("inflating cluster spec");

  if cluster.spec.pod_cidr.is_empty() {
    cluster.spec.pod_cidr = DEFAULT_POD_CIDR.to_owned();
  }

  if cluster.spec.service_cidr.is_empty() {
    cluster.spec.service_cidr = DEFAULT_SERVICE_CIDR.to_owned();
  }

  if cluster.spec.dns_cluster_ip.is_empty() {
    cluster.spec.dns_cluster_ip = DEFAULT_DNS_CLUSTER_IP.to_owned();
  }
}

fn inflate_asset_manifest(cluster: &mut Cluster) -> Result<()> {
  info!("inflating asset manifest");

  let major_minor = utils::major_minor_version(&cluster.spec.kube_version)?;
  let manifest = assets::get_manifest(&major_minor)?;
  cluster.asset_manifest = manifest.spec;

  Ok(())
}

fn inflate_pkis(cluster: &mut Cluster) -> Result<()> {
  info!("inflating PKIs");

  let etcd_ca = ensure_ca(cluster, "etcd-ca", "ETCD CA")?;
  let kube_ca = ensure_ca(cluster, "kube-ca", "Kube CA")?;

  // etcd-server carries every member under both its bare hostname and FQDN
  let members = &cluster.spec.etcd_cluster.members;
  let mut etcd_alt_names: Vec<String> = members.iter().map(|m| m.hostname.clone()).collect();
  etcd_alt_names.extend(
    members
      .iter()
      .map(|m| format!("{}.{}", m.hostname, cluster.spec.dns_domain)),
  );
  ensure_cert(
    cluster,
    "etcd-server",
    CsrParams {
      common_name: "etcd".to_owned(),
      alt_names: etcd_alt_names,
      valid_for: days(DEFAULT_CERT_EXPIRY_DAYS),
      profile: SigningProfile::Server,
    },
    &etcd_ca,
  )?;

  ensure_cert(
    cluster,
    "etcd-client",
    CsrParams {
      common_name: "apiserver".to_owned(),
      valid_for: days(DEFAULT_CERT_EXPIRY_DAYS),
      profile: SigningProfile::Client,
      ..CsrParams::default()
    },
    &etcd_ca,
  )?;

  let kube_alt_names = vec![
    cluster.spec.master_public_name.clone(),
    "kubernetes".to_owned(),
    "kubernetes.default".to_owned(),
    "kubernetes.default.svc".to_owned(),
    "kubernetes.default.svc.cluster".to_owned(),
    "kubernetes.default.svc.cluster.local".to_owned(),
    "localhost".to_owned(),
    "127.0.0.1".to_owned(),
    DEFAULT_MASTER_SERVICE_IP.to_owned(),
  ];
  ensure_cert(
    cluster,
    "kubernetes",
    CsrParams {
      common_name: "kubernetes".to_owned(),
      alt_names: kube_alt_names,
      valid_for: days(DEFAULT_CERT_EXPIRY_DAYS),
      profile: SigningProfile::Server,
    },
    &kube_ca,
  )?;

  for component in ["kube-controller-manager", "kube-scheduler", "kube-proxy"] {
    ensure_cert(
      cluster,
      component,
      CsrParams {
        common_name: format!("system:{component}"),
        valid_for: days(DEFAULT_CERT_EXPIRY_DAYS),
        profile: SigningProfile::Client,
        ..CsrParams::default()
      },
      &kube_ca,
    )?;
  }

  Ok(())
}

fn inflate_tokens(cluster: &mut Cluster) {
  info!("inflating tokens");

  let tokens = &mut cluster.secrets.token_secrets;

  if !tokens.contains_key("kubelet-bootstrap") {
    tokens.insert(
      "kubelet-bootstrap".to_owned(),
      TokenSecret {
        username: "kubelet-bootstrap".to_owned(),
        token: utils::make_random_token(DEFAULT_TOKEN_LENGTH),
        uid: 10001,
        groups: vec!["system:bootstrappers".to_owned()],
      },
    );
  }

  if !tokens.contains_key("admin") {
    tokens.insert(
      "admin".to_owned(),
      TokenSecret {
        username: "admin".to_owned(),
        token: utils::make_random_token(DEFAULT_TOKEN_LENGTH),
        uid: 1,
        groups: vec!["system:masters".to_owned()],
      },
    );
  }
}

/// Reuse the named CA when it exists in the cluster secrets, otherwise
/// create it and record its PEM pair
fn ensure_ca(cluster: &mut Cluster, name: &str, common_name: &str) -> Result<CertBundle> {
  match cluster.secrets.pkis.get(name) {
    Some(pair) => {
      info!("use existing PKI: {name}");
      make_cert_bundle(pair).with_context(|| format!("failed to reload PKI {name}"))
    }
    None => {
      info!("creating new CA: {name}");
      let params = CsrParams {
        common_name: common_name.to_owned(),
        valid_for: days(DEFAULT_CA_EXPIRY_DAYS),
        profile: SigningProfile::None,
        ..CsrParams::default()
      };
      let bundle = pki::init_ca(&params)?;
      cluster.secrets.pkis.insert(name.to_owned(), make_cert_pair(&bundle)?);
      Ok(bundle)
    }
  }
}

fn ensure_cert(cluster: &mut Cluster, name: &str, params: CsrParams, ca: &CertBundle) -> Result<()> {
  if cluster.secrets.pkis.contains_key(name) {
    debug!("use existing PKI: {name}");
    return Ok(());
  }

  info!("creating new certificate: {name}");
  let bundle = pki::make_cert(&params, ca)?;
  cluster.secrets.pkis.insert(name.to_owned(), make_cert_pair(&bundle)?);

  Ok(())
}

fn make_cert_pair(bundle: &CertBundle) -> Result<CertPair> {
  Ok(CertPair {
    cert_data: general_purpose::STANDARD.encode(bundle.cert_pem()?),
    key_data: general_purpose::STANDARD.encode(bundle.key_pem()?),
  })
}

fn make_cert_bundle(pair: &CertPair) -> Result<CertBundle> {
  CertBundle::from_pem(&pair.cert_data()?, &pair.key_data()?)
}

fn days(count: u64) -> Duration {
  Duration::from_secs(count * 24 * 60 * 60)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::EtcdMember;

  fn base_cluster() -> Cluster {
    let mut cluster = Cluster::new();
    cluster.metadata.name = "dev.test.waws".to_owned();
    cluster.spec.kube_version = "v1.10.1".to_owned();
    cluster.spec.dns_domain = "dev.test.waws".to_owned();
    cluster.spec.master_public_name = "api.dev.test.waws".to_owned();
    cluster.spec.cloud_provider = "aws".to_owned();
    cluster.spec.etcd_cluster.members = vec![
      EtcdMember { hostname: "etcd-k8s-0".to_owned() },
      EtcdMember { hostname: "etcd-k8s-1".to_owned() },
      EtcdMember { hostname: "etcd-k8s-2".to_owned() },
    ];
    cluster
  }

  #[test]
  fn it_applies_spec_defaults_without_clobbering() {
    let mut cluster = base_cluster();
    cluster.spec.service_cidr = "10.0.0.0/16".to_owned();

    inflate_cluster(
      &mut cluster,
      &InflateOptions {
        update_spec: true,
        ..InflateOptions::default()
      },
    )
    .unwrap();

    assert_eq!(cluster.spec.pod_cidr, DEFAULT_POD_CIDR);
    assert_eq!(cluster.spec.service_cidr, "10.0.0.0/16");
    assert_eq!(cluster.spec.dns_cluster_ip, DEFAULT_DNS_CLUSTER_IP);
  }

  #[test]
  fn it_attaches_the_version_pinned_manifest() {
    let mut cluster = base_cluster();

    inflate_cluster(
      &mut cluster,
      &InflateOptions {
        update_asset_manifest: true,
        ..InflateOptions::default()
      },
    )
    .unwrap();

    assert!(!cluster.asset_manifest.files.is_empty());
    assert!(!cluster.asset_manifest.addons.is_empty());
  }

  #[test]
  fn it_rejects_malformed_kube_versions() {
    let mut cluster = base_cluster();
    cluster.spec.kube_version = "1.10".to_owned();

    let result = inflate_cluster(
      &mut cluster,
      &InflateOptions {
        update_asset_manifest: true,
        ..InflateOptions::default()
      },
    );

    assert!(result.is_err());
  }

  #[test]
  fn it_generates_the_full_pki_and_token_set() {
    let mut cluster = base_cluster();

    inflate_cluster(&mut cluster, &InflateOptions::all()).unwrap();

    for name in [
      "etcd-ca",
      "kube-ca",
      "etcd-server",
      "etcd-client",
      "kubernetes",
      "kube-controller-manager",
      "kube-scheduler",
      "kube-proxy",
    ] {
      assert!(cluster.secrets.pkis.contains_key(name), "missing PKI {name}");
    }

    let bootstrap = &cluster.secrets.token_secrets["kubelet-bootstrap"];
    assert_eq!(bootstrap.uid, 10001);
    assert_eq!(bootstrap.groups, vec!["system:bootstrappers"]);
    assert_eq!(bootstrap.token.len(), DEFAULT_TOKEN_LENGTH);
    assert!(bootstrap.token.chars().all(|c| c.is_ascii_alphanumeric()));

    let admin = &cluster.secrets.token_secrets["admin"];
    assert_eq!(admin.uid, 1);
    assert_eq!(admin.groups, vec!["system:masters"]);
  }

  #[test]
  fn it_chains_leaf_certificates_to_their_ca() {
    let mut cluster = base_cluster();
    inflate_cluster(&mut cluster, &InflateOptions::all()).unwrap();

    let etcd_ca = make_cert_bundle(&cluster.secrets.pkis["etcd-ca"]).unwrap();
    let kube_ca = make_cert_bundle(&cluster.secrets.pkis["kube-ca"]).unwrap();

    for name in ["etcd-server", "etcd-client"] {
      let leaf = make_cert_bundle(&cluster.secrets.pkis[name]).unwrap();
      assert_eq!(leaf.cert.tbs_certificate.issuer, etcd_ca.cert.tbs_certificate.subject);
    }

    for name in ["kubernetes", "kube-controller-manager", "kube-scheduler", "kube-proxy"] {
      let leaf = make_cert_bundle(&cluster.secrets.pkis[name]).unwrap();
      assert_eq!(leaf.cert.tbs_certificate.issuer, kube_ca.cert.tbs_certificate.subject);
    }
  }

  #[test]
  fn it_never_regenerates_existing_secrets() {
    let mut cluster = base_cluster();
    inflate_cluster(&mut cluster, &InflateOptions::all()).unwrap();

    let first = cluster.secrets.clone();
    inflate_cluster(&mut cluster, &InflateOptions::all()).unwrap();

    assert_eq!(cluster.secrets.pkis, first.pkis);
    assert_eq!(cluster.secrets.token_secrets, first.token_secrets);
  }

  #[test]
  fn it_survives_an_export_import_round_trip() {
    let mut cluster = base_cluster();
    inflate_cluster(&mut cluster, &InflateOptions::all()).unwrap();

    let exported = serde_yaml::to_string(&cluster).unwrap();
    let mut imported: Cluster = serde_yaml::from_str(&exported).unwrap();

    inflate_cluster(&mut imported, &InflateOptions::all()).unwrap();

    assert_eq!(imported.secrets.pkis, cluster.secrets.pkis);
    assert_eq!(imported.secrets.token_secrets, cluster.secrets.token_secrets);
  }
}
