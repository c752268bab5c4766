use anyhow::{anyhow, Context, Result};
use tera::Tera;
use tracing::debug;

use crate::{api::AssetManifest, api::Cluster, Assets};

/// Embedded bytes at the logical asset path
pub fn get_asset(asset_path: &str) -> Result<Vec<u8>> {
  Assets::get(asset_path)
    .map(|file| file.data.into_owned())
    .ok_or_else(|| anyhow!("asset not found: {asset_path}"))
}

/// Expand the template asset against the cluster value
pub fn render_template(template_path: &str, cluster: &Cluster) -> Result<Vec<u8>> {
  debug!("rendering template {template_path}");

  let data = get_asset(template_path).with_context(|| format!("failed to read template {template_path}"))?;
  let template = std::str::from_utf8(&data).with_context(|| format!("template {template_path} is not UTF-8"))?;

  let context = tera::Context::from_serialize(cluster)
    .with_context(|| format!("failed to build context for template {template_path}"))?;
  let rendered = Tera::one_off(template, &context, false)
    .with_context(|| format!("failed to render template {template_path}"))?;

  Ok(rendered.into_bytes())
}

/// The version-pinned asset manifest for a Kubernetes major.minor release
pub fn get_manifest(major_minor_version: &str) -> Result<AssetManifest> {
  let path = format!("assets/manifests/{major_minor_version}.yaml");
  let data =
    get_asset(&path).with_context(|| format!("failed to read manifest for version {major_minor_version}"))?;

  serde_yaml::from_slice(&data).with_context(|| format!("failed to parse manifest for version {major_minor_version}"))
}
