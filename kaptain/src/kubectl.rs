//! External kubectl collaborator used during cluster bootstrap.

use std::{
  io::Write,
  process::{Command, Stdio},
  time::Duration,
};

use anyhow::{anyhow, Context, Result};
use tracing::{debug, info};

/// Apply the manifest bytes to the cluster identified by the kubectl context
pub fn kube_apply(context: &str, name: &str, data: &[u8]) -> Result<()> {
  debug!("running kubectl apply for '{name}' under context '{context}' (len: {})", data.len());

  let mut child = Command::new("kubectl")
    .args(["--context", context, "apply", "-f", "-"])
    .stdin(Stdio::piped())
    .spawn()
    .context("failed to spawn kubectl")?;

  child
    .stdin
    .take()
    .ok_or_else(|| anyhow!("kubectl stdin unavailable"))?
    .write_all(data)
    .context("failed to stream manifest to kubectl")?;

  let status = child.wait().context("failed to wait for kubectl")?;
  if !status.success() {
    return Err(anyhow!("kubectl apply failed for {name}"));
  }

  Ok(())
}

/// Block until a simple node listing against the apiserver succeeds,
/// retrying every 10 seconds
pub async fn kube_wait_for_apiserver(context: &str) -> Result<()> {
  debug!("running kubectl to check if apiserver is ready");

  loop {
    let status = Command::new("kubectl")
      .args(["--context", context, "get", "nodes", "--no-headers"])
      .status();

    match status {
      Ok(status) if status.success() => {
        info!("apiserver is ready, continuing...");
        return Ok(());
      }
      _ => {
        info!("apiserver is not ready, waiting 10 seconds before retrying");
        tokio::time::sleep(Duration::from_secs(10)).await;
      }
    }
  }
}
