use std::path::Path;

use anyhow::{Context, Result};
use kaptain::{api::ClusterFile, utils};
use tracing::info;

/// Write every cluster file under the prefix directory
///
/// Parent directories are created with mode 0700 and files with mode 0644.
/// Duplicate paths within a set resolve last-write-wins
pub fn write_all(prefix: &Path, files: &[ClusterFile]) -> Result<()> {
  for file in files {
    let full_path = prefix.join(&file.path);
    let data = file.data()?;

    info!("writing file: {} (len: {})", full_path.display(), data.len());

    if let Some(parent) = full_path.parent() {
      utils::ensure_dir_exists(parent)?;
    }
    utils::write_file(&data, &full_path, 0o644)
      .with_context(|| format!("error writing file {}", full_path.display()))?;
  }

  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn it_writes_files_under_the_prefix() {
    let dir = tempfile::tempdir().unwrap();

    let files = vec![
      ClusterFile::new("etc/sysconfig/docker", b"OPTIONS="),
      ClusterFile::new("var/lib/kubelet/kubeconfig", b"apiVersion: v1"),
    ];

    write_all(dir.path(), &files).unwrap();

    assert_eq!(std::fs::read(dir.path().join("etc/sysconfig/docker")).unwrap(), b"OPTIONS=");
    assert_eq!(
      std::fs::read(dir.path().join("var/lib/kubelet/kubeconfig")).unwrap(),
      b"apiVersion: v1"
    );

    #[cfg(unix)]
    {
      use std::os::unix::fs::PermissionsExt;
      let mode = std::fs::metadata(dir.path().join("etc/sysconfig/docker"))
        .unwrap()
        .permissions()
        .mode()
        & 0o777;
      assert_eq!(mode, 0o644);
    }
  }

  #[test]
  fn it_resolves_duplicate_paths_last_write_wins() {
    let dir = tempfile::tempdir().unwrap();

    let files = vec![
      ClusterFile::new("etc/sysconfig/docker", b"first"),
      ClusterFile::new("etc/sysconfig/docker", b"second"),
    ];

    write_all(dir.path(), &files).unwrap();

    assert_eq!(std::fs::read(dir.path().join("etc/sysconfig/docker")).unwrap(), b"second");
  }
}
