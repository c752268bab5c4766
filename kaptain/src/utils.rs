use std::{fs, io::Write, path::Path};

use anyhow::{anyhow, Context, Result};
use rand::{distributions::Alphanumeric, thread_rng, Rng};
use regex::Regex;

/// Generate a random bearer token of the requested length
///
/// Characters are sampled uniformly from the 62-symbol alphanumeric alphabet
/// using the thread-local CSPRNG
pub fn make_random_token(token_length: usize) -> String {
  thread_rng()
    .sample_iter(&Alphanumeric)
    .take(token_length)
    .map(char::from)
    .collect()
}

/// Extract the major.minor prefix from a Kubernetes version string
///
/// For example: `major_minor_version("v1.2.3")` returns `"1.2"`
pub fn major_minor_version(version: &str) -> Result<String> {
  let re = Regex::new(r"^v(\d+)\.(\d+)\.\d+$")?;
  match re.captures(version) {
    Some(cap) => Ok(format!("{}.{}", &cap[1], &cap[2])),
    None => Err(anyhow!("invalid Kubernetes version {version}: it must be of form vX.Y.Z")),
  }
}

/// Create the directory and any missing parents with mode 0700
pub fn ensure_dir_exists<P: AsRef<Path>>(dir: P) -> Result<()> {
  let mut builder = fs::DirBuilder::new();
  builder.recursive(true);
  #[cfg(unix)]
  {
    use std::os::unix::fs::DirBuilderExt;
    builder.mode(0o700);
  }
  builder
    .create(&dir)
    .with_context(|| format!("failed to create directory {}", dir.as_ref().display()))
}

/// Write the file, creating it with the given mode when absent
pub fn write_file<P: AsRef<Path>>(data: &[u8], path: P, mode: u32) -> Result<()> {
  let mut options = fs::OpenOptions::new();
  options.create(true).write(true).truncate(true);
  #[cfg(unix)]
  {
    use std::os::unix::fs::OpenOptionsExt;
    options.mode(mode);
  }
  #[cfg(not(unix))]
  let _ = mode;

  let mut file = options
    .open(&path)
    .with_context(|| format!("failed to open {}", path.as_ref().display()))?;
  file
    .write_all(data)
    .with_context(|| format!("failed to write {}", path.as_ref().display()))
}

#[cfg(test)]
mod tests {
  use rstest::*;

  use super::*;

  #[rstest]
  #[case(16)]
  #[case(32)]
  #[case(64)]
  fn it_makes_tokens_of_requested_length(#[case] length: usize) {
    let token = make_random_token(length);

    assert_eq!(token.len(), length);
    assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
  }

  #[test]
  fn it_makes_distinct_tokens() {
    assert_ne!(make_random_token(32), make_random_token(32));
  }

  #[rstest]
  #[case("v1.10.1", "1.10")]
  #[case("v1.2.3", "1.2")]
  #[case("v2.0.0", "2.0")]
  fn it_extracts_major_minor(#[case] version: &str, #[case] expected: &str) {
    assert_eq!(major_minor_version(version).unwrap(), expected);
  }

  #[rstest]
  #[case("1.10.1")]
  #[case("v1.10")]
  #[case("v1.10.1-beta.1")]
  #[case("vX.Y.Z")]
  #[case("")]
  fn it_rejects_invalid_versions(#[case] version: &str) {
    assert!(major_minor_version(version).is_err());
  }

  #[test]
  fn it_writes_files_with_parent_dirs() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("var/lib/kubelet/kubeconfig");

    ensure_dir_exists(path.parent().unwrap()).unwrap();
    write_file(b"contents", &path, 0o644).unwrap();

    assert_eq!(fs::read(&path).unwrap(), b"contents");

    #[cfg(unix)]
    {
      use std::os::unix::fs::PermissionsExt;
      let file_mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
      assert_eq!(file_mode, 0o644);
      let dir_mode = fs::metadata(path.parent().unwrap()).unwrap().permissions().mode() & 0o777;
      assert_eq!(dir_mode, 0o700);
    }
  }
}
