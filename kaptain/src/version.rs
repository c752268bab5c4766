use serde::Serialize;

/// Build provenance baked into the binary at compile time
#[derive(Debug, Serialize)]
pub struct Version {
  pub version: String,
  pub git_commit: String,
  pub git_tree_state: String,
}

pub fn get_version() -> Version {
  Version {
    version: env!("CARGO_PKG_VERSION").to_owned(),
    git_commit: option_env!("KAPTAIN_GIT_COMMIT").unwrap_or("unknown").to_owned(),
    git_tree_state: option_env!("KAPTAIN_GIT_TREE_STATE").unwrap_or("unknown").to_owned(),
  }
}

pub fn get_version_string() -> String {
  serde_json::to_string(&get_version()).unwrap_or_default()
}
