pub mod s3;
pub mod vault;

#[cfg(test)]
pub(crate) mod memory;

use async_trait::async_trait;
use thiserror::Error;
use url::Url;

/// Failures surfaced by store backends
#[derive(Debug, Error)]
pub enum StoreError {
  #[error("key '{key}' not found")]
  NotFound { key: String },

  #[error("value at key '{key}' is malformed")]
  InvalidValue { key: String },

  #[error("maximum recurse depth reached under '{key}'")]
  MaxDepthExceeded { key: String },

  #[error("failed to {action} key '{key}' from {store}")]
  Transport {
    action: &'static str,
    key: String,
    store: String,
    #[source]
    source: Box<dyn std::error::Error + Send + Sync>,
  },

  #[error("failed to create store '{url}': {reason}")]
  InvalidUrl { url: String, reason: String },
}

impl StoreError {
  pub(crate) fn transport<E>(action: &'static str, key: &str, store: &impl std::fmt::Display, source: E) -> Self
  where
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
  {
    StoreError::Transport {
      action,
      key: key.to_owned(),
      store: store.to_string(),
      source: source.into(),
    }
  }
}

/// Byte-level persistence over hierarchical string keys
///
/// Implementations differ in listing semantics (flat object listing with a
/// delimiter vs directory-marked child nodes) and in how binary values are
/// encoded, but expose the same six operations
#[async_trait]
pub trait Store: Send + Sync + std::fmt::Debug {
  /// Immediate child names under the prefix, trailing separators stripped.
  /// An absent prefix yields an empty set
  async fn list(&self, key: &str) -> Result<Vec<String>, StoreError>;

  /// True iff a value exists at the key
  async fn exists(&self, key: &str) -> Result<bool, StoreError>;

  /// The value at the key, or `NotFound`
  async fn get(&self, key: &str) -> Result<Vec<u8>, StoreError>;

  /// Write the value, overwriting any previous one
  async fn set(&self, key: &str, data: &[u8]) -> Result<(), StoreError>;

  /// Remove the key. Removing a missing key is not an error
  async fn delete(&self, key: &str) -> Result<(), StoreError>;

  /// Remove every key under the prefix, recursively
  async fn delete_all(&self, key: &str) -> Result<(), StoreError>;
}

/// Create a store from a URL of the form `s3://<bucket>?region=…&assume_role=…`
/// or `vault://<host><path>?role_id=…&secret_id=…`
pub async fn from_url(store_url: &str) -> Result<Box<dyn Store>, StoreError> {
  let parsed = Url::parse(store_url).map_err(|err| StoreError::InvalidUrl {
    url: store_url.to_owned(),
    reason: err.to_string(),
  })?;

  match parsed.scheme() {
    "s3" => {
      let bucket = parsed.host_str().unwrap_or_default();
      let region = query_param(&parsed, "region");
      let assume_role = query_param(&parsed, "assume_role");
      Ok(Box::new(s3::S3Store::new(bucket, region, assume_role).await?))
    }
    "vault" => {
      let vault_path = format!("{}{}", parsed.host_str().unwrap_or_default(), parsed.path());
      let role_id = query_param(&parsed, "role_id").unwrap_or_default();
      let secret_id = query_param(&parsed, "secret_id").unwrap_or_default();
      Ok(Box::new(vault::VaultStore::new(&vault_path, &role_id, &secret_id).await?))
    }
    scheme => Err(StoreError::InvalidUrl {
      url: store_url.to_owned(),
      reason: format!("unknown scheme '{scheme}'"),
    }),
  }
}

fn query_param(url: &Url, name: &str) -> Option<String> {
  url
    .query_pairs()
    .find(|(key, _)| key == name)
    .map(|(_, value)| value.into_owned())
}
