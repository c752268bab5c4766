use std::{collections::HashMap, env, future::Future, pin::Pin};

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use serde::Deserialize;
use tracing::{debug, info, warn};
use vaultrs::{
  client::{VaultClient, VaultClientSettingsBuilder},
  error::ClientError,
  kv1,
};
use vaultrs_login::{engines::approle::AppRoleLogin, LoginClient};

use crate::store::{Store, StoreError};

const MAX_RECURSE_DEPTH: usize = 10;
const MOUNT: &str = "secret";
const DATA_FIELD: &str = "data";
const DEFAULT_VAULT_ADDR: &str = "http://127.0.0.1:8200";

/// Hierarchical secret store backend
///
/// Values are stored as `{data: base64(bytes)}` so binary content survives
/// the text-only value constraint of the KV engine. Listings mark directory
/// nodes with a trailing separator
pub struct VaultStore {
  client: VaultClient,
  vault_path: String,
}

impl std::fmt::Debug for VaultStore {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("VaultStore").field("vault_path", &self.vault_path).finish()
  }
}

/// Wire shape of a stored value
#[derive(Deserialize)]
struct VaultValue {
  data: String,
}

impl VaultStore {
  pub async fn new(vault_path: &str, role_id: &str, secret_id: &str) -> Result<Self, StoreError> {
    let address = env::var("VAULT_ADDR").unwrap_or_else(|_| DEFAULT_VAULT_ADDR.to_owned());

    debug!(vault_path, "creating vault client for {address}");
    let settings = VaultClientSettingsBuilder::default()
      .address(&address)
      .build()
      .map_err(|err| StoreError::InvalidUrl {
        url: address.clone(),
        reason: err.to_string(),
      })?;
    let mut client = VaultClient::new(settings).map_err(|err| StoreError::InvalidUrl {
      url: address.clone(),
      reason: err.to_string(),
    })?;

    info!(vault_path, role_id, "authenticating with role ID");
    let login = AppRoleLogin {
      role_id: role_id.to_owned(),
      secret_id: secret_id.to_owned(),
    };
    client
      .login("approle", &login)
      .await
      .map_err(|err| StoreError::transport("authenticate", vault_path, &format!("vault://{vault_path}"), err))?;
    debug!(vault_path, "authentication succeeded, client token set");

    Ok(VaultStore {
      client,
      vault_path: vault_path.trim_matches('/').to_owned(),
    })
  }

  /// Path under the KV mount for a store key
  fn absolute_path(&self, key: &str) -> String {
    if key.is_empty() {
      self.vault_path.clone()
    } else {
      format!("{}/{}", self.vault_path, key)
    }
  }

  /// Raw child listing, directory nodes keeping their trailing separator
  async fn list_raw(&self, key: &str) -> Result<Vec<String>, StoreError> {
    match kv1::list(&self.client, MOUNT, &self.absolute_path(key)).await {
      Ok(resp) => Ok(resp.data.keys),
      Err(err) if is_not_found(&err) => Ok(vec![]),
      Err(err) => Err(StoreError::transport("list", key, self, err)),
    }
  }

  /// Collect every leaf key under the prefix, descending directory nodes up
  /// to the depth limit
  fn list_recurse(
    &self,
    key: String,
    depth: usize,
  ) -> Pin<Box<dyn Future<Output = Result<Vec<String>, StoreError>> + Send + '_>> {
    Box::pin(async move {
      if depth > MAX_RECURSE_DEPTH {
        return Err(StoreError::MaxDepthExceeded { key });
      }

      let children = self.list_raw(&key).await?;

      let mut flat_keys = Vec::new();
      for child in children {
        let is_directory = child.ends_with('/');
        let full_key = if key.is_empty() {
          child.trim_end_matches('/').to_owned()
        } else {
          format!("{}/{}", key, child.trim_end_matches('/'))
        };

        if is_directory {
          let sub_keys = self.list_recurse(full_key, depth + 1).await?;
          flat_keys.extend(sub_keys);
        } else {
          flat_keys.push(full_key);
        }
      }

      Ok(flat_keys)
    })
  }
}

impl std::fmt::Display for VaultStore {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "vault://{}", self.vault_path)
  }
}

#[async_trait]
impl Store for VaultStore {
  async fn list(&self, key: &str) -> Result<Vec<String>, StoreError> {
    debug!(vault_path = %self.vault_path, "VAULT_STORE: list key {key}");

    let keys = self.list_raw(key).await?;

    Ok(keys.iter().map(|k| k.trim_end_matches('/').to_owned()).collect())
  }

  async fn exists(&self, key: &str) -> Result<bool, StoreError> {
    debug!(vault_path = %self.vault_path, "VAULT_STORE: head key {key}");

    match kv1::get::<VaultValue>(&self.client, MOUNT, &self.absolute_path(key)).await {
      Ok(_) => Ok(true),
      Err(err) if is_not_found(&err) => Ok(false),
      Err(err) => Err(StoreError::transport("head", key, self, err)),
    }
  }

  async fn get(&self, key: &str) -> Result<Vec<u8>, StoreError> {
    debug!(vault_path = %self.vault_path, "VAULT_STORE: get key {key}");

    let value = match kv1::get::<VaultValue>(&self.client, MOUNT, &self.absolute_path(key)).await {
      Ok(value) => value,
      Err(err) if is_not_found(&err) => return Err(StoreError::NotFound { key: key.to_owned() }),
      Err(err) => return Err(StoreError::transport("get", key, self, err)),
    };

    general_purpose::STANDARD
      .decode(&value.data)
      .map_err(|_| StoreError::InvalidValue { key: key.to_owned() })
  }

  async fn set(&self, key: &str, data: &[u8]) -> Result<(), StoreError> {
    let encoded = general_purpose::STANDARD.encode(data);
    debug!(vault_path = %self.vault_path, "VAULT_STORE: set key {key} (len: {} bytes)", encoded.len());

    let mut secret_data = HashMap::new();
    secret_data.insert(DATA_FIELD, encoded.as_str());

    kv1::set(&self.client, MOUNT, &self.absolute_path(key), &secret_data)
      .await
      .map_err(|err| StoreError::transport("set", key, self, err))?;

    Ok(())
  }

  async fn delete(&self, key: &str) -> Result<(), StoreError> {
    debug!(vault_path = %self.vault_path, "VAULT_STORE: delete key {key}");

    kv1::delete(&self.client, MOUNT, &self.absolute_path(key))
      .await
      .map_err(|err| StoreError::transport("delete", key, self, err))?;

    Ok(())
  }

  async fn delete_all(&self, key: &str) -> Result<(), StoreError> {
    debug!(vault_path = %self.vault_path, "VAULT_STORE: delete all under {key}");

    let keys_to_delete = self.list_recurse(key.to_owned(), 0).await?;
    debug!(vault_path = %self.vault_path, "VAULT_STORE: deleting {} keys", keys_to_delete.len());

    for k in keys_to_delete {
      if let Err(err) = self.delete(&k).await {
        // a single failed leaf must not abort the sweep
        warn!("failed to delete {k}: {err}");
      }
    }

    Ok(())
  }
}

fn is_not_found(err: &ClientError) -> bool {
  matches!(err, ClientError::APIError { code: 404, .. })
}
