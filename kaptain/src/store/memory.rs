//! In-memory store used by tests exercising the registry and client layers.

use std::{collections::BTreeMap, sync::Mutex};

use async_trait::async_trait;

use crate::store::{Store, StoreError};

#[derive(Default, Debug)]
pub struct MemoryStore {
  entries: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl MemoryStore {
  pub fn new() -> Self {
    MemoryStore::default()
  }
}

#[async_trait]
impl Store for MemoryStore {
  async fn list(&self, key: &str) -> Result<Vec<String>, StoreError> {
    let prefix = if key.is_empty() || key.ends_with('/') {
      key.to_owned()
    } else {
      format!("{key}/")
    };

    let entries = self.entries.lock().unwrap();
    let mut names: Vec<String> = entries
      .keys()
      .filter_map(|k| k.strip_prefix(&prefix))
      .filter_map(|rest| rest.split('/').next())
      .map(str::to_owned)
      .collect();
    names.dedup();

    Ok(names)
  }

  async fn exists(&self, key: &str) -> Result<bool, StoreError> {
    Ok(self.entries.lock().unwrap().contains_key(key))
  }

  async fn get(&self, key: &str) -> Result<Vec<u8>, StoreError> {
    self
      .entries
      .lock()
      .unwrap()
      .get(key)
      .cloned()
      .ok_or_else(|| StoreError::NotFound { key: key.to_owned() })
  }

  async fn set(&self, key: &str, data: &[u8]) -> Result<(), StoreError> {
    self.entries.lock().unwrap().insert(key.to_owned(), data.to_vec());
    Ok(())
  }

  async fn delete(&self, key: &str) -> Result<(), StoreError> {
    self.entries.lock().unwrap().remove(key);
    Ok(())
  }

  async fn delete_all(&self, key: &str) -> Result<(), StoreError> {
    self.entries.lock().unwrap().retain(|k, _| !k.starts_with(key));
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn it_honors_the_store_contract() {
    let store = MemoryStore::new();

    store.set("a/cluster.yaml", b"one").await.unwrap();
    store.set("a/roles/etcd.yaml", b"two").await.unwrap();
    store.set("b/cluster.yaml", b"three").await.unwrap();

    assert_eq!(store.get("a/cluster.yaml").await.unwrap(), b"one");
    assert!(store.exists("a/cluster.yaml").await.unwrap());
    assert_eq!(store.list("").await.unwrap(), vec!["a", "b"]);
    assert_eq!(store.list("a").await.unwrap(), vec!["cluster.yaml", "roles"]);

    assert!(matches!(
      store.get("a/missing").await.unwrap_err(),
      StoreError::NotFound { .. }
    ));

    store.delete("a/cluster.yaml").await.unwrap();
    assert!(!store.exists("a/cluster.yaml").await.unwrap());
    // deleting a missing key is not an error
    store.delete("a/cluster.yaml").await.unwrap();

    store.delete_all("a").await.unwrap();
    assert!(store.list("a").await.unwrap().is_empty());
    assert!(store.exists("b/cluster.yaml").await.unwrap());

    // delete_all on an empty prefix is a no-op
    store.delete_all("does-not-exist").await.unwrap();
  }
}
