use async_trait::async_trait;
use aws_config::{meta::region::RegionProviderChain, BehaviorVersion, Region};
use aws_sdk_s3::{
  config::SharedCredentialsProvider,
  primitives::ByteStream,
  types::{Delete, ObjectIdentifier, ServerSideEncryption},
  Client,
};
use tracing::debug;

use crate::store::{Store, StoreError};

/// Object store backend keyed by bucket object paths
///
/// All writes request AES-256 server-side encryption
#[derive(Debug)]
pub struct S3Store {
  bucket: String,
  client: Client,
}

impl S3Store {
  pub async fn new(bucket: &str, region: Option<String>, assume_role_arn: Option<String>) -> Result<Self, StoreError> {
    let region_provider = RegionProviderChain::first_try(region.map(Region::new)).or_default_provider();
    let mut config = aws_config::defaults(BehaviorVersion::latest())
      .region(region_provider)
      .load()
      .await;

    if let Some(role_arn) = assume_role_arn {
      let credentials = aws_config::sts::AssumeRoleProvider::builder(role_arn)
        .session_name("kaptain")
        .configure(&config)
        .build()
        .await;
      config = config
        .to_builder()
        .credentials_provider(SharedCredentialsProvider::new(credentials))
        .build();
    }

    Ok(S3Store {
      bucket: bucket.to_owned(),
      client: Client::new(&config),
    })
  }
}

impl std::fmt::Display for S3Store {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "s3://{}", self.bucket)
  }
}

#[async_trait]
impl Store for S3Store {
  async fn list(&self, key: &str) -> Result<Vec<String>, StoreError> {
    debug!(bucket = %self.bucket, "S3_STORE: list key {key}");

    let resp = self
      .client
      .list_objects_v2()
      .bucket(&self.bucket)
      .delimiter("/")
      .prefix(key)
      .send()
      .await
      .map_err(|err| StoreError::transport("list", key, self, err))?;

    let names = resp
      .common_prefixes()
      .iter()
      .filter_map(|elem| elem.prefix())
      .map(base_name)
      .collect();

    Ok(names)
  }

  async fn exists(&self, key: &str) -> Result<bool, StoreError> {
    debug!(bucket = %self.bucket, "S3_STORE: head key {key}");

    match self
      .client
      .head_object()
      .bucket(&self.bucket)
      .key(key)
      .send()
      .await
    {
      Ok(_) => Ok(true),
      Err(err) => {
        if err.as_service_error().map(|e| e.is_not_found()).unwrap_or(false) {
          Ok(false)
        } else {
          Err(StoreError::transport("head", key, self, err))
        }
      }
    }
  }

  async fn get(&self, key: &str) -> Result<Vec<u8>, StoreError> {
    debug!(bucket = %self.bucket, "S3_STORE: get key {key}");

    let resp = match self
      .client
      .get_object()
      .bucket(&self.bucket)
      .key(key)
      .send()
      .await
    {
      Ok(resp) => resp,
      Err(err) => {
        if err.as_service_error().map(|e| e.is_no_such_key()).unwrap_or(false) {
          return Err(StoreError::NotFound { key: key.to_owned() });
        }
        return Err(StoreError::transport("get", key, self, err));
      }
    };

    let data = resp
      .body
      .collect()
      .await
      .map_err(|err| StoreError::transport("read", key, self, err))?;

    Ok(data.into_bytes().to_vec())
  }

  async fn set(&self, key: &str, data: &[u8]) -> Result<(), StoreError> {
    debug!(bucket = %self.bucket, "S3_STORE: set key {key} (len: {} bytes)", data.len());

    self
      .client
      .put_object()
      .bucket(&self.bucket)
      .key(key)
      .body(ByteStream::from(data.to_vec()))
      .server_side_encryption(ServerSideEncryption::Aes256)
      .send()
      .await
      .map_err(|err| StoreError::transport("write", key, self, err))?;

    Ok(())
  }

  async fn delete(&self, key: &str) -> Result<(), StoreError> {
    debug!(bucket = %self.bucket, "S3_STORE: delete key {key}");

    self
      .client
      .delete_object()
      .bucket(&self.bucket)
      .key(key)
      .send()
      .await
      .map_err(|err| StoreError::transport("delete", key, self, err))?;

    Ok(())
  }

  async fn delete_all(&self, key: &str) -> Result<(), StoreError> {
    debug!(bucket = %self.bucket, "S3_STORE: delete all under {key}");

    let listed = self
      .client
      .list_objects_v2()
      .bucket(&self.bucket)
      .prefix(key)
      .send()
      .await
      .map_err(|err| StoreError::transport("delete", key, self, err))?;

    let contents = listed.contents();
    if contents.is_empty() {
      debug!(bucket = %self.bucket, "S3_STORE: nothing to delete");
      return Ok(());
    }

    let mut objects = Vec::with_capacity(contents.len());
    for obj in contents {
      if let Some(obj_key) = obj.key() {
        debug!(bucket = %self.bucket, "S3_STORE: delete {obj_key}");
        let identifier = ObjectIdentifier::builder()
          .key(obj_key)
          .build()
          .map_err(|err| StoreError::transport("delete", key, self, err))?;
        objects.push(identifier);
      }
    }

    let delete = Delete::builder()
      .set_objects(Some(objects))
      .build()
      .map_err(|err| StoreError::transport("delete", key, self, err))?;

    let resp = self
      .client
      .delete_objects()
      .bucket(&self.bucket)
      .delete(delete)
      .send()
      .await
      .map_err(|err| StoreError::transport("delete", key, self, err))?;

    debug!(bucket = %self.bucket, "S3_STORE: {} keys deleted", resp.deleted().len());

    Ok(())
  }
}

/// Last path element of an object prefix, without the trailing delimiter
fn base_name(prefix: &str) -> String {
  prefix
    .trim_end_matches('/')
    .rsplit('/')
    .next()
    .unwrap_or_default()
    .to_owned()
}

#[cfg(test)]
mod tests {
  use rstest::*;

  use super::*;

  #[rstest]
  #[case("dev.test.waws/", "dev.test.waws")]
  #[case("clusters/dev.test.waws/", "dev.test.waws")]
  #[case("dev.test.waws", "dev.test.waws")]
  #[case("", "")]
  fn it_extracts_base_names(#[case] prefix: &str, #[case] expected: &str) {
    assert_eq!(base_name(prefix), expected);
  }
}
