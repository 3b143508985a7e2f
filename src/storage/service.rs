// Copyright 2025 Adobe. All rights reserved.
// This file is licensed to you under the Apache License,
// Version 2.0 (http://www.apache.org/licenses/LICENSE-2.0)
// or the MIT license (http://opensource.org/licenses/MIT),
// at your option.
//
// Unless required by applicable law or agreed to in writing,
// this software is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR REPRESENTATIONS OF ANY KIND, either express or
// implied. See the LICENSE-MIT and LICENSE-APACHE files for the
// specific language governing permissions and limitations under
// each license.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{BoxStream, StreamExt};
use std::collections::HashMap;
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::sync::Arc;
use tokio::io::AsyncRead;

use super::error::StorageResult;
use super::settings::AzureStorageSettings;

/// Sequential byte source handed to a blob write.
pub type BlobReader = Box<dyn AsyncRead + Send + Unpin>;

/// Sequential byte stream of a blob being read.
pub type BlobStream = BoxStream<'static, StorageResult<Bytes>>;

/// Snapshot of the settings cache, keyed by client profile name.
pub type SettingsSnapshot = Arc<HashMap<String, AzureStorageSettings>>;

/// Metadata about a blob returned from a listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobMetadata {
    /// Blob name, relative to the listed path
    pub name: String,

    /// Blob size in bytes
    pub length: u64,

    /// Last modified timestamp (if available)
    pub last_modified: Option<chrono::DateTime<chrono::Utc>>,
}

impl BlobMetadata {
    pub fn new(name: impl Into<String>, length: u64) -> Self {
        Self {
            name: name.into(),
            length,
            last_modified: None,
        }
    }
}

/// Client of the remote blob service, shared by every repository using it.
///
/// Every blob operation takes the client profile name and the container name
/// first. Failures keep the backend's own error kinds (`NotFound`,
/// `AlreadyExists`, `AccessError`, ...).
///
/// The settings cache is one map for the whole client. Replacing it is atomic,
/// but two repositories replacing it concurrently race and the last writer
/// wins.
#[async_trait]
pub trait StorageService: Send + Sync {
    /// Current settings cache.
    fn settings_snapshot(&self) -> SettingsSnapshot;

    /// Validate `new_settings`, swap them in as the settings cache and drop
    /// every client built from the previous settings.
    ///
    /// # Returns
    ///
    /// The settings that were replaced.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::ConfigError` when any profile is malformed; the
    /// cache is left untouched in that case.
    fn refresh_and_clear_cache(
        &self,
        new_settings: HashMap<String, AzureStorageSettings>,
    ) -> StorageResult<SettingsSnapshot>;

    async fn does_container_exist(&self, client_name: &str, container: &str)
        -> StorageResult<bool>;

    async fn blob_exists(&self, client_name: &str, container: &str, blob: &str)
        -> StorageResult<bool>;

    /// Open a blob for reading.
    ///
    /// # Errors
    ///
    /// * `StorageError::NotFound` - The blob does not exist
    /// * `StorageError::AccessError` - Transport or authentication failure
    async fn get_input_stream(
        &self,
        client_name: &str,
        container: &str,
        blob: &str,
    ) -> StorageResult<BlobStream>;

    /// Write `blob_size` bytes read from `input` to `blob`.
    ///
    /// `blob_size` is the caller's declared length; it is not checked against
    /// the number of bytes the reader produces.
    ///
    /// # Errors
    ///
    /// * `StorageError::AlreadyExists` - `fail_if_exists` is set and the blob exists
    /// * `StorageError::AccessError` - Transport or authentication failure
    async fn write_blob(
        &self,
        client_name: &str,
        container: &str,
        blob: &str,
        input: BlobReader,
        blob_size: u64,
        fail_if_exists: bool,
    ) -> StorageResult<()>;

    async fn delete_blob(&self, client_name: &str, container: &str, blob: &str)
        -> StorageResult<()>;

    /// Delete every blob whose key starts with `path`.
    async fn delete_files(&self, client_name: &str, container: &str, path: &str)
        -> StorageResult<()>;

    /// List the blobs directly under `key_path` whose name starts with
    /// `prefix`. Names in the result are relative to `key_path`.
    async fn list_blobs_by_prefix(
        &self,
        client_name: &str,
        container: &str,
        key_path: &str,
        prefix: Option<&str>,
    ) -> StorageResult<HashMap<String, BlobMetadata>>;
}

impl Debug for dyn StorageService {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let snapshot = self.settings_snapshot();
        let mut clients: Vec<&String> = snapshot.keys().collect();
        clients.sort();
        write!(f, "StorageService(clients={:?})", clients)
    }
}

/// Drain a blob stream into memory.
pub async fn read_to_vec(mut stream: BlobStream) -> StorageResult<Vec<u8>> {
    let mut buf = Vec::new();
    while let Some(chunk) = stream.next().await {
        buf.extend_from_slice(&chunk?);
    }
    Ok(buf)
}
