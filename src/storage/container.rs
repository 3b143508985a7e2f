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

use std::collections::HashMap;
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::io;
use std::sync::Arc;
use tracing::trace;

use super::blob_store::AzureBlobStore;
use super::error::{StorageError, StorageResult};
use super::path::BlobPath;
use super::service::{BlobMetadata, BlobReader, BlobStream};
use super::settings::LocationMode;

/// Blobs stored under one path of an [`AzureBlobStore`].
///
/// Blob names given to this view are relative to the path.
#[derive(Clone)]
pub struct AzureBlobContainer {
    path: BlobPath,
    key_path: String,
    store: Arc<AzureBlobStore>,
}

impl AzureBlobContainer {
    pub fn new(path: BlobPath, store: Arc<AzureBlobStore>) -> Self {
        let key_path = path.build_as_string();
        Self {
            path,
            key_path,
            store,
        }
    }

    pub fn path(&self) -> &BlobPath {
        &self.path
    }

    fn build_key(&self, blob_name: &str) -> String {
        format!("{}{}", self.key_path, blob_name)
    }

    pub async fn blob_exists(&self, blob_name: &str) -> StorageResult<bool> {
        trace!("blob_exists({})", blob_name);
        self.store.blob_exists(&self.build_key(blob_name)).await
    }

    /// Open a blob for reading.
    ///
    /// With `PrimaryOnly`, a missing blob is reported without opening a stream.
    /// Other modes may read from a lagging secondary, so they go straight to
    /// the read and let it report what it finds.
    pub async fn read_blob(&self, blob_name: &str) -> StorageResult<BlobStream> {
        trace!("read_blob({})", blob_name);
        if self.store.location_mode() == LocationMode::PrimaryOnly
            && !self.blob_exists(blob_name).await?
        {
            return Err(StorageError::NotFound(format!(
                "Blob [{}] does not exist",
                blob_name
            )));
        }
        self.store.read_blob(&self.build_key(blob_name)).await
    }

    pub async fn write_blob(
        &self,
        blob_name: &str,
        input: BlobReader,
        blob_size: u64,
        fail_if_exists: bool,
    ) -> StorageResult<()> {
        trace!("write_blob({}, size={})", self.build_key(blob_name), blob_size);
        self.store
            .write_blob(&self.build_key(blob_name), input, blob_size, fail_if_exists)
            .await
    }

    /// Delete a single blob.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the blob does not exist.
    pub async fn delete_blob(&self, blob_name: &str) -> StorageResult<()> {
        trace!("delete_blob({})", blob_name);
        if !self.blob_exists(blob_name).await? {
            return Err(StorageError::NotFound(format!(
                "Blob [{}] does not exist",
                blob_name
            )));
        }
        self.store.delete_blob(&self.build_key(blob_name)).await
    }

    /// Delete this path and everything below it.
    pub async fn delete(&self) -> io::Result<()> {
        self.store.delete(&self.path).await
    }

    pub async fn list_blobs_by_prefix(
        &self,
        prefix: Option<&str>,
    ) -> StorageResult<HashMap<String, BlobMetadata>> {
        trace!("list_blobs_by_prefix({:?})", prefix);
        self.store.list_blobs_by_prefix(&self.key_path, prefix).await
    }

    pub async fn list_blobs(&self) -> StorageResult<HashMap<String, BlobMetadata>> {
        self.list_blobs_by_prefix(None).await
    }
}

impl Debug for AzureBlobContainer {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(
            f,
            "AzureBlobContainer(container={}, path={})",
            self.store, self.path
        )
    }
}
