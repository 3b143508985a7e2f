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
use std::fmt::{Debug, Display, Formatter, Result as FmtResult};
use std::io;
use std::sync::Arc;
use tracing::{info, warn};

use super::config::RepositoryConfig;
use super::container::AzureBlobContainer;
use super::error::StorageResult;
use super::path::BlobPath;
use super::service::{BlobMetadata, BlobReader, BlobStream, StorageService};
use super::settings::{override_location_mode, LocationMode};

/// Blob store of one repository, bound to a single container of a shared
/// [`StorageService`].
///
/// The container, client profile and location mode are fixed at construction.
/// Operations hold no state of their own, so one instance can be shared freely
/// across tasks.
pub struct AzureBlobStore {
    service: Arc<dyn StorageService>,
    client_name: String,
    container: String,
    location_mode: LocationMode,
}

impl AzureBlobStore {
    /// Bind a repository configuration to `service`.
    ///
    /// Overrides the location mode of every profile in the service's settings
    /// cache with this repository's mode. The cache is shared, so the last
    /// store constructed against a service decides the live mode.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::ConfigError` if the location mode is not valid
    /// or the service rejects the refreshed settings. The cache is not changed
    /// in either case.
    pub fn new(config: &RepositoryConfig, service: Arc<dyn StorageService>) -> StorageResult<Self> {
        let container = config.container().to_string();
        let client_name = config.client_name().to_string();
        // location mode is set per repository, not per client
        let location_mode = config.location_mode()?;

        let previous = service.settings_snapshot();
        let overridden = override_location_mode(&previous, location_mode);
        service.refresh_and_clear_cache(overridden)?;

        info!(
            "Created blob store for container={} client={} location_mode={}",
            container, client_name, location_mode
        );

        Ok(Self {
            service,
            client_name,
            container,
            location_mode,
        })
    }

    pub fn location_mode(&self) -> LocationMode {
        self.location_mode
    }

    pub fn client_name(&self) -> &str {
        &self.client_name
    }

    pub fn container(&self) -> &str {
        &self.container
    }

    /// View of the blobs under `path`.
    pub fn blob_container(self: &Arc<Self>, path: BlobPath) -> AzureBlobContainer {
        AzureBlobContainer::new(path, Arc::clone(self))
    }

    /// Delete every blob under `path`.
    ///
    /// Unlike the other operations, any backend failure is reported as a plain
    /// `io::Error` wrapping the original error.
    pub async fn delete(&self, path: &BlobPath) -> io::Result<()> {
        let key_path = path.build_as_string();
        self.service
            .delete_files(&self.client_name, &self.container, &key_path)
            .await
            .map_err(|e| {
                warn!(
                    "cannot access [{}] in container {{{}}}: {}",
                    key_path, self.container, e
                );
                io::Error::other(e)
            })
    }

    /// The store owns no resources; the service lifecycle is managed by its owner.
    pub fn close(&self) -> StorageResult<()> {
        Ok(())
    }

    pub async fn container_exists(&self) -> StorageResult<bool> {
        self.service
            .does_container_exist(&self.client_name, &self.container)
            .await
    }

    pub async fn blob_exists(&self, blob: &str) -> StorageResult<bool> {
        self.service
            .blob_exists(&self.client_name, &self.container, blob)
            .await
    }

    pub async fn delete_blob(&self, blob: &str) -> StorageResult<()> {
        self.service
            .delete_blob(&self.client_name, &self.container, blob)
            .await
    }

    pub async fn read_blob(&self, blob: &str) -> StorageResult<BlobStream> {
        self.service
            .get_input_stream(&self.client_name, &self.container, blob)
            .await
    }

    pub async fn list_blobs_by_prefix(
        &self,
        key_path: &str,
        prefix: Option<&str>,
    ) -> StorageResult<HashMap<String, BlobMetadata>> {
        self.service
            .list_blobs_by_prefix(&self.client_name, &self.container, key_path, prefix)
            .await
    }

    pub async fn write_blob(
        &self,
        blob: &str,
        input: BlobReader,
        blob_size: u64,
        fail_if_exists: bool,
    ) -> StorageResult<()> {
        self.service
            .write_blob(
                &self.client_name,
                &self.container,
                blob,
                input,
                blob_size,
                fail_if_exists,
            )
            .await
    }
}

impl Display for AzureBlobStore {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.container)
    }
}

impl Debug for AzureBlobStore {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(
            f,
            "AzureBlobStore(container={}, client={}, location_mode={})",
            self.container, self.client_name, self.location_mode
        )
    }
}
