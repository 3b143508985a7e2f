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

//! # Azure Blob Store
//!
//! A container-scoped blob store backed by Azure Blob Storage.
//!
//! A repository is described by a container name, a client profile name and a
//! replica [`LocationMode`]. [`AzureBlobStore`] binds that description to a
//! shared [`AzureStorageService`], which owns the settings of every client
//! profile and the connections built from them.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::collections::HashMap;
//! use std::sync::Arc;
//! use azure_blob_store::{
//!     AzureBlobStore, AzureStorageService, AzureStorageSettings, BlobPath, RepositoryConfig,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//! let mut clients = HashMap::new();
//! clients.insert(
//!     "default".to_string(),
//!     AzureStorageSettings::new("myaccount").with_key("ACCOUNT_KEY"),
//! );
//! let service = Arc::new(AzureStorageService::new(clients)?);
//!
//! let config = RepositoryConfig::new()
//!     .with_option("container", "backups")
//!     .with_option("location_mode", "primary_then_secondary");
//! let store = Arc::new(AzureBlobStore::new(&config, service)?);
//!
//! let container = store.blob_container(BlobPath::parse("cluster-a"));
//! container
//!     .write_blob("index-0", Box::new(&b"{}"[..]), 2, true)
//!     .await?;
//! let blobs = container.list_blobs_by_prefix(Some("index-")).await?;
//! println!("{} generations", blobs.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`storage`] - Settings, the storage service and the blob store adapter

pub mod storage;

// Re-export commonly used types
pub use storage::{
    AzureBlobContainer, AzureBlobStore, AzureStorageService, AzureStorageSettings, BlobMetadata,
    BlobPath, LocationMode, RepositoryConfig, StorageError, StorageResult, StorageService,
};
