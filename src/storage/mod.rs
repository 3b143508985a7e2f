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

//! Blob storage on Azure
//!
//! [`AzureBlobStore`] binds one repository (container, client profile and
//! location mode) to a shared [`StorageService`]. [`AzureStorageService`] is
//! the `object_store`-backed implementation of that service; it keeps the
//! settings cache of all client profiles and routes requests to the primary
//! or secondary replica according to the cached location mode.

pub mod azure;
pub mod blob_store;
pub mod config;
pub mod container;
pub mod error;
pub mod path;
pub mod service;
pub mod settings;

// Public exports
pub use azure::{AzureStorageService, AzureStoreFactory, StoreFactory};
pub use blob_store::AzureBlobStore;
pub use config::RepositoryConfig;
pub use container::AzureBlobContainer;
pub use error::{StorageError, StorageResult};
pub use path::BlobPath;
pub use service::{read_to_vec, BlobMetadata, BlobReader, BlobStream, StorageService};
pub use settings::{AzureStorageSettings, Location, LocationMode};
