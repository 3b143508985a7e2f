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

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::error::StorageResult;
use super::path::BlobPath;
use super::settings::LocationMode;

pub const DEFAULT_CONTAINER: &str = "elasticsearch-snapshots";
pub const DEFAULT_CLIENT: &str = "default";

/// Configuration of one blob repository.
///
/// Options are kept as a string map so they can be filled from any external
/// settings source. Recognized keys:
///
/// - container: Container name (default `elasticsearch-snapshots`)
/// - client: Name of the client profile to use (default `default`)
/// - location_mode: One of `primary_only`, `primary_then_secondary`,
///   `secondary_only`, `secondary_then_primary` (default `primary_only`)
/// - base_path: Path inside the container under which blobs live
///
/// # Examples
///
/// ```
/// use azure_blob_store::storage::RepositoryConfig;
///
/// let config = RepositoryConfig::new()
///     .with_option("container", "backups")
///     .with_option("client", "secondary")
///     .with_option("location_mode", "primary_then_secondary");
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RepositoryConfig {
    #[serde(default)]
    pub options: HashMap<String, String>,
}

impl RepositoryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a configuration option, replacing any previous value.
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    pub fn with_options(mut self, options: HashMap<String, String>) -> Self {
        self.options.extend(options);
        self
    }

    pub fn get_option(&self, key: &str) -> Option<&String> {
        self.options.get(key)
    }

    pub fn container(&self) -> &str {
        self.get_option("container")
            .map(String::as_str)
            .unwrap_or(DEFAULT_CONTAINER)
    }

    pub fn client_name(&self) -> &str {
        self.get_option("client")
            .map(String::as_str)
            .unwrap_or(DEFAULT_CLIENT)
    }

    /// Parse the configured location mode.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::ConfigError` when the value is not a known mode.
    pub fn location_mode(&self) -> StorageResult<LocationMode> {
        match self.get_option("location_mode") {
            Some(value) => value.parse(),
            None => Ok(LocationMode::default()),
        }
    }

    /// Base path inside the container, split on `/`.
    pub fn base_path(&self) -> BlobPath {
        match self.get_option("base_path") {
            Some(value) => BlobPath::parse(value),
            None => BlobPath::new(),
        }
    }
}
