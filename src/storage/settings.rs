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

//! Client profile settings and replica location modes.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use std::time::Duration;
use url::Url;

use super::error::{StorageError, StorageResult};

pub const DEFAULT_ENDPOINT_SUFFIX: &str = "core.windows.net";
pub const DEFAULT_MAX_RETRIES: usize = 3;

/// Which replica endpoint(s) a client sends requests to, in preference order.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum LocationMode {
    #[default]
    PrimaryOnly,
    PrimaryThenSecondary,
    SecondaryOnly,
    SecondaryThenPrimary,
}

/// A replica endpoint of a storage account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Location {
    Primary,
    Secondary,
}

impl LocationMode {
    /// Locations tried for read requests, most preferred first.
    pub fn read_locations(&self) -> &'static [Location] {
        match self {
            LocationMode::PrimaryOnly => &[Location::Primary],
            LocationMode::PrimaryThenSecondary => &[Location::Primary, Location::Secondary],
            LocationMode::SecondaryOnly => &[Location::Secondary],
            LocationMode::SecondaryThenPrimary => &[Location::Secondary, Location::Primary],
        }
    }

    /// Writes only ever go to the primary; the secondary replica is read-only.
    pub fn allows_writes(&self) -> bool {
        !matches!(self, LocationMode::SecondaryOnly)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LocationMode::PrimaryOnly => "primary_only",
            LocationMode::PrimaryThenSecondary => "primary_then_secondary",
            LocationMode::SecondaryOnly => "secondary_only",
            LocationMode::SecondaryThenPrimary => "secondary_then_primary",
        }
    }
}

impl Display for LocationMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for LocationMode {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "primary_only" => Ok(LocationMode::PrimaryOnly),
            "primary_then_secondary" => Ok(LocationMode::PrimaryThenSecondary),
            "secondary_only" => Ok(LocationMode::SecondaryOnly),
            "secondary_then_primary" => Ok(LocationMode::SecondaryThenPrimary),
            _ => Err(StorageError::ConfigError(format!(
                "Unknown location mode: {}",
                s
            ))),
        }
    }
}

/// Resolved connection settings of one named client profile.
///
/// Credentials are either an account `key` or a `sas_token`, never both.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AzureStorageSettings {
    pub account: String,
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub sas_token: Option<String>,
    #[serde(default = "default_endpoint_suffix")]
    pub endpoint_suffix: String,
    /// Explicit primary endpoint, e.g. a local emulator.
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub secondary_endpoint: Option<String>,
    #[serde(default)]
    pub timeout: Option<Duration>,
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,
    #[serde(default)]
    pub proxy_url: Option<String>,
    #[serde(default)]
    pub location_mode: LocationMode,
}

fn default_endpoint_suffix() -> String {
    DEFAULT_ENDPOINT_SUFFIX.to_string()
}

fn default_max_retries() -> usize {
    DEFAULT_MAX_RETRIES
}

impl AzureStorageSettings {
    /// Create settings for `account` with no credentials and default options.
    pub fn new(account: impl Into<String>) -> Self {
        Self {
            account: account.into(),
            key: None,
            sas_token: None,
            endpoint_suffix: default_endpoint_suffix(),
            endpoint: None,
            secondary_endpoint: None,
            timeout: None,
            max_retries: DEFAULT_MAX_RETRIES,
            proxy_url: None,
            location_mode: LocationMode::default(),
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn with_sas_token(mut self, sas_token: impl Into<String>) -> Self {
        self.sas_token = Some(sas_token.into());
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn with_secondary_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.secondary_endpoint = Some(endpoint.into());
        self
    }

    pub fn with_location_mode(mut self, location_mode: LocationMode) -> Self {
        self.location_mode = location_mode;
        self
    }

    /// Build settings from a flat option map.
    ///
    /// Recognized keys: `account`, `key`, `sas_token`, `endpoint_suffix`,
    /// `endpoint`, `secondary_endpoint`, `timeout` (seconds), `max_retries`,
    /// `proxy_url` and `location_mode`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::ConfigError` if `account` is missing or a numeric
    /// or location mode option cannot be parsed.
    pub fn from_options(options: &HashMap<String, String>) -> StorageResult<Self> {
        let account = options.get("account").ok_or_else(|| {
            StorageError::ConfigError("Azure client requires 'account' option".to_string())
        })?;
        let mut settings = Self::new(account.as_str());

        for (key, value) in options {
            match key.as_str() {
                "account" => (),
                "key" | "account_key" => settings.key = Some(value.clone()),
                "sas_token" => settings.sas_token = Some(value.clone()),
                "endpoint_suffix" => settings.endpoint_suffix = value.clone(),
                "endpoint" => settings.endpoint = Some(value.clone()),
                "secondary_endpoint" => settings.secondary_endpoint = Some(value.clone()),
                "timeout" => {
                    let secs = value.parse::<u64>().map_err(|e| {
                        StorageError::ConfigError(format!("Invalid timeout '{}': {}", value, e))
                    })?;
                    settings.timeout = Some(Duration::from_secs(secs));
                }
                "max_retries" => {
                    settings.max_retries = value.parse::<usize>().map_err(|e| {
                        StorageError::ConfigError(format!(
                            "Invalid max_retries '{}': {}",
                            value, e
                        ))
                    })?;
                }
                "proxy_url" => settings.proxy_url = Some(value.clone()),
                "location_mode" => settings.location_mode = value.parse()?,
                _ => {
                    tracing::warn!("Unknown Azure client option: {}", key);
                }
            }
        }

        Ok(settings)
    }

    /// Check that the settings describe a usable connection.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::ConfigError` for an empty account, for both or
    /// neither of key and SAS token, and for endpoint or proxy values that are
    /// not valid URLs.
    pub fn validate(&self) -> StorageResult<()> {
        if self.account.trim().is_empty() {
            return Err(StorageError::ConfigError(
                "Azure client account must not be empty".to_string(),
            ));
        }
        match (&self.key, &self.sas_token) {
            (Some(_), Some(_)) => {
                return Err(StorageError::ConfigError(format!(
                    "Both a secret key and a shared access token were set for account [{}]",
                    self.account
                )))
            }
            (None, None) => {
                return Err(StorageError::ConfigError(format!(
                    "Neither a secret key nor a shared access token was set for account [{}]",
                    self.account
                )))
            }
            _ => (),
        }
        self.primary_endpoint()?;
        self.secondary_endpoint()?;
        if let Some(proxy) = &self.proxy_url {
            Url::parse(proxy)?;
        }
        Ok(())
    }

    /// Blob endpoint of the primary replica.
    pub fn primary_endpoint(&self) -> StorageResult<Url> {
        match &self.endpoint {
            Some(endpoint) => Ok(Url::parse(endpoint)?),
            None => Ok(Url::parse(&format!(
                "https://{}.blob.{}",
                self.account, self.endpoint_suffix
            ))?),
        }
    }

    /// Blob endpoint of the read-only secondary replica.
    pub fn secondary_endpoint(&self) -> StorageResult<Url> {
        match &self.secondary_endpoint {
            Some(endpoint) => Ok(Url::parse(endpoint)?),
            None => Ok(Url::parse(&format!(
                "https://{}-secondary.blob.{}",
                self.account, self.endpoint_suffix
            ))?),
        }
    }

    pub fn endpoint_for(&self, location: Location) -> StorageResult<Url> {
        match location {
            Location::Primary => self.primary_endpoint(),
            Location::Secondary => self.secondary_endpoint(),
        }
    }
}

/// Return a copy of `settings` where every profile uses `location_mode`.
///
/// The location mode of a storage client is effectively global across all the
/// profiles it serves, so overriding one profile means overriding them all.
pub fn override_location_mode(
    settings: &HashMap<String, AzureStorageSettings>,
    location_mode: LocationMode,
) -> HashMap<String, AzureStorageSettings> {
    settings
        .iter()
        .map(|(name, s)| (name.clone(), s.clone().with_location_mode(location_mode)))
        .collect()
}
