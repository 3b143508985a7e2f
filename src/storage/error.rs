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

use thiserror::Error;

/// Errors that can occur during blob storage operations
#[derive(Error, Debug)]
pub enum StorageError {
    /// Malformed client settings or repository configuration.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The referenced blob or container does not exist.
    #[error("Blob not found: {0}")]
    NotFound(String),

    /// A write with `fail_if_exists` hit an existing blob.
    #[error("Blob already exists: {0}")]
    AlreadyExists(String),

    /// Transport, authentication or any other backend failure.
    #[error("Access error: {message}")]
    AccessError {
        message: String,
        #[source]
        source: Option<object_store::Error>,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl StorageError {
    /// Build an `AccessError` that carries no backend cause.
    pub fn access(message: impl Into<String>) -> Self {
        StorageError::AccessError {
            message: message.into(),
            source: None,
        }
    }

    /// Whether this failure may succeed against another replica location.
    pub fn is_access_error(&self) -> bool {
        matches!(self, StorageError::AccessError { .. })
    }
}

impl From<object_store::Error> for StorageError {
    fn from(err: object_store::Error) -> Self {
        match err {
            object_store::Error::NotFound { path, .. } => StorageError::NotFound(path),
            object_store::Error::AlreadyExists { path, .. }
            | object_store::Error::Precondition { path, .. } => StorageError::AlreadyExists(path),
            other => StorageError::AccessError {
                message: other.to_string(),
                source: Some(other),
            },
        }
    }
}

/// Error code Azure returns when the addressed container does not exist.
const CONTAINER_NOT_FOUND: &str = "ContainerNotFound";

/// Whether a backend failure says the container itself is missing.
///
/// Azure list requests report a missing container as a generic request error
/// carrying the `ContainerNotFound` code, not as `NotFound`, so the whole
/// cause chain is searched for that code.
pub(crate) fn is_container_not_found(err: &object_store::Error) -> bool {
    if matches!(err, object_store::Error::NotFound { .. }) {
        return true;
    }
    let mut current: Option<&(dyn std::error::Error + 'static)> = Some(err);
    while let Some(e) = current {
        if e.to_string().contains(CONTAINER_NOT_FOUND) {
            return true;
        }
        current = e.source();
    }
    false
}

impl From<url::ParseError> for StorageError {
    fn from(err: url::ParseError) -> Self {
        StorageError::ConfigError(format!("URL parse error: {}", err))
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
