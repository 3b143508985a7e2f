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

//! Checks that a repository is reachable and lists the blobs under a path.
//!
//! Usage: `blob-probe [path] [prefix]`
//!
//! Client options are read from `AZURE_ACCOUNT`, `AZURE_KEY`,
//! `AZURE_SAS_TOKEN`, `AZURE_ENDPOINT` and `AZURE_SECONDARY_ENDPOINT`;
//! repository options from `BLOB_CONTAINER`, `BLOB_CLIENT`,
//! `BLOB_LOCATION_MODE` and `BLOB_BASE_PATH`. The listed path is relative to
//! the base path.

use azure_blob_store::{
    AzureBlobStore, AzureStorageService, AzureStorageSettings, BlobPath, RepositoryConfig,
};
use std::collections::HashMap;
use std::env;
use std::error::Error;
use std::sync::Arc;
use tracing::info;

const CLIENT_ENV: [(&str, &str); 5] = [
    ("AZURE_ACCOUNT", "account"),
    ("AZURE_KEY", "key"),
    ("AZURE_SAS_TOKEN", "sas_token"),
    ("AZURE_ENDPOINT", "endpoint"),
    ("AZURE_SECONDARY_ENDPOINT", "secondary_endpoint"),
];

const REPOSITORY_ENV: [(&str, &str); 4] = [
    ("BLOB_CONTAINER", "container"),
    ("BLOB_CLIENT", "client"),
    ("BLOB_LOCATION_MODE", "location_mode"),
    ("BLOB_BASE_PATH", "base_path"),
];

fn options_from_env(keys: &[(&str, &str)]) -> HashMap<String, String> {
    keys.iter()
        .filter_map(|(var, key)| env::var(var).ok().map(|v| (key.to_string(), v)))
        .collect()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let mut args = env::args().skip(1);
    let relative = BlobPath::parse(&args.next().unwrap_or_default());
    let prefix = args.next();

    let config = RepositoryConfig::new().with_options(options_from_env(&REPOSITORY_ENV));
    let path = config.base_path().join(&relative);
    let client_settings = AzureStorageSettings::from_options(&options_from_env(&CLIENT_ENV))?;

    let mut clients = HashMap::new();
    clients.insert(config.client_name().to_string(), client_settings);
    let service = Arc::new(AzureStorageService::new(clients)?);
    let store = Arc::new(AzureBlobStore::new(&config, service)?);

    info!(
        "Probing container={} client={} location_mode={}",
        store,
        store.client_name(),
        store.location_mode()
    );

    if !store.container_exists().await? {
        println!("container [{}] does not exist", store);
        return Ok(());
    }

    let container = store.blob_container(path);
    let blobs = container.list_blobs_by_prefix(prefix.as_deref()).await?;
    let mut names: Vec<_> = blobs.values().collect();
    names.sort_by(|a, b| a.name.cmp(&b.name));

    println!(
        "{} blob(s) under {}",
        names.len(),
        container.path().build_as_string()
    );
    for blob in names {
        println!("{:>12}  {}", blob.length, blob.name);
    }

    store.close()?;
    Ok(())
}
