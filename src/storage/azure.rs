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

use super::error::{is_container_not_found, StorageError, StorageResult};
use super::path::{prefix_path, string_to_path};
use super::service::{BlobMetadata, BlobReader, BlobStream, SettingsSnapshot, StorageService};
use super::settings::{AzureStorageSettings, Location, LocationMode};
use async_trait::async_trait;
use futures::stream::{StreamExt, TryStreamExt};
use object_store::{
    azure::MicrosoftAzureBuilder, ClientOptions, ObjectStore, PutMode, PutPayload, RetryConfig,
};
use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::io::AsyncReadExt;
use tracing::{debug, info, warn};

/// Upper bound on the buffer reserved up front from a declared blob size.
const MAX_PREALLOCATED_BYTES: u64 = 8 * 1024 * 1024;

/// Builds the backend store serving one container at one replica location.
pub trait StoreFactory: Send + Sync {
    fn build(
        &self,
        settings: &AzureStorageSettings,
        container: &str,
        location: Location,
    ) -> StorageResult<Arc<dyn ObjectStore>>;
}

/// Factory talking to Azure Blob Storage through `object_store`.
#[derive(Debug, Default, Clone, Copy)]
pub struct AzureStoreFactory;

impl AzureStoreFactory {
    /// Build connection options from client settings.
    fn build_connection_options(settings: &AzureStorageSettings) -> ClientOptions {
        let mut client_options = ClientOptions::default();
        if let Some(timeout) = settings.timeout {
            client_options = client_options.with_timeout(timeout);
        }
        if let Some(proxy_url) = &settings.proxy_url {
            client_options = client_options.with_proxy_url(proxy_url);
        }
        client_options
    }

    /// Build retry options from client settings.
    fn build_retry_options(settings: &AzureStorageSettings) -> RetryConfig {
        RetryConfig {
            max_retries: settings.max_retries,
            ..RetryConfig::default()
        }
    }

    /// Split a SAS token into its query pairs.
    fn parse_sas_token(token: &str) -> Vec<(String, String)> {
        token
            .trim_start_matches('?')
            .split('&')
            .filter_map(|pair| {
                let mut parts = pair.splitn(2, '=');
                match (parts.next(), parts.next()) {
                    (Some(k), Some(v)) if !k.is_empty() => Some((k.to_string(), v.to_string())),
                    _ => None,
                }
            })
            .collect()
    }
}

impl StoreFactory for AzureStoreFactory {
    fn build(
        &self,
        settings: &AzureStorageSettings,
        container: &str,
        location: Location,
    ) -> StorageResult<Arc<dyn ObjectStore>> {
        let endpoint = settings.endpoint_for(location)?;
        let mut builder = MicrosoftAzureBuilder::new()
            .with_account(&settings.account)
            .with_container_name(container)
            .with_client_options(Self::build_connection_options(settings))
            .with_retry(Self::build_retry_options(settings));

        // Always explicit: the builder's own default ignores `endpoint_suffix`.
        builder = builder.with_endpoint(endpoint.as_str().trim_end_matches('/').to_string());
        if endpoint.scheme() == "http" {
            builder = builder.with_allow_http(true);
        }
        if let Some(key) = &settings.key {
            builder = builder.with_access_key(key);
        }
        if let Some(sas_token) = &settings.sas_token {
            builder = builder.with_sas_authorization(Self::parse_sas_token(sas_token));
        }

        let store = builder.build().map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create Azure store for account [{}]: {}",
                settings.account, e
            ))
        })?;
        Ok(Arc::new(store))
    }
}

type ClientKey = (String, String, Location);

/// Blob service client shared by every repository of a process.
///
/// Holds the settings cache (client profile name to settings) and lazily built
/// backend stores keyed by profile, container and replica location. Reads are
/// routed by the profile's [`LocationMode`]; writes and deletes always go to
/// the primary.
///
/// The location mode stored in the cache is whatever the most recently
/// constructed repository wrote. Repositories that share one service and ask
/// for different modes override each other.
pub struct AzureStorageService {
    settings: RwLock<SettingsSnapshot>,
    clients: RwLock<HashMap<ClientKey, Arc<dyn ObjectStore>>>,
    factory: Arc<dyn StoreFactory>,
}

impl AzureStorageService {
    /// Create a service that talks to Azure.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::ConfigError` if any client profile is malformed.
    pub fn new(settings: HashMap<String, AzureStorageSettings>) -> StorageResult<Self> {
        Self::with_factory(settings, Arc::new(AzureStoreFactory))
    }

    /// Create a service whose backend stores come from `factory`.
    pub fn with_factory(
        settings: HashMap<String, AzureStorageSettings>,
        factory: Arc<dyn StoreFactory>,
    ) -> StorageResult<Self> {
        Self::validate_all(&settings)?;
        Ok(Self {
            settings: RwLock::new(Arc::new(settings)),
            clients: RwLock::new(HashMap::new()),
            factory,
        })
    }

    fn validate_all(settings: &HashMap<String, AzureStorageSettings>) -> StorageResult<()> {
        for (name, client) in settings {
            client.validate().map_err(|e| {
                StorageError::ConfigError(format!("Invalid settings for client [{}]: {}", name, e))
            })?;
        }
        Ok(())
    }

    fn settings_for(&self, client_name: &str) -> StorageResult<AzureStorageSettings> {
        let settings = self.settings.read().unwrap_or_else(PoisonError::into_inner);
        settings
            .get(client_name)
            .cloned()
            .ok_or_else(|| unknown_client(client_name))
    }

    /// Location mode the cache currently holds for `client_name`.
    pub fn location_mode(&self, client_name: &str) -> StorageResult<LocationMode> {
        Ok(self.settings_for(client_name)?.location_mode)
    }

    /// Backend store for a profile, container and location, built on first use.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::ConfigError` for an unknown profile or when the
    /// store cannot be built from its settings.
    pub fn client(
        &self,
        client_name: &str,
        container: &str,
        location: Location,
    ) -> StorageResult<Arc<dyn ObjectStore>> {
        // Holding the settings lock keeps a concurrent refresh from clearing
        // the client map between lookup and insert.
        let settings = self.settings.read().unwrap_or_else(PoisonError::into_inner);
        let client_settings = settings
            .get(client_name)
            .ok_or_else(|| unknown_client(client_name))?;

        let key = (client_name.to_string(), container.to_string(), location);
        if let Some(store) = self
            .clients
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            return Ok(Arc::clone(store));
        }

        debug!(
            "Building client={} container={} location={:?}",
            client_name, container, location
        );
        let store = self.factory.build(client_settings, container, location)?;
        let mut clients = self.clients.write().unwrap_or_else(PoisonError::into_inner);
        Ok(Arc::clone(clients.entry(key).or_insert(store)))
    }

    fn write_client(
        &self,
        client_name: &str,
        container: &str,
    ) -> StorageResult<Arc<dyn ObjectStore>> {
        let location_mode = self.location_mode(client_name)?;
        if !location_mode.allows_writes() {
            return Err(StorageError::access(format!(
                "Client [{}] uses location mode {} which cannot write to container [{}]",
                client_name, location_mode, container
            )));
        }
        self.client(client_name, container, Location::Primary)
    }

    /// Run a read-only operation against the profile's locations in order.
    async fn on_read_locations<T, F, Fut>(
        &self,
        client_name: &str,
        container: &str,
        operation: F,
    ) -> StorageResult<T>
    where
        F: FnMut(Arc<dyn ObjectStore>) -> Fut,
        Fut: Future<Output = StorageResult<T>>,
    {
        let location_mode = self.location_mode(client_name)?;
        let mut stores = Vec::with_capacity(2);
        for location in location_mode.read_locations() {
            stores.push((*location, self.client(client_name, container, *location)?));
        }
        try_locations(stores, operation).await
    }
}

fn unknown_client(client_name: &str) -> StorageError {
    StorageError::ConfigError(format!("Unable to find client with name [{client_name}]"))
}

/// Try `operation` on each `(location, target)` in order.
///
/// Only access failures move on to the next location; any other error, such
/// as `NotFound`, is final.
pub(crate) async fn try_locations<S, T, F, Fut>(
    targets: Vec<(Location, S)>,
    mut operation: F,
) -> StorageResult<T>
where
    F: FnMut(S) -> Fut,
    Fut: Future<Output = StorageResult<T>>,
{
    let attempts = targets.len();
    let mut last_error = None;

    for (attempt, (location, target)) in targets.into_iter().enumerate() {
        match operation(target).await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_access_error() && attempt + 1 < attempts => {
                warn!(
                    "Request to {:?} location failed, trying next location: {}",
                    location, e
                );
                last_error = Some(e);
            }
            Err(e) => return Err(e),
        }
    }

    Err(last_error.unwrap_or_else(|| StorageError::access("No location available for request")))
}

#[async_trait]
impl StorageService for AzureStorageService {
    fn settings_snapshot(&self) -> SettingsSnapshot {
        Arc::clone(&self.settings.read().unwrap_or_else(PoisonError::into_inner))
    }

    fn refresh_and_clear_cache(
        &self,
        new_settings: HashMap<String, AzureStorageSettings>,
    ) -> StorageResult<SettingsSnapshot> {
        Self::validate_all(&new_settings)?;

        let mut settings = self.settings.write().unwrap_or_else(PoisonError::into_inner);
        let previous = std::mem::replace(&mut *settings, Arc::new(new_settings));
        // clients are rebuilt lazily from the new settings
        self.clients
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();

        info!(
            "Refreshed storage settings for client_count={}",
            settings.len()
        );
        Ok(previous)
    }

    async fn does_container_exist(
        &self,
        client_name: &str,
        container: &str,
    ) -> StorageResult<bool> {
        self.on_read_locations(client_name, container, |store| async move {
            match store.list_with_delimiter(None).await {
                Ok(_) => Ok(true),
                Err(e) if is_container_not_found(&e) => Ok(false),
                Err(e) => Err(StorageError::from(e)),
            }
        })
        .await
    }

    async fn blob_exists(
        &self,
        client_name: &str,
        container: &str,
        blob: &str,
    ) -> StorageResult<bool> {
        let path = string_to_path(blob);
        self.on_read_locations(client_name, container, |store| {
            let path = path.clone();
            async move {
                match store.head(&path).await {
                    Ok(_) => Ok(true),
                    Err(object_store::Error::NotFound { .. }) => Ok(false),
                    Err(e) => Err(StorageError::from(e)),
                }
            }
        })
        .await
    }

    async fn get_input_stream(
        &self,
        client_name: &str,
        container: &str,
        blob: &str,
    ) -> StorageResult<BlobStream> {
        debug!("Reading blob={} container={}", blob, container);
        let path = string_to_path(blob);
        self.on_read_locations(client_name, container, |store| {
            let path = path.clone();
            async move {
                let result = store.get(&path).await?;
                let stream: BlobStream = result.into_stream().map_err(StorageError::from).boxed();
                Ok::<_, StorageError>(stream)
            }
        })
        .await
    }

    /// Buffers the whole of `input` in memory before issuing a single put, so
    /// peak memory grows with the blob size. Only the up-front reservation is
    /// capped, at 8 MiB.
    async fn write_blob(
        &self,
        client_name: &str,
        container: &str,
        blob: &str,
        mut input: BlobReader,
        blob_size: u64,
        fail_if_exists: bool,
    ) -> StorageResult<()> {
        debug!(
            "Writing blob={} container={} size={} fail_if_exists={}",
            blob, container, blob_size, fail_if_exists
        );
        let store = self.write_client(client_name, container)?;

        let capacity = blob_size.min(MAX_PREALLOCATED_BYTES) as usize;
        let mut buf = Vec::with_capacity(capacity);
        input.read_to_end(&mut buf).await?;

        let mode = if fail_if_exists {
            PutMode::Create
        } else {
            PutMode::Overwrite
        };
        store
            .put_opts(&string_to_path(blob), PutPayload::from(buf), mode.into())
            .await?;
        Ok(())
    }

    async fn delete_blob(
        &self,
        client_name: &str,
        container: &str,
        blob: &str,
    ) -> StorageResult<()> {
        debug!("Deleting blob={} container={}", blob, container);
        let store = self.write_client(client_name, container)?;
        store.delete(&string_to_path(blob)).await?;
        Ok(())
    }

    async fn delete_files(
        &self,
        client_name: &str,
        container: &str,
        path: &str,
    ) -> StorageResult<()> {
        let store = self.write_client(client_name, container)?;
        let prefix = prefix_path(path);

        let locations = store
            .list(prefix.as_ref())
            .map_ok(|meta| meta.location)
            .boxed();
        let mut deleted = store.delete_stream(locations);
        let mut count = 0usize;
        while let Some(result) = deleted.next().await {
            result?;
            count += 1;
        }

        info!(
            "Deleted file_count={} under path={} in container={}",
            count, path, container
        );
        Ok(())
    }

    async fn list_blobs_by_prefix(
        &self,
        client_name: &str,
        container: &str,
        key_path: &str,
        prefix: Option<&str>,
    ) -> StorageResult<HashMap<String, BlobMetadata>> {
        debug!(
            "Listing blobs under path={} prefix={:?} container={}",
            key_path, prefix, container
        );
        let list_prefix = prefix_path(key_path);
        let name_prefix = prefix.unwrap_or_default().to_string();

        self.on_read_locations(client_name, container, |store| {
            let list_prefix = list_prefix.clone();
            let name_prefix = name_prefix.clone();
            async move {
                let list_result = store.list_with_delimiter(list_prefix.as_ref()).await?;
                let blobs = list_result
                    .objects
                    .into_iter()
                    .filter_map(|meta| {
                        let name = meta.location.filename()?.to_string();
                        if !name.starts_with(&name_prefix) {
                            return None;
                        }
                        let metadata = BlobMetadata {
                            name: name.clone(),
                            length: meta.size as u64,
                            last_modified: Some(meta.last_modified),
                        };
                        Some((name, metadata))
                    })
                    .collect::<HashMap<_, _>>();
                Ok::<_, StorageError>(blobs)
            }
        })
        .await
    }
}

impl Debug for AzureStorageService {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let snapshot = self.settings_snapshot();
        let mut clients: Vec<&String> = snapshot.keys().collect();
        clients.sort();
        write!(f, "AzureStorageService(clients={:?})", clients)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::storage::service::read_to_vec;
    use object_store::local::LocalFileSystem;
    use object_store::memory::InMemory;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tempfile::TempDir;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// In-memory backend with one independent store per container and location.
    #[derive(Default)]
    pub(crate) struct MemoryStoreFactory {
        stores: Mutex<HashMap<(String, Location), Arc<InMemory>>>,
        pub(crate) builds: AtomicUsize,
    }

    impl MemoryStoreFactory {
        pub(crate) fn store(&self, container: &str, location: Location) -> Arc<InMemory> {
            let mut stores = self.stores.lock().unwrap();
            Arc::clone(
                stores
                    .entry((container.to_string(), location))
                    .or_insert_with(|| Arc::new(InMemory::new())),
            )
        }
    }

    impl StoreFactory for MemoryStoreFactory {
        fn build(
            &self,
            _settings: &AzureStorageSettings,
            container: &str,
            location: Location,
        ) -> StorageResult<Arc<dyn ObjectStore>> {
            self.builds.fetch_add(1, Ordering::SeqCst);
            Ok(self.store(container, location))
        }
    }

    pub(crate) fn profile(mode: LocationMode) -> AzureStorageSettings {
        AzureStorageSettings::new("devaccount")
            .with_key("c2VjcmV0")
            .with_location_mode(mode)
    }

    pub(crate) fn memory_service(
        mode: LocationMode,
    ) -> (Arc<AzureStorageService>, Arc<MemoryStoreFactory>) {
        let factory = Arc::new(MemoryStoreFactory::default());
        let mut settings = HashMap::new();
        settings.insert("default".to_string(), profile(mode));
        let service = AzureStorageService::with_factory(settings, factory.clone()).unwrap();
        (Arc::new(service), factory)
    }

    fn reader(data: &'static [u8]) -> BlobReader {
        Box::new(data)
    }

    /// Azure-style error reply carrying `code` in header and body.
    fn error_response(status: &str, code: &str) -> String {
        let body = format!(
            "<?xml version=\"1.0\" encoding=\"utf-8\"?><Error><Code>{code}</Code>\
             <Message>{code}</Message></Error>"
        );
        format!(
            "HTTP/1.1 {status}\r\nContent-Type: application/xml\r\nx-ms-error-code: {code}\r\n\
             Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        )
    }

    /// Local HTTP listener answering every request with `response`.
    ///
    /// Returns its base URL and the request lines it has received.
    async fn serve_endpoint(response: String) -> (String, Arc<Mutex<Vec<String>>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = format!("http://{}", listener.local_addr().unwrap());
        let requests = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&requests);

        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let mut head = Vec::new();
                let mut buf = [0u8; 1024];
                loop {
                    let n = socket.read(&mut buf).await.unwrap_or(0);
                    if n == 0 {
                        break;
                    }
                    head.extend_from_slice(&buf[..n]);
                    if head.windows(4).any(|w| w == b"\r\n\r\n") {
                        break;
                    }
                }
                let request_line = String::from_utf8_lossy(&head)
                    .lines()
                    .next()
                    .unwrap_or_default()
                    .to_string();
                seen.lock().unwrap().push(request_line);
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });

        (address, requests)
    }

    /// Real Azure-backed service whose single profile is `settings`.
    fn azure_service(mut settings: AzureStorageSettings) -> AzureStorageService {
        settings.max_retries = 0;
        let mut clients = HashMap::new();
        clients.insert("default".to_string(), settings);
        AzureStorageService::new(clients).unwrap()
    }

    #[test]
    fn test_parse_sas_token() {
        let pairs = AzureStoreFactory::parse_sas_token("?sv=2022-11-02&sig=a%2Fb=&bad&=x");
        assert_eq!(
            pairs,
            vec![
                ("sv".to_string(), "2022-11-02".to_string()),
                ("sig".to_string(), "a%2Fb=".to_string()),
            ]
        );
    }

    #[test]
    fn test_build_retry_options() {
        let mut settings = profile(LocationMode::PrimaryOnly);
        settings.max_retries = 9;
        let retry = AzureStoreFactory::build_retry_options(&settings);
        assert_eq!(retry.max_retries, 9);
        assert_eq!(retry.retry_timeout, RetryConfig::default().retry_timeout);
    }

    #[test]
    fn test_azure_factory_builds_store() {
        let settings = profile(LocationMode::PrimaryOnly);
        let store = AzureStoreFactory.build(&settings, "snapshots", Location::Primary);
        assert!(store.is_ok());
        let secondary = AzureStoreFactory.build(&settings, "snapshots", Location::Secondary);
        assert!(secondary.is_ok());
    }

    #[test]
    fn test_azure_factory_rejects_bad_key() {
        let settings = AzureStorageSettings::new("devaccount").with_key("%%% not base64 %%%");
        let result = AzureStoreFactory.build(&settings, "snapshots", Location::Primary);
        assert!(matches!(result, Err(StorageError::ConfigError(_))));
    }

    #[test]
    fn test_new_rejects_malformed_settings() {
        let mut settings = HashMap::new();
        settings.insert("default".to_string(), AzureStorageSettings::new("acct"));
        let result = AzureStorageService::new(settings);
        match result {
            Err(StorageError::ConfigError(msg)) => assert!(msg.contains("[default]")),
            other => panic!("Expected ConfigError, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_refresh_returns_previous_and_swaps() {
        let (service, _) = memory_service(LocationMode::PrimaryOnly);

        let mut next = HashMap::new();
        next.insert("other".to_string(), profile(LocationMode::SecondaryOnly));
        let previous = service.refresh_and_clear_cache(next).unwrap();

        assert!(previous.contains_key("default"));
        let current = service.settings_snapshot();
        assert!(current.contains_key("other"));
        assert!(!current.contains_key("default"));
    }

    #[test]
    fn test_refresh_with_invalid_settings_leaves_cache_untouched() {
        let (service, _) = memory_service(LocationMode::PrimaryThenSecondary);

        let mut next = HashMap::new();
        next.insert("default".to_string(), AzureStorageSettings::new(""));
        let result = service.refresh_and_clear_cache(next);

        assert!(matches!(result, Err(StorageError::ConfigError(_))));
        assert_eq!(
            service.location_mode("default").unwrap(),
            LocationMode::PrimaryThenSecondary
        );
    }

    #[test]
    fn test_refresh_clears_client_cache() {
        let (service, factory) = memory_service(LocationMode::PrimaryOnly);

        service.client("default", "c", Location::Primary).unwrap();
        service.client("default", "c", Location::Primary).unwrap();
        assert_eq!(factory.builds.load(Ordering::SeqCst), 1);

        let snapshot = (*service.settings_snapshot()).clone();
        service.refresh_and_clear_cache(snapshot).unwrap();
        service.client("default", "c", Location::Primary).unwrap();
        assert_eq!(factory.builds.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_unknown_client() {
        let (service, _) = memory_service(LocationMode::PrimaryOnly);
        match service.client("missing", "c", Location::Primary) {
            Err(StorageError::ConfigError(msg)) => {
                assert_eq!(msg, "Unable to find client with name [missing]")
            }
            other => panic!("Expected ConfigError, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_write_read_exists_delete() {
        let (service, _) = memory_service(LocationMode::PrimaryOnly);

        service
            .write_blob("default", "c", "dir/blob", reader(b"payload"), 7, true)
            .await
            .unwrap();
        assert!(service.blob_exists("default", "c", "dir/blob").await.unwrap());

        let stream = service
            .get_input_stream("default", "c", "dir/blob")
            .await
            .unwrap();
        assert_eq!(read_to_vec(stream).await.unwrap(), b"payload");

        service.delete_blob("default", "c", "dir/blob").await.unwrap();
        assert!(!service.blob_exists("default", "c", "dir/blob").await.unwrap());
    }

    #[tokio::test]
    async fn test_write_overwrite_allowed_without_fail_if_exists() {
        let (service, _) = memory_service(LocationMode::PrimaryOnly);

        service
            .write_blob("default", "c", "b", reader(b"one"), 3, false)
            .await
            .unwrap();
        service
            .write_blob("default", "c", "b", reader(b"two!"), 4, false)
            .await
            .unwrap();

        let stream = service.get_input_stream("default", "c", "b").await.unwrap();
        assert_eq!(read_to_vec(stream).await.unwrap(), b"two!");
    }

    #[tokio::test]
    async fn test_get_input_stream_missing_blob() {
        let (service, _) = memory_service(LocationMode::PrimaryOnly);
        let result = service.get_input_stream("default", "c", "nope").await;
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_container_exists() {
        let (service, _) = memory_service(LocationMode::PrimaryOnly);
        assert!(service.does_container_exist("default", "c").await.unwrap());
    }

    #[tokio::test]
    async fn test_missing_container_does_not_exist() {
        let (address, requests) =
            serve_endpoint(error_response("404 Not Found", "ContainerNotFound")).await;
        let service = azure_service(
            profile(LocationMode::PrimaryOnly).with_endpoint(format!("{address}/devaccount")),
        );

        let exists = service.does_container_exist("default", "missing").await;
        assert!(matches!(exists, Ok(false)), "got {:?}", exists);

        let requests = requests.lock().unwrap();
        assert!(requests[0].starts_with("GET /devaccount/missing?"));
        assert!(requests[0].contains("restype=container"));
    }

    #[tokio::test]
    async fn test_container_check_keeps_other_failures() {
        let (address, _) =
            serve_endpoint(error_response("403 Forbidden", "AuthenticationFailed")).await;
        let service = azure_service(
            profile(LocationMode::PrimaryOnly).with_endpoint(format!("{address}/devaccount")),
        );

        let exists = service.does_container_exist("default", "locked").await;
        assert!(matches!(exists, Err(StorageError::AccessError { .. })));
    }

    #[tokio::test]
    async fn test_primary_store_uses_endpoint_suffix() {
        let (proxy, requests) =
            serve_endpoint("HTTP/1.1 502 Bad Gateway\r\nContent-Length: 0\r\n\r\n".to_string())
                .await;
        let mut settings = profile(LocationMode::PrimaryOnly);
        settings.endpoint_suffix = "core.chinacloudapi.cn".to_string();
        settings.proxy_url = Some(proxy);
        let service = azure_service(settings);

        let result = service.blob_exists("default", "c", "blob").await;
        assert!(result.is_err());

        let requests = requests.lock().unwrap();
        assert!(
            requests[0].starts_with("CONNECT devaccount.blob.core.chinacloudapi.cn:443"),
            "got {:?}",
            requests
        );
    }

    #[tokio::test]
    async fn test_list_blobs_by_prefix_direct_children_only() {
        let (service, _) = memory_service(LocationMode::PrimaryOnly);

        for (name, body) in [
            ("base/index-1", &b"a"[..]),
            ("base/index-22", &b"bb"[..]),
            ("base/meta-1", &b"ccc"[..]),
            ("base/nested/index-3", &b"dddd"[..]),
            ("other/index-4", &b"eeeee"[..]),
        ] {
            service
                .write_blob("default", "c", name, reader(body), body.len() as u64, true)
                .await
                .unwrap();
        }

        let listed = service
            .list_blobs_by_prefix("default", "c", "base/", Some("index-"))
            .await
            .unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed["index-1"].length, 1);
        assert_eq!(listed["index-22"].length, 2);
        assert!(listed["index-22"].last_modified.is_some());

        let all = service
            .list_blobs_by_prefix("default", "c", "base/", None)
            .await
            .unwrap();
        assert_eq!(all.len(), 3);

        let none = service
            .list_blobs_by_prefix("default", "c", "base/", Some("snap-"))
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_delete_files_removes_everything_under_prefix() {
        let (service, _) = memory_service(LocationMode::PrimaryOnly);

        for name in ["idx/a", "idx/sub/b", "idxother/c", "keep/d"] {
            service
                .write_blob("default", "c", name, reader(b"x"), 1, true)
                .await
                .unwrap();
        }

        service.delete_files("default", "c", "idx/").await.unwrap();

        assert!(!service.blob_exists("default", "c", "idx/a").await.unwrap());
        assert!(!service.blob_exists("default", "c", "idx/sub/b").await.unwrap());
        assert!(service.blob_exists("default", "c", "idxother/c").await.unwrap());
        assert!(service.blob_exists("default", "c", "keep/d").await.unwrap());
    }

    #[tokio::test]
    async fn test_secondary_only_reads_secondary_and_refuses_writes() {
        let (service, factory) = memory_service(LocationMode::SecondaryOnly);

        factory
            .store("c", Location::Secondary)
            .put(&string_to_path("replicated"), PutPayload::from_static(b"r"))
            .await
            .unwrap();
        factory
            .store("c", Location::Primary)
            .put(&string_to_path("primary-only"), PutPayload::from_static(b"p"))
            .await
            .unwrap();

        assert!(service.blob_exists("default", "c", "replicated").await.unwrap());
        assert!(!service.blob_exists("default", "c", "primary-only").await.unwrap());

        let write = service
            .write_blob("default", "c", "new", reader(b"n"), 1, false)
            .await;
        assert!(matches!(write, Err(StorageError::AccessError { .. })));
        let delete = service.delete_blob("default", "c", "replicated").await;
        assert!(matches!(delete, Err(StorageError::AccessError { .. })));
    }

    #[tokio::test]
    async fn test_primary_then_secondary_does_not_fall_back_on_not_found() {
        let (service, factory) = memory_service(LocationMode::PrimaryThenSecondary);

        factory
            .store("c", Location::Secondary)
            .put(&string_to_path("stale"), PutPayload::from_static(b"s"))
            .await
            .unwrap();

        let result = service.get_input_stream("default", "c", "stale").await;
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_try_locations_falls_back_on_access_error() {
        let attempts = AtomicUsize::new(0);
        let result = try_locations(
            vec![(Location::Primary, "p"), (Location::Secondary, "s")],
            |target| {
                attempts.fetch_add(1, Ordering::SeqCst);
                async move {
                    if target == "p" {
                        Err(StorageError::access("primary unreachable"))
                    } else {
                        Ok(target)
                    }
                }
            },
        )
        .await;

        assert_eq!(result.unwrap(), "s");
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_try_locations_stops_on_not_found() {
        let attempts = AtomicUsize::new(0);
        let result: StorageResult<&str> = try_locations(
            vec![(Location::Primary, "p"), (Location::Secondary, "s")],
            |_| {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err(StorageError::NotFound("blob".to_string())) }
            },
        )
        .await;

        assert!(matches!(result, Err(StorageError::NotFound(_))));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_try_locations_returns_last_access_error() {
        let result: StorageResult<()> = try_locations(
            vec![(Location::Secondary, 1), (Location::Primary, 2)],
            |n| async move { Err(StorageError::access(format!("down {}", n))) },
        )
        .await;

        match result {
            Err(e) => assert_eq!(e.to_string(), "Access error: down 2"),
            Ok(_) => panic!("Expected an access error"),
        }
    }

    #[tokio::test]
    async fn test_local_filesystem_backend() {
        struct LocalFactory {
            root: std::path::PathBuf,
        }

        impl StoreFactory for LocalFactory {
            fn build(
                &self,
                _settings: &AzureStorageSettings,
                container: &str,
                _location: Location,
            ) -> StorageResult<Arc<dyn ObjectStore>> {
                let dir = self.root.join(container);
                std::fs::create_dir_all(&dir)?;
                let store = LocalFileSystem::new_with_prefix(&dir)?;
                Ok(Arc::new(store))
            }
        }

        let temp_dir = TempDir::new().unwrap();
        let mut settings = HashMap::new();
        settings.insert("default".to_string(), profile(LocationMode::PrimaryOnly));
        let service = AzureStorageService::with_factory(
            settings,
            Arc::new(LocalFactory {
                root: temp_dir.path().to_path_buf(),
            }),
        )
        .unwrap();

        service
            .write_blob("default", "snaps", "indices/0/meta", reader(b"{}"), 2, true)
            .await
            .unwrap();
        assert!(temp_dir.path().join("snaps/indices/0/meta").is_file());

        let again = service
            .write_blob("default", "snaps", "indices/0/meta", reader(b"[]"), 2, true)
            .await;
        assert!(matches!(again, Err(StorageError::AlreadyExists(_))));
        assert_eq!(
            std::fs::read(temp_dir.path().join("snaps/indices/0/meta")).unwrap(),
            b"{}"
        );
    }

    #[test]
    fn test_debug_lists_clients() {
        let (service, _) = memory_service(LocationMode::PrimaryOnly);
        let debug_str = format!("{:?}", service);
        assert!(debug_str.contains("AzureStorageService"));
        assert!(debug_str.contains("default"));
    }
}
