use std::net::SocketAddr;
use std::sync::Arc;

use common::storage::BlobStore;
use common::storage::filesystem::FilesystemBlobStore;
use reqwest::Client;
use reqwest::redirect::Policy;
use sea_orm::{ConnectOptions, Database};
use serde_json::Value;
use tempfile::TempDir;

use depot::catalog::{Catalog, NewUser};
use depot::config::{
    AnalyticsConfig, AppConfig, AuthConfig, BootstrapConfig, DatabaseConfig, GeoIpConfig,
    RuntimeEnv, ServerConfig, StorageConfig, UploadConfig, WorkerConfig,
};
use depot::geoip::GeoIpResolver;
use depot::seed::NO_PASSWORD;
use depot::state::AppState;
use depot::worker::Worker;

pub const BASE_URL: &str = "http://depot.test";

pub mod routes {
    pub const UPLOADS: &str = "/api/v1/uploads";
    pub const ITEMS: &str = "/api/v1/items";
    pub const STATS: &str = "/api/v1/stats";
    pub const URLS: &str = "/api/v1/urls";
    pub const TOKENS: &str = "/api/v1/tokens";
    pub const HEALTH: &str = "/health";

    pub fn upload_with_style(style: &str) -> String {
        format!("/api/v1/uploads?style={style}")
    }

    pub fn item(id: &str) -> String {
        format!("/api/v1/items/{id}")
    }

    pub fn file(reference: &str) -> String {
        format!("/f/{reference}")
    }

    pub fn short(code: &str) -> String {
        format!("/s/{code}")
    }

    pub fn url(id_or_code: impl std::fmt::Display) -> String {
        format!("/api/v1/urls/{id_or_code}")
    }

    pub fn url_analytics(id: i64) -> String {
        format!("/api/v1/urls/{id}/analytics")
    }

    pub fn token(id: i64) -> String {
        format!("/api/v1/tokens/{id}")
    }
}

/// A running test server over an in-memory catalog and a temporary blob directory.
pub struct TestApp {
    pub addr: SocketAddr,
    pub client: Client,
    pub state: AppState,
    pub store: Arc<dyn BlobStore>,
    _blobs: TempDir,
    spool: TempDir,
}

/// Parsed HTTP response for test assertions.
pub struct TestResponse {
    pub status: u16,
    pub headers: reqwest::header::HeaderMap,
    /// Raw response body.
    pub bytes: Vec<u8>,
    /// Parsed JSON body, or `Null` if the response is not valid JSON.
    pub body: Value,
}

impl TestResponse {
    async fn from_response(res: reqwest::Response) -> Self {
        let status = res.status().as_u16();
        let headers = res.headers().clone();
        let bytes = res
            .bytes()
            .await
            .expect("Failed to read response body")
            .to_vec();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        Self {
            status,
            headers,
            bytes,
            body,
        }
    }

    pub fn header(&self, name: &str) -> &str {
        self.headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
    }

    pub fn code(&self) -> &str {
        self.body["code"].as_str().unwrap_or_default()
    }
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with(UploadConfig::default(), WorkerConfig::default()).await
    }

    pub async fn spawn_with_upload(upload: UploadConfig) -> Self {
        Self::spawn_with(upload, WorkerConfig::default()).await
    }

    pub async fn spawn_with(mut upload: UploadConfig, worker: WorkerConfig) -> Self {
        let mut opts = ConnectOptions::new("sqlite::memory:");
        // Every pooled connection to `:memory:` is its own database.
        opts.max_connections(1).min_connections(1).sqlx_logging(false);
        let db = Database::connect(opts)
            .await
            .expect("Failed to open in-memory database");
        depot::database::sync_schema(&db)
            .await
            .expect("Failed to create schema");
        depot::seed::ensure_indexes(&db).await;

        let blobs = tempfile::tempdir().expect("Failed to create blob directory");
        let store: Arc<dyn BlobStore> = Arc::new(
            FilesystemBlobStore::new(blobs.path().to_path_buf())
                .await
                .expect("Failed to open blob store"),
        );

        let spool = tempfile::tempdir().expect("Failed to create spool directory");
        upload
            .spool_dir
            .get_or_insert_with(|| spool.path().to_path_buf());

        let config = AppConfig {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                base_url: BASE_URL.to_string(),
                env: RuntimeEnv::Dev,
            },
            auth: AuthConfig {
                secret: "test-secret-for-integration-tests".to_string(),
            },
            database: DatabaseConfig::default(),
            upload,
            storage: StorageConfig::default(),
            geoip: GeoIpConfig::default(),
            worker,
            analytics: AnalyticsConfig::default(),
            bootstrap: BootstrapConfig::default(),
        };

        let state = AppState::new(
            config,
            db,
            store.clone(),
            Arc::new(GeoIpResolver::disabled()),
        )
        .expect("Failed to build state");

        let app = depot::build_router(state.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .unwrap();
        });

        let client = Client::builder()
            .redirect(Policy::none())
            .build()
            .expect("Failed to build HTTP client");

        Self {
            addr,
            client,
            state,
            store,
            _blobs: blobs,
            spool,
        }
    }

    /// Request bodies still staged on disk.
    pub fn spooled_files(&self) -> usize {
        std::fs::read_dir(self.spool.path())
            .expect("Failed to read spool directory")
            .count()
    }

    pub fn catalog(&self) -> &Catalog {
        &self.state.catalog
    }

    pub fn worker(&self) -> Worker {
        Worker::new(
            self.state.catalog.clone(),
            self.store.clone(),
            &self.state.config.worker,
        )
    }

    /// Create a user directly in the catalog and return a fresh API token for it.
    pub async fn create_user(&self, username: &str) -> (i32, String) {
        let user = self
            .catalog()
            .create_user(NewUser {
                email: format!("{username}@depot.test"),
                username: username.to_string(),
                password_verifier: NO_PASSWORD.to_string(),
            })
            .await
            .expect("Failed to create user");
        let issued = self
            .state
            .tokens
            .issue(user.id, "test", None)
            .await
            .expect("Failed to issue token");
        (user.id, issued.value)
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn get(&self, path: &str) -> TestResponse {
        let res = self
            .client
            .get(self.url(path))
            .send()
            .await
            .expect("Failed to send GET request");
        TestResponse::from_response(res).await
    }

    pub async fn get_with_headers(&self, path: &str, headers: &[(&str, &str)]) -> TestResponse {
        let mut req = self.client.get(self.url(path));
        for (name, value) in headers {
            req = req.header(*name, *value);
        }
        let res = req.send().await.expect("Failed to send GET request");
        TestResponse::from_response(res).await
    }

    pub async fn get_with_token(&self, path: &str, token: &str) -> TestResponse {
        let res = self
            .client
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("Failed to send GET request");
        TestResponse::from_response(res).await
    }

    pub async fn post_with_token(&self, path: &str, body: &Value, token: &str) -> TestResponse {
        let res = self
            .client
            .post(self.url(path))
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .expect("Failed to send POST request");
        TestResponse::from_response(res).await
    }

    pub async fn post_without_token(&self, path: &str, body: &Value) -> TestResponse {
        let res = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .expect("Failed to send POST request");
        TestResponse::from_response(res).await
    }

    pub async fn patch_with_token(&self, path: &str, body: &Value, token: &str) -> TestResponse {
        let res = self
            .client
            .patch(self.url(path))
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .expect("Failed to send PATCH request");
        TestResponse::from_response(res).await
    }

    pub async fn delete_with_token(&self, path: &str, token: &str) -> TestResponse {
        let res = self
            .client
            .delete(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("Failed to send DELETE request");
        TestResponse::from_response(res).await
    }

    pub async fn upload_with_token(
        &self,
        path: &str,
        file_name: &str,
        file_bytes: Vec<u8>,
        token: &str,
    ) -> TestResponse {
        let part = reqwest::multipart::Part::bytes(file_bytes).file_name(file_name.to_string());
        let form = reqwest::multipart::Form::new().part("file", part);

        let res = self
            .client
            .post(self.url(path))
            .bearer_auth(token)
            .multipart(form)
            .send()
            .await
            .expect("Failed to send upload request");
        TestResponse::from_response(res).await
    }

    /// Upload with the default style and assert success.
    pub async fn upload(&self, file_name: &str, file_bytes: &[u8], token: &str) -> Value {
        let res = self
            .upload_with_token(routes::UPLOADS, file_name, file_bytes.to_vec(), token)
            .await;
        assert_eq!(res.status, 201, "upload failed: {}", res.body);
        res.body
    }

    /// Create a short URL and assert success.
    pub async fn shorten(&self, body: &Value, token: &str) -> Value {
        let res = self.post_with_token(routes::URLS, body, token).await;
        assert_eq!(res.status, 201, "shorten failed: {}", res.body);
        res.body
    }

    /// Keys currently held by the blob store.
    pub async fn blob_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .store
            .enumerate("")
            .await
            .expect("Failed to enumerate blobs")
            .into_iter()
            .map(|info| info.name)
            .collect();
        keys.sort();
        keys
    }
}
