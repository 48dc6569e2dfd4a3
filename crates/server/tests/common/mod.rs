//! Common test utilities for in-process API testing.
//!
//! Builds the real router over a temp-file catalog. The stats cache runs on
//! a [`ManualClock`] so TTL expiry can be driven from the test.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use gamecubby_core::{
    create_authenticator, load_config_from_str, stats::StatsCache, testing::ManualClock,
    LocationStore, SqliteCatalog,
};
use gamecubby_server::{api::create_router, state::AppState};

/// Re-export fixtures for test convenience
pub use gamecubby_core::testing::fixtures;

/// Test fixture for in-process API testing.
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Direct handle on the catalog for seeding
    pub catalog: Arc<SqliteCatalog>,
    /// Clock behind the stats cache
    pub clock: Arc<ManualClock>,
    /// Id of the default storage location
    pub default_location: i64,
    /// Temporary directory for the test database
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

/// Configuration for test fixture.
#[derive(Debug, Clone)]
pub struct TestConfig {
    /// `Some` switches auth to api_key with this key
    pub api_key: Option<String>,
    /// Stats cache TTL in seconds
    pub cache_ttl_secs: u64,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            cache_ttl_secs: 300,
        }
    }
}

impl TestConfig {
    /// Config with api_key auth.
    pub fn with_api_key(key: &str) -> Self {
        Self {
            api_key: Some(key.to_string()),
            ..Default::default()
        }
    }
}

impl TestFixture {
    /// Create a new test fixture with auth disabled.
    pub async fn new() -> Self {
        Self::with_config(TestConfig::default()).await
    }

    /// Create a test fixture with custom configuration.
    pub async fn with_config(test_config: TestConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.db");

        let auth = match &test_config.api_key {
            Some(key) => format!("method = \"api_key\"\napi_key = \"{key}\""),
            None => "method = \"none\"".to_string(),
        };
        let config = load_config_from_str(&format!(
            "[auth]\n{auth}\n\n[database]\npath = \"{}\"\n\n[stats]\ncache_ttl_secs = {}\n",
            db_path.display(),
            test_config.cache_ttl_secs
        ))
        .expect("Failed to parse test config");

        let authenticator =
            create_authenticator(&config.auth).expect("Failed to create authenticator");

        let catalog = Arc::new(
            SqliteCatalog::new(&db_path)
                .expect("Failed to create catalog")
                .with_locations(config.locations.clone()),
        );
        let default_location = catalog
            .ensure_default_location()
            .expect("Failed to create default location");

        let clock = Arc::new(ManualClock::default());
        let cache = Arc::new(StatsCache::with_clock(
            chrono::Duration::seconds(test_config.cache_ttl_secs as i64),
            clock.clone(),
        ));

        let state = Arc::new(AppState::with_stats_cache(
            config,
            authenticator,
            Arc::clone(&catalog),
            cache,
        ));
        let router = create_router(state);

        Self {
            router,
            catalog,
            clock,
            default_location,
            temp_dir,
        }
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None, None).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body), None).await
    }

    /// Send a PATCH request with JSON body.
    pub async fn patch(&self, path: &str, body: Value) -> TestResponse {
        self.request("PATCH", path, Some(body), None).await
    }

    /// Send a DELETE request.
    pub async fn delete(&self, path: &str) -> TestResponse {
        self.request("DELETE", path, None, None).await
    }

    /// Send a request carrying `Authorization: Bearer <key>`.
    pub async fn request_with_key(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
        key: &str,
    ) -> TestResponse {
        self.request(method, path, body, Some(key)).await
    }

    /// Send a request to the test server.
    async fn request(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
        key: Option<&str>,
    ) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        if let Some(key) = key {
            request_builder = request_builder.header("Authorization", format!("Bearer {key}"));
        }

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        let request = request_builder.body(body).unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body }
    }
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status,
            $response.status,
            serde_json::to_string_pretty(&$response.body).unwrap_or_default()
        );
    };
}
