//! Integration tests for the registry HTTP API.
//!
//! Each test starts a server on an ephemeral port and talks to it with
//! reqwest, the same way a client would.

use mcp_registry::{open_backend, RegistryService, StorageSettings};
use mcp_registry_server::auth::{AuthService, NoOpAuth, TokenAuth};
use mcp_registry_server::{start_server, AppState};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

struct TestServer {
    base: String,
    client: reqwest::Client,
    _temp_dir: TempDir,
}

impl TestServer {
    async fn start(settings: StorageSettings, auth: Arc<dyn AuthService>, auth_enabled: bool) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let settings = StorageSettings {
            database_url: temp_dir
                .path()
                .join("registry.sqlite")
                .to_string_lossy()
                .into_owned(),
            ..settings
        };

        let service = RegistryService::new(open_backend(&settings).unwrap());
        let state = Arc::new(AppState::new(service, auth, auth_enabled));
        let addr: SocketAddr = start_server(state, "127.0.0.1:0".parse().unwrap())
            .await
            .unwrap();

        Self {
            base: format!("http://{}", addr),
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .unwrap(),
            _temp_dir: temp_dir,
        }
    }

    async fn memory() -> Self {
        Self::start(StorageSettings::memory(), Arc::new(NoOpAuth), false).await
    }

    async fn get(&self, path: &str) -> (u16, Value) {
        let response = self
            .client
            .get(format!("{}{}", self.base, path))
            .send()
            .await
            .unwrap();
        let status = response.status().as_u16();
        (status, response.json().await.unwrap_or(Value::Null))
    }

    async fn publish(&self, body: &Value, authorization: Option<&str>) -> (u16, Value) {
        let mut request = self
            .client
            .post(format!("{}/v0/publish", self.base))
            .json(body);
        if let Some(authorization) = authorization {
            request = request.header("Authorization", authorization);
        }
        let response = request.send().await.unwrap();
        let status = response.status().as_u16();
        (status, response.json().await.unwrap_or(Value::Null))
    }
}

fn server_body(name: &str, version: &str) -> Value {
    json!({
        "name": name,
        "description": format!("{} server", name),
        "repository": {
            "url": format!("https://github.com/acme/{}", name),
            "source": "github",
            "id": name
        },
        "version_detail": {"version": version},
        "packages": [{
            "registry_name": "npm",
            "name": format!("@acme/{}", name),
            "version": version,
            "environment_variables": [{"name": "API_KEY", "is_secret": true}]
        }]
    })
}

#[tokio::test]
async fn test_health() {
    let server = TestServer::memory().await;
    let (status, body) = server.get("/v0/health").await;

    assert_eq!(status, 200);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["auth_enabled"], false);
    assert_eq!(body["database"]["type"], "memory");
    assert_eq!(body["database"]["is_connected"], true);
}

#[tokio::test]
async fn test_publish_then_fetch_detail() {
    let server = TestServer::memory().await;

    let (status, body) = server
        .publish(&server_body("weather", "1.0.0"), Some("Bearer anything"))
        .await;
    assert_eq!(status, 201);
    assert_eq!(body["message"], "Server publication successful");
    let id = body["id"].as_str().unwrap().to_string();

    let (status, detail) = server.get(&format!("/v0/servers/{}", id)).await;
    assert_eq!(status, 200);
    assert_eq!(detail["id"], id.as_str());
    assert_eq!(detail["version_detail"]["is_latest"], true);
    assert_eq!(detail["packages"][0]["registry_name"], "npm");
    assert_eq!(detail["packages"][0]["environment_variables"][0]["name"], "API_KEY");
}

#[tokio::test]
async fn test_list_omits_packages_and_paginates() {
    let server = TestServer::memory().await;
    for name in ["alpha", "bravo", "charlie"] {
        let (status, _) = server.publish(&server_body(name, "1.0.0"), Some("t")).await;
        assert_eq!(status, 201);
    }

    let (status, first) = server.get("/v0/servers?limit=2").await;
    assert_eq!(status, 200);
    assert_eq!(first["servers"].as_array().unwrap().len(), 2);
    assert!(first["servers"][0].get("packages").is_none());
    assert_eq!(first["metadata"]["count"], 2);
    let cursor = first["metadata"]["next_cursor"].as_str().unwrap().to_string();

    let (status, second) = server
        .get(&format!("/v0/servers?limit=2&cursor={}", cursor))
        .await;
    assert_eq!(status, 200);
    assert_eq!(second["servers"].as_array().unwrap().len(), 1);
    assert!(second.get("metadata").is_none());
}

#[tokio::test]
async fn test_list_filters_by_name() {
    let server = TestServer::memory().await;
    server.publish(&server_body("weather", "1.0.0"), Some("t")).await;
    server.publish(&server_body("files", "1.0.0"), Some("t")).await;

    let (status, body) = server.get("/v0/servers?name=files").await;
    assert_eq!(status, 200);
    let servers = body["servers"].as_array().unwrap();
    assert_eq!(servers.len(), 1);
    assert_eq!(servers[0]["name"], "files");
}

#[tokio::test]
async fn test_list_rejects_bad_parameters() {
    let server = TestServer::memory().await;

    for query in ["limit=0", "limit=101", "limit=ten", "cursor=page-two"] {
        let (status, body) = server.get(&format!("/v0/servers?{}", query)).await;
        assert_eq!(status, 400, "query {}", query);
        assert!(body["error"].is_string(), "query {}", query);
    }
}

#[tokio::test]
async fn test_get_server_errors() {
    let server = TestServer::memory().await;

    let (status, _) = server.get("/v0/servers/not-a-uuid").await;
    assert_eq!(status, 400);

    let (status, body) = server
        .get("/v0/servers/0b5a1a36-4f4e-4a43-9a47-2c6d9c0f7a10")
        .await;
    assert_eq!(status, 404);
    assert_eq!(body["error"], "Server not found");
}

#[tokio::test]
async fn test_publish_validation() {
    let server = TestServer::memory().await;

    let (status, body) = server.publish(&server_body("weather", "1.0.0"), None).await;
    assert_eq!(status, 401);
    assert_eq!(body["error"], "Authorization header is required");

    let (status, body) = server.publish(&server_body("", "1.0.0"), Some("t")).await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "Name is required");

    let (status, body) = server.publish(&server_body("weather", ""), Some("t")).await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "Version is required");
}

#[tokio::test]
async fn test_publish_version_conflicts() {
    let server = TestServer::memory().await;
    server.publish(&server_body("weather", "1.0.0"), Some("t")).await;
    server.publish(&server_body("weather", "2.0.0"), Some("t")).await;

    let (status, body) = server.publish(&server_body("weather", "2.0.0"), Some("t")).await;
    assert_eq!(status, 400);
    assert!(body["error"].as_str().unwrap().contains("already exists"));

    let (status, body) = server.publish(&server_body("weather", "1.0.0"), Some("t")).await;
    assert_eq!(status, 400);
    assert!(body["error"].as_str().unwrap().contains("older version"));
}

#[tokio::test]
async fn test_token_auth() {
    let server = TestServer::start(
        StorageSettings::memory(),
        Arc::new(TokenAuth::new(["secret"])),
        true,
    )
    .await;

    let (status, _) = server
        .publish(&server_body("weather", "1.0.0"), Some("Bearer wrong"))
        .await;
    assert_eq!(status, 401);

    let (status, body) = server.publish(&server_body("weather", "1.0.0"), Some("secret-ish")).await;
    assert_eq!(status, 401);
    assert_eq!(body["error"], "Invalid authentication credentials");

    let (status, _) = server
        .publish(&server_body("weather", "1.0.0"), Some("bearer secret"))
        .await;
    assert_eq!(status, 201);

    let (_, health) = server.get("/v0/health").await;
    assert_eq!(health["auth_enabled"], true);
}

#[tokio::test]
async fn test_sqlite_backend_lists_latest_only() {
    let server = TestServer::start(
        StorageSettings::default(),
        Arc::new(NoOpAuth),
        false,
    )
    .await;

    server.publish(&server_body("weather", "1.0.0"), Some("t")).await;
    server.publish(&server_body("weather", "1.1.0"), Some("t")).await;

    let (status, body) = server.get("/v0/servers").await;
    assert_eq!(status, 200);
    let servers = body["servers"].as_array().unwrap();
    assert_eq!(servers.len(), 1);
    assert_eq!(servers[0]["version_detail"]["version"], "1.1.0");

    let (_, health) = server.get("/v0/health").await;
    assert_eq!(health["database"]["type"], "sqlite");
}
