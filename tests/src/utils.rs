use async_trait::async_trait;
use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;
use tower::ServiceExt;
use xray_gateway::bridge::{Backend, Connector};
use xray_gateway::config::Settings;
use xray_gateway::proto::AlterInboundRequest;
use xray_gateway::{create_router, AppState};

pub const TOKEN: &str = "test-token-5f1c";
pub const ALLOWED_PEER: &str = "10.0.0.7:52100";
pub const FOREIGN_PEER: &str = "10.0.0.8:52100";

pub const VALID_DOC: &str =
    r#"{"log":{"loglevel":"warning"},"inbounds":[{"tag":"vless-in"}],"outbounds":[]}"#;

/// What the mock backend does when a connection is requested.
#[derive(Clone)]
pub enum BackendMode {
    Accept,
    Unreachable,
    Reject(tonic::Status),
    /// Record the call, then wait for the notify before answering OK.
    Hold(Arc<Notify>),
}

/// Everything the mock backend observed.
#[derive(Default)]
pub struct BackendLog {
    pub connects: AtomicUsize,
    pub releases: AtomicUsize,
    pub completed: AtomicUsize,
    pub requests: Mutex<Vec<AlterInboundRequest>>,
}

impl BackendLog {
    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<AlterInboundRequest> {
        self.requests.lock().unwrap().clone()
    }
}

struct MockConnector {
    log: Arc<BackendLog>,
    mode: BackendMode,
}

struct MockBackend {
    log: Arc<BackendLog>,
    reject: Option<tonic::Status>,
    hold: Option<Arc<Notify>>,
}

#[async_trait]
impl Connector for MockConnector {
    fn endpoint(&self) -> &str {
        "http://mock-xray:10085"
    }

    async fn connect(&self) -> Result<Box<dyn Backend>, xray_gateway::Error> {
        self.log.connects.fetch_add(1, Ordering::SeqCst);
        let (reject, hold) = match &self.mode {
            BackendMode::Unreachable => {
                return Err(xray_gateway::Error::ConnectFailed(
                    "tcp connect error: Connection refused".into(),
                ))
            }
            BackendMode::Accept => (None, None),
            BackendMode::Reject(status) => (Some(status.clone()), None),
            BackendMode::Hold(notify) => (None, Some(notify.clone())),
        };
        Ok(Box::new(MockBackend {
            log: self.log.clone(),
            reject,
            hold,
        }))
    }
}

#[async_trait]
impl Backend for MockBackend {
    async fn alter_inbound(&mut self, request: AlterInboundRequest) -> Result<(), tonic::Status> {
        self.log.requests.lock().unwrap().push(request);
        if let Some(notify) = &self.hold {
            notify.notified().await;
        }
        self.log.completed.fetch_add(1, Ordering::SeqCst);
        match &self.reject {
            Some(status) => Err(status.clone()),
            None => Ok(()),
        }
    }
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        self.log.releases.fetch_add(1, Ordering::SeqCst);
    }
}

/// Router plus the state it operates on.
pub struct Harness {
    pub app: Router,
    pub dir: tempfile::TempDir,
    pub backend: Arc<BackendLog>,
}

impl Harness {
    pub fn config_path(&self) -> PathBuf {
        self.dir.path().join("config.json")
    }

    pub fn write_config(&self, contents: &str) {
        std::fs::write(self.config_path(), contents).unwrap();
    }

    pub fn read_config(&self) -> Option<Vec<u8>> {
        std::fs::read(self.config_path()).ok()
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, body.to_vec())
    }
}

pub fn settings(dir: &Path, allowed_ip: Option<&str>, backend_uri: &str) -> Settings {
    Settings {
        config_path: dir.join("config.json"),
        backend_uri: backend_uri.to_string(),
        api_token: TOKEN.to_string(),
        allowed_ip: allowed_ip.map(|ip| ip.parse().unwrap()),
        bind_address: "127.0.0.1:0".to_string(),
    }
}

/// Gateway wired to a mock backend, seeing every request as coming from `peer`.
pub fn harness(allowed_ip: Option<&str>, mode: BackendMode, peer: &str) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let backend = Arc::new(BackendLog::default());
    let connector = MockConnector {
        log: backend.clone(),
        mode,
    };
    let state = AppState::with_connector(
        settings(dir.path(), allowed_ip, "http://mock-xray:10085"),
        Arc::new(connector),
    );
    let app = create_router(Arc::new(state))
        .layer(axum::Extension(ConnectInfo(peer.parse::<SocketAddr>().unwrap())));
    Harness { app, dir, backend }
}

pub fn request(
    method: Method,
    path: &str,
    token: Option<&str>,
    content_type: Option<&str>,
    body: &str,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(path);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    if let Some(ct) = content_type {
        builder = builder.header("content-type", ct);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

/// Poll `condition` until it holds; panics after five seconds.
pub async fn wait_until(condition: impl Fn() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}
