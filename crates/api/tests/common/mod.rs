#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use tempfile::TempDir;
use tower::ServiceExt;

use keychain_api::config::{KernelConfig, ServerConfig};
use keychain_api::router::build_app_router;
use keychain_api::state::AppState;
use keychain_core::generator::KeychainGenerator;
use keychain_core::kernel::{CadKernel, KernelError};
use keychain_core::layout::StorageLayout;
use keychain_core::plan::BuildPlan;

/// A base model placed in every test layout.
pub const BASE_MODEL: &str = "circle.step";

pub const STEP_HEADER: &[u8] = b"ISO-10303-21;\nHEADER;\nENDSEC;\n";

/// Kernel stand-in that writes a small binary STL and records its builds.
#[derive(Default)]
pub struct StubKernel {
    builds: AtomicUsize,
    base_models: Mutex<Vec<PathBuf>>,
    delay: Duration,
}

impl StubKernel {
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    pub fn builds(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }

    /// Base model of every plan built so far, in order.
    pub fn base_models(&self) -> Vec<PathBuf> {
        self.base_models.lock().unwrap().clone()
    }
}

#[async_trait]
impl CadKernel for StubKernel {
    async fn build(&self, plan: &BuildPlan) -> Result<(), KernelError> {
        self.builds.fetch_add(1, Ordering::SeqCst);
        self.base_models.lock().unwrap().push(plan.base_model.clone());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        tokio::fs::write(&plan.output, tetrahedron_stl()).await?;
        Ok(())
    }
}

/// Binary STL with the four faces of a unit tetrahedron.
pub fn tetrahedron_stl() -> Vec<u8> {
    let v = [
        [0.0f32, 0.0, 0.0],
        [1.0, 0.0, 0.0],
        [0.0, 1.0, 0.0],
        [0.0, 0.0, 1.0],
    ];
    let faces = [[0, 2, 1], [0, 1, 3], [0, 3, 2], [1, 2, 3]];

    let mut out = vec![0u8; 80];
    out.extend_from_slice(&(faces.len() as u32).to_le_bytes());
    for face in faces {
        // Normal left zeroed; readers recompute it.
        out.extend_from_slice(&[0u8; 12]);
        for idx in face {
            for c in v[idx] {
                out.extend_from_slice(&c.to_le_bytes());
            }
        }
        out.extend_from_slice(&0u16.to_le_bytes());
    }
    out
}

/// Build a test `ServerConfig` rooted at `root`.
pub fn test_config(root: &Path) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["*".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 1,
        layout: StorageLayout::under(root),
        sweep_interval_secs: 3600,
        sweep_max_age_secs: 3600,
        kernel: KernelConfig {
            program: "keychain-cad".to_string(),
            args: vec![],
            timeout_secs: 5,
        },
    }
}

/// Application under test plus the handles tests inspect.
pub struct TestApp {
    pub app: Router,
    pub layout: StorageLayout,
    pub kernel: Arc<StubKernel>,
    _root: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_kernel(StubKernel::default()).await
    }

    /// Build the full application router in a fresh temporary layout with
    /// `circle.step` available as a base model.
    pub async fn with_kernel(kernel: StubKernel) -> Self {
        let root = tempfile::tempdir().unwrap();
        let config = test_config(root.path());
        config.layout.ensure_dirs().await.unwrap();
        std::fs::write(config.layout.base_models_dir.join(BASE_MODEL), STEP_HEADER).unwrap();

        let kernel = Arc::new(kernel);
        let generator = Arc::new(KeychainGenerator::new(&config.layout, kernel.clone()));
        let state = AppState {
            config: Arc::new(config.clone()),
            generator,
        };

        Self {
            app: build_app_router(state, &config),
            layout: config.layout,
            kernel,
            _root: root,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.app.clone().oneshot(request).await.unwrap()
    }
}

/// Number of regular files directly inside `dir`.
pub fn file_count(dir: &Path) -> usize {
    std::fs::read_dir(dir)
        .unwrap()
        .filter_map(Result::ok)
        .filter(|e| e.path().is_file())
        .count()
}

pub async fn get(app: &TestApp, uri: &str) -> Response<Body> {
    app.send(Request::get(uri).body(Body::empty()).unwrap()).await
}

pub async fn post_json(app: &TestApp, uri: &str, json: serde_json::Value) -> Response<Body> {
    let request = Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(json.to_string()))
        .unwrap();
    app.send(request).await
}

pub fn generation_body(bar_heights: &[f64], base_model: &str, extrusion_height: f64) -> serde_json::Value {
    serde_json::json!({
        "barHeights": bar_heights,
        "baseModel": base_model,
        "extrusionHeight": extrusion_height,
    })
}

const BOUNDARY: &str = "keychain-test-boundary";

/// POST a single-file multipart form with the part named `field`.
pub async fn post_file(
    app: &TestApp,
    uri: &str,
    field: &str,
    filename: &str,
    content: &[u8],
) -> Response<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    let request = Request::post(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap();
    app.send(request).await
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}
