#![allow(dead_code)]

use async_trait::async_trait;
use offline_sync::application::ports::{RemoteRequest, RemoteResponse, RemoteTransport};
use offline_sync::{AppConfig, AppError, AppState};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

type Responder = dyn Fn(&RemoteRequest) -> Result<RemoteResponse, AppError> + Send + Sync;

/// Remote API stand-in that records every request in arrival order.
pub struct StubTransport {
    calls: Mutex<Vec<RemoteRequest>>,
    responder: Box<Responder>,
    delay: Option<Duration>,
}

impl StubTransport {
    pub fn responding<F>(responder: F) -> Self
    where
        F: Fn(&RemoteRequest) -> Result<RemoteResponse, AppError> + Send + Sync + 'static,
    {
        Self {
            calls: Mutex::new(Vec::new()),
            responder: Box::new(responder),
            delay: None,
        }
    }

    pub fn always(status: u16) -> Self {
        Self::responding(move |_| Ok(RemoteResponse::new(status, "")))
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<RemoteRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl RemoteTransport for StubTransport {
    async fn send(&self, request: RemoteRequest) -> Result<RemoteResponse, AppError> {
        self.calls.lock().unwrap().push(request.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        (self.responder)(&request)
    }
}

pub struct TestContext {
    pub dir: TempDir,
    pub state: AppState,
    pub transport: Arc<StubTransport>,
}

impl TestContext {
    pub async fn new(transport: StubTransport) -> Self {
        let dir = TempDir::new().expect("temp dir");
        let transport = Arc::new(transport);
        let state = open_state(dir.path(), transport.clone()).await;
        Self {
            dir,
            state,
            transport,
        }
    }

    /// Closes the store and opens a fresh `AppState` on the same file, as a
    /// restarted process would.
    pub async fn restart(self) -> Self {
        self.state.shutdown().await;
        let state = open_state(self.dir.path(), self.transport.clone()).await;
        Self {
            dir: self.dir,
            state,
            transport: self.transport,
        }
    }
}

pub fn config_for(dir: &Path) -> AppConfig {
    let mut config = AppConfig::default();
    config.database.url = format!("sqlite://{}", dir.join("offline.db").display());
    config
}

pub async fn open_state(dir: &Path, transport: Arc<StubTransport>) -> AppState {
    AppState::with_transport(config_for(dir), transport)
        .await
        .expect("app state")
}
