//! Shared test utilities for integration tests
//!
//! - Isolated config environment (XDG, legacy model variables) serialized by a global mutex
//! - A loopback HTTP server standing in for the model service
//! - A scripted in-process model client keyed on endpoint path

use async_trait::async_trait;
use casegen::error::GenerationError;
use casegen::provider::ModelClient;
use parking_lot::Mutex as SyncMutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// Global mutex to serialize environment variable access across all tests
static ENV_MUTEX: Mutex<()> = Mutex::new(());

const ISOLATED_VARS: [&str; 7] = [
    "HOME",
    "XDG_CONFIG_HOME",
    "CASEGEN_ENV",
    "CASEGEN__MODEL__HOST",
    "CASEGEN__MODEL__NAME",
    "OLLAMA_HOST",
    "MODEL_NAME",
];

/// Environment variable state to restore after test
struct EnvState {
    saved: Vec<(&'static str, Option<String>)>,
}

impl EnvState {
    fn capture() -> Self {
        Self {
            saved: ISOLATED_VARS
                .iter()
                .map(|name| (*name, std::env::var(name).ok()))
                .collect(),
        }
    }

    fn restore(self) {
        for (name, value) in self.saved {
            match value {
                Some(orig) => std::env::set_var(name, orig),
                None => std::env::remove_var(name),
            }
        }
    }
}

/// Run `f` with HOME and XDG_CONFIG_HOME inside `test_dir` and every casegen variable unset.
/// The previous environment is restored afterwards.
pub fn with_isolated_env<F, R>(test_dir: &TempDir, f: F) -> R
where
    F: FnOnce() -> R,
{
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let env_state = EnvState::capture();

    let test_home = test_dir.path().join("home");
    let test_config_home = test_dir.path().join("xdg");
    std::fs::create_dir_all(&test_home).unwrap();
    std::fs::create_dir_all(&test_config_home).unwrap();

    for name in ISOLATED_VARS {
        std::env::remove_var(name);
    }
    std::env::set_var("HOME", &test_home);
    std::env::set_var("XDG_CONFIG_HOME", &test_config_home);

    let result = f();

    env_state.restore();

    result
}

/// Canned HTTP reply from the fake model service
#[derive(Clone)]
pub struct Reply {
    pub status: u16,
    pub body: String,
    pub delay: Duration,
}

impl Reply {
    pub fn json(body: serde_json::Value) -> Self {
        Self {
            status: 200,
            body: body.to_string(),
            delay: Duration::ZERO,
        }
    }

    pub fn raw(status: u16, body: &str) -> Self {
        Self {
            status,
            body: body.to_string(),
            delay: Duration::ZERO,
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// A request as seen by the fake service
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub body: String,
}

type Handler = Arc<dyn Fn(&Recorded) -> Reply + Send + Sync>;

/// Loopback stand-in for an Ollama-compatible service. One connection per request.
pub struct FakeModelService {
    pub base_url: String,
    requests: Arc<SyncMutex<Vec<Recorded>>>,
    task: tokio::task::JoinHandle<()>,
}

impl FakeModelService {
    pub async fn start<F>(handler: F) -> Self
    where
        F: Fn(&Recorded) -> Reply + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handler: Handler = Arc::new(handler);
        let requests = Arc::new(SyncMutex::new(Vec::new()));
        let recorded = Arc::clone(&requests);

        let task = tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                let handler = Arc::clone(&handler);
                let recorded = Arc::clone(&recorded);
                tokio::spawn(async move {
                    let _ = serve(stream, handler, recorded).await;
                });
            }
        });

        Self {
            base_url: format!("http://{}", addr),
            requests,
            task,
        }
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().clone()
    }
}

impl Drop for FakeModelService {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn serve(
    mut stream: TcpStream,
    handler: Handler,
    recorded: Arc<SyncMutex<Vec<Recorded>>>,
) -> std::io::Result<()> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let header_end = loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = head.lines();
    let request_line = lines.next().unwrap_or_default();
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default().to_string();
    let path = parts.next().unwrap_or_default().to_string();
    let content_length = lines
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let body = String::from_utf8_lossy(&buf[header_end..]).to_string();

    let request = Recorded { method, path, body };
    recorded.lock().push(request.clone());
    let reply = handler(&request);
    if !reply.delay.is_zero() {
        tokio::time::sleep(reply.delay).await;
    }

    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        reply.status,
        if reply.status < 400 { "OK" } else { "Error" },
        reply.body.len(),
        reply.body
    );
    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await
}

/// Raw completion text wrapped the way `/api/generate` returns it
pub fn completion(text: &str) -> Reply {
    Reply::json(serde_json::json!({
        "model": "phi3",
        "response": text,
        "done": true
    }))
}

/// In-process model client answering by the endpoint path named in the prompt
pub struct ScriptedClient {
    replies: HashMap<String, Result<String, fn() -> GenerationError>>,
    calls: AtomicUsize,
    prompts: SyncMutex<Vec<String>>,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self {
            replies: HashMap::new(),
            calls: AtomicUsize::new(0),
            prompts: SyncMutex::new(Vec::new()),
        }
    }

    pub fn reply(mut self, path: &str, text: &str) -> Self {
        self.replies.insert(path.to_string(), Ok(text.to_string()));
        self
    }

    pub fn fail(mut self, path: &str, error: fn() -> GenerationError) -> Self {
        self.replies.insert(path.to_string(), Err(error));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }
}

#[async_trait]
impl ModelClient for ScriptedClient {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().push(prompt.to_string());
        let path = prompt
            .lines()
            .find_map(|line| line.strip_prefix("Path: "))
            .unwrap_or_default()
            .trim();
        match self.replies.get(path) {
            Some(Ok(text)) => Ok(text.clone()),
            Some(Err(make)) => Err(make()),
            None => Err(GenerationError::Model(format!("no script for {}", path))),
        }
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

/// `n` well-formed cases for one endpoint, as the model would write them
pub fn cases_json(path: &str, method: &str, n: usize) -> String {
    let cases: Vec<serde_json::Value> = (0..n)
        .map(|i| {
            serde_json::json!({
                "name": format!("{} {} case {}", method, path, i + 1),
                "category": (["valid", "edge", "invalid"][i % 3]),
                "method": method,
                "endpoint": path,
                "headers": {"Content-Type": "application/json"},
                "body": null,
                "expected_response_code": (if i % 3 == 2 { 400 } else { 200 })
            })
        })
        .collect();
    serde_json::Value::Array(cases).to_string()
}
