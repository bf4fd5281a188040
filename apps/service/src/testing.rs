//! Fixtures shared by the unit tests: a throwaway HTTP responder and
//! in-memory stand-ins for the store, checker and dispatcher.

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::database::TargetStore;
use crate::monitoring::checker::Checker;
use crate::monitoring::error::ProbeError;
use crate::monitoring::types::{ProbeOutcome, StatusTransition, Target, TargetStatus};
use crate::notifier::{DispatchError, NotificationDispatcher};

/// Request captured by [`HttpResponder`]
#[derive(Debug, Clone)]
pub(crate) struct RecordedRequest {
    pub request_line: String,
    pub body: String,
}

#[derive(Debug, Clone)]
enum Reply {
    Respond { code: u16, body: String },
    Silent,
}

/// Minimal HTTP/1.1 server on 127.0.0.1 answering every request the same way
pub(crate) struct HttpResponder {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    handle: JoinHandle<()>,
}

impl HttpResponder {
    pub(crate) async fn status(code: u16) -> Self {
        Self::start(Reply::Respond { code, body: String::new() }).await
    }

    pub(crate) async fn json(code: u16, body: &str) -> Self {
        Self::start(Reply::Respond { code, body: body.to_string() }).await
    }

    /// Accepts connections and reads requests but never answers
    pub(crate) async fn silent() -> Self {
        Self::start(Reply::Silent).await
    }

    async fn start(reply: Reply) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&requests);

        let handle = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let reply = reply.clone();
                let recorded = Arc::clone(&recorded);
                tokio::spawn(async move {
                    let _ = serve_connection(stream, reply, recorded).await;
                });
            }
        });

        Self { addr, requests, handle }
    }

    pub(crate) fn url(&self) -> String {
        format!("http://{}/", self.addr)
    }

    pub(crate) fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub(crate) fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn request_lines(&self) -> Vec<String> {
        self.requests().into_iter().map(|r| r.request_line).collect()
    }
}

impl Drop for HttpResponder {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn serve_connection(
    mut stream: TcpStream,
    reply: Reply,
    recorded: Arc<Mutex<Vec<RecordedRequest>>>,
) -> std::io::Result<()> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];

    let header_end = loop {
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&chunk[..n]);
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let content_length = head
        .lines()
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

    recorded.lock().unwrap().push(RecordedRequest {
        request_line: head.lines().next().unwrap_or_default().to_string(),
        body: String::from_utf8_lossy(&buf[header_end..]).to_string(),
    });

    match reply {
        Reply::Silent => {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        }
        Reply::Respond { code, body } => {
            let response = format!(
                "HTTP/1.1 {code} Test\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).await?;
            stream.shutdown().await
        }
    }
}

/// URL of a local port nothing is listening on
pub(crate) async fn refused_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}/")
}

/// Client that ignores proxy settings from the environment
pub(crate) fn local_http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder().timeout(timeout).no_proxy().build().unwrap()
}

/// Target store kept in a map, with switches for simulated failures
#[derive(Default)]
pub(crate) struct MemoryStore {
    targets: Mutex<HashMap<Uuid, Target>>,
    writes: AtomicUsize,
    fail_writes: AtomicBool,
    fail_listing: AtomicBool,
}

impl MemoryStore {
    pub(crate) fn with_targets(targets: impl IntoIterator<Item = Target>) -> Arc<Self> {
        let store = Self::default();
        {
            let mut map = store.targets.lock().unwrap();
            for target in targets {
                map.insert(target.id, target);
            }
        }
        Arc::new(store)
    }

    pub(crate) fn status_of(&self, id: Uuid) -> Option<TargetStatus> {
        self.targets.lock().unwrap().get(&id).map(|t| t.status)
    }

    /// Change a stored status behind the engine's back
    pub(crate) fn set_status(&self, id: Uuid, status: TargetStatus) {
        if let Some(target) = self.targets.lock().unwrap().get_mut(&id) {
            target.status = status;
        }
    }

    pub(crate) fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub(crate) fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn fail_listing(&self, fail: bool) {
        self.fail_listing.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl TargetStore for MemoryStore {
    async fn list_all(&self) -> Result<Vec<Target>> {
        if self.fail_listing.load(Ordering::SeqCst) {
            return Err(anyhow!("simulated listing failure"));
        }
        Ok(self.targets.lock().unwrap().values().cloned().collect())
    }

    async fn list_by_owner(&self, owner_id: Uuid) -> Result<Vec<Target>> {
        if self.fail_listing.load(Ordering::SeqCst) {
            return Err(anyhow!("simulated listing failure"));
        }
        let mut targets: Vec<Target> = self
            .targets
            .lock()
            .unwrap()
            .values()
            .filter(|t| t.owner_id == owner_id)
            .cloned()
            .collect();
        targets.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(targets)
    }

    async fn read_one(&self, id: Uuid) -> Result<Option<Target>> {
        Ok(self.targets.lock().unwrap().get(&id).cloned())
    }

    async fn write_status(&self, id: Uuid, status: TargetStatus) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(anyhow!("simulated write failure"));
        }
        let mut targets = self.targets.lock().unwrap();
        let target = targets.get_mut(&id).ok_or_else(|| anyhow!("target {id} not found"))?;
        target.status = status;
        target.last_checked = Some(Utc::now());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// What a [`ScriptedChecker`] does for a URL
#[derive(Debug, Clone, Copy)]
pub(crate) enum Behaviour {
    Respond(TargetStatus, Duration),
    /// Never answers; resolves as a timeout once the deadline passes
    Hang,
}

/// Checker answering from a per-URL script and tracking concurrency
pub(crate) struct ScriptedChecker {
    script: Mutex<HashMap<String, Behaviour>>,
    fallback: Behaviour,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedChecker {
    pub(crate) fn new(fallback: Behaviour) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(HashMap::new()),
            fallback,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        })
    }

    pub(crate) fn always(status: TargetStatus) -> Arc<Self> {
        Self::new(Behaviour::Respond(status, Duration::ZERO))
    }

    pub(crate) fn set(&self, url: &str, behaviour: Behaviour) {
        self.script.lock().unwrap().insert(url.to_string(), behaviour);
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Checker for ScriptedChecker {
    async fn check(&self, url: &str, timeout: Duration) -> ProbeOutcome {
        let behaviour = self.script.lock().unwrap().get(url).copied().unwrap_or(self.fallback);
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let started = Instant::now();
        let outcome = match behaviour {
            Behaviour::Respond(status, delay) => {
                tokio::time::sleep(delay).await;
                match status {
                    TargetStatus::Up => ProbeOutcome::up(started.elapsed(), 200),
                    _ => ProbeOutcome::down(started.elapsed(), ProbeError::UnexpectedStatus(503)),
                }
            }
            Behaviour::Hang => {
                let _ = tokio::time::timeout(timeout, std::future::pending::<()>()).await;
                ProbeOutcome::down(started.elapsed(), ProbeError::Timeout(timeout))
            }
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        outcome
    }
}

/// Dispatcher that remembers every transition it was asked to deliver
#[derive(Default)]
pub(crate) struct RecordingDispatcher {
    sent: Mutex<Vec<StatusTransition>>,
    hang: bool,
    fail: bool,
}

impl RecordingDispatcher {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn hanging() -> Arc<Self> {
        Arc::new(Self { hang: true, ..Self::default() })
    }

    pub(crate) fn failing() -> Arc<Self> {
        Arc::new(Self { fail: true, ..Self::default() })
    }

    pub(crate) fn transitions(&self) -> Vec<StatusTransition> {
        self.sent.lock().unwrap().clone()
    }

    /// Wait until at least `count` notifications were attempted
    pub(crate) async fn wait_for(&self, count: usize, within: Duration) -> bool {
        let deadline = Instant::now() + within;
        while Instant::now() < deadline {
            if self.sent.lock().unwrap().len() >= count {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        self.sent.lock().unwrap().len() >= count
    }
}

#[async_trait]
impl NotificationDispatcher for RecordingDispatcher {
    async fn notify(&self, transition: &StatusTransition) -> Result<(), DispatchError> {
        self.sent.lock().unwrap().push(transition.clone());
        if self.hang {
            std::future::pending::<()>().await;
        }
        if self.fail {
            return Err(DispatchError::Rejected);
        }
        Ok(())
    }
}
