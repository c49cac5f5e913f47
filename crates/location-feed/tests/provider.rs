#![allow(missing_docs)]

use std::any::Any;
use std::collections::VecDeque;
use std::error::Error;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use anyhow::{Result, anyhow, bail};
use bytes::Bytes;
use http::{Request, Response};
use location_feed::{Envelope, Transport, TransportConnection, TransportEvent, kind};
use realtime::{HttpRequest, LocationSample, PositionSource};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::time::Instant;

// ------------------------------------------------------------------------
// Transport
// ------------------------------------------------------------------------

/// Scriptable in-memory push server.
#[derive(Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<TransportState>>,
}

#[derive(Default)]
struct TransportState {
    refuse: bool,
    open_delay: Option<Duration>,
    auto_pong: bool,
    opens: Vec<Instant>,
    sent: Vec<Envelope>,
    client_closes: usize,
    sink: Option<UnboundedSender<TransportEvent>>,
}

impl MockTransport {
    #[allow(unused)]
    pub fn refuse(&self, refuse: bool) {
        self.lock().refuse = refuse;
    }

    #[allow(unused)]
    pub fn delay_opens(&self, delay: Duration) {
        self.lock().open_delay = Some(delay);
    }

    /// Answer every ping with a pong.
    #[allow(unused)]
    pub fn auto_pong(&self) {
        self.lock().auto_pong = true;
    }

    #[allow(unused)]
    pub fn opens(&self) -> usize {
        self.lock().opens.len()
    }

    #[allow(unused)]
    pub fn open_times(&self) -> Vec<Instant> {
        self.lock().opens.clone()
    }

    #[allow(unused)]
    pub fn sent(&self) -> Vec<Envelope> {
        self.lock().sent.clone()
    }

    #[allow(unused)]
    pub fn sent_kinds(&self) -> Vec<String> {
        self.lock().sent.iter().map(|envelope| envelope.kind.clone()).collect()
    }

    #[allow(unused)]
    pub fn client_closes(&self) -> usize {
        self.lock().client_closes
    }

    /// Deliver a raw frame on the most recent connection.
    #[allow(unused)]
    pub fn push_frame(&self, frame: &str) {
        if let Some(sink) = &self.lock().sink {
            sink.send(TransportEvent::Frame(frame.to_string())).ok();
        }
    }

    /// Simulate the link dropping.
    #[allow(unused)]
    pub fn drop_connection(&self) {
        if let Some(sink) = self.lock().sink.take() {
            sink.send(TransportEvent::Closed { reason: Some("network lost".to_string()) }).ok();
        }
    }

    fn lock(&self) -> MutexGuard<'_, TransportState> {
        self.state.lock().unwrap()
    }
}

impl Transport for MockTransport {
    type Connection = MockConnection;

    async fn open(&self, events: UnboundedSender<TransportEvent>) -> Result<MockConnection> {
        let delay = {
            let mut state = self.lock();
            state.opens.push(Instant::now());
            state.open_delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.lock();
        if state.refuse {
            bail!("connection refused");
        }
        state.sink = Some(events);
        drop(state);

        Ok(MockConnection { state: Arc::clone(&self.state) })
    }
}

pub struct MockConnection {
    state: Arc<Mutex<TransportState>>,
}

impl TransportConnection for MockConnection {
    async fn send(&self, envelope: &Envelope) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.sent.push(envelope.clone());

        if envelope.kind == kind::PING
            && state.auto_pong
            && let Some(sink) = &state.sink
        {
            sink.send(TransportEvent::Frame(r#"{"type":"pong","data":{}}"#.to_string())).ok();
        }
        drop(state);
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.state.lock().unwrap().client_closes += 1;
        Ok(())
    }
}

// ------------------------------------------------------------------------
// HTTP
// ------------------------------------------------------------------------

/// Replays scripted responses in order.
#[derive(Clone, Default)]
pub struct MockHttp {
    responses: Arc<Mutex<VecDeque<Result<(u16, String), String>>>>,
    requests: Arc<Mutex<Vec<String>>>,
}

impl MockHttp {
    #[allow(unused)]
    pub fn respond(&self, status: u16, body: &str) {
        self.responses.lock().unwrap().push_back(Ok((status, body.to_string())));
    }

    #[allow(unused)]
    pub fn fail(&self, reason: &str) {
        self.responses.lock().unwrap().push_back(Err(reason.to_string()));
    }

    #[allow(unused)]
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

impl HttpRequest for MockHttp {
    async fn fetch<T>(&self, request: Request<T>) -> Result<Response<Bytes>>
    where
        T: http_body::Body + Any,
        T::Data: Into<Vec<u8>>,
        T::Error: Into<Box<dyn Error + Send + Sync + 'static>>,
    {
        self.requests.lock().unwrap().push(request.uri().to_string());

        let next = self.responses.lock().unwrap().pop_front();
        match next {
            Some(Ok((status, body))) => {
                Response::builder().status(status).body(Bytes::from(body)).map_err(Into::into)
            }
            Some(Err(reason)) => Err(anyhow!(reason)),
            None => bail!("no response scripted"),
        }
    }
}

// ------------------------------------------------------------------------
// Position source
// ------------------------------------------------------------------------

/// Hands out fixes pushed by the test, counting concurrent watchers.
#[derive(Clone)]
pub struct MockPositionSource {
    sender: UnboundedSender<realtime::Result<LocationSample>>,
    fixes: Arc<tokio::sync::Mutex<UnboundedReceiver<realtime::Result<LocationSample>>>>,
    watchers: Arc<AtomicUsize>,
}

impl Default for MockPositionSource {
    fn default() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            sender,
            fixes: Arc::new(tokio::sync::Mutex::new(receiver)),
            watchers: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl MockPositionSource {
    #[allow(unused)]
    pub fn push(&self, fix: realtime::Result<LocationSample>) {
        self.sender.send(fix).ok();
    }

    /// Number of `next_fix` calls currently waiting.
    #[allow(unused)]
    pub fn watchers(&self) -> usize {
        self.watchers.load(Ordering::SeqCst)
    }
}

struct Watching(Arc<AtomicUsize>);

impl Drop for Watching {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl PositionSource for MockPositionSource {
    fn next_fix(&self) -> impl Future<Output = realtime::Result<LocationSample>> + Send {
        let fixes = Arc::clone(&self.fixes);
        self.watchers.fetch_add(1, Ordering::SeqCst);
        let watching = Watching(Arc::clone(&self.watchers));

        async move {
            let _watching = watching;
            let mut fixes = fixes.lock().await;
            fixes
                .recv()
                .await
                .unwrap_or_else(|| Err(realtime::Error::Geolocation("source closed".to_string())))
        }
    }
}

// ------------------------------------------------------------------------
// Helpers
// ------------------------------------------------------------------------

/// Let spawned tasks run until they are all waiting on something.
#[allow(unused)]
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}

/// Advance (paused) time in small steps until `done` holds or `limit` passes.
#[allow(unused)]
pub async fn wait_for(done: impl Fn() -> bool, limit: Duration) -> bool {
    let deadline = Instant::now() + limit;
    while Instant::now() < deadline {
        if done() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    done()
}
