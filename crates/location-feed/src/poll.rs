use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use http::header::ACCEPT;
use http::{Method, Request};
use http_body_util::Empty;
use location_history::{SharedHistory, Snapshot};
use realtime::{HttpRequest, Result, fetch_error};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::feed::{FeedUpdate, LocationFeed};
use crate::listeners::{Listeners, Subscription};
use crate::protocol::PolledPosition;

/// Feed backed by a REST endpoint returning the latest position of every
/// bus, fetched on a fixed interval.
///
/// A failed fetch is logged and skipped; positions already recorded stay in
/// place until the next successful poll.
pub struct PollFeed<H: HttpRequest + 'static> {
    inner: Arc<Poller<H>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

struct Poller<H> {
    http: H,
    url: String,
    interval: Duration,
    history: SharedHistory,
    updates: Listeners<FeedUpdate>,
}

impl<H: HttpRequest + 'static> PollFeed<H> {
    pub fn new(
        http: H, url: impl Into<String>, interval: Duration, history: SharedHistory,
    ) -> Self {
        Self {
            inner: Arc::new(Poller {
                http,
                url: url.into(),
                interval,
                history,
                updates: Listeners::default(),
            }),
            task: Mutex::new(None),
        }
    }

    /// Fetch once and record every changed position, returning how many
    /// samples were recorded.
    ///
    /// # Errors
    ///
    /// Returns a fetch error when the request fails, the endpoint answers
    /// with a non-success status or the body cannot be decoded.
    pub async fn poll_once(&self) -> Result<usize> {
        self.inner.poll_once().await
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.task().as_ref().is_some_and(|task| !task.is_finished())
    }

    fn task(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.task.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<H: HttpRequest + 'static> Drop for PollFeed<H> {
    fn drop(&mut self) {
        if let Some(task) = self.task().take() {
            task.abort();
        }
    }
}

#[async_trait]
impl<H: HttpRequest + 'static> LocationFeed for PollFeed<H> {
    async fn start(&self) -> Result<()> {
        let mut task = self.task();
        if let Some(previous) = task.take() {
            previous.abort();
        }
        *task = Some(tokio::spawn(Poller::run(Arc::clone(&self.inner))));
        drop(task);

        debug!(url = %self.inner.url, interval_secs = self.inner.interval.as_secs(), "polling started");
        Ok(())
    }

    fn stop(&self) {
        if let Some(task) = self.task().take() {
            task.abort();
            debug!(url = %self.inner.url, "polling stopped");
        }
    }

    fn subscribe(&self, handler: Box<dyn Fn(&FeedUpdate) + Send + Sync>) -> Subscription {
        self.inner.updates.subscribe(handler)
    }

    fn current_snapshot(&self) -> Snapshot {
        self.inner.history.snapshot()
    }
}

impl<H: HttpRequest + 'static> Poller<H> {
    async fn run(poller: Arc<Self>) {
        // first tick completes immediately
        let mut ticker = tokio::time::interval(poller.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            if let Err(err) = poller.poll_once().await {
                warn!(
                    monotonic_counter.poll_failures = 1, error = %err,
                    "polling latest positions failed; keeping known positions"
                );
            }
        }
    }

    async fn poll_once(&self) -> Result<usize> {
        let positions = self.fetch().await?;

        let mut recorded = 0;
        for position in positions {
            let Some(sample) = position.latest else {
                continue;
            };
            // the endpoint repeats the last known sample until a new one arrives
            if self.history.latest(&position.bus_id).as_ref() == Some(&sample) {
                continue;
            }

            self.history.record(&position.bus_id, sample.clone());
            recorded += 1;
            self.updates.notify(&FeedUpdate { entity_id: position.bus_id, sample, metadata: None });
        }

        debug!(recorded, "polled latest positions");
        Ok(recorded)
    }

    async fn fetch(&self) -> Result<Vec<PolledPosition>> {
        let request = Request::builder()
            .method(Method::GET)
            .uri(&self.url)
            .header(ACCEPT, "application/json")
            .body(Empty::<Bytes>::new())
            .map_err(|err| fetch_error!("building request for {}: {}", self.url, err))?;

        let response = self
            .http
            .fetch(request)
            .await
            .map_err(|err| fetch_error!("request to {} failed: {:#}", self.url, err))?;

        if !response.status().is_success() {
            return Err(fetch_error!("{} returned {}", self.url, response.status()));
        }

        serde_json::from_slice(response.body())
            .map_err(|err| fetch_error!("invalid response from {}: {}", self.url, err))
    }
}
