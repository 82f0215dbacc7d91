/// HTTP access to the daemon API.
///
/// Components never call the network directly: they go through the
/// [`Fetcher`] trait and receive the outcome in a callback that runs on the
/// scheduler. Completions may arrive in any order relative to the requests
/// that produced them, so callers must tolerate stale results.
///
/// [`UreqFetcher`] is the production implementation. Each request runs the
/// synchronous `ureq` client on its own worker thread and sends the result
/// back over a channel; a short scheduler interval drains the channel while
/// requests are in flight and runs the callbacks on the event loop.
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread;
use std::time::Duration;

use crate::error::FetchError;
use crate::runtime::{Scheduler, TimerHandle};

use super::{Versions, decode_versions};

pub type FetchResult = Result<serde_json::Value, FetchError>;
pub type FetchCallback = Box<dyn FnOnce(FetchResult)>;

/// Asynchronous JSON GET.
pub trait Fetcher {
    /// Issue a GET for `url`; `on_done` runs later on the event loop.
    fn fetch_json(&self, url: &str, on_done: FetchCallback);
}

// ---------------------------------------------------------------------------
// ureq implementation
// ---------------------------------------------------------------------------

/// How often the event loop checks for finished requests.
const DRAIN_PERIOD_MS: u64 = 10;

type Completion = (u64, FetchResult);

/// Requests handed to worker threads and not yet completed.
struct InFlight {
    receiver: Receiver<Completion>,
    callbacks: RefCell<HashMap<u64, FetchCallback>>,
    next_id: Cell<u64>,
    drain: Cell<Option<TimerHandle>>,
}

impl InFlight {
    fn register(&self, on_done: FetchCallback) -> u64 {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.callbacks.borrow_mut().insert(id, on_done);
        id
    }

    fn take(&self, id: u64) -> Option<FetchCallback> {
        self.callbacks.borrow_mut().remove(&id)
    }

    fn is_idle(&self) -> bool {
        self.callbacks.borrow().is_empty()
    }

    /// Run the callbacks of every finished request. Returns false once the
    /// channel can no longer deliver anything.
    fn drain(&self) -> bool {
        loop {
            match self.receiver.try_recv() {
                Ok((id, result)) => {
                    if let Some(on_done) = self.take(id) {
                        on_done(result);
                    }
                }
                Err(TryRecvError::Empty) => return true,
                Err(TryRecvError::Disconnected) => return false,
            }
        }
    }
}

pub struct UreqFetcher {
    scheduler: Scheduler,
    timeout: Duration,
    sender: Sender<Completion>,
    inflight: Rc<InFlight>,
}

impl std::fmt::Debug for UreqFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UreqFetcher")
            .field("timeout", &self.timeout)
            .field("in_flight", &self.in_flight())
            .finish()
    }
}

impl UreqFetcher {
    pub fn new(scheduler: Scheduler, timeout_ms: u64) -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            scheduler,
            timeout: Duration::from_millis(timeout_ms),
            sender,
            inflight: Rc::new(InFlight {
                receiver,
                callbacks: RefCell::new(HashMap::new()),
                next_id: Cell::new(1),
                drain: Cell::new(None),
            }),
        }
    }

    /// Perform the request on the calling thread.
    pub fn get_json(&self, url: &str) -> FetchResult {
        get_json(url, self.timeout)
    }

    /// Requests whose callback has not run yet.
    pub fn in_flight(&self) -> usize {
        self.inflight.callbacks.borrow().len()
    }

    /// Install the drain interval unless one is already running. It removes
    /// itself once nothing is in flight.
    fn ensure_draining(&self) {
        if self.inflight.drain.get().is_some() {
            return;
        }
        let inflight = self.inflight.clone();
        let scheduler = self.scheduler.clone();
        let handle = self.scheduler.set_interval(DRAIN_PERIOD_MS, move || {
            let connected = inflight.drain();
            if (!connected || inflight.is_idle())
                && let Some(own) = inflight.drain.take()
            {
                scheduler.cancel(own);
            }
        });
        self.inflight.drain.set(Some(handle));
    }
}

impl Fetcher for UreqFetcher {
    fn fetch_json(&self, url: &str, on_done: FetchCallback) {
        let id = self.inflight.register(on_done);
        let sender = self.sender.clone();
        let url = url.to_string();
        let timeout = self.timeout;

        let spawned = thread::Builder::new()
            .name("qpep-fetch".to_string())
            .spawn(move || {
                // The receiver is gone once the dashboard is torn down.
                let _ = sender.send((id, get_json(&url, timeout)));
            });

        match spawned {
            Ok(_) => self.ensure_draining(),
            Err(err) => {
                if let Some(on_done) = self.inflight.take(id) {
                    let message = err.to_string();
                    self.scheduler
                        .post(move || on_done(Err(FetchError::Network(message))));
                }
            }
        }
    }
}

/// Blocking GET returning the decoded JSON body.
///
/// Non-2xx statuses map to [`FetchError::Status`], transport problems to
/// [`FetchError::Network`] and unparsable bodies to [`FetchError::Decode`].
pub fn get_json(url: &str, timeout: Duration) -> FetchResult {
    // "localhost" may resolve to ::1 first while the daemon binds IPv4 only.
    let url = url.replace("://localhost", "://127.0.0.1");

    let response = ureq::get(&url)
        .timeout(timeout)
        .set("Accept", "application/json")
        .call()
        .map_err(|err| match err {
            ureq::Error::Status(code, _) => FetchError::Status(code),
            ureq::Error::Transport(transport) => FetchError::Network(transport.to_string()),
        })?;

    response
        .into_json::<serde_json::Value>()
        .map_err(|err| FetchError::Decode(err.to_string()))
}

/// Fetch and decode the versions endpoint in one blocking call.
pub fn fetch_versions(url: &str, timeout: Duration) -> Result<Versions, FetchError> {
    let value = get_json(url, timeout)?;
    decode_versions(&value)
}
