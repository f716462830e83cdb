//! # Search Coordinator
//!
//! Turns raw keystrokes into as few backend searches as possible. The backend
//! proxies USDA with a 30 requests/minute limit per client, so every keystroke
//! cannot be a request.
//!
//!
//!
//! ## Rules
//! - Trimmed query must be at least 3 characters
//! - Trimmed query must differ from the last dispatched query
//! - Dispatch happens once input has been quiet for the debounce window (1s)
//! - Submitting skips the window but not the other rules
//! - Clearing the field drops everything and tells the consumer to clear results
//!
//!
//!
//! ## Cancellation
//! Each dispatch gets a fresh [`CancelToken`]. Dispatching again, typing a
//! different value, clearing, or disposing cancels the previous token.
//!
//! A completion whose token was cancelled is dropped before it reaches the
//! consumer, so stale results can never overwrite newer ones. A request that was
//! cancelled before resolving also stops counting as "last searched", otherwise
//! re-typing the same query would never fetch its results.
//!
//!
//!
//! ## States
//! ```text
//! Idle --keystroke(valid, new)--> Pending --quiet window--> Dispatched --completion--> Idle
//!                                 Pending --keystroke-----> Pending (timer reset)
//!                                 Dispatched --keystroke--> Pending (request cancelled)
//! any --cleared--> Idle
//! ```
use std::{future::Future, sync::Arc, time::Duration};

use catalog::{ApiError, CancelToken};
use tokio::{
    sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel},
    time::{Instant, sleep_until},
};
use tracing::{debug, info};

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(1000);
pub const DEFAULT_MIN_QUERY_LEN: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchSettings {
    pub debounce: Duration,
    pub min_query_len: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            min_query_len: DEFAULT_MIN_QUERY_LEN,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchState {
    Idle,
    Pending,
    Dispatched,
}

/// Runs one search. Implementations should stop work once `cancel` fires; the
/// coordinator drops the result either way.
pub trait SearchInvoker: Send + Sync + 'static {
    type Output: Send + 'static;

    fn search(
        &self,
        query: String,
        cancel: CancelToken,
    ) -> impl Future<Output = Result<Self::Output, ApiError>> + Send;
}

pub trait ResultConsumer<T> {
    fn on_dispatch(&mut self, _query: &str) {}

    fn on_cancel(&mut self, _query: &str) {}

    fn on_results(&mut self, query: &str, results: T);

    fn on_error(&mut self, query: &str, error: ApiError);

    fn on_clear(&mut self);
}

struct Pending {
    query: String,
    deadline: Instant,
}

struct InFlight {
    query: String,
    cancel: CancelToken,
}

struct Completion<T> {
    query: String,
    cancel: CancelToken,
    result: Result<T, ApiError>,
}

pub struct SearchCoordinator<S: SearchInvoker, C> {
    invoker: Arc<S>,
    consumer: C,
    settings: SearchSettings,
    value: String,
    last_searched: String,
    pending: Option<Pending>,
    in_flight: Option<InFlight>,
    completions_tx: UnboundedSender<Completion<S::Output>>,
    completions_rx: UnboundedReceiver<Completion<S::Output>>,
    disposed: bool,
}

impl<S, C> SearchCoordinator<S, C>
where
    S: SearchInvoker,
    C: ResultConsumer<S::Output>,
{
    pub fn new(invoker: Arc<S>, consumer: C, settings: SearchSettings) -> Self {
        let (completions_tx, completions_rx) = unbounded_channel();

        Self {
            invoker,
            consumer,
            settings,
            value: String::new(),
            last_searched: String::new(),
            pending: None,
            in_flight: None,
            completions_tx,
            completions_rx,
            disposed: false,
        }
    }

    pub fn state(&self) -> SearchState {
        if self.in_flight.is_some() {
            SearchState::Dispatched
        } else if self.pending.is_some() {
            SearchState::Pending
        } else {
            SearchState::Idle
        }
    }

    pub fn last_searched(&self) -> &str {
        &self.last_searched
    }

    pub fn consumer(&self) -> &C {
        &self.consumer
    }

    pub fn consumer_mut(&mut self) -> &mut C {
        &mut self.consumer
    }

    /// New value of the search field, one call per keystroke.
    pub fn input(&mut self, value: &str) {
        if self.disposed {
            return;
        }

        if value.is_empty() {
            self.clear();
            return;
        }

        self.value = value.to_string();
        self.pending = None;

        let query = value.trim().to_string();
        self.abandon_stale(&query);

        if self.is_dispatchable(&query) {
            debug!("Debouncing search for {query:?}");

            self.pending = Some(Pending {
                query,
                deadline: Instant::now() + self.settings.debounce,
            });
        }
    }

    /// Dispatches the current value right away, skipping the debounce window.
    pub fn submit(&mut self) {
        if self.disposed {
            return;
        }

        self.pending = None;

        let query = self.value.trim().to_string();
        if query.is_empty() {
            return;
        }

        self.abandon_stale(&query);

        if self.is_dispatchable(&query) {
            self.dispatch(query);
        }
    }

    pub fn clear(&mut self) {
        if self.disposed {
            return;
        }

        self.value.clear();
        self.pending = None;
        self.cancel_in_flight();
        self.last_searched.clear();
        self.consumer.on_clear();
    }

    /// Waits for the next timer expiry or request completion and handles it.
    /// Never resolves while there is nothing to wait for.
    pub async fn settle(&mut self) {
        let deadline = self.pending.as_ref().map(|pending| pending.deadline);

        tokio::select! {
            _ = wait_until(deadline) => self.fire(),
            Some(completion) = self.completions_rx.recv() => self.complete(completion),
        }
    }

    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }

        self.disposed = true;
        self.pending = None;

        if let Some(in_flight) = self.in_flight.take() {
            in_flight.cancel.cancel();
        }

        debug!("Search coordinator disposed");
    }

    fn is_dispatchable(&self, query: &str) -> bool {
        query.chars().count() >= self.settings.min_query_len && query != self.last_searched
    }

    // a keystroke that no longer matches the running query makes its result stale
    fn abandon_stale(&mut self, query: &str) {
        if self
            .in_flight
            .as_ref()
            .is_some_and(|in_flight| in_flight.query != query)
        {
            self.cancel_in_flight();
        }
    }

    fn cancel_in_flight(&mut self) {
        let Some(in_flight) = self.in_flight.take() else {
            return;
        };

        debug!("Cancelling search for {:?}", in_flight.query);
        in_flight.cancel.cancel();

        if self.last_searched == in_flight.query {
            self.last_searched.clear();
        }

        self.consumer.on_cancel(&in_flight.query);
    }

    fn fire(&mut self) {
        let Some(pending) = self.pending.take() else {
            return;
        };

        if self.is_dispatchable(&pending.query) {
            self.dispatch(pending.query);
        }
    }

    fn dispatch(&mut self, query: String) {
        self.cancel_in_flight();

        info!("Searching for {query:?}");

        let cancel = CancelToken::new();
        self.last_searched = query.clone();
        self.in_flight = Some(InFlight {
            query: query.clone(),
            cancel: cancel.clone(),
        });
        self.consumer.on_dispatch(&query);

        let invoker = Arc::clone(&self.invoker);
        let completions = self.completions_tx.clone();

        tokio::spawn(async move {
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return,
                result = invoker.search(query.clone(), cancel.clone()) => result,
            };

            let _ = completions.send(Completion {
                query,
                cancel,
                result,
            });
        });
    }

    fn complete(&mut self, completion: Completion<S::Output>) {
        if completion.cancel.is_cancelled() {
            debug!("Dropping stale result for {:?}", completion.query);
            return;
        }

        self.in_flight = None;

        match completion.result {
            Ok(results) => self.consumer.on_results(&completion.query, results),
            Err(e) if e.is_cancelled() => {
                debug!("Search for {:?} reported cancellation", completion.query)
            }
            Err(e) => self.consumer.on_error(&completion.query, e),
        }
    }
}

impl<S: SearchInvoker, C> Drop for SearchCoordinator<S, C> {
    fn drop(&mut self) {
        self.pending = None;

        if let Some(in_flight) = self.in_flight.take() {
            in_flight.cancel.cancel();
        }
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
