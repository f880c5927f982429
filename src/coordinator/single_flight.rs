use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Mutex};

use tokio::sync::watch;
use tracing::debug;

use crate::error::{CacheError, Result};

/// Settles once, when the spawned call finishes
type Flight<T> = watch::Receiver<Option<Result<T>>>;

struct Flights<K, T> {
    next_id: u64,
    pending: HashMap<K, (u64, Flight<T>)>,
}

/// At most one outstanding call per key.
///
/// The first caller for a key spawns the call and registers a receiver for
/// its outcome; callers arriving while it is pending only await that
/// receiver and get a clone of the single outcome, success or error. The
/// call belongs to the spawned task, not to any caller, so it runs to
/// completion and is never started twice even if every waiter goes away.
/// Once settled the key is released and the next call starts a fresh flight.
pub struct SingleFlight<K, T> {
    flights: Arc<Mutex<Flights<K, T>>>,
}

impl<K, T> Default for SingleFlight<K, T> {
    fn default() -> Self {
        Self {
            flights: Arc::new(Mutex::new(Flights {
                next_id: 0,
                pending: HashMap::new(),
            })),
        }
    }
}

impl<K, T> SingleFlight<K, T>
where
    K: Eq + Hash + Clone + std::fmt::Debug + Send + 'static,
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn run<F, Fut>(&self, key: K, call: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let mut flight = {
            let mut flights = self.flights.lock().unwrap_or_else(|e| e.into_inner());
            let existing = flights.pending.get(&key).map(|(_, rx)| rx.clone());
            match existing {
                Some(existing) => {
                    debug!(?key, "joining in-flight request");
                    existing
                }
                None => {
                    let id = flights.next_id;
                    flights.next_id += 1;
                    let (tx, rx) = watch::channel(None);
                    flights.pending.insert(key.clone(), (id, rx.clone()));
                    self.launch(key, id, tx, call());
                    rx
                }
            }
        };

        let settled = flight
            .wait_for(Option::is_some)
            .await
            .map(|outcome| outcome.clone());
        match settled {
            Ok(Some(outcome)) => outcome,
            Ok(None) | Err(_) => Err(CacheError::FetchFailure(
                "request task ended without a result".to_string(),
            )),
        }
    }

    /// Number of keys currently in flight
    pub fn pending(&self) -> usize {
        self.flights.lock().map(|f| f.pending.len()).unwrap_or(0)
    }

    fn launch<Fut>(&self, key: K, id: u64, tx: watch::Sender<Option<Result<T>>>, call: Fut)
    where
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let flights = Arc::clone(&self.flights);
        tokio::spawn(async move {
            let outcome = match tokio::spawn(call).await {
                Ok(outcome) => outcome,
                Err(join) => Err(CacheError::FetchFailure(format!("request task failed: {}", join))),
            };
            {
                let mut flights = flights.lock().unwrap_or_else(|e| e.into_inner());
                if flights.pending.get(&key).is_some_and(|(current, _)| *current == id) {
                    flights.pending.remove(&key);
                }
            }
            let _ = tx.send(Some(outcome));
        });
    }
}
