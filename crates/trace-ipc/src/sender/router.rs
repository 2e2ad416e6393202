//! Response correlation.
//!
//! Responses for every in-flight request of one or more Senders arrive on a
//! single channel, in any order. The router hands each waiter the response
//! carrying its correlation id and parks the rest in a per-id FIFO until
//! their own waiter asks for them.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use trace_types::{TraceResult, TraceServerError};
use uuid::Uuid;

use crate::channel::{ChannelError, ChannelReceiver};
use crate::protocol::RpcResponse;

/// Router counters.
#[derive(Debug, Default)]
pub struct RouterStats {
    /// Responses parked because another id was being waited for.
    pub total_out_of_order: AtomicU64,
    /// Waits that gave up.
    pub total_timeouts: AtomicU64,
    /// Late responses for abandoned ids that were thrown away.
    pub total_discarded: AtomicU64,
}

#[derive(Debug, Default)]
struct RouterState {
    next_seq: u64,
    /// Responses that arrived before their waiter asked for them.
    pending: HashMap<String, VecDeque<RpcResponse>>,
    /// Ids nobody waits for anymore, with whether they were streams.
    abandoned: HashMap<String, bool>,
}

/// Whether `response` is the last one its request will ever produce.
fn is_terminal(response: &RpcResponse, streaming: bool) -> bool {
    !streaming || response.error.is_some()
}

pub struct ResponseRouter {
    instance: Uuid,
    responses: Arc<ChannelReceiver>,
    /// Counter and cache share one lock.
    state: Mutex<RouterState>,
    /// Held by whichever waiter is currently reading the channel.
    reading: Mutex<()>,
    stats: RouterStats,
}

impl ResponseRouter {
    pub fn new(responses: Arc<ChannelReceiver>) -> Self {
        Self {
            instance: Uuid::new_v4(),
            responses,
            state: Mutex::new(RouterState::default()),
            reading: Mutex::new(()),
            stats: RouterStats::default(),
        }
    }

    /// A correlation id unique for the lifetime of this router.
    pub fn next_id(&self) -> String {
        let mut state = self.state.lock();
        state.next_seq += 1;
        format!("{}-{}", self.instance, state.next_seq)
    }

    pub fn stats(&self) -> &RouterStats {
        &self.stats
    }

    /// Number of parked responses.
    pub fn pending_len(&self) -> usize {
        self.state.lock().pending.values().map(VecDeque::len).sum()
    }

    /// Number of ids whose late responses are still being discarded.
    pub fn abandoned_len(&self) -> usize {
        self.state.lock().abandoned.len()
    }

    /// Wait for the next response carrying `id`.
    ///
    /// On timeout the id is abandoned: anything that arrives for it later is
    /// discarded rather than parked forever.
    pub fn wait(
        &self,
        id: &str,
        method: &str,
        timeout: Duration,
        poll_interval: Duration,
        streaming: bool,
    ) -> TraceResult<RpcResponse> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(response) = self.take_cached(id) {
                return Ok(response);
            }

            let now = Instant::now();
            if now >= deadline {
                self.abandon(id, streaming);
                self.stats.total_timeouts.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(correlation_id = %id, %method, "timed out waiting for response");
                return Err(TraceServerError::Timeout {
                    method: method.to_string(),
                    timeout_ms: timeout.as_millis() as u64,
                });
            }
            let slice = (deadline - now).min(poll_interval);

            let Some(_reading) = self.reading.try_lock_for(slice) else {
                continue;
            };
            // Whoever read before us may have parked ours.
            if let Some(response) = self.take_cached(id) {
                return Ok(response);
            }
            match self.responses.recv_timeout::<RpcResponse>(slice) {
                Ok(Some(response)) if response.correlation_id == id => return Ok(response),
                Ok(Some(response)) => self.park(response),
                Ok(None) => {}
                Err(ChannelError::Decode(e)) => {
                    tracing::warn!(error = %e, "dropping undecodable response");
                }
                Err(e) => return Err(TraceServerError::Channel(e.to_string())),
            }
        }
    }

    /// Stop routing responses for `id`. Parked responses are dropped; if the
    /// request may still produce more, those are discarded on arrival.
    pub fn abandon(&self, id: &str, streaming: bool) {
        let mut state = self.state.lock();
        let finished = state
            .pending
            .remove(id)
            .is_some_and(|parked| parked.iter().any(|r| is_terminal(r, streaming)));
        if !finished {
            state.abandoned.insert(id.to_string(), streaming);
        }
    }

    fn take_cached(&self, id: &str) -> Option<RpcResponse> {
        let mut state = self.state.lock();
        let queue = state.pending.get_mut(id)?;
        let response = queue.pop_front();
        if queue.is_empty() {
            state.pending.remove(id);
        }
        response
    }

    fn park(&self, response: RpcResponse) {
        let mut state = self.state.lock();
        if let Some(&streaming) = state.abandoned.get(&response.correlation_id) {
            if is_terminal(&response, streaming) {
                state.abandoned.remove(&response.correlation_id);
            }
            self.stats.total_discarded.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(correlation_id = %response.correlation_id, "discarding late response");
            return;
        }
        self.stats.total_out_of_order.fetch_add(1, Ordering::Relaxed);
        state
            .pending
            .entry(response.correlation_id.clone())
            .or_default()
            .push_back(response);
    }
}
