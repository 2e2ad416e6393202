//! # Receiver
//!
//! Parent-side endpoint. Owns the request and response channels and one
//! background worker thread that feeds requests to the backend.
//!
//! ## Lifecycle
//!
//! 1. `new` creates both channels and starts the worker, then returns
//! 2. `handles` / `get_sender` give out the child-facing channel ends
//! 3. `stop` sets the stop flag, closes the response channel so a worker
//!    blocked on an unread stream gives up, wakes the worker with a stop
//!    request and joins it with a bounded wait; calling it again does nothing
//!
//! Dropping a `Receiver` stops it.

mod dispatch;
mod worker;

use std::os::fd::RawFd;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use parking_lot::Mutex;
use trace_types::TraceServer;
use uuid::Uuid;

use crate::channel::{channel, ChannelError, ChannelReceiver, ChannelSender};
use crate::config::IpcConfig;
use crate::protocol::RpcRequest;
use crate::sender::{ResponseRouter, Sender};
use worker::Worker;

/// The channel ends a child process needs to build a [`Sender`].
///
/// These are file-descriptor backed and stay valid across `fork()`.
#[derive(Debug, Clone)]
pub struct ChannelHandles {
    pub requests: Arc<ChannelSender>,
    pub responses: Arc<ChannelReceiver>,
}

impl ChannelHandles {
    /// Every file descriptor behind the two ends.
    pub fn fds(&self) -> Vec<RawFd> {
        let mut fds = self.requests.fds();
        fds.extend(self.responses.fds());
        fds
    }
}

pub struct Receiver {
    request_tx: Arc<ChannelSender>,
    response_rx: Arc<ChannelReceiver>,
    /// The worker's writing end, kept to close it on stop.
    response_tx: Arc<ChannelSender>,
    /// Shared by every Sender handed out by `get_sender`.
    router: Arc<ResponseRouter>,
    stop_flag: Arc<AtomicBool>,
    worker: Mutex<Option<JoinHandle<()>>>,
    config: IpcConfig,
}

impl Receiver {
    /// Start a Receiver with configuration from the environment.
    pub fn new(backend: Arc<dyn TraceServer>) -> Result<Self, ChannelError> {
        Self::with_config(backend, IpcConfig::from_env(), || {})
    }

    /// Start a Receiver. `worker_init` runs first thing on the worker thread,
    /// before any request is served.
    pub fn with_config<F>(
        backend: Arc<dyn TraceServer>,
        config: IpcConfig,
        worker_init: F,
    ) -> Result<Self, ChannelError>
    where
        F: FnOnce() + Send + 'static,
    {
        let (request_tx, request_rx) = channel()?;
        let (response_tx, response_rx) = channel()?;
        let request_tx = Arc::new(request_tx);
        let response_rx = Arc::new(response_rx);
        let response_tx = Arc::new(response_tx);
        let stop_flag = Arc::new(AtomicBool::new(false));

        let worker = Worker {
            backend,
            requests: Arc::new(request_rx),
            responses: Arc::clone(&response_tx),
            stop: Arc::clone(&stop_flag),
            poll_interval: config.poll_interval,
        };
        let handle = thread::Builder::new()
            .name("trace-ipc-receiver".to_string())
            .spawn(move || {
                worker_init();
                worker.run();
            })?;

        Ok(Self {
            router: Arc::new(ResponseRouter::new(Arc::clone(&response_rx))),
            request_tx,
            response_rx,
            response_tx,
            stop_flag,
            worker: Mutex::new(Some(handle)),
            config,
        })
    }

    /// Channel ends to pass to a child process.
    pub fn handles(&self) -> ChannelHandles {
        ChannelHandles {
            requests: Arc::clone(&self.request_tx),
            responses: Arc::clone(&self.response_rx),
        }
    }

    /// A Sender talking to this Receiver. Senders from the same Receiver share
    /// one response router.
    pub fn get_sender(&self) -> Sender {
        Sender::with_router(
            Arc::clone(&self.request_tx),
            Arc::clone(&self.router),
            self.config.clone(),
        )
    }

    pub fn is_running(&self) -> bool {
        self.worker
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Stop the worker. Idempotent.
    pub fn stop(&self) {
        let Some(handle) = self.worker.lock().take() else {
            return;
        };
        self.stop_flag.store(true, Ordering::Release);
        if let Err(e) = self.response_tx.close() {
            tracing::warn!(error = %e, "failed to close response channel");
        }

        let stop = RpcRequest::stop(format!("stop-{}", Uuid::new_v4()));
        if let Err(e) = self.request_tx.send(&stop) {
            tracing::warn!(error = %e, "failed to enqueue stop request");
        }

        let deadline = Instant::now() + self.config.stop_join_timeout;
        while !handle.is_finished() {
            if Instant::now() >= deadline {
                tracing::warn!(
                    timeout_ms = self.config.stop_join_timeout.as_millis() as u64,
                    "receiver worker did not stop in time, detaching"
                );
                return;
            }
            thread::sleep(self.config.poll_interval.min(std::time::Duration::from_millis(10)));
        }
        if handle.join().is_err() {
            tracing::error!("receiver worker panicked");
        }
    }
}

impl Drop for Receiver {
    fn drop(&mut self) {
        self.stop();
    }
}
