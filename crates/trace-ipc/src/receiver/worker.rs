//! The worker loop.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use trace_types::TraceServer;

use super::dispatch::{dispatch, Reply};
use crate::channel::{ChannelError, ChannelReceiver, ChannelSender};
use crate::protocol::{RpcRequest, RpcResponse};

pub(crate) struct Worker {
    pub(crate) backend: Arc<dyn TraceServer>,
    pub(crate) requests: Arc<ChannelReceiver>,
    pub(crate) responses: Arc<ChannelSender>,
    pub(crate) stop: Arc<AtomicBool>,
    pub(crate) poll_interval: Duration,
}

impl Worker {
    /// Drain the request channel until stopped.
    pub(crate) fn run(self) {
        tracing::debug!("receiver worker started");
        while !self.stop.load(Ordering::Acquire) {
            let request = match self.requests.recv_timeout::<RpcRequest>(self.poll_interval) {
                Ok(Some(request)) => request,
                Ok(None) => continue,
                Err(ChannelError::Decode(e)) => {
                    // No correlation id to answer under.
                    tracing::warn!(error = %e, "dropping undecodable request");
                    continue;
                }
                Err(ChannelError::Closed) => {
                    tracing::error!("request channel closed, receiver worker exiting");
                    break;
                }
                Err(e @ ChannelError::FrameTooLarge { .. }) => {
                    // The stream has lost its frame boundary.
                    tracing::error!(
                        error = %e,
                        "request channel desynchronized, receiver worker exiting"
                    );
                    break;
                }
                Err(e) => {
                    tracing::error!(error = %e, "request channel failure");
                    std::thread::sleep(self.poll_interval);
                    continue;
                }
            };

            if request.is_stop() {
                tracing::debug!(correlation_id = %request.correlation_id, "stop request received");
                break;
            }

            let correlation_id = request.correlation_id.clone();
            let method = request.method.clone();
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.handle(request)));
            if let Err(panic) = outcome {
                let message = panic_message(panic.as_ref());
                tracing::error!(%correlation_id, %method, panic = %message, "backend panicked");
                self.respond(RpcResponse::err(
                    &correlation_id,
                    format!("backend panicked: {}", message),
                ));
            }
        }
        tracing::debug!("receiver worker stopped");
    }

    fn handle(&self, request: RpcRequest) {
        let id = request.correlation_id.as_str();
        let call = match request.decode() {
            Ok(call) => call,
            Err(e) => {
                tracing::warn!(correlation_id = %id, method = %request.method, error = %e, "rejecting request");
                self.respond(RpcResponse::err(
                    id,
                    format!("invalid request for method {:?}: {}", request.method, e),
                ));
                return;
            }
        };
        tracing::trace!(correlation_id = %id, method = call.name(), "dispatching");

        match dispatch(self.backend.as_ref(), call) {
            Ok(Reply::Unary(payload)) => {
                self.respond(RpcResponse::ok(id, payload));
            }
            Ok(Reply::Stream(items)) => {
                for item in items {
                    if self.stop.load(Ordering::Acquire) {
                        tracing::debug!(correlation_id = %id, "stopped mid-stream");
                        return;
                    }
                    match item {
                        Ok(payload) => {
                            if !self.respond(RpcResponse::ok(id, payload)) {
                                return;
                            }
                        }
                        Err(e) => {
                            tracing::warn!(correlation_id = %id, error = %e, "stream failed");
                            self.respond(RpcResponse::err(id, e.to_string()));
                            return;
                        }
                    }
                }
                self.respond(RpcResponse::stream_end(id));
            }
            Err(e) => {
                tracing::warn!(correlation_id = %id, method = %request.method, error = %e, "backend error");
                self.respond(RpcResponse::err(id, e.to_string()));
            }
        }
    }

    /// Returns whether the response was written.
    fn respond(&self, response: RpcResponse) -> bool {
        match self.responses.send(&response) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(
                    correlation_id = %response.correlation_id,
                    error = %e,
                    "failed to deliver response"
                );
                false
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
