//! Lazy consumption of a streaming call.

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;
use trace_types::{TraceResult, TraceServerError};

use super::router::ResponseRouter;

/// Yields the data responses of one streaming request.
///
/// The stream-end response finishes the sequence without an item; an error
/// response yields one `Err` and finishes it. Dropping the stream early
/// abandons the request so its remaining responses are discarded.
pub struct ResponseStream<T> {
    router: Arc<ResponseRouter>,
    correlation_id: String,
    method: &'static str,
    item_timeout: Duration,
    poll_interval: Duration,
    done: bool,
    _item: PhantomData<fn() -> T>,
}

impl<T> ResponseStream<T> {
    pub(crate) fn new(
        router: Arc<ResponseRouter>,
        correlation_id: String,
        method: &'static str,
        item_timeout: Duration,
        poll_interval: Duration,
    ) -> Self {
        Self {
            router,
            correlation_id,
            method,
            item_timeout,
            poll_interval,
            done: false,
            _item: PhantomData,
        }
    }

    fn fail(&mut self, error: TraceServerError) -> Option<TraceResult<T>> {
        self.done = true;
        Some(Err(error))
    }
}

impl<T: DeserializeOwned> Iterator for ResponseStream<T> {
    type Item = TraceResult<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let response = match self.router.wait(
            &self.correlation_id,
            self.method,
            self.item_timeout,
            self.poll_interval,
            true,
        ) {
            Ok(response) => response,
            // The router has already abandoned the id.
            Err(e) => return self.fail(e),
        };

        if response.is_stream_end() {
            self.done = true;
            return None;
        }
        if let Some(error) = response.error {
            return self.fail(TraceServerError::Rpc(error));
        }
        match serde_json::from_value(response.payload.unwrap_or(Value::Null)) {
            Ok(item) => Some(Ok(item)),
            Err(e) => {
                self.router.abandon(&self.correlation_id, true);
                self.fail(TraceServerError::Rpc(format!(
                    "malformed {} item: {}",
                    self.method, e
                )))
            }
        }
    }
}

impl<T> Drop for ResponseStream<T> {
    fn drop(&mut self) {
        if !self.done {
            tracing::debug!(correlation_id = %self.correlation_id, "stream dropped before its end");
            self.router.abandon(&self.correlation_id, true);
        }
    }
}
