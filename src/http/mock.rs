//! Scripted in-memory transport for tests and offline demos.
//!
//! Routes are matched by substring against the request URL in registration
//! order. Each route replays its queued replies first and then repeats its
//! fallback reply, if one is set. Unmatched requests fail with a connection
//! error so that a missing route never looks like a successful fetch.

use crate::http::transport::HttpTransport;
use crate::http::types::{HttpRequest, HttpResponse, TransportError};
use futures::future::BoxFuture;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// One scripted reply
#[derive(Debug, Clone)]
pub struct MockReply {
    result: Result<HttpResponse, TransportError>,
    delay: Option<Duration>,
}

impl MockReply {
    pub fn json(status: u16, body: serde_json::Value) -> Self {
        Self {
            result: Ok(HttpResponse::json(status, &body)),
            delay: None,
        }
    }

    pub fn text(status: u16, body: impl Into<String>) -> Self {
        Self {
            result: Ok(HttpResponse::new(status, body)),
            delay: None,
        }
    }

    pub fn status(status: u16) -> Self {
        Self::text(status, "")
    }

    pub fn connect_error() -> Self {
        Self {
            result: Err(TransportError::Connect("connection refused".to_string())),
            delay: None,
        }
    }

    pub fn timeout() -> Self {
        Self {
            result: Err(TransportError::Timeout("deadline elapsed".to_string())),
            delay: None,
        }
    }

    /// Resolve only after `delay` has elapsed on the tokio clock
    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[derive(Debug)]
struct Route {
    pattern: String,
    queued: VecDeque<MockReply>,
    fallback: Option<MockReply>,
}

#[derive(Debug, Default)]
struct MockState {
    routes: Vec<Route>,
    requests: Vec<HttpRequest>,
}

#[derive(Debug, Default)]
pub struct MockTransport {
    state: Mutex<MockState>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn route_mut<'a>(state: &'a mut MockState, pattern: &str) -> &'a mut Route {
        let index = match state.routes.iter().position(|r| r.pattern == pattern) {
            Some(index) => index,
            None => {
                state.routes.push(Route {
                    pattern: pattern.to_string(),
                    queued: VecDeque::new(),
                    fallback: None,
                });
                state.routes.len() - 1
            }
        };
        &mut state.routes[index]
    }

    /// Queue a one-shot reply for URLs containing `pattern`
    pub fn enqueue(&self, pattern: &str, reply: MockReply) -> &Self {
        let mut state = self.lock();
        Self::route_mut(&mut state, pattern).queued.push_back(reply);
        self
    }

    /// Reply used for `pattern` once its queue is drained
    pub fn set_fallback(&self, pattern: &str, reply: MockReply) -> &Self {
        let mut state = self.lock();
        Self::route_mut(&mut state, pattern).fallback = Some(reply);
        self
    }

    /// All requests seen so far, in arrival order
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.lock().requests.clone()
    }

    pub fn request_count(&self, pattern: &str) -> usize {
        self.lock()
            .requests
            .iter()
            .filter(|r| r.url.contains(pattern))
            .count()
    }

    pub fn clear_requests(&self) {
        self.lock().requests.clear();
    }

    fn next_reply(&self, request: &HttpRequest) -> MockReply {
        let mut state = self.lock();
        state.requests.push(request.clone());

        let route = state
            .routes
            .iter_mut()
            .find(|route| request.url.contains(&route.pattern));

        match route {
            Some(route) => match route.queued.pop_front() {
                Some(reply) => reply,
                None => route.fallback.clone().unwrap_or_else(|| MockReply {
                    result: Err(TransportError::Connect(format!(
                        "no scripted reply left for {}",
                        route.pattern
                    ))),
                    delay: None,
                }),
            },
            None => MockReply {
                result: Err(TransportError::Connect(format!(
                    "no route for {}",
                    request.url
                ))),
                delay: None,
            },
        }
    }
}

impl HttpTransport for MockTransport {
    fn send(&self, request: HttpRequest) -> BoxFuture<'_, Result<HttpResponse, TransportError>> {
        Box::pin(async move {
            let reply = self.next_reply(&request);
            if let Some(delay) = reply.delay {
                tokio::time::sleep(delay).await;
            }
            reply.result
        })
    }

    fn transport_name(&self) -> &'static str {
        "mock"
    }
}
