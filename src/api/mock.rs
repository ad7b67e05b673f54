//! Scripted transport for testing.

use std::collections::VecDeque;
use std::sync::Mutex;

use super::{ApiRequest, ApiResponse, Method, Transport, TransportError};

type Scripted = Result<ApiResponse, TransportError>;

#[derive(Debug)]
struct Route {
    method: Method,
    pattern: String,
    queue: VecDeque<Scripted>,
    fallback: Option<Scripted>,
}

impl Route {
    fn matches(&self, request: &ApiRequest) -> bool {
        self.method == request.method
            && request.url.contains(&self.pattern)
            && (!self.queue.is_empty() || self.fallback.is_some())
    }

    fn next(&mut self) -> Scripted {
        match self.queue.pop_front() {
            Some(r) => r,
            // matches() guarantees one of the two is present
            None => self.fallback.clone().unwrap_or_else(|| {
                Err(TransportError::Unscripted {
                    method: self.method,
                    url: self.pattern.clone(),
                })
            }),
        }
    }
}

/// A [`Transport`] that answers from scripted responses and records every
/// request it receives.
///
/// Routes are matched by method and URL substring, in the order they were
/// added. Each route answers from its queue first and then from its sticky
/// fallback, if one was set. Requests with no matching route fail with
/// [`TransportError::Unscripted`].
#[derive(Debug, Default)]
pub struct MockTransport {
    routes: Mutex<Vec<Route>>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl MockTransport {
    /// Create an empty mock with no routes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue one response for requests matching `method` and `pattern`.
    pub fn respond(&self, method: Method, pattern: &str, response: ApiResponse) -> &Self {
        self.push(method, pattern, Ok(response));
        self
    }

    /// Queue one transport failure for matching requests.
    pub fn fail(&self, method: Method, pattern: &str, error: TransportError) -> &Self {
        self.push(method, pattern, Err(error));
        self
    }

    /// Answer every matching request with `response` once the queue is empty.
    pub fn respond_always(&self, method: Method, pattern: &str, response: ApiResponse) -> &Self {
        let mut routes = self.routes.lock().unwrap_or_else(|e| e.into_inner());
        match routes
            .iter_mut()
            .find(|r| r.method == method && r.pattern == pattern)
        {
            Some(route) => route.fallback = Some(Ok(response)),
            None => routes.push(Route {
                method,
                pattern: pattern.to_string(),
                queue: VecDeque::new(),
                fallback: Some(Ok(response)),
            }),
        }
        self
    }

    /// All requests received so far, in order.
    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Requests received with the given method.
    pub fn requests_with(&self, method: Method) -> Vec<ApiRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == method)
            .collect()
    }

    /// Number of requests received so far.
    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    fn push(&self, method: Method, pattern: &str, scripted: Scripted) {
        let mut routes = self.routes.lock().unwrap_or_else(|e| e.into_inner());
        match routes
            .iter_mut()
            .find(|r| r.method == method && r.pattern == pattern)
        {
            Some(route) => route.queue.push_back(scripted),
            None => routes.push(Route {
                method,
                pattern: pattern.to_string(),
                queue: VecDeque::from([scripted]),
                fallback: None,
            }),
        }
    }
}

impl Transport for MockTransport {
    fn send(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request.clone());

        let mut routes = self.routes.lock().unwrap_or_else(|e| e.into_inner());
        match routes.iter_mut().find(|r| r.matches(request)) {
            Some(route) => route.next(),
            None => Err(TransportError::Unscripted {
                method: request.method,
                url: request.url.clone(),
            }),
        }
    }
}
