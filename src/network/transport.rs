//! The one seam between the console and the network.
//!
//! [`ApiClient`](super::ApiClient) builds an [`HttpRequest`] and hands it to
//! an [`HttpTransport`].  The browser build uses [`FetchTransport`]
//! (`fetch` via gloo-net, raced against a timer); tests and offline demos
//! use [`ScriptedTransport`], which replays canned responses and records
//! every request it saw.

use std::cell::RefCell;
use std::collections::VecDeque;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

/// One file in a multipart upload.
#[derive(Debug, Clone, PartialEq)]
pub struct FilePart {
    pub field: String,
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// Serialized JSON text.
    Json(String),
    /// Sent as `FormData`; the browser picks the boundary, so no explicit
    /// content-type header accompanies it.
    Multipart(Vec<FilePart>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<RequestBody>,
    pub timeout_ms: u32,
}

impl HttpRequest {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The request never produced a response.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct TransportError {
    pub message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait(?Send)]
pub trait HttpTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

// ---------------------------------------------------------------------------
// Browser transport
// ---------------------------------------------------------------------------

#[cfg(target_arch = "wasm32")]
#[derive(Debug, Default, Clone, Copy)]
pub struct FetchTransport;

#[cfg(target_arch = "wasm32")]
impl FetchTransport {
    fn form_data(parts: &[FilePart]) -> Result<web_sys::FormData, TransportError> {
        let form = web_sys::FormData::new()
            .map_err(|_| TransportError::new("failed to create FormData"))?;
        for part in parts {
            let bytes = js_sys::Uint8Array::from(part.bytes.as_slice());
            let sequence = js_sys::Array::of1(&bytes);
            let bag = web_sys::BlobPropertyBag::new();
            bag.set_type(&part.mime_type);
            let blob = web_sys::Blob::new_with_u8_array_sequence_and_options(&sequence, &bag)
                .map_err(|_| TransportError::new("failed to create upload blob"))?;
            form.append_with_blob_and_filename(&part.field, &blob, &part.file_name)
                .map_err(|_| TransportError::new("failed to append upload part"))?;
        }
        Ok(form)
    }
}

#[cfg(target_arch = "wasm32")]
#[async_trait(?Send)]
impl HttpTransport for FetchTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        use futures_util::future::{select, Either};
        use gloo_net::http::{Method, RequestBuilder};

        let method = match request.method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Put => Method::PUT,
            HttpMethod::Delete => Method::DELETE,
        };

        let mut builder = RequestBuilder::new(&request.url).method(method);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }

        let built = match &request.body {
            None => builder.build(),
            Some(RequestBody::Json(text)) => builder.body(text.clone()),
            Some(RequestBody::Multipart(parts)) => builder.body(Self::form_data(parts)?),
        }
        .map_err(|e| TransportError::new(e.to_string()))?;

        let timeout_ms = request.timeout_ms;
        let send = built.send();
        let timer = gloo_timers::future::TimeoutFuture::new(timeout_ms);
        futures_util::pin_mut!(send);
        futures_util::pin_mut!(timer);

        match select(send, timer).await {
            Either::Left((result, _)) => {
                let response = result.map_err(|e| TransportError::new(e.to_string()))?;
                let status = response.status();
                let body = response
                    .text()
                    .await
                    .map_err(|e| TransportError::new(e.to_string()))?;
                Ok(HttpResponse { status, body })
            }
            Either::Right(_) => Err(TransportError::new(format!(
                "timeout of {}ms exceeded",
                timeout_ms
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Scripted transport
// ---------------------------------------------------------------------------

/// Replays queued responses in FIFO order and records every request.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    responses: RefCell<VecDeque<Result<HttpResponse, TransportError>>>,
    requests: RefCell<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_response(&self, status: u16, body: impl Into<String>) {
        self.responses.borrow_mut().push_back(Ok(HttpResponse {
            status,
            body: body.into(),
        }));
    }

    pub fn push_json(&self, status: u16, body: serde_json::Value) {
        self.push_response(status, body.to_string());
    }

    pub fn push_failure(&self, message: impl Into<String>) {
        self.responses
            .borrow_mut()
            .push_back(Err(TransportError::new(message)));
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.borrow().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.borrow().len()
    }

    pub fn last_request(&self) -> Option<HttpRequest> {
        self.requests.borrow().last().cloned()
    }

    pub fn pending(&self) -> usize {
        self.responses.borrow().len()
    }
}

#[async_trait(?Send)]
impl HttpTransport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        log::debug!("{} {}", request.method.as_str(), request.url);
        self.requests.borrow_mut().push(request);
        self.responses
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::new("no scripted response left")))
    }
}
