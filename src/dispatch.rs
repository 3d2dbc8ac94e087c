//! Uniform request dispatch against the simulation server.
//!
//! `RequestOptions` mirrors the options contract of the web client: an
//! endpoint, a method (POST unless stated), whether the payload is
//! URL-encoded (`process_data`), the content encoding (JSON unless unset for
//! multipart uploads) and the payload itself. `prepare` turns the options into
//! a transport-neutral `PreparedRequest`; a `Transport` executes it.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::multipart;
use reqwest::{Client, Url};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DispatchError {
    /// The request never produced a response.
    #[error("{0}")]
    Transport(String),
    /// Non-2xx response; displays as the reason phrase.
    #[error("{reason}")]
    Status { status: u16, reason: String },
    /// The body was not the JSON the action expects.
    #[error("parsererror: {0}")]
    Parse(String),
    #[error("invalid request url '{0}'")]
    InvalidUrl(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Get => f.write_str("GET"),
            Method::Post => f.write_str("POST"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Encoding {
    /// `application/json`; POST payloads are serialized as JSON text.
    Json,
    /// No content type is forced; lets multipart payloads through untouched.
    Unset,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct FilePart {
    pub field: String,
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Multipart form content: ordered text fields plus optional file parts.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FormData {
    pub fields: Vec<(String, String)>,
    pub files: Vec<FilePart>,
}

impl FormData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.fields.push((name.to_string(), value.to_string()));
        self
    }

    pub fn file(mut self, field: &str, file_name: &str, bytes: Vec<u8>) -> Self {
        self.files.push(FilePart {
            field: field.to_string(),
            file_name: file_name.to_string(),
            bytes,
        });
        self
    }

    fn text_pairs(&self) -> Vec<(String, String)> {
        self.fields.clone()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Payload {
    Json(Value),
    Form(FormData),
}

#[derive(Clone, Debug, PartialEq)]
pub struct RequestOptions {
    pub url: String,
    pub method: Method,
    pub process_data: bool,
    pub encoding: Encoding,
    pub payload: Option<Payload>,
}

impl RequestOptions {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            method: Method::Post,
            process_data: true,
            encoding: Encoding::Json,
            payload: None,
        }
    }

    pub fn get(url: &str) -> Self {
        Self {
            method: Method::Get,
            ..Self::new(url)
        }
    }

    pub fn json(mut self, value: Value) -> Self {
        self.payload = Some(Payload::Json(value));
        self
    }

    /// Multipart upload: no processing, no forced content type.
    pub fn multipart(mut self, form: FormData) -> Self {
        self.process_data = false;
        self.encoding = Encoding::Unset;
        self.payload = Some(Payload::Form(form));
        self
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Body {
    Empty,
    Json(String),
    UrlEncoded(String),
    Multipart(FormData),
    Raw(String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct PreparedRequest {
    pub method: Method,
    /// Path relative to the server base, query string included.
    pub path: String,
    pub content_type: Option<&'static str>,
    pub body: Body,
}

pub fn prepare(options: &RequestOptions) -> PreparedRequest {
    let mut path = options.url.clone();
    let mut content_type = match options.encoding {
        Encoding::Json => Some("application/json"),
        Encoding::Unset => None,
    };

    let body = match (options.method, options.encoding, &options.payload) {
        (_, _, None) => Body::Empty,
        (Method::Post, Encoding::Json, Some(payload)) => Body::Json(json_text(payload)),
        (Method::Get, _, Some(payload)) => {
            if options.process_data {
                let query = url_encode(&payload_pairs(payload));
                if !query.is_empty() {
                    path.push(if path.contains('?') { '&' } else { '?' });
                    path.push_str(&query);
                }
            }
            Body::Empty
        }
        (Method::Post, Encoding::Unset, Some(payload)) if options.process_data => {
            content_type = Some("application/x-www-form-urlencoded");
            Body::UrlEncoded(url_encode(&payload_pairs(payload)))
        }
        (Method::Post, Encoding::Unset, Some(Payload::Form(form))) => Body::Multipart(form.clone()),
        (Method::Post, Encoding::Unset, Some(Payload::Json(value))) => Body::Raw(value.to_string()),
    };

    PreparedRequest {
        method: options.method,
        path,
        content_type,
        body,
    }
}

fn json_text(payload: &Payload) -> String {
    match payload {
        Payload::Json(value) => value.to_string(),
        Payload::Form(form) => {
            let object = form
                .text_pairs()
                .into_iter()
                .map(|(key, value)| (key, Value::String(value)))
                .collect::<serde_json::Map<_, _>>();
            Value::Object(object).to_string()
        }
    }
}

fn payload_pairs(payload: &Payload) -> Vec<(String, String)> {
    match payload {
        Payload::Form(form) => form.text_pairs(),
        Payload::Json(Value::Object(map)) => map
            .iter()
            .map(|(key, value)| {
                let text = match value {
                    Value::String(text) => text.clone(),
                    other => other.to_string(),
                };
                (key.clone(), text)
            })
            .collect(),
        Payload::Json(_) => Vec::new(),
    }
}

fn url_encode(pairs: &[(String, String)]) -> String {
    pairs
        .iter()
        .map(|(key, value)| {
            format!(
                "{}={}",
                urlencoding::encode(key),
                urlencoding::encode(value)
            )
        })
        .collect::<Vec<_>>()
        .join("&")
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Reply {
    pub status: u16,
    pub body: Vec<u8>,
}

impl Reply {
    pub fn json_ok(value: &Value) -> Self {
        Self {
            status: 200,
            body: value.to_string().into_bytes(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn json_value(&self) -> Result<Value, DispatchError> {
        serde_json::from_slice(&self.body).map_err(|err| DispatchError::Parse(err.to_string()))
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: PreparedRequest) -> Result<Reply, DispatchError>;
}

/// `reqwest`-backed transport rooted at the server base url.
pub struct HttpTransport {
    client: Client,
    base: Url,
}

impl HttpTransport {
    pub fn new(base_url: &str) -> Result<Self, DispatchError> {
        let base =
            Url::parse(base_url).map_err(|_| DispatchError::InvalidUrl(base_url.to_string()))?;
        let client = Client::builder()
            .user_agent(concat!("qsim/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| DispatchError::Transport(err.to_string()))?;
        Ok(Self { client, base })
    }

    fn url_for(&self, path: &str) -> Result<Url, DispatchError> {
        self.base
            .join(path)
            .map_err(|_| DispatchError::InvalidUrl(path.to_string()))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: PreparedRequest) -> Result<Reply, DispatchError> {
        let url = self.url_for(&request.path)?;
        let mut builder = match request.method {
            Method::Get => self.client.get(url),
            Method::Post => self.client.post(url),
        };
        builder = match request.body {
            Body::Empty => builder,
            Body::Json(text) | Body::UrlEncoded(text) | Body::Raw(text) => builder.body(text),
            Body::Multipart(form) => builder.multipart(to_multipart(form)),
        };
        if let Some(content_type) = request.content_type {
            builder = builder.header(reqwest::header::CONTENT_TYPE, content_type);
        }

        let response = builder
            .send()
            .await
            .map_err(|err| DispatchError::Transport(err.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|err| DispatchError::Transport(err.to_string()))?
            .to_vec();

        Ok(Reply { status, body })
    }
}

fn to_multipart(form: FormData) -> multipart::Form {
    let mut out = multipart::Form::new();
    for (name, value) in form.fields {
        out = out.text(name, value);
    }
    for file in form.files {
        let part = multipart::Part::bytes(file.bytes).file_name(file.file_name);
        out = out.part(file.field, part);
    }
    out
}

/// Sends prepared requests and folds non-2xx statuses into errors.
#[derive(Clone)]
pub struct Dispatcher {
    transport: Arc<dyn Transport>,
}

impl Dispatcher {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    pub async fn send(&self, options: &RequestOptions) -> Result<Reply, DispatchError> {
        let request = prepare(options);
        debug!(method = %request.method, path = %request.path, "dispatching request");

        let reply = self.transport.execute(request).await.inspect_err(|err| {
            warn!(url = %options.url, error = %err, "request failed");
        })?;

        if !reply.is_success() {
            let reason = reason_phrase(reply.status);
            warn!(url = %options.url, status = reply.status, "request rejected");
            return Err(DispatchError::Status {
                status: reply.status,
                reason,
            });
        }

        Ok(reply)
    }
}

fn reason_phrase(status: u16) -> String {
    reqwest::StatusCode::from_u16(status)
        .ok()
        .and_then(|code| code.canonical_reason())
        .map(str::to_string)
        .unwrap_or_else(|| format!("HTTP {}", status))
}
