//! HTTP client for the card backend.
//!
//! Every call goes through [`ApiClient::send`], which builds the absolute URL,
//! records the request in the debug log and turns non-2xx answers into
//! [`AppError::Http`].

use std::cell::RefCell;
use std::fmt;

use chrono::{DateTime, Utc};
use reqwest::header::CONTENT_TYPE;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::domain::{normalize_base, AppConfig, AppError, ImageUpload, Result};

const JSON_BODY_PLACEHOLDER: &str = "<<body>>";
const FORM_BODY_PLACEHOLDER: &str = "<<formdata>>";

/// Body attached to an outgoing request.
#[derive(Debug, Clone, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(Value),
    Multipart(ImageUpload),
}

/// Method, headers and body of one call.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub method: Method,
    pub headers: Vec<(String, String)>,
    pub body: RequestBody,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            method: Method::GET,
            headers: Vec::new(),
            body: RequestBody::Empty,
        }
    }
}

impl RequestOptions {
    #[must_use]
    pub fn method(method: Method) -> Self {
        Self {
            method,
            ..Self::default()
        }
    }

    /// JSON body with a matching content type header.
    #[must_use]
    pub fn json(method: Method, body: Value) -> Self {
        Self {
            method,
            headers: vec![("Content-Type".into(), "application/json".into())],
            body: RequestBody::Json(body),
        }
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// Parsed response body.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Json(Value),
    Text(String),
}

impl ResponseBody {
    /// Deserialize a JSON body into `T`.
    ///
    /// # Errors
    /// Returns error if the body is text or does not match `T`.
    pub fn into_json<T: DeserializeOwned>(self) -> Result<T> {
        match self {
            Self::Json(value) => serde_json::from_value(value).map_err(AppError::json_parse),
            Self::Text(text) => Err(AppError::UnexpectedResponse {
                message: format!("expected JSON, got text: {}", preview(&text)),
            }),
        }
    }
}

/// Diagnostic record of the most recent outgoing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLog {
    pub url: String,
    pub method: String,
    pub headers: Vec<(String, String)>,
    /// Placeholder standing in for the body, never the body itself.
    pub body: Option<&'static str>,
    pub timestamp: DateTime<Utc>,
}

impl RequestLog {
    fn record(url: &str, options: &RequestOptions) -> Self {
        let headers = options
            .headers
            .iter()
            .map(|(name, value)| {
                if name.eq_ignore_ascii_case("authorization") {
                    (name.clone(), "Bearer ***".to_string())
                } else {
                    (name.clone(), value.clone())
                }
            })
            .collect();

        let body = match options.body {
            RequestBody::Empty => None,
            RequestBody::Json(_) => Some(JSON_BODY_PLACEHOLDER),
            RequestBody::Multipart(_) => Some(FORM_BODY_PLACEHOLDER),
        };

        Self {
            url: url.to_string(),
            method: options.method.to_string(),
            headers,
            body,
            timestamp: Utc::now(),
        }
    }
}

impl fmt::Display for RequestLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} {}", self.method, self.url)?;
        for (name, value) in &self.headers {
            writeln!(f, "  {name}: {value}")?;
        }
        if let Some(body) = self.body {
            writeln!(f, "  body: {body}")?;
        }
        write!(f, "  at: {}", self.timestamp.to_rfc3339())
    }
}

/// Client bound to one backend base URL.
pub struct ApiClient {
    base: String,
    client: Client,
    last_request: RefCell<Option<RequestLog>>,
}

impl ApiClient {
    /// Create a client for `base`.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be initialized.
    pub fn new(base: &str) -> Result<Self> {
        let client = Client::builder().build().map_err(AppError::network)?;
        Ok(Self {
            base: normalize_base(base),
            client,
            last_request: RefCell::new(None),
        })
    }

    /// Create a client for the configured backend.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be initialized.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Self::new(&config.api_base())
    }

    #[must_use]
    pub fn base(&self) -> &str {
        &self.base
    }

    /// The most recent request issued by this client.
    #[must_use]
    pub fn last_request(&self) -> Option<RequestLog> {
        self.last_request.borrow().clone()
    }

    /// Issue a request and parse the body by content type.
    ///
    /// # Errors
    /// Returns `Network` on transport failure, `Http` on non-2xx.
    pub async fn request(&self, path: &str, options: RequestOptions) -> Result<ResponseBody> {
        let response = self.send(path, options).await?;
        read_body(response).await
    }

    /// Issue a request and return the raw body bytes.
    ///
    /// # Errors
    /// Returns `Network` on transport failure, `Http` on non-2xx.
    pub async fn request_bytes(&self, path: &str, options: RequestOptions) -> Result<Vec<u8>> {
        let response = self.send(path, options).await?;
        let bytes = response.bytes().await.map_err(AppError::network)?;
        Ok(bytes.to_vec())
    }

    async fn send(&self, path: &str, options: RequestOptions) -> Result<Response> {
        let url = build_url(&self.base, path);
        self.last_request
            .replace(Some(RequestLog::record(&url, &options)));

        tracing::debug!(method = %options.method, url = %url, "Sending request");

        let mut builder = self.client.request(options.method, &url);
        for (name, value) in &options.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        builder = match options.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.body(value.to_string()),
            RequestBody::Multipart(upload) => {
                let part = Part::bytes(upload.bytes)
                    .file_name(upload.file_name)
                    .mime_str(&upload.mime)
                    .map_err(AppError::network)?;
                builder.multipart(Form::new().part("file", part))
            }
        };

        let response = builder.send().await.map_err(|e| {
            tracing::warn!(url = %url, error = %e, "Request failed");
            AppError::network(e)
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = read_body(response)
            .await
            .unwrap_or_else(|e| ResponseBody::Text(e.to_string()));
        let err = AppError::Http {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            detail: error_detail(&body),
        };
        tracing::warn!(url = %url, error = %err, "Backend returned an error");
        Err(err)
    }
}

async fn read_body(response: Response) -> Result<ResponseBody> {
    let is_json = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(is_json_content_type);

    let text = response.text().await.map_err(AppError::network)?;
    if is_json {
        serde_json::from_str(&text)
            .map(ResponseBody::Json)
            .map_err(AppError::json_parse)
    } else {
        Ok(ResponseBody::Text(text))
    }
}

/// Join a normalized base with a path, adding the leading slash if missing.
#[must_use]
pub fn build_url(base: &str, path: &str) -> String {
    let base = normalize_base(base);
    if path.starts_with('/') {
        format!("{base}{path}")
    } else {
        format!("{base}/{path}")
    }
}

fn is_json_content_type(content_type: &str) -> bool {
    content_type.contains("application/json")
}

/// Best-effort human message from an error body.
#[must_use]
pub fn error_detail(body: &ResponseBody) -> String {
    match body {
        ResponseBody::Json(value) => match value.get("detail").filter(|d| !is_blank(d)) {
            Some(Value::String(detail)) => detail.clone(),
            Some(detail) => detail.to_string(),
            None => value.to_string(),
        },
        ResponseBody::Text(text) => text.clone(),
    }
}

/// Detail values that carry no message: null, `""`, `false` and `0`.
fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::Array(_) | Value::Object(_) => false,
    }
}

fn preview(text: &str) -> String {
    let first = text.lines().next().unwrap_or_default();
    if first.chars().count() > 80 {
        format!("{}...", first.chars().take(77).collect::<String>())
    } else {
        first.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_build_url() {
        assert_eq!(build_url("http://h:8000/", "/ping"), "http://h:8000/ping");
        assert_eq!(build_url("http://h:8000", "ping"), "http://h:8000/ping");
        assert_eq!(build_url("", "/all_cards"), "/all_cards");
    }

    #[test]
    fn test_error_detail_prefers_detail_field() {
        let body = ResponseBody::Json(json!({"detail": "Card not found"}));
        assert_eq!(error_detail(&body), "Card not found");

        let body = ResponseBody::Json(json!({"detail": [{"loc": ["body"]}]}));
        assert_eq!(error_detail(&body), r#"[{"loc":["body"]}]"#);

        let body = ResponseBody::Json(json!({"error": "boom"}));
        assert_eq!(error_detail(&body), r#"{"error":"boom"}"#);

        let body = ResponseBody::Text("Bad Gateway".into());
        assert_eq!(error_detail(&body), "Bad Gateway");
    }

    #[test]
    fn test_error_detail_blank_detail_falls_back_to_body() {
        let body = ResponseBody::Json(json!({"detail": ""}));
        assert_eq!(error_detail(&body), r#"{"detail":""}"#);

        let body = ResponseBody::Json(json!({"detail": null, "code": 7}));
        assert_eq!(error_detail(&body), r#"{"code":7,"detail":null}"#);
    }

    #[test]
    fn test_json_content_type() {
        assert!(is_json_content_type("application/json; charset=utf-8"));
        assert!(!is_json_content_type("text/plain"));
    }

    #[test]
    fn test_request_log_redacts() {
        let upload = ImageUpload {
            file_name: "card.jpg".into(),
            mime: "image/jpeg".into(),
            bytes: vec![1, 2, 3],
        };
        let options = RequestOptions {
            method: Method::POST,
            headers: vec![("Authorization".into(), "Bearer abc".into())],
            body: RequestBody::Multipart(upload),
        };
        let log = RequestLog::record("http://h/extract", &options);

        assert_eq!(log.method, "POST");
        assert_eq!(log.body, Some(FORM_BODY_PLACEHOLDER));
        assert_eq!(log.headers[0].1, "Bearer ***");

        let log = RequestLog::record("http://h/create_card", &RequestOptions::json(Method::POST, json!({})));
        assert_eq!(log.body, Some(JSON_BODY_PLACEHOLDER));
        assert!(log.to_string().starts_with("POST http://h/create_card"));
    }

    #[test]
    fn test_text_body_is_not_json() {
        let body = ResponseBody::Text("<html>".into());
        assert!(matches!(
            body.into_json::<Value>(),
            Err(AppError::UnexpectedResponse { .. })
        ));
    }

    #[test]
    fn test_new_client_normalizes_base() {
        let client = ApiClient::new("http://localhost:8000//").unwrap();
        assert_eq!(client.base(), "http://localhost:8000");
        assert!(client.last_request().is_none());
    }
}
