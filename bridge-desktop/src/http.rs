//! HTTP Client Implementation using Reqwest

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    http::{
        HttpBody, HttpClient, HttpMethod, HttpRequest, HttpResponse, MultipartForm,
        MultipartPart, CONTENT_TYPE,
    },
};
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

const USER_AGENT: &str = concat!("opsdesk-core/", env!("CARGO_PKG_VERSION"));

/// Reqwest-based HTTP client implementation
///
/// Provides HTTP operations with:
/// - Connection pooling via reqwest
/// - Exactly one send per `execute`, no transport retries
/// - Multipart encoding with a transport-generated boundary
/// - TLS support by default
pub struct ReqwestHttpClient {
    client: Client,
}

impl ReqwestHttpClient {
    /// Create a new HTTP client with default configuration
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_secs(30))
    }

    /// Create a new HTTP client with custom timeout
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::try_with_timeout(timeout).expect("Failed to build HTTP client")
    }

    /// Fallible constructor for hosts that want to report TLS backend failures
    pub fn try_with_timeout(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(10)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| BridgeError::NotAvailable(format!("HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    /// Create a new HTTP client with custom configuration
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Convert bridge HttpMethod to reqwest Method
    fn convert_method(method: HttpMethod) -> reqwest::Method {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
            HttpMethod::Head => reqwest::Method::HEAD,
        }
    }

    fn convert_form(form: MultipartForm) -> Result<Form> {
        let mut out = Form::new();

        for part in form.parts() {
            out = match part {
                MultipartPart::Text { name, value } => out.text(name.clone(), value.clone()),
                MultipartPart::File {
                    name,
                    file_name,
                    mime_type,
                    data,
                } => {
                    let mut file_part = Part::bytes(data.to_vec()).file_name(file_name.clone());
                    if let Some(mime) = mime_type {
                        file_part = file_part.mime_str(mime).map_err(|e| {
                            BridgeError::OperationFailed(format!(
                                "Invalid MIME type for part '{}': {}",
                                name, e
                            ))
                        })?;
                    }
                    out.part(name.clone(), file_part)
                }
            };
        }

        Ok(out)
    }

    /// Build reqwest request from bridge request
    fn build_request(&self, request: HttpRequest) -> Result<reqwest::RequestBuilder> {
        let method = Self::convert_method(request.method);
        let mut req = self.client.request(method, &request.url);
        let multipart = request.body.is_multipart();

        // Add headers
        for (key, value) in request.headers {
            if multipart && key.eq_ignore_ascii_case(CONTENT_TYPE) {
                warn!("Dropping explicit Content-Type on multipart request");
                continue;
            }
            req = req.header(key, value);
        }

        // Add body if present
        req = match request.body {
            HttpBody::Empty => req,
            HttpBody::Json(bytes) | HttpBody::Raw(bytes) => req.body(bytes),
            HttpBody::Multipart(form) => req.multipart(Self::convert_form(form)?),
        };

        // Add timeout if specified
        if let Some(timeout) = request.timeout {
            req = req.timeout(timeout);
        }

        Ok(req)
    }

    fn map_send_error(e: reqwest::Error) -> BridgeError {
        if e.is_timeout() {
            BridgeError::Timeout
        } else if e.is_connect() {
            BridgeError::Network(format!("Connection failed: {}", e))
        } else if e.is_builder() {
            BridgeError::OperationFailed(e.to_string())
        } else {
            BridgeError::Network(e.to_string())
        }
    }

    async fn read_response(response: reqwest::Response) -> Result<HttpResponse> {
        let status = response.status().as_u16();
        let headers: HashMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|s| (k.to_string(), s.to_string())))
            .collect();
        let body = response.bytes().await.map_err(Self::map_send_error)?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

impl Default for ReqwestHttpClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    /// One send, whatever the outcome. Retrying is the caller's decision.
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        debug!(method = %request.method, url = %request.url, "Executing HTTP request");

        let response = self
            .build_request(request)?
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "HTTP request failed");
                Self::map_send_error(e)
            })?;

        Self::read_response(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

    #[tokio::test]
    async fn test_http_client_creation() {
        let _client = ReqwestHttpClient::new();
        assert!(ReqwestHttpClient::try_with_timeout(Duration::from_secs(5)).is_ok());
    }

    #[test]
    fn test_method_conversion() {
        assert_eq!(
            ReqwestHttpClient::convert_method(HttpMethod::Get),
            reqwest::Method::GET
        );
        assert_eq!(
            ReqwestHttpClient::convert_method(HttpMethod::Patch),
            reqwest::Method::PATCH
        );
    }

    #[tokio::test]
    async fn test_json_request_round_trip() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/clients"))
            .and(header("Content-Type", "application/json"))
            .and(header("Authorization", "Bearer abc"))
            .respond_with(ResponseTemplate::new(201).set_body_string(r#"{"id":7}"#))
            .mount(&mock_server)
            .await;

        let client = ReqwestHttpClient::new();
        let request = HttpRequest::new(
            HttpMethod::Post,
            format!("{}/api/clients", mock_server.uri()),
        )
        .bearer_token("abc")
        .json(&serde_json::json!({ "name": "Padaria Central" }))
        .unwrap();

        let response = client.execute(request).await.unwrap();
        assert_eq!(response.status, 201);
        let body: serde_json::Value = response.json().unwrap();
        assert_eq!(body["id"], 7);
    }

    #[tokio::test]
    async fn test_error_status_is_returned_not_raised() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/orders/9"))
            .respond_with(
                ResponseTemplate::new(404).set_body_string(r#"{"message":"Pedido não encontrado"}"#),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = ReqwestHttpClient::new();
        let request =
            HttpRequest::new(HttpMethod::Get, format!("{}/api/orders/9", mock_server.uri()));

        let response = client.execute(request).await.unwrap();
        assert_eq!(response.status, 404);
    }

    struct BoundaryCheck;

    impl Respond for BoundaryCheck {
        fn respond(&self, request: &Request) -> ResponseTemplate {
            let content_type = request
                .headers
                .get("content-type")
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string();

            let body = String::from_utf8_lossy(&request.body).to_string();
            let ok = content_type.starts_with("multipart/form-data; boundary=")
                && body.contains("name=\"image\"; filename=\"foto.png\"")
                && body.contains("name=\"productId\"");

            if ok {
                ResponseTemplate::new(200).set_body_string(r#"{"url":"/img/foto.png"}"#)
            } else {
                ResponseTemplate::new(400)
            }
        }
    }

    #[tokio::test]
    async fn test_multipart_boundary_assigned_by_transport() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/products/42/image"))
            .respond_with(BoundaryCheck)
            .mount(&mock_server)
            .await;

        let form = MultipartForm::new().text("productId", "42").file(
            "image",
            "foto.png",
            Some("image/png".to_string()),
            vec![0x89u8, 0x50, 0x4e, 0x47],
        );

        // A stale explicit content type must not reach the wire.
        let mut request = HttpRequest::new(
            HttpMethod::Post,
            format!("{}/api/products/42/image", mock_server.uri()),
        )
        .multipart(form);
        request
            .headers
            .insert("Content-Type".to_string(), "multipart/form-data".to_string());

        let response = ReqwestHttpClient::new().execute(request).await.unwrap();
        assert_eq!(response.status, 200);
    }

    #[tokio::test]
    async fn test_connection_failure_is_network_error() {
        let client = ReqwestHttpClient::with_timeout(Duration::from_secs(2));
        let request = HttpRequest::new(HttpMethod::Get, "http://127.0.0.1:9/unreachable");

        let err = client.execute(request).await.unwrap_err();
        assert!(err.is_transport());
    }

    #[tokio::test]
    async fn test_server_error_is_sent_once() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/health"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = ReqwestHttpClient::new();
        let request =
            HttpRequest::new(HttpMethod::Get, format!("{}/api/health", mock_server.uri()));
        let response = client.execute(request).await.unwrap();

        assert_eq!(response.status, 503);
        mock_server.verify().await;
    }
}
