//! Single HTTP exchange against the backend API.

use crate::error::{ApiError, Result, UNKNOWN_ERROR_MESSAGE};
use crate::request::{ApiRequest, RequestBody};
use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse, AUTHORIZATION};
use core_auth::CredentialStore;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

/// Performs one attempt of an [`ApiRequest`].
///
/// Attaches the stored access credential, encodes the body, enforces the
/// deadline and cancellation, and turns the response into either the decoded
/// value or an [`ApiError`]. It never retries; see
/// [`RetryPolicy`](crate::retry::RetryPolicy).
pub struct RequestExecutor {
    http_client: Arc<dyn HttpClient>,
    credentials: Arc<CredentialStore>,
    api_root: String,
    default_timeout: Duration,
}

impl RequestExecutor {
    /// `api_root` is the base URL joined with the API prefix,
    /// e.g. `https://admin.example.com/api`.
    pub fn new(
        http_client: Arc<dyn HttpClient>,
        credentials: Arc<CredentialStore>,
        api_root: impl Into<String>,
        default_timeout: Duration,
    ) -> Self {
        Self {
            http_client,
            credentials,
            api_root: api_root.into().trim_end_matches('/').to_string(),
            default_timeout,
        }
    }

    pub fn url_for(&self, endpoint: &str) -> String {
        if endpoint.starts_with('/') {
            format!("{}{}", self.api_root, endpoint)
        } else {
            format!("{}/{}", self.api_root, endpoint)
        }
    }

    /// Issue the request with whatever credential is stored right now.
    pub async fn call<T: DeserializeOwned>(&self, request: &ApiRequest) -> Result<T> {
        let token = if request.authenticated {
            self.credentials.access_token().await
        } else {
            None
        };
        self.call_with_token(request, token.as_deref()).await
    }

    /// Issue the request with an explicit access credential (or none).
    #[instrument(
        skip(self, request, access_token),
        fields(method = %request.method, endpoint = %request.endpoint, request_id = %Uuid::new_v4())
    )]
    pub async fn call_with_token<T: DeserializeOwned>(
        &self,
        request: &ApiRequest,
        access_token: Option<&str>,
    ) -> Result<T> {
        if request.is_cancelled() {
            return Err(ApiError::Cancelled);
        }

        let http_request = self.build(request, access_token)?;
        let deadline = request.timeout.unwrap_or(self.default_timeout);

        let exchange = async {
            match timeout(deadline, self.http_client.execute(http_request)).await {
                Ok(result) => result.map_err(ApiError::from),
                Err(_) => Err(ApiError::Timeout),
            }
        };

        let response = match &request.cancel {
            Some(token) => tokio::select! {
                _ = token.cancelled() => {
                    debug!("Request cancelled by caller");
                    return Err(ApiError::Cancelled);
                }
                result = exchange => result,
            },
            None => exchange.await,
        };

        let response = response.map_err(|e| {
            warn!(error = %e, "Request did not complete");
            e
        })?;

        debug!(status = response.status, "Response received");
        decode(response)
    }

    fn build(&self, request: &ApiRequest, access_token: Option<&str>) -> Result<HttpRequest> {
        let mut http_request = HttpRequest::new(request.method, self.url_for(&request.endpoint));

        for (key, value) in &request.headers {
            http_request = http_request.header(key.clone(), value.clone());
        }

        http_request = match &request.body {
            RequestBody::None => http_request,
            RequestBody::Json(value) => http_request
                .json(value)
                .map_err(|e| ApiError::InvalidRequest(e.to_string()))?,
            // Boundary is generated by the transport; never set Content-Type here.
            RequestBody::Multipart(form) => http_request.multipart(form.clone()),
        };

        http_request.remove_header(AUTHORIZATION);
        if let Some(token) = access_token {
            http_request = http_request.bearer_token(token);
        }

        let deadline = request.timeout.unwrap_or(self.default_timeout);
        Ok(http_request.timeout(deadline))
    }
}

/// Turn a response into the caller's type or an error.
fn decode<T: DeserializeOwned>(response: HttpResponse) -> Result<T> {
    let status = response.status;

    if !response.is_success() {
        let message = error_message(&response.body);
        debug!(status, message = %message, "Request failed");
        return Err(ApiError::from_status(status, message));
    }

    let body: &[u8] = if response.body.iter().all(u8::is_ascii_whitespace) {
        b"null"
    } else {
        &response.body
    };

    serde_json::from_slice(body).map_err(|e| {
        warn!(status, error = %e, "Response body did not match the expected shape");
        ApiError::InvalidResponse {
            status,
            reason: e.to_string(),
        }
    })
}

/// Extract `message` from a failure body.
///
/// Accepts a string or a list of strings (validation errors); anything else
/// yields the generic fallback.
fn error_message(body: &[u8]) -> String {
    let message = serde_json::from_slice::<Value>(body)
        .ok()
        .and_then(|value| match value.get("message") {
            Some(Value::String(message)) if !message.is_empty() => Some(message.clone()),
            Some(Value::Array(items)) => {
                let parts: Vec<&str> = items.iter().filter_map(Value::as_str).collect();
                (!parts.is_empty()).then(|| parts.join(", "))
            }
            _ => None,
        });

    message.unwrap_or_else(|| UNKNOWN_ERROR_MESSAGE.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_desktop::MemorySecureStore;
    use bridge_traits::error::{BridgeError, Result as BridgeResult};
    use bridge_traits::http::{HttpBody, HttpMethod, MultipartForm, CONTENT_TYPE};
    use core_auth::CredentialPair;
    use mockall::mock;
    use serde::Deserialize;
    use serde_json::json;
    use tokio_util::sync::CancellationToken;

    mock! {
        HttpClient {}

        #[async_trait]
        impl HttpClient for HttpClient {
            async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse>;
        }
    }

    struct Stalled;

    #[async_trait]
    impl HttpClient for Stalled {
        async fn execute(&self, _request: HttpRequest) -> BridgeResult<HttpResponse> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(HttpResponse::new(200, "{}"))
        }
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Order {
        id: u32,
    }

    async fn executor(http_client: Arc<dyn HttpClient>, token: Option<&str>) -> RequestExecutor {
        let credentials = Arc::new(CredentialStore::new(
            Arc::new(MemorySecureStore::new()),
            "test.session",
        ));
        if let Some(token) = token {
            credentials
                .set(CredentialPair::new(token, "r-1"))
                .await
                .unwrap();
        }
        RequestExecutor::new(
            http_client,
            credentials,
            "http://backend.test/api/",
            Duration::from_secs(30),
        )
    }

    #[tokio::test]
    async fn test_json_call_sets_headers() {
        let mut mock = MockHttpClient::new();
        mock.expect_execute().times(1).returning(|req| {
            assert_eq!(req.method, HttpMethod::Post);
            assert_eq!(req.url, "http://backend.test/api/orders");
            assert_eq!(req.header_value("Authorization"), Some("Bearer a-1"));
            assert_eq!(req.header_value(CONTENT_TYPE), Some("application/json"));
            assert_eq!(req.header_value("X-Store"), Some("centro"));
            assert_eq!(req.timeout, Some(Duration::from_secs(30)));
            assert!(matches!(req.body, HttpBody::Json(_)));
            Ok(HttpResponse::new(201, r#"{"id":12}"#))
        });

        let executor = executor(Arc::new(mock), Some("a-1")).await;
        let request = ApiRequest::post("/orders")
            .json(&json!({ "clientId": 3 }))
            .unwrap()
            .header("X-Store", "centro");

        let order: Order = executor.call(&request).await.unwrap();
        assert_eq!(order, Order { id: 12 });
    }

    #[tokio::test]
    async fn test_no_credential_means_no_authorization_header() {
        let mut mock = MockHttpClient::new();
        mock.expect_execute().times(1).returning(|req| {
            assert!(req.header_value("Authorization").is_none());
            assert!(req.header_value("Content-Type").is_none());
            Ok(HttpResponse::new(200, "[]"))
        });

        let executor = executor(Arc::new(mock), None).await;
        let items: Vec<Order> = executor.call(&ApiRequest::get("/orders")).await.unwrap();
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn test_unauthenticated_request_ignores_stored_credential() {
        let mut mock = MockHttpClient::new();
        mock.expect_execute().times(1).returning(|req| {
            assert!(req.header_value("Authorization").is_none());
            Ok(HttpResponse::new(200, "{}"))
        });

        let executor = executor(Arc::new(mock), Some("a-1")).await;
        let _: Value = executor
            .call(&ApiRequest::post("/auth/login").unauthenticated())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_multipart_never_sets_content_type() {
        let mut mock = MockHttpClient::new();
        mock.expect_execute().times(1).returning(|req| {
            assert!(req.header_value("Content-Type").is_none());
            assert!(req.body.is_multipart());
            assert_eq!(req.header_value("Authorization"), Some("Bearer a-1"));
            Ok(HttpResponse::new(200, r#"{"id":5}"#))
        });

        let executor = executor(Arc::new(mock), Some("a-1")).await;
        let form = MultipartForm::new().file("image", "foto.png", None, vec![1u8, 2, 3]);
        let request = ApiRequest::post("/products/5/image")
            .header("Content-Type", "multipart/form-data")
            .multipart(form);

        let order: Order = executor.call(&request).await.unwrap();
        assert_eq!(order.id, 5);
    }

    #[tokio::test]
    async fn test_error_message_is_extracted() {
        let mut mock = MockHttpClient::new();
        mock.expect_execute()
            .returning(|_| Ok(HttpResponse::new(404, r#"{"message":"Pedido não encontrado"}"#)));

        let executor = executor(Arc::new(mock), Some("a-1")).await;
        let err = executor
            .call::<Order>(&ApiRequest::get("/orders/9"))
            .await
            .unwrap_err();

        assert_eq!(
            err,
            ApiError::Http {
                status: 404,
                message: "Pedido não encontrado".to_string()
            }
        );
    }

    #[test]
    fn test_error_message_fallbacks() {
        assert_eq!(error_message(b"<html>502</html>"), UNKNOWN_ERROR_MESSAGE);
        assert_eq!(error_message(b""), UNKNOWN_ERROR_MESSAGE);
        assert_eq!(error_message(br#"{"error":"x"}"#), UNKNOWN_ERROR_MESSAGE);
        assert_eq!(error_message(br#"{"message":""}"#), UNKNOWN_ERROR_MESSAGE);
        assert_eq!(
            error_message(r#"{"message":["nome é obrigatório","preço inválido"]}"#.as_bytes()),
            "nome é obrigatório, preço inválido"
        );
    }

    #[tokio::test]
    async fn test_conflict_status_maps_to_conflict() {
        let mut mock = MockHttpClient::new();
        mock.expect_execute()
            .returning(|_| Ok(HttpResponse::new(409, r#"{"message":"Tarefa alterada"}"#)));

        let executor = executor(Arc::new(mock), Some("a-1")).await;
        let err = executor
            .call::<Value>(&ApiRequest::patch("/tasks/1/complete"))
            .await
            .unwrap_err();

        assert_eq!(
            err,
            ApiError::Conflict {
                message: "Tarefa alterada".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_empty_success_body_decodes_as_null() {
        let mut mock = MockHttpClient::new();
        mock.expect_execute()
            .returning(|_| Ok(HttpResponse::new(204, Vec::<u8>::new())));

        let executor = executor(Arc::new(mock), Some("a-1")).await;
        executor
            .call::<()>(&ApiRequest::delete("/clients/4"))
            .await
            .unwrap();
        let nothing: Option<Order> = executor
            .call(&ApiRequest::delete("/clients/4"))
            .await
            .unwrap();
        assert!(nothing.is_none());
    }

    #[tokio::test]
    async fn test_unexpected_success_body_is_invalid_response() {
        let mut mock = MockHttpClient::new();
        mock.expect_execute()
            .returning(|_| Ok(HttpResponse::new(200, r#"{"name":"x"}"#)));

        let executor = executor(Arc::new(mock), Some("a-1")).await;
        let err = executor
            .call::<Order>(&ApiRequest::get("/orders/1"))
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::InvalidResponse { status: 200, .. }));
    }

    #[tokio::test]
    async fn test_transport_failure_is_network_error() {
        let mut mock = MockHttpClient::new();
        mock.expect_execute()
            .returning(|_| Err(BridgeError::Network("connection refused".to_string())));

        let executor = executor(Arc::new(mock), Some("a-1")).await;
        let err = executor
            .call::<Value>(&ApiRequest::get("/orders"))
            .await
            .unwrap_err();

        assert!(err.is_transient());
        assert_eq!(err.status(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_elapses() {
        let executor = executor(Arc::new(Stalled), Some("a-1")).await;
        let request = ApiRequest::get("/orders").timeout(Duration::from_secs(2));

        let err = executor.call::<Value>(&request).await.unwrap_err();
        assert_eq!(err, ApiError::Timeout);
    }

    #[tokio::test]
    async fn test_cancellation_aborts_exchange() {
        let executor = executor(Arc::new(Stalled), Some("a-1")).await;
        let token = CancellationToken::new();
        let request = ApiRequest::get("/orders").cancel_token(token.clone());

        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            token.cancel();
        });

        let err = executor.call::<Value>(&request).await.unwrap_err();
        assert_eq!(err, ApiError::Cancelled);
        canceller.await.unwrap();
    }

    #[tokio::test]
    async fn test_already_cancelled_request_is_not_sent() {
        let mut mock = MockHttpClient::new();
        mock.expect_execute().times(0);

        let executor = executor(Arc::new(mock), Some("a-1")).await;
        let token = CancellationToken::new();
        token.cancel();

        let err = executor
            .call::<Value>(&ApiRequest::get("/orders").cancel_token(token))
            .await
            .unwrap_err();
        assert_eq!(err, ApiError::Cancelled);
    }
}
