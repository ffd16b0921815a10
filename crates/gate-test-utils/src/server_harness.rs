//! Mock key endpoint for HTTP key source tests.

use serde_json::Value;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Well-known path user pools publish their key set under.
pub const JWKS_PATH: &str = "/.well-known/jwks.json";

/// A wiremock server answering `GET /.well-known/jwks.json`.
pub struct JwksServer {
    mock_server: MockServer,
}

impl JwksServer {
    /// Start a server with no response mounted (requests get 404).
    pub async fn start() -> Self {
        Self {
            mock_server: MockServer::start().await,
        }
    }

    /// Start a server publishing `jwks`.
    pub async fn serving(jwks: &Value) -> Self {
        let server = Self::start().await;
        server.serve(jwks).await;
        server
    }

    /// Start a server answering every request with `status`.
    pub async fn failing(status: u16) -> Self {
        let server = Self::start().await;
        server.fail_with(status).await;
        server
    }

    /// Replace the response with `jwks`.
    pub async fn serve(&self, jwks: &Value) {
        self.respond_with(ResponseTemplate::new(200).set_body_json(jwks))
            .await;
    }

    /// Replace the response with an error status.
    pub async fn fail_with(&self, status: u16) {
        self.respond_with(ResponseTemplate::new(status)).await;
    }

    /// Replace the response with a raw body.
    pub async fn serve_raw(&self, body: &str) {
        self.respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("content-type", "application/json"),
        )
        .await;
    }

    async fn respond_with(&self, template: ResponseTemplate) {
        self.mock_server.reset().await;
        Mock::given(method("GET"))
            .and(path(JWKS_PATH))
            .respond_with(template)
            .mount(&self.mock_server)
            .await;
    }

    pub fn jwks_url(&self) -> String {
        format!("{}{}", self.mock_server.uri(), JWKS_PATH)
    }

    /// Number of requests the endpoint has received.
    pub async fn request_count(&self) -> usize {
        self.mock_server
            .received_requests()
            .await
            .map(|requests| requests.len())
            .unwrap_or_default()
    }
}
