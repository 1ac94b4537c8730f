use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use upload_presign_server::config::PresignConfig;
use upload_presign_server::router::build_presign_router;
use upload_presign_server::signer::UploadSigner;
use upload_presign_server::state::PresignServerState;

pub struct TestClient {
    client: reqwest::Client,
    addr: SocketAddr,
}

impl TestClient {
    pub async fn new(config: PresignConfig, signer: Arc<dyn UploadSigner>) -> Self {
        let state = PresignServerState::new(config, signer);

        let svc = build_presign_router(Arc::new(state));
        let app = svc.layer(TraceLayer::new_for_http());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Could not bind ephemeral socket");
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("server error");
        });

        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .unwrap();

        TestClient { client, addr }
    }

    pub fn request(&self, method: reqwest::Method, url: &str) -> RequestBuilder {
        RequestBuilder {
            builder: self
                .client
                .request(method, format!("http://{}{}", self.addr, url)),
        }
    }

    pub fn post(&self, url: &str) -> RequestBuilder {
        self.request(reqwest::Method::POST, url)
    }
}

pub struct RequestBuilder {
    builder: reqwest::RequestBuilder,
}

impl RequestBuilder {
    pub async fn send(self) -> TestResponse {
        TestResponse {
            response: self.builder.send().await.unwrap(),
        }
    }

    pub fn body(mut self, body: impl Into<reqwest::Body>) -> Self {
        self.builder = self.builder.body(body);
        self
    }

    pub fn json<T>(mut self, json: &T) -> Self
    where
        T: serde::Serialize,
    {
        self.builder = self.builder.json(json);
        self
    }

    pub fn header(mut self, key: impl AsRef<str>, value: &str) -> Self {
        self.builder = self
            .builder
            .header(key.as_ref().to_string(), value.to_string());
        self
    }
}

/// A wrapper around [`reqwest::Response`] that provides common methods with internal `unwrap()`s.
#[derive(Debug)]
pub struct TestResponse {
    response: reqwest::Response,
}

impl TestResponse {
    pub fn assert_status_ok(&self) {
        assert_eq!(self.status(), reqwest::StatusCode::OK);
    }

    pub fn assert_status_bad_request(&self) {
        assert_eq!(self.status(), reqwest::StatusCode::BAD_REQUEST);
    }

    pub fn assert_status_method_not_allowed(&self) {
        assert_eq!(self.status(), reqwest::StatusCode::METHOD_NOT_ALLOWED);
    }

    pub fn assert_status_internal_server_error(&self) {
        assert_eq!(self.status(), reqwest::StatusCode::INTERNAL_SERVER_ERROR);
    }

    pub fn assert_header_content_type_json(&self) {
        assert_eq!(
            self.response
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .unwrap(),
            "application/json; charset=utf-8"
        );
    }

    pub async fn text(self) -> String {
        self.response.text().await.unwrap()
    }

    pub async fn json<T>(self) -> T
    where
        T: serde::de::DeserializeOwned,
    {
        self.response.json().await.unwrap()
    }

    pub fn status(&self) -> reqwest::StatusCode {
        self.response.status()
    }

    pub fn headers(&self) -> &reqwest::header::HeaderMap {
        self.response.headers()
    }
}
