use std::net::TcpListener;

use axum::body::Body;
use axum::http::{header, Request};
use axum::response::Response;
use axum::Router;
use serde::Serialize;
use sqlx::PgPool;
use tower::util::ServiceExt;

use quadstore::context::AppContext;
use quadstore::startup;

use crate::support::test_database;

/// Creates a `TestContext` with the appropriate test name prefilled.
macro_rules! test_context {
    () => {
        crate::support::context::TestContext::new(
            crate::support::test_introspection::function_name!(),
        )
        .await
    };
}

pub(crate) use test_context;

pub struct TestContext {
    pub test_name: &'static str,
    pub db: PgPool,
    pub app: Router,
    pub auth: Option<String>,
}

impl TestContext {
    pub async fn new(test_name: &'static str) -> Self {
        let db = test_database::test_db_pool(test_name)
            .await
            .expect("Failed to acquire a database connection");
        let app_context = AppContext::new(db.clone());
        let app = startup::app(app_context);

        Self {
            test_name,
            db,
            app,
            // Every route but `/health_check` is gated on the mere presence
            // of a well-formed Basic header; authenticate by default so a
            // test only has to opt out (`logout`) to exercise the gate
            // itself.
            auth: Some("tester".to_owned()),
        }
    }

    pub fn logout(&mut self) {
        self.auth = None;
    }

    fn auth_header(&self) -> Option<String> {
        self.auth
            .as_ref()
            .map(|username| format!("Basic {}", base64::encode(format!("{}:", username))))
    }

    pub async fn get(&self, path: &str) -> Response {
        let mut builder = Request::builder()
            .method(axum::http::Method::GET)
            .uri(path);
        if let Some(auth) = self.auth_header() {
            builder = builder.header(header::AUTHORIZATION, auth);
        }
        let req = builder.body(Body::empty()).expect("to build GET request");

        self.app
            .clone()
            .oneshot(req)
            .await
            .expect("axum to always respond")
    }

    pub async fn post<P>(&self, path: &str, payload: &P) -> Response
    where
        P: Serialize + ?Sized,
    {
        self.body_request(axum::http::Method::POST, path, payload).await
    }

    pub async fn put<P>(&self, path: &str, payload: &P) -> Response
    where
        P: Serialize + ?Sized,
    {
        self.body_request(axum::http::Method::PUT, path, payload).await
    }

    async fn body_request<P>(&self, method: axum::http::Method, path: &str, payload: &P) -> Response
    where
        P: Serialize + ?Sized,
    {
        let mut builder = Request::builder()
            .method(method)
            .uri(path)
            .header(header::CONTENT_TYPE, mime::APPLICATION_JSON.as_ref());
        if let Some(auth) = self.auth_header() {
            builder = builder.header(header::AUTHORIZATION, auth);
        }
        let req = builder
            .body(Body::from(
                serde_json::to_vec(payload).expect("to serialize request body"),
            ))
            .expect("to build request");

        self.app
            .clone()
            .oneshot(req)
            .await
            .expect("axum to always respond")
    }

    pub async fn delete(&self, path: &str) -> Response {
        let mut builder = Request::builder()
            .method(axum::http::Method::DELETE)
            .uri(path);
        if let Some(auth) = self.auth_header() {
            builder = builder.header(header::AUTHORIZATION, auth);
        }
        let req = builder
            .body(Body::empty())
            .expect("to build DELETE request");

        self.app
            .clone()
            .oneshot(req)
            .await
            .expect("axum to always respond")
    }

    pub fn db(&self) -> &PgPool {
        &self.db
    }
}

/// Spawns a web server listening on localhost and returns its address. This
/// server is scheduled on the test-local executor and will be shut down when
/// the test exits.
///
/// If in doubt, use the `test_context!` macro above to drive the router
/// in-process. This is only necessary for tests which require a real http
/// server (the health check, since it has nothing else to assert against).
pub async fn spawn_app(db: PgPool) -> anyhow::Result<String> {
    // Binding to port 0 will automatically assign a free random port.
    let listener = TcpListener::bind("127.0.0.1:0").expect("No random port available");
    let addr = listener.local_addr()?.to_string();

    let ctx = AppContext::new(db);

    // Tokio runs an executor for each test, so this server will shut down at the end of the test.
    let server = startup::run(listener, ctx)?;
    let _ = tokio::spawn(server);

    Ok(addr)
}
