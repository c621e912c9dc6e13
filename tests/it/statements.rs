use hyper::StatusCode;
use serde_json::{json, Value as JsonValue};

use quadstore::models::value::{self, Value};

use crate::support::factory;
use crate::support::redactor::Redactor;
use crate::support::test_context;

async fn body_json(mut response: axum::response::Response) -> JsonValue {
    Redactor::default()
        .response_json(&mut response)
        .await
        .expect("response body to parse as json")
}

#[tokio::test]
async fn scalar_round_trip() {
    let ctx = test_context!();
    let bootstrap = factory::seed_bootstrap(ctx.db()).await;

    let predicate = value::serialize(&Value::Statement(bootstrap.name));
    let row = json!([null, 0, predicate, "str:hello"]);

    let response = ctx.post("/statements", &json!([row])).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    let handle = body["statements"][0]["handle"]
        .as_str()
        .expect("created statement has a handle")
        .to_owned();

    let response = ctx.get(&format!("/statements/{}", handle)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;

    assert_eq!(body["reference"], handle);
    assert_eq!(body["statements"][&handle]["triple"][2], "str:hello");
}

#[tokio::test]
async fn bulk_forward_reference() {
    let ctx = test_context!();

    let row = json!([null, 0, 0, "int:42"]);
    let response = ctx.post("/statements", &json!([row])).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = body_json(response).await;
    let view = &body["statements"][0];
    let handle = view["handle"].as_str().expect("a freshly assigned handle");

    assert_eq!(view["triple"][0], handle);
    assert_eq!(view["triple"][1], handle);
    assert_eq!(view["triple"][2], "int:42");
}

#[tokio::test]
async fn forward_reference_past_its_own_row_is_rejected() {
    let ctx = test_context!();

    // Row 0 points at row 1, which hasn't been assigned a handle yet.
    let rows = json!([
        [null, 1, 1, "none"],
        [null, 0, 0, "none"],
    ]);
    let response = ctx.post("/statements", &rows).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn index_lists_every_statement() {
    let ctx = test_context!();
    let bootstrap = factory::seed_bootstrap(ctx.db()).await;

    let response = ctx.get("/statements").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;

    let handles: Vec<&str> = body["statements"]
        .as_array()
        .expect("a list of statements")
        .iter()
        .map(|s| s["handle"].as_str().expect("each entry has a handle"))
        .collect();

    assert!(handles.contains(&value::serialize(&Value::Statement(bootstrap.type_handle)).as_str()));
    assert!(handles.contains(&value::serialize(&Value::Statement(bootstrap.name)).as_str()));
}

#[tokio::test]
async fn unauthenticated_requests_are_rejected() {
    let mut ctx = test_context!();
    ctx.logout();

    let response = ctx.get("/statements").await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        response
            .headers()
            .get(hyper::header::WWW_AUTHENTICATE)
            .expect("a WWW-Authenticate header"),
        "Basic"
    );
}
