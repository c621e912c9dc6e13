use chrono::Utc;
use hyper::StatusCode;
use serde_json::{json, Map, Value as JsonValue};

use quadstore::models::blob::BlobHandle;

use crate::support::redactor::Redactor;
use crate::support::test_context;

async fn body_json(mut response: axum::response::Response) -> JsonValue {
    Redactor::default()
        .response_json(&mut response)
        .await
        .expect("response body to parse as json")
}

fn encode_path(path: &str) -> String {
    base64::encode_config(path, base64::URL_SAFE_NO_PAD)
}

#[tokio::test]
async fn upsert_and_delete_in_one_mutation() {
    let ctx = test_context!();
    let create = ctx.put("/volumes/files-volume", &json!({})).await;
    assert_eq!(create.status(), StatusCode::CREATED);

    let digest = BlobHandle::digest(b"hello world").to_hex();
    let now = Utc::now();

    let mut body = Map::new();
    body.insert(
        encode_path("a/b"),
        json!({
            "digest": digest,
            "size": 11,
            "mtime": now,
            "lastverify": now,
        }),
    );
    body.insert(encode_path("a/c"), JsonValue::Null);

    let response = ctx
        .post("/volumes/files-volume/files", &JsonValue::Object(body))
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = ctx.get("/volumes/files-volume/files").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;

    let results = body["results"].as_array().expect("a results array");
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["path"], encode_path("a/b"));
    assert_eq!(results[0]["digest"], digest);
}

#[tokio::test]
async fn show_fetches_a_single_file_by_its_encoded_path() {
    let ctx = test_context!();
    ctx.put("/volumes/files-volume-2", &json!({})).await;

    let digest = BlobHandle::digest(b"contents").to_hex();
    let now = Utc::now();
    let path = encode_path("only/file");

    let mut body = Map::new();
    body.insert(
        path.clone(),
        json!({
            "digest": digest,
            "size": 8,
            "mtime": now,
            "lastverify": now,
        }),
    );
    let response = ctx
        .post("/volumes/files-volume-2/files", &JsonValue::Object(body))
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = ctx
        .get(&format!("/volumes/files-volume-2/files/{}", path))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["digest"], digest);
}
