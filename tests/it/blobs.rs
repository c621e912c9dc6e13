use hyper::StatusCode;
use serde_json::json;

use quadstore::models::blob::BlobHandle;

use crate::support::test_context;

#[tokio::test]
async fn register_fetch_and_list_a_blob() {
    let ctx = test_context!();
    let digest = BlobHandle::digest(b"blob contents").to_hex();

    let create = ctx.post("/blobs/new", &json!({ "digest": digest })).await;
    assert_eq!(create.status(), StatusCode::CREATED);

    let show = ctx.get(&format!("/blobs/{}", digest)).await;
    assert_eq!(show.status(), StatusCode::OK);

    let index = ctx.get("/blobs").await;
    assert_eq!(index.status(), StatusCode::OK);
}

#[tokio::test]
async fn fetching_an_unregistered_digest_is_not_found() {
    let ctx = test_context!();
    let digest = BlobHandle::digest(b"never registered").to_hex();

    let response = ctx.get(&format!("/blobs/{}", digest)).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn an_invalid_digest_is_a_bad_request() {
    let ctx = test_context!();

    let response = ctx.get("/blobs/not-a-hex-digest").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
