use hyper::StatusCode;
use serde_json::json;

use crate::support::test_context;

#[tokio::test]
async fn create_fetch_list_and_delete_a_volume() {
    let ctx = test_context!();

    let create = ctx.put("/volumes/my-volume", &json!({})).await;
    assert_eq!(create.status(), StatusCode::CREATED);

    let show = ctx.get("/volumes/my-volume").await;
    assert_eq!(show.status(), StatusCode::OK);

    let index = ctx.get("/volumes").await;
    assert_eq!(index.status(), StatusCode::OK);

    let delete = ctx.delete("/volumes/my-volume").await;
    assert_eq!(delete.status(), StatusCode::NO_CONTENT);

    let show = ctx.get("/volumes/my-volume").await;
    assert_eq!(show.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn fetching_an_unknown_volume_is_not_found() {
    let ctx = test_context!();

    let response = ctx.get("/volumes/does-not-exist").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
