use hyper::StatusCode;
use serde_json::{json, Map, Value as JsonValue};

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

fn mo(predicate: uuid::Uuid) -> String {
    format!("mo:{}", value::serialize(&Value::Statement(predicate)))
}

#[tokio::test]
async fn submit_wraps_content_in_a_transaction_statement() {
    let ctx = test_context!();
    let db = ctx.db();
    let bootstrap = factory::seed_bootstrap(db).await;

    let predicate = value::serialize(&Value::Statement(bootstrap.name));
    let rows = json!([[null, 0, predicate, "str:hello"]]);

    let response = ctx.post("/statements/transaction", &rows).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;

    // Only the content statement comes back, never the wrapper.
    let views = body["statements"].as_array().expect("submitted statements");
    assert_eq!(views.len(), 1);
    assert_eq!(views[0]["triple"][2], "str:hello");

    // The wrapper is visible through an ordinary query: exactly one
    // statement was authenticated as "tester" with a count of one.
    let mut query = Map::new();
    query.insert(
        mo(bootstrap.created_by),
        JsonValue::String("str:tester".to_owned()),
    );
    query.insert(mo(bootstrap.statement_count), JsonValue::String("int:1".to_owned()));
    let query_body = json!({ "target": "statement", "query": JsonValue::Object(query) });

    let response = ctx.post("/statements/query", &query_body).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let results = body["results"].as_array().expect("a results array");
    assert_eq!(results.len(), 1);
}

#[tokio::test]
async fn submit_records_one_transaction_contains_per_submitted_statement() {
    let ctx = test_context!();
    let db = ctx.db();
    let bootstrap = factory::seed_bootstrap(db).await;

    let name_predicate = value::serialize(&Value::Statement(bootstrap.name));
    let rows = json!([
        [null, 0, name_predicate, "str:first"],
        [null, 1, name_predicate, "str:second"],
    ]);

    let response = ctx.post("/statements/transaction", &rows).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    let views = body["statements"].as_array().expect("submitted statements");
    assert_eq!(views.len(), 2);

    let mut query = Map::new();
    query.insert(mo(bootstrap.statement_count), JsonValue::String("int:2".to_owned()));
    let query_body = json!({ "target": "statement", "query": JsonValue::Object(query) });
    let response = ctx.post("/statements/query", &query_body).await;
    let body = body_json(response).await;
    assert_eq!(body["results"].as_array().expect("a results array").len(), 1);
}
