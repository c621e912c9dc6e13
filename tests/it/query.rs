use hyper::StatusCode;
use serde_json::{json, Map, Value as JsonValue};
use uuid::Uuid;

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

fn mo(predicate: Uuid) -> String {
    format!("mo:{}", value::serialize(&Value::Statement(predicate)))
}

fn fo(predicate: Uuid) -> String {
    format!("fo:{}", value::serialize(&Value::Statement(predicate)))
}

#[tokio::test]
async fn match_object_join_narrows_to_the_matching_entity() {
    let ctx = test_context!();
    let db = ctx.db();
    let bootstrap = factory::seed_bootstrap(db).await;
    let person = factory::new_class();

    let ada = Uuid::new_v4();
    let bob = Uuid::new_v4();
    factory::create_statement(db, ada, bootstrap.type_handle, Value::Statement(person)).await;
    factory::create_statement(db, ada, bootstrap.name, Value::String("Ada".to_owned())).await;
    factory::create_statement(db, bob, bootstrap.type_handle, Value::Statement(person)).await;
    factory::create_statement(db, bob, bootstrap.name, Value::String("Bob".to_owned())).await;

    let mut query = Map::new();
    query.insert(
        mo(bootstrap.type_handle),
        JsonValue::String(value::serialize(&Value::Statement(person))),
    );
    query.insert(mo(bootstrap.name), JsonValue::String("str:Ada".to_owned()));

    let body = json!({ "target": "statement", "query": JsonValue::Object(query) });
    let response = ctx.post("/statements/query", &body).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;

    let results = body["results"].as_array().expect("a results array");
    assert_eq!(results.len(), 1);
    assert_eq!(results[0], value::serialize(&Value::Statement(ada)));
}

#[tokio::test]
async fn fetch_descriptor_augments_the_statements_dict_without_narrowing_results() {
    let ctx = test_context!();
    let db = ctx.db();
    let bootstrap = factory::seed_bootstrap(db).await;
    let person = factory::new_class();
    let email_predicate = Uuid::new_v4();

    let ada = Uuid::new_v4();
    factory::create_statement(db, ada, bootstrap.type_handle, Value::Statement(person)).await;
    let email = factory::create_statement(
        db,
        ada,
        email_predicate,
        Value::String("ada@example.test".to_owned()),
    )
    .await;

    let mut query = Map::new();
    query.insert(
        mo(bootstrap.type_handle),
        JsonValue::String(value::serialize(&Value::Statement(person))),
    );
    query.insert(fo(email_predicate), JsonValue::Object(Map::new()));

    let body = json!({ "target": "statement", "query": JsonValue::Object(query) });
    let response = ctx.post("/statements/query", &body).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;

    let results = body["results"].as_array().expect("a results array");
    assert_eq!(results.len(), 1);
    assert_eq!(results[0], value::serialize(&Value::Statement(ada)));

    let email_handle = value::serialize(&Value::Statement(email.handle));
    assert_eq!(
        body["statements"][&email_handle]["triple"][2],
        "str:ada@example.test"
    );
}

#[tokio::test]
async fn pagination_splits_results_across_pages_without_overlap() {
    let ctx = test_context!();
    let db = ctx.db();
    let bootstrap = factory::seed_bootstrap(db).await;
    let person = factory::new_class();

    let mut created = Vec::new();
    for _ in 0..3 {
        let subject = Uuid::new_v4();
        factory::create_statement(db, subject, bootstrap.type_handle, Value::Statement(person)).await;
        created.push(value::serialize(&Value::Statement(subject)));
    }

    let mut query = Map::new();
    query.insert(
        mo(bootstrap.type_handle),
        JsonValue::String(value::serialize(&Value::Statement(person))),
    );

    let body = json!({ "target": "statement", "query": JsonValue::Object(query.clone()), "limit": 2 });
    let response = ctx.post("/statements/query", &body).await;
    let page1 = body_json(response).await;
    let page1_results: Vec<String> = page1["results"]
        .as_array()
        .expect("a results array")
        .iter()
        .map(|v| v.as_str().expect("a wire-encoded handle").to_owned())
        .collect();
    assert_eq!(page1_results.len(), 2);
    assert_eq!(page1["more"], true);

    let after = page1_results.last().unwrap().clone();
    let body = json!({
        "target": "statement",
        "query": JsonValue::Object(query),
        "limit": 2,
        "after": after,
    });
    let response = ctx.post("/statements/query", &body).await;
    let page2 = body_json(response).await;
    let page2_results: Vec<String> = page2["results"]
        .as_array()
        .expect("a results array")
        .iter()
        .map(|v| v.as_str().expect("a wire-encoded handle").to_owned())
        .collect();
    assert_eq!(page2_results.len(), 1);
    assert_eq!(page2["more"], false);

    let mut all: Vec<String> = page1_results.into_iter().chain(page2_results).collect();
    all.sort();
    let mut expected = created;
    expected.sort();
    assert_eq!(all, expected);
}

#[tokio::test]
async fn query_string_endpoint_mirrors_the_json_body_endpoint() {
    let ctx = test_context!();
    let db = ctx.db();
    let bootstrap = factory::seed_bootstrap(db).await;
    let person = factory::new_class();

    let ada = Uuid::new_v4();
    factory::create_statement(db, ada, bootstrap.type_handle, Value::Statement(person)).await;

    let mut query = Map::new();
    query.insert(
        mo(bootstrap.type_handle),
        JsonValue::String(value::serialize(&Value::Statement(person))),
    );
    let body = json!({ "target": "statement", "query": JsonValue::Object(query) });
    let response = ctx.post("/statements/query", &body).await;
    let expected = body_json(response).await;

    // `:` has no special meaning in a query string, so the wire-encoded
    // predicate/object values can go straight into the `f_` parameter.
    let qs = format!(
        "f_mo:{predicate}={object}",
        predicate = value::serialize(&Value::Statement(bootstrap.type_handle)),
        object = value::serialize(&Value::Statement(person)),
    );
    let response = ctx.get(&format!("/query/statement?{}", qs)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let actual = body_json(response).await;

    assert_eq!(actual["results"], expected["results"]);
}
