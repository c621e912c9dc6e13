//! `GET /query/:target`: the query-string encoding of the same query a
//! client could otherwise POST as a JSON body to `/statements/query`.
//!
//! An entity's wire identity here is the dotted chain of join-descriptor
//! strings that reaches it from `main`, e.g. `j_mo:s:<a>=` then
//! `j_mo:s:<a>.mo:s:<b>=` to descend one level further. Each segment is
//! exactly the descriptor string `query::compile` would see as a nested
//! JSON object key -- this handler's only job is to rebuild that nested
//! object from the flat parameter list, then hand it to the same
//! `compile`/`executor` pipeline the JSON-body endpoint uses.

use std::collections::HashMap;

use axum::extract::{Extension, Path, Query};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::{Map, Value as JsonValue};

use crate::context::AppContext;
use crate::controllers::statements::{self, StatementView};
use crate::error::AppError;
use crate::models::value::{self, Value};
use crate::query::ast::Target;
use crate::query::{compile, executor};

pub const DEFAULT_LIMIT: i64 = 100;

pub async fn get(
    Extension(ctx): Extension<AppContext>,
    Path(target): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    let target_kind = Target::parse(&target)
        .ok_or_else(|| AppError::QueryShape(format!("unknown query target `{}`", target)))?;

    let mut root = Map::new();
    for (key, value) in &params {
        if let Some(path) = key.strip_prefix("j_").or_else(|| key.strip_prefix("c_")) {
            insert_join(&mut root, path)?;
        } else if let Some(path) = key.strip_prefix("f_") {
            insert_filter(&mut root, path, value)?;
        }
    }

    let plan = compile::compile(&JsonValue::Object(root))?;

    let after = params
        .get("after")
        .map(|s| value::deserialize(s))
        .transpose()?;
    let limit = match params.get("limit") {
        Some(s) => s
            .parse()
            .map_err(|_| AppError::QueryShape("`limit` must be an integer".into()))?,
        None => DEFAULT_LIMIT,
    };

    let mut txn = ctx.begin().await.map_err(AppError::from)?;
    let result = executor::execute(&mut txn, &plan, target_kind, after, limit).await?;
    txn.commit().await.map_err(AppError::from)?;

    Ok(Json(response_json(&result)))
}

/// Walks to the nested-object node at `path` (dot-separated descriptor
/// segments relative to `main`), creating intermediate objects as needed.
fn descend<'a>(root: &'a mut Map<String, JsonValue>, path: &str) -> &'a mut Map<String, JsonValue> {
    let mut node = root;
    if path.is_empty() {
        return node;
    }
    for segment in path.split('.') {
        let entry = node
            .entry(segment.to_owned())
            .or_insert_with(|| JsonValue::Object(Map::new()));
        if !entry.is_object() {
            *entry = JsonValue::Object(Map::new());
        }
        node = entry.as_object_mut().expect("just ensured object");
    }
    node
}

fn insert_join(root: &mut Map<String, JsonValue>, path: &str) -> Result<(), AppError> {
    if path.is_empty() {
        return Err(AppError::QueryShape(
            "`j_`/`c_` parameters require a descriptor path".into(),
        ));
    }
    descend(root, path);
    Ok(())
}

fn insert_filter(root: &mut Map<String, JsonValue>, path: &str, value: &str) -> Result<(), AppError> {
    let (parent, leaf) = path.rsplit_once('.').unwrap_or(("", path));
    if leaf.is_empty() {
        return Err(AppError::QueryShape(
            "`f_` parameters require an entity path".into(),
        ));
    }
    let node = descend(root, parent);
    node.insert(leaf.to_owned(), JsonValue::String(value.to_owned()));
    Ok(())
}

/// Shared response shape for both the JSON-body and query-string query
/// endpoints: every result wire-encoded, plus the full "additional
/// statements" neighborhood keyed by wire handle.
pub fn response_json(result: &executor::QueryResult) -> JsonValue {
    let results: Vec<String> = result
        .results
        .iter()
        .map(|r| match r {
            executor::ResultRef::Statement(handle) => value::serialize(&Value::Statement(*handle)),
            executor::ResultRef::Blob(handle) => value::serialize(&Value::Blob(*handle)),
        })
        .collect();

    let statement_views: HashMap<String, StatementView> = result
        .statements
        .iter()
        .map(|(handle, full)| (value::serialize(&Value::Statement(*handle)), statements::view(full)))
        .collect();

    serde_json::json!({
        "results": results,
        "more": result.more,
        "statements": statement_views,
    })
}
