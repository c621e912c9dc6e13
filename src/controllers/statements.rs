//! Bulk create, single fetch, and query entry points for statements.

use std::collections::HashMap;

use axum::extract::{Extension, Path};
use axum::response::IntoResponse;
use axum::Json;
use hyper::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::context::AppContext;
use crate::error::AppError;
use crate::identity::Registry;
use crate::models::statement::{FullStatement, StatementRef, Triple};
use crate::models::value::{self, Value};
use crate::query::ast::Target;
use crate::query::{compile, executor};
use crate::repo::statements;

/// The wire shape of one statement: its own handle plus its triple, each
/// member wire-encoded (`"s:<uuid>"`, `"str:..."`, ...). `triple` is `None`
/// for a handle that's been referenced but never given a triple.
#[derive(Debug, Serialize)]
pub struct StatementView {
    pub handle: String,
    pub triple: Option<[String; 3]>,
}

pub fn view(statement: &FullStatement) -> StatementView {
    let triple = statement.triple.as_ref().map(|t| {
        [
            value::serialize(&Value::Statement(t.subject.handle)),
            value::serialize(&Value::Statement(t.predicate.handle)),
            value::serialize(&t.object),
        ]
    });

    StatementView {
        handle: value::serialize(&Value::Statement(statement.handle)),
        triple,
    }
}

pub async fn index(Extension(ctx): Extension<AppContext>) -> Result<impl IntoResponse, AppError> {
    let mut txn = ctx.begin().await.map_err(AppError::from)?;
    let all = statements::get_all_statements(&mut txn).await?;
    txn.commit().await.map_err(AppError::from)?;

    let views: Vec<StatementView> = all.iter().map(view).collect();
    Ok(Json(serde_json::json!({ "statements": views })))
}

pub async fn show(
    Extension(ctx): Extension<AppContext>,
    Path(reference): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let handle = parse_handle(&reference)?;

    let mut txn = ctx.begin().await.map_err(AppError::from)?;
    let neighborhood = statements::get_neighborhood(&mut txn, handle).await?;
    txn.commit().await.map_err(AppError::from)?;

    let subject = neighborhood
        .iter()
        .find(|s| s.handle == handle)
        .cloned()
        .ok_or(AppError::NotFound)?;

    let views: HashMap<String, StatementView> = neighborhood
        .iter()
        .map(|s| (value::serialize(&Value::Statement(s.handle)), view(s)))
        .collect();

    Ok(Json(serde_json::json!({
        "reference": value::serialize(&Value::Statement(subject.handle)),
        "statements": views,
    })))
}

fn parse_handle(reference: &str) -> Result<Uuid, AppError> {
    match value::deserialize(reference)? {
        Value::Statement(handle) => Ok(handle),
        _ => Err(AppError::QueryShape(format!(
            "`{}` is not a statement reference",
            reference
        ))),
    }
}

/// A single row of a bulk-create request: `[handle, subject, predicate,
/// object]`. `handle` is `null` for a fresh statement, or a wire-encoded
/// `"s:<uuid>"` to reuse/overwrite an existing one. Each of
/// `subject`/`predicate`/`object` is either a JSON integer -- the index of
/// an *earlier or the same* row in this batch, resolved to that row's
/// handle -- or a wire-encoded value. Forward references (an index past the
/// row's own position) are rejected, since a row's handle isn't known to
/// later rows until it's been assigned.
#[derive(Debug, Deserialize)]
pub struct CreateRow(JsonValue, JsonValue, JsonValue, JsonValue);

/// Turns wire rows into `FullStatement`s, ready for `repo::statements::
/// create_statements`. Shared by the plain bulk-create endpoint and the
/// transaction-wrapping one.
pub fn rows_to_statements(rows: &[CreateRow]) -> Result<Vec<FullStatement>, AppError> {
    let mut handles: Vec<Uuid> = Vec::with_capacity(rows.len());
    let mut batch = Vec::with_capacity(rows.len());

    for (idx, row) in rows.iter().enumerate() {
        let handle = match &row.0 {
            JsonValue::Null => Uuid::new_v4(),
            JsonValue::String(s) => match value::deserialize(s)? {
                Value::Statement(handle) => handle,
                _ => {
                    return Err(AppError::QueryShape(format!(
                        "`{}` is not a statement reference",
                        s
                    )))
                }
            },
            other => {
                return Err(AppError::QueryShape(format!(
                    "invalid statement handle `{}`",
                    other
                )))
            }
        };
        handles.push(handle);

        let subject = resolve_ref(&handles, idx, &row.1)?;
        let predicate = resolve_ref(&handles, idx, &row.2)?;
        let object = resolve_object_ref(&handles, idx, &row.3)?;

        batch.push(FullStatement::unsaved(
            handle,
            Some(Triple {
                subject: StatementRef::new(subject),
                predicate: StatementRef::new(predicate),
                object,
            }),
        ));
    }

    Ok(batch)
}

/// Resolves a subject/predicate reference cell: a non-negative integer no
/// greater than `idx` indexes into this batch's handles so far, a string is
/// a wire-encoded statement reference.
fn resolve_ref(handles: &[Uuid], idx: usize, cell: &JsonValue) -> Result<Uuid, AppError> {
    if let Some(index) = cell.as_u64() {
        return resolve_index(handles, idx, index);
    }

    match cell.as_str() {
        Some(s) => match value::deserialize(s)? {
            Value::Statement(handle) => Ok(handle),
            _ => Err(AppError::QueryShape(format!(
                "`{}` is not a statement reference",
                s
            ))),
        },
        None => Err(AppError::QueryShape(
            "expected a statement reference or row index".into(),
        )),
    }
}

/// Resolves an object reference cell: an index (as above) produces
/// `Value::Statement`, a string is any wire-encoded value.
fn resolve_object_ref(handles: &[Uuid], idx: usize, cell: &JsonValue) -> Result<Value, AppError> {
    if let Some(index) = cell.as_u64() {
        return resolve_index(handles, idx, index).map(Value::Statement);
    }

    match cell.as_str() {
        Some(s) => Ok(value::deserialize(s)?),
        None => Err(AppError::QueryShape(
            "expected a wire-encoded value or row index".into(),
        )),
    }
}

fn resolve_index(handles: &[Uuid], idx: usize, index: u64) -> Result<Uuid, AppError> {
    if index as usize > idx {
        return Err(AppError::QueryShape(format!(
            "row index `{}` is a forward reference, which is not allowed",
            index
        )));
    }
    handles
        .get(index as usize)
        .copied()
        .ok_or_else(|| AppError::QueryShape(format!("row index `{}` out of range", index)))
}

pub async fn create(
    Extension(ctx): Extension<AppContext>,
    Json(rows): Json<Vec<CreateRow>>,
) -> Result<impl IntoResponse, AppError> {
    let batch = rows_to_statements(&rows)?;
    let mut registry = Registry::new();

    let mut txn = ctx.begin().await.map_err(AppError::from)?;
    let saved = statements::create_statements(&mut txn, &mut registry, batch).await?;
    txn.commit().await.map_err(AppError::from)?;

    let views: Vec<StatementView> = saved.iter().map(view).collect();
    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "statements": views })),
    ))
}

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    #[serde(default = "default_target")]
    pub target: String,
    pub query: JsonValue,
    #[serde(default)]
    pub after: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_target() -> String {
    "statement".to_owned()
}

fn default_limit() -> i64 {
    crate::controllers::query::DEFAULT_LIMIT
}

pub async fn query(
    Extension(ctx): Extension<AppContext>,
    Json(body): Json<QueryRequest>,
) -> Result<impl IntoResponse, AppError> {
    let target = Target::parse(&body.target)
        .ok_or_else(|| AppError::QueryShape(format!("unknown query target `{}`", body.target)))?;
    let plan = compile::compile(&body.query)?;
    let after = body.after.as_deref().map(value::deserialize).transpose()?;

    let mut txn = ctx.begin().await.map_err(AppError::from)?;
    let result = executor::execute(&mut txn, &plan, target, after, body.limit).await?;
    txn.commit().await.map_err(AppError::from)?;

    Ok(Json(crate::controllers::query::response_json(&result)))
}
