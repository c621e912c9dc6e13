//! `POST /statements/transaction`: wraps a normal bulk create with a
//! `Transaction`-typed statement describing who made it, when, how many
//! statements it contains, and which ones they are.

use std::collections::HashMap;

use axum::extract::Extension;
use axum::headers::authorization::Basic;
use axum::headers::Authorization;
use axum::response::IntoResponse;
use axum::{Json, TypedHeader};
use chrono::Utc;
use hyper::StatusCode;
use uuid::Uuid;

use crate::context::AppContext;
use crate::controllers::statements::{self, CreateRow, StatementView};
use crate::error::AppError;
use crate::identity::Registry;
use crate::models::statement::{FullStatement, StatementRef, Triple};
use crate::models::value::Value;
use crate::repo::statements as statements_repo;

const BOOTSTRAP_NAMES: [&str; 6] = [
    "createdAt",
    "createdBy",
    "statementCount",
    "transactionContains",
    "Resource",
    "Transaction",
];

pub async fn submit(
    Extension(ctx): Extension<AppContext>,
    TypedHeader(Authorization(basic)): TypedHeader<Authorization<Basic>>,
    Json(rows): Json<Vec<CreateRow>>,
) -> Result<impl IntoResponse, AppError> {
    let content = statements::rows_to_statements(&rows)?;

    let mut txn = ctx.begin().await.map_err(AppError::from)?;

    let type_predicate = statements_repo::find_type_handle(&mut txn).await?;
    let predicates = statements_repo::find_predicates_by_name(&mut txn, &BOOTSTRAP_NAMES).await?;
    let predicate = |name: &str| -> Result<Uuid, AppError> {
        predicates.get(name).copied().ok_or_else(|| {
            AppError::QueryShape(format!(
                "bootstrap predicate `{}` has not been seeded",
                name
            ))
        })
    };

    let transaction = Uuid::new_v4();
    let triple = |predicate: Uuid, object: Value| {
        FullStatement::unsaved(
            Uuid::new_v4(),
            Some(Triple {
                subject: StatementRef::new(transaction),
                predicate: StatementRef::new(predicate),
                object,
            }),
        )
    };

    let mut wrapper = vec![
        FullStatement::unsaved(
            transaction,
            Some(Triple {
                subject: StatementRef::new(transaction),
                predicate: StatementRef::new(type_predicate),
                object: Value::Statement(predicate("Resource")?),
            }),
        ),
        triple(type_predicate, Value::Statement(predicate("Transaction")?)),
        triple(predicate("createdAt")?, Value::Datetime(Utc::now())),
        triple(
            predicate("createdBy")?,
            Value::String(basic.username().to_owned()),
        ),
        triple(
            predicate("statementCount")?,
            Value::Integer(content.len() as i64),
        ),
    ];

    let contains = predicate("transactionContains")?;
    for statement in &content {
        wrapper.push(triple(contains, Value::Statement(statement.handle)));
    }

    let mut batch = content.clone();
    batch.extend(wrapper);

    let mut registry = Registry::new();
    let saved = statements_repo::create_statements(&mut txn, &mut registry, batch).await?;
    txn.commit().await.map_err(AppError::from)?;

    let saved_by_handle: HashMap<Uuid, _> = saved.into_iter().map(|s| (s.handle, s)).collect();

    let views: Vec<StatementView> = content
        .iter()
        .filter_map(|s| saved_by_handle.get(&s.handle).map(statements::view))
        .collect();

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "statements": views })),
    ))
}
