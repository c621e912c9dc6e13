//! Persistence for statements: id resolution, bulk upsert, and read paths
//! that reassemble a full triple (with joined subject/predicate/object
//! rows) from storage.

use std::collections::HashMap;

use sqlx::postgres::PgRow;
use sqlx::{Postgres, Row, Transaction};
use uuid::Uuid;

use crate::error::AppError;
use crate::identity::Registry;
use crate::models::blob::BlobHandle;
use crate::models::id::RowId;
use crate::models::statement::{FullStatement, Statement, StatementRef, Triple};
use crate::models::value::{Value, ValueKind};

/// Resolves every statement handle currently known to `registry` to an
/// internal id. When `allow_create` is set, unknown handles get a stub row
/// (handle only, no triple) inserted so they gain a real id; otherwise they
/// are left with the sentinel id `RowId::unresolved()`, which is guaranteed
/// to match no row.
pub async fn fill_ids(
    db: &mut Transaction<'_, Postgres>,
    registry: &mut Registry,
    allow_create: bool,
) -> Result<(), AppError> {
    let handles: Vec<Uuid> = registry.statement_handles().copied().collect();
    if handles.is_empty() {
        return Ok(());
    }

    let rows = sqlx::query("SELECT id, handle FROM statement WHERE handle = ANY($1)")
        .bind(&handles)
        .fetch_all(&mut *db)
        .await?;

    let mut found: HashMap<Uuid, RowId<Statement>> = HashMap::new();
    for row in &rows {
        let id: i64 = row.try_get("id")?;
        let handle: Uuid = row.try_get("handle")?;
        found.insert(handle, RowId::new(id));
    }

    for handle in &handles {
        if let Some(id) = found.get(handle) {
            registry.set_statement_id(handle, *id);
            continue;
        }

        if allow_create {
            let row = sqlx::query("INSERT INTO statement (handle) VALUES ($1) RETURNING id")
                .bind(handle)
                .fetch_one(&mut *db)
                .await?;
            let id: i64 = row.try_get("id")?;
            registry.set_statement_id(handle, RowId::new(id));
        } else {
            registry.set_statement_id(handle, RowId::unresolved());
        }
    }

    Ok(())
}

/// Bulk-upserts every statement in `statements` whose triple is populated
/// and not already marked saved. Every row in the batch is padded with
/// every object column seen across the whole batch, set to `NULL` where it
/// doesn't apply, and the upsert's `ON CONFLICT (handle) DO UPDATE` sets
/// every column except `handle`.
pub async fn create_statements(
    db: &mut Transaction<'_, Postgres>,
    registry: &mut Registry,
    statements: Vec<FullStatement>,
) -> Result<Vec<FullStatement>, AppError> {
    // Merge every statement, plus every triple element, into the registry so
    // `fill_ids` resolves the whole reachable set in one pass.
    for statement in &statements {
        registry.unique_add_statement(statement.clone());
        if let Some(triple) = &statement.triple {
            registry.unique_add_statement(FullStatement::unsaved(triple.subject.handle, None));
            registry.unique_add_statement(FullStatement::unsaved(triple.predicate.handle, None));
            if let Value::Statement(handle) = &triple.object {
                registry.unique_add_statement(FullStatement::unsaved(*handle, None));
            }
        }
        if let Some(Value::Blob(handle)) = statement.triple.as_ref().map(|t| &t.object) {
            registry.unique_add_blob(crate::models::blob::BlobRef::new(*handle));
        }
    }

    fill_ids(&mut *db, registry, true).await?;
    super::blobs::fill_ids(&mut *db, registry, true).await?;

    let rows_to_write: Vec<&FullStatement> = statements
        .iter()
        .filter(|s| !s.saved && s.triple.is_some())
        .collect();

    if !rows_to_write.is_empty() {
        let handles: Vec<Uuid> = rows_to_write.iter().map(|s| s.handle).collect();
        let existing = get_by_handles(&mut *db, &handles).await?;
        let existing_by_handle: HashMap<Uuid, FullStatement> =
            existing.into_iter().map(|s| (s.handle, s)).collect();

        for statement in &rows_to_write {
            if let Some(existing) = existing_by_handle.get(&statement.handle) {
                if let (Some(existing_triple), Some(submitted_triple)) =
                    (&existing.triple, &statement.triple)
                {
                    if existing_triple != submitted_triple {
                        return Err(AppError::TripleConflict {
                            handle: statement.handle,
                        });
                    }
                }
            }
        }
    }

    if !rows_to_write.is_empty() {
        let mut builder = sqlx::QueryBuilder::new(
            "INSERT INTO statement (handle, subject_id, predicate_id, object_statement_id, \
             object_blob_id, object_integer, object_decimal, object_string, object_boolean, \
             object_datetime) ",
        );

        builder.push_values(rows_to_write.iter(), |mut b, statement| {
            let triple = statement.triple.as_ref().expect("filtered above");
            let subject_id = registry
                .get_statement(&triple.subject.handle)
                .and_then(|s| s.id)
                .unwrap_or_else(RowId::unresolved);
            let predicate_id = registry
                .get_statement(&triple.predicate.handle)
                .and_then(|s| s.id)
                .unwrap_or_else(RowId::unresolved);

            let mut object_statement_id: Option<RowId<Statement>> = None;
            let mut object_blob_id: Option<RowId<crate::models::blob::Blob>> = None;
            let mut object_integer: Option<i64> = None;
            let mut object_decimal: Option<bigdecimal::BigDecimal> = None;
            let mut object_string: Option<String> = None;
            let mut object_boolean: Option<bool> = None;
            let mut object_datetime: Option<chrono::DateTime<chrono::Utc>> = None;

            match &triple.object {
                Value::Statement(handle) => {
                    object_statement_id = registry.get_statement(handle).and_then(|s| s.id);
                }
                Value::Blob(handle) => {
                    object_blob_id = registry.get_blob(handle).and_then(|b| b.id);
                }
                Value::Integer(n) => object_integer = Some(*n),
                Value::Decimal(d) => object_decimal = Some(d.clone()),
                Value::String(s) => object_string = Some(s.clone()),
                Value::Boolean(b) => object_boolean = Some(*b),
                Value::Datetime(dt) => object_datetime = Some(*dt),
                Value::None => {}
            }

            b.push_bind(statement.handle)
                .push_bind(subject_id.value())
                .push_bind(predicate_id.value())
                .push_bind(object_statement_id.map(|id| id.value()))
                .push_bind(object_blob_id.map(|id| id.value()))
                .push_bind(object_integer)
                .push_bind(object_decimal)
                .push_bind(object_string)
                .push_bind(object_boolean)
                .push_bind(object_datetime);
        });

        builder.push(
            " ON CONFLICT (handle) DO UPDATE SET \
             subject_id = EXCLUDED.subject_id, \
             predicate_id = EXCLUDED.predicate_id, \
             object_statement_id = EXCLUDED.object_statement_id, \
             object_blob_id = EXCLUDED.object_blob_id, \
             object_integer = EXCLUDED.object_integer, \
             object_decimal = EXCLUDED.object_decimal, \
             object_string = EXCLUDED.object_string, \
             object_boolean = EXCLUDED.object_boolean, \
             object_datetime = EXCLUDED.object_datetime \
             WHERE statement.subject_id IS NULL",
        );

        builder.build().execute(&mut *db).await?;
    }

    for statement in &statements {
        registry.mark_saved(&statement.handle);
    }

    let handles: Vec<Uuid> = statements.iter().map(|s| s.handle).collect();
    get_by_handles(db, &handles).await
}

/// Creates a statement whose triple references itself (subject, predicate,
/// and object are all the statement being created). This can't go through
/// the normal batch path because the row's own id isn't known until after
/// the first insert; instead we insert a placeholder and then update it to
/// point at itself.
pub async fn create_self_referential(
    db: &mut Transaction<'_, Postgres>,
    handle: Uuid,
) -> Result<FullStatement, AppError> {
    let row = sqlx::query("INSERT INTO statement (handle) VALUES ($1) RETURNING id")
        .bind(handle)
        .fetch_one(&mut *db)
        .await?;
    let id: i64 = row.try_get("id")?;

    sqlx::query(
        "UPDATE statement SET subject_id = $1, predicate_id = $1, object_statement_id = $1 \
         WHERE id = $1",
    )
    .bind(id)
    .execute(&mut *db)
    .await?;

    let statements = get_by_handles(db, &[handle]).await?;
    statements.into_iter().next().ok_or(AppError::NotFound)
}

pub async fn get_all_statements(db: &mut Transaction<'_, Postgres>) -> Result<Vec<FullStatement>, AppError> {
    let rows = full_statement_query()
        .push(" ORDER BY s.handle")
        .build()
        .fetch_all(&mut *db)
        .await?;

    rows.iter().map(row_to_statement).collect()
}

pub async fn get_by_handles(
    db: &mut Transaction<'_, Postgres>,
    handles: &[Uuid],
) -> Result<Vec<FullStatement>, AppError> {
    if handles.is_empty() {
        return Ok(vec![]);
    }

    let mut builder = full_statement_query();
    builder.push(" WHERE s.handle = ANY(").push_bind(handles).push(")");

    let rows = builder.build().fetch_all(&mut *db).await?;
    rows.iter().map(row_to_statement).collect()
}

pub async fn get_by_ids(db: &mut Transaction<'_, Postgres>, ids: &[i64]) -> Result<Vec<FullStatement>, AppError> {
    if ids.is_empty() {
        return Ok(vec![]);
    }

    let mut builder = full_statement_query();
    builder.push(" WHERE s.id = ANY(").push_bind(ids).push(")");

    let rows = builder.build().fetch_all(&mut *db).await?;
    rows.iter().map(row_to_statement).collect()
}

/// The canonical join graph for reconstructing a full statement: the row
/// itself plus subject/predicate/object-statement/object-blob aliases.
fn full_statement_query<'a>() -> sqlx::QueryBuilder<'a, sqlx::Postgres> {
    sqlx::QueryBuilder::new(
        "SELECT s.id, s.handle, \
         su.id AS subject_row_id, su.handle AS subject_handle, \
         pr.id AS predicate_row_id, pr.handle AS predicate_handle, \
         s.object_statement_id, ob.handle AS object_statement_handle, \
         s.object_blob_id, bl.handle AS object_blob_handle, \
         s.object_integer, s.object_decimal, s.object_string, s.object_boolean, s.object_datetime \
         FROM statement s \
         LEFT JOIN statement su ON su.id = s.subject_id \
         LEFT JOIN statement pr ON pr.id = s.predicate_id \
         LEFT JOIN statement ob ON ob.id = s.object_statement_id \
         LEFT JOIN blob bl ON bl.id = s.object_blob_id",
    )
}

fn row_to_statement(row: &PgRow) -> Result<FullStatement, AppError> {
    let id: i64 = row.try_get("id")?;
    let handle: Uuid = row.try_get("handle")?;

    let subject_handle: Option<Uuid> = row.try_get("subject_handle")?;
    let triple = if let Some(subject_handle) = subject_handle {
        let subject_row_id: i64 = row.try_get("subject_row_id")?;
        let predicate_handle: Uuid = row.try_get("predicate_handle")?;
        let predicate_row_id: i64 = row.try_get("predicate_row_id")?;

        let object = object_value_from_row(row)?;

        Some(Triple {
            subject: StatementRef::with_id(subject_handle, RowId::new(subject_row_id)),
            predicate: StatementRef::with_id(predicate_handle, RowId::new(predicate_row_id)),
            object,
        })
    } else {
        None
    };

    let saved = triple.is_some();

    Ok(FullStatement {
        handle,
        id: Some(RowId::new(id)),
        triple,
        saved,
    })
}

/// Scans the row's object columns in kind order and returns the value of
/// whichever one is non-null. At most one should ever be set.
fn object_value_from_row(row: &PgRow) -> Result<Value, AppError> {
    let statement_handle: Option<Uuid> = row.try_get("object_statement_handle")?;
    if let Some(handle) = statement_handle {
        return Ok(Value::Statement(handle));
    }

    let blob_handle: Option<Vec<u8>> = row.try_get("object_blob_handle")?;
    if let Some(handle) = blob_handle {
        let array: [u8; 32] = handle
            .try_into()
            .map_err(|_| AppError::QueryShape("blob handle was not 32 bytes".into()))?;
        return Ok(Value::Blob(BlobHandle::from_bytes(array)));
    }

    let integer: Option<i64> = row.try_get("object_integer")?;
    if let Some(n) = integer {
        return Ok(Value::Integer(n));
    }

    let decimal: Option<bigdecimal::BigDecimal> = row.try_get("object_decimal")?;
    if let Some(d) = decimal {
        return Ok(Value::Decimal(d));
    }

    let string: Option<String> = row.try_get("object_string")?;
    if let Some(s) = string {
        return Ok(Value::String(s));
    }

    let boolean: Option<bool> = row.try_get("object_boolean")?;
    if let Some(b) = boolean {
        return Ok(Value::Boolean(b));
    }

    let datetime: Option<chrono::DateTime<chrono::Utc>> = row.try_get("object_datetime")?;
    if let Some(dt) = datetime {
        return Ok(Value::Datetime(dt));
    }

    Ok(Value::None)
}

/// Classifies a reference's column for use by the query compiler: which
/// object column a filter/join against this value kind must target.
pub fn column_for(kind: ValueKind) -> Option<&'static str> {
    kind.column()
}

/// Every statement mentioning `handle` in any triple position, plus the
/// statement itself: the "immediate neighborhood" `GET /statements/{handle}`
/// returns alongside the statement it was asked for.
pub async fn get_neighborhood(
    db: &mut Transaction<'_, Postgres>,
    handle: Uuid,
) -> Result<Vec<FullStatement>, AppError> {
    let mut builder = full_statement_query();
    builder.push(
        " WHERE s.handle = ",
    );
    builder.push_bind(handle);
    builder.push(
        " OR su.handle = ",
    );
    builder.push_bind(handle);
    builder.push(
        " OR pr.handle = ",
    );
    builder.push_bind(handle);
    builder.push(
        " OR ob.handle = ",
    );
    builder.push_bind(handle);

    let rows = builder.build().fetch_all(&mut *db).await?;
    rows.iter().map(row_to_statement).collect()
}

/// Finds the self-referential `type` predicate: the one row whose subject,
/// predicate, and object-statement columns all point back at its own id.
/// Every other bootstrap predicate is defined in terms of it, so resolving
/// it by name isn't possible -- it has no predicate to be resolved by.
pub async fn find_type_handle(db: &mut Transaction<'_, Postgres>) -> Result<Uuid, AppError> {
    let row = sqlx::query(
        "SELECT handle FROM statement \
         WHERE subject_id = id AND predicate_id = id AND object_statement_id = id \
         LIMIT 1",
    )
    .fetch_optional(&mut *db)
    .await?
    .ok_or(AppError::NotFound)?;

    row.try_get("handle").map_err(AppError::from)
}

/// Resolves bootstrap predicate/type handles by their `name` statement, in
/// one round trip: a predicate named `n` is the statement whose triple is
/// `(_, type, "n")`.
pub async fn find_predicates_by_name(
    db: &mut Transaction<'_, Postgres>,
    names: &[&str],
) -> Result<HashMap<String, Uuid>, AppError> {
    let owned: Vec<String> = names.iter().map(|s| s.to_string()).collect();

    let rows = sqlx::query(
        "SELECT s.handle, s.object_string AS name FROM statement s \
         JOIN statement t ON t.subject_id = t.id AND t.predicate_id = t.id \
         AND t.object_statement_id = t.id \
         WHERE s.predicate_id = t.id AND s.object_string = ANY($1)",
    )
    .bind(&owned)
    .fetch_all(&mut *db)
    .await?;

    let mut found = HashMap::new();
    for row in &rows {
        let handle: Uuid = row.try_get("handle")?;
        let name: String = row.try_get("name")?;
        found.insert(name, handle);
    }

    Ok(found)
}
