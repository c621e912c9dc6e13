//! Runs a compiled `Plan`: builds and issues the primary/outer SELECT,
//! applies pagination, and issues one secondary SELECT per `Fetch*`
//! descriptor to resolve the "additional statements" neighborhood.
//!
//! Every statement built here goes through `sqlx::QueryBuilder` --- alias
//! and column names are pushed as plain text because they're chosen
//! internally from a closed set (never derived from client text), but every
//! bound value goes through `push_bind`.

use std::collections::{HashMap, HashSet};

use sqlx::postgres::{PgRow, Postgres};
use sqlx::{QueryBuilder, Row, Transaction};
use uuid::Uuid;

use crate::error::AppError;
use crate::identity::Registry;
use crate::models::blob::BlobHandle;
use crate::models::id::RowId;
use crate::models::statement::FullStatement;
use crate::models::value::{Op, Value, ValueKind};
use crate::query::ast::Target;
use crate::query::compile::{Entity, Fetch, Filter, FilterValue, OrderColumn, Plan, MAIN_ENTITY};
use crate::repo::{blobs, statements};

#[derive(Debug, Clone)]
pub enum ResultRef {
    Statement(Uuid),
    Blob(BlobHandle),
}

#[derive(Debug)]
pub struct QueryResult {
    pub results: Vec<ResultRef>,
    pub more: bool,
    pub statements: HashMap<Uuid, FullStatement>,
}

pub async fn execute(
    db: &mut Transaction<'_, Postgres>,
    plan: &Plan,
    target: Target,
    after: Option<Value>,
    limit: i64,
) -> Result<QueryResult, AppError> {
    let registry = resolve_references(&mut *db, plan).await?;

    let (primary_ids, results, more) =
        run_primary_query(&mut *db, plan, target, &registry, after, limit).await?;

    let mut additional_ids: Vec<i64> = if target == Target::Statement {
        primary_ids.clone()
    } else {
        Vec::new()
    };

    for fetch in &plan.fetches {
        let ids = run_fetch_query(&mut *db, plan, target, &registry, fetch, &primary_ids).await?;
        additional_ids.extend(ids);
    }

    additional_ids.sort_unstable();
    additional_ids.dedup();

    let full = statements::get_by_ids(&mut *db, &additional_ids).await?;
    let statements = full.into_iter().map(|s| (s.handle, s)).collect();

    Ok(QueryResult {
        results,
        more,
        statements,
    })
}

/// Resolves every predicate handle and every `Statement`/`Blob`-kinded
/// filter value to an internal id, in one batched round-trip per kind.
/// Unresolvable handles get the sentinel id `-1`, which matches no row --
/// the same semantics `fill_ids` gives the repository layer.
async fn resolve_references(db: &mut Transaction<'_, Postgres>, plan: &Plan) -> Result<Registry, AppError> {
    let mut registry = Registry::new();

    for entity in plan.entities.values() {
        if let Some(predicate) = entity.predicate {
            registry.unique_add_statement(FullStatement::unsaved(predicate, None));
        }
    }
    for fetch in &plan.fetches {
        if let Some(predicate) = fetch.predicate {
            registry.unique_add_statement(FullStatement::unsaved(predicate, None));
        }
    }

    let mut values: Vec<&Value> = Vec::new();
    collect_filter_values(&plan.filters, &mut values);
    collect_filter_values(&plan.having, &mut values);
    for fetch in &plan.fetches {
        collect_filter_values(&fetch.local_filters, &mut values);
    }

    for value in values {
        match value {
            Value::Statement(handle) => {
                registry.unique_add_statement(FullStatement::unsaved(*handle, None));
            }
            Value::Blob(handle) => {
                registry.unique_add_blob(crate::models::blob::BlobRef::new(*handle));
            }
            _ => {}
        }
    }

    statements::fill_ids(&mut *db, &mut registry, false).await?;
    blobs::fill_ids(&mut *db, &mut registry, false).await?;

    Ok(registry)
}

fn collect_filter_values<'a>(filters: &'a [Filter], out: &mut Vec<&'a Value>) {
    for filter in filters {
        match &filter.value {
            FilterValue::Scalar(v) => out.push(v),
            FilterValue::List(values) => out.extend(values.iter()),
        }
    }
}

/// The set of entities that must be joined for the primary query: every
/// ancestor of every entity a primary-scoped filter, sort, prefer, or
/// having clause names. An entity that exists only to anchor a `Fetch*`
/// subtree is never pulled in here -- joining it would let an unrelated
/// one-to-many fan-out corrupt the `DISTINCT ON` collapse for no reason,
/// since nothing in the primary query actually constrains it.
fn primary_entities(plan: &Plan) -> Vec<String> {
    let mut keys: Vec<String> = Vec::new();
    keys.extend(plan.filters.iter().map(|f| f.entity.clone()));
    keys.extend(plan.having.iter().map(|f| f.entity.clone()));
    keys.extend(plan.sorts.iter().map(|o| o.entity.clone()));
    keys.extend(plan.prefers.iter().map(|o| o.entity.clone()));
    keys
}

/// Walks from each of `needed`'s entities up to `main`, returning the union
/// of ancestor chains in root-first order with no duplicates -- the order
/// `LEFT JOIN`s must be emitted in so every alias's parent is already
/// bound.
fn materialize_order(plan: &Plan, needed: &[String]) -> Result<Vec<String>, AppError> {
    let mut present: HashSet<String> = HashSet::new();
    let mut order: Vec<String> = Vec::new();

    for leaf in needed {
        let mut chain: Vec<String> = Vec::new();
        let mut cur = leaf.clone();
        loop {
            if present.contains(&cur) {
                break;
            }
            chain.push(cur.clone());
            if cur == MAIN_ENTITY {
                break;
            }
            let parent = plan
                .entity(&cur)
                .ok_or_else(|| AppError::QueryShape(format!("unknown query entity `{}`", cur)))?
                .parent
                .clone()
                .unwrap_or_else(|| MAIN_ENTITY.to_owned());
            cur = parent;
        }
        chain.reverse();
        for key in chain {
            if present.insert(key.clone()) {
                order.push(key);
            }
        }
    }

    if !present.contains(MAIN_ENTITY) {
        order.insert(0, MAIN_ENTITY.to_owned());
    }

    Ok(order)
}

fn parent_rhs_column(plan: &Plan, parent_key: &str) -> &'static str {
    if parent_key == MAIN_ENTITY {
        return "id";
    }
    match plan.entity(parent_key) {
        Some(Entity { direction, .. }) if direction.is_meta() => "id",
        Some(Entity { direction, .. }) if direction.targets_object() => "object_statement_id",
        _ => "subject_id",
    }
}

fn lhs_column(
    target: Target,
    parent_key: &str,
    direction: crate::query::ast::Direction,
) -> &'static str {
    if direction.targets_object() {
        "subject_id"
    } else if parent_key == MAIN_ENTITY && target == Target::Blob {
        "object_blob_id"
    } else {
        "object_statement_id"
    }
}

fn push_joins<'a>(
    qb: &mut QueryBuilder<'a, Postgres>,
    plan: &'a Plan,
    target: Target,
    registry: &Registry,
    order: &[String],
) {
    for key in order {
        if key == MAIN_ENTITY {
            let table = if target == Target::Blob { "blob" } else { "statement" };
            qb.push(format!(" FROM {} AS main", table));
            continue;
        }

        let entity = plan.entity(key).expect("materialized entity must be registered");
        let parent_key = entity.parent.clone().unwrap_or_else(|| MAIN_ENTITY.to_owned());
        let lhs = lhs_column(target, &parent_key, entity.direction);
        let rhs = parent_rhs_column(plan, &parent_key);

        qb.push(format!(
            " LEFT JOIN statement AS {key} ON {key}.{lhs} = {parent}.{rhs}",
            key = key,
            lhs = lhs,
            parent = parent_key,
            rhs = rhs
        ));

        if let Some(predicate) = entity.predicate {
            let id = registry
                .get_statement(&predicate)
                .and_then(|s| s.id)
                .unwrap_or_else(RowId::unresolved);
            qb.push(format!(" AND {}.predicate_id = ", key));
            qb.push_bind(id.value());
        }
    }
}

fn resolve_statement_id(registry: &Registry, handle: &Uuid) -> i64 {
    registry
        .get_statement(handle)
        .and_then(|s| s.id)
        .unwrap_or_else(RowId::unresolved)
        .value()
}

fn resolve_blob_id(registry: &Registry, handle: &BlobHandle) -> i64 {
    registry
        .get_blob(handle)
        .and_then(|b| b.id)
        .unwrap_or_else(RowId::unresolved)
        .value()
}

fn escape_like(s: &str) -> String {
    s.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

fn push_bind_scalar<'a>(
    qb: &mut QueryBuilder<'a, Postgres>,
    registry: &Registry,
    value: &Value,
) -> Result<(), AppError> {
    match value {
        Value::Statement(h) => {
            qb.push_bind(resolve_statement_id(registry, h));
        }
        Value::Blob(h) => {
            qb.push_bind(resolve_blob_id(registry, h));
        }
        Value::Integer(n) => {
            qb.push_bind(*n);
        }
        Value::Decimal(d) => {
            qb.push_bind(d.clone());
        }
        Value::String(s) => {
            qb.push_bind(s.clone());
        }
        Value::Boolean(b) => {
            qb.push_bind(*b);
        }
        Value::Datetime(dt) => {
            qb.push_bind(*dt);
        }
        Value::None => return Err(AppError::QueryShape("cannot filter against `none`".into())),
    }
    Ok(())
}

fn push_bind_list<'a>(
    qb: &mut QueryBuilder<'a, Postgres>,
    registry: &Registry,
    values: &[Value],
) -> Result<(), AppError> {
    match values[0].kind() {
        ValueKind::Statement => {
            let ids: Vec<i64> = values
                .iter()
                .map(|v| match v {
                    Value::Statement(h) => resolve_statement_id(registry, h),
                    _ => unreachable!("list filter values are pre-validated to share one kind"),
                })
                .collect();
            qb.push_bind(ids);
        }
        ValueKind::Blob => {
            let ids: Vec<i64> = values
                .iter()
                .map(|v| match v {
                    Value::Blob(h) => resolve_blob_id(registry, h),
                    _ => unreachable!("list filter values are pre-validated to share one kind"),
                })
                .collect();
            qb.push_bind(ids);
        }
        ValueKind::Integer => {
            let v: Vec<i64> = values
                .iter()
                .map(|v| match v {
                    Value::Integer(n) => *n,
                    _ => unreachable!("list filter values are pre-validated to share one kind"),
                })
                .collect();
            qb.push_bind(v);
        }
        ValueKind::Decimal => {
            let v: Vec<bigdecimal::BigDecimal> = values
                .iter()
                .map(|v| match v {
                    Value::Decimal(d) => d.clone(),
                    _ => unreachable!("list filter values are pre-validated to share one kind"),
                })
                .collect();
            qb.push_bind(v);
        }
        ValueKind::String => {
            let v: Vec<String> = values
                .iter()
                .map(|v| match v {
                    Value::String(s) => s.clone(),
                    _ => unreachable!("list filter values are pre-validated to share one kind"),
                })
                .collect();
            qb.push_bind(v);
        }
        ValueKind::Boolean => {
            let v: Vec<bool> = values
                .iter()
                .map(|v| match v {
                    Value::Boolean(b) => *b,
                    _ => unreachable!("list filter values are pre-validated to share one kind"),
                })
                .collect();
            qb.push_bind(v);
        }
        ValueKind::Datetime => {
            let v: Vec<chrono::DateTime<chrono::Utc>> = values
                .iter()
                .map(|v| match v {
                    Value::Datetime(dt) => *dt,
                    _ => unreachable!("list filter values are pre-validated to share one kind"),
                })
                .collect();
            qb.push_bind(v);
        }
        ValueKind::None => {
            return Err(AppError::QueryShape("cannot build an `in` filter over `none`".into()))
        }
    }
    Ok(())
}

/// Pushes `<expr> <op> <bound value>` (or the `in`/pattern-operator
/// equivalent) onto `qb`. `expr` is a fully-qualified SQL expression chosen
/// internally (`<entity>.<column>` or `sub.<label>`), never client text.
fn push_condition<'a>(
    qb: &mut QueryBuilder<'a, Postgres>,
    registry: &Registry,
    expr: &str,
    op: Op,
    value: &FilterValue,
) -> Result<(), AppError> {
    match value {
        FilterValue::List(values) => {
            if values.is_empty() {
                // The canonical, documented behavior: an empty `in` list
                // matches nothing, not everything.
                qb.push("FALSE");
                return Ok(());
            }
            qb.push(format!("{} = ANY(", expr));
            push_bind_list(qb, registry, values)?;
            qb.push(")");
        }
        FilterValue::Scalar(v) => match op {
            Op::Contains | Op::StartsWith | Op::EndsWith => {
                let s = match v {
                    Value::String(s) => s.clone(),
                    _ => {
                        return Err(AppError::QueryShape(
                            "pattern operators only apply to string values".into(),
                        ))
                    }
                };
                let pattern = match op {
                    Op::Contains => format!("%{}%", escape_like(&s)),
                    Op::StartsWith => format!("{}%", escape_like(&s)),
                    Op::EndsWith => format!("%{}", escape_like(&s)),
                    _ => unreachable!(),
                };
                qb.push(format!("{} LIKE ", expr));
                qb.push_bind(pattern);
                qb.push(" ESCAPE '\\'");
            }
            _ => {
                qb.push(format!("{} {} ", expr, op.sql()));
                push_bind_scalar(qb, registry, v)?;
            }
        },
    }
    Ok(())
}

fn push_after<'a>(
    qb: &mut QueryBuilder<'a, Postgres>,
    target: Target,
    value: &Value,
) -> Result<(), AppError> {
    match (target, value) {
        (Target::Statement, Value::Statement(handle)) => {
            qb.push(" AND main.handle > ");
            qb.push_bind(*handle);
        }
        (Target::Blob, Value::Blob(handle)) => {
            qb.push(" AND main.handle > ");
            qb.push_bind(*handle);
        }
        _ => {
            return Err(AppError::QueryShape(
                "`after` cursor's kind does not match the query target".into(),
            ))
        }
    }
    Ok(())
}

fn read_primary_row(row: &PgRow, target: Target) -> Result<(i64, ResultRef), AppError> {
    let id: i64 = row.try_get("id")?;
    let result = match target {
        Target::Statement => ResultRef::Statement(row.try_get("handle")?),
        Target::Blob => ResultRef::Blob(row.try_get("handle")?),
    };
    Ok((id, result))
}

async fn run_primary_query(
    db: &mut Transaction<'_, Postgres>,
    plan: &Plan,
    target: Target,
    registry: &Registry,
    after: Option<Value>,
    limit: i64,
) -> Result<(Vec<i64>, Vec<ResultRef>, bool), AppError> {
    let needed = primary_entities(plan);
    let order = materialize_order(plan, &needed)?;

    let order_labels: Vec<(String, &OrderColumn)> = plan
        .sorts
        .iter()
        .enumerate()
        .map(|(i, oc)| (format!("ord_{}", i), oc))
        .collect();
    let having_labels: Vec<(String, &Filter)> = plan
        .having
        .iter()
        .enumerate()
        .map(|(i, f)| (format!("hv_{}", i), f))
        .collect();

    let wrap = !order_labels.is_empty() || !having_labels.is_empty();

    let mut qb: QueryBuilder<Postgres> = QueryBuilder::new("");

    if wrap {
        qb.push("SELECT * FROM (");
    }

    qb.push("SELECT DISTINCT ON (main.handle) main.id AS id, main.handle AS handle");
    for (label, oc) in &order_labels {
        let column = oc
            .kind
            .column()
            .ok_or_else(|| AppError::QueryShape("cannot sort by the `none` kind".into()))?;
        qb.push(format!(", {}.{} AS {}", oc.entity, column, label));
    }
    for (label, f) in &having_labels {
        let column = f
            .kind
            .column()
            .ok_or_else(|| AppError::QueryShape("cannot filter by the `none` kind".into()))?;
        qb.push(format!(", {}.{} AS {}", f.entity, column, label));
    }

    push_joins(&mut qb, plan, target, registry, &order);

    qb.push(" WHERE TRUE");
    for filter in &plan.filters {
        let column = filter
            .kind
            .column()
            .ok_or_else(|| AppError::QueryShape("cannot filter by the `none` kind".into()))?;
        qb.push(" AND (");
        push_condition(
            &mut qb,
            registry,
            &format!("{}.{}", filter.entity, column),
            filter.op,
            &filter.value,
        )?;
        qb.push(")");
    }
    if let Some(after_value) = &after {
        push_after(&mut qb, target, after_value)?;
    }

    qb.push(" ORDER BY main.handle");
    for oc in &plan.prefers {
        let column = oc
            .kind
            .column()
            .ok_or_else(|| AppError::QueryShape("cannot prefer by the `none` kind".into()))?;
        qb.push(format!(", {}.{}", oc.entity, column));
        if oc.descending {
            qb.push(" DESC");
        }
    }

    if wrap {
        qb.push(") AS sub");

        if !having_labels.is_empty() {
            qb.push(" WHERE ");
            for (i, (label, f)) in having_labels.iter().enumerate() {
                if i > 0 {
                    qb.push(" AND ");
                }
                qb.push("(");
                push_condition(&mut qb, registry, &format!("sub.{}", label), f.op, &f.value)?;
                qb.push(")");
            }
        }

        qb.push(" ORDER BY ");
        if order_labels.is_empty() {
            qb.push("sub.handle");
        } else {
            for (i, (label, oc)) in order_labels.iter().enumerate() {
                if i > 0 {
                    qb.push(", ");
                }
                qb.push(format!("sub.{}", label));
                if oc.descending {
                    qb.push(" DESC");
                }
            }
        }
    }

    qb.push(" LIMIT ");
    qb.push_bind(limit + 1);

    let rows = qb.build().fetch_all(&mut *db).await?;

    let mut parsed: Vec<(i64, ResultRef)> = rows
        .iter()
        .map(|row| read_primary_row(row, target))
        .collect::<Result<_, _>>()?;

    let more = parsed.len() as i64 > limit;
    parsed.truncate(limit.max(0) as usize);

    let ids: Vec<i64> = parsed.iter().map(|(id, _)| *id).collect();
    let refs: Vec<ResultRef> = parsed.into_iter().map(|(_, r)| r).collect();

    Ok((ids, refs, more))
}

async fn run_fetch_query(
    db: &mut Transaction<'_, Postgres>,
    plan: &Plan,
    target: Target,
    registry: &Registry,
    fetch: &Fetch,
    primary_ids: &[i64],
) -> Result<Vec<i64>, AppError> {
    if primary_ids.is_empty() {
        return Ok(vec![]);
    }

    let order = materialize_order(plan, &[fetch.entity.clone()])?;

    let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(format!("SELECT {}.id AS id", fetch.entity));
    push_joins(&mut qb, plan, target, registry, &order);
    qb.push(" WHERE main.id = ANY(");
    qb.push_bind(primary_ids.to_vec());
    qb.push(")");

    for filter in &fetch.local_filters {
        let column = filter
            .kind
            .column()
            .ok_or_else(|| AppError::QueryShape("cannot filter by the `none` kind".into()))?;
        qb.push(" AND (");
        push_condition(
            &mut qb,
            registry,
            &format!("{}.{}", filter.entity, column),
            filter.op,
            &filter.value,
        )?;
        qb.push(")");
    }

    let rows = qb.build().fetch_all(&mut *db).await?;
    rows.iter()
        .map(|row| row.try_get::<i64, _>("id").map_err(AppError::from))
        .collect()
}
