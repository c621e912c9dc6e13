//! Translates a nested query mapping into a `Plan`: a join graph plus
//! filter/sort/prefer/having/fetch lists. Compilation never recurses --
//! it walks an explicit work stack, so a pathological query can't blow the
//! call stack and an in-progress plan can be inspected at any point.

use std::collections::HashMap;

use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::value::{deserialize, Op, Value, ValueKind};
use crate::query::ast::{
    parse_descriptor, parse_filter_key, parse_having_key, Direction, PREFER_PLUS, SORT_ASC,
    SORT_DESC,
};

pub const MAIN_ENTITY: &str = "main";

/// A join-graph node. `main` is the only entity with `parent = None`.
#[derive(Debug, Clone)]
pub struct Entity {
    pub parent: Option<String>,
    pub direction: Direction,
    pub predicate: Option<Uuid>,
}

#[derive(Debug, Clone)]
pub enum FilterValue {
    Scalar(Value),
    List(Vec<Value>),
}

#[derive(Debug, Clone)]
pub struct Filter {
    pub entity: String,
    pub kind: ValueKind,
    pub op: Op,
    pub value: FilterValue,
}

#[derive(Debug, Clone)]
pub struct OrderColumn {
    pub entity: String,
    pub kind: ValueKind,
    pub descending: bool,
}

/// A `Fetch*` descriptor: drives a secondary SELECT, never the primary
/// WHERE. Filters nested under it are scoped to that secondary SELECT.
#[derive(Debug, Clone)]
pub struct Fetch {
    pub entity: String,
    pub direction: Direction,
    pub predicate: Option<Uuid>,
    pub local_filters: Vec<Filter>,
}

#[derive(Debug, Default)]
pub struct Plan {
    pub entity_order: Vec<String>,
    pub entities: HashMap<String, Entity>,
    pub filters: Vec<Filter>,
    pub having: Vec<Filter>,
    pub sorts: Vec<OrderColumn>,
    pub prefers: Vec<OrderColumn>,
    pub fetches: Vec<Fetch>,
}

impl Plan {
    pub fn entity(&self, key: &str) -> Option<&Entity> {
        self.entities.get(key)
    }
}

/// Which filter list a frame's emitted filters are destined for: the
/// primary WHERE, or one particular fetch's own local filter list.
#[derive(Clone, Copy)]
enum Scope {
    Primary,
    Fetch(usize),
}

struct Frame<'a> {
    node: &'a JsonValue,
    entity: String,
    scope: Scope,
}

pub fn compile(node: &JsonValue) -> Result<Plan, AppError> {
    let mut plan = Plan::default();
    plan.entity_order.push(MAIN_ENTITY.to_owned());

    let mut counter: usize = 0;
    let mut stack = vec![Frame {
        node,
        entity: MAIN_ENTITY.to_owned(),
        scope: Scope::Primary,
    }];

    while let Some(frame) = stack.pop() {
        match frame.node {
            JsonValue::Object(map) => {
                for (key, value) in map {
                    if let Some(descriptor) = parse_descriptor(key) {
                        let new_key = format!("statement_{}", counter);
                        counter += 1;

                        plan.entity_order.push(new_key.clone());
                        plan.entities.insert(
                            new_key.clone(),
                            Entity {
                                parent: Some(frame.entity.clone()),
                                direction: descriptor.direction,
                                predicate: descriptor.predicate,
                            },
                        );

                        let child_scope = if descriptor.direction.is_fetch() {
                            let index = plan.fetches.len();
                            plan.fetches.push(Fetch {
                                entity: new_key.clone(),
                                direction: descriptor.direction,
                                predicate: descriptor.predicate,
                                local_filters: Vec::new(),
                            });
                            Scope::Fetch(index)
                        } else {
                            frame.scope
                        };

                        match value {
                            JsonValue::Object(_) => stack.push(Frame {
                                node: value,
                                entity: new_key,
                                scope: child_scope,
                            }),
                            scalar => {
                                let filter = scalar_filter(&new_key, scalar)?;
                                file_filter(&mut plan, child_scope, filter);
                            }
                        }
                        continue;
                    }

                    if key == SORT_ASC || key == SORT_DESC {
                        let kind = value_kind_hint(value)?;
                        plan.sorts.push(OrderColumn {
                            entity: frame.entity.clone(),
                            kind,
                            descending: key == SORT_DESC,
                        });
                        continue;
                    }

                    if key == PREFER_PLUS {
                        let kind = value_kind_hint(value)?;
                        plan.prefers.push(OrderColumn {
                            entity: frame.entity.clone(),
                            kind,
                            descending: true,
                        });
                        continue;
                    }

                    if let Some(filter_key) = parse_having_key(key) {
                        let filter = keyed_filter(&frame.entity, filter_key.kind, filter_key.op, value)?;
                        plan.having.push(filter);
                        continue;
                    }

                    if let Some(filter_key) = parse_filter_key(key) {
                        let filter = keyed_filter(&frame.entity, filter_key.kind, filter_key.op, value)?;
                        file_filter(&mut plan, frame.scope, filter);
                        continue;
                    }

                    if let Some(op) = Op::from_suffix(key) {
                        let filter = bare_op_filter(&frame.entity, op, value)?;
                        file_filter(&mut plan, frame.scope, filter);
                        continue;
                    }

                    return Err(AppError::QueryShape(format!(
                        "unrecognized query key `{}`",
                        key
                    )));
                }
            }
            scalar => {
                let filter = scalar_filter(&frame.entity, scalar)?;
                file_filter(&mut plan, frame.scope, filter);
            }
        }
    }

    Ok(plan)
}

fn file_filter(plan: &mut Plan, scope: Scope, filter: Filter) {
    match scope {
        Scope::Primary => plan.filters.push(filter),
        Scope::Fetch(index) => plan.fetches[index].local_filters.push(filter),
    }
}

fn scalar_filter(entity: &str, value: &JsonValue) -> Result<Filter, AppError> {
    let parsed = json_scalar_to_value(value)?;
    Ok(Filter {
        entity: entity.to_owned(),
        kind: parsed.kind(),
        op: Op::Eq,
        value: FilterValue::Scalar(parsed),
    })
}

fn bare_op_filter(entity: &str, op: Op, value: &JsonValue) -> Result<Filter, AppError> {
    if op == Op::In {
        let list = json_list_to_values(value)?;
        let kind = list.first().map(Value::kind).unwrap_or(ValueKind::None);
        return Ok(Filter {
            entity: entity.to_owned(),
            kind,
            op,
            value: FilterValue::List(list),
        });
    }

    let parsed = json_scalar_to_value(value)?;
    let kind = parsed.kind();
    if !op.applies_to(kind) {
        return Err(AppError::QueryShape(format!(
            "operator `{:?}` does not apply to kind `{:?}`",
            op, kind
        )));
    }

    Ok(Filter {
        entity: entity.to_owned(),
        kind,
        op,
        value: FilterValue::Scalar(parsed),
    })
}

fn keyed_filter(entity: &str, kind: ValueKind, op: Op, value: &JsonValue) -> Result<Filter, AppError> {
    if !op.applies_to(kind) {
        return Err(AppError::QueryShape(format!(
            "operator `{:?}` does not apply to kind `{:?}`",
            op, kind
        )));
    }

    if op == Op::In {
        let list = json_list_to_values(value)?;
        for v in &list {
            if v.kind() != kind {
                return Err(AppError::QueryShape(format!(
                    "`in` list element of kind `{:?}` does not match declared kind `{:?}`",
                    v.kind(),
                    kind
                )));
            }
        }
        return Ok(Filter {
            entity: entity.to_owned(),
            kind,
            op,
            value: FilterValue::List(list),
        });
    }

    let parsed = json_scalar_to_value(value)?;
    if parsed.kind() != kind {
        return Err(AppError::QueryShape(format!(
            "filter value of kind `{:?}` does not match declared kind `{:?}`",
            parsed.kind(),
            kind
        )));
    }

    Ok(Filter {
        entity: entity.to_owned(),
        kind,
        op,
        value: FilterValue::Scalar(parsed),
    })
}

fn value_kind_hint(value: &JsonValue) -> Result<ValueKind, AppError> {
    let name = value
        .as_str()
        .ok_or_else(|| AppError::QueryShape("sort/prefer value must name a value kind".into()))?;
    ValueKind::from_name(name)
        .ok_or_else(|| AppError::QueryShape(format!("unknown value kind `{}`", name)))
}

fn json_scalar_to_value(value: &JsonValue) -> Result<Value, AppError> {
    let s = value
        .as_str()
        .ok_or_else(|| AppError::QueryShape("expected a wire-encoded scalar string".into()))?;
    Ok(deserialize(s)?)
}

fn json_list_to_values(value: &JsonValue) -> Result<Vec<Value>, AppError> {
    let items = value
        .as_array()
        .ok_or_else(|| AppError::QueryShape("`in` filter value must be an array".into()))?;
    items.iter().map(json_scalar_to_value).collect()
}
