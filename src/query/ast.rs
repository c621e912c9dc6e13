//! Parsed shapes of the query wire protocol: the target kind, join-
//! descriptor keys, and filter-keyword keys. Turning a JSON object key into
//! one of these is the boundary between arbitrary client text and the typed
//! plan the compiler builds from it.

use uuid::Uuid;

use crate::models::value::{deserialize, Op, Value, ValueKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Statement,
    Blob,
}

impl Target {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "statement" => Some(Target::Statement),
            "blob" => Some(Target::Blob),
            _ => None,
        }
    }
}

/// The six query-entity descriptors from the wire protocol. `*Object`
/// variants join forward: the new alias's subject is the current entity.
/// `*Subject` variants join in reverse: the new alias's object references
/// the current entity. `Meta*` matches against the statement row itself
/// (its id) rather than its object slot. `Fetch*` never contributes a
/// filter to the primary WHERE -- it only marks a join to walk for the
/// secondary "additional statements" fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    MatchObject,
    MatchSubject,
    MetaObject,
    MetaSubject,
    FetchObject,
    FetchSubject,
}

impl Direction {
    fn from_verb(verb: &str) -> Option<Self> {
        match verb {
            "mo" => Some(Direction::MatchObject),
            "ms" => Some(Direction::MatchSubject),
            "meta_o" => Some(Direction::MetaObject),
            "meta_s" => Some(Direction::MetaSubject),
            "fo" => Some(Direction::FetchObject),
            "fs" => Some(Direction::FetchSubject),
            _ => None,
        }
    }

    /// Swaps object-ward for subject-ward. Used when a predicate reference
    /// carries the `~` inversion marker, so a client can query a relation
    /// in its reverse direction without a distinct descriptor for it.
    pub fn inverted(self) -> Self {
        match self {
            Direction::MatchObject => Direction::MatchSubject,
            Direction::MatchSubject => Direction::MatchObject,
            Direction::MetaObject => Direction::MetaSubject,
            Direction::MetaSubject => Direction::MetaObject,
            Direction::FetchObject => Direction::FetchSubject,
            Direction::FetchSubject => Direction::FetchObject,
        }
    }

    pub fn is_fetch(self) -> bool {
        matches!(self, Direction::FetchObject | Direction::FetchSubject)
    }

    pub fn is_meta(self) -> bool {
        matches!(self, Direction::MetaObject | Direction::MetaSubject)
    }

    /// True when the new alias's join column is the row's own id (a `Meta*`
    /// descriptor), rather than either of its object/subject slots.
    pub fn is_self(self) -> bool {
        self.is_meta()
    }

    /// True when the new alias joins on the *object* side of the parent
    /// row (forward); false when it joins on the subject side (reverse).
    pub fn targets_object(self) -> bool {
        matches!(
            self,
            Direction::MatchObject | Direction::MetaObject | Direction::FetchObject
        )
    }
}

/// A parsed join-descriptor key, e.g. `"mo:s:<uuid>"`, or the predicate-less
/// `"mo:"` (matches any predicate).
#[derive(Debug, Clone)]
pub struct Descriptor {
    pub direction: Direction,
    pub predicate: Option<Uuid>,
}

pub fn parse_descriptor(key: &str) -> Option<Descriptor> {
    let (verb, rest) = key.split_once(':')?;
    let direction = Direction::from_verb(verb)?;

    if rest.is_empty() {
        return Some(Descriptor {
            direction,
            predicate: None,
        });
    }

    let (inverted, payload) = match rest.strip_prefix('~') {
        Some(stripped) => (true, stripped),
        None => (false, rest),
    };

    let predicate = match deserialize(payload).ok()? {
        Value::Statement(handle) => handle,
        _ => return None,
    };

    Some(Descriptor {
        direction: if inverted {
            direction.inverted()
        } else {
            direction
        },
        predicate: Some(predicate),
    })
}

/// A parsed filter-keyword key, e.g. `"integer.lt"`.
#[derive(Debug, Clone, Copy)]
pub struct FilterKey {
    pub kind: ValueKind,
    pub op: Op,
}

pub fn parse_filter_key(key: &str) -> Option<FilterKey> {
    let (kind, op) = key.split_once('.')?;
    Some(FilterKey {
        kind: ValueKind::from_name(kind)?,
        op: Op::from_suffix(op)?,
    })
}

pub const SORT_ASC: &str = "sort";
pub const SORT_DESC: &str = "sort+";
pub const PREFER_PLUS: &str = "prefer+";

/// A `having` key is a filter keyword with a trailing `.`: `"<kind>.<op>."`.
/// It parses to the same `FilterKey` as its non-`having` counterpart; the
/// trailing dot only changes where the compiler files the resulting filter
/// (into `Plan::having` instead of `Plan::filters`), so it's applied after
/// the primary query's `DISTINCT` collapses duplicate handles rather than
/// before.
pub fn parse_having_key(key: &str) -> Option<FilterKey> {
    let trimmed = key.strip_suffix('.')?;
    parse_filter_key(trimmed)
}
