use uuid::Uuid;

use crate::models::id::RowId;
use crate::models::value::Value;

/// Marker type for `RowId<Statement>`.
pub struct Statement;

/// A reference to a statement by its externally-visible handle, with its
/// internal id filled in once it has been resolved against storage.
#[derive(Debug, Clone, PartialEq)]
pub struct StatementRef {
    pub handle: Uuid,
    pub id: Option<RowId<Statement>>,
}

impl StatementRef {
    pub fn new(handle: Uuid) -> Self {
        Self { handle, id: None }
    }

    pub fn with_id(handle: Uuid, id: RowId<Statement>) -> Self {
        Self {
            handle,
            id: Some(id),
        }
    }
}

/// The `(subject, predicate, object)` triple of a statement.
#[derive(Debug, Clone, PartialEq)]
pub struct Triple {
    pub subject: StatementRef,
    pub predicate: StatementRef,
    pub object: Value,
}

/// A full statement as reconstructed from storage, or as submitted for
/// creation.
#[derive(Debug, Clone)]
pub struct FullStatement {
    pub handle: Uuid,
    pub id: Option<RowId<Statement>>,
    pub triple: Option<Triple>,
    /// Set once the writer has confirmed this statement's triple is
    /// durable; prevents re-upserting an already-saved row.
    pub saved: bool,
}

impl FullStatement {
    pub fn unsaved(handle: Uuid, triple: Option<Triple>) -> Self {
        Self {
            handle,
            id: None,
            triple,
            saved: false,
        }
    }

    pub fn as_ref(&self) -> StatementRef {
        StatementRef {
            handle: self.handle,
            id: self.id,
        }
    }
}
