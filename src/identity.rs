//! A request-scoped interning registry for statements and blobs.
//!
//! `Registry` guarantees a single canonical in-memory instance per handle
//! within one request or transaction. It must be constructed fresh for each
//! request and dropped at the end of it: interning across requests would let
//! one client's half-resolved reference leak into another's.

use std::collections::HashMap;

use uuid::Uuid;

use crate::models::blob::{Blob, BlobHandle, BlobRef};
use crate::models::id::RowId;
use crate::models::statement::FullStatement;

#[derive(Default)]
pub struct Registry {
    statements: HashMap<Uuid, FullStatement>,
    blobs: HashMap<BlobHandle, BlobRef>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges `incoming` into whatever canonical instance this registry
    /// already holds for its handle, returning the canonical instance.
    ///
    /// Merge rules: adopt the incoming triple only if the canonical has
    /// none; adopt the incoming id only if the canonical has none; adopt
    /// the "saved" latch if the incoming instance has it set. A populated
    /// triple is never overwritten by a different one here -- that
    /// conflict is detected by the writer on upsert, not silently resolved
    /// here.
    pub fn unique_add_statement(&mut self, incoming: FullStatement) -> FullStatement {
        let canonical = self
            .statements
            .entry(incoming.handle)
            .or_insert_with(|| FullStatement::unsaved(incoming.handle, None));

        if canonical.triple.is_none() {
            canonical.triple = incoming.triple.clone();
        }
        if canonical.id.is_none() {
            canonical.id = incoming.id;
        }
        if incoming.saved {
            canonical.saved = true;
        }

        canonical.clone()
    }

    pub fn unique_add_blob(&mut self, incoming: BlobRef) -> BlobRef {
        let canonical = self
            .blobs
            .entry(incoming.handle)
            .or_insert_with(|| BlobRef::new(incoming.handle));

        if canonical.id.is_none() {
            canonical.id = incoming.id;
        }

        canonical.clone()
    }

    pub fn get_statement(&self, handle: &Uuid) -> Option<&FullStatement> {
        self.statements.get(handle)
    }

    pub fn get_blob(&self, handle: &BlobHandle) -> Option<&BlobRef> {
        self.blobs.get(handle)
    }

    pub fn statement_handles(&self) -> impl Iterator<Item = &Uuid> {
        self.statements.keys()
    }

    pub fn blob_handles(&self) -> impl Iterator<Item = &BlobHandle> {
        self.blobs.keys()
    }

    pub fn set_statement_id(&mut self, handle: &Uuid, id: RowId<crate::models::statement::Statement>) {
        if let Some(s) = self.statements.get_mut(handle) {
            s.id = Some(id);
        }
    }

    pub fn set_blob_id(&mut self, handle: &BlobHandle, id: RowId<Blob>) {
        if let Some(b) = self.blobs.get_mut(handle) {
            b.id = Some(id);
        }
    }

    pub fn mark_saved(&mut self, handle: &Uuid) {
        if let Some(s) = self.statements.get_mut(handle) {
            s.saved = true;
        }
    }
}
