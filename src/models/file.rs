use chrono::{DateTime, Utc};

use crate::models::blob::{Blob, BlobHandle};
use crate::models::id::RowId;
use crate::models::volume::Volume;

/// Marker type for `RowId<File>`.
pub struct File;

#[derive(Debug, Clone)]
pub struct FileRow {
    pub id: RowId<File>,
    pub blob_id: RowId<Blob>,
    pub volume_id: RowId<Volume>,
    pub path: Vec<u8>,
    pub size: i64,
    pub mtime: DateTime<Utc>,
    pub lastverify: DateTime<Utc>,
}

/// A file as seen joined against its blob's digest, the shape the storage
/// controller returns to clients.
#[derive(Debug, Clone)]
pub struct FileWithDigest {
    pub path: Vec<u8>,
    pub size: i64,
    pub mtime: DateTime<Utc>,
    pub lastverify: DateTime<Utc>,
    pub digest: BlobHandle,
}

/// A single entry of an incoming bulk file mutation: `Some` upserts,
/// `None` deletes the path.
#[derive(Debug, Clone)]
pub struct FileMutation {
    pub path: Vec<u8>,
    pub upsert: Option<FileAttrs>,
}

#[derive(Debug, Clone)]
pub struct FileAttrs {
    pub digest: BlobHandle,
    pub size: i64,
    pub mtime: DateTime<Utc>,
    pub lastverify: DateTime<Utc>,
}
