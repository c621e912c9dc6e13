//! Volume/file persistence: listing with the storage controller's filter
//! set, and bulk upsert-or-delete mutation.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use sqlx::{Postgres, Row, Transaction};

use crate::error::AppError;
use crate::models::blob::BlobHandle;
use crate::models::file::{FileAttrs, FileMutation, FileWithDigest};
use crate::models::id::RowId;
use crate::models::volume::Volume;

pub const DEFAULT_LIMIT: i64 = 1000;
pub const MAX_LIMIT: i64 = 10_000;

#[derive(Debug, Default)]
pub struct ListFilters {
    pub without_statements: bool,
    pub paths: Vec<Vec<u8>>,
    pub after: Option<Vec<u8>>,
    pub limit: i64,
}

pub async fn list(
    db: &mut Transaction<'_, Postgres>,
    volume_id: RowId<Volume>,
    filters: &ListFilters,
) -> Result<Vec<FileWithDigest>, AppError> {
    let mut builder = sqlx::QueryBuilder::new(
        "SELECT f.path, f.size, f.mtime, f.lastverify, b.handle AS digest \
         FROM file f JOIN blob b ON b.id = f.blob_id \
         WHERE f.volume_id = ",
    );
    builder.push_bind(volume_id.value());

    if filters.without_statements {
        builder.push(
            " AND NOT EXISTS (SELECT 1 FROM statement s WHERE s.object_blob_id = f.blob_id)",
        );
    }

    if !filters.paths.is_empty() {
        builder.push(" AND f.path = ANY(").push_bind(&filters.paths).push(")");
    }

    if let Some(after) = &filters.after {
        builder.push(" AND f.path > ").push_bind(after.clone());
    }

    builder.push(" ORDER BY f.path LIMIT ").push_bind(filters.limit.min(MAX_LIMIT));

    let rows = builder.build().fetch_all(&mut *db).await?;

    rows.iter()
        .map(|row| {
            let path: Vec<u8> = row.try_get("path")?;
            let size: i64 = row.try_get("size")?;
            let mtime: DateTime<Utc> = row.try_get("mtime")?;
            let lastverify: DateTime<Utc> = row.try_get("lastverify")?;
            let digest: BlobHandle = row.try_get("digest")?;

            Ok(FileWithDigest {
                path,
                size,
                mtime,
                lastverify,
                digest,
            })
        })
        .collect()
}

pub async fn get_one(
    db: &mut Transaction<'_, Postgres>,
    volume_id: RowId<Volume>,
    path: &[u8],
) -> Result<FileWithDigest, AppError> {
    let row = sqlx::query(
        "SELECT f.path, f.size, f.mtime, f.lastverify, b.handle AS digest \
         FROM file f JOIN blob b ON b.id = f.blob_id \
         WHERE f.volume_id = $1 AND f.path = $2",
    )
    .bind(volume_id.value())
    .bind(path)
    .fetch_optional(&mut *db)
    .await?
    .ok_or(AppError::NotFound)?;

    Ok(FileWithDigest {
        path: row.try_get("path")?,
        size: row.try_get("size")?,
        mtime: row.try_get("mtime")?,
        lastverify: row.try_get("lastverify")?,
        digest: row.try_get("digest")?,
    })
}

/// Applies a bulk mutation: entries with `upsert = Some(..)` are
/// inserted/updated; entries with `upsert = None` are deleted. Any blob
/// digest referenced by an upsert that doesn't already exist is created
/// first, using a single multi-row insert (an `ON CONFLICT DO NOTHING`
/// bulk insert is orders of magnitude faster here than one round-trip per
/// new digest).
pub async fn mutate(
    db: &mut Transaction<'_, Postgres>,
    volume_id: RowId<Volume>,
    mutations: Vec<FileMutation>,
) -> Result<(), AppError> {
    let upserts: Vec<(Vec<u8>, FileAttrs)> = mutations
        .iter()
        .filter_map(|m| m.upsert.clone().map(|attrs| (m.path.clone(), attrs)))
        .collect();
    let deletes: Vec<Vec<u8>> = mutations
        .iter()
        .filter(|m| m.upsert.is_none())
        .map(|m| m.path.clone())
        .collect();

    if !upserts.is_empty() {
        let digests: HashSet<BlobHandle> = upserts.iter().map(|(_, a)| a.digest).collect();
        let digest_bytes: Vec<Vec<u8>> = digests.iter().map(|d| d.as_bytes().to_vec()).collect();

        let mut insert_blobs = sqlx::QueryBuilder::new("INSERT INTO blob (handle) ");
        insert_blobs.push_values(digest_bytes.iter(), |mut b, bytes| {
            b.push_bind(bytes.clone());
        });
        insert_blobs.push(" ON CONFLICT (handle) DO NOTHING");
        insert_blobs.build().execute(&mut *db).await?;
    }

    if !deletes.is_empty() {
        sqlx::query("DELETE FROM file WHERE volume_id = $1 AND path = ANY($2)")
            .bind(volume_id.value())
            .bind(&deletes)
            .execute(&mut *db)
            .await?;
    }

    if !upserts.is_empty() {
        let digest_bytes: Vec<Vec<u8>> = upserts
            .iter()
            .map(|(_, a)| a.digest.as_bytes().to_vec())
            .collect();
        let rows = sqlx::query("SELECT id, handle FROM blob WHERE handle = ANY($1)")
            .bind(&digest_bytes)
            .fetch_all(&mut *db)
            .await?;

        let mut blob_ids = std::collections::HashMap::new();
        for row in &rows {
            let id: i64 = row.try_get("id")?;
            let handle: BlobHandle = row.try_get("handle")?;
            blob_ids.insert(handle, id);
        }

        let mut builder = sqlx::QueryBuilder::new(
            "INSERT INTO file (volume_id, path, blob_id, size, mtime, lastverify) ",
        );
        builder.push_values(upserts.iter(), |mut b, (path, attrs)| {
            let blob_id = blob_ids.get(&attrs.digest).copied().unwrap_or(-1);
            b.push_bind(volume_id.value())
                .push_bind(path.clone())
                .push_bind(blob_id)
                .push_bind(attrs.size)
                .push_bind(attrs.mtime)
                .push_bind(attrs.lastverify);
        });
        builder.push(
            " ON CONFLICT (volume_id, path) DO UPDATE SET \
             blob_id = EXCLUDED.blob_id, size = EXCLUDED.size, mtime = EXCLUDED.mtime, \
             lastverify = EXCLUDED.lastverify",
        );
        builder.build().execute(&mut *db).await?;
    }

    Ok(())
}
