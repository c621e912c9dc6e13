//! Persistence for blobs: id resolution and file-backed lookups.

use std::collections::HashMap;

use sqlx::{Postgres, Row, Transaction};

use crate::error::AppError;
use crate::identity::Registry;
use crate::models::blob::{Blob, BlobHandle, BlobRef};
use crate::models::id::RowId;

pub async fn fill_ids(
    db: &mut Transaction<'_, Postgres>,
    registry: &mut Registry,
    allow_create: bool,
) -> Result<(), AppError> {
    let handles: Vec<BlobHandle> = registry.blob_handles().copied().collect();
    if handles.is_empty() {
        return Ok(());
    }

    let digests: Vec<Vec<u8>> = handles.iter().map(|h| h.as_bytes().to_vec()).collect();
    let rows = sqlx::query("SELECT id, handle FROM blob WHERE handle = ANY($1)")
        .bind(&digests)
        .fetch_all(&mut *db)
        .await?;

    let mut found: HashMap<BlobHandle, RowId<Blob>> = HashMap::new();
    for row in &rows {
        let id: i64 = row.try_get("id")?;
        let handle: BlobHandle = row.try_get("handle")?;
        found.insert(handle, RowId::new(id));
    }

    for handle in &handles {
        if let Some(id) = found.get(handle) {
            registry.set_blob_id(handle, *id);
            continue;
        }

        if allow_create {
            let row = sqlx::query("INSERT INTO blob (handle) VALUES ($1) RETURNING id")
                .bind(handle)
                .fetch_one(&mut *db)
                .await?;
            let id: i64 = row.try_get("id")?;
            registry.set_blob_id(handle, RowId::new(id));
        } else {
            registry.set_blob_id(handle, RowId::unresolved());
        }
    }

    Ok(())
}

pub async fn get_by_digests(
    db: &mut Transaction<'_, Postgres>,
    digests: &[BlobHandle],
) -> Result<Vec<BlobRef>, AppError> {
    if digests.is_empty() {
        return Ok(vec![]);
    }

    let bytes: Vec<Vec<u8>> = digests.iter().map(|h| h.as_bytes().to_vec()).collect();
    let rows = sqlx::query("SELECT id, handle FROM blob WHERE handle = ANY($1)")
        .bind(&bytes)
        .fetch_all(&mut *db)
        .await?;

    rows.iter()
        .map(|row| {
            let id: i64 = row.try_get("id")?;
            let handle: BlobHandle = row.try_get("handle")?;
            Ok(BlobRef {
                handle,
                id: Some(RowId::new(id)),
            })
        })
        .collect()
}

pub async fn get_all(db: &mut Transaction<'_, Postgres>) -> Result<Vec<BlobRef>, AppError> {
    let rows = sqlx::query("SELECT id, handle FROM blob ORDER BY handle")
        .fetch_all(&mut *db)
        .await?;

    rows.iter()
        .map(|row| {
            let id: i64 = row.try_get("id")?;
            let handle: BlobHandle = row.try_get("handle")?;
            Ok(BlobRef {
                handle,
                id: Some(RowId::new(id)),
            })
        })
        .collect()
}

/// Registers a blob by digest, creating it if it doesn't already exist.
pub async fn ensure(
    db: &mut Transaction<'_, Postgres>,
    handle: BlobHandle,
) -> Result<BlobRef, AppError> {
    let row = sqlx::query(
        "INSERT INTO blob (handle) VALUES ($1) ON CONFLICT (handle) DO UPDATE SET handle = \
         EXCLUDED.handle RETURNING id",
    )
    .bind(handle)
    .fetch_one(&mut *db)
    .await?;
    let id: i64 = row.try_get("id")?;

    Ok(BlobRef {
        handle,
        id: Some(RowId::new(id)),
    })
}
