//! File listing and bulk mutation within a volume. Paths are opaque bytes
//! on the wire: URL-safe base64, never assumed to be UTF-8.

use std::collections::HashMap;

use axum::extract::{Extension, Path, Query};
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, Utc};
use hyper::StatusCode;
use serde::{Deserialize, Serialize};

use crate::context::AppContext;
use crate::error::AppError;
use crate::models::blob::BlobHandle;
use crate::models::file::{FileAttrs, FileMutation, FileWithDigest};
use crate::repo::files::{self, ListFilters, DEFAULT_LIMIT};
use crate::repo::volumes;

fn encode_path(path: &[u8]) -> String {
    base64::encode_config(path, base64::URL_SAFE_NO_PAD)
}

fn decode_path(encoded: &str) -> Result<Vec<u8>, AppError> {
    base64::decode_config(encoded, base64::URL_SAFE_NO_PAD)
        .map_err(|_| AppError::QueryShape(format!("`{}` is not valid URL-safe base64", encoded)))
}

#[derive(Debug, Serialize)]
pub struct FileView {
    pub path: String,
    pub size: i64,
    pub mtime: DateTime<Utc>,
    pub lastverify: DateTime<Utc>,
    pub digest: String,
}

fn view(file: &FileWithDigest) -> FileView {
    FileView {
        path: encode_path(&file.path),
        size: file.size,
        mtime: file.mtime,
        lastverify: file.lastverify,
        digest: file.digest.to_hex(),
    }
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub without_statements: bool,
    pub path: Option<String>,
    pub after: Option<String>,
    pub limit: Option<i64>,
}

pub async fn index(
    Extension(ctx): Extension<AppContext>,
    Path(reference): Path<String>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let filters = ListFilters {
        without_statements: query.without_statements,
        paths: match &query.path {
            Some(p) => vec![decode_path(p)?],
            None => Vec::new(),
        },
        after: query.after.as_deref().map(decode_path).transpose()?,
        limit: query.limit.unwrap_or(DEFAULT_LIMIT),
    };

    let mut txn = ctx.begin().await.map_err(AppError::from)?;
    let volume = volumes::get(&mut txn, &reference).await?;
    let rows = files::list(&mut txn, volume.id, &filters).await?;
    txn.commit().await.map_err(AppError::from)?;

    let views: Vec<FileView> = rows.iter().map(view).collect();

    Ok(Json(serde_json::json!({ "results": views })))
}

pub async fn show(
    Extension(ctx): Extension<AppContext>,
    Path((reference, path)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let decoded = decode_path(&path)?;

    let mut txn = ctx.begin().await.map_err(AppError::from)?;
    let volume = volumes::get(&mut txn, &reference).await?;
    let file = files::get_one(&mut txn, volume.id, &decoded).await?;
    txn.commit().await.map_err(AppError::from)?;

    Ok(Json(view(&file)))
}

/// One entry of a bulk mutation request: `Some` upserts the path with
/// these attributes, `null` deletes it.
#[derive(Debug, Deserialize)]
pub struct MutationEntry {
    pub digest: String,
    pub size: i64,
    pub mtime: DateTime<Utc>,
    pub lastverify: DateTime<Utc>,
}

pub async fn mutate(
    Extension(ctx): Extension<AppContext>,
    Path(reference): Path<String>,
    Json(body): Json<HashMap<String, Option<MutationEntry>>>,
) -> Result<impl IntoResponse, AppError> {
    let mutations = body
        .into_iter()
        .map(|(path, entry)| {
            let path = decode_path(&path)?;
            let upsert = entry
                .map(|attrs| {
                    let digest = BlobHandle::from_hex(&attrs.digest).ok_or_else(|| {
                        AppError::QueryShape(format!("`{}` is not a valid digest", attrs.digest))
                    })?;
                    Ok::<_, AppError>(FileAttrs {
                        digest,
                        size: attrs.size,
                        mtime: attrs.mtime,
                        lastverify: attrs.lastverify,
                    })
                })
                .transpose()?;

            Ok::<_, AppError>(FileMutation { path, upsert })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut txn = ctx.begin().await.map_err(AppError::from)?;
    let volume = volumes::get(&mut txn, &reference).await?;
    files::mutate(&mut txn, volume.id, mutations).await?;
    txn.commit().await.map_err(AppError::from)?;

    Ok(StatusCode::NO_CONTENT)
}
