//! Content-addressed blob registration and lookup by digest.

use axum::extract::{Extension, Path};
use axum::response::IntoResponse;
use axum::Json;
use hyper::StatusCode;
use serde::{Deserialize, Serialize};

use crate::context::AppContext;
use crate::error::AppError;
use crate::models::blob::{BlobHandle, BlobRef};
use crate::repo::blobs;

#[derive(Debug, Serialize)]
pub struct BlobView {
    pub digest: String,
}

fn view(blob: &BlobRef) -> BlobView {
    BlobView {
        digest: blob.handle.to_hex(),
    }
}

fn parse_digest(s: &str) -> Result<BlobHandle, AppError> {
    BlobHandle::from_hex(s).ok_or_else(|| AppError::QueryShape(format!("`{}` is not a valid digest", s)))
}

#[derive(Debug, Deserialize)]
pub struct NewBlob {
    pub digest: String,
}

pub async fn create(
    Extension(ctx): Extension<AppContext>,
    Json(body): Json<NewBlob>,
) -> Result<impl IntoResponse, AppError> {
    let handle = parse_digest(&body.digest)?;

    let mut txn = ctx.begin().await.map_err(AppError::from)?;
    let registered = blobs::ensure(&mut txn, handle).await?;
    txn.commit().await.map_err(AppError::from)?;

    Ok((StatusCode::CREATED, Json(view(&registered))))
}

pub async fn show(
    Extension(ctx): Extension<AppContext>,
    Path(digest): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let handle = parse_digest(&digest)?;

    let mut txn = ctx.begin().await.map_err(AppError::from)?;
    let matches = blobs::get_by_digests(&mut txn, &[handle]).await?;
    let blob = matches.into_iter().next().ok_or(AppError::NotFound)?;
    txn.commit().await.map_err(AppError::from)?;

    Ok(Json(view(&blob)))
}

pub async fn index(Extension(ctx): Extension<AppContext>) -> Result<impl IntoResponse, AppError> {
    let mut txn = ctx.begin().await.map_err(AppError::from)?;
    let all = blobs::get_all(&mut txn).await?;
    txn.commit().await.map_err(AppError::from)?;

    Ok(Json(all.iter().map(view).collect::<Vec<_>>()))
}
