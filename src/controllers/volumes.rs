//! Volume lifecycle: create/fetch/delete/list by `reference`.

use axum::extract::{Extension, Path};
use axum::response::IntoResponse;
use axum::Json;
use hyper::StatusCode;
use serde::Serialize;

use crate::context::AppContext;
use crate::error::AppError;
use crate::models::volume::VolumeRow;
use crate::repo::volumes;

#[derive(Debug, Serialize)]
pub struct VolumeView {
    pub reference: String,
}

fn view(volume: &VolumeRow) -> VolumeView {
    VolumeView {
        reference: volume.reference.clone(),
    }
}

pub async fn index(Extension(ctx): Extension<AppContext>) -> Result<impl IntoResponse, AppError> {
    let mut txn = ctx.begin().await.map_err(AppError::from)?;
    let all = volumes::list(&mut txn).await?;
    txn.commit().await.map_err(AppError::from)?;

    Ok(Json(all.iter().map(view).collect::<Vec<_>>()))
}

pub async fn show(
    Extension(ctx): Extension<AppContext>,
    Path(reference): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let mut txn = ctx.begin().await.map_err(AppError::from)?;
    let volume = volumes::get(&mut txn, &reference).await?;
    txn.commit().await.map_err(AppError::from)?;

    Ok(Json(view(&volume)))
}

pub async fn create(
    Extension(ctx): Extension<AppContext>,
    Path(reference): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let mut txn = ctx.begin().await.map_err(AppError::from)?;
    let volume = volumes::create(&mut txn, &reference).await?;
    txn.commit().await.map_err(AppError::from)?;

    Ok((StatusCode::CREATED, Json(view(&volume))))
}

pub async fn delete(
    Extension(ctx): Extension<AppContext>,
    Path(reference): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let mut txn = ctx.begin().await.map_err(AppError::from)?;
    volumes::delete(&mut txn, &reference).await?;
    txn.commit().await.map_err(AppError::from)?;

    Ok(StatusCode::NO_CONTENT)
}
