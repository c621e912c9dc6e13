use sqlx::{Postgres, Transaction};

use crate::error::AppError;
use crate::models::volume::VolumeRow;

pub async fn create(db: &mut Transaction<'_, Postgres>, reference: &str) -> Result<VolumeRow, AppError> {
    sqlx::query_as::<_, VolumeRow>(
        "INSERT INTO volume (reference) VALUES ($1) RETURNING id, reference",
    )
    .bind(reference)
    .fetch_one(&mut *db)
    .await
    .map_err(AppError::from)
}

pub async fn delete(db: &mut Transaction<'_, Postgres>, reference: &str) -> Result<(), AppError> {
    sqlx::query("DELETE FROM volume WHERE reference = $1")
        .bind(reference)
        .execute(&mut *db)
        .await?;
    Ok(())
}

pub async fn get(db: &mut Transaction<'_, Postgres>, reference: &str) -> Result<VolumeRow, AppError> {
    sqlx::query_as::<_, VolumeRow>("SELECT id, reference FROM volume WHERE reference = $1")
        .bind(reference)
        .fetch_optional(&mut *db)
        .await?
        .ok_or(AppError::NotFound)
}

pub async fn list(db: &mut Transaction<'_, Postgres>) -> Result<Vec<VolumeRow>, AppError> {
    sqlx::query_as::<_, VolumeRow>("SELECT id, reference FROM volume ORDER BY reference")
        .fetch_all(&mut *db)
        .await
        .map_err(AppError::from)
}
