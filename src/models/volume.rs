use crate::models::id::RowId;

/// Marker type for `RowId<Volume>`.
pub struct Volume;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct VolumeRow {
    pub id: RowId<Volume>,
    pub reference: String,
}
