use serde::{Deserialize, Serialize};
use sqlx::postgres::{PgArgumentBuffer, PgTypeInfo, PgValueRef};
use sqlx::{Decode, Encode, Postgres, Type};

use crate::models::id::RowId;

/// A SHA-256 digest identifying a content-addressed blob. This is the only
/// identity a `Blob` has; two blobs with the same digest are the same blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlobHandle([u8; 32]);

impl BlobHandle {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> Option<Self> {
        let bytes = hex::decode(s).ok()?;
        let array: [u8; 32] = bytes.try_into().ok()?;
        Some(Self(array))
    }

    pub fn digest(contents: &[u8]) -> Self {
        use sha2::{Digest, Sha256};

        let mut hasher = Sha256::new();
        hasher.update(contents);
        Self(hasher.finalize().into())
    }
}

impl Type<Postgres> for BlobHandle {
    fn type_info() -> PgTypeInfo {
        <Vec<u8> as Type<Postgres>>::type_info()
    }
}

impl<'q> Encode<'q, Postgres> for BlobHandle {
    fn encode_by_ref(&self, buf: &mut PgArgumentBuffer) -> sqlx::encode::IsNull {
        <&[u8] as Encode<Postgres>>::encode_by_ref(&self.0.as_slice(), buf)
    }
}

impl<'r> Decode<'r, Postgres> for BlobHandle {
    fn decode(value: PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let bytes = <Vec<u8> as Decode<Postgres>>::decode(value)?;
        let array: [u8; 32] = bytes
            .try_into()
            .map_err(|_| "blob handle must be exactly 32 bytes")?;
        Ok(BlobHandle(array))
    }
}

/// Marker type for `RowId<Blob>`.
pub struct Blob;

#[derive(Debug, Clone)]
pub struct BlobRef {
    pub handle: BlobHandle,
    pub id: Option<RowId<Blob>>,
}

impl BlobRef {
    pub fn new(handle: BlobHandle) -> Self {
        Self { handle, id: None }
    }
}
