use std::fmt;
use std::marker::PhantomData;

use sqlx::postgres::{PgArgumentBuffer, PgTypeInfo, PgValueRef};
use sqlx::{Decode, Encode, Postgres, Type};

/// An internal surrogate key for a row of type `T`.
///
/// `RowId` is deliberately opaque to the outside world: it has no
/// `Serialize`/`Deserialize` impl. Clients identify statements and blobs by
/// their handle, never by this id, so there is no code path through which a
/// `RowId` could end up in a JSON response.
pub struct RowId<T> {
    value: i64,
    _type: PhantomData<fn() -> T>,
}

impl<T> RowId<T> {
    pub fn new(value: i64) -> Self {
        Self {
            value,
            _type: PhantomData,
        }
    }

    pub fn value(&self) -> i64 {
        self.value
    }

    /// The sentinel id assigned to a reference that could not be resolved
    /// when `fill_ids` was called with `allow_create = false`. Any filter
    /// comparing against this id matches nothing, by construction: no row
    /// will ever have `id = -1`.
    pub fn unresolved() -> Self {
        Self::new(-1)
    }

    pub fn is_unresolved(&self) -> bool {
        self.value == -1
    }
}

impl<T> fmt::Debug for RowId<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RowId({})", self.value)
    }
}

impl<T> Clone for RowId<T> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<T> Copy for RowId<T> {}

impl<T> PartialEq for RowId<T> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}
impl<T> Eq for RowId<T> {}

impl<T> PartialOrd for RowId<T> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl<T> Ord for RowId<T> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.value.cmp(&other.value)
    }
}

impl<T> std::hash::Hash for RowId<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.value.hash(state);
    }
}

impl<T> Type<Postgres> for RowId<T> {
    fn type_info() -> PgTypeInfo {
        <i64 as Type<Postgres>>::type_info()
    }
}

impl<'q, T> Encode<'q, Postgres> for RowId<T> {
    fn encode_by_ref(&self, buf: &mut PgArgumentBuffer) -> sqlx::encode::IsNull {
        <i64 as Encode<Postgres>>::encode_by_ref(&self.value, buf)
    }
}

impl<'r, T> Decode<'r, Postgres> for RowId<T> {
    fn decode(value: PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let value = <i64 as Decode<Postgres>>::decode(value)?;
        Ok(RowId::new(value))
    }
}
