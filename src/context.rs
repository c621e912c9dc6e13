use sqlx::{PgPool, Postgres, Transaction};

#[derive(Clone)]
pub struct AppContext {
    pool: PgPool,
}

impl AppContext {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The bare pool. Only for things that sit outside the per-request
    /// transaction, such as the health check's own connectivity probe.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Begins the transaction a request's handler reads and writes
    /// through. The handler commits it on success; letting it drop on any
    /// early `?` return rolls it back, since an uncommitted `Transaction`
    /// rolls back when dropped.
    pub async fn begin(&self) -> Result<Transaction<'static, Postgres>, sqlx::Error> {
        self.pool.begin().await
    }
}
