//! Seed the bootstrap statements into the development database. Useful for
//! getting started quickly after cloning or after a database reset.

use uuid::Uuid;

use quadstore::config;
use quadstore::identity::Registry;
use quadstore::models::statement::{FullStatement, StatementRef, Triple};
use quadstore::models::value::Value;
use quadstore::repo::statements;
use quadstore::startup;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let settings = config::settings();
    let db = startup::connect_to_postgres(&settings.database).await;

    seed_bootstrap_predicates(&db)
        .await
        .expect("to seed bootstrap statements");
}

async fn seed_bootstrap_predicates(db: &sqlx::PgPool) -> Result<(), anyhow::Error> {
    let type_handle = Uuid::new_v4();
    let type_predicate = statements::create_self_referential(db, type_handle).await?;
    let type_ref = type_predicate.as_ref();

    let names = [
        "name",
        "createdAt",
        "createdBy",
        "statementCount",
        "transactionContains",
        "Resource",
        "Transaction",
    ];

    let mut registry = Registry::new();
    let mut batch = Vec::new();
    for name in names {
        let handle = Uuid::new_v4();
        batch.push(FullStatement::unsaved(
            handle,
            Some(Triple {
                subject: StatementRef::new(handle),
                predicate: type_ref.clone(),
                object: Value::String(name.to_owned()),
            }),
        ));
    }

    statements::create_statements(db, &mut registry, batch).await?;

    Ok(())
}
