//! Seeds the bootstrap statements a fresh database needs before it's
//! useful: a self-referential `type` predicate (the one statement that
//! must describe itself, since nothing else exists yet to describe it
//! with), plus the handful of predicates the transaction-wrapping endpoint
//! depends on.
use uuid::Uuid;

use crate::cmd::{async_runtime, ConfigArgs};
use crate::config;
use crate::identity::Registry;
use crate::models::statement::{FullStatement, StatementRef, Triple};
use crate::models::value::Value;
use crate::repo::statements;
use crate::startup;

#[derive(clap::Args, Debug)]
pub struct Args {
    #[clap(flatten)]
    config: ConfigArgs,
}

pub fn run(args: Args) -> anyhow::Result<()> {
    config::load_settings(args.config.config_path)?;
    let runtime = async_runtime()?;

    runtime.block_on(async move {
        let db = startup::connect_to_postgres(&config::settings().database).await;
        seed_bootstrap_predicates(&db).await
    })
}

async fn seed_bootstrap_predicates(db: &sqlx::PgPool) -> anyhow::Result<()> {
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
