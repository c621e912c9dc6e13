//! Builders for test fixtures: the handful of bootstrap predicates a fresh
//! database needs (mirroring `cmd::seed`'s runtime behavior, since that
//! logic isn't reachable from outside the binary), plus small helpers for
//! wiring up ad hoc statements in a test.

use sqlx::PgPool;
use uuid::Uuid;

use quadstore::identity::Registry;
use quadstore::models::statement::{FullStatement, StatementRef, Triple};
use quadstore::models::value::Value;
use quadstore::repo::statements;

/// Handles for the predicates every test needs seeded before it can create
/// anything meaningful: `type` (self-referential), and the handful of
/// predicates the transaction-wrapping endpoint looks up by name.
pub struct Bootstrap {
    pub type_handle: Uuid,
    pub name: Uuid,
    pub created_at: Uuid,
    pub created_by: Uuid,
    pub statement_count: Uuid,
    pub transaction_contains: Uuid,
    pub resource: Uuid,
    pub transaction: Uuid,
}

/// Seeds the same bootstrap predicates `cmd::seed` installs on a fresh
/// database, and returns their handles for use in test assertions.
pub async fn seed_bootstrap(db: &PgPool) -> Bootstrap {
    let mut txn = db.begin().await.expect("to begin a transaction");

    let type_handle = Uuid::new_v4();
    let type_predicate = statements::create_self_referential(&mut txn, type_handle)
        .await
        .expect("to seed the `type` predicate");
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

    let mut handles = Vec::new();
    let mut registry = Registry::new();
    let mut batch = Vec::new();
    for name in names {
        let handle = Uuid::new_v4();
        handles.push(handle);
        batch.push(FullStatement::unsaved(
            handle,
            Some(Triple {
                subject: StatementRef::new(handle),
                predicate: type_ref.clone(),
                object: Value::String(name.to_owned()),
            }),
        ));
    }

    statements::create_statements(&mut txn, &mut registry, batch)
        .await
        .expect("to seed the bootstrap predicate names");

    txn.commit().await.expect("to commit the bootstrap seed");

    Bootstrap {
        type_handle,
        name: handles[0],
        created_at: handles[1],
        created_by: handles[2],
        statement_count: handles[3],
        transaction_contains: handles[4],
        resource: handles[5],
        transaction: handles[6],
    }
}

/// Creates a single statement with a fresh handle and the given triple.
pub async fn create_statement(
    db: &PgPool,
    subject: Uuid,
    predicate: Uuid,
    object: Value,
) -> FullStatement {
    let handle = Uuid::new_v4();
    let mut registry = Registry::new();
    let batch = vec![FullStatement::unsaved(
        handle,
        Some(Triple {
            subject: StatementRef::new(subject),
            predicate: StatementRef::new(predicate),
            object,
        }),
    )];

    let mut txn = db.begin().await.expect("to begin a transaction");
    let saved = statements::create_statements(&mut txn, &mut registry, batch)
        .await
        .expect("to create test statement")
        .into_iter()
        .next()
        .expect("exactly one statement created");
    txn.commit().await.expect("to commit test statement");

    saved
}

/// A "class" marker: a bare statement handle used only as the object of a
/// `type` triple elsewhere, with no triple of its own.
pub fn new_class() -> Uuid {
    Uuid::new_v4()
}
