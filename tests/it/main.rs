use quadstore::config::{self, app_env::{self, AppEnv}};

#[macro_use]
extern crate ctor;

#[macro_use]
extern crate insta;

mod blobs;
mod files;
mod health_check;
mod query;
mod statements;
mod support;
mod transactions;
mod volumes;

/// Setup runs exactly once before any tests run. This allows the test suite to
/// perform any one-time setup.
#[ctor]
fn setup() {
    app_env::force_env(AppEnv::Test);

    // Resets the "control_test" template database and runs migrations
    // against it; every per-test database is cloned from this template.
    support::test_database::setup(config::settings().database.clone())
        .expect("to set up the template test database");
}

/// Teardown runs exactly once after all tests have run. This allows the test
/// suite to perform any one-time cleanup.
#[dtor]
fn teardown() {}
