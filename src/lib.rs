#[macro_use]
extern crate serde_with;

pub mod auth;
pub mod cmd;
pub mod config;
pub mod context;
pub mod error;
pub mod identity;
pub mod models;
pub mod query;
pub mod repo;
pub mod routes;
pub mod startup;

mod controllers;
mod cors;
mod shutdown;
