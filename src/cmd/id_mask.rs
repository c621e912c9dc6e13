//! Operator debugging helper for the internal row-id type.
//!
//! `RowId<T>` carries no external encoding -- it's a bare surrogate key that
//! never leaves the process via serde, so there's no obfuscation scheme to
//! invert here. `encode`/`decode` both just validate that the given value is
//! a well-formed id and round-trip it through `RowId`'s `Debug` impl, so an
//! operator staring at a raw `statement.id` value from a `psql` session can
//! confirm it parses the same way the server would see it.
use std::str::FromStr;

use anyhow::anyhow;

use crate::models::id::RowId;
use crate::models::statement::Statement;

#[derive(clap::Args, Debug)]
pub struct Args {
    #[clap(subcommand)]
    pub mode: Mode,
}

#[derive(Debug, clap::Subcommand)]
pub enum Mode {
    /// Parse a raw id value and print its debug form.
    Decode { value: String },
    /// Validate a raw id value and print it back.
    Encode { value: String },
}

pub fn run(args: Args) -> anyhow::Result<()> {
    match args.mode {
        Mode::Decode { value } => decode(value),
        Mode::Encode { value } => encode(value),
    }
}

fn parse(value: &str) -> anyhow::Result<RowId<Statement>> {
    let raw = i64::from_str(value)
        .map_err(|_| anyhow!("The provided value `{}` does not appear to be an i64", value))?;
    Ok(RowId::new(raw))
}

fn decode(value: String) -> anyhow::Result<()> {
    let id = parse(&value)?;
    println!("{:?}", id);
    Ok(())
}

fn encode(value: String) -> anyhow::Result<()> {
    let id = parse(&value)?;
    println!("{}", id.value());
    Ok(())
}
