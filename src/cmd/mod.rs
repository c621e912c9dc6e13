use std::path::PathBuf;

pub mod id_mask;
pub mod seed;
pub mod serve;
pub mod setup;

#[derive(Debug, clap::Subcommand)]
pub enum Command {
    /// Run the HTTP server.
    Serve(serve::Args),
    /// Create the database and run migrations.
    Setup(setup::Args),
    /// Insert the bootstrap statements a fresh database needs to be useful.
    Seed(seed::Args),
    /// Encode/decode the internal row-id type for operator debugging.
    IdMask(id_mask::Args),
}

pub fn run(command: Command) -> anyhow::Result<()> {
    match command {
        Command::Serve(args) => serve::run(args),
        Command::Setup(args) => setup::run(args),
        Command::Seed(args) => seed::run(args),
        Command::IdMask(args) => id_mask::run(args),
    }
}

/// Common `--config-path` flag shared by every subcommand that touches
/// settings.
#[derive(clap::Args, Debug)]
pub struct ConfigArgs {
    /// Directory containing `base.toml` and the environment-specific
    /// config file. Defaults to `./config`.
    #[clap(long)]
    pub config_path: Option<PathBuf>,
}

pub fn async_runtime() -> anyhow::Result<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?)
}
