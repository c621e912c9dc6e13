use clap::Parser;

use quadstore::cmd;

#[derive(Debug, Parser)]
#[clap(name = "quadstore", version)]
struct Cli {
    #[clap(subcommand)]
    command: cmd::Command,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    cmd::run(cli.command)
}
