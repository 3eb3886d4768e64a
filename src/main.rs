use clap::Parser;

use spy_helmet_lib::cli::{execute, Cli};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let state = spy_helmet_lib::run(spy_helmet_lib::data_dir_from_env())?;
    execute(&state, cli.command).await
}
