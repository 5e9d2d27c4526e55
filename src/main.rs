use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = dtrain::Cli::parse();
    dtrain::init_tracing(cli.debug, cli.log_file.as_deref())?;
    dtrain::run(cli).await
}
