use clap::Parser;
use tracing_subscriber::EnvFilter;

#[cfg(feature = "use_mimalloc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

fn main() -> miette::Result<()> {
    let config = wst_run::Config::from_env();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)))
        .with_writer(std::io::stderr)
        .init();

    let cli = wst_run::Cli::parse();
    tracing::debug!(?cli, ?config, "starting");
    cli.run(&config)
}
