//! `tandem` binary entry point.

use std::process::ExitCode;

use clap::Parser;
use tandem_cli::{Cli, CliError, Role, Terminal, run_client, run_listener};
use tandem_core::{Controller, TcpConnector};
use tokio::{
    io::{self, BufReader},
    net::TcpListener,
};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging();

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(err) => {
            tracing::error!(error = %err, "failed to start async runtime");
            return ExitCode::FAILURE;
        },
    };

    let result = runtime.block_on(run(cli));

    // A pending stdin read holds a blocking thread; don't wait for it.
    runtime.shutdown_background();

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "tandem failed");
            ExitCode::FAILURE
        },
    }
}

/// Logs go to stderr so they never interleave with the message feed.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("tandem_cli=info,tandem_core=info"));

    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

/// Resolves on Ctrl-C. Never resolves if the handler can't be installed.
async fn interrupted() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("interrupted"),
        Err(err) => {
            tracing::warn!(error = %err, "cannot listen for Ctrl-C");
            std::future::pending::<()>().await;
        },
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config = cli.link_config();
    let input = BufReader::new(io::stdin());
    let terminal = Terminal::new(io::stdout());

    match cli.role {
        Role::Listen { bind, echo } => {
            let listener = TcpListener::bind(bind.as_str())
                .await
                .map_err(|source| CliError::Bind { addr: bind.clone(), source })?;
            run_listener(listener, config, echo, input, terminal, interrupted()).await
        },
        Role::Connect { endpoint } => {
            let connector = TcpConnector::new(config.connect_timeout, config.nodelay);
            let (controller, feed) = Controller::new(connector, config);
            run_client(controller, feed, endpoint, input, terminal, interrupted()).await
        },
    }
}
