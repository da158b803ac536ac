mod cli;

use github_deps_mcp::server::{self, ServerOptions};
use github_deps_mcp::tools::TEXTS;
use github_deps_mcp::translations::Translations;
use log::info;
use tokio_util::sync::CancellationToken;

#[tokio::main(flavor = "current_thread")] // one request at a time over stdio
async fn main() -> anyhow::Result<()> {
    let matches = cli::build_cli().get_matches();
    let log_level = matches.get_one::<String>("log-level").cloned();

    cli::init_logging(log_level.as_deref());

    if matches.get_flag("version") {
        println!("github-deps-mcp {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    if matches.get_flag("export-translations") {
        let exported = Translations::from_env().export(&TEXTS);
        println!("{}", serde_json::to_string_pretty(&exported)?);
        return Ok(());
    }

    let options = ServerOptions {
        read_only: matches.get_flag("read-only"),
    };
    let shutdown = CancellationToken::new();
    let on_signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl-C");
            on_signal.cancel();
        }
    });

    server::run_stdio_server(options, shutdown).await
}
