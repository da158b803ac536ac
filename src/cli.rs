use clap::{Arg, ArgAction, Command};

pub fn build_cli() -> Command {
    Command::new("github-deps-mcp")
        .about("GitHub issue dependencies MCP server (stdio JSON-RPC)")
        .disable_version_flag(true)
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .num_args(1)
                .help("Override RUST_LOG level (e.g., info, debug)"),
        )
        .arg(
            Arg::new("version")
                .long("version")
                .help("Print version and exit")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("read-only")
                .long("read-only")
                .help("Only expose the list tools")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("export-translations")
                .long("export-translations")
                .help("Print tool title/description keys with their current values as JSON and exit")
                .action(ArgAction::SetTrue),
        )
}

// Logs go to stderr; stdout is reserved for JSON-RPC.
pub fn init_logging(level: Option<&str>) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if let Some(lvl) = level {
        builder.parse_filters(lvl);
    }
    builder.target(env_logger::Target::Stderr).init();
}
