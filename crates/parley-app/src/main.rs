mod cli;
mod commands;

use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_DIRECTIVE: &str = "parley=warn";

/// Load `KEY=VALUE` lines from `./.env` without overriding the real
/// environment. Used for `HF_TOKEN` mostly.
fn load_dotenv() {
    let Ok(contents) = std::fs::read_to_string(".env") else {
        return;
    };
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            let key = key.trim();
            let value = value.trim().trim_matches('"').trim_matches('\'');
            if std::env::var(key).is_err() {
                std::env::set_var(key, value);
            }
        }
    }
}

/// `--log-level` wins over `RUST_LOG`; a bad directive falls back to the default.
fn log_filter(level: Option<&str>) -> EnvFilter {
    let from_flag = level.map(|l| {
        if l.contains('=') {
            l.to_string()
        } else {
            format!("parley={l}")
        }
    });
    match from_flag {
        Some(directive) => EnvFilter::try_new(directive).ok(),
        None => EnvFilter::try_from_default_env().ok(),
    }
    .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_DIRECTIVE))
}

fn main() {
    // Environment edits must happen before the runtime starts its threads.
    load_dotenv();
    let args = cli::parse();

    // Logs go to stderr so replies on stdout stay clean.
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(args.log_level.as_deref()))
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Parley v{} starting", env!("CARGO_PKG_VERSION"));

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("error: failed to start async runtime: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = runtime.block_on(commands::run(args)) {
        tracing::error!("{e}");
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
