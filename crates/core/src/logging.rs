//! Tracing setup for hosts and the demo driver.

use std::fs::OpenOptions;
use std::path::Path;

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::prelude::*;

/// Directory for per-process log files. Logs go to stdout when unset.
pub const LOG_DIR_ENV: &str = "HORDE_LOG_DIR";

/// Filter used when `RUST_LOG` is unset.
pub fn default_filter(verbose: bool) -> EnvFilter {
	EnvFilter::new(if verbose { "debug" } else { "info" })
}

/// Installs the global subscriber.
///
/// Writes to `horde.{pid}.log` under [`LOG_DIR_ENV`] when it is set,
/// otherwise to stdout. A subscriber that is already installed is kept.
pub fn init(verbose: bool) {
	if let Ok(dir) = std::env::var(LOG_DIR_ENV)
		&& init_file(Path::new(&dir), verbose).is_ok()
	{
		return;
	}

	let level = if verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };
	let _ = tracing_subscriber::fmt().with_max_level(level).try_init();
}

fn init_file(dir: &Path, verbose: bool) -> std::io::Result<()> {
	std::fs::create_dir_all(dir)?;
	let path = dir.join(format!("horde.{}.log", std::process::id()));
	let file = OpenOptions::new().create(true).append(true).open(path)?;

	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(verbose));
	let layer = tracing_subscriber::fmt::layer()
		.with_writer(file)
		.with_ansi(false)
		.with_span_events(FmtSpan::CLOSE)
		.with_target(true);

	let _ = tracing_subscriber::registry().with(filter).with(layer).try_init();
	Ok(())
}
