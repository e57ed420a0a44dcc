use std::io::Write;

use env_logger::{Builder, Env};
use log::Level;

use crate::config::ApiLogLevel;

const LOG_ENV: &str = "TEXTSHAPER_LOG";
pub(crate) const BACKEND_TARGET: &str = "textshaper::backend";

/// Default filter: `warn`, `debug` with `--verbose`, and the backend module
/// opened up to `--log-api-level`.
fn default_filter(verbose: bool, api_level: ApiLogLevel) -> String {
    if verbose {
        return "debug".to_string();
    }
    match api_level {
        ApiLogLevel::Off => "warn".to_string(),
        ApiLogLevel::Info => format!("warn,{BACKEND_TARGET}=info"),
        ApiLogLevel::Debug => format!("warn,{BACKEND_TARGET}=debug"),
    }
}

/// Installs the stderr logger. `TEXTSHAPER_LOG` overrides the default filter.
pub fn init(verbose: bool, api_level: ApiLogLevel) {
    let filter = default_filter(verbose, api_level);
    let env = Env::default().filter_or(LOG_ENV, filter);

    let _ = Builder::from_env(env)
        .format(|buf, record| {
            let level_color = match record.level() {
                Level::Error => "31",
                Level::Warn => "33",
                Level::Info => "32",
                Level::Debug => "36",
                Level::Trace => "35",
            };
            writeln!(
                buf,
                "\x1B[{}m[{}]\x1B[0m [{}] {}",
                level_color,
                record.level(),
                buf.timestamp(),
                record.args()
            )
        })
        .format_timestamp_secs()
        .target(env_logger::Target::Stderr)
        .try_init();
}
