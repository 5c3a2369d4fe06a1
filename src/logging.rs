//! Logger setup for the viewer binary. The library only talks to the `log`
//! facade.

use env_logger::{Builder, Env};

/// Filter applied when `RUST_LOG` is unset
pub const DEFAULT_FILTER: &str = "info";

/// Install the global logger; `RUST_LOG` overrides `default_filter`.
/// Returns false if a logger was already installed.
pub fn init_logging(default_filter: &str) -> bool {
    Builder::from_env(Env::default().default_filter_or(default_filter))
        .format_timestamp_millis()
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_rejected() {
        init_logging(DEFAULT_FILTER);
        assert!(!init_logging("trace"));
        assert!(log::log_enabled!(log::Level::Error));
    }
}
