//! Logging setup

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::{Error, Result};

/// Install a global fmt subscriber filtered at `level`
///
/// `RUST_LOG` takes precedence when set. A subscriber installed earlier
/// stays in place, so calling this twice is harmless.
pub fn setup_logging(level: &str) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level)
            .map_err(|e| Error::Config(format!("invalid log level {:?}: {}", level, e)))?,
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_thread_ids(false))
        .with(filter)
        .try_init()
        .ok();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setup_twice_is_harmless() {
        assert!(setup_logging("debug").is_ok());
        assert!(setup_logging("info").is_ok());
    }
}
