//! Logging setup for binaries and tests embedding the SDK

/// Install a `tracing` fmt subscriber.
///
/// `RUST_LOG` wins over the default level (`info`, or `debug` when asked).
/// Returns `false` if a global subscriber was already installed, which is left as is.
pub fn init_logging(debug: bool) -> bool {
    let level = if debug { "debug" } else { "info" };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| level.into()),
        )
        .with_target(false)
        .with_thread_ids(debug)
        .with_line_number(debug)
        .with_file(debug)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_tolerated() {
        init_logging(true);
        assert!(!init_logging(false));
    }
}
