use crate::CommentscanResult;
use crate::error::CommentscanError;
pub use tracing::instrument;
pub use tracing::{debug, error, info, trace, warn};
use tracing_error::ErrorLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/* 📖 # Why log to stderr?
The scan command prints matches on stdout. Keeping log output on stderr lets the
results be piped into other tools untouched.
*/

/// Install the global subscriber.
///
/// `RUST_LOG` takes precedence; `default_filter` applies when it is unset.
pub fn init_tracing(default_filter: &str) -> CommentscanResult<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_filter).map_err(|e| {
            Box::new(CommentscanError::validation(format!(
                "Invalid log filter '{}': {}",
                default_filter, e
            )))
        })?,
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(ErrorLayer::default())
        .try_init()
        .map_err(|e| {
            Box::new(CommentscanError::message(format!(
                "Failed to initialize tracing: {}",
                e
            )))
        })?;
    Ok(())
}

/// Log at the highest severity. Emitted as an error event tagged `critical = true`.
#[macro_export]
macro_rules! critical {
    ($($arg:tt)+) => {
        $crate::tracing::error!(critical = true, $($arg)+)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_default_filter_is_rejected() {
        // Only reachable when RUST_LOG does not already supply a filter.
        if std::env::var("RUST_LOG").is_ok() {
            return;
        }
        let result = init_tracing("commentscan=[[[");
        assert!(result.is_err());
    }
}
