use std::sync::Once;

use tracing_subscriber::{fmt, EnvFilter};

static INIT: Once = Once::new();

/// Install the tracing subscriber for standalone (non-embedded) use.
///
/// Filtering defaults to `info` for this crate and can be overridden with
/// `RUST_LOG` / `WALLETBOOK_LOG`. Safe to call more than once; only the
/// first call installs a subscriber.
pub fn init() {
    INIT.call_once(|| {
        let filter = std::env::var("WALLETBOOK_LOG")
            .ok()
            .and_then(|spec| spec.parse::<EnvFilter>().ok())
            .unwrap_or_else(|| {
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new("walletbook=info"))
            });

        let _ = fmt()
            .with_env_filter(filter)
            .with_target(true)
            .try_init();
    });
}
