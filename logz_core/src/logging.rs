//! Tracing setup for binaries using logz.
//!
//! logz reports its own diagnostics (logger construction, handler write
//! failures) through `tracing`. These helpers install a subscriber for
//! them; records forwarded by a `TracingHandler` land here too.
//!
//! Third-party crates log through `tracing` rather than through logz
//! loggers, so quiet loggers are also applied to `tracing` targets: a
//! [`QuietLayer`] drops every event below ERROR whose target is held in
//! the shared [`QuietTargets`] set. Registries add their configured quiet
//! loggers to that set whenever they build a logger.

use once_cell::sync::Lazy;
use std::sync::{Arc, RwLock};
use tracing::subscriber::Interest;
use tracing::{Level, Metadata, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

static QUIET_TARGETS: Lazy<QuietTargets> = Lazy::new(QuietTargets::new);

/// Quiet set shared by [`init_with_quiet`] and every registry built with
/// `Registry::new`
pub fn quiet_targets() -> &'static QuietTargets {
    &QUIET_TARGETS
}

/// Set of `tracing` targets held to errors only
#[derive(Clone, Debug, Default)]
pub struct QuietTargets {
    inner: Arc<RwLock<Vec<String>>>,
}

impl QuietTargets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold `name` (and its `name::` submodules) to errors only
    pub fn insert(&self, name: &str) {
        let name = name.trim();
        if name.is_empty() {
            return;
        }
        let mut targets = self.inner.write().unwrap_or_else(|e| e.into_inner());
        if !targets.iter().any(|t| t == name) {
            targets.push(name.to_string());
        }
    }

    pub fn names(&self) -> Vec<String> {
        self.inner.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// True if `target` is a quiet name or a module below one
    pub fn is_quiet(&self, target: &str) -> bool {
        let targets = self.inner.read().unwrap_or_else(|e| e.into_inner());
        targets.iter().any(|name| {
            target
                .strip_prefix(name.as_str())
                .is_some_and(|rest| rest.is_empty() || rest.starts_with("::"))
        })
    }

    /// Filtering layer backed by this set
    pub fn layer(&self) -> QuietLayer {
        QuietLayer {
            targets: self.clone(),
        }
    }
}

/// Drops non-error events from quiet targets
#[derive(Clone, Debug)]
pub struct QuietLayer {
    targets: QuietTargets,
}

impl<S: Subscriber> Layer<S> for QuietLayer {
    fn register_callsite(&self, _metadata: &'static Metadata<'static>) -> Interest {
        // The set grows at runtime, so every callsite is re-checked
        Interest::sometimes()
    }

    fn enabled(&self, metadata: &Metadata<'_>, _ctx: Context<'_, S>) -> bool {
        *metadata.level() == Level::ERROR || !self.targets.is_quiet(metadata.target())
    }
}

/// Initialize tracing at `warn`, overridable with RUST_LOG
pub fn init() {
    init_with_level("warn")
}

/// Initialize tracing with a specific default level
///
/// # Arguments
/// * `default_level` - Default level (debug, info, warn, error)
///
/// This can still be overridden by RUST_LOG environment variable.
pub fn init_with_level(default_level: &str) {
    init_with_quiet(default_level, &[]);
}

/// Initialize tracing and hold the given targets to errors only
pub fn init_with_quiet(default_level: &str, quiet: &[String]) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    for name in quiet {
        QUIET_TARGETS.insert(name);
    }

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(QUIET_TARGETS.layer())
        .with(fmt::layer().compact().with_writer(std::io::stderr))
        .try_init();
}

/// Initialize logging for testing (captures logs for test output)
#[cfg(test)]
pub fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(EnvFilter::new("debug"))
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::CaptureBuffer;

    fn capture_subscriber(quiet: &QuietTargets, buffer: &CaptureBuffer) -> impl Subscriber + Send + Sync {
        let buffer = buffer.clone();
        tracing_subscriber::registry().with(quiet.layer()).with(
            fmt::layer()
                .with_ansi(false)
                .without_time()
                .with_writer(move || buffer.clone()),
        )
    }

    #[test]
    fn test_init_twice_is_harmless() {
        init_test();
        init_with_quiet("info", &["noisy".to_string()]);
        init();
        assert!(quiet_targets().is_quiet("noisy"));
    }

    #[test]
    fn test_quiet_target_matching() {
        let quiet = QuietTargets::new();
        quiet.insert("hyper");
        quiet.insert("hyper");
        quiet.insert("  ");

        assert_eq!(quiet.names(), vec!["hyper"]);
        assert!(quiet.is_quiet("hyper"));
        assert!(quiet.is_quiet("hyper::client::pool"));
        assert!(!quiet.is_quiet("hyperlocal"));
        assert!(!quiet.is_quiet("reqwest"));
    }

    #[test]
    fn test_quiet_layer_keeps_errors_only() {
        let quiet = QuietTargets::new();
        let buffer = CaptureBuffer::new();

        tracing::subscriber::with_default(capture_subscriber(&quiet, &buffer), || {
            tracing::warn!(target: "chatty_dep", "before quieting");
            quiet.insert("chatty_dep");
            tracing::warn!(target: "chatty_dep", "after quieting");
            tracing::error!(target: "chatty_dep", "real failure");
            tracing::warn!(target: "other_dep", "unrelated");
        });

        let output = buffer.contents();
        assert!(output.contains("before quieting"));
        assert!(!output.contains("after quieting"));
        assert!(output.contains("real failure"));
        assert!(output.contains("unrelated"));
    }
}
