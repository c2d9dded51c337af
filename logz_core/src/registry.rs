//! Logger registry.
//!
//! The registry builds each named logger once and hands out the cached
//! handle afterwards. Lookup and construction happen under a single mutex,
//! so concurrent first requests for a name build exactly one logger.
//! Emitting through a handle never touches the registry lock.
//!
//! In single-logger mode (`Settings::multi_logger == false`) the first
//! logger built is returned for every later request, whatever name is
//! asked for, and options passed with later requests are ignored.
//!
//! Quiet loggers are held to errors on both sides: their logz nodes get
//! level `Error`, and their names join the registry's
//! [`QuietTargets`](crate::logging::QuietTargets) so `tracing` events from
//! crates of the same name are dropped too.

use crate::config::{LoggerConfig, LoggerOptions, Settings};
use crate::format::ColorFormatter;
use crate::handler::{ConsoleHandler, FileHandler, Handler};
use crate::hierarchy::Hierarchy;
use crate::logger::LoggerHandle;
use crate::logging::{quiet_targets, QuietTargets};
use crate::{Error, Result, Severity};
use once_cell::sync::OnceCell;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug)]
enum State {
    Multi(HashMap<String, LoggerHandle>),
    Single(Option<LoggerHandle>),
}

/// Cache of configured loggers, keyed by name
#[derive(Debug)]
pub struct Registry {
    settings: Settings,
    hierarchy: Arc<Hierarchy>,
    quiet: QuietTargets,
    state: Mutex<State>,
    constructed: AtomicUsize,
}

impl Registry {
    /// Create a registry with its own logger hierarchy
    pub fn new(settings: Settings) -> Self {
        Self::with_hierarchy(settings, Arc::new(Hierarchy::new()))
    }

    /// Create a registry over an existing hierarchy
    pub fn with_hierarchy(settings: Settings, hierarchy: Arc<Hierarchy>) -> Self {
        let state = if settings.multi_logger {
            State::Multi(HashMap::new())
        } else {
            State::Single(None)
        };
        Self {
            settings,
            hierarchy,
            quiet: quiet_targets().clone(),
            state: Mutex::new(state),
            constructed: AtomicUsize::new(0),
        }
    }

    /// Use `quiet` instead of the process-wide quiet target set
    pub fn with_quiet_targets(mut self, quiet: QuietTargets) -> Self {
        self.quiet = quiet;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn hierarchy(&self) -> &Arc<Hierarchy> {
        &self.hierarchy
    }

    pub fn quiet_targets(&self) -> &QuietTargets {
        &self.quiet
    }

    pub fn is_multi(&self) -> bool {
        self.settings.multi_logger
    }

    /// Get the logger for `name`, building it on first request.
    ///
    /// `options` only apply when the logger is built; later calls return
    /// the cached logger unchanged.
    pub fn get_logger(&self, name: &str, options: &LoggerOptions) -> Result<LoggerHandle> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());

        match &mut *state {
            State::Multi(loggers) => {
                if let Some(handle) = loggers.get(name) {
                    return Ok(handle.clone());
                }
                let handle = self.build(name, options)?;
                loggers.insert(name.to_string(), handle.clone());
                Ok(handle)
            }
            State::Single(slot) => {
                if let Some(handle) = slot {
                    if handle.name() != name {
                        tracing::debug!(
                            "Single logger mode: returning {:?} for requested {:?}",
                            handle.name(),
                            name
                        );
                    }
                    return Ok(handle.clone());
                }
                let handle = self.build(name, options)?;
                *slot = Some(handle.clone());
                Ok(handle)
            }
        }
    }

    /// Logger named after `Settings::base_name`
    pub fn default_logger(&self) -> Result<LoggerHandle> {
        self.get_logger(&self.settings.base_name, &LoggerOptions::default())
    }

    /// Deferred lookup: the returned closure resolves the logger each time
    /// it is called (building it on the first call).
    pub fn get_scoped_logger(
        self: &Arc<Self>,
        name: impl Into<String>,
        options: LoggerOptions,
    ) -> impl Fn() -> Result<LoggerHandle> + Send + Sync + 'static {
        let registry = Arc::clone(self);
        let name = name.into();
        move || registry.get_logger(&name, &options)
    }

    /// Number of loggers built so far
    pub fn constructed(&self) -> usize {
        self.constructed.load(Ordering::SeqCst)
    }

    /// Number of cached loggers
    pub fn len(&self) -> usize {
        match &*self.state.lock().unwrap_or_else(|e| e.into_inner()) {
            State::Multi(loggers) => loggers.len(),
            State::Single(slot) => usize::from(slot.is_some()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every cached logger and detach the handlers it attached to its
    /// node. Handles already given out stop writing through those
    /// handlers; the next request for a name builds a new logger.
    pub fn clear(&self) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let dropped: Vec<LoggerHandle> = match &mut *state {
            State::Multi(loggers) => loggers.drain().map(|(_, handle)| handle).collect(),
            State::Single(slot) => slot.take().into_iter().collect(),
        };
        for handle in &dropped {
            handle.detach();
        }
        tracing::debug!("Cleared {} cached loggers", dropped.len());
    }

    fn build(&self, name: &str, options: &LoggerOptions) -> Result<LoggerHandle> {
        let config = LoggerConfig::resolve(name, &self.settings, options)?;

        let console = ConsoleHandler::new(
            config.console_output.clone(),
            config.level,
            ColorFormatter::new(&config.line_template, config.date_format.as_str(), config.console_color),
        );

        // Open the file first so a failure leaves the node untouched
        let file = match &config.logfile {
            Some(logfile) => Some(FileHandler::open(
                &logfile.path,
                logfile.level,
                ColorFormatter::new(&config.line_template, config.date_format.as_str(), logfile.color),
            )?),
            None => None,
        };

        let node = self.hierarchy.node(name);
        node.set_level(config.level);

        if config.clear_handlers && node.has_handlers() {
            node.clear_handlers();
        }
        let mut handlers: Vec<Arc<dyn Handler>> = vec![Arc::new(console)];
        if let Some(file) = file {
            handlers.push(Arc::new(file));
        }
        for handler in &handlers {
            node.add_handler(Arc::clone(handler));
        }

        for quiet in &config.quiet_loggers {
            self.hierarchy.node(quiet).set_level(Severity::Error);
            self.quiet.insert(quiet);
        }

        node.set_propagate(config.propagate);

        self.constructed.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(
            "Built logger {:?} (level {}, {} handlers, propagate {})",
            name,
            config.level,
            node.handler_count(),
            config.propagate
        );

        Ok(LoggerHandle::new(config, node, handlers))
    }
}

static GLOBAL: OnceCell<Arc<Registry>> = OnceCell::new();

/// Install the process-wide registry. Call once at startup, before any
/// use of [`global`].
pub fn init_global(settings: Settings) -> Result<Arc<Registry>> {
    let registry = Arc::new(Registry::new(settings));
    GLOBAL
        .set(Arc::clone(&registry))
        .map_err(|_| Error::AlreadyInitialized)?;
    Ok(registry)
}

/// The process-wide registry, initialized from [`Settings::load`] on first
/// use if [`init_global`] was not called.
pub fn global() -> Arc<Registry> {
    Arc::clone(GLOBAL.get_or_init(|| {
        let settings = Settings::load().unwrap_or_else(|e| {
            tracing::warn!("Failed to load logz settings: {}. Using environment only.", e);
            Settings::from_env()
        });
        Arc::new(Registry::new(settings))
    }))
}

/// [`Registry::get_logger`] on the process-wide registry
pub fn get_logger(name: &str, options: &LoggerOptions) -> Result<LoggerHandle> {
    global().get_logger(name, options)
}

/// [`Registry::get_scoped_logger`] on the process-wide registry; the
/// registry itself is only looked up when the closure is called.
pub fn get_scoped_logger(
    name: impl Into<String>,
    options: LoggerOptions,
) -> impl Fn() -> Result<LoggerHandle> + Send + Sync + 'static {
    let name = name.into();
    move || global().get_logger(&name, &options)
}
