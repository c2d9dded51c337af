//! Logger handles.
//!
//! A [`LoggerHandle`] wraps a configured hierarchy node and makes it
//! callable with any mix of messages: each call normalizes its messages
//! into lines and emits every line as its own record.
//!
//! ```rust,no_run
//! use logz_core::{logz, LoggerOptions, Message, Registry, Settings, Severity};
//!
//! let registry = Registry::new(Settings::from_env());
//! let log = registry.get_logger("worker", &LoggerOptions::new()).unwrap();
//!
//! log.info("starting");
//! log.log_all(vec![Message::from("jobs:"), Message::from(vec!["a", "b"])]);
//! logz!(log, level = Severity::Warning; "queue is", 90, "% full");
//! ```

use crate::config::LoggerConfig;
use crate::format::{Callsite, Record};
use crate::handler::Handler;
use crate::hierarchy::Node;
use crate::message::{normalize, Message};
use crate::Severity;
use std::fmt;
use std::panic::Location;
use std::sync::Arc;

/// Per-call overrides
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CallOptions {
    /// Severity of the emitted records; the logger's level when unset
    pub level: Option<Severity>,
    /// Split text messages on line breaks; the logger's default when unset
    pub split_newline: Option<bool>,
}

impl CallOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_level(mut self, level: Severity) -> Self {
        self.level = Some(level);
        self
    }

    /// Level by name; unknown names log at info
    pub fn with_level_name(self, name: &str) -> Self {
        self.with_level(Severity::from_name(name))
    }

    pub fn with_split_newline(mut self, split: bool) -> Self {
        self.split_newline = Some(split);
        self
    }
}

/// Something that can be called with a batch of log messages
pub trait CallableLogger {
    fn call(&self, messages: &[Message], options: &CallOptions, callsite: Callsite);
}

struct LoggerInner {
    config: LoggerConfig,
    node: Arc<Node>,
    /// Handlers this logger attached to its node
    handlers: Vec<Arc<dyn Handler>>,
}

/// A named, configured logger. Clones share the same logger.
#[derive(Clone)]
pub struct LoggerHandle {
    inner: Arc<LoggerInner>,
}

impl fmt::Debug for LoggerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggerHandle")
            .field("name", &self.name())
            .field("level", &self.level())
            .finish()
    }
}

impl LoggerHandle {
    pub(crate) fn new(config: LoggerConfig, node: Arc<Node>, handlers: Vec<Arc<dyn Handler>>) -> Self {
        Self {
            inner: Arc::new(LoggerInner {
                config,
                node,
                handlers,
            }),
        }
    }

    /// Remove this logger's own handlers from its node. Handlers attached
    /// by anyone else stay in place.
    pub(crate) fn detach(&self) {
        for handler in &self.inner.handlers {
            self.inner.node.remove_handler(handler);
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.config.name
    }

    /// Default severity of calls without an explicit level
    pub fn level(&self) -> Severity {
        self.inner.config.level
    }

    pub fn config(&self) -> &LoggerConfig {
        &self.inner.config
    }

    /// The hierarchy node this logger writes through
    pub fn node(&self) -> &Arc<Node> {
        &self.inner.node
    }

    /// True if both handles refer to the same logger
    pub fn ptr_eq(a: &LoggerHandle, b: &LoggerHandle) -> bool {
        Arc::ptr_eq(&a.inner, &b.inner)
    }

    pub fn is_enabled_for(&self, level: Severity) -> bool {
        self.inner.node.is_enabled_for(level)
    }

    /// Log one message at the default level
    #[track_caller]
    pub fn log(&self, message: impl Into<Message>) {
        self.log_with([message], &CallOptions::default());
    }

    /// Log several messages at the default level
    #[track_caller]
    pub fn log_all<I, M>(&self, messages: I)
    where
        I: IntoIterator<Item = M>,
        M: Into<Message>,
    {
        self.log_with(messages, &CallOptions::default());
    }

    #[track_caller]
    pub fn log_with<I, M>(&self, messages: I, options: &CallOptions)
    where
        I: IntoIterator<Item = M>,
        M: Into<Message>,
    {
        let messages: Vec<Message> = messages.into_iter().map(Into::into).collect();
        self.call(&messages, options, Callsite::from_location(Location::caller()));
    }

    #[track_caller]
    pub fn debug(&self, message: impl Into<Message>) {
        self.log_with([message], &CallOptions::new().with_level(Severity::Debug));
    }

    #[track_caller]
    pub fn info(&self, message: impl Into<Message>) {
        self.log_with([message], &CallOptions::new().with_level(Severity::Info));
    }

    #[track_caller]
    pub fn warning(&self, message: impl Into<Message>) {
        self.log_with([message], &CallOptions::new().with_level(Severity::Warning));
    }

    #[track_caller]
    pub fn error(&self, message: impl Into<Message>) {
        self.log_with([message], &CallOptions::new().with_level(Severity::Error));
    }

    #[track_caller]
    pub fn critical(&self, message: impl Into<Message>) {
        self.log_with([message], &CallOptions::new().with_level(Severity::Critical));
    }
}

impl CallableLogger for LoggerHandle {
    fn call(&self, messages: &[Message], options: &CallOptions, callsite: Callsite) {
        let config = &self.inner.config;
        let level = options.level.unwrap_or(config.level);
        if !self.inner.node.is_enabled_for(level) {
            return;
        }

        let split = options.split_newline.unwrap_or(config.split_newlines);
        for line in normalize(messages, split) {
            let record = Record::new(level, config.name.as_str(), line).with_callsite(callsite);
            self.inner.node.dispatch(&record);
        }
    }
}

#[doc(hidden)]
pub fn __trim_function_name(name: &'static str) -> &'static str {
    let name = name.strip_suffix("::f").unwrap_or(name);
    name.rsplit("::")
        .find(|segment| *segment != "{{closure}}")
        .unwrap_or(name)
}

#[doc(hidden)]
pub fn __last_path_segment(path: &'static str) -> &'static str {
    path.rsplit("::").next().unwrap_or(path)
}

/// Name of the enclosing function
#[macro_export]
macro_rules! function_name {
    () => {{
        fn f() {}
        fn type_name_of<T>(_: T) -> &'static str {
            ::std::any::type_name::<T>()
        }
        $crate::logger::__trim_function_name(type_name_of(f))
    }};
}

/// Call site of the macro invocation, with module and function names
#[macro_export]
macro_rules! callsite {
    () => {
        $crate::Callsite {
            module: Some($crate::logger::__last_path_segment(module_path!())),
            function: Some($crate::function_name!()),
            line: Some(line!()),
        }
    };
}

/// Log messages through a logger, capturing the calling function.
///
/// `logz!(log, "a", vec![1, 2])` logs at the logger's level;
/// `logz!(log, level = Severity::Error; "boom")` overrides it.
#[macro_export]
macro_rules! logz {
    ($logger:expr, level = $level:expr; $($msg:expr),+ $(,)?) => {{
        use $crate::CallableLogger as _;
        ($logger).call(
            &[$($crate::Message::from($msg)),+],
            &$crate::CallOptions::new().with_level($level),
            $crate::callsite!(),
        )
    }};
    ($logger:expr, $($msg:expr),+ $(,)?) => {{
        use $crate::CallableLogger as _;
        ($logger).call(
            &[$($crate::Message::from($msg)),+],
            &$crate::CallOptions::new(),
            $crate::callsite!(),
        )
    }};
}
