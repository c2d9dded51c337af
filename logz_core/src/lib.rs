#![forbid(unsafe_code)]

//! Named, preconfigured loggers with message normalization.
//!
//! This crate provides:
//! - A logger registry that builds each named logger once (console handler,
//!   colorizing formatter, level, propagation) and caches it
//! - Environment- and file-driven defaults ([`Settings`])
//! - Logger handles callable with strings, lists, mappings or any value,
//!   each expanded into printable lines
//! - A small logger hierarchy with handler propagation and quiet loggers

pub mod error;
pub mod level;
pub mod message;
pub mod format;
pub mod handler;
pub mod hierarchy;
pub mod config;
pub mod logger;
pub mod registry;
pub mod logging;

// Re-export commonly used types
pub use error::{Error, Result};
pub use level::Severity;
pub use message::{normalize, normalize_one, Message};
pub use format::{Callsite, ColorFormatter, Record, Template};
pub use handler::{CaptureBuffer, ConsoleOutput, Handler, TracingHandler};
pub use hierarchy::{Hierarchy, Node};
pub use config::{LoggerConfig, LoggerOptions, Settings};
pub use logger::{CallOptions, CallableLogger, LoggerHandle};
pub use registry::{get_logger, get_scoped_logger, global, init_global, Registry};
