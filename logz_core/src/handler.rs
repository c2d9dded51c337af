//! Record sinks.
//!
//! A handler receives every record dispatched to its logger node whose
//! severity reaches the handler's own level, formats it and writes it out.

use crate::format::{ColorFormatter, Record};
use crate::{Error, Result, Severity};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Arc, Mutex};

/// A destination for log records
pub trait Handler: Send + Sync {
    /// Lowest severity this handler writes
    fn level(&self) -> Severity;

    /// Write one record
    fn handle(&self, record: &Record) -> io::Result<()>;
}

/// Shared in-memory sink, used in place of a console stream in tests
#[derive(Clone, Debug, Default)]
pub struct CaptureBuffer {
    inner: Arc<Mutex<Vec<u8>>>,
}

impl CaptureBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far
    pub fn contents(&self) -> String {
        let guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        String::from_utf8_lossy(&guard).into_owned()
    }

    /// Written lines, without their terminators
    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_string).collect()
    }

    pub fn clear(&self) {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }

    fn write_line(&self, line: &str) {
        let mut guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        guard.extend_from_slice(line.as_bytes());
    }
}

impl Write for CaptureBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        guard.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Console stream selector
#[derive(Clone, Debug, Default)]
pub enum ConsoleOutput {
    /// Stdout under an interactive notebook front-end, stderr otherwise
    #[default]
    Auto,
    Stdout,
    Stderr,
    Capture(CaptureBuffer),
}

impl ConsoleOutput {
    /// Replace `Auto` with the concrete stream for this process
    pub fn resolve(self, interactive: bool) -> Self {
        match self {
            ConsoleOutput::Auto if interactive => ConsoleOutput::Stdout,
            ConsoleOutput::Auto => ConsoleOutput::Stderr,
            other => other,
        }
    }
}

impl FromStr for ConsoleOutput {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "auto" => Ok(ConsoleOutput::Auto),
            "stdout" => Ok(ConsoleOutput::Stdout),
            "stderr" => Ok(ConsoleOutput::Stderr),
            _ => Err(Error::InvalidOutput(s.to_string())),
        }
    }
}

/// Notebook kernels are launched with a connection file as the last
/// argument (`.../kernel-1234.json`).
pub fn is_interactive_frontend() -> bool {
    is_kernel_invocation(std::env::args())
}

fn is_kernel_invocation<I: IntoIterator<Item = String>>(args: I) -> bool {
    args.into_iter()
        .last()
        .is_some_and(|arg| arg.ends_with("json"))
}

/// Writes formatted lines to a console stream
pub struct ConsoleHandler {
    output: ConsoleOutput,
    level: Severity,
    formatter: ColorFormatter,
}

impl ConsoleHandler {
    /// `output` should already be resolved; an unresolved `Auto` writes to
    /// stderr.
    pub fn new(output: ConsoleOutput, level: Severity, formatter: ColorFormatter) -> Self {
        Self {
            output: output.resolve(false),
            level,
            formatter,
        }
    }
}

impl Handler for ConsoleHandler {
    fn level(&self) -> Severity {
        self.level
    }

    fn handle(&self, record: &Record) -> io::Result<()> {
        let mut line = self.formatter.format(record);
        line.push('\n');

        match &self.output {
            ConsoleOutput::Stdout => {
                let mut out = io::stdout().lock();
                out.write_all(line.as_bytes())?;
                out.flush()
            }
            ConsoleOutput::Stderr | ConsoleOutput::Auto => {
                let mut err = io::stderr().lock();
                err.write_all(line.as_bytes())?;
                err.flush()
            }
            ConsoleOutput::Capture(buffer) => {
                buffer.write_line(&line);
                Ok(())
            }
        }
    }
}

/// Appends formatted lines to a file
pub struct FileHandler {
    path: PathBuf,
    file: Mutex<File>,
    level: Severity,
    formatter: ColorFormatter,
}

impl FileHandler {
    /// Open (or create) the log file for appending
    pub fn open(path: impl Into<PathBuf>, level: Severity, formatter: ColorFormatter) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        Ok(Self {
            path,
            file: Mutex::new(file),
            level,
            formatter,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Handler for FileHandler {
    fn level(&self) -> Severity {
        self.level
    }

    fn handle(&self, record: &Record) -> io::Result<()> {
        let mut line = self.formatter.format(record);
        line.push('\n');

        let mut file = self.file.lock().unwrap_or_else(|e| e.into_inner());
        file.write_all(line.as_bytes())?;
        file.flush()
    }
}

/// Forwards records to the ambient `tracing` subscriber
#[derive(Clone, Copy, Debug)]
pub struct TracingHandler {
    level: Severity,
}

impl Default for TracingHandler {
    fn default() -> Self {
        Self::new(Severity::Debug)
    }
}

impl TracingHandler {
    pub fn new(level: Severity) -> Self {
        Self { level }
    }
}

impl Handler for TracingHandler {
    fn level(&self) -> Severity {
        self.level
    }

    fn handle(&self, record: &Record) -> io::Result<()> {
        let logger = record.name.as_str();
        let message = record.message.as_str();
        match record.level {
            Severity::Debug => tracing::debug!(logger, "{}", message),
            Severity::Info => tracing::info!(logger, "{}", message),
            Severity::Warning => tracing::warn!(logger, "{}", message),
            Severity::Error | Severity::Critical => tracing::error!(logger, "{}", message),
        }
        Ok(())
    }
}
