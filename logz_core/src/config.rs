//! Configuration for logz.
//!
//! Process-wide defaults ([`Settings`]) are read once at startup from an
//! optional TOML file (`$LOGZ_CONFIG`, else `$XDG_CONFIG_HOME/logz/config.toml`)
//! and then overridden by `LOGZ_*` environment variables. Each logger's
//! final configuration ([`LoggerConfig`]) is resolved from those defaults
//! and the call-site [`LoggerOptions`].

use crate::format::{DEFAULT_DATE_FORMAT, DEFAULT_TEMPLATE, NAME_PLACEHOLDER};
use crate::handler::{is_interactive_frontend, ConsoleOutput};
use crate::{Result, Severity};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV: &str = "LOGZ_CONFIG";

/// Process-wide logger defaults
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub level: Severity,

    /// One logger per name (`true`) or a single logger for the process
    #[serde(default = "default_true")]
    pub multi_logger: bool,

    /// Name used when no logger name is given
    #[serde(default = "default_base_name")]
    pub base_name: String,

    /// strftime-style timestamp format
    #[serde(default = "default_date_format")]
    pub date_format: String,

    #[serde(default = "default_true")]
    pub propagate: bool,

    #[serde(default)]
    pub clear_handlers: bool,

    #[serde(default)]
    pub split_newlines: bool,

    /// Loggers forced to error level whenever a logger is built
    #[serde(default)]
    pub quiet_loggers: Vec<String>,

    #[serde(default)]
    pub console: ConsoleSettings,

    #[serde(default)]
    pub logfile: LogfileSettings,

    /// Running under a notebook front-end
    #[serde(skip)]
    pub interactive: bool,
}

/// Console handler defaults
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConsoleSettings {
    /// `auto`, `stdout` or `stderr`
    #[serde(default = "default_console_output")]
    pub output: String,

    #[serde(default = "default_true")]
    pub color: bool,

    #[serde(default = "default_template")]
    pub template: String,
}

impl Default for ConsoleSettings {
    fn default() -> Self {
        Self {
            output: default_console_output(),
            color: true,
            template: default_template(),
        }
    }
}

/// File handler defaults; no file handler is attached without a path
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LogfileSettings {
    #[serde(default)]
    pub path: Option<PathBuf>,

    #[serde(default = "default_logfile_level")]
    pub level: Severity,

    #[serde(default)]
    pub color: bool,
}

impl Default for LogfileSettings {
    fn default() -> Self {
        Self {
            path: None,
            level: default_logfile_level(),
            color: false,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            level: Severity::Info,
            multi_logger: true,
            base_name: default_base_name(),
            date_format: default_date_format(),
            propagate: true,
            clear_handlers: false,
            split_newlines: false,
            quiet_loggers: Vec::new(),
            console: ConsoleSettings::default(),
            logfile: LogfileSettings::default(),
            interactive: false,
        }
    }
}

// Default value functions
fn default_true() -> bool {
    true
}

fn default_base_name() -> String {
    "logz".into()
}

fn default_date_format() -> String {
    DEFAULT_DATE_FORMAT.into()
}

fn default_console_output() -> String {
    "auto".into()
}

fn default_template() -> String {
    DEFAULT_TEMPLATE.into()
}

fn default_logfile_level() -> Severity {
    Severity::Debug
}

/// `true`, `yes` and `1` (any case) are true; everything else is false
fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "true" | "yes" | "1")
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

impl Settings {
    /// Load settings the way a process does at startup: config file if
    /// present, then environment overrides.
    pub fn load() -> Result<Self> {
        let explicit = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
        let mut settings = match explicit.or_else(Self::default_config_path) {
            Some(path) if path.exists() => Self::load_from(&path)?,
            _ => {
                tracing::debug!("No logz config file found, using defaults");
                Self::default()
            }
        };
        settings.apply_env();
        Ok(settings)
    }

    /// Defaults plus environment overrides, without reading any file
    pub fn from_env() -> Self {
        let mut settings = Self::default();
        settings.apply_env();
        settings
    }

    /// Load settings from a specific TOML file
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let settings: Settings = toml::from_str(&contents)?;
        tracing::debug!("Loaded logz config from {:?}", path);
        Ok(settings)
    }

    /// Standard config file location, if the platform has a config dir
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|base| base.join("logz").join("config.toml"))
    }

    /// Apply `LOGZ_*` overrides from the process environment
    pub fn apply_env(&mut self) {
        self.apply_env_with(|key| std::env::var(key).ok());
        self.interactive = is_interactive_frontend();
    }

    /// Apply `LOGZ_*` overrides using `lookup` as the environment
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("LOGZ_LOGLEVEL") {
            self.level = Severity::from_name(&v);
        }
        if let Some(v) = lookup("LOGZ_MULTI_LOGGER") {
            self.multi_logger = parse_flag(&v);
        }
        if let Some(v) = lookup("LOGZ_CLS_NAME") {
            self.base_name = v;
        }
        if let Some(v) = lookup("LOGZ_DTIME_FORMAT") {
            self.date_format = v;
        }
        if let Some(v) = lookup("LOGZ_COLOR_DISABLED") {
            self.console.color = !parse_flag(&v);
        }
        if let Some(v) = lookup("LOGZ_CONSOLE_LOG_OUTPUT") {
            self.console.output = v;
        }
        if let Some(v) = lookup("LOGZ_LOGLINE_TEMPLATE") {
            self.console.template = v;
        }
        if let Some(v) = lookup("LOGZ_LOGFILE_LOG_LEVEL") {
            self.logfile.level = Severity::from_name(&v);
        }
        if let Some(v) = lookup("LOGZ_LOGFILE_FILE") {
            self.logfile.path = (!v.is_empty()).then(|| PathBuf::from(v));
        }
        if let Some(v) = lookup("LOGZ_LOGFILE_COLOR_ENABLED") {
            self.logfile.color = parse_flag(&v);
        }
        if let Some(v) = lookup("LOGZ_PROPAGATE") {
            self.propagate = parse_flag(&v);
        }
        if let Some(v) = lookup("LOGZ_CLEAR_HANDLERS") {
            self.clear_handlers = parse_flag(&v);
        }
        if let Some(v) = lookup("LOGZ_SPLIT_NEWLINES") {
            self.split_newlines = parse_flag(&v);
        }
        if let Some(v) = lookup("LOGZ_QUIET_LOGGERS") {
            self.quiet_loggers = parse_list(&v);
        }
    }
}

/// Call-site overrides for a new logger. Unset fields use [`Settings`].
#[derive(Clone, Debug, Default)]
pub struct LoggerOptions {
    pub level: Option<Severity>,
    pub console_output: Option<ConsoleOutput>,
    pub color: Option<bool>,
    pub template: Option<String>,
    pub date_format: Option<String>,
    pub propagate: Option<bool>,
    pub clear_handlers: Option<bool>,
    pub split_newlines: Option<bool>,
    pub quiet_loggers: Option<Vec<String>>,
    pub logfile: Option<PathBuf>,
    pub logfile_level: Option<Severity>,
    pub logfile_color: Option<bool>,
}

impl LoggerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_level(mut self, level: Severity) -> Self {
        self.level = Some(level);
        self
    }

    pub fn with_output(mut self, output: ConsoleOutput) -> Self {
        self.console_output = Some(output);
        self
    }

    pub fn with_color(mut self, color: bool) -> Self {
        self.color = Some(color);
        self
    }

    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = Some(template.into());
        self
    }

    pub fn with_date_format(mut self, date_format: impl Into<String>) -> Self {
        self.date_format = Some(date_format.into());
        self
    }

    pub fn with_propagate(mut self, propagate: bool) -> Self {
        self.propagate = Some(propagate);
        self
    }

    pub fn with_clear_handlers(mut self, clear: bool) -> Self {
        self.clear_handlers = Some(clear);
        self
    }

    pub fn with_split_newlines(mut self, split: bool) -> Self {
        self.split_newlines = Some(split);
        self
    }

    pub fn with_quiet_loggers<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.quiet_loggers = Some(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_logfile(mut self, path: impl Into<PathBuf>) -> Self {
        self.logfile = Some(path.into());
        self
    }

    pub fn with_logfile_level(mut self, level: Severity) -> Self {
        self.logfile_level = Some(level);
        self
    }

    pub fn with_logfile_color(mut self, color: bool) -> Self {
        self.logfile_color = Some(color);
        self
    }
}

/// File handler configuration of one logger
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogfileConfig {
    pub path: PathBuf,
    pub level: Severity,
    pub color: bool,
}

/// Fully resolved configuration of one logger
#[derive(Clone, Debug)]
pub struct LoggerConfig {
    pub name: String,
    pub level: Severity,
    /// Concrete stream; never `Auto`
    pub console_output: ConsoleOutput,
    pub console_color: bool,
    /// Template with the name placeholder already substituted
    pub line_template: String,
    pub date_format: String,
    pub propagate: bool,
    pub clear_handlers: bool,
    pub split_newlines: bool,
    pub quiet_loggers: Vec<String>,
    pub logfile: Option<LogfileConfig>,
}

impl LoggerConfig {
    /// Merge call-site options over process defaults.
    ///
    /// Fails if the configured console output is not a known stream name.
    pub fn resolve(name: &str, settings: &Settings, options: &LoggerOptions) -> Result<Self> {
        let console_output = match &options.console_output {
            Some(output) => output.clone(),
            None => settings.console.output.parse()?,
        }
        .resolve(settings.interactive);

        let template = options
            .template
            .as_deref()
            .unwrap_or(&settings.console.template);

        let logfile = options
            .logfile
            .clone()
            .or_else(|| settings.logfile.path.clone())
            .map(|path| LogfileConfig {
                path,
                level: options.logfile_level.unwrap_or(settings.logfile.level),
                color: options.logfile_color.unwrap_or(settings.logfile.color),
            });

        Ok(Self {
            name: name.to_string(),
            level: options.level.unwrap_or(settings.level),
            console_output,
            console_color: options.color.unwrap_or(settings.console.color),
            line_template: template.replace(NAME_PLACEHOLDER, name),
            date_format: options
                .date_format
                .clone()
                .unwrap_or_else(|| settings.date_format.clone()),
            propagate: options.propagate.unwrap_or(settings.propagate),
            clear_handlers: options.clear_handlers.unwrap_or(settings.clear_handlers),
            split_newlines: options.split_newlines.unwrap_or(settings.split_newlines),
            quiet_loggers: options
                .quiet_loggers
                .clone()
                .unwrap_or_else(|| settings.quiet_loggers.clone()),
            logfile,
        })
    }
}
