//! Log records and the colorizing line formatter.
//!
//! Line templates are plain text with `{field}` placeholders. A placeholder
//! may carry a spec after a colon: `{func_name:<20}` pads to 20 columns,
//! `{name:>8}` right-aligns, `{module:.10}` truncates to 10 characters.
//! `{{` and `}}` produce literal braces.
//!
//! Printf-style placeholders are accepted too, so templates written for
//! other logging tools keep working: `%(funcName)-20s` is the same as
//! `{func_name:<20}`, and `%(levelname)8s` right-aligns like `{level:>8}`.
//! A `%` that does not start a complete placeholder is literal text.
//!
//! Formatting never fails. Unknown fields, missing call-site data and bad
//! date formats all render as empty text.

use crate::Severity;
use chrono::{DateTime, Utc};
use std::fmt::Write as _;

/// Default line template; `<cls_name>` is replaced by the logger name
pub const DEFAULT_TEMPLATE: &str =
    "{asctime} [<cls_name>] {color_on}{module}.{func_name:<20}{color_off} {message}";

/// Default timestamp format (strftime syntax, UTC)
pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%SZ";

/// Placeholder in templates substituted with the logger's own name
pub const NAME_PLACEHOLDER: &str = "<cls_name>";

/// ANSI sequence closing a colored span
pub const RESET_CODE: &str = "\x1b[0m";

/// ANSI color start code for a severity
pub fn color_code(level: Severity) -> Option<&'static str> {
    let code = match level {
        Severity::Critical => "\x1b[38;5;196m",
        Severity::Error => "\x1b[38;5;9m",
        Severity::Warning => "\x1b[38;5;11m",
        Severity::Info => "\x1b[38;5;111m",
        Severity::Debug => "\x1b[1;30m",
    };
    Some(code)
}

/// Where a logging call was made from
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Callsite {
    pub module: Option<&'static str>,
    pub function: Option<&'static str>,
    pub line: Option<u32>,
}

impl Callsite {
    /// Call site from a caller location; the module is the file stem
    pub fn from_location(location: &'static std::panic::Location<'static>) -> Self {
        let file = location.file();
        let stem = file
            .rsplit(['/', '\\'])
            .next()
            .map(|f| f.strip_suffix(".rs").unwrap_or(f));
        Self {
            module: stem,
            function: None,
            line: Some(location.line()),
        }
    }
}

/// One emitted log line before formatting
#[derive(Clone, Debug)]
pub struct Record {
    pub time: DateTime<Utc>,
    pub level: Severity,
    pub name: String,
    pub message: String,
    pub callsite: Callsite,
    pub thread: Option<String>,
}

impl Record {
    /// Build a record stamped with the current time and thread
    pub fn new(level: Severity, name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            time: Utc::now(),
            level,
            name: name.into(),
            message: message.into(),
            callsite: Callsite::default(),
            thread: std::thread::current().name().map(str::to_string),
        }
    }

    pub fn with_callsite(mut self, callsite: Callsite) -> Self {
        self.callsite = callsite;
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Field {
    AscTime,
    Level,
    Name,
    Module,
    Function,
    Line,
    Thread,
    Message,
    ColorOn,
    ColorOff,
    Unknown,
}

impl Field {
    fn from_name(name: &str) -> Self {
        match name.trim() {
            "asctime" => Field::AscTime,
            "level" | "levelname" => Field::Level,
            "name" => Field::Name,
            "module" => Field::Module,
            "func_name" | "funcName" => Field::Function,
            "line" | "lineno" => Field::Line,
            "thread" | "threadName" => Field::Thread,
            "message" => Field::Message,
            "color_on" => Field::ColorOn,
            "color_off" => Field::ColorOff,
            _ => Field::Unknown,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct Spec {
    right_align: bool,
    width: usize,
    precision: Option<usize>,
}

impl Spec {
    /// Parse `[<|>][width][.precision]`; malformed specs apply no padding
    fn parse(spec: &str) -> Self {
        let (right_align, rest) = match spec.chars().next() {
            Some('>') => (true, &spec[1..]),
            Some('<') => (false, &spec[1..]),
            _ => (false, spec),
        };
        let (width, precision) = match rest.split_once('.') {
            Some((w, p)) => (w, Some(p)),
            None => (rest, None),
        };
        let width = if width.is_empty() { Ok(0) } else { width.parse() };
        let precision = precision.map(str::parse).transpose();
        match (width, precision) {
            (Ok(width), Ok(precision)) => Spec {
                right_align,
                width,
                precision,
            },
            _ => Spec::default(),
        }
    }

    fn apply(&self, value: &str, out: &mut String) {
        let value: String = match self.precision {
            Some(p) => value.chars().take(p).collect(),
            None => value.to_string(),
        };
        let pad = self.width.saturating_sub(value.chars().count());
        if self.right_align {
            out.extend(std::iter::repeat(' ').take(pad));
            out.push_str(&value);
        } else {
            out.push_str(&value);
            out.extend(std::iter::repeat(' ').take(pad));
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Field(Field, Spec),
}

/// A compiled line template
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Template {
    segments: Vec<Segment>,
}

impl Template {
    /// Compile a template string. Never fails: an unterminated `{` is
    /// kept as literal text.
    pub fn compile(source: &str) -> Self {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut rest = source;

        while let Some(pos) = rest.find(['{', '}', '%']) {
            literal.push_str(&rest[..pos]);
            let tail = &rest[pos..];

            if tail.starts_with('%') {
                match parse_printf(tail) {
                    Some((field, spec, used)) => {
                        if !literal.is_empty() {
                            segments.push(Segment::Literal(std::mem::take(&mut literal)));
                        }
                        segments.push(Segment::Field(field, spec));
                        rest = &tail[used..];
                    }
                    None => {
                        literal.push('%');
                        rest = &tail[1..];
                    }
                }
                continue;
            }

            if tail.starts_with("{{") || tail.starts_with("}}") {
                literal.push_str(&tail[..1]);
                rest = &tail[2..];
                continue;
            }
            if tail.starts_with('}') {
                literal.push('}');
                rest = &tail[1..];
                continue;
            }

            match tail.find('}') {
                Some(end) => {
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    let body = &tail[1..end];
                    let (name, spec) = match body.split_once(':') {
                        Some((name, spec)) => (name, Spec::parse(spec)),
                        None => (body, Spec::default()),
                    };
                    segments.push(Segment::Field(Field::from_name(name), spec));
                    rest = &tail[end + 1..];
                }
                None => {
                    literal.push_str(tail);
                    rest = "";
                }
            }
        }
        literal.push_str(rest);
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        if !segments.iter().any(|s| matches!(s, Segment::Field(..))) {
            tracing::debug!("Line template {:?} has no placeholders", source);
        }

        Self { segments }
    }
}

/// Parse `%(name)[-][width][.precision]<conversion>` at the start of
/// `tail`, returning the field, its spec and the bytes consumed.
fn parse_printf(tail: &str) -> Option<(Field, Spec, usize)> {
    let body = tail.strip_prefix("%(")?;
    let close = body.find(')')?;
    let name = &body[..close];
    let after = &body[close + 1..];

    let flags_len = after.find(|c: char| !(c == '-' || c == '.' || c.is_ascii_digit()))?;
    let conversion = after[flags_len..].chars().next()?;
    if !conversion.is_ascii_alphabetic() {
        return None;
    }

    let flags = &after[..flags_len];
    let (left, flags) = match flags.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, flags),
    };
    let mut spec = Spec::parse(flags);
    spec.right_align = !left;

    let used = "%(".len() + close + 1 + flags_len + conversion.len_utf8();
    Some((Field::from_name(name), spec, used))
}

/// Renders records into lines, bracketing part of the line in a
/// severity color when enabled.
#[derive(Clone, Debug)]
pub struct ColorFormatter {
    template: Template,
    date_format: String,
    color: bool,
}

impl ColorFormatter {
    pub fn new(template: &str, date_format: impl Into<String>, color: bool) -> Self {
        Self {
            template: Template::compile(template),
            date_format: date_format.into(),
            color,
        }
    }

    /// Render the timestamp, or nothing if the date format is invalid
    fn asctime(&self, record: &Record) -> String {
        let mut out = String::new();
        if write!(out, "{}", record.time.format(&self.date_format)).is_err() {
            out.clear();
        }
        out
    }

    /// Format one record into a line (without trailing newline)
    pub fn format(&self, record: &Record) -> String {
        let (color_on, color_off) = match color_code(record.level) {
            Some(code) if self.color => (code, RESET_CODE),
            _ => ("", ""),
        };

        let mut line = String::with_capacity(record.message.len() + 64);
        for segment in &self.template.segments {
            let (field, spec) = match segment {
                Segment::Literal(text) => {
                    line.push_str(text);
                    continue;
                }
                Segment::Field(field, spec) => (*field, spec),
            };

            let value = match field {
                Field::AscTime => self.asctime(record),
                Field::Level => record.level.as_str().to_string(),
                Field::Name => record.name.clone(),
                Field::Module => record.callsite.module.unwrap_or_default().to_string(),
                Field::Function => record.callsite.function.unwrap_or_default().to_string(),
                Field::Line => record
                    .callsite
                    .line
                    .map(|l| l.to_string())
                    .unwrap_or_default(),
                Field::Thread => record.thread.clone().unwrap_or_default(),
                Field::Message => record.message.clone(),
                Field::ColorOn => color_on.to_string(),
                Field::ColorOff => color_off.to_string(),
                Field::Unknown => String::new(),
            };
            spec.apply(&value, &mut line);
        }
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(level: Severity, message: &str) -> Record {
        Record {
            time: Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap(),
            level,
            name: "svc".into(),
            message: message.into(),
            callsite: Callsite {
                module: Some("worker"),
                function: Some("run"),
                line: Some(42),
            },
            thread: Some("main".into()),
        }
    }

    fn strip_ansi(line: &str) -> String {
        let mut out = line.to_string();
        for level in Severity::ALL {
            if let Some(code) = color_code(level) {
                out = out.replace(code, "");
            }
        }
        out.replace(RESET_CODE, "")
    }

    #[test]
    fn test_default_template_plain() {
        let template = DEFAULT_TEMPLATE.replace(NAME_PLACEHOLDER, "svc");
        let formatter = ColorFormatter::new(&template, DEFAULT_DATE_FORMAT, false);
        let line = formatter.format(&record(Severity::Info, "hello"));
        assert_eq!(
            line,
            format!("2024-03-09 14:05:07Z [svc] worker.run{} hello", " ".repeat(17))
        );
    }

    #[test]
    fn test_color_brackets_span() {
        let formatter = ColorFormatter::new("{color_on}{message}{color_off}", "%H", true);
        let line = formatter.format(&record(Severity::Error, "boom"));
        assert_eq!(line, "\x1b[38;5;9mboom\x1b[0m");

        let line = formatter.format(&record(Severity::Debug, "quiet"));
        assert_eq!(line, "\x1b[1;30mquiet\x1b[0m");
    }

    #[test]
    fn test_color_off_matches_stripped_color_on() {
        let plain = ColorFormatter::new(DEFAULT_TEMPLATE, DEFAULT_DATE_FORMAT, false);
        let colored = ColorFormatter::new(DEFAULT_TEMPLATE, DEFAULT_DATE_FORMAT, true);
        for level in Severity::ALL {
            let rec = record(level, "same line");
            let a = plain.format(&rec);
            let b = colored.format(&rec);
            assert_ne!(a, b);
            assert_eq!(a, strip_ansi(&b));
        }
    }

    #[test]
    fn test_missing_fields_render_empty() {
        let formatter = ColorFormatter::new("[{module}|{func_name}|{line}|{bogus}] {message}", "%H", false);
        let rec = Record::new(Severity::Info, "svc", "msg");
        assert_eq!(formatter.format(&rec), "[|||] msg");
    }

    #[test]
    fn test_specs() {
        let formatter = ColorFormatter::new("{level:>9}|{name:<5}|{message:.3}|{line:x}", "%H", false);
        let line = formatter.format(&record(Severity::Warning, "abcdef"));
        assert_eq!(line, "  WARNING|svc  |abc|42");
    }

    #[test]
    fn test_escaped_and_unterminated_braces() {
        let formatter = ColorFormatter::new("{{{level}}} } {message", "%H", false);
        let line = formatter.format(&record(Severity::Info, "x"));
        assert_eq!(line, "{INFO} } {message");
    }

    #[test]
    fn test_printf_template_matches_brace_template() {
        let printf = "%(asctime)s [svc] %(color_on)s%(module)s.%(funcName)-20s%(color_off)s %(message)-2s";
        let brace = DEFAULT_TEMPLATE.replace(NAME_PLACEHOLDER, "svc");
        for color in [false, true] {
            let a = ColorFormatter::new(printf, DEFAULT_DATE_FORMAT, color);
            let b = ColorFormatter::new(&brace, DEFAULT_DATE_FORMAT, color);
            let rec = record(Severity::Warning, "hello");
            assert_eq!(a.format(&rec), b.format(&rec));
        }
    }

    #[test]
    fn test_printf_specs_and_literals() {
        let formatter = ColorFormatter::new(
            "%(levelname)8s|%(lineno)d|%(message).3s|100% %(bogus",
            "%H",
            false,
        );
        let line = formatter.format(&record(Severity::Error, "abcdef"));
        assert_eq!(line, "   ERROR|42|abc|100% %(bogus");
    }

    #[test]
    fn test_invalid_date_format_is_empty() {
        let formatter = ColorFormatter::new("[{asctime}] {message}", "%Q%", false);
        let line = formatter.format(&record(Severity::Info, "x"));
        assert_eq!(line, "[] x");
    }

    #[test]
    fn test_every_level_has_color() {
        for level in Severity::ALL {
            assert!(color_code(level).is_some());
        }
    }

    #[test]
    fn test_callsite_from_location() {
        let callsite = Callsite::from_location(std::panic::Location::caller());
        assert_eq!(callsite.module, Some("format"));
        assert!(callsite.line.is_some());
        assert_eq!(callsite.function, None);
    }
}
