use clap::Parser;
use logz_core::*;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "logz")]
#[command(about = "Emit messages through a configured logz logger", long_about = None)]
struct Cli {
    /// Messages to log, one record per resulting line
    #[arg(required = true)]
    messages: Vec<String>,

    /// Logger name (defaults to the configured base name)
    #[arg(long)]
    name: Option<String>,

    /// Logger level (debug, info, warn, error)
    #[arg(long)]
    level: Option<String>,

    /// Severity of the emitted records; unknown names log at info
    #[arg(long)]
    at: Option<String>,

    /// Console stream (auto, stdout, stderr)
    #[arg(long)]
    output: Option<String>,

    /// Disable ANSI colors
    #[arg(long)]
    no_color: bool,

    /// Split messages on line breaks
    #[arg(long)]
    split_newlines: bool,

    /// Parse each message as JSON (lists and objects expand to lines)
    #[arg(long)]
    json: bool,

    /// Line template, e.g. "{asctime} {level} {message}"
    #[arg(long)]
    template: Option<String>,

    /// Timestamp format (strftime syntax)
    #[arg(long)]
    date_format: Option<String>,

    /// Also append records to this file
    #[arg(long)]
    logfile: Option<PathBuf>,

    /// Logger to hold at error level (repeatable)
    #[arg(long = "quiet")]
    quiet: Vec<String>,

    /// Config file to use instead of the default location
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    logz_core::logging::init_with_quiet("warn", &cli.quiet);

    let settings = match &cli.config {
        Some(path) => {
            let mut settings = Settings::load_from(path)?;
            settings.apply_env();
            settings
        }
        None => Settings::load()?,
    };
    let registry = Registry::new(settings);

    let name = cli
        .name
        .clone()
        .unwrap_or_else(|| registry.settings().base_name.clone());
    let logger = registry.get_logger(&name, &logger_options(&cli)?)?;

    let messages = if cli.json {
        cli.messages
            .iter()
            .map(|m| Message::parse_json(m))
            .collect::<Result<Vec<_>>>()?
    } else {
        cli.messages.iter().map(Message::from).collect()
    };

    let mut call = CallOptions::new();
    if let Some(at) = &cli.at {
        call = call.with_level_name(at);
    }
    if cli.split_newlines {
        call = call.with_split_newline(true);
    }

    tracing::debug!(
        "Emitting {} messages through logger {:?}",
        messages.len(),
        logger.name()
    );
    logger.call(&messages, &call, logz_core::callsite!());

    Ok(())
}

fn logger_options(cli: &Cli) -> Result<LoggerOptions> {
    let mut options = LoggerOptions::new();

    if let Some(level) = &cli.level {
        options = options.with_level(Severity::from_name(level));
    }
    if let Some(output) = &cli.output {
        options = options.with_output(output.parse()?);
    }
    if cli.no_color {
        options = options.with_color(false);
    }
    if let Some(template) = &cli.template {
        options = options.with_template(template.clone());
    }
    if let Some(date_format) = &cli.date_format {
        options = options.with_date_format(date_format.clone());
    }
    if let Some(logfile) = &cli.logfile {
        options = options.with_logfile(logfile.clone());
    }
    if !cli.quiet.is_empty() {
        options = options.with_quiet_loggers(cli.quiet.clone());
    }

    Ok(options)
}
