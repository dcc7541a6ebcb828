use crate::prelude::{eprintln, println, Result};
use colored::Colorize;
use pagegrab_core::types::{DEFAULT_MAX_BYTES, DEFAULT_MAX_CHARS};
use pagegrab_core::validate::parse_header;
use pagegrab_core::{ContentResult, Error, ErrorKind, FetchMethod, FetchOptions, ProcessMethod};
use std::io::IsTerminal;
use std::time::Duration;

use crate::pipeline::Pipeline;

#[derive(Debug, clap::Parser)]
#[command(name = "pagegrab", author, version, about)]
#[command(
    long_about = "Fetch a URL over plain HTTP or headless Chrome and print it as raw HTML, Markdown or its main article"
)]
pub struct App {
    /// URL to fetch
    pub url: String,

    /// How to retrieve the page
    #[arg(value_enum, ignore_case = true, default_value = "request")]
    pub fetch_method: FetchArg,

    /// How to transform the retrieved content
    #[arg(value_enum, ignore_case = true, default_value = "raw")]
    pub process_method: ProcessArg,

    #[clap(flatten)]
    pub options: OptionsArgs,

    /// Output the whole result as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum FetchArg {
    /// Plain HTTP GET
    Request,
    /// Headless Chrome, for pages rendered by client-side scripts
    Browser,
}

impl From<FetchArg> for FetchMethod {
    fn from(arg: FetchArg) -> Self {
        match arg {
            FetchArg::Request => FetchMethod::Request,
            FetchArg::Browser => FetchMethod::Browser,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ProcessArg {
    /// Content unchanged
    Raw,
    /// Whole page as Markdown
    Markdown,
    /// Main article only, as Markdown
    Readability,
}

impl From<ProcessArg> for ProcessMethod {
    fn from(arg: ProcessArg) -> Self {
        match arg {
            ProcessArg::Raw => ProcessMethod::Raw,
            ProcessArg::Markdown => ProcessMethod::Markdown,
            ProcessArg::Readability => ProcessMethod::Readability,
        }
    }
}

#[derive(Debug, Clone, clap::Args)]
pub struct OptionsArgs {
    /// Timeout in seconds
    #[arg(short, long, env = "PAGEGRAB_TIMEOUT", default_value = "30", value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: u64,

    /// Milliseconds to let client-side scripts run before capturing (browser only)
    #[arg(long, env = "PAGEGRAB_WAIT_FOR_JS", default_value = "3000")]
    pub wait_for_js: u64,

    /// Extra request header as `Name: Value`, can be repeated
    #[arg(short = 'H', long = "header", value_parser = parse_header)]
    pub headers: Vec<(String, String)>,

    /// Fail on redirects instead of following them
    #[arg(long)]
    pub no_redirects: bool,

    /// Largest response body accepted, in bytes
    #[arg(long, env = "PAGEGRAB_MAX_BYTES", default_value_t = DEFAULT_MAX_BYTES)]
    pub max_bytes: usize,

    /// Truncate the output to this many characters
    #[arg(long, env = "PAGEGRAB_MAX_CHARS", default_value_t = DEFAULT_MAX_CHARS)]
    pub max_chars: usize,

    /// Print the raw content when processing fails instead of failing
    #[arg(long)]
    pub fallback_raw: bool,
}

impl From<OptionsArgs> for FetchOptions {
    fn from(args: OptionsArgs) -> Self {
        FetchOptions {
            timeout: Duration::from_secs(args.timeout),
            wait_for_js: Duration::from_millis(args.wait_for_js),
            headers: args.headers.into_iter().collect(),
            follow_redirects: !args.no_redirects,
            max_bytes: args.max_bytes,
            max_chars: args.max_chars,
            fallback_to_raw: args.fallback_raw,
            ..FetchOptions::default()
        }
    }
}

/// Run the pipeline described by the command line
pub async fn execute(pipeline: &Pipeline, app: &App) -> Result<ContentResult, Error> {
    let options = FetchOptions::from(app.options.clone());
    pipeline
        .get_url_content(
            &app.url,
            app.fetch_method.into(),
            app.process_method.into(),
            &options,
        )
        .await
}

/// Method pair and URL, on stderr so piped output stays clean
pub fn announce(app: &App) {
    let fetch_method = FetchMethod::from(app.fetch_method);
    let process_method = ProcessMethod::from(app.process_method);
    eprintln!(
        "{} {} {} {}",
        "Fetching".green().bold(),
        app.url.cyan().underline(),
        "with".dimmed(),
        format!("{fetch_method} + {process_method}").bright_magenta()
    );
}

pub fn output(result: &ContentResult, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(result)?);
        return Ok(());
    }

    let is_tty = std::io::stdout().is_terminal();

    if is_tty {
        eprintln!("\n{}", "=".repeat(80).bright_cyan());
        eprintln!("{}: {}", "URL".green(), result.final_url.cyan().underline());
        eprintln!(
            "{}: {}",
            "Fetch Time".green(),
            format!("{} ms", result.fetch_time_ms).bright_yellow()
        );
        eprintln!("{}\n", "=".repeat(80).bright_cyan());
    }

    if let Some(reason) = result.degraded {
        eprintln!("{} {}", "note:".yellow().bold(), reason);
    }
    if result.truncated {
        eprintln!(
            "{} output truncated to {} characters",
            "note:".yellow().bold(),
            result.length
        );
    }

    println!("{}", result.content);
    println!("\nContent length: {} characters", result.length);

    Ok(())
}

/// Category and remediation hint for a failure
pub fn describe_error(err: &Error) -> (&'static str, &'static str) {
    match err.kind() {
        ErrorKind::InvalidUrl => ("Invalid URL", "Use an absolute http:// or https:// URL"),
        ErrorKind::NetworkError if err.is_timeout() => (
            "Network error",
            "The server did not answer in time, raise --timeout",
        ),
        ErrorKind::NetworkError => (
            "Network error",
            "Check your connection and that the host is reachable",
        ),
        ErrorKind::HttpError => (
            "HTTP error",
            "The server refused the request, check the URL or pass other headers with -H",
        ),
        ErrorKind::UnsupportedContentType => (
            "Unsupported content",
            "Only text, HTML and XML documents can be processed",
        ),
        ErrorKind::ResponseTooLarge => (
            "Response too large",
            "Raise --max-bytes to accept larger pages",
        ),
        ErrorKind::BrowserLaunchError => (
            "Browser error",
            "Install Chrome or Chromium, or point the CHROME environment variable at it",
        ),
        ErrorKind::RenderTimeout => (
            "Browser error",
            "The page took too long to render, raise --timeout or lower --wait-for-js",
        ),
        ErrorKind::MalformedInput => (
            "Parsing error",
            "The content could not be parsed, use the raw process method or --fallback-raw",
        ),
        ErrorKind::NoContentExtracted => (
            "Parsing error",
            "No main content was found, try the markdown process method",
        ),
        ErrorKind::DependencyUnavailable => (
            "Missing dependency",
            "Rebuild with `--features readability` or use the markdown process method",
        ),
        ErrorKind::ConfigurationError => (
            "Configuration error",
            "Run with --help to list the valid methods and options",
        ),
    }
}

/// Failure as printed by `--json`
#[derive(Debug, serde::Serialize)]
pub struct ErrorOutput {
    pub error: ErrorKind,
    pub category: &'static str,
    pub message: String,
    pub hint: &'static str,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub timed_out: bool,
}

impl From<&Error> for ErrorOutput {
    fn from(err: &Error) -> Self {
        let (category, hint) = describe_error(err);
        ErrorOutput {
            error: err.kind(),
            category,
            message: err.to_string(),
            hint,
            timed_out: err.is_timeout(),
        }
    }
}

/// Diagnostic on stderr, or a JSON object on stdout with `--json`
pub fn report_error(err: &Error, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&ErrorOutput::from(err))?);
        return Ok(());
    }

    let (category, hint) = describe_error(err);
    eprintln!("{}: {}", category.red().bold(), err);
    eprintln!("{} {}", "hint:".yellow(), hint);
    Ok(())
}
