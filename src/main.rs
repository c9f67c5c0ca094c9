use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use cdp_adapter::{BrowserDriver, ChromiumDriver, Viewport, WaitPolicy};
use clap::{Args, Parser, Subcommand};
use pagefreeze_cli::config::AppConfig;
use pagefreeze_cli::logging::init_logging;
use pagefreeze_cli::pipeline::{capture_page, capture_static, write_output, CaptureOutput};
use pagefreeze_cli::{load_config, CaptureRequest};
use resource_fetcher::HttpFetcher;
use tokio::fs;
use tracing::{error, info, warn};

/// PageFreeze - capture the live state of a rendered web page
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a URL in Chromium and capture its state
    Capture(CaptureArgs),

    /// Capture a saved HTML file without a browser
    Static(StaticArgs),

    /// Show build and configuration information
    Info,
}

#[derive(Args)]
struct CaptureArgs {
    /// Page to capture
    url: String,

    /// Run the browser with a visible window
    #[arg(long)]
    headful: bool,

    /// Headful browser plus a pause before navigation to attach devtools
    #[arg(long)]
    browser_debug: bool,

    /// Chrome/Chromium executable
    #[arg(long, value_name = "PATH")]
    browser_executable: Option<PathBuf>,

    /// Extra browser argument (repeatable)
    #[arg(long = "browser-arg", value_name = "ARG")]
    browser_args: Vec<String>,

    /// load, domcontentloaded or networkidle
    #[arg(long, value_parser = parse_wait_policy)]
    wait_until: Option<WaitPolicy>,

    /// Extra wait after load, in milliseconds
    #[arg(long)]
    wait_delay_ms: Option<u64>,

    /// Navigation time limit in milliseconds (0 disables)
    #[arg(long)]
    load_max_time_ms: Option<u64>,

    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_viewport)]
    viewport: Option<Viewport>,

    /// Extra HTTP header "Name: value" (repeatable)
    #[arg(long = "header", value_name = "HEADER", value_parser = parse_header)]
    headers: Vec<(String, String)>,

    /// Keep the page's Content-Security-Policy
    #[arg(long)]
    keep_csp: bool,

    /// Do not fetch referenced resources
    #[arg(long)]
    no_fetch: bool,

    #[command(flatten)]
    capture: CaptureFlags,

    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Args)]
struct StaticArgs {
    /// HTML file to capture
    file: PathBuf,

    /// URL the markup was served from
    #[arg(long)]
    url: Option<String>,

    #[command(flatten)]
    capture: CaptureFlags,

    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Args)]
struct CaptureFlags {
    #[arg(long)]
    remove_hidden_elements: bool,
    #[arg(long)]
    remove_unused_fonts: bool,
    #[arg(long)]
    compress_html: bool,
    #[arg(long)]
    load_deferred_images: bool,
    #[arg(long)]
    move_styles_in_head: bool,
}

#[derive(Args)]
struct OutputArgs {
    /// Directory receiving the capture record
    #[arg(short, long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Print the capture record instead of writing a file
    #[arg(long)]
    stdout: bool,
}

impl CaptureFlags {
    fn apply(&self, config: &mut AppConfig) {
        let options = &mut config.capture;
        options.remove_hidden_elements |= self.remove_hidden_elements;
        options.remove_unused_fonts |= self.remove_unused_fonts;
        options.compress_html |= self.compress_html;
        options.load_deferred_images |= self.load_deferred_images;
        options.move_styles_in_head |= self.move_styles_in_head;
    }
}

impl CaptureArgs {
    fn apply(&self, config: &mut AppConfig) {
        let browser = &mut config.browser;
        if self.headful {
            browser.headless = false;
        }
        browser.debug |= self.browser_debug;
        if let Some(path) = &self.browser_executable {
            browser.executable = path.clone();
        }
        browser.args.extend(self.browser_args.iter().cloned());
        if let Some(policy) = self.wait_until {
            browser.wait_until = policy;
        }
        if let Some(delay) = self.wait_delay_ms {
            browser.wait_delay_ms = delay;
        }
        if let Some(limit) = self.load_max_time_ms {
            browser.load_max_time_ms = limit;
        }
        if self.viewport.is_some() {
            browser.viewport = self.viewport;
        }
        browser.extra_headers.extend(self.headers.iter().cloned());
        if self.keep_csp {
            browser.bypass_csp = false;
        }
        if self.no_fetch {
            config.fetch.enabled = false;
        }
        self.capture.apply(config);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(&cli.log_level, cli.debug, cli.log_json)?;
    info!("Starting PageFreeze v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(cli.config.as_deref()).await?;

    let result = match cli.command {
        Commands::Capture(args) => cmd_capture(args, config).await,
        Commands::Static(args) => cmd_static(args, config).await,
        Commands::Info => cmd_info(&config),
    };

    match result {
        Ok(()) => {
            info!("Command completed successfully");
            Ok(())
        }
        Err(e) => {
            error!("Command failed: {:#}", e);
            std::process::exit(1);
        }
    }
}

async fn cmd_capture(args: CaptureArgs, mut config: AppConfig) -> Result<()> {
    args.apply(&mut config);
    if config.browser.executable.as_os_str().is_empty() {
        bail!("No Chrome/Chromium found; set PAGEFREEZE_CHROME or pass --browser-executable");
    }

    let driver = ChromiumDriver::launch(config.browser.clone())
        .await
        .context("Failed to launch browser")?;
    let fetcher = match &config.fetch.user_agent {
        Some(user_agent) => HttpFetcher::with_user_agent(user_agent)?,
        None => HttpFetcher::default(),
    };
    let request = CaptureRequest::from_config(args.url.clone(), &config);

    let captured = capture_page(&driver, Some(&fetcher), &request).await;
    if let Err(err) = driver.close().await {
        warn!(%err, "browser did not close cleanly");
    }
    let output = captured.with_context(|| format!("Failed to capture {}", args.url))?;
    emit(&output, &args.output, &config).await
}

async fn cmd_static(args: StaticArgs, mut config: AppConfig) -> Result<()> {
    args.capture.apply(&mut config);
    let markup = fs::read_to_string(&args.file)
        .await
        .with_context(|| format!("Failed to read {}", args.file.display()))?;
    let output = capture_static(&markup, args.url.as_deref(), &config.capture)?;
    emit(&output, &args.output, &config).await
}

fn cmd_info(config: &AppConfig) -> Result<()> {
    println!("pagefreeze {}", env!("CARGO_PKG_VERSION"));
    println!("  built:    {}", env!("BUILD_DATE"));
    println!("  commit:   {}", env!("GIT_HASH"));
    let executable = &config.browser.executable;
    if executable.as_os_str().is_empty() {
        println!("  browser:  not found");
    } else {
        println!("  browser:  {}", executable.display());
    }
    println!("  headless: {}", config.browser.effective_headless());
    println!("  output:   {}", config.output_dir.display());
    Ok(())
}

async fn emit(output: &CaptureOutput, args: &OutputArgs, config: &AppConfig) -> Result<()> {
    if args.stdout {
        println!("{}", serde_json::to_string_pretty(output)?);
        return Ok(());
    }
    let dir = args.output_dir.as_ref().unwrap_or(&config.output_dir);
    let path = write_output(dir, output).await?;
    println!("{}", path.display());
    Ok(())
}

fn parse_wait_policy(value: &str) -> Result<WaitPolicy, String> {
    value.parse()
}

fn parse_viewport(value: &str) -> Result<Viewport, String> {
    let (width, height) = value
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got {value}"))?;
    let width = width.trim().parse().map_err(|_| format!("invalid width in {value}"))?;
    let height = height.trim().parse().map_err(|_| format!("invalid height in {value}"))?;
    Ok(Viewport { width, height })
}

fn parse_header(value: &str) -> Result<(String, String), String> {
    let (name, header_value) = value
        .split_once(':')
        .ok_or_else(|| format!("expected \"Name: value\", got {value}"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("empty header name in {value}"));
    }
    Ok((name.to_string(), header_value.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_viewport_and_headers() {
        assert_eq!(
            parse_viewport("1280x720"),
            Ok(Viewport {
                width: 1280,
                height: 720
            })
        );
        assert!(parse_viewport("1280").is_err());
        assert_eq!(
            parse_header("Accept-Language: fr, en"),
            Ok(("Accept-Language".to_string(), "fr, en".to_string()))
        );
        assert!(parse_header(": x").is_err());
    }

    #[test]
    fn capture_flags_override_config() {
        let cli = Cli::parse_from([
            "pagefreeze",
            "capture",
            "https://example.com",
            "--headful",
            "--wait-until",
            "networkidle2",
            "--header",
            "X-Test: 1",
            "--remove-hidden-elements",
            "--no-fetch",
        ]);
        let Commands::Capture(args) = cli.command else {
            panic!("expected capture command");
        };
        let mut config = AppConfig::default();
        args.apply(&mut config);
        assert!(!config.browser.headless);
        assert_eq!(config.browser.wait_until, WaitPolicy::NetworkIdle);
        assert_eq!(
            config.browser.extra_headers.get("X-Test").map(String::as_str),
            Some("1")
        );
        assert!(config.capture.remove_hidden_elements);
        assert!(!config.fetch.enabled);
    }
}
