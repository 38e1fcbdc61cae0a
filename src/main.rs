use anyhow::{Context, Result, anyhow};
use clap::Parser;
use reqwest::header::{HeaderName, HeaderValue};
use reqwest::{Method, Request, Url};
use retry_transport::http::{CompletionMode, ReqwestTransport, Transport};
use retry_transport::retry::{
    DEFAULT_INITIAL_DELAY_MS, DEFAULT_MAX_ATTEMPTS, RetryPolicy, RetryingTransport,
};
use std::io::Write;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// retry-transport - send one HTTP request, backing off while the server throttles
///
/// Requests answered with 429 (Too Many Requests) or 503 (Service Unavailable)
/// are resubmitted after a delay that doubles every time. Any other failure is
/// reported immediately.
///
/// Examples:
///   retry-transport https://api.example.com/items
///   retry-transport -X POST -H 'Content-Type: application/json' -d '{}' URL
#[derive(Parser, Debug)]
#[command(author, version = env!("RETRY_TRANSPORT_VERSION"), about)]
struct Cli {
    /// URL to request
    #[arg(value_name = "URL")]
    url: String,

    /// HTTP method
    #[arg(short = 'X', long = "method", default_value = "GET")]
    method: String,

    /// Extra request header, e.g. 'Accept: application/json' (repeatable)
    #[arg(short = 'H', long = "header", value_name = "NAME: VALUE")]
    headers: Vec<String>,

    /// Request body
    #[arg(short = 'd', long = "data")]
    data: Option<String>,

    /// Maximum number of attempts before giving up
    #[arg(long, default_value_t = DEFAULT_MAX_ATTEMPTS)]
    max_attempts: u32,

    /// Delay before the first retry, in milliseconds
    #[arg(long, default_value_t = DEFAULT_INITIAL_DELAY_MS)]
    initial_delay_ms: u64,

    /// Upper bound for any single delay, in milliseconds
    #[arg(long)]
    max_delay_ms: Option<u64>,

    /// Return as soon as headers arrive instead of buffering the body first
    #[arg(long)]
    headers_only: bool,
}

impl Cli {
    fn policy(&self) -> Result<RetryPolicy> {
        let policy = RetryPolicy::new(
            self.max_attempts,
            Duration::from_millis(self.initial_delay_ms),
        )?;
        Ok(match self.max_delay_ms {
            Some(ms) => policy.with_max_delay(Duration::from_millis(ms))?,
            None => policy,
        })
    }

    fn mode(&self) -> CompletionMode {
        if self.headers_only {
            CompletionMode::ResponseHeadersRead
        } else {
            CompletionMode::ResponseContentRead
        }
    }

    fn request(&self) -> Result<Request> {
        let method = Method::from_bytes(self.method.to_uppercase().as_bytes())
            .with_context(|| format!("Invalid HTTP method '{}'", self.method))?;
        let url = Url::parse(&self.url).with_context(|| format!("Invalid URL '{}'", self.url))?;

        let mut request = Request::new(method, url);
        for header in &self.headers {
            let (name, value) = parse_header(header)?;
            request.headers_mut().append(name, value);
        }
        if let Some(data) = &self.data {
            *request.body_mut() = Some(data.clone().into());
        }

        Ok(request)
    }
}

fn parse_header(header: &str) -> Result<(HeaderName, HeaderValue)> {
    let (name, value) = header
        .split_once(':')
        .ok_or_else(|| anyhow!("Invalid header '{}'. Expected 'NAME: VALUE'.", header))?;
    let name = HeaderName::from_bytes(name.trim().as_bytes())
        .with_context(|| format!("Invalid header name in '{}'", header))?;
    let value = HeaderValue::from_str(value.trim())
        .with_context(|| format!("Invalid header value in '{}'", header))?;
    Ok((name, value))
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    let transport = RetryingTransport::new(ReqwestTransport::default(), cli.policy()?);
    let request = cli.request()?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let response = transport.send(&request, cli.mode(), &cancel).await?;
    eprintln!("{:?} {}", response.version(), response.status());

    let body = response
        .bytes()
        .await
        .context("Failed to read response body")?;
    std::io::stdout()
        .write_all(&body)
        .context("Failed to write response body")?;

    Ok(())
}
