//! Command-line configuration for the dashgen binary
//!
//! `serve` runs the `/generate` server, `preview` drives a single preview
//! request against a running server and writes the result to disk.
use anyhow::{anyhow, bail};
use clap::{Args, Parser, Subcommand};
use dashgen::completion::{DEFAULT_MODEL, DEFAULT_UPSTREAM_URL, Upstream};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone, Parser)]
#[command(version, about, long_about = None)]
pub struct Config {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Serve `POST /generate`.
    Serve(ServeArgs),
    /// Send one generate request to a running server and save the dashboard.
    Preview(PreviewArgs),
}

#[derive(Clone, Args)]
pub struct ServeArgs {
    /// The port on which the server will listen.
    #[arg(short = 'p', long, default_value_t = 3000)]
    pub port: u16,

    /// The port on which the metrics server will listen.
    #[arg(long, default_value_t = 9090)]
    pub metrics_port: u16,

    /// Whether to enable the metrics endpoint.
    #[arg(short = 'm', long, default_value_t = true, action = clap::ArgAction::Set)]
    pub metrics: bool,

    /// The prefix to use for metrics.
    #[arg(long, default_value = "dashgen")]
    pub metrics_prefix: String,

    /// Base URL of the OpenAI-compatible completion API.
    #[arg(long, env = "DASHGEN_UPSTREAM_URL", default_value = DEFAULT_UPSTREAM_URL)]
    pub upstream_url: Url,

    /// API key for the completion API.
    #[arg(long, env = "GROQ_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Model used for generation.
    #[arg(long, env = "DASHGEN_MODEL", default_value = DEFAULT_MODEL)]
    pub model: String,

    /// How long (in seconds) to wait for one completion.
    #[arg(long, default_value_t = 60)]
    pub upstream_timeout_secs: u64,

    /// Wrap generated markup in a styled container document.
    #[arg(long, default_value_t = false)]
    pub wrap_output: bool,
}

impl std::fmt::Debug for ServeArgs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServeArgs")
            .field("port", &self.port)
            .field("metrics_port", &self.metrics_port)
            .field("metrics", &self.metrics)
            .field("metrics_prefix", &self.metrics_prefix)
            .field("upstream_url", &self.upstream_url.as_str())
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("upstream_timeout_secs", &self.upstream_timeout_secs)
            .field("wrap_output", &self.wrap_output)
            .finish()
    }
}

impl ServeArgs {
    pub fn validate(self) -> Result<Self, anyhow::Error> {
        if self.metrics && self.metrics_port == self.port {
            bail!("Metrics port {} clashes with the server port", self.port);
        }
        if self.upstream_timeout_secs == 0 {
            bail!("Upstream timeout must be at least one second");
        }
        if self.upstream_url.cannot_be_a_base() {
            bail!("Upstream URL '{}' cannot be used as a base", self.upstream_url);
        }
        Ok(self)
    }

    pub fn upstream(&self) -> Upstream {
        Upstream::builder()
            .url(self.upstream_url.clone())
            .maybe_api_key(self.api_key.clone())
            .model(self.model.clone())
            .timeout(Duration::from_secs(self.upstream_timeout_secs))
            .build()
    }
}

#[derive(Debug, Clone, Args)]
pub struct PreviewArgs {
    /// Origin of the dashgen server.
    #[arg(short = 's', long, default_value = "http://127.0.0.1:3000")]
    pub server: Url,

    /// JSON data, inline.
    #[arg(long, conflicts_with = "json_file")]
    pub json: Option<String>,

    /// File holding the JSON data.
    #[arg(long)]
    pub json_file: Option<PathBuf>,

    /// Design instructions, inline.
    #[arg(long, conflicts_with = "prompt_file")]
    pub prompt: Option<String>,

    /// File holding the design instructions.
    #[arg(long)]
    pub prompt_file: Option<PathBuf>,

    /// Where the generated dashboard is written.
    #[arg(short = 'o', long, default_value = "dashboard.html")]
    pub output: PathBuf,
}

impl PreviewArgs {
    pub fn validate(self) -> Result<Self, anyhow::Error> {
        for path in [&self.json_file, &self.prompt_file].into_iter().flatten() {
            if !path.exists() {
                return Err(anyhow!("Input file '{}' does not exist", path.display()));
            }
        }
        Ok(self)
    }

    /// Resolves the JSON and prompt text. Missing inputs are empty strings.
    pub async fn read_inputs(&self) -> Result<(String, String), anyhow::Error> {
        let json = read_input(&self.json, &self.json_file).await?;
        let prompt = read_input(&self.prompt, &self.prompt_file).await?;
        Ok((json, prompt))
    }
}

async fn read_input(
    inline: &Option<String>,
    file: &Option<PathBuf>,
) -> Result<String, anyhow::Error> {
    match (inline, file) {
        (Some(text), _) => Ok(text.clone()),
        (None, Some(path)) => tokio::fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read '{}': {}", path.display(), e)),
        (None, None) => Ok(String::new()),
    }
}
