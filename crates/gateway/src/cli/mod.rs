pub mod captcha;
pub mod config;
pub mod generate;

use clap::{Parser, Subcommand};

use reso_domain::event::Coordinate;

/// Reso: taste profile in, generated track out.
#[derive(Debug, Parser)]
#[command(name = "reso", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the HTTP server (default when no subcommand is given).
    Serve,
    /// Run one generation for a stored user and print its progress.
    Generate {
        /// User id as stored in the state directory.
        #[arg(long)]
        user: String,
        /// Novelty dial, 0.0 (familiar) to 1.0 (adventurous).
        #[arg(long)]
        novelty: Option<f32>,
        /// Target platform recorded with the track.
        #[arg(long, default_value = "suno")]
        platform: String,
        /// Submit this prompt instead of the synthesized one.
        #[arg(long)]
        prompt: Option<String>,
        /// Print each event as a JSON line.
        #[arg(long)]
        json: bool,
    },
    /// CAPTCHA utilities.
    #[command(subcommand)]
    Captcha(CaptchaCommand),
    /// Configuration utilities.
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Print version information.
    Version,
}

#[derive(Debug, Subcommand)]
pub enum CaptchaCommand {
    /// Send click coordinates for the pending challenge.
    Solve {
        /// Clicks as `x,y` pairs in image pixels.
        #[arg(required = true, value_parser = captcha::parse_coordinate)]
        coords: Vec<Coordinate>,
    },
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Parse the config file and report any errors.
    Validate,
    /// Dump the resolved configuration (with defaults) as TOML.
    Show,
}

// ── Config loading helper ─────────────────────────────────────────────

/// Load the configuration from the path specified by `RESO_CONFIG` (or
/// `config.toml` by default).  Returns the parsed [`Config`] and the
/// path that was used.
///
/// [`Config`]: reso_domain::config::Config
pub fn load_config() -> anyhow::Result<(reso_domain::config::Config, String)> {
    let config_path = std::env::var("RESO_CONFIG").unwrap_or_else(|_| "config.toml".into());

    let config = if std::path::Path::new(&config_path).exists() {
        let raw = std::fs::read_to_string(&config_path)
            .map_err(|e| anyhow::anyhow!("reading {config_path}: {e}"))?;
        toml::from_str(&raw).map_err(|e| anyhow::anyhow!("parsing {config_path}: {e}"))?
    } else {
        reso_domain::config::Config::default()
    };

    Ok((config, config_path))
}
