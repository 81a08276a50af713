use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use roamer::core::DEFAULT_ZOOM;
use roamer::geocoding::DEFAULT_GEOCODER_URL;
use roamer_gemini_model::{GeminiConfig, GeminiConfigBuilder};
use thiserror::Error;

/// Chat with a travel assistant that puts its suggestions on a map.
#[derive(Debug, Parser)]
#[command(name = "roamer", version, about)]
pub struct Args {
    /// Gemini API key
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Gemini model to chat with
    #[arg(long, env = "GEMINI_MODEL")]
    model: Option<String>,

    /// Base URL of the Gemini API
    #[arg(long, env = "GEMINI_BASE_URL")]
    base_url: Option<String>,

    /// Nominatim-compatible server used to find places
    #[arg(long, env = "ROAMER_GEOCODER_URL", default_value = DEFAULT_GEOCODER_URL)]
    geocoder_url: String,

    /// Only show a few well-known cities instead of querying a geocoder
    #[arg(long)]
    offline_geocoder: bool,

    /// Where the map page is written
    #[arg(long, default_value = "roamer-map.html")]
    map_output: PathBuf,

    /// Seconds to wait for the model before giving up
    #[arg(long, default_value_t = 60)]
    timeout_secs: u64,

    /// Map zoom when the assistant doesn't pick one (1 to 18)
    #[arg(long, default_value_t = DEFAULT_ZOOM, allow_negative_numbers = true)]
    default_zoom: i32,

    /// PDF documents (e.g. expense reports) to load at start-up
    documents: Vec<PathBuf>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error(
        "GEMINI_API_KEY is not set, pass --api-key or add it to the \
         environment"
    )]
    MissingCredential,
    #[error("--timeout-secs must be greater than zero")]
    InvalidTimeout,
    #[error("--default-zoom must be between 1 and 18, got {0}")]
    InvalidZoom(i32),
}

#[derive(Debug)]
pub struct Config {
    pub gemini: GeminiConfig,
    pub geocoder_url: Option<String>,
    pub map_output: PathBuf,
    pub timeout: Duration,
    pub default_zoom: i32,
    pub documents: Vec<PathBuf>,
}

impl TryFrom<Args> for Config {
    type Error = ConfigError;

    fn try_from(args: Args) -> Result<Self, Self::Error> {
        let api_key = args
            .api_key
            .map(|key| key.trim().to_owned())
            .filter(|key| !key.is_empty())
            .ok_or(ConfigError::MissingCredential)?;
        if args.timeout_secs == 0 {
            return Err(ConfigError::InvalidTimeout);
        }
        if !(1..=18).contains(&args.default_zoom) {
            return Err(ConfigError::InvalidZoom(args.default_zoom));
        }

        let mut gemini = GeminiConfigBuilder::with_api_key(api_key);
        if let Some(model) = args.model {
            gemini = gemini.with_model(model);
        }
        if let Some(base_url) = args.base_url {
            gemini = gemini.with_base_url(base_url);
        }

        Ok(Self {
            gemini: gemini.build(),
            geocoder_url: (!args.offline_geocoder).then_some(args.geocoder_url),
            map_output: args.map_output,
            timeout: Duration::from_secs(args.timeout_secs),
            default_zoom: args.default_zoom,
            documents: args.documents,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Config, ConfigError> {
        let args = Args::try_parse_from(
            ["roamer"].iter().chain(args).copied(),
        )
        .unwrap();
        Config::try_from(args)
    }

    #[test]
    fn test_full_command_line() {
        let config = parse(&[
            "--api-key",
            "secret",
            "--model",
            "gemini-2.0-flash",
            "--offline-geocoder",
            "--map-output",
            "/tmp/trip.html",
            "--timeout-secs",
            "5",
            "--default-zoom",
            "4",
            "expenses.pdf",
            "hotels.pdf",
        ])
        .unwrap();

        assert_eq!(config.gemini.model(), "gemini-2.0-flash");
        assert_eq!(config.geocoder_url, None);
        assert_eq!(config.map_output, PathBuf::from("/tmp/trip.html"));
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.default_zoom, 4);
        assert_eq!(
            config.documents,
            vec![PathBuf::from("expenses.pdf"), PathBuf::from("hotels.pdf")]
        );
        assert!(!format!("{config:?}").contains("secret"));
    }

    #[test]
    fn test_blank_credential() {
        let err = parse(&["--api-key", "   "]).unwrap_err();
        assert_eq!(err, ConfigError::MissingCredential);
    }

    #[test]
    fn test_zero_timeout() {
        let err = parse(&["--api-key", "secret", "--timeout-secs", "0"])
            .unwrap_err();
        assert_eq!(err, ConfigError::InvalidTimeout);
    }

    #[test]
    fn test_default_zoom_range() {
        let config = parse(&["--api-key", "secret"]).unwrap();
        assert_eq!(config.default_zoom, DEFAULT_ZOOM);

        let err = parse(&["--api-key", "secret", "--default-zoom", "19"])
            .unwrap_err();
        assert_eq!(err, ConfigError::InvalidZoom(19));
        let err = parse(&["--api-key", "secret", "--default-zoom", "0"])
            .unwrap_err();
        assert_eq!(err, ConfigError::InvalidZoom(0));
    }
}
