use std::env;
use std::time::Duration;
use anyhow::{Context, Result};

/// Origins the browser client is served from by default.
pub const DEFAULT_ALLOWED_ORIGINS: [&str; 2] = ["http://localhost:5173", "http://localhost:3000"];

/// The application's configuration.
#[derive(Clone, Debug)]
pub struct Config {
    /// The address to bind to.
    pub host: String,
    /// The port to listen on.
    pub port: u16,
    /// Origins allowed by CORS. A single `*` allows any origin.
    pub allowed_origins: Vec<String>,
    /// The deployment environment label reported by `/health`.
    pub environment: String,
    /// Delay between a connect request and the QR phase.
    pub qr_delay: Duration,
    /// Delay between a connect request and the connected phase.
    pub connect_delay: Duration,
}

impl Config {
    /// Creates a new `Config` from environment variables.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `Config`.
    pub fn from_env() -> Result<Self> {
        let mut allowed_origins: Vec<String> = DEFAULT_ALLOWED_ORIGINS
            .iter()
            .map(|origin| origin.to_string())
            .collect();

        if let Ok(frontend_url) = env::var("FRONTEND_URL") {
            let frontend_url = frontend_url.trim().trim_end_matches('/').to_string();
            if frontend_url == "*" {
                allowed_origins = vec![frontend_url];
            } else if !frontend_url.is_empty() && !allowed_origins.contains(&frontend_url) {
                allowed_origins.push(frontend_url);
            }
        }

        Ok(Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("Invalid PORT")?,
            allowed_origins,
            environment: env::var("APP_ENV")
                .or_else(|_| env::var("NODE_ENV"))
                .unwrap_or_else(|_| "development".to_string()),
            qr_delay: Duration::from_millis(
                env::var("QR_DELAY_MS")
                    .unwrap_or_else(|_| "2000".to_string())
                    .parse()
                    .context("Invalid QR_DELAY_MS")?,
            ),
            connect_delay: Duration::from_millis(
                env::var("CONNECT_DELAY_MS")
                    .unwrap_or_else(|_| "8000".to_string())
                    .parse()
                    .context("Invalid CONNECT_DELAY_MS")?,
            ),
        })
    }

    /// Whether CORS should accept any origin.
    pub fn allows_any_origin(&self) -> bool {
        self.allowed_origins.iter().any(|origin| origin == "*")
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            allowed_origins: DEFAULT_ALLOWED_ORIGINS
                .iter()
                .map(|origin| origin.to_string())
                .collect(),
            environment: "development".to_string(),
            qr_delay: Duration::from_secs(2),
            connect_delay: Duration::from_secs(8),
        }
    }
}
