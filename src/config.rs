use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

/// OAuth scopes requested during interactive authorization
pub const DEFAULT_SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/classroom.courses.readonly",
    "https://www.googleapis.com/auth/classroom.courses",
    "https://www.googleapis.com/auth/classroom.coursework.students",
    "https://www.googleapis.com/auth/classroom.coursework.me",
    "https://www.googleapis.com/auth/classroom.rosters",
    "https://www.googleapis.com/auth/classroom.profile.emails",
    "https://www.googleapis.com/auth/classroom.profile.photos",
    "https://www.googleapis.com/auth/classroom.announcements",
    "https://www.googleapis.com/auth/classroom.addons.student",
    "https://www.googleapis.com/auth/classroom.courseworkmaterials.readonly",
];

/// Local development origins allowed by CORS
pub const DEFAULT_CORS_ORIGINS: &[&str] = &[
    "http://localhost",
    "http://localhost:8000",
    "http://127.0.0.1:8000",
    "http://localhost:5500",
    "http://127.0.0.1:5500",
    "null",
];

pub const DEFAULT_API_BASE_URL: &str = "https://classroom.googleapis.com";

/// Classroom Gateway - courses and assignments proxy
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Server host address
    #[arg(short = 'H', long, env = "SERVER_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Server port
    #[arg(short, long, env = "SERVER_PORT", default_value = "8000")]
    pub port: u16,

    /// Where the OAuth credential is persisted
    #[arg(long, env = "TOKEN_FILE", default_value = "token.json")]
    pub token_file: String,

    /// OAuth client secret file downloaded from the Google Cloud console
    #[arg(long, env = "CLIENT_SECRETS_FILE", default_value = "credentials.json")]
    pub client_secrets_file: String,

    /// Classroom API root URL
    #[arg(long, env = "CLASSROOM_API_BASE_URL", default_value = DEFAULT_API_BASE_URL)]
    pub api_base_url: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Seconds to wait for the authorization callback (0 waits forever)
    #[arg(long, env = "AUTH_CALLBACK_TIMEOUT", default_value = "0")]
    pub auth_timeout: u64,
}

#[derive(Clone, Debug)]
pub struct Config {
    // Server settings
    pub server_host: String,
    pub server_port: u16,

    // Credential files
    pub token_file: PathBuf,
    pub client_secrets_file: PathBuf,

    // OAuth
    pub scopes: Vec<String>,
    pub token_refresh_threshold: u64,
    pub auth_callback_timeout: Option<u64>,

    // Upstream
    pub api_base_url: String,
    pub http_connect_timeout: u64,
    pub http_request_timeout: u64,

    // CORS
    pub cors_origins: Vec<String>,

    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_host: "0.0.0.0".to_string(),
            server_port: 8000,
            token_file: PathBuf::from("token.json"),
            client_secrets_file: PathBuf::from("credentials.json"),
            scopes: DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect(),
            token_refresh_threshold: 60,
            auth_callback_timeout: None,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            http_connect_timeout: 30,
            http_request_timeout: 300,
            cors_origins: DEFAULT_CORS_ORIGINS.iter().map(|s| s.to_string()).collect(),
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from all sources with priority: CLI > ENV > defaults
    pub fn load() -> Result<Self> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        let args = CliArgs::parse();
        let defaults = Config::default();

        let config = Config {
            server_host: args.host,
            server_port: args.port,

            token_file: expand_tilde(&args.token_file),
            client_secrets_file: expand_tilde(&args.client_secrets_file),

            scopes: defaults.scopes,

            token_refresh_threshold: std::env::var("TOKEN_REFRESH_THRESHOLD")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.token_refresh_threshold),

            auth_callback_timeout: (args.auth_timeout > 0).then_some(args.auth_timeout),

            api_base_url: args.api_base_url,

            http_connect_timeout: std::env::var("HTTP_CONNECT_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.http_connect_timeout),

            http_request_timeout: std::env::var("HTTP_REQUEST_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.http_request_timeout),

            cors_origins: std::env::var("CORS_ORIGINS")
                .ok()
                .map(|s| parse_origins(&s))
                .filter(|origins| !origins.is_empty())
                .unwrap_or(defaults.cors_origins),

            log_level: args.log_level,
        };

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.scopes.is_empty() {
            anyhow::bail!("At least one OAuth scope is required");
        }

        // Credentialed CORS needs explicit origins
        for origin in &self.cors_origins {
            if origin == "*" {
                anyhow::bail!("CORS_ORIGINS cannot contain '*' when credentials are allowed");
            }
            if axum::http::HeaderValue::from_str(origin).is_err() {
                anyhow::bail!("Invalid CORS origin: {:?}", origin);
            }
        }

        // Only the interactive flow needs the client secrets, so this is not fatal
        if !self.client_secrets_file.exists() {
            tracing::warn!(
                "Client secrets file not found: {} (required for first-time authorization)",
                self.client_secrets_file.display()
            );
        }

        Ok(())
    }
}

/// Expand tilde (~) in file paths to user's home directory
fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

/// Parse a comma-separated origin list
fn parse_origins(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(str::to_string)
        .collect()
}
