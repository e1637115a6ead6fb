//! CLI argument parsing, validation, and startup helpers.

use crate::ServerConfig;
use crate::db::Database;
use crate::hashing::DEFAULT_BCRYPT_COST;
use crate::rate_limit::RateLimits;
use clap::Parser;
use tracing::{error, info};
use url::Url;

const MIN_JWT_SECRET_LENGTH: usize = 32;

#[derive(clap::ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "Inkpress", about = "Blog platform authentication service")]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value = "8080")]
    pub port: u16,

    /// Path to SQLite database file
    #[arg(short, long, env = "DATABASE_PATH", default_value = "inkpress.db")]
    pub database: String,

    /// Public origin the API is served from (full URL, e.g., "https://blog.example.com")
    #[arg(long, env = "PUBLIC_ORIGIN", default_value = "http://localhost:8080")]
    pub public_origin: String,

    /// Set cross-site cookie attributes (frontend served from a different site)
    #[arg(long)]
    pub cross_site_cookies: bool,

    /// Path to file containing JWT secret. Prefer using JWT_SECRET env var instead
    #[arg(long)]
    pub jwt_secret_file: Option<String>,

    /// Bcrypt cost factor for password and refresh-secret hashing
    #[arg(long, default_value_t = DEFAULT_BCRYPT_COST)]
    pub bcrypt_cost: u32,

    /// Access token lifetime in minutes
    #[arg(long, default_value = "15")]
    pub access_token_minutes: u64,

    /// Promote the user with this email to admin on startup
    #[arg(long)]
    pub promote_admin: Option<String>,

    /// Log output format
    #[arg(short, long, default_value = "pretty")]
    pub log_format: LogFormat,
}

/// Initialize logging based on the specified format.
pub fn init_logging(format: &LogFormat) {
    match format {
        LogFormat::Pretty => tracing_subscriber::fmt::init(),
        LogFormat::Json => tracing_subscriber::fmt().json().init(),
        LogFormat::Compact => tracing_subscriber::fmt().compact().init(),
    }
}

/// Load JWT secret from environment variable or file.
/// Returns None and logs an error if the secret cannot be loaded.
pub fn load_jwt_secret(jwt_secret_file: Option<&str>) -> Option<String> {
    let secret = if let Ok(secret) = std::env::var("JWT_SECRET") {
        // Clear the environment variable to prevent leaking
        // SAFETY: We're single-threaded at this point during startup,
        // and no other code is reading this environment variable.
        unsafe { std::env::remove_var("JWT_SECRET") };
        secret
    } else if let Some(path) = jwt_secret_file {
        match std::fs::read_to_string(path) {
            Ok(content) => content.trim().to_string(),
            Err(e) => {
                error!(path = %path, error = %e, "Failed to read JWT secret file");
                return None;
            }
        }
    } else {
        error!(
            "JWT secret is required. Set JWT_SECRET environment variable (recommended) or use --jwt-secret-file"
        );
        return None;
    };

    if secret.len() < MIN_JWT_SECRET_LENGTH {
        error!(
            "JWT secret is shorter than {} characters. Use a longer secret",
            MIN_JWT_SECRET_LENGTH
        );
        return None;
    }

    Some(secret)
}

/// Parse and validate the public-origin URL.
/// Returns None and logs an error if validation fails.
pub fn validate_public_origin(public_origin: &str) -> Option<Url> {
    let url = match Url::parse(public_origin) {
        Ok(url) => url,
        Err(e) => {
            error!(origin = %public_origin, error = %e, "Invalid public-origin URL");
            return None;
        }
    };

    let is_https = url.scheme() == "https";
    let is_localhost = matches!(url.host_str(), Some("localhost") | Some("127.0.0.1"));

    if !is_https && !is_localhost {
        error!("public-origin must use HTTPS for non-localhost deployments");
        return None;
    }

    Some(url)
}

/// Handle the --promote-admin flag: promote an existing user by email.
pub async fn handle_promote_admin(db: &Database, email: &str) {
    match db.users().get_by_email(email).await {
        Ok(Some(user)) => {
            if let Err(e) = db.users().set_role(user.id, crate::db::UserRole::Admin).await {
                error!(error = %e, "Failed to promote user");
                std::process::exit(1);
            }
            info!(email = %email, "User promoted to admin");
        }
        Ok(None) => {
            error!(email = %email, "No user with that email; register first");
            std::process::exit(1);
        }
        Err(e) => {
            error!(error = %e, "Failed to look up user");
            std::process::exit(1);
        }
    }
}

/// Build ServerConfig from validated arguments.
pub fn build_config(
    db: Database,
    public_origin: Url,
    cross_site_cookies: bool,
    jwt_secret: String,
    bcrypt_cost: u32,
    access_token_minutes: u64,
) -> ServerConfig {
    let secure_cookies = public_origin.scheme() == "https";

    ServerConfig {
        db,
        jwt_secret: jwt_secret.into_bytes(),
        bcrypt_cost,
        access_token_secs: access_token_minutes * 60,
        secure_cookies,
        cross_site_cookies,
        rate_limits: RateLimits::new(),
    }
}

/// Open the database, logging errors if it fails.
pub async fn open_database(path: &str) -> Option<Database> {
    match Database::open(path).await {
        Ok(db) => {
            info!(path = %path, "Database opened");
            Some(db)
        }
        Err(e) => {
            error!(path = %path, error = %e, "Failed to open database");
            None
        }
    }
}
