use anyhow::{Context, Result};
use clap::Parser;
use std::env;

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub upload_dir: String,
    pub secret_key: Option<String>,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "Upload form that sorts files into category folders")]
pub struct Args {
    /// Host to bind to (overrides UPLOAD_SORTER_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides UPLOAD_SORTER_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Root directory for uploaded files (overrides UPLOAD_SORTER_UPLOAD_DIR)
    #[arg(long)]
    pub upload_dir: Option<String>,

    /// Key used to sign flash cookies (overrides UPLOAD_SORTER_SECRET_KEY)
    #[arg(long)]
    pub secret_key: Option<String>,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig.
    pub fn from_env_and_args() -> Result<Self> {
        Self::from_args(Args::parse())
    }

    /// Merge already-parsed CLI args over the environment.
    pub fn from_args(args: Args) -> Result<Self> {
        // --- Environment fallback ---
        let env_host = env::var("UPLOAD_SORTER_HOST").unwrap_or_else(|_| "127.0.0.1".into());
        let env_port = match env::var("UPLOAD_SORTER_PORT") {
            Ok(value) => value
                .parse::<u16>()
                .with_context(|| format!("parsing UPLOAD_SORTER_PORT value `{}`", value))?,
            Err(env::VarError::NotPresent) => 5000,
            Err(err) => return Err(err).context("reading UPLOAD_SORTER_PORT"),
        };
        let env_upload_dir =
            env::var("UPLOAD_SORTER_UPLOAD_DIR").unwrap_or_else(|_| "./uploaded_files".into());
        let env_secret = env::var("UPLOAD_SORTER_SECRET_KEY")
            .ok()
            .filter(|s| !s.is_empty());

        // --- Merge ---
        Ok(Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            upload_dir: args.upload_dir.unwrap_or(env_upload_dir),
            secret_key: args.secret_key.filter(|s| !s.is_empty()).or(env_secret),
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// Hand-written so the signing key never reaches the logs.
impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("upload_dir", &self.upload_dir)
            .field("secret_key", &self.secret_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_args_override_environment() {
        let args = Args::try_parse_from([
            "upload-sorter",
            "--host",
            "0.0.0.0",
            "--port",
            "8080",
            "--upload-dir",
            "/srv/uploads",
            "--secret-key",
            "s3cret",
        ])
        .unwrap();

        let cfg = AppConfig::from_args(args).unwrap();
        assert_eq!(cfg.host, "0.0.0.0");
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.upload_dir, "/srv/uploads");
        assert_eq!(cfg.secret_key.as_deref(), Some("s3cret"));
        assert_eq!(cfg.addr(), "0.0.0.0:8080");
    }

    #[test]
    fn debug_output_redacts_secret() {
        let cfg = AppConfig {
            host: "127.0.0.1".into(),
            port: 5000,
            upload_dir: "./uploaded_files".into(),
            secret_key: Some("do-not-print".into()),
        };
        let printed = format!("{:?}", cfg);
        assert!(!printed.contains("do-not-print"));
        assert!(printed.contains("<redacted>"));
    }
}
