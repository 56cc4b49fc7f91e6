use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use axum_extra::extract::cookie::Key;
use base64::{Engine as _, engine::general_purpose::STANDARD};

/// Upload size cap: 50 MiB, enforced on the multipart route body.
pub const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub cookie_key: Key,
    pub cors_allowed_origins: Vec<String>,
    pub uploads_dir: PathBuf,
    pub chatbot_url: Option<String>,
    pub session_ttl_days: i64,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        let cookie_secret =
            std::env::var("COOKIE_SECRET_BASE64").context("COOKIE_SECRET_BASE64 missing")?;
        let secret_bytes = STANDARD
            .decode(cookie_secret.trim())
            .context("invalid COOKIE_SECRET_BASE64")?;
        if secret_bytes.len() < 64 {
            return Err(anyhow!(
                "COOKIE_SECRET_BASE64 must decode to at least 64 bytes"
            ));
        }
        let cookie_key = Key::from(&secret_bytes[..64]);

        let cors_allowed_origins = std::env::var("CORS_ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .filter_map(|s| {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.to_string())
                }
            })
            .collect::<Vec<_>>();

        let uploads_dir =
            PathBuf::from(std::env::var("UPLOADS_DIR").unwrap_or_else(|_| "uploads".into()));

        let chatbot_url = std::env::var("CHATBOT_URL").ok().filter(|v| !v.is_empty());

        let session_ttl_days = match std::env::var("SESSION_TTL_DAYS") {
            Ok(raw) => raw
                .parse::<i64>()
                .map_err(|_| anyhow!("SESSION_TTL_DAYS must be an integer"))?,
            Err(_) => 30,
        };

        Ok(Self {
            cookie_key,
            cors_allowed_origins,
            uploads_dir,
            chatbot_url,
            session_ttl_days,
        })
    }
}
