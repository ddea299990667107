use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::path::PathBuf;

use murmur_api::transcription::DEFAULT_TRANSCRIPTION_URL;

/// 25 MB, the provider's own per-file ceiling.
const DEFAULT_MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub transcription_url: String,
    pub openai_api_key: Option<String>,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let port = var("MURMUR_PORT", "5000")
            .parse()
            .context("MURMUR_PORT must be a port number")?;
        let max_upload_bytes = match lookup("MURMUR_MAX_UPLOAD_BYTES") {
            Some(v) => v.parse().context("MURMUR_MAX_UPLOAD_BYTES must be a byte count")?,
            None => DEFAULT_MAX_UPLOAD_BYTES,
        };

        Ok(Self {
            host: var("MURMUR_HOST", "0.0.0.0"),
            port,
            db_path: var("MURMUR_DB_PATH", "murmur.db").into(),
            upload_dir: var("MURMUR_UPLOAD_DIR", "./uploads").into(),
            max_upload_bytes,
            transcription_url: var("MURMUR_TRANSCRIPTION_URL", DEFAULT_TRANSCRIPTION_URL),
            openai_api_key: lookup("OPENAI_API_KEY").filter(|k| !k.is_empty()),
        })
    }

    pub fn bind_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid bind address {}:{}", self.host, self.port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<ServerConfig> {
        let map: HashMap<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        ServerConfig::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn defaults() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.port, 5000);
        assert_eq!(cfg.upload_dir, PathBuf::from("./uploads"));
        assert_eq!(cfg.max_upload_bytes, DEFAULT_MAX_UPLOAD_BYTES);
        assert_eq!(cfg.transcription_url, DEFAULT_TRANSCRIPTION_URL);
        assert!(cfg.openai_api_key.is_none());
        assert_eq!(cfg.bind_addr().unwrap().to_string(), "0.0.0.0:5000");
    }

    #[test]
    fn overrides() {
        let cfg = config(&[
            ("MURMUR_HOST", "127.0.0.1"),
            ("MURMUR_PORT", "8080"),
            ("MURMUR_UPLOAD_DIR", "/tmp/murmur"),
            ("MURMUR_MAX_UPLOAD_BYTES", "1024"),
            ("OPENAI_API_KEY", "sk-abc"),
        ])
        .unwrap();
        assert_eq!(cfg.bind_addr().unwrap().to_string(), "127.0.0.1:8080");
        assert_eq!(cfg.upload_dir, PathBuf::from("/tmp/murmur"));
        assert_eq!(cfg.max_upload_bytes, 1024);
        assert_eq!(cfg.openai_api_key.as_deref(), Some("sk-abc"));
    }

    #[test]
    fn bad_numbers_are_errors() {
        assert!(config(&[("MURMUR_PORT", "http")]).is_err());
        assert!(config(&[("MURMUR_MAX_UPLOAD_BYTES", "lots")]).is_err());
    }

    #[test]
    fn empty_api_key_counts_as_missing() {
        assert!(config(&[("OPENAI_API_KEY", "")]).unwrap().openai_api_key.is_none());
    }
}
