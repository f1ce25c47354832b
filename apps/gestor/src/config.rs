use std::{collections::HashMap, fs};

use anyhow::{anyhow, Result};
use serde::Deserialize;
use url::Url;

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub server_url: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:5195".into(),
        }
    }
}

pub fn load_settings() -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string("gestor.toml") {
        if let Ok(file_cfg) = toml::from_str::<HashMap<String, String>>(&raw) {
            if let Some(v) = file_cfg.get("server_url") {
                settings.server_url = v.clone();
            }
        }
    }

    if let Ok(v) = std::env::var("GESTOR_SERVER_URL") {
        settings.server_url = v;
    }
    if let Ok(v) = std::env::var("APP__SERVER_URL") {
        settings.server_url = v;
    }

    settings
}

/// Trims trailing slashes and checks the scheme before the URL is handed to
/// the gateway.
pub fn normalize_server_url(raw: &str) -> Result<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(anyhow!("server url must not be empty"));
    }

    let parsed =
        Url::parse(trimmed).map_err(|err| anyhow!("invalid server url '{trimmed}': {err}"))?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(anyhow!("server url must start with http:// or https://"));
    }

    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_the_local_api() {
        assert_eq!(Settings::default().server_url, "http://localhost:5195");
    }

    #[test]
    fn environment_overrides_the_default() {
        std::env::set_var("GESTOR_SERVER_URL", "https://tramites.example.com");
        let settings = load_settings();
        std::env::remove_var("GESTOR_SERVER_URL");

        assert_eq!(settings.server_url, "https://tramites.example.com");
    }

    #[test]
    fn trailing_slashes_are_trimmed() {
        assert_eq!(
            normalize_server_url("http://localhost:5195/").expect("normalize"),
            "http://localhost:5195"
        );
    }

    #[test]
    fn non_http_schemes_are_rejected() {
        assert!(normalize_server_url("ftp://example.com").is_err());
        assert!(normalize_server_url("not a url").is_err());
        assert!(normalize_server_url("").is_err());
    }
}
