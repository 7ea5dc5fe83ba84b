mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let mut config = parse_config(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    apply_env_overrides(&mut config);
    validate_config(&config)?;

    Ok(config)
}

/// Parse configuration from TOML text without touching the environment.
pub fn parse_config(content: &str) -> Result<Config> {
    Ok(toml::from_str(content)?)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    // Try default locations
    let default_paths = [
        "./config.toml",
        "./cinestream.toml",
        "~/.config/cinestream/config.toml",
        "/etc/cinestream/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            return load_config(path);
        }
    }

    let mut config = Config::default();
    apply_env_overrides(&mut config);
    validate_config(&config)?;
    Ok(config)
}

/// Apply `SESSION_SECRET` and `PORT` from the environment.
fn apply_env_overrides(config: &mut Config) {
    if let Ok(secret) = std::env::var("SESSION_SECRET") {
        if !secret.is_empty() {
            config.session.secret = secret;
        }
    }

    if let Ok(port) = std::env::var("PORT") {
        match port.parse() {
            Ok(port) => config.server.port = port,
            Err(_) => tracing::warn!(value = %port, "Ignoring unparseable PORT"),
        }
    }
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    if config.server.port == 0 {
        anyhow::bail!("Server port cannot be 0");
    }

    if config.streaming.chunk_size == 0 {
        anyhow::bail!("streaming.chunk_size must be greater than 0");
    }

    if config.session.secret.is_empty() {
        anyhow::bail!("session.secret cannot be empty");
    }

    if config.session.secret == DEFAULT_SESSION_SECRET {
        tracing::warn!("Using the built-in session secret; set SESSION_SECRET in production");
    }

    if config.session.cookie_name.trim().is_empty() {
        anyhow::bail!("session.cookie_name cannot be empty");
    }

    if config.rate_limit.login_per_minute == 0 {
        anyhow::bail!("rate_limit.login_per_minute must be greater than 0");
    }

    if let Some(ref page) = config.server.player_page {
        if !page.exists() {
            tracing::warn!("Player page does not exist: {:?}", page);
        }
    }

    if let Some(ref dir) = config.server.static_dir {
        if !dir.exists() {
            tracing::warn!("Static directory does not exist: {:?}", dir);
        }
    }

    Ok(())
}
