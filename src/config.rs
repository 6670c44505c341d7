//! Optional config file loading. Search order: ./rrchunk.toml, then
//! $XDG_CONFIG_HOME/rrchunk/config.toml (or ~/.config/rrchunk/config.toml).

use serde::Deserialize;
use std::path::PathBuf;

/// Environment variable naming the cache database file.
pub const CACHE_ENV_VAR: &str = "RRCHUNK_CACHE_DB";

const CACHE_FILE_NAME: &str = "cache.sqlite";

/// Config file contents. All fields optional; only present keys override defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct Config {
    /// SQLite cache file. Relative paths are relative to CWD.
    pub cache_path: Option<PathBuf>,
    /// HTTP User-Agent header.
    pub user_agent: Option<String>,
    /// Minimum delay in seconds between requests.
    pub request_delay_secs: Option<u64>,
    /// Upper bound in seconds of the random extra delay added to each request.
    pub request_jitter_secs: Option<u64>,
    /// Request timeout in seconds.
    pub timeout_secs: Option<u64>,
}

/// Search order: (1) ./rrchunk.toml, (2) $XDG_CONFIG_HOME/rrchunk/config.toml.
/// Missing file returns Ok(None). Invalid TOML or I/O error reading a present file returns Err.
pub fn load_config() -> Result<Option<Config>, String> {
    let cwd = std::env::current_dir()
        .map_err(|e| format!("Cannot determine current directory: {}", e))?;
    let mut paths = vec![cwd.join("rrchunk.toml")];
    if let Some(d) = dirs::config_dir() {
        paths.push(d.join("rrchunk").join("config.toml"));
    }
    for path in &paths {
        if path.exists() {
            let s = std::fs::read_to_string(path)
                .map_err(|e| format!("Cannot read config {}: {}", path.display(), e))?;
            let config: Config = toml::from_str(&s)
                .map_err(|e| format!("Invalid config {}: {}", path.display(), e))?;
            tracing::debug!(path = %path.display(), "loaded config");
            return Ok(Some(config));
        }
    }
    Ok(None)
}

/// `<platform cache dir>/rrchunk/cache.sqlite`, or `./cache.sqlite` when the platform has none.
pub fn default_cache_path() -> PathBuf {
    match dirs::cache_dir() {
        Some(d) => d.join("rrchunk").join(CACHE_FILE_NAME),
        None => PathBuf::from(CACHE_FILE_NAME),
    }
}

/// Cache location: CLI flag, then the environment variable, then the config file, then the
/// platform default. Empty values are treated as unset.
pub fn resolve_cache_path(
    flag: Option<PathBuf>,
    env: Option<String>,
    config: Option<&Config>,
) -> PathBuf {
    flag.filter(|p| !p.as_os_str().is_empty())
        .or_else(|| env.filter(|s| !s.trim().is_empty()).map(PathBuf::from))
        .or_else(|| {
            config
                .and_then(|c| c.cache_path.clone())
                .filter(|p| !p.as_os_str().is_empty())
        })
        .unwrap_or_else(default_cache_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_empty_config() {
        let c: Config = toml::from_str("").unwrap();
        assert!(c.cache_path.is_none());
        assert!(c.user_agent.is_none());
        assert!(c.request_delay_secs.is_none());
        assert!(c.request_jitter_secs.is_none());
        assert!(c.timeout_secs.is_none());
    }

    #[test]
    fn parse_full_config() {
        let s = r#"
            cache_path = "data/cache.sqlite"
            user_agent = "Custom/1.0"
            request_delay_secs = 3
            request_jitter_secs = 1
            timeout_secs = 60
        "#;
        let c: Config = toml::from_str(s).unwrap();
        assert_eq!(
            c.cache_path.as_deref(),
            Some(std::path::Path::new("data/cache.sqlite"))
        );
        assert_eq!(c.user_agent.as_deref(), Some("Custom/1.0"));
        assert_eq!(c.request_delay_secs, Some(3));
        assert_eq!(c.request_jitter_secs, Some(1));
        assert_eq!(c.timeout_secs, Some(60));
    }

    #[test]
    fn parse_partial_config() {
        let c: Config = toml::from_str("request_delay_secs = 1").unwrap();
        assert_eq!(c.request_delay_secs, Some(1));
        assert!(c.cache_path.is_none());
        assert!(c.timeout_secs.is_none());
    }

    #[test]
    fn invalid_toml_errors() {
        assert!(toml::from_str::<Config>("cache_path = [").is_err());
        assert!(toml::from_str::<Config>("timeout_secs = \"soon\"").is_err());
    }

    #[test]
    fn flag_beats_env_and_config() {
        let config = Config {
            cache_path: Some(PathBuf::from("from-config.sqlite")),
            ..Config::default()
        };
        let path = resolve_cache_path(
            Some(PathBuf::from("from-flag.sqlite")),
            Some("from-env.sqlite".to_string()),
            Some(&config),
        );
        assert_eq!(path, PathBuf::from("from-flag.sqlite"));
    }

    #[test]
    fn env_beats_config() {
        let config = Config {
            cache_path: Some(PathBuf::from("from-config.sqlite")),
            ..Config::default()
        };
        let path = resolve_cache_path(None, Some("from-env.sqlite".to_string()), Some(&config));
        assert_eq!(path, PathBuf::from("from-env.sqlite"));
    }

    #[test]
    fn config_used_when_flag_and_env_missing() {
        let config = Config {
            cache_path: Some(PathBuf::from("from-config.sqlite")),
            ..Config::default()
        };
        let path = resolve_cache_path(None, Some("  ".to_string()), Some(&config));
        assert_eq!(path, PathBuf::from("from-config.sqlite"));
    }

    #[test]
    fn falls_back_to_default() {
        let path = resolve_cache_path(None, None, None);
        assert_eq!(path, default_cache_path());
        assert!(path.ends_with(CACHE_FILE_NAME));
    }
}
