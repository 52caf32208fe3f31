use crate::fetch::{DEFAULT_BASE_URL, DEFAULT_DELAY_MS, DEFAULT_TIMEOUT_SECS, Endpoint};
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_RELATIVE_PATH: &str = ".playfeed/config.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    pub version: u32,
    pub api: Option<ApiConfig>,
    pub cache: Option<CacheConfig>,
    pub pbp: Option<PbpConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiConfig {
    pub base_url: Option<String>,
    pub delay_ms: Option<u64>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CacheConfig {
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PbpConfig {
    pub endpoint_version: Option<u8>,
    pub attach_slots: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawFeedConfig {
    version: Option<u32>,
    api: Option<RawApiConfig>,
    cache: Option<RawCacheConfig>,
    pbp: Option<RawPbpConfig>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawApiConfig {
    base_url: Option<String>,
    delay_ms: Option<u64>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawCacheConfig {
    path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawPbpConfig {
    endpoint_version: Option<u8>,
    attach_slots: Option<bool>,
}

pub fn feed_config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_RELATIVE_PATH)
}

pub fn load_feed_config(root: &Path) -> Result<Option<FeedConfig>> {
    let path = feed_config_path(root);
    if !path.exists() {
        return Ok(None);
    }

    let raw = std::fs::read_to_string(&path)
        .with_context(|| format!("read feed config {}", path.display()))?;
    let parsed: RawFeedConfig =
        toml::from_str(&raw).with_context(|| format!("parse {}", path.display()))?;
    Ok(Some(validate_feed_config(parsed, &path)?))
}

fn validate_feed_config(raw: RawFeedConfig, path: &Path) -> Result<FeedConfig> {
    let version = raw
        .version
        .ok_or_else(|| anyhow::anyhow!("{} missing required `version`", path.display()))?;
    if version != 1 {
        bail!(
            "{} has unsupported version {version}; expected version = 1",
            path.display()
        );
    }

    let api = raw
        .api
        .map(|api| {
            let base_url = sanitize_optional(api.base_url);
            if let Some(url) = base_url.as_deref()
                && !(url.starts_with("http://") || url.starts_with("https://"))
            {
                bail!("{} `[api].base_url` must be an http(s) URL", path.display());
            }
            if api.timeout_secs == Some(0) {
                bail!("{} `[api].timeout_secs` must be positive", path.display());
            }
            Ok(ApiConfig {
                base_url: base_url.map(with_trailing_slash),
                delay_ms: api.delay_ms,
                timeout_secs: api.timeout_secs,
            })
        })
        .transpose()?;

    let cache = raw.cache.map(|cache| CacheConfig {
        path: sanitize_optional(cache.path).map(PathBuf::from),
    });

    let pbp = raw
        .pbp
        .map(|pbp| {
            if let Some(version) = pbp.endpoint_version
                && Endpoint::play_by_play(version).is_none()
            {
                bail!(
                    "{} has unsupported `[pbp].endpoint_version = {version}`; expected 2 or 3",
                    path.display()
                );
            }
            Ok(PbpConfig {
                endpoint_version: pbp.endpoint_version,
                attach_slots: pbp.attach_slots,
            })
        })
        .transpose()?;

    Ok(FeedConfig {
        version,
        api,
        cache,
        pbp,
    })
}

fn sanitize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn with_trailing_slash(url: String) -> String {
    if url.ends_with('/') { url } else { format!("{url}/") }
}

/// Effective settings after layering CLI overrides over the config file
/// over built-in defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub base_url: String,
    pub delay: Duration,
    pub timeout: Duration,
    pub cache_path: PathBuf,
    pub endpoint: Endpoint,
    pub attach_slots: bool,
}

#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub delay_ms: Option<u64>,
    pub cache_path: Option<PathBuf>,
    pub endpoint_version: Option<u8>,
    pub no_slots: bool,
}

impl Settings {
    pub fn resolve(file: Option<&FeedConfig>, overrides: &Overrides) -> Result<Self> {
        let api = file.and_then(|f| f.api.as_ref());
        let pbp = file.and_then(|f| f.pbp.as_ref());

        let version = overrides
            .endpoint_version
            .or(pbp.and_then(|p| p.endpoint_version))
            .unwrap_or(3);
        let endpoint = Endpoint::play_by_play(version)
            .ok_or_else(|| anyhow::anyhow!("unsupported endpoint version {version}; expected 2 or 3"))?;

        Ok(Self {
            base_url: api
                .and_then(|a| a.base_url.clone())
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            delay: Duration::from_millis(
                overrides
                    .delay_ms
                    .or(api.and_then(|a| a.delay_ms))
                    .unwrap_or(DEFAULT_DELAY_MS),
            ),
            timeout: Duration::from_secs(
                api.and_then(|a| a.timeout_secs)
                    .unwrap_or(DEFAULT_TIMEOUT_SECS),
            ),
            cache_path: overrides
                .cache_path
                .clone()
                .or_else(|| file.and_then(|f| f.cache.as_ref()).and_then(|c| c.path.clone()))
                .unwrap_or_else(default_cache_path),
            endpoint,
            attach_slots: !overrides.no_slots
                && pbp.and_then(|p| p.attach_slots).unwrap_or(true),
        })
    }
}

pub fn default_cache_path() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CACHE_HOME") {
        return PathBuf::from(xdg).join("playfeed").join("http_cache.sqlite");
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home)
            .join(".cache")
            .join("playfeed")
            .join("http_cache.sqlite");
    }
    PathBuf::from(".playfeed/http_cache.sqlite")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write_config(root: &Path, body: &str) {
        let path = feed_config_path(root);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, body).unwrap();
    }

    #[test]
    fn missing_config_is_none() {
        let tmp = tempdir().unwrap();
        assert!(load_feed_config(tmp.path()).unwrap().is_none());
    }

    #[test]
    fn parses_full_config() {
        let tmp = tempdir().unwrap();
        write_config(
            tmp.path(),
            r#"
version = 1
[api]
base_url = "https://example.test/stats"
delay_ms = 250
timeout_secs = 9
[cache]
path = "/tmp/pbp-cache.sqlite"
[pbp]
endpoint_version = 2
attach_slots = false
"#,
        );

        let cfg = load_feed_config(tmp.path()).unwrap().unwrap();
        let settings = Settings::resolve(Some(&cfg), &Overrides::default()).unwrap();
        assert_eq!(settings.base_url, "https://example.test/stats/");
        assert_eq!(settings.delay, Duration::from_millis(250));
        assert_eq!(settings.timeout, Duration::from_secs(9));
        assert_eq!(settings.cache_path, PathBuf::from("/tmp/pbp-cache.sqlite"));
        assert_eq!(settings.endpoint, Endpoint::PlayByPlayV2);
        assert!(!settings.attach_slots);
    }

    #[test]
    fn rejects_invalid_version() {
        let tmp = tempdir().unwrap();
        write_config(tmp.path(), "version = 2");

        let err = load_feed_config(tmp.path()).unwrap_err();
        assert!(format!("{err}").contains("unsupported version"));
    }

    #[test]
    fn rejects_unknown_endpoint_version() {
        let tmp = tempdir().unwrap();
        write_config(
            tmp.path(),
            r#"
version = 1
[pbp]
endpoint_version = 4
"#,
        );

        let err = load_feed_config(tmp.path()).unwrap_err();
        assert!(format!("{err}").contains("endpoint_version = 4"));
    }

    #[test]
    fn rejects_non_http_base_url() {
        let tmp = tempdir().unwrap();
        write_config(
            tmp.path(),
            r#"
version = 1
[api]
base_url = "stats.nba.com"
"#,
        );

        let err = load_feed_config(tmp.path()).unwrap_err();
        assert!(format!("{err}").contains("http(s) URL"));
    }

    #[test]
    fn overrides_beat_file_values() {
        let cfg = FeedConfig {
            version: 1,
            api: Some(ApiConfig {
                base_url: None,
                delay_ms: Some(900),
                timeout_secs: None,
            }),
            cache: None,
            pbp: Some(PbpConfig {
                endpoint_version: Some(2),
                attach_slots: Some(true),
            }),
        };
        let overrides = Overrides {
            delay_ms: Some(100),
            cache_path: Some(PathBuf::from("cache.sqlite")),
            endpoint_version: Some(3),
            no_slots: true,
        };

        let settings = Settings::resolve(Some(&cfg), &overrides).unwrap();
        assert_eq!(settings.base_url, DEFAULT_BASE_URL);
        assert_eq!(settings.delay, Duration::from_millis(100));
        assert_eq!(settings.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        assert_eq!(settings.cache_path, PathBuf::from("cache.sqlite"));
        assert_eq!(settings.endpoint, Endpoint::PlayByPlayV3);
        assert!(!settings.attach_slots);
    }
}
