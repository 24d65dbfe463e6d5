use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::catalog::MissingTimestamp;
use crate::view::SortMode;

const DEFAULT_ENV_PREFIX: &str = "MOVIE_SHELF";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Config {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub ui: UIConfig,
    #[serde(default)]
    pub deep_link: DeepLinkConfig,
    #[serde(default)]
    pub player: PlayerConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    #[default]
    File,
    Remote,
    Local,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceConfig {
    #[serde(default)]
    pub kind: SourceKind,
    #[serde(default)]
    pub url: String,
    #[serde(default = "default_catalog_path")]
    pub path: PathBuf,
    #[serde(default)]
    pub store_path: Option<PathBuf>,
    #[serde(default, with = "humantime_serde")]
    pub request_timeout: Option<Duration>,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: SourceKind::default(),
            url: String::new(),
            path: default_catalog_path(),
            store_path: None,
            request_timeout: None,
            user_agent: default_user_agent(),
        }
    }
}

fn default_catalog_path() -> PathBuf {
    PathBuf::from("movies.json")
}

fn default_user_agent() -> String {
    format!("movie-shelf/{}", crate::VERSION)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct CatalogConfig {
    #[serde(default)]
    pub missing_added_at: MissingTimestamp,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UIConfig {
    #[serde(default)]
    pub default_sort: SortMode,
    #[serde(default = "default_placeholder_poster")]
    pub placeholder_poster: String,
}

impl Default for UIConfig {
    fn default() -> Self {
        Self {
            default_sort: SortMode::default(),
            placeholder_poster: default_placeholder_poster(),
        }
    }
}

fn default_placeholder_poster() -> String {
    "https://dummyimage.com/400x600/0b1324/ffffff&text=Poster".into()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeepLinkConfig {
    #[serde(default = "default_param")]
    pub param: String,
    #[serde(default = "default_base_address")]
    pub base_address: String,
    #[serde(default = "default_remember")]
    pub remember: bool,
}

impl Default for DeepLinkConfig {
    fn default() -> Self {
        Self {
            param: default_param(),
            base_address: default_base_address(),
            remember: default_remember(),
        }
    }
}

fn default_param() -> String {
    crate::deeplink::DEFAULT_PARAM.into()
}

fn default_base_address() -> String {
    "http://localhost/".into()
}

fn default_remember() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlayerConfig {
    #[serde(default = "default_video_command")]
    pub video_command: Vec<String>,
    #[serde(default = "default_video_detach")]
    pub video_detach: bool,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            video_command: default_video_command(),
            video_detach: default_video_detach(),
        }
    }
}

fn default_video_command() -> Vec<String> {
    vec!["mpv".into(), "--fs".into(), "%URL%".into()]
}

fn default_video_detach() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

fn default_log_level() -> String {
    "warn".into()
}

#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub config_file: Option<PathBuf>,
    pub env_prefix: Option<String>,
}

pub fn load(options: LoadOptions) -> Result<Config> {
    let mut cfg = Config::default();

    if let Some(path) = options.config_file.as_ref() {
        if path.exists() {
            let from_file = read_config_file(path)?;
            cfg = merge_config(cfg, from_file);
        }
    } else if let Some(default_path) = default_config_path() {
        if default_path.exists() {
            let from_file = read_config_file(&default_path)?;
            cfg = merge_config(cfg, from_file);
        }
    }

    let prefix = options.env_prefix.as_deref().unwrap_or(DEFAULT_ENV_PREFIX);
    apply_env(&mut cfg, prefix);

    Ok(cfg)
}

fn read_config_file(path: &Path) -> Result<Config> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file at {}", path.display()))?;
    let config: Config = serde_yaml::from_str(&data)
        .with_context(|| format!("Failed to parse config file at {}", path.display()))?;
    Ok(config)
}

fn merge_config(mut base: Config, other: Config) -> Config {
    base.source.kind = other.source.kind;
    if !other.source.url.is_empty() {
        base.source.url = other.source.url;
    }
    if !other.source.path.as_os_str().is_empty() {
        base.source.path = other.source.path;
    }
    if other.source.store_path.is_some() {
        base.source.store_path = other.source.store_path;
    }
    if other.source.request_timeout.is_some() {
        base.source.request_timeout = other.source.request_timeout;
    }
    if !other.source.user_agent.is_empty() {
        base.source.user_agent = other.source.user_agent;
    }

    base.catalog.missing_added_at = other.catalog.missing_added_at;

    base.ui.default_sort = other.ui.default_sort;
    if !other.ui.placeholder_poster.is_empty() {
        base.ui.placeholder_poster = other.ui.placeholder_poster;
    }

    if !other.deep_link.param.is_empty() {
        base.deep_link.param = other.deep_link.param;
    }
    if !other.deep_link.base_address.is_empty() {
        base.deep_link.base_address = other.deep_link.base_address;
    }
    base.deep_link.remember = other.deep_link.remember;

    if !other.player.video_command.is_empty() {
        base.player.video_command = other.player.video_command;
    }
    base.player.video_detach = other.player.video_detach;

    if !other.log.level.is_empty() {
        base.log.level = other.log.level;
    }
    if other.log.file.is_some() {
        base.log.file = other.log.file;
    }

    base
}

fn apply_env(cfg: &mut Config, prefix: &str) {
    let mut map: HashMap<String, String> = HashMap::new();
    let upper_prefix = format!("{}_", prefix.to_uppercase());

    for (key, value) in env::vars() {
        if let Some(stripped) = key.strip_prefix(&upper_prefix) {
            let normalized = stripped.to_ascii_lowercase().replace("__", ".");
            map.insert(normalized, value);
        }
    }

    for (key, value) in map {
        apply_env_value(cfg, &key, value);
    }
}

fn apply_env_value(cfg: &mut Config, key: &str, value: String) {
    match key {
        "source.kind" => match value.trim().to_ascii_lowercase().as_str() {
            "file" => cfg.source.kind = SourceKind::File,
            "remote" => cfg.source.kind = SourceKind::Remote,
            "local" => cfg.source.kind = SourceKind::Local,
            _ => tracing::warn!(value = %value, "ignoring unknown source kind"),
        },
        "source.url" => cfg.source.url = value,
        "source.path" => cfg.source.path = PathBuf::from(value),
        "source.store_path" => cfg.source.store_path = Some(PathBuf::from(value)),
        "source.request_timeout" => {
            if let Ok(duration) = humantime::parse_duration(&value) {
                cfg.source.request_timeout = Some(duration);
            }
        }
        "source.user_agent" => cfg.source.user_agent = value,
        "catalog.missing_added_at" => match value.trim().to_ascii_lowercase().as_str() {
            "now" => cfg.catalog.missing_added_at = MissingTimestamp::Now,
            "epoch" => cfg.catalog.missing_added_at = MissingTimestamp::Epoch,
            _ => {}
        },
        "ui.default_sort" => {
            if let Ok(mode) = value.parse() {
                cfg.ui.default_sort = mode;
            }
        }
        "ui.placeholder_poster" => cfg.ui.placeholder_poster = value,
        "deep_link.param" => cfg.deep_link.param = value,
        "deep_link.base_address" => cfg.deep_link.base_address = value,
        "deep_link.remember" => {
            cfg.deep_link.remember = matches!(value.as_str(), "1" | "true" | "TRUE" | "True");
        }
        "player.video_command" => {
            cfg.player.video_command = value
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        "player.video_detach" => {
            cfg.player.video_detach = matches!(value.as_str(), "1" | "true" | "TRUE" | "True");
        }
        "log.level" => cfg.log.level = value,
        "log.file" => cfg.log.file = Some(PathBuf::from(value)),
        _ => {}
    }
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("movie-shelf").join("config.yaml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use tempfile::tempdir;

    fn isolated(prefix: &str, dir: &Path) -> LoadOptions {
        LoadOptions {
            config_file: Some(dir.join("missing.yaml")),
            env_prefix: Some(prefix.to_string()),
        }
    }

    #[test]
    fn load_defaults_without_files() {
        let dir = tempdir().unwrap();
        let cfg = load(isolated("MOVIE_SHELF_TEST_DEFAULTS", dir.path())).unwrap();
        assert_eq!(cfg.source.kind, SourceKind::File);
        assert_eq!(cfg.source.path, PathBuf::from("movies.json"));
        assert_eq!(cfg.deep_link.param, "id");
        assert_eq!(cfg.ui.default_sort, SortMode::Newest);
        assert_eq!(cfg.catalog.missing_added_at, MissingTimestamp::Now);
        assert!(cfg.source.request_timeout.is_none());
    }

    #[test]
    fn yaml_file_is_merged() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(
            &path,
            "source:\n  kind: remote\n  url: https://example.test/movies.json\n  request_timeout: 15s\ncatalog:\n  missing_added_at: epoch\nui:\n  default_sort: az\n",
        )
        .unwrap();
        let cfg = load(LoadOptions {
            config_file: Some(path),
            env_prefix: Some("MOVIE_SHELF_TEST_YAML".into()),
        })
        .unwrap();
        assert_eq!(cfg.source.kind, SourceKind::Remote);
        assert_eq!(cfg.source.url, "https://example.test/movies.json");
        assert_eq!(cfg.source.request_timeout, Some(Duration::from_secs(15)));
        assert_eq!(cfg.catalog.missing_added_at, MissingTimestamp::Epoch);
        assert_eq!(cfg.ui.default_sort, SortMode::Az);
        assert_eq!(cfg.deep_link.base_address, "http://localhost/");
    }

    #[test]
    fn env_overrides() {
        let dir = tempdir().unwrap();
        env::set_var("MOVIE_SHELF_TEST_ENV_UI__DEFAULT_SORT", "za");
        env::set_var("MOVIE_SHELF_TEST_ENV_SOURCE__KIND", "local");
        env::set_var("MOVIE_SHELF_TEST_ENV_DEEP_LINK__PARAM", "movie");
        let cfg = load(isolated("MOVIE_SHELF_TEST_ENV", dir.path())).unwrap();
        assert_eq!(cfg.ui.default_sort, SortMode::Za);
        assert_eq!(cfg.source.kind, SourceKind::Local);
        assert_eq!(cfg.deep_link.param, "movie");
        env::remove_var("MOVIE_SHELF_TEST_ENV_UI__DEFAULT_SORT");
        env::remove_var("MOVIE_SHELF_TEST_ENV_SOURCE__KIND");
        env::remove_var("MOVIE_SHELF_TEST_ENV_DEEP_LINK__PARAM");
    }
}
