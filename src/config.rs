use chrono::{FixedOffset, Offset, Utc};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::display::PageId;
use crate::predict::Observer;
use crate::retry::RetryPolicy;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub satellite: SatelliteConfig,
    pub observer: ObserverConfig,
    #[serde(default)]
    pub elements: ElementsConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub prediction: PredictionConfig,
    #[serde(default)]
    pub notifications: NotificationConfig,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub time_sync: TimeSyncConfig,
    #[serde(default)]
    pub web: WebConfig,
    #[serde(default)]
    pub api_keys: Vec<ApiKey>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SatelliteConfig {
    pub catalog_id: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObserverConfig {
    pub name: Option<String>,
    pub coordinates: String,
    #[serde(default)]
    pub altitude_m: f64,
    #[serde(default)]
    pub utc_offset_s: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ElementsConfig {
    #[serde(default = "default_source_url")]
    pub source_url: String,
    #[serde(default = "default_stale_after", deserialize_with = "deserialize_duration")]
    pub stale_after: Duration,
    #[serde(default = "default_http_timeout", deserialize_with = "deserialize_duration")]
    pub http_timeout: Duration,
    #[serde(default = "default_fetch_retry")]
    pub retry: RetryPolicy,
}

impl Default for ElementsConfig {
    fn default() -> Self {
        Self {
            source_url: default_source_url(),
            stale_after: default_stale_after(),
            http_timeout: default_http_timeout(),
            retry: default_fetch_retry(),
        }
    }
}

fn default_source_url() -> String {
    "https://celestrak.org/NORAD/elements/gp.php?CATNR={catalog_id}&FORMAT=TLE".to_string()
}

fn default_stale_after() -> Duration {
    Duration::from_secs(3600)
}

fn default_http_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_fetch_retry() -> RetryPolicy {
    RetryPolicy::new(3, Duration::from_secs(2))
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_storage_dir")]
    pub dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: default_storage_dir(),
        }
    }
}

fn default_storage_dir() -> PathBuf {
    PathBuf::from("state")
}

impl StorageConfig {
    pub fn elements_path(&self) -> PathBuf {
        self.dir.join("elements.yaml")
    }

    pub fn settings_path(&self) -> PathBuf {
        self.dir.join("settings.yaml")
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PredictionConfig {
    #[serde(default = "default_lookahead", deserialize_with = "deserialize_duration")]
    pub lookahead: Duration,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
    #[serde(default = "default_pass_table_rows")]
    pub pass_table_rows: usize,
}

impl Default for PredictionConfig {
    fn default() -> Self {
        Self {
            lookahead: default_lookahead(),
            max_iterations: default_max_iterations(),
            pass_table_rows: default_pass_table_rows(),
        }
    }
}

fn default_lookahead() -> Duration {
    Duration::from_secs(600)
}

fn default_max_iterations() -> u32 {
    100
}

fn default_pass_table_rows() -> usize {
    12
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotificationConfig {
    /// Seconds before AOS at which the pre-pass alert fires. Zero disables it.
    #[serde(default)]
    pub lead_time_s: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DisplayConfig {
    #[serde(default = "default_debounce", deserialize_with = "deserialize_duration")]
    pub debounce: Duration,
    #[serde(
        default = "default_toggle_debounce",
        deserialize_with = "deserialize_duration"
    )]
    pub toggle_debounce: Duration,
    #[serde(default = "default_tick", deserialize_with = "deserialize_duration")]
    pub tick: Duration,
    #[serde(default = "default_pages")]
    pub pages: Vec<PageConfig>,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            debounce: default_debounce(),
            toggle_debounce: default_toggle_debounce(),
            tick: default_tick(),
            pages: default_pages(),
        }
    }
}

fn default_debounce() -> Duration {
    Duration::from_millis(200)
}

fn default_toggle_debounce() -> Duration {
    Duration::from_millis(600)
}

fn default_tick() -> Duration {
    Duration::from_millis(100)
}

fn default_pages() -> Vec<PageConfig> {
    let page = |page, refresh: Option<u64>| PageConfig {
        page,
        refresh: refresh.map(Duration::from_secs),
        enabled: true,
    };
    vec![
        page(PageId::Main, Some(1)),
        page(PageId::AzElPlot, Some(15)),
        page(PageId::PolarPlot, Some(15)),
        page(PageId::PassTable, None),
        page(PageId::GroundTrack, Some(5)),
        PageConfig {
            page: PageId::Crew,
            refresh: None,
            enabled: false,
        },
    ]
}

#[derive(Debug, Clone, Deserialize)]
pub struct PageConfig {
    pub page: PageId,
    #[serde(default, deserialize_with = "deserialize_optional_duration")]
    pub refresh: Option<Duration>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct TimeSyncConfig {
    #[serde(default = "default_sync_retry")]
    pub retry: RetryPolicy,
    #[serde(default = "default_time_sources")]
    pub sources: Vec<TimeSourceConfig>,
}

impl Default for TimeSyncConfig {
    fn default() -> Self {
        Self {
            retry: default_sync_retry(),
            sources: default_time_sources(),
        }
    }
}

fn default_sync_retry() -> RetryPolicy {
    RetryPolicy::new(3, Duration::from_secs(1))
}

fn default_time_sources() -> Vec<TimeSourceConfig> {
    vec![TimeSourceConfig::System]
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TimeSourceConfig {
    HttpDate { url: String },
    System,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:4235".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiKey {
    pub key: String,
    pub name: String,
    pub permissions: HashSet<Permission>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    ControlDisplay,
}

impl Config {
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.satellite.catalog_id == 0 {
            return Err(ConfigError::Invalid("satellite.catalog_id must be positive".into()));
        }
        self.observer_location()?;
        if !(-14 * 3600..=14 * 3600).contains(&self.observer.utc_offset_s) {
            return Err(ConfigError::Invalid(format!(
                "observer.utc_offset_s {} is out of range",
                self.observer.utc_offset_s
            )));
        }
        if !self.elements.source_url.contains("{catalog_id}") {
            return Err(ConfigError::Invalid(
                "elements.source_url must contain a {catalog_id} placeholder".into(),
            ));
        }
        if self.elements.retry.attempts == 0 || self.time_sync.retry.attempts == 0 {
            return Err(ConfigError::Invalid("retry attempts must be at least 1".into()));
        }
        if self.prediction.max_iterations == 0 {
            return Err(ConfigError::Invalid(
                "prediction.max_iterations must be at least 1".into(),
            ));
        }
        if self.notifications.lead_time_s < 0 {
            return Err(ConfigError::Invalid(
                "notifications.lead_time_s must not be negative".into(),
            ));
        }
        if self.time_sync.sources.is_empty() {
            return Err(ConfigError::Invalid("time_sync.sources must not be empty".into()));
        }

        let mut seen = HashSet::new();
        for page in &self.display.pages {
            if !seen.insert(page.page) {
                return Err(ConfigError::Invalid(format!(
                    "page {} is listed more than once",
                    page.page
                )));
            }
            if page.refresh.is_some_and(|r| r.is_zero()) {
                return Err(ConfigError::Invalid(format!(
                    "page {} has a zero refresh interval",
                    page.page
                )));
            }
        }
        if !self
            .display
            .pages
            .iter()
            .any(|p| p.enabled && p.page == PageId::Main)
        {
            return Err(ConfigError::Invalid("the main page must be listed and enabled".into()));
        }
        if self.display.tick.is_zero() {
            return Err(ConfigError::Invalid("display.tick must be non-zero".into()));
        }
        Ok(())
    }

    pub fn observer_location(&self) -> Result<Observer, ConfigError> {
        let observer = Observer::from_coordinates(
            &self.observer.coordinates,
            Some(self.observer.altitude_m),
        )
        .ok_or_else(|| {
            ConfigError::Invalid(format!(
                "observer.coordinates '{}' is not 'lat, lon'",
                self.observer.coordinates
            ))
        })?;
        if !(-90.0..=90.0).contains(&observer.latitude_deg)
            || !(-180.0..=180.0).contains(&observer.longitude_deg)
        {
            return Err(ConfigError::Invalid(format!(
                "observer.coordinates '{}' out of range",
                self.observer.coordinates
            )));
        }
        Ok(observer)
    }

    pub fn utc_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.observer.utc_offset_s).unwrap_or_else(|| Utc.fix())
    }

    pub fn find_api_key(&self, key: &str) -> Option<&ApiKey> {
        self.api_keys.iter().find(|k| k.key == key)
    }
}

pub fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    humantime::parse_duration(&s).map_err(serde::de::Error::custom)
}

fn deserialize_optional_duration<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = Option::<String>::deserialize(deserializer)?;
    s.map(|s| humantime::parse_duration(&s).map_err(serde::de::Error::custom))
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
satellite:
  catalog_id: 25544
observer:
  coordinates: "46.4666463, 6.8615008"
  altitude_m: 500
"#;

    #[test]
    fn minimal_config_gets_defaults() {
        let config = Config::from_yaml(MINIMAL).unwrap();
        assert_eq!(config.satellite.catalog_id, 25544);
        assert_eq!(config.elements.stale_after, Duration::from_secs(3600));
        assert_eq!(config.prediction.lookahead, Duration::from_secs(600));
        assert_eq!(config.prediction.max_iterations, 100);
        assert_eq!(config.display.debounce, Duration::from_millis(200));
        assert_eq!(config.display.pages.len(), 6);
        assert!(!config.display.pages[5].enabled);
        assert_eq!(config.web.bind, "0.0.0.0:4235");

        let observer = config.observer_location().unwrap();
        assert!((observer.latitude_deg - 46.4666463).abs() < 1e-9);
        assert!((observer.altitude_m - 500.0).abs() < 1e-9);
    }

    #[test]
    fn full_config_parses_humantime_and_sources() {
        let yaml = r#"
satellite:
  catalog_id: 33591
observer:
  name: home
  coordinates: "46.4666463, 6.8615008"
  altitude_m: 500
  utc_offset_s: 7200
elements:
  source_url: "http://example.org/tle?CATNR={catalog_id}"
  stale_after: 6h
  retry:
    attempts: 5
    backoff: 500ms
notifications:
  lead_time_s: 15
display:
  pages:
    - page: main
      refresh: 1s
    - page: pass_table
    - page: crew
      enabled: false
time_sync:
  sources:
    - kind: http_date
      url: "http://example.org/"
    - kind: system
api_keys:
  - key: secret
    name: panel
    permissions: [control_display]
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.elements.stale_after, Duration::from_secs(6 * 3600));
        assert_eq!(config.elements.retry.attempts, 5);
        assert_eq!(config.elements.retry.backoff, Duration::from_millis(500));
        assert_eq!(config.display.pages.len(), 3);
        assert_eq!(config.display.pages[1].refresh, None);
        assert_eq!(
            config.time_sync.sources[0],
            TimeSourceConfig::HttpDate {
                url: "http://example.org/".into()
            }
        );
        assert_eq!(config.utc_offset().local_minus_utc(), 7200);
        let key = config.find_api_key("secret").unwrap();
        assert!(key.permissions.contains(&Permission::ControlDisplay));
        assert!(config.find_api_key("nope").is_none());
    }

    #[test]
    fn rejects_bad_coordinates() {
        let yaml = MINIMAL.replace("46.4666463, 6.8615008", "north-ish");
        assert!(matches!(Config::from_yaml(&yaml), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn rejects_duplicate_pages() {
        let yaml = format!("{MINIMAL}display:\n  pages:\n    - page: main\n    - page: main\n");
        assert!(matches!(Config::from_yaml(&yaml), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn rejects_missing_main_page() {
        let yaml = format!("{MINIMAL}display:\n  pages:\n    - page: pass_table\n");
        assert!(matches!(Config::from_yaml(&yaml), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn rejects_source_without_placeholder() {
        let yaml = format!("{MINIMAL}elements:\n  source_url: \"http://example.org/tle\"\n");
        assert!(matches!(Config::from_yaml(&yaml), Err(ConfigError::Invalid(_))));
    }
}
