use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use url::Url;

pub fn load(config_path: &str) -> Arc<Config> {
    let reader = File::open(config_path).unwrap_or_else(|err| {
        panic!("Failed to open {config_path}: {err}");
    });
    let config: Config = serde_yaml::from_reader(reader).unwrap_or_else(|err| {
        panic!("Failed to parse {config_path}: {err}");
    });
    config.validate();
    Arc::new(config)
}

// result

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub batcher: BatcherConfig,
    #[serde(default)]
    pub clock: ClockConfig,
    #[serde(default)]
    pub timetable: TimetableConfig,
}

impl Config {
    fn validate(&self) {
        self.api.validate();
        self.batcher.validate();
        self.clock.validate();
        self.timetable.validate();
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
#[serde(deny_unknown_fields)]
pub struct ApiConfig {
    #[serde(default = "ApiConfig::default_base_url")]
    pub base_url: Url,
}

impl ApiConfig {
    fn default_base_url() -> Url {
        // The literal is a valid URL.
        Url::parse("http://localhost:8000/api").unwrap()
    }

    fn validate(&self) {
        assert!(
            matches!(self.base_url.scheme(), "http" | "https"),
            "config.api: `base-url` must be an HTTP(S) URL"
        );
        assert!(
            !self.base_url.cannot_be_a_base(),
            "config.api: `base-url` must be a base URL"
        );
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        ApiConfig {
            base_url: Self::default_base_url(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
#[serde(deny_unknown_fields)]
pub struct BatcherConfig {
    #[serde(default = "BatcherConfig::default_max_batch_size")]
    pub max_batch_size: usize,
    #[serde(default = "BatcherConfig::default_window")]
    #[serde(with = "humantime_serde")]
    pub window: Duration,
}

impl BatcherConfig {
    fn default_max_batch_size() -> usize {
        100
    }

    fn default_window() -> Duration {
        Duration::from_secs(1)
    }

    fn validate(&self) {
        assert!(
            self.max_batch_size > 0,
            "config.batcher: `max-batch-size` must be larger than 0"
        );
        assert!(
            !self.window.is_zero(),
            "config.batcher: `window` must be larger than 0"
        );
    }
}

impl Default for BatcherConfig {
    fn default() -> Self {
        BatcherConfig {
            max_batch_size: Self::default_max_batch_size(),
            window: Self::default_window(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
#[serde(deny_unknown_fields)]
pub struct ClockConfig {
    #[serde(default = "ClockConfig::default_debounce")]
    #[serde(with = "humantime_serde")]
    pub debounce: Duration,
}

impl ClockConfig {
    fn default_debounce() -> Duration {
        Duration::from_millis(50)
    }

    fn validate(&self) {
        // A zero debounce is allowed; updates still happen asynchronously.
    }
}

impl Default for ClockConfig {
    fn default() -> Self {
        ClockConfig {
            debounce: Self::default_debounce(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
#[serde(deny_unknown_fields)]
pub struct TimetableConfig {
    #[serde(default = "TimetableConfig::default_height_one_hour")]
    pub height_one_hour: u32,
    #[serde(default)]
    pub column_widths_path: Option<PathBuf>,
    #[serde(default = "TimetableConfig::default_persist_delay")]
    #[serde(with = "humantime_serde")]
    pub persist_delay: Duration,
}

impl TimetableConfig {
    fn default_height_one_hour() -> u32 {
        500
    }

    fn default_persist_delay() -> Duration {
        Duration::from_secs(1)
    }

    fn validate(&self) {
        assert!(
            self.height_one_hour > 0,
            "config.timetable: `height-one-hour` must be larger than 0"
        );
        if let Some(path) = self.column_widths_path.as_ref() {
            assert!(
                path.is_absolute(),
                "config.timetable: `column-widths-path` must be an absolute path"
            );
            if let Some(parent) = path.parent() {
                assert!(
                    parent.is_dir(),
                    "config.timetable: The parent directory of `column-widths-path` must exist"
                );
            }
        }
    }
}

impl Default for TimetableConfig {
    fn default() -> Self {
        TimetableConfig {
            height_one_hour: Self::default_height_one_hour(),
            column_widths_path: None,
            persist_delay: Self::default_persist_delay(),
        }
    }
}

// <coverage:exclude>
#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_load() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
            batcher:
              max-batch-size: 10
        "#
        )
        .unwrap();
        let config = load(file.path().to_str().unwrap());
        assert_eq!(config.batcher.max_batch_size, 10);
        assert_eq!(config.batcher.window, Duration::from_secs(1));
    }

    #[test]
    #[should_panic]
    fn test_load_no_file() {
        load("/no/such/config.yml");
    }

    #[test]
    fn test_config() {
        assert_eq!(
            serde_yaml::from_str::<Config>("{}").unwrap(),
            Default::default()
        );

        let result = serde_yaml::from_str::<Config>(
            r#"
            unknown:
              property: value
        "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_api_config() {
        assert_eq!(
            serde_yaml::from_str::<ApiConfig>("{}").unwrap(),
            Default::default()
        );
        assert_eq!(
            ApiConfig::default().base_url.as_str(),
            "http://localhost:8000/api"
        );

        assert_eq!(
            serde_yaml::from_str::<ApiConfig>(
                r#"
                base-url: https://arema.example/api/
            "#
            )
            .unwrap(),
            ApiConfig {
                base_url: Url::parse("https://arema.example/api/").unwrap(),
            }
        );

        let result = serde_yaml::from_str::<ApiConfig>(
            r#"
            base-url: not a url
        "#,
        );
        assert!(result.is_err());
    }

    #[test]
    #[should_panic]
    fn test_api_config_validate_scheme() {
        let config = ApiConfig {
            base_url: Url::parse("ftp://arema.example/").unwrap(),
        };
        config.validate();
    }

    #[test]
    fn test_batcher_config() {
        assert_eq!(
            serde_yaml::from_str::<BatcherConfig>("{}").unwrap(),
            Default::default()
        );

        assert_eq!(
            serde_yaml::from_str::<BatcherConfig>(
                r#"
                max-batch-size: 50
                window: 200ms
            "#
            )
            .unwrap(),
            BatcherConfig {
                max_batch_size: 50,
                window: Duration::from_millis(200),
            }
        );
    }

    #[test]
    #[should_panic]
    fn test_batcher_config_validate_max_batch_size() {
        let config = BatcherConfig {
            max_batch_size: 0,
            ..Default::default()
        };
        config.validate();
    }

    #[test]
    #[should_panic]
    fn test_batcher_config_validate_window() {
        let config = BatcherConfig {
            window: Duration::ZERO,
            ..Default::default()
        };
        config.validate();
    }

    #[test]
    fn test_clock_config() {
        assert_eq!(
            serde_yaml::from_str::<ClockConfig>("{}").unwrap(),
            ClockConfig {
                debounce: Duration::from_millis(50),
            }
        );
        assert_eq!(
            serde_yaml::from_str::<ClockConfig>("debounce: 1s").unwrap(),
            ClockConfig {
                debounce: Duration::from_secs(1),
            }
        );
    }

    #[test]
    fn test_timetable_config() {
        assert_eq!(
            serde_yaml::from_str::<TimetableConfig>("{}").unwrap(),
            Default::default()
        );

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("widths.json");
        let config = serde_yaml::from_str::<TimetableConfig>(&format!(
            r#"
            height-one-hour: 600
            column-widths-path: {}
            persist-delay: 2s
        "#,
            path.display()
        ))
        .unwrap();
        assert_eq!(
            config,
            TimetableConfig {
                height_one_hour: 600,
                column_widths_path: Some(path),
                persist_delay: Duration::from_secs(2),
            }
        );
        config.validate();
    }

    #[test]
    #[should_panic]
    fn test_timetable_config_validate_relative_path() {
        let config = TimetableConfig {
            column_widths_path: Some("widths.json".into()),
            ..Default::default()
        };
        config.validate();
    }
}
// </coverage:exclude>
