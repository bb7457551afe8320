use std::error::Error;
use std::fmt;
use std::path::{Path, PathBuf};

use crossterm::event::KeyCode;
use serde::Deserialize;

use crate::analysis::{ReportLimits, Thresholds};
use crate::system::{CollectOptions, Profile};

/// Longest batch investigation accepted: 30 days.
pub const MAX_DURATION_MINUTES: u64 = 30 * 24 * 60;
/// Longest sampling or redraw period accepted: one day.
pub const MAX_PERIOD_SECS: u64 = 24 * 60 * 60;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,
    pub live: LiveConfig,
    pub limits: LimitsConfig,
    pub thresholds: Thresholds,
    pub colors: ColorsConfig,
    pub keybinds: KeybindsConfig,
}

/// Batch investigation settings.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub interval_secs: u64,
    pub duration_minutes: u64,
    pub output_dir: PathBuf,
    pub write_summaries: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        GeneralConfig {
            interval_secs: 30,
            duration_minutes: 60,
            output_dir: PathBuf::from("."),
            write_summaries: true,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LiveConfig {
    pub interval_secs: u64,
    pub refresh_secs: u64,
    pub history: usize,
}

impl Default for LiveConfig {
    fn default() -> Self {
        LiveConfig {
            interval_secs: 5,
            refresh_secs: 1,
            history: 200,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub top_processes: usize,
    pub top_slab_caches: usize,
    pub report_mlocked: usize,
    pub report_slab_diffs: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        LimitsConfig {
            top_processes: 50,
            top_slab_caches: 20,
            report_mlocked: 10,
            report_slab_diffs: 10,
        }
    }
}

impl LimitsConfig {
    pub fn collect_options(&self, profile: Profile) -> CollectOptions {
        CollectOptions {
            profile,
            top_processes: self.top_processes,
            top_slab_caches: self.top_slab_caches,
        }
    }

    pub fn report_limits(&self) -> ReportLimits {
        ReportLimits {
            mlocked_processes: self.report_mlocked,
            slab_diffs: self.report_slab_diffs,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ColorsConfig {
    pub theme: String,
}

impl Default for ColorsConfig {
    fn default() -> Self {
        ColorsConfig {
            theme: "dark".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct KeybindsConfig {
    pub quit: String,
    pub cycle_metric: String,
    pub help: String,
    pub refresh: String,
}

impl Default for KeybindsConfig {
    fn default() -> Self {
        KeybindsConfig {
            quit: "q".to_string(),
            cycle_metric: "m".to_string(),
            help: "?".to_string(),
            refresh: "r".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    Zero { field: &'static str },
    NotPositive { field: &'static str, value: f64 },
    TooLarge { field: &'static str, max: u64 },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Zero { field } => write!(f, "{field} must be greater than 0"),
            ConfigError::NotPositive { field, value } => {
                write!(f, "{field} must be positive, got {value}")
            }
            ConfigError::TooLarge { field, max } => write!(f, "{field} must be at most {max}"),
        }
    }
}

impl Error for ConfigError {}

impl Config {
    /// Rejects settings the collection loop or analyzer cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let counts: [(&'static str, u64); 7] = [
            ("general.interval_secs", self.general.interval_secs),
            ("general.duration_minutes", self.general.duration_minutes),
            ("live.interval_secs", self.live.interval_secs),
            ("live.refresh_secs", self.live.refresh_secs),
            ("live.history", self.live.history as u64),
            ("limits.top_processes", self.limits.top_processes as u64),
            ("limits.top_slab_caches", self.limits.top_slab_caches as u64),
        ];
        if let Some((field, _)) = counts.iter().find(|(_, v)| *v == 0) {
            return Err(ConfigError::Zero { field });
        }

        let bounded: [(&'static str, u64, u64); 4] = [
            ("general.interval_secs", self.general.interval_secs, MAX_PERIOD_SECS),
            (
                "general.duration_minutes",
                self.general.duration_minutes,
                MAX_DURATION_MINUTES,
            ),
            ("live.interval_secs", self.live.interval_secs, MAX_PERIOD_SECS),
            ("live.refresh_secs", self.live.refresh_secs, MAX_PERIOD_SECS),
        ];
        if let Some(&(field, _, max)) = bounded.iter().find(|(_, v, max)| v > max) {
            return Err(ConfigError::TooLarge { field, max });
        }

        let t = &self.thresholds;
        let limits: [(&'static str, f64); 7] = [
            ("thresholds.significance_mb", t.significance_mb),
            ("thresholds.slab_cache_mb", t.slab_cache_mb),
            ("thresholds.unevictable_growth_mb", t.unevictable_growth_mb),
            ("thresholds.mlocked_growth_mb", t.mlocked_growth_mb),
            ("thresholds.slab_growth_mb", t.slab_growth_mb),
            ("thresholds.page_tables_growth_mb", t.page_tables_growth_mb),
            ("thresholds.process_increase_percent", t.process_increase_percent),
        ];
        // `!(v > 0.0)` also catches NaN
        if let Some(&(field, value)) = limits.iter().find(|(_, v)| !(*v > 0.0)) {
            return Err(ConfigError::NotPositive { field, value });
        }
        if t.process_min_samples == 0 {
            return Err(ConfigError::Zero {
                field: "thresholds.process_min_samples",
            });
        }
        Ok(())
    }
}

/// Parses a keybind string: a single character or a named key.
pub fn parse_key(s: &str) -> Option<KeyCode> {
    let mut chars = s.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        return Some(KeyCode::Char(c));
    }
    match s.to_ascii_lowercase().as_str() {
        "enter" => Some(KeyCode::Enter),
        "esc" | "escape" => Some(KeyCode::Esc),
        "tab" => Some(KeyCode::Tab),
        "space" => Some(KeyCode::Char(' ')),
        "backspace" => Some(KeyCode::Backspace),
        "f1" => Some(KeyCode::F(1)),
        _ => None,
    }
}

pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("memtrend").join("config.toml"))
}

pub fn load_config() -> Config {
    match config_path() {
        Some(path) if path.exists() => load_config_from_path(&path),
        _ => Config::default(),
    }
}

pub fn load_config_from_path(path: &Path) -> Config {
    match std::fs::read_to_string(path) {
        Ok(contents) => toml::from_str(&contents).unwrap_or_else(|err| {
            tracing::warn!(path = %path.display(), %err, "ignoring unparsable config");
            Config::default()
        }),
        Err(_) => Config::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let config = Config::default();
        assert_eq!(config.general.interval_secs, 30);
        assert_eq!(config.general.duration_minutes, 60);
        assert!(config.general.write_summaries);
        assert_eq!(config.live.history, 200);
        assert_eq!(config.limits.top_processes, 50);
        assert_eq!(config.thresholds.unevictable_growth_mb, 50.0);
        assert_eq!(config.colors.theme, "dark");
        assert_eq!(config.keybinds.cycle_metric, "m");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parse_partial_toml() {
        let toml_str = r#"
[general]
interval_secs = 10

[thresholds]
mlocked_growth_mb = 5.0
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.general.interval_secs, 10);
        assert_eq!(config.general.duration_minutes, 60);
        assert_eq!(config.thresholds.mlocked_growth_mb, 5.0);
        assert_eq!(config.thresholds.slab_growth_mb, 20.0);
    }

    #[test]
    fn parse_full_toml() {
        let toml_str = r#"
[general]
interval_secs = 15
duration_minutes = 120
output_dir = "/var/tmp"
write_summaries = false

[live]
interval_secs = 2
refresh_secs = 1
history = 50

[limits]
top_processes = 10
report_slab_diffs = 3

[colors]
theme = "light"

[keybinds]
quit = "x"
help = "F1"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.general.output_dir, PathBuf::from("/var/tmp"));
        assert!(!config.general.write_summaries);
        assert_eq!(config.live.history, 50);
        assert_eq!(config.limits.top_processes, 10);
        assert_eq!(config.limits.report_limits().slab_diffs, 3);
        assert_eq!(config.colors.theme, "light");
        assert_eq!(parse_key(&config.keybinds.quit), Some(KeyCode::Char('x')));
        assert_eq!(parse_key(&config.keybinds.help), Some(KeyCode::F(1)));
    }

    #[test]
    fn zero_interval_is_rejected() {
        let mut config = Config::default();
        config.general.interval_secs = 0;
        assert_eq!(
            config.validate(),
            Err(ConfigError::Zero {
                field: "general.interval_secs"
            })
        );
    }

    #[test]
    fn huge_duration_is_rejected() {
        let mut config = Config::default();
        config.general.duration_minutes = u64::MAX / 60 + 1;
        assert_eq!(
            config.validate(),
            Err(ConfigError::TooLarge {
                field: "general.duration_minutes",
                max: MAX_DURATION_MINUTES,
            })
        );

        config.general.duration_minutes = MAX_DURATION_MINUTES;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn huge_refresh_is_rejected() {
        let mut config = Config::default();
        config.live.refresh_secs = u64::MAX;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::TooLarge {
                field: "live.refresh_secs",
                ..
            })
        ));
    }

    #[test]
    fn negative_threshold_is_rejected() {
        let mut config = Config::default();
        config.thresholds.slab_growth_mb = -1.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NotPositive {
                field: "thresholds.slab_growth_mb",
                ..
            })
        ));
    }

    #[test]
    fn missing_file_returns_default() {
        let config = load_config_from_path(Path::new("/nonexistent/path/config.toml"));
        assert_eq!(config.general.interval_secs, 30);
    }

    #[test]
    fn invalid_toml_returns_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "this is not valid toml {{{{").unwrap();
        let config = load_config_from_path(&path);
        assert_eq!(config.general.interval_secs, 30);
    }

    #[test]
    fn unknown_key_names_do_not_parse() {
        assert_eq!(parse_key("hyper"), None);
        assert_eq!(parse_key("Space"), Some(KeyCode::Char(' ')));
    }
}
