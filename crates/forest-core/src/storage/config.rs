//! TOML-based application configuration.
//!
//! Stores:
//! - Scheduler tunables (slot length, meal length, high-energy windows)
//! - Defaults applied to new projects and to CLI commands
//!
//! Configuration is stored at `~/.config/forest/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::error::{ConfigError, Result};
use crate::schedule::SynthesizerConfig;
use crate::time;

/// `[scheduler]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerSettings {
    #[serde(default = "default_slot_minutes")]
    pub slot_minutes: u32,
    #[serde(default = "default_meal_minutes")]
    pub meal_minutes: u32,
    #[serde(default = "default_high_energy_hours")]
    pub high_energy_hours_after_wake: u32,
    #[serde(default = "default_afternoon_start")]
    pub afternoon_window_start: String,
    #[serde(default = "default_afternoon_minutes")]
    pub afternoon_window_minutes: u32,
    #[serde(default = "default_high_magnitude_threshold")]
    pub high_magnitude_threshold: u8,
    #[serde(default = "default_habit_tolerance")]
    pub habit_tolerance_minutes: u32,
    #[serde(default = "default_break_minutes")]
    pub break_minutes: u32,
    #[serde(default = "default_deep_focus")]
    pub deep_focus_minutes: u32,
    #[serde(default = "default_light_focus")]
    pub light_focus_minutes: u32,
}

/// `[defaults]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Project used by CLI commands when none is given
    #[serde(default)]
    pub project: Option<String>,
    #[serde(default = "default_wake_time")]
    pub wake_time: String,
    #[serde(default = "default_sleep_time")]
    pub sleep_time: String,
    #[serde(default = "default_meal_times")]
    pub meal_times: Vec<String>,
    #[serde(default = "default_focus_duration")]
    pub focus_duration: String,
    /// Energy level assumed when a command does not ask (1-5)
    #[serde(default = "default_energy_level")]
    pub energy_level: u8,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/forest/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub scheduler: SchedulerSettings,
    #[serde(default)]
    pub defaults: DefaultsConfig,
}

fn default_slot_minutes() -> u32 {
    15
}
fn default_meal_minutes() -> u32 {
    30
}
fn default_high_energy_hours() -> u32 {
    3
}
fn default_afternoon_start() -> String {
    "2:00 PM".into()
}
fn default_afternoon_minutes() -> u32 {
    120
}
fn default_high_magnitude_threshold() -> u8 {
    7
}
fn default_habit_tolerance() -> u32 {
    30
}
fn default_break_minutes() -> u32 {
    10
}
fn default_deep_focus() -> u32 {
    90
}
fn default_light_focus() -> u32 {
    30
}
fn default_wake_time() -> String {
    "8:00 AM".into()
}
fn default_sleep_time() -> String {
    "11:00 PM".into()
}
fn default_meal_times() -> Vec<String> {
    vec!["8:30 AM".into(), "12:30 PM".into(), "6:30 PM".into()]
}
fn default_focus_duration() -> String {
    "25 minutes".into()
}
fn default_energy_level() -> u8 {
    3
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            slot_minutes: default_slot_minutes(),
            meal_minutes: default_meal_minutes(),
            high_energy_hours_after_wake: default_high_energy_hours(),
            afternoon_window_start: default_afternoon_start(),
            afternoon_window_minutes: default_afternoon_minutes(),
            high_magnitude_threshold: default_high_magnitude_threshold(),
            habit_tolerance_minutes: default_habit_tolerance(),
            break_minutes: default_break_minutes(),
            deep_focus_minutes: default_deep_focus(),
            light_focus_minutes: default_light_focus(),
        }
    }
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            project: None,
            wake_time: default_wake_time(),
            sleep_time: default_sleep_time(),
            meal_times: default_meal_times(),
            focus_duration: default_focus_duration(),
            energy_level: default_energy_level(),
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_some() {
                current = current.get_mut(part).ok_or_else(unknown)?;
                continue;
            }

            let obj = current.as_object_mut().ok_or_else(unknown)?;
            let existing = obj.get(part).ok_or_else(unknown)?;
            let new_value = match existing {
                serde_json::Value::Bool(_) => serde_json::Value::Bool(
                    value.parse::<bool>().map_err(|e| invalid(e.to_string()))?,
                ),
                serde_json::Value::Number(_) => {
                    let n = value
                        .parse::<u64>()
                        .map_err(|_| invalid(format!("cannot parse '{value}' as a whole number")))?;
                    serde_json::Value::Number(n.into())
                }
                serde_json::Value::Array(_) => {
                    if value.trim_start().starts_with('[') {
                        serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                    } else {
                        serde_json::Value::Array(
                            value
                                .split(',')
                                .map(str::trim)
                                .filter(|v| !v.is_empty())
                                .map(|v| serde_json::Value::String(v.to_string()))
                                .collect(),
                        )
                    }
                }
                serde_json::Value::Object(_) => {
                    serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                }
                _ => serde_json::Value::String(value.into()),
            };
            obj.insert(part.to_string(), new_value);
            return Ok(());
        }

        Err(unknown())
    }

    /// `config.toml` inside [`data_dir`].
    pub fn path() -> Result<PathBuf> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Parse a TOML document; missing keys take their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load from `path`, or return defaults when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(|e| {
                ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                }
                .into()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }
            .into()),
        }
    }

    /// Load from the default location.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::path()?)
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|err| {
            tracing::warn!(error = %err, "falling back to default configuration");
            Self::default()
        })
    }

    /// Persist to `path`.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))?;
        Ok(())
    }

    /// Persist to the default location.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::path()?)
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Null => Some(String::new()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by key, validating the result. Does not save.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value cannot be parsed
    /// into the field's type.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let mut json = serde_json::to_value(&*self)?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Every leaf key with its current value, in dot-path form.
    pub fn entries(&self) -> Vec<(String, String)> {
        fn walk(prefix: &str, value: &serde_json::Value, out: &mut Vec<(String, String)>) {
            match value {
                serde_json::Value::Object(map) => {
                    for (k, v) in map {
                        let key = if prefix.is_empty() {
                            k.clone()
                        } else {
                            format!("{prefix}.{k}")
                        };
                        walk(&key, v, out);
                    }
                }
                serde_json::Value::String(s) => out.push((prefix.to_string(), s.clone())),
                serde_json::Value::Null => out.push((prefix.to_string(), String::new())),
                other => out.push((prefix.to_string(), other.to_string())),
            }
        }

        let mut out = Vec::new();
        if let Ok(json) = serde_json::to_value(self) {
            walk("", &json, &mut out);
        }
        out
    }

    /// Check every value that has a restricted range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.synthesizer_config()?;
        if !(1..=5).contains(&self.defaults.energy_level) {
            return Err(ConfigError::InvalidValue {
                key: "defaults.energy_level".into(),
                message: "must be between 1 and 5".into(),
            });
        }
        Ok(())
    }

    /// Scheduler tunables resolved into a [`SynthesizerConfig`].
    ///
    /// # Errors
    ///
    /// `ConfigError::InvalidValue` for a zero slot length, a break that does
    /// not fit inside a slot, a threshold outside 1-10, or an unparsable
    /// afternoon start.
    pub fn synthesizer_config(&self) -> Result<SynthesizerConfig, ConfigError> {
        let s = &self.scheduler;
        let invalid = |key: &str, message: String| ConfigError::InvalidValue {
            key: format!("scheduler.{key}"),
            message,
        };

        if s.slot_minutes == 0 {
            return Err(invalid("slot_minutes", "must be at least 1".into()));
        }
        if s.break_minutes == 0 || s.break_minutes >= s.slot_minutes {
            return Err(invalid(
                "break_minutes",
                format!("must be between 1 and {}", s.slot_minutes.saturating_sub(1)),
            ));
        }
        if !(1..=10).contains(&s.high_magnitude_threshold) {
            return Err(invalid("high_magnitude_threshold", "must be between 1 and 10".into()));
        }
        let afternoon_window_start = time::parse_time(&s.afternoon_window_start)
            .map_err(|e| invalid("afternoon_window_start", e.to_string()))?;

        let defaults = SynthesizerConfig::default();
        Ok(SynthesizerConfig {
            slot_minutes: s.slot_minutes,
            meal_minutes: s.meal_minutes,
            high_energy_minutes_after_wake: s.high_energy_hours_after_wake * 60,
            afternoon_window_start,
            afternoon_window_minutes: s.afternoon_window_minutes,
            high_magnitude_threshold: s.high_magnitude_threshold,
            habit_tolerance_minutes: s.habit_tolerance_minutes,
            break_minutes: s.break_minutes,
            deep_focus_minutes: s.deep_focus_minutes,
            light_focus_minutes: s.light_focus_minutes,
            ..defaults
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed = Config::from_toml_str(&toml_str).unwrap();
        assert_eq!(parsed, cfg);
    }

    #[test]
    fn partial_file_takes_defaults() {
        let parsed = Config::from_toml_str("[scheduler]\nslot_minutes = 20\n").unwrap();
        assert_eq!(parsed.scheduler.slot_minutes, 20);
        assert_eq!(parsed.scheduler.meal_minutes, 30);
        assert_eq!(parsed.defaults.wake_time, "8:00 AM");
    }

    #[test]
    fn malformed_toml_is_an_error() {
        assert!(matches!(
            Config::from_toml_str("[scheduler\n"),
            Err(CoreError::Toml(_))
        ));
    }

    #[test]
    fn defaults_match_synthesizer_defaults() {
        let resolved = Config::default().synthesizer_config().unwrap();
        assert_eq!(resolved, SynthesizerConfig::default());
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("scheduler.slot_minutes").as_deref(), Some("15"));
        assert_eq!(cfg.get("defaults.wake_time").as_deref(), Some("8:00 AM"));
        assert_eq!(cfg.get("defaults.project").as_deref(), Some(""));
        assert!(cfg.get("scheduler.missing_key").is_none());
    }

    #[test]
    fn set_updates_numbers_strings_and_lists() {
        let mut cfg = Config::default();
        cfg.set("scheduler.meal_minutes", "45").unwrap();
        cfg.set("defaults.project", "piano").unwrap();
        cfg.set("defaults.meal_times", "7:00 AM, 1:00 PM").unwrap();
        assert_eq!(cfg.scheduler.meal_minutes, 45);
        assert_eq!(cfg.defaults.project.as_deref(), Some("piano"));
        assert_eq!(cfg.defaults.meal_times, vec!["7:00 AM", "1:00 PM"]);
    }

    #[test]
    fn set_rejects_unknown_keys_and_bad_values() {
        let mut cfg = Config::default();
        assert!(matches!(
            cfg.set("scheduler.nonexistent", "1"),
            Err(CoreError::Config(ConfigError::UnknownKey(_)))
        ));
        assert!(cfg.set("scheduler.slot_minutes", "fifteen").is_err());
        assert!(cfg.set("scheduler.slot_minutes", "0").is_err());
        assert!(cfg.set("scheduler.afternoon_window_start", "teatime").is_err());
        assert!(cfg.set("defaults.energy_level", "9").is_err());
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn entries_list_every_leaf() {
        let entries = Config::default().entries();
        assert!(entries
            .iter()
            .any(|(k, v)| k == "scheduler.break_minutes" && v == "10"));
        assert!(entries.iter().any(|(k, _)| k == "defaults.meal_times"));
    }

    #[test]
    fn save_and_load_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        assert_eq!(Config::load_from(&path).unwrap(), Config::default());

        let mut cfg = Config::default();
        cfg.set("defaults.energy_level", "4").unwrap();
        cfg.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap().defaults.energy_level, 4);
    }
}
