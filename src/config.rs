use anyhow::{Context, Result, anyhow};
use directories::UserDirs;
use log::{info, warn};
use serde::{Deserialize, Deserializer, Serialize};
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error;

use crate::actions::Bindings;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{field} must be a finite number greater than zero, got {value}")]
    NotPositive { field: &'static str, value: f64 },
    #[error("{field} must be a finite, non-negative number, got {value}")]
    Negative { field: &'static str, value: f64 },
    #[error("{field} must hold at least one sample")]
    ZeroCapacity { field: &'static str },
    #[error("unknown binding '{0}'")]
    UnknownBinding(String),
    #[error("binding '{key}' has invalid action '{action}'")]
    InvalidAction { key: String, action: String },
}

/// Gesture thresholds. Distances are in normalized frame units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// How far a tip must clear its knuckle to count as raised.
    pub raise_margin: f32,
    /// Tip-to-knuckle distance under which a finger counts as folded.
    pub fist_distance: f32,
    pub scroll_threshold: f32,
    pub swipe_threshold: f32,
    pub cooldown_ms: u64,
    pub hold_ms: u64,
    pub history_len: usize,
    /// One finger only scrolls up, two fingers only scroll down.
    pub lock_scroll_direction: bool,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            raise_margin: 0.02,
            fist_distance: 0.10,
            scroll_threshold: 0.02,
            swipe_threshold: 0.15,
            cooldown_ms: 500,
            hold_ms: 2000,
            history_len: 5,
            lock_scroll_direction: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CursorSettings {
    pub smoothing_len: usize,
    pub sensitivity: f32,
    pub screen_width: u32,
    pub screen_height: u32,
}

impl Default for CursorSettings {
    fn default() -> Self {
        Self {
            smoothing_len: 3,
            sensitivity: 1.5,
            screen_width: 1920,
            screen_height: 1080,
        }
    }
}

/// Everything the frame processor needs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub thresholds: Thresholds,
    pub cursor: CursorSettings,
}

fn positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NotPositive {
            field,
            value: value.into(),
        })
    }
}

fn non_negative(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Negative {
            field,
            value: value.into(),
        })
    }
}

impl Settings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let th = &self.thresholds;
        non_negative("thresholds.raise_margin", th.raise_margin)?;
        positive("thresholds.fist_distance", th.fist_distance)?;
        positive("thresholds.scroll_threshold", th.scroll_threshold)?;
        positive("thresholds.swipe_threshold", th.swipe_threshold)?;
        if th.hold_ms == 0 {
            return Err(ConfigError::NotPositive {
                field: "thresholds.hold_ms",
                value: 0.0,
            });
        }
        if th.history_len == 0 {
            return Err(ConfigError::ZeroCapacity {
                field: "thresholds.history_len",
            });
        }

        let c = &self.cursor;
        if c.smoothing_len == 0 {
            return Err(ConfigError::ZeroCapacity {
                field: "cursor.smoothing_len",
            });
        }
        positive("cursor.sensitivity", c.sensitivity)?;
        positive("cursor.screen_width", c.screen_width as f32)?;
        positive("cursor.screen_height", c.screen_height as f32)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Meta {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub meta: Meta,
    #[serde(default)]
    pub thresholds: Thresholds,
    #[serde(default)]
    pub cursor: CursorSettings,

    // nested/dotted tables are flattened into "a.b" -> "value"
    #[serde(default, deserialize_with = "deserialize_bindings_flat")]
    pub bindings: HashMap<String, String>,
}

impl Profile {
    pub fn settings(&self) -> Settings {
        Settings {
            thresholds: self.thresholds.clone(),
            cursor: self.cursor.clone(),
        }
    }

    /// Default bindings overlaid with the ones in this profile.
    pub fn bindings(&self) -> Result<Bindings, ConfigError> {
        Bindings::with_overrides(&self.bindings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.settings().validate()?;
        self.bindings()?;
        Ok(())
    }

    pub fn parse(text: &str) -> Result<Self> {
        let profile: Profile = toml::from_str(text)?;
        profile.validate()?;
        Ok(profile)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let txt = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::parse(&txt).with_context(|| format!("invalid profile {}", path.display()))
    }
}

fn deserialize_bindings_flat<'de, D>(
    de: D,
) -> std::result::Result<HashMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let val = toml::Value::deserialize(de)?;
    let table = match val {
        toml::Value::Table(t) => t,
        other => {
            return Err(serde::de::Error::custom(format!(
                "bindings must be a table, got {}",
                other.type_str()
            )));
        }
    };

    let mut out = HashMap::new();
    flatten_table("", &table, &mut out).map_err(serde::de::Error::custom)?;
    Ok(out)
}

fn flatten_table(
    prefix: &str,
    table: &toml::value::Table,
    out: &mut HashMap<String, String>,
) -> std::result::Result<(), String> {
    for (k, v) in table {
        let key = if prefix.is_empty() {
            k.clone()
        } else {
            format!("{prefix}.{k}")
        };
        match v {
            toml::Value::String(s) => {
                out.insert(key, s.clone());
            }
            toml::Value::Table(sub) => {
                flatten_table(&key, sub, out)?;
            }
            other => {
                return Err(format!(
                    "binding '{}' value must be a string, got {}",
                    key,
                    other.type_str()
                ));
            }
        }
    }
    Ok(())
}

fn default_profile_text() -> &'static str {
    include_str!("../profiles/default.toml")
}

/// Profiles on disk plus the pointer naming the active one.
#[derive(Debug, Clone)]
pub struct ProfileStore {
    pub active_name: String,
    pub profile: Profile,
    pub config_dir: PathBuf,
    pub profiles_dir: PathBuf,
    pub active_ptr: PathBuf,
    /// Why the active profile could not be loaded; `profile` then holds the
    /// bundled default until another profile is activated.
    pub load_error: Option<String>,
}

impl ProfileStore {
    /// `$HANDCTL_CONFIG_DIR`, or `~/.config/handctl`.
    pub fn default_dir() -> Result<PathBuf> {
        if let Some(dir) = std::env::var_os("HANDCTL_CONFIG_DIR") {
            return Ok(PathBuf::from(dir));
        }
        let dirs = UserDirs::new().ok_or_else(|| anyhow!("cannot determine home directory"))?;
        Ok(dirs.home_dir().join(".config").join("handctl"))
    }

    pub fn open_default() -> Result<Self> {
        Self::open(Self::default_dir()?)
    }

    /// Opens the store rooted at `config_dir`, installing the bundled default
    /// profile and active pointer if they are missing. An active profile that
    /// fails to load does not fail the open; see [`ProfileStore::load_error`].
    pub fn open(config_dir: PathBuf) -> Result<Self> {
        let profiles_dir = config_dir.join("profiles");
        fs::create_dir_all(&profiles_dir)
            .with_context(|| format!("failed to create {}", profiles_dir.display()))?;

        let def_path = profiles_dir.join("default.toml");
        if !def_path.exists() {
            fs::write(&def_path, default_profile_text())?;
            info!("installed default profile at {}", def_path.display());
        }

        let active_ptr = config_dir.join("active");
        if !active_ptr.exists() {
            fs::write(&active_ptr, b"default")?;
        }

        let active_name = fs::read_to_string(&active_ptr)?.trim().to_string();
        let (profile, load_error) =
            match Profile::load(&profiles_dir.join(format!("{active_name}.toml"))) {
                Ok(p) => (p, None),
                Err(e) => {
                    warn!("active profile '{active_name}' unusable, falling back to bundled default: {e:#}");
                    let fallback = Profile::parse(default_profile_text()).unwrap_or_default();
                    (fallback, Some(format!("{e:#}")))
                }
            };

        Ok(Self {
            active_name,
            profile,
            config_dir,
            profiles_dir,
            active_ptr,
            load_error,
        })
    }

    pub fn profile_path(&self, name: &str) -> PathBuf {
        self.profiles_dir.join(format!("{name}.toml"))
    }

    pub fn active_path(&self) -> PathBuf {
        self.profile_path(&self.active_name)
    }

    /// Re-reads the active profile; on error the last good one is kept.
    pub fn reload(&mut self) -> Result<()> {
        self.profile = Profile::load(&self.active_path())?;
        self.load_error = None;
        Ok(())
    }

    pub fn set_active(&mut self, name: &str) -> Result<()> {
        if name.is_empty() || name.contains(['/', '\\']) || name.starts_with('.') {
            return Err(anyhow!("invalid profile name: '{name}'"));
        }
        let p = self.profile_path(name);
        if !p.exists() {
            return Err(anyhow!("profile not found: {}", p.display()));
        }
        let profile = Profile::load(&p)?;
        fs::write(&self.active_ptr, name.as_bytes())?;
        self.active_name = name.to_string();
        self.profile = profile;
        self.load_error = None;
        Ok(())
    }

    pub fn list_profiles(&self) -> Vec<String> {
        let mut v = Vec::new();
        if let Ok(rd) = fs::read_dir(&self.profiles_dir) {
            for e in rd.flatten() {
                let path = e.path();
                if path.extension().is_some_and(|ext| ext == "toml") {
                    if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                        v.push(stem.to_string());
                    }
                }
            }
        }
        v.sort();
        v
    }

    pub fn doctor_report(&self) -> serde_json::Value {
        let profiles: Vec<serde_json::Value> = self
            .list_profiles()
            .into_iter()
            .map(|name| {
                let status = match Profile::load(&self.profile_path(&name)) {
                    Ok(_) => "ok".to_string(),
                    Err(e) => format!("{e:#}"),
                };
                serde_json::json!({ "name": name, "status": status })
            })
            .collect();
        serde_json::json!({
            "config_dir": self.config_dir,
            "profiles_dir": self.profiles_dir,
            "active_profile": self.active_name,
            "active_status": self.load_error.as_deref().unwrap_or("ok"),
            "profiles": profiles,
            "settings": self.profile.settings(),
        })
    }
}
