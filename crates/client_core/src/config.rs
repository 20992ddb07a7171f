use std::{fs, path::Path};

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use shared::domain::RoomId;
use url::Url;

use crate::repository::trim_base;

pub const DEFAULT_API_BASE: &str = "/api";
pub const DEFAULT_ORIGIN: &str = "http://127.0.0.1:8000";
pub const SETTINGS_FILE: &str = "participants.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub api_base: String,
    /// Origin that relative api bases are resolved against.
    pub origin: String,
    pub room_id: Option<String>,
    pub admin_code: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.into(),
            origin: DEFAULT_ORIGIN.into(),
            room_id: None,
            admin_code: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    api_base: Option<String>,
    origin: Option<String>,
    room_id: Option<String>,
    admin_code: Option<String>,
}

/// Settings that passed validation: an absolute api base and both required ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSettings {
    pub api_base: String,
    pub room_id: RoomId,
    pub admin_code: String,
}

pub fn load_settings() -> Result<Settings> {
    let settings = load_settings_from(Path::new(SETTINGS_FILE))?;
    Ok(apply_env_overrides(settings, |key| std::env::var(key).ok()))
}

/// Reads the optional TOML file on top of the defaults.
pub fn load_settings_from(path: &Path) -> Result<Settings> {
    let mut settings = Settings::default();
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(settings),
        Err(err) => {
            return Err(err).with_context(|| format!("failed to read {}", path.display()));
        }
    };

    let file_cfg: FileSettings =
        toml::from_str(&raw).with_context(|| format!("invalid settings in {}", path.display()))?;
    if let Some(v) = file_cfg.api_base {
        settings.api_base = v;
    }
    if let Some(v) = file_cfg.origin {
        settings.origin = v;
    }
    if file_cfg.room_id.is_some() {
        settings.room_id = file_cfg.room_id;
    }
    if file_cfg.admin_code.is_some() {
        settings.admin_code = file_cfg.admin_code;
    }
    Ok(settings)
}

/// Environment wins over the file; the `APP__` spelling wins over the plain one.
pub fn apply_env_overrides(
    mut settings: Settings,
    lookup: impl Fn(&str) -> Option<String>,
) -> Settings {
    for key in ["PARTICIPANTS_API_BASE", "APP__API_BASE"] {
        if let Some(v) = lookup(key) {
            settings.api_base = v;
        }
    }
    for key in ["PARTICIPANTS_ORIGIN", "APP__ORIGIN"] {
        if let Some(v) = lookup(key) {
            settings.origin = v;
        }
    }
    for key in ["PARTICIPANTS_ROOM_ID", "APP__ROOM_ID"] {
        if let Some(v) = lookup(key) {
            settings.room_id = Some(v);
        }
    }
    for key in ["PARTICIPANTS_ADMIN_CODE", "APP__ADMIN_CODE"] {
        if let Some(v) = lookup(key) {
            settings.admin_code = Some(v);
        }
    }
    settings
}

impl Settings {
    pub fn resolve(&self) -> Result<ResolvedSettings> {
        let room_id = required(self.room_id.as_deref(), "room_id")?;
        let admin_code = required(self.admin_code.as_deref(), "admin_code")?;
        Ok(ResolvedSettings {
            api_base: resolve_api_base(&self.origin, &self.api_base)?,
            room_id: RoomId::from(room_id),
            admin_code: admin_code.to_string(),
        })
    }
}

/// Blank values are rejected, but the value itself is passed through untouched.
fn required<'a>(value: Option<&'a str>, name: &str) -> Result<&'a str> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| anyhow!("{name} is required"))
}

/// Absolute bases are used as-is; relative ones are joined onto `origin`.
/// A single trailing slash is stripped either way.
pub fn resolve_api_base(origin: &str, api_base: &str) -> Result<String> {
    let api_base = api_base.trim();
    if api_base.is_empty() {
        return Err(anyhow!("api_base must not be empty"));
    }

    let resolved = match Url::parse(api_base) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => Url::parse(origin)
            .with_context(|| format!("invalid origin '{origin}'"))?
            .join(api_base)
            .with_context(|| format!("cannot resolve '{api_base}' against '{origin}'"))?,
        Err(err) => return Err(err).with_context(|| format!("invalid api_base '{api_base}'")),
    };
    Ok(trim_base(resolved.as_str()).to_string())
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
