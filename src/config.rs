//! Launcher configuration
//!
//! `LauncherConfig` holds the launcher's own preferences and is persisted in
//! LocalStorage. `EngineSettings` wraps the engine's `settings.json` blob,
//! which the launcher passes through untouched apart from reading the
//! display resolution.

use serde::{Deserialize, Serialize};

use crate::consts::DEFAULT_LAUNCH_ARGS;

/// Display resolution in engine pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn aspect(&self) -> f64 {
        self.width as f64 / self.height as f64
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Self::new(800, 600)
    }
}

/// Launcher preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LauncherConfig {
    /// Arguments passed to the engine's main
    pub launch_args: Vec<String>,
    /// Resolution used when the engine settings don't name one
    pub default_resolution: Resolution,
    /// Console log level (error, warn, info, debug, trace)
    pub log_level: String,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            launch_args: DEFAULT_LAUNCH_ARGS.iter().map(|s| s.to_string()).collect(),
            default_resolution: Resolution::default(),
            log_level: "info".to_string(),
        }
    }
}

impl LauncherConfig {
    #[cfg(target_arch = "wasm32")]
    const STORAGE_KEY: &'static str = "vcmi_launcher_config";

    /// Parsed log level, `Info` when unrecognised
    pub fn log_level(&self) -> log::Level {
        self.log_level.parse().unwrap_or(log::Level::Info)
    }

    /// Parse a config document; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> String {
        // Only strings and integers, serializing can't fail
        serde_json::to_string(self).unwrap_or_default()
    }

    #[cfg(target_arch = "wasm32")]
    fn local_storage() -> Option<web_sys::Storage> {
        web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten()
    }

    /// Config stored in LocalStorage, or the defaults
    #[cfg(target_arch = "wasm32")]
    pub fn load() -> Self {
        let stored = Self::local_storage()
            .and_then(|storage| storage.get_item(Self::STORAGE_KEY).ok().flatten());
        match stored.map(|json| Self::from_json(&json)) {
            Some(Ok(config)) => config,
            Some(Err(e)) => {
                log::warn!("Ignoring stored launcher config: {}", e);
                Self::default()
            }
            None => Self::default(),
        }
    }

    /// Persist to LocalStorage
    #[cfg(target_arch = "wasm32")]
    pub fn save(&self) -> Result<(), String> {
        let storage =
            Self::local_storage().ok_or_else(|| "LocalStorage is not available".to_string())?;
        storage
            .set_item(Self::STORAGE_KEY, &self.to_json())
            .map_err(|e| crate::platform::js_reason(&e))?;
        log::info!("Launcher config saved ({} launch args)", self.launch_args.len());
        Ok(())
    }

    /// Native hosts keep nothing between runs
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load() -> Self {
        Self::default()
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn save(&self) -> Result<(), String> {
        log::debug!("Launcher config not persisted on this host");
        Ok(())
    }
}

/// The engine's `settings.json`, as written by the config screen
#[derive(Debug, Clone)]
pub struct EngineSettings {
    raw: String,
    parsed: Option<serde_json::Value>,
}

impl EngineSettings {
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let parsed = match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                log::warn!("Engine settings are not valid JSON: {}", e);
                None
            }
        };
        Self { raw, parsed }
    }

    /// Bytes written to the engine's settings path
    pub fn as_bytes(&self) -> &[u8] {
        self.raw.as_bytes()
    }

    /// `video.resolution`, if present and non-zero
    pub fn resolution(&self) -> Option<Resolution> {
        let resolution = self.parsed.as_ref()?.get("video")?.get("resolution")?;
        let width = u32::try_from(resolution.get("width")?.as_u64()?).ok()?;
        let height = u32::try_from(resolution.get("height")?.as_u64()?).ok()?;
        if width == 0 || height == 0 {
            return None;
        }
        Some(Resolution::new(width, height))
    }

    /// Resolution to size the surface for
    pub fn resolution_or(&self, fallback: Resolution) -> Resolution {
        self.resolution().unwrap_or(fallback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LauncherConfig::default();
        assert_eq!(config.launch_args, vec!["--disable-video"]);
        assert_eq!(config.default_resolution, Resolution::new(800, 600));
        assert_eq!(config.log_level(), log::Level::Info);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: LauncherConfig = serde_json::from_str(r#"{"log_level":"debug"}"#).unwrap();
        assert_eq!(config.log_level(), log::Level::Debug);
        assert_eq!(config.launch_args, vec!["--disable-video"]);
    }

    #[test]
    fn test_config_json_round_trip() {
        let config = LauncherConfig {
            launch_args: vec!["--onlyAI".to_string()],
            default_resolution: Resolution::new(1280, 720),
            log_level: "debug".to_string(),
        };
        let restored = LauncherConfig::from_json(&config.to_json()).unwrap();
        assert_eq!(restored, config);
        assert!(config.save().is_ok());
    }

    #[test]
    fn test_malformed_config_rejected() {
        assert!(LauncherConfig::from_json("{\"launch_args\": 3}").is_err());
        assert!(LauncherConfig::from_json("nope").is_err());
    }

    #[test]
    fn test_bad_log_level_falls_back() {
        let config = LauncherConfig {
            log_level: "loud".to_string(),
            ..LauncherConfig::default()
        };
        assert_eq!(config.log_level(), log::Level::Info);
    }

    #[test]
    fn test_engine_settings_resolution() {
        let settings =
            EngineSettings::new(r#"{"video":{"resolution":{"width":1024,"height":768}}}"#);
        assert_eq!(settings.resolution(), Some(Resolution::new(1024, 768)));
    }

    #[test]
    fn test_engine_settings_without_resolution() {
        let fallback = Resolution::default();
        assert_eq!(EngineSettings::new("{}").resolution_or(fallback), fallback);
        assert_eq!(EngineSettings::new("not json").resolution_or(fallback), fallback);
        let zero = EngineSettings::new(r#"{"video":{"resolution":{"width":0,"height":600}}}"#);
        assert_eq!(zero.resolution(), None);
    }

    #[test]
    fn test_engine_settings_bytes_untouched() {
        let raw = "{ \"general\" : { \"lastMap\" : \"x\" } }";
        assert_eq!(EngineSettings::new(raw).as_bytes(), raw.as_bytes());
    }
}
