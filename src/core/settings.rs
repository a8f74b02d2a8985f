//! Host settings - panel configuration and its on-disk form

use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::events::DEFAULT_EVENT_BUFFER;

/// Default port handed to the first player instance.
pub const DEFAULT_PLAYER_PORT: u16 = 9147;

/// Panel configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostSettings {
    /// Port assigned to the first instance; later instances count up from here.
    pub initial_port: u16,
    /// Maximum number of simultaneously hosted instances (0 = unlimited).
    pub max_instances: u32,
    /// Address player servers bind to.
    pub bind_addr: IpAddr,
    /// How many recent events each bundled display sink retains.
    pub event_buffer: usize,
}

impl Default for HostSettings {
    fn default() -> Self {
        Self {
            initial_port: DEFAULT_PLAYER_PORT,
            max_instances: 0,
            bind_addr: IpAddr::V4(Ipv4Addr::LOCALHOST),
            event_buffer: DEFAULT_EVENT_BUFFER,
        }
    }
}

impl HostSettings {
    /// Fix any invalid values.
    pub fn validate(&mut self) {
        if self.initial_port == 0 {
            self.initial_port = DEFAULT_PLAYER_PORT;
        }
        self.event_buffer = self.event_buffer.max(1);
    }

    /// Default location of the settings file.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("playerhost")
            .join("settings.json")
    }

    /// Load settings from a JSON file, falling back to defaults when the
    /// file does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;
        let mut settings: Self = serde_json::from_str(&data)
            .with_context(|| format!("Failed to parse settings from {}", path.display()))?;
        settings.validate();
        Ok(settings)
    }

    /// Save settings as pretty-printed JSON, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let data = serde_json::to_string_pretty(self)?;
        std::fs::write(path, data)
            .with_context(|| format!("Failed to write settings to {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_start_at_the_canonical_port() {
        let settings = HostSettings::default();
        assert_eq!(settings.initial_port, 9147);
        assert_eq!(settings.max_instances, 0);
        assert_eq!(settings.bind_addr, IpAddr::V4(Ipv4Addr::LOCALHOST));
    }

    #[test]
    fn validate_fixes_invalid_values() {
        let mut settings = HostSettings {
            initial_port: 0,
            event_buffer: 0,
            ..Default::default()
        };
        settings.validate();
        assert_eq!(settings.initial_port, DEFAULT_PLAYER_PORT);
        assert_eq!(settings.event_buffer, 1);
    }

    #[test]
    fn settings_round_trip_through_json() {
        let dir = std::env::temp_dir().join(format!("playerhost-test-{}", uuid::Uuid::new_v4()));
        let path = dir.join("settings.json");

        let mut settings = HostSettings::default();
        settings.initial_port = 9200;
        settings.max_instances = 4;
        settings.save(&path).unwrap();

        let loaded = HostSettings::load(&path).unwrap();
        assert_eq!(loaded.initial_port, 9200);
        assert_eq!(loaded.max_instances, 4);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn load_missing_file_falls_back_to_defaults() {
        let path = std::env::temp_dir().join("playerhost-test-missing/settings.json");
        let settings = HostSettings::load(&path).unwrap();
        assert_eq!(settings.initial_port, DEFAULT_PLAYER_PORT);
    }
}
