pub mod enums;

use std::sync::RwLock;
use std::{path::Path, sync::LazyLock};
use std::error::Error;
use notify::Watcher as _;
use notify::event::{AccessKind, AccessMode, EventKind};
use serde::{Deserialize, Serialize};

pub use enums::EvictionPolicy;

use crate::intake::{Blacklist, Preference};
use crate::utils::filesystem::get_config_directory;

static CONFIG: LazyLock<RwLock<Config>> = LazyLock::new(|| {
    let config = read().unwrap_or_else(|err| {
        warn!(%err, "Failed to read configuration, using defaults");
        Config::default()
    });

    RwLock::new(config)
});

const FILE_NAME: &str = "config.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BubblesConfig {
    pub disable_bubble: bool,
    /// Milliseconds a bubble stays up when the client does not ask for a timeout.
    pub expire_timeout: u64,
    #[serde(deserialize_with = "deserialize_insensitive")]
    pub eviction: EvictionPolicy,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BlacklistConfig {
    pub apps: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub bubbles: BubblesConfig,
    #[serde(default)]
    pub blacklist: BlacklistConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            bubbles: BubblesConfig {
                disable_bubble: false,
                expire_timeout: 5000,
                eviction: EvictionPolicy::Newest,
            },
            blacklist: BlacklistConfig::default(),
        }
    }
}

pub fn deserialize_insensitive<'de, T, D>(deserializer: D) -> Result<T, D::Error>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    T::from_str(&s).map_err(serde::de::Error::custom)
}

fn config_path() -> String {
    format!("{}/{}", get_config_directory(), FILE_NAME)
}

fn save(config: &Config) -> Result<(), Box<dyn Error>> {
    std::fs::create_dir_all(get_config_directory())?;
    std::fs::write(
        config_path(),
        toml::to_string(config)?
    )?;

    Ok(())
}

fn read() -> Result<Config, Box<dyn Error>> {
    if !Path::new(&config_path()).exists() {
        let default = Config::default();
        save(&default)?;
        Ok(default)
    } else {
        let toml = std::fs::read_to_string(config_path())?;
        let config = toml::from_str(&toml)?;
        Ok(config)
    }
}

pub fn watch() {
    std::thread::spawn(move || {
        let (tx, rx) = std::sync::mpsc::channel();

        let mut watcher = match notify::recommended_watcher(tx) {
            Ok(watcher) => watcher,
            Err(err) => {
                error!(%err, "Failed to create configuration watcher");
                return;
            }
        };

        let result = watcher.watch(
            Path::new(&get_config_directory()),
            notify::RecursiveMode::NonRecursive,
        );

        if let Err(err) = result {
            error!(%err, "Failed to watch configuration file");
            return;
        }

        info!(path = %config_path(), "Watching configuration file");

        for res in rx {
            match res {
                Ok(event) => if event.paths.iter().any(|p| p.file_name() == Some(FILE_NAME.as_ref()))
                    && matches!(event.kind, EventKind::Access(AccessKind::Close(AccessMode::Write)))
                {
                    match read() {
                        Ok(new_config) => {
                            if let Ok(mut config_lock) = CONFIG.write() {
                                *config_lock = new_config;
                                info!("Configuration reloaded");
                            }
                        },

                        Err(err) => {
                            warn!(%err, "Failed to reload configuration");
                        }
                    }
                },

                Err(err) => {
                    error!(%err, "Error watching configuration file");
                },
            }
        }
    });
}

pub fn read_config() -> std::sync::RwLockReadGuard<'static, Config> {
    CONFIG.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Preference store backed by the live configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfigPreference;

impl Preference for ConfigPreference {
    fn disable_bubble(&self) -> bool {
        read_config().bubbles.disable_bubble
    }
}

/// Blacklist store backed by the live configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfigBlacklist;

impl Blacklist for ConfigBlacklist {
    fn contains(&self, app_name: &str) -> bool {
        read_config().blacklist.apps.iter().any(|app| app == app_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_survives_toml() {
        let text = toml::to_string(&Config::default()).expect("serialize");
        assert!(text.contains("eviction = \"newest\""));

        let config: Config = toml::from_str(&text).expect("deserialize");
        assert!(!config.bubbles.disable_bubble);
        assert_eq!(config.bubbles.expire_timeout, 5000);
        assert_eq!(config.bubbles.eviction, EvictionPolicy::Newest);
        assert!(config.blacklist.apps.is_empty());
    }

    #[test]
    fn eviction_is_case_insensitive() {
        let config: Config = toml::from_str(
            "[bubbles]\ndisable_bubble = true\nexpire_timeout = 3000\neviction = \"OLDEST\"\n"
        ).expect("deserialize");

        assert!(config.bubbles.disable_bubble);
        assert_eq!(config.bubbles.eviction, EvictionPolicy::Oldest);
    }

    #[test]
    fn blacklist_section_is_read() {
        let config: Config = toml::from_str(
            "[bubbles]\ndisable_bubble = false\nexpire_timeout = 5000\neviction = \"newest\"\n\n[blacklist]\napps = [\"Spotify\", \"discord\"]\n"
        ).expect("deserialize");

        assert_eq!(config.blacklist.apps, vec!["Spotify".to_owned(), "discord".to_owned()]);
    }

    #[test]
    fn unknown_eviction_is_rejected() {
        let result: Result<Config, _> = toml::from_str(
            "[bubbles]\ndisable_bubble = false\nexpire_timeout = 5000\neviction = \"random\"\n"
        );

        assert!(result.is_err());
    }
}
