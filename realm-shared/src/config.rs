//! Server configuration, loaded from a TOML file and then overridden by
//! environment and CLI per `spec.md` §6 ("Environment wins over file;
//! CLI wins over environment"). Structure follows
//! `game/core/src/config.rs`'s `GameConfig { server, game }` shape.

use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_PORT: u16 = 7666;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSection {
    pub host: String,
    pub port: u16,
    pub max_clients: u16,
    pub tls: bool,
    pub tls_cert: Option<String>,
    pub tls_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameSection {
    /// Tick period in milliseconds (`spec.md` §4.7 default 500ms).
    pub tick_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectsSection {
    pub hunger_thirst_interval_s: u64,
    pub gold_decay_interval_s: u64,
    pub gold_decay_fraction: f32,
    pub meditation_interval_s: u64,
    pub regen_interval_s: u64,
    pub npc_ai_interval_s: u64,
    pub attribute_modifiers_interval_s: u64,
    pub respawn_timers_interval_s: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceSection {
    pub kv_host: String,
    pub kv_port: u16,
    pub kv_db: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerSection,
    pub game: GameSection,
    pub effects: EffectsSection,
    pub persistence: PersistenceSection,
    /// §9 Open Question: route `send_error_msg` to `CONSOLE_MSG` (legacy
    /// client compatibility) instead of `ERROR_MSG`.
    pub error_uses_console_msg: bool,
    /// §9 Open Question: send `CLAN_DETAILS` during login.
    pub send_clan_details_on_login: bool,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            server: ServerSection {
                host: "0.0.0.0".to_string(),
                port: DEFAULT_PORT,
                max_clients: 1000,
                tls: false,
                tls_cert: None,
                tls_key: None,
            },
            game: GameSection { tick_ms: 500 },
            effects: EffectsSection {
                hunger_thirst_interval_s: 180,
                gold_decay_interval_s: 60,
                gold_decay_fraction: 0.01,
                meditation_interval_s: 3,
                regen_interval_s: 5,
                npc_ai_interval_s: 1,
                attribute_modifiers_interval_s: 10,
                respawn_timers_interval_s: 1,
            },
            persistence: PersistenceSection {
                kv_host: "127.0.0.1".to_string(),
                kv_port: 6379,
                kv_db: 0,
            },
            error_uses_console_msg: true,
            send_clan_details_on_login: false,
        }
    }
}

impl Config {
    /// Loads configuration from a TOML file, falling back to defaults if
    /// the file does not exist.
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Config> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Config::default());
        }
        serdeconv::from_toml_file(path)
            .map_err(|e| anyhow::anyhow!("error loading config file {}: {}", path.display(), e))
    }

    /// Applies `SERVER_HOST`, `SERVER_PORT`, `KV_HOST`, `KV_PORT`,
    /// `KV_DB` environment overrides (`spec.md` §6).
    pub fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("SERVER_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("SERVER_PORT") {
            if let Ok(port) = port.parse() {
                self.server.port = port;
            }
        }
        if let Ok(host) = std::env::var("KV_HOST") {
            self.persistence.kv_host = host;
        }
        if let Ok(port) = std::env::var("KV_PORT") {
            if let Ok(port) = port.parse() {
                self.persistence.kv_port = port;
            }
        }
        if let Ok(db) = std::env::var("KV_DB") {
            if let Ok(db) = db.parse() {
                self.persistence.kv_db = db;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let cfg = Config::load("/nonexistent/path/server.toml").unwrap();
        assert_eq!(cfg.server.port, DEFAULT_PORT);
    }

    #[test]
    fn env_override_wins_over_file_defaults() {
        std::env::set_var("SERVER_PORT", "9999");
        let mut cfg = Config::default();
        cfg.apply_env_overrides();
        std::env::remove_var("SERVER_PORT");
        assert_eq!(cfg.server.port, 9999);
    }
}
