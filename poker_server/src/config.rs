//! Server configuration loaded from `POKER_*` environment variables.

use poker_protocol::DeckVariant;
use std::net::SocketAddr;

const STARTING_CHIPS: u32 = 1000;
const SMALL_BLIND: u32 = 10;
const BIG_BLIND: u32 = 20;
const MIN_PLAYERS: usize = 2;
const MAX_MESSAGE_SIZE: usize = 4096;

/// Complete server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    pub table: TableConfig,
    /// Inbound frames larger than this are rejected unparsed.
    pub max_message_size: usize,
}

/// The rules a table plays by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableConfig {
    pub small_blind: u32,
    pub big_blind: u32,
    pub starting_chips: u32,
    pub deck_variant: DeckVariant,
    /// Funded players needed before a hand starts.
    pub min_players: usize,
    pub max_players: usize,
    /// Fixed shuffle seed. Unset means entropy.
    pub deck_seed: Option<u64>,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            small_blind: SMALL_BLIND,
            big_blind: BIG_BLIND,
            starting_chips: STARTING_CHIPS,
            deck_variant: DeckVariant::Full,
            min_players: MIN_PLAYERS,
            max_players: DeckVariant::Full.max_players(),
            deck_seed: None,
        }
    }
}

impl TableConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.big_blind == 0 {
            return Err(ConfigError::Invalid {
                var: "POKER_BIG_BLIND".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if self.small_blind > self.big_blind {
            return Err(ConfigError::Invalid {
                var: "POKER_SMALL_BLIND".to_string(),
                reason: format!("Must not exceed big blind ({})", self.big_blind),
            });
        }

        if self.min_players < 2 {
            return Err(ConfigError::Invalid {
                var: "POKER_MIN_PLAYERS".to_string(),
                reason: "Must be at least 2".to_string(),
            });
        }

        let capacity = self.deck_variant.max_players();
        if self.max_players > capacity {
            return Err(ConfigError::Invalid {
                var: "POKER_MAX_PLAYERS".to_string(),
                reason: format!(
                    "Must be at most {} (max players with the {} deck)",
                    capacity, self.deck_variant
                ),
            });
        }

        if self.min_players > self.max_players {
            return Err(ConfigError::Invalid {
                var: "POKER_MIN_PLAYERS".to_string(),
                reason: format!("Cannot exceed max players ({})", self.max_players),
            });
        }

        Ok(())
    }
}

impl ServerConfig {
    /// Loads and validates the configuration.
    ///
    /// Numeric variables that fail to parse fall back to their defaults. An
    /// unknown deck name or a rule set that cannot be dealt is an error.
    pub fn from_env() -> Result<Self, ConfigError> {
        let bind = std::env::var("POKER_BIND")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or_else(default_bind);

        let deck_variant = match std::env::var("POKER_DECK") {
            Ok(raw) => raw.parse().map_err(|reason| ConfigError::Invalid {
                var: "POKER_DECK".to_string(),
                reason,
            })?,
            Err(_) => DeckVariant::default(),
        };

        let capacity = deck_variant.max_players();
        let table = TableConfig {
            small_blind: parse_env_or("POKER_SMALL_BLIND", SMALL_BLIND),
            big_blind: parse_env_or("POKER_BIG_BLIND", BIG_BLIND),
            starting_chips: parse_env_or("POKER_STARTING_CHIPS", STARTING_CHIPS),
            deck_variant,
            min_players: parse_env_or("POKER_MIN_PLAYERS", MIN_PLAYERS),
            max_players: parse_env_or("POKER_MAX_PLAYERS", capacity).min(capacity),
            deck_seed: std::env::var("POKER_DECK_SEED")
                .ok()
                .and_then(|s| s.parse().ok()),
        };
        table.validate()?;

        Ok(ServerConfig {
            bind,
            table,
            max_message_size: parse_env_or("POKER_MAX_MESSAGE_SIZE", MAX_MESSAGE_SIZE),
        })
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            table: TableConfig::default(),
            max_message_size: MAX_MESSAGE_SIZE,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

fn default_bind() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8080))
}

fn parse_env_or<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ServerConfig::default();
        assert_eq!(config.bind.to_string(), "127.0.0.1:8080");
        assert_eq!(config.table.max_players, 23);
        assert!(config.table.validate().is_ok());
    }

    #[test]
    fn test_zero_big_blind_rejected() {
        let table = TableConfig {
            small_blind: 0,
            big_blind: 0,
            ..TableConfig::default()
        };
        let err = table.validate().unwrap_err();
        assert!(err.to_string().contains("POKER_BIG_BLIND"));
    }

    #[test]
    fn test_small_blind_above_big_blind_rejected() {
        let table = TableConfig {
            small_blind: 30,
            big_blind: 20,
            ..TableConfig::default()
        };
        assert!(matches!(table.validate(), Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn test_player_bounds() {
        let short = TableConfig {
            deck_variant: DeckVariant::Short,
            max_players: 8,
            ..TableConfig::default()
        };
        assert!(short.validate().is_err());

        let short = TableConfig {
            max_players: 7,
            ..short
        };
        assert!(short.validate().is_ok());

        let solo = TableConfig {
            min_players: 1,
            ..TableConfig::default()
        };
        assert!(solo.validate().is_err());

        let crowded = TableConfig {
            min_players: 5,
            max_players: 4,
            ..TableConfig::default()
        };
        assert!(crowded.validate().is_err());
    }
}
