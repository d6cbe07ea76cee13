//! Domain library for the gaming registry.
//!
//! Holds the record types, the repository port, and error definitions. The
//! only dependency is `serde`, because the records double as their own wire
//! shape. Keep HTTP and IO concerns out of this crate.

use std::error::Error;
use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// A piece of gaming hardware, e.g. a laptop or console.
///
/// `category` is free-form and travels as `type` on the wire. Missing keys
/// decode as empty strings; there is no validation beyond that.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HardwareRecord {
    #[serde(rename = "type", default)]
    pub category: String,
    #[serde(default)]
    pub name: String,
}

impl HardwareRecord {
    /// JSON keys, in declaration order.
    pub const FIELDS: &'static [&'static str] = &["type", "name"];

    pub fn new<C: Into<String>, N: Into<String>>(category: C, name: N) -> Self {
        Self {
            category: category.into(),
            name: name.into(),
        }
    }
}

/// A game title.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRecord {
    #[serde(default)]
    pub title: String,
}

impl GameRecord {
    pub const FIELDS: &'static [&'static str] = &["title"];

    pub fn new<T: Into<String>>(title: T) -> Self {
        Self {
            title: title.into(),
        }
    }
}

/// Repository port for the two append-only record collections.
///
/// Appends never reject a record. Lists return owned snapshots in insertion
/// order, so a concurrent append is either fully visible or not at all.
pub trait RegistryRepository: Send + Sync {
    /// Append a hardware record; returns the collection length after the append.
    fn add_hardware(&self, record: HardwareRecord) -> Result<usize, CoreError>;
    /// Append a game record; returns the collection length after the append.
    fn add_game(&self, record: GameRecord) -> Result<usize, CoreError>;
    fn list_hardware(&self) -> Result<Vec<HardwareRecord>, CoreError>;
    fn list_games(&self) -> Result<Vec<GameRecord>, CoreError>;
}

/// Core domain errors (no external error crates to keep deps minimal).
#[derive(Debug)]
pub enum CoreError {
    Repository(String),
}

impl Display for CoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            CoreError::Repository(msg) => write!(f, "repository error: {}", msg),
        }
    }
}

impl Error for CoreError {}

pub mod adapters;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hardware_uses_type_key_on_the_wire() {
        let rec = HardwareRecord::new("PC", "Rig-1");
        let json = serde_json::to_string(&rec).unwrap();
        assert_eq!(json, r#"{"type":"PC","name":"Rig-1"}"#);
    }

    #[test]
    fn missing_keys_decode_as_empty_strings() {
        let rec: HardwareRecord = serde_json::from_str(r#"{"name":"Deck"}"#).unwrap();
        assert_eq!(rec, HardwareRecord::new("", "Deck"));

        let game: GameRecord = serde_json::from_str("{}").unwrap();
        assert_eq!(game.title, "");
    }

    #[test]
    fn field_lists_match_serialized_keys() {
        let hw = serde_json::to_value(HardwareRecord::new("PC", "Rig")).unwrap();
        let mut keys: Vec<_> = hw.as_object().unwrap().keys().cloned().collect();
        keys.sort();
        let mut want: Vec<_> = HardwareRecord::FIELDS.iter().map(|s| s.to_string()).collect();
        want.sort();
        assert_eq!(keys, want);

        let game = serde_json::to_value(GameRecord::new("Chess")).unwrap();
        let keys: Vec<_> = game.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, GameRecord::FIELDS);
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let game: GameRecord =
            serde_json::from_str(r#"{"title":"Chess","players":2}"#).unwrap();
        assert_eq!(game, GameRecord::new("Chess"));
    }

    #[test]
    fn wrong_shapes_are_rejected() {
        assert!(serde_json::from_str::<GameRecord>(r#"{"title":5}"#).is_err());
        assert!(serde_json::from_str::<GameRecord>("null").is_err());
        assert!(serde_json::from_str::<HardwareRecord>("not-json").is_err());
    }

    #[test]
    fn repository_error_display() {
        let err = CoreError::Repository("lock poisoned".into());
        assert_eq!(err.to_string(), "repository error: lock poisoned");
    }
}
