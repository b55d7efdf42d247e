//! Versioned JSON envelope around a persisted [`GameState`].

use serde::{Deserialize, Serialize};

use super::errors::{StoreError, StoreResult};
use crate::game::GameState;

/// Bumped whenever the serialized [`GameState`] layout changes incompatibly.
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Envelope<'a> {
    schema_version: u32,
    state: &'a GameState,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEnvelope {
    schema_version: u32,
    state: serde_json::Value,
}

pub fn encode_state(state: &GameState) -> StoreResult<String> {
    let envelope = Envelope {
        schema_version: SCHEMA_VERSION,
        state,
    };
    Ok(serde_json::to_string(&envelope)?)
}

/// Checks the schema tag before interpreting the payload, so a blob from a
/// different engine version is reported instead of half-parsed.
pub fn decode_state(blob: &str) -> StoreResult<GameState> {
    let raw: RawEnvelope = serde_json::from_str(blob)?;
    if raw.schema_version != SCHEMA_VERSION {
        return Err(StoreError::IncompatibleSchema {
            found: raw.schema_version,
            expected: SCHEMA_VERSION,
        });
    }
    Ok(serde_json::from_value(raw.state)?)
}
