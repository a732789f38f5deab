//! Runtime configuration structures and loaders.

use std::env;

use encounter_core::{EncounterSettings, NpcTurnsVisibility};

/// Runtime configuration shared across the orchestrator and workers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub settings: EncounterSettings,
    pub command_buffer_size: usize,
    pub event_buffer_size: usize,
    pub relay_buffer_size: usize,
    /// Whether this process owns the encounter (default: true)
    pub is_authority: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            settings: EncounterSettings::default(),
            command_buffer_size: 32,
            event_buffer_size: 100,
            relay_buffer_size: 64,
            is_authority: true,
        }
    }
}

impl RuntimeConfig {
    /// Construct configuration from process environment variables.
    ///
    /// Environment variables:
    /// - `SKIP_DEFEATED` - Leave defeated combatants out of phase logic (default: false)
    /// - `TURN_TIME_SECS` - Game seconds per turn (default: 6)
    /// - `ROUND_TIME_SECS` - Extra game seconds per round (default: 0)
    /// - `NPC_TURNS_VISIBILITY` - `always` or `never` (default: always)
    /// - `COMMAND_BUFFER` - Authority worker mailbox size (default: 32)
    /// - `EVENT_BUFFER` - Per-topic event capacity (default: 100)
    /// - `RELAY_BUFFER` - Relay queue size (default: 64)
    /// - `IS_AUTHORITY` - Whether this process owns the encounter (default: true)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        // Encounter rules
        if let Some(skip) = lookup("SKIP_DEFEATED").and_then(parse_bool) {
            config.settings.skip_defeated = skip;
        }
        if let Some(secs) = read_parsed::<u32>(lookup("TURN_TIME_SECS")) {
            config.settings.turn_time = secs;
        }
        if let Some(secs) = read_parsed::<u32>(lookup("ROUND_TIME_SECS")) {
            config.settings.round_time = secs;
        }
        if let Some(visibility) = lookup("NPC_TURNS_VISIBILITY").and_then(parse_visibility) {
            config.settings.npc_turns_visibility = visibility;
        }

        // Channel configuration
        if let Some(capacity) = read_parsed::<usize>(lookup("COMMAND_BUFFER")) {
            config.command_buffer_size = capacity.max(1);
        }
        if let Some(capacity) = read_parsed::<usize>(lookup("EVENT_BUFFER")) {
            config.event_buffer_size = capacity.max(1);
        }
        if let Some(capacity) = read_parsed::<usize>(lookup("RELAY_BUFFER")) {
            config.relay_buffer_size = capacity.max(1);
        }

        if let Some(authority) = lookup("IS_AUTHORITY").and_then(parse_bool) {
            config.is_authority = authority;
        }

        config
    }
}

fn read_parsed<T>(value: Option<String>) -> Option<T>
where
    T: std::str::FromStr,
{
    value?.trim().parse().ok()
}

fn parse_bool(value: String) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_visibility(value: String) -> Option<NpcTurnsVisibility> {
    match value.to_lowercase().as_str() {
        "always" => Some(NpcTurnsVisibility::Always),
        "never" => Some(NpcTurnsVisibility::Never),
        _ => None,
    }
}
