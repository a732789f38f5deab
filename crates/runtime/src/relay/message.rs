use serde::{Deserialize, Serialize};

use encounter_core::{CombatantId, EncounterId, Faction, UserId};

use super::RelayError;

/// Encounter attributes only the authority may write.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "name", content = "value", rename_all = "camelCase")]
pub enum CombatFlag {
    CurrentPhase(Faction),
    FirstPhase(Faction),
}

/// Request forwarded to the authoritative participant.
///
/// Requests are fire-and-forget. The authority re-validates each one as if
/// it had been made locally and drops it silently when it does not apply,
/// so lost or duplicated deliveries are harmless.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RelayMessage {
    StartCombatantTurn {
        encounter: EncounterId,
        combatant: CombatantId,
        user: UserId,
    },
    EndCombatantTurn {
        encounter: EncounterId,
        combatant: CombatantId,
        user: UserId,
    },
    UpdateCombatFlag {
        encounter: EncounterId,
        user: UserId,
        flag: CombatFlag,
    },
}

/// Discriminator of a [`RelayMessage`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RelayKind {
    StartCombatantTurn,
    EndCombatantTurn,
    UpdateCombatFlag,
}

impl RelayMessage {
    pub fn kind(&self) -> RelayKind {
        match self {
            Self::StartCombatantTurn { .. } => RelayKind::StartCombatantTurn,
            Self::EndCombatantTurn { .. } => RelayKind::EndCombatantTurn,
            Self::UpdateCombatFlag { .. } => RelayKind::UpdateCombatFlag,
        }
    }

    pub fn encounter(&self) -> &EncounterId {
        match self {
            Self::StartCombatantTurn { encounter, .. }
            | Self::EndCombatantTurn { encounter, .. }
            | Self::UpdateCombatFlag { encounter, .. } => encounter,
        }
    }

    /// Participant who asked for the change.
    pub fn user(&self) -> &UserId {
        match self {
            Self::StartCombatantTurn { user, .. }
            | Self::EndCombatantTurn { user, .. }
            | Self::UpdateCombatFlag { user, .. } => user,
        }
    }

    pub fn to_json(&self) -> Result<String, RelayError> {
        serde_json::to_string(self).map_err(RelayError::Encode)
    }

    pub fn from_json(raw: &str) -> Result<Self, RelayError> {
        serde_json::from_str(raw).map_err(RelayError::Decode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_format_uses_type_discriminator() {
        let message = RelayMessage::EndCombatantTurn {
            encounter: EncounterId::from("combat-1"),
            combatant: CombatantId::from("goblin"),
            user: UserId::from("player-2"),
        };
        let value: serde_json::Value = serde_json::from_str(&message.to_json().unwrap()).unwrap();
        assert_eq!(value["type"], "endCombatantTurn");
        assert_eq!(value["combatant"], "goblin");
        assert_eq!(value["encounter"], "combat-1");
    }

    #[test]
    fn flag_updates_carry_a_typed_value() {
        let raw = r#"{"type":"updateCombatFlag","encounter":"c","user":"gm","flag":{"name":"currentPhase","value":"enemy"}}"#;
        let message = RelayMessage::from_json(raw).unwrap();
        assert_eq!(
            message,
            RelayMessage::UpdateCombatFlag {
                encounter: EncounterId::from("c"),
                user: UserId::from("gm"),
                flag: CombatFlag::CurrentPhase(Faction::Enemy),
            }
        );
        assert_eq!(message.kind(), RelayKind::UpdateCombatFlag);
    }

    #[test]
    fn unknown_types_fail_to_decode() {
        assert!(matches!(
            RelayMessage::from_json(r#"{"type":"deleteCombat","encounter":"c"}"#),
            Err(RelayError::Decode(_))
        ));
    }
}
