use encounter_core::DurationPhase;
use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;

/// Status conditions the rules engine knows how to react to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, IntoStaticStr)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Condition {
    /// Persistent damage equal to the stage (1-5) at the start of each turn.
    BleedingWound { stage: u8 },
    Burning,
    Soaked,
    /// Stage 1 penalises rolls, stage 2 and up deals damage, stage 4 knocks
    /// the actor out after three rounds.
    Poisoned { stage: u8, rounds_passed: u32 },
    Unconscious,
    Stunned,
    Frozen,
    Blinded,
    Confused,
}

impl Condition {
    pub const MAX_BLEEDING_STAGE: u8 = 5;
    pub const MAX_POISON_STAGE: u8 = 4;

    pub fn bleeding(stage: u8) -> Self {
        Self::BleedingWound {
            stage: stage.clamp(1, Self::MAX_BLEEDING_STAGE),
        }
    }

    pub fn poisoned(stage: u8) -> Self {
        Self::Poisoned {
            stage: stage.clamp(1, Self::MAX_POISON_STAGE),
            rounds_passed: 0,
        }
    }

    pub fn name(&self) -> &'static str {
        self.into()
    }

    /// Label shown to players.
    pub fn label(&self) -> String {
        match self {
            Self::BleedingWound { stage } => format!("Bleeding Wound (Stage {stage})"),
            Self::Poisoned { stage, .. } => format!("Poisoned (Stage {stage})"),
            Self::Burning => "Burning".into(),
            Self::Soaked => "Soaked".into(),
            Self::Unconscious => "Unconscious".into(),
            Self::Stunned => "Stunned".into(),
            Self::Frozen => "Frozen".into(),
            Self::Blinded => "Blinded".into(),
            Self::Confused => "Confused".into(),
        }
    }

    /// Returns true if the condition prevents taking turns.
    pub const fn is_incapacitating(&self) -> bool {
        matches!(self, Self::Unconscious | Self::Stunned | Self::Frozen)
    }

    /// Staged conditions may stack several instances.
    pub(crate) const fn is_staged(&self) -> bool {
        matches!(self, Self::BleedingWound { .. } | Self::Poisoned { .. })
    }

    /// Returns true if both values are the same condition regardless of stage.
    pub fn same_kind(&self, other: &Condition) -> bool {
        core::mem::discriminant(self) == core::mem::discriminant(other)
    }
}

/// When an effect runs out.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expiry {
    /// Counter ticks down each time durations are processed at this point.
    pub phase: DurationPhase,
    pub remaining: u32,
}

/// A condition applied to an actor, optionally time-limited.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveEffect {
    pub condition: Condition,
    pub expiry: Option<Expiry>,
}

impl ActiveEffect {
    pub fn permanent(condition: Condition) -> Self {
        Self {
            condition,
            expiry: None,
        }
    }

    pub fn lasting(condition: Condition, phase: DurationPhase, remaining: u32) -> Self {
        Self {
            condition,
            expiry: Some(Expiry { phase, remaining }),
        }
    }

    /// Ticks the counter if it belongs to `phase`. Returns true once expired.
    pub(crate) fn tick(&mut self, phase: DurationPhase) -> bool {
        match &mut self.expiry {
            Some(expiry) if expiry.phase == phase => {
                expiry.remaining = expiry.remaining.saturating_sub(1);
                expiry.remaining == 0
            }
            _ => false,
        }
    }
}
