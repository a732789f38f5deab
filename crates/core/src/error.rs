//! Error taxonomy for encounter transitions.
//!
//! Every transition failure is a [`TurnError`]. Most of them are handled at the
//! call site and surface as a transient warning; only [`SetupError`]s indicate
//! a bug in the surrounding system and are meant to be raised loudly.

use crate::faction::Faction;
use crate::state::{CombatantId, EncounterStatus, UserId};

/// Severity level of an error, used for categorization and recovery strategies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorSeverity {
    /// Precondition not met right now; the same request may succeed later.
    ///
    /// Examples: wrong phase, combatant already acted
    Recoverable,

    /// Request is not valid in the current lifecycle state or for this caller.
    ///
    /// Examples: starting combat twice, missing authority
    Validation,

    /// Unexpected state inconsistency that should be investigated.
    Internal,

    /// Encounter was handed to the engine in a state it cannot work with.
    ///
    /// Examples: no combatants, malformed faction data
    Fatal,
}

impl ErrorSeverity {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Recoverable => "recoverable",
            Self::Validation => "validation",
            Self::Internal => "internal",
            Self::Fatal => "fatal",
        }
    }

    /// Returns true if this error indicates an internal bug.
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Internal | Self::Fatal)
    }
}

/// A precondition of `start_turn`/`end_turn`/`next_turn` did not hold.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Ineligible {
    #[error("it's not the {} phase yet", .faction.map_or("unassigned", Faction::as_str))]
    NotThisPhase { faction: Option<Faction> },

    #[error("{name} can't take a turn right now")]
    CannotTakeTurn { name: String },

    #[error("{combatant} is not the active combatant")]
    NotActive { combatant: CombatantId },

    #[error("{active} is still taking their turn")]
    TurnInProgress { active: CombatantId },

    #[error("combatant {0} is not part of this encounter")]
    UnknownCombatant(CombatantId),
}

/// The encounter handed to the engine is malformed.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SetupError {
    #[error("encounter has no combatants")]
    NoCombatants,

    #[error("encounter is in progress but has no {0} phase set")]
    PhaseUnset(&'static str),

    #[error("combatant {combatant} must be entitled to at least one turn per round")]
    InvalidTurnAllotment { combatant: CombatantId },

    #[error("combatant {0} is already part of this encounter")]
    DuplicateCombatant(CombatantId),
}

/// Errors surfaced by encounter transitions.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TurnError {
    #[error(transparent)]
    Ineligible(#[from] Ineligible),

    #[error("{user} has no edit authority over {combatant}")]
    Unauthorized {
        user: UserId,
        combatant: CombatantId,
    },

    #[error("cannot {operation} while the encounter is {}", .status.as_str())]
    InvalidTransition {
        operation: &'static str,
        status: EncounterStatus,
    },

    #[error("no starting phase was selected")]
    MissingSelection,

    #[error("{user} may not change the turn state and no relay is available")]
    PermissionDenied { user: UserId },

    #[error(transparent)]
    Setup(#[from] SetupError),
}

impl TurnError {
    pub(crate) fn invalid(operation: &'static str, status: EncounterStatus) -> Self {
        Self::InvalidTransition { operation, status }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Ineligible(_) | Self::MissingSelection => ErrorSeverity::Recoverable,
            Self::Unauthorized { .. } | Self::InvalidTransition { .. } => {
                ErrorSeverity::Validation
            }
            Self::PermissionDenied { .. } | Self::Setup(_) => ErrorSeverity::Fatal,
        }
    }

    /// Returns true if the failure should reach the user as a transient warning.
    pub fn is_warning(&self) -> bool {
        matches!(self, Self::Ineligible(_))
    }

    /// Returns a static identifier for this error variant.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Ineligible(Ineligible::NotThisPhase { .. }) => "not_this_phase",
            Self::Ineligible(Ineligible::CannotTakeTurn { .. }) => "cannot_take_turn",
            Self::Ineligible(Ineligible::NotActive { .. }) => "not_active",
            Self::Ineligible(Ineligible::TurnInProgress { .. }) => "turn_in_progress",
            Self::Ineligible(Ineligible::UnknownCombatant(_)) => "unknown_combatant",
            Self::Unauthorized { .. } => "unauthorized",
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::MissingSelection => "missing_selection",
            Self::PermissionDenied { .. } => "permission_denied",
            Self::Setup(_) => "setup",
        }
    }
}
