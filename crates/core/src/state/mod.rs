//! Encounter state owned by the authoritative process.
//!
//! The host persists these values as attributes on its own combat documents;
//! here they are explicit typed fields.

mod combatant;
mod encounter;
mod ledger;

pub use combatant::Combatant;
pub use encounter::{Encounter, EncounterStatus, EncounterSubState};
pub use ledger::TurnLedger;

macro_rules! opaque_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        #[cfg_attr(feature = "serde", serde(transparent))]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }
    };
}

opaque_id!(
    /// Host reference to a combatant document.
    CombatantId
);
opaque_id!(
    /// Host reference to the actor behind a combatant.
    ActorId
);
opaque_id!(
    /// Host reference to the combat document.
    EncounterId
);
opaque_id!(
    /// Host reference to a connected user.
    UserId
);
