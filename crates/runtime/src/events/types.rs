use serde::{Deserialize, Serialize};

use encounter_core::{ExpiredEffect, TurnNotice, UserId};

use crate::relay::RelayKind;

/// Turn bookkeeping published alongside combat events.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TurnEvent {
    Notice(TurnNotice),
    /// Effects that ran out and may need confirming.
    EffectsExpired(Vec<ExpiredEffect>),
    /// A request was refused; `warning` is shown to `user`.
    Rejected {
        user: Option<UserId>,
        code: String,
        warning: String,
    },
}

/// What the authority did with a relayed request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelayEvent {
    Applied { kind: RelayKind, user: UserId },
    Dropped {
        kind: RelayKind,
        user: UserId,
        reason: String,
    },
}
