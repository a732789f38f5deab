//! Cloneable façade for issuing encounter commands.
//!
//! [`EncounterHandle`] hides channel plumbing and the authority split. On the
//! authoritative participant mutating calls go straight to the worker; every
//! other participant forwards them through the relay and gets
//! [`Dispatch::Forwarded`] back.
use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, oneshot};

use encounter_core::{
    Combatant, CombatantId, Encounter, EncounterId, ErrorSeverity, Faction, TrackerView,
    TransitionOutcome, TurnError, UserId,
};

use super::errors::{Result, RuntimeError};
use super::prompt::{FirstPhasePrompt, PhaseOption};
use crate::events::{Event, EventBus, Topic};
use crate::relay::{CombatFlag, RelayChannel, RelayMessage};
use crate::rolls::{ConfirmationReason, CorrelationId, RollContext, RollTicket};
use crate::workers::Command;

/// What happened to a mutating request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Dispatch {
    /// The authority applied the transition.
    Applied(TransitionOutcome),
    /// The request was refused and nothing changed.
    Rejected(TurnError),
    /// The request was sent to the authority for validation.
    Forwarded,
}

impl Dispatch {
    fn from_transition(result: std::result::Result<TransitionOutcome, TurnError>) -> Result<Self> {
        match result {
            Ok(outcome) => Ok(Self::Applied(outcome)),
            Err(error) if error.severity() == ErrorSeverity::Fatal => Err(error.into()),
            Err(error) => Ok(Self::Rejected(error)),
        }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }

    pub fn outcome(&self) -> Option<&TransitionOutcome> {
        match self {
            Self::Applied(outcome) => Some(outcome),
            _ => None,
        }
    }

    pub fn rejection(&self) -> Option<&TurnError> {
        match self {
            Self::Rejected(error) => Some(error),
            _ => None,
        }
    }

    /// Text to show the user as a transient warning, if any.
    pub fn warning(&self) -> Option<String> {
        self.rejection()
            .filter(|error| error.is_warning())
            .map(ToString::to_string)
    }
}

#[derive(Clone)]
enum Route {
    Authority,
    Relay(Arc<dyn RelayChannel>),
    Detached,
}

/// Participant-facing handle to one encounter.
#[derive(Clone)]
pub struct EncounterHandle {
    user: UserId,
    encounter: EncounterId,
    route: Route,
    command_tx: mpsc::Sender<Command>,
    event_bus: EventBus,
}

impl EncounterHandle {
    pub(crate) fn authority(
        user: UserId,
        encounter: EncounterId,
        command_tx: mpsc::Sender<Command>,
        event_bus: EventBus,
    ) -> Self {
        Self {
            user,
            encounter,
            route: Route::Authority,
            command_tx,
            event_bus,
        }
    }

    pub(crate) fn participant(
        user: UserId,
        encounter: EncounterId,
        relay: Option<Arc<dyn RelayChannel>>,
        command_tx: mpsc::Sender<Command>,
        event_bus: EventBus,
    ) -> Self {
        Self {
            user,
            encounter,
            route: relay.map_or(Route::Detached, Route::Relay),
            command_tx,
            event_bus,
        }
    }

    pub fn user(&self) -> &UserId {
        &self.user
    }

    pub fn encounter_id(&self) -> &EncounterId {
        &self.encounter
    }

    /// Returns true if this handle applies changes itself.
    pub fn is_authority(&self) -> bool {
        matches!(self.route, Route::Authority)
    }

    /// Starts combat: opens the encounter, asks `prompt` which faction goes
    /// first and begins round 1.
    ///
    /// A dismissed prompt leaves the encounter not started and comes back as
    /// [`Dispatch::Rejected`] with [`TurnError::MissingSelection`].
    pub async fn start_combat(&self, prompt: &dyn FirstPhasePrompt) -> Result<Dispatch> {
        self.require_authority()?;

        let begun = self
            .transition(|reply| Command::BeginCombat { reply })
            .await?;
        if !begun.is_applied() {
            return Ok(begun);
        }

        let choice = prompt.choose_first_phase(&PhaseOption::all()).await;
        self.transition(|reply| Command::SelectFirstPhase { choice, reply })
            .await
    }

    pub async fn start_turn(&self, combatant: CombatantId) -> Result<Dispatch> {
        if !self.is_authority() {
            return self
                .forward(RelayMessage::StartCombatantTurn {
                    encounter: self.encounter.clone(),
                    combatant,
                    user: self.user.clone(),
                })
                .await;
        }
        let user = self.user.clone();
        self.transition(|reply| Command::StartTurn {
            user,
            combatant,
            reply,
        })
        .await
    }

    pub async fn end_turn(&self, combatant: CombatantId) -> Result<Dispatch> {
        if !self.is_authority() {
            return self
                .forward(RelayMessage::EndCombatantTurn {
                    encounter: self.encounter.clone(),
                    combatant,
                    user: self.user.clone(),
                })
                .await;
        }
        let user = self.user.clone();
        self.transition(|reply| Command::EndTurn {
            user,
            combatant,
            reply,
        })
        .await
    }

    /// Writes an authority-only encounter attribute.
    pub async fn update_flag(&self, flag: CombatFlag) -> Result<Dispatch> {
        if !self.is_authority() {
            return self
                .forward(RelayMessage::UpdateCombatFlag {
                    encounter: self.encounter.clone(),
                    user: self.user.clone(),
                    flag,
                })
                .await;
        }
        self.transition(|reply| Command::UpdateFlag { flag, reply })
            .await
    }

    pub async fn set_current_phase(&self, phase: Faction) -> Result<Dispatch> {
        self.update_flag(CombatFlag::CurrentPhase(phase)).await
    }

    /// Advances to whoever should act next, rolling the round over when
    /// nobody can.
    pub async fn next_turn(&self) -> Result<Dispatch> {
        self.require_authority()?;
        self.transition(|reply| Command::NextTurn { reply }).await
    }

    pub async fn next_round(&self) -> Result<Dispatch> {
        self.require_authority()?;
        self.transition(|reply| Command::NextRound { reply }).await
    }

    pub async fn end_combat(&self) -> Result<Dispatch> {
        self.require_authority()?;
        self.transition(|reply| Command::EndCombat { reply }).await
    }

    pub async fn add_combatant(&self, combatant: Combatant) -> Result<()> {
        self.require_authority()?;
        self.request(|reply| Command::AddCombatant { combatant, reply })
            .await?
            .map_err(RuntimeError::from)
    }

    pub async fn remove_combatant(&self, combatant: CombatantId) -> Result<Option<Combatant>> {
        self.require_authority()?;
        self.request(|reply| Command::RemoveCombatant { combatant, reply })
            .await
    }

    pub async fn set_defeated(&self, combatant: CombatantId, defeated: bool) -> Result<Dispatch> {
        self.require_authority()?;
        let result = self
            .request(|reply| Command::SetDefeated {
                combatant,
                defeated,
                reply,
            })
            .await?;
        Dispatch::from_transition(result.map(|()| TransitionOutcome::new()))
    }

    /// Query the current encounter state (read-only snapshot)
    pub async fn query(&self) -> Result<Encounter> {
        self.request(|reply| Command::QueryEncounter { reply })
            .await
    }

    /// Tracker contents as this handle's user sees them.
    pub async fn tracker_view(&self) -> Result<TrackerView> {
        let user = self.user.clone();
        self.request(|reply| Command::TrackerView { user, reply })
            .await
    }

    pub async fn roll_context(&self, combatant: CombatantId) -> Result<Option<RollContext>> {
        self.request(|reply| Command::RollContext { combatant, reply })
            .await
    }

    /// Starts a roll for `combatant`.
    ///
    /// Blinded or confused rollers get a pending confirmation back; the roll
    /// only counts once [`confirm_roll`](Self::confirm_roll) answers it.
    pub async fn begin_roll(&self, combatant: CombatantId) -> Result<RollTicket> {
        let user = self.user.clone();
        self.request(|reply| Command::BeginRoll {
            user,
            combatant,
            reply,
        })
        .await?
        .map_err(RuntimeError::from)
    }

    /// Answers a pending confirmation. Stale or unknown ids return `None`.
    pub async fn confirm_roll(
        &self,
        combatant: CombatantId,
        id: CorrelationId,
    ) -> Result<Option<ConfirmationReason>> {
        let user = self.user.clone();
        self.request(|reply| Command::ConfirmRoll {
            user,
            combatant,
            id,
            reply,
        })
        .await?
        .map_err(RuntimeError::from)
    }

    pub async fn cancel_roll(&self, combatant: CombatantId) -> Result<bool> {
        let user = self.user.clone();
        self.request(|reply| Command::CancelRoll {
            user,
            combatant,
            reply,
        })
        .await?
        .map_err(RuntimeError::from)
    }

    /// Waits until every condition handler finished with the events
    /// published so far.
    pub async fn settle(&self) -> Result<()> {
        self.request(|reply| Command::Settle { reply }).await
    }

    /// Subscribe to events from a specific topic
    ///
    /// # Topics
    ///
    /// - `Topic::Combat` - Lifecycle boundaries consumed by condition handlers
    /// - `Topic::Turn` - Turn notices, expired effects and warnings
    /// - `Topic::Relay` - What the authority did with relayed requests
    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<Event> {
        self.event_bus.subscribe(topic)
    }

    /// Subscribe to multiple topics at once
    pub fn subscribe_multiple(&self, topics: &[Topic]) -> HashMap<Topic, broadcast::Receiver<Event>> {
        self.event_bus.subscribe_multiple(topics)
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    fn require_authority(&self) -> Result<()> {
        if self.is_authority() {
            Ok(())
        } else {
            Err(self.permission_denied())
        }
    }

    fn permission_denied(&self) -> RuntimeError {
        TurnError::PermissionDenied {
            user: self.user.clone(),
        }
        .into()
    }

    async fn forward(&self, message: RelayMessage) -> Result<Dispatch> {
        match &self.route {
            Route::Relay(relay) => {
                relay.send(message).await?;
                Ok(Dispatch::Forwarded)
            }
            Route::Authority | Route::Detached => Err(self.permission_denied()),
        }
    }

    async fn transition(
        &self,
        command: impl FnOnce(
            oneshot::Sender<std::result::Result<TransitionOutcome, TurnError>>,
        ) -> Command,
    ) -> Result<Dispatch> {
        Dispatch::from_transition(self.request(command).await?)
    }

    async fn request<T>(&self, command: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (reply_tx, reply_rx) = oneshot::channel();

        self.command_tx
            .send(command(reply_tx))
            .await
            .map_err(|_| RuntimeError::CommandChannelClosed)?;

        reply_rx.await.map_err(RuntimeError::ReplyChannelClosed)
    }
}
