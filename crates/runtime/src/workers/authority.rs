//! Authority worker that owns the authoritative [`encounter_core::Encounter`].
//!
//! Receives commands from [`EncounterHandle`](crate::EncounterHandle) and the
//! relay listener, runs transitions through [`PhaseEngine`] one at a time and
//! publishes what they produced to the EventBus.

use std::ops::ControlFlow;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use encounter_core::{
    ActorId, Combatant, CombatantId, Encounter, EncounterEnv, EncounterSettings, ErrorSeverity, Ineligible,
    PhaseEngine, TrackerView, TransitionOutcome, TurnError, TurnNotice, UserId,
};

use super::HandlerCommand;
use crate::api::AuthorityOracle;
use crate::events::{Event, EventBus, RelayEvent, TurnEvent};
use crate::relay::{CombatFlag, RelayMessage};
use crate::rolls::{
    ConfirmationReason, CorrelationId, PendingRolls, RollContext, RollError, RollTicket,
};
use crate::store::ActorStore;

type TransitionResult = Result<TransitionOutcome, TurnError>;

/// Commands that can be sent to the authority worker
pub enum Command {
    /// Open the encounter and wait for the first-phase choice.
    BeginCombat {
        reply: oneshot::Sender<TransitionResult>,
    },
    SelectFirstPhase {
        choice: Option<encounter_core::Faction>,
        reply: oneshot::Sender<TransitionResult>,
    },
    StartTurn {
        user: UserId,
        combatant: CombatantId,
        reply: oneshot::Sender<TransitionResult>,
    },
    EndTurn {
        user: UserId,
        combatant: CombatantId,
        reply: oneshot::Sender<TransitionResult>,
    },
    NextTurn {
        reply: oneshot::Sender<TransitionResult>,
    },
    NextRound {
        reply: oneshot::Sender<TransitionResult>,
    },
    EndCombat {
        reply: oneshot::Sender<TransitionResult>,
    },
    UpdateFlag {
        flag: CombatFlag,
        reply: oneshot::Sender<TransitionResult>,
    },
    AddCombatant {
        combatant: Combatant,
        reply: oneshot::Sender<Result<(), TurnError>>,
    },
    RemoveCombatant {
        combatant: CombatantId,
        reply: oneshot::Sender<Option<Combatant>>,
    },
    SetDefeated {
        combatant: CombatantId,
        defeated: bool,
        reply: oneshot::Sender<Result<(), TurnError>>,
    },
    /// Query the current encounter (read-only).
    QueryEncounter { reply: oneshot::Sender<Encounter> },
    TrackerView {
        user: UserId,
        reply: oneshot::Sender<TrackerView>,
    },
    RollContext {
        combatant: CombatantId,
        reply: oneshot::Sender<Option<RollContext>>,
    },
    BeginRoll {
        user: UserId,
        combatant: CombatantId,
        reply: oneshot::Sender<Result<RollTicket, RollError>>,
    },
    ConfirmRoll {
        user: UserId,
        combatant: CombatantId,
        id: CorrelationId,
        reply: oneshot::Sender<Result<Option<ConfirmationReason>, RollError>>,
    },
    CancelRoll {
        user: UserId,
        combatant: CombatantId,
        reply: oneshot::Sender<Result<bool, RollError>>,
    },
    /// Request forwarded by a participant without authority.
    Relay(RelayMessage),
    /// Reply once the handler worker caught up with published events.
    Settle { reply: oneshot::Sender<()> },
    Shutdown,
}

/// Background task that processes encounter commands.
///
/// Every write to the encounter happens here, one command at a time, so
/// concurrent requests from several participants can never interleave
/// inside a transition.
pub struct AuthorityWorker {
    encounter: Encounter,
    settings: EncounterSettings,
    store: Arc<ActorStore>,
    authority: Arc<dyn AuthorityOracle>,
    command_rx: mpsc::Receiver<Command>,
    event_bus: EventBus,
    handler_tx: mpsc::Sender<HandlerCommand>,
    pending_rolls: PendingRolls,
}

impl AuthorityWorker {
    /// Creates a new authority worker.
    pub fn new(
        encounter: Encounter,
        settings: EncounterSettings,
        store: Arc<ActorStore>,
        authority: Arc<dyn AuthorityOracle>,
        command_rx: mpsc::Receiver<Command>,
        event_bus: EventBus,
        handler_tx: mpsc::Sender<HandlerCommand>,
    ) -> Self {
        info!(
            target: "runtime::worker",
            encounter = %encounter.id,
            combatants = encounter.combatants().len(),
            status = encounter.status.as_str(),
            "AuthorityWorker initialized"
        );

        Self {
            encounter,
            settings,
            store,
            authority,
            command_rx,
            event_bus,
            handler_tx,
            pending_rolls: PendingRolls::new(),
        }
    }

    /// Main worker loop.
    pub async fn run(mut self) {
        loop {
            tokio::select! {
                Some(cmd) = self.command_rx.recv() => {
                    if self.handle_command(cmd).await.is_break() {
                        break;
                    }
                }
                else => break,
            }
        }

        debug!(
            target: "runtime::worker",
            encounter = %self.encounter.id,
            "AuthorityWorker stopped"
        );
    }

    async fn handle_command(&mut self, cmd: Command) -> ControlFlow<()> {
        match cmd {
            Command::BeginCombat { reply } => {
                let result = self.transition(|engine| engine.begin_combat());
                let result = self.settle_transition("begin combat", None, result).await;
                send_reply(reply, result, "BeginCombat");
            }
            Command::SelectFirstPhase { choice, reply } => {
                let result = self.transition(|engine| engine.select_first_phase(choice));
                let result = self
                    .settle_transition("select first phase", None, result)
                    .await;
                send_reply(reply, result, "SelectFirstPhase");
            }
            Command::StartTurn {
                user,
                combatant,
                reply,
            } => {
                let result = self
                    .authorize(&user, &combatant)
                    .and_then(|()| self.transition(|engine| engine.start_turn(&combatant)));
                let result = self
                    .settle_transition("start turn", Some(&user), result)
                    .await;
                send_reply(reply, result, "StartTurn");
            }
            Command::EndTurn {
                user,
                combatant,
                reply,
            } => {
                let result = self
                    .authorize(&user, &combatant)
                    .and_then(|()| self.transition(|engine| engine.end_turn(&combatant)));
                let result = self.settle_transition("end turn", Some(&user), result).await;
                send_reply(reply, result, "EndTurn");
            }
            Command::NextTurn { reply } => {
                let result = self.transition(|engine| engine.next_turn());
                let result = self.settle_transition("next turn", None, result).await;
                send_reply(reply, result, "NextTurn");
            }
            Command::NextRound { reply } => {
                let result = self.transition(|engine| engine.next_round());
                let result = self.settle_transition("next round", None, result).await;
                send_reply(reply, result, "NextRound");
            }
            Command::EndCombat { reply } => {
                let result = self.transition(|engine| engine.end_combat());
                let result = self.settle_transition("end combat", None, result).await;
                if result.is_ok() {
                    let dropped = self.pending_rolls.clear();
                    if dropped > 0 {
                        debug!(target: "runtime::worker", dropped, "Dropped pending rolls");
                    }
                }
                send_reply(reply, result, "EndCombat");
            }
            Command::UpdateFlag { flag, reply } => {
                let result = self.apply_flag(flag);
                let result = self.settle_transition("update flag", None, result).await;
                send_reply(reply, result, "UpdateFlag");
            }
            Command::AddCombatant { combatant, reply } => {
                let id = combatant.id.clone();
                let result = self
                    .encounter
                    .add_combatant(combatant)
                    .map_err(TurnError::from);
                match &result {
                    Ok(()) => {
                        info!(target: "runtime::worker", combatant = %id, "Combatant joined");
                        self.publish_turn_changed();
                    }
                    Err(error) => log_rejection("add combatant", error),
                }
                send_reply(reply, result, "AddCombatant");
            }
            Command::RemoveCombatant { combatant, reply } => {
                let removed = self.encounter.remove_combatant(&combatant);
                if removed.is_some() {
                    info!(target: "runtime::worker", combatant = %combatant, "Combatant left");
                    self.recheck_phase("remove combatant").await;
                }
                send_reply(reply, removed, "RemoveCombatant");
            }
            Command::SetDefeated {
                combatant,
                defeated,
                reply,
            } => {
                let result = match self.encounter.combatant_mut(&combatant) {
                    Some(entry) => {
                        entry.is_defeated = defeated;
                        Ok(())
                    }
                    None => Err(Ineligible::UnknownCombatant(combatant.clone()).into()),
                };
                if result.is_ok() {
                    debug!(
                        target: "runtime::worker",
                        combatant = %combatant,
                        defeated,
                        "Defeated flag changed"
                    );
                    self.recheck_phase("set defeated").await;
                }
                send_reply(reply, result, "SetDefeated");
            }
            Command::QueryEncounter { reply } => {
                send_reply(reply, self.encounter.clone(), "QueryEncounter");
            }
            Command::TrackerView { user, reply } => {
                let view = TrackerView::build(
                    &self.encounter,
                    &self.settings,
                    self.store.as_ref(),
                    |combatant| self.authority.has_edit_authority(&user, combatant),
                );
                send_reply(reply, view, "TrackerView");
            }
            Command::RollContext { combatant, reply } => {
                let context = self
                    .encounter
                    .combatant(&combatant)
                    .map(|entry| RollContext::build(&self.encounter, entry, &self.store));
                send_reply(reply, context, "RollContext");
            }
            Command::BeginRoll {
                user,
                combatant,
                reply,
            } => {
                let result = self.begin_roll(&user, &combatant);
                send_reply(reply, result, "BeginRoll");
            }
            Command::ConfirmRoll {
                user,
                combatant,
                id,
                reply,
            } => {
                let result = self
                    .roller_actor(&user, &combatant)
                    .map(|actor| actor.and_then(|actor| self.pending_rolls.resolve(&actor, id)));
                send_reply(reply, result, "ConfirmRoll");
            }
            Command::CancelRoll {
                user,
                combatant,
                reply,
            } => {
                let result = self
                    .roller_actor(&user, &combatant)
                    .map(|actor| actor.is_some_and(|actor| self.pending_rolls.cancel(&actor)));
                send_reply(reply, result, "CancelRoll");
            }
            Command::Relay(message) => self.handle_relay(message).await,
            Command::Settle { reply } => {
                if let Err(mpsc::error::SendError(HandlerCommand::Flush(reply))) =
                    self.handler_tx.send(HandlerCommand::Flush(reply)).await
                {
                    // Handler worker is gone; nothing left to wait for.
                    send_reply(reply, (), "Settle");
                }
            }
            Command::Shutdown => return ControlFlow::Break(()),
        }
        ControlFlow::Continue(())
    }

    /// Runs one transition against the encounter.
    fn transition(
        &mut self,
        op: impl FnOnce(&mut PhaseEngine<'_>) -> TransitionResult,
    ) -> TransitionResult {
        let store: &ActorStore = &self.store;
        let env = EncounterEnv::new(store, store);
        let mut engine = PhaseEngine::new(&mut self.encounter, &self.settings, env);
        op(&mut engine)
    }

    fn apply_flag(&mut self, flag: CombatFlag) -> TransitionResult {
        match flag {
            CombatFlag::CurrentPhase(phase) => {
                self.transition(|engine| engine.override_phase(phase))
            }
            CombatFlag::FirstPhase(phase) => {
                self.transition(|engine| engine.override_first_phase(phase))
            }
        }
    }

    /// Checks that `user` may drive `combatant`. Unknown combatants are left
    /// to the engine to reject.
    fn authorize(&self, user: &UserId, combatant: &CombatantId) -> Result<(), TurnError> {
        match self.encounter.combatant(combatant) {
            Some(entry) if !self.authority.has_edit_authority(user, entry) => {
                Err(TurnError::Unauthorized {
                    user: user.clone(),
                    combatant: combatant.clone(),
                })
            }
            _ => Ok(()),
        }
    }

    fn begin_roll(&self, user: &UserId, combatant: &CombatantId) -> Result<RollTicket, RollError> {
        let entry = self.roller(user, combatant)?;
        let context = RollContext::build(&self.encounter, entry, &self.store);
        let pending = match (&context.actor, context.confirmation) {
            (Some(actor), Some(reason)) => {
                let id = self
                    .pending_rolls
                    .begin(actor, reason)
                    .ok_or_else(|| RollError::AlreadyPending(actor.clone()))?;
                debug!(
                    target: "runtime::worker",
                    actor = %actor,
                    reason = ?reason,
                    id = id.0,
                    "Roll waits for confirmation"
                );
                Some(id)
            }
            _ => None,
        };
        Ok(RollTicket { context, pending })
    }

    /// Looks up a combatant `user` may roll for.
    fn roller(&self, user: &UserId, combatant: &CombatantId) -> Result<&Combatant, RollError> {
        let entry = self
            .encounter
            .combatant(combatant)
            .ok_or_else(|| TurnError::from(Ineligible::UnknownCombatant(combatant.clone())))?;
        if !self.authority.has_edit_authority(user, entry) {
            return Err(TurnError::Unauthorized {
                user: user.clone(),
                combatant: combatant.clone(),
            }
            .into());
        }
        Ok(entry)
    }

    fn roller_actor(
        &self,
        user: &UserId,
        combatant: &CombatantId,
    ) -> Result<Option<ActorId>, RollError> {
        self.roller(user, combatant).map(|entry| entry.actor.clone())
    }

    /// Publishes a successful outcome or reports a rejection to `user`.
    async fn settle_transition(
        &self,
        operation: &'static str,
        user: Option<&UserId>,
        result: TransitionResult,
    ) -> TransitionResult {
        match &result {
            Ok(outcome) => self.publish(outcome).await,
            Err(error) => {
                log_rejection(operation, error);
                self.event_bus.publish(Event::Turn(TurnEvent::Rejected {
                    user: user.cloned(),
                    code: error.error_code().to_owned(),
                    warning: error.to_string(),
                }));
            }
        }
        result
    }

    /// Publishes everything a transition produced, in emission order.
    async fn publish(&self, outcome: &TransitionOutcome) {
        for event in &outcome.events {
            debug!(
                target: "runtime::worker",
                event = event.kind.as_str(),
                round = event.round,
                combatant = ?event.combatant_id(),
                "Combat event"
            );
            self.event_bus.publish(Event::Combat(event.clone()));
            if self
                .handler_tx
                .send(HandlerCommand::Dispatch(event.clone()))
                .await
                .is_err()
            {
                warn!(
                    target: "runtime::worker",
                    event = event.kind.as_str(),
                    "Handler worker gone, condition handlers skipped"
                );
            }
        }

        for notice in &outcome.notices {
            self.event_bus
                .publish(Event::Turn(TurnEvent::Notice(notice.clone())));
        }

        if !outcome.expired.is_empty() {
            self.event_bus
                .publish(Event::Turn(TurnEvent::EffectsExpired(outcome.expired.clone())));
        }
    }

    /// Re-evaluates the open phase after a roster change and publishes the
    /// hand-off or rollover it caused, if any.
    async fn recheck_phase(&mut self, operation: &'static str) {
        match self.transition(|engine| engine.recheck_phase()) {
            Ok(outcome) if outcome.is_empty() => self.publish_turn_changed(),
            Ok(outcome) => {
                debug!(
                    target: "runtime::worker",
                    operation,
                    round = self.encounter.round,
                    phase = ?self.encounter.current_phase,
                    "Phase re-evaluated after roster change"
                );
                self.publish(&outcome).await;
            }
            Err(error) => log_rejection(operation, &error),
        }
    }

    fn publish_turn_changed(&self) {
        self.event_bus
            .publish(Event::Turn(TurnEvent::Notice(TurnNotice::TurnChanged {
                round: self.encounter.round,
                current_phase: self.encounter.current_phase,
                active: self.encounter.active_combatant.clone(),
            })));
    }

    /// Applies a relayed request as if it had been made locally.
    ///
    /// Requests that fail validation are dropped without notifying the
    /// requester.
    async fn handle_relay(&mut self, message: RelayMessage) {
        let kind = message.kind();
        let user = message.user().clone();

        let result = if *message.encounter() != self.encounter.id {
            Err(format!("unknown encounter {}", message.encounter()))
        } else {
            let applied = match message {
                RelayMessage::StartCombatantTurn {
                    combatant, user, ..
                } => self
                    .authorize(&user, &combatant)
                    .and_then(|()| self.transition(|engine| engine.start_turn(&combatant))),
                RelayMessage::EndCombatantTurn {
                    combatant, user, ..
                } => self
                    .authorize(&user, &combatant)
                    .and_then(|()| self.transition(|engine| engine.end_turn(&combatant))),
                RelayMessage::UpdateCombatFlag { user, flag, .. } => {
                    if self.authority.is_global_authority(&user) {
                        self.apply_flag(flag)
                    } else {
                        Err(TurnError::PermissionDenied { user })
                    }
                }
            };
            applied.map_err(|error| {
                if matches!(error, TurnError::Setup(_)) {
                    log_rejection("relay", &error);
                }
                error.to_string()
            })
        };

        match result {
            Ok(outcome) => {
                info!(
                    target: "runtime::relay",
                    kind = ?kind,
                    user = %user,
                    events = outcome.events.len(),
                    "Applied relayed request"
                );
                self.publish(&outcome).await;
                self.event_bus
                    .publish(Event::Relay(RelayEvent::Applied { kind, user }));
            }
            Err(reason) => {
                debug!(
                    target: "runtime::relay",
                    kind = ?kind,
                    user = %user,
                    reason = %reason,
                    "Dropped relayed request"
                );
                self.event_bus.publish(Event::Relay(RelayEvent::Dropped {
                    kind,
                    user,
                    reason,
                }));
            }
        }
    }
}

fn log_rejection(operation: &'static str, error: &TurnError) {
    let severity = error.severity();
    match severity {
        ErrorSeverity::Recoverable => debug!(
            target: "runtime::worker",
            operation,
            code = error.error_code(),
            error = %error,
            "Transition rejected"
        ),
        ErrorSeverity::Validation => warn!(
            target: "runtime::worker",
            operation,
            code = error.error_code(),
            error = %error,
            "Transition refused"
        ),
        ErrorSeverity::Internal | ErrorSeverity::Fatal => error!(
            target: "runtime::worker",
            operation,
            code = error.error_code(),
            severity = severity.as_str(),
            error = %error,
            "Encounter setup is broken"
        ),
    }
}

fn send_reply<T>(reply: oneshot::Sender<T>, value: T, command: &'static str) {
    if reply.send(value).is_err() {
        debug!(
            target: "runtime::worker",
            command,
            "Reply channel closed (caller dropped)"
        );
    }
}
