//! Scripted encounter played by the client binary.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, bail};
use tokio::sync::broadcast;

use encounter_core::{Combatant, Encounter, Faction, TrackerView};
use encounter_runtime::{
    ActiveEffect, ActorRecord, ActorStore, Condition, Dispatch, EncounterHandle, Event,
    FixedPrompt, Permissions, RelayEvent, Runtime, RuntimeConfig, Topic, TurnEvent,
};

const GM: &str = "gm";
const PLAYER: &str = "player";

type Subscriptions = HashMap<Topic, broadcast::Receiver<Event>>;

pub async fn run(config: RuntimeConfig) -> Result<()> {
    let store = Arc::new(ActorStore::new());
    store.insert(ActorRecord::new("hero", "Hero", 12).owned_by(PLAYER));
    store.insert(ActorRecord::new("goblin", "Goblin", 8));
    store.apply(&"goblin".into(), ActiveEffect::permanent(Condition::Burning))?;
    store.apply(&"hero".into(), ActiveEffect::permanent(Condition::bleeding(1)))?;

    let mut encounter = Encounter::new("demo");
    encounter.add_combatant(Combatant::new("hero", "Hero", Faction::Allied).with_actor("hero"))?;
    encounter.add_combatant(
        Combatant::new("goblin", "Goblin", Faction::Enemy)
            .with_actor("goblin")
            .with_turns(2),
    )?;
    encounter.add_combatant(Combatant::observer("scribe", "Scribe"))?;

    let runtime = Runtime::builder()
        .config(config)
        .encounter(encounter)
        .store(Arc::clone(&store))
        .authority(Permissions::new().with_gm(GM).with_store(Arc::clone(&store)))
        .build()?;

    let gm = runtime.handle(GM);
    let player = runtime.handle(PLAYER);
    let mut events = gm.subscribe_multiple(&[Topic::Combat, Topic::Turn, Topic::Relay]);

    report(&gm, gm.start_combat(&FixedPrompt(Some(Faction::Allied))).await?);
    drain(&mut events);
    print_tracker(&player.tracker_view().await?);

    // The goblin's phase has not opened yet.
    report(&player, player.start_turn("goblin".into()).await?);
    drain(&mut events);

    take_turn(&player, "hero").await?;
    drain(&mut events);

    // A remote game master drives the goblin through the relay.
    let remote_gm = runtime.participant(GM);
    for _ in 0..2 {
        let dispatch = remote_gm.start_turn("goblin".into()).await?;
        await_relay(&remote_gm, &mut events, dispatch).await?;
        let dispatch = remote_gm.end_turn("goblin".into()).await?;
        await_relay(&remote_gm, &mut events, dispatch).await?;
    }

    gm.settle().await?;
    print_tracker(&player.tracker_view().await?);
    if let Some(context) = player.roll_context("hero".into()).await? {
        println!(
            "hero rolls in round {} with penalty {} ({} conditions)",
            context.round,
            context.penalty(),
            context.conditions.len()
        );
    }

    report(&gm, gm.end_combat().await?);
    gm.settle().await?;
    drain(&mut events);

    for actor in ["hero", "goblin"] {
        if let Some(record) = store.get(&actor.into()) {
            println!(
                "{}: {}/{} health, {} bloodloss",
                record.name,
                record.health,
                record.max_health(),
                record.bloodloss
            );
        }
    }

    drop((gm, player, remote_gm));
    runtime.shutdown().await?;
    Ok(())
}

async fn take_turn(handle: &EncounterHandle, combatant: &str) -> Result<()> {
    report(handle, handle.start_turn(combatant.into()).await?);
    handle.settle().await?;
    report(handle, handle.end_turn(combatant.into()).await?);
    handle.settle().await?;
    Ok(())
}

/// Waits until the authority has decided on a relayed request.
async fn await_relay(
    handle: &EncounterHandle,
    events: &mut Subscriptions,
    dispatch: Dispatch,
) -> Result<()> {
    if dispatch != Dispatch::Forwarded {
        bail!("expected the request to be relayed, got {dispatch:?}");
    }

    let Some(relay_rx) = events.get_mut(&Topic::Relay) else {
        bail!("not subscribed to relay outcomes");
    };
    loop {
        let event = tokio::time::timeout(Duration::from_secs(5), relay_rx.recv()).await??;
        if let Event::Relay(outcome) = event {
            print_relay(&outcome);
            break;
        }
    }

    handle.settle().await?;
    drain(events);
    Ok(())
}

fn report(handle: &EncounterHandle, dispatch: Dispatch) {
    match dispatch {
        Dispatch::Applied(outcome) => {
            tracing::debug!(user = %handle.user(), events = outcome.events.len(), "Applied");
        }
        Dispatch::Rejected(error) if error.is_warning() => {
            println!("[{}] warning: {error}", handle.user());
        }
        Dispatch::Rejected(error) => {
            println!("[{}] rejected ({}): {error}", handle.user(), error.error_code());
        }
        Dispatch::Forwarded => println!("[{}] forwarded to the authority", handle.user()),
    }
}

/// Prints whatever the bus delivered since the last call.
fn drain(events: &mut Subscriptions) {
    for topic in [Topic::Combat, Topic::Turn, Topic::Relay] {
        let Some(rx) = events.get_mut(&topic) else {
            continue;
        };
        while let Ok(event) = rx.try_recv() {
            match event {
                Event::Combat(event) => match event.combatant_id() {
                    Some(id) => println!("  round {}: {} ({id})", event.round, event.kind.as_str()),
                    None => println!("  round {}: {}", event.round, event.kind.as_str()),
                },
                Event::Turn(TurnEvent::Notice(notice)) => println!("  {notice:?}"),
                Event::Turn(TurnEvent::EffectsExpired(expired)) => {
                    for effect in expired {
                        println!("  {} expired on {}", effect.label, effect.combatant);
                    }
                }
                Event::Turn(TurnEvent::Rejected { code, warning, .. }) => {
                    println!("  rejected [{code}]: {warning}");
                }
                Event::Relay(outcome) => print_relay(&outcome),
            }
        }
    }
}

fn print_relay(outcome: &RelayEvent) {
    match outcome {
        RelayEvent::Applied { kind, user } => println!("  relay {kind:?} from {user} applied"),
        RelayEvent::Dropped { kind, user, reason } => {
            println!("  relay {kind:?} from {user} dropped: {reason}")
        }
    }
}

fn print_tracker(view: &TrackerView) {
    let phase = view.current_phase.map_or("-", Faction::phase_label);
    println!("== round {} | {phase} ==", view.round);
    for row in &view.rows {
        let turns = row
            .turns_left
            .map_or_else(|| "?".to_owned(), |turns| turns.to_string());
        let marker = if row.is_active {
            ">"
        } else if row.can_start {
            "*"
        } else {
            " "
        };
        let defeated = if row.is_defeated { " (defeated)" } else { "" };
        println!("{marker} {:<8} turns left {turns}{defeated}", row.name);
    }
}
