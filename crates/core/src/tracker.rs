//! Read model for turn tracker displays.

use crate::config::{EncounterSettings, NpcTurnsVisibility};
use crate::env::StatusOracle;
use crate::faction::Faction;
use crate::state::{Combatant, CombatantId, Encounter};

/// One line of the tracker.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TrackerRow {
    pub id: CombatantId,
    pub name: String,
    pub faction: Option<Faction>,
    /// `None` when hidden from this viewer.
    pub turns_left: Option<u32>,
    pub can_start: bool,
    pub is_active: bool,
    pub is_defeated: bool,
    pub can_control: bool,
}

/// Snapshot of an encounter as one viewer sees it.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TrackerView {
    pub round: u32,
    pub started: bool,
    pub current_phase: Option<Faction>,
    pub active: Option<CombatantId>,
    /// Allies first, then enemies, then observers.
    pub rows: Vec<TrackerRow>,
}

impl TrackerView {
    /// Builds the view for a viewer allowed to drive the combatants
    /// `can_control` accepts.
    pub fn build(
        encounter: &Encounter,
        settings: &EncounterSettings,
        status: &dyn StatusOracle,
        can_control: impl Fn(&Combatant) -> bool,
    ) -> Self {
        let started = encounter.is_started();
        let phase_open = started && encounter.active_combatant.is_none();

        let rows = encounter
            .display_order()
            .into_iter()
            .map(|combatant| {
                let can_control = can_control(combatant);
                let show_turns =
                    can_control || settings.npc_turns_visibility == NpcTurnsVisibility::Always;
                let can_start = phase_open
                    && can_control
                    && combatant.faction.is_some()
                    && combatant.faction == encounter.current_phase
                    && encounter.can_take_turn(combatant, status);

                TrackerRow {
                    id: combatant.id.clone(),
                    name: combatant.name.clone(),
                    faction: combatant.faction,
                    turns_left: show_turns.then(|| encounter.turns_left(combatant)),
                    can_start,
                    is_active: combatant.is_active_turn,
                    is_defeated: combatant.is_defeated,
                    can_control,
                }
            })
            .collect();

        Self {
            round: encounter.round,
            started,
            current_phase: encounter.current_phase,
            active: encounter.active_combatant.clone(),
            rows,
        }
    }

    pub fn row(&self, id: &CombatantId) -> Option<&TrackerRow> {
        self.rows.iter().find(|row| &row.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::NoStatus;
    use crate::state::EncounterStatus;

    fn encounter() -> Encounter {
        let mut encounter = Encounter::new("enc");
        encounter
            .add_combatant(Combatant::new("hero", "Hero", Faction::Allied).with_actor("pc"))
            .unwrap();
        encounter
            .add_combatant(Combatant::new("imp", "Imp", Faction::Enemy).with_turns(2))
            .unwrap();
        encounter.status = EncounterStatus::InProgress;
        encounter.round = 1;
        encounter.first_phase = Some(Faction::Allied);
        encounter.current_phase = Some(Faction::Allied);
        encounter
    }

    fn owns_hero(combatant: &Combatant) -> bool {
        combatant.id.as_str() == "hero"
    }

    #[test]
    fn only_controlled_combatants_in_phase_can_start() {
        let view = TrackerView::build(
            &encounter(),
            &EncounterSettings::default(),
            &NoStatus,
            owns_hero,
        );
        let hero = view.row(&CombatantId::from("hero")).unwrap();
        let imp = view.row(&CombatantId::from("imp")).unwrap();
        assert!(hero.can_start);
        assert!(!imp.can_start);
        assert_eq!(imp.turns_left, Some(2));
    }

    #[test]
    fn npc_turns_can_be_hidden() {
        let settings = EncounterSettings {
            npc_turns_visibility: NpcTurnsVisibility::Never,
            ..EncounterSettings::default()
        };
        let view = TrackerView::build(&encounter(), &settings, &NoStatus, owns_hero);
        assert_eq!(view.row(&CombatantId::from("imp")).unwrap().turns_left, None);
        assert_eq!(view.row(&CombatantId::from("hero")).unwrap().turns_left, Some(1));
    }

    #[test]
    fn nobody_starts_while_a_turn_is_running() {
        let mut encounter = encounter();
        encounter.active_combatant = Some(CombatantId::from("hero"));
        encounter
            .combatant_mut(&CombatantId::from("hero"))
            .unwrap()
            .is_active_turn = true;

        let view = TrackerView::build(&encounter, &EncounterSettings::default(), &NoStatus, |_| {
            true
        });
        assert!(view.rows.iter().all(|row| !row.can_start));
        assert!(view.row(&CombatantId::from("hero")).unwrap().is_active);
    }
}
