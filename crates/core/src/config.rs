/// Encounter rules that come from the host's settings storage.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EncounterSettings {
    /// Exclude defeated combatants from phase hand-off and round completion.
    pub skip_defeated: bool,
    /// Seconds of game time charged per turn when the clock advances.
    pub turn_time: u32,
    /// Seconds of game time charged once per completed round.
    pub round_time: u32,
    /// Whether players see how many turns non-controlled combatants have left.
    pub npc_turns_visibility: NpcTurnsVisibility,
}

/// Visibility of remaining turns for combatants the viewer does not control.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum NpcTurnsVisibility {
    #[default]
    Always,
    Never,
}

impl EncounterSettings {
    pub const DEFAULT_TURN_TIME: u32 = 6;
    pub const DEFAULT_ROUND_TIME: u32 = 0;

    pub fn new() -> Self {
        Self {
            skip_defeated: false,
            turn_time: Self::DEFAULT_TURN_TIME,
            round_time: Self::DEFAULT_ROUND_TIME,
            npc_turns_visibility: NpcTurnsVisibility::Always,
        }
    }

    pub fn with_skip_defeated(mut self, skip_defeated: bool) -> Self {
        self.skip_defeated = skip_defeated;
        self
    }

    pub fn with_clock(mut self, turn_time: u32, round_time: u32) -> Self {
        self.turn_time = turn_time;
        self.round_time = round_time;
        self
    }
}

impl Default for EncounterSettings {
    fn default() -> Self {
        Self::new()
    }
}
