use std::collections::BTreeMap;

use super::CombatantId;

/// Per-round record of completed turns.
///
/// Each completed turn appends the combatant's id, so a combatant with
/// several turns per round appears once per turn. Entries of earlier rounds
/// are kept for history but are not consulted after the round rolls over.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TurnLedger {
    turns_taken_by_round: BTreeMap<u32, Vec<CombatantId>>,
}

impl TurnLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one completed turn.
    pub fn record(&mut self, round: u32, combatant: CombatantId) {
        self.turns_taken_by_round
            .entry(round)
            .or_default()
            .push(combatant);
    }

    /// Completed turns of `round` in chronological order.
    pub fn taken_in(&self, round: u32) -> &[CombatantId] {
        self.turns_taken_by_round
            .get(&round)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Number of turns `combatant` completed in `round`.
    pub fn count(&self, round: u32, combatant: &CombatantId) -> u32 {
        let taken = self.taken_in(round).iter().filter(|id| *id == combatant).count();
        u32::try_from(taken).unwrap_or(u32::MAX)
    }

    pub fn is_empty(&self) -> bool {
        self.turns_taken_by_round.is_empty()
    }

    pub fn clear(&mut self) {
        self.turns_taken_by_round.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_repeated_turns_per_round() {
        let mut ledger = TurnLedger::new();
        let ogre = CombatantId::from("ogre");
        let elf = CombatantId::from("elf");

        ledger.record(1, ogre.clone());
        ledger.record(1, elf.clone());
        ledger.record(1, ogre.clone());
        ledger.record(2, elf.clone());

        assert_eq!(ledger.count(1, &ogre), 2);
        assert_eq!(ledger.count(1, &elf), 1);
        assert_eq!(ledger.count(2, &ogre), 0);
        assert_eq!(ledger.taken_in(1), &[ogre.clone(), elf.clone(), ogre]);
        assert_eq!(ledger.taken_in(2), &[elf]);
    }

    #[test]
    fn unknown_round_is_empty() {
        let ledger = TurnLedger::new();
        assert!(ledger.taken_in(7).is_empty());
        assert_eq!(ledger.count(7, &CombatantId::from("nobody")), 0);
    }
}
