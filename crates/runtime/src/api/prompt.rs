//! First-phase selection prompt.

use async_trait::async_trait;
use strum::IntoEnumIterator;

use encounter_core::Faction;

/// One choice offered when combat starts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PhaseOption {
    pub faction: Faction,
    pub label: &'static str,
}

impl PhaseOption {
    /// Every faction, in the order they are offered.
    pub fn all() -> Vec<Self> {
        Faction::iter()
            .map(|faction| Self {
                faction,
                label: faction.phase_label(),
            })
            .collect()
    }
}

/// Asks whoever starts combat which faction acts first.
#[async_trait]
pub trait FirstPhasePrompt: Send + Sync {
    /// Returns the chosen faction, or `None` if the prompt was dismissed.
    async fn choose_first_phase(&self, options: &[PhaseOption]) -> Option<Faction>;
}

/// Prompt with a predetermined answer, for headless use.
#[derive(Clone, Copy, Debug)]
pub struct FixedPrompt(pub Option<Faction>);

#[async_trait]
impl FirstPhasePrompt for FixedPrompt {
    async fn choose_first_phase(&self, options: &[PhaseOption]) -> Option<Faction> {
        self.0
            .filter(|choice| options.iter().any(|option| option.faction == *choice))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offers_both_phases() {
        let labels: Vec<_> = PhaseOption::all().iter().map(|o| o.label).collect();
        assert_eq!(labels, ["Ally Phase", "Enemy Phase"]);
    }

    #[tokio::test]
    async fn fixed_prompt_only_answers_offered_factions() {
        let options = PhaseOption::all();
        assert_eq!(
            FixedPrompt(Some(Faction::Enemy))
                .choose_first_phase(&options)
                .await,
            Some(Faction::Enemy)
        );
        assert_eq!(
            FixedPrompt(Some(Faction::Enemy))
                .choose_first_phase(&options[..1])
                .await,
            None
        );
    }
}
