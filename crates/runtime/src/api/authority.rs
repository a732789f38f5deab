//! Permission checks supplied by the host.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use encounter_core::{ActorId, Combatant, UserId};

use crate::store::ActorStore;

/// Host permission system as seen by the authoritative runtime.
///
/// Consulted for every request, local or relayed, before the phase engine
/// sees it.
pub trait AuthorityOracle: Send + Sync {
    /// Returns true if `user` may start and end turns for `combatant`.
    fn has_edit_authority(&self, user: &UserId, combatant: &Combatant) -> bool;

    /// Returns true if `user` may change encounter-wide state.
    fn is_global_authority(&self, user: &UserId) -> bool;
}

/// Table of game masters and actor owners.
///
/// Game masters control everything. Everybody else controls the combatants
/// whose underlying actor they own, either through an explicit grant or
/// through the `owner` of the actor's record in an attached [`ActorStore`].
/// Combatants without an actor belong to game masters only.
#[derive(Clone, Debug, Default)]
pub struct Permissions {
    game_masters: HashSet<UserId>,
    owners: HashMap<ActorId, HashSet<UserId>>,
    store: Option<Arc<ActorStore>>,
}

impl Permissions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_gm(mut self, user: impl Into<UserId>) -> Self {
        self.game_masters.insert(user.into());
        self
    }

    #[must_use]
    pub fn with_owner(mut self, actor: impl Into<ActorId>, user: impl Into<UserId>) -> Self {
        self.grant(actor, user);
        self
    }

    /// Reads actor ownership from `store` on every check.
    #[must_use]
    pub fn with_store(mut self, store: Arc<ActorStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn grant(&mut self, actor: impl Into<ActorId>, user: impl Into<UserId>) {
        self.owners
            .entry(actor.into())
            .or_default()
            .insert(user.into());
    }

    pub fn revoke(&mut self, actor: &ActorId, user: &UserId) -> bool {
        self.owners
            .get_mut(actor)
            .is_some_and(|owners| owners.remove(user))
    }

    fn owns(&self, user: &UserId, actor: &ActorId) -> bool {
        let granted = self
            .owners
            .get(actor)
            .is_some_and(|owners| owners.contains(user));
        granted
            || self
                .store
                .as_ref()
                .and_then(|store| store.owner(actor))
                .is_some_and(|owner| &owner == user)
    }
}

impl AuthorityOracle for Permissions {
    fn has_edit_authority(&self, user: &UserId, combatant: &Combatant) -> bool {
        self.is_global_authority(user)
            || combatant
                .actor
                .as_ref()
                .is_some_and(|actor| self.owns(user, actor))
    }

    fn is_global_authority(&self, user: &UserId) -> bool {
        self.game_masters.contains(user)
    }
}
