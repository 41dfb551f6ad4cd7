//! Local projection of walkathon milestone claim states

use rewards_core::{ClaimState, MilestoneId, WalkathonProgress};
use std::collections::HashMap;
use tracing::debug;

/// Claim state per milestone, as last confirmed by the server.
///
/// States only move forward (`Locked < Reached < Claimed`); an older or
/// partial progress payload can never move a milestone back.
#[derive(Debug, Clone, Default)]
pub struct ClaimLedger {
    states: HashMap<MilestoneId, ClaimState>,
}

impl ClaimLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a progress refresh into the ledger
    pub fn apply_progress(&mut self, progress: &WalkathonProgress) {
        for milestone in progress.known_milestones() {
            self.advance(milestone, progress.state_of(milestone));
        }
    }

    /// Record a server-confirmed claim
    pub fn mark_claimed(&mut self, milestone: MilestoneId) {
        debug!("Milestone {} marked claimed", milestone);
        self.advance(milestone, ClaimState::Claimed);
    }

    pub fn state(&self, milestone: MilestoneId) -> ClaimState {
        self.states.get(&milestone).copied().unwrap_or_default()
    }

    /// Reached and not yet claimed
    pub fn can_claim(&self, milestone: MilestoneId) -> bool {
        self.state(milestone) == ClaimState::Reached
    }

    pub fn is_reached(&self, milestone: MilestoneId) -> bool {
        self.state(milestone) >= ClaimState::Reached
    }

    pub fn is_claimed(&self, milestone: MilestoneId) -> bool {
        self.state(milestone) == ClaimState::Claimed
    }

    /// Claimable milestones in ascending order
    pub fn available(&self) -> Vec<MilestoneId> {
        let mut ids: Vec<MilestoneId> = self
            .states
            .iter()
            .filter(|(_, s)| **s == ClaimState::Reached)
            .map(|(id, _)| *id)
            .collect();
        ids.sort();
        ids
    }

    fn advance(&mut self, milestone: MilestoneId, next: ClaimState) {
        let state = self.states.entry(milestone).or_default();
        if next > *state {
            *state = next;
        }
    }
}
