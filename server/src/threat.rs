use std::collections::HashMap;

/// Per-player aggro timers that police use to choose whom to pursue.
///
/// Entries hold remaining seconds and disappear once they run out; a player
/// with no entry has no threat at all.
#[derive(Debug, Clone, Default)]
pub struct ThreatLedger {
    entries: HashMap<u32, f32>,
}

impl ThreatLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets (or refreshes) a player's threat to `seconds`.
    pub fn mark(&mut self, player_id: u32, seconds: f32) {
        if seconds > 0.0 {
            self.entries.insert(player_id, seconds);
        }
    }

    pub fn remaining(&self, player_id: u32) -> Option<f32> {
        self.entries.get(&player_id).copied()
    }

    pub fn forget(&mut self, player_id: u32) {
        self.entries.remove(&player_id);
    }

    pub fn decay(&mut self, dt: f32) {
        self.entries.retain(|_, remaining| {
            *remaining -= dt;
            *remaining > 0.0
        });
    }

    /// Player ids ordered from most to least threatening. Ties break on the
    /// lower id so target choice does not depend on hash order.
    pub fn ranked(&self) -> Vec<u32> {
        let mut ranked: Vec<(u32, f32)> = self.entries.iter().map(|(id, t)| (*id, *t)).collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        ranked.into_iter().map(|(id, _)| id).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
