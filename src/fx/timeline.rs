use log::debug;

use crate::clock::Millis;
use crate::gfx::Graphics;

use super::effect::ImageEffect;

/// Stable handle returned when an effect is added to the timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EffectId(u64);

/// Effects in registration order.
///
/// Expired effects stay on the timeline (and keep being range-checked every
/// frame) until removed, unless automatic pruning is switched on.
#[derive(Debug, Default)]
pub struct EffectTimeline {
    effects: Vec<(EffectId, ImageEffect)>,
    next_id: u64,
    auto_prune: bool,
}

impl EffectTimeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops expired effects at the end of every [`apply`](Self::apply).
    pub fn with_auto_prune(mut self, enabled: bool) -> Self {
        self.auto_prune = enabled;
        self
    }

    pub fn set_auto_prune(&mut self, enabled: bool) {
        self.auto_prune = enabled;
    }

    pub fn len(&self) -> usize {
        self.effects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    pub fn add(&mut self, effect: ImageEffect) -> EffectId {
        let id = EffectId(self.next_id);
        self.next_id += 1;
        self.effects.push((id, effect));
        id
    }

    pub fn get(&self, id: EffectId) -> Option<&ImageEffect> {
        self.effects
            .iter()
            .find(|(candidate, _)| *candidate == id)
            .map(|(_, effect)| effect)
    }

    pub fn remove(&mut self, id: EffectId) -> Option<ImageEffect> {
        let index = self.effects.iter().position(|(candidate, _)| *candidate == id)?;
        Some(self.effects.remove(index).1)
    }

    pub fn clear(&mut self) {
        self.effects.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (EffectId, &ImageEffect)> {
        self.effects.iter().map(|(id, effect)| (*id, effect))
    }

    /// Applies every effect at `time` in registration order; returns how many drew.
    pub fn apply(&mut self, time: Millis, gfx: &mut dyn Graphics) -> usize {
        let mut drawn = 0;
        for (_, effect) in &self.effects {
            if effect.apply(time, gfx) {
                drawn += 1;
            }
        }
        if self.auto_prune {
            self.prune_expired(time);
        }
        drawn
    }

    /// Removes effects whose window ended at or before `time`.
    pub fn prune_expired(&mut self, time: Millis) -> usize {
        let before = self.effects.len();
        self.effects.retain(|(_, effect)| !effect.is_expired(time));
        let pruned = before - self.effects.len();
        if pruned > 0 {
            debug!("pruned {pruned} expired effect(s) at {time} ms");
        }
        pruned
    }
}
