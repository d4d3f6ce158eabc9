//! Inventory stacking and bounded auto-merge.

use super::types::{Stack, StackKey};
use crate::core::config::GameConfig;
use crate::state::player::{Cheat, PlayerState};
use crate::zones::content::ContentDb;
use tracing::{debug, error, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddItemOutcome {
    /// The item landed in a stack that now holds `count` (before merging).
    Added { count: u64 },
    /// No stack for this key and no free stack slot. Nothing changed.
    InventoryFull,
}

impl AddItemOutcome {
    pub fn is_added(&self) -> bool {
        matches!(self, AddItemOutcome::Added { .. })
    }
}

/// One merge pass: `consumed` units of `from` became `created` units of `to`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeStep {
    pub from: StackKey,
    pub to: StackKey,
    pub consumed: u64,
    pub created: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddItemReport {
    pub outcome: AddItemOutcome,
    pub merges: Vec<MergeStep>,
    /// Merging stopped because the depth guard was hit, not because the
    /// chain ran out.
    pub depth_limited: bool,
}

pub(crate) fn add_item(
    state: &mut PlayerState,
    key: StackKey,
    content: &ContentDb,
    config: &GameConfig,
) -> AddItemReport {
    if !state.inventory_stacks.contains_key(&key)
        && state.inventory_stacks.len() >= config.inventory_capacity
    {
        warn!(%key, capacity = config.inventory_capacity, "inventory full");
        return AddItemReport {
            outcome: AddItemOutcome::InventoryFull,
            merges: Vec::new(),
            depth_limited: false,
        };
    }

    let stack = state.inventory_stacks.entry(key.clone()).or_insert(Stack {
        count: 0,
        rarity: key.rarity,
    });
    stack.count += 1;
    let count = stack.count;

    let (merges, depth_limited) = if state.cheat_active(Cheat::AutoMerge) {
        merge_chain(state, key, content, config)
    } else {
        (Vec::new(), false)
    };

    AddItemReport {
        outcome: AddItemOutcome::Added { count },
        merges,
        depth_limited,
    }
}

/// Units of `key` that merging may consume. One unit of an equipped stack is
/// always kept so the equipment reference stays valid.
fn mergeable(state: &PlayerState, key: &StackKey) -> u64 {
    let reserved = u64::from(state.is_equipped(key));
    state.stack_count(key).saturating_sub(reserved)
}

fn next_tier(key: &StackKey, content: &ContentDb) -> Option<StackKey> {
    let next_id = content.item(&key.item_id)?.next_tier.as_ref()?;
    if content.item(next_id).is_none() {
        error!(item = %key.item_id, next = %next_id, "next-tier item does not exist");
        return None;
    }
    Some(StackKey::new(next_id.clone(), key.rarity))
}

/// Merges whole multiples of the threshold up the tier chain, one tier per
/// iteration, for at most `merge_max_depth` iterations.
fn merge_chain(
    state: &mut PlayerState,
    start: StackKey,
    content: &ContentDb,
    config: &GameConfig,
) -> (Vec<MergeStep>, bool) {
    let threshold = config.merge_threshold;
    let mut steps = Vec::new();
    let mut current = start;

    for _ in 0..config.merge_max_depth {
        let batches = mergeable(state, &current) / threshold;
        if batches == 0 {
            return (steps, false);
        }
        let Some(next) = next_tier(&current, content) else {
            return (steps, false);
        };

        let consumed = batches * threshold;
        let remaining = state.stack_count(&current) - consumed;
        let frees_slot = remaining == 0;
        let needs_slot = !state.inventory_stacks.contains_key(&next);
        let stacks_after = state.inventory_stacks.len() - usize::from(frees_slot) + usize::from(needs_slot);
        if stacks_after > config.inventory_capacity {
            warn!(from = %current, to = %next, "merge skipped, inventory full");
            return (steps, false);
        }

        if frees_slot {
            state.inventory_stacks.remove(&current);
        } else if let Some(stack) = state.inventory_stacks.get_mut(&current) {
            stack.count = remaining;
        }
        state
            .inventory_stacks
            .entry(next.clone())
            .or_insert(Stack {
                count: 0,
                rarity: next.rarity,
            })
            .count += batches;

        debug!(from = %current, to = %next, consumed, created = batches, "merged stack");
        steps.push(MergeStep {
            from: current,
            to: next.clone(),
            consumed,
            created: batches,
        });
        current = next;
    }

    let more = mergeable(state, &current) >= threshold && next_tier(&current, content).is_some();
    (steps, more)
}
