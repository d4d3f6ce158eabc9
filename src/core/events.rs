//! Typed game events and the observer channel that carries them.
//!
//! Observers subscribe to an [`EventKind`] and are called synchronously when a
//! matching [`GameEvent`] is emitted. Every event is also buffered so a host
//! that prefers polling can [`EventBus::drain`] once per frame.

use crate::core::bignum::BigNum;
use crate::items::types::Rarity;
use std::collections::{BTreeMap, VecDeque};

/// Top-level player state fields reported by [`GameEvent::StateChanged`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StateField {
    Gold,
    Fragments,
    PlayerStats,
    CurrentHp,
    Equipped,
    Inventory,
    Upgrades,
    Zone,
    AreaProgress,
    Prestige,
    Cheats,
    Flags,
    Stance,
    DamageTier,
    Territories,
    Timestamps,
    /// The whole state was replaced (load, reset).
    All,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    StateChanged {
        fields: Vec<StateField>,
    },
    EncounterSpawned {
        encounter_id: String,
        zone: u32,
        members: usize,
        is_boss: bool,
    },
    PlayerAttack {
        member: usize,
        damage: f64,
        crit: bool,
        click: bool,
    },
    EnemyAttack {
        member: usize,
        damage: f64,
        dodged: bool,
    },
    DamageOverTime {
        damage: f64,
    },
    ThornsDamage {
        member: usize,
        damage: f64,
    },
    EnemyEnraged {
        member: usize,
    },
    EnemyKilled {
        enemy_id: String,
        is_boss: bool,
        gold: BigNum,
        xp: BigNum,
        fragments: BigNum,
    },
    LootDropped {
        item_id: String,
        rarity: Rarity,
    },
    InventoryFull {
        item_id: String,
        rarity: Rarity,
    },
    ItemsMerged {
        from_item: String,
        to_item: String,
        rarity: Rarity,
        created: u64,
    },
    LevelUp {
        level: u32,
    },
    BossDefeated {
        area_id: String,
        zone: u32,
    },
    ZoneChanged {
        zone: u32,
    },
    EncounterResolved,
    PlayerDefeated {
        by_boss: bool,
    },
    PlayerRespawned,
    Prestiged {
        count: u32,
    },
}

/// Discriminant of [`GameEvent`], used as the subscription key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EventKind {
    StateChanged,
    EncounterSpawned,
    PlayerAttack,
    EnemyAttack,
    DamageOverTime,
    ThornsDamage,
    EnemyEnraged,
    EnemyKilled,
    LootDropped,
    InventoryFull,
    ItemsMerged,
    LevelUp,
    BossDefeated,
    ZoneChanged,
    EncounterResolved,
    PlayerDefeated,
    PlayerRespawned,
    Prestiged,
}

impl GameEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            GameEvent::StateChanged { .. } => EventKind::StateChanged,
            GameEvent::EncounterSpawned { .. } => EventKind::EncounterSpawned,
            GameEvent::PlayerAttack { .. } => EventKind::PlayerAttack,
            GameEvent::EnemyAttack { .. } => EventKind::EnemyAttack,
            GameEvent::DamageOverTime { .. } => EventKind::DamageOverTime,
            GameEvent::ThornsDamage { .. } => EventKind::ThornsDamage,
            GameEvent::EnemyEnraged { .. } => EventKind::EnemyEnraged,
            GameEvent::EnemyKilled { .. } => EventKind::EnemyKilled,
            GameEvent::LootDropped { .. } => EventKind::LootDropped,
            GameEvent::InventoryFull { .. } => EventKind::InventoryFull,
            GameEvent::ItemsMerged { .. } => EventKind::ItemsMerged,
            GameEvent::LevelUp { .. } => EventKind::LevelUp,
            GameEvent::BossDefeated { .. } => EventKind::BossDefeated,
            GameEvent::ZoneChanged { .. } => EventKind::ZoneChanged,
            GameEvent::EncounterResolved => EventKind::EncounterResolved,
            GameEvent::PlayerDefeated { .. } => EventKind::PlayerDefeated,
            GameEvent::PlayerRespawned => EventKind::PlayerRespawned,
            GameEvent::Prestiged { .. } => EventKind::Prestiged,
        }
    }
}

/// Handle returned by [`EventBus::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

type Observer = Box<dyn FnMut(&GameEvent)>;

#[derive(Default)]
pub struct EventBus {
    observers: BTreeMap<EventKind, Vec<(SubscriptionId, Observer)>>,
    buffer: VecDeque<GameEvent>,
    next_id: u64,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("observers", &self.observers.values().map(Vec::len).sum::<usize>())
            .field("buffered", &self.buffer.len())
            .finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&mut self, kind: EventKind, observer: F) -> SubscriptionId
    where
        F: FnMut(&GameEvent) + 'static,
    {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        self.observers
            .entry(kind)
            .or_default()
            .push((id, Box::new(observer)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let mut removed = false;
        for list in self.observers.values_mut() {
            let before = list.len();
            list.retain(|(sub, _)| *sub != id);
            removed |= list.len() != before;
        }
        removed
    }

    /// Notifies observers of the event's kind, then buffers it.
    pub fn emit(&mut self, event: GameEvent) {
        if let Some(list) = self.observers.get_mut(&event.kind()) {
            for (_, observer) in list.iter_mut() {
                observer(&event);
            }
        }
        self.buffer.push_back(event);
    }

    /// Takes every buffered event in emission order.
    pub fn drain(&mut self) -> Vec<GameEvent> {
        self.buffer.drain(..).collect()
    }

    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_observer_only_sees_subscribed_kind() {
        let mut bus = EventBus::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        bus.subscribe(EventKind::LevelUp, move |e| sink.borrow_mut().push(e.clone()));

        bus.emit(GameEvent::PlayerRespawned);
        bus.emit(GameEvent::LevelUp { level: 2 });

        assert_eq!(*seen.borrow(), vec![GameEvent::LevelUp { level: 2 }]);
    }

    #[test]
    fn test_drain_returns_all_in_order() {
        let mut bus = EventBus::new();
        bus.emit(GameEvent::EncounterResolved);
        bus.emit(GameEvent::ZoneChanged { zone: 2 });

        let events = bus.drain();
        assert_eq!(
            events,
            vec![GameEvent::EncounterResolved, GameEvent::ZoneChanged { zone: 2 }]
        );
        assert_eq!(bus.pending(), 0);
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let mut bus = EventBus::new();
        let count = Rc::new(RefCell::new(0));
        let c = Rc::clone(&count);
        let id = bus.subscribe(EventKind::PlayerRespawned, move |_| *c.borrow_mut() += 1);

        bus.emit(GameEvent::PlayerRespawned);
        assert!(bus.unsubscribe(id));
        bus.emit(GameEvent::PlayerRespawned);

        assert_eq!(*count.borrow(), 1);
        assert!(!bus.unsubscribe(id));
    }

    #[test]
    fn test_kind_matches_variant() {
        let event = GameEvent::StateChanged {
            fields: vec![StateField::Gold],
        };
        assert_eq!(event.kind(), EventKind::StateChanged);
    }
}
