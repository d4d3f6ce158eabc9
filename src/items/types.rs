use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EquipmentSlot {
    Weapon,
    Armor,
    Helmet,
    Boots,
    Ring,
    Amulet,
}

impl EquipmentSlot {
    pub fn all() -> [EquipmentSlot; 6] {
        [
            EquipmentSlot::Weapon,
            EquipmentSlot::Armor,
            EquipmentSlot::Helmet,
            EquipmentSlot::Boots,
            EquipmentSlot::Ring,
            EquipmentSlot::Amulet,
        ]
    }
}

/// Cosmetic rarity tier rolled independently of the item itself.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub enum Rarity {
    #[default]
    Common = 0,
    Uncommon = 1,
    Rare = 2,
    Epic = 3,
    Legendary = 4,
}

impl Rarity {
    pub const ALL: [Rarity; 5] = [
        Rarity::Common,
        Rarity::Uncommon,
        Rarity::Rare,
        Rarity::Epic,
        Rarity::Legendary,
    ];

    /// Returns the display name for this rarity tier.
    pub fn name(&self) -> &'static str {
        match self {
            Rarity::Common => "Common",
            Rarity::Uncommon => "Uncommon",
            Rarity::Rare => "Rare",
            Rarity::Epic => "Epic",
            Rarity::Legendary => "Legendary",
        }
    }

    fn key(&self) -> &'static str {
        match self {
            Rarity::Common => "common",
            Rarity::Uncommon => "uncommon",
            Rarity::Rare => "rare",
            Rarity::Epic => "epic",
            Rarity::Legendary => "legendary",
        }
    }

    fn from_key(key: &str) -> Option<Rarity> {
        Rarity::ALL.into_iter().find(|r| r.key() == key)
    }
}

/// Flat stat bonuses granted by an equipped item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemStats {
    pub strength: f64,
    pub defense: f64,
    pub hp: f64,
    pub agility: f64,
    pub regen: f64,
    /// Weapon bonus fed into the damage formula.
    pub weapon: f64,
}

impl ItemStats {
    pub fn add(&mut self, other: &ItemStats) {
        self.strength += other.strength;
        self.defense += other.defense;
        self.hp += other.hp;
        self.agility += other.agility;
        self.regen += other.regen;
        self.weapon += other.weapon;
    }
}

/// Static item definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemDef {
    pub id: String,
    pub name: String,
    pub slot: EquipmentSlot,
    #[serde(default)]
    pub stats: ItemStats,
    /// Item produced when stacks of this one are auto-merged.
    #[serde(default)]
    pub next_tier: Option<String>,
}

/// Inventory stack identity: one stack per (item, rarity) pair.
///
/// Persisted as `"<item_id>#<rarity>"`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StackKey {
    pub item_id: String,
    pub rarity: Rarity,
}

impl StackKey {
    pub fn new(item_id: impl Into<String>, rarity: Rarity) -> Self {
        Self {
            item_id: item_id.into(),
            rarity,
        }
    }
}

impl fmt::Display for StackKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.item_id, self.rarity.key())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed stack key: {0:?}")]
pub struct StackKeyError(pub String);

impl FromStr for StackKey {
    type Err = StackKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (item, rarity) = s
            .rsplit_once('#')
            .ok_or_else(|| StackKeyError(s.to_string()))?;
        if item.is_empty() {
            return Err(StackKeyError(s.to_string()));
        }
        let rarity = Rarity::from_key(rarity).ok_or_else(|| StackKeyError(s.to_string()))?;
        Ok(StackKey::new(item, rarity))
    }
}

impl serde::Serialize for StackKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> serde::Deserialize<'de> for StackKey {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Persisted stack payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stack {
    pub count: u64,
    pub rarity: Rarity,
}
