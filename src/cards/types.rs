//! Card characteristics vocabulary: types, colors, keywords.

use serde::{Deserialize, Serialize};

/// Card types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CardType {
    Artifact,
    Creature,
    Enchantment,
    Instant,
    Land,
    Planeswalker,
    Sorcery,
    Tribal,
}

impl CardType {
    /// Can an object of this type be on the battlefield?
    #[must_use]
    pub const fn is_permanent_type(self) -> bool {
        matches!(
            self,
            Self::Artifact | Self::Creature | Self::Enchantment | Self::Land | Self::Planeswalker
        )
    }
}

/// Supertypes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Supertype {
    Basic,
    Legendary,
    Snow,
    World,
}

/// A subtype (creature type, land type, "Aura", "Equipment", ...).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Subtype(pub String);

impl Subtype {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn aura() -> Self {
        Self::new("Aura")
    }

    #[must_use]
    pub fn equipment() -> Self {
        Self::new("Equipment")
    }
}

impl From<&str> for Subtype {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl std::fmt::Display for Subtype {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The five colors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Color {
    White,
    Blue,
    Black,
    Red,
    Green,
}

impl Color {
    /// All colors in WUBRG order.
    pub const ALL: [Color; 5] = [Color::White, Color::Blue, Color::Black, Color::Red, Color::Green];

    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::White => 0,
            Self::Blue => 1,
            Self::Black => 2,
            Self::Red => 3,
            Self::Green => 4,
        }
    }

    /// Mana symbol letter.
    #[must_use]
    pub const fn symbol(self) -> char {
        match self {
            Self::White => 'W',
            Self::Blue => 'U',
            Self::Black => 'B',
            Self::Red => 'R',
            Self::Green => 'G',
        }
    }

    #[must_use]
    pub fn from_symbol(symbol: char) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.symbol() == symbol.to_ascii_uppercase())
    }
}

/// A set of colors as a bit set. Empty means colorless.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ColorSet(u8);

impl ColorSet {
    pub const COLORLESS: ColorSet = ColorSet(0);
    pub const ALL: ColorSet = ColorSet(0b1_1111);

    #[must_use]
    pub const fn single(color: Color) -> Self {
        Self(1 << color.index())
    }

    #[must_use]
    pub fn of(colors: &[Color]) -> Self {
        colors.iter().fold(Self::COLORLESS, |set, &c| set.with(c))
    }

    #[must_use]
    pub const fn with(self, color: Color) -> Self {
        Self(self.0 | (1 << color.index()))
    }

    #[must_use]
    pub const fn union(self, other: ColorSet) -> Self {
        Self(self.0 | other.0)
    }

    #[must_use]
    pub const fn contains(self, color: Color) -> bool {
        self.0 & (1 << color.index()) != 0
    }

    #[must_use]
    pub const fn intersects(self, other: ColorSet) -> bool {
        self.0 & other.0 != 0
    }

    #[must_use]
    pub const fn is_colorless(self) -> bool {
        self.0 == 0
    }

    #[must_use]
    pub const fn count(self) -> u32 {
        self.0.count_ones()
    }

    pub fn iter(self) -> impl Iterator<Item = Color> {
        Color::ALL.into_iter().filter(move |&c| self.contains(c))
    }
}

/// Keyword abilities and keyword-like restrictions the engine understands.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Keyword {
    // === Evasion ===
    Flying,
    Reach,
    Shadow,
    Fear,
    Intimidate,
    Menace,
    Unblockable,
    /// Can't be blocked by creatures with power N or less.
    CantBeBlockedByPowerOrLess(i32),

    // === Combat damage ===
    FirstStrike,
    DoubleStrike,
    Trample,
    Deathtouch,
    Lifelink,

    // === Restrictions and requirements ===
    Defender,
    CantAttack,
    CantBlock,
    /// All creatures able to block this creature do so.
    Lure,
    Vigilance,
    Haste,

    // === Protection ===
    Indestructible,
    Hexproof,
    Shroud,
    ProtectionFrom(Color),

    // === Casting ===
    Flash,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_set_operations() {
        let set = ColorSet::single(Color::Red).with(Color::Green);
        assert!(set.contains(Color::Red));
        assert!(set.contains(Color::Green));
        assert!(!set.contains(Color::Blue));
        assert_eq!(set.count(), 2);
        assert!(set.intersects(ColorSet::single(Color::Green)));
        assert!(!set.intersects(ColorSet::single(Color::White)));
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![Color::Red, Color::Green]);
        assert!(ColorSet::COLORLESS.is_colorless());
        assert_eq!(ColorSet::ALL.count(), 5);
    }

    #[test]
    fn test_color_symbols() {
        assert_eq!(Color::from_symbol('u'), Some(Color::Blue));
        assert_eq!(Color::from_symbol('X'), None);
        assert_eq!(Color::Black.symbol(), 'B');
    }

    #[test]
    fn test_permanent_types() {
        assert!(CardType::Creature.is_permanent_type());
        assert!(!CardType::Instant.is_permanent_type());
        assert!(!CardType::Sorcery.is_permanent_type());
    }
}
