//! Mana costs and mana pools.
//!
//! Costs are parsed from compact text: digits for generic mana, `WUBRG`
//! for colored pips, `C` for colorless, `X` for a variable amount.
//!
//! ```
//! use rust_tcg::cards::{ManaCost, ManaPool, ManaType};
//!
//! let cost = ManaCost::parse("1R").unwrap();
//! let mut pool = ManaPool::default();
//! pool.add(ManaType::Red, 1);
//! pool.add(ManaType::Colorless, 1);
//! assert!(pool.pay(&cost, 0).is_ok());
//! assert_eq!(pool.total(), 0);
//! ```

use serde::{Deserialize, Serialize};

use super::types::{Color, ColorSet};

/// A type of mana in a pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ManaType {
    White,
    Blue,
    Black,
    Red,
    Green,
    Colorless,
}

impl ManaType {
    #[must_use]
    pub const fn of_color(color: Color) -> Self {
        match color {
            Color::White => Self::White,
            Color::Blue => Self::Blue,
            Color::Black => Self::Black,
            Color::Red => Self::Red,
            Color::Green => Self::Green,
        }
    }

    #[must_use]
    const fn slot(self) -> usize {
        match self {
            Self::White => 0,
            Self::Blue => 1,
            Self::Black => 2,
            Self::Red => 3,
            Self::Green => 4,
            Self::Colorless => 5,
        }
    }
}

/// A mana cost.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ManaCost {
    /// Generic mana payable with any type.
    pub generic: u32,
    /// Colored pips, indexed by `Color::index`.
    pub colored: [u32; 5],
    /// Colorless-specific pips ({C}).
    pub colorless: u32,
    /// Number of {X} symbols.
    pub x: u32,
}

impl ManaCost {
    /// A cost of only generic mana.
    #[must_use]
    pub fn generic(amount: u32) -> Self {
        Self {
            generic: amount,
            ..Self::default()
        }
    }

    /// Parse compact cost text like `"2RR"`, `"XG"` or `"{3}{U}"`.
    ///
    /// Braces are ignored. Returns `None` on unknown symbols.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let mut cost = Self::default();
        let mut number = String::new();
        for ch in text.chars().filter(|c| *c != '{' && *c != '}') {
            if ch.is_ascii_digit() {
                number.push(ch);
                continue;
            }
            if !number.is_empty() {
                cost.generic += number.parse::<u32>().ok()?;
                number.clear();
            }
            match ch.to_ascii_uppercase() {
                'X' => cost.x += 1,
                'C' => cost.colorless += 1,
                other => {
                    let color = Color::from_symbol(other)?;
                    cost.colored[color.index()] += 1;
                }
            }
        }
        if !number.is_empty() {
            cost.generic += number.parse::<u32>().ok()?;
        }
        Some(cost)
    }

    /// Mana value with X counted as zero.
    #[must_use]
    pub fn mana_value(&self) -> u32 {
        self.generic + self.colorless + self.colored.iter().sum::<u32>()
    }

    /// Colors of the pips.
    #[must_use]
    pub fn colors(&self) -> ColorSet {
        Color::ALL
            .into_iter()
            .filter(|c| self.colored[c.index()] > 0)
            .fold(ColorSet::COLORLESS, ColorSet::with)
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.mana_value() == 0 && self.x == 0
    }
}

impl std::fmt::Display for ManaCost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for _ in 0..self.x {
            f.write_str("{X}")?;
        }
        if self.generic > 0 {
            write!(f, "{{{}}}", self.generic)?;
        }
        for _ in 0..self.colorless {
            f.write_str("{C}")?;
        }
        for color in Color::ALL {
            for _ in 0..self.colored[color.index()] {
                write!(f, "{{{}}}", color.symbol())?;
            }
        }
        Ok(())
    }
}

/// Mana available to a player.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ManaPool {
    amounts: [u32; 6],
}

impl ManaPool {
    pub fn add(&mut self, mana: ManaType, amount: u32) {
        self.amounts[mana.slot()] += amount;
    }

    #[must_use]
    pub fn amount(&self, mana: ManaType) -> u32 {
        self.amounts[mana.slot()]
    }

    #[must_use]
    pub fn total(&self) -> u32 {
        self.amounts.iter().sum()
    }

    pub fn empty(&mut self) {
        self.amounts = [0; 6];
    }

    #[must_use]
    pub fn can_pay(&self, cost: &ManaCost, x: u32) -> bool {
        self.clone().pay(cost, x).is_ok()
    }

    /// Pay `cost` with `x` chosen for each {X}. Colored and colorless pips
    /// are paid first, generic from colorless mana before colored mana.
    /// The pool is untouched on failure.
    pub fn pay(&mut self, cost: &ManaCost, x: u32) -> Result<(), String> {
        let mut remaining = self.amounts;
        for color in Color::ALL {
            let slot = ManaType::of_color(color).slot();
            let need = cost.colored[color.index()];
            if remaining[slot] < need {
                return Err(format!("missing {{{}}}", color.symbol()));
            }
            remaining[slot] -= need;
        }
        if remaining[5] < cost.colorless {
            return Err("missing {C}".to_string());
        }
        remaining[5] -= cost.colorless;

        let mut generic = cost.generic + cost.x * x;
        for slot in [5, 0, 1, 2, 3, 4] {
            let used = remaining[slot].min(generic);
            remaining[slot] -= used;
            generic -= used;
        }
        if generic > 0 {
            return Err(format!("missing {generic} generic mana"));
        }
        self.amounts = remaining;
        Ok(())
    }
}
