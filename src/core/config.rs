//! Game configuration.
//!
//! `GameConfig` carries the numeric rules parameters that vary between
//! formats (life totals, hand sizes, poison threshold) plus a few engine
//! policies. Construct with `GameConfig::new` and the `with_*` builders,
//! then `validate()` before starting a game.
//!
//! ```
//! use rust_tcg::core::GameConfig;
//!
//! let config = GameConfig::new(2).with_starting_life(30).with_seed(99);
//! assert!(config.validate().is_ok());
//! assert_eq!(config.starting_life, 30);
//! ```

use serde::{Deserialize, Serialize};

use super::error::ConfigError;

/// Who receives priority after a spell or ability is put on the stack.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PriorityAfterAction {
    /// Priority returns to the active player.
    #[default]
    ActivePlayer,
    /// The player who cast or activated keeps priority.
    Acting,
}

/// Rules parameters for one game.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameConfig {
    /// Number of seats (2..=8).
    pub player_count: usize,

    /// Life total each player starts with.
    pub starting_life: i32,

    /// Cards drawn before the first turn.
    pub opening_hand_size: usize,

    /// Hand size enforced in the cleanup step.
    pub max_hand_size: usize,

    /// Poison counters at which a player loses.
    pub poison_threshold: u32,

    /// Land drops per turn.
    pub lands_per_turn: u32,

    /// The starting player skips the draw of turn 1.
    pub skip_first_draw: bool,

    /// Priority policy after casting or activating.
    pub priority_after_action: PriorityAfterAction,

    /// RNG seed for library shuffles.
    pub seed: u64,
}

impl GameConfig {
    /// Default two-player-style parameters for `player_count` seats.
    #[must_use]
    pub fn new(player_count: usize) -> Self {
        Self {
            player_count,
            starting_life: 20,
            opening_hand_size: 7,
            max_hand_size: 7,
            poison_threshold: 10,
            lands_per_turn: 1,
            skip_first_draw: true,
            priority_after_action: PriorityAfterAction::default(),
            seed: 0,
        }
    }

    /// Set the starting life total.
    #[must_use]
    pub fn with_starting_life(mut self, life: i32) -> Self {
        self.starting_life = life;
        self
    }

    /// Set the opening hand size.
    #[must_use]
    pub fn with_opening_hand_size(mut self, size: usize) -> Self {
        self.opening_hand_size = size;
        self
    }

    /// Set the cleanup hand size.
    #[must_use]
    pub fn with_max_hand_size(mut self, size: usize) -> Self {
        self.max_hand_size = size;
        self
    }

    /// Set the poison threshold.
    #[must_use]
    pub fn with_poison_threshold(mut self, threshold: u32) -> Self {
        self.poison_threshold = threshold;
        self
    }

    /// Set land drops per turn.
    #[must_use]
    pub fn with_lands_per_turn(mut self, lands: u32) -> Self {
        self.lands_per_turn = lands;
        self
    }

    /// Choose whether the starting player skips their first draw.
    #[must_use]
    pub fn with_skip_first_draw(mut self, skip: bool) -> Self {
        self.skip_first_draw = skip;
        self
    }

    /// Set the priority policy after casting or activating.
    #[must_use]
    pub fn with_priority_after_action(mut self, policy: PriorityAfterAction) -> Self {
        self.priority_after_action = policy;
        self
    }

    /// Set the RNG seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Check the configuration for out-of-range values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(2..=8).contains(&self.player_count) {
            return Err(ConfigError::PlayerCount(self.player_count));
        }
        if self.starting_life <= 0 {
            return Err(ConfigError::StartingLife(self.starting_life));
        }
        if self.poison_threshold == 0 {
            return Err(ConfigError::PoisonThreshold);
        }
        Ok(())
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self::new(2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GameConfig::default();
        assert_eq!(config.player_count, 2);
        assert_eq!(config.starting_life, 20);
        assert_eq!(config.opening_hand_size, 7);
        assert_eq!(config.poison_threshold, 10);
        assert!(config.skip_first_draw);
        assert_eq!(config.priority_after_action, PriorityAfterAction::ActivePlayer);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert_eq!(GameConfig::new(1).validate(), Err(ConfigError::PlayerCount(1)));
        assert_eq!(GameConfig::new(9).validate(), Err(ConfigError::PlayerCount(9)));
        assert_eq!(
            GameConfig::new(2).with_starting_life(0).validate(),
            Err(ConfigError::StartingLife(0))
        );
        assert_eq!(
            GameConfig::new(2).with_poison_threshold(0).validate(),
            Err(ConfigError::PoisonThreshold)
        );
    }

    #[test]
    fn test_config_serialization() {
        let config = GameConfig::new(4).with_seed(5).with_lands_per_turn(2);
        let json = serde_json::to_string(&config).unwrap();
        let back: GameConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, back);
    }
}
