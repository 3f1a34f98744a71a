//! The game state: one value owning every entity, component and zone.
//!
//! ## GameState
//!
//! - Turn structure, players and configuration
//! - Zone manager (object locations) and card objects
//! - Component store (tapped, damage, counters, attachments, ...)
//! - Continuous effects, replacement effects and delayed triggers
//! - The stack, combat, the event log and the pending-action queue
//! - Any suspended resolution and the pending decision
//! - RNG
//!
//! Every collection is an `im` persistent structure, so cloning a state is
//! cheap. The engine snapshots the state before each command and restores
//! the snapshot when the command fails.

use std::sync::Arc;

use im::{OrdMap, Vector};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::action::ActionRecord;
use super::component::{ComponentStore, CounterType};
use super::config::GameConfig;
use super::entity::{EntityId, Timestamp};
use super::error::RulesResult;
use super::player::{PlayerId, PlayerMap, PlayerState};
use super::rng::GameRng;
use crate::cards::{CardDefinition, CardObject};
use crate::combat::CombatState;
use crate::decision::{Continuation, Decision, DecisionId, DecisionKind, PendingDecision};
use crate::effects::{Proposal, ReplacementArena, Resolution};
use crate::layers::EffectArena;
use crate::stack::{PriorityStack, TurnState};
use crate::triggers::{DelayedTriggerRegistry, GameEvent, PendingTrigger};
use crate::zones::{ZoneId, ZoneKind, ZoneManager, ZonePosition};

/// How a finished game ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameResult {
    Winner(PlayerId),
    /// Every remaining player lost at the same time.
    Draw,
}

/// Complete rules state of one game.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameState {
    pub config: GameConfig,
    pub turn: TurnState,
    pub players: PlayerMap<PlayerState>,

    /// Object locations.
    pub zones: ZoneManager,
    /// Cards and tokens by entity.
    pub objects: OrdMap<EntityId, CardObject>,
    pub components: ComponentStore,

    /// Floating continuous effects.
    pub effects: EffectArena,
    /// Floating replacement effects.
    pub replacements: ReplacementArena,
    pub delayed_triggers: DelayedTriggerRegistry,

    pub stack: PriorityStack,
    /// Present from beginning of combat to end of combat.
    pub combat: Option<CombatState>,

    /// Every event since the game started.
    pub events: Vector<GameEvent>,
    /// Events before this index were already scanned for triggers.
    pub trigger_cursor: usize,
    /// Triggered abilities waiting to be put on the stack.
    pub pending_triggers: Vector<PendingTrigger>,
    /// Proposed events waiting to be performed.
    pub actions: Vector<Proposal>,
    /// A spell or ability part-way through resolving.
    pub resolving: Option<Resolution>,
    pub pending_decision: Option<PendingDecision>,

    pub result: Option<GameResult>,
    /// Accepted commands.
    pub history: Vector<ActionRecord>,

    pub rng: GameRng,

    next_entity: u32,
    next_timestamp: u64,
    next_decision: u64,
}

impl GameState {
    /// Empty state at turn 0; `Game::start` begins turn 1.
    #[must_use]
    pub fn new(config: GameConfig) -> Self {
        let player_count = config.player_count;
        let starting_life = config.starting_life;
        Self {
            turn: TurnState::new(PlayerId::new(0)),
            players: PlayerMap::new(player_count, |_| PlayerState::new(starting_life)),
            zones: ZoneManager::new(),
            objects: OrdMap::new(),
            components: ComponentStore::new(),
            effects: EffectArena::new(),
            replacements: ReplacementArena::new(),
            delayed_triggers: DelayedTriggerRegistry::new(),
            stack: PriorityStack::new(),
            combat: None,
            events: Vector::new(),
            trigger_cursor: 0,
            pending_triggers: Vector::new(),
            actions: Vector::new(),
            resolving: None,
            pending_decision: None,
            result: None,
            history: Vector::new(),
            rng: GameRng::new(config.seed),
            next_entity: EntityId::first_non_player(player_count),
            next_timestamp: 0,
            next_decision: 0,
            config,
        }
    }

    #[must_use]
    pub fn player_count(&self) -> usize {
        self.players.player_count()
    }

    // === Allocation ===

    /// Allocate a fresh entity id.
    pub fn allocate_entity(&mut self) -> EntityId {
        let id = EntityId(self.next_entity);
        self.next_entity += 1;
        id
    }

    /// Next timestamp. Strictly increasing.
    pub fn next_timestamp(&mut self) -> Timestamp {
        self.next_timestamp += 1;
        Timestamp(self.next_timestamp)
    }

    /// Create a card (or token) object directly in `zone`.
    ///
    /// Used for setup; objects entering the battlefield during play go
    /// through zone-change proposals instead.
    pub fn create_object(
        &mut self,
        owner: PlayerId,
        definition: Arc<CardDefinition>,
        zone: ZoneId,
        is_token: bool,
    ) -> RulesResult<EntityId> {
        let entity = self.allocate_entity();
        let zone = if zone.kind.is_player_scoped() {
            ZoneId::of(zone.kind, owner)
        } else {
            zone
        };
        let loyalty = definition.loyalty;
        let object = if is_token {
            CardObject::token(entity, definition, owner)
        } else {
            CardObject::card(entity, definition, owner)
        };
        self.zones.add_to_zone(entity, zone, ZonePosition::Top)?;
        self.objects.insert(entity, object);
        let timestamp = self.next_timestamp();
        self.components.set_zone_timestamp(entity, timestamp);
        if zone.kind == ZoneKind::Battlefield {
            self.components.set_controller(entity, owner);
            self.components.set_controlled_since(entity, self.turn.turn_number);
            if let Some(loyalty) = loyalty {
                self.components.add_counters(entity, CounterType::Loyalty, loyalty);
            }
        }
        Ok(entity)
    }

    #[must_use]
    pub fn object(&self, entity: EntityId) -> Option<&CardObject> {
        self.objects.get(&entity)
    }

    /// Current controller: the controller component on the battlefield,
    /// the spell's controller on the stack, otherwise the owner.
    #[must_use]
    pub fn controller_of(&self, entity: EntityId) -> Option<PlayerId> {
        self.components
            .controller(entity)
            .or_else(|| self.stack.spell_controller(entity))
            .or_else(|| self.objects.get(&entity).map(|o| o.owner))
    }

    // === Decisions ===

    /// Suspend processing until `player` answers.
    pub fn request_decision(&mut self, player: PlayerId, kind: DecisionKind, continuation: Continuation) -> DecisionId {
        self.next_decision += 1;
        let id = DecisionId(self.next_decision);
        debug!(target: "engine.decision", id = %id, player = %player, kind = kind.name(), "decision requested");
        self.pending_decision = Some(PendingDecision {
            decision: Decision { id, player, kind },
            continuation,
        });
        id
    }

    // === Players ===

    /// Players still in the game, in seat order.
    #[must_use]
    pub fn active_players(&self) -> Vec<PlayerId> {
        self.players
            .iter()
            .filter(|(_, p)| p.is_active())
            .map(|(id, _)| id)
            .collect()
    }

    /// Players still in the game in APNAP order.
    #[must_use]
    pub fn apnap_order(&self) -> Vec<PlayerId> {
        PlayerId::apnap(self.turn.active_player, self.player_count())
            .into_iter()
            .filter(|p| self.players[*p].is_active())
            .collect()
    }

    /// Players still in the game in turn order starting after `player`.
    #[must_use]
    pub fn seats_from(&self, player: PlayerId) -> Vec<PlayerId> {
        PlayerId::apnap(player, self.player_count())
            .into_iter()
            .filter(|p| self.players[*p].is_active())
            .collect()
    }

    #[must_use]
    pub fn is_over(&self) -> bool {
        self.result.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bear() -> Arc<CardDefinition> {
        Arc::new(CardDefinition::creature("Bear", "1G", 2, 2))
    }

    #[test]
    fn test_new_state() {
        let state = GameState::new(GameConfig::new(4));
        assert_eq!(state.player_count(), 4);
        assert_eq!(state.players[PlayerId::new(3)].life, 20);
        assert_eq!(state.turn.turn_number, 0);
        assert!(!state.is_over());
    }

    #[test]
    fn test_entities_start_after_players() {
        let mut state = GameState::new(GameConfig::new(4));
        assert_eq!(state.allocate_entity(), EntityId(4));
        assert_eq!(state.allocate_entity(), EntityId(5));
    }

    #[test]
    fn test_timestamps_increase() {
        let mut state = GameState::new(GameConfig::new(2));
        let a = state.next_timestamp();
        let b = state.next_timestamp();
        assert!(b > a);
    }

    #[test]
    fn test_create_object_on_battlefield() {
        let mut state = GameState::new(GameConfig::new(2));
        let entity = state
            .create_object(PlayerId::new(1), bear(), ZoneId::battlefield(), false)
            .unwrap();
        assert_eq!(state.zones.get_zone(entity), Some(ZoneId::battlefield()));
        assert_eq!(state.components.controller(entity), Some(PlayerId::new(1)));
        assert_eq!(state.controller_of(entity), Some(PlayerId::new(1)));
        assert!(state.components.zone_timestamp(entity).is_some());
    }

    #[test]
    fn test_create_object_scopes_zone_to_owner() {
        let mut state = GameState::new(GameConfig::new(2));
        let entity = state
            .create_object(PlayerId::new(1), bear(), ZoneId::hand(PlayerId::new(0)), false)
            .unwrap();
        assert_eq!(state.zones.get_zone(entity), Some(ZoneId::hand(PlayerId::new(1))));
        assert_eq!(state.components.controller(entity), None);
    }

    #[test]
    fn test_request_decision_ids_increase() {
        let mut state = GameState::new(GameConfig::new(2));
        let first = state.request_decision(
            PlayerId::new(0),
            DecisionKind::ChooseColor,
            Continuation::Resolution,
        );
        let second = state.request_decision(
            PlayerId::new(1),
            DecisionKind::ChooseColor,
            Continuation::Resolution,
        );
        assert!(second > first);
        assert_eq!(state.pending_decision.as_ref().map(|p| p.decision.player), Some(PlayerId::new(1)));
    }

    #[test]
    fn test_apnap_skips_players_who_lost() {
        let mut state = GameState::new(GameConfig::new(3));
        state.turn.active_player = PlayerId::new(1);
        state.players[PlayerId::new(2)].has_lost = true;
        assert_eq!(state.apnap_order(), vec![PlayerId::new(1), PlayerId::new(0)]);
        assert_eq!(state.active_players(), vec![PlayerId::new(0), PlayerId::new(1)]);
    }
}
