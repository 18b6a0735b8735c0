//! AI decision core.
//!
//! This module provides:
//! - Agent modes (idle, patrolling, moving, engaging, fleeing)
//! - Agent tuning (ranges, speeds, patrol timings, flinch, flee threshold)
//! - The per-tick state machine turning perception into a movement/attack decision
//!
//! The agent holds its target as an [`EntityId`] and re-resolves it every tick;
//! a handle that no longer resolves is "no target", never a fault.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use skirmish_common::{EntityId, Tag, TagSet};
use tracing::debug;

use crate::dice::Dice;
use crate::perception::{self, Candidate, PerceptionQuery, SpatialQuery};

// ============================================================================
// Modes and Config
// ============================================================================

/// Discrete AI state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum AgentMode {
    /// No target; standing still.
    #[default]
    Idle,
    /// No target; wandering on a random heading.
    Patrolling,
    /// Closing in on the target.
    Moving,
    /// In range; attacking.
    Engaging,
    /// Running away from the target.
    Fleeing,
}

/// Agent tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Tags the agent hunts.
    pub target_tags: Vec<Tag>,
    /// Range at which an idle agent notices a target.
    pub detect_range: f32,
    /// Max height difference for detection.
    pub vertical_tolerance: f32,
    /// Distance at which the agent stops and attacks.
    pub approach_distance: f32,
    /// Distance at which the agent gives up.
    pub lost_sight_distance: f32,
    /// Chase speed (units/second).
    pub move_speed: f32,
    /// Patrol speed (units/second).
    pub patrol_speed: f32,
    /// Time spent idle between patrol legs.
    pub idle_duration: f32,
    /// Length of one patrol leg.
    pub patrol_duration: f32,
    /// Length of the flinch displacement window.
    pub flinch_duration: f32,
    /// Flinch displacement speed.
    pub flinch_speed: f32,
    /// Flinch lunges forward instead of backward (dash archetypes).
    pub flinch_forward: bool,
    /// Flee when HP falls below this percentage.
    pub flee_below_hp_pct: Option<i32>,
    /// Immobile agents (turrets) never move or patrol.
    pub mobile: bool,
    /// Restore HP to max when giving up a chase.
    pub restore_hp_on_lost_sight: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            target_tags: vec![Tag::Player, Tag::Ally],
            detect_range: 15.0,
            vertical_tolerance: 5.0,
            approach_distance: 2.0,
            lost_sight_distance: 30.0,
            move_speed: 3.5,
            patrol_speed: 1.5,
            idle_duration: 2.0,
            patrol_duration: 3.0,
            flinch_duration: 0.25,
            flinch_speed: 4.0,
            flinch_forward: false,
            flee_below_hp_pct: None,
            mobile: true,
            restore_hp_on_lost_sight: true,
        }
    }
}

impl AgentConfig {
    /// Turret tuning: immobile, attacks anything within `range`.
    #[must_use]
    pub fn turret(range: f32) -> Self {
        Self {
            target_tags: vec![Tag::Monster],
            detect_range: range,
            approach_distance: range,
            mobile: false,
            ..Self::default()
        }
    }

    /// Set target tags.
    #[must_use]
    pub fn with_target_tags(mut self, tags: Vec<Tag>) -> Self {
        self.target_tags = tags;
        self
    }

    /// Set detect, approach and lost-sight distances.
    #[must_use]
    pub fn with_ranges(mut self, detect: f32, approach: f32, lost_sight: f32) -> Self {
        self.detect_range = detect;
        self.approach_distance = approach;
        self.lost_sight_distance = lost_sight;
        self
    }

    /// Set flee threshold.
    #[must_use]
    pub fn with_flee_below(mut self, pct: i32) -> Self {
        self.flee_below_hp_pct = Some(pct);
        self
    }

    /// Target tags as a set.
    #[must_use]
    pub fn target_set(&self) -> TagSet {
        TagSet::of(&self.target_tags)
    }

    fn wants_to_flee(&self, hp_ratio: f32) -> bool {
        self.flee_below_hp_pct
            .is_some_and(|pct| hp_ratio * 100.0 < pct as f32)
    }
}

// ============================================================================
// State
// ============================================================================

/// Active flinch displacement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Flinch {
    /// Time left.
    pub remaining: f32,
    /// Displacement direction (unit, horizontal).
    pub direction: Vec3,
}

/// Per-tick facts about the agent's own entity.
#[derive(Debug, Clone, Copy)]
pub struct AgentSelf {
    /// Own handle.
    pub id: EntityId,
    /// Own position.
    pub position: Vec3,
    /// HP as a fraction of max.
    pub hp_ratio: f32,
}

/// What the agent wants to do this tick.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AgentDecision {
    /// Desired velocity.
    pub velocity: Vec3,
    /// Point to face.
    pub face: Option<Vec3>,
    /// Trigger the attack sequencer.
    pub attack: bool,
    /// Restore HP to max (gave up the chase).
    pub restore_hp: bool,
}

/// AI state of one entity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentState {
    /// Current mode.
    pub mode: AgentMode,
    /// Current target handle (re-resolved every tick).
    pub target: Option<EntityId>,
    /// Time spent in the current mode (not advanced while frozen).
    pub time_in_state: f32,
    /// External freeze (stun, immobilize, global pause).
    pub frozen: bool,
    /// Last entity that damaged this agent.
    pub last_attacker: Option<EntityId>,
    /// Active flinch window.
    pub flinch: Option<Flinch>,
    /// Heading of the current patrol leg.
    pub patrol_heading: Vec3,
}

impl AgentState {
    /// Create an idle agent.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn enter(&mut self, mode: AgentMode) {
        if self.mode != mode {
            debug!("agent {:?} -> {:?}", self.mode, mode);
            self.mode = mode;
        }
        self.time_in_state = 0.0;
    }

    /// Record damage taken. A damaged agent re-engages even outside detect range.
    pub fn notify_damaged(&mut self, attacker: Option<EntityId>) {
        if attacker.is_some() {
            self.last_attacker = attacker;
        }
    }

    /// Start a flinch window. `knockback` points away from the attacker.
    pub fn notify_flinch(&mut self, config: &AgentConfig, knockback: Vec3) {
        let flat = Vec3::new(knockback.x, 0.0, knockback.z).normalize_or_zero();
        let direction = if !config.mobile {
            Vec3::ZERO
        } else if config.flinch_forward {
            -flat
        } else {
            flat
        };
        self.flinch = Some(Flinch {
            remaining: config.flinch_duration,
            direction,
        });
    }

    /// Advance the state machine by one tick.
    pub fn tick<S: SpatialQuery + ?Sized>(
        &mut self,
        config: &AgentConfig,
        me: &AgentSelf,
        space: &S,
        dt: f32,
        dice: &mut dyn Dice,
    ) -> AgentDecision {
        if self.frozen {
            return AgentDecision::default();
        }

        if let Some(flinch) = &mut self.flinch {
            flinch.remaining -= dt;
            let velocity = flinch.direction * config.flinch_speed;
            if flinch.remaining <= 0.0 {
                self.flinch = None;
                if config.mobile {
                    self.enter(AgentMode::Moving);
                }
            }
            return AgentDecision {
                velocity,
                ..AgentDecision::default()
            };
        }

        self.time_in_state += dt;

        // Existence, liveness and tags only; range is judged per mode.
        let tracking =
            PerceptionQuery::new(me.position, config.target_set(), f32::INFINITY).excluding(me.id);
        let target = self
            .target
            .and_then(|id| perception::revalidate(space, &tracking, id));
        if target.is_none() {
            self.target = None;
        }

        match self.mode {
            AgentMode::Idle | AgentMode::Patrolling => self.idle_tick(config, me, space, dice),
            AgentMode::Moving => self.chase_tick(config, me, target),
            AgentMode::Engaging => self.engage_tick(config, me, target),
            AgentMode::Fleeing => self.flee_tick(config, me, target),
        }
    }

    fn acquire<S: SpatialQuery + ?Sized>(
        &self,
        config: &AgentConfig,
        me: &AgentSelf,
        space: &S,
    ) -> Option<Candidate> {
        let tags = config.target_set();
        let range = if config.mobile {
            config.detect_range
        } else {
            config.approach_distance
        };
        let detect = PerceptionQuery::new(me.position, tags, range)
            .excluding(me.id)
            .with_vertical_tolerance(config.vertical_tolerance);
        if let Some(found) = perception::find_nearest_valid(space, &detect)
            .and_then(|id| perception::revalidate(space, &detect, id))
        {
            return Some(found);
        }

        // Provoked: search out to lost-sight range, preferring the attacker.
        if config.mobile && me.hp_ratio < 1.0 {
            let wide = PerceptionQuery::new(me.position, tags, config.lost_sight_distance)
                .excluding(me.id)
                .with_vertical_tolerance(config.vertical_tolerance);
            if let Some(attacker) = self
                .last_attacker
                .and_then(|id| perception::revalidate(space, &wide, id))
            {
                return Some(attacker);
            }
            return perception::find_nearest_valid(space, &wide)
                .and_then(|id| perception::revalidate(space, &wide, id));
        }
        None
    }

    fn idle_tick<S: SpatialQuery + ?Sized>(
        &mut self,
        config: &AgentConfig,
        me: &AgentSelf,
        space: &S,
        dice: &mut dyn Dice,
    ) -> AgentDecision {
        if let Some(found) = self.acquire(config, me, space) {
            self.target = Some(found.id);
            let next = if config.mobile {
                AgentMode::Moving
            } else {
                AgentMode::Engaging
            };
            self.enter(next);
            return AgentDecision {
                face: Some(found.position),
                ..AgentDecision::default()
            };
        }

        if !config.mobile {
            return AgentDecision::default();
        }

        match self.mode {
            AgentMode::Idle if self.time_in_state >= config.idle_duration => {
                let angle = dice.unit() * std::f32::consts::TAU;
                self.patrol_heading = Vec3::new(angle.cos(), 0.0, angle.sin());
                self.enter(AgentMode::Patrolling);
            },
            AgentMode::Patrolling if self.time_in_state >= config.patrol_duration => {
                self.enter(AgentMode::Idle);
            },
            _ => {},
        }

        if self.mode == AgentMode::Patrolling {
            AgentDecision {
                velocity: self.patrol_heading * config.patrol_speed,
                face: Some(me.position + self.patrol_heading),
                ..AgentDecision::default()
            }
        } else {
            AgentDecision::default()
        }
    }

    fn lose_target(&mut self, restore_hp: bool) -> AgentDecision {
        self.target = None;
        self.enter(AgentMode::Idle);
        AgentDecision {
            restore_hp,
            ..AgentDecision::default()
        }
    }

    fn chase_tick(
        &mut self,
        config: &AgentConfig,
        me: &AgentSelf,
        target: Option<Candidate>,
    ) -> AgentDecision {
        let Some(target) = target else {
            return self.lose_target(false);
        };
        let distance = horizontal_distance(me.position, target.position);

        if distance > config.lost_sight_distance {
            debug!("agent gave up on {}", target.id);
            self.last_attacker = None;
            return self.lose_target(config.restore_hp_on_lost_sight);
        }
        if config.wants_to_flee(me.hp_ratio) {
            self.enter(AgentMode::Fleeing);
            return self.flee_tick(config, me, Some(target));
        }
        if distance <= config.approach_distance {
            self.enter(AgentMode::Engaging);
            return AgentDecision {
                face: Some(target.position),
                attack: true,
                ..AgentDecision::default()
            };
        }

        AgentDecision {
            velocity: toward(me.position, target.position) * config.move_speed,
            face: Some(target.position),
            ..AgentDecision::default()
        }
    }

    fn engage_tick(
        &mut self,
        config: &AgentConfig,
        me: &AgentSelf,
        target: Option<Candidate>,
    ) -> AgentDecision {
        let Some(target) = target else {
            return self.lose_target(false);
        };
        let distance = horizontal_distance(me.position, target.position);

        if distance > config.approach_distance {
            if config.mobile {
                self.enter(AgentMode::Moving);
                return AgentDecision {
                    velocity: toward(me.position, target.position) * config.move_speed,
                    face: Some(target.position),
                    ..AgentDecision::default()
                };
            }
            return self.lose_target(false);
        }
        if config.mobile && config.wants_to_flee(me.hp_ratio) {
            self.enter(AgentMode::Fleeing);
            return self.flee_tick(config, me, Some(target));
        }

        AgentDecision {
            face: Some(target.position),
            attack: true,
            ..AgentDecision::default()
        }
    }

    fn flee_tick(
        &mut self,
        config: &AgentConfig,
        me: &AgentSelf,
        target: Option<Candidate>,
    ) -> AgentDecision {
        let Some(target) = target else {
            return self.lose_target(false);
        };
        if horizontal_distance(me.position, target.position) > config.lost_sight_distance {
            return self.lose_target(false);
        }
        if !config.wants_to_flee(me.hp_ratio) {
            self.enter(AgentMode::Moving);
            return AgentDecision {
                face: Some(target.position),
                ..AgentDecision::default()
            };
        }

        let away = -toward(me.position, target.position);
        AgentDecision {
            velocity: away * config.move_speed,
            face: Some(me.position + away),
            ..AgentDecision::default()
        }
    }
}

fn horizontal_distance(a: Vec3, b: Vec3) -> f32 {
    let d = b - a;
    (d.x * d.x + d.z * d.z).sqrt()
}

fn toward(from: Vec3, to: Vec3) -> Vec3 {
    let d = to - from;
    Vec3::new(d.x, 0.0, d.z).normalize_or_zero()
}
