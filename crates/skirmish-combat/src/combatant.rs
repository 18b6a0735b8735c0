//! Per-entity combat aggregate.
//!
//! A [`Combatant`] bundles the stat record, status effects, attack sequencer,
//! optional AI brain and defensive stance of one entity, and exposes the
//! inbound interface other systems use: damage, status, buffs, heals,
//! flinches, freezes and per-tick updates.

use glam::{Quat, Vec3};
use skirmish_common::{EntityId, Tag, TagSet};
use tracing::{debug, info};

use crate::agent::{AgentConfig, AgentDecision, AgentSelf, AgentState};
use crate::attack::{AttackDescriptor, MovementPolicy};
use crate::config::CombatProfile;
use crate::context::SimContext;
use crate::damage::{AttackOutcome, DamageResolver, DefenseStance, HitRequest, HitTag};
use crate::dice::Dice;
use crate::error::{ActionRejected, ActionResult};
use crate::perception::SpatialQuery;
use crate::sequencer::{ActionSlot, AttackSequencer, CancelReason, SequencerEvent, SkillGate};
use crate::stats::StatRecord;
use crate::status::{AilmentKind, BuffKind, StatusApplication, StatusEffectController, StatusEvent};

/// AI brain: tuning plus state.
#[derive(Debug, Clone)]
pub struct Brain {
    /// Tuning.
    pub config: AgentConfig,
    /// State.
    pub state: AgentState,
}

/// What one [`Combatant::update`] produced.
#[derive(Debug, Clone, Default)]
pub struct CombatantUpdate {
    /// Action started this tick.
    pub started: Option<ActionSlot>,
    /// Sequencer events (spawns, cancellations, completions).
    pub sequencer: Vec<SequencerEvent>,
    /// Status events (poison ticks, expiries).
    pub status: Vec<StatusEvent>,
    /// HP was restored after giving up a chase.
    pub restored_hp: bool,
}

/// One combat-capable entity.
#[derive(Debug, Clone)]
pub struct Combatant {
    /// Handle.
    pub id: EntityId,
    /// Display/log name.
    pub name: String,
    /// Own tags.
    pub tags: TagSet,
    /// Tags this combatant's attacks hit.
    pub hostile_tags: TagSet,
    /// Position.
    pub position: Vec3,
    /// Facing (unit, horizontal).
    pub facing: Vec3,
    /// Velocity for externally controlled actors.
    pub velocity: Vec3,
    /// Body radius for projectile contact.
    pub body_radius: f32,
    /// Stats.
    pub stats: StatRecord,
    /// Status effects.
    pub status: StatusEffectController,
    /// Attack sequencer.
    pub sequencer: AttackSequencer,
    /// AI brain, if AI-controlled.
    pub brain: Option<Brain>,
    /// Defensive stance.
    pub stance: DefenseStance,
    /// Percentage MP cost reduction.
    pub cost_reduction_pct: i32,
    /// Item keys held.
    pub items: Vec<String>,
    dead: bool,
    death_reported: bool,
}

impl Combatant {
    /// Create a combatant with a stat record and loadout.
    #[must_use]
    pub fn new(name: impl Into<String>, stats: StatRecord, sequencer: AttackSequencer) -> Self {
        Self {
            id: EntityId::new(),
            name: name.into(),
            tags: TagSet::EMPTY,
            hostile_tags: TagSet::single(Tag::Monster),
            position: Vec3::ZERO,
            facing: Vec3::Z,
            velocity: Vec3::ZERO,
            body_radius: 0.5,
            stats,
            status: StatusEffectController::new(),
            sequencer,
            brain: None,
            stance: DefenseStance::default(),
            cost_reduction_pct: 0,
            items: Vec::new(),
            dead: false,
            death_reported: false,
        }
    }

    /// Create a combatant from a validated profile.
    #[must_use]
    pub fn from_profile(profile: &CombatProfile, position: Vec3) -> Self {
        let sequencer = AttackSequencer::new(profile.combo.clone(), profile.skills.clone())
            .with_cooldown_interval(profile.cooldown_interval);
        let mut combatant = Self::new(profile.name.clone(), profile.stat_record(), sequencer)
            .with_tags(profile.tag_set(), profile.hostile_set())
            .at(position);
        combatant.brain = profile.agent.clone().map(|config| Brain {
            config,
            state: AgentState::new(),
        });
        combatant.cost_reduction_pct = profile.cost_reduction_pct;
        combatant.items = profile.items.clone();
        combatant
    }

    /// Set own and hostile tags.
    #[must_use]
    pub fn with_tags(mut self, tags: TagSet, hostile: TagSet) -> Self {
        self.tags = tags;
        self.hostile_tags = hostile;
        self
    }

    /// Set position.
    #[must_use]
    pub fn at(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    /// Attach an AI brain.
    #[must_use]
    pub fn with_brain(mut self, config: AgentConfig) -> Self {
        self.brain = Some(Brain {
            config,
            state: AgentState::new(),
        });
        self
    }

    // === Queries ===

    /// Check if dead.
    #[must_use]
    pub const fn is_dead(&self) -> bool {
        self.dead
    }

    /// Frozen by stun, immobilize or the external signal.
    #[must_use]
    pub fn is_frozen(&self) -> bool {
        self.status.is_frozen()
    }

    /// Facing as a rotation about the vertical axis.
    #[must_use]
    pub fn rotation(&self) -> Quat {
        Quat::from_rotation_y(self.facing.x.atan2(self.facing.z))
    }

    /// Power of an action at this instant.
    #[must_use]
    pub fn power_for(&self, attack: &AttackDescriptor) -> i32 {
        attack.scaled_power(self.stats.effective_power(attack.kind))
    }

    /// Returns true exactly once after death.
    pub fn take_death_notice(&mut self) -> bool {
        if self.dead && !self.death_reported {
            self.death_reported = true;
            return true;
        }
        false
    }

    // === Inbound interface ===

    /// Resolve and apply an incoming hit.
    ///
    /// Damage after death is a no-op reported as a 0-damage miss.
    pub fn apply_damage(
        &mut self,
        attacker: Option<EntityId>,
        attacker_power: i32,
        request: &HitRequest,
        resolver: &DamageResolver,
        dice: &mut dyn Dice,
    ) -> AttackOutcome {
        self.take_hit(attacker, attacker_power, request, resolver, dice).0
    }

    /// [`Self::apply_damage`], also returning the session the hit cancelled.
    pub fn take_hit(
        &mut self,
        attacker: Option<EntityId>,
        attacker_power: i32,
        request: &HitRequest,
        resolver: &DamageResolver,
        dice: &mut dyn Dice,
    ) -> (AttackOutcome, Option<SequencerEvent>) {
        if self.dead {
            return (AttackOutcome::negated(HitTag::Miss), None);
        }

        let outcome = resolver.resolve(attacker_power, &self.stats, request, self.stance, dice);
        let mut cancelled = None;
        if outcome.tag.is_real_hit() {
            self.stats.take_damage(outcome.damage);
            if let Some(brain) = &mut self.brain {
                brain.state.notify_damaged(attacker);
            }
            if self.stats.is_dead() {
                self.die();
            } else {
                cancelled = self.sequencer.interrupt(CancelReason::Hit);
            }
        }
        (outcome, cancelled)
    }

    /// Roll and apply an ailment.
    ///
    /// A landed stun or immobilize cancels the current session; the
    /// cancellation is returned alongside the roll result.
    pub fn apply_status(
        &mut self,
        kind: AilmentKind,
        duration: f32,
        dice: &mut dyn Dice,
    ) -> (StatusApplication, Option<SequencerEvent>) {
        let result = self.status.apply_ailment(kind, duration, &self.stats, dice);
        let cancelled = if result.landed() && kind.freezes() {
            self.sequencer.interrupt(CancelReason::Freeze)
        } else {
            None
        };
        (result, cancelled)
    }

    /// Apply a buff.
    pub fn apply_buff(&mut self, kind: BuffKind, duration: f32, magnitude: i32) -> StatusApplication {
        self.status.apply_buff(kind, duration, magnitude, &mut self.stats)
    }

    /// Restore HP/MP. Returns amounts restored; nothing for the dead.
    pub fn heal(&mut self, hp: i32, mp: i32) -> (i32, i32) {
        if self.dead {
            return (0, 0);
        }
        self.stats.heal(hp, mp)
    }

    /// A flinching hit landed. `direction` points away from the attacker.
    pub fn notify_flinch(&mut self, direction: Vec3) -> Option<SequencerEvent> {
        if self.dead {
            return None;
        }
        if let Some(brain) = &mut self.brain {
            brain.state.notify_flinch(&brain.config, direction);
        }
        self.sequencer.interrupt(CancelReason::Flinch)
    }

    /// Set or clear the external freeze signal.
    pub fn set_frozen(&mut self, frozen: bool) {
        self.status.set_external_freeze(frozen);
        if frozen {
            self.sequencer.interrupt(CancelReason::Freeze);
        }
    }

    /// Start a basic attack.
    pub fn start_basic(&mut self) -> ActionResult<ActionSlot> {
        if self.dead || self.is_frozen() {
            return Err(ActionRejected::Incapacitated);
        }
        self.sequencer.start_basic()
    }

    /// Start a skill.
    pub fn start_skill(&mut self, index: usize) -> ActionResult<ActionSlot> {
        if self.dead || self.is_frozen() {
            return Err(ActionRejected::Incapacitated);
        }
        let items = &self.items;
        let has_item = |key: &str| items.iter().any(|item| item == key);
        let gate = SkillGate {
            silenced: self.status.is_silenced(),
            cost_reduction_pct: self.cost_reduction_pct,
            has_item: &has_item,
        };
        self.sequencer.start_skill(index, &mut self.stats, &gate)
    }

    fn die(&mut self) {
        if self.dead {
            return;
        }
        self.dead = true;
        self.status.clear_all(&mut self.stats);
        self.sequencer.clear();
        info!("{} ({}) died", self.name, self.id);
    }

    /// Advance this combatant by one tick.
    pub fn update<S: SpatialQuery + ?Sized>(
        &mut self,
        dt: f32,
        ctx: &SimContext,
        space: &S,
        dice: &mut dyn Dice,
    ) -> CombatantUpdate {
        let mut out = CombatantUpdate::default();
        if self.dead || ctx.is_frozen() {
            return out;
        }

        out.status = self.status.tick(dt, &mut self.stats);
        if self.stats.is_dead() {
            self.die();
            return out;
        }

        let player_frozen = ctx.freeze_player && self.tags.contains(Tag::Player);
        if self.is_frozen() || player_frozen {
            if let Some(event) = self.sequencer.interrupt(CancelReason::Freeze) {
                out.sequencer.push(event);
            }
            if let Some(brain) = &mut self.brain {
                brain.state.frozen = true;
            }
            self.sequencer.tick_cooldowns(dt);
            return out;
        }

        let decision = self.think(dt, space, dice);
        if decision.restore_hp {
            self.stats.restore_hp();
            out.restored_hp = true;
            debug!("{} reset after losing its target", self.name);
        }
        self.steer(&decision, dt);

        if decision.attack {
            out.started = self.choose_attack();
        }
        out.sequencer.extend(self.sequencer.tick(dt));
        out
    }

    fn think<S: SpatialQuery + ?Sized>(&mut self, dt: f32, space: &S, dice: &mut dyn Dice) -> AgentDecision {
        let me = AgentSelf {
            id: self.id,
            position: self.position,
            hp_ratio: self.stats.hp_ratio(),
        };
        match &mut self.brain {
            Some(brain) => {
                brain.state.frozen = false;
                brain.state.tick(&brain.config, &me, space, dt, dice)
            },
            None => AgentDecision {
                velocity: self.velocity,
                ..AgentDecision::default()
            },
        }
    }

    fn steer(&mut self, decision: &AgentDecision, dt: f32) {
        let policy = self.sequencer.movement_policy();
        let steerable = policy.map_or(true, MovementPolicy::allows_steering);
        let velocity = match policy {
            Some(MovementPolicy::Stationary) => Vec3::ZERO,
            Some(dash @ MovementPolicy::DashForward { .. }) => self.facing * dash.forced_speed(),
            Some(MovementPolicy::FreeMove) | None => decision.velocity,
        };
        // Flinch displacement overrides the cast policy.
        let flinching = self
            .brain
            .as_ref()
            .is_some_and(|brain| brain.state.flinch.is_some());
        let velocity = if flinching { decision.velocity } else { velocity };

        self.position += velocity * dt;
        if steerable {
            if let Some(point) = decision.face {
                let to = point - self.position;
                let flat = Vec3::new(to.x, 0.0, to.z).normalize_or_zero();
                if flat != Vec3::ZERO {
                    self.facing = flat;
                }
            }
        }
    }

    /// AI attack choice: the first usable skill, else a basic attack.
    fn choose_attack(&mut self) -> Option<ActionSlot> {
        for index in 0..self.sequencer.skills().len() {
            if let Ok(slot) = self.start_skill(index) {
                return Some(slot);
            }
        }
        self.start_basic().ok()
    }
}
