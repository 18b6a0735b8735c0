//! Combat world.
//!
//! Owns every combatant and drives the per-tick pipeline:
//! status, AI and sequencer updates, hit delivery, projectiles, then deaths.
//! Cross-entity effects look handles up again at each use, so entities
//! killed earlier in the same tick are skipped rather than faulted.

use ahash::AHashMap;
use glam::{Quat, Vec3};
use skirmish_common::{EntityId, Tag, TagSet};
use tracing::{debug, info, trace};

use crate::attack::AttackDescriptor;
use crate::combatant::Combatant;
use crate::config::CombatProfile;
use crate::context::SimContext;
use crate::damage::{roll_under, AttackOutcome, DamageResolver, HitRequest};
use crate::delivery::{plan, Delivery, Strike};
use crate::dice::{Dice, SeededDice};
use crate::error::{ActionRejected, ActionResult};
use crate::perception::{Candidate, SpatialQuery};
use crate::presenter::CombatPresenter;
use crate::projectile::Projectile;
use crate::sequencer::{ActionSlot, CancelReason, SequencerEvent};
use crate::status::StatusEvent;

/// One resolved hit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitRecord {
    /// Attacker.
    pub attacker: EntityId,
    /// Defender.
    pub target: EntityId,
    /// Outcome.
    pub outcome: AttackOutcome,
}

/// What happened during one world tick.
#[derive(Debug, Clone, Default)]
pub struct TickReport {
    /// Hits resolved, in order.
    pub hits: Vec<HitRecord>,
    /// Sessions cancelled.
    pub cancelled: Vec<(EntityId, CancelReason)>,
    /// Projectiles launched.
    pub projectiles_launched: usize,
    /// Entities that died (and were removed) this tick.
    pub deaths: Vec<EntityId>,
}

/// Arena of combatants.
pub struct CombatWorld {
    combatants: AHashMap<EntityId, Combatant>,
    order: Vec<EntityId>,
    projectiles: Vec<Projectile>,
    resolver: DamageResolver,
    dice: Box<dyn Dice>,
    ctx: SimContext,
}

impl CombatWorld {
    /// Create an empty world with seeded dice.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self::with_dice(Box::new(SeededDice::new(seed)))
    }

    /// Create an empty world with the given dice.
    #[must_use]
    pub fn with_dice(dice: Box<dyn Dice>) -> Self {
        Self {
            combatants: AHashMap::new(),
            order: Vec::new(),
            projectiles: Vec::new(),
            resolver: DamageResolver::new(),
            dice,
            ctx: SimContext::new(),
        }
    }

    /// Replace the damage resolver.
    #[must_use]
    pub fn with_resolver(mut self, resolver: DamageResolver) -> Self {
        self.resolver = resolver;
        self
    }

    /// Spawn a combatant from a profile.
    pub fn spawn(&mut self, profile: &CombatProfile, position: Vec3) -> EntityId {
        self.insert(Combatant::from_profile(profile, position))
    }

    /// Add a combatant.
    pub fn insert(&mut self, combatant: Combatant) -> EntityId {
        let id = combatant.id;
        debug!("Spawned {} ({}) at {:?}", combatant.name, id, combatant.position);
        self.order.push(id);
        self.combatants.insert(id, combatant);
        id
    }

    /// Look up a combatant.
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&Combatant> {
        self.combatants.get(&id)
    }

    /// Look up a combatant mutably.
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Combatant> {
        self.combatants.get_mut(&id)
    }

    /// Number of combatants.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Check if the world is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Combatants in spawn order.
    pub fn combatants(&self) -> impl Iterator<Item = &Combatant> {
        self.order.iter().filter_map(|id| self.combatants.get(id))
    }

    /// Living combatants carrying any of `tags`.
    #[must_use]
    pub fn count_living(&self, tags: TagSet) -> usize {
        self.combatants()
            .filter(|c| !c.is_dead() && c.tags.intersects(tags))
            .count()
    }

    /// Projectiles in flight.
    #[must_use]
    pub fn projectiles(&self) -> &[Projectile] {
        &self.projectiles
    }

    /// Simulation context.
    #[must_use]
    pub const fn context(&self) -> &SimContext {
        &self.ctx
    }

    /// Simulation context, for pausing and player freezes.
    pub fn context_mut(&mut self) -> &mut SimContext {
        &mut self.ctx
    }

    // ========================================================================
    // Commands
    // ========================================================================

    /// Start a basic attack for an externally controlled actor.
    pub fn command_basic(&mut self, id: EntityId, presenter: &mut dyn CombatPresenter) -> ActionResult<ActionSlot> {
        let combatant = self.commandable(id)?;
        let slot = combatant.start_basic()?;
        announce(combatant, slot, presenter);
        Ok(slot)
    }

    /// Start a skill for an externally controlled actor.
    pub fn command_skill(
        &mut self,
        id: EntityId,
        index: usize,
        presenter: &mut dyn CombatPresenter,
    ) -> ActionResult<ActionSlot> {
        let combatant = self.commandable(id)?;
        let slot = combatant.start_skill(index)?;
        announce(combatant, slot, presenter);
        Ok(slot)
    }

    /// Look up an actor that may take input right now.
    fn commandable(&mut self, id: EntityId) -> ActionResult<&mut Combatant> {
        let player_frozen = self.ctx.freeze_player;
        let combatant = self.combatants.get_mut(&id).ok_or(ActionRejected::Incapacitated)?;
        if player_frozen && combatant.tags.contains(Tag::Player) {
            return Err(ActionRejected::Incapacitated);
        }
        Ok(combatant)
    }

    /// Apply a hit from outside the pipeline (traps, scripted damage).
    pub fn apply_damage_to(
        &mut self,
        target: EntityId,
        attacker: Option<EntityId>,
        power: i32,
        request: &HitRequest,
    ) -> Option<AttackOutcome> {
        let combatant = self.combatants.get_mut(&target)?;
        Some(combatant.apply_damage(attacker, power, request, &self.resolver, self.dice.as_mut()))
    }

    // ========================================================================
    // Tick
    // ========================================================================

    /// Advance the world by `dt` seconds.
    ///
    /// A global freeze suppresses every countdown; resuming never fast-forwards.
    pub fn tick(&mut self, dt: f32, presenter: &mut dyn CombatPresenter) -> TickReport {
        let mut report = TickReport::default();
        if self.ctx.is_frozen() {
            return report;
        }
        self.ctx.advance(dt);

        let space = self.snapshot();
        let mut spawns: Vec<(EntityId, AttackDescriptor)> = Vec::new();
        for id in &self.order {
            let Some(combatant) = self.combatants.get_mut(id) else {
                continue;
            };
            let update = combatant.update(dt, &self.ctx, space.as_slice(), self.dice.as_mut());

            if let Some(slot) = update.started {
                announce(combatant, slot, presenter);
            }
            for event in &update.status {
                if let StatusEvent::PoisonTick { damage } = event {
                    presenter.show_damage_popup(&damage.to_string(), combatant.position);
                }
            }
            for event in update.sequencer {
                match event {
                    SequencerEvent::Spawn { action, hit_index } => {
                        if let Some(attack) = combatant.sequencer.descriptor(action) {
                            trace!("{} spawns {} hit {}", combatant.name, attack.name, hit_index);
                            spawns.push((*id, attack.clone()));
                        }
                    },
                    SequencerEvent::Cancelled { reason, .. } => report.cancelled.push((*id, reason)),
                    SequencerEvent::Finished { .. } => {},
                }
            }
        }

        for (attacker, attack) in spawns {
            self.deliver(attacker, &attack, presenter, &mut report);
        }
        self.step_projectiles(dt, presenter, &mut report);
        self.flush_deaths(presenter, &mut report);
        report
    }

    fn snapshot(&self) -> Vec<Candidate> {
        self.combatants().map(candidate_of).collect()
    }

    fn deliver(
        &mut self,
        attacker: EntityId,
        attack: &AttackDescriptor,
        presenter: &mut dyn CombatPresenter,
        report: &mut TickReport,
    ) {
        let Some(source) = self.combatants.get(&attacker).filter(|c| !c.is_dead()) else {
            return;
        };
        let strike = Strike {
            attacker,
            position: source.position,
            facing: source.facing,
            own_tags: source.tags,
            hostile_tags: source.hostile_tags,
            target: source.brain.as_ref().and_then(|b| b.state.target),
            attack,
        };
        let power = source.power_for(attack);
        let rotation = source.rotation();

        if let Some(key) = &attack.effect {
            presenter.spawn_effect(key, source.position, rotation);
        }
        if let Some(key) = &attack.sound {
            presenter.play_sound(key);
        }

        let space = self.snapshot();
        match plan(&strike, space.as_slice()) {
            Delivery::Hits(targets) => {
                for target in targets {
                    self.resolve_hit(attacker, strike.position, power, attack, target, presenter, report);
                }
            },
            Delivery::Projectile {
                origin,
                velocity,
                radius,
                lifetime,
                pierce,
            } => {
                let key = attack.effect.as_deref().unwrap_or(attack.name.as_str());
                presenter.spawn_projectile(key, origin, heading(velocity), attacker);
                self.projectiles.push(
                    Projectile::new(attacker, origin, velocity, power, attack.clone())
                        .with_hostile_tags(strike.hostile_tags)
                        .with_flight(radius, lifetime, pierce),
                );
                report.projectiles_launched += 1;
            },
            Delivery::Heal { targets, percent } => {
                for target in targets {
                    let Some(ally) = self.combatants.get_mut(&target) else {
                        continue;
                    };
                    let amount = (ally.stats.max_hp() * percent + 99) / 100;
                    let (healed, _) = ally.heal(amount, 0);
                    if healed > 0 {
                        presenter.show_damage_popup(&format!("+{healed}"), ally.position);
                    }
                }
            },
            Delivery::Hook { target, destination } => {
                self.resolve_hit(attacker, strike.position, power, attack, target, presenter, report);
                if let Some(hooked) = self.combatants.get_mut(&target).filter(|c| !c.is_dead()) {
                    hooked.position = destination;
                }
            },
            Delivery::Nothing => {},
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn resolve_hit(
        &mut self,
        attacker: EntityId,
        origin: Vec3,
        power: i32,
        attack: &AttackDescriptor,
        target: EntityId,
        presenter: &mut dyn CombatPresenter,
        report: &mut TickReport,
    ) {
        let Some(defender) = self.combatants.get_mut(&target) else {
            return;
        };
        if defender.is_dead() {
            return;
        }

        let dice = self.dice.as_mut();
        let (outcome, cancelled) =
            defender.take_hit(Some(attacker), power, &attack.hit_request(), &self.resolver, dice);
        presenter.show_damage_popup(&outcome.popup_text(), defender.position);
        if let Some(SequencerEvent::Cancelled { reason, .. }) = cancelled {
            report.cancelled.push((target, reason));
        }

        if outcome.tag.is_real_hit() && !defender.is_dead() {
            if attack.flinch {
                let away = defender.position - origin;
                if let Some(SequencerEvent::Cancelled { reason, .. }) = defender.notify_flinch(away) {
                    report.cancelled.push((target, reason));
                }
            }
            if let Some(payload) = attack.status {
                if roll_under(dice, payload.chance) {
                    if let (_, Some(SequencerEvent::Cancelled { reason, .. })) =
                        defender.apply_status(payload.kind, payload.duration, dice)
                    {
                        report.cancelled.push((target, reason));
                    }
                }
            }
        }

        if let Some(drain) = outcome.drain {
            if let Some(source) = self.combatants.get_mut(&attacker) {
                source.heal(drain, 0);
            }
        }
        report.hits.push(HitRecord {
            attacker,
            target,
            outcome,
        });
    }

    fn step_projectiles(&mut self, dt: f32, presenter: &mut dyn CombatPresenter, report: &mut TickReport) {
        let mut flying = std::mem::take(&mut self.projectiles);
        for projectile in &mut flying {
            projectile.update(dt);
            let struck: Vec<EntityId> = self
                .combatants()
                .filter(|c| {
                    !c.is_dead()
                        && c.id != projectile.owner
                        && c.tags.intersects(projectile.hostile_tags)
                        && !projectile.hit.contains(&c.id)
                        && projectile.swept_touches(c.position, c.body_radius)
                })
                .map(|c| c.id)
                .collect();
            for target in struck {
                if projectile.is_spent() {
                    break;
                }
                projectile.register_hit(target);
                let origin = projectile.position - projectile.velocity * dt;
                let (owner, power) = (projectile.owner, projectile.power);
                self.resolve_hit(owner, origin, power, &projectile.attack, target, presenter, report);
            }
        }
        flying.retain(Projectile::is_active);
        self.projectiles = flying;
    }

    fn flush_deaths(&mut self, presenter: &mut dyn CombatPresenter, report: &mut TickReport) {
        let mut dead = Vec::new();
        for id in &self.order {
            if let Some(combatant) = self.combatants.get_mut(id) {
                if combatant.take_death_notice() {
                    presenter.notify_death(*id);
                    dead.push(*id);
                }
            }
        }
        for id in &dead {
            if let Some(combatant) = self.combatants.remove(id) {
                info!("Removed {} ({}) from the arena", combatant.name, id);
            }
        }
        self.order.retain(|id| !dead.contains(id));
        report.deaths.extend(dead);
    }
}

impl SpatialQuery for CombatWorld {
    fn candidates_near(&self, origin: Vec3, radius: f32) -> Vec<Candidate> {
        // Horizontal test keeps this a superset of vertical-tolerance queries.
        self.combatants()
            .filter(|c| {
                let d = c.position - origin;
                d.x * d.x + d.z * d.z <= radius * radius
            })
            .map(candidate_of)
            .collect()
    }

    fn candidate(&self, id: EntityId) -> Option<Candidate> {
        self.combatants.get(&id).map(candidate_of)
    }
}

fn candidate_of(combatant: &Combatant) -> Candidate {
    Candidate {
        id: combatant.id,
        position: combatant.position,
        tags: combatant.tags,
        alive: !combatant.is_dead(),
    }
}

fn announce(combatant: &Combatant, slot: ActionSlot, presenter: &mut dyn CombatPresenter) {
    if let Some(attack) = combatant.sequencer.descriptor(slot) {
        debug!("{} starts {}", combatant.name, attack.name);
        presenter.play_animation(combatant.id, &attack.animation);
    }
}

fn heading(direction: Vec3) -> Quat {
    Quat::from_rotation_y(direction.x.atan2(direction.z))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentConfig;
    use crate::attack::{ComboChain, EffectShape, SkillDescriptor, StatusPayload};
    use crate::context::FreezeReason;
    use crate::damage::{AttackKind, HitTag};
    use crate::dice::ScriptedDice;
    use crate::presenter::{PresentationEvent, RecordingPresenter};
    use crate::stats::StatBlock;
    use crate::status::AilmentKind;

    fn world() -> CombatWorld {
        CombatWorld::with_dice(Box::new(ScriptedDice::constant(0.0)))
    }

    fn hero(attack: AttackDescriptor) -> CombatProfile {
        CombatProfile::new("hero", 100)
            .with_tags(vec![Tag::Player])
            .with_stats(StatBlock::new(10, 2, 10, 2), 30)
            .with_combo(ComboChain::new(vec![attack], 0.2, 0.5))
    }

    fn dummy(hp: i32) -> CombatProfile {
        CombatProfile::new("dummy", hp)
            .with_tags(vec![Tag::Monster])
            .with_stats(StatBlock::new(4, 2, 0, 0), 0)
    }

    fn slash() -> AttackDescriptor {
        AttackDescriptor::new("slash", "slash").with_cast_time(0.2)
    }

    #[test]
    fn test_two_lethal_hits_one_death() {
        let mut world = world();
        let mut presenter = RecordingPresenter::new();
        let target = world.spawn(&dummy(5), Vec3::ZERO);
        let request = HitRequest::new(AttackKind::Physical);

        let first = world.apply_damage_to(target, None, 14, &request);
        let second = world.apply_damage_to(target, None, 14, &request);
        assert_eq!(first.map(|o| o.damage), Some(12));
        assert_eq!(second.map(|o| o.tag), Some(HitTag::Miss));
        assert_eq!(world.get(target).map(|c| c.stats.hp()), Some(0));

        let report = world.tick(0.1, &mut presenter);
        assert_eq!(report.deaths, vec![target]);
        world.tick(0.1, &mut presenter);
        assert_eq!(presenter.deaths_of(target), 1);
        assert!(world.get(target).is_none());
    }

    #[test]
    fn test_basic_attack_lands_after_cast() {
        let mut world = world();
        let mut presenter = RecordingPresenter::new();
        let player = world.spawn(&hero(slash()), Vec3::ZERO);
        let target = world.spawn(&dummy(50), Vec3::new(0.0, 0.0, 1.0));

        world.command_basic(player, &mut presenter).unwrap();
        assert!(world.tick(0.1, &mut presenter).hits.is_empty());
        let report = world.tick(0.1, &mut presenter);

        assert_eq!(report.hits.len(), 1);
        assert_eq!(world.get(target).map(|c| c.stats.hp()), Some(42));
        assert!(presenter.events.contains(&PresentationEvent::Animation {
            entity: player,
            key: "slash".to_string(),
        }));
        assert_eq!(presenter.popups().collect::<Vec<_>>(), vec!["8"]);
    }

    #[test]
    fn test_cancelled_cast_deals_no_damage() {
        let mut world = world();
        let mut presenter = RecordingPresenter::new();
        let player = world.spawn(&hero(slash()), Vec3::ZERO);
        let target = world.spawn(&dummy(50), Vec3::new(0.0, 0.0, 1.0));

        world.command_basic(player, &mut presenter).unwrap();
        world.tick(0.1, &mut presenter);
        world.apply_damage_to(player, Some(target), 5, &HitRequest::new(AttackKind::Physical));
        for _ in 0..5 {
            world.tick(0.1, &mut presenter);
        }
        assert_eq!(world.get(target).map(|c| c.stats.hp()), Some(50));
    }

    #[test]
    fn test_global_freeze_halts_countdowns() {
        let mut world = world();
        let mut presenter = RecordingPresenter::new();
        let player = world.spawn(&hero(slash()), Vec3::ZERO);
        let target = world.spawn(&dummy(50), Vec3::new(0.0, 0.0, 1.0));

        world.command_basic(player, &mut presenter).unwrap();
        world.context_mut().freeze_all(FreezeReason::Cutscene);
        for _ in 0..10 {
            world.tick(0.1, &mut presenter);
        }
        assert_eq!(world.get(target).map(|c| c.stats.hp()), Some(50));
        assert!(world.context().elapsed.abs() < f64::EPSILON);

        world.context_mut().resume();
        world.tick(0.1, &mut presenter);
        assert_eq!(world.get(target).map(|c| c.stats.hp()), Some(50));
        world.tick(0.1, &mut presenter);
        assert_eq!(world.get(target).map(|c| c.stats.hp()), Some(42));
    }

    #[test]
    fn test_projectile_flies_and_drains() {
        let bolt = AttackDescriptor::new("bolt", "cast")
            .with_cast_time(0.1)
            .with_shape(EffectShape::Projectile {
                speed: 20.0,
                radius: 0.3,
                lifetime: 1.0,
                pierce: false,
            })
            .with_drain(50);
        let mut world = world();
        let mut presenter = RecordingPresenter::new();
        let player = world.spawn(&hero(bolt), Vec3::ZERO);
        let target = world.spawn(&dummy(50), Vec3::new(0.0, 0.0, 5.0));
        if let Some(hero) = world.get_mut(player) {
            hero.stats.take_damage(20);
        }

        world.command_basic(player, &mut presenter).unwrap();
        let report = world.tick(0.1, &mut presenter);
        assert_eq!(report.projectiles_launched, 1);

        let mut hits = 0;
        for _ in 0..5 {
            hits += world.tick(0.1, &mut presenter).hits.len();
        }
        assert_eq!(hits, 1);
        assert_eq!(world.get(target).map(|c| c.stats.hp()), Some(42));
        assert_eq!(world.get(player).map(|c| c.stats.hp()), Some(84));
        assert!(world.projectiles().is_empty());
    }

    #[test]
    fn test_projectile_hits_inside_final_step() {
        let bolt = AttackDescriptor::new("bolt", "cast")
            .with_cast_time(0.1)
            .with_shape(EffectShape::Projectile {
                speed: 10.0,
                radius: 0.3,
                lifetime: 0.5,
                pierce: false,
            });
        let mut world = world();
        let mut presenter = RecordingPresenter::new();
        let player = world.spawn(&hero(bolt), Vec3::ZERO);
        let target = world.spawn(&dummy(50), Vec3::new(0.0, 0.0, 4.8));

        world.command_basic(player, &mut presenter).unwrap();
        let mut hits = 0;
        for _ in 0..3 {
            hits += world.tick(0.25, &mut presenter).hits.len();
        }
        assert_eq!(hits, 1);
        assert_eq!(world.get(target).map(|c| c.stats.hp()), Some(42));
        assert!(world.projectiles().is_empty());
    }

    #[test]
    fn test_player_freeze_rejects_input() {
        let mut world = world();
        let mut presenter = RecordingPresenter::new();
        let profile = hero(slash()).with_skill(SkillDescriptor::new(AttackDescriptor::new("nova", "cast"), 5, 3));
        let player = world.spawn(&profile, Vec3::ZERO);
        let monster = world.spawn(
            &dummy(50).with_combo(ComboChain::new(vec![slash()], 0.2, 0.5)),
            Vec3::new(0.0, 0.0, 5.0),
        );

        world.context_mut().freeze_player = true;
        assert_eq!(
            world.command_basic(player, &mut presenter),
            Err(ActionRejected::Incapacitated)
        );
        assert_eq!(
            world.command_skill(player, 0, &mut presenter),
            Err(ActionRejected::Incapacitated)
        );
        assert!(world.command_basic(monster, &mut presenter).is_ok());
        assert!(presenter.events.iter().all(|e| !matches!(
            e,
            PresentationEvent::Animation { entity, .. } if *entity == player
        )));

        world.context_mut().freeze_player = false;
        assert!(world.command_basic(player, &mut presenter).is_ok());
    }

    #[test]
    fn test_stun_in_recovery_is_reported() {
        let stun = slash().with_status(StatusPayload {
            kind: AilmentKind::Stun,
            chance: 100,
            duration: 2.0,
        });
        let claw = AttackDescriptor::new("claw", "claw").with_cast_time(0.05);
        let mut world = world();
        let mut presenter = RecordingPresenter::new();
        let player = world.spawn(&hero(stun), Vec3::ZERO);
        let target = world.spawn(
            &dummy(50).with_combo(ComboChain::new(vec![claw], 0.2, 5.0)),
            Vec3::new(0.0, 0.0, 1.0),
        );

        world.command_basic(target, &mut presenter).unwrap();
        world.tick(0.1, &mut presenter);
        assert_eq!(
            world.get(target).and_then(|c| c.sequencer.phase()),
            Some(crate::sequencer::SequencePhase::Recovery)
        );

        world.command_basic(player, &mut presenter).unwrap();
        let report = world.tick(0.2, &mut presenter);
        assert_eq!(report.hits.len(), 1);
        assert!(report.cancelled.contains(&(target, CancelReason::Freeze)));
        assert!(world.get(target).is_some_and(|c| !c.sequencer.is_active()));
    }

    #[test]
    fn test_interrupt_in_recovery_keeps_damage() {
        let mut world = world();
        let mut presenter = RecordingPresenter::new();
        let player = world.spawn(&hero(slash()), Vec3::ZERO);
        let target = world.spawn(&dummy(50), Vec3::new(0.0, 0.0, 1.0));

        world.command_basic(player, &mut presenter).unwrap();
        world.tick(0.2, &mut presenter);
        assert_eq!(world.get(target).map(|c| c.stats.hp()), Some(42));
        assert_eq!(
            world.get(player).and_then(|c| c.sequencer.phase()),
            Some(crate::sequencer::SequencePhase::Recovery)
        );

        if let Some(hero) = world.get_mut(player) {
            hero.set_frozen(true);
            assert!(!hero.sequencer.is_active());
        }
        for _ in 0..5 {
            world.tick(0.1, &mut presenter);
        }
        assert_eq!(world.get(target).map(|c| c.stats.hp()), Some(42));
    }

    #[test]
    fn test_status_payload_on_hit() {
        let stun = slash().with_status(StatusPayload {
            kind: AilmentKind::Stun,
            chance: 100,
            duration: 2.0,
        });
        let mut world = world();
        let mut presenter = RecordingPresenter::new();
        let player = world.spawn(&hero(stun), Vec3::ZERO);
        let target = world.spawn(&dummy(50), Vec3::new(0.0, 0.0, 1.0));

        world.command_basic(player, &mut presenter).unwrap();
        world.tick(0.2, &mut presenter);
        assert!(world.get(target).is_some_and(Combatant::is_frozen));
    }

    #[test]
    fn test_skill_rejections_surface() {
        let mut world = world();
        let mut presenter = RecordingPresenter::new();
        let profile = hero(slash()).with_skill(SkillDescriptor::new(AttackDescriptor::new("nova", "cast"), 50, 3));
        let player = world.spawn(&profile, Vec3::ZERO);

        assert!(matches!(
            world.command_skill(player, 0, &mut presenter),
            Err(ActionRejected::InsufficientResource { .. })
        ));
        assert_eq!(
            world.command_skill(player, 4, &mut presenter),
            Err(ActionRejected::UnknownSkill(4))
        );
    }

    #[test]
    fn test_monster_hunts_player() {
        let mut world = world();
        let mut presenter = RecordingPresenter::new();
        let player = world.spawn(&hero(slash()), Vec3::ZERO);
        let monster = CombatProfile::new("wolf", 40)
            .with_tags(vec![Tag::Monster])
            .with_stats(StatBlock::new(8, 1, 0, 0), 0)
            .with_combo(ComboChain::new(vec![slash()], 0.2, 0.5))
            .with_agent(AgentConfig::default());
        let wolf = world.spawn(&monster, Vec3::new(0.0, 0.0, 6.0));

        for _ in 0..60 {
            world.tick(0.1, &mut presenter);
        }
        assert!(world.get(player).is_some_and(|c| c.stats.hp() < 100));
        assert!(world.get(wolf).is_some_and(|c| c.position.z < 6.0));
        assert_eq!(world.count_living(TagSet::single(Tag::Monster)), 1);
    }
}
