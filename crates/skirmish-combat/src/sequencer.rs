//! Timed attack and skill execution.
//!
//! One actor runs at most one session at a time:
//! `Idle -> Casting -> (spawn) -> [MultiHit] -> Recovery | ComboWait -> Idle`.
//! Timed phases are countdowns advanced by [`AttackSequencer::tick`]; leftover
//! time carries into the next phase. Skill cooldowns are integer counters
//! decremented once per fixed interval whether or not the actor is acting.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::attack::{AttackDescriptor, ComboChain, MovementPolicy, SkillDescriptor};
use crate::error::{ActionRejected, ActionResult};
use crate::stats::StatRecord;

/// Default length of one cooldown interval (seconds).
pub const DEFAULT_COOLDOWN_INTERVAL: f32 = 1.0;

// ============================================================================
// Session State
// ============================================================================

/// Which action a session runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionSlot {
    /// Basic attack at a combo step.
    Basic(usize),
    /// Skill by index.
    Skill(usize),
}

/// Phase of the active session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SequencePhase {
    /// Counting down to the primary hit.
    Casting,
    /// Counting down to the next sub-hit of the tail.
    MultiHit,
    /// Recovering; input is rejected.
    Recovery,
    /// Short wait after a combo step; a basic attack starts the next step.
    ComboWait,
}

/// Why a session was interrupted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CancelReason {
    /// Flinching hit.
    Flinch,
    /// Non-flinching hit that still interrupts.
    Hit,
    /// Actor died.
    Death,
    /// Actor froze (stun, immobilize, pause).
    Freeze,
}

/// The active attack session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttackSession {
    /// Action being executed.
    pub action: ActionSlot,
    /// Current phase.
    pub phase: SequencePhase,
    /// Time left in the phase (seconds).
    pub remaining: f32,
    /// Index of the next hit: 0 is the primary, `n` the n-th sub-hit.
    pub next_hit: usize,
    /// Cancellation flag, checked at phase boundaries.
    pub cancelled: bool,
}

/// Something the caller must act on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SequencerEvent {
    /// Resolve a hit now with the attacker's current power.
    Spawn {
        /// Action that produced the hit.
        action: ActionSlot,
        /// 0 for the primary hit, `n` for the n-th sub-hit.
        hit_index: usize,
    },
    /// The session was cancelled before completing.
    Cancelled {
        /// Cancelled action.
        action: ActionSlot,
        /// Why.
        reason: CancelReason,
    },
    /// The session completed.
    Finished {
        /// Completed action.
        action: ActionSlot,
    },
}

/// Checks a skill must pass besides cost and cooldown.
pub struct SkillGate<'a> {
    /// Actor is silenced.
    pub silenced: bool,
    /// Percentage MP cost reduction.
    pub cost_reduction_pct: i32,
    /// Returns whether the actor holds an item key.
    pub has_item: &'a dyn Fn(&str) -> bool,
}

fn always_held(_item: &str) -> bool {
    true
}

impl Default for SkillGate<'_> {
    fn default() -> Self {
        Self {
            silenced: false,
            cost_reduction_pct: 0,
            has_item: &always_held,
        }
    }
}

// ============================================================================
// Sequencer
// ============================================================================

/// Per-actor attack sequencer.
#[derive(Debug, Clone)]
pub struct AttackSequencer {
    combo: ComboChain,
    skills: Vec<SkillDescriptor>,
    session: Option<AttackSession>,
    combo_step: usize,
    cooldowns: Vec<u32>,
    cooldown_interval: f32,
    cooldown_clock: f32,
}

impl AttackSequencer {
    /// Create a sequencer for a loadout.
    #[must_use]
    pub fn new(combo: ComboChain, skills: Vec<SkillDescriptor>) -> Self {
        let cooldowns = vec![0; skills.len()];
        Self {
            combo,
            skills,
            session: None,
            combo_step: 0,
            cooldowns,
            cooldown_interval: DEFAULT_COOLDOWN_INTERVAL,
            cooldown_clock: 0.0,
        }
    }

    /// Set the cooldown interval.
    #[must_use]
    pub fn with_cooldown_interval(mut self, seconds: f32) -> Self {
        self.cooldown_interval = seconds.max(f32::EPSILON);
        self
    }

    // === Queries ===

    /// Active session, if any.
    #[must_use]
    pub fn session(&self) -> Option<&AttackSession> {
        self.session.as_ref()
    }

    /// Check if a session is active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    /// Current phase, if a session is active.
    #[must_use]
    pub fn phase(&self) -> Option<SequencePhase> {
        self.session.as_ref().map(|s| s.phase)
    }

    /// Next combo step.
    #[must_use]
    pub const fn combo_step(&self) -> usize {
        self.combo_step
    }

    /// Remaining cooldown intervals of a skill.
    #[must_use]
    pub fn cooldown(&self, skill: usize) -> Option<u32> {
        self.cooldowns.get(skill).copied()
    }

    /// Combo chain.
    #[must_use]
    pub const fn combo(&self) -> &ComboChain {
        &self.combo
    }

    /// Skills.
    #[must_use]
    pub fn skills(&self) -> &[SkillDescriptor] {
        &self.skills
    }

    /// Descriptor behind an action.
    #[must_use]
    pub fn descriptor(&self, action: ActionSlot) -> Option<&AttackDescriptor> {
        match action {
            ActionSlot::Basic(step) => self.combo.steps.get(step),
            ActionSlot::Skill(index) => self.skills.get(index).map(|s| &s.attack),
        }
    }

    /// Movement policy while casting, `None` when not casting.
    #[must_use]
    pub fn movement_policy(&self) -> Option<MovementPolicy> {
        let session = self.session.as_ref()?;
        matches!(session.phase, SequencePhase::Casting | SequencePhase::MultiHit)
            .then(|| self.descriptor(session.action).map(|d| d.movement))
            .flatten()
    }

    // === Starting ===

    /// Start a basic attack, or continue the combo during `ComboWait`.
    pub fn start_basic(&mut self) -> ActionResult<ActionSlot> {
        if let Some(session) = &self.session {
            if session.phase != SequencePhase::ComboWait {
                return Err(ActionRejected::Busy);
            }
        }
        let step = self.combo_step;
        let cast = self
            .combo
            .steps
            .get(step)
            .map(|d| d.cast_time)
            .ok_or(ActionRejected::Busy)?;

        let action = ActionSlot::Basic(step);
        self.begin(action, cast);
        Ok(action)
    }

    /// Start a skill after checking silence, cooldown, prerequisite and MP.
    /// MP is spent on success.
    pub fn start_skill(
        &mut self,
        index: usize,
        stats: &mut StatRecord,
        gate: &SkillGate<'_>,
    ) -> ActionResult<ActionSlot> {
        let skill = self
            .skills
            .get(index)
            .ok_or(ActionRejected::UnknownSkill(index))?;
        if self.session.is_some() {
            return Err(ActionRejected::Busy);
        }
        if gate.silenced {
            return Err(ActionRejected::Silenced);
        }
        let remaining = self.cooldowns[index];
        if remaining > 0 {
            return Err(ActionRejected::OnCooldown {
                remaining_ticks: remaining,
            });
        }
        if let Some(item) = &skill.requires {
            if !(gate.has_item)(item) {
                return Err(ActionRejected::MissingPrerequisite { item: item.clone() });
            }
        }
        let cost = skill.cost_with_reduction(gate.cost_reduction_pct);
        if !stats.spend_mp(cost) {
            return Err(ActionRejected::InsufficientResource {
                required: cost,
                available: stats.mp(),
            });
        }

        let cast = skill.attack.cast_time;
        let action = ActionSlot::Skill(index);
        self.begin(action, cast);
        Ok(action)
    }

    fn begin(&mut self, action: ActionSlot, cast: f32) {
        debug!("session start {:?} (cast {}s)", action, cast);
        self.session = Some(AttackSession {
            action,
            phase: SequencePhase::Casting,
            remaining: cast,
            next_hit: 0,
            cancelled: false,
        });
    }

    // === Interruption ===

    /// Interrupt the session.
    ///
    /// Casting is aborted by every reason. A pending multi-hit tail is cut
    /// short by a flinch. Other phases only end on death or freeze.
    pub fn interrupt(&mut self, reason: CancelReason) -> Option<SequencerEvent> {
        let session = self.session.as_mut()?;
        let hard = matches!(reason, CancelReason::Death | CancelReason::Freeze);

        match session.phase {
            SequencePhase::Casting => {},
            SequencePhase::MultiHit if reason == CancelReason::Flinch => {
                debug!("{:?} tail aborted by {:?}", session.action, reason);
                let recovery = post_delay(&self.combo, &self.skills, session.action, self.combo_step);
                session.phase = recovery.0;
                session.remaining = recovery.1;
                return None;
            },
            _ if !hard => return None,
            _ => {},
        }

        session.cancelled = true;
        let action = session.action;
        self.session = None;
        if matches!(action, ActionSlot::Basic(_)) || hard {
            self.combo_step = 0;
        }
        debug!("session {:?} cancelled by {:?}", action, reason);
        Some(SequencerEvent::Cancelled { action, reason })
    }

    /// Drop any session without reporting. Used on death cleanup.
    pub fn clear(&mut self) {
        self.session = None;
        self.combo_step = 0;
    }

    // === Ticking ===

    /// Advance cooldown counters only.
    pub fn tick_cooldowns(&mut self, dt: f32) {
        self.cooldown_clock += dt;
        while self.cooldown_clock >= self.cooldown_interval {
            self.cooldown_clock -= self.cooldown_interval;
            for remaining in &mut self.cooldowns {
                *remaining = remaining.saturating_sub(1);
            }
        }
    }

    /// Advance cooldowns and the session by `dt` seconds.
    pub fn tick(&mut self, dt: f32) -> Vec<SequencerEvent> {
        self.tick_cooldowns(dt);

        let mut events = Vec::new();
        let Some(session) = self.session.as_mut() else {
            return events;
        };
        session.remaining -= dt;

        while let Some(session) = self.session.as_mut() {
            if session.cancelled || session.remaining > 0.0 {
                break;
            }
            let carry = session.remaining;
            let action = session.action;

            match session.phase {
                SequencePhase::Casting | SequencePhase::MultiHit => {
                    let hit_index = session.next_hit;
                    events.push(SequencerEvent::Spawn { action, hit_index });
                    if hit_index == 0 {
                        self.on_primary_hit(action);
                    }
                    self.schedule_after_hit(action, hit_index, carry);
                },
                SequencePhase::Recovery | SequencePhase::ComboWait => {
                    if session.phase == SequencePhase::ComboWait {
                        self.combo_step = 0;
                    }
                    debug!("session {:?} finished", action);
                    self.session = None;
                    events.push(SequencerEvent::Finished { action });
                },
            }
        }
        events
    }

    fn on_primary_hit(&mut self, action: ActionSlot) {
        match action {
            ActionSlot::Basic(step) => {
                self.combo_step = (step + 1) % self.combo.len().max(1);
            },
            ActionSlot::Skill(index) => {
                if let (Some(skill), Some(cooldown)) =
                    (self.skills.get(index), self.cooldowns.get_mut(index))
                {
                    *cooldown = skill.cooldown;
                }
            },
        }
        debug!("{:?} spawned, next combo step {}", action, self.combo_step);
    }

    fn schedule_after_hit(&mut self, action: ActionSlot, hit_index: usize, carry: f32) {
        // Pause after the hit that just landed (none after the primary).
        let (pause, next) = self.descriptor(action).map_or((0.0, None), |d| {
            let pause = hit_index
                .checked_sub(1)
                .and_then(|i| d.tail.get(i))
                .map_or(0.0, |h| h.delay);
            (pause, d.tail.get(hit_index).copied())
        });
        let post = post_delay(&self.combo, &self.skills, action, self.combo_step);

        let Some(session) = self.session.as_mut() else {
            return;
        };

        if let Some(next) = next {
            session.phase = SequencePhase::MultiHit;
            session.remaining = carry + pause + next.cast;
            session.next_hit = hit_index + 1;
        } else {
            session.phase = post.0;
            session.remaining = carry + pause + post.1;
        }
    }
}

/// Phase and duration that follow the last hit of an action.
fn post_delay(
    combo: &ComboChain,
    skills: &[SkillDescriptor],
    action: ActionSlot,
    combo_step: usize,
) -> (SequencePhase, f32) {
    match action {
        ActionSlot::Basic(_) if combo_step == 0 => (SequencePhase::Recovery, combo.full_recovery),
        ActionSlot::Basic(_) => (SequencePhase::ComboWait, combo.combo_delay),
        ActionSlot::Skill(index) => (
            SequencePhase::Recovery,
            skills.get(index).map_or(0.0, |s| s.recovery),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attack::AttackDescriptor;
    use crate::stats::StatBlock;
    use proptest::prelude::*;

    fn chain(steps: usize) -> ComboChain {
        ComboChain::new(
            (0..steps)
                .map(|i| AttackDescriptor::new(format!("slash{i}"), "slash").with_cast_time(0.5))
                .collect(),
            0.25,
            1.0,
        )
    }

    fn fireball() -> SkillDescriptor {
        let mut skill = SkillDescriptor::new(
            AttackDescriptor::new("fireball", "cast").with_cast_time(0.5),
            10,
            3,
        );
        skill.recovery = 0.5;
        skill
    }

    fn spawns(events: &[SequencerEvent]) -> usize {
        events
            .iter()
            .filter(|e| matches!(e, SequencerEvent::Spawn { .. }))
            .count()
    }

    fn stats() -> StatRecord {
        StatRecord::new(1, StatBlock::default(), 100, 30)
    }

    #[test]
    fn test_basic_attack_lifecycle() {
        let mut seq = AttackSequencer::new(chain(3), Vec::new());
        assert_eq!(seq.start_basic(), Ok(ActionSlot::Basic(0)));
        assert_eq!(seq.phase(), Some(SequencePhase::Casting));

        assert!(seq.tick(0.25).is_empty());
        let events = seq.tick(0.25);
        assert_eq!(
            events,
            vec![SequencerEvent::Spawn {
                action: ActionSlot::Basic(0),
                hit_index: 0
            }]
        );
        assert_eq!(seq.phase(), Some(SequencePhase::ComboWait));
        assert_eq!(seq.combo_step(), 1);

        let events = seq.tick(0.25);
        assert!(events.contains(&SequencerEvent::Finished {
            action: ActionSlot::Basic(0)
        }));
        assert!(!seq.is_active());
        assert_eq!(seq.combo_step(), 0);
    }

    #[test]
    fn test_start_while_casting_is_busy() {
        let mut seq = AttackSequencer::new(chain(2), vec![fireball()]);
        let mut record = stats();
        seq.start_basic().unwrap();
        assert_eq!(seq.start_basic(), Err(ActionRejected::Busy));
        assert_eq!(
            seq.start_skill(0, &mut record, &SkillGate::default()),
            Err(ActionRejected::Busy)
        );
        assert_eq!(record.mp(), 30);
    }

    #[test]
    fn test_combo_continues_and_loops() {
        let mut seq = AttackSequencer::new(chain(3), Vec::new());

        for expected in 0..3 {
            assert_eq!(seq.start_basic(), Ok(ActionSlot::Basic(expected)));
            let events = seq.tick(0.5);
            assert_eq!(spawns(&events), 1);
        }
        // Final step wraps the counter and uses full recovery.
        assert_eq!(seq.combo_step(), 0);
        assert_eq!(seq.phase(), Some(SequencePhase::Recovery));
        assert_eq!(seq.start_basic(), Err(ActionRejected::Busy));

        seq.tick(1.0);
        assert!(!seq.is_active());
        assert_eq!(seq.start_basic(), Ok(ActionSlot::Basic(0)));
    }

    #[test]
    fn test_cancel_during_casting_spawns_nothing() {
        let mut seq = AttackSequencer::new(chain(3), Vec::new());
        seq.start_basic().unwrap();
        seq.tick(0.5);
        seq.start_basic().unwrap();
        assert_eq!(seq.combo_step(), 1);

        let event = seq.interrupt(CancelReason::Flinch);
        assert_eq!(
            event,
            Some(SequencerEvent::Cancelled {
                action: ActionSlot::Basic(1),
                reason: CancelReason::Flinch
            })
        );
        assert!(!seq.is_active());
        assert_eq!(seq.combo_step(), 0);

        let mut total = 0;
        for _ in 0..10 {
            total += spawns(&seq.tick(0.5));
        }
        assert_eq!(total, 0);
    }

    #[test]
    fn test_flinch_during_recovery_is_noop() {
        let mut seq = AttackSequencer::new(chain(1), Vec::new());
        seq.start_basic().unwrap();
        assert_eq!(spawns(&seq.tick(0.5)), 1);
        assert_eq!(seq.phase(), Some(SequencePhase::Recovery));

        assert_eq!(seq.interrupt(CancelReason::Flinch), None);
        assert_eq!(seq.phase(), Some(SequencePhase::Recovery));

        let event = seq.interrupt(CancelReason::Death);
        assert!(matches!(
            event,
            Some(SequencerEvent::Cancelled {
                reason: CancelReason::Death,
                ..
            })
        ));
        assert!(!seq.is_active());
    }

    #[test]
    fn test_skill_gates() {
        let skills = vec![fireball().requiring("tome")];
        let mut seq = AttackSequencer::new(chain(1), skills);
        let mut record = stats();

        assert_eq!(
            seq.start_skill(4, &mut record, &SkillGate::default()),
            Err(ActionRejected::UnknownSkill(4))
        );

        let silenced = SkillGate {
            silenced: true,
            ..SkillGate::default()
        };
        assert_eq!(
            seq.start_skill(0, &mut record, &silenced),
            Err(ActionRejected::Silenced)
        );

        let no_tome = SkillGate {
            has_item: &|_| false,
            ..SkillGate::default()
        };
        assert_eq!(
            seq.start_skill(0, &mut record, &no_tome),
            Err(ActionRejected::MissingPrerequisite {
                item: "tome".to_string()
            })
        );

        record.spend_mp(25);
        assert_eq!(
            seq.start_skill(0, &mut record, &SkillGate::default()),
            Err(ActionRejected::InsufficientResource {
                required: 10,
                available: 5
            })
        );

        let discounted = SkillGate {
            cost_reduction_pct: 50,
            ..SkillGate::default()
        };
        assert_eq!(
            seq.start_skill(0, &mut record, &discounted),
            Ok(ActionSlot::Skill(0))
        );
        assert_eq!(record.mp(), 0);
    }

    #[test]
    fn test_skill_cooldown_reaches_exactly_zero() {
        let mut seq = AttackSequencer::new(chain(1), vec![fireball()]);
        let mut record = stats();

        seq.start_skill(0, &mut record, &SkillGate::default()).unwrap();
        assert_eq!(seq.cooldown(0), Some(0));
        assert_eq!(spawns(&seq.tick(0.5)), 1);
        assert_eq!(seq.cooldown(0), Some(3));

        seq.tick(0.5);
        assert!(!seq.is_active());
        assert_eq!(
            seq.start_skill(0, &mut record, &SkillGate::default()),
            Err(ActionRejected::OnCooldown { remaining_ticks: 2 })
        );

        for _ in 0..10 {
            seq.tick_cooldowns(1.0);
        }
        assert_eq!(seq.cooldown(0), Some(0));
        assert!(seq.start_skill(0, &mut record, &SkillGate::default()).is_ok());
    }

    #[test]
    fn test_cancelled_skill_does_not_start_cooldown() {
        let mut seq = AttackSequencer::new(chain(1), vec![fireball()]);
        let mut record = stats();
        seq.start_skill(0, &mut record, &SkillGate::default()).unwrap();
        seq.interrupt(CancelReason::Hit);
        assert_eq!(seq.cooldown(0), Some(0));
        assert_eq!(record.mp(), 20);
    }

    #[test]
    fn test_multi_hit_tail() {
        let attack = AttackDescriptor::new("flurry", "flurry")
            .with_cast_time(0.5)
            .with_sub_hit(0.25, 0.0)
            .with_sub_hit(0.25, 0.0);
        let mut seq = AttackSequencer::new(ComboChain::new(vec![attack], 0.0, 0.5), Vec::new());

        seq.start_basic().unwrap();
        let events = seq.tick(0.5);
        assert_eq!(spawns(&events), 1);
        assert_eq!(seq.phase(), Some(SequencePhase::MultiHit));

        let events = seq.tick(0.25);
        assert_eq!(
            events,
            vec![SequencerEvent::Spawn {
                action: ActionSlot::Basic(0),
                hit_index: 1
            }]
        );

        // Flinch cuts the remaining sub-hit; the landed ones stand.
        assert_eq!(seq.interrupt(CancelReason::Flinch), None);
        assert_eq!(seq.phase(), Some(SequencePhase::Recovery));
        let mut later = 0;
        for _ in 0..8 {
            later += spawns(&seq.tick(0.25));
        }
        assert_eq!(later, 0);
        assert!(!seq.is_active());
    }

    #[test]
    fn test_large_step_carries_through_phases() {
        let mut seq = AttackSequencer::new(chain(1), Vec::new());
        seq.start_basic().unwrap();
        let events = seq.tick(5.0);
        assert_eq!(spawns(&events), 1);
        assert!(events.contains(&SequencerEvent::Finished {
            action: ActionSlot::Basic(0)
        }));
        assert!(!seq.is_active());
    }

    #[test]
    fn test_movement_policy_only_while_casting() {
        let attack = AttackDescriptor::new("dash", "dash")
            .with_cast_time(0.5)
            .with_movement(MovementPolicy::DashForward { speed: 6.0 });
        let mut seq = AttackSequencer::new(ComboChain::new(vec![attack], 0.2, 0.4), Vec::new());
        assert_eq!(seq.movement_policy(), None);
        seq.start_basic().unwrap();
        assert_eq!(
            seq.movement_policy(),
            Some(MovementPolicy::DashForward { speed: 6.0 })
        );
        seq.tick(0.5);
        assert_eq!(seq.movement_policy(), None);
    }

    proptest! {
        #[test]
        fn prop_cooldowns_never_negative(steps in proptest::collection::vec(0.0f32..3.0, 0..40)) {
            let mut seq = AttackSequencer::new(chain(1), vec![fireball()]);
            let mut record = stats();
            let _ = seq.start_skill(0, &mut record, &SkillGate::default());
            for dt in steps {
                seq.tick(dt);
                prop_assert!(seq.cooldown(0).unwrap() <= 3);
            }
            seq.tick(10.0);
            prop_assert_eq!(seq.cooldown(0), Some(0));
        }
    }
}
