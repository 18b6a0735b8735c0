//! Timed status effects.
//!
//! Negative ailments (poison, stun, silence, immobilize) and positive buffs
//! (barrier, magic barrier, brave, faith) live in fixed per-kind slots, so a
//! kind is never active twice on one entity.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::damage::roll_under;
use crate::dice::Dice;
use crate::stats::{StatKind, StatRecord};

/// Seconds between poison ticks.
pub const POISON_TICK_INTERVAL: f32 = 0.7;

/// Percent of max HP lost per poison tick (rounded up).
pub const POISON_PERCENT_PER_TICK: i32 = 2;

// ============================================================================
// Kinds
// ============================================================================

/// Negative status effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AilmentKind {
    /// Damage over time.
    Poison,
    /// Frozen in place; no actions.
    Stun,
    /// Skills blocked.
    Silence,
    /// Webbed; frozen in place.
    Immobilize,
}

impl AilmentKind {
    /// Every ailment, in slot order.
    pub const ALL: [Self; 4] = [Self::Poison, Self::Stun, Self::Silence, Self::Immobilize];

    const fn slot(self) -> usize {
        match self {
            Self::Poison => 0,
            Self::Stun => 1,
            Self::Silence => 2,
            Self::Immobilize => 3,
        }
    }

    /// Whether this ailment freezes the entity.
    #[must_use]
    pub const fn freezes(self) -> bool {
        matches!(self, Self::Stun | Self::Immobilize)
    }
}

/// Positive stat buffs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuffKind {
    /// Defense up.
    Barrier,
    /// Magic defense up.
    MagicBarrier,
    /// Attack up.
    Brave,
    /// Magic attack up.
    Faith,
}

impl BuffKind {
    /// Every buff, in slot order.
    pub const ALL: [Self; 4] = [Self::Barrier, Self::MagicBarrier, Self::Brave, Self::Faith];

    const fn slot(self) -> usize {
        match self {
            Self::Barrier => 0,
            Self::MagicBarrier => 1,
            Self::Brave => 2,
            Self::Faith => 3,
        }
    }

    /// The stat this buff raises.
    #[must_use]
    pub const fn stat(self) -> StatKind {
        match self {
            Self::Barrier => StatKind::Defense,
            Self::MagicBarrier => StatKind::MagicDefense,
            Self::Brave => StatKind::Attack,
            Self::Faith => StatKind::MagicAttack,
        }
    }
}

/// Any status effect kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatusKind {
    /// A negative ailment.
    Ailment(AilmentKind),
    /// A positive buff.
    Buff(BuffKind),
}

// ============================================================================
// Active Effects
// ============================================================================

/// Remaining lifetime of an effect.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Countdown {
    /// Seconds remaining.
    Seconds(f32),
    /// Periodic ticks remaining.
    Ticks {
        /// Ticks still to fire.
        left: u32,
        /// Seconds until the next tick.
        until_next: f32,
    },
}

/// One active status effect.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActiveStatus {
    /// Effect kind.
    pub kind: StatusKind,
    /// Remaining lifetime.
    pub remaining: Countdown,
    /// Per-tick damage for poison, stat delta for buffs, 0 otherwise.
    pub magnitude: i32,
    /// The target had a non-zero resistance when the effect landed.
    pub resisted: bool,
}

/// Result of trying to apply an effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusApplication {
    /// Effect landed.
    Applied,
    /// An active buff was replaced and its timer restarted.
    Refreshed,
    /// Same kind already active; nothing changed.
    AlreadyActive,
    /// Resistance roll failed.
    Resisted,
    /// Target is dead.
    TargetDead,
}

impl StatusApplication {
    /// Whether the effect is now (freshly) in place.
    #[must_use]
    pub const fn landed(self) -> bool {
        matches!(self, Self::Applied | Self::Refreshed)
    }
}

/// Something that happened while ticking effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusEvent {
    /// Poison dealt damage.
    PoisonTick {
        /// HP lost.
        damage: i32,
    },
    /// An effect ran out.
    Expired(StatusKind),
}

// ============================================================================
// Controller
// ============================================================================

/// Per-entity set of active status effects.
#[derive(Debug, Clone, Default)]
pub struct StatusEffectController {
    ailments: [Option<ActiveStatus>; 4],
    buffs: [Option<ActiveStatus>; 4],
    external_freeze: bool,
}

impl StatusEffectController {
    /// Create an empty controller.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Roll resistance and apply an ailment.
    ///
    /// Poison converts `duration` into `round(duration / 0.7)` ticks (at least
    /// one); other ailments last `duration` seconds.
    pub fn apply_ailment(
        &mut self,
        kind: AilmentKind,
        duration: f32,
        stats: &StatRecord,
        dice: &mut dyn Dice,
    ) -> StatusApplication {
        if stats.is_dead() {
            return StatusApplication::TargetDead;
        }
        if self.ailments[kind.slot()].is_some() {
            return StatusApplication::AlreadyActive;
        }

        let resistance = stats.resistances().get(kind);
        if !roll_under(dice, 100 - resistance) {
            debug!("{:?} resisted ({}% resistance)", kind, resistance);
            return StatusApplication::Resisted;
        }

        let (remaining, magnitude) = if kind == AilmentKind::Poison {
            let ticks = ((duration.max(0.0) / POISON_TICK_INTERVAL).round() as u32).max(1);
            let per_tick = (stats.max_hp() * POISON_PERCENT_PER_TICK + 99) / 100;
            (
                Countdown::Ticks {
                    left: ticks,
                    until_next: POISON_TICK_INTERVAL,
                },
                per_tick,
            )
        } else {
            (Countdown::Seconds(duration.max(0.0)), 0)
        };

        self.ailments[kind.slot()] = Some(ActiveStatus {
            kind: StatusKind::Ailment(kind),
            remaining,
            magnitude,
            resisted: resistance > 0,
        });
        debug!("{:?} applied for {}s", kind, duration);
        StatusApplication::Applied
    }

    /// Apply a flat buff. An active buff of the same kind is replaced.
    pub fn apply_buff(
        &mut self,
        kind: BuffKind,
        duration: f32,
        magnitude: i32,
        stats: &mut StatRecord,
    ) -> StatusApplication {
        if stats.is_dead() {
            return StatusApplication::TargetDead;
        }

        let slot = &mut self.buffs[kind.slot()];
        let refreshed = if let Some(old) = slot.take() {
            stats.remove_buff_delta(kind.stat(), old.magnitude);
            true
        } else {
            false
        };

        stats.add_buff_delta(kind.stat(), magnitude);
        *slot = Some(ActiveStatus {
            kind: StatusKind::Buff(kind),
            remaining: Countdown::Seconds(duration.max(0.0)),
            magnitude,
            resisted: false,
        });
        debug!("{:?} +{} for {}s", kind, magnitude, duration);

        if refreshed {
            StatusApplication::Refreshed
        } else {
            StatusApplication::Applied
        }
    }

    /// Advance every countdown by `dt` seconds.
    pub fn tick(&mut self, dt: f32, stats: &mut StatRecord) -> Vec<StatusEvent> {
        let mut events = Vec::new();
        if stats.is_dead() {
            return events;
        }

        for slot in &mut self.ailments {
            let Some(effect) = slot.as_mut() else { continue };
            let expired = match &mut effect.remaining {
                Countdown::Seconds(left) => {
                    *left -= dt;
                    *left <= 0.0
                },
                Countdown::Ticks { left, until_next } => {
                    *until_next -= dt;
                    while *until_next <= 0.0 && *left > 0 && !stats.is_dead() {
                        let damage = stats.take_damage(effect.magnitude);
                        events.push(StatusEvent::PoisonTick { damage });
                        *left -= 1;
                        *until_next += POISON_TICK_INTERVAL;
                    }
                    *left == 0
                },
            };
            if expired {
                debug!("{:?} expired", effect.kind);
                events.push(StatusEvent::Expired(effect.kind));
                *slot = None;
            }
        }

        for (index, slot) in self.buffs.iter_mut().enumerate() {
            let Some(effect) = slot.as_mut() else { continue };
            if let Countdown::Seconds(left) = &mut effect.remaining {
                *left -= dt;
                if *left <= 0.0 {
                    let kind = BuffKind::ALL[index];
                    stats.remove_buff_delta(kind.stat(), effect.magnitude);
                    debug!("{:?} expired", kind);
                    events.push(StatusEvent::Expired(effect.kind));
                    *slot = None;
                }
            }
        }

        events
    }

    /// Remove every effect, withdrawing buff deltas. Used on death.
    pub fn clear_all(&mut self, stats: &mut StatRecord) {
        self.ailments = [None; 4];
        for (index, slot) in self.buffs.iter_mut().enumerate() {
            if let Some(effect) = slot.take() {
                stats.remove_buff_delta(BuffKind::ALL[index].stat(), effect.magnitude);
            }
        }
    }

    /// Remove negative effects early. Returns how many were removed.
    pub fn cleanse(&mut self) -> usize {
        let removed = self.ailments.iter().filter(|slot| slot.is_some()).count();
        self.ailments = [None; 4];
        removed
    }

    /// Set or clear the external freeze signal (independent of stun expiry).
    pub fn set_external_freeze(&mut self, frozen: bool) {
        self.external_freeze = frozen;
    }

    // === Queries ===

    /// Frozen by stun, immobilize or the external signal.
    #[must_use]
    pub fn is_frozen(&self) -> bool {
        self.external_freeze
            || AilmentKind::ALL
                .iter()
                .any(|kind| kind.freezes() && self.has_ailment(*kind))
    }

    /// Silenced (skills blocked).
    #[must_use]
    pub fn is_silenced(&self) -> bool {
        self.has_ailment(AilmentKind::Silence)
    }

    /// Check if an ailment is active.
    #[must_use]
    pub fn has_ailment(&self, kind: AilmentKind) -> bool {
        self.ailments[kind.slot()].is_some()
    }

    /// Check if a buff is active.
    #[must_use]
    pub fn has_buff(&self, kind: BuffKind) -> bool {
        self.buffs[kind.slot()].is_some()
    }

    /// Get an active effect.
    #[must_use]
    pub fn get(&self, kind: StatusKind) -> Option<&ActiveStatus> {
        match kind {
            StatusKind::Ailment(kind) => self.ailments[kind.slot()].as_ref(),
            StatusKind::Buff(kind) => self.buffs[kind.slot()].as_ref(),
        }
    }

    /// Iterate over active effects.
    pub fn active(&self) -> impl Iterator<Item = &ActiveStatus> {
        self.ailments.iter().chain(self.buffs.iter()).flatten()
    }
}
