//! In-flight projectiles.

use glam::Vec3;
use skirmish_common::{EntityId, TagSet};

use crate::attack::AttackDescriptor;

/// A projectile travelling through the arena.
///
/// The owner is a non-owning handle: it may be dead or gone by the time the
/// projectile lands, so it is looked up again before drain healing. Damage
/// uses the power captured at spawn.
#[derive(Debug, Clone, PartialEq)]
pub struct Projectile {
    /// Firing entity.
    pub owner: EntityId,
    /// Tags the projectile may hit.
    pub hostile_tags: TagSet,
    /// Current position.
    pub position: Vec3,
    /// Velocity (units/second).
    pub velocity: Vec3,
    /// Collision radius.
    pub radius: f32,
    /// Time to live in seconds.
    pub ttl: f32,
    /// Attacker power captured at spawn.
    pub power: i32,
    /// Attack resolved on contact.
    pub attack: AttackDescriptor,
    /// Keep flying after a hit.
    pub pierce: bool,
    /// Entities already hit.
    pub hit: Vec<EntityId>,
    previous: Vec3,
}

impl Projectile {
    /// Create a projectile.
    #[must_use]
    pub fn new(owner: EntityId, origin: Vec3, velocity: Vec3, power: i32, attack: AttackDescriptor) -> Self {
        Self {
            owner,
            hostile_tags: TagSet::EMPTY,
            position: origin,
            velocity,
            radius: 0.5,
            ttl: 2.0,
            power,
            attack,
            pierce: false,
            hit: Vec::new(),
            previous: origin,
        }
    }

    /// Set the tags the projectile may hit.
    #[must_use]
    pub fn with_hostile_tags(mut self, tags: TagSet) -> Self {
        self.hostile_tags = tags;
        self
    }

    /// Set radius, lifetime and piercing.
    #[must_use]
    pub fn with_flight(mut self, radius: f32, ttl: f32, pierce: bool) -> Self {
        self.radius = radius;
        self.ttl = ttl;
        self.pierce = pierce;
        self
    }

    /// Updates projectile position.
    pub fn update(&mut self, dt: f32) {
        self.previous = self.position;
        self.position += self.velocity * dt;
        self.ttl -= dt;
    }

    /// Checks if projectile is still active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.ttl > 0.0
    }

    /// Whether a point was touched during the last step (swept test).
    #[must_use]
    pub fn swept_touches(&self, point: Vec3, point_radius: f32) -> bool {
        let segment = self.position - self.previous;
        let length_sq = segment.length_squared();
        let t = if length_sq <= f32::EPSILON {
            0.0
        } else {
            ((point - self.previous).dot(segment) / length_sq).clamp(0.0, 1.0)
        };
        let closest = self.previous + segment * t;
        let reach = self.radius + point_radius;
        closest.distance_squared(point) <= reach * reach
    }

    /// A non-piercing projectile that already landed a hit.
    #[must_use]
    pub fn is_spent(&self) -> bool {
        !self.pierce && !self.hit.is_empty()
    }

    /// Record a hit. Returns false if the entity was already hit.
    pub fn register_hit(&mut self, target: EntityId) -> bool {
        if self.hit.contains(&target) {
            return false;
        }
        self.hit.push(target);
        if !self.pierce {
            self.ttl = 0.0;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bolt() -> Projectile {
        Projectile::new(
            EntityId::from_raw(1),
            Vec3::ZERO,
            Vec3::new(10.0, 0.0, 0.0),
            12,
            AttackDescriptor::default(),
        )
        .with_flight(0.25, 1.0, false)
    }

    #[test]
    fn test_projectile_expires() {
        let mut p = bolt();
        p.update(0.5);
        assert!(p.is_active());
        p.update(0.5);
        assert!(!p.is_active());
    }

    #[test]
    fn test_swept_hit_does_not_tunnel() {
        let mut p = bolt();
        p.update(1.0);
        // Target sat between the start and end positions.
        assert!(p.swept_touches(Vec3::new(5.0, 0.3, 0.0), 0.1));
        assert!(!p.swept_touches(Vec3::new(5.0, 2.0, 0.0), 0.1));
    }

    #[test]
    fn test_single_hit_unless_piercing() {
        let mut p = bolt();
        assert!(!p.is_spent());
        assert!(p.register_hit(EntityId::from_raw(2)));
        assert!(!p.is_active());
        assert!(p.is_spent());

        let mut pierce = bolt().with_flight(0.25, 1.0, true);
        assert!(pierce.register_hit(EntityId::from_raw(2)));
        assert!(!pierce.register_hit(EntityId::from_raw(2)));
        assert!(pierce.register_hit(EntityId::from_raw(3)));
        assert!(pierce.is_active());
        assert!(!pierce.is_spent());
    }
}
