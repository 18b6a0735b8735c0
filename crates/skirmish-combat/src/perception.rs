//! Target acquisition.
//!
//! Finds the nearest valid entity for an agent, turret or area effect from a
//! spatial query. Results are plain [`EntityId`] handles and must be
//! re-validated with [`revalidate`] before each use.

use glam::Vec3;
use skirmish_common::{EntityId, TagSet};

/// What a spatial query knows about one entity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    /// Entity handle.
    pub id: EntityId,
    /// World position.
    pub position: Vec3,
    /// Faction/kind tags.
    pub tags: TagSet,
    /// Whether the entity is alive.
    pub alive: bool,
}

impl Candidate {
    /// Create a living candidate.
    #[must_use]
    pub const fn new(id: EntityId, position: Vec3, tags: TagSet) -> Self {
        Self {
            id,
            position,
            tags,
            alive: true,
        }
    }
}

/// Source of candidates, implemented by the world.
pub trait SpatialQuery {
    /// Candidates that may lie within `radius` of `origin`.
    ///
    /// May return a superset; the caller does the exact test.
    fn candidates_near(&self, origin: Vec3, radius: f32) -> Vec<Candidate>;

    /// Look up one entity by handle.
    fn candidate(&self, id: EntityId) -> Option<Candidate>;
}

impl SpatialQuery for [Candidate] {
    fn candidates_near(&self, _origin: Vec3, _radius: f32) -> Vec<Candidate> {
        self.to_vec()
    }

    fn candidate(&self, id: EntityId) -> Option<Candidate> {
        self.iter().find(|c| c.id == id).copied()
    }
}

/// Parameters of a nearest-target search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerceptionQuery {
    /// Search origin.
    pub origin: Vec3,
    /// Accept entities carrying any of these tags.
    pub tags: TagSet,
    /// Maximum distance.
    pub max_radius: f32,
    /// Entity to skip (usually the searcher).
    pub exclude: Option<EntityId>,
    /// Max height difference. When set, distance is measured horizontally.
    pub vertical_tolerance: Option<f32>,
}

impl PerceptionQuery {
    /// Create a query.
    #[must_use]
    pub const fn new(origin: Vec3, tags: TagSet, max_radius: f32) -> Self {
        Self {
            origin,
            tags,
            max_radius,
            exclude: None,
            vertical_tolerance: None,
        }
    }

    /// Skip an entity.
    #[must_use]
    pub const fn excluding(mut self, id: EntityId) -> Self {
        self.exclude = Some(id);
        self
    }

    /// Set vertical tolerance.
    #[must_use]
    pub const fn with_vertical_tolerance(mut self, tolerance: f32) -> Self {
        self.vertical_tolerance = Some(tolerance);
        self
    }

    /// Squared distance to a candidate, or `None` if the candidate fails the query.
    #[must_use]
    pub fn admit(&self, candidate: &Candidate) -> Option<f32> {
        if !candidate.alive
            || self.exclude == Some(candidate.id)
            || !candidate.tags.intersects(self.tags)
        {
            return None;
        }

        let delta = candidate.position - self.origin;
        let distance_sq = match self.vertical_tolerance {
            Some(tolerance) => {
                if delta.y.abs() > tolerance {
                    return None;
                }
                delta.x * delta.x + delta.z * delta.z
            },
            None => delta.length_squared(),
        };

        (distance_sq <= self.max_radius * self.max_radius).then_some(distance_sq)
    }
}

/// Nearest entity admitted by the query. Ties go to the first encountered.
pub fn find_nearest_valid<S: SpatialQuery + ?Sized>(
    space: &S,
    query: &PerceptionQuery,
) -> Option<EntityId> {
    let mut best: Option<(EntityId, f32)> = None;
    for candidate in space.candidates_near(query.origin, query.max_radius) {
        let Some(distance_sq) = query.admit(&candidate) else {
            continue;
        };
        if best.map_or(true, |(_, d)| distance_sq < d) {
            best = Some((candidate.id, distance_sq));
        }
    }
    best.map(|(id, _)| id)
}

/// Re-resolve a held handle. Returns the candidate only if it still passes the query.
pub fn revalidate<S: SpatialQuery + ?Sized>(
    space: &S,
    query: &PerceptionQuery,
    id: EntityId,
) -> Option<Candidate> {
    let candidate = space.candidate(id)?;
    query.admit(&candidate).map(|_| candidate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use skirmish_common::Tag;

    fn monster(raw: u64, x: f32, y: f32) -> Candidate {
        Candidate::new(
            EntityId::from_raw(raw),
            Vec3::new(x, y, 0.0),
            TagSet::single(Tag::Monster),
        )
    }

    #[test]
    fn test_nearest_within_radius() {
        let space = vec![monster(1, 8.0, 0.0), monster(2, 3.0, 0.0), monster(3, 30.0, 0.0)];
        let query = PerceptionQuery::new(Vec3::ZERO, TagSet::single(Tag::Monster), 10.0);
        assert_eq!(
            find_nearest_valid(space.as_slice(), &query),
            Some(EntityId::from_raw(2))
        );
    }

    #[test]
    fn test_empty_when_nothing_matches() {
        let space = vec![monster(1, 3.0, 0.0)];
        let query = PerceptionQuery::new(Vec3::ZERO, TagSet::single(Tag::Player), 10.0);
        assert_eq!(find_nearest_valid(space.as_slice(), &query), None);

        let far = PerceptionQuery::new(Vec3::ZERO, TagSet::single(Tag::Monster), 2.0);
        assert_eq!(find_nearest_valid(space.as_slice(), &far), None);
    }

    #[test]
    fn test_excludes_self_and_dead() {
        let mut dead = monster(2, 1.0, 0.0);
        dead.alive = false;
        let space = vec![monster(1, 0.5, 0.0), dead, monster(3, 4.0, 0.0)];
        let query = PerceptionQuery::new(Vec3::ZERO, TagSet::single(Tag::Monster), 10.0)
            .excluding(EntityId::from_raw(1));
        assert_eq!(
            find_nearest_valid(space.as_slice(), &query),
            Some(EntityId::from_raw(3))
        );
    }

    #[test]
    fn test_tie_goes_to_first() {
        let space = vec![monster(5, 2.0, 0.0), monster(6, -2.0, 0.0)];
        let query = PerceptionQuery::new(Vec3::ZERO, TagSet::single(Tag::Monster), 10.0);
        assert_eq!(
            find_nearest_valid(space.as_slice(), &query),
            Some(EntityId::from_raw(5))
        );
    }

    #[test]
    fn test_vertical_tolerance_uses_horizontal_distance() {
        let space = vec![monster(1, 9.0, 5.0), monster(2, 1.0, 12.0)];
        let query = PerceptionQuery::new(Vec3::ZERO, TagSet::single(Tag::Monster), 10.0)
            .with_vertical_tolerance(6.0);
        assert_eq!(
            find_nearest_valid(space.as_slice(), &query),
            Some(EntityId::from_raw(1))
        );

        let strict = PerceptionQuery::new(Vec3::ZERO, TagSet::single(Tag::Monster), 10.0);
        assert_eq!(find_nearest_valid(space.as_slice(), &strict), None);
    }

    #[test]
    fn test_revalidate() {
        let space = vec![monster(1, 1.0, 0.0), monster(2, 20.0, 0.0)];
        let query = PerceptionQuery::new(Vec3::ZERO, TagSet::single(Tag::Monster), 5.0);
        assert!(revalidate(space.as_slice(), &query, EntityId::from_raw(1)).is_some());
        assert!(revalidate(space.as_slice(), &query, EntityId::from_raw(2)).is_none());
        assert!(revalidate(space.as_slice(), &query, EntityId::from_raw(9)).is_none());
    }
}
