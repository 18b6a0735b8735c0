//! Tags and tag sets.
//!
//! Tags classify entities for targeting: perception looks for "any of" a set,
//! area filters may require "all of" a set.

use serde::{Deserialize, Serialize};

/// A classification tag carried by an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tag {
    /// The player-controlled actor.
    Player,
    /// Allies of the player (summons, companions).
    Ally,
    /// Hostile monsters.
    Monster,
    /// Stationary turrets.
    Turret,
    /// Summoned creatures.
    Summon,
    /// Boss monsters.
    Boss,
    /// Destructible props that can take damage.
    Prop,
}

impl Tag {
    const fn bit(self) -> u16 {
        1 << (self as u16)
    }

    /// Get all tags.
    #[must_use]
    pub const fn all() -> [Self; 7] {
        [
            Self::Player,
            Self::Ally,
            Self::Monster,
            Self::Turret,
            Self::Summon,
            Self::Boss,
            Self::Prop,
        ]
    }
}

/// A small set of tags stored as a bitmask.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Vec<Tag>", into = "Vec<Tag>")]
pub struct TagSet(u16);

impl TagSet {
    /// The empty set.
    pub const EMPTY: Self = Self(0);

    /// Create a set holding one tag.
    #[must_use]
    pub const fn single(tag: Tag) -> Self {
        Self(tag.bit())
    }

    /// Create a set from a slice of tags.
    #[must_use]
    pub fn of(tags: &[Tag]) -> Self {
        tags.iter().fold(Self::EMPTY, |set, tag| set.with(*tag))
    }

    /// Add a tag (builder pattern).
    #[must_use]
    pub const fn with(self, tag: Tag) -> Self {
        Self(self.0 | tag.bit())
    }

    /// Insert a tag.
    pub fn insert(&mut self, tag: Tag) {
        self.0 |= tag.bit();
    }

    /// Check if the set holds a tag.
    #[must_use]
    pub const fn contains(self, tag: Tag) -> bool {
        self.0 & tag.bit() != 0
    }

    /// Check if the two sets share at least one tag.
    #[must_use]
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// Check if every tag of `other` is in this set.
    #[must_use]
    pub const fn contains_all(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Check if the set is empty.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Iterate over the tags in the set.
    pub fn iter(self) -> impl Iterator<Item = Tag> {
        Tag::all().into_iter().filter(move |tag| self.contains(*tag))
    }
}

impl From<Vec<Tag>> for TagSet {
    fn from(tags: Vec<Tag>) -> Self {
        Self::of(&tags)
    }
}

impl From<TagSet> for Vec<Tag> {
    fn from(set: TagSet) -> Self {
        set.iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_contains_all() {
        let set = TagSet::of(&[Tag::Monster, Tag::Boss]);
        assert!(set.contains_all(TagSet::single(Tag::Boss)));
        assert!(!set.contains_all(TagSet::of(&[Tag::Boss, Tag::Player])));
    }

    #[test]
    fn test_empty_set() {
        assert!(TagSet::EMPTY.is_empty());
        assert!(!TagSet::EMPTY.intersects(TagSet::single(Tag::Player)));
        assert_eq!(TagSet::EMPTY.iter().count(), 0);
    }

    #[test]
    fn test_serde_as_list() {
        let set = TagSet::of(&[Tag::Player, Tag::Ally]);
        let json = serde_json::to_string(&set).unwrap();
        assert_eq!(json, r#"["player","ally"]"#);
        let back: TagSet = serde_json::from_str(&json).unwrap();
        assert_eq!(back, set);
    }

    proptest! {
        #[test]
        fn test_membership_matches_insertions(mask in 0u8..128) {
            let tags: Vec<Tag> = Tag::all()
                .into_iter()
                .enumerate()
                .filter(|(i, _)| mask & (1 << i) != 0)
                .map(|(_, tag)| tag)
                .collect();
            let set = TagSet::of(&tags);
            for tag in Tag::all() {
                prop_assert_eq!(set.contains(tag), tags.contains(&tag));
            }
            prop_assert_eq!(set.iter().count(), tags.len());
            prop_assert!(set.contains_all(set));
        }
    }
}
