//! Combat profiles.
//!
//! This module provides:
//! - Loading profiles from `*.toml` files (`[[profile]]` tables)
//! - Load-time validation against an animation catalog
//! - A registry with lookup by name
//!
//! A profile that fails validation is fatal to that entity's combat
//! configuration only; directory loads log and skip the offending file.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use skirmish_common::{SchemaVersion, Tag, TagSet};
use tracing::{debug, info, warn};

use crate::agent::AgentConfig;
use crate::attack::{ComboChain, SkillDescriptor};
use crate::damage::ElementAffinity;
use crate::error::{ConfigError, ConfigResult};
use crate::stats::{Resistances, StatBlock, StatRecord};

/// Default directory for profile files.
pub const DEFAULT_PROFILE_PATH: &str = "assets/profiles";

// ============================================================================
// Animation Catalog
// ============================================================================

/// Resolves animation keys at load time.
pub trait AnimationCatalog {
    /// Whether the key names a playable animation.
    fn contains(&self, key: &str) -> bool;
}

/// Catalog accepting every non-empty key.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnyAnimation;

impl AnimationCatalog for AnyAnimation {
    fn contains(&self, key: &str) -> bool {
        !key.trim().is_empty()
    }
}

impl AnimationCatalog for HashSet<String> {
    fn contains(&self, key: &str) -> bool {
        HashSet::contains(self, key)
    }
}

// ============================================================================
// Profile
// ============================================================================

/// Everything needed to spawn a combatant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatProfile {
    /// Unique profile name.
    pub name: String,
    /// Schema the profile was written for.
    #[serde(default = "profile_version")]
    pub version: SchemaVersion,
    /// Tags carried by the combatant.
    #[serde(default)]
    pub tags: Vec<Tag>,
    /// Tags the combatant's attacks hit. Defaults to the agent's targets.
    #[serde(default)]
    pub hostile_tags: Vec<Tag>,
    /// Level.
    #[serde(default = "level_one")]
    pub level: u32,
    /// Base stats.
    #[serde(default)]
    pub stats: StatBlock,
    /// Base max HP.
    pub max_hp: i32,
    /// Base max MP.
    #[serde(default)]
    pub max_mp: i32,
    /// Ailment resistances.
    #[serde(default)]
    pub resistances: Resistances,
    /// Element affinity.
    #[serde(default)]
    pub affinity: ElementAffinity,
    /// Auto-guard chance.
    #[serde(default)]
    pub auto_guard_pct: i32,
    /// Basic attack chain.
    #[serde(default)]
    pub combo: ComboChain,
    /// Skills.
    #[serde(default)]
    pub skills: Vec<SkillDescriptor>,
    /// AI tuning; `None` for externally controlled actors.
    #[serde(default)]
    pub agent: Option<AgentConfig>,
    /// Seconds per skill cooldown interval.
    #[serde(default = "one_second")]
    pub cooldown_interval: f32,
    /// Percentage MP cost reduction.
    #[serde(default)]
    pub cost_reduction_pct: i32,
    /// Item keys held, checked by skill prerequisites.
    #[serde(default)]
    pub items: Vec<String>,
}

const fn profile_version() -> SchemaVersion {
    SchemaVersion::COMBAT_PROFILE
}

const fn level_one() -> u32 {
    1
}

const fn one_second() -> f32 {
    1.0
}

impl CombatProfile {
    /// Create a profile with default stats and a one-step combo.
    #[must_use]
    pub fn new(name: impl Into<String>, max_hp: i32) -> Self {
        Self {
            name: name.into(),
            version: SchemaVersion::COMBAT_PROFILE,
            tags: Vec::new(),
            hostile_tags: Vec::new(),
            level: 1,
            stats: StatBlock::default(),
            max_hp,
            max_mp: 0,
            resistances: Resistances::default(),
            affinity: ElementAffinity::default(),
            auto_guard_pct: 0,
            combo: ComboChain::default(),
            skills: Vec::new(),
            agent: None,
            cooldown_interval: 1.0,
            cost_reduction_pct: 0,
            items: Vec::new(),
        }
    }

    /// Set tags.
    #[must_use]
    pub fn with_tags(mut self, tags: Vec<Tag>) -> Self {
        self.tags = tags;
        self
    }

    /// Set hostile tags.
    #[must_use]
    pub fn with_hostile_tags(mut self, tags: Vec<Tag>) -> Self {
        self.hostile_tags = tags;
        self
    }

    /// Set base stats.
    #[must_use]
    pub fn with_stats(mut self, stats: StatBlock, max_mp: i32) -> Self {
        self.stats = stats;
        self.max_mp = max_mp;
        self
    }

    /// Set combo chain.
    #[must_use]
    pub fn with_combo(mut self, combo: ComboChain) -> Self {
        self.combo = combo;
        self
    }

    /// Add a skill.
    #[must_use]
    pub fn with_skill(mut self, skill: SkillDescriptor) -> Self {
        self.skills.push(skill);
        self
    }

    /// Set AI tuning.
    #[must_use]
    pub fn with_agent(mut self, agent: AgentConfig) -> Self {
        self.agent = Some(agent);
        self
    }

    /// Tag set of the combatant.
    #[must_use]
    pub fn tag_set(&self) -> TagSet {
        TagSet::of(&self.tags)
    }

    /// Tags the combatant's attacks hit.
    #[must_use]
    pub fn hostile_set(&self) -> TagSet {
        if !self.hostile_tags.is_empty() {
            return TagSet::of(&self.hostile_tags);
        }
        match &self.agent {
            Some(agent) => agent.target_set(),
            None => TagSet::single(Tag::Monster),
        }
    }

    /// Build the stat record this profile describes.
    #[must_use]
    pub fn stat_record(&self) -> StatRecord {
        StatRecord::new(self.level, self.stats, self.max_hp, self.max_mp)
            .with_resistances(self.resistances)
            .with_affinity(self.affinity.clone())
            .with_auto_guard(self.auto_guard_pct)
    }

    /// Check the profile against load-time rules.
    pub fn validate(&self, catalog: &dyn AnimationCatalog) -> ConfigResult<()> {
        let name = self.name.as_str();
        if name.trim().is_empty() {
            return Err(ConfigError::invalid("<unnamed>", "empty profile name"));
        }
        if !SchemaVersion::COMBAT_PROFILE.can_read(&self.version) {
            return Err(ConfigError::invalid(
                name,
                format!("unsupported profile version {}", self.version),
            ));
        }
        if self.max_hp <= 0 || self.max_mp < 0 {
            return Err(ConfigError::invalid(name, "max_hp must be positive and max_mp not negative"));
        }
        if !(0..=100).contains(&self.auto_guard_pct) || !(0..=100).contains(&self.cost_reduction_pct) {
            return Err(ConfigError::invalid(name, "percentages must lie in 0..=100"));
        }
        if self.cooldown_interval <= 0.0 {
            return Err(ConfigError::invalid(name, "cooldown_interval must be positive"));
        }
        if self.hostile_set().is_empty() {
            return Err(ConfigError::invalid(name, "no hostile tags"));
        }

        self.combo.validate(name, catalog)?;
        for skill in &self.skills {
            skill.validate(name, catalog)?;
        }
        if let Some(agent) = &self.agent {
            validate_agent(name, agent)?;
        }
        Ok(())
    }
}

fn validate_agent(profile: &str, agent: &AgentConfig) -> ConfigResult<()> {
    let distances = [
        agent.detect_range,
        agent.vertical_tolerance,
        agent.approach_distance,
        agent.lost_sight_distance,
        agent.move_speed,
        agent.patrol_speed,
        agent.idle_duration,
        agent.patrol_duration,
        agent.flinch_duration,
        agent.flinch_speed,
    ];
    if distances.iter().any(|v| *v < 0.0 || !v.is_finite()) {
        return Err(ConfigError::invalid(profile, "agent distances and timings must not be negative"));
    }
    if agent.approach_distance <= 0.0 {
        return Err(ConfigError::invalid(profile, "approach_distance must be positive"));
    }
    if agent.mobile && agent.lost_sight_distance < agent.detect_range {
        return Err(ConfigError::invalid(profile, "lost_sight_distance is shorter than detect_range"));
    }
    if agent.target_tags.is_empty() {
        return Err(ConfigError::invalid(profile, "agent has no target tags"));
    }
    if agent
        .flee_below_hp_pct
        .is_some_and(|pct| !(0..=100).contains(&pct))
    {
        return Err(ConfigError::invalid(profile, "flee_below_hp_pct must lie in 0..=100"));
    }
    Ok(())
}

// ============================================================================
// Registry and Loading
// ============================================================================

/// File layout: any number of `[[profile]]` tables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileFile {
    /// Profiles in the file.
    #[serde(rename = "profile", default)]
    pub profiles: Vec<CombatProfile>,
}

/// Validated profiles by name.
#[derive(Debug, Default)]
pub struct ProfileRegistry {
    profiles: AHashMap<String, CombatProfile>,
}

impl ProfileRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and register one profile.
    pub fn register(&mut self, profile: CombatProfile, catalog: &dyn AnimationCatalog) -> ConfigResult<()> {
        profile.validate(catalog)?;
        if self.profiles.contains_key(&profile.name) {
            return Err(ConfigError::DuplicateProfile(profile.name));
        }
        self.profiles.insert(profile.name.clone(), profile);
        Ok(())
    }

    /// Get a profile by name.
    pub fn get(&self, name: &str) -> ConfigResult<&CombatProfile> {
        self.profiles
            .get(name)
            .ok_or_else(|| ConfigError::UnknownProfile(name.to_string()))
    }

    /// Number of profiles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    /// Check if empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Profile names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.profiles.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Load profiles from TOML text. All-or-nothing per call.
    pub fn load_str(&mut self, text: &str, catalog: &dyn AnimationCatalog) -> ConfigResult<usize> {
        let file: ProfileFile = toml::from_str(text)?;

        let mut seen = HashSet::new();
        for profile in &file.profiles {
            profile.validate(catalog)?;
            if self.profiles.contains_key(&profile.name) || !seen.insert(profile.name.as_str()) {
                return Err(ConfigError::DuplicateProfile(profile.name.clone()));
            }
        }

        let count = file.profiles.len();
        for profile in file.profiles {
            self.profiles.insert(profile.name.clone(), profile);
        }
        Ok(count)
    }

    /// Load one file.
    pub fn load_file(&mut self, path: &Path, catalog: &dyn AnimationCatalog) -> ConfigResult<usize> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let content = fs::read_to_string(path)?;
        self.load_str(&content, catalog)
    }

    /// Load every `*.toml` file of a directory, in name order.
    ///
    /// Files that fail to read, parse or validate are logged and skipped.
    pub fn load_dir(&mut self, dir: &Path, catalog: &dyn AnimationCatalog) -> ConfigResult<usize> {
        if !dir.is_dir() {
            return Err(ConfigError::NotFound(dir.to_path_buf()));
        }

        let mut files: Vec<PathBuf> = fs::read_dir(dir)?
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "toml"))
            .collect();
        files.sort();

        let mut count = 0;
        for file in files {
            match self.load_file(&file, catalog) {
                Ok(n) => {
                    count += n;
                    debug!("Loaded {} profiles from {:?}", n, file);
                },
                Err(e) => {
                    warn!("Skipping profile file {:?}: {}", file, e);
                },
            }
        }

        info!("Loaded {} combat profiles", count);
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const GOBLIN: &str = r#"
        [[profile]]
        name = "goblin"
        tags = ["monster"]
        max_hp = 40
        stats = { attack = 8, defense = 2 }
        resistances = { poison = 30 }

        [profile.agent]
        detect_range = 12.0
        approach_distance = 1.5

        [[profile.combo.steps]]
        name = "stab"
        animation = "stab"
        cast_time = 0.3
        shape = { type = "melee", reach = 1.5, arc_degrees = 90.0 }
    "#;

    #[test]
    fn test_load_str() {
        let mut registry = ProfileRegistry::new();
        assert_eq!(registry.load_str(GOBLIN, &AnyAnimation).unwrap(), 1);

        let goblin = registry.get("goblin").unwrap();
        assert_eq!(goblin.stats.attack, 8);
        assert_eq!(goblin.stats.magic_attack, 0);
        assert_eq!(goblin.combo.len(), 1);
        assert_eq!(goblin.hostile_set(), TagSet::of(&[Tag::Player, Tag::Ally]));

        let record = goblin.stat_record();
        assert_eq!(record.hp(), 40);
        assert_eq!(record.resistances().poison, 30);
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut registry = ProfileRegistry::new();
        registry.load_str(GOBLIN, &AnyAnimation).unwrap();
        assert!(matches!(
            registry.load_str(GOBLIN, &AnyAnimation),
            Err(ConfigError::DuplicateProfile(name)) if name == "goblin"
        ));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_unknown_animation_rejected() {
        let catalog: HashSet<String> = ["slash".to_string()].into_iter().collect();
        let mut registry = ProfileRegistry::new();
        let result = registry.load_str(GOBLIN, &catalog);
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_validation_rules() {
        let ok = CombatProfile::new("hero", 100).with_tags(vec![Tag::Player]);
        assert!(ok.validate(&AnyAnimation).is_ok());

        let zero_steps = ok.clone().with_combo(ComboChain::new(Vec::new(), 0.1, 0.1));
        assert!(zero_steps.validate(&AnyAnimation).is_err());

        let mut negative_timing = ok.clone();
        negative_timing.combo.steps[0].cast_time = -1.0;
        assert!(negative_timing.validate(&AnyAnimation).is_err());

        let bad_agent = ok
            .clone()
            .with_agent(AgentConfig::default().with_ranges(20.0, 2.0, 10.0));
        assert!(bad_agent.validate(&AnyAnimation).is_err());

        let future = CombatProfile {
            version: SchemaVersion::new(2, 0, 0),
            ..ok
        };
        assert!(future.validate(&AnyAnimation).is_err());
    }

    #[test]
    fn test_unknown_profile() {
        let registry = ProfileRegistry::new();
        assert!(matches!(
            registry.get("dragon"),
            Err(ConfigError::UnknownProfile(_))
        ));
    }

    #[test]
    fn test_load_dir_skips_bad_files() {
        let dir = tempfile::tempdir().unwrap();

        let mut good = fs::File::create(dir.path().join("goblin.toml")).unwrap();
        good.write_all(GOBLIN.as_bytes()).unwrap();

        let mut broken = fs::File::create(dir.path().join("broken.toml")).unwrap();
        broken.write_all(b"[[profile]]\nname = ").unwrap();

        let mut ignored = fs::File::create(dir.path().join("notes.txt")).unwrap();
        ignored.write_all(b"not a profile").unwrap();

        let mut registry = ProfileRegistry::new();
        let count = registry.load_dir(dir.path(), &AnyAnimation).unwrap();
        assert_eq!(count, 1);
        assert_eq!(registry.names(), vec!["goblin"]);
    }

    #[test]
    fn test_load_dir_missing() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = ProfileRegistry::new();
        let result = registry.load_dir(&dir.path().join("nope"), &AnyAnimation);
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }
}
