//! Arena scenarios.
//!
//! An arena file names a seed, a tick length, a tick budget and a spawn list
//! of profile names. Combatants without an AI brain are driven by a simple
//! autopilot that walks to the nearest hostile and attacks.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use glam::Vec3;
use serde::{Deserialize, Serialize};
use skirmish_combat::{
    find_nearest_valid, AnyAnimation, CombatPresenter, CombatWorld, DamageConfig, DamageResolver,
    PerceptionQuery, ProfileRegistry,
};
use skirmish_common::{EntityId, Tag, TagSet};
use tracing::{debug, info, trace};

/// Arena used when no path is given.
pub const DEFAULT_ARENA: &str = include_str!("../assets/arena.toml");

/// Profiles used when the arena names no profile directory.
const BUILTIN_PROFILES: [(&str, &str); 3] = [
    ("heroes", include_str!("../assets/profiles/heroes.toml")),
    ("monsters", include_str!("../assets/profiles/monsters.toml")),
    ("turrets", include_str!("../assets/profiles/turrets.toml")),
];

/// Walking speed of autopiloted actors (units/second).
const AUTOPILOT_SPEED: f32 = 4.0;

/// One spawn entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpawnEntry {
    /// Profile name.
    pub profile: String,
    /// Spawn position.
    #[serde(default)]
    pub position: [f32; 3],
}

/// Arena scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaConfig {
    /// Dice seed.
    pub seed: u64,
    /// Seconds per tick.
    pub tick_seconds: f32,
    /// Tick budget.
    pub max_ticks: u32,
    /// Directory of profile files; built-in profiles when unset.
    pub profile_dir: Option<PathBuf>,
    /// Damage resolver tuning.
    pub damage: DamageConfig,
    /// Combatants to spawn.
    #[serde(rename = "spawn")]
    pub spawns: Vec<SpawnEntry>,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            seed: 1,
            tick_seconds: 0.05,
            max_ticks: 2400,
            profile_dir: None,
            damage: DamageConfig::default(),
            spawns: Vec::new(),
        }
    }
}

impl ArenaConfig {
    /// Parse an arena from TOML text.
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).context("invalid arena file")?;
        if config.tick_seconds <= 0.0 {
            anyhow::bail!("tick_seconds must be positive");
        }
        Ok(config)
    }

    /// Load an arena from a file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).with_context(|| format!("reading arena {}", path.display()))?;
        let config = Self::from_toml(&text)?;
        info!("Loaded arena from {}", path.display());
        Ok(config)
    }

    /// Build the profile registry this arena uses.
    pub fn registry(&self) -> Result<ProfileRegistry> {
        let mut registry = ProfileRegistry::new();
        match &self.profile_dir {
            Some(dir) => {
                registry
                    .load_dir(dir, &AnyAnimation)
                    .with_context(|| format!("loading profiles from {}", dir.display()))?;
            },
            None => {
                for (name, text) in BUILTIN_PROFILES {
                    registry
                        .load_str(text, &AnyAnimation)
                        .with_context(|| format!("built-in profiles '{name}'"))?;
                }
            },
        }
        Ok(registry)
    }
}

/// Which side won.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Victor {
    /// Players and allies.
    Heroes,
    /// Monsters and turrets.
    Monsters,
}

/// Result of a run.
#[derive(Debug, Clone, Default)]
pub struct ArenaOutcome {
    /// Ticks simulated.
    pub ticks: u32,
    /// Hits resolved.
    pub hits: usize,
    /// Deaths.
    pub deaths: usize,
    /// Winning side, if the fight ended.
    pub victor: Option<Victor>,
}

fn heroes() -> TagSet {
    TagSet::of(&[Tag::Player, Tag::Ally])
}

fn monsters() -> TagSet {
    TagSet::of(&[Tag::Monster, Tag::Turret])
}

/// A populated arena.
pub struct Arena {
    world: CombatWorld,
    config: ArenaConfig,
    piloted: Vec<EntityId>,
}

impl Arena {
    /// Spawn every entry of the arena.
    pub fn new(config: ArenaConfig, registry: &ProfileRegistry) -> Result<Self> {
        let mut world =
            CombatWorld::new(config.seed).with_resolver(DamageResolver::with_config(config.damage.clone()));
        let mut piloted = Vec::new();
        for entry in &config.spawns {
            let profile = registry.get(&entry.profile)?;
            let id = world.spawn(profile, Vec3::from_array(entry.position));
            if profile.agent.is_none() {
                piloted.push(id);
            }
        }
        info!("Arena ready: {} combatants, {} piloted", world.len(), piloted.len());
        Ok(Self {
            world,
            config,
            piloted,
        })
    }

    /// The world being simulated.
    #[must_use]
    pub const fn world(&self) -> &CombatWorld {
        &self.world
    }

    /// Run until one side is wiped out or the tick budget is spent.
    pub fn run(&mut self, presenter: &mut dyn CombatPresenter) -> ArenaOutcome {
        let mut outcome = ArenaOutcome::default();
        let dt = self.config.tick_seconds;

        for _ in 0..self.config.max_ticks {
            self.autopilot(presenter);
            let report = self.world.tick(dt, presenter);
            outcome.ticks += 1;
            outcome.hits += report.hits.len();
            outcome.deaths += report.deaths.len();

            outcome.victor = match (self.world.count_living(heroes()), self.world.count_living(monsters())) {
                (_, 0) => Some(Victor::Heroes),
                (0, _) => Some(Victor::Monsters),
                _ => None,
            };
            if outcome.victor.is_some() {
                break;
            }
        }

        info!(
            "Arena finished after {} ticks: {} hits, {} deaths, victor {:?}",
            outcome.ticks, outcome.hits, outcome.deaths, outcome.victor
        );
        outcome
    }

    fn autopilot(&mut self, presenter: &mut dyn CombatPresenter) {
        self.piloted.retain(|id| self.world.get(*id).is_some());
        for id in self.piloted.clone() {
            let Some(actor) = self.world.get(id) else {
                continue;
            };
            let query = PerceptionQuery::new(actor.position, actor.hostile_tags, f32::INFINITY).excluding(id);
            let Some(foe) = find_nearest_valid(&self.world, &query).and_then(|foe| self.world.get(foe)) else {
                if let Some(actor) = self.world.get_mut(id) {
                    actor.velocity = Vec3::ZERO;
                }
                continue;
            };
            let reach = actor
                .sequencer
                .combo()
                .steps
                .get(actor.sequencer.combo_step())
                .map_or(1.0, |step| step.shape.engage_range());
            let to = foe.position - actor.position;
            let flat = Vec3::new(to.x, 0.0, to.z);
            let in_reach = flat.length() <= reach * 0.9;
            let skills = actor.sequencer.skills().len();

            let Some(actor) = self.world.get_mut(id) else {
                continue;
            };
            let heading = flat.normalize_or_zero();
            if heading != Vec3::ZERO {
                actor.facing = heading;
            }
            actor.velocity = if in_reach { Vec3::ZERO } else { heading * AUTOPILOT_SPEED };
            if !in_reach {
                continue;
            }

            let started = (0..skills).any(|index| match self.world.command_skill(id, index, presenter) {
                Ok(_) => true,
                Err(reason) => {
                    trace!("skill {} refused: {}", index, reason);
                    false
                },
            });
            if !started {
                if let Err(reason) = self.world.command_basic(id, presenter) {
                    trace!("basic attack refused: {}", reason);
                }
            }
        }
        debug!("autopilot drove {} actors", self.piloted.len());
    }
}
