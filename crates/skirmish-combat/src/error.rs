//! Error types for the combat core.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why an attack or skill request was refused.
///
/// The core treats a refusal as a no-op; the reason is surfaced for UI feedback.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum ActionRejected {
    /// Not enough MP for the skill.
    #[error("insufficient resource: need {required} MP, have {available}")]
    InsufficientResource {
        /// MP the skill costs after reductions.
        required: i32,
        /// MP currently available.
        available: i32,
    },
    /// Skill still cooling down.
    #[error("skill on cooldown: {remaining_ticks} ticks remaining")]
    OnCooldown {
        /// Cooldown intervals left.
        remaining_ticks: u32,
    },
    /// Silenced actors cannot cast skills.
    #[error("silenced")]
    Silenced,
    /// A required item is missing.
    #[error("missing prerequisite: {item}")]
    MissingPrerequisite {
        /// Key of the missing item.
        item: String,
    },
    /// Another sequence is still running.
    #[error("another attack sequence is active")]
    Busy,
    /// Dead or frozen actors cannot act.
    #[error("actor is incapacitated")]
    Incapacitated,
    /// No skill in that slot.
    #[error("unknown skill slot {0}")]
    UnknownSkill(usize),
}

/// Result type for attack and skill requests.
pub type ActionResult<T> = Result<T, ActionRejected>;

/// Errors raised while loading or validating combat configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Profile file not found: {0}")]
    NotFound(PathBuf),

    /// Failed to read file.
    #[error("Failed to read profile file: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse TOML.
    #[error("Failed to parse profile TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// Validation failure.
    #[error("Invalid profile '{profile}': {reason}")]
    Invalid {
        /// Profile name.
        profile: String,
        /// What is wrong.
        reason: String,
    },

    /// Two profiles share a name.
    #[error("Duplicate profile name: {0}")]
    DuplicateProfile(String),

    /// Lookup of a profile that was never registered.
    #[error("Unknown profile: {0}")]
    UnknownProfile(String),
}

impl ConfigError {
    pub(crate) fn invalid(profile: &str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            profile: profile.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
