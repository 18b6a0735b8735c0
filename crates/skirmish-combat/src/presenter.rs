//! Outbound presentation requests.
//!
//! The core never renders, plays audio or spawns scene objects itself. It
//! calls a [`CombatPresenter`] fire-and-forget; every method defaults to a
//! no-op so collaborators implement only what they care about.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};
use skirmish_common::EntityId;

/// Receiver of presentation requests.
pub trait CombatPresenter {
    /// Play an animation on an entity.
    fn play_animation(&mut self, _entity: EntityId, _key: &str) {}

    /// Spawn a visual effect.
    fn spawn_effect(&mut self, _key: &str, _position: Vec3, _rotation: Quat) {}

    /// A projectile entered the world.
    fn spawn_projectile(&mut self, _key: &str, _origin: Vec3, _rotation: Quat, _owner: EntityId) {}

    /// Show floating text.
    fn show_damage_popup(&mut self, _text: &str, _position: Vec3) {}

    /// Play a sound.
    fn play_sound(&mut self, _key: &str) {}

    /// An entity died. Called exactly once per entity.
    fn notify_death(&mut self, _entity: EntityId) {}
}

/// Presenter that drops everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullPresenter;

impl CombatPresenter for NullPresenter {}

/// One recorded presentation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PresentationEvent {
    /// Animation request.
    Animation {
        /// Animated entity.
        entity: EntityId,
        /// Animation key.
        key: String,
    },
    /// Effect spawn.
    Effect {
        /// Effect key.
        key: String,
        /// Position.
        position: Vec3,
    },
    /// Projectile spawn.
    Projectile {
        /// Projectile key.
        key: String,
        /// Spawn point.
        origin: Vec3,
        /// Owner.
        owner: EntityId,
    },
    /// Floating text.
    Popup {
        /// Text shown.
        text: String,
        /// Position.
        position: Vec3,
    },
    /// Sound request.
    Sound {
        /// Sound key.
        key: String,
    },
    /// Death notification.
    Death {
        /// Dead entity.
        entity: EntityId,
    },
}

/// Presenter that records every request, for tests and the harness log.
#[derive(Debug, Clone, Default)]
pub struct RecordingPresenter {
    /// Recorded requests, oldest first.
    pub events: Vec<PresentationEvent>,
}

impl RecordingPresenter {
    /// Create an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Death notifications recorded for an entity.
    #[must_use]
    pub fn deaths_of(&self, entity: EntityId) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, PresentationEvent::Death { entity: dead } if *dead == entity))
            .count()
    }

    /// Popup texts, oldest first.
    pub fn popups(&self) -> impl Iterator<Item = &str> {
        self.events.iter().filter_map(|e| match e {
            PresentationEvent::Popup { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }

    /// Take and clear the recorded requests.
    pub fn drain(&mut self) -> Vec<PresentationEvent> {
        std::mem::take(&mut self.events)
    }
}

impl CombatPresenter for RecordingPresenter {
    fn play_animation(&mut self, entity: EntityId, key: &str) {
        self.events.push(PresentationEvent::Animation {
            entity,
            key: key.to_string(),
        });
    }

    fn spawn_effect(&mut self, key: &str, position: Vec3, _rotation: Quat) {
        self.events.push(PresentationEvent::Effect {
            key: key.to_string(),
            position,
        });
    }

    fn spawn_projectile(&mut self, key: &str, origin: Vec3, _rotation: Quat, owner: EntityId) {
        self.events.push(PresentationEvent::Projectile {
            key: key.to_string(),
            origin,
            owner,
        });
    }

    fn show_damage_popup(&mut self, text: &str, position: Vec3) {
        self.events.push(PresentationEvent::Popup {
            text: text.to_string(),
            position,
        });
    }

    fn play_sound(&mut self, key: &str) {
        self.events.push(PresentationEvent::Sound {
            key: key.to_string(),
        });
    }

    fn notify_death(&mut self, entity: EntityId) {
        self.events.push(PresentationEvent::Death { entity });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_presenter() {
        let mut presenter = RecordingPresenter::new();
        let id = EntityId::from_raw(3);
        presenter.play_animation(id, "slash");
        presenter.show_damage_popup("12", Vec3::ZERO);
        presenter.notify_death(id);

        assert_eq!(presenter.deaths_of(id), 1);
        assert_eq!(presenter.popups().collect::<Vec<_>>(), vec!["12"]);
        assert_eq!(presenter.drain().len(), 3);
        assert!(presenter.events.is_empty());
    }

    #[test]
    fn test_null_presenter_accepts_everything() {
        let mut presenter = NullPresenter;
        presenter.play_sound("hit");
        presenter.notify_death(EntityId::from_raw(1));
    }
}
