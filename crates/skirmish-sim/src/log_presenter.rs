//! Presenter that writes presentation requests to the log.

use glam::{Quat, Vec3};
use skirmish_combat::CombatPresenter;
use skirmish_common::EntityId;
use tracing::{debug, info, trace};

/// Logs every request through `tracing` and keeps simple counters.
#[derive(Debug, Default)]
pub struct LogPresenter {
    /// Animation requests seen.
    pub animations: usize,
    /// Projectiles launched.
    pub projectiles: usize,
    /// Death notifications seen.
    pub deaths: usize,
}

impl LogPresenter {
    /// Create a presenter with zeroed counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl CombatPresenter for LogPresenter {
    fn play_animation(&mut self, entity: EntityId, key: &str) {
        self.animations += 1;
        debug!("{} plays '{}'", entity, key);
    }

    fn spawn_effect(&mut self, key: &str, position: Vec3, _rotation: Quat) {
        trace!("effect '{}' at {:?}", key, position);
    }

    fn spawn_projectile(&mut self, key: &str, origin: Vec3, _rotation: Quat, owner: EntityId) {
        self.projectiles += 1;
        debug!("{} fires '{}' from {:?}", owner, key, origin);
    }

    fn show_damage_popup(&mut self, text: &str, position: Vec3) {
        debug!("popup '{}' at {:?}", text, position);
    }

    fn play_sound(&mut self, key: &str) {
        trace!("sound '{}'", key);
    }

    fn notify_death(&mut self, entity: EntityId) {
        self.deaths += 1;
        info!("{} is down", entity);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let mut presenter = LogPresenter::new();
        let id = EntityId::from_raw(9);
        presenter.play_animation(id, "slash");
        presenter.spawn_projectile("bolt", Vec3::ZERO, Quat::IDENTITY, id);
        presenter.notify_death(id);
        assert_eq!((presenter.animations, presenter.projectiles, presenter.deaths), (1, 1, 1));
    }
}
