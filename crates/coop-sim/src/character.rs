//! Player character reactions.

use hecs::Entity;
use log::info;

use coop_core::components::{Collider, Lifespan, Velocity};
use coop_core::events::ChangeEvent;

use crate::actors::{self, Character, PlayerController};
use crate::engine::MatchSession;

impl MatchSession {
    /// Death handling for a player body: flag it, stop its weapon, release
    /// it from its controller and let the corpse linger without collision.
    pub(crate) fn on_character_health_changed(&mut self, pawn: Entity, health: f32) {
        if health > 0.0 {
            return;
        }
        let weapon = match self.world.get::<&mut Character>(pawn) {
            Ok(mut character) if !character.died => {
                character.died = true;
                character.weapon
            }
            _ => return,
        };

        if let Some(weapon) = weapon {
            self.stop_firing(weapon);
        }
        if let Some(controller) = actors::controller_of(&self.world, pawn) {
            if let Ok(mut pc) = self.world.get::<&mut PlayerController>(controller) {
                info!("{} lost their pawn", pc.player);
                pc.pawn = None;
            }
        }

        let expires_at = self.now + self.config.character.corpse_lifespan;
        let _ = self.world.insert_one(pawn, Lifespan { expires_at });
        // Corpses no longer block traces or show up in overlaps.
        let _ = self.world.remove_one::<Collider>(pawn);
        if let Ok(mut velocity) = self.world.get::<&mut Velocity>(pawn) {
            velocity.0 = glam::Vec3::ZERO;
        }
        if let Some(weapon) = weapon {
            let _ = self.world.insert_one(weapon, Lifespan { expires_at });
        }

        if let Some(actor) = self.net_id(pawn) {
            self.notify(Some(pawn), ChangeEvent::Died { actor });
        }
    }
}
