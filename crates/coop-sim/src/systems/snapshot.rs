//! Snapshot system: queries the ECS world and builds a complete MatchSnapshot.
//!
//! This system is read-only and never modifies the world.

use hecs::World;

use coop_core::components::{Bot, Combatant, Transform};
use coop_core::events::GameEvent;
use coop_core::replication::ReplicationFrame;
use coop_core::state::*;
use coop_core::types::SimTime;

use crate::actors::{net_id_of, PlayerController, Replicated};
use crate::engine::WaveMachine;

/// Build a complete MatchSnapshot from the current world state.
pub fn build_snapshot(
    world: &World,
    time: &SimTime,
    wave: &WaveMachine,
    score: &ScoreView,
    events: Vec<GameEvent>,
    replication: ReplicationFrame,
) -> MatchSnapshot {
    MatchSnapshot {
        time: *time,
        started: wave.started,
        wave_state: wave.state,
        counters: wave.counters,
        combatants: build_combatants(world),
        players: build_players(world),
        score: *score,
        events,
        replication,
    }
}

/// Every actor with a health ledger, ordered by replicated id.
fn build_combatants(world: &World) -> Vec<CombatantView> {
    let mut views: Vec<CombatantView> = world
        .query::<(&Replicated, &Combatant, &Transform, Option<&Bot>)>()
        .iter()
        .map(|(_, (replicated, combatant, transform, bot))| CombatantView {
            net_id: replicated.net_id,
            position: transform.position,
            health: combatant.current_health,
            max_health: combatant.max_health,
            team: combatant.team,
            is_dead: combatant.is_dead,
            is_bot: bot.is_some(),
        })
        .collect();

    views.sort_by_key(|v| v.net_id);
    views
}

/// Connected players, ordered by player id.
fn build_players(world: &World) -> Vec<PlayerView> {
    let mut views: Vec<PlayerView> = world
        .query::<(&Replicated, &PlayerController)>()
        .iter()
        .map(|(_, (replicated, pc))| PlayerView {
            player: pc.player,
            controller: replicated.net_id,
            pawn: pc.pawn.and_then(|pawn| net_id_of(world, pawn)),
            kills: pc.kills,
        })
        .collect();

    views.sort_by_key(|v| v.player);
    views
}
