//! Tests for the match session: health ledger, waves, weapons, powerups,
//! tracker bots, replication and the observer mirror.

use std::cell::RefCell;
use std::rc::Rc;

use glam::Vec3;
use hecs::Entity;
use proptest::prelude::*;

use coop_core::commands::{ClientRequest, PlayerCommand};
use coop_core::components::{
    BulletSpread, Collider, Combatant, Lifespan, PowerupEffect, PowerupSession, PowerupSpec,
    TrackerState, Transform, TriggerSphere,
};
use coop_core::config::{MatchConfig, PickupConfig};
use coop_core::enums::{DamageKind, NetRole, SurfaceKind, TimerKey, WaveState};
use coop_core::events::{ChangeEvent, ChangeListener, CosmeticCue, GameEvent};
use coop_core::replication::{ActorKind, FieldValue, ReplicationFrame, ReplicationMessage};
use coop_core::types::{NetId, PlayerId, TeamId};

use crate::actors::{Character, Pickup, PlayerController, Powerup, Replicated, Weapon};
use crate::arena::LogCosmetics;
use crate::collab::{Collaborators, Cosmetics};
use crate::engine::{CommandError, MatchSession};
use crate::health::{damage_ledger, heal_ledger, DamageEvent};
use crate::listeners::ListenerTable;
use crate::observer::ObserverSession;
use crate::powerup::advance_session;
use crate::scheduler::{self, TimerOwner, Timers};
use crate::wave::bots_for_wave;
use crate::weapon::{first_shot_delay, update_spread};
use crate::world_setup;

const P1: PlayerId = PlayerId(1);
const P2: PlayerId = PlayerId(2);

// ---- Helpers ----

#[derive(Clone, Default)]
struct Recorder(Rc<RefCell<Vec<ChangeEvent>>>);

impl ChangeListener for Recorder {
    fn on_changed(&mut self, change: &ChangeEvent) {
        self.0.borrow_mut().push(*change);
    }
}

impl Recorder {
    fn events(&self) -> Vec<ChangeEvent> {
        self.0.borrow().clone()
    }

    fn health_deltas(&self) -> Vec<f32> {
        self.events()
            .iter()
            .filter_map(|e| match e {
                ChangeEvent::Health(changed) => Some(changed.delta),
                _ => None,
            })
            .collect()
    }
}

#[derive(Clone, Default)]
struct CueRecorder(Rc<RefCell<Vec<CosmeticCue>>>);

impl Cosmetics for CueRecorder {
    fn play(&mut self, cue: &CosmeticCue) {
        self.0.borrow_mut().push(*cue);
    }
}

/// Labels every change it sees, for ordering checks.
struct Tagged {
    label: &'static str,
    log: Rc<RefCell<Vec<&'static str>>>,
}

impl ChangeListener for Tagged {
    fn on_changed(&mut self, _change: &ChangeEvent) {
        self.log.borrow_mut().push(self.label);
    }
}

fn session() -> MatchSession {
    MatchSession::headless(MatchConfig::default())
}

/// A bare combatant with a sphere collider, not driven by any system.
fn spawn_dummy(
    session: &mut MatchSession,
    position: Vec3,
    team: TeamId,
    surface: SurfaceKind,
) -> Entity {
    let net_id = session.allocate_net_id();
    session.world.spawn((
        Replicated {
            net_id,
            kind: ActorKind::TrackerBot,
        },
        Combatant::new(100.0, team),
        Transform::at(position),
        Collider {
            radius: 42.0,
            surface,
        },
    ))
}

fn health(session: &MatchSession, entity: Entity) -> f32 {
    session.world.get::<&Combatant>(entity).unwrap().current_health
}

fn hit(amount: f32, causer: Option<Entity>) -> DamageEvent {
    DamageEvent {
        amount,
        instigator: None,
        causer,
        kind: DamageKind::Generic,
    }
}

fn kills(events: &[GameEvent]) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, GameEvent::ActorKilled(_)))
        .count()
}

fn wave_changes(events: &[GameEvent]) -> Vec<WaveState> {
    events
        .iter()
        .filter_map(|e| match e {
            GameEvent::WaveStateChanged { new, .. } => Some(*new),
            _ => None,
        })
        .collect()
}

fn weapon_state(session: &MatchSession, weapon: Entity) -> Weapon {
    *session.world.get::<&Weapon>(weapon).unwrap()
}

fn heal_spec(tick_interval: f64, total_ticks: u32) -> PowerupSpec {
    PowerupSpec {
        tick_interval,
        total_ticks,
        effect: PowerupEffect::Heal { per_tick: 10.0 },
    }
}

fn spawn_test_powerup(session: &mut MatchSession, spec: &PowerupSpec) -> Entity {
    let net_id = session.allocate_net_id();
    world_setup::spawn_powerup(&mut session.world, net_id, Vec3::ZERO, spec)
}

// ---- Health ledger ----

#[test]
fn test_damage_then_kill_scenario() {
    let mut session = session();
    let target = spawn_dummy(&mut session, Vec3::new(500.0, 0.0, 0.0), TeamId(1), SurfaceKind::Default);
    let attacker = spawn_dummy(&mut session, Vec3::new(-500.0, 0.0, 0.0), TeamId(2), SurfaceKind::Default);
    let recorder = Recorder::default();
    session.subscribe(None, Box::new(recorder.clone()));

    assert_eq!(session.apply_damage(target, hit(30.0, Some(attacker))), 30.0);
    assert_eq!(health(&session, target), 70.0);

    assert_eq!(session.apply_damage(target, hit(80.0, Some(attacker))), 70.0);
    assert_eq!(health(&session, target), 0.0);
    assert!(session.world.get::<&Combatant>(target).unwrap().is_dead);
    assert_eq!(kills(&session.events), 1);

    // Dead stays dead, and the kill is reported once
    assert_eq!(session.apply_damage(target, hit(10.0, Some(attacker))), 0.0);
    session.heal(target, 50.0);
    assert_eq!(health(&session, target), 0.0);
    assert_eq!(kills(&session.events), 1);

    assert_eq!(recorder.health_deltas(), vec![-30.0, -80.0]);
}

#[test]
fn test_kill_event_names_killer() {
    let mut session = session();
    let target = spawn_dummy(&mut session, Vec3::ZERO, TeamId(1), SurfaceKind::Default);
    let attacker = spawn_dummy(&mut session, Vec3::X * 300.0, TeamId(2), SurfaceKind::Default);
    let attacker_id = session.net_id(attacker);

    session.apply_damage(target, hit(500.0, Some(attacker)));

    match session.events.last() {
        Some(GameEvent::ActorKilled(killed)) => {
            assert_eq!(Some(killed.victim), session.net_id(target));
            assert_eq!(killed.killer, attacker_id);
            assert_eq!(killed.killer_controller, None);
        }
        other => panic!("expected a kill event, got {other:?}"),
    }
}

#[test]
fn test_non_positive_damage_is_ignored() {
    let mut session = session();
    let target = spawn_dummy(&mut session, Vec3::ZERO, TeamId(1), SurfaceKind::Default);
    let recorder = Recorder::default();
    session.subscribe(None, Box::new(recorder.clone()));

    assert_eq!(session.apply_damage(target, hit(0.0, None)), 0.0);
    assert_eq!(session.apply_damage(target, hit(-25.0, None)), 0.0);
    assert_eq!(health(&session, target), 100.0);
    assert!(recorder.events().is_empty());
}

#[test]
fn test_nan_amounts_leave_health_untouched() {
    let mut session = session();
    let target = spawn_dummy(&mut session, Vec3::ZERO, TeamId(1), SurfaceKind::Default);

    assert_eq!(session.apply_damage(target, hit(f32::NAN, None)), 0.0);
    assert_eq!(health(&session, target), 100.0);
    assert!(!session.world.get::<&Combatant>(target).unwrap().is_dead);

    session.apply_damage(target, hit(90.0, None));
    session.heal(target, f32::NAN);
    assert_eq!(health(&session, target), 10.0, "NaN heal must not restore health");

    let mut ledger = Combatant::new(100.0, TeamId(1));
    assert_eq!(damage_ledger(&mut ledger, f32::NAN), None);
    assert_eq!(heal_ledger(&mut ledger, f32::NAN), None);
    assert_eq!(ledger.current_health, 100.0);
}

#[test]
fn test_friendly_fire_suppressed() {
    let mut session = session();
    let target = spawn_dummy(&mut session, Vec3::ZERO, TeamId(1), SurfaceKind::Default);
    let teammate = spawn_dummy(&mut session, Vec3::X * 300.0, TeamId(1), SurfaceKind::Default);

    assert_eq!(session.apply_damage(target, hit(20.0, Some(teammate))), 0.0);
    assert_eq!(health(&session, target), 100.0);
}

#[test]
fn test_self_damage_and_anonymous_damage_apply() {
    let mut session = session();
    let target = spawn_dummy(&mut session, Vec3::ZERO, TeamId(1), SurfaceKind::Default);

    assert_eq!(session.apply_damage(target, hit(20.0, Some(target))), 20.0);
    assert_eq!(session.apply_damage(target, hit(15.0, None)), 15.0);
    assert_eq!(health(&session, target), 65.0);
}

#[test]
fn test_causer_without_ledger_counts_as_friendly() {
    let mut session = session();
    let target = spawn_dummy(&mut session, Vec3::ZERO, TeamId(1), SurfaceKind::Default);
    let prop = session.world.spawn((Transform::at(Vec3::X * 100.0),));

    assert!(session.is_friendly(Some(target), Some(prop)));
    assert!(session.is_friendly(None, Some(target)));
    assert_eq!(session.apply_damage(target, hit(20.0, Some(prop))), 0.0);
}

#[test]
fn test_heal_is_bounded_and_positive() {
    let mut session = session();
    let target = spawn_dummy(&mut session, Vec3::ZERO, TeamId(1), SurfaceKind::Default);
    let recorder = Recorder::default();
    session.subscribe(None, Box::new(recorder.clone()));

    session.apply_damage(target, hit(30.0, None));
    session.heal(target, 20.0);
    assert_eq!(health(&session, target), 90.0);
    session.heal(target, 50.0);
    assert_eq!(health(&session, target), 100.0);
    session.heal(target, -10.0);

    let deltas = recorder.health_deltas();
    assert_eq!(deltas.len(), 3);
    assert!(deltas[1] > 0.0 && deltas[2] > 0.0);
}

#[test]
fn test_radial_damage_hits_everything_in_range() {
    let mut session = session();
    let near = spawn_dummy(&mut session, Vec3::new(100.0, 0.0, 0.0), TeamId(1), SurfaceKind::Default);
    let edge = spawn_dummy(&mut session, Vec3::new(0.0, 230.0, 0.0), TeamId(1), SurfaceKind::Default);
    let far = spawn_dummy(&mut session, Vec3::new(0.0, 0.0, 900.0), TeamId(1), SurfaceKind::Default);

    let hits = session.apply_radial_damage(
        Vec3::ZERO,
        200.0,
        40.0,
        &[],
        None,
        None,
        DamageKind::Explosion,
    );

    assert_eq!(hits, 2);
    assert_eq!(health(&session, near), 60.0);
    assert_eq!(health(&session, edge), 60.0);
    assert_eq!(health(&session, far), 100.0);
}

#[test]
fn test_actor_without_net_id_takes_no_damage() {
    let mut session = session();
    let ghost = session.world.spawn((Combatant::new(100.0, TeamId(1)),));

    assert_eq!(session.apply_damage(ghost, hit(50.0, None)), 0.0);
    assert_eq!(health(&session, ghost), 100.0);
}

proptest! {
    #[test]
    fn prop_non_positive_damage_changes_nothing(
        current in 0.0f32..=100.0,
        amount in -1000.0f32..=0.0,
    ) {
        let mut combatant = Combatant::new(100.0, TeamId(1));
        combatant.current_health = current;
        let before = combatant;
        prop_assert!(damage_ledger(&mut combatant, amount).is_none());
        prop_assert_eq!(combatant, before);
    }

    #[test]
    fn prop_ledger_stays_clamped_and_dead_stays_dead(
        ops in prop::collection::vec((any::<bool>(), -50.0f32..150.0), 0..64),
    ) {
        let mut combatant = Combatant::new(100.0, TeamId(1));
        let mut kill_count = 0;
        for (is_damage, amount) in ops {
            let was_dead = combatant.is_dead;
            if is_damage {
                if let Some(outcome) = damage_ledger(&mut combatant, amount) {
                    if outcome.killed {
                        kill_count += 1;
                    }
                }
            } else {
                heal_ledger(&mut combatant, amount);
            }
            prop_assert!(combatant.current_health >= 0.0);
            prop_assert!(combatant.current_health <= combatant.max_health);
            prop_assert_eq!(combatant.is_dead, combatant.current_health == 0.0);
            if was_dead {
                prop_assert!(combatant.is_dead);
            }
        }
        prop_assert!(kill_count <= 1);
    }
}

// ---- Wave machine ----

#[test]
fn test_bots_per_wave() {
    assert_eq!(bots_for_wave(1, 2), 2);
    assert_eq!(bots_for_wave(3, 2), 6);
    assert_eq!(bots_for_wave(0, 2), 0);
}

#[test]
fn test_first_wave_spawn_sequence() {
    let mut session = session();
    session.start_match().unwrap();
    assert_eq!(session.wave_state(), WaveState::WaitingToStart);

    session.start_wave();
    assert_eq!(session.counters().wave_count, 1);
    assert_eq!(session.counters().bots_remaining_to_spawn, 2);
    assert_eq!(session.wave_state(), WaveState::WaveInProgress);
    assert!(session.match_timers().is_active(TimerKey::BotSpawner));

    session.spawn_tick();
    assert_eq!(session.counters().bots_remaining_to_spawn, 1);
    assert_eq!(session.wave_state(), WaveState::WaveInProgress);

    session.spawn_tick();
    assert_eq!(session.counters().bots_remaining_to_spawn, 0);
    assert_eq!(session.wave_state(), WaveState::WaitingToComplete);
    assert!(!session.match_timers().is_active(TimerKey::BotSpawner));

    let bots = session
        .world
        .query::<&TrackerState>()
        .iter()
        .count();
    assert_eq!(bots, 2);
}

#[test]
fn test_start_match_does_not_renotify_initial_state() {
    let mut session = session();
    let recorder = Recorder::default();
    session.subscribe(None, Box::new(recorder.clone()));

    session.start_match().unwrap();

    assert!(recorder.events().is_empty());
    assert!(session.match_timers().is_active(TimerKey::NextWaveStart));
    assert_eq!(session.start_match(), Err(CommandError::AlreadyStarted));
}

#[test]
fn test_wave_cycle_over_ticks() {
    let mut session = session();
    session.queue_commands([PlayerCommand::Join { player: P1 }, PlayerCommand::StartMatch]);

    let mut events = Vec::new();
    for _ in 0..200 {
        let snap = session.tick();
        events.extend(snap.events);
        if snap.wave_state == WaveState::WaitingToComplete {
            break;
        }
    }
    assert_eq!(session.wave_state(), WaveState::WaitingToComplete);
    let spawned = events
        .iter()
        .filter(|e| matches!(e, GameEvent::BotSpawned { wave: 1, .. }))
        .count();
    assert_eq!(spawned, 2);

    let bots: Vec<Entity> = session
        .world
        .query::<&TrackerState>()
        .iter()
        .map(|(entity, _)| entity)
        .collect();
    for bot in bots {
        session.apply_damage(bot, hit(500.0, None));
    }

    let snap = session.tick();
    assert_eq!(
        wave_changes(&snap.events),
        vec![WaveState::WaveComplete, WaveState::WaitingToStart]
    );
    assert_eq!(snap.score.bots_killed, 2);
    assert!(session.match_timers().is_active(TimerKey::NextWaveStart));
}

#[test]
fn test_wave_complete_waits_for_live_bots() {
    let mut session = session();
    session.join(P1).unwrap();
    session.start_match().unwrap();
    session.wave.timers.clear(TimerKey::NextWaveStart);
    session.start_wave();
    session.spawn_tick();
    session.spawn_tick();

    session.tick();
    assert_eq!(session.wave_state(), WaveState::WaitingToComplete);
}

#[test]
fn test_character_death_ends_match() {
    let mut session = session();
    session.queue_commands([PlayerCommand::Join { player: P1 }, PlayerCommand::StartMatch]);
    session.tick();
    let pawn = session.player_pawn(P1).unwrap();
    let weapon = session.player_weapon(P1).unwrap();

    session.apply_damage(pawn, hit(200.0, None));
    assert!(session.world.get::<&Character>(pawn).unwrap().died);
    assert_eq!(session.player_pawn(P1), None);
    assert!(session.world.get::<&Lifespan>(pawn).is_ok());
    assert!(session.world.get::<&Lifespan>(weapon).is_ok());
    assert!(session.world.get::<&Collider>(pawn).is_err(), "corpse keeps no collision");
    let position = session.world.get::<&Transform>(pawn).unwrap().position;
    let overlapping = session
        .collab
        .hit_test
        .overlap_sphere(&session.world, position, 50.0, &[]);
    assert!(!overlapping.contains(&pawn));

    let snap = session.tick();
    assert_eq!(snap.wave_state, WaveState::GameOver);
    assert_eq!(snap.players[0].pawn, None);
    assert_eq!(snap.score.players_lost, 1);
}

#[test]
fn test_game_over_is_terminal() {
    let mut session = session();
    session.queue_commands([PlayerCommand::Join { player: P1 }, PlayerCommand::StartMatch]);
    session.tick();
    let pawn = session.player_pawn(P1).unwrap();
    session.apply_damage(pawn, hit(200.0, None));
    session.tick();
    assert_eq!(session.wave_state(), WaveState::GameOver);
    assert!(!session.match_timers().is_active(TimerKey::NextWaveStart));
    assert!(!session.match_timers().is_active(TimerKey::BotSpawner));

    session.prepare_for_next_wave();
    session.start_wave();
    session.spawn_tick();
    for _ in 0..300 {
        let snap = session.tick();
        assert_eq!(snap.wave_state, WaveState::GameOver);
    }
    assert_eq!(session.counters().wave_count, 0);
    assert!(session.match_timers().is_empty());
}

#[test]
fn test_wave_check_runs_before_player_check() {
    let mut session = session();
    session.join(P1).unwrap();
    session.start_match().unwrap();
    session.wave.timers.clear(TimerKey::NextWaveStart);
    session.start_wave();
    session.spawn_tick();
    session.spawn_tick();

    let bots: Vec<Entity> = session
        .world
        .query::<&TrackerState>()
        .iter()
        .map(|(entity, _)| entity)
        .collect();
    for bot in bots {
        session.apply_damage(bot, hit(500.0, None));
    }
    let pawn = session.player_pawn(P1).unwrap();
    session.apply_damage(pawn, hit(500.0, None));
    session.events.clear();

    let snap = session.tick();
    assert_eq!(
        wave_changes(&snap.events),
        vec![
            WaveState::WaveComplete,
            WaveState::WaitingToStart,
            WaveState::GameOver
        ]
    );
}

#[test]
fn test_no_checks_before_match_start() {
    let mut session = session();
    for _ in 0..120 {
        session.tick();
    }
    assert!(!session.is_started());
    assert_eq!(session.wave_state(), WaveState::WaitingToStart);

    // Started with nobody connected: nobody is alive
    session.queue_command(PlayerCommand::StartMatch);
    let snap = session.tick();
    assert_eq!(snap.wave_state, WaveState::GameOver);
}

#[test]
fn test_last_player_leaving_ends_match() {
    let mut session = session();
    session.queue_commands([PlayerCommand::Join { player: P1 }, PlayerCommand::StartMatch]);
    session.tick();
    assert_eq!(session.wave_state(), WaveState::WaitingToStart);

    session.queue_command(PlayerCommand::Leave { player: P1 });
    let snap = session.tick();
    assert!(snap.players.is_empty());
    assert_eq!(snap.wave_state, WaveState::GameOver);
}

// ---- Sessions and commands ----

#[test]
fn test_join_spawns_controller_pawn_and_weapon() {
    let mut session = session();
    session.queue_command(PlayerCommand::Join { player: P1 });
    let snap = session.tick();

    assert_eq!(snap.players.len(), 1);
    assert_eq!(snap.players[0].player, P1);
    assert!(snap.players[0].pawn.is_some());
    assert_eq!(snap.combatants.len(), 1);
    assert_eq!(snap.combatants[0].team, session.config().player_team);

    let pawn = session.player_pawn(P1).unwrap();
    let weapon = session.player_weapon(P1).unwrap();
    assert_eq!(weapon_state(&session, weapon).owner, Some(pawn));
    assert!(matches!(
        snap.events[0],
        GameEvent::PlayerJoined { player: P1, .. }
    ));
}

#[test]
fn test_command_errors() {
    let mut session = session();
    session.join(P1).unwrap();

    assert_eq!(session.join(P1), Err(CommandError::AlreadyJoined(P1)));
    assert_eq!(session.leave(P2), Err(CommandError::UnknownPlayer(P2)));
    assert_eq!(
        session.handle_command(PlayerCommand::StartFire { player: P2 }),
        Err(CommandError::UnknownPlayer(P2))
    );
    assert_eq!(
        session.handle_command(PlayerCommand::Request {
            player: P1,
            request: ClientRequest::Fire { weapon: NetId(999) },
        }),
        Err(CommandError::UnknownActor(NetId(999)))
    );
}

#[test]
fn test_update_view_moves_pawn() {
    let mut session = session();
    session.join(P1).unwrap();
    session
        .handle_command(PlayerCommand::UpdateView {
            player: P1,
            position: Vec3::new(10.0, 20.0, 0.0),
            eye: Vec3::new(10.0, 20.0, 64.0),
            aim: Vec3::new(0.0, 2.0, 0.0),
        })
        .unwrap();

    let pawn = session.player_pawn(P1).unwrap();
    let transform = *session.world.get::<&Transform>(pawn).unwrap();
    assert_eq!(transform.position, Vec3::new(10.0, 20.0, 0.0));
    assert_eq!(transform.aim, Vec3::Y);
}

#[test]
fn test_invalid_config_falls_back_to_defaults() {
    let mut config = MatchConfig {
        seed: 11,
        ..Default::default()
    };
    config.weapon.fire_rate = 0.0;
    config.waves.bot_spawn_interval = f64::NAN;

    let session = MatchSession::headless(config);

    assert_eq!(session.config().seed, 11);
    assert_eq!(session.config().weapon, MatchConfig::default().weapon);
    assert!(session.config().validate().is_ok());
}

// ---- Weapon ----

#[test]
fn test_spread_ramps_to_max_under_sustained_fire() {
    let mut spread = BulletSpread::default();
    let mut previous = spread.current;
    for _ in 0..20 {
        update_spread(&mut spread, 0.1);
        if previous < spread.max {
            assert!(spread.current > previous);
        }
        assert!(spread.current <= spread.max);
        previous = spread.current;
    }
    assert_eq!(spread.current, 0.1);
}

#[test]
fn test_spread_recovers_after_pause() {
    let mut spread = BulletSpread::default();
    for _ in 0..10 {
        update_spread(&mut spread, 0.1);
    }
    update_spread(&mut spread, 2.0);
    assert_eq!(spread.current, spread.min);
}

#[test]
fn test_first_shot_delay_preserves_fire_rate() {
    assert!((first_shot_delay(1.0, 0.1, 1.05) - 0.05).abs() < 1e-9);
    assert_eq!(first_shot_delay(1.0, 0.1, 3.0), 0.0);
}

proptest! {
    #[test]
    fn prop_spread_stays_within_bounds(gaps in prop::collection::vec(0.0f32..1.0, 1..200)) {
        let mut spread = BulletSpread::default();
        for gap in gaps {
            update_spread(&mut spread, gap);
            prop_assert!(spread.current >= spread.min);
            prop_assert!(spread.current <= spread.max);
        }
    }
}

#[test]
fn test_fire_hits_target_in_front() {
    let mut session = session();
    session.join(P1).unwrap();
    let weapon = session.player_weapon(P1).unwrap();
    let target = spawn_dummy(&mut session, Vec3::new(200.0, 0.0, 64.0), TeamId(9), SurfaceKind::FleshDefault);

    session.fire(weapon);

    assert_eq!(health(&session, target), 80.0);
    let trace = weapon_state(&session, weapon).hit_trace.unwrap();
    assert_eq!(trace.sequence, 1);
    assert_eq!(trace.surface, SurfaceKind::FleshDefault);
}

#[test]
fn test_vulnerable_surface_multiplies_damage() {
    let mut session = session();
    session.join(P1).unwrap();
    let weapon = session.player_weapon(P1).unwrap();
    let target = spawn_dummy(&mut session, Vec3::new(200.0, 0.0, 64.0), TeamId(9), SurfaceKind::FleshVulnerable);

    session.fire(weapon);

    assert_eq!(health(&session, target), 20.0);
}

#[test]
fn test_miss_still_records_shot() {
    let mut session = session();
    session.join(P1).unwrap();
    let weapon = session.player_weapon(P1).unwrap();
    session.now = 1.5;
    session.fire(weapon);

    let w = weapon_state(&session, weapon);
    assert_eq!(w.last_fire_time, 1.5);
    let trace = w.hit_trace.unwrap();
    assert_eq!(trace.sequence, 1);
    assert_eq!(trace.surface, SurfaceKind::Default);
    assert!(trace.end_point.length() > 9_000.0);

    session.fire(weapon);
    assert_eq!(weapon_state(&session, weapon).hit_trace.unwrap().sequence, 2);
}

#[test]
fn test_fire_plays_cues() {
    let cues = CueRecorder::default();
    let mut session = MatchSession::new(
        MatchConfig::default(),
        Collaborators::arena_with_cosmetics(Box::new(cues.clone())),
    );
    session.join(P1).unwrap();
    let weapon = session.player_weapon(P1).unwrap();
    spawn_dummy(&mut session, Vec3::new(200.0, 0.0, 64.0), TeamId(9), SurfaceKind::FleshDefault);

    session.fire(weapon);

    let played = cues.0.borrow();
    assert!(played.iter().any(|c| matches!(c, CosmeticCue::Impact { .. })));
    assert!(played.iter().any(|c| matches!(c, CosmeticCue::MuzzleFlash { .. })));
    assert!(played.iter().any(|c| matches!(c, CosmeticCue::Trail { .. })));
    assert!(played
        .iter()
        .any(|c| matches!(c, CosmeticCue::CameraShake { player: P1 })));
}

#[test]
fn test_start_firing_respects_cool_down() {
    let mut session = session();
    session.join(P1).unwrap();
    let weapon = session.player_weapon(P1).unwrap();

    session.start_firing(weapon);

    let timers = session.world.get::<&Timers>(weapon).unwrap();
    let timer = timers.get(TimerKey::FireRepeat).unwrap();
    assert!((timer.due_at - 0.1).abs() < 1e-9);
    assert_eq!(timer.period, Some(0.1));
}

#[test]
fn test_held_trigger_fires_at_fire_rate_until_released() {
    let mut session = session();
    session.queue_commands([
        PlayerCommand::Join { player: P1 },
        PlayerCommand::StartFire { player: P1 },
    ]);
    for _ in 0..31 {
        session.tick();
    }
    let weapon = session.player_weapon(P1).unwrap();
    let fired = weapon_state(&session, weapon).hit_trace.unwrap().sequence;
    assert!((9..=10).contains(&fired), "fired {fired} shots in one second");

    session.queue_command(PlayerCommand::StopFire { player: P1 });
    for _ in 0..30 {
        session.tick();
    }
    assert_eq!(weapon_state(&session, weapon).hit_trace.unwrap().sequence, fired);

    // Releasing twice is harmless
    session.stop_firing(weapon);
    session.stop_firing(weapon);
    assert!(!session.is_timer_active(weapon, TimerKey::FireRepeat));
}

#[test]
fn test_fire_request_for_foreign_weapon_rejected() {
    let mut session = session();
    session.join(P1).unwrap();
    session.join(P2).unwrap();
    let own = session.player_weapon(P1).unwrap();
    let foreign = session.player_weapon(P2).unwrap();
    let own_id = session.net_id(own).unwrap();
    let foreign_id = session.net_id(foreign).unwrap();

    let rejected = session.handle_command(PlayerCommand::Request {
        player: P1,
        request: ClientRequest::Fire { weapon: foreign_id },
    });
    assert_eq!(
        rejected,
        Err(CommandError::NotWeaponOwner {
            player: P1,
            weapon: foreign_id
        })
    );
    assert!(weapon_state(&session, foreign).hit_trace.is_none());

    session
        .handle_command(PlayerCommand::Request {
            player: P1,
            request: ClientRequest::Fire { weapon: own_id },
        })
        .unwrap();
    assert_eq!(weapon_state(&session, own).hit_trace.unwrap().sequence, 1);
}

#[test]
fn test_teammate_in_line_of_fire_is_not_damaged() {
    let mut session = session();
    session.join(P1).unwrap();
    session.join(P2).unwrap();
    let weapon = session.player_weapon(P1).unwrap();
    let mate = session.player_pawn(P2).unwrap();

    session.fire(weapon);

    assert_eq!(health(&session, mate), 100.0);
}

// ---- Powerups ----

#[test]
fn test_powerup_with_zero_interval_ticks_once() {
    let mut session = session();
    let target = spawn_dummy(&mut session, Vec3::ZERO, TeamId(1), SurfaceKind::Default);
    session.apply_damage(target, hit(50.0, None));
    let powerup = spawn_test_powerup(&mut session, &heal_spec(0.0, 1));
    let recorder = Recorder::default();
    session.subscribe(None, Box::new(recorder.clone()));

    session.activate_powerup(powerup, Some(target));

    let state = session.world.get::<&Powerup>(powerup).unwrap().session;
    assert_eq!(state.ticks_processed, 1);
    assert!(!state.is_active);
    assert_eq!(health(&session, target), 60.0);
    let toggles: Vec<bool> = recorder
        .events()
        .iter()
        .filter_map(|e| match e {
            ChangeEvent::PowerupActive { active, .. } => Some(*active),
            _ => None,
        })
        .collect();
    assert_eq!(toggles, vec![true, false]);
}

#[test]
fn test_powerup_ticks_on_interval_then_expires() {
    let mut session = session();
    let target = spawn_dummy(&mut session, Vec3::ZERO, TeamId(1), SurfaceKind::Default);
    session.apply_damage(target, hit(50.0, None));
    let powerup = spawn_test_powerup(&mut session, &heal_spec(0.5, 4));

    session.activate_powerup(powerup, Some(target));
    assert!(session.world.get::<&Powerup>(powerup).unwrap().session.is_active);
    assert_eq!(health(&session, target), 50.0);

    let mut expired_events = 0;
    for _ in 0..64 {
        let snap = session.tick();
        expired_events += snap
            .events
            .iter()
            .filter(|e| matches!(e, GameEvent::PowerupExpired { .. }))
            .count();
    }
    assert_eq!(health(&session, target), 90.0);
    assert_eq!(expired_events, 1);
    assert!(!session.world.contains(powerup));
}

#[test]
fn test_powerup_is_single_use() {
    let mut session = session();
    let target = spawn_dummy(&mut session, Vec3::ZERO, TeamId(1), SurfaceKind::Default);
    session.apply_damage(target, hit(50.0, None));
    let powerup = spawn_test_powerup(&mut session, &heal_spec(0.0, 1));

    session.activate_powerup(powerup, Some(target));
    session.activate_powerup(powerup, Some(target));

    assert_eq!(health(&session, target), 60.0);
}

#[test]
fn test_powerup_without_target_stays_inert() {
    let mut session = session();
    let powerup = spawn_test_powerup(&mut session, &heal_spec(0.0, 1));

    session.activate_powerup(powerup, None);

    let state = session.world.get::<&Powerup>(powerup).unwrap().session;
    assert!(!state.activated);
    assert!(!state.is_active);
}

#[test]
fn test_speed_boost_restored_on_expiry() {
    let mut session = session();
    let pawn = session.join(P1).unwrap();
    let spec = PowerupSpec {
        tick_interval: 0.5,
        total_ticks: 2,
        effect: PowerupEffect::SpeedBoost { multiplier: 2.0 },
    };
    let powerup = spawn_test_powerup(&mut session, &spec);

    session.activate_powerup(powerup, Some(pawn));
    let boosted = session
        .world
        .get::<&coop_core::components::Movement>(pawn)
        .unwrap()
        .speed_multiplier;
    assert_eq!(boosted, 2.0);

    for _ in 0..40 {
        session.tick();
    }
    let restored = session
        .world
        .get::<&coop_core::components::Movement>(pawn)
        .unwrap()
        .speed_multiplier;
    assert_eq!(restored, 1.0);
}

proptest! {
    #[test]
    fn prop_powerup_ticks_never_exceed_total(total in 0u32..12, steps in 0usize..30) {
        let mut state = PowerupSession::from_spec(&heal_spec(0.5, total));
        state.is_active = true;
        for _ in 0..steps {
            let expired = advance_session(&mut state);
            prop_assert!(state.ticks_processed <= state.total_ticks);
            prop_assert_eq!(expired, state.ticks_processed >= state.total_ticks);
        }
    }
}

#[test]
fn test_pickup_hands_out_powerup_and_respawns() {
    let config = MatchConfig {
        pickups: vec![PickupConfig {
            position: Vec3::new(300.0, 0.0, 0.0),
            ..Default::default()
        }],
        ..Default::default()
    };
    let mut session = MatchSession::headless(config);
    let pickup = session
        .world
        .query::<&Pickup>()
        .iter()
        .map(|(entity, _)| entity)
        .next()
        .unwrap();
    let first = session.world.get::<&Pickup>(pickup).unwrap().instance.unwrap();

    session.queue_command(PlayerCommand::Join { player: P1 });
    session.tick();
    assert_eq!(session.world.get::<&Pickup>(pickup).unwrap().instance, Some(first));

    session.queue_command(PlayerCommand::UpdateView {
        player: P1,
        position: Vec3::new(300.0, 0.0, 0.0),
        eye: Vec3::new(300.0, 0.0, 64.0),
        aim: Vec3::X,
    });
    session.tick();
    assert_eq!(session.world.get::<&Pickup>(pickup).unwrap().instance, None);
    assert!(session.world.get::<&Powerup>(first).unwrap().session.is_active);
    assert!(session.is_timer_active(pickup, TimerKey::PickupRespawn));

    let mut respawned = 0;
    for _ in 0..160 {
        let snap = session.tick();
        respawned += snap
            .events
            .iter()
            .filter(|e| matches!(e, GameEvent::PickupRespawned { .. }))
            .count();
    }
    assert_eq!(respawned, 1);
    let second = session.world.get::<&Pickup>(pickup).unwrap().instance.unwrap();
    assert_ne!(second, first);
    assert!(!session.world.get::<&Powerup>(second).unwrap().session.activated);
}

#[test]
fn test_pickup_without_powerup_never_produces_one() {
    let config = MatchConfig {
        pickups: vec![PickupConfig {
            position: Vec3::ZERO,
            powerup: None,
            ..Default::default()
        }],
        ..Default::default()
    };
    let mut session = MatchSession::headless(config);
    session.queue_command(PlayerCommand::Join { player: P1 });

    for _ in 0..200 {
        let snap = session.tick();
        assert!(!snap
            .events
            .iter()
            .any(|e| matches!(e, GameEvent::PickupRespawned { .. })));
    }
    let instances = session
        .world
        .query::<&Pickup>()
        .iter()
        .filter(|(_, p)| p.instance.is_some())
        .count();
    assert_eq!(instances, 0);
    assert_eq!(session.world.query::<&Powerup>().iter().count(), 0);
}

// ---- Tracker bot ----

fn spawn_test_tracker(session: &mut MatchSession, position: Vec3) -> Entity {
    let net_id = session.allocate_net_id();
    let config = session.config.clone();
    world_setup::spawn_tracker(&mut session.world, net_id, position, &config)
}

#[test]
fn test_tracker_explodes_once_and_spares_friends() {
    let mut session = session();
    let pawn = session.join(P1).unwrap();
    let bot = spawn_test_tracker(&mut session, Vec3::new(150.0, 0.0, 0.0));
    let friend = spawn_test_tracker(&mut session, Vec3::new(150.0, 100.0, 0.0));

    session.apply_damage(bot, hit(500.0, None));

    assert!(session.world.get::<&TrackerState>(bot).unwrap().exploded);
    assert_eq!(health(&session, pawn), 0.0);
    assert_eq!(health(&session, friend), 100.0);
    assert!(session.world.get::<&Lifespan>(bot).is_ok());

    session.self_destruct(bot);
    session.apply_damage(bot, hit(10.0, None));
    let explosions = session
        .events
        .iter()
        .filter(|e| matches!(e, GameEvent::Exploded { .. }))
        .count();
    assert_eq!(explosions, 1);
}

#[test]
fn test_tracker_debris_does_not_block_shots() {
    let mut session = session();
    session.join(P1).unwrap();
    let weapon = session.player_weapon(P1).unwrap();
    {
        let mut w = session.world.get::<&mut Weapon>(weapon).unwrap();
        w.spread.current = 0.0;
        w.spread.min = 0.0;
    }
    let bot = spawn_test_tracker(&mut session, Vec3::new(300.0, 0.0, 64.0));
    let target = spawn_dummy(&mut session, Vec3::new(600.0, 0.0, 64.0), TeamId(9), SurfaceKind::FleshDefault);

    session.self_destruct(bot);
    assert!(session.world.get::<&Collider>(bot).is_err());
    assert!(session.world.get::<&TriggerSphere>(bot).is_err());
    assert!(session.world.get::<&Lifespan>(bot).is_ok());

    session.fire(weapon);

    assert_eq!(health(&session, target), 80.0);
    let trace = weapon_state(&session, weapon).hit_trace.unwrap();
    assert!(trace.end_point.x > 500.0, "shot ended at {}", trace.end_point);
}

#[test]
fn test_tracker_counts_down_near_player() {
    let mut session = session();
    session.join(P1).unwrap();
    let bot = spawn_test_tracker(&mut session, Vec3::new(150.0, 0.0, 0.0));

    session.tick();
    assert!(session.world.get::<&TrackerState>(bot).unwrap().self_destruct_started);
    assert!(session.is_timer_active(bot, TimerKey::SelfDestruct));

    session.tick();
    assert_eq!(health(&session, bot), 80.0);

    for _ in 0..15 {
        session.tick();
    }
    assert_eq!(health(&session, bot), 60.0);
}

#[test]
fn test_tracker_ignores_non_player_overlap() {
    let mut session = session();
    let bot = spawn_test_tracker(&mut session, Vec3::ZERO);
    spawn_dummy(&mut session, Vec3::new(100.0, 0.0, 0.0), TeamId(7), SurfaceKind::Default);

    session.tick();

    assert!(!session.world.get::<&TrackerState>(bot).unwrap().self_destruct_started);
    assert!(!session.is_timer_active(bot, TimerKey::SelfDestruct));
}

#[test]
fn test_tracker_paths_toward_nearest_player() {
    let mut session = session();
    session.join(P1).unwrap();
    session.join(P2).unwrap();
    let bot = spawn_test_tracker(&mut session, Vec3::new(1_000.0, 0.0, 0.0));
    let near_pawn = session.player_pawn(P2).unwrap();
    let near = session.world.get::<&Transform>(near_pawn).unwrap().position;

    session.refresh_path(bot);

    assert_eq!(session.world.get::<&TrackerState>(bot).unwrap().next_path_point, near);
    assert!(session.is_timer_active(bot, TimerKey::PathRefresh));
}

#[test]
fn test_tracker_without_target_holds_position() {
    let mut session = session();
    let origin = Vec3::new(1_000.0, 0.0, 0.0);
    let bot = spawn_test_tracker(&mut session, origin);

    session.refresh_path(bot);

    assert_eq!(session.world.get::<&TrackerState>(bot).unwrap().next_path_point, origin);
    assert!(!session.is_timer_active(bot, TimerKey::PathRefresh));
}

#[test]
fn test_tracker_rolls_toward_target() {
    let mut session = session();
    session.join(P1).unwrap();
    let start = Vec3::new(1_000.0, 0.0, 0.0);
    let bot = spawn_test_tracker(&mut session, start);
    session.refresh_path(bot);

    for _ in 0..30 {
        session.tick();
    }

    let position = session.world.get::<&Transform>(bot).unwrap().position;
    assert!(position.x < start.x);
}

// ---- Scheduler and listeners ----

#[test]
fn test_timer_table_set_clear_fire() {
    let mut timers = Timers::default();
    timers.set(TimerKey::PowerupTick, 1.0, 0.5, Some(0.5));
    assert!(timers.is_active(TimerKey::PowerupTick));

    // Re-arming replaces
    timers.set(TimerKey::PowerupTick, 1.0, 2.0, None);
    assert_eq!(timers.get(TimerKey::PowerupTick).unwrap().due_at, 3.0);

    assert_eq!(timers.fire(TimerKey::PowerupTick), Some(3.0));
    assert!(!timers.is_active(TimerKey::PowerupTick));

    timers.set(TimerKey::FireRepeat, 0.0, 0.0, Some(0.1));
    assert_eq!(timers.fire(TimerKey::FireRepeat), Some(0.0));
    assert!((timers.get(TimerKey::FireRepeat).unwrap().due_at - 0.1).abs() < 1e-9);

    assert!(timers.clear(TimerKey::FireRepeat));
    assert!(!timers.clear(TimerKey::FireRepeat));
    assert!(timers.is_empty());
}

#[test]
fn test_non_positive_period_is_one_shot() {
    let mut timers = Timers::default();
    timers.set(TimerKey::SelfDestruct, 0.0, 1.0, Some(0.0));
    timers.fire(TimerKey::SelfDestruct);
    assert!(!timers.is_active(TimerKey::SelfDestruct));
}

#[test]
fn test_due_timers_ordered_by_time_then_owner() {
    let mut world = hecs::World::new();
    let mut late = Timers::default();
    late.set(TimerKey::FireRepeat, 0.0, 1.0, None);
    world.spawn((
        Replicated {
            net_id: NetId(5),
            kind: ActorKind::Pickup,
        },
        late,
    ));
    let mut early = Timers::default();
    early.set(TimerKey::PickupRespawn, 0.0, 0.5, None);
    let early_entity = world.spawn((
        Replicated {
            net_id: NetId(9),
            kind: ActorKind::Pickup,
        },
        early,
    ));
    let mut match_timers = Timers::default();
    match_timers.set(TimerKey::NextWaveStart, 0.0, 0.5, None);

    let first = scheduler::next_due(&world, &match_timers, 2.0).unwrap();
    assert_eq!(first.owner, TimerOwner::Match);
    assert_eq!(first.due_at, 0.5);

    match_timers.clear(TimerKey::NextWaveStart);
    let second = scheduler::next_due(&world, &match_timers, 2.0).unwrap();
    assert_eq!(second.owner, TimerOwner::Actor(early_entity));

    assert!(scheduler::next_due(&world, &match_timers, 0.25).is_none());
}

#[test]
fn test_listeners_notified_in_subscription_order() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let mut table = ListenerTable::new();
    table.subscribe(None, Box::new(Tagged { label: "a", log: log.clone() }));
    let b = table.subscribe(Some(NetId(1)), Box::new(Tagged { label: "b", log: log.clone() }));
    table.subscribe(None, Box::new(Tagged { label: "c", log: log.clone() }));

    let died = |actor| ChangeEvent::Died { actor };
    table.notify(&died(NetId(1)));
    table.notify(&died(NetId(2)));
    assert_eq!(*log.borrow(), vec!["a", "b", "c", "a", "c"]);

    assert!(table.unsubscribe(b));
    assert!(!table.unsubscribe(b));
    log.borrow_mut().clear();
    table.notify(&died(NetId(1)));
    assert_eq!(*log.borrow(), vec!["a", "c"]);
}

#[test]
fn test_dropped_actor_listeners_removed() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let mut table = ListenerTable::new();
    table.subscribe(Some(NetId(3)), Box::new(Tagged { label: "x", log: log.clone() }));
    table.subscribe(None, Box::new(Tagged { label: "all", log: log.clone() }));

    table.drop_actor(NetId(3));

    assert_eq!(table.len(), 1);
}

// ---- Replication and observers ----

fn spawn_messages(frame: &ReplicationFrame) -> Vec<NetId> {
    frame
        .messages
        .iter()
        .filter_map(|m| match m {
            ReplicationMessage::Spawn { net_id, .. } => Some(*net_id),
            _ => None,
        })
        .collect()
}

#[test]
fn test_replication_sends_only_changes() {
    let mut session = session();
    session.queue_command(PlayerCommand::Join { player: P1 });
    let first = session.tick();
    assert_eq!(spawn_messages(&first.replication).len(), 3);
    assert!(first
        .replication
        .messages
        .iter()
        .any(|m| matches!(m, ReplicationMessage::WaveState { .. })));

    let quiet = session.tick();
    assert!(quiet.replication.is_empty());

    let pawn = session.player_pawn(P1).unwrap();
    session.apply_damage(pawn, hit(25.0, None));
    let changed = session.tick();
    let pawn_id = session.net_id(pawn).unwrap();
    assert_eq!(
        changed.replication.messages,
        vec![ReplicationMessage::Field {
            net_id: pawn_id,
            value: FieldValue::Health(75.0),
        }]
    );
}

#[test]
fn test_despawn_replicated_after_lifespan() {
    let mut session = session();
    let target = spawn_dummy(&mut session, Vec3::ZERO, TeamId(1), SurfaceKind::Default);
    let target_id = session.net_id(target).unwrap();
    session.tick();
    session.world.insert_one(target, Lifespan { expires_at: 0.0 }).unwrap();

    let snap = session.tick();

    assert!(snap
        .replication
        .messages
        .contains(&ReplicationMessage::Despawn { net_id: target_id }));
    assert_eq!(session.find_actor(target_id), None);
}

#[test]
fn test_observer_converges_on_host_state() {
    let mut host = MatchSession::headless(MatchConfig {
        seed: 3,
        ..Default::default()
    });
    let mut observer = ObserverSession::new(P1, Box::new(LogCosmetics));
    assert_eq!(observer.role(), NetRole::Observer);
    assert_eq!(host.role(), NetRole::Authority);

    host.queue_commands([
        PlayerCommand::Join { player: P1 },
        PlayerCommand::StartMatch,
        PlayerCommand::UpdateView {
            player: P1,
            position: Vec3::ZERO,
            eye: Vec3::new(0.0, 0.0, 64.0),
            aim: Vec3::new(2_000.0, 0.0, -64.0),
        },
        PlayerCommand::StartFire { player: P1 },
    ]);

    for _ in 0..240 {
        let snap = host.tick();
        let bytes = snap.replication.encode().unwrap();
        observer.apply_bytes(&bytes).unwrap();

        assert_eq!(observer.wave_state(), snap.wave_state);
        assert_eq!(observer.last_tick(), Some(snap.time.tick - 1));
        for combatant in &snap.combatants {
            assert_eq!(observer.health(combatant.net_id), Some(combatant.health));
        }
        let mirrored = observer.actor_ids().count();
        assert_eq!(mirrored, host.world().query::<&Replicated>().iter().count());
    }
}

#[test]
fn test_late_observer_catches_up_from_full_frame() {
    let mut host = session();
    host.queue_commands([PlayerCommand::Join { player: P1 }, PlayerCommand::StartMatch]);
    for _ in 0..90 {
        host.tick();
    }
    let pawn = host.player_pawn(P1).unwrap();
    host.apply_damage(pawn, hit(40.0, None));

    let mut observer = ObserverSession::new(P2, Box::new(LogCosmetics));
    observer.apply_frame(&host.full_state_frame());

    let pawn_id = host.net_id(pawn).unwrap();
    assert_eq!(observer.health(pawn_id), Some(60.0));
    assert_eq!(observer.died(pawn_id), Some(false));
    assert_eq!(observer.wave_state(), host.wave_state());
}

fn character_frame(tick: u64, health: f32) -> ReplicationFrame {
    ReplicationFrame {
        tick,
        messages: vec![ReplicationMessage::Field {
            net_id: NetId(5),
            value: FieldValue::Health(health),
        }],
    }
}

#[test]
fn test_observer_callbacks_only_on_change() {
    let mut observer = ObserverSession::new(P1, Box::new(LogCosmetics));
    let recorder = Recorder::default();
    observer.subscribe(None, Box::new(recorder.clone()));

    observer.apply_frame(&ReplicationFrame {
        tick: 0,
        messages: vec![
            ReplicationMessage::Spawn {
                net_id: NetId(5),
                kind: ActorKind::Character,
            },
            ReplicationMessage::Field {
                net_id: NetId(5),
                value: FieldValue::Health(100.0),
            },
            ReplicationMessage::Field {
                net_id: NetId(5),
                value: FieldValue::Died(false),
            },
        ],
    });
    assert!(recorder.events().is_empty());

    observer.apply_frame(&character_frame(1, 70.0));
    observer.apply_frame(&character_frame(2, 70.0));
    assert_eq!(recorder.health_deltas(), vec![-30.0]);

    observer.apply_frame(&ReplicationFrame {
        tick: 3,
        messages: vec![ReplicationMessage::Field {
            net_id: NetId(5),
            value: FieldValue::Died(true),
        }],
    });
    assert!(recorder
        .events()
        .contains(&ChangeEvent::Died { actor: NetId(5) }));
    assert_eq!(observer.died(NetId(5)), Some(true));
}

#[test]
fn test_observer_drops_fields_for_unknown_actors() {
    let mut observer = ObserverSession::new(P1, Box::new(LogCosmetics));
    observer.apply_frame(&character_frame(0, 50.0));
    assert_eq!(observer.health(NetId(5)), None);
    assert!(observer.apply_bytes(&[]).is_err());
}

#[test]
fn test_hit_trace_replay_is_cosmetic_only() {
    let cues = CueRecorder::default();
    let mut observer = ObserverSession::new(P1, Box::new(cues.clone()));
    observer.apply_frame(&ReplicationFrame {
        tick: 0,
        messages: vec![
            ReplicationMessage::Spawn {
                net_id: NetId(5),
                kind: ActorKind::Character,
            },
            ReplicationMessage::Field {
                net_id: NetId(5),
                value: FieldValue::Health(100.0),
            },
            ReplicationMessage::Spawn {
                net_id: NetId(6),
                kind: ActorKind::Weapon {
                    owner: Some(NetId(5)),
                    time_between_shots: 0.1,
                },
            },
        ],
    });

    let trace = coop_core::components::HitTrace {
        end_point: Vec3::new(10.0, 0.0, 0.0),
        surface: SurfaceKind::FleshDefault,
        sequence: 1,
    };
    observer.apply_frame(&ReplicationFrame {
        tick: 1,
        messages: vec![ReplicationMessage::Field {
            net_id: NetId(6),
            value: FieldValue::HitTrace(trace),
        }],
    });

    assert_eq!(observer.health(NetId(5)), Some(100.0));
    assert_eq!(observer.hit_trace(NetId(6)), Some(trace));
    let played = cues.0.borrow();
    assert!(played.contains(&CosmeticCue::MuzzleFlash { weapon: NetId(6) }));
    assert!(played.contains(&CosmeticCue::Impact {
        surface: SurfaceKind::FleshDefault,
        point: trace.end_point,
    }));
    assert!(observer.drain_requests().is_empty());
}

#[test]
fn test_observer_forwards_fire_at_weapon_rate() {
    let mut observer = ObserverSession::new(P1, Box::new(LogCosmetics));
    observer.apply_frame(&ReplicationFrame {
        tick: 0,
        messages: vec![ReplicationMessage::Spawn {
            net_id: NetId(6),
            kind: ActorKind::Weapon {
                owner: Some(NetId(5)),
                time_between_shots: 0.1,
            },
        }],
    });

    observer.start_firing(NetId(6));
    observer.advance(0.35);
    let requests = observer.drain_requests();
    assert_eq!(requests.len(), 4);
    assert!(requests.iter().all(|r| matches!(
        r,
        PlayerCommand::Request {
            player: P1,
            request: ClientRequest::Fire { weapon: NetId(6) },
        }
    )));

    observer.stop_firing(NetId(6));
    observer.stop_firing(NetId(6));
    observer.advance(1.0);
    assert!(observer.drain_requests().is_empty());

    // Unknown weapons are never forwarded
    observer.start_firing(NetId(77));
    observer.advance(1.0);
    assert!(observer.drain_requests().is_empty());
}

#[test]
fn test_observer_ignores_weapon_without_usable_fire_rate() {
    let mut observer = ObserverSession::new(P1, Box::new(LogCosmetics));
    observer.apply_frame(&ReplicationFrame {
        tick: 0,
        messages: vec![
            ReplicationMessage::Spawn {
                net_id: NetId(6),
                kind: ActorKind::Weapon {
                    owner: Some(NetId(5)),
                    time_between_shots: 0.0,
                },
            },
            ReplicationMessage::Spawn {
                net_id: NetId(7),
                kind: ActorKind::Weapon {
                    owner: Some(NetId(5)),
                    time_between_shots: f64::INFINITY,
                },
            },
        ],
    });

    observer.start_firing(NetId(6));
    observer.start_firing(NetId(7));
    observer.advance(1.0);

    assert!(observer.drain_requests().is_empty());
}

#[test]
fn test_forwarded_requests_fire_on_host() {
    let mut host = session();
    let mut observer = ObserverSession::new(P1, Box::new(LogCosmetics));
    host.queue_command(PlayerCommand::Join { player: P1 });
    let snap = host.tick();
    observer.apply_frame(&snap.replication);

    let weapon = host.player_weapon(P1).unwrap();
    let weapon_id = host.net_id(weapon).unwrap();
    observer.fire(weapon_id);
    host.queue_commands(observer.drain_requests());

    let snap = host.tick();
    observer.apply_frame(&snap.replication);
    assert_eq!(observer.hit_trace(weapon_id).map(|t| t.sequence), Some(1));
}

// ---- Determinism ----

fn busy_match(seed: u64) -> MatchSession {
    let mut session = MatchSession::headless(MatchConfig {
        seed,
        ..Default::default()
    });
    session.queue_commands([
        PlayerCommand::Join { player: P1 },
        PlayerCommand::Join { player: P2 },
        PlayerCommand::StartMatch,
        PlayerCommand::StartFire { player: P1 },
    ]);
    session
}

#[test]
fn test_determinism_same_seed() {
    let mut a = busy_match(12345);
    let mut b = busy_match(12345);

    for _ in 0..300 {
        let json_a = serde_json::to_string(&a.tick()).unwrap();
        let json_b = serde_json::to_string(&b.tick()).unwrap();
        assert_eq!(json_a, json_b, "Snapshots diverged with same seed");
    }
}

#[test]
fn test_snapshot_serializes() {
    let mut session = busy_match(1);
    let snap = session.tick();
    let json = serde_json::to_string(&snap).unwrap();
    assert!(json.contains("WaitingToStart"));
    assert!(snap.time.tick == 1);
    assert_eq!(
        session
            .world
            .query::<&PlayerController>()
            .iter()
            .count(),
        2
    );
}
