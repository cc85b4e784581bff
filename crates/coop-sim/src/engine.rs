//! Match session: the authoritative host.
//!
//! `MatchSession` owns the hecs world, the timer tables, the listener table
//! and the replication tracker. It processes queued commands, runs due
//! timers and systems in a fixed order, and produces a `MatchSnapshot` per
//! tick. Completely headless; the embedding engine reaches it through the
//! collaborator traits.

use std::collections::{BTreeMap, VecDeque};

use glam::Vec3;
use hecs::{Entity, World};
use log::{debug, info, warn};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use thiserror::Error;

use coop_core::commands::{ClientRequest, PlayerCommand};
use coop_core::components::Transform;
use coop_core::config::MatchConfig;
use coop_core::constants::TIME_EPSILON;
use coop_core::enums::{NetRole, TimerKey, WaveState};
use coop_core::events::{ChangeEvent, ChangeListener, CosmeticCue, GameEvent};
use coop_core::replication::ReplicationFrame;
use coop_core::state::{MatchCounters, MatchSnapshot, ScoreView};
use coop_core::types::{NetId, PlayerId, SimTime};

use crate::actors::{self, Character, PlayerController, Reaction, Reactions};
use crate::collab::Collaborators;
use crate::listeners::{ListenerTable, SubscriptionId};
use crate::scheduler::{self, TimerOwner, Timers};
use crate::systems;
use crate::systems::replication::ReplicationTracker;
use crate::world_setup;

/// Spacing between player spawn points along the x axis.
const PLAYER_SPAWN_SPACING: f32 = 200.0;

/// Rejected commands. The session logs these and carries on.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("{0} is already connected")]
    AlreadyJoined(PlayerId),
    #[error("{0} is not connected")]
    UnknownPlayer(PlayerId),
    #[error("{0} does not control a pawn")]
    NoPawn(PlayerId),
    #[error("{0} has no weapon")]
    NoWeapon(PlayerId),
    #[error("no actor {0}")]
    UnknownActor(NetId),
    #[error("{player} does not own weapon {weapon}")]
    NotWeaponOwner { player: PlayerId, weapon: NetId },
    #[error("the match has already started")]
    AlreadyStarted,
}

/// Match-level wave bookkeeping.
#[derive(Debug, Clone, Default)]
pub struct WaveMachine {
    pub state: WaveState,
    pub counters: MatchCounters,
    /// `NextWaveStart` and `BotSpawner`.
    pub timers: Timers,
    pub started: bool,
}

/// The authoritative match host.
pub struct MatchSession {
    pub(crate) world: World,
    pub(crate) time: SimTime,
    /// Gameplay clock. Equals the tick time except while a timer runs, when
    /// it is that timer's due time.
    pub(crate) now: f64,
    pub(crate) rng: ChaCha8Rng,
    pub(crate) config: MatchConfig,
    command_queue: VecDeque<PlayerCommand>,
    despawn_buffer: Vec<Entity>,
    next_net_id: u32,
    pub(crate) players: BTreeMap<PlayerId, Entity>,
    pub(crate) wave: WaveMachine,
    pub(crate) listeners: ListenerTable,
    replication: ReplicationTracker,
    pub(crate) events: Vec<GameEvent>,
    pub(crate) score: ScoreView,
    pub(crate) collab: Collaborators,
}

impl MatchSession {
    /// Create a session and run begin-play for the configured pickups.
    ///
    /// A config that fails validation is logged and replaced by the defaults,
    /// keeping its seed.
    pub fn new(config: MatchConfig, collab: Collaborators) -> Self {
        let config = match config.validate() {
            Ok(()) => config,
            Err(err) => {
                warn!("{err}; falling back to the default match config");
                MatchConfig {
                    seed: config.seed,
                    ..MatchConfig::default()
                }
            }
        };
        let mut session = Self {
            world: World::new(),
            time: SimTime::default(),
            now: 0.0,
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            config,
            command_queue: VecDeque::new(),
            despawn_buffer: Vec::new(),
            next_net_id: 1,
            players: BTreeMap::new(),
            wave: WaveMachine::default(),
            listeners: ListenerTable::new(),
            replication: ReplicationTracker::default(),
            events: Vec::new(),
            score: ScoreView::default(),
            collab,
        };

        let pickups = session.config.pickups.clone();
        for pickup in &pickups {
            let net_id = session.allocate_net_id();
            let entity = world_setup::spawn_pickup(&mut session.world, net_id, pickup);
            session.respawn_pickup(entity);
        }
        session
    }

    /// A session backed by the headless arena.
    pub fn headless(config: MatchConfig) -> Self {
        Self::new(config, Collaborators::arena())
    }

    /// The host owns canonical state.
    pub fn role(&self) -> NetRole {
        NetRole::Authority
    }

    /// Queue a command for processing at the next tick boundary.
    pub fn queue_command(&mut self, command: PlayerCommand) {
        self.command_queue.push_back(command);
    }

    /// Queue multiple commands.
    pub fn queue_commands(&mut self, commands: impl IntoIterator<Item = PlayerCommand>) {
        self.command_queue.extend(commands);
    }

    /// Advance the match by one tick and return the resulting snapshot.
    pub fn tick(&mut self) -> MatchSnapshot {
        self.now = self.time.elapsed_secs;
        self.process_commands();
        self.run_systems();

        let frame = systems::replication::run(
            &self.world,
            &mut self.replication,
            self.wave.state,
            self.time.tick,
        );
        self.time.advance();

        let events = std::mem::take(&mut self.events);
        systems::snapshot::build_snapshot(
            &self.world,
            &self.time,
            &self.wave,
            &self.score,
            events,
            frame,
        )
    }

    /// Everything an observer connecting now needs, as one frame.
    pub fn full_state_frame(&self) -> ReplicationFrame {
        systems::replication::full_frame(&self.world, self.wave.state, self.time.tick)
    }

    pub fn time(&self) -> SimTime {
        self.time
    }

    /// Current gameplay clock in seconds.
    pub fn now(&self) -> f64 {
        self.now
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    pub fn wave_state(&self) -> WaveState {
        self.wave.state
    }

    pub fn counters(&self) -> MatchCounters {
        self.wave.counters
    }

    pub fn match_timers(&self) -> &Timers {
        &self.wave.timers
    }

    pub fn is_started(&self) -> bool {
        self.wave.started
    }

    pub fn score(&self) -> ScoreView {
        self.score
    }

    /// Entity of a replicated actor.
    pub fn find_actor(&self, net_id: NetId) -> Option<Entity> {
        actors::find_actor(&self.world, net_id)
    }

    pub fn net_id(&self, entity: Entity) -> Option<NetId> {
        actors::net_id_of(&self.world, entity)
    }

    /// Controller entity of a connected player.
    pub fn controller(&self, player: PlayerId) -> Option<Entity> {
        self.players.get(&player).copied()
    }

    /// The pawn a connected player controls.
    pub fn player_pawn(&self, player: PlayerId) -> Option<Entity> {
        let controller = self.controller(player)?;
        self.world.get::<&PlayerController>(controller).ok()?.pawn
    }

    /// The weapon held by a player's pawn.
    pub fn player_weapon(&self, player: PlayerId) -> Option<Entity> {
        let pawn = self.player_pawn(player)?;
        self.world.get::<&Character>(pawn).ok()?.weapon
    }

    /// Listen to changes of one actor, or of everything.
    pub fn subscribe(
        &mut self,
        actor: Option<NetId>,
        listener: Box<dyn ChangeListener>,
    ) -> SubscriptionId {
        self.listeners.subscribe(actor, listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.listeners.unsubscribe(id)
    }

    pub(crate) fn allocate_net_id(&mut self) -> NetId {
        let id = NetId(self.next_net_id);
        self.next_net_id += 1;
        id
    }

    pub(crate) fn play(&mut self, cue: CosmeticCue) {
        self.collab.cosmetics.play(&cue);
    }

    /// Deliver a change to listeners, then to the actor's own reactions.
    pub(crate) fn notify(&mut self, entity: Option<Entity>, change: ChangeEvent) {
        self.listeners.notify(&change);

        let (Some(entity), ChangeEvent::Health(changed)) = (entity, change) else {
            return;
        };
        let reactions = match self.world.get::<&Reactions>(entity) {
            Ok(reactions) => reactions.0.clone(),
            Err(_) => return,
        };
        for reaction in reactions {
            match reaction {
                Reaction::CharacterDeath => self.on_character_health_changed(entity, changed.health),
                Reaction::TrackerPulse => self.on_tracker_health_changed(entity, changed.health),
            }
        }
    }

    // ---- Timers ----

    /// Set (replace) a timer owned by `entity`.
    pub(crate) fn set_timer(&mut self, entity: Entity, key: TimerKey, delay: f64, period: Option<f64>) {
        let now = self.now;
        let updated = match self.world.get::<&mut Timers>(entity) {
            Ok(mut timers) => {
                timers.set(key, now, delay, period);
                true
            }
            Err(_) => false,
        };
        if !updated {
            let mut timers = Timers::default();
            timers.set(key, now, delay, period);
            if self.world.insert_one(entity, timers).is_err() {
                debug!("timer {key:?} set on a despawned entity");
            }
        }
    }

    /// Cancel a timer owned by `entity`. Idempotent.
    pub(crate) fn clear_timer(&mut self, entity: Entity, key: TimerKey) {
        if let Ok(mut timers) = self.world.get::<&mut Timers>(entity) {
            timers.clear(key);
        }
    }

    pub fn is_timer_active(&self, entity: Entity, key: TimerKey) -> bool {
        self.world
            .get::<&Timers>(entity)
            .map(|timers| timers.is_active(key))
            .unwrap_or(false)
    }

    /// Run every timer due by the current tick time, one at a time, each at
    /// its own due time.
    fn run_due_timers(&mut self) {
        let horizon = self.time.elapsed_secs + TIME_EPSILON;
        while let Some(due) = scheduler::next_due(&self.world, &self.wave.timers, horizon) {
            let fired = match due.owner {
                TimerOwner::Match => self.wave.timers.fire(due.key),
                TimerOwner::Actor(entity) => match self.world.get::<&mut Timers>(entity) {
                    Ok(mut timers) => timers.fire(due.key),
                    Err(_) => None,
                },
            };
            if fired.is_none() {
                continue;
            }
            self.now = due.due_at;
            self.dispatch_timer(due.owner, due.key);
        }
        self.now = self.time.elapsed_secs;
    }

    fn dispatch_timer(&mut self, owner: TimerOwner, key: TimerKey) {
        match (owner, key) {
            (TimerOwner::Match, TimerKey::NextWaveStart) => self.start_wave(),
            (TimerOwner::Match, TimerKey::BotSpawner) => self.spawn_tick(),
            (TimerOwner::Actor(entity), TimerKey::FireRepeat) => self.fire(entity),
            (TimerOwner::Actor(entity), TimerKey::PowerupTick) => self.tick_powerup(entity),
            (TimerOwner::Actor(entity), TimerKey::PickupRespawn) => self.respawn_pickup(entity),
            (TimerOwner::Actor(entity), TimerKey::PathRefresh) => self.refresh_path(entity),
            (TimerOwner::Actor(entity), TimerKey::SelfDestruct) => self.self_damage_tick(entity),
            (owner, key) => warn!("no handler for timer {key:?} on {owner:?}"),
        }
    }

    // ---- Commands ----

    fn process_commands(&mut self) {
        while let Some(command) = self.command_queue.pop_front() {
            if let Err(err) = self.handle_command(command) {
                warn!("command rejected: {err}");
            }
        }
    }

    /// Apply a single command immediately.
    pub fn handle_command(&mut self, command: PlayerCommand) -> Result<(), CommandError> {
        match command {
            PlayerCommand::Join { player } => {
                self.join(player)?;
            }
            PlayerCommand::Leave { player } => self.leave(player)?,
            PlayerCommand::StartMatch => self.start_match()?,
            PlayerCommand::StartFire { player } => {
                let weapon = self.require_weapon(player)?;
                self.start_firing(weapon);
            }
            PlayerCommand::StopFire { player } => {
                let weapon = self.require_weapon(player)?;
                self.stop_firing(weapon);
            }
            PlayerCommand::UpdateView {
                player,
                position,
                eye,
                aim,
            } => {
                let pawn = self.require_pawn(player)?;
                if let Ok(mut transform) = self.world.get::<&mut Transform>(pawn) {
                    let aim = aim.try_normalize().unwrap_or(transform.aim);
                    *transform = Transform { position, eye, aim };
                }
            }
            PlayerCommand::Request { player, request } => match request {
                ClientRequest::Fire { weapon } => self.handle_fire_request(player, weapon)?,
            },
        }
        Ok(())
    }

    fn require_pawn(&self, player: PlayerId) -> Result<Entity, CommandError> {
        if !self.players.contains_key(&player) {
            return Err(CommandError::UnknownPlayer(player));
        }
        self.player_pawn(player).ok_or(CommandError::NoPawn(player))
    }

    fn require_weapon(&self, player: PlayerId) -> Result<Entity, CommandError> {
        self.require_pawn(player)?;
        self.player_weapon(player).ok_or(CommandError::NoWeapon(player))
    }

    /// Connect a player: controller, character and weapon. Returns the pawn.
    pub fn join(&mut self, player: PlayerId) -> Result<Entity, CommandError> {
        if self.players.contains_key(&player) {
            return Err(CommandError::AlreadyJoined(player));
        }

        let controller_id = self.allocate_net_id();
        let controller = world_setup::spawn_controller(&mut self.world, controller_id, player);

        let slot = self.players.len() as f32;
        let position = Vec3::new(slot * PLAYER_SPAWN_SPACING, 0.0, 0.0);
        let pawn_id = self.allocate_net_id();
        let pawn = world_setup::spawn_character(&mut self.world, pawn_id, position, &self.config);

        let weapon_id = self.allocate_net_id();
        let weapon = world_setup::spawn_weapon(&mut self.world, weapon_id, pawn, &self.config, self.now);

        if let Ok(mut character) = self.world.get::<&mut Character>(pawn) {
            character.weapon = Some(weapon);
        }
        if let Ok(mut pc) = self.world.get::<&mut PlayerController>(controller) {
            pc.pawn = Some(pawn);
        }
        self.players.insert(player, controller);

        info!("{player} joined with pawn {pawn_id}");
        self.events.push(GameEvent::PlayerJoined {
            player,
            pawn: pawn_id,
        });
        Ok(pawn)
    }

    /// Disconnect a player. The pawn stays in the world, uncontrolled.
    pub fn leave(&mut self, player: PlayerId) -> Result<(), CommandError> {
        let controller = self
            .players
            .remove(&player)
            .ok_or(CommandError::UnknownPlayer(player))?;
        if let Some(weapon) = self.player_weapon_of(controller) {
            self.stop_firing(weapon);
        }
        if let Some(net_id) = self.net_id(controller) {
            self.listeners.drop_actor(net_id);
        }
        let _ = self.world.despawn(controller);
        info!("{player} left");
        self.events.push(GameEvent::PlayerLeft { player });
        Ok(())
    }

    fn player_weapon_of(&self, controller: Entity) -> Option<Entity> {
        let pawn = self.world.get::<&PlayerController>(controller).ok()?.pawn?;
        self.world.get::<&Character>(pawn).ok()?.weapon
    }

    // ---- Systems ----

    /// Run all systems in order.
    fn run_systems(&mut self) {
        // 1. Remove actors whose lifespan ran out
        let despawned = systems::cleanup::run(&mut self.world, &mut self.despawn_buffer, self.now);
        for net_id in despawned {
            self.listeners.drop_actor(net_id);
        }
        // 2. Timers
        self.run_due_timers();
        // 3. Begin-overlap edges
        for (trigger, other) in systems::overlap::run(&mut self.world) {
            self.on_begin_overlap(trigger, other);
        }
        // 4. Tracker steering
        self.steer_trackers();
        // 5. Movement integration
        systems::movement::run(&mut self.world, self.time.dt());
        // 6. Match checks
        self.run_match_checks();
    }
}
