//! Client-side mirror of the server's player table
//!
//! The local player is simulated here and reported to the server once per
//! fixed step. Remote players are only known through the server's relays;
//! their rendered position eases towards the last reported position.
//!
//! Relays carry no respawn flag, so a remote jump is told apart from running
//! by distance alone. A remote player killed within [`SNAP_DISTANCE`] of the
//! spawn point is therefore eased back instead of snapped, which shows as a
//! short slide on screen. The local player always snaps.

use crate::error::ClientError;
use crate::movement::{Body, MoveInput};
use log::{debug, warn};
use shared::map::MapData;
use shared::message::{
    DestroyPlayer, Heartbeat, Initialize, Message, MovePlayer, SpawnPlayer, UpdateHighScore,
    UpdateName, UpdateScore,
};
use shared::player::truncate_name;
use shared::{ClientId, Dispatcher, FixedTimestep, PlayerState};
use std::collections::BTreeMap;

/// Rate (per second) at which remote players close the gap to their target
pub const INTERP_SPEED: f32 = 20.0;
/// A remote jump farther than this is a respawn and is not smoothed
pub const SNAP_DISTANCE: f32 = 64.0;
/// Longest frame fed to local movement, so a stall cannot tunnel through tiles
const MAX_FRAME_DT: f32 = 0.1;
/// Sender id handed to client handlers; everything comes from the server
const FROM_SERVER: ClientId = -1;

/// A player as drawn on screen
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    /// Last known state; for remote players the position is the target
    pub player: PlayerState,
    pub render_x: f32,
    pub render_y: f32,
}

impl Entity {
    fn spawn(spawn: &SpawnPlayer) -> Self {
        let mut player = PlayerState::new(spawn.id, spawn.x, spawn.y);
        player.name = spawn.name.clone();
        player.high_score = spawn.high_score;
        Self {
            player,
            render_x: spawn.x,
            render_y: spawn.y,
        }
    }

    fn snap(&mut self) {
        self.render_x = self.player.x;
        self.render_y = self.player.y;
    }

    fn distance_to_target(&self) -> f32 {
        let dx = self.player.x - self.render_x;
        let dy = self.player.y - self.render_y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Everything the message handlers touch
struct WorldState {
    map: MapData,
    name: String,
    local_id: Option<ClientId>,
    entities: BTreeMap<ClientId, Entity>,
    body: Option<Body>,
    /// Replies produced by the message being handled
    replies: Vec<Message>,
    /// First contract violation seen while handling it
    fault: Option<ClientError>,
}

impl WorldState {
    fn entity_mut(&mut self, id: ClientId) -> Option<&mut Entity> {
        let entity = self.entities.get_mut(&id);
        if entity.is_none() {
            self.fault.get_or_insert(ClientError::UnknownEntity(id));
        }
        entity
    }
}

fn on_initialize(state: &mut WorldState, _: ClientId, init: Initialize) {
    debug!("Assigned id {}", init.id);
    state.local_id = Some(init.id);
    state.replies.push(
        UpdateName {
            id: init.id,
            name: state.name.clone(),
        }
        .into(),
    );
}

fn on_spawn(state: &mut WorldState, _: ClientId, spawn: SpawnPlayer) {
    if Some(spawn.id) == state.local_id {
        state.body = Some(Body::new(spawn.x, spawn.y));
    }
    if state.entities.insert(spawn.id, Entity::spawn(&spawn)).is_some() {
        warn!("Player {} spawned twice", spawn.id);
    }
}

fn on_destroy(state: &mut WorldState, _: ClientId, destroy: DestroyPlayer) {
    if state.entities.remove(&destroy.id).is_none() {
        state.fault = Some(ClientError::UnknownEntity(destroy.id));
        return;
    }
    if Some(destroy.id) == state.local_id {
        state.body = None;
    }
}

fn on_move(state: &mut WorldState, _: ClientId, update: MovePlayer) {
    let is_local = Some(update.id) == state.local_id;
    let Some(entity) = state.entities.get_mut(&update.id) else {
        state.fault = Some(ClientError::UnknownEntity(update.id));
        return;
    };
    entity.player.apply_report(&update);

    if is_local {
        // The server only moves us when it respawns us.
        if let Some(body) = state.body.as_mut() {
            body.teleport(
                update.x,
                update.y,
                update.direction,
                update.animation,
                update.grounded,
            );
        }
        entity.snap();
    } else if entity.distance_to_target() > SNAP_DISTANCE {
        entity.snap();
    }
}

fn on_score(state: &mut WorldState, _: ClientId, update: UpdateScore) {
    if let Some(entity) = state.entity_mut(update.id) {
        entity.player.score = update.score;
    }
}

fn on_high_score(state: &mut WorldState, _: ClientId, update: UpdateHighScore) {
    if let Some(entity) = state.entity_mut(update.id) {
        entity.player.high_score = update.high_score;
    }
}

fn on_name(state: &mut WorldState, _: ClientId, update: UpdateName) {
    if let Some(entity) = state.entity_mut(update.id) {
        entity.player.name = update.name;
    }
}

fn on_heartbeat(state: &mut WorldState, _: ClientId, _: Heartbeat) {
    state.replies.push(Heartbeat.into());
}

fn build_dispatcher() -> Dispatcher<WorldState> {
    Dispatcher::new()
        .register(on_initialize)
        .register(on_spawn)
        .register(on_destroy)
        .register(on_move)
        .register(on_score)
        .register(on_high_score)
        .register(on_name)
        .register(on_heartbeat)
}

pub struct ClientWorld {
    state: WorldState,
    dispatcher: Dispatcher<WorldState>,
    timestep: FixedTimestep,
}

impl ClientWorld {
    pub fn new(map: MapData, name: &str, tick_rate: u32) -> Self {
        Self {
            state: WorldState {
                map,
                name: truncate_name(name),
                local_id: None,
                entities: BTreeMap::new(),
                body: None,
                replies: Vec::new(),
                fault: None,
            },
            dispatcher: build_dispatcher(),
            timestep: FixedTimestep::from_rate(tick_rate),
        }
    }

    pub fn map(&self) -> &MapData {
        &self.state.map
    }

    pub fn local_id(&self) -> Option<ClientId> {
        self.state.local_id
    }

    pub fn entity(&self, id: ClientId) -> Option<&Entity> {
        self.state.entities.get(&id)
    }

    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.state.entities.values()
    }

    pub fn local_entity(&self) -> Option<&Entity> {
        self.state
            .local_id
            .and_then(|id| self.state.entities.get(&id))
    }

    /// Apply one message from the server and return any replies to send
    pub fn handle_message(&mut self, message: Message) -> Result<Vec<Message>, ClientError> {
        self.dispatcher
            .dispatch(&mut self.state, FROM_SERVER, message);

        let replies = std::mem::take(&mut self.state.replies);
        match self.state.fault.take() {
            Some(fault) => Err(fault),
            None => Ok(replies),
        }
    }

    /// Advance one rendered frame
    ///
    /// Moves the local player, eases remote players and returns one position
    /// report for every fixed step that elapsed.
    pub fn update(&mut self, input: MoveInput, dt: f32) -> Vec<Message> {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        let steps = self.timestep.advance_secs(dt);

        let mut reports = Vec::new();
        let state = &mut self.state;
        let local_id = state.local_id;

        if let (Some(id), Some(body)) = (local_id, state.body.as_mut()) {
            body.step(input, &state.map, dt.min(MAX_FRAME_DT));

            if let Some(entity) = state.entities.get_mut(&id) {
                let player = &mut entity.player;
                player.x = body.x;
                player.y = body.y;
                player.direction = body.direction;
                player.animation = body.animation;
                player.grounded = body.grounded;
                entity.snap();

                for _ in 0..steps {
                    reports.push(entity.player.move_message().into());
                }
            }
        }

        let alpha = 1.0 - (-INTERP_SPEED * dt).exp();
        for (id, entity) in state.entities.iter_mut() {
            if Some(*id) == local_id {
                continue;
            }
            entity.render_x += (entity.player.x - entity.render_x) * alpha;
            entity.render_y += (entity.player.y - entity.render_y) * alpha;
        }

        reports
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use shared::map::{TileData, TileEffect};
    use shared::{Animation, Direction, TICK_RATE};
    use std::collections::HashMap;

    fn world() -> ClientWorld {
        let palette = HashMap::from([
            ('.', TileData::new(false, TileEffect::None)),
            ('/', TileData::new(false, TileEffect::None)),
            ('#', TileData::new(true, TileEffect::None)),
        ]);
        let map = MapData::from_rows(16, &["........", "./......", "########"], palette).unwrap();
        ClientWorld::new(map, "Tester", TICK_RATE)
    }

    fn spawn(id: ClientId, x: f32, y: f32) -> Message {
        SpawnPlayer {
            id,
            x,
            y,
            name: format!("p{}", id),
            high_score: 0,
        }
        .into()
    }

    fn relay(id: ClientId, x: f32, y: f32) -> Message {
        MovePlayer {
            id,
            x,
            y,
            direction: Direction::Left,
            animation: Animation::Running,
            grounded: true,
        }
        .into()
    }

    /// A world that has joined as player 0, with remote player 1.
    fn joined() -> ClientWorld {
        let mut world = world();
        world.handle_message(Initialize { id: 0 }.into()).unwrap();
        world.handle_message(spawn(0, 24.0, 24.0)).unwrap();
        world.handle_message(spawn(1, 40.0, 24.0)).unwrap();
        world
    }

    #[test]
    fn test_initialize_announces_name() {
        let mut world = world();
        let replies = world.handle_message(Initialize { id: 4 }.into()).unwrap();

        assert_eq!(world.local_id(), Some(4));
        assert_eq!(
            replies,
            vec![Message::from(UpdateName {
                id: 4,
                name: "Tester".to_string()
            })]
        );
    }

    #[test]
    fn test_heartbeat_is_answered() {
        let mut world = world();
        let replies = world.handle_message(Heartbeat.into()).unwrap();
        assert_eq!(replies, vec![Message::Heartbeat(Heartbeat)]);
    }

    #[test]
    fn test_spawn_and_destroy() {
        let mut world = joined();
        assert_eq!(world.entities().count(), 2);
        assert_eq!(world.entity(1).unwrap().player.name, "p1");

        world.handle_message(DestroyPlayer { id: 1 }.into()).unwrap();
        assert!(world.entity(1).is_none());
    }

    #[test]
    fn test_unknown_entity_is_an_error() {
        let mut world = joined();

        let result = world.handle_message(UpdateScore { id: 9, score: 1 }.into());
        assert!(matches!(result, Err(ClientError::UnknownEntity(9))));

        let result = world.handle_message(relay(9, 0.0, 0.0));
        assert!(matches!(result, Err(ClientError::UnknownEntity(9))));

        let result = world.handle_message(DestroyPlayer { id: 9 }.into());
        assert!(matches!(result, Err(ClientError::UnknownEntity(9))));
    }

    #[test]
    fn test_scores_and_names_update() {
        let mut world = joined();
        world.handle_message(UpdateScore { id: 1, score: 990 }.into()).unwrap();
        world
            .handle_message(
                UpdateName {
                    id: 1,
                    name: "Remote".to_string(),
                }
                .into(),
            )
            .unwrap();

        let remote = &world.entity(1).unwrap().player;
        assert_eq!(remote.score, 990);
        assert_eq!(remote.name, "Remote");
    }

    #[test]
    fn test_remote_moves_are_smoothed() {
        let mut world = joined();
        world.handle_message(relay(1, 60.0, 24.0)).unwrap();

        let remote = world.entity(1).unwrap();
        assert_eq!(remote.render_x, 40.0);
        assert_eq!(remote.player.direction, Direction::Left);

        world.update(MoveInput::default(), 0.05);
        let x = world.entity(1).unwrap().render_x;
        assert!(x > 40.0 && x < 60.0, "rendered at {}", x);

        for _ in 0..60 {
            world.update(MoveInput::default(), 0.05);
        }
        assert_approx_eq!(world.entity(1).unwrap().render_x, 60.0, 0.01);
    }

    #[test]
    fn test_remote_respawn_snaps() {
        let mut world = joined();
        world.handle_message(relay(1, 40.0 + SNAP_DISTANCE + 1.0, 24.0)).unwrap();

        let remote = world.entity(1).unwrap();
        assert_eq!(remote.render_x, remote.player.x);
    }

    #[test]
    fn test_remote_reset_near_spawn_is_eased() {
        let mut world = joined();
        world.handle_message(relay(1, 24.0 + SNAP_DISTANCE - 8.0, 24.0)).unwrap();
        world.handle_message(relay(1, 24.0, 24.0)).unwrap();

        // Short jumps look like running, even when they were a kill.
        let remote = world.entity(1).unwrap();
        assert_eq!(remote.player.x, 24.0);
        assert_ne!(remote.render_x, remote.player.x);
    }

    #[test]
    fn test_local_move_is_a_reset() {
        let mut world = joined();
        world.update(MoveInput::from_keys(false, true, false), 0.2);

        world.handle_message(relay(0, 24.0, 24.0)).unwrap();

        let local = world.local_entity().unwrap();
        assert_eq!((local.render_x, local.render_y), (24.0, 24.0));
        assert_eq!((local.player.x, local.player.y), (24.0, 24.0));
    }

    #[test]
    fn test_reports_one_move_per_step() {
        let mut world = joined();

        // 50 ms per step at 20 Hz
        assert!(world.update(MoveInput::default(), 0.03).is_empty());
        let reports = world.update(MoveInput::default(), 0.03);
        assert_eq!(reports.len(), 1);

        let reports = world.update(MoveInput::default(), 0.1);
        assert_eq!(reports.len(), 2);
        match &reports[0] {
            Message::MovePlayer(report) => assert_eq!(report.id, 0),
            other => panic!("Expected MovePlayer, got {:?}", other),
        }
    }

    #[test]
    fn test_no_reports_before_spawn() {
        let mut world = world();
        world.handle_message(Initialize { id: 0 }.into()).unwrap();
        assert!(world.update(MoveInput::default(), 1.0).is_empty());
    }

    #[test]
    fn test_local_player_moves_with_input() {
        let mut world = joined();
        for _ in 0..30 {
            world.update(MoveInput::from_keys(false, true, false), 1.0 / 60.0);
        }
        let local = world.local_entity().unwrap();
        assert!(local.player.x > 24.0);
        assert_eq!(local.render_x, local.player.x);
        assert_eq!(local.player.direction, Direction::Right);
    }

    #[test]
    fn test_fault_does_not_leak_into_next_message() {
        let mut world = joined();
        assert!(world.handle_message(UpdateScore { id: 9, score: 1 }.into()).is_err());
        assert!(world.handle_message(UpdateScore { id: 1, score: 5 }.into()).is_ok());
    }

    #[test]
    fn test_unhandled_message_is_ignored() {
        let mut world = joined();
        let replies = world
            .handle_message(shared::message::Disconnect.into())
            .unwrap();
        assert!(replies.is_empty());
    }
}
