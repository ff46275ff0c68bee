//! Authoritative game state and the per-tick kill and scoring rules
//!
//! Every mutating operation returns the messages it produces as a list of
//! [`GameMessage`]s instead of sending them directly, which keeps the
//! simulation free of I/O and lets the server loop route the output through
//! the client manager.

use log::{debug, info};
use shared::map::{MapData, TileEffect};
use shared::message::{
    DestroyPlayer, Heartbeat, Message, MovePlayer, UpdateHighScore, UpdateName, UpdateScore,
};
use shared::{
    ClientId, PlayerState, HEARTBEAT_INTERVAL, PLAYER_HITBOX, SCORE_DECAY_AMOUNT,
    SCORE_DECAY_INTERVAL, STARTING_SCORE,
};
use std::collections::BTreeMap;
use std::time::Duration;

/// Messages produced by the simulation for delivery to clients
#[derive(Debug, Clone, PartialEq)]
pub enum GameMessage {
    SendMessage {
        to: ClientId,
        message: Message,
    },
    BroadcastMessage {
        message: Message,
        exclude: Option<ClientId>,
    },
}

impl GameMessage {
    pub fn to(to: ClientId, message: impl Into<Message>) -> Self {
        GameMessage::SendMessage {
            to,
            message: message.into(),
        }
    }

    pub fn to_all(message: impl Into<Message>) -> Self {
        GameMessage::BroadcastMessage {
            message: message.into(),
            exclude: None,
        }
    }

    pub fn to_all_except(exclude: ClientId, message: impl Into<Message>) -> Self {
        GameMessage::BroadcastMessage {
            message: message.into(),
            exclude: Some(exclude),
        }
    }
}

/// Canonical player table plus the map and tick timers
///
/// Players are kept in a `BTreeMap` so each tick visits them in ascending id
/// order, which makes the output of a tick deterministic.
#[derive(Debug, Clone)]
pub struct GameState {
    map: MapData,
    players: BTreeMap<ClientId, PlayerState>,
    tick: u64,
    tick_period: Duration,
    heartbeat_timer: Duration,
    score_decay_timer: Duration,
}

impl GameState {
    pub fn new(map: MapData, tick_rate: u32) -> Self {
        Self {
            map,
            players: BTreeMap::new(),
            tick: 0,
            tick_period: Duration::from_secs(1) / tick_rate.max(1),
            heartbeat_timer: Duration::ZERO,
            score_decay_timer: Duration::ZERO,
        }
    }

    pub fn map(&self) -> &MapData {
        &self.map
    }

    /// Number of ticks simulated so far
    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    pub fn player(&self, id: ClientId) -> Option<&PlayerState> {
        self.players.get(&id)
    }

    pub fn players(&self) -> impl Iterator<Item = &PlayerState> {
        self.players.values()
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    /// Registers a default player at the map spawn
    ///
    /// Everyone else learns about the newcomer, then the newcomer receives a
    /// spawn for every player in the table, itself included.
    pub fn add_player(&mut self, id: ClientId) -> Vec<GameMessage> {
        let (x, y) = self.map.spawn();
        let player = PlayerState::new(id, x, y);
        info!("Added player {} at ({}, {})", id, x, y);

        let mut messages = vec![GameMessage::to_all_except(id, player.spawn_message())];
        self.players.insert(id, player);

        messages.extend(
            self.players
                .values()
                .map(|existing| GameMessage::to(id, existing.spawn_message())),
        );
        messages
    }

    /// Drops the player and tells everyone left. Unknown ids produce nothing.
    pub fn remove_player(&mut self, id: ClientId) -> Vec<GameMessage> {
        match self.players.remove(&id) {
            Some(_) => {
                info!("Removed player {}", id);
                vec![GameMessage::to_all(DestroyPlayer { id })]
            }
            None => Vec::new(),
        }
    }

    /// Stores a pose reported by `from`. The report's own id is ignored so a
    /// client can only ever move itself.
    pub fn apply_move(&mut self, from: ClientId, report: &MovePlayer) -> bool {
        match self.players.get_mut(&from) {
            Some(player) => {
                player.apply_report(report);
                true
            }
            None => false,
        }
    }

    /// Renames `from` and broadcasts the stored (truncated) name to everyone.
    pub fn set_name(&mut self, from: ClientId, name: &str) -> Vec<GameMessage> {
        let Some(player) = self.players.get_mut(&from) else {
            return Vec::new();
        };
        let name = player.set_name(name).to_string();
        debug!("Player {} is now called {:?}", from, name);
        vec![GameMessage::to_all(UpdateName { id: from, name })]
    }

    /// Advances the simulation by one fixed period
    pub fn tick(&mut self) -> Vec<GameMessage> {
        self.tick += 1;
        let mut messages = Vec::new();

        self.heartbeat_timer += self.tick_period;
        if self.heartbeat_timer > HEARTBEAT_INTERVAL {
            self.heartbeat_timer -= HEARTBEAT_INTERVAL;
            messages.push(GameMessage::to_all(Heartbeat));
        }

        self.score_decay_timer += self.tick_period;
        let decay = self.score_decay_timer > SCORE_DECAY_INTERVAL;
        if decay {
            self.score_decay_timer -= SCORE_DECAY_INTERVAL;
        }

        let map = &self.map;
        for (&id, player) in self.players.iter_mut() {
            messages.push(GameMessage::to_all_except(id, player.move_message()));

            let effect = map.tile_data_at_world(player.x, player.y).effect;
            let previous_score = player.score;

            let mut raised = false;
            if Self::should_kill(map, player, effect) {
                let (x, y) = map.spawn();
                player.reset_pose(x, y);
                player.score = 0;
                debug!("Player {} was killed", id);
                messages.push(GameMessage::to_all(player.move_message()));
            } else {
                raised = Self::apply_scoring(player, effect, decay);
            }

            if player.score != previous_score {
                messages.push(GameMessage::to_all(UpdateScore {
                    id,
                    score: player.score,
                }));
            }
            if raised {
                messages.push(GameMessage::to_all(UpdateHighScore {
                    id,
                    high_score: player.high_score,
                }));
            }
        }

        messages
    }

    fn should_kill(map: &MapData, player: &PlayerState, effect: TileEffect) -> bool {
        if player.y > map.lower_bound() {
            return true;
        }
        match effect {
            TileEffect::FullTrap => true,
            TileEffect::FloorTrap => {
                map.is_colliding_with(player.x, player.y + map.floor_probe(), PLAYER_HITBOX)
            }
            _ => false,
        }
    }

    /// Score decay, cash-in on end tiles and refill on start tiles.
    /// Returns true if the high score was raised.
    fn apply_scoring(player: &mut PlayerState, effect: TileEffect, decay: bool) -> bool {
        if player.score == 0 {
            if effect == TileEffect::Start {
                player.score = STARTING_SCORE;
            }
            return false;
        }

        if decay {
            player.score -= SCORE_DECAY_AMOUNT;
        }

        if effect != TileEffect::End {
            return false;
        }

        let raised = player.score > player.high_score;
        if raised {
            player.high_score = player.score;
        }
        player.score = 0;
        raised
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::map::TileData;
    use shared::message::SpawnPlayer;
    use shared::{Animation, Direction, TICK_RATE};
    use std::collections::HashMap;

    // Column 0: start, 1: spawn, 2: end, 3: full trap, 4: floor trap, 5: plain
    const ROWS: [&str; 4] = ["......", "S/EX^.", "######", "######"];
    const TILE: f32 = 16.0;

    fn test_map() -> MapData {
        let palette = HashMap::from([
            ('.', TileData::new(false, TileEffect::None)),
            ('/', TileData::new(false, TileEffect::None)),
            ('#', TileData::new(true, TileEffect::None)),
            ('S', TileData::new(false, TileEffect::Start)),
            ('E', TileData::new(false, TileEffect::End)),
            ('X', TileData::new(false, TileEffect::FullTrap)),
            ('^', TileData::new(false, TileEffect::FloorTrap)),
        ]);
        MapData::from_rows(TILE as u32, &ROWS, palette).unwrap()
    }

    fn game() -> GameState {
        GameState::new(test_map(), TICK_RATE)
    }

    /// Tile centre in world space.
    fn centre(col: i32, row: i32) -> (f32, f32) {
        ((col as f32 + 0.5) * TILE, (row as f32 + 0.5) * TILE)
    }

    fn report(x: f32, y: f32) -> MovePlayer {
        MovePlayer {
            id: 99,
            x,
            y,
            direction: Direction::Left,
            animation: Animation::Running,
            grounded: true,
        }
    }

    fn move_to(game: &mut GameState, id: ClientId, (x, y): (f32, f32)) {
        assert!(game.apply_move(id, &report(x, y)));
    }

    fn score_updates(messages: &[GameMessage], id: ClientId) -> Vec<i32> {
        messages
            .iter()
            .filter_map(|m| match m {
                GameMessage::BroadcastMessage {
                    message: Message::UpdateScore(update),
                    exclude: None,
                } if update.id == id => Some(update.score),
                _ => None,
            })
            .collect()
    }

    fn high_score_updates(messages: &[GameMessage], id: ClientId) -> Vec<i32> {
        messages
            .iter()
            .filter_map(|m| match m {
                GameMessage::BroadcastMessage {
                    message: Message::UpdateHighScore(update),
                    exclude: None,
                } if update.id == id => Some(update.high_score),
                _ => None,
            })
            .collect()
    }

    fn heartbeats(messages: &[GameMessage]) -> usize {
        messages
            .iter()
            .filter(|m| matches!(m, GameMessage::BroadcastMessage { message: Message::Heartbeat(_), .. }))
            .count()
    }

    /// Tick until the next decay tick and return its output.
    fn tick_until_decay(game: &mut GameState, id: ClientId) -> Vec<GameMessage> {
        for _ in 0..(TICK_RATE * 2) {
            let before = game.player(id).unwrap().score;
            let messages = game.tick();
            if game.player(id).unwrap().score == before - SCORE_DECAY_AMOUNT {
                return messages;
            }
        }
        panic!("No decay tick within two seconds");
    }

    #[test]
    fn test_add_player_spawns() {
        let mut game = game();
        game.add_player(0);
        let messages = game.add_player(1);

        let spawn = |id| {
            let (x, y) = centre(1, 1);
            SpawnPlayer {
                id,
                x,
                y,
                name: "Player".to_string(),
                high_score: 0,
            }
        };

        assert_eq!(
            messages,
            vec![
                GameMessage::to_all_except(1, spawn(1)),
                GameMessage::to(1, spawn(0)),
                GameMessage::to(1, spawn(1)),
            ]
        );
        assert_eq!(game.player_count(), 2);
    }

    #[test]
    fn test_remove_player() {
        let mut game = game();
        game.add_player(0);
        game.add_player(1);

        assert_eq!(game.remove_player(0), vec![GameMessage::to_all(DestroyPlayer { id: 0 })]);
        assert!(game.remove_player(0).is_empty());
        assert_eq!(game.player_count(), 1);
    }

    #[test]
    fn test_move_ignores_payload_id() {
        let mut game = game();
        game.add_player(0);
        game.add_player(1);

        move_to(&mut game, 1, (40.0, 20.0));

        let moved = game.player(1).unwrap();
        assert_eq!((moved.x, moved.y), (40.0, 20.0));
        assert_eq!(moved.direction, Direction::Left);
        assert_eq!(game.player(0).unwrap().x, centre(1, 1).0);
        assert!(!game.apply_move(7, &report(0.0, 0.0)));
    }

    #[test]
    fn test_set_name_truncates_and_broadcasts() {
        let mut game = game();
        game.add_player(0);

        let messages = game.set_name(0, "abcdefghijklmnopqrstuvwxyz");
        assert_eq!(
            messages,
            vec![GameMessage::to_all(UpdateName {
                id: 0,
                name: "abcdefghijklmnop".to_string()
            })]
        );
        assert_eq!(game.player(0).unwrap().name, "abcdefghijklmnop");
        assert!(game.set_name(5, "ghost").is_empty());
    }

    #[test]
    fn test_tick_relays_moves_excluding_owner() {
        let mut game = game();
        game.add_player(0);
        game.add_player(1);
        move_to(&mut game, 0, (90.0, 10.0));
        move_to(&mut game, 1, (88.0, 12.0));

        let messages = game.tick();
        let relays: Vec<_> = messages
            .iter()
            .filter_map(|m| match m {
                GameMessage::BroadcastMessage {
                    message: Message::MovePlayer(update),
                    exclude: Some(excluded),
                } => Some((update.id, *excluded)),
                _ => None,
            })
            .collect();

        assert_eq!(relays, vec![(0, 0), (1, 1)]);
    }

    #[test]
    fn test_heartbeat_once_per_second() {
        let mut game = game();
        let mut beats = Vec::new();
        for tick in 1..=61 {
            if heartbeats(&game.tick()) > 0 {
                beats.push(tick);
            }
        }
        // Fires once the timer is strictly past one second.
        assert_eq!(beats, vec![21, 41, 61]);
    }

    #[test]
    fn test_start_tile_grants_score() {
        let mut game = game();
        game.add_player(0);
        move_to(&mut game, 0, centre(0, 1));

        let messages = game.tick();
        assert_eq!(game.player(0).unwrap().score, STARTING_SCORE);
        assert_eq!(score_updates(&messages, 0), vec![STARTING_SCORE]);

        // Already holding points, standing on start changes nothing.
        let messages = game.tick();
        assert!(score_updates(&messages, 0).is_empty());
    }

    #[test]
    fn test_score_decays_exactly() {
        let mut game = game();
        game.add_player(0);
        move_to(&mut game, 0, centre(0, 1));
        game.tick();
        move_to(&mut game, 0, centre(5, 1));

        let messages = tick_until_decay(&mut game, 0);
        assert_eq!(score_updates(&messages, 0), vec![990]);

        let messages = tick_until_decay(&mut game, 0);
        assert_eq!(score_updates(&messages, 0), vec![980]);
    }

    #[test]
    fn test_zero_score_does_not_decay() {
        let mut game = game();
        game.add_player(0);
        move_to(&mut game, 0, centre(5, 1));

        for _ in 0..(TICK_RATE * 3) {
            assert!(score_updates(&game.tick(), 0).is_empty());
        }
        assert_eq!(game.player(0).unwrap().score, 0);
    }

    #[test]
    fn test_end_tile_cashes_in() {
        let mut game = game();
        game.add_player(0);
        move_to(&mut game, 0, centre(0, 1));
        game.tick();

        move_to(&mut game, 0, centre(2, 1));
        let messages = game.tick();

        let player = game.player(0).unwrap();
        assert_eq!(player.score, 0);
        assert_eq!(player.high_score, STARTING_SCORE);
        assert_eq!(score_updates(&messages, 0), vec![0]);
        assert_eq!(high_score_updates(&messages, 0), vec![STARTING_SCORE]);

        let score_index = messages
            .iter()
            .position(|m| matches!(m, GameMessage::BroadcastMessage { message: Message::UpdateScore(_), .. }))
            .unwrap();
        let high_index = messages
            .iter()
            .position(|m| matches!(m, GameMessage::BroadcastMessage { message: Message::UpdateHighScore(_), .. }))
            .unwrap();
        assert!(score_index < high_index);
    }

    #[test]
    fn test_lower_cash_in_keeps_high_score() {
        let mut game = game();
        game.add_player(0);

        // First run banks 1000
        move_to(&mut game, 0, centre(0, 1));
        game.tick();
        move_to(&mut game, 0, centre(2, 1));
        game.tick();

        // Second run decays once before reaching the end
        move_to(&mut game, 0, centre(0, 1));
        game.tick();
        move_to(&mut game, 0, centre(5, 1));
        tick_until_decay(&mut game, 0);
        move_to(&mut game, 0, centre(2, 1));
        let messages = game.tick();

        let player = game.player(0).unwrap();
        assert_eq!(player.high_score, STARTING_SCORE);
        assert_eq!(player.score, 0);
        assert_eq!(score_updates(&messages, 0), vec![0]);
        assert!(high_score_updates(&messages, 0).is_empty());
    }

    #[test]
    fn test_higher_cash_in_raises_high_score() {
        let mut game = game();
        game.add_player(0);
        {
            let player = game.players.get_mut(&0).unwrap();
            player.score = 600;
            player.high_score = 500;
        }

        // First tick, so the decay timer is nowhere near due.
        move_to(&mut game, 0, centre(2, 1));
        let messages = game.tick();

        let player = game.player(0).unwrap();
        assert_eq!(player.score, 0);
        assert_eq!(player.high_score, 600);

        let score_messages: Vec<&Message> = messages
            .iter()
            .filter_map(|m| match m {
                GameMessage::BroadcastMessage { message, exclude: None } => Some(message),
                _ => None,
            })
            .filter(|m| matches!(m, Message::UpdateScore(_) | Message::UpdateHighScore(_)))
            .collect();
        assert_eq!(
            score_messages,
            vec![
                &Message::from(UpdateScore { id: 0, score: 0 }),
                &Message::from(UpdateHighScore {
                    id: 0,
                    high_score: 600
                }),
            ]
        );
    }

    #[test]
    fn test_full_trap_kills() {
        let mut game = game();
        game.add_player(0);
        move_to(&mut game, 0, centre(0, 1));
        game.tick();

        move_to(&mut game, 0, centre(3, 1));
        let messages = game.tick();

        let (sx, sy) = centre(1, 1);
        let reset = MovePlayer {
            id: 0,
            x: sx,
            y: sy,
            direction: Direction::Right,
            animation: Animation::Idle,
            grounded: false,
        };
        assert!(messages.contains(&GameMessage::to_all(reset)));
        assert_eq!(score_updates(&messages, 0), vec![0]);

        let player = game.player(0).unwrap();
        assert_eq!((player.x, player.y), (sx, sy));
        assert_eq!(player.score, 0);
        assert_eq!(player.animation, Animation::Idle);
    }

    #[test]
    fn test_kill_at_zero_score_sends_no_score_update() {
        let mut game = game();
        game.add_player(0);
        move_to(&mut game, 0, centre(3, 1));

        let messages = game.tick();
        assert!(messages
            .iter()
            .any(|m| matches!(m, GameMessage::BroadcastMessage { message: Message::MovePlayer(_), exclude: None })));
        assert!(score_updates(&messages, 0).is_empty());
    }

    #[test]
    fn test_floor_trap_needs_floor_below() {
        let mut game = game();
        game.add_player(0);
        let (x, _) = centre(4, 1);

        // Near the top of the trap tile, the hitbox probe stays clear of the floor.
        move_to(&mut game, 0, (x, 17.0));
        game.tick();
        assert_eq!(game.player(0).unwrap().x, x);

        // Standing on the floor, the probe reaches the solid row below.
        move_to(&mut game, 0, (x, 25.0));
        game.tick();
        assert_eq!(game.player(0).unwrap().x, centre(1, 1).0);
    }

    #[test]
    fn test_falling_out_kills() {
        let mut game = game();
        game.add_player(0);
        move_to(&mut game, 0, (40.0, 4.0 * TILE + 1.0));

        game.tick();
        assert_eq!((game.player(0).unwrap().x, game.player(0).unwrap().y), centre(1, 1));
    }

    #[test]
    fn test_killed_player_skips_scoring() {
        let mut game = game();
        game.add_player(0);
        // Out of the map below the start column
        move_to(&mut game, 0, (8.0, 4.0 * TILE + 1.0));

        let messages = game.tick();
        assert_eq!(game.player(0).unwrap().score, 0);
        assert!(score_updates(&messages, 0).is_empty());
    }

    #[test]
    fn test_tick_count_advances() {
        let mut game = game();
        game.tick();
        game.tick();
        assert_eq!(game.tick_count(), 2);
    }
}
