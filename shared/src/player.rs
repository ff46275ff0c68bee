//! Player state shared by the server's authoritative table and the wire messages.

use crate::error::ProtocolError;
use crate::message::{MovePlayer, SpawnPlayer};
use crate::{ClientId, DEFAULT_NAME, MAX_NAME_LENGTH};

/// Width and height of a player's collision box, centred on its position.
pub const PLAYER_HITBOX: (f32, f32) = (8.0, 14.0);

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    Left = 0,
    #[default]
    Right = 1,
}

impl TryFrom<u8> for Direction {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Direction::Left),
            1 => Ok(Direction::Right),
            _ => Err(ProtocolError::InvalidEnumValue {
                kind: "direction",
                value,
            }),
        }
    }
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Animation {
    #[default]
    Idle = 0,
    Running = 1,
    Jumping = 2,
}

impl TryFrom<u8> for Animation {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Animation::Idle),
            1 => Ok(Animation::Running),
            2 => Ok(Animation::Jumping),
            _ => Err(ProtocolError::InvalidEnumValue {
                kind: "animation",
                value,
            }),
        }
    }
}

/// Cut a display name down to [`MAX_NAME_LENGTH`] characters.
pub fn truncate_name(name: &str) -> String {
    name.chars().take(MAX_NAME_LENGTH).collect()
}

/// A player as the server knows it.
///
/// Position, direction, animation and grounded are client-reported and only
/// relayed. Score and high score are decided by the server.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerState {
    pub id: ClientId,
    pub x: f32,
    pub y: f32,
    pub direction: Direction,
    pub animation: Animation,
    pub grounded: bool,
    pub name: String,
    pub score: i32,
    pub high_score: i32,
}

impl PlayerState {
    pub fn new(id: ClientId, x: f32, y: f32) -> Self {
        Self {
            id,
            x,
            y,
            direction: Direction::Right,
            animation: Animation::Idle,
            grounded: false,
            name: DEFAULT_NAME.to_string(),
            score: 0,
            high_score: 0,
        }
    }

    /// Store a reported pose. The report's own `id` is ignored.
    pub fn apply_report(&mut self, report: &MovePlayer) {
        self.x = report.x;
        self.y = report.y;
        self.direction = report.direction;
        self.animation = report.animation;
        self.grounded = report.grounded;
    }

    /// Put the player back at `(x, y)` in the default pose.
    pub fn reset_pose(&mut self, x: f32, y: f32) {
        self.x = x;
        self.y = y;
        self.direction = Direction::Right;
        self.animation = Animation::Idle;
        self.grounded = false;
    }

    /// Set the display name, truncating it. Returns the stored name.
    pub fn set_name(&mut self, name: &str) -> &str {
        self.name = truncate_name(name);
        &self.name
    }

    pub fn move_message(&self) -> MovePlayer {
        MovePlayer {
            id: self.id,
            x: self.x,
            y: self.y,
            direction: self.direction,
            animation: self.animation,
            grounded: self.grounded,
        }
    }

    pub fn spawn_message(&self) -> SpawnPlayer {
        SpawnPlayer {
            id: self.id,
            x: self.x,
            y: self.y,
            name: self.name.clone(),
            high_score: self.high_score,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_creation() {
        let player = PlayerState::new(1, 100.0, 200.0);
        assert_eq!(player.id, 1);
        assert_eq!(player.x, 100.0);
        assert_eq!(player.y, 200.0);
        assert_eq!(player.score, 0);
        assert_eq!(player.high_score, 0);
        assert_eq!(player.name, DEFAULT_NAME);
        assert_eq!(player.direction, Direction::Right);
        assert_eq!(player.animation, Animation::Idle);
    }

    #[test]
    fn test_name_truncation_counts_characters() {
        let mut player = PlayerState::new(1, 0.0, 0.0);
        let long = "é".repeat(MAX_NAME_LENGTH + 5);
        assert_eq!(player.set_name(&long).chars().count(), MAX_NAME_LENGTH);
        assert_eq!(player.set_name("short"), "short");
        assert_eq!(truncate_name(""), "");
    }

    #[test]
    fn test_apply_report_ignores_reported_id() {
        let mut player = PlayerState::new(1, 0.0, 0.0);
        player.apply_report(&MovePlayer {
            id: 99,
            x: 5.0,
            y: 6.0,
            direction: Direction::Left,
            animation: Animation::Running,
            grounded: true,
        });
        assert_eq!(player.id, 1);
        assert_eq!((player.x, player.y), (5.0, 6.0));
        assert_eq!(player.direction, Direction::Left);
        assert!(player.grounded);
    }

    #[test]
    fn test_reset_pose() {
        let mut player = PlayerState::new(1, 0.0, 0.0);
        player.direction = Direction::Left;
        player.animation = Animation::Jumping;
        player.grounded = true;
        player.reset_pose(8.0, 24.0);
        assert_eq!(player.move_message().x, 8.0);
        assert_eq!(player.direction, Direction::Right);
        assert_eq!(player.animation, Animation::Idle);
        assert!(!player.grounded);
    }

    #[test]
    fn test_enum_conversions() {
        assert_eq!(Direction::try_from(0), Ok(Direction::Left));
        assert_eq!(Animation::try_from(2), Ok(Animation::Jumping));
        assert!(Direction::try_from(2).is_err());
        assert!(Animation::try_from(3).is_err());
    }
}
