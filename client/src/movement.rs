//! Local player movement against the tile map
//!
//! Only the local player is simulated; the server trusts whatever pose the
//! client reports. Velocity is kept in "speed units" and scaled by
//! [`MOVE_SPEED`] when applied, so gravity and jump force are small numbers.

use shared::map::{MapData, TileEffect};
use shared::{Animation, Direction, PLAYER_HITBOX};

/// Horizontal speed in pixels per second, also the vertical velocity scale
pub const MOVE_SPEED: f32 = 100.0;
pub const GRAVITY: f32 = 4.0;
pub const JUMP_FORCE: f32 = 1.5;
/// Upward velocity given by landing on a jump tile
pub const BOUNCE_FORCE: f32 = 2.25;
/// Gravity scale while the jump button is held on the way up
pub const EXTRA_HEIGHT_GRAVITY: f32 = 0.5;
/// Distance below the hitbox still counted as standing on the ground
const GROUND_PROBE: f32 = 0.5;
/// Keeps the hitbox just off the tile edge it was pushed against
const FLUSH_FACTOR: f32 = 0.51;

/// Movement intent sampled for one frame
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MoveInput {
    /// -1.0 for left, 1.0 for right, 0.0 for neither
    pub horizontal: f32,
    pub jump: bool,
}

impl MoveInput {
    pub fn from_keys(left: bool, right: bool, jump: bool) -> Self {
        let mut horizontal = 0.0;
        if left {
            horizontal -= 1.0;
        }
        if right {
            horizontal += 1.0;
        }
        Self { horizontal, jump }
    }
}

/// The locally simulated player
#[derive(Debug, Clone, PartialEq)]
pub struct Body {
    pub x: f32,
    pub y: f32,
    pub direction: Direction,
    pub animation: Animation,
    pub grounded: bool,
    velocity: f32,
    extra_height: bool,
}

impl Body {
    pub fn new(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            direction: Direction::Right,
            animation: Animation::Idle,
            grounded: false,
            velocity: 0.0,
            extra_height: false,
        }
    }

    pub fn velocity(&self) -> f32 {
        self.velocity
    }

    /// Place the body at a server-decided pose and drop its momentum
    pub fn teleport(
        &mut self,
        x: f32,
        y: f32,
        direction: Direction,
        animation: Animation,
        grounded: bool,
    ) {
        self.x = x;
        self.y = y;
        self.direction = direction;
        self.animation = animation;
        self.grounded = grounded;
        self.velocity = 0.0;
        self.extra_height = false;
    }

    pub fn step(&mut self, input: MoveInput, map: &MapData, dt: f32) {
        if input.horizontal > 0.0 {
            self.direction = Direction::Right;
        } else if input.horizontal < 0.0 {
            self.direction = Direction::Left;
        }

        self.animation = if !self.grounded {
            Animation::Jumping
        } else if input.horizontal != 0.0 {
            Animation::Running
        } else {
            Animation::Idle
        };

        let tile_size = map.tile_size() as f32;

        let mut x = self.x + input.horizontal * MOVE_SPEED * dt;
        if map.is_colliding_with(x, self.y, PLAYER_HITBOX) {
            x = flush_position(self.x, PLAYER_HITBOX.0, input.horizontal, tile_size);
        }

        let gravity_scale = if self.extra_height && self.velocity < 0.0 {
            EXTRA_HEIGHT_GRAVITY
        } else {
            1.0
        };
        self.velocity += gravity_scale * GRAVITY * dt;

        if input.jump {
            if self.grounded {
                self.extra_height = true;
                self.velocity = -JUMP_FORCE;
            }
        } else {
            self.extra_height = false;
        }

        let mut y = self.y + self.velocity * MOVE_SPEED * dt;
        let mut landed = false;
        if map.is_colliding_with(x, y, PLAYER_HITBOX) {
            landed = self.velocity > 0.0;
            y = flush_position(self.y, PLAYER_HITBOX.1, self.velocity, tile_size);
            self.velocity = 0.0;
        }

        self.x = x;
        self.y = y;
        self.grounded = landed
            || (self.velocity >= 0.0 && map.is_colliding_with(x, y + GROUND_PROBE, PLAYER_HITBOX));

        if landed && self.standing_on(map) == TileEffect::Jump {
            self.velocity = -BOUNCE_FORCE;
            self.extra_height = false;
            self.grounded = false;
        }
    }

    fn standing_on(&self, map: &MapData) -> TileEffect {
        let feet = self.y + PLAYER_HITBOX.1 * 0.5 + 1.0;
        map.tile_data_at_world(self.x, feet).effect
    }
}

/// Position that presses a box of `size` against the next tile edge in `direction`
fn flush_position(pos: f32, size: f32, direction: f32, tile_size: f32) -> f32 {
    if direction > 0.0 {
        (pos / tile_size).ceil() * tile_size - size * FLUSH_FACTOR
    } else {
        (pos / tile_size).floor() * tile_size + size * FLUSH_FACTOR
    }
}
