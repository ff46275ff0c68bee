//! Keyboard sampling for the render loop

use crate::movement::MoveInput;
use macroquad::prelude::*;

/// Everything the player asked for this frame
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct InputFrame {
    pub movement: MoveInput,
    pub quit: bool,
    pub toggle_scoreboard: bool,
}

/// Samples the keyboard once per frame and turns held keys into edges
pub struct InputManager {
    prev_tab: bool,
}

impl InputManager {
    pub fn new() -> Self {
        Self { prev_tab: false }
    }

    pub fn update(&mut self) -> InputFrame {
        // WASD and arrow keys both work
        let left = is_key_down(KeyCode::A) || is_key_down(KeyCode::Left);
        let right = is_key_down(KeyCode::D) || is_key_down(KeyCode::Right);
        let jump = is_key_down(KeyCode::Space)
            || is_key_down(KeyCode::W)
            || is_key_down(KeyCode::Up);

        self.sample(
            left,
            right,
            jump,
            is_key_down(KeyCode::Escape),
            is_key_down(KeyCode::Tab),
        )
    }

    fn sample(&mut self, left: bool, right: bool, jump: bool, escape: bool, tab: bool) -> InputFrame {
        let toggle_scoreboard = tab && !self.prev_tab;
        self.prev_tab = tab;

        InputFrame {
            movement: MoveInput::from_keys(left, right, jump),
            quit: escape,
            toggle_scoreboard,
        }
    }
}

impl Default for InputManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_fires_on_press_only() {
        let mut input = InputManager::new();
        assert!(input.sample(false, false, false, false, true).toggle_scoreboard);
        assert!(!input.sample(false, false, false, false, true).toggle_scoreboard);
        assert!(!input.sample(false, false, false, false, false).toggle_scoreboard);
        assert!(input.sample(false, false, false, false, true).toggle_scoreboard);
    }

    #[test]
    fn test_movement_keys() {
        let mut input = InputManager::new();
        let frame = input.sample(false, true, true, false, false);
        assert_eq!(frame.movement.horizontal, 1.0);
        assert!(frame.movement.jump);
        assert!(!frame.quit);
    }
}
