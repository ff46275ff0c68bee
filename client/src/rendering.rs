use crate::game::{ClientWorld, Entity};
use macroquad::prelude::*;
use shared::map::{MapData, TileData, TileEffect};
use shared::{ClientId, Direction, PLAYER_HITBOX};

/// What the HUD shows besides the world itself
#[derive(Debug, Clone)]
pub struct HudConfig {
    pub connected: bool,
    pub show_scoreboard: bool,
}

pub struct Renderer {
    width: f32,
    height: f32,
    zoom: f32,
}

impl Renderer {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width: width as f32,
            height: height as f32,
            zoom: 2.0,
        }
    }

    pub fn render(&mut self, world: &ClientWorld, hud: HudConfig) {
        self.width = screen_width();
        self.height = screen_height();
        clear_background(Color::from_rgba(26, 26, 26, 255));

        let focus = world
            .local_entity()
            .map(|entity| (entity.render_x, entity.render_y))
            .unwrap_or_else(|| world.map().spawn());
        let offset = camera_offset(focus, (self.width, self.height), self.zoom);

        self.draw_map(world.map(), offset);

        for entity in world.entities() {
            let is_local = Some(entity.player.id) == world.local_id();
            self.draw_entity(entity, is_local, offset);
        }

        self.draw_hud(world, &hud);
    }

    fn draw_map(&self, map: &MapData, offset: (f32, f32)) {
        let ts = map.tile_size() as f32 * self.zoom;
        for ty in 0..map.height() {
            for tx in 0..map.width() {
                let data = map.tile_data(map.tile(tx as i32, ty as i32));
                let Some(color) = tile_color(data) else {
                    continue;
                };
                let x = tx as f32 * ts - offset.0;
                let y = ty as f32 * ts - offset.1;
                if x + ts < 0.0 || y + ts < 0.0 || x > self.width || y > self.height {
                    continue;
                }
                draw_rectangle(x, y, ts, ts, color);
            }
        }
    }

    fn draw_entity(&self, entity: &Entity, is_local: bool, offset: (f32, f32)) {
        let (w, h) = (PLAYER_HITBOX.0 * self.zoom, PLAYER_HITBOX.1 * self.zoom);
        let x = entity.render_x * self.zoom - offset.0 - w * 0.5;
        let y = entity.render_y * self.zoom - offset.1 - h * 0.5;

        let color = if is_local {
            GREEN
        } else {
            player_color(entity.player.id)
        };
        draw_rectangle(x, y, w, h, color);
        draw_rectangle_lines(x, y, w, h, 2.0, WHITE);

        // Facing marker
        let eye_x = match entity.player.direction {
            Direction::Left => x + 2.0,
            Direction::Right => x + w - 6.0,
        };
        draw_rectangle(eye_x, y + 4.0, 4.0, 4.0, BLACK);

        let label = &entity.player.name;
        let size = measure_text(label, None, 16, 1.0);
        draw_text(label, x + w * 0.5 - size.width * 0.5, y - 6.0, 16.0, WHITE);
    }

    fn draw_hud(&self, world: &ClientWorld, hud: &HudConfig) {
        let connection_color = if hud.connected { GREEN } else { RED };
        draw_rectangle(10.0, 10.0, 8.0, 8.0, connection_color);
        draw_text("CON", 22.0, 18.0, 16.0, WHITE);

        if let Some(local) = world.local_entity() {
            let score = format!(
                "Score {}  Best {}",
                local.player.score, local.player.high_score
            );
            draw_text(&score, 10.0, 40.0, 24.0, WHITE);
        }

        if hud.show_scoreboard {
            let mut rows: Vec<_> = world.entities().map(|e| &e.player).collect();
            rows.sort_by(|a, b| b.high_score.cmp(&a.high_score).then(a.id.cmp(&b.id)));
            for (i, player) in rows.iter().enumerate() {
                let line = format!("{:<16} {:>6}", player.name, player.high_score);
                draw_text(&line, self.width - 260.0, 24.0 + i as f32 * 20.0, 20.0, WHITE);
            }
        }
    }
}

/// Top-left corner of the view that centres `focus` (in world pixels) on screen
pub fn camera_offset(focus: (f32, f32), screen: (f32, f32), zoom: f32) -> (f32, f32) {
    (
        focus.0 * zoom - screen.0 * 0.5,
        focus.1 * zoom - screen.1 * 0.5,
    )
}

fn tile_color(data: TileData) -> Option<Color> {
    let color = match data.effect {
        TileEffect::Start => Color::from_rgba(60, 160, 60, 255),
        TileEffect::End => Color::from_rgba(220, 180, 40, 255),
        TileEffect::FullTrap | TileEffect::FloorTrap => Color::from_rgba(200, 50, 50, 255),
        TileEffect::Jump => Color::from_rgba(80, 140, 255, 255),
        TileEffect::None if data.solid => Color::from_rgba(68, 68, 68, 255),
        TileEffect::None => return None,
    };
    Some(color)
}

fn player_color(id: ClientId) -> Color {
    match id.rem_euclid(6) {
        0 => RED,
        1 => BLUE,
        2 => YELLOW,
        3 => MAGENTA,
        4 => Color::from_rgba(0, 255, 255, 255),
        _ => Color::from_rgba(255, 136, 0, 255),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camera_centres_focus() {
        assert_eq!(camera_offset((100.0, 50.0), (800.0, 600.0), 2.0), (-200.0, -200.0));
        assert_eq!(camera_offset((400.0, 300.0), (800.0, 600.0), 1.0), (0.0, 0.0));
    }

    #[test]
    fn test_empty_tiles_are_not_drawn() {
        assert!(tile_color(TileData::new(false, TileEffect::None)).is_none());
        assert!(tile_color(TileData::new(true, TileEffect::None)).is_some());
        assert!(tile_color(TileData::new(false, TileEffect::End)).is_some());
    }

    #[test]
    fn test_negative_ids_have_a_color() {
        assert_eq!(player_color(-1), player_color(5));
    }
}
