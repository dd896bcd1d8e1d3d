use std::collections::HashSet;

use winit::event::{ElementState, KeyEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

/// Keyboard state, updated from window events and queried per frame.
#[derive(Debug, Default)]
pub struct Input {
    pressed: HashSet<KeyCode>,
    down_this_frame: HashSet<KeyCode>,
    up_this_frame: HashSet<KeyCode>,
    quit: bool,
}

impl Input {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle_key_event(&mut self, event: &KeyEvent) {
        let PhysicalKey::Code(code) = event.physical_key else {
            return;
        };
        self.set_key(code, event.state == ElementState::Pressed);
    }

    pub fn set_key(&mut self, code: KeyCode, pressed: bool) {
        if pressed {
            if self.pressed.insert(code) {
                self.down_this_frame.insert(code);
            }
        } else if self.pressed.remove(&code) {
            self.up_this_frame.insert(code);
        }
    }

    /// Clears the per-frame edge sets. Called once the frame has been updated.
    pub fn end_frame(&mut self) {
        self.down_this_frame.clear();
        self.up_this_frame.clear();
    }

    pub fn is_pressed(&self, code: KeyCode) -> bool {
        self.pressed.contains(&code)
    }

    pub fn is_key_down(&self, code: KeyCode) -> bool {
        self.down_this_frame.contains(&code)
    }

    pub fn is_key_up(&self, code: KeyCode) -> bool {
        self.up_this_frame.contains(&code)
    }

    pub fn request_quit(&mut self) {
        self.quit = true;
    }

    pub fn quit_requested(&self) -> bool {
        self.quit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_edges_last_one_frame() {
        let mut input = Input::new();
        input.set_key(KeyCode::KeyW, true);
        assert!(input.is_pressed(KeyCode::KeyW));
        assert!(input.is_key_down(KeyCode::KeyW));

        input.end_frame();
        assert!(input.is_pressed(KeyCode::KeyW));
        assert!(!input.is_key_down(KeyCode::KeyW));

        input.set_key(KeyCode::KeyW, false);
        assert!(!input.is_pressed(KeyCode::KeyW));
        assert!(input.is_key_up(KeyCode::KeyW));
    }
}
