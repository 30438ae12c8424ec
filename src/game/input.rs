//! Controller seam shared by human input devices and the AI
//!
//! The game loop only ever sees a [`Controller`]: five boolean queries plus
//! `update`/`reset`. Keyboard, gamepad and the tactical planner all implement
//! it, so a bot can take over a bomber without the loop knowing.
//!
//! Device events arrive through a crossbeam channel: the host (window/event
//! pump) holds a sender and the controller drains pending events at the
//! start of each `update`.

use crossbeam_channel::{unbounded, Receiver, Sender};
use hashbrown::HashSet;

use crate::game::object::ObjectId;
use crate::game::world::World;

/// Stick deflection below which the gamepad reports no direction
pub const GAMEPAD_DEAD_ZONE: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerKind {
    Keyboard,
    Gamepad,
    Ai,
}

/// Input device driving one bomber
pub trait Controller {
    fn kind(&self) -> ControllerKind;

    /// Bind the controller to the bomber it drives
    fn attach(&mut self, _bomber: ObjectId) {}

    /// Refresh state for this frame
    fn update(&mut self, world: &World, dt: f32);

    /// Forget all held input and internal state
    fn reset(&mut self);

    fn is_left(&self) -> bool;
    fn is_right(&self) -> bool;
    fn is_up(&self) -> bool;
    fn is_down(&self) -> bool;
    fn is_bomb(&self) -> bool;

    /// Human-readable internal state, for logs and debugging overlays
    fn debug_state(&self) -> Option<&str> {
        None
    }
}

/// Snapshot of a controller's five signals for one frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Intent {
    pub left: bool,
    pub right: bool,
    pub up: bool,
    pub down: bool,
    pub bomb: bool,
}

impl Intent {
    pub fn read(controller: &dyn Controller) -> Self {
        Self {
            left: controller.is_left(),
            right: controller.is_right(),
            up: controller.is_up(),
            down: controller.is_down(),
            bomb: controller.is_bomb(),
        }
    }

    /// Horizontal and vertical movement as -1/0/1; opposite keys cancel
    pub fn axes(&self) -> (i32, i32) {
        (
            self.right as i32 - self.left as i32,
            self.down as i32 - self.up as i32,
        )
    }
}

// ============================================================================
// Keyboard
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Up,
    Down,
    Left,
    Right,
    RightCtrl,
    W,
    A,
    S,
    D,
    Space,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEvent {
    Pressed(Key),
    Released(Key),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Keymap {
    pub left: Key,
    pub right: Key,
    pub up: Key,
    pub down: Key,
    pub bomb: Key,
}

impl Keymap {
    pub fn arrows() -> Self {
        Self {
            left: Key::Left,
            right: Key::Right,
            up: Key::Up,
            down: Key::Down,
            bomb: Key::RightCtrl,
        }
    }

    pub fn wasd() -> Self {
        Self {
            left: Key::A,
            right: Key::D,
            up: Key::W,
            down: Key::S,
            bomb: Key::Space,
        }
    }

    /// Keymap by player slot; unknown slots fall back to the arrow keys
    pub fn for_slot(slot: usize) -> Self {
        match slot {
            1 => Self::wasd(),
            _ => Self::arrows(),
        }
    }
}

pub struct KeyboardController {
    keymap: Keymap,
    events: Receiver<KeyEvent>,
    held: HashSet<Key>,
}

impl KeyboardController {
    /// Create the controller and the sender the host uses to feed it
    pub fn new(keymap: Keymap) -> (Self, Sender<KeyEvent>) {
        let (sender, events) = unbounded();
        (
            Self {
                keymap,
                events,
                held: HashSet::new(),
            },
            sender,
        )
    }

    #[inline]
    fn held(&self, key: Key) -> bool {
        self.held.contains(&key)
    }
}

impl Controller for KeyboardController {
    fn kind(&self) -> ControllerKind {
        ControllerKind::Keyboard
    }

    fn update(&mut self, _world: &World, _dt: f32) {
        for event in self.events.try_iter() {
            match event {
                KeyEvent::Pressed(key) => {
                    self.held.insert(key);
                }
                KeyEvent::Released(key) => {
                    self.held.remove(&key);
                }
            }
        }
    }

    fn reset(&mut self) {
        self.held.clear();
    }

    fn is_left(&self) -> bool {
        self.held(self.keymap.left)
    }

    fn is_right(&self) -> bool {
        self.held(self.keymap.right)
    }

    fn is_up(&self) -> bool {
        self.held(self.keymap.up)
    }

    fn is_down(&self) -> bool {
        self.held(self.keymap.down)
    }

    fn is_bomb(&self) -> bool {
        self.held(self.keymap.bomb)
    }
}

// ============================================================================
// Gamepad
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GamepadEvent {
    /// Left stick position, each axis in [-1, 1], +y down
    Stick { x: f32, y: f32 },
    /// Bomb button
    Button(bool),
}

pub struct GamepadController {
    events: Receiver<GamepadEvent>,
    stick: (f32, f32),
    button: bool,
}

impl GamepadController {
    pub fn new() -> (Self, Sender<GamepadEvent>) {
        let (sender, events) = unbounded();
        (
            Self {
                events,
                stick: (0.0, 0.0),
                button: false,
            },
            sender,
        )
    }
}

impl Controller for GamepadController {
    fn kind(&self) -> ControllerKind {
        ControllerKind::Gamepad
    }

    fn update(&mut self, _world: &World, _dt: f32) {
        for event in self.events.try_iter() {
            match event {
                GamepadEvent::Stick { x, y } => self.stick = (x.clamp(-1.0, 1.0), y.clamp(-1.0, 1.0)),
                GamepadEvent::Button(pressed) => self.button = pressed,
            }
        }
    }

    fn reset(&mut self) {
        self.stick = (0.0, 0.0);
        self.button = false;
    }

    fn is_left(&self) -> bool {
        self.stick.0 < -GAMEPAD_DEAD_ZONE
    }

    fn is_right(&self) -> bool {
        self.stick.0 > GAMEPAD_DEAD_ZONE
    }

    fn is_up(&self) -> bool {
        self.stick.1 < -GAMEPAD_DEAD_ZONE
    }

    fn is_down(&self) -> bool {
        self.stick.1 > GAMEPAD_DEAD_ZONE
    }

    fn is_bomb(&self) -> bool {
        self.button
    }
}
