use anyhow::{anyhow, Result};
use tracing::info;
use uinput::device::Device;
use uinput::event::keyboard::{Key, Keyboard};

use crate::control::{DispatchError, KeyDispatch, KeyId};
use crate::keys::{KeyBindings, KeyCode};

/// /dev/uinput の仮想キーボード
pub struct UinputKeyboard {
    dev: Device,
    bindings: KeyBindings,
}

impl UinputKeyboard {
    pub fn new(bindings: KeyBindings) -> Result<Self> {
        let dev = uinput::default()
            .and_then(|b| b.name("pose-pad"))
            .and_then(|b| b.event(uinput::event::Keyboard::All))
            .and_then(|b| b.create())
            .map_err(|e| anyhow!("Failed to create uinput device: {}", e))?;
        info!("uinput keyboard created");

        Ok(Self { dev, bindings })
    }

    fn send(&mut self, key: KeyId, press: bool) -> Result<(), DispatchError> {
        let code = uinput_key(self.bindings.get(key));
        let event = Keyboard::Key(code);
        let result = if press {
            self.dev.press(&event)
        } else {
            self.dev.release(&event)
        };
        result
            .and_then(|_| self.dev.synchronize())
            .map_err(|e| DispatchError::Backend(e.to_string()))
    }
}

impl KeyDispatch for UinputKeyboard {
    fn press(&mut self, key: KeyId) -> Result<(), DispatchError> {
        self.send(key, true)
    }

    fn release(&mut self, key: KeyId) -> Result<(), DispatchError> {
        self.send(key, false)
    }
}

fn uinput_key(code: KeyCode) -> Key {
    match code {
        KeyCode::Letter(c) => letter(c),
        KeyCode::Digit(d) => digit(d),
        KeyCode::Space => Key::Space,
        KeyCode::Enter => Key::Enter,
        KeyCode::Escape => Key::Esc,
        KeyCode::Tab => Key::Tab,
        KeyCode::LeftShift => Key::LeftShift,
        KeyCode::LeftControl => Key::LeftControl,
        KeyCode::LeftAlt => Key::LeftAlt,
        KeyCode::Left => Key::Left,
        KeyCode::Right => Key::Right,
        KeyCode::Up => Key::Up,
        KeyCode::Down => Key::Down,
    }
}

fn letter(c: u8) -> Key {
    match c {
        b'A' => Key::A,
        b'B' => Key::B,
        b'C' => Key::C,
        b'D' => Key::D,
        b'E' => Key::E,
        b'F' => Key::F,
        b'G' => Key::G,
        b'H' => Key::H,
        b'I' => Key::I,
        b'J' => Key::J,
        b'K' => Key::K,
        b'L' => Key::L,
        b'M' => Key::M,
        b'N' => Key::N,
        b'O' => Key::O,
        b'P' => Key::P,
        b'Q' => Key::Q,
        b'R' => Key::R,
        b'S' => Key::S,
        b'T' => Key::T,
        b'U' => Key::U,
        b'V' => Key::V,
        b'W' => Key::W,
        b'X' => Key::X,
        b'Y' => Key::Y,
        // KeyCode::parse は 'A'..='Z' しか作らない
        _ => Key::Z,
    }
}

fn digit(d: u8) -> Key {
    match d {
        1 => Key::_1,
        2 => Key::_2,
        3 => Key::_3,
        4 => Key::_4,
        5 => Key::_5,
        6 => Key::_6,
        7 => Key::_7,
        8 => Key::_8,
        9 => Key::_9,
        _ => Key::_0,
    }
}
