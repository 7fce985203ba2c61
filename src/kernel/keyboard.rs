use std::collections::VecDeque;

use super::device_driver::{DeviceDriver, DriverStatus};

/// Buffers keystrokes delivered through keyboard interrupts until the host
/// asks for them.
pub struct KeyboardDriver {
    status: DriverStatus,
    buffer: VecDeque<char>,
}

impl KeyboardDriver {
    pub fn new() -> KeyboardDriver {
        KeyboardDriver {
            status: DriverStatus::Unloaded,
            buffer: VecDeque::new(),
        }
    }

    pub fn has_input(&self) -> bool {
        !self.buffer.is_empty()
    }

    /// Drains the buffered keystrokes.
    pub fn take_input(&mut self) -> String {
        self.buffer.drain(..).collect()
    }
}

impl Default for KeyboardDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceDriver for KeyboardDriver {
    type Request = char;
    type Response = ();

    fn driver_entry(&mut self) {
        self.status = DriverStatus::Loaded;
        log::debug!("Keyboard driver loaded");
    }

    fn status(&self) -> DriverStatus {
        self.status
    }

    fn isr(&mut self, key: char) {
        log::trace!("Key {:?}", key);
        self.buffer.push_back(key);
    }
}
