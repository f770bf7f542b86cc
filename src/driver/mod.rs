// src/driver/mod.rs
//! GridDriver trait - the light/button surface the view renders to and reads from.
//!
//! A driver speaks in grid space: `(col, row)` with the hardware's control
//! column at `col == 8`. Writes are queued by `set`/`clear` and become visible
//! on `commit`. `get` never blocks; it drains whatever input is buffered.

pub mod console;
pub mod debug;
pub mod midi;
#[cfg(test)]
pub mod mock;

pub use console::ConsoleDriver;
pub use debug::DebugDriver;
pub use midi::{MidiDriver, RawMidiPort};

use anyhow::Result;
use std::cell::RefCell;
use std::rc::Rc;

/// Input in grid coordinates. `value` is the raw intensity/velocity reported
/// by the device; `0` means release.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UiInputEvent {
    pub col: usize,
    pub row: usize,
    pub value: u8,
}

impl UiInputEvent {
    pub fn new(col: usize, row: usize, value: u8) -> Self {
        UiInputEvent { col, row, value }
    }
}

/// Minimal display/input driver interface.
pub trait GridDriver {
    /// Drains buffered input events. Returns an empty vector when none are pending.
    fn get(&mut self) -> Result<Vec<UiInputEvent>>;

    /// Queues a light update at `(col, row)`.
    fn set(&mut self, col: usize, row: usize, intensity: u8) -> Result<()>;

    /// Queues clearing one light, or every light when `at` is `None`.
    fn clear(&mut self, at: Option<(usize, usize)>) -> Result<()>;

    /// Flushes queued updates.
    fn commit(&mut self) -> Result<()>;

    /// Releases the underlying transport.
    fn close(&mut self) -> Result<()>;
}

/// Shared, non-owning access to a driver. The view and the composition root
/// both hold one; the whole program runs on a single thread.
pub type DriverHandle = Rc<RefCell<dyn GridDriver>>;

impl<D: GridDriver + ?Sized> GridDriver for Box<D> {
    fn get(&mut self) -> Result<Vec<UiInputEvent>> {
        (**self).get()
    }

    fn set(&mut self, col: usize, row: usize, intensity: u8) -> Result<()> {
        (**self).set(col, row, intensity)
    }

    fn clear(&mut self, at: Option<(usize, usize)>) -> Result<()> {
        (**self).clear(at)
    }

    fn commit(&mut self) -> Result<()> {
        (**self).commit()
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }
}
