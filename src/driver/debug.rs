// src/driver/debug.rs

use super::{GridDriver, UiInputEvent};
use anyhow::Result;
use log::debug;

/// Wraps another driver and logs every call before forwarding it.
pub struct DebugDriver<D: GridDriver> {
    inner: D,
}

impl<D: GridDriver> DebugDriver<D> {
    pub fn new(inner: D) -> Self {
        DebugDriver { inner }
    }

    pub fn into_inner(self) -> D {
        self.inner
    }
}

impl<D: GridDriver> GridDriver for DebugDriver<D> {
    fn get(&mut self) -> Result<Vec<UiInputEvent>> {
        let events = self.inner.get()?;
        if !events.is_empty() {
            debug!("DebugDriver: get -> {:?}", events);
        }
        Ok(events)
    }

    fn set(&mut self, col: usize, row: usize, intensity: u8) -> Result<()> {
        debug!("DebugDriver: set({}, {}, {})", col, row, intensity);
        self.inner.set(col, row, intensity)
    }

    fn clear(&mut self, at: Option<(usize, usize)>) -> Result<()> {
        debug!("DebugDriver: clear({:?})", at);
        self.inner.clear(at)
    }

    fn commit(&mut self) -> Result<()> {
        debug!("DebugDriver: commit");
        self.inner.commit()
    }

    fn close(&mut self) -> Result<()> {
        debug!("DebugDriver: close");
        self.inner.close()
    }
}
