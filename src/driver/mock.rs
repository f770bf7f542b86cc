// src/driver/mock.rs

use super::{GridDriver, UiInputEvent};
use anyhow::Result;

/// Every call a `MockDriver` received, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverCall {
    Get,
    Set { col: usize, row: usize, intensity: u8 },
    Clear(Option<(usize, usize)>),
    Commit,
    Close,
}

#[derive(Default)]
pub struct MockDriver {
    events: Vec<UiInputEvent>,
    calls: Vec<DriverCall>,
    fail_sets: bool,
}

impl MockDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_event(&mut self, event: UiInputEvent) {
        self.events.push(event);
    }

    /// Makes every subsequent `set` fail.
    pub fn fail_sets(&mut self) {
        self.fail_sets = true;
    }

    pub fn calls(&self) -> &[DriverCall] {
        &self.calls
    }

    /// Only the `set` calls, as `(col, row, intensity)`.
    pub fn sets(&self) -> Vec<(usize, usize, u8)> {
        self.calls
            .iter()
            .filter_map(|call| match *call {
                DriverCall::Set { col, row, intensity } => Some((col, row, intensity)),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, call: &DriverCall) -> usize {
        self.calls.iter().filter(|c| *c == call).count()
    }

    pub fn reset_calls(&mut self) {
        self.calls.clear();
    }
}

impl GridDriver for MockDriver {
    fn get(&mut self) -> Result<Vec<UiInputEvent>> {
        self.calls.push(DriverCall::Get);
        Ok(self.events.drain(..).collect())
    }

    fn set(&mut self, col: usize, row: usize, intensity: u8) -> Result<()> {
        if self.fail_sets {
            anyhow::bail!("mock driver rejected set({}, {}, {})", col, row, intensity);
        }
        self.calls.push(DriverCall::Set { col, row, intensity });
        Ok(())
    }

    fn clear(&mut self, at: Option<(usize, usize)>) -> Result<()> {
        self.calls.push(DriverCall::Clear(at));
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        self.calls.push(DriverCall::Commit);
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.calls.push(DriverCall::Close);
        Ok(())
    }
}
