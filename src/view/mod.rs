// src/view/mod.rs
//! Bridges model space and driver space.
//!
//! Model changes become driver `set` + `commit` calls; raw driver input is
//! drained and handed to registered input listeners.

use crate::driver::{DriverHandle, UiInputEvent};
use crate::life::{LifeModel, ModelChange, DEAD};
use anyhow::{Context, Result};
use log::{debug, trace};

/// Reserved control position showing (and toggling) the pause state.
pub const PAUSE_BUTTON: (usize, usize) = (8, 0);

/// Light intensities used when rendering the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub alive: u8,
    pub dead: u8,
    pub paused: u8,
    pub running: u8,
}

impl Default for Palette {
    fn default() -> Self {
        Palette {
            alive: 127,
            dead: 0,
            paused: 127,
            running: 1,
        }
    }
}

/// The rendering half of the view. Cheap to clone; clones share the driver.
#[derive(Clone)]
pub struct GridRenderer {
    driver: DriverHandle,
    palette: Palette,
}

impl GridRenderer {
    pub fn new(driver: DriverHandle, palette: Palette) -> Self {
        GridRenderer { driver, palette }
    }

    pub fn palette(&self) -> Palette {
        self.palette
    }

    /// Renders one committed change and commits it.
    pub fn on_model_change(&self, _source: &LifeModel, change: &ModelChange) -> Result<()> {
        let (col, row, intensity) = match *change {
            ModelChange::Paused(paused) => {
                let intensity = if paused {
                    self.palette.paused
                } else {
                    self.palette.running
                };
                (PAUSE_BUTTON.0, PAUSE_BUTTON.1, intensity)
            }
            ModelChange::Cell { col, row, value } => {
                let intensity = if value == DEAD {
                    self.palette.dead
                } else {
                    self.palette.alive
                };
                (col, row, intensity)
            }
        };
        let mut driver = self.driver.borrow_mut();
        driver
            .set(col, row, intensity)
            .with_context(|| format!("Failed to set light ({}, {})", col, row))?;
        driver.commit().context("Failed to commit light update")
    }

    /// Clears the surface and draws every cell plus the pause light, then commits once.
    pub fn render_all(&self, model: &LifeModel) -> Result<()> {
        let mut driver = self.driver.borrow_mut();
        driver.clear(None)?;
        for (row, cells) in model.rows().enumerate() {
            for (col, &value) in cells.iter().enumerate() {
                if value != DEAD {
                    driver.set(col, row, self.palette.alive)?;
                }
            }
        }
        let pause = if model.is_paused() {
            self.palette.paused
        } else {
            self.palette.running
        };
        driver.set(PAUSE_BUTTON.0, PAUSE_BUTTON.1, pause)?;
        driver.commit().context("Failed to commit full render")
    }
}

/// Callback for input events drained from the driver.
pub type InputListener = Box<dyn FnMut(&UiInputEvent) -> Result<()>>;

pub struct LifeView {
    renderer: GridRenderer,
    listeners: Vec<InputListener>,
}

impl LifeView {
    pub fn new(driver: DriverHandle, palette: Palette) -> Self {
        LifeView {
            renderer: GridRenderer::new(driver, palette),
            listeners: Vec::new(),
        }
    }

    pub fn renderer(&self) -> &GridRenderer {
        &self.renderer
    }

    /// A model listener that renders through this view's driver.
    pub fn model_listener(&self) -> impl FnMut(&LifeModel, &ModelChange) -> Result<()> + 'static {
        let renderer = self.renderer.clone();
        move |source, change| renderer.on_model_change(source, change)
    }

    pub fn add_listener<F>(&mut self, listener: F)
    where
        F: FnMut(&UiInputEvent) -> Result<()> + 'static,
    {
        self.listeners.push(Box::new(listener));
    }

    /// Drains buffered input and dispatches each event to every listener in
    /// registration order. Returns the number of events drained.
    pub fn handle_input(&mut self) -> Result<usize> {
        // The driver borrow must end before listeners run: they mutate the
        // model, which renders back through the same driver.
        let events = self
            .renderer
            .driver
            .borrow_mut()
            .get()
            .context("Failed to poll driver input")?;
        if events.is_empty() {
            trace!("LifeView: no input");
            return Ok(0);
        }
        for event in &events {
            debug!("LifeView: input {:?}", event);
            for listener in self.listeners.iter_mut() {
                listener(event)?;
            }
        }
        Ok(events.len())
    }
}

#[cfg(test)]
mod tests;
