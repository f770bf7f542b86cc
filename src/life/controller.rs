// src/life/controller.rs
//! Wires the model, the view and the driver together and runs the simulation loop.

use crate::driver::{DriverHandle, UiInputEvent};
use crate::life::{BoundLifeModel, GridError, LifeGrid, LifeModel};
use crate::view::{LifeView, Palette, PAUSE_BUTTON};
use anyhow::{Context, Result};
use log::{debug, info};
use rand::Rng;
use std::cell::{Ref, RefCell};
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Side length of the button grid that maps onto cells.
pub const CONTROL_GRID_SIZE: usize = 8;

/// Settings the controller is built from.
#[derive(Debug, Clone, PartialEq)]
pub struct LifeSettings {
    pub width: usize,
    pub height: usize,
    pub seed_count: usize,
    pub seed_cells: Vec<(isize, isize)>,
    pub tick_interval: Duration,
    pub poll_interval: Duration,
    pub palette: Palette,
}

impl Default for LifeSettings {
    fn default() -> Self {
        LifeSettings {
            width: 8,
            height: 8,
            seed_count: 30,
            seed_cells: Vec::new(),
            tick_interval: Duration::from_secs(1),
            poll_interval: Duration::from_millis(100),
            palette: Palette::default(),
        }
    }
}

/// Result of one loop iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StepReport {
    pub ticked: bool,
    pub input_events: usize,
}

/// The running simulation.
pub struct Life {
    model: Rc<RefCell<BoundLifeModel>>,
    view: LifeView,
    tick_interval: Duration,
    poll_interval: Duration,
    next_tick: Option<Instant>,
    generation: u64,
}

impl Life {
    pub fn new<R: Rng + ?Sized>(
        driver: DriverHandle,
        settings: &LifeSettings,
        rng: &mut R,
    ) -> Result<Self> {
        let model = Rc::new(RefCell::new(BoundLifeModel::new(LifeModel::new(
            settings.width,
            settings.height,
        )?)));
        let mut view = LifeView::new(driver, settings.palette);

        view.renderer()
            .render_all(model.borrow().model())
            .context("Failed to draw the initial board")?;
        model.borrow_mut().add_listener(view.model_listener());

        let input_model = Rc::clone(&model);
        view.add_listener(move |event| {
            handle_input_event(&mut *input_model.borrow_mut(), event).map_err(anyhow::Error::from)
        });

        {
            let mut model = model.borrow_mut();
            model
                .perturb(settings.seed_count, rng)
                .context("Failed to seed the board")?;
            for &(col, row) in &settings.seed_cells {
                model.set_cell(col, row, crate::life::ALIVE)?;
            }
            info!(
                "Life: {}x{} board seeded with {} live cell(s)",
                settings.width,
                settings.height,
                model.model().live_count()
            );
        }

        Ok(Life {
            model,
            view,
            tick_interval: settings.tick_interval,
            poll_interval: settings.poll_interval,
            next_tick: None,
            generation: 0,
        })
    }

    pub fn model(&self) -> Ref<'_, BoundLifeModel> {
        self.model.borrow()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Runs one loop iteration at `now`: ticks if due and not paused, then
    /// drains input. Never sleeps.
    pub fn step(&mut self, now: Instant) -> Result<StepReport> {
        let mut report = StepReport::default();
        let next_tick = *self.next_tick.get_or_insert(now);
        if now >= next_tick && !self.model.borrow().is_paused() {
            let mut due = next_tick + self.tick_interval;
            if due <= now {
                // Fell behind (e.g. after a pause); resync instead of bursting.
                due = now + self.tick_interval;
            }
            self.next_tick = Some(due);
            self.tick()?;
            report.ticked = true;
        }
        report.input_events = self.view.handle_input()?;
        Ok(report)
    }

    fn tick(&mut self) -> Result<()> {
        let mut model = self.model.borrow_mut();
        model.tick().context("Tick failed")?;
        self.generation += 1;
        debug!("Life: generation {}\n{}", self.generation, model.model());
        Ok(())
    }

    /// Loops until `shutdown` is set, sleeping `poll_interval` between iterations.
    pub fn run(&mut self, shutdown: &AtomicBool) -> Result<()> {
        info!(
            "Life: running (tick every {:?}, poll every {:?})",
            self.tick_interval, self.poll_interval
        );
        while !shutdown.load(Ordering::SeqCst) {
            self.step(Instant::now())?;
            std::thread::sleep(self.poll_interval);
        }
        info!("Life: stopped after {} generation(s)", self.generation);
        Ok(())
    }
}

/// Input policy: releases are ignored, presses inside the control grid toggle
/// the cell, the pause button toggles the pause flag, anything else is ignored.
pub fn handle_input_event<G: LifeGrid>(grid: &mut G, event: &UiInputEvent) -> Result<(), GridError> {
    if event.value == 0 {
        return Ok(());
    }
    let model = grid.model();
    let cols = CONTROL_GRID_SIZE.min(model.width());
    let rows = CONTROL_GRID_SIZE.min(model.height());
    if event.col < cols && event.row < rows {
        let value = grid.toggle_cell(event.col as isize, event.row as isize)?;
        debug!("Life: toggled ({}, {}) -> {}", event.col, event.row, value);
    } else if (event.col, event.row) == PAUSE_BUTTON {
        let paused = grid.toggle_paused()?;
        info!("Life: {}", if paused { "paused" } else { "resumed" });
    } else {
        debug!("Life: ignoring input at ({}, {})", event.col, event.row);
    }
    Ok(())
}
