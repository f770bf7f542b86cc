// src/diagnostics.rs

//! Hardware check modes that run instead of the simulation: an input monitor
//! that prints and echoes every message, and an alternating checkerboard.

use crate::driver::midi::{MidiMessage, MidiParser, MidiPort};
use crate::driver::GridDriver;
use crate::life::controller::CONTROL_GRID_SIZE;
use anyhow::{Context, Result};
use log::{debug, info};
use rand::seq::SliceRandom;
use rand::Rng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Reads raw MIDI input, reports it and writes it straight back so pressed
/// pads light up.
pub struct Monitor<P: MidiPort> {
    port: P,
    parser: MidiParser,
}

impl<P: MidiPort> Monitor<P> {
    pub fn new(port: P) -> Self {
        Monitor {
            port,
            parser: MidiParser::new(),
        }
    }

    pub fn port(&self) -> &P {
        &self.port
    }

    /// Drains buffered input and echoes every decoded message. Never blocks.
    pub fn poll(&mut self) -> Result<Vec<MidiMessage>> {
        let bytes = self.port.read_available()?;
        let messages = self.parser.process_bytes(&bytes);
        if messages.is_empty() {
            return Ok(messages);
        }
        let echo: Vec<u8> = messages
            .iter()
            .flat_map(|m| m.to_bytes().into_iter().take(m.wire_len()))
            .collect();
        self.port
            .write_all(&echo)
            .context("Failed to echo MIDI input")?;
        Ok(messages)
    }

    /// Prints `(data1, data2)` for each message until `shutdown` is set, then closes the port.
    pub fn run(&mut self, poll_interval: Duration, shutdown: &AtomicBool) -> Result<()> {
        info!("Monitor: ready to read inputs");
        while !shutdown.load(Ordering::SeqCst) {
            let messages = self.poll()?;
            if !messages.is_empty() {
                let pairs: Vec<(u8, u8)> = messages.iter().map(|m| (m.data1, m.data2)).collect();
                println!("{:?}", pairs);
            }
            std::thread::sleep(poll_interval);
        }
        self.port.close()
    }
}

/// One phase of the pad checkerboard as `(col, row, intensity)`, row-major.
/// Adjacent pads always differ and the two phases are inverses.
pub fn checker_pattern(phase: bool, on: u8, off: u8) -> Vec<(usize, usize, u8)> {
    (0..CONTROL_GRID_SIZE)
        .flat_map(|row| {
            (0..CONTROL_GRID_SIZE).map(move |col| {
                let lit = ((col + row) % 2 == 0) == phase;
                (col, row, if lit { on } else { off })
            })
        })
        .collect()
}

/// Sends one checkerboard phase in random order and commits it once.
pub fn show_checker<D, R>(driver: &mut D, phase: bool, on: u8, off: u8, rng: &mut R) -> Result<()>
where
    D: GridDriver + ?Sized,
    R: Rng + ?Sized,
{
    let mut lights = checker_pattern(phase, on, off);
    lights.shuffle(rng);
    for (col, row, intensity) in lights {
        driver.set(col, row, intensity)?;
    }
    driver.commit().context("Failed to commit checkerboard")
}

/// Alternates the checkerboard every `interval` until `shutdown` is set.
/// Input is drained and ignored. Returns the number of phases shown.
pub fn run_checker<D, R>(
    driver: &mut D,
    interval: Duration,
    on: u8,
    off: u8,
    rng: &mut R,
    shutdown: &AtomicBool,
) -> Result<usize>
where
    D: GridDriver + ?Sized,
    R: Rng + ?Sized,
{
    driver.clear(None)?;
    driver.commit()?;
    let mut shown = 0;
    while !shutdown.load(Ordering::SeqCst) {
        show_checker(driver, shown % 2 == 1, on, off, rng)?;
        shown += 1;
        let ignored = driver.get()?;
        if !ignored.is_empty() {
            debug!("Checker: ignoring {} input event(s)", ignored.len());
        }
        std::thread::sleep(interval);
    }
    info!("Checker: stopped after {} phase(s)", shown);
    Ok(shown)
}
