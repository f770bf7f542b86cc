// src/driver/console.rs

//! A virtual light grid drawn as text. Useful without a controller attached.
//!
//! Each light is one character: `.` off, `-` dim, `#` lit. Committed updates
//! land in the frame immediately; the frame is written out at most once per
//! input poll so a full-board tick produces one picture rather than one per cell.

use super::{GridDriver, UiInputEvent};
use anyhow::{Context, Result};
use log::trace;
use std::io::Write;

const DIM_THRESHOLD: u8 = 64;

pub struct ConsoleDriver<W: Write> {
    out: W,
    cols: usize,
    rows: usize,
    frame: Vec<Vec<u8>>,
    pending: Vec<(usize, usize, u8)>,
    dirty: bool,
    frames_drawn: usize,
}

impl<W: Write> ConsoleDriver<W> {
    pub fn new(out: W, cols: usize, rows: usize) -> Self {
        ConsoleDriver {
            out,
            cols,
            rows,
            frame: vec![vec![0; cols]; rows],
            pending: Vec::new(),
            dirty: false,
            frames_drawn: 0,
        }
    }

    pub fn frame(&self) -> &[Vec<u8>] {
        &self.frame
    }

    pub fn frames_drawn(&self) -> usize {
        self.frames_drawn
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    fn glyph(intensity: u8) -> char {
        match intensity {
            0 => '.',
            v if v < DIM_THRESHOLD => '-',
            _ => '#',
        }
    }

    fn present(&mut self) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }
        let mut text = String::with_capacity((self.cols + 1) * self.rows + 1);
        for row in &self.frame {
            text.extend(row.iter().map(|&v| Self::glyph(v)));
            text.push('\n');
        }
        text.push('\n');
        self.out
            .write_all(text.as_bytes())
            .and_then(|_| self.out.flush())
            .context("Failed to draw console frame")?;
        self.dirty = false;
        self.frames_drawn += 1;
        Ok(())
    }
}

impl<W: Write> GridDriver for ConsoleDriver<W> {
    fn get(&mut self) -> Result<Vec<UiInputEvent>> {
        self.present()?;
        Ok(Vec::new())
    }

    fn set(&mut self, col: usize, row: usize, intensity: u8) -> Result<()> {
        if col >= self.cols || row >= self.rows {
            trace!("ConsoleDriver: ignoring light ({}, {}) outside the frame", col, row);
            return Ok(());
        }
        self.pending.push((col, row, intensity));
        Ok(())
    }

    fn clear(&mut self, at: Option<(usize, usize)>) -> Result<()> {
        match at {
            Some((col, row)) => self.set(col, row, 0),
            None => {
                for row in 0..self.rows {
                    for col in 0..self.cols {
                        self.pending.push((col, row, 0));
                    }
                }
                Ok(())
            }
        }
    }

    fn commit(&mut self) -> Result<()> {
        for (col, row, intensity) in self.pending.drain(..) {
            self.frame[row][col] = intensity;
            self.dirty = true;
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.pending.clear();
        self.present()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output_text(driver: &ConsoleDriver<Vec<u8>>) -> String {
        String::from_utf8_lossy(driver.output()).into_owned()
    }

    #[test]
    fn it_should_draw_committed_lights_on_the_next_poll() -> Result<()> {
        let mut driver = ConsoleDriver::new(Vec::new(), 3, 2);
        driver.set(0, 0, 127)?;
        driver.set(2, 1, 1)?;
        assert!(output_text(&driver).is_empty());

        driver.commit()?;
        assert!(output_text(&driver).is_empty());

        assert!(driver.get()?.is_empty());
        assert_eq!(output_text(&driver), "#..\n..-\n\n");
        assert_eq!(driver.frames_drawn(), 1);
        Ok(())
    }

    #[test]
    fn it_should_draw_once_per_poll_regardless_of_commit_count() -> Result<()> {
        let mut driver = ConsoleDriver::new(Vec::new(), 2, 2);
        for col in 0..2 {
            driver.set(col, 0, 127)?;
            driver.commit()?;
        }
        driver.get()?;
        driver.get()?;
        assert_eq!(driver.frames_drawn(), 1);
        Ok(())
    }

    #[test]
    fn it_should_ignore_lights_outside_the_frame() -> Result<()> {
        let mut driver = ConsoleDriver::new(Vec::new(), 2, 2);
        driver.set(5, 5, 127)?;
        driver.commit()?;
        assert_eq!(driver.frame(), &[vec![0u8, 0], vec![0u8, 0]]);
        Ok(())
    }

    #[test]
    fn it_should_clear_the_whole_frame() -> Result<()> {
        let mut driver = ConsoleDriver::new(Vec::new(), 2, 1);
        driver.set(0, 0, 127)?;
        driver.set(1, 0, 127)?;
        driver.commit()?;
        driver.clear(None)?;
        driver.commit()?;
        assert_eq!(driver.frame(), &[vec![0u8, 0]]);
        Ok(())
    }
}
