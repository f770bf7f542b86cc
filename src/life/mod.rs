// src/life/mod.rs

//! The Game of Life model: a fixed-size cell matrix, a pause flag, and the
//! rules that advance one generation to the next.
//!
//! `LifeModel` owns the state. The `LifeGrid` trait carries every mutation
//! path (`set_cell`, `set_paused`, `tick`, `perturb`) so that decorators such
//! as `BoundLifeModel` only need to override the two primitive writes and the
//! derived operations automatically flow through them.

pub mod bound;
pub mod controller;

use rand::Rng;
use std::fmt;
use thiserror::Error;

pub use bound::{BoundLifeModel, ModelListener};

/// A single cell value. Only `ALIVE` counts as alive during rule evaluation.
pub type Cell = u8;

pub const DEAD: Cell = 0;
pub const ALIVE: Cell = 1;

/// Errors raised by model access and mutation.
#[derive(Debug, Error)]
pub enum GridError {
    #[error("invalid grid dimensions {width}x{height}: both must be positive")]
    InvalidDimensions { width: usize, height: usize },

    #[error("index ({col}, {row}) out of range for a {width}x{height} grid")]
    IndexOutOfRange {
        col: isize,
        row: isize,
        width: usize,
        height: usize,
    },

    #[error("expected a (col, row) pair but got {arity} component(s)")]
    InvalidIndexShape { arity: usize },

    #[error("initial data does not match a {width}x{height} grid")]
    InitialDataMismatch { width: usize, height: usize },

    #[error("cannot perturb {requested} distinct cells in a grid of {available}")]
    PerturbOverflow { requested: usize, available: usize },

    /// A change listener failed; the remaining listeners were not invoked.
    #[error(transparent)]
    Listener(#[from] anyhow::Error),
}

/// A committed change to the model, as broadcast to listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelChange {
    /// A cell was written. Coordinates are already normalized.
    Cell { col: usize, row: usize, value: Cell },
    /// The pause flag was written.
    Paused(bool),
}

/// A caller-supplied coordinate, column first. Components may be negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellCoord {
    pub col: isize,
    pub row: isize,
}

impl TryFrom<&[isize]> for CellCoord {
    type Error = GridError;

    fn try_from(components: &[isize]) -> Result<Self, Self::Error> {
        match components {
            [col, row] => Ok(CellCoord {
                col: *col,
                row: *row,
            }),
            _ => Err(GridError::InvalidIndexShape {
                arity: components.len(),
            }),
        }
    }
}

/// An immutable copy of the cell matrix, indexed `[row][col]`.
pub type Generation = Vec<Vec<Cell>>;

/// The cell matrix and pause flag.
#[derive(Debug, Clone)]
pub struct LifeModel {
    width: usize,
    height: usize,
    cells: Generation,
    paused: bool,
}

impl LifeModel {
    /// Creates an all-dead model.
    pub fn new(width: usize, height: usize) -> Result<Self, GridError> {
        if width == 0 || height == 0 {
            return Err(GridError::InvalidDimensions { width, height });
        }
        Ok(LifeModel {
            width,
            height,
            cells: vec![vec![DEAD; width]; height],
            paused: false,
        })
    }

    /// Creates a model from row-major initial data. The data must have exactly
    /// `height` rows of exactly `width` cells each.
    pub fn from_rows<R: AsRef<[Cell]>>(
        width: usize,
        height: usize,
        rows: &[R],
    ) -> Result<Self, GridError> {
        let mut model = Self::new(width, height)?;
        if rows.len() != height || rows.iter().any(|r| r.as_ref().len() != width) {
            return Err(GridError::InitialDataMismatch { width, height });
        }
        for (dst, src) in model.cells.iter_mut().zip(rows) {
            dst.copy_from_slice(src.as_ref());
        }
        Ok(model)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Applies the single wraparound step to each axis and bounds-checks the result.
    pub fn normalize(&self, col: isize, row: isize) -> Result<(usize, usize), GridError> {
        let wrap = |v: isize, dim: usize| if v < 0 { v + dim as isize } else { v };
        let (c, r) = (wrap(col, self.width), wrap(row, self.height));
        if c < 0 || r < 0 || c as usize >= self.width || r as usize >= self.height {
            return Err(GridError::IndexOutOfRange {
                col,
                row,
                width: self.width,
                height: self.height,
            });
        }
        Ok((c as usize, r as usize))
    }

    pub fn get_cell(&self, col: isize, row: isize) -> Result<Cell, GridError> {
        let (c, r) = self.normalize(col, row)?;
        Ok(self.cells[r][c])
    }

    /// Raw write without notification. Returns the normalized coordinate.
    fn write_cell(&mut self, col: isize, row: isize, value: Cell) -> Result<(usize, usize), GridError> {
        let (c, r) = self.normalize(col, row)?;
        self.cells[r][c] = value;
        Ok((c, r))
    }

    /// Copies the current matrix.
    pub fn snapshot(&self) -> Generation {
        self.cells.clone()
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Cell]> {
        self.cells.iter().map(Vec::as_slice)
    }

    pub fn live_count(&self) -> usize {
        self.cells.iter().flatten().filter(|&&v| v == ALIVE).count()
    }

    /// Counts live cells in the Moore neighborhood of `(col, row)` within
    /// `snapshot`. The board does not wrap: off-grid neighbors don't count.
    pub fn count_neighbors(&self, col: usize, row: usize, snapshot: &Generation) -> usize {
        let rows = row.saturating_sub(1)..=(row + 1).min(self.height - 1);
        let mut count = 0;
        for r in rows {
            for c in col.saturating_sub(1)..=(col + 1).min(self.width - 1) {
                if (c, r) != (col, row) && snapshot[r][c] == ALIVE {
                    count += 1;
                }
            }
        }
        count
    }

    /// Number of cells that could be neighbors of `(col, row)` on this board.
    pub fn neighbor_candidates(&self, col: usize, row: usize) -> usize {
        let span = |v: usize, dim: usize| (v + 1).min(dim - 1) - v.saturating_sub(1) + 1;
        span(col, self.width) * span(row, self.height) - 1
    }

    /// The value `(col, row)` takes in the generation after `snapshot`.
    pub fn next_state(&self, col: usize, row: usize, snapshot: &Generation) -> Cell {
        let neighbors = self.count_neighbors(col, row, snapshot);
        match (snapshot[row][col] == ALIVE, neighbors) {
            (true, 2) | (true, 3) => ALIVE, // survives
            (false, 3) => ALIVE,            // born
            _ => DEAD,                      // under/overpopulated, or stays dead
        }
    }
}

/// Equality compares dimensions and cells; the pause flag is ignored.
impl PartialEq for LifeModel {
    fn eq(&self, other: &Self) -> bool {
        self.width == other.width && self.height == other.height && self.cells == other.cells
    }
}

impl Eq for LifeModel {}

impl fmt::Display for LifeModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (r, row) in self.cells.iter().enumerate() {
            if r > 0 {
                write!(f, ",\n ")?;
            }
            let cells: Vec<String> = row.iter().map(|v| v.to_string()).collect();
            write!(f, "({})", cells.join(", "))?;
        }
        write!(f, ")")
    }
}

/// Mutation surface shared by the plain and the notifying model.
///
/// Implementors provide `set_cell` and `set_paused`; `tick`, `perturb` and
/// the toggles are expressed in terms of them, so any notification an
/// implementor attaches to those two writes also covers the derived operations.
pub trait LifeGrid {
    fn model(&self) -> &LifeModel;

    fn set_cell(&mut self, col: isize, row: isize, value: Cell) -> Result<(), GridError>;

    fn set_paused(&mut self, paused: bool) -> Result<(), GridError>;

    fn get_cell(&self, col: isize, row: isize) -> Result<Cell, GridError> {
        self.model().get_cell(col, row)
    }

    fn is_paused(&self) -> bool {
        self.model().is_paused()
    }

    /// Flips a cell between alive and dead, returning the new value.
    fn toggle_cell(&mut self, col: isize, row: isize) -> Result<Cell, GridError> {
        let next = if self.get_cell(col, row)? == DEAD { ALIVE } else { DEAD };
        self.set_cell(col, row, next)?;
        Ok(next)
    }

    fn toggle_paused(&mut self) -> Result<bool, GridError> {
        let next = !self.is_paused();
        self.set_paused(next)?;
        Ok(next)
    }

    /// Sets `count` distinct, uniformly chosen cells alive.
    fn perturb<R: Rng + ?Sized>(&mut self, count: usize, rng: &mut R) -> Result<(), GridError>
    where
        Self: Sized,
    {
        let width = self.model().width();
        let available = width * self.model().height();
        if count > available {
            return Err(GridError::PerturbOverflow {
                requested: count,
                available,
            });
        }
        for index in rand::seq::index::sample(rng, available, count) {
            self.set_cell((index % width) as isize, (index / width) as isize, ALIVE)?;
        }
        Ok(())
    }

    /// Advances one generation. Every cell is rewritten, row-major, with all
    /// neighbor counts taken from the pre-tick snapshot.
    fn tick(&mut self) -> Result<(), GridError> {
        let snapshot = self.model().snapshot();
        let (width, height) = (self.model().width(), self.model().height());
        for row in 0..height {
            for col in 0..width {
                let next = self.model().next_state(col, row, &snapshot);
                self.set_cell(col as isize, row as isize, next)?;
            }
        }
        Ok(())
    }
}

impl LifeGrid for LifeModel {
    fn model(&self) -> &LifeModel {
        self
    }

    fn set_cell(&mut self, col: isize, row: isize, value: Cell) -> Result<(), GridError> {
        self.write_cell(col, row, value).map(|_| ())
    }

    fn set_paused(&mut self, paused: bool) -> Result<(), GridError> {
        self.paused = paused;
        Ok(())
    }
}
