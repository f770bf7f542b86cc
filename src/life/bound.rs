// src/life/bound.rs

//! A `LifeModel` that broadcasts every committed write to its listeners.

use super::{Cell, GridError, LifeGrid, LifeModel, ModelChange};

/// Callback invoked after each committed write with the model and the change.
pub type ModelListener = Box<dyn FnMut(&LifeModel, &ModelChange) -> anyhow::Result<()>>;

pub struct BoundLifeModel {
    model: LifeModel,
    listeners: Vec<ModelListener>,
}

impl BoundLifeModel {
    pub fn new(model: LifeModel) -> Self {
        BoundLifeModel {
            model,
            listeners: Vec::new(),
        }
    }

    /// Appends a listener. Listeners run in registration order and are never
    /// de-duplicated or removed.
    pub fn add_listener<F>(&mut self, listener: F)
    where
        F: FnMut(&LifeModel, &ModelChange) -> anyhow::Result<()> + 'static,
    {
        self.listeners.push(Box::new(listener));
        log::trace!("BoundLifeModel: {} listener(s) registered", self.listeners.len());
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn into_inner(self) -> LifeModel {
        self.model
    }

    fn notify(&mut self, change: ModelChange) -> Result<(), GridError> {
        for listener in self.listeners.iter_mut() {
            listener(&self.model, &change)?;
        }
        Ok(())
    }
}

impl LifeGrid for BoundLifeModel {
    fn model(&self) -> &LifeModel {
        &self.model
    }

    fn set_cell(&mut self, col: isize, row: isize, value: Cell) -> Result<(), GridError> {
        let (col, row) = self.model.write_cell(col, row, value)?;
        self.notify(ModelChange::Cell { col, row, value })
    }

    fn set_paused(&mut self, paused: bool) -> Result<(), GridError> {
        self.model.paused = paused;
        self.notify(ModelChange::Paused(paused))
    }
}

impl PartialEq for BoundLifeModel {
    fn eq(&self, other: &Self) -> bool {
        self.model == other.model
    }
}

impl PartialEq<LifeModel> for BoundLifeModel {
    fn eq(&self, other: &LifeModel) -> bool {
        &self.model == other
    }
}

impl std::fmt::Debug for BoundLifeModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundLifeModel")
            .field("model", &self.model)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
