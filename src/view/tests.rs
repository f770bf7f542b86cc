// src/view/tests.rs

use super::*;
use crate::driver::mock::{DriverCall, MockDriver};
use crate::life::{BoundLifeModel, LifeGrid, ALIVE};
use std::cell::RefCell;
use std::rc::Rc;

fn mock_view() -> (Rc<RefCell<MockDriver>>, LifeView) {
    let mock = Rc::new(RefCell::new(MockDriver::new()));
    let view = LifeView::new(mock.clone(), Palette::default());
    (mock, view)
}

#[test]
fn it_should_light_live_cells_at_full_brightness_and_commit() -> anyhow::Result<()> {
    let (mock, view) = mock_view();
    let model = LifeModel::new(8, 8)?;

    view.renderer().on_model_change(
        &model,
        &ModelChange::Cell {
            col: 5,
            row: 5,
            value: ALIVE,
        },
    )?;
    view.renderer().on_model_change(
        &model,
        &ModelChange::Cell {
            col: 5,
            row: 5,
            value: DEAD,
        },
    )?;

    assert_eq!(
        mock.borrow().calls(),
        &[
            DriverCall::Set {
                col: 5,
                row: 5,
                intensity: 127
            },
            DriverCall::Commit,
            DriverCall::Set {
                col: 5,
                row: 5,
                intensity: 0
            },
            DriverCall::Commit,
        ]
    );
    Ok(())
}

#[test]
fn it_should_render_pause_on_the_reserved_button() -> anyhow::Result<()> {
    let (mock, view) = mock_view();
    let model = LifeModel::new(8, 8)?;

    view.renderer()
        .on_model_change(&model, &ModelChange::Paused(true))?;
    view.renderer()
        .on_model_change(&model, &ModelChange::Paused(false))?;

    assert_eq!(mock.borrow().sets(), vec![(8, 0, 127), (8, 0, 1)]);
    Ok(())
}

#[test]
fn it_should_treat_any_nonzero_value_as_lit() -> anyhow::Result<()> {
    let (mock, view) = mock_view();
    let model = LifeModel::new(8, 8)?;
    view.renderer().on_model_change(
        &model,
        &ModelChange::Cell {
            col: 0,
            row: 0,
            value: 9,
        },
    )?;
    assert_eq!(mock.borrow().sets(), vec![(0, 0, 127)]);
    Ok(())
}

#[test]
fn it_should_render_model_writes_once_bound_as_a_listener() -> anyhow::Result<()> {
    let (mock, view) = mock_view();
    let mut model = BoundLifeModel::new(LifeModel::new(3, 3)?);
    model.add_listener(view.model_listener());

    model.set_cell(1, 2, ALIVE)?;
    model.set_paused(true)?;
    model.tick()?;

    let mock = mock.borrow();
    assert_eq!(mock.sets()[..2], [(1, 2, 127), (8, 0, 127)]);
    // Tick rewrites all nine cells, committing after each.
    assert_eq!(mock.sets().len(), 2 + 9);
    assert_eq!(mock.count(&DriverCall::Commit), 2 + 9);
    Ok(())
}

#[test]
fn it_should_paint_the_whole_board_with_a_single_commit() -> anyhow::Result<()> {
    let (mock, view) = mock_view();
    let model = LifeModel::from_rows(3, 2, &[[1u8, 0, 0], [0, 0, 1]])?;

    view.renderer().render_all(&model)?;

    let mock = mock.borrow();
    assert_eq!(mock.calls()[0], DriverCall::Clear(None));
    assert_eq!(mock.sets(), vec![(0, 0, 127), (2, 1, 127), (8, 0, 1)]);
    assert_eq!(mock.count(&DriverCall::Commit), 1);
    Ok(())
}

#[test_log::test]
fn it_should_dispatch_each_event_to_every_listener_in_order() -> anyhow::Result<()> {
    let (mock, mut view) = mock_view();
    let seen: Rc<RefCell<Vec<(usize, UiInputEvent)>>> = Rc::default();
    for id in 0..2 {
        let seen = Rc::clone(&seen);
        view.add_listener(move |event| {
            seen.borrow_mut().push((id, *event));
            Ok(())
        });
    }
    let a = UiInputEvent::new(1, 1, 127);
    let b = UiInputEvent::new(8, 0, 127);
    mock.borrow_mut().push_event(a);
    mock.borrow_mut().push_event(b);

    assert_eq!(view.handle_input()?, 2);
    assert_eq!(*seen.borrow(), vec![(0, a), (1, a), (0, b), (1, b)]);
    Ok(())
}

#[test]
fn it_should_return_immediately_when_no_input_is_buffered() -> anyhow::Result<()> {
    let (mock, mut view) = mock_view();
    let calls = Rc::new(RefCell::new(0));
    let counter = Rc::clone(&calls);
    view.add_listener(move |_| {
        *counter.borrow_mut() += 1;
        Ok(())
    });

    assert_eq!(view.handle_input()?, 0);
    assert_eq!(*calls.borrow(), 0);
    assert_eq!(mock.borrow().calls(), &[DriverCall::Get]);
    Ok(())
}

#[test]
fn it_should_let_listeners_render_through_the_same_driver() -> anyhow::Result<()> {
    let (mock, mut view) = mock_view();
    let model = Rc::new(RefCell::new(BoundLifeModel::new(LifeModel::new(8, 8)?)));
    model.borrow_mut().add_listener(view.model_listener());
    let input_model = Rc::clone(&model);
    view.add_listener(move |event| {
        input_model
            .borrow_mut()
            .toggle_cell(event.col as isize, event.row as isize)?;
        Ok(())
    });

    mock.borrow_mut().push_event(UiInputEvent::new(3, 4, 127));
    view.handle_input()?;

    assert_eq!(model.borrow().get_cell(3, 4)?, ALIVE);
    assert_eq!(mock.borrow().sets(), vec![(3, 4, 127)]);
    Ok(())
}

#[test]
fn it_should_propagate_listener_failures() {
    let (mock, mut view) = mock_view();
    view.add_listener(|_| anyhow::bail!("handler failed"));
    mock.borrow_mut().push_event(UiInputEvent::new(0, 0, 127));
    assert!(view.handle_input().is_err());
}
