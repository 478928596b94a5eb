use std::cell::RefCell;
use std::rc::Rc;

use serde::Serialize;

use crate::grid::{ColorId, Position};

/// Hook interface for host-side presentation (HUD, audio, particles).
///
/// Every method defaults to a no-op so observers only implement what they
/// render.
pub trait GridObserver {
    fn on_score_changed(&mut self, _score: u32) {}
    fn on_moves_changed(&mut self, _remaining: u32) {}
    fn on_cascade_start(&mut self) {}
    fn on_cascade_end(&mut self) {}
    fn on_rebuild_start(&mut self) {}
    fn on_rebuild_end(&mut self) {}
    fn on_pitch_raise(&mut self) {}
    fn on_pitch_normalize(&mut self) {}
    fn on_cell_cleared(&mut self, _position: Position) {}
    fn on_cell_spawned(&mut self, _position: Position, _color: ColorId) {}
    fn on_color_corrected(&mut self, _position: Position, _color: ColorId) {}
    fn on_cell_moved(&mut self, _from: Position, _to: Position) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum GridEvent {
    ScoreChanged { score: u32 },
    MovesChanged { remaining: u32 },
    CascadeStart,
    CascadeEnd,
    RebuildStart,
    RebuildEnd,
    PitchRaise,
    PitchNormalize,
    CellCleared { position: Position },
    CellSpawned { position: Position, color: ColorId },
    ColorCorrected { position: Position, color: ColorId },
    CellMoved { from: Position, to: Position },
}

impl GridEvent {
    pub fn dispatch(&self, observer: &mut dyn GridObserver) {
        match *self {
            GridEvent::ScoreChanged { score } => observer.on_score_changed(score),
            GridEvent::MovesChanged { remaining } => observer.on_moves_changed(remaining),
            GridEvent::CascadeStart => observer.on_cascade_start(),
            GridEvent::CascadeEnd => observer.on_cascade_end(),
            GridEvent::RebuildStart => observer.on_rebuild_start(),
            GridEvent::RebuildEnd => observer.on_rebuild_end(),
            GridEvent::PitchRaise => observer.on_pitch_raise(),
            GridEvent::PitchNormalize => observer.on_pitch_normalize(),
            GridEvent::CellCleared { position } => observer.on_cell_cleared(position),
            GridEvent::CellSpawned { position, color } => observer.on_cell_spawned(position, color),
            GridEvent::ColorCorrected { position, color } => {
                observer.on_color_corrected(position, color)
            }
            GridEvent::CellMoved { from, to } => observer.on_cell_moved(from, to),
        }
    }
}

/// Synchronous fan-out to subscribers, invoked in subscription order.
#[derive(Default)]
pub struct EventBus {
    observers: Vec<Box<dyn GridObserver>>,
}

impl EventBus {
    pub fn new(observers: Vec<Box<dyn GridObserver>>) -> Self {
        Self { observers }
    }

    pub fn subscribe(&mut self, observer: Box<dyn GridObserver>) {
        self.observers.push(observer);
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    pub fn emit(&mut self, event: GridEvent) {
        tracing::trace!(?event, "grid event");
        for observer in &mut self.observers {
            event.dispatch(observer.as_mut());
        }
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("observers", &self.observers.len())
            .finish()
    }
}

/// Observer that records every event; clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Rc<RefCell<Vec<GridEvent>>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observer(&self) -> Box<dyn GridObserver> {
        Box::new(self.clone())
    }

    pub fn events(&self) -> Vec<GridEvent> {
        self.events.borrow().clone()
    }

    pub fn count(&self, pred: impl Fn(&GridEvent) -> bool) -> usize {
        self.events.borrow().iter().filter(|event| pred(event)).count()
    }

    pub fn clear(&self) {
        self.events.borrow_mut().clear();
    }

    fn push(&self, event: GridEvent) {
        self.events.borrow_mut().push(event);
    }
}

impl GridObserver for EventLog {
    fn on_score_changed(&mut self, score: u32) {
        self.push(GridEvent::ScoreChanged { score });
    }

    fn on_moves_changed(&mut self, remaining: u32) {
        self.push(GridEvent::MovesChanged { remaining });
    }

    fn on_cascade_start(&mut self) {
        self.push(GridEvent::CascadeStart);
    }

    fn on_cascade_end(&mut self) {
        self.push(GridEvent::CascadeEnd);
    }

    fn on_rebuild_start(&mut self) {
        self.push(GridEvent::RebuildStart);
    }

    fn on_rebuild_end(&mut self) {
        self.push(GridEvent::RebuildEnd);
    }

    fn on_pitch_raise(&mut self) {
        self.push(GridEvent::PitchRaise);
    }

    fn on_pitch_normalize(&mut self) {
        self.push(GridEvent::PitchNormalize);
    }

    fn on_cell_cleared(&mut self, position: Position) {
        self.push(GridEvent::CellCleared { position });
    }

    fn on_cell_spawned(&mut self, position: Position, color: ColorId) {
        self.push(GridEvent::CellSpawned { position, color });
    }

    fn on_color_corrected(&mut self, position: Position, color: ColorId) {
        self.push(GridEvent::ColorCorrected { position, color });
    }

    fn on_cell_moved(&mut self, from: Position, to: Position) {
        self.push(GridEvent::CellMoved { from, to });
    }
}
