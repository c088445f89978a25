//! FIFO of ships with position labels.
//!
//! Every queued ship carries `<PHASE> (n)` where n is its 1-based position.
//! The head is relabelled `<PHASE> (Next)` when it is popped, and the rest
//! are renumbered after any pop or removal.

use std::collections::VecDeque;

use crate::model::{QueueSlot, Ship, ShipId, ShipStatus};

pub(crate) struct ShipQueue {
    ships: VecDeque<Ship>,
    label: fn(QueueSlot) -> ShipStatus,
}

impl ShipQueue {
    /// Creates a queue labelling ships with the given phase constructor,
    /// e.g. `ShipStatus::AwaitingRepairs`.
    pub(crate) fn new(label: fn(QueueSlot) -> ShipStatus) -> Self {
        Self {
            ships: VecDeque::new(),
            label,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.ships.len()
    }

    pub(crate) fn contains(&self, id: ShipId) -> bool {
        self.ships.iter().any(|s| s.id == id)
    }

    /// 1-based position of the ship, if queued.
    pub(crate) fn position(&self, id: ShipId) -> Option<usize> {
        self.ships.iter().position(|s| s.id == id).map(|i| i + 1)
    }

    /// Appends the ship at the tail, labels it, and returns it with its position.
    pub(crate) fn push(&mut self, mut ship: Ship) -> (usize, &Ship) {
        let position = self.ships.len() + 1;
        ship.status = (self.label)(QueueSlot::Position(position));
        self.ships.push_back(ship);
        let back = &self.ships[position - 1];
        (position, back)
    }

    /// Pops the head, labelled `Next`. Remaining ships are renumbered.
    pub(crate) fn pop_next(&mut self) -> Option<Ship> {
        let mut ship = self.ships.pop_front()?;
        ship.status = (self.label)(QueueSlot::Next);
        self.renumber();
        Some(ship)
    }

    /// Removes the ship wherever it is. Remaining ships are renumbered.
    pub(crate) fn remove(&mut self, id: ShipId) -> Option<Ship> {
        let index = self.ships.iter().position(|s| s.id == id)?;
        let ship = self.ships.remove(index);
        self.renumber();
        ship
    }

    /// Queued ships in order, for persisting after a renumber.
    pub(crate) fn iter(&self) -> impl Iterator<Item = &Ship> {
        self.ships.iter()
    }

    fn renumber(&mut self) {
        for (i, ship) in self.ships.iter_mut().enumerate() {
            ship.status = (self.label)(QueueSlot::Position(i + 1));
        }
    }
}
