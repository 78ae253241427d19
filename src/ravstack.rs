// Copyright 2021 Sean Gillespie.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The variation stack.
//!
//! Each entry holds the position before the last move played at that level and the position after it. A
//! variation replaces the last move, so it branches from the entry's earlier position; closing the variation
//! returns to the later one. Every snapshot is an owned clone, never shared with the live board.

use std::mem;

use thiserror::Error;

use crate::{
    position::Position,
    san::{MoveError, San},
};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Error)]
pub enum VariationError {
    #[error("a variation must follow a move")]
    NoMoveToReplace,
    #[error("no variation is open")]
    NoOpenVariation,
}

#[derive(Clone, Debug)]
struct Entry {
    before: Option<Position>,
    current: Position,
}

#[derive(Clone, Debug)]
pub struct RavStack {
    entries: Vec<Entry>,
}

impl RavStack {
    pub fn new(start: Position) -> RavStack {
        RavStack {
            entries: vec![Entry {
                before: None,
                current: start,
            }],
        }
    }

    fn top(&self) -> &Entry {
        // The bottom entry is never popped.
        &self.entries[self.entries.len() - 1]
    }

    fn top_mut(&mut self) -> &mut Entry {
        let last = self.entries.len() - 1;
        &mut self.entries[last]
    }

    pub fn current(&self) -> &Position {
        &self.top().current
    }

    /// Number of variations currently open.
    pub fn depth(&self) -> usize {
        self.entries.len() - 1
    }

    /// Plays `san` at the current level. On error nothing changes.
    pub fn play(&mut self, san: &San) -> Result<&Position, MoveError> {
        let mut next = self.current().clone();
        next.play(san)?;

        let top = self.top_mut();
        top.before = Some(mem::replace(&mut top.current, next));
        Ok(&top.current)
    }

    pub fn start_variation(&mut self) -> Result<(), VariationError> {
        let branch = self
            .top()
            .before
            .clone()
            .ok_or(VariationError::NoMoveToReplace)?;
        self.entries.push(Entry {
            before: None,
            current: branch,
        });
        Ok(())
    }

    pub fn end_variation(&mut self) -> Result<(), VariationError> {
        if self.depth() == 0 {
            return Err(VariationError::NoOpenVariation);
        }
        self.entries.pop();
        Ok(())
    }
}
