// Tick history for stepping the viewer backward

use crate::interpreter::engine::Engine;
use crate::interpreter::errors::FormatError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("tick history memory limit exceeded: {current} + {size} > {limit}")]
    LimitExceeded {
        current: usize,
        size: usize,
        limit: usize,
    },

    #[error("could not capture engine state: {0}")]
    Capture(#[from] FormatError),
}

/// Engine state captured at the start of a tick, as save-file bytes
#[derive(Debug, Clone, PartialEq)]
pub struct TickState {
    pub tick: u32,
    pub executed_instructions: u32,
    pub task_count: usize,
    state: Vec<u8>,
}

impl TickState {
    /// Capture `engine` in save-file form
    pub fn capture(engine: &Engine) -> Result<Self, FormatError> {
        Ok(TickState {
            tick: engine.ticks(),
            executed_instructions: engine.executed_instructions(),
            task_count: engine.tasks().len(),
            state: engine.save_state_bytes()?,
        })
    }

    /// Put `engine` back into this state
    pub fn restore(&self, engine: &mut Engine) -> Result<(), FormatError> {
        engine.restore_state_bytes(&self.state)
    }

    /// Bytes held by this entry
    pub fn estimated_size(&self) -> usize {
        self.state.len() + std::mem::size_of::<Self>()
    }
}

/// Ordered tick states with a memory ceiling
#[derive(Debug)]
pub struct TickHistory {
    states: Vec<TickState>,
    max_memory: usize,
    current_memory: usize,
}

impl TickHistory {
    pub fn new(max_memory: usize) -> Self {
        TickHistory {
            states: Vec::new(),
            max_memory,
            current_memory: 0,
        }
    }

    /// Append a state, refusing it once the memory limit would be passed
    pub fn push(&mut self, state: TickState) -> Result<(), HistoryError> {
        let size = state.estimated_size();

        if self.current_memory + size > self.max_memory {
            return Err(HistoryError::LimitExceeded {
                current: self.current_memory,
                size,
                limit: self.max_memory,
            });
        }

        self.current_memory += size;
        self.states.push(state);
        Ok(())
    }

    /// Capture `engine` and append it
    pub fn record(&mut self, engine: &Engine) -> Result<(), HistoryError> {
        let state = TickState::capture(engine)?;
        self.push(state)
    }

    /// Drop the newest state and return it
    pub fn pop(&mut self) -> Option<TickState> {
        let state = self.states.pop()?;
        self.current_memory -= state.estimated_size();
        Some(state)
    }

    /// Forget every state from `len` onward
    pub fn truncate(&mut self, len: usize) {
        while self.states.len() > len {
            self.pop();
        }
    }

    pub fn get(&self, index: usize) -> Option<&TickState> {
        self.states.get(index)
    }

    pub fn last(&self) -> Option<&TickState> {
        self.states.last()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn memory_usage(&self) -> usize {
        self.current_memory
    }

    pub fn memory_limit(&self) -> usize {
        self.max_memory
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(tick: u32, bytes: usize) -> TickState {
        TickState {
            tick,
            executed_instructions: 0,
            task_count: 0,
            state: vec![0; bytes],
        }
    }

    #[test]
    fn refuses_states_past_the_limit() {
        let one = state(0, 100).estimated_size();
        let mut history = TickHistory::new(one * 2);
        history.push(state(0, 100)).unwrap();
        history.push(state(1, 100)).unwrap();
        assert!(matches!(
            history.push(state(2, 100)),
            Err(HistoryError::LimitExceeded { .. })
        ));
        assert_eq!(history.len(), 2);
        assert_eq!(history.memory_usage(), one * 2);
    }

    #[test]
    fn truncate_releases_memory() {
        let mut history = TickHistory::new(usize::MAX);
        for tick in 0..5 {
            history.push(state(tick, 10)).unwrap();
        }
        history.truncate(2);
        assert_eq!(history.len(), 2);
        assert_eq!(history.last().map(|s| s.tick), Some(1));
        assert_eq!(history.memory_usage(), 2 * state(0, 10).estimated_size());
    }
}
