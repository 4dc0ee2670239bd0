//! Operand stack implementation
//!
//! Every task owns one [`Stack`]; the engine owns one more, the "main" stack,
//! used by the host outside of any task. Capacity is fixed at
//! [`STACK_SIZE`] slots, matching the save-file layout.
//!
//! Overflow and underflow are not fatal: the operation is refused and the
//! caller reports [`ErrorCode::StackFull`] / [`ErrorCode::StackEmpty`].

use super::value::Value;
use crate::interpreter::constants::STACK_SIZE;
use crate::interpreter::errors::ErrorCode;

/// Fixed-capacity operand stack
#[derive(Debug, Clone, PartialEq)]
pub struct Stack {
    values: Vec<Value>,
    pub push_count: u32,
    pub pop_count: u32,
}

impl Stack {
    pub fn new() -> Self {
        Stack {
            values: Vec::with_capacity(STACK_SIZE),
            push_count: 0,
            pop_count: 0,
        }
    }

    /// Rebuild a stack from saved contents. Fails when `values` exceeds the capacity.
    pub fn from_parts(values: Vec<Value>, push_count: u32, pop_count: u32) -> Result<Self, ErrorCode> {
        if values.len() > STACK_SIZE {
            return Err(ErrorCode::StackFull);
        }
        Ok(Stack {
            values,
            push_count,
            pop_count,
        })
    }

    /// Push a value, refusing when all slots are used
    pub fn push(&mut self, value: Value) -> Result<(), ErrorCode> {
        if self.values.len() >= STACK_SIZE {
            return Err(ErrorCode::StackFull);
        }
        self.values.push(value);
        self.push_count = self.push_count.wrapping_add(1);
        Ok(())
    }

    /// Pop the top value
    pub fn pop(&mut self) -> Result<Value, ErrorCode> {
        let value = self.values.pop().ok_or(ErrorCode::StackEmpty)?;
        self.pop_count = self.pop_count.wrapping_add(1);
        Ok(value)
    }

    /// Peek `depth` entries below the top (0 = top)
    pub fn peek(&self, depth: usize) -> Option<&Value> {
        let len = self.values.len();
        if depth >= len {
            return None;
        }
        self.values.get(len - 1 - depth)
    }

    /// Mutable access `depth` entries below the top (0 = top)
    pub fn peek_mut(&mut self, depth: usize) -> Option<&mut Value> {
        let len = self.values.len();
        if depth >= len {
            return None;
        }
        self.values.get_mut(len - 1 - depth)
    }

    /// Exchange the two topmost entries
    pub fn swap_top(&mut self) -> Result<(), ErrorCode> {
        let len = self.values.len();
        if len < 2 {
            return Err(ErrorCode::StackEmpty);
        }
        self.values.swap(len - 1, len - 2);
        Ok(())
    }

    /// Number of occupied slots
    pub fn count(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Slots from bottom to top (for UI display and serialization)
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn clear(&mut self) {
        self.values.clear();
        self.push_count = 0;
        self.pop_count = 0;
    }
}

impl Default for Stack {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pops_in_reverse_push_order() {
        let mut stack = Stack::new();
        stack.push(Value::Int(1)).unwrap();
        stack.push(Value::Float(2.0)).unwrap();
        stack.push(Value::Object(3)).unwrap();
        assert_eq!(stack.pop(), Ok(Value::Object(3)));
        assert_eq!(stack.pop(), Ok(Value::Float(2.0)));
        assert_eq!(stack.pop(), Ok(Value::Int(1)));
        assert_eq!(stack.push_count, 3);
        assert_eq!(stack.pop_count, 3);
    }

    #[test]
    fn full_stack_refuses_push() {
        let mut stack = Stack::new();
        for i in 0..STACK_SIZE {
            stack.push(Value::Int(i as i32)).unwrap();
        }
        assert_eq!(stack.push(Value::Int(99)), Err(ErrorCode::StackFull));
        assert_eq!(stack.count(), STACK_SIZE);
        assert_eq!(stack.peek(0), Some(&Value::Int(STACK_SIZE as i32 - 1)));
    }

    #[test]
    fn empty_stack_refuses_pop() {
        let mut stack = Stack::new();
        assert_eq!(stack.pop(), Err(ErrorCode::StackEmpty));
        assert_eq!(stack.pop_count, 0);
    }

    #[test]
    fn swap_exchanges_top_two() {
        let mut stack = Stack::new();
        stack.push(Value::Int(1)).unwrap();
        stack.push(Value::Int(2)).unwrap();
        stack.swap_top().unwrap();
        assert_eq!(stack.values(), &[Value::Int(2), Value::Int(1)]);
    }

    #[test]
    fn from_parts_checks_capacity() {
        let too_many = vec![Value::Int(0); STACK_SIZE + 1];
        assert!(Stack::from_parts(too_many, 0, 0).is_err());
    }
}
