// stack.rs --- transactional value stack
//
// Semantic actions push and pop values here while a grammar is being
// matched.  Since matching backtracks, every rule invocation takes a
// snapshot before running and either drops it (the rule matched) or
// restores it (the rule failed), so a failed rule never leaves values
// behind.  Snapshots nest: one per active rule invocation.
//
use crate::Error;

#[derive(Clone, Debug, PartialEq)]
pub struct ValueStack<V> {
    // Live values, the top of the stack is the last element
    values: Vec<V>,
    // Copies of `values` taken by `take_snapshot()`, most recent last
    snapshots: Vec<Vec<V>>,
}

impl<V> Default for ValueStack<V> {
    fn default() -> Self {
        Self {
            values: vec![],
            snapshots: vec![],
        }
    }
}

impl<V: Clone> ValueStack<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterates from the top of the stack down to the bottom
    pub fn iter(&self) -> impl Iterator<Item = &V> {
        self.values.iter().rev()
    }

    /// Values from the bottom of the stack up to the top
    pub fn as_slice(&self) -> &[V] {
        &self.values
    }

    pub fn into_vec(self) -> Vec<V> {
        self.values
    }

    /// Translate `depth` (0 being the top) into an index of `values`
    fn index(&self, op: &str, depth: usize) -> Result<usize, Error> {
        let len = self.values.len();
        if depth >= len {
            return Err(Error::Index(format!(
                "{}: depth {} out of bounds for a stack of {} values",
                op, depth, len
            )));
        }
        Ok(len - 1 - depth)
    }

    pub fn push(&mut self, value: V) {
        self.values.push(value);
    }

    /// Insert `value` below the `depth` topmost values.  A `depth`
    /// equal to the size of the stack inserts at the bottom.
    pub fn push_at(&mut self, depth: usize, value: V) -> Result<(), Error> {
        let len = self.values.len();
        if depth > len {
            return Err(Error::Index(format!(
                "push_at: depth {} out of bounds for a stack of {} values",
                depth, len
            )));
        }
        self.values.insert(len - depth, value);
        Ok(())
    }

    pub fn pop(&mut self) -> Result<V, Error> {
        self.pop_at(0)
    }

    pub fn pop_at(&mut self, depth: usize) -> Result<V, Error> {
        let idx = self.index("pop_at", depth)?;
        Ok(self.values.remove(idx))
    }

    pub fn peek(&self) -> Result<&V, Error> {
        self.peek_at(0)
    }

    pub fn peek_at(&self, depth: usize) -> Result<&V, Error> {
        let idx = self.index("peek_at", depth)?;
        Ok(&self.values[idx])
    }

    /// Replace the top value, returning the one that was there
    pub fn replace_top(&mut self, value: V) -> Result<V, Error> {
        self.replace_at(0, value)
    }

    pub fn replace_at(&mut self, depth: usize, value: V) -> Result<V, Error> {
        let idx = self.index("replace_at", depth)?;
        Ok(std::mem::replace(&mut self.values[idx], value))
    }

    pub fn duplicate_top(&mut self) -> Result<(), Error> {
        let top = self.peek()?.clone();
        self.values.push(top);
        Ok(())
    }

    pub fn swap_top_two(&mut self) -> Result<(), Error> {
        self.swap(2)
    }

    /// Reverse the order of the `n` topmost values
    pub fn swap(&mut self, n: usize) -> Result<(), Error> {
        let len = self.values.len();
        if n > len {
            return Err(Error::Index(format!(
                "swap: can't swap {} values on a stack of {} values",
                n, len
            )));
        }
        self.values[len - n..].reverse();
        Ok(())
    }

    // transactions

    pub fn take_snapshot(&mut self) {
        self.snapshots.push(self.values.clone());
    }

    pub fn restore_snapshot(&mut self) -> Result<(), Error> {
        self.values = self
            .snapshots
            .pop()
            .ok_or_else(|| Error::Index("restore_snapshot: no snapshot taken".to_string()))?;
        Ok(())
    }

    pub fn discard_snapshot(&mut self) -> Result<(), Error> {
        self.snapshots
            .pop()
            .ok_or_else(|| Error::Index("discard_snapshot: no snapshot taken".to_string()))?;
        Ok(())
    }

    /// Keep the changes made since the last snapshot when `commit` is
    /// true, roll them back otherwise
    pub fn remove_snapshot(&mut self, commit: bool) -> Result<(), Error> {
        if commit {
            self.discard_snapshot()
        } else {
            self.restore_snapshot()
        }
    }

    pub fn snapshot_count(&self) -> usize {
        self.snapshots.len()
    }

    pub fn reset(&mut self) {
        self.values.clear();
        self.snapshots.clear();
    }

    /// Independent copy of the live values, without any snapshot
    pub fn copy(&self) -> Self {
        Self {
            values: self.values.clone(),
            snapshots: vec![],
        }
    }
}
