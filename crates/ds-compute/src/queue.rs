//! Priority queue of pending tasks.

use std::collections::VecDeque;

/// Pending items ordered by descending priority, FIFO among equals.
#[derive(Debug)]
pub(crate) struct PendingQueue<T> {
    items: VecDeque<(i32, T)>,
}

impl<T> PendingQueue<T> {
    pub(crate) fn new() -> Self {
        Self { items: VecDeque::new() }
    }

    /// Insert after every item of equal or higher priority.
    pub(crate) fn push(&mut self, priority: i32, item: T) {
        let at = self.items.partition_point(|(p, _)| *p >= priority);
        self.items.insert(at, (priority, item));
    }

    pub(crate) fn pop(&mut self) -> Option<T> {
        self.items.pop_front().map(|(_, item)| item)
    }

    pub(crate) fn len(&self) -> usize {
        self.items.len()
    }

    pub(crate) fn drain(&mut self) -> impl Iterator<Item = T> + '_ {
        self.items.drain(..).map(|(_, item)| item)
    }
}
