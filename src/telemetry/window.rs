/// Fixed-capacity sliding window.
///
/// Pushes append at the tail. Whenever the length exceeds the capacity the
/// oldest entries are evicted from the head in batches of
/// `max(1, overflow / 2)` until the window fits again, so a burst of pushes
/// costs a few bulk drains instead of one shift per item.
///
/// After any sequence of N pushes the window holds `min(N, capacity)` items,
/// the most recent ones, in arrival order.
use std::collections::VecDeque;

#[derive(Debug, Clone)]
pub struct SlidingWindow<T> {
    items: VecDeque<T>,
    capacity: usize,
    /// Items ever pushed; the chart's x coordinate of the next point.
    total: u64,
}

impl<T> SlidingWindow<T> {
    /// A window holding at most `capacity` items (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            items: VecDeque::with_capacity(capacity + 1),
            capacity,
            total: 0,
        }
    }

    /// Append one item. Returns how many items were evicted.
    pub fn push(&mut self, item: T) -> usize {
        self.items.push_back(item);
        self.total += 1;
        self.evict()
    }

    /// Append several items, evicting once at the end.
    pub fn extend(&mut self, items: impl IntoIterator<Item = T>) -> usize {
        for item in items {
            self.items.push_back(item);
            self.total += 1;
        }
        self.evict()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of items pushed since creation, evicted ones included.
    pub fn total_pushed(&self) -> u64 {
        self.total
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    pub fn latest(&self) -> Option<&T> {
        self.items.back()
    }

    fn evict(&mut self) -> usize {
        let mut evicted = 0;
        while self.items.len() > self.capacity {
            let overflow = self.items.len() - self.capacity;
            let batch = (overflow / 2).max(1);
            self.items.drain(..batch);
            evicted += batch;
        }
        evicted
    }
}

impl<T: Clone> SlidingWindow<T> {
    pub fn to_vec(&self) -> Vec<T> {
        self.items.iter().cloned().collect()
    }
}
