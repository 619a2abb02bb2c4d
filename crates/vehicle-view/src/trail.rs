//! Bounded history of vehicle positions.

use glam::DVec3;

/// Default number of trail points kept.
pub const TRAIL_CAPACITY: usize = 10_000;

/// Fixed-capacity ring of local NED positions, oldest first.
///
/// Storage is allocated once; when full, each append overwrites the oldest slot.
#[derive(Debug, Clone)]
pub struct TrailBuffer {
    slots: Vec<DVec3>,
    /// Next slot to write.
    head: usize,
    capacity: usize,
}

impl Default for TrailBuffer {
    fn default() -> Self {
        Self::new(TRAIL_CAPACITY)
    }
}

impl TrailBuffer {
    /// A zero capacity is bumped to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            slots: Vec::with_capacity(capacity),
            head: 0,
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn append(&mut self, point: DVec3) {
        if self.slots.len() < self.capacity {
            self.slots.push(point);
        } else {
            self.slots[self.head] = point;
        }
        self.head = (self.head + 1) % self.capacity;
    }

    /// Most recently appended point.
    pub fn latest(&self) -> Option<DVec3> {
        if self.slots.is_empty() {
            return None;
        }
        let idx = (self.head + self.capacity - 1) % self.capacity;
        self.slots.get(idx).copied()
    }

    /// Points in chronological order.
    pub fn iter(&self) -> impl Iterator<Item = DVec3> + '_ {
        let start = if self.slots.len() < self.capacity {
            0
        } else {
            self.head
        };
        let len = self.slots.len();
        (0..len).map(move |i| self.slots[(start + i) % len])
    }

    pub fn snapshot(&self) -> Vec<DVec3> {
        self.iter().collect()
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.head = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: f64) -> DVec3 {
        DVec3::new(x, 0.0, 0.0)
    }

    #[test]
    fn keeps_last_points_oldest_first() {
        let mut trail = TrailBuffer::new(10);
        for i in 0..13 {
            trail.append(p(i as f64));
        }
        let expected: Vec<DVec3> = (3..13).map(|i| p(i as f64)).collect();
        assert_eq!(trail.len(), 10);
        assert_eq!(trail.snapshot(), expected);
        assert_eq!(trail.latest(), Some(p(12.0)));
    }

    #[test]
    fn partial_fill_is_in_order() {
        let mut trail = TrailBuffer::new(4);
        trail.append(p(1.0));
        trail.append(p(2.0));
        assert_eq!(trail.snapshot(), vec![p(1.0), p(2.0)]);
        assert_eq!(trail.latest(), Some(p(2.0)));
    }

    #[test]
    fn never_exceeds_capacity() {
        let mut trail = TrailBuffer::new(7);
        for n in 0..100 {
            trail.append(p(n as f64));
            assert!(trail.len() <= 7);
            let snap = trail.snapshot();
            // Chronological and contiguous.
            for w in snap.windows(2) {
                assert_eq!(w[1].x - w[0].x, 1.0);
            }
            assert_eq!(snap.last().copied(), Some(p(n as f64)));
        }
    }

    #[test]
    fn storage_does_not_grow_after_wrap() {
        let mut trail = TrailBuffer::new(3);
        for i in 0..3 {
            trail.append(p(i as f64));
        }
        let cap_before = trail.slots.capacity();
        for i in 3..50 {
            trail.append(p(i as f64));
        }
        assert_eq!(trail.slots.capacity(), cap_before);
    }

    #[test]
    fn clear_and_reuse() {
        let mut trail = TrailBuffer::new(2);
        trail.append(p(1.0));
        trail.append(p(2.0));
        trail.append(p(3.0));
        trail.clear();
        assert!(trail.is_empty());
        assert_eq!(trail.latest(), None);
        trail.append(p(9.0));
        assert_eq!(trail.snapshot(), vec![p(9.0)]);
    }

    #[test]
    fn zero_capacity_holds_one() {
        let mut trail = TrailBuffer::new(0);
        trail.append(p(1.0));
        trail.append(p(2.0));
        assert_eq!(trail.capacity(), 1);
        assert_eq!(trail.snapshot(), vec![p(2.0)]);
    }
}
