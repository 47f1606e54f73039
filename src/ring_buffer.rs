/// A fixed-capacity history. Storage is allocated once; after it fills up,
/// every [`push`](RingBuffer::push) overwrites the oldest value in place.
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    data: Vec<T>,
    head: usize,
    capacity: usize,
}

impl<T: Copy> RingBuffer<T> {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "a ring buffer needs room for at least one value");
        Self {
            data: Vec::with_capacity(capacity),
            head: 0,
            capacity,
        }
    }

    /// Appends `value`, evicting the oldest value if the buffer is full.
    /// Returns the evicted value.
    pub fn push(&mut self, value: T) -> Option<T> {
        if self.data.len() < self.capacity {
            self.data.push(value);
            return None;
        }
        let evicted = std::mem::replace(&mut self.data[self.head], value);
        self.head = (self.head + 1) % self.capacity;
        Some(evicted)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        let (newer, older) = self.data.split_at(self.head);
        older.iter().chain(newer.iter())
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.iter().copied().collect()
    }

    pub fn latest(&self) -> Option<T> {
        match self.head {
            0 => self.data.last().copied(),
            h => self.data.get(h - 1).copied(),
        }
    }
}

impl RingBuffer<f64> {
    /// `(position, value)` pairs, positions counted from the oldest value,
    /// ready for a line chart.
    pub fn points(&self) -> Vec<(f64, f64)> {
        self.iter()
            .enumerate()
            .map(|(x, &y)| (x as f64, y))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buf_init() {
        let buf: RingBuffer<f64> = RingBuffer::new(100);
        assert_eq!(buf.capacity(), 100);
        assert!(buf.is_empty());
        assert_eq!(buf.latest(), None);
    }

    #[test]
    #[should_panic]
    fn zero_capacity_panics() {
        let _ = RingBuffer::<f64>::new(0);
    }

    #[test]
    fn never_grows_past_capacity() {
        let mut buf = RingBuffer::new(100);
        for i in 0..1000 {
            buf.push(i);
            assert!(buf.len() <= 100);
        }
        assert_eq!(buf.len(), 100);
        assert_eq!(buf.to_vec(), (900..1000).collect::<Vec<_>>());
    }

    #[test]
    fn one_past_capacity_drops_the_first() {
        let pushes: Vec<i32> = (0..101).map(|i| i * 7 - 3).collect();
        let mut buf = RingBuffer::new(100);
        let evicted: Vec<Option<i32>> = pushes.iter().map(|&v| buf.push(v)).collect();

        assert_eq!(buf.to_vec(), pushes[1..101].to_vec());
        assert_eq!(evicted[100], Some(pushes[0]));
        assert!(evicted[..100].iter().all(Option::is_none));
        assert_eq!(buf.latest(), Some(pushes[100]));
    }

    #[test]
    fn points_start_at_zero() {
        let mut buf = RingBuffer::new(3);
        for v in [5.0, 6.0, 7.0, 8.0] {
            buf.push(v);
        }
        assert_eq!(buf.points(), vec![(0.0, 6.0), (1.0, 7.0), (2.0, 8.0)]);
    }
}
