//! Fixed-capacity byte ring buffer for frame parsing
//!
//! Consuming a frame advances the read position instead of shifting the
//! remaining bytes.

/// Fixed-capacity ring buffer with O(1) advance
pub struct RingBuffer<const N: usize = 4096> {
    data: [u8; N],
    head: usize, // Write position (next empty slot)
    tail: usize, // Read position (first valid byte)
    len: usize,
}

impl<const N: usize> RingBuffer<N> {
    /// Create a new empty ring buffer
    pub const fn new() -> Self {
        Self {
            data: [0u8; N],
            head: 0,
            tail: 0,
            len: 0,
        }
    }

    /// Append bytes to the buffer, returns how many were stored
    ///
    /// Bytes beyond the free space are not stored.
    #[inline]
    pub fn extend(&mut self, bytes: &[u8]) -> usize {
        let count = bytes.len().min(self.free());
        for &b in &bytes[..count] {
            self.data[self.head] = b;
            self.head = (self.head + 1) % N;
        }
        self.len += count;
        count
    }

    /// Consume n bytes from the front
    #[inline]
    pub fn advance(&mut self, n: usize) {
        let n = n.min(self.len);
        self.tail = (self.tail + n) % N;
        self.len -= n;
    }

    /// Drop all buffered bytes
    pub fn clear(&mut self) {
        self.head = 0;
        self.tail = 0;
        self.len = 0;
    }

    /// Number of bytes available to read
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Remaining capacity
    #[inline]
    pub fn free(&self) -> usize {
        N - self.len
    }

    /// Read byte at logical index (handles wraparound)
    #[inline]
    pub fn get(&self, index: usize) -> Option<u8> {
        if index < self.len {
            Some(self.data[(self.tail + index) % N])
        } else {
            None
        }
    }

    /// Copy `M` bytes starting at logical index `start`
    pub fn peek<const M: usize>(&self, start: usize) -> Option<[u8; M]> {
        if start + M > self.len {
            return None;
        }
        let mut out = [0u8; M];
        for (i, slot) in out.iter_mut().enumerate() {
            *slot = self.data[(self.tail + start + i) % N];
        }
        Some(out)
    }
}

impl<const N: usize> Default for RingBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_operations() {
        let mut rb: RingBuffer<16> = RingBuffer::new();
        assert!(rb.is_empty());

        assert_eq!(rb.extend(&[1, 2, 3, 4, 5]), 5);
        assert_eq!(rb.len(), 5);
        assert_eq!(rb.get(0), Some(1));
        assert_eq!(rb.get(4), Some(5));
        assert_eq!(rb.get(5), None);
    }

    #[test]
    fn test_extend_stops_when_full() {
        let mut rb: RingBuffer<4> = RingBuffer::new();
        assert_eq!(rb.extend(&[1, 2, 3, 4, 5, 6]), 4);
        assert_eq!(rb.free(), 0);
        assert_eq!(rb.peek::<4>(0), Some([1, 2, 3, 4]));
    }

    #[test]
    fn test_wraparound_peek() {
        let mut rb: RingBuffer<8> = RingBuffer::new();
        rb.extend(&[1, 2, 3, 4, 5, 6]);
        rb.advance(5);
        rb.extend(&[7, 8, 9]);

        // Logical view [6, 7, 8, 9] spans the end of storage
        assert_eq!(rb.len(), 4);
        assert_eq!(rb.peek::<4>(0), Some([6, 7, 8, 9]));
        assert_eq!(rb.peek::<2>(3), None);
    }

    #[test]
    fn test_clear() {
        let mut rb: RingBuffer<8> = RingBuffer::new();
        rb.extend(&[1, 2, 3]);
        rb.clear();
        assert!(rb.is_empty());
        assert_eq!(rb.free(), 8);
    }
}
