use serde::{Deserialize, Serialize};

/// Word-packed null map. Bit = 1 means the value at that row is NULL.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NullBitmap {
    data: Vec<u64>,
    len: usize,
}

impl NullBitmap {
    pub fn new() -> Self {
        Self {
            data: Vec::new(),
            len: 0,
        }
    }

    pub fn new_valid(len: usize) -> Self {
        let num_words = len.div_ceil(64);
        Self {
            data: vec![0; num_words],
            len,
        }
    }

    pub fn new_null(len: usize) -> Self {
        let num_words = len.div_ceil(64);
        Self {
            data: vec![u64::MAX; num_words],
            len,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn is_null(&self, index: usize) -> bool {
        if index >= self.len {
            return true;
        }
        let word = index / 64;
        let bit = index % 64;
        (self.data[word] >> bit) & 1 == 1
    }

    #[inline]
    pub fn is_valid(&self, index: usize) -> bool {
        !self.is_null(index)
    }

    #[inline]
    pub fn set(&mut self, index: usize, is_null: bool) {
        if index >= self.len {
            return;
        }
        let word = index / 64;
        let bit = index % 64;
        if is_null {
            self.data[word] |= 1 << bit;
        } else {
            self.data[word] &= !(1 << bit);
        }
    }

    pub fn push(&mut self, is_null: bool) {
        let word = self.len / 64;
        let bit = self.len % 64;
        if word >= self.data.len() {
            self.data.push(0);
        }
        if is_null {
            self.data[word] |= 1 << bit;
        }
        self.len += 1;
    }

    pub fn count_null(&self) -> usize {
        if self.len == 0 {
            return 0;
        }
        let full_words = self.len / 64;
        let remaining_bits = self.len % 64;
        let mut count: usize = self.data[..full_words]
            .iter()
            .map(|w| w.count_ones() as usize)
            .sum();
        if remaining_bits > 0 && full_words < self.data.len() {
            let mask = (1u64 << remaining_bits) - 1;
            count += (self.data[full_words] & mask).count_ones() as usize;
        }
        count
    }

    pub fn count_valid(&self) -> usize {
        self.len - self.count_null()
    }

    pub fn is_all_null(&self) -> bool {
        self.len > 0 && self.count_null() == self.len
    }

    /// Bitwise OR of two maps; the result covers the longer of the two.
    pub fn union(&self, other: &NullBitmap) -> NullBitmap {
        let len = self.len.max(other.len);
        if len == 0 {
            return NullBitmap::new();
        }
        let num_words = len.div_ceil(64);
        let mut data = vec![0u64; num_words];
        for (i, word) in data.iter_mut().enumerate() {
            let lw = self.data.get(i).copied().unwrap_or(0);
            let rw = other.data.get(i).copied().unwrap_or(0);
            *word = lw | rw;
        }
        NullBitmap { data, len }
    }

    pub fn gather(&self, indices: &[usize]) -> NullBitmap {
        let len = indices.len();
        if len == 0 {
            return NullBitmap::new();
        }
        let num_words = len.div_ceil(64);
        let mut data = vec![0u64; num_words];
        for (out_idx, &src_idx) in indices.iter().enumerate() {
            if self.is_null(src_idx) {
                let word = out_idx / 64;
                let bit = out_idx % 64;
                data[word] |= 1 << bit;
            }
        }
        NullBitmap { data, len }
    }
}

impl Default for NullBitmap {
    fn default() -> Self {
        Self::new()
    }
}
