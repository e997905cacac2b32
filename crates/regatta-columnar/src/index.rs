use serde::{Deserialize, Serialize};

/// Dictionary positions stored at the minimum unsigned width that fits the
/// largest position.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum IndexColumn {
    U8(Vec<u8>),
    U16(Vec<u16>),
    U32(Vec<u32>),
    U64(Vec<u64>),
}

impl IndexColumn {
    pub fn from_positions(positions: Vec<u64>) -> Self {
        let max = positions.iter().copied().max().unwrap_or(0);
        if max <= u8::MAX as u64 {
            IndexColumn::U8(positions.into_iter().map(|p| p as u8).collect())
        } else if max <= u16::MAX as u64 {
            IndexColumn::U16(positions.into_iter().map(|p| p as u16).collect())
        } else if max <= u32::MAX as u64 {
            IndexColumn::U32(positions.into_iter().map(|p| p as u32).collect())
        } else {
            IndexColumn::U64(positions)
        }
    }

    pub fn len(&self) -> usize {
        match self {
            IndexColumn::U8(data) => data.len(),
            IndexColumn::U16(data) => data.len(),
            IndexColumn::U32(data) => data.len(),
            IndexColumn::U64(data) => data.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn get(&self, row: usize) -> u64 {
        match self {
            IndexColumn::U8(data) => data[row] as u64,
            IndexColumn::U16(data) => data[row] as u64,
            IndexColumn::U32(data) => data[row] as u64,
            IndexColumn::U64(data) => data[row],
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = u64> + '_ {
        (0..self.len()).map(move |row| self.get(row))
    }

    pub fn to_vec(&self) -> Vec<u64> {
        self.iter().collect()
    }

    pub fn max_position(&self) -> u64 {
        self.iter().max().unwrap_or(0)
    }

    /// Composes two index vectors: `result[i] = self[positions[i]]`.
    ///
    /// `self` is the remapping and `positions` the old indices, so a cached
    /// `index_mapping.index(old_indices)` yields the rewritten indices.
    pub fn index(&self, positions: &IndexColumn) -> IndexColumn {
        IndexColumn::from_positions(
            positions
                .iter()
                .map(|pos| self.get(pos as usize))
                .collect(),
        )
    }
}
