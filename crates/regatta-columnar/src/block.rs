use regatta_common::types::DataType;

use crate::column::ColumnRef;

/// One positional slot of a batch: a column, its declared type, and a name.
/// The result slot's column is `None` until execution fills it.
#[derive(Debug, Clone)]
pub struct BlockSlot {
    pub column: Option<ColumnRef>,
    pub data_type: DataType,
    pub name: String,
}

impl BlockSlot {
    pub fn new(column: Option<ColumnRef>, data_type: DataType, name: impl Into<String>) -> Self {
        Self {
            column,
            data_type,
            name: name.into(),
        }
    }
}

/// A positional collection of named, typed columns of equal logical length,
/// processed in one call.
#[derive(Debug, Clone, Default)]
pub struct Block {
    slots: Vec<BlockSlot>,
}

impl Block {
    pub fn new() -> Self {
        Self { slots: Vec::new() }
    }

    pub fn from_slots(slots: Vec<BlockSlot>) -> Self {
        Self { slots }
    }

    pub fn insert(&mut self, slot: BlockSlot) -> usize {
        self.slots.push(slot);
        self.slots.len() - 1
    }

    pub fn slot(&self, position: usize) -> &BlockSlot {
        &self.slots[position]
    }

    pub fn slot_mut(&mut self, position: usize) -> &mut BlockSlot {
        &mut self.slots[position]
    }

    pub fn slots(&self) -> &[BlockSlot] {
        &self.slots
    }

    pub fn columns_count(&self) -> usize {
        self.slots.len()
    }

    /// Length of the first populated slot; zero when no slot holds a column.
    pub fn row_count(&self) -> usize {
        self.slots
            .iter()
            .find_map(|slot| slot.column.as_ref().map(|c| c.len()))
            .unwrap_or(0)
    }

    /// Same slots (types and names), all columns cleared.
    pub fn clone_without_columns(&self) -> Block {
        Block {
            slots: self
                .slots
                .iter()
                .map(|slot| BlockSlot::new(None, slot.data_type.clone(), slot.name.clone()))
                .collect(),
        }
    }
}
