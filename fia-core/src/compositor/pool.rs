//! Fixed-capacity scroll buffer pool
//!
//! Bitmaps live in one arena. Allocation appends at the end; freeing a
//! buffer moves every later bitmap down so the free space stays contiguous.

use super::scroll::ScrollBuffer;
use fia_protocol::ScrollBufferSpec;

/// Maximum number of simultaneously allocated scroll buffers
pub const MAX_SCROLL_BUFFERS: usize = 16;

/// Bytes available for scroll buffer bitmaps
pub const SCROLL_ARENA_SIZE: usize = 64 * 1024;

/// Marks a byte as a scroll buffer id on the wire
pub const SCROLL_BUFFER_ID_FLAG: u8 = 0x80;

/// Marks a create response as an error code
pub const SCROLL_BUFFER_ERR_FLAG: u8 = 0x10;

/// Scroll buffer pool errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ScrollBufferError {
    /// Every slot is in use
    PoolFull,
    /// The bitmap does not fit into the remaining arena space
    OutOfMemory,
    /// Internal width or height is zero
    InvalidSize,
    /// Id is malformed, out of range or not allocated
    InvalidId,
}

impl ScrollBufferError {
    /// Wire status byte returned in place of an id
    pub fn status_code(self) -> u8 {
        SCROLL_BUFFER_ERR_FLAG
            | match self {
                ScrollBufferError::OutOfMemory | ScrollBufferError::InvalidSize => 0x01,
                ScrollBufferError::PoolFull => 0x02,
                ScrollBufferError::InvalidId => 0x00,
            }
    }
}

/// Pool slot of a scroll buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ScrollBufferId(u8);

impl ScrollBufferId {
    /// Slot id from its index
    pub fn new(slot: usize) -> Option<Self> {
        (slot < MAX_SCROLL_BUFFERS).then_some(Self(slot as u8))
    }

    /// Decode the `0x80 | slot` wire form
    pub fn from_wire(byte: u8) -> Option<Self> {
        if byte & SCROLL_BUFFER_ID_FLAG == 0 {
            return None;
        }
        Self::new((byte & !SCROLL_BUFFER_ID_FLAG) as usize)
    }

    pub fn to_wire(self) -> u8 {
        SCROLL_BUFFER_ID_FLAG | self.0
    }

    pub fn slot(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy)]
struct Slot {
    buffer: ScrollBuffer,
    start: usize,
    len: usize,
}

/// Scroll buffers and their bitmap storage
pub struct ScrollPool {
    slots: [Option<Slot>; MAX_SCROLL_BUFFERS],
    arena: [u8; SCROLL_ARENA_SIZE],
    used: usize,
}

impl Default for ScrollPool {
    fn default() -> Self {
        Self::new()
    }
}

impl ScrollPool {
    pub const fn new() -> Self {
        Self {
            slots: [None; MAX_SCROLL_BUFFERS],
            arena: [0; SCROLL_ARENA_SIZE],
            used: 0,
        }
    }

    /// Number of allocated buffers
    pub fn len(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    /// Arena bytes still available
    pub fn free_bytes(&self) -> usize {
        SCROLL_ARENA_SIZE - self.used
    }

    /// Allocate a buffer in the lowest free slot, bitmap cleared to 0
    pub fn create(&mut self, spec: &ScrollBufferSpec) -> Result<ScrollBufferId, ScrollBufferError> {
        let slot = self
            .slots
            .iter()
            .position(Option::is_none)
            .ok_or(ScrollBufferError::PoolFull)?;

        let buffer = ScrollBuffer::from_spec(spec)?;
        let len = buffer.buf_size();
        if len > self.free_bytes() {
            return Err(ScrollBufferError::OutOfMemory);
        }

        let start = self.used;
        self.arena[start..start + len].fill(0);
        self.used += len;
        self.slots[slot] = Some(Slot { buffer, start, len });

        Ok(ScrollBufferId(slot as u8))
    }

    /// Release a buffer and compact the arena
    pub fn free(&mut self, id: ScrollBufferId) -> Result<(), ScrollBufferError> {
        let removed = self.slots[id.slot()]
            .take()
            .ok_or(ScrollBufferError::InvalidId)?;

        let tail = removed.start + removed.len;
        self.arena.copy_within(tail..self.used, removed.start);
        self.used -= removed.len;

        for slot in self.slots.iter_mut().flatten() {
            if slot.start > removed.start {
                slot.start -= removed.len;
            }
        }
        Ok(())
    }

    pub fn contains(&self, id: ScrollBufferId) -> bool {
        self.slots[id.slot()].is_some()
    }

    pub fn get(&self, id: ScrollBufferId) -> Option<&ScrollBuffer> {
        self.slots[id.slot()].as_ref().map(|s| &s.buffer)
    }

    pub fn get_mut(&mut self, id: ScrollBufferId) -> Option<&mut ScrollBuffer> {
        self.slots[id.slot()].as_mut().map(|s| &mut s.buffer)
    }

    /// Internal bitmap of a buffer
    pub fn data(&self, id: ScrollBufferId) -> Option<&[u8]> {
        let slot = self.slots[id.slot()].as_ref()?;
        Some(&self.arena[slot.start..slot.start + slot.len])
    }

    pub fn data_mut(&mut self, id: ScrollBufferId) -> Option<&mut [u8]> {
        let slot = self.slots[id.slot()].as_ref()?;
        Some(&mut self.arena[slot.start..slot.start + slot.len])
    }

    /// Allocated buffers with their bitmaps, in slot order
    pub fn iter(&self) -> impl Iterator<Item = (ScrollBufferId, &ScrollBuffer, &[u8])> {
        self.slots.iter().enumerate().filter_map(|(i, slot)| {
            let slot = slot.as_ref()?;
            Some((
                ScrollBufferId(i as u8),
                &slot.buffer,
                &self.arena[slot.start..slot.start + slot.len],
            ))
        })
    }

    /// Allocated buffers, parameters only
    pub fn buffers_mut(&mut self) -> impl Iterator<Item = &mut ScrollBuffer> {
        self.slots.iter_mut().flatten().map(|s| &mut s.buffer)
    }
}
