//! Display layers and scroll buffer compositing
//!
//! Each display side has three host-written layers plus the composed
//! output:
//!
//! - static: background content
//! - dynamic: content rendered from scroll buffers while masking is on
//! - mask: selects per pixel between static (0) and dynamic (1)
//! - display: `(static & !mask) | (dynamic & mask)` with masking on,
//!   otherwise a copy of static
//!
//! Scroll buffers render into the dynamic layer when masking is enabled
//! and straight into the static layer when it is not.

pub mod blit;
pub mod pool;
pub mod scroll;

pub use blit::{classify, render, Alignment};
pub use pool::{
    ScrollBufferError, ScrollBufferId, ScrollPool, MAX_SCROLL_BUFFERS, SCROLL_ARENA_SIZE,
};
pub use scroll::ScrollBuffer;

use crate::config::{PanelLayout, SideId, BITMAP_BUF_SIZE};
use fia_protocol::{ScrollBufferSpec, ScrollBufferUpdate, Side};

/// Host-writable layer of a display side
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Layer {
    Static,
    Mask,
    Dynamic,
}

/// Buffers of one display side
pub struct DisplaySide {
    static_layer: [u8; BITMAP_BUF_SIZE],
    mask: [u8; BITMAP_BUF_SIZE],
    dynamic: [u8; BITMAP_BUF_SIZE],
    display: [u8; BITMAP_BUF_SIZE],
}

impl DisplaySide {
    const fn new() -> Self {
        Self {
            static_layer: [0xFF; BITMAP_BUF_SIZE],
            mask: [0xFF; BITMAP_BUF_SIZE],
            dynamic: [0; BITMAP_BUF_SIZE],
            display: [0; BITMAP_BUF_SIZE],
        }
    }

    fn layer(&self, layer: Layer) -> &[u8; BITMAP_BUF_SIZE] {
        match layer {
            Layer::Static => &self.static_layer,
            Layer::Mask => &self.mask,
            Layer::Dynamic => &self.dynamic,
        }
    }

    fn layer_mut(&mut self, layer: Layer) -> &mut [u8; BITMAP_BUF_SIZE] {
        match layer {
            Layer::Static => &mut self.static_layer,
            Layer::Mask => &mut self.mask,
            Layer::Dynamic => &mut self.dynamic,
        }
    }

    fn compose(&mut self, len: usize, mask_enabled: bool) {
        if !mask_enabled {
            self.display[..len].copy_from_slice(&self.static_layer[..len]);
            return;
        }
        for (i, out) in self.display[..len].iter_mut().enumerate() {
            let m = self.mask[i];
            *out = (self.static_layer[i] & !m) | (self.dynamic[i] & m);
        }
    }
}

/// Layer buffers of both sides plus the scroll buffer pool
pub struct Compositor {
    layout: PanelLayout,
    sides: [DisplaySide; 2],
    pool: ScrollPool,
    mask_enabled: bool,
}

impl Compositor {
    pub fn new(layout: PanelLayout, mask_enabled: bool) -> Self {
        Self {
            layout,
            sides: [DisplaySide::new(), DisplaySide::new()],
            pool: ScrollPool::new(),
            mask_enabled,
        }
    }

    pub fn layout(&self) -> &PanelLayout {
        &self.layout
    }

    pub fn mask_enabled(&self) -> bool {
        self.mask_enabled
    }

    pub fn set_mask_enabled(&mut self, enabled: bool) {
        self.mask_enabled = enabled;
    }

    pub fn pool(&self) -> &ScrollPool {
        &self.pool
    }

    pub fn pool_mut(&mut self) -> &mut ScrollPool {
        &mut self.pool
    }

    /// Composed output of a side, `layout.bitmap_len()` bytes
    pub fn display(&self, side: SideId) -> &[u8] {
        &self.sides[side.index()].display[..self.layout.bitmap_len()]
    }

    pub fn layer(&self, side: SideId, layer: Layer) -> &[u8] {
        &self.sides[side.index()].layer(layer)[..self.layout.bitmap_len()]
    }

    pub fn layer_mut(&mut self, side: SideId, layer: Layer) -> &mut [u8] {
        let len = self.layout.bitmap_len();
        &mut self.sides[side.index()].layer_mut(layer)[..len]
    }

    /// Copy a layer of side A to side B
    pub fn mirror(&mut self, layer: Layer) {
        let len = self.layout.bitmap_len();
        let [a, b] = &mut self.sides;
        b.layer_mut(layer)[..len].copy_from_slice(&a.layer(layer)[..len]);
    }

    /// Zero the dynamic layer of both sides
    pub fn clear_dynamic(&mut self) {
        for side in &mut self.sides {
            side.dynamic.fill(0);
        }
    }

    pub fn create_scroll_buffer(
        &mut self,
        spec: &ScrollBufferSpec,
    ) -> Result<ScrollBufferId, ScrollBufferError> {
        let result = self.pool.create(spec);
        #[cfg(feature = "defmt")]
        if let Err(err) = result {
            defmt::warn!("scroll buffer rejected: {}", err);
        }
        result
    }

    /// Free a scroll buffer and clear what it left on the dynamic layers
    pub fn delete_scroll_buffer(&mut self, id: ScrollBufferId) -> Result<(), ScrollBufferError> {
        self.pool.free(id)?;
        self.clear_dynamic();
        Ok(())
    }

    /// Apply a partial update; geometry changes clear the dynamic layers
    pub fn update_scroll_buffer(
        &mut self,
        id: ScrollBufferId,
        update: &ScrollBufferUpdate,
    ) -> Result<(), ScrollBufferError> {
        let buffer = self.pool.get_mut(id).ok_or(ScrollBufferError::InvalidId)?;
        if buffer.apply_update(update) {
            self.clear_dynamic();
        }
        Ok(())
    }

    /// Count one tick on every scroll buffer
    pub fn advance_scroll_positions(&mut self) {
        for buffer in self.pool.buffers_mut() {
            buffer.advance();
        }
    }

    /// Draw every scroll buffer onto its side(s)
    pub fn render_all(&mut self) {
        let width = self.layout.width();
        let height_bytes = self.layout.height_bytes();
        let target = if self.mask_enabled {
            Layer::Dynamic
        } else {
            Layer::Static
        };

        for (_, buffer, data) in self.pool.iter() {
            for side in sides_of(buffer.side) {
                let dst = self.sides[side.index()].layer_mut(target);
                render(dst, width, height_bytes, buffer, data);
            }
        }
    }

    /// Recompute both display buffers from their layers
    pub fn compose(&mut self) {
        let len = self.layout.bitmap_len();
        for side in &mut self.sides {
            side.compose(len, self.mask_enabled);
        }
    }

    /// Render scroll buffers then compose
    pub fn update_display_buffers(&mut self) {
        self.render_all();
        self.compose();
    }
}

/// Sides a side selector refers to
pub fn sides_of(side: Side) -> impl Iterator<Item = SideId> {
    SideId::ALL.into_iter().filter(move |s| match s {
        SideId::A => side.includes_a(),
        SideId::B => side.includes_b(),
    })
}
