//! Scroll buffer parameters and motion

use super::pool::ScrollBufferError;
use fia_protocol::{ScrollBufferSpec, ScrollBufferUpdate, Side};

/// A toroidal bitmap shown through a window on the display
///
/// The internal bitmap is `int_w` columns of `ceil(int_h / 8)` bytes, laid
/// out like the display buffer. Offsets always stay within the internal
/// dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ScrollBuffer {
    pub side: Side,
    pub disp_x: u16,
    pub disp_y: u16,
    pub disp_w: u16,
    pub disp_h: u16,
    int_w: u16,
    int_h: u16,
    offset_x: u16,
    offset_y: u16,
    pub speed_x: u16,
    pub speed_y: u16,
    pub step_x: i16,
    pub step_y: i16,
    tick_x: u16,
    tick_y: u16,
}

/// Apply a signed step to an offset, wrapping into `[0, dim)`
fn wrap_step(offset: u16, step: i16, dim: u16) -> u16 {
    (i32::from(offset) + i32::from(step)).rem_euclid(i32::from(dim)) as u16
}

impl ScrollBuffer {
    /// Validate creation parameters
    pub fn from_spec(spec: &ScrollBufferSpec) -> Result<Self, ScrollBufferError> {
        if spec.int_w == 0 || spec.int_h == 0 {
            return Err(ScrollBufferError::InvalidSize);
        }
        Ok(Self {
            side: spec.side,
            disp_x: spec.disp_x,
            disp_y: spec.disp_y,
            disp_w: spec.disp_w,
            disp_h: spec.disp_h,
            int_w: spec.int_w,
            int_h: spec.int_h,
            offset_x: spec.offset_x % spec.int_w,
            offset_y: spec.offset_y % spec.int_h,
            speed_x: spec.speed_x,
            speed_y: spec.speed_y,
            step_x: spec.step_x,
            step_y: spec.step_y,
            tick_x: 0,
            tick_y: 0,
        })
    }

    pub fn int_w(&self) -> u16 {
        self.int_w
    }

    pub fn int_h(&self) -> u16 {
        self.int_h
    }

    pub fn offset_x(&self) -> u16 {
        self.offset_x
    }

    pub fn offset_y(&self) -> u16 {
        self.offset_y
    }

    /// Bytes per internal column
    pub fn int_height_bytes(&self) -> usize {
        (self.int_h as usize).div_ceil(8)
    }

    /// Size of the internal bitmap in bytes
    pub fn buf_size(&self) -> usize {
        self.int_w as usize * self.int_height_bytes()
    }

    /// Move by a relative step on each axis
    pub fn scroll_by(&mut self, dx: i16, dy: i16) {
        self.offset_x = wrap_step(self.offset_x, dx, self.int_w);
        self.offset_y = wrap_step(self.offset_y, dy, self.int_h);
    }

    /// Count one scheduler tick and step each axis whose speed is reached
    ///
    /// A speed of 0 stops the axis.
    pub fn advance(&mut self) {
        self.tick_x = self.tick_x.saturating_add(1);
        self.tick_y = self.tick_y.saturating_add(1);

        if self.speed_x != 0 && self.tick_x >= self.speed_x {
            self.scroll_by(self.step_x, 0);
            self.tick_x = 0;
        }
        if self.speed_y != 0 && self.tick_y >= self.speed_y {
            self.scroll_by(0, self.step_y);
            self.tick_y = 0;
        }
    }

    /// Apply the fields present in `update`
    ///
    /// Returns true if the window geometry changed, in which case pixels
    /// drawn at the old position must be cleared by the caller.
    pub fn apply_update(&mut self, update: &ScrollBufferUpdate) -> bool {
        if let Some(side) = update.side {
            self.side = side;
        }
        if let Some(x) = update.disp_x {
            self.disp_x = x;
        }
        if let Some(y) = update.disp_y {
            self.disp_y = y;
        }
        if let Some(w) = update.disp_w {
            self.disp_w = w;
        }
        if let Some(h) = update.disp_h {
            self.disp_h = h;
        }
        if let Some(x) = update.offset_x {
            self.offset_x = x % self.int_w;
        }
        if let Some(y) = update.offset_y {
            self.offset_y = y % self.int_h;
        }
        if let Some(speed) = update.speed_x {
            self.speed_x = speed;
        }
        if let Some(speed) = update.speed_y {
            self.speed_y = speed;
        }
        if let Some(step) = update.step_x {
            self.step_x = step;
        }
        if let Some(step) = update.step_y {
            self.step_y = step;
        }
        update.changes_geometry()
    }
}
