//! Panel geometry and display configuration types

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Pixel columns per panel
pub const PANEL_WIDTH: usize = 96;

/// Pixel rows per panel
pub const PANEL_HEIGHT: usize = 64;

/// Each panel is driven as an upper and a lower half-panel
pub const HALF_PANELS_PER_PANEL: usize = 2;

/// 1:4 multiplexing
pub const NUM_BACKPLANES: usize = 4;

/// Bitmap bytes per column of one half-panel (one byte per backplane)
pub const HALF_PANEL_HEIGHT_BYTES: usize = NUM_BACKPLANES;

/// Bitmap bytes per half-panel
pub const HALF_PANEL_BITMAP_BYTES: usize = PANEL_WIDTH * HALF_PANEL_HEIGHT_BYTES;

/// Wire bytes per backplane per half-panel: 20 blocks of 5 data bytes + 1 control byte
pub const BACKPLANE_LCD_BYTES: usize = 120;

/// Wire bytes per half-panel frame
pub const HALF_PANEL_LCD_BYTES: usize = BACKPLANE_LCD_BYTES * NUM_BACKPLANES;

/// Largest supported number of panels chained side by side
pub const MAX_PANELS_PER_ROW: usize = 5;

/// Largest supported number of stacked panel rows
pub const MAX_PANEL_ROWS: usize = 2;

/// Half-panels on one bus at the largest supported layout
pub const MAX_HALF_PANELS_PER_BUS: usize = MAX_PANELS_PER_ROW * HALF_PANELS_PER_PANEL;

/// Width of one display side in pixels at the largest supported layout
pub const MAX_DISPLAY_WIDTH: usize = MAX_PANELS_PER_ROW * PANEL_WIDTH;

/// Height of one display side in bytes at the largest supported layout
pub const MAX_DISPLAY_HEIGHT_BYTES: usize = MAX_PANEL_ROWS * PANEL_HEIGHT / 8;

/// Bitmap buffer size for one display side
pub const BITMAP_BUF_SIZE: usize = MAX_DISPLAY_WIDTH * MAX_DISPLAY_HEIGHT_BYTES;

/// LCD wire buffer size for one bus
pub const LCD_BUF_SIZE: usize = HALF_PANEL_LCD_BYTES * MAX_HALF_PANELS_PER_BUS;

/// Two display sides, one bus per panel row and side
pub const NUM_BUSES: usize = 2 * MAX_PANEL_ROWS;

/// One of the two display faces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SideId {
    A,
    B,
}

impl SideId {
    pub const ALL: [SideId; 2] = [SideId::A, SideId::B];

    pub const fn index(self) -> usize {
        match self {
            SideId::A => 0,
            SideId::B => 1,
        }
    }
}

/// Configuration errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Panels per row is zero or above [`MAX_PANELS_PER_ROW`]
    PanelsPerRow,
    /// Panel rows is zero or above [`MAX_PANEL_ROWS`]
    PanelRows,
}

/// How the half-panels of one panel row are chained on the bus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Topology {
    /// The chain runs left to right through the upper halves, then back
    /// right to left through the lower halves, which are mounted rotated
    /// by 180°. The lower loop comes first on the bus.
    #[default]
    ULoop,
    /// All upper halves left to right, then all lower halves left to right
    Linear,
}

/// Physical arrangement of the panels on one display side
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PanelLayout {
    panels_per_row: u8,
    panel_rows: u8,
    topology: Topology,
}

impl Default for PanelLayout {
    fn default() -> Self {
        Self {
            panels_per_row: MAX_PANELS_PER_ROW as u8,
            panel_rows: MAX_PANEL_ROWS as u8,
            topology: Topology::ULoop,
        }
    }
}

impl PanelLayout {
    /// Create a validated layout
    pub fn new(panels_per_row: u8, panel_rows: u8, topology: Topology) -> Result<Self, ConfigError> {
        if panels_per_row == 0 || panels_per_row as usize > MAX_PANELS_PER_ROW {
            return Err(ConfigError::PanelsPerRow);
        }
        if panel_rows == 0 || panel_rows as usize > MAX_PANEL_ROWS {
            return Err(ConfigError::PanelRows);
        }
        Ok(Self {
            panels_per_row,
            panel_rows,
            topology,
        })
    }

    pub fn panels_per_row(&self) -> usize {
        self.panels_per_row as usize
    }

    pub fn panel_rows(&self) -> usize {
        self.panel_rows as usize
    }

    pub fn topology(&self) -> Topology {
        self.topology
    }

    /// Display width in pixels
    pub fn width(&self) -> usize {
        self.panels_per_row() * PANEL_WIDTH
    }

    /// Display height in pixels
    pub fn height(&self) -> usize {
        self.panel_rows() * PANEL_HEIGHT
    }

    /// Bytes per display column
    pub fn height_bytes(&self) -> usize {
        self.height() / 8
    }

    /// Half-panels chained on one bus (one panel row)
    pub fn half_panels_per_bus(&self) -> usize {
        self.panels_per_row() * HALF_PANELS_PER_PANEL
    }

    /// Bitmap bytes used for one display side
    pub fn bitmap_len(&self) -> usize {
        self.width() * self.height_bytes()
    }

    /// Wire bytes of one converted bus frame
    pub fn lcd_frame_len(&self) -> usize {
        self.half_panels_per_bus() * HALF_PANEL_LCD_BYTES
    }
}

/// Start-up configuration of the display controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DisplayConfig {
    pub layout: PanelLayout,
    /// LCD contrast DAC value per side (12 bit)
    pub contrast: [u16; 2],
    /// Backlight base brightness per side, added to the ambient reading
    pub base_brightness: [i16; 2],
    /// Blend dynamic content through the mask layer
    pub mask_enabled: bool,
    /// Scheduler tick period in milliseconds; scroll speeds count these ticks
    pub tick_ms: u32,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            layout: PanelLayout::default(),
            contrast: [2048, 2048],
            base_brightness: [2048, 2048],
            mask_enabled: false,
            tick_ms: 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layout_matches_buffers() {
        let layout = PanelLayout::default();
        assert_eq!(layout.width(), 480);
        assert_eq!(layout.height(), 128);
        assert_eq!(layout.bitmap_len(), BITMAP_BUF_SIZE);
        assert_eq!(layout.lcd_frame_len(), LCD_BUF_SIZE);
        assert_eq!(BITMAP_BUF_SIZE, 7680);
        assert_eq!(LCD_BUF_SIZE, 4800);
    }

    #[test]
    fn test_layout_validation() {
        assert_eq!(
            PanelLayout::new(0, 1, Topology::Linear),
            Err(ConfigError::PanelsPerRow)
        );
        assert_eq!(
            PanelLayout::new(6, 1, Topology::Linear),
            Err(ConfigError::PanelsPerRow)
        );
        assert_eq!(
            PanelLayout::new(2, 3, Topology::ULoop),
            Err(ConfigError::PanelRows)
        );

        let layout = PanelLayout::new(2, 1, Topology::ULoop).unwrap();
        assert_eq!(layout.half_panels_per_bus(), 4);
        assert_eq!(layout.height_bytes(), 8);
    }

    #[test]
    fn test_half_panel_bitmap_bytes() {
        // One backplane byte per column: the two halves make up a panel
        assert_eq!(HALF_PANEL_BITMAP_BYTES, 384);
        assert_eq!(
            HALF_PANEL_BITMAP_BYTES * HALF_PANELS_PER_PANEL * 8,
            PANEL_WIDTH * PANEL_HEIGHT
        );
    }
}
