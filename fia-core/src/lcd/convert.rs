//! Bitmap to LCD wire format conversion
//!
//! The display buffer is column-major: byte `x * height_bytes + y / 8`
//! holds rows `y & !7 ..= y | 7` of column `x`, LSB at the top. A half-panel
//! covers 96 columns and 4 byte rows, one byte row per backplane.
//!
//! Output layout of one bus frame:
//!
//! ```text
//! for backplane in [COM2, COM1, COM3, COM0]:
//!     for half_panel in 0..half_panels:
//!         20 × ( 5 data bytes, control byte )
//! ```
//!
//! The column driver ICs are 5 bytes wide but the panel is only 96 columns,
//! so the blocks starting at columns 10, 34, 58 and 82 are shifted by half
//! a byte: each of their bytes joins the low nibble of the previous column
//! with the high nibble of the current one.

use super::{control_byte, RamSelect, TRANSMIT_ORDER};
use crate::config::{
    PanelLayout, Topology, BACKPLANE_LCD_BYTES, HALF_PANEL_HEIGHT_BYTES, PANEL_WIDTH,
};

/// Data bytes per column driver block
const BLOCK_BYTES: usize = 5;

/// First columns of the half-byte shifted blocks
const NIBBLE_COLUMNS: [usize; 4] = [10, 34, 58, 82];

/// Where one half-panel of the bus chain reads its pixels from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct HalfPanelSource {
    /// First display column
    x: usize,
    /// First display byte row
    y_byte: usize,
    /// Mounted upside down
    rotated: bool,
}

impl HalfPanelSource {
    fn locate(layout: &PanelLayout, panel_row: usize, half_panel: usize) -> Self {
        let per_row = layout.panels_per_row();
        let row_base = panel_row * 2 * HALF_PANEL_HEIGHT_BYTES;

        let (panel, lower, rotated) = match layout.topology() {
            Topology::ULoop if half_panel >= per_row => (half_panel - per_row, false, false),
            Topology::ULoop => (per_row - 1 - half_panel, true, true),
            Topology::Linear if half_panel < per_row => (half_panel, false, false),
            Topology::Linear => (half_panel - per_row, true, false),
        };

        Self {
            x: panel * PANEL_WIDTH,
            y_byte: row_base + if lower { HALF_PANEL_HEIGHT_BYTES } else { 0 },
            rotated,
        }
    }

    /// Index into the display buffer of `(col, slot)` in device coordinates
    fn index(&self, height_bytes: usize, col: usize, slot: usize) -> usize {
        if self.rotated {
            let x = self.x + PANEL_WIDTH - 1 - col;
            let y = self.y_byte + HALF_PANEL_HEIGHT_BYTES - 1 - slot;
            x * height_bytes + y
        } else {
            (self.x + col) * height_bytes + self.y_byte + slot
        }
    }

    /// Bitmap byte in device orientation
    fn read(&self, src: &[u8], height_bytes: usize, col: usize, slot: usize) -> u8 {
        let byte = src[self.index(height_bytes, col, slot)];
        if self.rotated {
            byte.reverse_bits()
        } else {
            byte
        }
    }
}

/// Convert one panel row of a display buffer into the LCD wire format
///
/// `src` must hold `layout.bitmap_len()` bytes and `dst` at least
/// `layout.lcd_frame_len()`. Returns the number of bytes written, which
/// depends only on the layout.
pub fn convert(
    dst: &mut [u8],
    src: &[u8],
    layout: &PanelLayout,
    panel_row: usize,
    ram: RamSelect,
) -> usize {
    let height_bytes = layout.height_bytes();
    let half_panels = layout.half_panels_per_bus();
    debug_assert!(src.len() >= layout.bitmap_len());
    debug_assert!(dst.len() >= layout.lcd_frame_len());

    let mut out = 0;
    for backplane in TRANSMIT_ORDER {
        let slot = backplane.logical_index();
        let ctrl = control_byte(ram, backplane);

        for half_panel in 0..half_panels {
            let source = HalfPanelSource::locate(layout, panel_row, half_panel);
            let byte =
                |col: usize| backplane.apply_bit_order(source.read(src, height_bytes, col, slot));

            let mut col = 0;
            while col < PANEL_WIDTH {
                let nibble = NIBBLE_COLUMNS.contains(&col);
                for i in 0..BLOCK_BYTES {
                    dst[out] = if nibble {
                        (byte(col - 1) << 4) | (byte(col) >> 4)
                    } else {
                        byte(col)
                    };
                    out += 1;

                    // A shifted block spans only four columns
                    if !nibble || i < BLOCK_BYTES - 1 {
                        col += 1;
                    }
                }
                dst[out] = ctrl;
                out += 1;
            }
        }
    }

    debug_assert_eq!(out, layout.lcd_frame_len());
    out
}

/// Inverse of [`convert`] for one panel row
#[cfg(test)]
pub(crate) fn unconvert(dst: &mut [u8], lcd: &[u8], layout: &PanelLayout, panel_row: usize) {
    let height_bytes = layout.height_bytes();
    let half_panels = layout.half_panels_per_bus();

    let mut pos = 0;
    for backplane in TRANSMIT_ORDER {
        let slot = backplane.logical_index();
        for half_panel in 0..half_panels {
            let source = HalfPanelSource::locate(layout, panel_row, half_panel);
            let mut wire = [0u8; PANEL_WIDTH];

            let mut col = 0;
            while col < PANEL_WIDTH {
                let block = &lcd[pos..pos + BLOCK_BYTES];
                if NIBBLE_COLUMNS.contains(&col) {
                    for i in 0..BLOCK_BYTES - 1 {
                        wire[col + i] = (block[i] << 4) | (block[i + 1] >> 4);
                    }
                    col += BLOCK_BYTES - 1;
                } else {
                    wire[col..col + BLOCK_BYTES].copy_from_slice(block);
                    col += BLOCK_BYTES;
                }
                pos += BLOCK_BYTES + 1;
            }

            for (col, &w) in wire.iter().enumerate() {
                let byte = backplane.apply_bit_order(w);
                let byte = if source.rotated { byte.reverse_bits() } else { byte };
                dst[source.index(height_bytes, col, slot)] = byte;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BITMAP_BUF_SIZE, LCD_BUF_SIZE};
    use crate::lcd::Backplane;
    use proptest::prelude::*;

    fn layout(per_row: u8, rows: u8, topology: Topology) -> PanelLayout {
        PanelLayout::new(per_row, rows, topology).unwrap()
    }

    /// Offset of a half-panel's 120-byte slice for one backplane
    fn slice_start(layout: &PanelLayout, backplane: Backplane, half_panel: usize) -> usize {
        let half_panels = layout.half_panels_per_bus();
        backplane.logical_index() * half_panels * BACKPLANE_LCD_BYTES
            + half_panel * BACKPLANE_LCD_BYTES
    }

    #[test]
    fn test_output_length() {
        let src = [0u8; BITMAP_BUF_SIZE];
        let mut dst = [0u8; LCD_BUF_SIZE];

        let full = PanelLayout::default();
        assert_eq!(convert(&mut dst, &src, &full, 1, RamSelect::Ram1), LCD_BUF_SIZE);

        let small = layout(2, 1, Topology::Linear);
        assert_eq!(convert(&mut dst, &src, &small, 0, RamSelect::Ram2), 4 * 4 * 120);
        assert_eq!(small.lcd_frame_len(), 1920);
    }

    #[test]
    fn test_control_bytes_follow_transmit_order() {
        let src = [0xA5u8; BITMAP_BUF_SIZE];
        let mut dst = [0u8; LCD_BUF_SIZE];
        let layout = layout(3, 1, Topology::ULoop);
        let len = convert(&mut dst, &src, &layout, 0, RamSelect::Ram2);

        let per_backplane = len / 4;
        for (i, chunk) in dst[..len].chunks(per_backplane).enumerate() {
            let expected = control_byte(RamSelect::Ram2, TRANSMIT_ORDER[i]);
            for group in chunk.chunks(BLOCK_BYTES + 1) {
                assert_eq!(group[BLOCK_BYTES], expected);
            }
        }
    }

    #[test]
    fn test_u_loop_upper_half_is_unrotated() {
        let layout = layout(2, 1, Topology::ULoop);
        let mut src = [0u8; BITMAP_BUF_SIZE];
        // Top-left pixel of panel 0
        src[0] = 0x01;

        let mut dst = [0u8; LCD_BUF_SIZE];
        convert(&mut dst, &src, &layout, 0, RamSelect::Ram1);

        // Upper loop follows the two lower half-panels; byte row 0 is COM2 (LSB first)
        let pos = slice_start(&layout, Backplane::Com2, 2);
        assert_eq!(dst[pos], 0x80);
    }

    #[test]
    fn test_u_loop_lower_half_is_rotated() {
        let layout = layout(2, 1, Topology::ULoop);
        let height_bytes = layout.height_bytes();
        let mut src = [0u8; BITMAP_BUF_SIZE];
        // Bottom-left pixel of panel 0
        src[height_bytes - 1] = 0x80;

        let mut dst = [0u8; LCD_BUF_SIZE];
        convert(&mut dst, &src, &layout, 0, RamSelect::Ram1);

        // Panel 0's lower half is chained last in the lower loop, and its
        // device column 95 (last byte of block 19) shows display column 0
        let pos = slice_start(&layout, Backplane::Com2, 1) + 19 * 6 + 4;
        assert_eq!(dst[pos], 0x80);
    }

    #[test]
    fn test_linear_lower_half() {
        let layout = layout(2, 1, Topology::Linear);
        let height_bytes = layout.height_bytes();
        let mut src = [0u8; BITMAP_BUF_SIZE];
        // Column 96 (panel 1), row 40: byte row 5 = lower half, COM1
        src[96 * height_bytes + 5] = 0x01;

        let mut dst = [0u8; LCD_BUF_SIZE];
        convert(&mut dst, &src, &layout, 0, RamSelect::Ram1);

        let pos = slice_start(&layout, Backplane::Com1, 3);
        assert_eq!(dst[pos], 0x01);
    }

    #[test]
    fn test_nibble_block() {
        let layout = layout(1, 1, Topology::ULoop);
        let height_bytes = layout.height_bytes();
        let mut src = [0u8; BITMAP_BUF_SIZE];
        // Byte row 3 is COM0, sent MSB first
        src[9 * height_bytes + 3] = 0xAB;
        src[10 * height_bytes + 3] = 0xCD;

        let mut dst = [0u8; LCD_BUF_SIZE];
        convert(&mut dst, &src, &layout, 0, RamSelect::Ram1);

        let start = slice_start(&layout, Backplane::Com0, 1);
        // Column 9 is the last byte of block 1
        assert_eq!(dst[start + 6 + 4], 0xAB);
        assert_eq!(dst[start + 6 + 5], control_byte(RamSelect::Ram1, Backplane::Com0));
        // Block 2 starts half a byte early
        assert_eq!(dst[start + 12], 0xBC);
        assert_eq!(dst[start + 13], 0xD0);
        assert_eq!(dst[start + 14], 0x00);
    }

    #[test]
    fn test_second_panel_row() {
        let layout = PanelLayout::default();
        let mut src = [0u8; BITMAP_BUF_SIZE];
        // Row 64 is the top of panel row 1
        src[8] = 0x01;

        let mut dst = [0u8; LCD_BUF_SIZE];
        convert(&mut dst, &src, &layout, 0, RamSelect::Ram1);
        let upper_first = slice_start(&layout, Backplane::Com2, 5);
        assert_eq!(dst[upper_first], 0x00);

        convert(&mut dst, &src, &layout, 1, RamSelect::Ram1);
        assert_eq!(dst[upper_first], 0x80);
    }

    fn any_topology() -> impl Strategy<Value = Topology> {
        prop_oneof![Just(Topology::ULoop), Just(Topology::Linear)]
    }

    proptest! {
        #[test]
        fn prop_unconvert_restores_bitmap(
            bitmap in proptest::collection::vec(any::<u8>(), BITMAP_BUF_SIZE),
            topology in any_topology(),
            ram in prop_oneof![Just(RamSelect::Ram1), Just(RamSelect::Ram2)],
        ) {
            let layout = PanelLayout::new(5, 2, topology).unwrap();
            let mut lcd = [0u8; LCD_BUF_SIZE];
            let mut restored = [0u8; BITMAP_BUF_SIZE];

            for row in 0..layout.panel_rows() {
                convert(&mut lcd, &bitmap, &layout, row, ram);
                unconvert(&mut restored, &lcd, &layout, row);
            }

            prop_assert_eq!(&restored[..], &bitmap[..]);
        }

        #[test]
        fn prop_bit_order_per_backplane(
            value in any::<u8>(),
            slot in 0usize..4,
            // Column 0 of every panel starts a plain block
            panel in 0usize..5,
        ) {
            let layout = PanelLayout::new(5, 1, Topology::Linear).unwrap();
            let height_bytes = layout.height_bytes();
            let mut src = [0u8; BITMAP_BUF_SIZE];
            src[panel * PANEL_WIDTH * height_bytes + slot] = value;

            let mut dst = [0u8; LCD_BUF_SIZE];
            convert(&mut dst, &src, &layout, 0, RamSelect::Ram1);

            let backplane = TRANSMIT_ORDER[slot];
            let out = dst[slice_start(&layout, backplane, panel)];
            match backplane {
                Backplane::Com0 | Backplane::Com1 => {
                    prop_assert_eq!(out, value);
                }
                Backplane::Com2 | Backplane::Com3 => {
                    prop_assert_eq!(out, value.reverse_bits());
                }
            }
        }
    }
}
