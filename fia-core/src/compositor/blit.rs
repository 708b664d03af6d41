//! Scroll buffer rendering
//!
//! Both the display and the internal bitmap of a scroll buffer are columns
//! of vertically packed bytes (LSB on top). A window starting at display
//! row `disp_y` begins at bit `disp_y % 8` of its first display byte, while
//! the visible part of the internal bitmap begins at bit `offset_y % 8` of
//! its source byte. Depending on how these two phases relate, every output
//! byte is either copied, shifted from one source byte, or assembled from
//! two neighbouring source bytes; the first and last byte of the window are
//! additionally merged with the display bits outside the window.

use super::scroll::ScrollBuffer;

/// Relation between the window's and the source's bit phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Alignment {
    /// Window on a byte boundary, source on a byte boundary
    Aligned,
    /// Window mid-byte, source on a byte boundary
    WindowOffset,
    /// Window on a byte boundary, source mid-byte
    SourceOffset,
    /// Both mid-byte, with the same phase
    BothOffsetInPhase,
    /// Both mid-byte, phases differ
    BothOffset,
}

/// Classify a window/source phase combination
///
/// `base` is the window's first bit (`disp_y % 8`), `source_bit` the first
/// visible source bit (`offset_y % 8`) and `shift` the distance between the
/// two modulo 8. Only five of the eight flag combinations can occur: when
/// window and source are both byte aligned the shift is 0, and when exactly
/// one of them is aligned it is not.
pub fn classify(base: u8, source_bit: u8, shift: u8) -> Alignment {
    let window_aligned = base == 0;
    let source_aligned = source_bit == 0;
    let in_phase = shift == 0;

    match (window_aligned, source_aligned, in_phase) {
        (true, true, true) => Alignment::Aligned,
        (false, true, false) => Alignment::WindowOffset,
        (true, false, false) => Alignment::SourceOffset,
        (false, false, true) => Alignment::BothOffsetInPhase,
        (false, false, false) => Alignment::BothOffset,
        (true, true, false) | (true, false, true) | (false, true, true) => {
            unreachable!("inconsistent blit phase: base {} source {} shift {}", base, source_bit, shift)
        }
    }
}

/// Position of an output byte within the window column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Edge {
    First,
    Middle,
    Last,
    /// Window fits in a single byte
    FirstLast,
}

/// Take `src` bits where `mask` is set, keep `dst` elsewhere
#[inline]
fn merge(dst: u8, src: u8, mask: u8) -> u8 {
    (dst & !mask) | (src & mask)
}

/// Masks of the window bits in its first and last byte
#[derive(Debug, Clone, Copy)]
struct Masks {
    first: u8,
    last: u8,
}

impl Masks {
    fn for_edge(&self, edge: Edge) -> u8 {
        match edge {
            Edge::First => self.first,
            Edge::Last => self.last,
            Edge::FirstLast => self.first & self.last,
            Edge::Middle => 0xFF,
        }
    }
}

/// Compute one output byte
///
/// `cur` is the source byte aligned with this output byte and `next` the
/// one below it (wrapping). `shift` is in `1..8` whenever it is used.
fn blend(alignment: Alignment, edge: Edge, masks: &Masks, dst: u8, cur: u8, next: u8, shift: u8) -> u8 {
    let pair = || (cur >> shift) | (next << (8 - shift));

    match alignment {
        Alignment::Aligned => match edge {
            Edge::Last | Edge::FirstLast => merge(dst, cur, masks.last),
            Edge::First | Edge::Middle => cur,
        },
        Alignment::WindowOffset => match edge {
            // The window starts below the bits `cur` would supply
            Edge::First | Edge::FirstLast => {
                merge(dst, next << (8 - shift), masks.for_edge(edge))
            }
            Edge::Last => merge(dst, pair(), masks.last),
            Edge::Middle => pair(),
        },
        Alignment::SourceOffset => match edge {
            Edge::Last | Edge::FirstLast => merge(dst, pair(), masks.last),
            Edge::First | Edge::Middle => pair(),
        },
        Alignment::BothOffsetInPhase => match edge {
            Edge::Middle => cur,
            _ => merge(dst, cur, masks.for_edge(edge)),
        },
        Alignment::BothOffset => match edge {
            Edge::Middle => pair(),
            _ => merge(dst, pair(), masks.for_edge(edge)),
        },
    }
}

/// Blit the visible part of a scroll buffer into `dst`
///
/// `dst` is a display buffer of `width` columns of `height_bytes` bytes.
/// The window is clipped to the display; bits outside it are untouched.
pub fn render(dst: &mut [u8], width: usize, height_bytes: usize, buf: &ScrollBuffer, data: &[u8]) {
    let disp_x = buf.disp_x as usize;
    let disp_y = buf.disp_y as usize;
    let disp_h = buf.disp_h as usize;
    let int_w = buf.int_w() as usize;
    let int_hb = buf.int_height_bytes();

    if buf.disp_w == 0 || disp_h == 0 || data.len() < buf.buf_size() {
        return;
    }

    let base = disp_y % 8;
    let phase = buf.offset_y() as isize - base as isize;
    let first_src = phase.div_euclid(8);
    let shift = phase.rem_euclid(8) as u8;
    let alignment = classify(base as u8, (buf.offset_y() % 8) as u8, shift);

    let first_row = disp_y / 8;
    let row_count = (base + disp_h).div_ceil(8);
    let keep_last = row_count * 8 - base - disp_h;
    let rows = row_count.min(height_bytes.saturating_sub(first_row));

    let masks = Masks {
        first: 0xFF << base,
        last: 0xFF >> keep_last,
    };

    let x_end = (disp_x + buf.disp_w as usize).min(width);
    for x in disp_x..x_end {
        let src_col = ((x - disp_x + buf.offset_x() as usize) % int_w) * int_hb;
        let column = &data[src_col..src_col + int_hb];
        let dst_col = x * height_bytes + first_row;

        for i in 0..rows {
            let k = (first_src + i as isize).rem_euclid(int_hb as isize) as usize;
            let cur = column[k];
            let next = column[(k + 1) % int_hb];

            let edge = match (i == 0, i == row_count - 1) {
                (true, true) => Edge::FirstLast,
                (true, false) => Edge::First,
                (false, true) => Edge::Last,
                (false, false) => Edge::Middle,
            };

            let d = &mut dst[dst_col + i];
            *d = blend(alignment, edge, &masks, *d, cur, next, shift);
        }
    }
}
