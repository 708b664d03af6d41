//! LCD half-panel wire format and transmission
//!
//! Each half-panel is a chain of column driver ICs behind one serial input.
//! A frame is sent backplane by backplane; every 5 data bytes are followed
//! by a control byte carrying the multiplex mode, the target RAM bank and
//! the backplane address.

pub mod convert;
pub mod transmit;

pub use convert::convert;
pub use transmit::{
    BusChannel, BusEvent, BusId, BusOutputs, LcdOutput, SpiLatchBus, TransferStatus,
    TransmitEngine,
};

/// Control bits selecting 1:4 multiplexing
pub const MUX4: u8 = 0b10;

/// One of the four multiplexed pixel groups of a half-panel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Backplane {
    Com0,
    Com1,
    Com2,
    Com3,
}

/// Order in which backplanes are written into the driver RAM
pub const TRANSMIT_ORDER: [Backplane; 4] = [
    Backplane::Com2,
    Backplane::Com1,
    Backplane::Com3,
    Backplane::Com0,
];

/// Serial bit order of a backplane's data bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BitOrder {
    MsbFirst,
    LsbFirst,
}

impl Backplane {
    /// Address field of the control byte
    pub const fn address(self) -> u8 {
        match self {
            Backplane::Com0 => 0,
            Backplane::Com1 => 0b100 << 3,
            Backplane::Com2 => 0b010 << 3,
            Backplane::Com3 => 0b110 << 3,
        }
    }

    /// Position in [`TRANSMIT_ORDER`]
    ///
    /// This is also the byte row of the backplane inside a half-panel
    /// column, and the index of its slice in a converted frame.
    pub const fn logical_index(self) -> usize {
        match self {
            Backplane::Com2 => 0,
            Backplane::Com1 => 1,
            Backplane::Com3 => 2,
            Backplane::Com0 => 3,
        }
    }

    pub const fn bit_order(self) -> BitOrder {
        match self {
            Backplane::Com0 | Backplane::Com1 => BitOrder::MsbFirst,
            Backplane::Com2 | Backplane::Com3 => BitOrder::LsbFirst,
        }
    }

    /// Prepare a bitmap byte for the wire
    #[inline]
    pub const fn apply_bit_order(self, byte: u8) -> u8 {
        match self.bit_order() {
            BitOrder::MsbFirst => byte,
            BitOrder::LsbFirst => byte.reverse_bits(),
        }
    }
}

/// Driver RAM bank targeted by a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RamSelect {
    #[default]
    Ram1,
    Ram2,
}

impl RamSelect {
    pub const fn bits(self) -> u8 {
        match self {
            RamSelect::Ram1 => 0,
            RamSelect::Ram2 => 1 << 2,
        }
    }

    /// The other bank
    pub const fn flipped(self) -> Self {
        match self {
            RamSelect::Ram1 => RamSelect::Ram2,
            RamSelect::Ram2 => RamSelect::Ram1,
        }
    }
}

/// Control byte following every 5-byte column block
pub const fn control_byte(ram: RamSelect, backplane: Backplane) -> u8 {
    MUX4 | ram.bits() | backplane.address()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Control bits overriding every pixel, never set by the firmware
    const PX_SET: u8 = 1 << 6;
    const PX_BLANK: u8 = 1 << 7;

    #[test]
    fn test_transmit_order_matches_logical_index() {
        for (i, bp) in TRANSMIT_ORDER.iter().enumerate() {
            assert_eq!(bp.logical_index(), i);
        }
    }

    #[test]
    fn test_control_byte() {
        assert_eq!(control_byte(RamSelect::Ram1, Backplane::Com0), 0b0000_0010);
        assert_eq!(control_byte(RamSelect::Ram2, Backplane::Com1), 0b0010_0110);
        assert_eq!(control_byte(RamSelect::Ram1, Backplane::Com2), 0b0001_0010);
        assert_eq!(control_byte(RamSelect::Ram2, Backplane::Com3), 0b0011_0110);
        // Never collides with the all-pixel override bits
        for bp in TRANSMIT_ORDER {
            for ram in [RamSelect::Ram1, RamSelect::Ram2] {
                assert_eq!(control_byte(ram, bp) & (PX_SET | PX_BLANK), 0);
            }
        }
    }

    #[test]
    fn test_bit_order() {
        assert_eq!(Backplane::Com0.apply_bit_order(0b1100_0001), 0b1100_0001);
        assert_eq!(Backplane::Com1.apply_bit_order(0b1100_0001), 0b1100_0001);
        assert_eq!(Backplane::Com2.apply_bit_order(0b1100_0001), 0b1000_0011);
        assert_eq!(Backplane::Com3.apply_bit_order(0b1100_0001), 0b1000_0011);
    }

    #[test]
    fn test_ram_flip() {
        assert_eq!(RamSelect::Ram1.flipped(), RamSelect::Ram2);
        assert_eq!(RamSelect::Ram2.flipped().flipped(), RamSelect::Ram2);
    }
}
