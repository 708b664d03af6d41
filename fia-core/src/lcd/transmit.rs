//! Multi-bus LCD transmission
//!
//! Every bus is one chain of half-panels behind its own SPI peripheral and
//! latch line. A frame is sent as four backplane slices; after each slice
//! the latch is pulsed so the drivers commit the shifted-in data.
//!
//! Each bus owns two frame buffers, one per driver RAM bank. The scheduler
//! converts into the bank selected by [`TransmitEngine::ram`] while the
//! other bank may still be on the wire, then flips the selector once the
//! transfer has been started.

use super::{RamSelect, TRANSMIT_ORDER};
use crate::config::{
    SideId, BACKPLANE_LCD_BYTES, LCD_BUF_SIZE, MAX_HALF_PANELS_PER_BUS, MAX_PANEL_ROWS, NUM_BUSES,
};
use fia_hal::{DelayUs, OutputPin, SpiBus};

/// Latch strobe width in microseconds
pub const LATCH_PULSE_US: u32 = 1;

/// Identifier of one output bus
///
/// Bus index is `side * MAX_PANEL_ROWS + panel_row`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusId {
    Bus0,
    Bus1,
    Bus2,
    Bus3,
}

impl BusId {
    pub const ALL: [BusId; NUM_BUSES] = [BusId::Bus0, BusId::Bus1, BusId::Bus2, BusId::Bus3];

    /// Bus driving `panel_row` of `side`
    pub const fn new(side: SideId, panel_row: usize) -> Option<Self> {
        if panel_row >= MAX_PANEL_ROWS {
            return None;
        }
        Some(Self::ALL[side.index() * MAX_PANEL_ROWS + panel_row])
    }

    pub const fn index(self) -> usize {
        match self {
            BusId::Bus0 => 0,
            BusId::Bus1 => 1,
            BusId::Bus2 => 2,
            BusId::Bus3 => 3,
        }
    }

    pub const fn side(self) -> SideId {
        if self.index() < MAX_PANEL_ROWS {
            SideId::A
        } else {
            SideId::B
        }
    }

    pub const fn panel_row(self) -> usize {
        self.index() % MAX_PANEL_ROWS
    }
}

/// Events posted by the output hardware
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusEvent {
    /// The last started write on this bus has finished shifting out
    TransferComplete(BusId),
}

/// Result of starting a write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransferStatus {
    /// Completion will be reported as [`BusEvent::TransferComplete`]
    Pending,
    /// The data has already been sent (blocking backends)
    Complete,
}

/// Output side of all buses
pub trait LcdOutput {
    type Error;

    /// Start sending `data` on `bus`
    fn start_write(&mut self, bus: BusId, data: &[u8]) -> Result<TransferStatus, Self::Error>;

    /// Pulse the latch line of `bus`
    fn latch(&mut self, bus: BusId);
}

/// Output hardware of a single bus
pub trait BusChannel {
    type Error;

    fn start_write(&mut self, data: &[u8]) -> Result<TransferStatus, Self::Error>;

    fn latch(&mut self);
}

/// Blocking SPI bus plus latch line
pub struct SpiLatchBus<S, P, D> {
    spi: S,
    latch: P,
    delay: D,
}

impl<S: SpiBus, P: OutputPin, D: DelayUs> SpiLatchBus<S, P, D> {
    pub fn new(spi: S, mut latch: P, delay: D) -> Self {
        latch.set_low();
        Self { spi, latch, delay }
    }
}

impl<S: SpiBus, P: OutputPin, D: DelayUs> BusChannel for SpiLatchBus<S, P, D> {
    type Error = S::Error;

    fn start_write(&mut self, data: &[u8]) -> Result<TransferStatus, Self::Error> {
        self.spi.write(data)?;
        Ok(TransferStatus::Complete)
    }

    fn latch(&mut self) {
        self.latch.set_high();
        self.delay.delay_us(LATCH_PULSE_US);
        self.latch.set_low();
    }
}

/// One channel per bus, indexed by [`BusId::index`]
pub struct BusOutputs<B> {
    channels: [B; NUM_BUSES],
}

impl<B: BusChannel> BusOutputs<B> {
    pub fn new(channels: [B; NUM_BUSES]) -> Self {
        Self { channels }
    }

    pub fn channel(&self, bus: BusId) -> &B {
        &self.channels[bus.index()]
    }
}

impl<B: BusChannel> LcdOutput for BusOutputs<B> {
    type Error = B::Error;

    fn start_write(&mut self, bus: BusId, data: &[u8]) -> Result<TransferStatus, Self::Error> {
        self.channels[bus.index()].start_write(data)
    }

    fn latch(&mut self, bus: BusId) {
        self.channels[bus.index()].latch();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
enum BusState {
    Idle,
    /// Sending the slice at `backplane` in [`TRANSMIT_ORDER`]
    Transmitting { backplane: usize },
}

struct Bus {
    state: BusState,
    frames: [[u8; LCD_BUF_SIZE]; 2],
    /// Bank the next frame is converted for
    bank: RamSelect,
    /// Bank of the frame on the wire
    tx_bank: RamSelect,
    /// Bytes per backplane slice of the frame on the wire
    slice_len: usize,
}

impl Bus {
    const fn new() -> Self {
        Self {
            state: BusState::Idle,
            frames: [[0; LCD_BUF_SIZE]; 2],
            bank: RamSelect::Ram1,
            tx_bank: RamSelect::Ram1,
            slice_len: 0,
        }
    }
}

const fn bank_index(ram: RamSelect) -> usize {
    match ram {
        RamSelect::Ram1 => 0,
        RamSelect::Ram2 => 1,
    }
}

/// Per-bus transmit state machine
///
/// `Idle -> Transmitting(0..4) -> Idle`. At most one frame is in flight per
/// bus; a start request while busy is refused and the caller retries on a
/// later tick.
pub struct TransmitEngine<O> {
    output: O,
    buses: [Bus; NUM_BUSES],
}

impl<O: LcdOutput> TransmitEngine<O> {
    pub fn new(output: O) -> Self {
        Self {
            output,
            buses: [Bus::new(), Bus::new(), Bus::new(), Bus::new()],
        }
    }

    pub fn output(&self) -> &O {
        &self.output
    }

    pub fn is_transmitting(&self, bus: BusId) -> bool {
        matches!(self.buses[bus.index()].state, BusState::Transmitting { .. })
    }

    /// RAM bank the next frame on `bus` must be converted for
    pub fn ram(&self, bus: BusId) -> RamSelect {
        self.buses[bus.index()].bank
    }

    /// Frame buffer for the next frame on `bus`
    ///
    /// Never the buffer currently being transmitted once [`flip_ram`]
    /// has been called after the last start.
    ///
    /// [`flip_ram`]: TransmitEngine::flip_ram
    pub fn frame_mut(&mut self, bus: BusId) -> &mut [u8; LCD_BUF_SIZE] {
        let b = &mut self.buses[bus.index()];
        &mut b.frames[bank_index(b.bank)]
    }

    /// Toggle the bank used for the next frame on `bus`
    pub fn flip_ram(&mut self, bus: BusId) {
        let b = &mut self.buses[bus.index()];
        b.bank = b.bank.flipped();
    }

    /// Start sending the frame in [`frame_mut`] for `half_panels` half-panels
    ///
    /// Returns false without touching any state if the bus is busy or
    /// `half_panels` is not in `1..=MAX_HALF_PANELS_PER_BUS`.
    ///
    /// [`frame_mut`]: TransmitEngine::frame_mut
    pub fn start_transmit(&mut self, bus: BusId, half_panels: usize) -> bool {
        if half_panels == 0 || half_panels > MAX_HALF_PANELS_PER_BUS {
            #[cfg(feature = "defmt")]
            defmt::warn!("{} half-panels on {} out of range", half_panels, bus);
            return false;
        }

        let b = &mut self.buses[bus.index()];
        if b.state != BusState::Idle {
            return false;
        }

        b.tx_bank = b.bank;
        b.slice_len = half_panels * BACKPLANE_LCD_BYTES;
        b.state = BusState::Transmitting { backplane: 0 };
        self.drive(bus);
        true
    }

    pub fn handle_event(&mut self, event: BusEvent) {
        match event {
            BusEvent::TransferComplete(bus) => self.on_transfer_complete(bus),
        }
    }

    /// Latch the slice just sent and continue with the next backplane
    pub fn on_transfer_complete(&mut self, bus: BusId) {
        if !self.is_transmitting(bus) {
            #[cfg(feature = "defmt")]
            defmt::trace!("spurious completion on {}", bus);
            return;
        }
        self.finish_slice(bus);
        self.drive(bus);
    }

    fn finish_slice(&mut self, bus: BusId) {
        self.output.latch(bus);

        let b = &mut self.buses[bus.index()];
        if let BusState::Transmitting { backplane } = b.state {
            let next = backplane + 1;
            b.state = if next < TRANSMIT_ORDER.len() {
                BusState::Transmitting { backplane: next }
            } else {
                BusState::Idle
            };
        }
    }

    /// Issue writes until one is pending or the frame is done
    fn drive(&mut self, bus: BusId) {
        loop {
            let b = &self.buses[bus.index()];
            let BusState::Transmitting { backplane } = b.state else {
                return;
            };

            let start = backplane * b.slice_len;
            let slice = &b.frames[bank_index(b.tx_bank)][start..start + b.slice_len];

            match self.output.start_write(bus, slice) {
                Ok(TransferStatus::Pending) => return,
                Ok(TransferStatus::Complete) => self.finish_slice(bus),
                Err(_) => {
                    #[cfg(feature = "defmt")]
                    defmt::warn!("write failed on {}, frame dropped", bus);
                    self.buses[bus.index()].state = BusState::Idle;
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use heapless::Vec;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct Write {
        bus: BusId,
        first: u8,
        len: usize,
    }

    struct MockOutput {
        status: TransferStatus,
        fail: bool,
        writes: Vec<Write, 32>,
        latches: [usize; NUM_BUSES],
    }

    impl MockOutput {
        fn new(status: TransferStatus) -> Self {
            Self {
                status,
                fail: false,
                writes: Vec::new(),
                latches: [0; NUM_BUSES],
            }
        }
    }

    impl LcdOutput for MockOutput {
        type Error = ();

        fn start_write(&mut self, bus: BusId, data: &[u8]) -> Result<TransferStatus, ()> {
            if self.fail {
                return Err(());
            }
            self.writes
                .push(Write {
                    bus,
                    first: data[0],
                    len: data.len(),
                })
                .unwrap();
            Ok(self.status)
        }

        fn latch(&mut self, bus: BusId) {
            self.latches[bus.index()] += 1;
        }
    }

    /// Fill each backplane slice with its index plus `tag`
    fn fill_frame<O: LcdOutput>(engine: &mut TransmitEngine<O>, bus: BusId, half_panels: usize, tag: u8) {
        let slice = half_panels * BACKPLANE_LCD_BYTES;
        let frame = engine.frame_mut(bus);
        for i in 0..4 {
            frame[i * slice..(i + 1) * slice].fill(tag + i as u8);
        }
    }

    #[test]
    fn test_bus_mapping() {
        assert_eq!(BusId::new(SideId::A, 0), Some(BusId::Bus0));
        assert_eq!(BusId::new(SideId::A, 1), Some(BusId::Bus1));
        assert_eq!(BusId::new(SideId::B, 0), Some(BusId::Bus2));
        assert_eq!(BusId::new(SideId::B, 2), None);
        for bus in BusId::ALL {
            assert_eq!(BusId::new(bus.side(), bus.panel_row()), Some(bus));
        }
    }

    #[test]
    fn test_pending_transfer_walks_backplanes() {
        let mut engine = TransmitEngine::new(MockOutput::new(TransferStatus::Pending));
        fill_frame(&mut engine, BusId::Bus1, 10, 0x10);

        assert!(engine.start_transmit(BusId::Bus1, 10));
        assert!(engine.is_transmitting(BusId::Bus1));
        assert!(!engine.is_transmitting(BusId::Bus0));
        assert_eq!(engine.output().writes.len(), 1);

        for _ in 0..3 {
            engine.handle_event(BusEvent::TransferComplete(BusId::Bus1));
            assert!(engine.is_transmitting(BusId::Bus1));
        }
        engine.handle_event(BusEvent::TransferComplete(BusId::Bus1));
        assert!(!engine.is_transmitting(BusId::Bus1));

        let out = engine.output();
        assert_eq!(out.latches[BusId::Bus1.index()], 4);
        assert_eq!(out.writes.len(), 4);
        for (i, w) in out.writes.iter().enumerate() {
            assert_eq!(w.bus, BusId::Bus1);
            assert_eq!(w.first, 0x10 + i as u8);
            assert_eq!(w.len, 1200);
        }
    }

    #[test]
    fn test_start_while_busy_is_refused() {
        let mut engine = TransmitEngine::new(MockOutput::new(TransferStatus::Pending));
        assert!(engine.start_transmit(BusId::Bus0, 2));
        engine.on_transfer_complete(BusId::Bus0);

        assert!(!engine.start_transmit(BusId::Bus0, 2));
        assert_eq!(engine.output().writes.len(), 2);
        assert!(engine.is_transmitting(BusId::Bus0));

        // Two more completions finish the frame and free the bus
        engine.on_transfer_complete(BusId::Bus0);
        engine.on_transfer_complete(BusId::Bus0);
        engine.on_transfer_complete(BusId::Bus0);
        assert!(!engine.is_transmitting(BusId::Bus0));
        assert!(engine.start_transmit(BusId::Bus0, 2));
    }

    #[test]
    fn test_half_panel_count_out_of_range_refused() {
        let mut engine = TransmitEngine::new(MockOutput::new(TransferStatus::Pending));

        assert!(!engine.start_transmit(BusId::Bus0, 0));
        assert!(!engine.start_transmit(BusId::Bus0, MAX_HALF_PANELS_PER_BUS + 1));
        assert!(!engine.start_transmit(BusId::Bus0, usize::MAX));
        assert!(!engine.is_transmitting(BusId::Bus0));
        assert!(engine.output().writes.is_empty());

        // The largest chain still fits the frame buffer
        assert!(engine.start_transmit(BusId::Bus0, MAX_HALF_PANELS_PER_BUS));
        for _ in 0..4 {
            engine.on_transfer_complete(BusId::Bus0);
        }
        let last = engine.output().writes[3];
        assert_eq!(last.len, MAX_HALF_PANELS_PER_BUS * BACKPLANE_LCD_BYTES);
        assert!(!engine.is_transmitting(BusId::Bus0));
    }

    #[test]
    fn test_blocking_output_completes_immediately() {
        let mut engine = TransmitEngine::new(MockOutput::new(TransferStatus::Complete));
        fill_frame(&mut engine, BusId::Bus3, 4, 0);

        assert!(engine.start_transmit(BusId::Bus3, 4));
        assert!(!engine.is_transmitting(BusId::Bus3));
        let out = engine.output();
        assert_eq!(out.writes.len(), 4);
        assert_eq!(out.latches[BusId::Bus3.index()], 4);
        assert_eq!(out.writes[3].first, 3);
    }

    #[test]
    fn test_write_error_returns_to_idle() {
        let mut output = MockOutput::new(TransferStatus::Pending);
        output.fail = true;
        let mut engine = TransmitEngine::new(output);

        assert!(engine.start_transmit(BusId::Bus2, 10));
        assert!(!engine.is_transmitting(BusId::Bus2));
        assert_eq!(engine.output().latches, [0; NUM_BUSES]);
    }

    #[test]
    fn test_spurious_completion_ignored() {
        let mut engine = TransmitEngine::new(MockOutput::new(TransferStatus::Pending));
        engine.on_transfer_complete(BusId::Bus0);
        assert!(!engine.is_transmitting(BusId::Bus0));
        assert_eq!(engine.output().latches, [0; NUM_BUSES]);
    }

    #[test]
    fn test_ram_banks_ping_pong() {
        let mut engine = TransmitEngine::new(MockOutput::new(TransferStatus::Pending));
        let bus = BusId::Bus0;

        assert_eq!(engine.ram(bus), RamSelect::Ram1);
        fill_frame(&mut engine, bus, 1, 0xA0);
        assert!(engine.start_transmit(bus, 1));
        engine.flip_ram(bus);
        assert_eq!(engine.ram(bus), RamSelect::Ram2);

        // Preparing the next frame does not disturb the one on the wire
        fill_frame(&mut engine, bus, 1, 0xB0);
        engine.on_transfer_complete(bus);
        assert_eq!(engine.output().writes[1].first, 0xA1);

        engine.flip_ram(bus);
        assert_eq!(engine.frame_mut(bus)[0], 0xA0);
    }

    #[test]
    fn test_buses_are_independent() {
        let mut engine = TransmitEngine::new(MockOutput::new(TransferStatus::Pending));
        for bus in BusId::ALL {
            assert!(engine.start_transmit(bus, 10));
        }
        engine.on_transfer_complete(BusId::Bus2);
        let out = engine.output();
        assert_eq!(out.latches, [0, 0, 1, 0]);
        assert_eq!(out.writes.len(), 5);
    }

    struct MockSpi {
        sent: usize,
    }

    impl SpiBus for MockSpi {
        type Error = ();

        fn write(&mut self, data: &[u8]) -> Result<(), ()> {
            self.sent += data.len();
            Ok(())
        }
    }

    struct MockLatch {
        high: bool,
        pulses: usize,
    }

    impl OutputPin for MockLatch {
        fn set_high(&mut self) {
            self.high = true;
            self.pulses += 1;
        }

        fn set_low(&mut self) {
            self.high = false;
        }

        fn is_set_high(&self) -> bool {
            self.high
        }
    }

    struct MockDelay {
        total_us: u32,
    }

    impl DelayUs for MockDelay {
        fn delay_us(&mut self, us: u32) {
            self.total_us += us;
        }
    }

    fn spi_bus() -> SpiLatchBus<MockSpi, MockLatch, MockDelay> {
        SpiLatchBus::new(
            MockSpi { sent: 0 },
            MockLatch {
                high: true,
                pulses: 0,
            },
            MockDelay { total_us: 0 },
        )
    }

    #[test]
    fn test_spi_latch_bus_frame() {
        let outputs = BusOutputs::new([spi_bus(), spi_bus(), spi_bus(), spi_bus()]);
        let mut engine = TransmitEngine::new(outputs);

        assert!(engine.start_transmit(BusId::Bus1, 10));
        assert!(!engine.is_transmitting(BusId::Bus1));

        let channel = engine.output().channel(BusId::Bus1);
        assert_eq!(channel.spi.sent, LCD_BUF_SIZE);
        assert_eq!(channel.latch.pulses, 4);
        assert!(!channel.latch.is_set_high());
        assert_eq!(channel.delay.total_us, 4 * LATCH_PULSE_US);

        assert_eq!(engine.output().channel(BusId::Bus0).spi.sent, 0);
    }
}
