//! Frame task
//!
//! Runs the scheduler at the configured tick: commands, bitmap receive,
//! panel I/O, scrolling, compositing and the LCD buses.

use defmt::*;
use embassy_time::{Duration, Ticker};

use fia_core::lcd::{BusOutputs, SpiLatchBus};
use fia_core::receive::StreamLink;
use fia_core::scheduler::FrameScheduler;
use fia_hal_stm32::{BlockingSpi, EmbassyDelay, LatchPin};

use crate::board::BoardIo;
use crate::channels::{ChannelControl, PipeQueue};

/// The four LCD buses as wired on the board
pub type Buses = BusOutputs<SpiLatchBus<BlockingSpi, LatchPin, EmbassyDelay>>;

/// Scheduler with the board's concrete peripherals
pub type Scheduler = FrameScheduler<Buses, ChannelControl, BoardIo, StreamLink<PipeQueue>>;

/// Frame task - one scheduler tick per period
#[embassy_executor::task]
pub async fn frame_task(scheduler: &'static mut Scheduler, tick_ms: u32) {
    info!("Frame task started ({} ms tick)", tick_ms);

    let mut ticker = Ticker::every(Duration::from_millis(u64::from(tick_ms)));

    loop {
        scheduler.tick();
        ticker.next().await;
    }
}
