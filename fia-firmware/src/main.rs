//! FIA - Passenger Information Display Controller Firmware
//!
//! Main firmware binary for the STM32F413 board driving two sides of
//! Aditech LCD panels. Bitmaps are composed, scrolled and converted on the
//! controller; a host issues commands over one UART and streams bitmaps
//! over a second, faster one.

#![no_std]
#![no_main]

use defmt::*;
use embassy_executor::Spawner;
use embassy_stm32::adc::{Adc, AdcChannel, SampleTime};
use embassy_stm32::bind_interrupts;
use embassy_stm32::dac::Dac;
use embassy_stm32::gpio::{Input, Level, Output, Pull, Speed};
use embassy_stm32::i2c::{self, I2c};
use embassy_stm32::peripherals;
use embassy_stm32::spi::Spi;
use embassy_stm32::usart::{self, BufferedUart};
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use fia_core::config::{parse_config, DisplayConfig};
use fia_core::lcd::{BusOutputs, SpiLatchBus};
use fia_core::receive::StreamLink;
use fia_core::scheduler::FrameScheduler;
use fia_hal::gpio::ActiveLevel;
use fia_hal::spi::SpiConfig;
use fia_hal_stm32::spi::embassy_config;
use fia_hal_stm32::{BlockingSpi, EmbassyDelay, LatchPin, SwitchInput, UartConfig};

use crate::board::{ActuatorPins, BoardIo};
use crate::channels::{ChannelControl, PipeQueue};
use crate::tasks::Scheduler;

mod board;
mod channels;
mod tasks;

/// Embedded start-up configuration (compiled into firmware)
/// Edit display.toml and rebuild to customize
const EMBEDDED_CONFIG: &str = include_str!("../display.toml");

/// LCD bus clock
const LCD_SPI_FREQUENCY: u32 = 4_000_000;

bind_interrupts!(struct Irqs {
    UART10 => usart::BufferedInterruptHandler<peripherals::UART10>;
    USART6 => usart::BufferedInterruptHandler<peripherals::USART6>;
});

// Static cells for UART buffers (must live forever)
static TX_BUF: StaticCell<[u8; 512]> = StaticCell::new();
static RX_BUF: StaticCell<[u8; 512]> = StaticCell::new();
static BULK_TX_BUF: StaticCell<[u8; 16]> = StaticCell::new();
static BULK_RX_BUF: StaticCell<[u8; 2048]> = StaticCell::new();

// Frame buffers, layers and scroll arena; too large for the stack
static SCHEDULER: StaticCell<Scheduler> = StaticCell::new();

/// Main entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("FIA firmware starting...");

    let p = embassy_stm32::init(Default::default());
    info!("Peripherals initialized");

    let config = load_config();
    info!(
        "Layout: {} x {} panels per side, {:?}",
        config.layout.panels_per_row(),
        config.layout.panel_rows(),
        config.layout.topology()
    );

    // Control channel: UART10 (PE2=RX, PE3=TX)
    let tx_buf = TX_BUF.init([0u8; 512]);
    let rx_buf = RX_BUF.init([0u8; 512]);
    let uart = BufferedUart::new(
        p.UART10,
        p.PE2, // RX
        p.PE3, // TX
        tx_buf,
        rx_buf,
        Irqs,
        UartConfig::default().to_embassy(),
    )
    .unwrap();
    let (tx, rx) = uart.split();

    // Bitmap channel: USART6 (PC7=RX, PC6=TX)
    let bulk_tx_buf = BULK_TX_BUF.init([0u8; 16]);
    let bulk_rx_buf = BULK_RX_BUF.init([0u8; 2048]);
    let bulk = BufferedUart::new(
        p.USART6,
        p.PC7, // RX
        p.PC6, // TX
        bulk_tx_buf,
        bulk_rx_buf,
        Irqs,
        UartConfig::bulk().to_embassy(),
    )
    .unwrap();

    // LCD buses: bus index is side * 2 + panel row
    let spi_config = embassy_config(&SpiConfig {
        frequency: LCD_SPI_FREQUENCY,
        ..Default::default()
    });
    let bus = |spi, latch| {
        SpiLatchBus::new(BlockingSpi::new(spi), LatchPin::new(latch), EmbassyDelay::new())
    };
    let buses = BusOutputs::new([
        // Side A, upper row: SPI1 (PB3=SCK, PA7=MOSI), latch PC4
        bus(
            Spi::new_blocking_txonly(p.SPI1, p.PB3, p.PA7, spi_config),
            Output::new(p.PC4, Level::Low, Speed::VeryHigh),
        ),
        // Side A, lower row: SPI2 (PB10=SCK, PC3=MOSI), latch PE15
        bus(
            Spi::new_blocking_txonly(p.SPI2, p.PB10, p.PC3, spi_config),
            Output::new(p.PE15, Level::Low, Speed::VeryHigh),
        ),
        // Side B, upper row: SPI3 (PB12=SCK, PC12=MOSI), latch PB13
        bus(
            Spi::new_blocking_txonly(p.SPI3, p.PB12, p.PC12, spi_config),
            Output::new(p.PB13, Level::Low, Speed::VeryHigh),
        ),
        // Side B, lower row: SPI4 (PE12=SCK, PE6=MOSI), latch PE11
        bus(
            Spi::new_blocking_txonly(p.SPI4, p.PE12, p.PE6, spi_config),
            Output::new(p.PE11, Level::Low, Speed::VeryHigh),
        ),
    ]);

    // Door switches pull the input low when open
    let doors = [
        ActiveLevel::new(SwitchInput::new(Input::new(p.PE8, Pull::Up)), false),
        ActiveLevel::new(SwitchInput::new(Input::new(p.PE10, Pull::Up)), false),
    ];

    let actuators = ActuatorPins {
        heaters: [
            Output::new(p.PD8, Level::Low, Speed::Low),
            Output::new(p.PD9, Level::Low, Speed::Low),
        ],
        circulation_fans: [
            Output::new(p.PD11, Level::Low, Speed::Low),
            Output::new(p.PD12, Level::Low, Speed::Low),
        ],
        heat_exchanger_fan: Output::new(p.PD10, Level::Low, Speed::Low),
        ballast_fan: Output::new(p.PD13, Level::Low, Speed::Low),
    };
    let backlight = Output::new(p.PD14, Level::Low, Speed::Low);

    // Contrast: DAC channels on PA4 (side A) and PA5 (side B)
    let contrast = Dac::new_blocking(p.DAC1, p.PA4, p.PA5).split();

    // Backlight DACs and SHT21 on I2C1 (PB6=SCL, PB7=SDA)
    let i2c = I2c::new_blocking(p.I2C1, p.PB6, p.PB7, i2c::Config::default());

    // Ambient light sensors on PA0 (side A) and PA1 (side B)
    let mut adc = Adc::new(p.ADC1);
    adc.set_sample_time(SampleTime::CYCLES480);
    let env = [p.PA0.degrade_adc(), p.PA1.degrade_adc()];

    let io = BoardIo::new(doors, actuators, backlight, contrast, i2c, adc, env);

    let link = StreamLink::new(PipeQueue);
    let scheduler =
        SCHEDULER.init_with(|| FrameScheduler::new(&config, buses, ChannelControl, io, link));
    info!("Display state initialized");

    // Spawn tasks
    spawner.spawn(tasks::control_rx_task(rx)).unwrap();
    spawner.spawn(tasks::control_tx_task(tx)).unwrap();
    spawner.spawn(tasks::bitmap_rx_task(bulk)).unwrap();
    spawner.spawn(tasks::frame_task(scheduler, config.tick_ms)).unwrap();

    info!("All tasks spawned");
}

/// Parse the embedded display.toml, falling back to defaults
fn load_config() -> DisplayConfig {
    match parse_config(EMBEDDED_CONFIG) {
        Ok(config) => config,
        Err(e) => {
            warn!("display.toml rejected ({:?}), using defaults", e);
            DisplayConfig::default()
        }
    }
}
