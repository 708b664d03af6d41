//! Control UART receive task
//!
//! Parses request frames from the host and queues them for the frame task.

use defmt::*;
use embassy_stm32::usart::BufferedUartRx;
use embedded_io_async::Read;

use fia_protocol::{Command, FrameError, FrameParser};

use crate::channels::COMMAND_CHANNEL;

/// Buffer size for UART receive
const RX_BUF_SIZE: usize = 64;

/// Control RX task - receives and decodes host requests
#[embassy_executor::task]
pub async fn control_rx_task(mut rx: BufferedUartRx<'static>) {
    info!("Control RX task started");

    let mut parser = FrameParser::new();
    let mut buf = [0u8; RX_BUF_SIZE];

    loop {
        match rx.read(&mut buf).await {
            Ok(n) if n > 0 => {
                trace!("RX: {} bytes", n);

                for &byte in &buf[..n] {
                    match parser.feed(byte) {
                        Ok(Some(frame)) => {
                            // Undecodable requests still get a (empty) response
                            let request = Command::from_frame(&frame);
                            if let Err(e) = &request {
                                debug!("Command 0x{:02x} rejected: {:?}", frame.command, e);
                            }
                            // Back-pressure the host instead of dropping requests
                            COMMAND_CHANNEL.send(request).await;
                        }
                        Ok(None) => {}
                        Err(FrameError::InvalidChecksum) => {
                            warn!("Checksum mismatch, frame dropped");
                        }
                        Err(e) => {
                            warn!("Frame parse error: {:?}", e);
                        }
                    }
                }
            }
            Ok(_) => {}
            Err(e) => {
                warn!("UART read error: {:?}", e);
            }
        }
    }
}
