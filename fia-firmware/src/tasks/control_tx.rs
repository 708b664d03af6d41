//! Control UART transmit task
//!
//! Sends responses to the host in request order and performs a requested
//! reset once its acknowledgement is on the wire.

use defmt::*;
use embassy_stm32::usart::BufferedUartTx;
use embassy_time::{Duration, Timer};
use embedded_io_async::Write;

use fia_protocol::MAX_FRAME_SIZE;

use crate::channels::{RESET_REQUEST, RESPONSE_CHANNEL};

/// Time for the last byte to leave the shift register before reset
const RESET_DRAIN_MS: u64 = 5;

/// Control TX task - encodes and sends responses
#[embassy_executor::task]
pub async fn control_tx_task(mut tx: BufferedUartTx<'static>) {
    info!("Control TX task started");

    let mut buf = [0u8; MAX_FRAME_SIZE];

    loop {
        let response = RESPONSE_CHANNEL.receive().await;

        match response.encode(&mut buf) {
            Ok(len) => {
                if let Err(e) = tx.write_all(&buf[..len]).await {
                    warn!("Failed to send response: {:?}", e);
                } else {
                    trace!("Response sent ({} bytes)", len);
                }
            }
            Err(e) => {
                warn!("Failed to encode response: {:?}", e);
            }
        }

        // The acknowledgement is queued right after the request is raised
        if RESET_REQUEST.signaled() && RESPONSE_CHANNEL.is_empty() {
            RESET_REQUEST.reset();
            if let Err(e) = tx.flush().await {
                warn!("UART flush failed: {:?}", e);
            }
            Timer::after(Duration::from_millis(RESET_DRAIN_MS)).await;
            info!("Resetting on host request");
            cortex_m::peripheral::SCB::sys_reset();
        }
    }
}
