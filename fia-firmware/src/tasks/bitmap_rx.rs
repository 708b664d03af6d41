//! Bitmap UART receive task
//!
//! Streams raw bitmap bytes from the bulk UART into the bitmap pipe. The
//! frame task drains the pipe into the current receive destination.

use defmt::*;
use embassy_stm32::usart::BufferedUart;
use embedded_io_async::Read;

use crate::channels::BITMAP_PIPE;

/// Chunk size per UART read
const RX_CHUNK_SIZE: usize = 256;

/// Bitmap RX task - forwards the bulk channel into the pipe
#[embassy_executor::task]
pub async fn bitmap_rx_task(uart: BufferedUart<'static>) {
    info!("Bitmap RX task started");

    // The transmit half stays alive with the task; the host never reads it
    let (_tx, mut rx) = uart.split();
    let mut buf = [0u8; RX_CHUNK_SIZE];

    loop {
        match rx.read(&mut buf).await {
            Ok(n) if n > 0 => {
                trace!("Bitmap RX: {} bytes", n);
                // Waits for the frame task when the pipe is full
                BITMAP_PIPE.write_all(&buf[..n]).await;
            }
            Ok(_) => {}
            Err(e) => {
                warn!("Bitmap UART read error: {:?}", e);
            }
        }
    }
}
