//! Serial port handling
//!
//! Opens RS-232 ports with the line discipline Gemini drives expect:
//! 8 data bits, no parity, one stop bit and XON/XOFF flow control.

use serialport::SerialPort;
use std::time::Duration;

use super::{ProtocolError, DEFAULT_BAUD_RATE};

/// Open a serial port configured for a Gemini drive
///
/// Reads use a short timeout; the protocol engine polls
/// `bytes_to_read()` and handles its own deadlines.
pub fn open_port(
    name: &str,
    baud_rate: Option<u32>,
    timeout: Duration,
) -> Result<Box<dyn SerialPort>, ProtocolError> {
    let baud = baud_rate.unwrap_or(DEFAULT_BAUD_RATE);

    serialport::new(name, baud)
        .data_bits(serialport::DataBits::Eight)
        .parity(serialport::Parity::None)
        .stop_bits(serialport::StopBits::One)
        .flow_control(serialport::FlowControl::Software)
        .timeout(timeout)
        .open()
        .map_err(|e| ProtocolError::SerialError(e.to_string()))
}
