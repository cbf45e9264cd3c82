//! One text line per acquisition cycle, sent to a byte-oriented output channel.

use core::fmt::{self, Write};

use crate::types::{Error, MeasurementSample};

/// Blocking, in-order byte output (typically a UART transmitter)
pub trait ByteSink {
    /// Send one byte
    fn send_byte(&mut self, byte: u8);

    /// Send every byte of `text`
    fn send_str(&mut self, text: &str) {
        for byte in text.bytes() {
            self.send_byte(byte);
        }
    }
}

/// [`fmt::Write`] adapter so `write!` can target a [`ByteSink`]
pub struct SinkWriter<'a, S: ?Sized>(pub &'a mut S);

impl<S: ByteSink + ?Sized> Write for SinkWriter<'_, S> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.0.send_str(s);
        Ok(())
    }
}

/// Report the outcome of one cycle
///
/// `outcome` is what [`Aht20::acquire`](crate::Aht20::acquire) returned: the averaged sample or
/// the reason there is none.
pub fn report_cycle<S: ByteSink + ?Sized>(
    sink: &mut S,
    outcome: &Result<MeasurementSample, Error>,
) -> fmt::Result {
    let mut out = SinkWriter(sink);
    match outcome {
        Ok(sample) => write!(
            out,
            "Temperature: {:5.1} C Humidity: {:5.1}%\r\n",
            sample.temperature, sample.humidity
        ),
        Err(Error::SensorBusy) => out.write_str("Sensor busy, no new sample.\r\n"),
        Err(err) => write!(out, "Sensor communication failure: {err}\r\n"),
    }
}

/// Report the current window average, or that nothing has been measured yet
pub fn report_average<S: ByteSink + ?Sized>(
    sink: &mut S,
    average: Option<MeasurementSample>,
) -> fmt::Result {
    match average {
        Some(sample) => report_cycle(sink, &Ok(sample)),
        None => SinkWriter(sink).write_str("No measurements available.\r\n"),
    }
}
