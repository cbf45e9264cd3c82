//! Bus link layer: START/STOP signalling and single-byte transfers on an AVR-style TWI
//! peripheral.

use crate::hw_def::*;
use crate::types::{BusSpeed, BusStatus, Error};

/// Register access to a TWI peripheral (TWCR, TWSR, TWDR, TWBR)
///
/// Implement this over the peripheral access crate of the target; the link layer never touches
/// hardware in any other way.
pub trait TwiRegisters {
    /// Write the control register
    fn write_control(&mut self, value: u8);
    /// Read the control register
    fn read_control(&mut self) -> u8;
    /// Read the status register, prescaler bits included
    fn read_status(&mut self) -> u8;
    /// Write the status register (only the prescaler bits are writable)
    fn write_status(&mut self, value: u8);
    /// Write the bit rate register
    fn write_bit_rate(&mut self, value: u8);
    /// Write the data register
    fn write_data(&mut self, value: u8);
    /// Read the data register
    fn read_data(&mut self) -> u8;
}

/// Bus-level primitives a transaction is built from
pub trait BusLink {
    /// Set the SCL clock; must run before any transaction
    fn configure(&mut self, speed: BusSpeed);
    /// Assert START (repeated START if the bus is held) and wait for completion
    fn start(&mut self) -> Result<BusStatus, Error>;
    /// Assert STOP; does not wait
    fn stop(&mut self);
    /// Clock one byte out and wait for completion
    fn write_byte(&mut self, byte: u8) -> Result<BusStatus, Error>;
    /// Clock one byte in, answering with ACK (`ack == true`) or NOT ACK
    fn read_byte(&mut self, ack: bool) -> Result<(u8, BusStatus), Error>;
}

/// Polled TWI bus master
#[derive(Debug)]
pub struct TwiMaster<R> {
    regs: R,
    cpu_hz: u32,
    poll_limit: u32,
}

impl<R: TwiRegisters> TwiMaster<R> {
    /// Create a bus master for a CPU clocked at `cpu_hz`
    pub fn new(regs: R, cpu_hz: u32) -> Self {
        Self {
            regs,
            cpu_hz,
            poll_limit: DEFAULT_POLL_LIMIT,
        }
    }

    /// Limit how often the interrupt flag is polled before a step counts as stuck
    pub fn with_poll_limit(mut self, poll_limit: u32) -> Self {
        self.poll_limit = poll_limit.max(1);
        self
    }

    /// Give back the register block
    pub fn release(self) -> R {
        self.regs
    }

    fn wait_ready(&mut self) -> Result<(), Error> {
        for _ in 0..self.poll_limit {
            if self.regs.read_control() & (1 << TWINT) != 0 {
                return Ok(());
            }
        }
        warn!("twi: TWINT not raised after {} polls", self.poll_limit);
        Err(Error::BusTimeout)
    }

    fn status(&mut self) -> BusStatus {
        BusStatus::from_register(self.regs.read_status())
    }
}

impl<R: TwiRegisters> BusLink for TwiMaster<R> {
    fn configure(&mut self, speed: BusSpeed) {
        let divisor = bit_rate_divisor(self.cpu_hz, speed.hz());
        debug!("twi: cpu {} Hz, scl {} Hz, TWBR={}", self.cpu_hz, speed.hz(), divisor);
        self.regs.write_status(0x00);
        self.regs.write_bit_rate(divisor);
        self.regs.write_control(1 << TWEN);
    }

    fn start(&mut self) -> Result<BusStatus, Error> {
        self.regs.write_control((1 << TWINT) | (1 << TWSTA) | (1 << TWEN));
        self.wait_ready()?;
        let status = self.status();
        trace!("twi: start -> {}", status.raw());
        Ok(status)
    }

    fn stop(&mut self) {
        self.regs.write_control((1 << TWINT) | (1 << TWEN) | (1 << TWSTO));
        trace!("twi: stop");
    }

    fn write_byte(&mut self, byte: u8) -> Result<BusStatus, Error> {
        self.regs.write_data(byte);
        self.regs.write_control((1 << TWINT) | (1 << TWEN));
        self.wait_ready()?;
        let status = self.status();
        trace!("twi: write {} -> {}", byte, status.raw());
        Ok(status)
    }

    fn read_byte(&mut self, ack: bool) -> Result<(u8, BusStatus), Error> {
        let mut control = (1 << TWINT) | (1 << TWEN);
        if ack {
            control |= 1 << TWEA;
        }
        self.regs.write_control(control);
        self.wait_ready()?;
        let byte = self.regs.read_data();
        let status = self.status();
        trace!("twi: read {} (ack={}) -> {}", byte, ack, status.raw());
        Ok((byte, status))
    }
}
