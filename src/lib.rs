//! This is a platform-agnostic Rust driver for the AHT20 humidity and temperature sensor, talking
//! to it through a hand-rolled master for the AVR-style two-wire interface (TWI, I²C compatible)
//! and smoothing the results with a three-sample moving average.
//!
//! The crate is layered, each layer only using the one below it:
//! - [`TwiMaster`] (bus link layer): START/STOP, single byte writes, single byte reads with a
//!   chosen ACK/NOT ACK answer, and the status code after each step. Built on [`TwiRegisters`],
//!   which a board implements over its peripheral access crate.
//! - [`TwiEngine`] (transactions): address a device for reading or writing, send command bytes,
//!   burst-read a response acknowledging every byte but the last.
//! - [`Aht20`] (sensor protocol): trigger, settle, read the 7-byte frame and decode it.
//! - [`SlidingWindow`] (smoothing): average over the last three samples.
//! - [`report_cycle`] / [`report_average`]: one text line per cycle to a [`ByteSink`].
//!
//! Every wait on the hardware is bounded; a bus that never completes a step yields
//! [`Error::BusTimeout`] instead of hanging.
//!
//! ## Features
//!
//! - `crc`: Allows checking the frame CRC against the computed CRC ([`ChecksumPolicy::Verify`]).
//! - `defmt`: Enables logging using the `defmt` framework.
//! - `log`: Enables logging using the `log` framework.
//!
//! ## Wire protocol
//!
//! The sensor answers at address 0x38. A measurement is two transactions separated by a STOP:
//! write `0xAC 0x33 0x00`, wait for the conversion, then read seven bytes:
//!
//! | byte | content                                               |
//! |------|-------------------------------------------------------|
//! | 0    | status, bit 7 busy, bit 3 calibrated                  |
//! | 1-2  | humidity bits 19..4                                   |
//! | 3    | humidity bits 3..0 (high nibble), temperature 19..16  |
//! | 4-5  | temperature bits 15..0                                |
//! | 6    | CRC-8 (poly 0x31, init 0xFF)                          |
//!
//! Humidity is `raw * 100 / 2^20` %RH, temperature `raw * 200 / 2^20 - 50` °C.
//!
//! Datasheet:
//!   [AHT20](https://cdn-learn.adafruit.com/assets/assets/000/091/676/original/AHT20-datasheet-2020-4-16.pdf)
//!
//! ## Example:
//!
//! ```ignore
//! use aht20_twi::{report_cycle, Aht20, SlidingWindow, TwiMaster, DEFAULT_CPU_HZ};
//!
//! // Platform-specific
//! let regs = /* aht20_twi::TwiRegisters instance */;
//! let delay = /* embedded_hal::delay::DelayNs instance */;
//! let mut uart = /* aht20_twi::ByteSink instance */;
//!
//! let mut aht20 = Aht20::new(TwiMaster::new(regs, DEFAULT_CPU_HZ), delay);
//! let mut window = SlidingWindow::new();
//!
//! loop {
//!     let outcome = aht20.acquire(&mut window);
//!     report_cycle(&mut uart, &outcome).unwrap();
//!     // Platform-specific: sleep a while
//!     sleep_secs(1);
//! }
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![cfg_attr(not(test), no_std)]

#[cfg(all(feature = "defmt", feature = "log"))]
compile_error!("Features \"defmt\" and \"log\" are mutually exclusive and cannot be enabled together");

#[macro_use]
mod fmt;

mod device_impl;
mod filter;
mod hw_def;
mod link;
mod report;
mod transaction;
mod types;

pub use crate::{
    filter::*,
    hw_def::{
        AHT20_ADDRESS, DEFAULT_CPU_HZ, DEFAULT_POLL_LIMIT, DIRECTION_READ, DIRECTION_WRITE,
        FRAME_LEN, RAW_FULL_SCALE, SETTLING_DELAY_MS, TRIGGER_MEASUREMENT,
    },
    link::*,
    report::*,
    transaction::TwiEngine,
    types::*,
};
