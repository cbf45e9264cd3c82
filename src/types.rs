use crate::hw_def::*;
use crate::transaction::TwiEngine;

use core::fmt;

#[cfg(feature = "defmt")]
use defmt::Format;

/// AHT20 acquisition driver on top of a TWI transaction engine
#[derive(Debug)]
pub struct Aht20<L, Delay> {
    pub(crate) engine: TwiEngine<L>,
    pub(crate) delay: Delay,
    pub(crate) config: Config,
    pub(crate) state: CycleState,
}

/// Runtime options of the acquisition driver
#[cfg_attr(feature = "defmt", derive(Format))]
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Config {
    /// what to do with the checksum byte of each frame; a busy frame is reported as
    /// `SensorBusy` before its checksum is looked at
    pub checksum: ChecksumPolicy,
    /// extra trigger/read cycles to run while the sensor still reports busy
    pub busy_retries: u8,
    /// SCL clock programmed into the link when the driver is created
    pub bus_speed: BusSpeed,
}

/// Handling of the CRC byte at the end of each response frame
#[cfg_attr(feature = "defmt", derive(Format))]
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum ChecksumPolicy {
    /// accept the frame without looking at its checksum
    #[default]
    Ignore,
    /// reject frames whose CRC-8 does not match
    #[cfg(feature = "crc")]
    Verify,
}

/// All possible errors in this crate
#[cfg_attr(feature = "defmt", derive(Format))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Error {
    /// The device did not acknowledge its address (absent, powered off or busy)
    AddressNack,
    /// The bus reported a status other than the one expected at this step
    ProtocolFault(BusStatus),
    /// The bus hardware never signalled completion of a step
    BusTimeout,
    /// The sensor still flagged busy after the settling delay
    SensorBusy,
    /// Invalid input data provided
    InvalidInputData,
    /// Failure of a checksum from the device was detected
    #[cfg(feature = "crc")]
    CrcMismatch,
}
impl Error {
    /// True for faults on the bus itself, false for a sensor that simply is not ready yet
    pub fn is_communication_failure(&self) -> bool {
        !matches!(self, Error::SensorBusy)
    }
}
impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::AddressNack => write!(f, "address not acknowledged"),
            Error::ProtocolFault(status) => write!(f, "unexpected bus status {status}"),
            Error::BusTimeout => write!(f, "bus timeout"),
            Error::SensorBusy => write!(f, "sensor busy"),
            Error::InvalidInputData => write!(f, "invalid input data"),
            #[cfg(feature = "crc")]
            Error::CrcMismatch => write!(f, "checksum mismatch"),
        }
    }
}

/// Status code read back from the TWI status register after a bus step (prescaler bits masked)
#[cfg_attr(feature = "defmt", derive(Format))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct BusStatus(pub u8);
impl BusStatus {
    /// START condition transmitted
    pub const START: Self = Self(STATUS_START);
    /// repeated START condition transmitted
    pub const REPEATED_START: Self = Self(STATUS_REPEATED_START);
    /// SLA+W transmitted, ACK received
    pub const SLA_W_ACK: Self = Self(STATUS_SLA_W_ACK);
    /// SLA+W transmitted, NOT ACK received
    pub const SLA_W_NACK: Self = Self(STATUS_SLA_W_NACK);
    /// data byte transmitted, ACK received
    pub const DATA_TX_ACK: Self = Self(STATUS_DATA_TX_ACK);
    /// data byte transmitted, NOT ACK received
    pub const DATA_TX_NACK: Self = Self(STATUS_DATA_TX_NACK);
    /// arbitration lost
    pub const ARBITRATION_LOST: Self = Self(STATUS_ARBITRATION_LOST);
    /// SLA+R transmitted, ACK received
    pub const SLA_R_ACK: Self = Self(STATUS_SLA_R_ACK);
    /// SLA+R transmitted, NOT ACK received
    pub const SLA_R_NACK: Self = Self(STATUS_SLA_R_NACK);
    /// data byte received, ACK returned
    pub const DATA_RX_ACK: Self = Self(STATUS_DATA_RX_ACK);
    /// data byte received, NOT ACK returned
    pub const DATA_RX_NACK: Self = Self(STATUS_DATA_RX_NACK);

    /// Build from a raw TWSR read, dropping the prescaler bits
    pub fn from_register(twsr: u8) -> Self {
        Self(twsr & TWSR_STATUS_MASK)
    }

    /// Get the raw status code
    pub fn raw(&self) -> u8 {
        self.0
    }
}
impl fmt::Display for BusStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02X}", self.0)
    }
}

/// Transfer direction of a transaction, the low bit of the address phase
#[cfg_attr(feature = "defmt", derive(Format))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Direction {
    /// master transmits
    Write,
    /// master receives
    Read,
}
impl Direction {
    /// Address-phase byte for a 7-bit device address; bit 7 of `address` is ignored
    pub fn address_byte(self, address: u8) -> u8 {
        let bit = match self {
            Direction::Write => DIRECTION_WRITE,
            Direction::Read => DIRECTION_READ,
        };
        ((address & 0x7F) << 1) | bit
    }

    /// Status that acknowledges the address phase in this direction
    pub(crate) fn address_ack(self) -> BusStatus {
        match self {
            Direction::Write => BusStatus::SLA_W_ACK,
            Direction::Read => BusStatus::SLA_R_ACK,
        }
    }

    /// Status reporting that nobody answered the address phase
    pub(crate) fn address_nack(self) -> BusStatus {
        match self {
            Direction::Write => BusStatus::SLA_W_NACK,
            Direction::Read => BusStatus::SLA_R_NACK,
        }
    }
}

/// SCL clock rate
#[cfg_attr(feature = "defmt", derive(Format))]
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum BusSpeed {
    /// 100 kHz
    #[default]
    Standard,
    /// 400 kHz
    Fast,
}
impl BusSpeed {
    /// SCL frequency in hertz
    pub fn hz(&self) -> u32 {
        match self {
            BusSpeed::Standard => 100_000,
            BusSpeed::Fast => 400_000,
        }
    }
}

/// Status byte at the head of every response frame
#[cfg_attr(feature = "defmt", derive(Format))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SensorStatus(pub u8);
impl SensorStatus {
    /// measurement still in progress; the data bytes are not valid
    pub fn is_busy(&self) -> bool {
        (self.0 >> SENSOR_STATUS_BUSY_BIT) & 1 != 0
    }

    /// calibration coefficients loaded
    pub fn is_calibrated(&self) -> bool {
        (self.0 >> SENSOR_STATUS_CALIBRATED_BIT) & 1 != 0
    }
}

/// Seven bytes as returned by the sensor: status, 20 bits humidity, 20 bits temperature, CRC
#[cfg_attr(feature = "defmt", derive(Format))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RawFrame(pub [u8; FRAME_LEN]);
impl RawFrame {
    /// Pack a status byte, two 20-bit fields and a checksum byte into a frame
    pub fn from_fields(status: u8, raw_humidity: u32, raw_temperature: u32, checksum: u8) -> Self {
        let h = raw_humidity & RAW_FIELD_MASK;
        let t = raw_temperature & RAW_FIELD_MASK;
        Self([
            status,
            (h >> 12) as u8,
            (h >> 4) as u8,
            ((h << 4) as u8 & 0xF0) | ((t >> 16) as u8 & 0x0F),
            (t >> 8) as u8,
            t as u8,
            checksum,
        ])
    }

    /// Status byte
    pub fn status(&self) -> SensorStatus {
        SensorStatus(self.0[0])
    }

    /// Humidity field: bytes 1 and 2, then the high nibble of byte 3
    pub fn raw_humidity(&self) -> u32 {
        (self.0[1] as u32) << 12 | (self.0[2] as u32) << 4 | (self.0[3] as u32) >> 4
    }

    /// Temperature field: low nibble of byte 3, then bytes 4 and 5
    pub fn raw_temperature(&self) -> u32 {
        (self.0[3] as u32 & 0x0F) << 16 | (self.0[4] as u32) << 8 | self.0[5] as u32
    }

    /// Checksum byte as sent by the sensor
    pub fn checksum(&self) -> u8 {
        self.0[FRAME_LEN - 1]
    }

    /// CRC-8 over the six leading bytes
    #[cfg(feature = "crc")]
    pub fn expected_checksum(&self) -> u8 {
        crate::device_impl::CRC.checksum(&self.0[..FRAME_LEN - 1])
    }

    /// Turn the frame into physical values, refusing frames flagged busy
    pub fn decode(&self) -> Result<MeasurementSample, Error> {
        if self.status().is_busy() {
            return Err(Error::SensorBusy);
        }
        Ok(MeasurementSample::from_raw(self.raw_humidity(), self.raw_temperature()))
    }
}
impl fmt::Display for RawFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (ii, byte) in self.0.iter().enumerate() {
            if ii > 0 {
                write!(f, " ")?;
            }
            write!(f, "0x{:02X}", byte)?;
        }
        Ok(())
    }
}

/// Temperature and relative humidity after conversion
#[cfg_attr(feature = "defmt", derive(Format))]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MeasurementSample {
    /// degrees centigrade
    pub temperature: f32,
    /// relative humidity in percent
    pub humidity: f32,
}
impl MeasurementSample {
    /// Scale the two 20-bit raw fields
    pub fn from_raw(raw_humidity: u32, raw_temperature: u32) -> Self {
        Self {
            temperature: raw_temp_to_centigrade(raw_temperature),
            humidity: raw_humidity_to_percent(raw_humidity),
        }
    }
}

/// Position of the driver in its trigger/settle/read cycle
#[cfg_attr(feature = "defmt", derive(Format))]
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum CycleState {
    /// no cycle run yet
    #[default]
    Idle,
    /// sending the trigger command
    Triggering,
    /// waiting out the conversion time
    Settling,
    /// fetching the response frame
    Reading,
    /// unpacking the frame
    Decoding,
    /// last cycle produced a sample
    Ready,
    /// last cycle failed
    Invalid,
}
