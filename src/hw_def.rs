//! Wire-level constants for the TWI peripheral and the AHT20 sensor.

/// 7-bit bus address of the AHT20
pub const AHT20_ADDRESS: u8 = 0x38;

/// Trigger-measurement command, followed by its two parameter bytes
pub const TRIGGER_MEASUREMENT: [u8; 3] = [0xAC, 0x33, 0x00];

/// Conversion time the sensor needs between trigger and read-out
pub const SETTLING_DELAY_MS: u32 = 80;

/// Length of a measurement response frame
pub const FRAME_LEN: usize = 7;

// status byte (frame byte 0)
pub(crate) const SENSOR_STATUS_BUSY_BIT: u8 = 7;
pub(crate) const SENSOR_STATUS_CALIBRATED_BIT: u8 = 3;

/// Full scale of the 20-bit humidity and temperature fields
pub const RAW_FULL_SCALE: f32 = 1_048_576.0;
pub(crate) const RAW_FIELD_MASK: u32 = 0x000F_FFFF;
pub(crate) const HUMIDITY_SCALE: f32 = 100.0;
pub(crate) const TEMPERATURE_SCALE: f32 = 200.0;
pub(crate) const TEMPERATURE_OFFSET: f32 = 50.0;

/// Address-phase direction bit for a master write
pub const DIRECTION_WRITE: u8 = 0;
/// Address-phase direction bit for a master read
pub const DIRECTION_READ: u8 = 1;

// TWCR bits
pub(crate) const TWINT: u8 = 7;
pub(crate) const TWEA: u8 = 6;
pub(crate) const TWSTA: u8 = 5;
pub(crate) const TWSTO: u8 = 4;
pub(crate) const TWEN: u8 = 2;

/// Prescaler bits live in the low bits of TWSR and are not part of the status code
pub(crate) const TWSR_STATUS_MASK: u8 = 0xF8;

/// CPU clock of the reference board (ATmega328P at 16 MHz)
pub const DEFAULT_CPU_HZ: u32 = 16_000_000;

/// Polls of the interrupt flag before a wait is declared stuck
pub const DEFAULT_POLL_LIMIT: u32 = 10_000;

// TWSR status codes, master transmitter and master receiver modes
pub(crate) const STATUS_START: u8 = 0x08;
pub(crate) const STATUS_REPEATED_START: u8 = 0x10;
pub(crate) const STATUS_SLA_W_ACK: u8 = 0x18;
pub(crate) const STATUS_SLA_W_NACK: u8 = 0x20;
pub(crate) const STATUS_DATA_TX_ACK: u8 = 0x28;
pub(crate) const STATUS_DATA_TX_NACK: u8 = 0x30;
pub(crate) const STATUS_ARBITRATION_LOST: u8 = 0x38;
pub(crate) const STATUS_SLA_R_ACK: u8 = 0x40;
pub(crate) const STATUS_SLA_R_NACK: u8 = 0x48;
pub(crate) const STATUS_DATA_RX_ACK: u8 = 0x50;
pub(crate) const STATUS_DATA_RX_NACK: u8 = 0x58;

pub(crate) fn raw_humidity_to_percent(raw: u32) -> f32 {
    (raw & RAW_FIELD_MASK) as f32 * HUMIDITY_SCALE / RAW_FULL_SCALE
}

pub(crate) fn raw_temp_to_centigrade(raw: u32) -> f32 {
    (raw & RAW_FIELD_MASK) as f32 * TEMPERATURE_SCALE / RAW_FULL_SCALE - TEMPERATURE_OFFSET
}

/// TWBR value for the requested SCL frequency, prescaler 1.
///
/// SCL = CPU / (16 + 2 * TWBR). Frequencies the CPU clock cannot reach are clamped to the
/// nearest representable divisor.
pub(crate) fn bit_rate_divisor(cpu_hz: u32, scl_hz: u32) -> u8 {
    let ratio = cpu_hz / scl_hz.max(1);
    let divisor = ratio.saturating_sub(16) / 2;
    divisor.min(u8::MAX as u32) as u8
}
