//! Addressed transactions composed from link-layer primitives.

use crate::link::BusLink;
use crate::types::{BusStatus, Direction, Error};

/// Transaction engine over a [`BusLink`]
///
/// Every step is followed by a status check; the first unexpected status aborts the transaction
/// and is returned to the caller, which decides whether to `close()` and retry. Once START has
/// been issued the bus counts as held until `close()`, even if the address phase failed, and no
/// new transaction can be opened before that.
#[derive(Debug)]
pub struct TwiEngine<L> {
    link: L,
    // set only once the device acknowledged its address
    direction: Option<Direction>,
    held: bool,
}

impl<L: BusLink> TwiEngine<L> {
    /// Wrap a configured link
    pub fn new(link: L) -> Self {
        Self {
            link,
            direction: None,
            held: false,
        }
    }

    /// Give back the link
    pub fn release(self) -> L {
        self.link
    }

    /// Direction of the open transaction, if any
    pub fn direction(&self) -> Option<Direction> {
        self.direction
    }

    /// START, then address the device for `direction`
    ///
    /// Refused with `InvalidInputData` while the previous transaction has not been closed.
    pub fn open(&mut self, address: u8, direction: Direction) -> Result<(), Error> {
        if address > 0x7F {
            return Err(Error::InvalidInputData);
        }
        if self.held {
            warn!("twi: open while the previous transaction is not closed");
            return Err(Error::InvalidInputData);
        }
        self.held = true;
        let status = self.link.start()?;
        if status != BusStatus::START && status != BusStatus::REPEATED_START {
            warn!("twi: start failed, status {}", status.raw());
            return Err(Error::ProtocolFault(status));
        }
        let status = self.link.write_byte(direction.address_byte(address))?;
        if status == direction.address_ack() {
            trace!("twi: device {} acknowledged", address);
            self.direction = Some(direction);
            Ok(())
        } else if status == direction.address_nack() {
            warn!("twi: device {} did not acknowledge", address);
            Err(Error::AddressNack)
        } else {
            warn!("twi: unexpected status {} after address phase", status.raw());
            Err(Error::ProtocolFault(status))
        }
    }

    /// Send `bytes` in order; stops at the first byte that is not acknowledged
    pub fn write(&mut self, bytes: &[u8]) -> Result<(), Error> {
        if self.direction != Some(Direction::Write) {
            return Err(Error::InvalidInputData);
        }
        for byte in bytes {
            let status = self.link.write_byte(*byte)?;
            if status != BusStatus::DATA_TX_ACK {
                warn!("twi: byte {} answered with status {}", byte, status.raw());
                return Err(Error::ProtocolFault(status));
            }
        }
        Ok(())
    }

    /// Fill `buf`, acknowledging every byte but the last
    pub fn read(&mut self, buf: &mut [u8]) -> Result<(), Error> {
        if self.direction != Some(Direction::Read) {
            return Err(Error::InvalidInputData);
        }
        let last = buf.len().saturating_sub(1);
        for (ii, slot) in buf.iter_mut().enumerate() {
            let ack = ii < last;
            let (byte, status) = self.link.read_byte(ack)?;
            let expected = if ack {
                BusStatus::DATA_RX_ACK
            } else {
                BusStatus::DATA_RX_NACK
            };
            if status != expected {
                warn!("twi: read {} gave status {}", ii, status.raw());
                return Err(Error::ProtocolFault(status));
            }
            *slot = byte;
        }
        Ok(())
    }

    /// STOP; ends the transaction
    pub fn close(&mut self) {
        self.link.stop();
        self.direction = None;
        self.held = false;
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::types::BusSpeed;
    use std::collections::VecDeque;
    use std::vec::Vec;

    /// One bus primitive as seen by the link
    #[derive(Clone, Copy, Debug, Eq, PartialEq)]
    pub(crate) enum Op {
        Configure(BusSpeed),
        Start,
        Stop,
        Write(u8),
        Read { ack: bool },
    }

    /// Scripted reply to a start/write/read
    #[derive(Clone, Copy, Debug)]
    pub(crate) enum Reply {
        Status(BusStatus),
        Byte(u8, BusStatus),
        Timeout,
    }

    /// Link double recording every primitive in order
    #[derive(Default)]
    pub(crate) struct ScriptedLink {
        pub(crate) ops: Vec<Op>,
        pub(crate) replies: VecDeque<Reply>,
    }

    impl ScriptedLink {
        pub(crate) fn new(replies: &[Reply]) -> Self {
            Self {
                ops: Vec::new(),
                replies: replies.iter().copied().collect(),
            }
        }

        fn next_status(&mut self) -> Result<BusStatus, Error> {
            match self.replies.pop_front().expect("script exhausted") {
                Reply::Status(status) => Ok(status),
                Reply::Byte(_, status) => Ok(status),
                Reply::Timeout => Err(Error::BusTimeout),
            }
        }
    }

    impl BusLink for ScriptedLink {
        fn configure(&mut self, speed: BusSpeed) {
            self.ops.push(Op::Configure(speed));
        }
        fn start(&mut self) -> Result<BusStatus, Error> {
            self.ops.push(Op::Start);
            self.next_status()
        }
        fn stop(&mut self) {
            self.ops.push(Op::Stop);
        }
        fn write_byte(&mut self, byte: u8) -> Result<BusStatus, Error> {
            self.ops.push(Op::Write(byte));
            self.next_status()
        }
        fn read_byte(&mut self, ack: bool) -> Result<(u8, BusStatus), Error> {
            self.ops.push(Op::Read { ack });
            match self.replies.pop_front().expect("script exhausted") {
                Reply::Byte(byte, status) => Ok((byte, status)),
                Reply::Status(status) => Ok((0xFF, status)),
                Reply::Timeout => Err(Error::BusTimeout),
            }
        }
    }

    #[test]
    fn open_write_sends_address_with_write_bit() {
        let link = ScriptedLink::new(&[
            Reply::Status(BusStatus::START),
            Reply::Status(BusStatus::SLA_W_ACK),
        ]);
        let mut engine = TwiEngine::new(link);
        assert_eq!(engine.open(0x38, Direction::Write), Ok(()));
        assert_eq!(engine.direction(), Some(Direction::Write));
        assert_eq!(engine.release().ops, [Op::Start, Op::Write(0x70)]);
    }

    #[test]
    fn open_read_sends_address_with_read_bit() {
        let link = ScriptedLink::new(&[
            Reply::Status(BusStatus::START),
            Reply::Status(BusStatus::SLA_R_ACK),
        ]);
        let mut engine = TwiEngine::new(link);
        assert_eq!(engine.open(0x38, Direction::Read), Ok(()));
        assert_eq!(engine.release().ops, [Op::Start, Op::Write(0x71)]);
    }

    #[test]
    fn address_nack_stops_further_bus_traffic() {
        let link = ScriptedLink::new(&[
            Reply::Status(BusStatus::START),
            Reply::Status(BusStatus::SLA_W_NACK),
        ]);
        let mut engine = TwiEngine::new(link);
        assert_eq!(engine.open(0x38, Direction::Write), Err(Error::AddressNack));
        assert_eq!(engine.release().ops, [Op::Start, Op::Write(0x70)]);
    }

    #[test]
    fn no_write_or_read_after_address_nack() {
        let link = ScriptedLink::new(&[
            Reply::Status(BusStatus::START),
            Reply::Status(BusStatus::SLA_W_NACK),
        ]);
        let mut engine = TwiEngine::new(link);
        assert_eq!(engine.open(0x38, Direction::Write), Err(Error::AddressNack));
        assert_eq!(engine.direction(), None);
        assert_eq!(engine.write(&[0xAC]), Err(Error::InvalidInputData));
        let mut buf = [0u8; 7];
        assert_eq!(engine.read(&mut buf), Err(Error::InvalidInputData));
        assert_eq!(engine.release().ops, [Op::Start, Op::Write(0x70)]);
    }

    #[test]
    fn open_refused_until_close() {
        let link = ScriptedLink::new(&[
            Reply::Status(BusStatus::START),
            Reply::Status(BusStatus::SLA_W_ACK),
            Reply::Status(BusStatus::START),
            Reply::Status(BusStatus::SLA_R_ACK),
        ]);
        let mut engine = TwiEngine::new(link);
        engine.open(0x38, Direction::Write).unwrap();
        assert_eq!(engine.open(0x38, Direction::Read), Err(Error::InvalidInputData));
        engine.close();
        assert_eq!(engine.open(0x38, Direction::Read), Ok(()));
        assert_eq!(
            engine.release().ops,
            [Op::Start, Op::Write(0x70), Op::Stop, Op::Start, Op::Write(0x71)]
        );
    }

    #[test]
    fn failed_address_phase_still_needs_close() {
        let link = ScriptedLink::new(&[
            Reply::Status(BusStatus::START),
            Reply::Status(BusStatus::SLA_W_NACK),
            Reply::Status(BusStatus::START),
            Reply::Status(BusStatus::SLA_W_ACK),
        ]);
        let mut engine = TwiEngine::new(link);
        assert_eq!(engine.open(0x38, Direction::Write), Err(Error::AddressNack));
        assert_eq!(engine.open(0x38, Direction::Write), Err(Error::InvalidInputData));
        engine.close();
        assert_eq!(engine.open(0x38, Direction::Write), Ok(()));
    }

    #[test]
    fn read_direction_nack_is_address_nack() {
        let link = ScriptedLink::new(&[
            Reply::Status(BusStatus::START),
            Reply::Status(BusStatus::SLA_R_NACK),
        ]);
        let mut engine = TwiEngine::new(link);
        assert_eq!(engine.open(0x38, Direction::Read), Err(Error::AddressNack));
    }

    #[test]
    fn unexpected_address_status_is_protocol_fault() {
        let link = ScriptedLink::new(&[
            Reply::Status(BusStatus::START),
            Reply::Status(BusStatus::ARBITRATION_LOST),
        ]);
        let mut engine = TwiEngine::new(link);
        assert_eq!(
            engine.open(0x38, Direction::Write),
            Err(Error::ProtocolFault(BusStatus::ARBITRATION_LOST))
        );
    }

    #[test]
    fn failed_start_never_sends_address() {
        let link = ScriptedLink::new(&[Reply::Status(BusStatus(0x00))]);
        let mut engine = TwiEngine::new(link);
        assert_eq!(
            engine.open(0x38, Direction::Write),
            Err(Error::ProtocolFault(BusStatus(0x00)))
        );
        assert_eq!(engine.release().ops, [Op::Start]);
    }

    #[test]
    fn repeated_start_is_accepted() {
        let link = ScriptedLink::new(&[
            Reply::Status(BusStatus::REPEATED_START),
            Reply::Status(BusStatus::SLA_R_ACK),
        ]);
        let mut engine = TwiEngine::new(link);
        assert_eq!(engine.open(0x38, Direction::Read), Ok(()));
    }

    #[test]
    fn ten_bit_address_is_rejected() {
        let mut engine = TwiEngine::new(ScriptedLink::default());
        assert_eq!(engine.open(0x80, Direction::Write), Err(Error::InvalidInputData));
        assert!(engine.release().ops.is_empty());
    }

    #[test]
    fn write_aborts_on_first_nack() {
        let link = ScriptedLink::new(&[
            Reply::Status(BusStatus::START),
            Reply::Status(BusStatus::SLA_W_ACK),
            Reply::Status(BusStatus::DATA_TX_ACK),
            Reply::Status(BusStatus::DATA_TX_NACK),
        ]);
        let mut engine = TwiEngine::new(link);
        engine.open(0x38, Direction::Write).unwrap();
        assert_eq!(
            engine.write(&[0xAC, 0x33, 0x00]),
            Err(Error::ProtocolFault(BusStatus::DATA_TX_NACK))
        );
        assert_eq!(
            engine.release().ops,
            [Op::Start, Op::Write(0x70), Op::Write(0xAC), Op::Write(0x33)]
        );
    }

    #[test]
    fn read_acks_all_but_last_byte() {
        let mut replies = vec![
            Reply::Status(BusStatus::START),
            Reply::Status(BusStatus::SLA_R_ACK),
        ];
        for byte in 0..6 {
            replies.push(Reply::Byte(byte, BusStatus::DATA_RX_ACK));
        }
        replies.push(Reply::Byte(6, BusStatus::DATA_RX_NACK));
        let mut engine = TwiEngine::new(ScriptedLink::new(&replies));
        engine.open(0x38, Direction::Read).unwrap();
        let mut buf = [0u8; 7];
        engine.read(&mut buf).unwrap();
        engine.close();
        assert_eq!(buf, [0, 1, 2, 3, 4, 5, 6]);

        let ops = engine.release().ops;
        let reads: Vec<_> = ops.iter().filter(|op| matches!(op, Op::Read { .. })).collect();
        assert_eq!(reads.len(), 7);
        assert!(reads[..6].iter().all(|op| **op == Op::Read { ack: true }));
        assert_eq!(*reads[6], Op::Read { ack: false });
        assert_eq!(ops.last(), Some(&Op::Stop));
    }

    #[test]
    fn single_byte_read_is_nack_only() {
        let link = ScriptedLink::new(&[
            Reply::Status(BusStatus::START),
            Reply::Status(BusStatus::SLA_R_ACK),
            Reply::Byte(0x1C, BusStatus::DATA_RX_NACK),
        ]);
        let mut engine = TwiEngine::new(link);
        engine.open(0x38, Direction::Read).unwrap();
        let mut buf = [0u8; 1];
        engine.read(&mut buf).unwrap();
        assert_eq!(buf, [0x1C]);
        assert_eq!(engine.release().ops[2], Op::Read { ack: false });
    }

    #[test]
    fn write_in_read_transaction_is_refused() {
        let link = ScriptedLink::new(&[
            Reply::Status(BusStatus::START),
            Reply::Status(BusStatus::SLA_R_ACK),
        ]);
        let mut engine = TwiEngine::new(link);
        engine.open(0x38, Direction::Read).unwrap();
        assert_eq!(engine.write(&[0xAC]), Err(Error::InvalidInputData));
        engine.close();
        let mut buf = [0u8; 2];
        assert_eq!(engine.read(&mut buf), Err(Error::InvalidInputData));
    }

    #[test]
    fn timeout_propagates() {
        let link = ScriptedLink::new(&[Reply::Status(BusStatus::START), Reply::Timeout]);
        let mut engine = TwiEngine::new(link);
        assert_eq!(engine.open(0x38, Direction::Write), Err(Error::BusTimeout));
    }
}
