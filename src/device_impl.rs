use crate::filter::SlidingWindow;
use crate::hw_def::*;
use crate::link::BusLink;
use crate::transaction::TwiEngine;
use crate::types::*;

#[cfg(feature = "crc")]
use crc::{CRC_8_NRSC_5, Crc};
use embedded_hal::delay::DelayNs;

#[cfg(feature = "crc")]
pub(crate) const CRC: crc::Crc<u8> = Crc::<u8>::new(&CRC_8_NRSC_5);

impl<L, Delay> Aht20<L, Delay>
where
    L: BusLink,
    Delay: DelayNs,
{
    /// Create a new AHT20 driver with default options
    pub fn new(link: L, delay: Delay) -> Self {
        Self::with_config(link, delay, Config::default())
    }

    /// Create a new AHT20 driver; programs the bus clock
    pub fn with_config(mut link: L, delay: Delay, config: Config) -> Self {
        link.configure(config.bus_speed);
        Self {
            engine: TwiEngine::new(link),
            delay,
            config,
            state: CycleState::Idle,
        }
    }

    /// Where the last cycle ended (or where the current one is)
    pub fn state(&self) -> CycleState {
        self.state
    }

    /// Options in effect
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Give back the link and the delay
    pub fn release(self) -> (L, Delay) {
        (self.engine.release(), self.delay)
    }

    fn enter(&mut self, state: CycleState) {
        trace!("aht20: {:?} -> {:?}", self.state, state);
        self.state = state;
    }

    // One addressed transaction. The bus is released with STOP whatever the outcome, so the next
    // transaction always begins with a fresh START.
    fn transact<T>(
        &mut self,
        direction: Direction,
        body: impl FnOnce(&mut TwiEngine<L>) -> Result<T, Error>,
    ) -> Result<T, Error> {
        let result = self
            .engine
            .open(AHT20_ADDRESS, direction)
            .and_then(|()| body(&mut self.engine));
        self.engine.close();
        result
    }

    fn trigger(&mut self) -> Result<(), Error> {
        self.enter(CycleState::Triggering);
        self.transact(Direction::Write, |engine| engine.write(&TRIGGER_MEASUREMENT))
    }

    fn settle(&mut self) {
        self.enter(CycleState::Settling);
        self.delay.delay_ms(SETTLING_DELAY_MS);
    }

    fn fetch(&mut self) -> Result<RawFrame, Error> {
        self.enter(CycleState::Reading);
        let mut buf = [0u8; FRAME_LEN];
        self.transact(Direction::Read, |engine| engine.read(&mut buf))?;
        Ok(RawFrame(buf))
    }

    fn decode(&mut self, frame: &RawFrame) -> Result<MeasurementSample, Error> {
        self.enter(CycleState::Decoding);
        // a busy sensor may not have refreshed the CRC either
        if frame.status().is_busy() {
            return Err(Error::SensorBusy);
        }
        match self.config.checksum {
            ChecksumPolicy::Ignore => {
                trace!("aht20: checksum {} left unverified", frame.checksum());
            }
            #[cfg(feature = "crc")]
            ChecksumPolicy::Verify => {
                let crc_expect = frame.expected_checksum();
                if frame.checksum() != crc_expect {
                    warn!("aht20: crc mismatch: frame={}, crc_expect={}", frame, crc_expect);
                    return Err(Error::CrcMismatch);
                }
            }
        }
        frame.decode()
    }

    /// Trigger a measurement, wait for the conversion and read back the undecoded frame
    pub fn read_raw(&mut self) -> Result<RawFrame, Error> {
        let frame = self.trigger().and_then(|()| {
            self.settle();
            self.fetch()
        });
        match frame {
            Ok(frame) => {
                debug!("aht20: frame {}", frame);
                Ok(frame)
            }
            Err(err) => {
                self.enter(CycleState::Invalid);
                Err(err)
            }
        }
    }

    fn cycle(&mut self) -> Result<MeasurementSample, Error> {
        let result = self.read_raw().and_then(|frame| self.decode(&frame));
        self.enter(match result {
            Ok(_) => CycleState::Ready,
            Err(_) => CycleState::Invalid,
        });
        result
    }

    /// Run a full trigger/settle/read/decode cycle
    ///
    /// A frame still flagged busy is retried from the trigger up to `Config::busy_retries` more
    /// times. Bus errors are returned right away.
    pub fn measure(&mut self) -> Result<MeasurementSample, Error> {
        let mut retries_left = self.config.busy_retries;
        loop {
            match self.cycle() {
                Err(Error::SensorBusy) if retries_left > 0 => {
                    retries_left -= 1;
                    debug!("aht20: sensor busy, {} retries left", retries_left);
                }
                Err(err) => {
                    warn!("aht20: acquisition failed: {:?}", err);
                    return Err(err);
                }
                ok => return ok,
            }
        }
    }

    /// Measure once, feed the sample to `window` and return the updated average
    pub fn acquire(&mut self, window: &mut SlidingWindow) -> Result<MeasurementSample, Error> {
        let sample = self.measure()?;
        window.push(sample);
        Ok(window.average().unwrap_or(sample))
    }
}
