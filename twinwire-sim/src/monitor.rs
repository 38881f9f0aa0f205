//! Passive bus monitor
//!
//! Records what an analyzer clipped onto the two lines would see and
//! decodes it into bytes.

use twinwire_core::line::Level;

use crate::bus::BusLines;

/// One observation on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WireEvent {
    Start,
    Stop,
    /// Data line level at a clock rising edge
    Bit(Level),
}

/// Decoded bus activity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Frame {
    Start,
    /// Eight bits plus the acknowledge bit that followed
    Byte { value: u8, acked: bool },
    Stop,
}

/// Bus analyzer
#[derive(Debug, Clone, Default)]
pub struct BusMonitor {
    prev: Option<BusLines>,
    events: Vec<WireEvent>,
    /// Bits since the last start or stop
    bits: u32,
    violations: u32,
}

impl BusMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look at the lines for one tick
    pub fn observe(&mut self, lines: BusLines) {
        let Some(prev) = self.prev.replace(lines) else {
            return;
        };

        // Data must never move on the same tick as the clock
        if prev.scl != lines.scl && prev.sda != lines.sda {
            self.violations += 1;
        }

        if lines.is_start(&prev) || lines.is_stop(&prev) {
            // The clock pulse carrying a condition is not a data bit
            match self.bits % 9 {
                0 => {}
                1 => {
                    self.events.pop();
                }
                _ => self.violations += 1,
            }
            self.bits = 0;
            self.events.push(if lines.sda.is_low() {
                WireEvent::Start
            } else {
                WireEvent::Stop
            });
        } else if lines.scl_rose(&prev) {
            self.bits += 1;
            self.events.push(WireEvent::Bit(lines.sda));
        }
    }

    pub fn events(&self) -> &[WireEvent] {
        &self.events
    }

    /// Timing violations seen so far
    pub fn violations(&self) -> u32 {
        self.violations
    }

    pub fn clear(&mut self) {
        self.events.clear();
        self.bits = 0;
    }

    /// Group recorded events into conditions and acknowledged bytes
    ///
    /// Bits not completing a byte before the next condition are dropped.
    pub fn frames(&self) -> Vec<Frame> {
        let mut frames = Vec::new();
        let mut value = 0u8;
        let mut bits = 0u8;

        for event in &self.events {
            match event {
                WireEvent::Start | WireEvent::Stop => {
                    frames.push(if *event == WireEvent::Start {
                        Frame::Start
                    } else {
                        Frame::Stop
                    });
                    value = 0;
                    bits = 0;
                }
                WireEvent::Bit(level) if bits < 8 => {
                    value = (value << 1) | level.bit();
                    bits += 1;
                }
                WireEvent::Bit(level) => {
                    frames.push(Frame::Byte {
                        value,
                        acked: level.is_low(),
                    });
                    value = 0;
                    bits = 0;
                }
            }
        }

        frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(scl: Level, sda: Level) -> BusLines {
        BusLines { scl, sda }
    }

    /// Clock a bit: data set with the clock low, then one high tick
    fn bit(monitor: &mut BusMonitor, sda: Level) {
        monitor.observe(lines(Level::Low, sda));
        monitor.observe(lines(Level::High, sda));
        monitor.observe(lines(Level::Low, sda));
    }

    fn byte(monitor: &mut BusMonitor, value: u8, ack: bool) {
        for i in (0..8).rev() {
            let level = if value & (1 << i) != 0 { Level::High } else { Level::Low };
            bit(monitor, level);
        }
        bit(monitor, if ack { Level::Low } else { Level::High });
    }

    #[test]
    fn test_decodes_transaction() {
        let mut monitor = BusMonitor::new();
        monitor.observe(BusLines::IDLE);
        monitor.observe(lines(Level::High, Level::Low));
        monitor.observe(lines(Level::Low, Level::Low));
        byte(&mut monitor, 0xD0, true);
        byte(&mut monitor, 0x75, false);
        monitor.observe(lines(Level::Low, Level::Low));
        monitor.observe(lines(Level::High, Level::Low));
        monitor.observe(BusLines::IDLE);

        assert_eq!(
            monitor.frames(),
            vec![
                Frame::Start,
                Frame::Byte {
                    value: 0xD0,
                    acked: true
                },
                Frame::Byte {
                    value: 0x75,
                    acked: false
                },
                Frame::Stop,
            ]
        );
        assert_eq!(monitor.violations(), 0);
        assert_eq!(monitor.events().len(), 2 + 18);
    }

    #[test]
    fn test_violations() {
        let mut monitor = BusMonitor::new();
        monitor.observe(lines(Level::Low, Level::Low));
        // Clock and data change together
        monitor.observe(lines(Level::High, Level::High));
        assert_eq!(monitor.violations(), 1);

        // Stop after two clock pulses lands mid-byte
        monitor.observe(lines(Level::Low, Level::High));
        monitor.observe(lines(Level::Low, Level::Low));
        monitor.observe(lines(Level::High, Level::Low));
        monitor.observe(lines(Level::High, Level::High));
        assert_eq!(monitor.violations(), 2);
        assert_eq!(monitor.events().last(), Some(&WireEvent::Stop));

        monitor.clear();
        assert!(monitor.events().is_empty());
    }
}
