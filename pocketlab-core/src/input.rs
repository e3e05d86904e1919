//! Keypad events
//!
//! Four buttons, scanned every [`SCAN_PERIOD_MS`]. Single buttons produce
//! down and up events; holding any combination unchanged for
//! [`LONG_PRESS_MS`] produces one long press for the whole combination.

/// Keypad scan interval
pub const SCAN_PERIOD_MS: u64 = 8;

/// Hold time before a long press fires
pub const LONG_PRESS_MS: u64 = 1000;

/// Consecutive scans a button must differ before its state flips
pub const DEBOUNCE_SCANS: u8 = 4;

const LONG_PRESS_SCANS: u16 = (LONG_PRESS_MS / SCAN_PERIOD_MS) as u16;

const BUTTONS: [Key; 4] = [Key::K1, Key::K2, Key::K3, Key::K4];

/// A button or button combination
///
/// The discriminant is the bitmask of pressed buttons, button 1 in bit 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Key {
    K1 = 0b0001,
    K2 = 0b0010,
    K3 = 0b0100,
    K4 = 0b1000,
    K12 = 0b0011,
    K23 = 0b0110,
    K34 = 0b1100,
    K14 = 0b1001,
    K13 = 0b0101,
    K24 = 0b1010,
    K123 = 0b0111,
    K124 = 0b1011,
    K134 = 0b1101,
    K234 = 0b1110,
    K1234 = 0b1111,
}

impl Key {
    /// Key for a mask of pressed buttons
    pub const fn from_mask(mask: u8) -> Option<Self> {
        Some(match mask & 0x0F {
            0b0001 => Key::K1,
            0b0010 => Key::K2,
            0b0100 => Key::K3,
            0b1000 => Key::K4,
            0b0011 => Key::K12,
            0b0110 => Key::K23,
            0b1100 => Key::K34,
            0b1001 => Key::K14,
            0b0101 => Key::K13,
            0b1010 => Key::K24,
            0b0111 => Key::K123,
            0b1011 => Key::K124,
            0b1101 => Key::K134,
            0b1110 => Key::K234,
            0b1111 => Key::K1234,
            _ => return None,
        })
    }

    pub const fn mask(self) -> u8 {
        self as u8
    }
}

/// Keypad event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum KeyEvent {
    Down(Key),
    Up(Key),
    LongPress(Key),
}

/// Events produced by one scan
pub type ScanEvents = heapless::Vec<KeyEvent, 9>;

/// Debouncing keypad scanner
///
/// Fed the raw button mask once per [`SCAN_PERIOD_MS`]. After a long
/// press every event is swallowed until all buttons are released, so the
/// release that ends a long press never reaches the newly selected mode.
#[derive(Debug, Clone, Default)]
pub struct KeypadScanner {
    state: u8,
    counts: [u8; 4],
    raw: u8,
    held: u16,
    flush: bool,
}

impl KeypadScanner {
    pub const fn new() -> Self {
        Self {
            state: 0,
            counts: [0; 4],
            raw: 0,
            held: 0,
            flush: false,
        }
    }

    /// Debounced button mask
    pub fn state(&self) -> u8 {
        self.state
    }

    pub fn scan(&mut self, raw: u8) -> ScanEvents {
        let raw = raw & 0x0F;
        let mut events = ScanEvents::new();

        let mut changed = 0u8;
        for (index, count) in self.counts.iter_mut().enumerate() {
            let bit = 1 << index;
            if (raw ^ self.state) & bit == 0 {
                *count = 0;
                continue;
            }
            *count += 1;
            if *count >= DEBOUNCE_SCANS {
                *count = 0;
                changed |= bit;
            }
        }
        self.state ^= changed;

        if raw != self.raw {
            self.raw = raw;
            self.held = 0;
        } else if raw != 0 && self.held < LONG_PRESS_SCANS {
            self.held += 1;
            if self.held == LONG_PRESS_SCANS {
                if let Some(key) = Key::from_mask(raw) {
                    let _ = events.push(KeyEvent::LongPress(key));
                    self.flush = true;
                }
            }
        }

        if self.flush {
            if self.state == 0 && raw == 0 {
                self.flush = false;
            }
            return events;
        }

        for key in BUTTONS {
            if changed & self.state & key.mask() != 0 {
                let _ = events.push(KeyEvent::Down(key));
            }
        }
        for key in BUTTONS {
            if changed & !self.state & key.mask() != 0 {
                let _ = events.push(KeyEvent::Up(key));
            }
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan_n(scanner: &mut KeypadScanner, raw: u8, scans: usize) -> Vec<KeyEvent> {
        let mut events = Vec::new();
        for _ in 0..scans {
            events.extend(scanner.scan(raw));
        }
        events
    }

    #[test]
    fn test_key_masks_round_trip() {
        for mask in 1..16u8 {
            let key = Key::from_mask(mask).unwrap();
            assert_eq!(key.mask(), mask);
        }
        assert_eq!(Key::from_mask(0), None);
    }

    #[test]
    fn test_debounced_press_and_release() {
        let mut scanner = KeypadScanner::new();
        assert!(scan_n(&mut scanner, 0b0010, 3).is_empty());
        assert_eq!(scan_n(&mut scanner, 0b0010, 1), vec![KeyEvent::Down(Key::K2)]);
        assert_eq!(scan_n(&mut scanner, 0, 4), vec![KeyEvent::Up(Key::K2)]);
    }

    #[test]
    fn test_bounce_is_ignored() {
        let mut scanner = KeypadScanner::new();
        for _ in 0..10 {
            scan_n(&mut scanner, 0b0100, 2);
            scan_n(&mut scanner, 0, 1);
        }
        assert_eq!(scanner.state(), 0);
    }

    #[test]
    fn test_long_press_combination_swallows_release() {
        let mut scanner = KeypadScanner::new();
        let events = scan_n(&mut scanner, 0b0101, LONG_PRESS_SCANS as usize + 1);
        assert!(events.contains(&KeyEvent::LongPress(Key::K13)));
        assert!(events.contains(&KeyEvent::Down(Key::K1)));
        assert!(events.contains(&KeyEvent::Down(Key::K3)));

        let events = scan_n(&mut scanner, 0, 10);
        assert!(events.is_empty());

        // back to normal once released
        assert_eq!(scan_n(&mut scanner, 0b1000, 4), vec![KeyEvent::Down(Key::K4)]);
    }

    #[test]
    fn test_long_press_fires_once() {
        let mut scanner = KeypadScanner::new();
        let events = scan_n(&mut scanner, 0b0001, 3 * LONG_PRESS_SCANS as usize);
        let long = events
            .iter()
            .filter(|e| matches!(e, KeyEvent::LongPress(_)))
            .count();
        assert_eq!(long, 1);
    }
}
