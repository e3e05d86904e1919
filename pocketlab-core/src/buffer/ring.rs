//! Page-counted circular sample buffer
//!
//! The producer (interrupt handler, DMA completion or sampler task) owns
//! `last` and increments `page` each time it wraps. The single foreground
//! consumer owns `first` and decrements `page` each time it wraps. With
//! `page` counting laps between the two cursors, `first == last` is
//! unambiguous: empty when `page == 0`, full when `page == 1`.

use core::sync::atomic::Ordering;

use pocketlab_hal::Producer;
use portable_atomic::{AtomicU16, AtomicU8, AtomicUsize};

/// Buffer capacity in bytes
pub const BUFFER_SIZE: usize = 2048;

/// Unread bytes allowed to approach capacity before overflow is reported
pub const BUFFER_MARGIN: usize = 16;

/// Drain passes after which a flush reports the hardware as settled
pub const FLUSH_PASSES: u8 = 8;

/// The instrument's sample buffer
pub type Buffer = SampleBuffer<BUFFER_SIZE>;

/// Single-producer single-consumer ring buffer
///
/// `N` must be a power of two. All methods take `&self` so one static
/// instance can be shared between the producer and the consumer; the
/// producer-side methods are the `push_*` family, everything else belongs
/// to the consumer. Each push moves `last` and `page` inside one critical
/// section, so the consumer never sees a wrapped cursor without its lap.
pub struct SampleBuffer<const N: usize> {
    data: [AtomicU8; N],
    first: AtomicUsize,
    last: AtomicUsize,
    page: AtomicU16,
    flush: AtomicU8,
    producer: AtomicU8,
}

impl<const N: usize> Default for SampleBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> SampleBuffer<N> {
    const MASK: usize = N - 1;
    const VALID: () = assert!(N.is_power_of_two() && N >= 4, "capacity must be a power of two");

    /// Create an empty buffer fed by the port snapshot producer
    pub const fn new() -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::VALID;
        Self {
            data: [const { AtomicU8::new(0) }; N],
            first: AtomicUsize::new(0),
            last: AtomicUsize::new(0),
            page: AtomicU16::new(0),
            flush: AtomicU8::new(0),
            producer: AtomicU8::new(Producer::PortSnapshot as u8),
        }
    }

    /// Capacity in bytes
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Reset both cursors and record the producer now feeding the buffer
    pub fn init(&self, producer: Producer) {
        critical_section::with(|_| {
            self.first.store(0, Ordering::Relaxed);
            self.last.store(0, Ordering::Relaxed);
            self.page.store(0, Ordering::Relaxed);
            self.flush.store(0, Ordering::Relaxed);
            self.producer.store(producer.as_u8(), Ordering::Relaxed);
        });
    }

    /// Producer feeding the buffer
    pub fn producer(&self) -> Producer {
        Producer::from_u8(self.producer.load(Ordering::Relaxed)).unwrap_or(Producer::PortSnapshot)
    }

    /// Bytes per element for the current producer
    pub fn element_width(&self) -> usize {
        self.producer().element_width()
    }

    // --- producer side ---

    /// Append one byte
    pub fn push_byte(&self, byte: u8) {
        critical_section::with(|_| self.write(byte));
    }

    /// Append one 16-bit sample, little endian
    pub fn push_sample(&self, sample: i16) {
        let [lo, hi] = sample.to_le_bytes();
        critical_section::with(|_| {
            self.write(lo);
            self.write(hi);
        });
    }

    /// Append a receiver record: status byte then data byte
    pub fn push_pair(&self, status: u8, data: u8) {
        critical_section::with(|_| {
            self.write(status);
            self.write(data);
        });
    }

    fn write(&self, byte: u8) {
        let last = self.last.load(Ordering::Relaxed);
        self.data[last].store(byte, Ordering::Relaxed);
        let next = (last + 1) & Self::MASK;
        self.last.store(next, Ordering::Release);
        if next == 0 {
            let page = self.page.load(Ordering::Relaxed);
            self.page.store(page.wrapping_add(1), Ordering::Relaxed);
        }
    }

    // --- consumer side ---

    /// Consistent view of the producer cursor and lap count
    fn snapshot(&self) -> (usize, usize) {
        critical_section::with(|_| {
            (
                self.last.load(Ordering::Acquire),
                self.page.load(Ordering::Relaxed) as usize,
            )
        })
    }

    /// Unread bytes
    pub fn unread(&self) -> usize {
        let (last, page) = self.snapshot();
        let first = self.first.load(Ordering::Relaxed);
        (page * N + last).wrapping_sub(first)
    }

    /// Whether no data is waiting
    pub fn is_empty(&self) -> bool {
        self.unread() == 0
    }

    /// Whether the consumer fell within the safety margin of being lapped
    pub fn is_overflowing(&self) -> bool {
        self.unread() > N - BUFFER_MARGIN
    }

    /// Pop one byte
    ///
    /// Only call after [`is_empty`](Self::is_empty) returned `false`.
    pub fn get_byte(&self) -> u8 {
        let first = self.first.load(Ordering::Relaxed);
        let byte = self.data[first].load(Ordering::Relaxed);
        self.advance(first, 1);
        byte
    }

    /// Pop one signed 16-bit sample
    ///
    /// Only call after [`is_empty`](Self::is_empty) returned `false`.
    pub fn get_sample(&self) -> i16 {
        let first = self.first.load(Ordering::Relaxed);
        let lo = self.data[first].load(Ordering::Relaxed);
        let hi = self.data[(first + 1) & Self::MASK].load(Ordering::Relaxed);
        self.advance(first, 2);
        i16::from_le_bytes([lo, hi])
    }

    /// Pop one unsigned 16-bit capture value
    pub fn get_word(&self) -> u16 {
        self.get_sample() as u16
    }

    fn advance(&self, first: usize, width: usize) {
        let next = (first + width) & Self::MASK;
        critical_section::with(|_| {
            self.first.store(next, Ordering::Relaxed);
            if next < first {
                let page = self.page.load(Ordering::Relaxed);
                if page > 0 {
                    self.page.store(page - 1, Ordering::Relaxed);
                }
            }
        });
    }

    /// Drop everything pending
    pub fn clear(&self) {
        critical_section::with(|_| {
            self.first
                .store(self.last.load(Ordering::Acquire), Ordering::Relaxed);
            self.page.store(0, Ordering::Relaxed);
        });
    }

    /// Recover from overflow, keeping the newest data
    ///
    /// The read cursor moves one element past the write cursor, which
    /// leaves `capacity - element_width` bytes readable: everything that
    /// was not overwritten by the element currently being produced.
    pub fn reduce(&self) {
        let width = self.element_width();
        critical_section::with(|_| {
            let last = self.last.load(Ordering::Acquire);
            let first = (last + width) & Self::MASK;
            self.first.store(first, Ordering::Relaxed);
            self.page
                .store(if first > last { 1 } else { 0 }, Ordering::Relaxed);
        });
    }

    /// Discard everything pending
    ///
    /// Returns `true` on every [`FLUSH_PASSES`]th call, once the
    /// producer has had time to settle after being rewired. Passes count
    /// calls, not drained elements, so a producer that has not delivered
    /// anything yet still settles after eight polls.
    pub fn flush(&self) -> bool {
        let width = self.element_width();
        while !self.is_empty() {
            let first = self.first.load(Ordering::Relaxed);
            self.advance(first, width);
        }
        let passes = self.flush.load(Ordering::Relaxed) + 1;
        if passes >= FLUSH_PASSES {
            self.flush.store(0, Ordering::Relaxed);
            true
        } else {
            self.flush.store(passes, Ordering::Relaxed);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    type Small = SampleBuffer<64>;
    const SMALL_MARGIN_LIMIT: usize = 64 - BUFFER_MARGIN;

    #[test]
    fn test_new_buffer_is_empty() {
        let buffer = Small::new();
        assert!(buffer.is_empty());
        assert_eq!(buffer.unread(), 0);
        assert!(!buffer.is_overflowing());
    }

    #[test]
    fn test_bytes_in_order() {
        let buffer = Small::new();
        for b in 0..10u8 {
            buffer.push_byte(b);
        }
        for b in 0..10u8 {
            assert!(!buffer.is_empty());
            assert_eq!(buffer.get_byte(), b);
        }
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_full_buffer_is_not_empty() {
        let buffer = Small::new();
        for b in 0..64u8 {
            buffer.push_byte(b);
        }
        // cursors coincide, the lap count disambiguates
        assert_eq!(buffer.unread(), 64);
        assert!(!buffer.is_empty());
        assert!(buffer.is_overflowing());
        assert_eq!(buffer.get_byte(), 0);
        assert_eq!(buffer.unread(), 63);
    }

    #[test]
    fn test_samples_across_wrap() {
        let buffer = Small::new();
        buffer.init(Producer::AdcResult);
        for s in 0..30i16 {
            buffer.push_sample(s * -100);
        }
        for s in 0..30i16 {
            assert_eq!(buffer.get_sample(), s * -100);
        }
        for s in 0..20i16 {
            buffer.push_sample(s);
        }
        assert_eq!(buffer.unread(), 40);
        for s in 0..20i16 {
            assert_eq!(buffer.get_sample(), s);
        }
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_pairs() {
        let buffer = Small::new();
        buffer.init(Producer::UartReceiver);
        buffer.push_pair(0x80, b'A');
        assert_eq!(buffer.unread(), 2);
        assert_eq!(buffer.get_byte(), 0x80);
        assert_eq!(buffer.get_byte(), b'A');
    }

    #[test]
    fn test_clear_drops_pending() {
        let buffer = Small::new();
        for b in 0..40u8 {
            buffer.push_byte(b);
        }
        buffer.clear();
        assert!(buffer.is_empty());
        buffer.push_byte(0xAA);
        assert_eq!(buffer.get_byte(), 0xAA);
    }

    #[test]
    fn test_reduce_keeps_newest() {
        let buffer = Small::new();
        for b in 0..100u8 {
            buffer.push_byte(b);
        }
        assert!(buffer.is_overflowing());
        buffer.reduce();
        assert_eq!(buffer.unread(), 63);
        // oldest surviving byte is the one written 63 bytes ago
        assert_eq!(buffer.get_byte(), 37);
        let mut last = 37;
        while !buffer.is_empty() {
            last = buffer.get_byte();
        }
        assert_eq!(last, 99);
    }

    #[test]
    fn test_reduce_at_end_of_buffer() {
        let buffer = Small::new();
        buffer.init(Producer::AdcResult);
        for s in 0..31i16 {
            buffer.push_sample(s);
        }
        buffer.reduce();
        assert_eq!(buffer.unread(), 62);
    }

    #[test]
    fn test_flush_reports_after_eight_passes() {
        let buffer = Small::new();
        for pass in 1..=FLUSH_PASSES {
            buffer.push_byte(pass);
            let settled = buffer.flush();
            assert!(buffer.is_empty());
            assert_eq!(settled, pass == FLUSH_PASSES);
        }
        // counter restarts
        assert!(!buffer.flush());
    }

    #[test]
    fn test_unread_bounded_while_producer_wraps() {
        let buffer = Small::new();
        buffer.init(Producer::AdcResult);
        for s in 0..20i16 {
            buffer.push_sample(s);
        }
        for _ in 0..10 {
            buffer.get_sample();
        }
        // 20 bytes unread; the next 12 samples carry the write cursor past the end
        for s in 20..32i16 {
            buffer.push_sample(s);
            assert!(buffer.unread() <= buffer.capacity());
            assert!(!buffer.is_overflowing());
        }
        assert_eq!(buffer.unread(), 44);
        assert_eq!(buffer.get_sample(), 10);
    }

    #[test]
    fn test_flush_settles_without_data() {
        let buffer = Small::new();
        let settled = (0..FLUSH_PASSES).map(|_| buffer.flush()).collect::<Vec<_>>();
        assert_eq!(settled.iter().filter(|&&s| s).count(), 1);
        assert_eq!(settled.last(), Some(&true));
    }

    #[test]
    fn test_init_resets() {
        let buffer = Small::new();
        for b in 0..70u8 {
            buffer.push_byte(b);
        }
        buffer.init(Producer::CaptureCount);
        assert!(buffer.is_empty());
        assert_eq!(buffer.producer(), Producer::CaptureCount);
        assert_eq!(buffer.element_width(), 2);
    }

    proptest! {
        #[test]
        fn prop_unread_is_produced_minus_consumed(
            steps in prop::collection::vec((0usize..40, 0usize..40), 1..60)
        ) {
            let buffer = Small::new();
            let mut produced = 0usize;
            let mut consumed = 0usize;
            for (push, pop) in steps {
                let push = push.min(64 - (produced - consumed));
                for _ in 0..push {
                    buffer.push_byte(produced as u8);
                    produced += 1;
                }
                let pop = pop.min(produced - consumed);
                for _ in 0..pop {
                    prop_assert_eq!(buffer.get_byte(), consumed as u8);
                    consumed += 1;
                }
                let unread = produced - consumed;
                prop_assert_eq!(buffer.unread(), unread);
                prop_assert_eq!(buffer.is_empty(), unread == 0);
                prop_assert_eq!(buffer.is_overflowing(), unread > SMALL_MARGIN_LIMIT);
            }
        }

        #[test]
        fn prop_boundaries_at_every_offset(offset in 0usize..64, fill in 0usize..=64) {
            let buffer = Small::new();
            for _ in 0..offset {
                buffer.push_byte(0);
            }
            buffer.clear();
            for _ in 0..fill {
                buffer.push_byte(1);
            }
            prop_assert_eq!(buffer.unread(), fill);
            prop_assert_eq!(buffer.is_empty(), fill == 0);
            prop_assert_eq!(buffer.is_overflowing(), fill > SMALL_MARGIN_LIMIT);
        }
    }
}
