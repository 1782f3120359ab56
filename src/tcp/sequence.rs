//! Sequence-number arithmetic.
//!
//! It is essential to remember that the actual sequence number space is
//! finite, though very large. This space ranges from 0 to 2**32 - 1.
//! Since the space is finite, all arithmetic dealing with sequence
//! numbers must be performed modulo 2**32. This unsigned arithmetic
//! preserves the relationship of sequence numbers as they cycle from
//! 2**32 - 1 to 0 again. (RFC 793, Section 3.3)
//!
//! Internally the stack works with 64-bit absolute indices, which never
//! wrap in practice; [`Wrap32`] converts between the two domains.

const CYCLE: u64 = 1 << 32;

/// A 32-bit sequence number, relative to an arbitrary zero point (the
/// initial sequence number).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Wrap32(u32);

impl Wrap32 {
    pub fn new(raw: u32) -> Self {
        Wrap32(raw)
    }

    pub fn raw(self) -> u32 {
        self.0
    }

    /// Map an absolute 64-bit index onto the 32-bit space:
    /// `zero_point + n mod 2**32`.
    pub fn wrap(n: u64, zero_point: Wrap32) -> Wrap32 {
        Wrap32(zero_point.0.wrapping_add(n as u32))
    }

    /// Invert [`Wrap32::wrap`]: of the 64-bit values that wrap to this
    /// sequence number, return the one closest to `checkpoint`. When
    /// two candidates are equidistant, the smaller wins.
    ///
    /// RFC 1323: TCP determines if a data segment is "old" or "new" by
    /// testing whether its sequence number is within 2**31 bytes of the
    /// left edge of the window. Unwrapping against a checkpoint near
    /// the value being recovered is the 64-bit restatement of that
    /// rule: as long as `|checkpoint - n| < 2**31`, the round trip
    /// through `wrap` returns exactly `n`.
    ///
    /// Candidates are generated with checked u64 arithmetic only, so a
    /// checkpoint near `u64::MAX` cannot wrap a candidate around to the
    /// bottom of the space.
    pub fn unwrap(self, zero_point: Wrap32, checkpoint: u64) -> u64 {
        let offset = u64::from(self.0.wrapping_sub(zero_point.0));
        let base = checkpoint & !(CYCLE - 1);

        let mid = base + offset;
        let below = base.checked_sub(CYCLE).map(|b| b + offset);
        let above = mid.checked_add(CYCLE);

        // Scan in increasing order and replace only on a strict
        // improvement, so an equidistant pair resolves to the smaller
        // candidate.
        let mut best = 0;
        let mut best_dist = u64::MAX;
        for candidate in [below, Some(mid), above].into_iter().flatten() {
            let dist = candidate.abs_diff(checkpoint);
            if dist < best_dist {
                best = candidate;
                best_dist = dist;
            }
        }
        best
    }
}
