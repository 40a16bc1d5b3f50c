// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Ring buffer for tracing drivers
//!
//! This contains an implementation for a static ring buffer designed to be
//! used to instrument arbitrary contexts, including ones that cannot block
//! or allocate: the PRM and VP drivers record every notable event (register
//! sequence started, poll timed out, recovery fired) as a small `Copy` enum
//! in a per-module ring.
//!
//! ## Constraints
//!
//! The type in the ring buffer must implement both `Copy` and `PartialEq`.
//!
//! If you use the variants of the `ringbuf!` macro that leave the name of the
//! data structure implicit, you can only have one per module. (You can lift
//! this constraint by providing a name.)
//!
//! ## Creating a ring buffer
//!
//! ```ignore
//! ringbuf!(Trace, 16, Trace::None);
//!
//! ringbuf_entry!(Trace::IdleTimeout { vp_id });
//! ```
//!
//! Named ring buffers work the same way:
//!
//! ```ignore
//! ringbuf!(RESET_RINGBUF, Trace, 16, Trace::None);
//!
//! ringbuf_entry!(RESET_RINGBUF, Trace::Deassert(shift));
//! ```
//!
//! ## Repeated entries
//!
//! When an entry is recorded from the same line with a payload identical to
//! the most recent entry, the `count` of that entry is bumped rather than
//! consuming a new slot. A storm of identical errors therefore costs one
//! slot, and the count tells you how big the storm was.
//!
//! ## Locking
//!
//! Each ring is guarded by a spin lock that is only ever held for the
//! duration of a single insertion or inspection. Nothing that records an
//! entry can re-enter the ring while holding it.

#![cfg_attr(target_os = "none", no_std)]

/// Re-exported so that code generated by the macros is guaranteed to be able
/// to find it.
pub use spin;

/// Declares a ringbuffer in the current module or context.
///
/// `ringbuf!(NAME, Type, N, expr)` makes a ringbuffer named `NAME`,
/// containing entries of type `Type`, with room for `N` such entries, all of
/// which are initialized to `expr`.
///
/// The resulting ringbuffer will be static, so `NAME` should be uppercase and
/// should end in `RINGBUF`.
///
/// To support the common case of having one quickly-installed ringbuffer per
/// module, if you omit the name, it will default to `__RINGBUF`.
#[cfg(not(feature = "disabled"))]
#[macro_export]
macro_rules! ringbuf {
    ($name:ident, $t:ty, $n:expr, $init:expr) => {
        #[used]
        static $name: $crate::StaticRingbuf<$t, $n> =
            $crate::StaticRingbuf::new($init);
    };
    ($t:ty, $n:expr, $init:expr) => {
        $crate::ringbuf!(__RINGBUF, $t, $n, $init);
    };
}

#[cfg(feature = "disabled")]
#[macro_export]
macro_rules! ringbuf {
    ($name:ident, $t:ty, $n:expr, $init:expr) => {
        #[allow(dead_code)]
        const _: $t = $init;
    };
    ($t:ty, $n:expr, $init:expr) => {
        #[allow(dead_code)]
        const _: $t = $init;
    };
}

/// Inserts data into a named ringbuffer (which should have been declared with
/// the `ringbuf!` macro).
///
/// `ringbuf_entry!(NAME, expr)` will insert `expr` into the ringbuffer called
/// `NAME`.
///
/// If you declared your ringbuffer without a name, you can also use this
/// without a name, and it will default to `__RINGBUF`.
#[cfg(not(feature = "disabled"))]
#[macro_export]
macro_rules! ringbuf_entry {
    ($buf:expr, $payload:expr) => {{
        // Evaluate both buf and payload, without letting them access each
        // other, by evaluating them in a tuple where each cannot
        // accidentally use the other's binding.
        let (p, buf) = ($payload, &$buf);
        $crate::StaticRingbuf::entry(buf, line!() as u16, p);
    }};
    ($payload:expr) => {
        $crate::ringbuf_entry!(__RINGBUF, $payload);
    };
}

#[cfg(feature = "disabled")]
#[macro_export]
macro_rules! ringbuf_entry {
    ($buf:expr, $payload:expr) => {{
        let _ = &$payload;
    }};
    ($payload:expr) => {{
        let _ = &$payload;
    }};
}

///
/// The structure of a single [`Ringbuf`] entry, carrying a payload of arbitrary
/// type.  When a ring buffer entry is generated with an identical payload to
/// the most recent entry (in terms of both `line` and `payload`), `count` will
/// be incremented rather than generating a new entry.
///
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct RingbufEntry<T: Copy + PartialEq> {
    pub line: u16,
    pub generation: u16,
    pub count: u32,
    pub payload: T,
}

///
/// A ring buffer of parametrized type and size.  In practice, instantiating
/// this directly is strange -- see the [`ringbuf!`] macro.
///
#[derive(Debug)]
pub struct Ringbuf<T: Copy + PartialEq, const N: usize> {
    pub last: Option<usize>,
    pub buffer: [RingbufEntry<T>; N],
}

impl<T: Copy + PartialEq, const N: usize> Ringbuf<T, N> {
    pub const fn new(init: T) -> Self {
        Self {
            last: None,
            buffer: [RingbufEntry {
                line: 0,
                generation: 0,
                count: 0,
                payload: init,
            }; N],
        }
    }

    pub fn entry(&mut self, line: u16, payload: T) {
        // If this is the first time this ringbuf has been poked, last will be
        // None. In this specific case we want to make sure we don't add to the
        // count of an existing entry, and also that we deposit the first entry
        // in slot 0. Treating None as an out-of-range value does both.
        let last = self.last.unwrap_or(usize::MAX);

        // Check to see if we can reuse the most recent entry. get_mut skips
        // the check on the first insertion, and also copes with last being
        // out of range by starting over at 0 below.
        if let Some(ent) = self.buffer.get_mut(last) {
            if ent.line == line && ent.payload == payload {
                // Only reuse this entry if we don't overflow the
                // count.
                if let Some(new_count) = ent.count.checked_add(1) {
                    ent.count = new_count;
                    return;
                }
            }
        }

        // No remainder operation here: most of our targets have no hardware
        // divide, and this form turns usize::MAX into 0 for the first entry.
        let ndx = {
            let last_plus_1 = last.wrapping_add(1);
            if last_plus_1 >= self.buffer.len() {
                0
            } else {
                last_plus_1
            }
        };

        let ent = &mut self.buffer[ndx];
        *ent = RingbufEntry {
            line,
            payload,
            count: 1,
            generation: ent.generation.wrapping_add(1),
        };

        self.last = Some(ndx);
    }

    /// Returns the most recently recorded entry, if any.
    pub fn last_entry(&self) -> Option<&RingbufEntry<T>> {
        self.last.and_then(|i| self.buffer.get(i))
    }

    /// Iterates over recorded entries, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &RingbufEntry<T>> + '_ {
        let start = match self.last {
            Some(last) => last + 1,
            None => N,
        };
        self.buffer[start.min(N)..]
            .iter()
            .chain(self.buffer[..start.min(N)].iter())
            .filter(|e| e.count != 0)
    }
}

/// A [`Ringbuf`] behind a lock, suitable for placing in a `static`.
pub struct StaticRingbuf<T: Copy + PartialEq, const N: usize> {
    inner: spin::Mutex<Ringbuf<T, N>>,
}

impl<T: Copy + PartialEq, const N: usize> StaticRingbuf<T, N> {
    pub const fn new(init: T) -> Self {
        Self {
            inner: spin::Mutex::new(Ringbuf::new(init)),
        }
    }

    pub fn entry(&self, line: u16, payload: T) {
        self.inner.lock().entry(line, payload);
    }

    /// Runs `f` with the ring locked. Keep `f` short: anything recording into
    /// this same ring from inside `f` will spin forever.
    pub fn inspect<R>(&self, f: impl FnOnce(&Ringbuf<T, N>) -> R) -> R {
        f(&self.inner.lock())
    }

    /// Sums the repeat counts of all live entries whose payload satisfies
    /// `pred`.
    pub fn count_matching(&self, pred: impl Fn(&T) -> bool) -> u32 {
        self.inspect(|rb| {
            rb.iter()
                .filter(|e| pred(&e.payload))
                .map(|e| e.count)
                .sum()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Copy, Clone, Debug, PartialEq)]
    enum Trace {
        None,
        Poll(u32),
        Timeout,
    }

    #[test]
    fn first_entry_lands_in_slot_zero() {
        let mut rb = Ringbuf::<Trace, 4>::new(Trace::None);
        rb.entry(10, Trace::Poll(1));
        assert_eq!(rb.last, Some(0));
        assert_eq!(rb.buffer[0].payload, Trace::Poll(1));
        assert_eq!(rb.buffer[0].count, 1);
        assert_eq!(rb.buffer[0].generation, 1);
    }

    #[test]
    fn repeats_are_coalesced() {
        let mut rb = Ringbuf::<Trace, 4>::new(Trace::None);
        for _ in 0..5 {
            rb.entry(10, Trace::Timeout);
        }
        // Same payload from a different line is a new entry.
        rb.entry(11, Trace::Timeout);
        let entries: Vec<_> = rb.iter().copied().collect();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].count, 5);
        assert_eq!(entries[1].count, 1);
        assert_eq!(entries[1].line, 11);
    }

    #[test]
    fn wraps_and_iterates_oldest_first() {
        let mut rb = Ringbuf::<Trace, 3>::new(Trace::None);
        for i in 0..5 {
            rb.entry(1, Trace::Poll(i));
        }
        let payloads: Vec<_> = rb.iter().map(|e| e.payload).collect();
        assert_eq!(
            payloads,
            [Trace::Poll(2), Trace::Poll(3), Trace::Poll(4)]
        );
        assert_eq!(rb.last_entry().unwrap().payload, Trace::Poll(4));
        // Slot 0 has been written twice.
        assert_eq!(rb.buffer[0].generation, 2);
    }

    #[test]
    fn empty_ring_iterates_nothing() {
        let rb = Ringbuf::<Trace, 3>::new(Trace::None);
        assert!(rb.iter().next().is_none());
        assert!(rb.last_entry().is_none());
    }

    ringbuf!(TEST_RINGBUF, Trace, 8, Trace::None);

    #[test]
    fn macros_record_into_static() {
        ringbuf_entry!(TEST_RINGBUF, Trace::Poll(77));
        ringbuf_entry!(TEST_RINGBUF, Trace::Poll(77));
        assert_eq!(
            TEST_RINGBUF.count_matching(|t| *t == Trace::Poll(77)),
            2
        );
    }
}
