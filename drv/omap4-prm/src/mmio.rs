// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Raw 32-bit register access.

/// A 32-bit register bus.
///
/// Addresses are byte addresses and are expected to be word aligned.
pub trait Mmio {
    fn read32(&self, addr: usize) -> u32;
    fn write32(&self, addr: usize, value: u32);
}

/// Real hardware: volatile loads and stores to physical addresses.
#[derive(Debug)]
pub struct VolatileMmio(());

impl VolatileMmio {
    /// # Safety
    ///
    /// Every address later passed to `read32`/`write32` must be a mapped,
    /// word-aligned device register, and nothing else may be relying on the
    /// contents of those registers staying put.
    pub const unsafe fn new() -> Self {
        Self(())
    }
}

impl Mmio for VolatileMmio {
    fn read32(&self, addr: usize) -> u32 {
        // Safety: the contract of `VolatileMmio::new` covers this.
        unsafe { core::ptr::read_volatile(addr as *const u32) }
    }

    fn write32(&self, addr: usize, value: u32) {
        // Safety: the contract of `VolatileMmio::new` covers this.
        unsafe { core::ptr::write_volatile(addr as *mut u32, value) }
    }
}

#[cfg(not(target_os = "none"))]
pub mod sim {
    //! A register file for exercising the driver on a host.
    //!
    //! Besides storing values, `SimMmio` can make registers write-1-to-clear
    //! and can make bits change some number of reads after a given write,
    //! which is enough to fake the PRM's status handshakes.

    use super::Mmio;
    use std::cell::RefCell;
    use std::collections::{BTreeMap, BTreeSet};

    /// A change to make to a register.
    #[derive(Copy, Clone, Debug, Eq, PartialEq)]
    pub struct Reaction {
        pub addr: usize,
        pub bits: u32,
        /// Set `bits` if true, clear them if false.
        pub set: bool,
        /// Reads of `addr` that still see the old value once this is armed.
        pub after_reads: u32,
    }

    #[derive(Copy, Clone, Debug)]
    struct Trigger {
        addr: usize,
        mask: u32,
        value: u32,
        reaction: Reaction,
    }

    #[derive(Copy, Clone, Debug)]
    struct Pending {
        reaction: Reaction,
        reads_left: u32,
    }

    #[derive(Default)]
    struct State {
        regs: BTreeMap<usize, u32>,
        w1c: BTreeSet<usize>,
        reads: BTreeMap<usize, u32>,
        writes: Vec<(usize, u32)>,
        triggers: Vec<Trigger>,
        pending: Vec<Pending>,
    }

    impl State {
        fn peek(&self, addr: usize) -> u32 {
            self.regs.get(&addr).copied().unwrap_or(0)
        }

        fn apply(&mut self, r: Reaction) {
            let v = self.peek(r.addr);
            let v = if r.set { v | r.bits } else { v & !r.bits };
            self.regs.insert(r.addr, v);
        }

        fn arm(&mut self, r: Reaction) {
            if r.after_reads == 0 {
                self.apply(r);
            } else {
                self.pending.push(Pending {
                    reaction: r,
                    reads_left: r.after_reads,
                });
            }
        }

        fn fire_due(&mut self, addr: usize) {
            let mut due = vec![];
            self.pending.retain_mut(|p| {
                if p.reaction.addr != addr {
                    true
                } else if p.reads_left == 0 {
                    due.push(p.reaction);
                    false
                } else {
                    p.reads_left -= 1;
                    true
                }
            });
            for r in due {
                self.apply(r);
            }
        }
    }

    #[derive(Default)]
    pub struct SimMmio {
        state: RefCell<State>,
    }

    impl SimMmio {
        pub fn new() -> Self {
            Self::default()
        }

        /// Sets a register without logging a write or firing triggers.
        pub fn poke(&self, addr: usize, value: u32) {
            self.state.borrow_mut().regs.insert(addr, value);
        }

        /// Reads a register without counting the read.
        pub fn peek(&self, addr: usize) -> u32 {
            self.state.borrow().peek(addr)
        }

        /// Makes writes to `addr` clear the bits written as 1.
        pub fn set_w1c(&self, addr: usize) {
            self.state.borrow_mut().w1c.insert(addr);
        }

        /// Arms `reaction` every time `addr` is written with a value whose
        /// bits under `mask` equal `value`.
        pub fn on_write(
            &self,
            addr: usize,
            mask: u32,
            value: u32,
            reaction: Reaction,
        ) {
            self.state.borrow_mut().triggers.push(Trigger {
                addr,
                mask,
                value,
                reaction,
            });
        }

        pub fn reads(&self, addr: usize) -> u32 {
            self.state.borrow().reads.get(&addr).copied().unwrap_or(0)
        }

        /// Every write so far, oldest first.
        pub fn writes(&self) -> Vec<(usize, u32)> {
            self.state.borrow().writes.clone()
        }

        pub fn clear_log(&self) {
            let mut s = self.state.borrow_mut();
            s.writes.clear();
            s.reads.clear();
        }
    }

    impl Mmio for SimMmio {
        fn read32(&self, addr: usize) -> u32 {
            let mut s = self.state.borrow_mut();
            *s.reads.entry(addr).or_default() += 1;
            s.fire_due(addr);
            s.peek(addr)
        }

        fn write32(&self, addr: usize, value: u32) {
            let mut s = self.state.borrow_mut();
            s.writes.push((addr, value));

            let stored = if s.w1c.contains(&addr) {
                s.peek(addr) & !value
            } else {
                value
            };
            s.regs.insert(addr, stored);

            let armed: Vec<_> = s
                .triggers
                .iter()
                .filter(|t| t.addr == addr && value & t.mask == t.value)
                .map(|t| t.reaction)
                .collect();
            for r in armed {
                s.arm(r);
            }
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn w1c_clears_only_written_ones() {
            let m = SimMmio::new();
            m.set_w1c(0x10);
            m.poke(0x10, 0b1011);
            m.write32(0x10, 0b0010);
            assert_eq!(m.read32(0x10), 0b1001);
        }

        #[test]
        fn reaction_lands_after_the_given_reads() {
            let m = SimMmio::new();
            m.on_write(
                0x0,
                0x1,
                0x0,
                Reaction {
                    addr: 0x4,
                    bits: 0x1,
                    set: true,
                    after_reads: 2,
                },
            );

            m.write32(0x0, 0x2);
            assert_eq!(m.read32(0x4), 0);
            assert_eq!(m.read32(0x4), 0);
            assert_eq!(m.read32(0x4), 1);
            assert_eq!(m.reads(0x4), 3);
        }

        #[test]
        fn non_matching_write_does_not_trigger() {
            let m = SimMmio::new();
            m.on_write(
                0x0,
                0x1,
                0x1,
                Reaction {
                    addr: 0x4,
                    bits: 0xf0,
                    set: true,
                    after_reads: 0,
                },
            );
            m.write32(0x0, 0x2);
            assert_eq!(m.peek(0x4), 0);
            m.write32(0x0, 0x3);
            assert_eq!(m.peek(0x4), 0xf0);
        }
    }
}
