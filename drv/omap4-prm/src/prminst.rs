// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Partitioned register access.
//!
//! Every PRM register is named by a partition, an instance offset within
//! that partition, and a register offset within that instance. The
//! partition's base address comes from [`PrmGlobals`] at boot; touching a
//! partition that was never mapped is a bug in the caller's tables, and
//! panics.

use ringbuf::{ringbuf, ringbuf_entry};

use crate::mmio::Mmio;
use crate::{PrmConfig, SocVariant};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum Partition {
    Invalid = 0,
    Prm = 1,
    Cm1 = 2,
    Cm2 = 3,
    Scrm = 4,
    PrcmMpu = 5,
}

pub const MAX_PARTITIONS: usize = 6;

/// Base addresses discovered at boot.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct PrmGlobals {
    pub prm: usize,
    pub prcm_mpu: usize,
    pub scrm: usize,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum Trace {
    None,
    BaseInit(PrmGlobals),
}

ringbuf!(Trace, 4, Trace::None);

pub struct PrmInstances<M> {
    mmio: M,
    bases: [Option<usize>; MAX_PARTITIONS],
    soc: SocVariant,
    config: PrmConfig,
}

impl<M: Mmio> PrmInstances<M> {
    /// Creates a register layer with no partitions mapped; call
    /// [`Self::base_init`] before using it.
    pub fn new(mmio: M, soc: SocVariant) -> Self {
        Self::with_config(mmio, soc, PrmConfig::default())
    }

    pub fn with_config(mmio: M, soc: SocVariant, config: PrmConfig) -> Self {
        Self {
            mmio,
            bases: [None; MAX_PARTITIONS],
            soc,
            config,
        }
    }

    /// Binds the PRM, PRCM_MPU, and SCRM partitions. May be called again;
    /// later calls replace earlier bindings. A null base leaves its partition
    /// unmapped.
    pub fn base_init(&mut self, globals: &PrmGlobals) {
        ringbuf_entry!(Trace::BaseInit(*globals));
        for (part, base) in [
            (Partition::Prm, globals.prm),
            (Partition::PrcmMpu, globals.prcm_mpu),
            (Partition::Scrm, globals.scrm),
        ] {
            self.bases[part as usize] = (base != 0).then_some(base);
        }
    }

    pub fn soc(&self) -> SocVariant {
        self.soc
    }

    pub fn config(&self) -> &PrmConfig {
        &self.config
    }

    pub fn mmio(&self) -> &M {
        &self.mmio
    }

    pub fn is_mapped(&self, part: Partition) -> bool {
        part != Partition::Invalid && self.bases[part as usize].is_some()
    }

    fn addr(&self, part: Partition, inst: i16, idx: u16) -> usize {
        let base = match part {
            Partition::Invalid => None,
            p => self.bases[p as usize],
        };
        let Some(base) = base else {
            panic!("PRM partition {part:?} is not mapped");
        };
        base.wrapping_add_signed(isize::from(inst))
            .wrapping_add(usize::from(idx))
    }

    pub fn read_inst_reg(&self, part: Partition, inst: i16, idx: u16) -> u32 {
        self.mmio.read32(self.addr(part, inst, idx))
    }

    pub fn write_inst_reg(
        &self,
        value: u32,
        part: Partition,
        inst: i16,
        idx: u16,
    ) {
        self.mmio.write32(self.addr(part, inst, idx), value)
    }

    /// Replaces the bits under `mask` with `bits` and returns the value
    /// written. Not atomic; callers serialize.
    pub fn rmw_inst_reg_bits(
        &self,
        mask: u32,
        bits: u32,
        part: Partition,
        inst: i16,
        idx: u16,
    ) -> u32 {
        let v = (self.read_inst_reg(part, inst, idx) & !mask) | bits;
        self.write_inst_reg(v, part, inst, idx);
        v
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mmio::sim::SimMmio;
    use proptest::prelude::*;

    const GLOBALS: PrmGlobals = PrmGlobals {
        prm: 0x4a30_6000,
        prcm_mpu: 0x4800_0000,
        scrm: 0x4a30_a000,
    };

    fn mapped() -> PrmInstances<SimMmio> {
        let mut p = PrmInstances::new(SimMmio::new(), SocVariant::Omap446x);
        p.base_init(&GLOBALS);
        p
    }

    #[test]
    fn addresses_combine_base_instance_and_offset() {
        let p = mapped();
        p.write_inst_reg(0xdead_beef, Partition::Prm, 0x1b00, 0x20);
        assert_eq!(p.mmio().peek(0x4a30_7b20), 0xdead_beef);

        p.write_inst_reg(1, Partition::Scrm, 0x100, 0x4);
        assert_eq!(p.mmio().peek(0x4a30_a104), 1);
    }

    #[test]
    fn negative_instances_reach_below_the_base() {
        let p = mapped();
        p.write_inst_reg(7, Partition::PrcmMpu, -0x10, 0x4);
        assert_eq!(p.mmio().peek(0x4800_0000 - 0xc), 7);
    }

    #[test]
    fn rebinding_replaces_bases() {
        let mut p = mapped();
        p.base_init(&PrmGlobals {
            prm: 0x1000,
            ..GLOBALS
        });
        p.write_inst_reg(3, Partition::Prm, 0, 0);
        assert_eq!(p.mmio().peek(0x1000), 3);
    }

    #[test]
    #[should_panic(expected = "Invalid")]
    fn invalid_partition_panics() {
        mapped().read_inst_reg(Partition::Invalid, 0, 0);
    }

    #[test]
    #[should_panic(expected = "Cm1")]
    fn unmapped_partition_panics() {
        mapped().write_inst_reg(0, Partition::Cm1, 0, 0);
    }

    #[test]
    #[should_panic(expected = "Scrm")]
    fn null_base_is_unmapped() {
        let mut p = PrmInstances::new(SimMmio::new(), SocVariant::Omap446x);
        p.base_init(&PrmGlobals { scrm: 0, ..GLOBALS });
        assert!(!p.is_mapped(Partition::Scrm));
        assert!(p.is_mapped(Partition::Prm));
        p.read_inst_reg(Partition::Scrm, 0x100, 0x4);
    }

    #[test]
    fn rebinding_to_null_unmaps() {
        let mut p = mapped();
        p.base_init(&PrmGlobals {
            prcm_mpu: 0,
            ..GLOBALS
        });
        assert!(!p.is_mapped(Partition::PrcmMpu));
    }

    #[test]
    fn mapping_is_reported() {
        let p = PrmInstances::new(SimMmio::new(), SocVariant::Omap54xx);
        assert!(!p.is_mapped(Partition::Prm));
        let p = mapped();
        assert!(p.is_mapped(Partition::Prm));
        assert!(p.is_mapped(Partition::Scrm));
        assert!(!p.is_mapped(Partition::Cm2));
        assert!(!p.is_mapped(Partition::Invalid));
    }

    fn mapped_partition() -> impl Strategy<Value = Partition> {
        prop_oneof![
            Just(Partition::Prm),
            Just(Partition::Scrm),
            Just(Partition::PrcmMpu),
        ]
    }

    proptest! {
        #[test]
        fn read_returns_what_was_written(
            part in mapped_partition(),
            inst in any::<i16>(),
            idx in (0u16..0x100).prop_map(|i| i * 4),
            value in any::<u32>(),
        ) {
            let p = mapped();
            p.write_inst_reg(value, part, inst, idx);
            prop_assert_eq!(p.read_inst_reg(part, inst, idx), value);
        }

        #[test]
        fn rmw_replaces_masked_bits(
            old in any::<u32>(),
            mask in any::<u32>(),
            bits in any::<u32>(),
        ) {
            let p = mapped();
            p.write_inst_reg(old, Partition::Prm, 0x1b00, 0x40);
            let v =
                p.rmw_inst_reg_bits(mask, bits, Partition::Prm, 0x1b00, 0x40);
            prop_assert_eq!(v, (old & !mask) | bits);
            prop_assert_eq!(
                p.read_inst_reg(Partition::Prm, 0x1b00, 0x40),
                v
            );
        }
    }
}
