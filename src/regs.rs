//! Register access surface for the clock generator (MCG), the two oscillators, the system
//! integration module (SIM) dividers and selectors, the system mode controller (SMC), the
//! low-leakage wakeup unit (LLWU), and the Cortex-M system control register.
//!
//! Everything above this module talks to hardware through the [`Registers`] trait, so a
//! simulated register file (see [`crate::mock`]) can stand in for the MCU. On the MCU itself,
//! `Mmio` performs volatile accesses at the K60F reference-manual addresses.

use cfg_if::cfg_if;

/// Access width of a register. Most MCG, OSC, SMC and LLWU registers are byte-wide.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Width {
    U8,
    U32,
}

/// Builds the [`Reg`] enum from a table of `NAME: width @ address` entries. Variant names are
/// the CamelCase form of the reference-manual name, eg `MCG_C1` -> `Reg::McgC1`.
macro_rules! registers {
    ($($name:ident: $width:ident @ $addr:expr),+ $(,)?) => {
        paste::paste! {
            /// A named, directly addressable control or status register.
            #[derive(Clone, Copy, Debug, PartialEq, Eq)]
            #[cfg_attr(feature = "defmt", derive(defmt::Format))]
            pub enum Reg {
                $(
                    #[doc = concat!("`", stringify!($name), "`")]
                    [<$name:camel>],
                )+
            }

            impl Reg {
                /// Every register, in declaration order. `Reg::ALL[r.index()] == r`.
                pub const ALL: &'static [Reg] = &[$(Reg::[<$name:camel>],)+];

                /// Number of registers in the surface.
                pub const COUNT: usize = Self::ALL.len();

                /// Absolute bus address of the register.
                pub const fn address(self) -> usize {
                    match self {
                        $(Self::[<$name:camel>] => $addr,)+
                    }
                }

                pub const fn width(self) -> Width {
                    match self {
                        $(Self::[<$name:camel>] => Width::$width,)+
                    }
                }

                /// Reference-manual name, eg `"MCG_C1"`.
                pub const fn name(self) -> &'static str {
                    match self {
                        $(Self::[<$name:camel>] => stringify!($name),)+
                    }
                }

                /// Position in [`Reg::ALL`]; used to index register files.
                pub const fn index(self) -> usize {
                    self as usize
                }
            }
        }
    };
}

registers! {
    MCG_C1: U8 @ 0x4006_4000,
    MCG_C2: U8 @ 0x4006_4001,
    MCG_C4: U8 @ 0x4006_4003,
    MCG_C5: U8 @ 0x4006_4004,
    MCG_C6: U8 @ 0x4006_4005,
    MCG_S: U8 @ 0x4006_4006,
    MCG_SC: U8 @ 0x4006_4008,
    MCG_ATCVH: U8 @ 0x4006_400A,
    MCG_ATCVL: U8 @ 0x4006_400B,
    MCG_C7: U8 @ 0x4006_400C,
    MCG_C11: U8 @ 0x4006_4010,
    MCG_C12: U8 @ 0x4006_4011,
    OSC0_CR: U8 @ 0x4006_5000,
    OSC1_CR: U8 @ 0x400E_5000,
    SIM_SOPT1: U32 @ 0x4004_7000,
    SIM_SOPT2: U32 @ 0x4004_8004,
    SIM_CLKDIV1: U32 @ 0x4004_8044,
    SMC_PMCTRL: U8 @ 0x4007_E001,
    LLWU_F1: U8 @ 0x4007_C005,
    LLWU_F2: U8 @ 0x4007_C006,
    LLWU_F3: U8 @ 0x4007_C007,
    LLWU_FILT1: U8 @ 0x4007_C008,
    LLWU_FILT2: U8 @ 0x4007_C009,
    SCB_SCR: U32 @ 0xE000_ED10,
}

/// A contiguous bitfield within a register.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Field {
    pub shift: u8,
    pub width: u8,
}

impl Field {
    pub const fn new(shift: u8, width: u8) -> Self {
        Self { shift, width }
    }

    /// A single-bit field.
    pub const fn bit(shift: u8) -> Self {
        Self::new(shift, 1)
    }

    /// The field's bits, in register position.
    pub const fn mask(self) -> u32 {
        ((1u32 << self.width) - 1) << self.shift
    }

    /// Encode `value` into register position. Excess high bits are dropped.
    pub const fn bits(self, value: u32) -> u32 {
        (value << self.shift) & self.mask()
    }

    /// Decode this field from a full register value.
    pub const fn get(self, reg: u32) -> u32 {
        (reg & self.mask()) >> self.shift
    }

    /// Return `reg` with this field replaced by `value`.
    pub const fn replace(self, reg: u32, value: u32) -> u32 {
        (reg & !self.mask()) | self.bits(value)
    }

    pub const fn is_set(self, reg: u32) -> bool {
        reg & self.mask() != 0
    }
}

/// MCG bitfields this crate programs or polls. K60F RM, chapter 25.
pub mod mcg {
    use super::Field;

    // C1
    pub const C1_CLKS: Field = Field::new(6, 2);
    pub const C1_FRDIV: Field = Field::new(3, 3);
    pub const C1_IREFS: Field = Field::bit(2);
    pub const C1_IRCLKEN: Field = Field::bit(1);

    // C2
    pub const C2_RANGE0: Field = Field::new(4, 2);
    pub const C2_HGO0: Field = Field::bit(3);
    pub const C2_EREFS0: Field = Field::bit(2);
    pub const C2_LP: Field = Field::bit(1);
    pub const C2_IRCS: Field = Field::bit(0);

    // C4
    pub const C4_DMX32: Field = Field::bit(7);
    pub const C4_DRST_DRS: Field = Field::new(5, 2);

    // C5
    pub const C5_PRDIV0: Field = Field::new(0, 3);

    // C6
    pub const C6_PLLS: Field = Field::bit(6);
    pub const C6_CME0: Field = Field::bit(5);
    pub const C6_VDIV0: Field = Field::new(0, 5);

    // S (read only)
    pub const S_LOCK0: Field = Field::bit(6);
    pub const S_PLLST: Field = Field::bit(5);
    pub const S_IREFST: Field = Field::bit(4);
    pub const S_CLKST: Field = Field::new(2, 2);
    pub const S_OSCINIT0: Field = Field::bit(1);
    pub const S_IRCST: Field = Field::bit(0);

    // SC. ATMF and LOCS0 are write-1-to-clear.
    pub const SC_ATME: Field = Field::bit(7);
    pub const SC_ATMS: Field = Field::bit(6);
    pub const SC_ATMF: Field = Field::bit(5);
    pub const SC_FCRDIV: Field = Field::new(1, 3);
    pub const SC_LOCS0: Field = Field::bit(0);

    // C7
    pub const C7_OSCSEL: Field = Field::new(0, 2);

    // C11
    pub const C11_PRDIV1: Field = Field::new(0, 3);

    // C12
    pub const C12_VDIV1: Field = Field::new(0, 5);

    /// `S_CLKST` / `C1_CLKS` encodings.
    pub const CLKS_FLL_PLL: u32 = 0b00;
    pub const CLKS_INTERNAL: u32 = 0b01;
    pub const CLKS_EXTERNAL: u32 = 0b10;
    /// Status-only encoding: the PLL output feeds MCGOUTCLK.
    pub const CLKST_PLL: u32 = 0b11;
}

/// OSC0_CR / OSC1_CR bitfields.
pub mod osc {
    use super::Field;

    pub const CR_ERCLKEN: Field = Field::bit(7);
    pub const CR_SC4P: Field = Field::bit(2);
    pub const CR_SC8P: Field = Field::bit(1);
}

/// SIM bitfields.
pub mod sim {
    use super::Field;

    pub const SOPT1_OSC32KSEL: Field = Field::bit(19);

    pub const SOPT2_PLLFLLSEL: Field = Field::new(16, 2);

    pub const CLKDIV1_OUTDIV1: Field = Field::new(28, 4);
    pub const CLKDIV1_OUTDIV2: Field = Field::new(24, 4);
    pub const CLKDIV1_OUTDIV3: Field = Field::new(20, 4);
    pub const CLKDIV1_OUTDIV4: Field = Field::new(16, 4);
}

/// SMC bitfields.
pub mod smc {
    use super::Field;

    pub const PMCTRL_STOPM: Field = Field::new(0, 3);
}

/// LLWU bitfields. All of F1, F2 and F3 are write-1-to-clear.
pub mod llwu {
    use super::Field;

    pub const FILT_FILTF: Field = Field::bit(7);
}

/// Cortex-M System Control Register bitfields.
pub mod scb {
    use super::Field;

    pub const SCR_SLEEPDEEP: Field = Field::bit(2);
    pub const SCR_SLEEPONEXIT: Field = Field::bit(1);
}

/// Read, write and core-instruction capability over the clock-related registers.
///
/// Reads and writes are single, atomic register accesses. Writing a 1 to a write-1-to-clear
/// status bit clears it, so `modify` on such a register clears any flag that was set when read.
pub trait Registers {
    fn read(&mut self, reg: Reg) -> u32;

    fn write(&mut self, reg: Reg, value: u32);

    /// Read-modify-write.
    fn modify<F: FnOnce(u32) -> u32>(&mut self, reg: Reg, f: F) {
        let value = self.read(reg);
        self.write(reg, f(value));
    }

    fn set_bits(&mut self, reg: Reg, mask: u32) {
        self.modify(reg, |v| v | mask);
    }

    fn clear_bits(&mut self, reg: Reg, mask: u32) {
        self.modify(reg, |v| v & !mask);
    }

    fn read_field(&mut self, reg: Reg, field: Field) -> u32 {
        field.get(self.read(reg))
    }

    fn write_field(&mut self, reg: Reg, field: Field, value: u32) {
        self.modify(reg, |v| field.replace(v, value));
    }

    /// Execute WFI; returns once an interrupt resumes execution.
    fn wait_for_interrupt(&mut self);

    /// Unmask all maskable interrupts.
    fn enable_interrupts(&mut self);

    /// Mask all maskable interrupts.
    fn disable_interrupts(&mut self);
}

impl<R: Registers + ?Sized> Registers for &mut R {
    fn read(&mut self, reg: Reg) -> u32 {
        (**self).read(reg)
    }

    fn write(&mut self, reg: Reg, value: u32) {
        (**self).write(reg, value)
    }

    fn wait_for_interrupt(&mut self) {
        (**self).wait_for_interrupt()
    }

    fn enable_interrupts(&mut self) {
        (**self).enable_interrupts()
    }

    fn disable_interrupts(&mut self) {
        (**self).disable_interrupts()
    }
}

cfg_if! {
    if #[cfg(cortex_m_hw)] {
        /// Volatile, memory-mapped access to the real registers.
        pub struct Mmio {
            _private: (),
        }

        impl Mmio {
            /// Take the register surface.
            ///
            /// # Safety
            /// The clock subsystem assumes a single owner of these registers. Don't create a
            /// second `Mmio` while one is in use, and don't touch the same registers through a
            /// PAC in parallel.
            pub unsafe fn steal() -> Self {
                Self { _private: () }
            }
        }

        impl Registers for Mmio {
            fn read(&mut self, reg: Reg) -> u32 {
                let addr = reg.address();
                // Addresses come from the fixed register table above.
                unsafe {
                    match reg.width() {
                        Width::U8 => core::ptr::read_volatile(addr as *const u8) as u32,
                        Width::U32 => core::ptr::read_volatile(addr as *const u32),
                    }
                }
            }

            fn write(&mut self, reg: Reg, value: u32) {
                let addr = reg.address();
                unsafe {
                    match reg.width() {
                        Width::U8 => core::ptr::write_volatile(addr as *mut u8, value as u8),
                        Width::U32 => core::ptr::write_volatile(addr as *mut u32, value),
                    }
                }
            }

            fn wait_for_interrupt(&mut self) {
                cortex_m::asm::wfi();
            }

            fn enable_interrupts(&mut self) {
                unsafe { cortex_m::interrupt::enable() }
            }

            fn disable_interrupts(&mut self) {
                cortex_m::interrupt::disable();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_table_is_consistent() {
        for (i, reg) in Reg::ALL.iter().enumerate() {
            assert_eq!(reg.index(), i);
        }
        assert_eq!(Reg::COUNT, Reg::ALL.len());
        assert_eq!(Reg::McgC1.name(), "MCG_C1");
        assert_eq!(Reg::SimClkdiv1.address(), 0x4004_8044);
        assert_eq!(Reg::ScbScr.width(), Width::U32);
        assert_eq!(Reg::LlwuFilt2.width(), Width::U8);
    }

    #[test]
    fn field_encode_decode() {
        assert_eq!(mcg::C1_CLKS.mask(), 0xC0);
        assert_eq!(mcg::C1_CLKS.bits(2), 0x80);
        assert_eq!(mcg::C1_CLKS.get(0x9A), 2);
        assert_eq!(mcg::S_CLKST.bits(mcg::CLKST_PLL), 0x0C);
        assert_eq!(mcg::SC_FCRDIV.replace(0xFF, 1), 0xF3);
        assert_eq!(sim::CLKDIV1_OUTDIV1.bits(0xF), 0xF000_0000);
        assert!(scb::SCR_SLEEPDEEP.is_set(0x04));
        // Values wider than the field are truncated, not spilled into neighbours.
        assert_eq!(mcg::C1_FRDIV.bits(0xFF), 0x38);
    }

    #[test]
    fn fields_of_one_register_do_not_overlap() {
        let registers: [&[Field]; 6] = [
            &[mcg::C1_CLKS, mcg::C1_FRDIV, mcg::C1_IREFS, mcg::C1_IRCLKEN],
            &[mcg::C2_RANGE0, mcg::C2_HGO0, mcg::C2_EREFS0, mcg::C2_LP, mcg::C2_IRCS],
            &[mcg::C6_PLLS, mcg::C6_CME0, mcg::C6_VDIV0],
            &[
                mcg::S_LOCK0,
                mcg::S_PLLST,
                mcg::S_IREFST,
                mcg::S_CLKST,
                mcg::S_OSCINIT0,
                mcg::S_IRCST,
            ],
            &[mcg::SC_ATME, mcg::SC_ATMS, mcg::SC_ATMF, mcg::SC_FCRDIV, mcg::SC_LOCS0],
            &[
                sim::CLKDIV1_OUTDIV1,
                sim::CLKDIV1_OUTDIV2,
                sim::CLKDIV1_OUTDIV3,
                sim::CLKDIV1_OUTDIV4,
            ],
        ];

        for fields in registers {
            let mut seen = 0;
            for field in fields {
                assert_eq!(seen & field.mask(), 0, "{:#x}", field.mask());
                seen |= field.mask();
            }
        }
    }
}
