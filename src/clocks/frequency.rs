//! Clock speeds: the reference sources on the board, the part's rated maxima, and the core, bus,
//! FlexBus and flash clocks computed from raw register values.

use crate::{
    error::{Error, Result},
    regs::{Reg, Registers, mcg, sim},
};

/// OSC0 crystal.
pub const CRYSTAL_HZ: u32 = 8_000_000;
/// RTC oscillator, selectable as the MCG external reference through `MCG_C7[OSCSEL]`.
pub const RTC_OSC_HZ: u32 = 32_768;
/// Fast internal reference before the FCRDIV divider.
pub const FAST_IRC_HZ: u32 = 4_000_000;
pub const SLOW_IRC_HZ: u32 = 32_768;

pub const MAX_CORE_HZ: u32 = 120_000_000;
pub const MAX_BUS_HZ: u32 = 60_000_000;
pub const MAX_FLEXBUS_HZ: u32 = 50_000_000;
pub const MAX_FLASH_HZ: u32 = 25_000_000;

/// The clock-tree outputs, in Hz.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Frequencies {
    /// Core and system clock (OUTDIV1).
    pub core: u32,
    /// Bus clock (OUTDIV2).
    pub bus: u32,
    /// FlexBus clock (OUTDIV3).
    pub flexbus: u32,
    /// Flash clock (OUTDIV4).
    pub flash: u32,
}

impl Frequencies {
    /// Divide `mcgout` by the four `SIM_CLKDIV1` dividers.
    pub fn from_clkdiv1(mcgout: u32, clkdiv1: u32) -> Self {
        let div = |field: crate::regs::Field| mcgout / (field.get(clkdiv1) + 1);
        Self {
            core: div(sim::CLKDIV1_OUTDIV1),
            bus: div(sim::CLKDIV1_OUTDIV2),
            flexbus: div(sim::CLKDIV1_OUTDIV3),
            flash: div(sim::CLKDIV1_OUTDIV4),
        }
    }

    /// Compute the outputs from raw register values.
    pub fn from_values(values: &ClockRegisterValues) -> Self {
        Self::from_clkdiv1(values.mcgout_hz(), values.clkdiv1)
    }

    /// Read the live registers and compute the outputs.
    pub fn read<R: Registers>(regs: &mut R) -> Self {
        Self::from_values(&ClockRegisterValues::read(regs))
    }

    /// Check each output against the part's rated maximum.
    pub fn validate_speeds(&self) -> Result<()> {
        if self.core > MAX_CORE_HZ {
            return Err(Error::Speed);
        }

        if self.bus > MAX_BUS_HZ {
            return Err(Error::Speed);
        }

        if self.flexbus > MAX_FLEXBUS_HZ {
            return Err(Error::Speed);
        }

        if self.flash > MAX_FLASH_HZ {
            return Err(Error::Speed);
        }

        Ok(())
    }

    /// Element-wise maximum.
    pub fn max(self, other: Self) -> Self {
        Self {
            core: self.core.max(other.core),
            bus: self.bus.max(other.bus),
            flexbus: self.flexbus.max(other.flexbus),
            flash: self.flash.max(other.flash),
        }
    }
}

/// Raw values of the registers that determine the clock-tree outputs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ClockRegisterValues {
    pub c1: u32,
    pub c2: u32,
    pub c4: u32,
    pub c5: u32,
    pub c6: u32,
    pub c7: u32,
    pub sc: u32,
    pub clkdiv1: u32,
}

impl ClockRegisterValues {
    pub fn read<R: Registers>(regs: &mut R) -> Self {
        Self {
            c1: regs.read(Reg::McgC1),
            c2: regs.read(Reg::McgC2),
            c4: regs.read(Reg::McgC4),
            c5: regs.read(Reg::McgC5),
            c6: regs.read(Reg::McgC6),
            c7: regs.read(Reg::McgC7),
            sc: regs.read(Reg::McgSc),
            clkdiv1: regs.read(Reg::SimClkdiv1),
        }
    }

    /// MCG external reference: OSC0, or the RTC oscillator.
    fn external_hz(&self) -> u32 {
        if mcg::C7_OSCSEL.get(self.c7) == 1 {
            RTC_OSC_HZ
        } else {
            CRYSTAL_HZ
        }
    }

    /// MCGIRCLK.
    fn internal_hz(&self) -> u32 {
        if mcg::C2_IRCS.is_set(self.c2) {
            FAST_IRC_HZ >> mcg::SC_FCRDIV.get(self.sc)
        } else {
            SLOW_IRC_HZ
        }
    }

    /// MCGPLLCLK: the reference divided by PRDIV0 + 1, multiplied by VDIV0 + 16, then halved.
    fn pll_hz(&self) -> u32 {
        let prdiv = mcg::C5_PRDIV0.get(self.c5) + 1;
        let vdiv = mcg::C6_VDIV0.get(self.c6) + 16;
        self.external_hz() / prdiv * vdiv / 2
    }

    /// MCGFLLCLK. Only the low DCO range is modelled beyond the reset value. An undivided
    /// crystal reference pushes the DCO past what `u32` holds; that saturates.
    fn fll_hz(&self) -> u32 {
        let reference = if mcg::C1_IREFS.is_set(self.c1) {
            SLOW_IRC_HZ
        } else {
            let frdiv = mcg::C1_FRDIV.get(self.c1);
            let divisor = if mcg::C2_RANGE0.get(self.c2) == 0 {
                1 << frdiv
            } else {
                match frdiv {
                    6 => 1280,
                    7 => 1536,
                    n => 32 << n,
                }
            };
            self.external_hz() / divisor
        };

        let range = mcg::C4_DRST_DRS.get(self.c4);
        let factor = if mcg::C4_DMX32.is_set(self.c4) {
            [732, 1464, 2197, 2929][range as usize]
        } else {
            [640, 1280, 1920, 2560][range as usize]
        };
        (u64::from(reference) * factor).min(u64::from(u32::MAX)) as u32
    }

    /// MCGOUTCLK, as selected by `C1[CLKS]` and `C6[PLLS]`.
    pub fn mcgout_hz(&self) -> u32 {
        match mcg::C1_CLKS.get(self.c1) {
            mcg::CLKS_FLL_PLL => {
                if mcg::C6_PLLS.is_set(self.c6) {
                    self.pll_hz()
                } else {
                    self.fll_hz()
                }
            }
            mcg::CLKS_EXTERNAL => self.external_hz(),
            _ => self.internal_hz(),
        }
    }
}
