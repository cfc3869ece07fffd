//! Entry procedures for each MCG mode. Each one programs the reference selection and divider
//! registers, then the oscillator / PLL / internal reference enables, then polls `MCG_S` until
//! the hardware confirms the mode. K60F RM, section 25.5.3: "MCG mode state diagram".

use crate::{
    clocks::Mode,
    error::{Result, WaitFor},
    regs::{Reg, Registers, mcg, osc},
    util::{Timeout, wait_until},
};

/// Whether OSC0/OSC1 keep driving OSCERCLK while the generator is parked in a mode. Leaving
/// them on relocks faster; turning them off saves power. Chosen by the caller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OscPower {
    Enabled,
    Disabled,
}

/// Very high frequency range, for the 8 MHz crystal.
const RANGE_VERY_HIGH: u32 = 0b10;
/// FLL external reference divider used in the external modes. Divide by 256 with RANGE0 != 0.
const FRDIV_EXTERNAL: u32 = 3;
/// PLL0 multiplier: VDIV0 + 16 = 30.
const VDIV0_PLL: u32 = 0x0E;
const PRDIV0_PLL: u32 = 0;

impl OscPower {
    fn erclken(self) -> u32 {
        match self {
            Self::Enabled => osc::CR_ERCLKEN.mask(),
            Self::Disabled => 0,
        }
    }

    /// Value for the VDIV0 field in the FLL modes. Parking with the oscillator off also drops the
    /// PLL multiplier back to its reset value.
    fn parked_vdiv0(self) -> u32 {
        match self {
            Self::Enabled => VDIV0_PLL,
            Self::Disabled => 0,
        }
    }
}

/// 8 MHz crystal with SC4P + SC8P load capacitance.
fn osc0_cr(osc_power: OscPower) -> u32 {
    osc_power.erclken() | osc::CR_SC4P.mask() | osc::CR_SC8P.mask()
}

/// Crystal oscillator requested, high gain, very high range, fast IRC selected.
fn c2(low_power: bool) -> u32 {
    let lp = if low_power { mcg::C2_LP.mask() } else { 0 };
    mcg::C2_RANGE0.bits(RANGE_VERY_HIGH)
        | mcg::C2_HGO0.mask()
        | mcg::C2_EREFS0.mask()
        | lp
        | mcg::C2_IRCS.mask()
}

/// External reference for the FLL, `clks` driving MCGOUTCLK, internal reference kept enabled.
fn c1_external(clks: u32) -> u32 {
    mcg::C1_CLKS.bits(clks) | mcg::C1_FRDIV.bits(FRDIV_EXTERNAL) | mcg::C1_IRCLKEN.mask()
}

/// Internal reference for the FLL and for MCGOUTCLK.
fn c1_internal() -> u32 {
    mcg::C1_CLKS.bits(mcg::CLKS_INTERNAL) | mcg::C1_IREFS.mask() | mcg::C1_IRCLKEN.mask()
}

fn c6_pll() -> u32 {
    mcg::C6_PLLS.mask() | mcg::C6_VDIV0.bits(VDIV0_PLL)
}

fn write_oscillators<R: Registers>(regs: &mut R, osc_power: OscPower) {
    regs.write(Reg::Osc0Cr, osc0_cr(osc_power));
    regs.write(Reg::Osc1Cr, osc_power.erclken());
}

/// FLL back to its default range, PLL1 and its monitor off.
fn reset_fll_and_pll1<R: Registers>(regs: &mut R) {
    regs.clear_bits(Reg::McgC4, mcg::C4_DMX32.mask() | mcg::C4_DRST_DRS.mask());
    regs.write(Reg::McgC11, mcg::C11_PRDIV1.bits(0));
    regs.write(Reg::McgC12, mcg::C12_VDIV1.bits(0));
}

fn wait_clock_source<R: Registers, T: Timeout>(regs: &mut R, timeout: &mut T, clkst: u32) -> Result<()> {
    wait_until(
        regs,
        timeout,
        Reg::McgS,
        mcg::S_CLKST,
        clkst,
        WaitFor::ClockSource(clkst as u8),
    )
}

/// Enter `mode`. Only call this with a mode adjacent to the current one in
/// [`crate::clocks::TRANSITION_MATRIX`].
pub fn enter<R: Registers, T: Timeout>(
    regs: &mut R,
    timeout: &mut T,
    mode: Mode,
    osc_power: OscPower,
) -> Result<()> {
    trace!("entering {} ({})", mode, osc_power);
    match mode {
        Mode::Fbi => enter_fbi(regs, timeout, osc_power),
        Mode::Blpi => enter_blpi(regs, timeout, osc_power),
        Mode::Fbe => enter_fbe(regs, timeout, osc_power),
        Mode::Pbe => enter_pbe(regs, timeout, osc_power),
        Mode::Pee => enter_pee(regs, timeout, osc_power),
    }
}

/// PEE: the PLL output drives MCGOUTCLK. The PLL is referenced to OSC0, so OSCERCLK stays
/// enabled whatever `_osc_power` says.
pub(crate) fn enter_pee<R: Registers, T: Timeout>(
    regs: &mut R,
    timeout: &mut T,
    _osc_power: OscPower,
) -> Result<()> {
    write_oscillators(regs, OscPower::Enabled);
    regs.write(Reg::McgC1, c1_external(mcg::CLKS_FLL_PLL));
    regs.write(Reg::McgC2, c2(false));
    regs.write(Reg::McgC11, mcg::C11_PRDIV1.bits(0));
    regs.write(Reg::McgC12, mcg::C12_VDIV1.bits(0));
    regs.write(Reg::McgC5, mcg::C5_PRDIV0.bits(PRDIV0_PLL));
    regs.write(Reg::McgC6, c6_pll());

    wait_clock_source(regs, timeout, mcg::CLKST_PLL)
}

/// PBE: the external reference drives MCGOUTCLK while the PLL runs (and locks) alongside.
pub(crate) fn enter_pbe<R: Registers, T: Timeout>(
    regs: &mut R,
    timeout: &mut T,
    osc_power: OscPower,
) -> Result<()> {
    write_oscillators(regs, osc_power);
    regs.write(Reg::McgC1, c1_external(mcg::CLKS_EXTERNAL));
    regs.write(Reg::McgC2, c2(false));
    regs.write(Reg::McgC5, mcg::C5_PRDIV0.bits(PRDIV0_PLL));
    regs.write(Reg::McgC6, c6_pll());

    wait_clock_source(regs, timeout, mcg::CLKS_EXTERNAL)?;
    wait_until(regs, timeout, Reg::McgS, mcg::S_LOCK0, 1, WaitFor::PllLock)
}

/// FBE: the external reference drives MCGOUTCLK; the FLL is selected (PLLS = 0).
pub(crate) fn enter_fbe<R: Registers, T: Timeout>(
    regs: &mut R,
    timeout: &mut T,
    osc_power: OscPower,
) -> Result<()> {
    // OSC0 rather than the RTC oscillator or OSC1 feeds the external reference.
    regs.clear_bits(Reg::McgC7, mcg::C7_OSCSEL.mask());
    regs.write(Reg::McgC2, c2(false));
    write_oscillators(regs, osc_power);
    regs.write(Reg::McgC1, c1_external(mcg::CLKS_EXTERNAL));
    regs.clear_bits(Reg::McgC4, mcg::C4_DMX32.mask() | mcg::C4_DRST_DRS.mask());
    regs.write(Reg::McgC5, mcg::C5_PRDIV0.bits(PRDIV0_PLL));
    regs.write(Reg::McgC6, mcg::C6_VDIV0.bits(osc_power.parked_vdiv0()));
    regs.write(Reg::McgC11, mcg::C11_PRDIV1.bits(0));
    regs.write(Reg::McgC12, mcg::C12_VDIV1.bits(0));

    wait_until(regs, timeout, Reg::McgS, mcg::S_OSCINIT0, 1, WaitFor::OscillatorRunning)?;
    wait_until(regs, timeout, Reg::McgS, mcg::S_IREFST, 0, WaitFor::ExternalReference)?;
    wait_clock_source(regs, timeout, mcg::CLKS_EXTERNAL)
}

/// BLPI: the internal reference drives MCGOUTCLK with the FLL and PLL disabled (LP = 1).
pub(crate) fn enter_blpi<R: Registers, T: Timeout>(
    regs: &mut R,
    timeout: &mut T,
    osc_power: OscPower,
) -> Result<()> {
    regs.write(Reg::McgC1, c1_internal());
    regs.write(Reg::McgC2, c2(true));
    write_oscillators(regs, osc_power);

    wait_until(regs, timeout, Reg::McgS, mcg::S_IREFST, 1, WaitFor::InternalReference)?;
    wait_until(regs, timeout, Reg::McgS, mcg::S_IRCST, 1, WaitFor::FastInternalReference)
}

/// FBI: the internal reference drives MCGOUTCLK and the FLL.
pub(crate) fn enter_fbi<R: Registers, T: Timeout>(
    regs: &mut R,
    timeout: &mut T,
    osc_power: OscPower,
) -> Result<()> {
    regs.write(Reg::McgC1, c1_internal());
    regs.write(Reg::McgC2, c2(false));
    regs.clear_bits(Reg::McgC4, mcg::C4_DMX32.mask() | mcg::C4_DRST_DRS.mask());
    write_oscillators(regs, osc_power);
    regs.clear_bits(Reg::McgC7, mcg::C7_OSCSEL.mask());
    regs.write(Reg::McgC5, mcg::C5_PRDIV0.bits(PRDIV0_PLL));
    regs.write(Reg::McgC6, mcg::C6_VDIV0.bits(osc_power.parked_vdiv0()));
    reset_fll_and_pll1(regs);

    wait_until(regs, timeout, Reg::McgS, mcg::S_IREFST, 1, WaitFor::InternalReference)?;
    wait_clock_source(regs, timeout, mcg::CLKS_INTERNAL)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::Error,
        mock::MockRegisters,
        util::IterationLimit,
    };

    fn limit() -> IterationLimit {
        IterationLimit::new(100)
    }

    #[test]
    fn pee_selects_pll_with_oscillator_on() {
        let mut regs = MockRegisters::new();
        enter(&mut regs, &mut limit(), Mode::Fbe, OscPower::Enabled).unwrap();
        enter(&mut regs, &mut limit(), Mode::Pbe, OscPower::Enabled).unwrap();
        enter(&mut regs, &mut limit(), Mode::Pee, OscPower::Disabled).unwrap();

        assert_eq!(Mode::current(&mut regs), Mode::Pee);
        assert_eq!(regs.peek(Reg::Osc0Cr), 0x86);
        assert_eq!(regs.peek(Reg::Osc1Cr), 0x80);
        assert_eq!(regs.peek(Reg::McgC6), 0x4E);
        assert_eq!(regs.peek(Reg::McgC1), 0x1A);
    }

    #[test]
    fn pbe_waits_for_lock() {
        let mut regs = MockRegisters::new();
        enter(&mut regs, &mut limit(), Mode::Fbe, OscPower::Enabled).unwrap();
        regs.hold_status_low(mcg::S_LOCK0.mask());
        assert_eq!(
            enter(&mut regs, &mut limit(), Mode::Pbe, OscPower::Enabled),
            Err(Error::Timeout(WaitFor::PllLock))
        );
    }

    #[test]
    fn fbe_waits_for_the_crystal() {
        let mut regs = MockRegisters::new();
        regs.hold_status_low(mcg::S_OSCINIT0.mask());
        assert_eq!(
            enter(&mut regs, &mut limit(), Mode::Fbe, OscPower::Enabled),
            Err(Error::Timeout(WaitFor::OscillatorRunning))
        );
    }

    #[test]
    fn parking_with_oscillator_off_clears_erclken_and_vdiv() {
        let mut regs = MockRegisters::new();
        enter(&mut regs, &mut limit(), Mode::Fbe, OscPower::Disabled).unwrap();

        assert_eq!(Mode::current(&mut regs), Mode::Fbe);
        assert_eq!(regs.peek(Reg::Osc0Cr), 0x06);
        assert_eq!(regs.peek(Reg::Osc1Cr), 0);
        assert_eq!(regs.peek(Reg::McgC6), 0);
    }

    #[test]
    fn blpi_sets_low_power_and_internal_reference() {
        let mut regs = MockRegisters::new();
        enter(&mut regs, &mut limit(), Mode::Fbi, OscPower::Disabled).unwrap();
        enter(&mut regs, &mut limit(), Mode::Blpi, OscPower::Disabled).unwrap();

        assert_eq!(Mode::current(&mut regs), Mode::Blpi);
        assert_eq!(regs.peek(Reg::McgC1), 0x46);
        assert_eq!(regs.peek(Reg::McgC2), 0x2F);
    }

    #[test]
    fn fbi_waits_for_internal_clock_source() {
        let mut regs = MockRegisters::new();
        regs.hold_status_low(mcg::S_CLKST.mask());
        assert_eq!(
            enter(&mut regs, &mut limit(), Mode::Fbi, OscPower::Enabled),
            Err(Error::Timeout(WaitFor::ClockSource(1)))
        );
    }
}
