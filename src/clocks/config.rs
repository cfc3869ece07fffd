//! The clock context: owns the register surface and a polling budget, and tracks which
//! profile is active.

use crate::{
    clocks::{
        Mode, Route,
        driver::{self, OscPower},
        frequency::Frequencies,
        profile::{ClockProfile, Dividers, ProfileId, SAFE_DIVIDERS},
        sequencer,
    },
    error::Result,
    low_power::{self, PowerMode, WakeFlags},
    regs::{Reg, Registers, mcg, sim},
    trim::{self, TrimTarget},
    util::Timeout,
};

/// Normalized fast internal reference divider: 4 MHz / 2.
const FCRDIV_NORMALIZED: u32 = 1;

/// Clock configuration state for the MCU. One of these should own the clock registers; every
/// profile switch, mode change and power-mode entry goes through it.
pub struct Clocks<R, T> {
    regs: R,
    timeout: T,
    active: ProfileId,
}

impl<R: Registers, T: Timeout> Clocks<R, T> {
    /// Wrap hardware that's already running [`ProfileId::Full`], eg after [`Clocks::init`] in a
    /// bootloader.
    pub fn new(regs: R, timeout: T) -> Self {
        Self {
            regs,
            timeout,
            active: ProfileId::Full,
        }
    }

    /// Bring the clock generator from its reset state (FEI) up to [`ProfileId::Full`]: dividers
    /// and selectors first, then FBE, PBE and PEE in turn, then the clock monitor.
    pub fn init(mut regs: R, mut timeout: T) -> Result<Self> {
        let profile = ProfileId::Full.profile();
        write_selectors(&mut regs, profile);

        // Reset's FEI reads back as PEE (CLKS = 0), so walk the first hops explicitly.
        for mode in [Mode::Fbe, Mode::Pbe, Mode::Pee] {
            driver::enter(&mut regs, &mut timeout, mode, profile.osc_power)?;
        }

        if profile.clock_monitor {
            regs.set_bits(Reg::McgC6, mcg::C6_CME0.mask());
        }

        debug!("clocks initialized: {}", profile.id);

        Ok(Self::new(regs, timeout))
    }

    /// Switch to the profile numbered `id`. An unknown id returns [`crate::Error::Range`]
    /// without touching the hardware.
    ///
    /// Switches between profiles with different topologies, and any switch to
    /// [`ProfileId::LowPower`], run with the clock monitor off and [`SAFE_DIVIDERS`] in place
    /// while the generator changes mode. The monitor comes back on only if the target profile
    /// wants it.
    ///
    /// If a mode transition fails, the error is returned and the active profile is unchanged;
    /// the generator stays in whichever mode it reached.
    pub fn set_profile(&mut self, id: u8) -> Result<()> {
        let id = ProfileId::try_from(id)?;
        let current = self.active.profile();
        let target = id.profile();

        debug!("clock profile {} -> {}", current.id, target.id);

        if current.topology_differs(target) || id == ProfileId::LowPower {
            self.regs.clear_bits(Reg::McgC6, mcg::C6_CME0.mask());
            self.regs.write(Reg::SimClkdiv1, SAFE_DIVIDERS.clkdiv1());
            self.normalize_fcrdiv();

            sequencer::drive_to(&mut self.regs, &mut self.timeout, target.mode, target.osc_power)?;

            if target.clock_monitor {
                self.regs.set_bits(Reg::McgC6, mcg::C6_CME0.mask());
            }
        }

        write_selectors(&mut self.regs, target);

        if Mode::current(&mut self.regs) != target.mode {
            sequencer::drive_to(&mut self.regs, &mut self.timeout, target.mode, target.osc_power)?;

            // The PLL-mode entries rewrite C6, which drops CME0.
            if target.clock_monitor {
                self.regs.set_bits(Reg::McgC6, mcg::C6_CME0.mask());
            }
        }

        self.active = id;
        Ok(())
    }

    /// The active profile's id.
    pub fn profile(&self) -> ProfileId {
        self.active
    }

    pub fn active_profile(&self) -> &'static ClockProfile {
        self.active.profile()
    }

    /// The mode the generator reports right now.
    pub fn mode(&mut self) -> Mode {
        Mode::current(&mut self.regs)
    }

    /// Output frequencies computed from the live registers.
    pub fn frequencies(&mut self) -> Frequencies {
        Frequencies::read(&mut self.regs)
    }

    /// Move the generator to `target` without touching the dividers or the active profile.
    /// Only use this with dividers that are safe in every mode on the route.
    pub fn drive_to(&mut self, target: Mode, osc_power: OscPower) -> Result<Route> {
        sequencer::drive_to(&mut self.regs, &mut self.timeout, target, osc_power)
    }

    /// Enter the power mode numbered `mode` (0 = RUN, 1 = WAIT, 2 = SLEEP, 3 = STOP). Anything
    /// else returns [`crate::Error::ParamMode`]. WAIT, SLEEP and STOP return once a wake event
    /// resumes execution.
    pub fn enter_power_mode(&mut self, mode: u8) -> Result<()> {
        let mode = PowerMode::try_from(mode)?;
        low_power::enter(&mut self.regs, &mut self.timeout, mode, self.active.profile())
    }

    /// Sources that woke the MCU from the last low-leakage stop.
    pub fn wake_flags(&mut self) -> WakeFlags {
        low_power::wake_flags(&mut self.regs)
    }

    /// Run the MCG auto-trim machine on the internal reference selected by `target`.
    /// Only available in a profile where [`ClockProfile::trim_capable`] holds.
    pub fn auto_trim(&mut self, target: TrimTarget) -> Result<()> {
        trim::auto_trim(&mut self.regs, &mut self.timeout, target, self.active.profile())
    }

    pub fn enable_interrupts(&mut self) {
        self.regs.enable_interrupts();
    }

    pub fn disable_interrupts(&mut self) {
        self.regs.disable_interrupts();
    }

    /// Direct access to the register surface.
    pub fn regs(&mut self) -> &mut R {
        &mut self.regs
    }

    /// Give back the register surface and polling budget.
    pub fn release(self) -> (R, T) {
        (self.regs, self.timeout)
    }

    /// Set FCRDIV to its normalized value. FCRDIV may only change while the fast reference isn't
    /// selected, so step through the slow one if needed.
    fn normalize_fcrdiv(&mut self) {
        if !mcg::C2_IRCS.is_set(self.regs.read(Reg::McgC2)) {
            self.regs.write_field(Reg::McgSc, mcg::SC_FCRDIV, FCRDIV_NORMALIZED);
        } else {
            self.regs.clear_bits(Reg::McgC2, mcg::C2_IRCS.mask());
            self.regs.write_field(Reg::McgSc, mcg::SC_FCRDIV, FCRDIV_NORMALIZED);
            self.regs.set_bits(Reg::McgC2, mcg::C2_IRCS.mask());
        }
    }
}

/// Dividers, the peripheral PLL/FLL clock select and the 32 kHz clock select for `profile`.
fn write_selectors<R: Registers>(regs: &mut R, profile: &ClockProfile) {
    write_dividers(regs, profile.dividers);
    regs.write_field(Reg::SimSopt2, sim::SOPT2_PLLFLLSEL, profile.peripheral_clock as u32);
    regs.write_field(Reg::SimSopt1, sim::SOPT1_OSC32KSEL, profile.osc32k as u32);
}

fn write_dividers<R: Registers>(regs: &mut R, dividers: Dividers) {
    regs.write(Reg::SimClkdiv1, dividers.clkdiv1());
}
