//! The fixed set of clock profiles: a target MCG mode plus the SIM dividers and clock selectors
//! that go with it.

use crate::{
    clocks::{
        Mode,
        driver::OscPower,
        frequency::{CRYSTAL_HZ, FAST_IRC_HZ, Frequencies},
    },
    error::{Error, Result},
    regs::sim,
};

/// MCGPLLCLK with the PLL0 settings used in PEE.
pub const PLL_HZ: u32 = 120_000_000;

/// Identifies one of the predefined clock profiles.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ProfileId {
    /// 120 MHz core from the PLL.
    Full = 0,
    /// 12 MHz everywhere, PLL still engaged.
    Reduced = 1,
    /// 2 MHz core from the fast internal reference, PLL and FLL off.
    LowPower = 2,
}

impl ProfileId {
    pub const ALL: [ProfileId; 3] = [Self::Full, Self::Reduced, Self::LowPower];

    /// The profile this id names.
    pub fn profile(self) -> &'static ClockProfile {
        &PROFILES[self as usize]
    }
}

impl TryFrom<u8> for ProfileId {
    type Error = Error;

    fn try_from(id: u8) -> Result<Self> {
        match id {
            0 => Ok(Self::Full),
            1 => Ok(Self::Reduced),
            2 => Ok(Self::LowPower),
            _ => Err(Error::Range),
        }
    }
}

/// Divide-by values (1 to 16) for the core, bus, FlexBus and flash clocks. Values outside that
/// range are clamped to it when encoded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Dividers {
    pub core: u8,
    pub bus: u8,
    pub flexbus: u8,
    pub flash: u8,
}

impl Dividers {
    pub const fn new(core: u8, bus: u8, flexbus: u8, flash: u8) -> Self {
        Self {
            core,
            bus,
            flexbus,
            flash,
        }
    }

    /// The `SIM_CLKDIV1` value. Each OUTDIV field holds the divisor minus one.
    pub const fn clkdiv1(self) -> u32 {
        sim::CLKDIV1_OUTDIV1.bits(outdiv(self.core))
            | sim::CLKDIV1_OUTDIV2.bits(outdiv(self.bus))
            | sim::CLKDIV1_OUTDIV3.bits(outdiv(self.flexbus))
            | sim::CLKDIV1_OUTDIV4.bits(outdiv(self.flash))
    }
}

/// OUTDIV field value for a divide-by `divisor`, clamped to 1..=16.
const fn outdiv(divisor: u8) -> u32 {
    match divisor {
        0 => 0,
        1..=16 => divisor as u32 - 1,
        _ => 15,
    }
}

/// Dividers in place while the generator changes mode. Low enough that no intermediate mode can
/// overclock any output.
pub const SAFE_DIVIDERS: Dividers = Dividers::new(2, 4, 8, 8);

/// Clock for peripherals that take MCGPLLCLK / MCGFLLCLK (USB, I2S, SDHC...). `SIM_SOPT2[PLLFLLSEL]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum PeripheralClockSource {
    Fll = 0,
    Pll0 = 1,
    Pll1 = 2,
    CoreClock = 3,
}

/// ERCLK32K source. `SIM_SOPT1[OSC32KSEL]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Osc32kSource {
    SystemOscillator = 0,
    Rtc = 1,
}

/// A complete clock configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ClockProfile {
    pub id: ProfileId,
    /// Mode the generator settles in.
    pub mode: Mode,
    /// Oscillator handling on the way to `mode`.
    pub osc_power: OscPower,
    pub dividers: Dividers,
    pub peripheral_clock: PeripheralClockSource,
    pub osc32k: Osc32kSource,
    /// Enable the OSC0 loss-of-clock monitor once the profile is applied.
    pub clock_monitor: bool,
}

/// Every profile, indexed by [`ProfileId`].
pub static PROFILES: [ClockProfile; 3] = [
    ClockProfile {
        id: ProfileId::Full,
        mode: Mode::Pee,
        osc_power: OscPower::Enabled,
        dividers: Dividers::new(1, 2, 3, 6),
        peripheral_clock: PeripheralClockSource::Pll0,
        osc32k: Osc32kSource::Rtc,
        clock_monitor: true,
    },
    ClockProfile {
        id: ProfileId::Reduced,
        mode: Mode::Pee,
        osc_power: OscPower::Enabled,
        dividers: Dividers::new(10, 10, 10, 10),
        peripheral_clock: PeripheralClockSource::Pll0,
        osc32k: Osc32kSource::Rtc,
        clock_monitor: true,
    },
    ClockProfile {
        id: ProfileId::LowPower,
        mode: Mode::Blpi,
        osc_power: OscPower::Disabled,
        dividers: Dividers::new(1, 1, 1, 4),
        peripheral_clock: PeripheralClockSource::CoreClock,
        osc32k: Osc32kSource::SystemOscillator,
        clock_monitor: false,
    },
];

/// MCGOUTCLK once the generator has settled in `mode`, with FCRDIV at its normalized value.
pub const fn mcgout_hz(mode: Mode) -> u32 {
    match mode {
        Mode::Pee => PLL_HZ,
        Mode::Pbe | Mode::Fbe => CRYSTAL_HZ,
        Mode::Fbi | Mode::Blpi => FAST_IRC_HZ / 2,
    }
}

impl ClockProfile {
    /// Output frequencies once this profile is applied.
    pub fn frequencies(&self) -> Frequencies {
        Frequencies::from_clkdiv1(mcgout_hz(self.mode), self.dividers.clkdiv1())
    }

    /// Check that no output exceeds its rated maximum.
    pub fn validate_speeds(&self) -> Result<()> {
        self.frequencies().validate_speeds()
    }

    /// The MCG auto-trim machine needs an external reference for its time base and a bus clock
    /// between 8 and 16 MHz.
    pub fn trim_capable(&self) -> bool {
        let bus = self.frequencies().bus;
        self.mode.uses_external_reference() && (8_000_000..=16_000_000).contains(&bus)
    }

    /// The PLL in one profile and not the other.
    pub fn topology_differs(&self, other: &ClockProfile) -> bool {
        self.mode.uses_pll() != other.mode.uses_pll()
    }
}
