//! This module contains code used to place the MCU in low power modes, and to find out what
//! woke it. K60F RM, chapter 14: `Power Management`, and chapter 16: `Low-Leakage Wakeup Unit`.

use crate::{
    clocks::{ClockProfile, Mode},
    error::{Error, Result, WaitFor},
    regs::{Reg, Registers, llwu, mcg, scb, smc},
    util::{Timeout, wait_until},
};

/// CPU operating modes. The values are the ones accepted by
/// [`crate::clocks::Clocks::enter_power_mode`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum PowerMode {
    Run = 0,
    /// Core clock gated until an interrupt. Clocks keep running.
    Wait = 1,
    /// Normal stop, re-entered on exit from each ISR.
    Sleep = 2,
    /// Low-leakage stop. Any LLWU source wakes the MCU.
    Stop = 3,
}

impl TryFrom<u8> for PowerMode {
    type Error = Error;

    fn try_from(mode: u8) -> Result<Self> {
        match mode {
            0 => Ok(Self::Run),
            1 => Ok(Self::Wait),
            2 => Ok(Self::Sleep),
            3 => Ok(Self::Stop),
            _ => Err(Error::ParamMode),
        }
    }
}

/// `SMC_PMCTRL[STOPM]` encodings.
const STOPM_NORMAL: u32 = 0b000;
const STOPM_LLS: u32 = 0b011;

/// Enter `mode`. `active` is the clock profile in effect; RUN uses it to decide whether the PLL
/// needs to be re-engaged.
pub fn enter<R: Registers, T: Timeout>(
    regs: &mut R,
    timeout: &mut T,
    mode: PowerMode,
    active: &ClockProfile,
) -> Result<()> {
    debug!("entering power mode {}", mode);

    match mode {
        PowerMode::Run => run(regs, timeout, active),
        PowerMode::Wait => {
            wait(regs);
            Ok(())
        }
        PowerMode::Sleep => {
            sleep(regs);
            Ok(())
        }
        PowerMode::Stop => {
            stop(regs);
            Ok(())
        }
    }
}

/// Return to RUN. Waking from a deep sleep leaves the generator in PBE; if the active profile
/// runs from the PLL, switch MCGOUTCLK back to it.
fn run<R: Registers, T: Timeout>(regs: &mut R, timeout: &mut T, active: &ClockProfile) -> Result<()> {
    regs.clear_bits(
        Reg::ScbScr,
        scb::SCR_SLEEPDEEP.mask() | scb::SCR_SLEEPONEXIT.mask(),
    );

    if active.mode == Mode::Pee && Mode::current(regs) == Mode::Pbe {
        // CLKS = 0 with PLLS set selects the PLL output.
        regs.clear_bits(Reg::McgC1, mcg::C1_CLKS.mask() | mcg::C1_IREFS.mask());
        wait_until(regs, timeout, Reg::McgS, mcg::S_LOCK0, 1, WaitFor::PllLock)?;
    }

    Ok(())
}

/// Ordinary sleep: SLEEPDEEP = 0 and SLEEPONEXIT = 0, then WFI.
fn wait<R: Registers>(regs: &mut R) {
    regs.clear_bits(
        Reg::ScbScr,
        scb::SCR_SLEEPDEEP.mask() | scb::SCR_SLEEPONEXIT.mask(),
    );
    regs.wait_for_interrupt();
}

/// Normal stop with sleep-on-exit: the core stops again as soon as the lowest-priority ISR
/// returns.
fn sleep<R: Registers>(regs: &mut R) {
    regs.set_bits(Reg::ScbScr, scb::SCR_SLEEPDEEP.mask());
    regs.write_field(Reg::SmcPmctrl, smc::PMCTRL_STOPM, STOPM_NORMAL);
    // Read back so the mode write has landed before the core stops.
    let _ = regs.read(Reg::SmcPmctrl);
    regs.set_bits(Reg::ScbScr, scb::SCR_SLEEPONEXIT.mask());
    regs.wait_for_interrupt();
}

/// Low-leakage stop. Clears stale wake flags first so [`wake_flags`] reports only this wake.
fn stop<R: Registers>(regs: &mut R) {
    regs.write(Reg::LlwuF1, 0xFF);
    regs.write(Reg::LlwuF2, 0xFF);
    regs.write(Reg::LlwuF3, 0xFF);
    regs.set_bits(Reg::LlwuFilt1, llwu::FILT_FILTF.mask());
    regs.set_bits(Reg::LlwuFilt2, llwu::FILT_FILTF.mask());

    regs.clear_bits(Reg::ScbScr, scb::SCR_SLEEPONEXIT.mask());
    regs.set_bits(Reg::ScbScr, scb::SCR_SLEEPDEEP.mask());
    regs.write_field(Reg::SmcPmctrl, smc::PMCTRL_STOPM, STOPM_LLS);
    let _ = regs.read(Reg::SmcPmctrl);
    regs.wait_for_interrupt();
}

/// Read the LLWU flags.
pub fn wake_flags<R: Registers>(regs: &mut R) -> WakeFlags {
    let f1 = regs.read(Reg::LlwuF1) & 0xFF;
    let f2 = regs.read(Reg::LlwuF2) & 0xFF;
    let f3 = regs.read(Reg::LlwuF3) & 0xFF;
    let filt1 = llwu::FILT_FILTF.is_set(regs.read(Reg::LlwuFilt1));
    let filt2 = llwu::FILT_FILTF.is_set(regs.read(Reg::LlwuFilt2));

    WakeFlags(f1 | f2 << 8 | f3 << 16 | (filt1 as u32) << 24 | (filt2 as u32) << 25)
}

/// Wake-source bitmask: bits 0-15 are external pins (`LLWU_F1`, `LLWU_F2`), bits 16-23 internal
/// modules (`LLWU_F3`), bits 24 and 25 the two pin filters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct WakeFlags(u32);

/// One source recorded in [`WakeFlags`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WakeSource {
    /// External pin `LLWU_Pn`, 0-15.
    Pin(u8),
    /// Internal module `LLWU_Mn`, 0-7.
    Module(u8),
    /// Pin filter 1 or 2.
    Filter(u8),
}

impl WakeSource {
    const fn bit(self) -> u32 {
        match self {
            Self::Pin(n) => n as u32,
            Self::Module(n) => 16 + n as u32,
            Self::Filter(n) => 23 + n as u32,
        }
    }

    fn from_bit(bit: u32) -> Option<Self> {
        match bit {
            0..=15 => Some(Self::Pin(bit as u8)),
            16..=23 => Some(Self::Module((bit - 16) as u8)),
            24 | 25 => Some(Self::Filter((bit - 23) as u8)),
            _ => None,
        }
    }
}

impl WakeFlags {
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn contains(self, source: WakeSource) -> bool {
        WakeSource::from_bit(source.bit()) == Some(source) && self.0 & (1 << source.bit()) != 0
    }

    pub fn pin(self, n: u8) -> bool {
        n < 16 && self.contains(WakeSource::Pin(n))
    }

    pub fn module(self, n: u8) -> bool {
        n < 8 && self.contains(WakeSource::Module(n))
    }

    /// `n` is 1 or 2.
    pub fn filter(self, n: u8) -> bool {
        (1..=2).contains(&n) && self.contains(WakeSource::Filter(n))
    }

    /// Every source set, pins first.
    pub fn iter(self) -> impl Iterator<Item = WakeSource> {
        (0..26)
            .filter(move |bit| self.0 & (1 << bit) != 0)
            .filter_map(WakeSource::from_bit)
    }
}

impl From<WakeFlags> for u32 {
    fn from(flags: WakeFlags) -> u32 {
        flags.0
    }
}
