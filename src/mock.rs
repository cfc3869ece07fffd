//! A simulated clock generator for host-side tests.
//!
//! [`MockRegisters`] keeps a register file indexed by [`Reg`] and derives `MCG_S` from the
//! control registers the way the hardware does once it has settled: `CLKST` follows `CLKS`
//! (and `PLLS`), `OSCINIT0` follows `EREFS0`, `IREFST` follows `IREFS`, `IRCST` follows `IRCS`,
//! and `LOCK0` asserts while the PLL is selected with an external reference. Write-1-to-clear
//! flags behave like the real ones.
//!
//! The mock also records every mode it passes through and the highest core, bus, FlexBus and
//! flash frequencies seen after any register write.

use crate::{
    clocks::{
        Mode,
        frequency::{ClockRegisterValues, Frequencies},
    },
    low_power::WakeFlags,
    regs::{Reg, Registers, Width, llwu, mcg, scb},
    util::TimeSource,
};

/// Number of mode changes [`MockRegisters::mode_trace`] keeps. Later changes are dropped.
pub const TRACE_CAPACITY: usize = 64;

/// How the simulated auto-trim machine finishes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TrimBehavior {
    /// `ATME` clears on the next read of `MCG_SC`, with `ATMF` clear.
    #[default]
    Pass,
    /// `ATME` clears on the next read, with `ATMF` set.
    Fail,
    /// `ATME` never clears.
    Stall,
}

/// Simulated K60F clock registers.
#[derive(Clone, Debug)]
pub struct MockRegisters {
    values: [u32; Reg::COUNT],
    pinned: [u32; Reg::COUNT],
    held_low: u32,
    trim: TrimBehavior,
    trim_running: bool,
    queued_wake: Option<WakeFlags>,
    wfi_count: u32,
    interrupts_enabled: bool,
    writes: u32,
    trace: [Mode; TRACE_CAPACITY],
    trace_len: usize,
    peak: Frequencies,
}

fn reset_value(reg: Reg) -> u32 {
    match reg {
        // FEI: FLL from the slow internal reference.
        Reg::McgC1 => 0x04,
        Reg::McgC2 => 0x80,
        Reg::McgSc => 0x02,
        Reg::SimClkdiv1 => 0x0001_0000,
        _ => 0,
    }
}

impl Default for MockRegisters {
    fn default() -> Self {
        Self::new()
    }
}

impl MockRegisters {
    /// Registers in their reset state.
    pub fn new() -> Self {
        let mut values = [0; Reg::COUNT];
        for reg in Reg::ALL {
            values[reg.index()] = reset_value(*reg);
        }

        let mut result = Self {
            values,
            pinned: [0; Reg::COUNT],
            held_low: 0,
            trim: TrimBehavior::Pass,
            trim_running: false,
            queued_wake: None,
            wfi_count: 0,
            interrupts_enabled: true,
            writes: 0,
            trace: [Mode::Fbi; TRACE_CAPACITY],
            trace_len: 0,
            peak: Frequencies::default(),
        };
        result.clear_trace();
        result
    }

    /// Registers as left by [`crate::clocks::Clocks::init`]: PEE at 120 MHz with the full-speed
    /// dividers and the clock monitor on.
    pub fn booted() -> Self {
        let mut result = Self::new();
        for (reg, value) in [
            (Reg::McgC1, 0x1A),
            (Reg::McgC2, 0x2D),
            (Reg::McgC5, 0x00),
            (Reg::McgC6, 0x6E),
            (Reg::Osc0Cr, 0x86),
            (Reg::Osc1Cr, 0x80),
            (Reg::SimSopt1, 1 << 19),
            (Reg::SimSopt2, 1 << 16),
            (Reg::SimClkdiv1, 0x0125_0000),
        ] {
            result.values[reg.index()] = value;
        }
        result.clear_trace();
        result
    }

    /// The stored value of `reg`, or the derived status for `MCG_S`. No side effects.
    pub fn peek(&self, reg: Reg) -> u32 {
        match reg {
            Reg::McgS => self.status(),
            _ => self.values[reg.index()],
        }
    }

    /// Overwrite `reg` directly, bypassing write-1-to-clear handling and the write count.
    pub fn force(&mut self, reg: Reg, value: u32) {
        self.values[reg.index()] = value;
        self.observe();
    }

    /// Keep the `MCG_S` bits in `mask` reading as 0, whatever the control registers say.
    pub fn hold_status_low(&mut self, mask: u32) {
        self.held_low |= mask;
    }

    pub fn release_status(&mut self) {
        self.held_low = 0;
    }

    /// Keep the bits in `mask` set in `reg` across all later writes.
    pub fn pin_bits(&mut self, reg: Reg, mask: u32) {
        self.pinned[reg.index()] |= mask;
        self.values[reg.index()] |= mask;
        self.observe();
    }

    pub fn set_trim_behavior(&mut self, behavior: TrimBehavior) {
        self.trim = behavior;
    }

    /// Latch `flags` into the LLWU flag registers on the next WFI.
    pub fn queue_wake(&mut self, flags: WakeFlags) {
        self.queued_wake = Some(flags);
    }

    pub fn wfi_count(&self) -> u32 {
        self.wfi_count
    }

    pub fn interrupts_enabled(&self) -> bool {
        self.interrupts_enabled
    }

    /// Number of register writes so far.
    pub fn write_count(&self) -> u32 {
        self.writes
    }

    /// Each mode the generator has been in, oldest first, without repeats.
    pub fn mode_trace(&self) -> &[Mode] {
        &self.trace[..self.trace_len]
    }

    /// Restart the trace and the peak frequencies from the current state.
    pub fn clear_trace(&mut self) {
        self.trace_len = 0;
        self.peak = Frequencies::default();
        self.observe();
    }

    /// Highest value of each clock output seen since the last [`Self::clear_trace`].
    pub fn peak_frequencies(&self) -> Frequencies {
        self.peak
    }

    /// Output frequencies for the current register values.
    pub fn frequencies(&self) -> Frequencies {
        Frequencies::from_values(&self.clock_values())
    }

    fn mode(&self) -> Mode {
        Mode::from_registers(
            self.values[Reg::McgC1.index()],
            self.values[Reg::McgC2.index()],
            self.values[Reg::McgC6.index()],
        )
    }

    fn clock_values(&self) -> ClockRegisterValues {
        let v = |reg: Reg| self.values[reg.index()];
        ClockRegisterValues {
            c1: v(Reg::McgC1),
            c2: v(Reg::McgC2),
            c4: v(Reg::McgC4),
            c5: v(Reg::McgC5),
            c6: v(Reg::McgC6),
            c7: v(Reg::McgC7),
            sc: v(Reg::McgSc),
            clkdiv1: v(Reg::SimClkdiv1),
        }
    }

    fn status(&self) -> u32 {
        let c1 = self.values[Reg::McgC1.index()];
        let c2 = self.values[Reg::McgC2.index()];
        let c6 = self.values[Reg::McgC6.index()];
        let c7 = self.values[Reg::McgC7.index()];

        let plls = mcg::C6_PLLS.is_set(c6);
        let irefs = mcg::C1_IREFS.is_set(c1);

        let clkst = match mcg::C1_CLKS.get(c1) {
            mcg::CLKS_FLL_PLL if plls => mcg::CLKST_PLL,
            clks => clks,
        };

        let mut s = mcg::S_CLKST.bits(clkst);
        if mcg::C2_EREFS0.is_set(c2) && mcg::C7_OSCSEL.get(c7) == 0 {
            s |= mcg::S_OSCINIT0.mask();
        }
        if irefs {
            s |= mcg::S_IREFST.mask();
        }
        if mcg::C2_IRCS.is_set(c2) {
            s |= mcg::S_IRCST.mask();
        }
        if plls {
            s |= mcg::S_PLLST.mask();
            if !irefs {
                s |= mcg::S_LOCK0.mask();
            }
        }

        s & !self.held_low
    }

    /// Record the mode and the output frequencies after a change.
    fn observe(&mut self) {
        let mode = self.mode();
        if self.trace_len == 0 || self.trace[self.trace_len - 1] != mode {
            if let Some(slot) = self.trace.get_mut(self.trace_len) {
                *slot = mode;
                self.trace_len += 1;
            }
        }
        self.peak = self.peak.max(self.frequencies());
    }

    fn latch_wake(&mut self, flags: WakeFlags) {
        let bits = flags.bits();
        self.values[Reg::LlwuF1.index()] |= bits & 0xFF;
        self.values[Reg::LlwuF2.index()] |= (bits >> 8) & 0xFF;
        self.values[Reg::LlwuF3.index()] |= (bits >> 16) & 0xFF;
        if bits & (1 << 24) != 0 {
            self.values[Reg::LlwuFilt1.index()] |= llwu::FILT_FILTF.mask();
        }
        if bits & (1 << 25) != 0 {
            self.values[Reg::LlwuFilt2.index()] |= llwu::FILT_FILTF.mask();
        }
    }
}

/// Bits of `old` named in `w1c` survive unless `value` writes 1 to them. Other bits take `value`.
fn write_one_to_clear(old: u32, value: u32, w1c: u32) -> u32 {
    (value & !w1c) | (old & w1c & !value)
}

impl Registers for MockRegisters {
    fn read(&mut self, reg: Reg) -> u32 {
        if reg == Reg::McgSc && self.trim_running && self.trim != TrimBehavior::Stall {
            let sc = &mut self.values[Reg::McgSc.index()];
            *sc &= !mcg::SC_ATME.mask();
            if self.trim == TrimBehavior::Fail {
                *sc |= mcg::SC_ATMF.mask();
            }
            self.trim_running = false;
        }
        self.peek(reg)
    }

    fn write(&mut self, reg: Reg, value: u32) {
        let value = match reg.width() {
            Width::U8 => value & 0xFF,
            Width::U32 => value,
        };
        let old = self.values[reg.index()];

        let new = match reg {
            Reg::McgS => old,
            Reg::McgSc => {
                if mcg::SC_ATME.is_set(value) {
                    self.trim_running = true;
                }
                write_one_to_clear(old, value, mcg::SC_ATMF.mask() | mcg::SC_LOCS0.mask())
            }
            Reg::LlwuF1 | Reg::LlwuF2 | Reg::LlwuF3 => old & !value,
            Reg::LlwuFilt1 | Reg::LlwuFilt2 => {
                write_one_to_clear(old, value, llwu::FILT_FILTF.mask())
            }
            _ => value,
        };

        self.values[reg.index()] = new | self.pinned[reg.index()];
        self.writes += 1;
        self.observe();
    }

    /// Latches any queued wake source. Deep sleep from PEE wakes in PBE, as the hardware does
    /// on exit from LLS.
    fn wait_for_interrupt(&mut self) {
        self.wfi_count += 1;

        let scr = self.values[Reg::ScbScr.index()];
        if scb::SCR_SLEEPDEEP.is_set(scr) && self.mode() == Mode::Pee {
            let c1 = &mut self.values[Reg::McgC1.index()];
            *c1 = mcg::C1_CLKS.replace(*c1, mcg::CLKS_EXTERNAL);
        }

        if let Some(flags) = self.queued_wake.take() {
            self.latch_wake(flags);
        }
        self.observe();
    }

    fn enable_interrupts(&mut self) {
        self.interrupts_enabled = true;
    }

    fn disable_interrupts(&mut self) {
        self.interrupts_enabled = false;
    }
}

/// A tick counter that advances by `step` every time it's read.
#[derive(Clone, Copy, Debug)]
pub struct MockTicks {
    now: u32,
    step: u32,
}

impl MockTicks {
    pub const fn starting_at(start: u32, step: u32) -> Self {
        Self { now: start, step }
    }
}

impl TimeSource for MockTicks {
    fn now(&mut self) -> u32 {
        let now = self.now;
        self.now = self.now.wrapping_add(self.step);
        now
    }
}
