//! This is an internal module that contains utility functionality used by other modules:
//! bounded polling of hardware status bits.

use cfg_if::cfg_if;

use crate::{
    error::{Error, Result, WaitFor},
    regs::{Field, Reg, Registers},
};

/// Default number of polls before a status wait gives up. Crystal start-up and PLL lock take
/// well under a millisecond at the reset clock, which this covers with a wide margin.
pub const MAX_ITERS: u32 = 300_000;

/// A budget for one blocking wait.
pub trait Timeout {
    /// Called once before polling starts.
    fn start(&mut self);

    /// Called after each unsuccessful poll. Returns `true` once the budget is spent.
    fn expired(&mut self) -> bool;
}

impl<T: Timeout + ?Sized> Timeout for &mut T {
    fn start(&mut self) {
        (**self).start()
    }

    fn expired(&mut self) -> bool {
        (**self).expired()
    }
}

/// Gives up after a fixed number of polls.
#[derive(Clone, Copy, Debug)]
pub struct IterationLimit {
    max: u32,
    count: u32,
}

impl IterationLimit {
    pub const fn new(max: u32) -> Self {
        Self { max, count: 0 }
    }
}

impl Default for IterationLimit {
    fn default() -> Self {
        Self::new(MAX_ITERS)
    }
}

impl Timeout for IterationLimit {
    fn start(&mut self) {
        self.count = 0;
    }

    fn expired(&mut self) -> bool {
        self.count = self.count.saturating_add(1);
        self.count >= self.max
    }
}

/// A free-running, wrapping tick counter.
pub trait TimeSource {
    fn now(&mut self) -> u32;
}

/// Gives up once `budget` ticks of a [`TimeSource`] have elapsed.
pub struct TickTimeout<S> {
    source: S,
    budget: u32,
    started: u32,
}

impl<S: TimeSource> TickTimeout<S> {
    pub fn new(source: S, budget: u32) -> Self {
        Self {
            source,
            budget,
            started: 0,
        }
    }

    pub fn release(self) -> S {
        self.source
    }
}

impl<S: TimeSource> Timeout for TickTimeout<S> {
    fn start(&mut self) {
        self.started = self.source.now();
    }

    fn expired(&mut self) -> bool {
        self.source.now().wrapping_sub(self.started) >= self.budget
    }
}

cfg_if! {
    if #[cfg(cortex_m_hw)] {
        use cortex_m::peripheral::{DCB, DWT};

        /// The core's DWT cycle counter. Enables the counter when created.
        pub struct DwtCycles {
            _private: (),
        }

        impl DwtCycles {
            pub fn new(dcb: &mut DCB, dwt: &mut DWT) -> Self {
                dcb.enable_trace();
                dwt.enable_cycle_counter();
                Self { _private: () }
            }
        }

        impl TimeSource for DwtCycles {
            fn now(&mut self) -> u32 {
                DWT::cycle_count()
            }
        }
    }
}

/// Poll `reg` until `field` reads `expected`, or the budget runs out.
pub(crate) fn wait_until<R, T>(
    regs: &mut R,
    timeout: &mut T,
    reg: Reg,
    field: Field,
    expected: u32,
    what: WaitFor,
) -> Result<()>
where
    R: Registers,
    T: Timeout,
{
    timeout.start();
    loop {
        if regs.read_field(reg, field) == expected {
            return Ok(());
        }
        if timeout.expired() {
            warn!("timed out waiting for {}", what);
            return Err(Error::Timeout(what));
        }
    }
}
