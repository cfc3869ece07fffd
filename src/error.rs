//! Common error definitions.

use crate::clocks::Mode;

/// Alias for Result<T, Error>.
pub type Result<T> = core::result::Result<T, Error>;

/// The hardware status condition a blocking wait was polling for.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WaitFor {
    /// OSC0 reports its crystal is running (`MCG_S[OSCINIT0]`).
    OscillatorRunning,
    /// The FLL reference reports the external clock (`MCG_S[IREFST] = 0`).
    ExternalReference,
    /// The FLL reference reports the internal clock (`MCG_S[IREFST] = 1`).
    InternalReference,
    /// The fast internal reference is selected (`MCG_S[IRCST] = 1`).
    FastInternalReference,
    /// `MCG_S[CLKST]` reports the requested MCGOUTCLK source.
    ClockSource(u8),
    /// PLL0 lock (`MCG_S[LOCK0]`).
    PllLock,
    /// The auto-trim machine clears `MCG_SC[ATME]`.
    AutoTrim,
}

/// Collection of all errors that can occur.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// A clock profile id outside the defined set was requested. Nothing was changed.
    Range,
    /// An operation mode outside RUN, WAIT, SLEEP and STOP was requested. Nothing was changed.
    ParamMode,
    /// The operation isn't available in the active clock configuration, or a configuration
    /// exceeds a rated frequency.
    Speed,
    /// The hardware reported a failed calibration.
    Failed,
    /// A status bit didn't reach the expected value within the polling budget.
    ///
    /// This is returned when a bounded loop exceeds its alotted budget.
    Timeout(WaitFor),
    /// A mode entry procedure completed, but the generator reports a different mode.
    UnexpectedMode { expected: Mode, found: Mode },
}
