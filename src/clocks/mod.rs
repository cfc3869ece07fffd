//! Clock generator (MCG) mode sequencing and clock profiles for the K60F.
//!
//! The MCG runs in one of five modes ([`Mode`]) and only certain mode-to-mode transitions are
//! legal. [`drive_to`] walks the generator to a target mode through [`TRANSITION_MATRIX`].
//! [`Clocks`] owns the registers, applies the predefined [`PROFILES`], and is the entry point
//! for power-mode changes and auto-trim.
//!
//! ```ignore
//! let mut clocks = Clocks::init(unsafe { Mmio::steal() }, IterationLimit::default())?;
//! clocks.set_profile(ProfileId::LowPower as u8)?;
//! ```

mod config;
mod driver;
pub mod frequency;
mod mode;
mod profile;
mod sequencer;

pub use config::Clocks;
pub use driver::{OscPower, enter};
pub use frequency::Frequencies;
pub use mode::{MAX_HOPS, Mode, Route, TRANSITION_MATRIX};
pub use profile::{
    ClockProfile, Dividers, Osc32kSource, PLL_HZ, PROFILES, PeripheralClockSource, ProfileId,
    SAFE_DIVIDERS, mcgout_hz,
};
pub use sequencer::drive_to;
