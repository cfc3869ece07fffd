//! Clock control for Kinetis K60F (120 MHz) MCUs: multipurpose clock generator (MCG) mode
//! sequencing, predefined clock profiles, CPU power modes, LLWU wake flags and MCG auto-trim.
//!
//! All hardware access goes through the [`regs::Registers`] trait. On the MCU, use
//! `regs::Mmio`; on a host, [`mock::MockRegisters`] simulates the clock generator.
//!
//! Enable the `defmt` feature for log output and `defmt::Format` on public types.

#![cfg_attr(not(test), no_std)]

// This mod MUST go first, so that the others see its macros.
mod fmt;

pub mod clocks;
pub mod error;
pub mod low_power;
pub mod mock;
pub mod regs;
pub mod trim;
pub mod util;

pub use clocks::{Clocks, Mode, ProfileId};
pub use error::{Error, Result};
pub use low_power::{PowerMode, WakeFlags};
pub use trim::TrimTarget;
