//! MCG auto-trim: calibrates the slow or fast internal reference against the bus clock.
//! K60F RM, section 25.4.2: `MCG Auto TRIM (ATM)`.

use crate::{
    clocks::ClockProfile,
    error::{Error, Result, WaitFor},
    regs::{Reg, Registers, mcg},
    util::{Timeout, wait_until},
};

/// Which internal reference to trim.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TrimTarget {
    /// 32 kHz slow internal reference.
    Slow,
    /// 4 MHz fast internal reference.
    Fast,
}

impl From<u8> for TrimTarget {
    /// 0 selects the slow reference; anything else the fast one.
    fn from(value: u8) -> Self {
        match value {
            0 => Self::Slow,
            _ => Self::Fast,
        }
    }
}

impl TrimTarget {
    /// Auto-trim compare value, `MCG_ATCVH:MCG_ATCVL`. The expected count of reference
    /// periods in the bus-clock sample window.
    pub const fn compare_value(self) -> u16 {
        match self {
            Self::Slow => 0x1E0A,
            Self::Fast => 0x1F80,
        }
    }
}

/// Run one auto-trim cycle on `target`, blocking until the hardware finishes.
///
/// Returns [`Error::Speed`] without touching the hardware unless `active` has an external
/// reference and a bus clock in the 8 - 16 MHz range the trim machine needs. Returns
/// [`Error::Failed`] if the hardware reports the trim failed.
pub fn auto_trim<R: Registers, T: Timeout>(
    regs: &mut R,
    timeout: &mut T,
    target: TrimTarget,
    active: &ClockProfile,
) -> Result<()> {
    if !active.trim_capable() {
        return Err(Error::Speed);
    }

    let [high, low] = target.compare_value().to_be_bytes();
    regs.write(Reg::McgAtcvh, high as u32);
    regs.write(Reg::McgAtcvl, low as u32);

    // ATMF is write-1-to-clear, so this also clears a stale failure flag.
    regs.modify(Reg::McgSc, |v| {
        let v = v | mcg::SC_ATME.mask();
        match target {
            TrimTarget::Slow => v & !mcg::SC_ATMS.mask(),
            TrimTarget::Fast => v | mcg::SC_ATMS.mask(),
        }
    });

    wait_until(regs, timeout, Reg::McgSc, mcg::SC_ATME, 0, WaitFor::AutoTrim)?;

    if mcg::SC_ATMF.is_set(regs.read(Reg::McgSc)) {
        warn!("auto-trim of {} failed", target);
        return Err(Error::Failed);
    }

    debug!("auto-trim of {} complete", target);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        clocks::ProfileId,
        mock::{MockRegisters, TrimBehavior},
        util::IterationLimit,
    };

    #[test]
    fn trim_needs_an_external_reference_and_slow_bus() {
        let mut regs = MockRegisters::booted();
        for id in [ProfileId::Full, ProfileId::LowPower] {
            let writes = regs.write_count();
            assert_eq!(
                auto_trim(&mut regs, &mut IterationLimit::default(), TrimTarget::Fast, id.profile()),
                Err(Error::Speed)
            );
            assert_eq!(regs.write_count(), writes);
        }
    }

    #[test]
    fn slow_trim_programs_compare_value_and_select() {
        let mut regs = MockRegisters::booted();
        auto_trim(
            &mut regs,
            &mut IterationLimit::default(),
            TrimTarget::Slow,
            ProfileId::Reduced.profile(),
        )
        .unwrap();

        assert_eq!(regs.peek(Reg::McgAtcvh), 0x1E);
        assert_eq!(regs.peek(Reg::McgAtcvl), 0x0A);
        assert!(!mcg::SC_ATMS.is_set(regs.peek(Reg::McgSc)));
        assert!(!mcg::SC_ATME.is_set(regs.peek(Reg::McgSc)));
    }

    #[test]
    fn fast_trim_selects_fast_reference() {
        let mut regs = MockRegisters::booted();
        auto_trim(
            &mut regs,
            &mut IterationLimit::default(),
            TrimTarget::Fast,
            ProfileId::Reduced.profile(),
        )
        .unwrap();

        assert_eq!(regs.peek(Reg::McgAtcvh), 0x1F);
        assert_eq!(regs.peek(Reg::McgAtcvl), 0x80);
        assert!(mcg::SC_ATMS.is_set(regs.peek(Reg::McgSc)));
    }

    #[test]
    fn hardware_failure_is_reported_then_cleared_on_retry() {
        let mut regs = MockRegisters::booted();
        let profile = ProfileId::Reduced.profile();
        regs.set_trim_behavior(TrimBehavior::Fail);
        assert_eq!(
            auto_trim(&mut regs, &mut IterationLimit::default(), TrimTarget::Slow, profile),
            Err(Error::Failed)
        );

        regs.set_trim_behavior(TrimBehavior::Pass);
        assert_eq!(
            auto_trim(&mut regs, &mut IterationLimit::default(), TrimTarget::Slow, profile),
            Ok(())
        );
    }

    #[test]
    fn stuck_trim_times_out() {
        let mut regs = MockRegisters::booted();
        regs.set_trim_behavior(TrimBehavior::Stall);
        assert_eq!(
            auto_trim(
                &mut regs,
                &mut IterationLimit::new(20),
                TrimTarget::Fast,
                ProfileId::Reduced.profile()
            ),
            Err(Error::Timeout(WaitFor::AutoTrim))
        );
    }

    #[test]
    fn target_from_u8() {
        assert_eq!(TrimTarget::from(0), TrimTarget::Slow);
        assert_eq!(TrimTarget::from(1), TrimTarget::Fast);
        assert_eq!(TrimTarget::from(7), TrimTarget::Fast);
    }
}
