//! Walks the generator from its current mode to a target mode, one legal hop at a time.

use crate::{
    clocks::{
        Mode, Route,
        driver::{self, OscPower},
    },
    error::{Error, Result},
    regs::Registers,
    util::Timeout,
};

/// Drive the clock generator to `target`, entering each intermediate mode named by
/// [`crate::clocks::TRANSITION_MATRIX`]. Returns the modes visited.
///
/// If already in `target`, nothing is written. After each hop the live mode is read back; if
/// the hardware didn't land where the hop said it would, this fails with
/// [`Error::UnexpectedMode`] and the generator is left wherever it ended up.
pub fn drive_to<R: Registers, T: Timeout>(
    regs: &mut R,
    timeout: &mut T,
    target: Mode,
    osc_power: OscPower,
) -> Result<Route> {
    let mut current = Mode::current(regs);
    let mut route = Route::new(current);

    while current != target {
        let next = current.next(target);
        debug!("clock mode {} -> {}", current, next);

        driver::enter(regs, timeout, next, osc_power)?;

        let found = Mode::current(regs);
        if found != next {
            warn!("expected clock mode {}, found {}", next, found);
            return Err(Error::UnexpectedMode {
                expected: next,
                found,
            });
        }

        route.push(next);
        current = next;
    }

    Ok(route)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::WaitFor,
        mock::MockRegisters,
        regs::mcg,
        util::IterationLimit,
    };

    #[test]
    fn pee_to_blpi_visits_every_intermediate_mode() {
        let mut regs = MockRegisters::booted();
        let route = drive_to(&mut regs, &mut IterationLimit::default(), Mode::Blpi, OscPower::Disabled)
            .unwrap();

        assert_eq!(
            route.as_slice(),
            &[Mode::Pee, Mode::Pbe, Mode::Fbe, Mode::Fbi, Mode::Blpi]
        );
        assert_eq!(Mode::current(&mut regs), Mode::Blpi);
        assert_eq!(
            regs.mode_trace(),
            &[Mode::Pee, Mode::Pbe, Mode::Fbe, Mode::Fbi, Mode::Blpi]
        );
    }

    #[test]
    fn blpi_back_to_pee() {
        let mut regs = MockRegisters::booted();
        let mut limit = IterationLimit::default();
        drive_to(&mut regs, &mut limit, Mode::Blpi, OscPower::Disabled).unwrap();

        let route = drive_to(&mut regs, &mut limit, Mode::Pee, OscPower::Enabled).unwrap();
        assert_eq!(
            route.as_slice(),
            &[Mode::Blpi, Mode::Fbi, Mode::Fbe, Mode::Pbe, Mode::Pee]
        );
    }

    #[test]
    fn already_there_writes_nothing() {
        let mut regs = MockRegisters::booted();
        let writes = regs.write_count();
        let route =
            drive_to(&mut regs, &mut IterationLimit::default(), Mode::Pee, OscPower::Enabled).unwrap();

        assert_eq!(route.hops(), 0);
        assert_eq!(regs.write_count(), writes);
    }

    #[test]
    fn from_reset_reaches_pee_through_fbe() {
        // Reset leaves CLKS = 0 with the FLL selected, which reads as PEE. Start from FBI instead.
        let mut regs = MockRegisters::new();
        driver::enter(&mut regs, &mut IterationLimit::default(), Mode::Fbi, OscPower::Enabled)
            .unwrap();

        let route =
            drive_to(&mut regs, &mut IterationLimit::default(), Mode::Pee, OscPower::Enabled).unwrap();
        assert_eq!(
            route.as_slice(),
            &[Mode::Fbi, Mode::Fbe, Mode::Pbe, Mode::Pee]
        );
    }

    #[test]
    fn a_hop_that_times_out_stops_the_walk() {
        let mut regs = MockRegisters::booted();
        regs.hold_status_low(mcg::S_OSCINIT0.mask());

        let res = drive_to(&mut regs, &mut IterationLimit::new(50), Mode::Fbi, OscPower::Enabled);
        assert_eq!(res, Err(Error::Timeout(WaitFor::OscillatorRunning)));
        // PBE was reached before FBE stalled.
        assert_eq!(regs.mode_trace().first(), Some(&Mode::Pee));
        assert!(regs.mode_trace().contains(&Mode::Pbe));
    }

    #[test]
    fn landing_in_the_wrong_mode_is_reported() {
        let mut regs = MockRegisters::booted();
        // The driver's status waits pass, but C2 keeps LP pinned, so FBI reads back as BLPI.
        regs.pin_bits(crate::regs::Reg::McgC2, mcg::C2_LP.mask());

        let res = drive_to(&mut regs, &mut IterationLimit::default(), Mode::Fbi, OscPower::Enabled);
        assert_eq!(
            res,
            Err(Error::UnexpectedMode {
                expected: Mode::Fbi,
                found: Mode::Blpi
            })
        );
    }
}
