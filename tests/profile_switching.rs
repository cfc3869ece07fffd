//! End-to-end profile switching against the simulated clock generator.

use kinetis_clocks::{
    Clocks, Error, Mode, ProfileId,
    clocks::{PROFILES, SAFE_DIVIDERS},
    error::WaitFor,
    mock::MockRegisters,
    regs::{Reg, mcg},
    util::IterationLimit,
};

fn booted() -> Clocks<MockRegisters, IterationLimit> {
    Clocks::new(MockRegisters::booted(), IterationLimit::default())
}

fn snapshot(regs: &MockRegisters) -> Vec<u32> {
    Reg::ALL.iter().map(|r| regs.peek(*r)).collect()
}

#[test]
fn full_to_low_power_walks_down_through_every_mode() {
    let mut clocks = booted();
    clocks.set_profile(2).unwrap();

    assert_eq!(
        clocks.regs().mode_trace(),
        &[Mode::Pee, Mode::Pbe, Mode::Fbe, Mode::Fbi, Mode::Blpi]
    );
    assert_eq!(clocks.profile(), ProfileId::LowPower);
    assert_eq!(clocks.frequencies().core, 2_000_000);
    assert_eq!(clocks.frequencies().flash, 500_000);
}

#[test]
fn low_power_to_full_walks_back_up() {
    let mut clocks = booted();
    clocks.set_profile(2).unwrap();
    clocks.regs().clear_trace();

    clocks.set_profile(0).unwrap();
    assert_eq!(
        clocks.regs().mode_trace(),
        &[Mode::Blpi, Mode::Fbi, Mode::Fbe, Mode::Pbe, Mode::Pee]
    );
    assert_eq!(clocks.frequencies(), ProfileId::Full.profile().frequencies());
}

#[test]
fn out_of_range_ids_are_rejected() {
    let mut clocks = booted();
    let before = snapshot(clocks.regs());

    for id in [3, 4, 100, 255] {
        assert_eq!(clocks.set_profile(id), Err(Error::Range));
    }
    assert_eq!(clocks.profile(), ProfileId::Full);
    assert_eq!(snapshot(clocks.regs()), before);
}

#[test]
fn applying_a_profile_twice_is_idempotent() {
    for profile in &PROFILES {
        let mut clocks = booted();
        clocks.set_profile(profile.id as u8).unwrap();
        let once = snapshot(clocks.regs());

        clocks.set_profile(profile.id as u8).unwrap();
        assert_eq!(snapshot(clocks.regs()), once, "{:?}", profile.id);
        assert_eq!(clocks.profile(), profile.id);
    }
}

#[test]
fn every_profile_lands_in_its_mode_with_its_frequencies() {
    for from in &PROFILES {
        for to in &PROFILES {
            let mut clocks = booted();
            clocks.set_profile(from.id as u8).unwrap();
            clocks.set_profile(to.id as u8).unwrap();

            assert_eq!(clocks.mode(), to.mode, "{:?} -> {:?}", from.id, to.id);
            assert_eq!(clocks.frequencies(), to.frequencies());
            assert_eq!(
                mcg::C6_CME0.is_set(clocks.regs().peek(Reg::McgC6)),
                to.clock_monitor
            );
        }
    }
}

#[test]
fn stalled_oscillator_reports_timeout_and_leaves_safe_dividers() {
    let mut clocks = Clocks::new(MockRegisters::booted(), IterationLimit::new(1_000));
    clocks.set_profile(2).unwrap();
    clocks.regs().hold_status_low(mcg::S_OSCINIT0.mask());

    assert_eq!(
        clocks.set_profile(0),
        Err(Error::Timeout(WaitFor::OscillatorRunning))
    );
    assert_eq!(clocks.profile(), ProfileId::LowPower);
    assert_eq!(clocks.regs().peek(Reg::SimClkdiv1), SAFE_DIVIDERS.clkdiv1());
}

#[test]
fn pll_that_never_locks_reports_timeout() {
    let mut clocks = Clocks::new(MockRegisters::booted(), IterationLimit::new(1_000));
    clocks.set_profile(2).unwrap();
    clocks.regs().hold_status_low(mcg::S_LOCK0.mask());

    assert_eq!(clocks.set_profile(1), Err(Error::Timeout(WaitFor::PllLock)));
    // PLLS is set before the lock wait, so the generator reads as PBE.
    assert_eq!(clocks.mode(), Mode::Pbe);
}
