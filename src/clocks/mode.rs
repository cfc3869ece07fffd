//! MCG operating modes, and the fixed table of legal transitions between them.

use crate::regs::{Reg, Registers, mcg};

/// Which source feeds MCGOUTCLK, and whether the FLL/PLL is active.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Mode {
    /// FLL bypassed internal: the internal reference drives MCGOUTCLK, FLL running.
    Fbi = 0,
    /// Bypassed low-power internal: the internal reference drives MCGOUTCLK, FLL/PLL off.
    Blpi = 1,
    /// FLL bypassed external: the external reference drives MCGOUTCLK, FLL running.
    Fbe = 2,
    /// PLL bypassed external: the external reference drives MCGOUTCLK, PLL running.
    Pbe = 3,
    /// PLL engaged external: the PLL output drives MCGOUTCLK.
    Pee = 4,
}

/// Longest route through [`TRANSITION_MATRIX`], in hops.
pub const MAX_HOPS: usize = 4;

use Mode::{Blpi, Fbe, Fbi, Pbe, Pee};

/// `TRANSITION_MATRIX[current][target]` is the next mode to enter from `current` on the way to
/// `target`. Every entry is an edge the hardware allows: FBE and PEE are never adjacent, and
/// the internal modes only reach the PLL modes through FBE.
pub const TRANSITION_MATRIX: [[Mode; 5]; 5] = [
    //  FBI   BLPI  FBE   PBE   PEE    <- target
    [Fbi, Blpi, Fbe, Fbe, Fbe], // from FBI
    [Fbi, Blpi, Fbi, Fbi, Fbi], // from BLPI
    [Fbi, Fbi, Fbe, Pbe, Pbe],  // from FBE
    [Fbe, Fbe, Fbe, Pbe, Pee],  // from PBE
    [Pbe, Pbe, Pbe, Pbe, Pee],  // from PEE
];

impl Mode {
    pub const ALL: [Mode; 5] = [Fbi, Blpi, Fbe, Pbe, Pee];

    /// The next mode to enter from `self` on the way to `target`.
    pub const fn next(self, target: Mode) -> Mode {
        TRANSITION_MATRIX[self as usize][target as usize]
    }

    /// The modes visited, in order, when travelling from `self` to `target`.
    pub fn path(self, target: Mode) -> Route {
        let mut route = Route::new(self);
        let mut current = self;
        while current != target && route.hops() < MAX_HOPS {
            current = current.next(target);
            route.push(current);
        }
        route
    }

    /// Derive the mode from raw `MCG_C1`, `MCG_C2` and `MCG_C6` values.
    ///
    /// `CLKS = 0` is read as PEE: FEI/FEE aren't part of this mode set. The reserved `CLKS = 3`
    /// encoding reads as FBI, which every route can leave from.
    pub fn from_registers(c1: u32, c2: u32, c6: u32) -> Self {
        match mcg::C1_CLKS.get(c1) {
            mcg::CLKS_FLL_PLL => Pee,
            mcg::CLKS_INTERNAL => {
                if mcg::C2_LP.is_set(c2) {
                    Blpi
                } else {
                    Fbi
                }
            }
            mcg::CLKS_EXTERNAL => {
                if mcg::C6_PLLS.is_set(c6) {
                    Pbe
                } else {
                    Fbe
                }
            }
            _ => Fbi,
        }
    }

    /// Read the active mode from the live registers.
    pub fn current<R: Registers>(regs: &mut R) -> Self {
        let c1 = regs.read(Reg::McgC1);
        let c2 = regs.read(Reg::McgC2);
        let c6 = regs.read(Reg::McgC6);
        Self::from_registers(c1, c2, c6)
    }

    /// The PLL is running in this mode.
    pub const fn uses_pll(self) -> bool {
        matches!(self, Pbe | Pee)
    }

    /// MCGOUTCLK is derived from the external reference in this mode.
    pub const fn uses_external_reference(self) -> bool {
        matches!(self, Fbe | Pbe | Pee)
    }
}

/// An ordered list of modes: the starting mode, then each mode entered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Route {
    modes: [Mode; MAX_HOPS + 1],
    len: u8,
}

impl Route {
    pub(crate) fn new(start: Mode) -> Self {
        Self {
            modes: [start; MAX_HOPS + 1],
            len: 1,
        }
    }

    pub(crate) fn push(&mut self, mode: Mode) {
        if let Some(slot) = self.modes.get_mut(self.len as usize) {
            *slot = mode;
            self.len += 1;
        }
    }

    /// The starting mode followed by every mode entered.
    pub fn as_slice(&self) -> &[Mode] {
        &self.modes[..self.len as usize]
    }

    pub fn start(&self) -> Mode {
        self.modes[0]
    }

    /// The last mode entered, or the start if nothing moved.
    pub fn end(&self) -> Mode {
        self.modes[self.len as usize - 1]
    }

    /// Number of modes, including the start.
    pub fn len(&self) -> usize {
        self.len as usize
    }

    /// Number of transitions performed.
    pub fn hops(&self) -> usize {
        self.len() - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_pair_reaches_target_within_max_hops() {
        for from in Mode::ALL {
            for to in Mode::ALL {
                let mut current = from;
                let mut hops = 0;
                while current != to {
                    current = current.next(to);
                    hops += 1;
                    assert!(hops <= MAX_HOPS, "{:?} -> {:?} doesn't converge", from, to);
                }
            }
        }
    }

    #[test]
    fn target_is_a_fixed_point() {
        for m in Mode::ALL {
            assert_eq!(m.next(m), m);
        }
    }

    #[test]
    fn every_hop_is_a_legal_edge() {
        // Edges the MCG state diagram allows, in either direction.
        let legal = |a: Mode, b: Mode| {
            matches!(
                (a, b),
                (Fbi, Blpi) | (Blpi, Fbi) | (Fbi, Fbe) | (Fbe, Fbi) | (Fbe, Pbe) | (Pbe, Fbe)
                    | (Pbe, Pee) | (Pee, Pbe)
            )
        };
        for from in Mode::ALL {
            for to in Mode::ALL {
                let next = from.next(to);
                assert!(next == from || legal(from, next), "{:?} -> {:?}", from, next);
            }
        }
        assert_ne!(Fbe.next(Pee), Pee);
        assert_ne!(Pee.next(Fbe), Fbe);
    }

    #[test]
    fn path_from_pee_to_blpi() {
        assert_eq!(Pee.path(Blpi).as_slice(), &[Pee, Pbe, Fbe, Fbi, Blpi]);
        assert_eq!(Pee.path(Blpi).hops(), 4);
    }

    #[test]
    fn path_always_ends_at_target() {
        for from in Mode::ALL {
            for to in Mode::ALL {
                let route = from.path(to);
                assert_eq!(route.end(), to, "{:?} -> {:?}", from, to);
                assert!(route.hops() <= MAX_HOPS);
            }
        }
        assert_eq!(Blpi.path(Pee).as_slice(), &[Blpi, Fbi, Fbe, Pbe, Pee]);
    }

    #[test]
    fn path_from_fbi_to_pee_goes_through_fbe_and_pbe() {
        assert_eq!(Fbi.path(Pee).as_slice(), &[Fbi, Fbe, Pbe, Pee]);
    }

    #[test]
    fn path_to_self_is_empty() {
        let route = Pbe.path(Pbe);
        assert_eq!(route.hops(), 0);
        assert_eq!(route.start(), Pbe);
        assert_eq!(route.end(), Pbe);
    }

    #[test]
    fn mode_from_registers() {
        let c1 = |clks: u32| mcg::C1_CLKS.bits(clks);
        let lp = mcg::C2_LP.mask();
        let plls = mcg::C6_PLLS.mask();

        assert_eq!(Mode::from_registers(c1(0), 0, plls), Pee);
        assert_eq!(Mode::from_registers(c1(1), 0, 0), Fbi);
        assert_eq!(Mode::from_registers(c1(1), lp, 0), Blpi);
        assert_eq!(Mode::from_registers(c1(2), 0, 0), Fbe);
        assert_eq!(Mode::from_registers(c1(2), 0, plls), Pbe);
        assert_eq!(Mode::from_registers(c1(3), 0, 0), Fbi);
    }
}
