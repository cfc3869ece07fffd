use cfg_aliases::cfg_aliases;

fn main() {
    cfg_aliases! {
        // Real memory-mapped registers and core peripherals are only available on the MCU.
        cortex_m_hw: { all(target_arch = "arm", target_os = "none") },
    }
}
