//! Simulator configuration: memory size and the two reset values a guest
//! image might care about. Kept as one small `Copy` struct rather than
//! scattering defaults across the modules that use them.

/// Default data/instruction memory size: 8 KiB, enough for the example
/// programs without making a misaligned or runaway fetch expensive to
/// detect.
pub const DEFAULT_MEM_SIZE: usize = 8192;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    pub mem_size: usize,
    pub reset_pc: u32,
    pub mtvec_reset: u32,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            mem_size: DEFAULT_MEM_SIZE,
            reset_pc: 0,
            mtvec_reset: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_resets_to_zero_pc() {
        let cfg = Config::default();
        assert_eq!(cfg.reset_pc, 0);
        assert_eq!(cfg.mem_size, DEFAULT_MEM_SIZE);
    }
}
