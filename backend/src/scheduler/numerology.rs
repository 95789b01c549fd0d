//! 5G NR numerology tables
//!
//! Subcarrier spacing, resource-block limits and resource-block-group sizes
//! used when a grid is laid out from its bandwidth.

/// Highest supported numerology index
pub const MAX_NUMEROLOGY: u8 = 5;

/// Numerology used when the configured one is out of range
pub const DEFAULT_NUMEROLOGY: u8 = 1;

/// Minimum number of resource blocks a carrier must provide
pub const MIN_RESOURCE_BLOCKS: u32 = 20;

/// Maximum resource blocks per carrier, indexed by numerology
pub const MAX_RESOURCE_BLOCKS: [u32; 6] = [270, 273, 135, 264, 264, 264];

/// OFDM symbols per slot (normal cyclic prefix)
pub const SYMBOLS_PER_SLOT: u32 = 14;

/// Subcarriers per resource block
pub const SUBCARRIERS_PER_RB: u32 = 12;

/// RBG size rows: `(lower, upper)` RB count bounds, `[config 0, config 1]` sizes
const RBG_SIZE_TABLE: [(u32, u32, [u32; 2]); 4] = [
    (1, 37, [2, 4]),
    (37, 73, [4, 8]),
    (73, 145, [8, 16]),
    (145, 276, [16, 16]),
];

/// Subcarrier spacing in Hz for numerology `mu` (15 kHz × 2^mu)
pub fn subcarrier_spacing_hz(mu: u8) -> f64 {
    15_000.0 * f64::from(1u32 << mu)
}

/// Slots per 1 ms subframe for numerology `mu`
pub fn slots_per_subframe(mu: u8) -> u32 {
    1u32 << mu
}

/// Clamp a configured numerology into range
///
/// Out-of-range values log a warning and map to [`DEFAULT_NUMEROLOGY`].
pub fn checked_numerology(mu: u8) -> u8 {
    if mu > MAX_NUMEROLOGY {
        log::warn!(
            "numerology {} out of range 0..={}, using {}",
            mu,
            MAX_NUMEROLOGY,
            DEFAULT_NUMEROLOGY
        );
        DEFAULT_NUMEROLOGY
    } else {
        mu
    }
}

/// RBG size for a carrier of `n_rb` blocks under RBG configuration `config`
///
/// Configurations other than 1 use column 0. RB counts beyond the table use
/// the last row.
pub fn rbg_size(n_rb: u32, config: u8) -> u32 {
    let column = usize::from(config == 1);
    RBG_SIZE_TABLE
        .iter()
        .find(|(lo, hi, _)| *lo <= n_rb && n_rb < *hi)
        .map(|(_, _, sizes)| sizes[column])
        .unwrap_or(RBG_SIZE_TABLE[RBG_SIZE_TABLE.len() - 1].2[column])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subcarrier_spacing() {
        assert_eq!(subcarrier_spacing_hz(0), 15_000.0);
        assert_eq!(subcarrier_spacing_hz(1), 30_000.0);
        assert_eq!(subcarrier_spacing_hz(3), 120_000.0);
    }

    #[test]
    fn test_rbg_table_boundaries() {
        assert_eq!(rbg_size(36, 0), 2);
        assert_eq!(rbg_size(37, 0), 4);
        assert_eq!(rbg_size(50, 0), 4);
        assert_eq!(rbg_size(50, 1), 8);
        assert_eq!(rbg_size(145, 0), 16);
        assert_eq!(rbg_size(273, 1), 16);
    }

    #[test]
    fn test_out_of_range_numerology_falls_back() {
        assert_eq!(checked_numerology(9), DEFAULT_NUMEROLOGY);
        assert_eq!(checked_numerology(4), 4);
    }
}
