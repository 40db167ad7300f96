//! Byte-lane ("unit") mask helpers shared by entry binding and uplift.

use crate::{ConfigError, Endianness};

/// Returns a mask with the low `bits` bits set, saturating at 64 bits.
#[must_use]
pub const fn make_bitmask(bits: u8) -> u64 {
    if bits >= 64 {
        u64::MAX
    } else {
        (1_u64 << bits) - 1
    }
}

/// Maps a logical lane index to its physical position on the bus.
///
/// Little-endian buses keep the index; big-endian buses mirror it so that
/// logical lane 0 lands in the most significant physical lane.
#[must_use]
pub const fn physical_slot(index: usize, count: usize, endianness: Endianness) -> usize {
    match endianness {
        Endianness::Little => index,
        Endianness::Big => count - 1 - index,
    }
}

/// Validates a handler's unit mask against the data width of its map.
///
/// A zero mask means the handler spans the full bus and must match the map
/// width exactly. A nonzero mask must be built from whole `handler_bits`-wide
/// lanes that are each entirely set or entirely clear, and may not reach past
/// the map's data width.
///
/// # Errors
///
/// - [`ConfigError::WidthMismatch`] when `unit_mask == 0` and the widths differ,
///   or when a masked handler declares a zero width.
/// - [`ConfigError::HandlerTooWide`] when the handler is wider than the map.
/// - [`ConfigError::FragmentedMask`] when any lane is partially selected.
pub fn validate_unit_mask(
    map_bits: u8,
    handler_bits: u8,
    unit_mask: u64,
    handler: &str,
) -> Result<(), ConfigError> {
    if unit_mask == 0 {
        if handler_bits == map_bits {
            return Ok(());
        }
        return Err(ConfigError::WidthMismatch {
            handler: handler.to_owned(),
            handler_bits,
            map_bits,
        });
    }

    if handler_bits > map_bits {
        return Err(ConfigError::HandlerTooWide {
            handler: handler.to_owned(),
            handler_bits,
            map_bits,
        });
    }
    if handler_bits == 0 {
        return Err(ConfigError::WidthMismatch {
            handler: handler.to_owned(),
            handler_bits,
            map_bits,
        });
    }

    let fragmented = || ConfigError::FragmentedMask {
        handler: handler.to_owned(),
        unit_mask,
        handler_bits,
    };

    if unit_mask & !make_bitmask(map_bits) != 0 {
        return Err(fragmented());
    }

    let lane = make_bitmask(handler_bits);
    for shift in (0..map_bits).step_by(usize::from(handler_bits)) {
        let window = (unit_mask >> shift) & lane;
        if window != 0 && window != lane {
            return Err(fragmented());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{make_bitmask, physical_slot, validate_unit_mask};
    use crate::{ConfigError, Endianness};
    use rstest::rstest;

    #[rstest]
    #[case(0, 0)]
    #[case(8, 0xFF)]
    #[case(16, 0xFFFF)]
    #[case(32, 0xFFFF_FFFF)]
    #[case(64, u64::MAX)]
    fn bitmask_covers_low_bits(#[case] bits: u8, #[case] expected: u64) {
        assert_eq!(make_bitmask(bits), expected);
    }

    #[test]
    fn physical_slot_mirrors_on_big_endian_buses() {
        assert_eq!(physical_slot(0, 4, Endianness::Little), 0);
        assert_eq!(physical_slot(3, 4, Endianness::Little), 3);
        assert_eq!(physical_slot(0, 4, Endianness::Big), 3);
        assert_eq!(physical_slot(3, 4, Endianness::Big), 0);
        assert_eq!(physical_slot(0, 1, Endianness::Big), 0);
    }

    #[rstest]
    #[case(32, 8, 0x00FF_00FF)]
    #[case(32, 8, 0xFF00_0000)]
    #[case(32, 16, 0xFFFF_0000)]
    #[case(32, 32, 0)]
    #[case(64, 32, 0xFFFF_FFFF_0000_0000)]
    #[case(16, 8, 0xFFFF)]
    fn whole_lane_masks_are_accepted(
        #[case] map_bits: u8,
        #[case] handler_bits: u8,
        #[case] unit_mask: u64,
    ) {
        assert_eq!(
            validate_unit_mask(map_bits, handler_bits, unit_mask, "h"),
            Ok(())
        );
    }

    #[test]
    fn partial_lane_is_fragmented() {
        assert_eq!(
            validate_unit_mask(32, 8, 0x0000_00F0, "h"),
            Err(ConfigError::FragmentedMask {
                handler: "h".to_owned(),
                unit_mask: 0xF0,
                handler_bits: 8,
            })
        );
    }

    #[test]
    fn lane_misaligned_to_handler_width_is_fragmented() {
        assert!(matches!(
            validate_unit_mask(32, 16, 0x00FF_FF00, "h"),
            Err(ConfigError::FragmentedMask { .. })
        ));
    }

    #[test]
    fn mask_beyond_map_width_is_fragmented() {
        assert!(matches!(
            validate_unit_mask(16, 8, 0x00FF_0000, "h"),
            Err(ConfigError::FragmentedMask { .. })
        ));
    }

    #[test]
    fn unmasked_handler_must_match_map_width() {
        assert_eq!(
            validate_unit_mask(32, 8, 0, "status_r"),
            Err(ConfigError::WidthMismatch {
                handler: "status_r".to_owned(),
                handler_bits: 8,
                map_bits: 32,
            })
        );
    }

    #[test]
    fn masked_handler_cannot_exceed_map_width() {
        assert_eq!(
            validate_unit_mask(16, 32, 0xFFFF, "h"),
            Err(ConfigError::HandlerTooWide {
                handler: "h".to_owned(),
                handler_bits: 32,
                map_bits: 16,
            })
        );
    }

    #[test]
    fn masked_handler_needs_a_width() {
        assert!(matches!(
            validate_unit_mask(16, 0, 0xFF, "h"),
            Err(ConfigError::WidthMismatch { .. })
        ));
    }
}
