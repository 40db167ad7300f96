//! Address-space identifiers and per-space configuration records.

use std::fmt;

use crate::{make_bitmask, MapConstructor};

/// Data-bus widths an address space may declare, in bits.
pub const VALID_DATA_WIDTHS: [u8; 4] = [8, 16, 32, 64];

/// Returns `true` when `bits` is a supported data-bus width.
#[must_use]
pub const fn is_valid_data_width(bits: u8) -> bool {
    matches!(bits, 8 | 16 | 32 | 64)
}

/// Logical buses a device may expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum AddressSpaceId {
    /// Program memory.
    Program,
    /// Data memory.
    Data,
    /// I/O ports.
    Io,
    /// Decrypted opcode fetches.
    Opcodes,
}

impl AddressSpaceId {
    /// Number of spaces a device can expose.
    pub const COUNT: usize = 4;

    /// All spaces in index order.
    pub const ALL: [Self; Self::COUNT] = [Self::Program, Self::Data, Self::Io, Self::Opcodes];

    /// Stable slot index for per-space tables.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Program => 0,
            Self::Data => 1,
            Self::Io => 2,
            Self::Opcodes => 3,
        }
    }

    /// Lowercase name used in logs and error messages.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Program => "program",
            Self::Data => "data",
            Self::Io => "io",
            Self::Opcodes => "opcodes",
        }
    }
}

impl fmt::Display for AddressSpaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Byte order of a data bus; decides which lane a narrow child unit lands in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Endianness {
    /// Lowest address in the least significant lane.
    #[default]
    Little,
    /// Lowest address in the most significant lane.
    Big,
}

/// Declared configuration of one device address space.
#[derive(Debug, Clone)]
pub struct AddressSpaceConfig {
    /// Human readable space name.
    pub name: &'static str,
    /// Data-bus byte order.
    pub endianness: Endianness,
    /// Data-bus width in bits.
    pub data_width: u8,
    /// Address-bus width in bits.
    pub address_width: u8,
    /// Value returned for reads nothing decodes.
    pub unmapped_value: u64,
    /// Map installed ahead of every other source.
    pub internal_map: Option<MapConstructor>,
    /// Map consulted only for addresses nothing earlier claimed.
    pub default_map: Option<MapConstructor>,
}

impl Default for AddressSpaceConfig {
    fn default() -> Self {
        Self::new("program", Endianness::Little, 8, 16)
    }
}

impl AddressSpaceConfig {
    /// Creates a space configuration without internal or default maps.
    #[must_use]
    pub const fn new(
        name: &'static str,
        endianness: Endianness,
        data_width: u8,
        address_width: u8,
    ) -> Self {
        Self {
            name,
            endianness,
            data_width,
            address_width,
            unmapped_value: 0,
            internal_map: None,
            default_map: None,
        }
    }

    /// Installs the internal map constructor.
    #[must_use]
    pub fn with_internal_map(mut self, map: MapConstructor) -> Self {
        self.internal_map = Some(map);
        self
    }

    /// Installs the default map constructor.
    #[must_use]
    pub fn with_default_map(mut self, map: MapConstructor) -> Self {
        self.default_map = Some(map);
        self
    }

    /// Sets the value returned for unmapped reads.
    #[must_use]
    pub fn with_unmapped_value(mut self, value: u64) -> Self {
        self.unmapped_value = value;
        self
    }

    /// Mask of all valid address bits.
    #[must_use]
    pub const fn address_mask(&self) -> u64 {
        make_bitmask(self.address_width)
    }

    /// Summary of this configuration for a running space.
    #[must_use]
    pub const fn info(&self, id: AddressSpaceId) -> SpaceInfo {
        SpaceInfo {
            id,
            endianness: self.endianness,
            data_width: self.data_width,
            address_width: self.address_width,
            unmapped_value: self.unmapped_value,
        }
    }
}

/// Immutable description of an address space that is already running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct SpaceInfo {
    /// Space identifier.
    pub id: AddressSpaceId,
    /// Data-bus byte order.
    pub endianness: Endianness,
    /// Data-bus width in bits.
    pub data_width: u8,
    /// Address-bus width in bits.
    pub address_width: u8,
    /// Value returned for unmapped reads.
    pub unmapped_value: u64,
}

impl SpaceInfo {
    /// Mask of all valid address bits.
    #[must_use]
    pub const fn address_mask(&self) -> u64 {
        make_bitmask(self.address_width)
    }
}

#[cfg(test)]
mod tests {
    use super::{is_valid_data_width, AddressSpaceConfig, AddressSpaceId, Endianness};
    use rstest::rstest;

    #[rstest]
    #[case(8, true)]
    #[case(16, true)]
    #[case(32, true)]
    #[case(64, true)]
    #[case(0, false)]
    #[case(24, false)]
    #[case(128, false)]
    fn data_width_support(#[case] bits: u8, #[case] valid: bool) {
        assert_eq!(is_valid_data_width(bits), valid);
    }

    #[test]
    fn space_indices_are_stable_and_dense() {
        for (slot, space) in AddressSpaceId::ALL.iter().enumerate() {
            assert_eq!(space.index(), slot);
        }
    }

    #[test]
    fn address_mask_follows_address_width() {
        let config = AddressSpaceConfig::new("io", Endianness::Big, 8, 12);
        assert_eq!(config.address_mask(), 0x0FFF);

        let wide = AddressSpaceConfig::new("program", Endianness::Little, 64, 64);
        assert_eq!(wide.address_mask(), u64::MAX);
    }

    #[test]
    fn info_carries_declared_fields() {
        let config = AddressSpaceConfig::new("data", Endianness::Big, 16, 24)
            .with_unmapped_value(0xFFFF);
        let info = config.info(AddressSpaceId::Data);
        assert_eq!(info.id, AddressSpaceId::Data);
        assert_eq!(info.endianness, Endianness::Big);
        assert_eq!(info.data_width, 16);
        assert_eq!(info.address_mask(), 0x00FF_FFFF);
        assert_eq!(info.unmapped_value, 0xFFFF);
    }
}
