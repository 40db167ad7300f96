//! Address maps: ordered entry lists for one address space of one device.

/// Single address-range binding.
pub mod entry;
/// Handler descriptors.
pub mod handler;
/// Unit-mask validation and lane helpers.
pub mod unitmask;

use std::fmt;

pub use entry::MapEntry;
pub use handler::{Access, Handler};
pub use unitmask::{make_bitmask, physical_slot, validate_unit_mask};

use crate::{is_valid_data_width, AddressSpaceId, ConfigError};

/// Ordered decode entries for one address space.
///
/// Order is significant: when ranges overlap, the entry appended first wins.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct AddressMap {
    space: AddressSpaceId,
    data_width: u8,
    unmapped_value: u64,
    global_mask: u64,
    entries: Vec<MapEntry>,
}

impl AddressMap {
    /// Creates an empty map for `space` with a fixed data width.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidDataWidth`] when `data_width` is not one
    /// of 8, 16, 32 or 64.
    pub fn new(space: AddressSpaceId, data_width: u8) -> Result<Self, ConfigError> {
        if !is_valid_data_width(data_width) {
            return Err(ConfigError::InvalidDataWidth {
                space,
                bits: data_width,
            });
        }
        Ok(Self {
            space,
            data_width,
            unmapped_value: 0,
            global_mask: 0,
            entries: Vec::new(),
        })
    }

    /// Re-declares the space and width this map is built for.
    ///
    /// The width is fixed when the map is created; repeating the same
    /// declaration is a no-op.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::SpaceConflict`] when `space` differs from the map's space.
    /// - [`ConfigError::WidthConflict`] when `data_width` differs from the map's width.
    pub fn configure(&mut self, space: AddressSpaceId, data_width: u8) -> Result<(), ConfigError> {
        if space != self.space {
            return Err(ConfigError::SpaceConflict {
                declared: self.space,
                requested: space,
            });
        }
        if data_width != self.data_width {
            return Err(ConfigError::WidthConflict {
                space,
                declared: self.data_width,
                requested: data_width,
            });
        }
        Ok(())
    }

    /// Space this map decodes.
    #[must_use]
    pub const fn space(&self) -> AddressSpaceId {
        self.space
    }

    /// Data width in bits.
    #[must_use]
    pub const fn data_width(&self) -> u8 {
        self.data_width
    }

    /// Data width in bytes.
    #[must_use]
    pub const fn data_bytes(&self) -> u64 {
        self.data_width as u64 / 8
    }

    /// Value returned for reads nothing decodes.
    #[must_use]
    pub const fn unmapped_value(&self) -> u64 {
        self.unmapped_value
    }

    /// Global address mask; `0` means unlimited.
    #[must_use]
    pub const fn global_mask(&self) -> u64 {
        self.global_mask
    }

    /// Entries in priority order.
    #[must_use]
    pub fn entries(&self) -> &[MapEntry] {
        &self.entries
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when no entries are declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Consumes the map and returns its entries.
    #[must_use]
    pub fn into_entries(self) -> Vec<MapEntry> {
        self.entries
    }

    /// Sets the value returned for unmapped reads.
    pub fn set_unmap_value(&mut self, value: u64) {
        self.unmapped_value = value;
    }

    /// Unmapped reads return all ones across the data width.
    pub fn unmap_value_high(&mut self) {
        self.unmapped_value = make_bitmask(self.data_width);
    }

    /// Unmapped reads return zero.
    pub fn unmap_value_low(&mut self) {
        self.unmapped_value = 0;
    }

    /// Sets the mask applied to every entry range appended afterwards.
    ///
    /// Must be called before the first entry is appended; entries already
    /// present are never rewritten.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::GlobalMaskAfterEntries`] when entries exist.
    pub fn set_global_mask(&mut self, mask: u64) -> Result<(), ConfigError> {
        if !self.entries.is_empty() {
            return Err(ConfigError::GlobalMaskAfterEntries {
                space: self.space,
                entries: self.entries.len(),
            });
        }
        self.global_mask = mask;
        Ok(())
    }

    /// Appends an entry for `start..=end` and returns it for binding.
    pub fn range(&mut self, start: u64, end: u64) -> &mut MapEntry {
        let entry = MapEntry::new(self.data_width, self.global_mask, start, end);
        self.entries.push(entry);
        let last = self.entries.len() - 1;
        &mut self.entries[last]
    }

    /// First entry whose range contains `address` and that answers `access`.
    #[must_use]
    pub fn lookup(&self, address: u64, access: Access) -> Option<&MapEntry> {
        let address = if self.global_mask == 0 {
            address
        } else {
            address & self.global_mask
        };
        self.entries
            .iter()
            .find(|entry| !entry.handler(access).is_none() && entry.contains(address))
    }

    /// Returns `true` when any entry still references a submap.
    #[must_use]
    pub fn has_submaps(&self) -> bool {
        self.entries.iter().any(MapEntry::has_submap)
    }

    /// Checks every entry against the address width and data-bus alignment.
    ///
    /// # Errors
    ///
    /// Returns every problem found, in entry order.
    pub fn validate(&self, address_bits: u8) -> Result<(), Vec<ConfigError>> {
        let address_mask = make_bitmask(address_bits);
        let align = self.data_bytes() - 1;
        let mut errors = Vec::new();

        for entry in &self.entries {
            let (start, end) = (entry.start(), entry.end());
            if start > end {
                errors.push(ConfigError::InvalidRange { start, end });
                continue;
            }
            if (start | end) & !address_mask != 0 {
                errors.push(ConfigError::RangeBeyondAddressWidth {
                    start,
                    end,
                    address_bits,
                });
            }
            if start & align != 0 || end & align != align {
                errors.push(ConfigError::MisalignedRange {
                    start,
                    end,
                    data_bits: self.data_width,
                });
            }
            if entry.mirror() & (start | end) != 0 {
                errors.push(ConfigError::MirrorOverlapsRange {
                    start,
                    end,
                    mirror: entry.mirror(),
                });
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    pub(crate) fn entries_mut(&mut self) -> &mut Vec<MapEntry> {
        &mut self.entries
    }
}

impl fmt::Display for AddressMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} space, {}-bit, {} entries",
            self.space,
            self.data_width,
            self.entries.len()
        )?;
        for entry in &self.entries {
            writeln!(f, "  {entry}")?;
        }
        Ok(())
    }
}
