use thiserror::Error;

use crate::AddressSpaceId;

/// Error classes used to group configuration failures for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum ConfigErrorClass {
    /// A handler was bound to an entry with an illegal width or lane mask.
    Binding,
    /// An address space was declared inconsistently or is missing.
    Space,
    /// A submap topology the uplift step cannot represent.
    Topology,
    /// A map entry failed the static validity check.
    Validity,
}

/// Fatal configuration-time errors raised while building or uplifting maps.
///
/// Every variant aborts the configuration pass that produced it; nothing is
/// retried and no entry is partially applied.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Error)]
pub enum ConfigError {
    /// A handler without a unit mask does not match the map's data width.
    #[error(
        "handler `{handler}` is a {handler_bits}-bit handler but was declared in a \
         {map_bits}-bit map without a unit mask"
    )]
    WidthMismatch {
        /// Display name of the offending handler.
        handler: String,
        /// Declared handler width in bits.
        handler_bits: u8,
        /// Data width of the owning map in bits.
        map_bits: u8,
    },
    /// A lane-masked handler is wider than the map's data bus.
    #[error("handler `{handler}` is {handler_bits}-bit, wider than the {map_bits}-bit map")]
    HandlerTooWide {
        /// Display name of the offending handler.
        handler: String,
        /// Declared handler width in bits.
        handler_bits: u8,
        /// Data width of the owning map in bits.
        map_bits: u8,
    },
    /// A unit mask does not split into whole handler-width lanes.
    #[error(
        "handler `{handler}` has unit mask {unit_mask:#x} that is not made of whole \
         {handler_bits}-bit lanes"
    )]
    FragmentedMask {
        /// Display name of the offending handler.
        handler: String,
        /// The rejected unit mask.
        unit_mask: u64,
        /// Declared handler width in bits.
        handler_bits: u8,
    },
    /// A space was configured twice with different data widths.
    #[error("{space} space is {declared}-bit but was reconfigured as {requested}-bit")]
    WidthConflict {
        /// Space being configured.
        space: AddressSpaceId,
        /// Width fixed by the first configuration.
        declared: u8,
        /// Width requested by the conflicting call.
        requested: u8,
    },
    /// A map was configured for a different space than the one it was created for.
    #[error("map for {declared} space cannot be configured as {requested} space")]
    SpaceConflict {
        /// Space the map was created for.
        declared: AddressSpaceId,
        /// Space requested by the conflicting call.
        requested: AddressSpaceId,
    },
    /// A data width outside `{8, 16, 32, 64}` was declared.
    #[error("{space} space cannot use a {bits}-bit data bus")]
    InvalidDataWidth {
        /// Space being configured.
        space: AddressSpaceId,
        /// Rejected width in bits.
        bits: u8,
    },
    /// The global mask was set after entries were already appended.
    #[error("global mask for {space} space set after {entries} entries were declared")]
    GlobalMaskAfterEntries {
        /// Space of the offending map.
        space: AddressSpaceId,
        /// Number of entries already present.
        entries: usize,
    },
    /// A device has no configuration for the requested space.
    #[error("device `{device}` has no {space} space")]
    MissingSpace {
        /// Device tag.
        device: String,
        /// Requested space.
        space: AddressSpaceId,
    },
    /// A submap names a device that does not exist relative to its owner.
    #[error("device `{owner}` has no subdevice `{tag}`")]
    UnknownSubdevice {
        /// Tag of the device the lookup started from.
        owner: String,
        /// Relative tag that failed to resolve.
        tag: String,
    },
    /// A submap names a map the child device does not provide.
    #[error("device `{device}` provides no map named `{map}`")]
    UnknownSubmap {
        /// Child device tag.
        device: String,
        /// Requested map name.
        map: String,
    },
    /// A device map includes itself, directly or through other submaps.
    #[error(
        "submap `{device}:{map}` at {start:#x}-{end:#x} of the {space} space includes itself"
    )]
    SubmapCycle {
        /// Tag of the device whose map repeats.
        device: String,
        /// Name of the repeated map.
        map: String,
        /// Space of the map holding the entry that closes the cycle.
        space: AddressSpaceId,
        /// Inclusive start of that entry.
        start: u64,
        /// Inclusive end of that entry.
        end: u64,
    },
    /// A submap was requested from an entry that is not a submap.
    #[error("entry {start:#x}-{end:#x} does not reference a submap")]
    NotASubmap {
        /// Entry start address.
        start: u64,
        /// Entry end address.
        end: u64,
    },
    /// The child map's data width differs from what the parent entry expects.
    #[error(
        "submap of `{device}` is {child_bits}-bit but the parent entry expects \
         {expected_bits}-bit"
    )]
    SubmapWidthMismatch {
        /// Child device tag.
        device: String,
        /// Width expected by the parent entry.
        expected_bits: u8,
        /// Width declared by the child map.
        child_bits: u8,
    },
    /// A child range straddles lane boundaries in a way uplift cannot express.
    #[error("submap entry of `{device}` at {start:#x}-{end:#x} straddles parent lanes")]
    UnsupportedSlotStraddle {
        /// Child device tag.
        device: String,
        /// Transformed start address in the parent space.
        start: u64,
        /// Transformed end address in the parent space.
        end: u64,
    },
    /// An address mask was used across an uplift boundary.
    #[error("submap entry of `{device}` at {start:#x}-{end:#x} uses an address mask")]
    AddressMaskUnsupported {
        /// Child device tag.
        device: String,
        /// Transformed start address in the parent space.
        start: u64,
        /// Transformed end address in the parent space.
        end: u64,
    },
    /// A child mirror claims address bits reserved for lane selection.
    #[error(
        "submap entry of `{device}` mirror {mirror:#x} overlaps lane select bits \
         {slot_bits:#x}"
    )]
    MirrorBitConflict {
        /// Child device tag.
        device: String,
        /// Child mirror bits.
        mirror: u64,
        /// Address bits reserved for lane selection.
        slot_bits: u64,
    },
    /// A child handler kind cannot be merged into the parent.
    #[error("submap entry of `{device}` at {start:#x}-{end:#x} still holds a submap")]
    InvalidChildHandlerKind {
        /// Child device tag.
        device: String,
        /// Transformed start address in the parent space.
        start: u64,
        /// Transformed end address in the parent space.
        end: u64,
    },
    /// An entry's start address lies after its end address.
    #[error("entry {start:#x}-{end:#x} has start after end")]
    InvalidRange {
        /// Entry start address.
        start: u64,
        /// Entry end address.
        end: u64,
    },
    /// An entry uses address bits beyond the space's address width.
    #[error("entry {start:#x}-{end:#x} exceeds the {address_bits}-bit address space")]
    RangeBeyondAddressWidth {
        /// Entry start address.
        start: u64,
        /// Entry end address.
        end: u64,
        /// Address width of the space.
        address_bits: u8,
    },
    /// An entry is not aligned to whole data-bus units.
    #[error("entry {start:#x}-{end:#x} is not aligned to the {data_bits}-bit data bus")]
    MisalignedRange {
        /// Entry start address.
        start: u64,
        /// Entry end address.
        end: u64,
        /// Data width of the map.
        data_bits: u8,
    },
    /// An entry's mirror bits are also used by its address range.
    #[error("entry {start:#x}-{end:#x} mirror {mirror:#x} overlaps its own range")]
    MirrorOverlapsRange {
        /// Entry start address.
        start: u64,
        /// Entry end address.
        end: u64,
        /// Mirror bits.
        mirror: u64,
    },
}

impl ConfigError {
    /// Returns the reporting class for this error.
    #[must_use]
    pub const fn class(&self) -> ConfigErrorClass {
        match self {
            Self::WidthMismatch { .. }
            | Self::HandlerTooWide { .. }
            | Self::FragmentedMask { .. }
            | Self::NotASubmap { .. } => ConfigErrorClass::Binding,
            Self::WidthConflict { .. }
            | Self::SpaceConflict { .. }
            | Self::InvalidDataWidth { .. }
            | Self::GlobalMaskAfterEntries { .. }
            | Self::MissingSpace { .. } => ConfigErrorClass::Space,
            Self::UnknownSubdevice { .. }
            | Self::UnknownSubmap { .. }
            | Self::SubmapCycle { .. }
            | Self::SubmapWidthMismatch { .. }
            | Self::UnsupportedSlotStraddle { .. }
            | Self::AddressMaskUnsupported { .. }
            | Self::MirrorBitConflict { .. }
            | Self::InvalidChildHandlerKind { .. } => ConfigErrorClass::Topology,
            Self::InvalidRange { .. }
            | Self::RangeBeyondAddressWidth { .. }
            | Self::MisalignedRange { .. }
            | Self::MirrorOverlapsRange { .. } => ConfigErrorClass::Validity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, ConfigErrorClass};
    use crate::AddressSpaceId;

    #[test]
    fn class_mapping_matches_error_taxonomy() {
        let binding = ConfigError::FragmentedMask {
            handler: "h".to_owned(),
            unit_mask: 0xF0,
            handler_bits: 8,
        };
        assert_eq!(binding.class(), ConfigErrorClass::Binding);

        let space = ConfigError::WidthConflict {
            space: AddressSpaceId::Program,
            declared: 8,
            requested: 16,
        };
        assert_eq!(space.class(), ConfigErrorClass::Space);

        let topology = ConfigError::UnknownSubdevice {
            owner: "maincpu".to_owned(),
            tag: "uart".to_owned(),
        };
        assert_eq!(topology.class(), ConfigErrorClass::Topology);

        let cycle = ConfigError::SubmapCycle {
            device: "uart".to_owned(),
            map: "map".to_owned(),
            space: AddressSpaceId::Io,
            start: 0,
            end: 0xFF,
        };
        assert_eq!(cycle.class(), ConfigErrorClass::Topology);
        assert_eq!(
            cycle.to_string(),
            "submap `uart:map` at 0x0-0xff of the io space includes itself"
        );

        let validity = ConfigError::InvalidRange { start: 4, end: 0 };
        assert_eq!(validity.class(), ConfigErrorClass::Validity);
    }

    #[test]
    fn messages_identify_the_offending_range() {
        let err = ConfigError::UnsupportedSlotStraddle {
            device: "uart".to_owned(),
            start: 0x100,
            end: 0x107,
        };
        assert_eq!(
            err.to_string(),
            "submap entry of `uart` at 0x100-0x107 straddles parent lanes"
        );
    }

    #[test]
    fn width_conflict_message_names_the_space() {
        let err = ConfigError::WidthConflict {
            space: AddressSpaceId::Io,
            declared: 8,
            requested: 16,
        };
        assert_eq!(
            err.to_string(),
            "io space is 8-bit but was reconfigured as 16-bit"
        );
    }
}
