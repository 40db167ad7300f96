//! Address-map builder for emulated device buses.
//!
//! Devices declare which handlers answer which address ranges of each of
//! their address spaces. This crate turns those declarations into a flat,
//! ordered decode table per space, resolving nested device maps ("submaps")
//! across differing bus widths and byte orders. Every illegal topology is a
//! configuration-time [`ConfigError`]; a map that builds successfully can be
//! trusted unconditionally by whatever installs it.

/// Configuration error taxonomy.
pub mod error;
pub use error::{ConfigError, ConfigErrorClass};

/// Address-space identifiers and configuration records.
pub mod space;
pub use space::{
    is_valid_data_width, AddressSpaceConfig, AddressSpaceId, Endianness, SpaceInfo,
    VALID_DATA_WIDTHS,
};

/// Address maps, entries, handlers and unit-mask rules.
pub mod map;
pub use map::{
    make_bitmask, physical_slot, validate_unit_mask, Access, AddressMap, Handler, MapEntry,
};

/// Device lookup trait and static device tree.
pub mod device;
pub use device::{resolve_device, Device, DeviceMap, MapConstructor, StaticDevice};

/// Address-map construction entry points.
pub mod build;
pub use build::{
    build_space_map, dynamic_map, install_device_map, map_for_device, map_for_submap,
    resolve_space, DeviceMapping,
};

/// Submap resolution.
pub mod uplift;
pub use uplift::uplift;

#[cfg(test)]
use proptest as _;
