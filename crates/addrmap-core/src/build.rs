//! Address-map construction entry points.

use tracing::debug;

use crate::{
    uplift, AddressMap, AddressSpaceConfig, AddressSpaceId, ConfigError, Device, Handler,
    MapEntry, SpaceInfo,
};

/// A device map installed onto a running space at `start..=end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceMapping<'a> {
    /// Inclusive start address in the target space.
    pub start: u64,
    /// Inclusive end address in the target space.
    pub end: u64,
    /// Device bus width; `0` uses the space's data width.
    pub bits: u8,
    /// Lanes of the space the device occupies; `0` for all.
    pub unit_mask: u64,
    /// Name of the device map to install.
    pub map: &'a str,
}

/// Returns the configuration of `space` on `device`.
///
/// # Errors
///
/// Returns [`ConfigError::MissingSpace`] when the device does not expose `space`.
pub fn resolve_space(
    device: &dyn Device,
    space: AddressSpaceId,
) -> Result<&AddressSpaceConfig, ConfigError> {
    device
        .space_config(space)
        .ok_or_else(|| ConfigError::MissingSpace {
            device: device.tag().to_owned(),
            space,
        })
}

/// Builds the map of `space` from the device's declared sources.
///
/// The internal map, the declared map and the default map are run in that
/// order against the same map, so earlier sources take priority.
///
/// # Errors
///
/// Returns [`ConfigError::MissingSpace`] for an undeclared space, or any
/// error raised by the population callbacks.
pub fn map_for_device(
    device: &dyn Device,
    space: AddressSpaceId,
) -> Result<AddressMap, ConfigError> {
    let config = resolve_space(device, space)?;
    let mut map = AddressMap::new(space, config.data_width)?;
    map.set_unmap_value(config.unmapped_value);

    let sources = [
        config.internal_map.as_ref(),
        device.declared_map(space),
        config.default_map.as_ref(),
    ];
    for constructor in sources.into_iter().flatten() {
        constructor.populate(&mut map)?;
    }

    debug!(
        device = device.tag(),
        %space,
        entries = map.len(),
        "built address map"
    );
    Ok(map)
}

/// Builds the standalone map a submap entry refers to on `child`.
///
/// The map uses the child's declared width, independent of the parent.
///
/// # Errors
///
/// - [`ConfigError::NotASubmap`] when `entry` does not read from a submap.
/// - [`ConfigError::UnknownSubmap`] when `child` has no map of that name.
/// - Any error raised by the child's population callback.
pub fn map_for_submap(
    child: &dyn Device,
    space: AddressSpaceId,
    entry: &MapEntry,
) -> Result<AddressMap, ConfigError> {
    let Handler::Submap { map: name, .. } = entry.read_handler() else {
        return Err(ConfigError::NotASubmap {
            start: entry.start(),
            end: entry.end(),
        });
    };
    let device_map = child
        .device_map(name)
        .ok_or_else(|| ConfigError::UnknownSubmap {
            device: child.tag().to_owned(),
            map: name.clone(),
        })?;

    let mut map = AddressMap::new(space, device_map.data_width)?;
    device_map.constructor.populate(&mut map)?;
    Ok(map)
}

/// Synthesizes a one-entry map that places `device`'s map onto a running space.
///
/// The map's global mask is the space's address mask. The entry is a submap
/// referring to `device` itself and still needs [`uplift`].
///
/// # Errors
///
/// - [`ConfigError::UnknownSubmap`] when `device` has no map named `mapping.map`.
/// - Any width or lane error from binding the submap.
pub fn dynamic_map(
    space: &SpaceInfo,
    mapping: &DeviceMapping<'_>,
    device: &dyn Device,
) -> Result<AddressMap, ConfigError> {
    if device.device_map(mapping.map).is_none() {
        return Err(ConfigError::UnknownSubmap {
            device: device.tag().to_owned(),
            map: mapping.map.to_owned(),
        });
    }

    let mut map = AddressMap::new(space.id, space.data_width)?;
    map.set_unmap_value(space.unmapped_value);
    map.set_global_mask(space.address_mask())?;
    map.range(mapping.start, mapping.end)
        .set_submap("", mapping.map, mapping.bits, mapping.unit_mask)?;
    Ok(map)
}

/// Builds and uplifts a dynamic device mapping, returning the flat map.
///
/// # Errors
///
/// Any error from [`dynamic_map`] or [`uplift`].
pub fn install_device_map(
    space: &SpaceInfo,
    mapping: &DeviceMapping<'_>,
    device: &dyn Device,
) -> Result<AddressMap, ConfigError> {
    let mut map = dynamic_map(space, mapping, device)?;
    uplift(&mut map, device, space.endianness)?;
    Ok(map)
}

/// Builds the map of `space` and resolves every submap in it.
///
/// # Errors
///
/// Any error from [`map_for_device`] or [`uplift`].
pub fn build_space_map(
    device: &dyn Device,
    space: AddressSpaceId,
) -> Result<AddressMap, ConfigError> {
    let endianness = resolve_space(device, space)?.endianness;
    let mut map = map_for_device(device, space)?;
    uplift(&mut map, device, endianness)?;
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::{dynamic_map, map_for_device, map_for_submap, DeviceMapping};
    use crate::{
        Access, AddressMap, AddressSpaceConfig, AddressSpaceId, ConfigError, Endianness,
        MapConstructor, StaticDevice,
    };

    fn marker(name: &'static str, start: u64, end: u64) -> MapConstructor {
        MapConstructor::new(move |map| {
            map.range(start, end).set_read(name, 8, 0)?;
            Ok(())
        })
    }

    #[test]
    fn sources_run_internal_then_declared_then_default() {
        let config = AddressSpaceConfig::new("program", Endianness::Little, 8, 16)
            .with_internal_map(marker("internal", 0x0000, 0x00FF))
            .with_default_map(marker("default", 0x0000, 0xFFFF))
            .with_unmapped_value(0xFF);
        let device = StaticDevice::new("maincpu")
            .with_space(AddressSpaceId::Program, config)
            .with_declared_map(AddressSpaceId::Program, marker("declared", 0x0000, 0x0FFF));

        let map = map_for_device(&device, AddressSpaceId::Program).expect("builds");
        let names: Vec<String> = map
            .entries()
            .iter()
            .map(|entry| entry.read_handler().to_string())
            .collect();
        assert_eq!(names, ["internal/8", "declared/8", "default/8"]);
        assert_eq!(map.unmapped_value(), 0xFF);

        let hit = |address| {
            map.lookup(address, Access::Read)
                .map(|entry| entry.read_handler().to_string())
        };
        assert_eq!(hit(0x0010).as_deref(), Some("internal/8"));
        assert_eq!(hit(0x0800).as_deref(), Some("declared/8"));
        assert_eq!(hit(0x8000).as_deref(), Some("default/8"));
    }

    #[test]
    fn absent_sources_are_skipped() {
        let device = StaticDevice::new("maincpu")
            .with_space(AddressSpaceId::Io, AddressSpaceConfig::default());
        let map = map_for_device(&device, AddressSpaceId::Io).expect("builds");
        assert!(map.is_empty());
    }

    #[test]
    fn missing_space_is_reported() {
        let device = StaticDevice::new("maincpu");
        assert_eq!(
            map_for_device(&device, AddressSpaceId::Data),
            Err(ConfigError::MissingSpace {
                device: "maincpu".to_owned(),
                space: AddressSpaceId::Data,
            })
        );
    }

    #[test]
    fn submap_uses_child_width() {
        let child = StaticDevice::new("uart").with_device_map("map", 8, marker("rx", 0, 0));
        let mut parent = AddressMap::new(AddressSpaceId::Program, 32).expect("valid width");
        parent
            .range(0, 3)
            .set_submap("uart", "map", 8, 0xFF)
            .expect("lane fits");

        let submap =
            map_for_submap(&child, AddressSpaceId::Program, &parent.entries()[0]).expect("builds");
        assert_eq!(submap.data_width(), 8);
        assert_eq!(submap.len(), 1);
    }

    #[test]
    fn submap_name_must_exist() {
        let child = StaticDevice::new("uart");
        let mut parent = AddressMap::new(AddressSpaceId::Program, 8).expect("valid width");
        parent
            .range(0, 3)
            .set_submap("uart", "regs", 0, 0)
            .expect("full width");

        assert_eq!(
            map_for_submap(&child, AddressSpaceId::Program, &parent.entries()[0]),
            Err(ConfigError::UnknownSubmap {
                device: "uart".to_owned(),
                map: "regs".to_owned(),
            })
        );
    }

    #[test]
    fn plain_entry_is_not_a_submap() {
        let child = StaticDevice::new("uart");
        let mut parent = AddressMap::new(AddressSpaceId::Program, 8).expect("valid width");
        parent.range(0, 3).set_nop_read();

        assert_eq!(
            map_for_submap(&child, AddressSpaceId::Program, &parent.entries()[0]),
            Err(ConfigError::NotASubmap { start: 0, end: 3 })
        );
    }

    #[test]
    fn dynamic_map_holds_one_self_submap() {
        let device = StaticDevice::new("nvram").with_device_map("map", 8, marker("cell", 0, 0xFF));
        let space = AddressSpaceConfig::new("program", Endianness::Little, 16, 16)
            .info(AddressSpaceId::Program);
        let mapping = DeviceMapping {
            start: 0x1_2000,
            end: 0x1_21FF,
            bits: 8,
            unit_mask: 0x00FF,
            map: "map",
        };

        let map = dynamic_map(&space, &mapping, &device).expect("builds");
        assert_eq!(map.len(), 1);
        assert_eq!(map.global_mask(), 0xFFFF);

        let entry = &map.entries()[0];
        assert_eq!((entry.start(), entry.end()), (0x2000, 0x21FF));
        assert!(entry.has_submap());
        assert_eq!(entry.read_handler().unit_mask(), 0x00FF);
    }
}
