//! Device-side collaborators: map constructors, the device lookup trait and a
//! static device tree.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::{AddressMap, AddressSpaceConfig, AddressSpaceId, ConfigError};

type PopulateFn = dyn Fn(&mut AddressMap) -> Result<(), ConfigError> + Send + Sync;

/// Callback that appends a device's declarations to an address map.
#[derive(Clone)]
pub struct MapConstructor(Arc<PopulateFn>);

impl MapConstructor {
    /// Wraps a population callback.
    pub fn new<F>(populate: F) -> Self
    where
        F: Fn(&mut AddressMap) -> Result<(), ConfigError> + Send + Sync + 'static,
    {
        Self(Arc::new(populate))
    }

    /// Runs the callback against `map`.
    ///
    /// # Errors
    ///
    /// Propagates any binding error raised while declaring entries.
    pub fn populate(&self, map: &mut AddressMap) -> Result<(), ConfigError> {
        (self.0)(map)
    }
}

impl fmt::Debug for MapConstructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MapConstructor(..)")
    }
}

/// A named map a device exposes for use as a submap.
#[derive(Debug, Clone)]
pub struct DeviceMap {
    /// Data width the map is declared for.
    pub data_width: u8,
    /// Callback declaring the map's entries.
    pub constructor: MapConstructor,
}

/// Configuration-time view of a device used by map construction and uplift.
pub trait Device {
    /// Device tag, used in diagnostics.
    fn tag(&self) -> &str;

    /// Direct child named `tag`.
    fn subdevice(&self, tag: &str) -> Option<&dyn Device>;

    /// Configuration of `space`, when the device exposes it.
    fn space_config(&self, space: AddressSpaceId) -> Option<&AddressSpaceConfig>;

    /// Map the machine configuration declared for `space`.
    fn declared_map(&self, space: AddressSpaceId) -> Option<&MapConstructor>;

    /// Map named `name` that parents may install as a submap.
    fn device_map(&self, name: &str) -> Option<&DeviceMap>;
}

/// Resolves a `:`-separated path relative to `owner`.
///
/// An empty path or `.` resolves to `owner` itself.
#[must_use]
pub fn resolve_device<'a>(owner: &'a dyn Device, path: &str) -> Option<&'a dyn Device> {
    path.split(':')
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .try_fold(owner, |device, segment| device.subdevice(segment))
}

/// Device backed by fixed configuration data.
#[derive(Debug, Clone, Default)]
pub struct StaticDevice {
    tag: String,
    children: Vec<StaticDevice>,
    spaces: [Option<AddressSpaceConfig>; AddressSpaceId::COUNT],
    declared: [Option<MapConstructor>; AddressSpaceId::COUNT],
    maps: BTreeMap<String, DeviceMap>,
}

impl StaticDevice {
    /// Creates a device with no spaces, maps or children.
    #[must_use]
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_owned(),
            ..Self::default()
        }
    }

    /// Exposes `space` with the given configuration.
    #[must_use]
    pub fn with_space(mut self, space: AddressSpaceId, config: AddressSpaceConfig) -> Self {
        self.spaces[space.index()] = Some(config);
        self
    }

    /// Declares the map for `space`.
    #[must_use]
    pub fn with_declared_map(mut self, space: AddressSpaceId, map: MapConstructor) -> Self {
        self.declared[space.index()] = Some(map);
        self
    }

    /// Exposes a named map for use as a submap.
    #[must_use]
    pub fn with_device_map(mut self, name: &str, data_width: u8, map: MapConstructor) -> Self {
        self.maps.insert(
            name.to_owned(),
            DeviceMap {
                data_width,
                constructor: map,
            },
        );
        self
    }

    /// Adds a child device.
    #[must_use]
    pub fn with_child(mut self, child: Self) -> Self {
        self.children.push(child);
        self
    }
}

impl Device for StaticDevice {
    fn tag(&self) -> &str {
        &self.tag
    }

    fn subdevice(&self, tag: &str) -> Option<&dyn Device> {
        self.children
            .iter()
            .find(|child| child.tag == tag)
            .map(|child| child as &dyn Device)
    }

    fn space_config(&self, space: AddressSpaceId) -> Option<&AddressSpaceConfig> {
        self.spaces[space.index()].as_ref()
    }

    fn declared_map(&self, space: AddressSpaceId) -> Option<&MapConstructor> {
        self.declared[space.index()].as_ref()
    }

    fn device_map(&self, name: &str) -> Option<&DeviceMap> {
        self.maps.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::{resolve_device, Device, MapConstructor, StaticDevice};
    use crate::{AddressMap, AddressSpaceConfig, AddressSpaceId};

    fn tree() -> StaticDevice {
        StaticDevice::new("maincpu")
            .with_child(StaticDevice::new("bus").with_child(StaticDevice::new("uart")))
    }

    #[test]
    fn empty_and_dot_paths_resolve_to_owner() {
        let root = tree();
        assert_eq!(
            resolve_device(&root, "").map(|device| device.tag()),
            Some("maincpu")
        );
        assert_eq!(
            resolve_device(&root, ".").map(|device| device.tag()),
            Some("maincpu")
        );
    }

    #[test]
    fn nested_paths_walk_children() {
        let root = tree();
        assert_eq!(
            resolve_device(&root, "bus").map(|device| device.tag()),
            Some("bus")
        );
        assert_eq!(
            resolve_device(&root, "bus:uart").map(|device| device.tag()),
            Some("uart")
        );
        assert!(resolve_device(&root, "uart").is_none());
        assert!(resolve_device(&root, "bus:missing").is_none());
    }

    #[test]
    fn static_device_reports_configured_spaces_and_maps() {
        let device = StaticDevice::new("uart")
            .with_space(AddressSpaceId::Io, AddressSpaceConfig::default())
            .with_declared_map(AddressSpaceId::Io, MapConstructor::new(|_| Ok(())))
            .with_device_map(
                "regs",
                8,
                MapConstructor::new(|map| {
                    map.range(0, 7).set_nop_read_write();
                    Ok(())
                }),
            );

        assert!(device.space_config(AddressSpaceId::Io).is_some());
        assert!(device.space_config(AddressSpaceId::Program).is_none());
        assert!(device.declared_map(AddressSpaceId::Io).is_some());
        assert!(device.device_map("missing").is_none());

        let regs = device.device_map("regs").expect("declared map");
        let mut map = AddressMap::new(AddressSpaceId::Io, regs.data_width).expect("valid width");
        regs.constructor.populate(&mut map).expect("populates");
        assert_eq!(map.len(), 1);
    }
}
