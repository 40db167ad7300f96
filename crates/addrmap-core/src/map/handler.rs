//! Handler descriptors bound to the read, write and set-offset paths of an entry.

use std::fmt;

/// Access direction used when resolving an address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Access {
    /// Read access.
    Read,
    /// Write access.
    Write,
}

/// What answers one access path of a map entry.
///
/// `bits == 0` means the handler spans the full width of its map and
/// `unit_mask == 0` means no lane subsetting.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Handler {
    /// Nothing is bound; the access falls through to later entries.
    #[default]
    None,
    /// Accesses are accepted and ignored.
    Nop {
        /// Handler width in bits.
        bits: u8,
        /// Lanes the handler answers for.
        unit_mask: u64,
    },
    /// A device callback.
    Device {
        /// Display name of the callback.
        name: String,
        /// Handler width in bits.
        bits: u8,
        /// Lanes the handler answers for.
        unit_mask: u64,
    },
    /// Placeholder for a child device's map, replaced during uplift.
    Submap {
        /// Child device tag relative to the map owner; empty means the owner.
        device: String,
        /// Name of the child map to populate.
        map: String,
        /// Child bus width override in bits; `0` uses the parent width.
        bits: u8,
        /// Parent lanes the child occupies.
        unit_mask: u64,
    },
}

impl Handler {
    /// Returns `true` when nothing is bound.
    #[must_use]
    pub const fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Returns `true` for an unresolved submap placeholder.
    #[must_use]
    pub const fn is_submap(&self) -> bool {
        matches!(self, Self::Submap { .. })
    }

    /// Declared width in bits; `0` for [`Handler::None`] and full-width handlers.
    #[must_use]
    pub const fn bits(&self) -> u8 {
        match self {
            Self::None => 0,
            Self::Nop { bits, .. } | Self::Device { bits, .. } | Self::Submap { bits, .. } => {
                *bits
            }
        }
    }

    /// Lane mask; `0` when the handler spans the full bus.
    #[must_use]
    pub const fn unit_mask(&self) -> u64 {
        match self {
            Self::None => 0,
            Self::Nop { unit_mask, .. }
            | Self::Device { unit_mask, .. }
            | Self::Submap { unit_mask, .. } => *unit_mask,
        }
    }
}

impl fmt::Display for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => return f.write_str("-"),
            Self::Nop { .. } => f.write_str("nop")?,
            Self::Device { name, .. } => f.write_str(name)?,
            Self::Submap { device, map, .. } => write!(f, "submap({device}:{map})")?,
        }
        if self.bits() != 0 {
            write!(f, "/{}", self.bits())?;
        }
        if self.unit_mask() != 0 {
            write!(f, "@{:#x}", self.unit_mask())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::Handler;

    #[test]
    fn accessors_report_lane_binding() {
        let handler = Handler::Device {
            name: "status_r".to_owned(),
            bits: 8,
            unit_mask: 0xFF00,
        };
        assert_eq!(handler.bits(), 8);
        assert_eq!(handler.unit_mask(), 0xFF00);
        assert!(!handler.is_none());
        assert!(!handler.is_submap());

        assert_eq!(Handler::None.bits(), 0);
        assert!(Handler::default().is_none());
    }

    #[test]
    fn display_is_compact() {
        let device = Handler::Device {
            name: "data_w".to_owned(),
            bits: 16,
            unit_mask: 0xFFFF,
        };
        assert_eq!(device.to_string(), "data_w/16@0xffff");

        let submap = Handler::Submap {
            device: "uart".to_owned(),
            map: "map".to_owned(),
            bits: 0,
            unit_mask: 0,
        };
        assert_eq!(submap.to_string(), "submap(uart:map)");
        assert_eq!(Handler::None.to_string(), "-");
        assert_eq!(
            Handler::Nop {
                bits: 0,
                unit_mask: 0
            }
            .to_string(),
            "nop"
        );
    }
}
