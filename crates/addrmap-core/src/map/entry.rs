//! A single address-range-to-handler binding.

use std::fmt;

use tracing::warn;

use crate::{validate_unit_mask, Access, ConfigError, Handler};

/// One contiguous address range of a map and the handlers that answer it.
///
/// Entries are created through [`AddressMap::range`](crate::AddressMap::range)
/// and remember the data width and global mask of the map that created them,
/// so bindings are validated as they are declared.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct MapEntry {
    addr_start: u64,
    addr_end: u64,
    addr_mirror: u64,
    addr_mask: u64,
    read: Handler,
    write: Handler,
    set_offset: Handler,
    share: Option<String>,
    region: Option<(String, u64)>,
    map_bits: u8,
    global_mask: u64,
}

impl MapEntry {
    pub(crate) fn new(map_bits: u8, global_mask: u64, start: u64, end: u64) -> Self {
        let (addr_start, addr_end) = if global_mask == 0 {
            (start, end)
        } else {
            if (start | end) & !global_mask != 0 {
                warn!(
                    start,
                    end,
                    global_mask,
                    "entry range has bits outside the global mask"
                );
            }
            (start & global_mask, end & global_mask)
        };

        Self {
            addr_start,
            addr_end,
            addr_mirror: 0,
            addr_mask: 0,
            read: Handler::None,
            write: Handler::None,
            set_offset: Handler::None,
            share: None,
            region: None,
            map_bits,
            global_mask,
        }
    }

    /// Inclusive start address.
    #[must_use]
    pub const fn start(&self) -> u64 {
        self.addr_start
    }

    /// Inclusive end address.
    #[must_use]
    pub const fn end(&self) -> u64 {
        self.addr_end
    }

    /// Address bits that repeat the range.
    #[must_use]
    pub const fn mirror(&self) -> u64 {
        self.addr_mirror
    }

    /// Address bits ignored when the handler sees the offset.
    #[must_use]
    pub const fn address_mask(&self) -> u64 {
        self.addr_mask
    }

    /// Data width in bits of the map that owns this entry.
    #[must_use]
    pub const fn map_bits(&self) -> u8 {
        self.map_bits
    }

    /// Read handler.
    #[must_use]
    pub const fn read_handler(&self) -> &Handler {
        &self.read
    }

    /// Write handler.
    #[must_use]
    pub const fn write_handler(&self) -> &Handler {
        &self.write
    }

    /// Set-offset handler.
    #[must_use]
    pub const fn set_offset_handler(&self) -> &Handler {
        &self.set_offset
    }

    /// Handler answering `access`.
    #[must_use]
    pub const fn handler(&self, access: Access) -> &Handler {
        match access {
            Access::Read => &self.read,
            Access::Write => &self.write,
        }
    }

    /// Shared-memory tag backing this entry.
    #[must_use]
    pub fn share(&self) -> Option<&str> {
        self.share.as_deref()
    }

    /// Region tag and offset backing this entry.
    #[must_use]
    pub fn region(&self) -> Option<(&str, u64)> {
        self.region
            .as_ref()
            .map(|(tag, offset)| (tag.as_str(), *offset))
    }

    /// Returns `true` when `address`, with mirror bits stripped, is in range.
    #[must_use]
    pub const fn contains(&self, address: u64) -> bool {
        let base = address & !self.addr_mirror;
        base >= self.addr_start && base <= self.addr_end
    }

    /// Returns `true` when any access path still points at a submap.
    #[must_use]
    pub const fn has_submap(&self) -> bool {
        self.read.is_submap() || self.write.is_submap() || self.set_offset.is_submap()
    }

    /// Sets the address bits ignored by the handler, clipped to the global mask.
    pub fn set_address_mask(&mut self, mask: u64) -> &mut Self {
        self.addr_mask = if self.global_mask == 0 {
            mask
        } else {
            mask & self.global_mask
        };
        self
    }

    /// Sets the address bits that repeat the range.
    pub fn set_mirror(&mut self, mirror: u64) -> &mut Self {
        self.addr_mirror = mirror;
        self
    }

    /// Binds a child device map to both read and write paths.
    ///
    /// `bits` overrides the child bus width (`0` keeps the map width) and
    /// `unit_mask` selects the parent lanes the child occupies. An empty
    /// `device` refers to the owner of the map.
    ///
    /// # Errors
    ///
    /// Returns the [`validate_unit_mask`] error when the lanes do not fit.
    pub fn set_submap(
        &mut self,
        device: &str,
        map: &str,
        bits: u8,
        unit_mask: u64,
    ) -> Result<&mut Self, ConfigError> {
        let handler_bits = if bits == 0 { self.map_bits } else { bits };
        validate_unit_mask(
            self.map_bits,
            handler_bits,
            unit_mask,
            &format!("submap {device}:{map}"),
        )?;

        let submap = Handler::Submap {
            device: device.to_owned(),
            map: map.to_owned(),
            bits,
            unit_mask,
        };
        self.read = submap.clone();
        self.write = submap;
        Ok(self)
    }

    /// Binds a device read callback of width `bits`.
    ///
    /// # Errors
    ///
    /// Returns the [`validate_unit_mask`] error when the lanes do not fit.
    pub fn set_read(
        &mut self,
        name: &str,
        bits: u8,
        unit_mask: u64,
    ) -> Result<&mut Self, ConfigError> {
        self.read = self.device_handler(name, bits, unit_mask)?;
        Ok(self)
    }

    /// Binds a device write callback of width `bits`.
    ///
    /// # Errors
    ///
    /// Returns the [`validate_unit_mask`] error when the lanes do not fit.
    pub fn set_write(
        &mut self,
        name: &str,
        bits: u8,
        unit_mask: u64,
    ) -> Result<&mut Self, ConfigError> {
        self.write = self.device_handler(name, bits, unit_mask)?;
        Ok(self)
    }

    /// Binds separate read and write callbacks sharing one width and mask.
    ///
    /// # Errors
    ///
    /// Returns the [`validate_unit_mask`] error when the lanes do not fit.
    pub fn set_read_write(
        &mut self,
        read: &str,
        write: &str,
        bits: u8,
        unit_mask: u64,
    ) -> Result<&mut Self, ConfigError> {
        self.set_read(read, bits, unit_mask)?;
        self.set_write(write, bits, unit_mask)
    }

    /// Binds a set-offset callback. Set-offset callbacks have fixed width.
    pub fn set_offset_callback(&mut self, name: &str) -> &mut Self {
        self.set_offset = Handler::Device {
            name: name.to_owned(),
            bits: 0,
            unit_mask: 0,
        };
        self
    }

    /// Ignores reads.
    pub fn set_nop_read(&mut self) -> &mut Self {
        self.read = Self::nop();
        self
    }

    /// Ignores writes.
    pub fn set_nop_write(&mut self) -> &mut Self {
        self.write = Self::nop();
        self
    }

    /// Ignores reads and writes.
    pub fn set_nop_read_write(&mut self) -> &mut Self {
        self.set_nop_read().set_nop_write()
    }

    /// Backs the entry with a shared-memory block.
    pub fn set_share(&mut self, tag: &str) -> &mut Self {
        self.share = Some(tag.to_owned());
        self
    }

    /// Backs the entry with a memory region starting at `offset`.
    pub fn set_region(&mut self, tag: &str, offset: u64) -> &mut Self {
        self.region = Some((tag.to_owned(), offset));
        self
    }

    pub(crate) fn rebase(&mut self, start: u64, end: u64, map_bits: u8, global_mask: u64) {
        self.addr_start = start;
        self.addr_end = end;
        self.map_bits = map_bits;
        self.global_mask = global_mask;
    }

    pub(crate) fn handlers_mut(&mut self) -> [&mut Handler; 3] {
        [&mut self.read, &mut self.write, &mut self.set_offset]
    }

    fn device_handler(
        &self,
        name: &str,
        bits: u8,
        unit_mask: u64,
    ) -> Result<Handler, ConfigError> {
        validate_unit_mask(self.map_bits, bits, unit_mask, name)?;
        Ok(Handler::Device {
            name: name.to_owned(),
            bits,
            unit_mask,
        })
    }

    const fn nop() -> Handler {
        Handler::Nop {
            bits: 0,
            unit_mask: 0,
        }
    }
}

impl fmt::Display for MapEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:#010x}-{:#010x} r:{} w:{}",
            self.addr_start, self.addr_end, self.read, self.write
        )?;
        if !self.set_offset.is_none() {
            write!(f, " o:{}", self.set_offset)?;
        }
        if self.addr_mirror != 0 {
            write!(f, " mirror:{:#x}", self.addr_mirror)?;
        }
        if self.addr_mask != 0 {
            write!(f, " mask:{:#x}", self.addr_mask)?;
        }
        if let Some(share) = &self.share {
            write!(f, " share:{share}")?;
        }
        if let Some((region, offset)) = &self.region {
            write!(f, " region:{region}+{offset:#x}")?;
        }
        Ok(())
    }
}
