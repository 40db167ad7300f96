//! Submap uplift: splices child device maps into their parent's address space.
//!
//! A parent entry bound to a submap is replaced by the child's own entries,
//! rebased onto the parent range. When the child bus is narrower than the
//! parent bus, consecutive child units are spread across the parent lanes
//! ("slots") selected by the entry's unit mask, and each child handler's unit
//! mask is widened to the lanes it ends up covering.

use tracing::{debug, trace};

use crate::{
    make_bitmask, map_for_submap, physical_slot, resolve_device, AddressMap, ConfigError, Device,
    Endianness, Handler, MapEntry,
};

/// Resolves every submap in `map`, depth first.
///
/// Child maps are uplifted relative to their own device before they are
/// spliced, so on success `map` holds no submap references at any depth.
/// Entries keep their relative order; a child's entries take the place of the
/// submap entry that referenced it.
///
/// # Errors
///
/// Returns the first topology error met, including
/// [`ConfigError::SubmapCycle`] when a device map includes itself. `map` is
/// left unchanged for the submap entry that failed.
pub fn uplift(
    map: &mut AddressMap,
    owner: &dyn Device,
    endianness: Endianness,
) -> Result<(), ConfigError> {
    uplift_within(map, owner, endianness, &mut Vec::new())
}

/// Device maps currently being resolved, outermost first.
type ActiveMaps<'a> = Vec<(&'a dyn Device, String)>;

fn uplift_within<'a>(
    map: &mut AddressMap,
    owner: &'a dyn Device,
    endianness: Endianness,
    active: &mut ActiveMaps<'a>,
) -> Result<(), ConfigError> {
    let mut index = 0;
    while index < map.len() {
        let entry = &map.entries()[index];
        if !entry.read_handler().is_submap() {
            index += 1;
            continue;
        }

        let spliced = splice_submap(map, entry, owner, endianness, active)?;
        let count = spliced.len();
        map.entries_mut().splice(index..=index, spliced);
        index += count;
    }
    Ok(())
}

/// Lane layout of one narrow child bus on the parent bus.
#[derive(Debug, Clone, PartialEq, Eq)]
struct SlotLayout {
    entry_bits: u8,
    entry_bytes: u64,
    parent_bytes: u64,
    /// Address bits within one parent unit that select a lane.
    slot_address_mask: u64,
    /// Physical lanes the child occupies, in child address order.
    active: Vec<usize>,
}

impl SlotLayout {
    fn new(parent_bits: u8, entry_bits: u8, unit_mask: u64, endianness: Endianness) -> Self {
        let entry_bytes = u64::from(entry_bits / 8);
        let parent_bytes = u64::from(parent_bits / 8);
        let capacity = usize::from(parent_bits / entry_bits);

        let lane_bits = usize::from(entry_bits);
        let active = (0..capacity)
            .map(|slot| physical_slot(slot, capacity, endianness))
            .filter(|&slot| unit_mask == 0 || (unit_mask >> (slot * lane_bits)) & 1 != 0)
            .collect();

        Self {
            entry_bits,
            entry_bytes,
            parent_bytes,
            slot_address_mask: (parent_bytes - 1) & !(entry_bytes - 1),
            active,
        }
    }

    fn active_count(&self) -> u64 {
        self.active.len() as u64
    }

    /// Parent lane mask for `base` repeated over active slots `first..=last`.
    fn lane_mask(&self, base: u64, first: u64, last: u64) -> u64 {
        let lane_bits = usize::from(self.entry_bits);
        self.active
            .iter()
            .zip(0_u64..)
            .filter(|&(_, index)| index >= first && index <= last)
            .fold(0, |mask, (&slot, _)| mask | (base << (slot * lane_bits)))
    }
}

fn splice_submap<'a>(
    parent: &AddressMap,
    entry: &MapEntry,
    owner: &'a dyn Device,
    endianness: Endianness,
    active: &mut ActiveMaps<'a>,
) -> Result<Vec<MapEntry>, ConfigError> {
    let Handler::Submap {
        device: tag,
        map: name,
        bits,
        unit_mask,
    } = entry.read_handler()
    else {
        return Err(ConfigError::NotASubmap {
            start: entry.start(),
            end: entry.end(),
        });
    };

    let child = resolve_device(owner, tag).ok_or_else(|| ConfigError::UnknownSubdevice {
        owner: owner.tag().to_owned(),
        tag: tag.clone(),
    })?;

    if active
        .iter()
        .any(|(device, map)| std::ptr::addr_eq(*device, child) && map == name)
    {
        return Err(ConfigError::SubmapCycle {
            device: child.tag().to_owned(),
            map: name.clone(),
            space: parent.space(),
            start: entry.start(),
            end: entry.end(),
        });
    }

    active.push((child, name.clone()));
    let mut submap = map_for_submap(child, parent.space(), entry)?;
    uplift_within(&mut submap, child, endianness, active)?;
    active.pop();

    let parent_bits = parent.data_width();
    let entry_bits = if *bits == 0 { parent_bits } else { *bits };
    if submap.data_width() != entry_bits || entry_bits > parent_bits {
        return Err(ConfigError::SubmapWidthMismatch {
            device: child.tag().to_owned(),
            expected_bits: entry_bits,
            child_bits: submap.data_width(),
        });
    }

    let layout = SlotLayout::new(parent_bits, entry_bits, *unit_mask, endianness);
    if layout.active.is_empty() {
        return Err(ConfigError::FragmentedMask {
            handler: format!("submap {}", child.tag()),
            unit_mask: *unit_mask,
            handler_bits: entry_bits,
        });
    }

    let mut spliced = Vec::with_capacity(submap.len());
    for mut sub in submap.into_entries() {
        let active_count = layout.active_count();
        let base_of = |unit: u64| {
            entry
                .start()
                .saturating_add((unit / active_count).saturating_mul(layout.parent_bytes))
        };

        let start_unit = sub.start() / layout.entry_bytes;
        let start_slot = start_unit % active_count;
        let start = base_of(start_unit);
        if start > entry.end() {
            trace!(
                device = child.tag(),
                start = sub.start(),
                end = sub.end(),
                "child entry falls outside the parent range"
            );
            continue;
        }

        let end_unit = sub.end() / layout.entry_bytes;
        let end_slot = end_unit % active_count;
        let mut end = base_of(end_unit).saturating_add(layout.parent_bytes - 1);
        if end < entry.start() || end > entry.end() {
            end = entry.end();
        }

        let whole_unit = start.saturating_add(layout.parent_bytes - 1) == end;
        let full_lanes = start_slot == 0 && end_slot == active_count - 1;
        if (!whole_unit && !full_lanes) || start_slot > end_slot {
            return Err(ConfigError::UnsupportedSlotStraddle {
                device: child.tag().to_owned(),
                start,
                end,
            });
        }
        if entry.address_mask() != 0 || sub.address_mask() != 0 {
            return Err(ConfigError::AddressMaskUnsupported {
                device: child.tag().to_owned(),
                start,
                end,
            });
        }
        if sub.mirror() & layout.slot_address_mask != 0 {
            return Err(ConfigError::MirrorBitConflict {
                device: child.tag().to_owned(),
                mirror: sub.mirror(),
                slot_bits: layout.slot_address_mask,
            });
        }

        sub.rebase(start, end, parent_bits, parent.global_mask());
        sub.set_mirror(sub.mirror() | entry.mirror());

        for handler in sub.handlers_mut() {
            match handler {
                Handler::None => {}
                Handler::Submap { .. } => {
                    return Err(ConfigError::InvalidChildHandlerKind {
                        device: child.tag().to_owned(),
                        start,
                        end,
                    });
                }
                Handler::Nop { bits, unit_mask } | Handler::Device { bits, unit_mask, .. } => {
                    if *bits == 0 && entry_bits != parent_bits {
                        *bits = entry_bits;
                    }
                    if *bits != 0 && *bits != parent_bits {
                        let base = if *unit_mask == 0 {
                            make_bitmask(entry_bits)
                        } else {
                            *unit_mask
                        };
                        *unit_mask = layout.lane_mask(base, start_slot, end_slot);
                    }
                }
            }
        }

        trace!(device = child.tag(), entry = %sub, "spliced child entry");
        spliced.push(sub);
    }

    debug!(
        device = child.tag(),
        space = %parent.space(),
        start = entry.start(),
        end = entry.end(),
        entry_bits,
        parent_bits,
        entries = spliced.len(),
        "uplifted submap"
    );
    Ok(spliced)
}
