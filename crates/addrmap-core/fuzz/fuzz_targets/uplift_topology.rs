#![no_main]

use addrmap_core::{
    build_space_map, AddressSpaceConfig, AddressSpaceId, Endianness, MapConstructor, StaticDevice,
    VALID_DATA_WIDTHS,
};
use libfuzzer_sys::fuzz_target;

fn width(byte: u8) -> u8 {
    VALID_DATA_WIDTHS[usize::from(byte) % VALID_DATA_WIDTHS.len()]
}

fuzz_target!(|data: &[u8]| {
    if data.len() < 12 {
        return;
    }

    let parent_bits = width(data[0]);
    let child_bits = width(data[1]);
    let endianness = if data[2] & 1 == 0 {
        Endianness::Little
    } else {
        Endianness::Big
    };
    let unit_mask = u64::from_le_bytes([
        data[3], data[4], data[5], data[6], data[7], data[8], data[9], data[10],
    ]);
    let bits = if data[11] & 1 == 0 { 0 } else { child_bits };

    let spans: Vec<(u64, u64, u64)> = data[12..]
        .chunks_exact(3)
        .map(|chunk| {
            let start = u64::from(chunk[0]);
            (start, start + u64::from(chunk[1] & 0x3F), u64::from(chunk[2]))
        })
        .collect();

    let child = StaticDevice::new("child").with_device_map(
        "map",
        child_bits,
        MapConstructor::new(move |map| {
            for &(start, end, mirror) in &spans {
                map.range(start, end).set_mirror(mirror << 8).set_nop_read_write();
            }
            Ok(())
        }),
    );
    let root = StaticDevice::new("root")
        .with_space(
            AddressSpaceId::Program,
            AddressSpaceConfig::new("program", endianness, parent_bits, 32),
        )
        .with_declared_map(
            AddressSpaceId::Program,
            MapConstructor::new(move |map| {
                map.range(0x1000, 0x1FFF).set_submap("child", "map", bits, unit_mask)?;
                Ok(())
            }),
        )
        .with_child(child);

    if let Ok(map) = build_space_map(&root, AddressSpaceId::Program) {
        assert!(!map.has_submaps());
        for entry in map.entries() {
            assert!(entry.start() >= 0x1000 && entry.end() <= 0x1FFF);
            assert!(entry.start() <= entry.end());
        }
    }
});
