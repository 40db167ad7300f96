//! Builds a small machine map with nested submaps and prints the flat table.

use addrmap_core::{
    build_space_map, install_device_map, resolve_device, Access, AddressMap, AddressSpaceConfig,
    AddressSpaceId, ConfigError, DeviceMapping, Endianness, MapConstructor, StaticDevice,
};
use proptest as _;
use rstest as _;
#[cfg(feature = "serde")]
use serde as _;
use thiserror as _;
use tracing as _;

fn uart_regs(map: &mut AddressMap) -> Result<(), ConfigError> {
    map.range(0x00, 0x00).set_read_write("rx_r", "tx_w", 8, 0)?;
    map.range(0x01, 0x01).set_read("status_r", 8, 0)?;
    map.range(0x02, 0x03).set_nop_read_write();
    Ok(())
}

fn io_board(map: &mut AddressMap) -> Result<(), ConfigError> {
    map.range(0x0000, 0x0007).set_submap("uart", "map", 8, 0x00FF)?;
    map.range(0x0010, 0x001F).set_read("dip_r", 16, 0)?;
    Ok(())
}

fn main_map(map: &mut AddressMap) -> Result<(), ConfigError> {
    map.range(0x00_0000, 0x03_FFFF)
        .set_read("rom_r", 16, 0)?
        .set_region("maincpu", 0);
    map.range(0x10_0000, 0x10_FFFF)
        .set_read_write("ram_r", "ram_w", 16, 0)?
        .set_share("mainram");
    map.range(0xA0_0000, 0xA0_00FF)
        .set_mirror(0x01_0000)
        .set_submap("ioboard", "map", 0, 0)?;
    Ok(())
}

fn machine() -> StaticDevice {
    let uart = StaticDevice::new("uart").with_device_map("map", 8, MapConstructor::new(uart_regs));
    let ioboard = StaticDevice::new("ioboard")
        .with_device_map("map", 16, MapConstructor::new(io_board))
        .with_child(uart);
    let nvram = StaticDevice::new("nvram").with_device_map(
        "map",
        8,
        MapConstructor::new(|map| {
            map.range(0x000, 0x3FF).set_read_write("cell_r", "cell_w", 8, 0)?;
            Ok(())
        }),
    );

    StaticDevice::new("maincpu")
        .with_space(
            AddressSpaceId::Program,
            AddressSpaceConfig::new("program", Endianness::Big, 16, 24),
        )
        .with_declared_map(AddressSpaceId::Program, MapConstructor::new(main_map))
        .with_child(ioboard)
        .with_child(nvram)
}

fn main() -> Result<(), ConfigError> {
    let root = machine();
    let program = build_space_map(&root, AddressSpaceId::Program)?;
    print!("{program}");

    for address in [0x00_0100, 0x10_0040, 0xA1_0002, 0xA0_0010] {
        match program.lookup(address, Access::Read) {
            Some(entry) => println!("{address:#08x} -> {}", entry.read_handler()),
            None => println!("{address:#08x} -> unmapped"),
        }
    }

    if let Err(errors) = program.validate(24) {
        for error in errors {
            println!("invalid: {error}");
        }
    }

    let config = AddressSpaceConfig::new("program", Endianness::Big, 16, 24);
    let mapping = DeviceMapping {
        start: 0xC0_0000,
        end: 0xC0_07FF,
        bits: 8,
        unit_mask: 0xFF00,
        map: "map",
    };
    let nvram = resolve_device(&root, "nvram").ok_or_else(|| ConfigError::UnknownSubdevice {
        owner: "maincpu".to_owned(),
        tag: "nvram".to_owned(),
    })?;
    let dynamic = install_device_map(&config.info(AddressSpaceId::Program), &mapping, nvram)?;
    print!("{dynamic}");
    Ok(())
}
