#![no_main]

use libfuzzer_sys::fuzz_target;
use std::io::Cursor;

use pbi_schema::{ContainerLimits, ContainerReader, ExtractConfig, extract};

fuzz_target!(|data: &[u8]| {
    let config = ExtractConfig::builder()
        .container_limits(ContainerLimits {
            max_entries: 2000,
            max_part_uncompressed_bytes: 5 * 1024 * 1024,
            max_total_uncompressed_bytes: 50 * 1024 * 1024,
        })
        .build()
        .expect("valid fuzz config");

    let reader = ContainerReader::new(Cursor::new(data.to_vec()), "fuzz.pbix");
    let _ = extract(reader, &config);
});
