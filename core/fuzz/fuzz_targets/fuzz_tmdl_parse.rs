#![no_main]

use libfuzzer_sys::fuzz_target;

use pbi_schema::tmdl::{parse_definition, write_model};
use pbi_schema::normalize;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    let Ok(fragment) = parse_definition("fuzz.tmdl", text, 4) else {
        return;
    };

    // Anything that parses and normalizes must survive being written back.
    if let Ok((model, _)) = normalize(std::slice::from_ref(&fragment), None) {
        for file in write_model(&model) {
            let _ = parse_definition(&file.path, &file.text, 4);
        }
    }
});
