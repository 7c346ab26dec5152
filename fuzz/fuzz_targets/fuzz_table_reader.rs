#![no_main]

use drop_storage::btree::TableReader;
use libfuzzer_sys::fuzz_target;
use std::io::Write;

fuzz_target!(|data: &[u8]| {
    // Limit input size
    if data.len() > 10_000_000 {
        return;
    }

    // Write to temporary file, open it as a table and walk every entry
    if let Ok(mut temp_file) = tempfile::NamedTempFile::new() {
        if temp_file.write_all(data).is_ok() {
            if let Ok(mut reader) = TableReader::open(temp_file.path()) {
                let mut iter = reader.iter();
                while let Ok(Some(_)) = iter.next_entry() {}
            }
        }
    }
});
