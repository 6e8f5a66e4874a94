#![no_main]

use libfuzzer_sys::fuzz_target;
use rawk_io::FieldSplitter;

fuzz_target!(|data: &str| {
    // First line is FS, the rest is the record
    let (fs, record) = data.split_once('\n').unwrap_or((" ", data));

    if fs.len() > 100 || record.len() > 10_000 {
        return;
    }

    let splitter = match FieldSplitter::from_fs(fs) {
        Ok(s) => s,
        Err(_) => return,
    };
    let _ = splitter.split(record, false);
    let _ = splitter.split(record, true);
});
