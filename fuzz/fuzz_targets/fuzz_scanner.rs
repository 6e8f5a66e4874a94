#![no_main]

use libfuzzer_sys::fuzz_target;
use rawk_io::{IoConfig, JSON_RS, RecordReader};
use std::io::Cursor;

fn records(input: &[u8], config: &IoConfig) -> Vec<String> {
    let mut reader = RecordReader::new(Box::new(Cursor::new(input.to_vec())), config);
    let mut out = Vec::new();
    while let Ok(Some(record)) = reader.next_record() {
        out.push(record.text());
    }
    out
}

fuzz_target!(|data: &[u8]| {
    // First byte picks the record separator, second the read size
    if data.len() < 2 || data.len() > 100_000 {
        return;
    }
    let rs = match data[0] % 4 {
        0 => "\n".to_string(),
        1 => String::new(),
        2 => JSON_RS.to_string(),
        _ => ((data[0] % 0x7f).max(1) as char).to_string(),
    };
    let input = &data[2..];

    let whole = IoConfig::default().with_rs(&rs);
    let trickle = IoConfig::default()
        .with_rs(&rs)
        .with_input_buf_size(1 + data[1] as usize % 64);

    // Record boundaries must not depend on how the bytes arrive
    assert_eq!(records(input, &whole), records(input, &trickle));
});
