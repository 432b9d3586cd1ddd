//! Streaming parse example
//!
//! Parses CSV bytes read from an async reader in small chunks, printing
//! records as they complete and stopping early once enough have been seen.
//!
//! Run with: cargo run --example stream_parse --features tokio

use csvstream::{parse_byte_stream, source, DecodeOptions, ParseOptions};
use futures::StreamExt;
use std::error::Error;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let mut data = String::from("id,comment\r\n");
    for i in 0..1000 {
        data.push_str(&format!("{},\"line one\r\nline \"\"{}\"\"\"\r\n", i, i));
    }

    // 13-byte chunks split quoted fields and CRLF pairs
    let chunks = source::from_async_read(std::io::Cursor::new(data.into_bytes()), 13);
    let mut records = parse_byte_stream(chunks, &ParseOptions::default(), &DecodeOptions::new())?;

    let mut seen = 0;
    while let Some(record) = records.next().await {
        let record = record?;
        seen += 1;
        if seen <= 3 {
            println!("{:?}", record.to_map());
        }
        if seen == 10 {
            // Stops upstream reads and drops buffered partial output
            records.cancel();
        }
    }
    println!("records seen: {}", seen);

    Ok(())
}
