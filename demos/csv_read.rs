//! CSV Reader Examples
//!
//! Demonstrates CSV reading capabilities:
//! - Reading plain and compressed CSV
//! - Header-keyed records
//! - Custom delimiters and explicit headers
//! - Legacy charsets
//! - Row shape errors

use csvstream::{parse_binary, parse_string, CsvError, CsvReader, CsvWriter, DecodeOptions, ParseOptions};
use std::error::Error;
use std::io::Cursor;

fn main() -> Result<(), Box<dyn Error>> {
    println!("=== CSV Reader Examples ===\n");
    let dir = std::env::temp_dir();

    // Example 1: Plain CSV, record by record
    println!("1. Reading plain CSV...");
    {
        let path = dir.join("csvstream_read_demo.csv");
        let mut writer = CsvWriter::create(&path)?;
        writer.write_header(["Name", "City"])?;
        writer.write_row(["Alice", "New York, NY"])?;
        writer.write_row(["Bob", "San\nFrancisco"])?;
        writer.save()?;

        let mut reader = CsvReader::open(&path)?;
        while let Some(record) = reader.read_record()? {
            println!("   {:?}", record.to_map());
        }
        println!("   Headers: {:?}", reader.headers());
        println!("   Total rows read: {}", reader.row_count());
    }

    // Example 2: Compressed CSV
    println!("\n2. Reading Zstd compressed CSV...");
    {
        let path = dir.join("csvstream_read_demo.csv.zst");
        let mut writer = CsvWriter::create(&path)?;
        writer.write_header(["ID", "Value"])?;
        for i in 0..50_000 {
            writer.write_row([i.to_string(), format!("Value_{}", i)])?;
        }
        writer.save()?;

        let mut reader = CsvReader::open(&path)?;
        let mut count = 0;
        for record in reader.records() {
            let _record = record?;
            count += 1;
            if count % 10_000 == 0 {
                println!("   Read {} rows...", count);
            }
        }
        println!("   Total rows: {}", count);
    }

    // Example 3: Semicolons and an explicit header
    println!("\n3. Custom delimiter, explicit header...");
    {
        let data = "1;Widget\n2;\"Gadget; deluxe\"\n";
        let mut reader = CsvReader::from_reader(Cursor::new(data.as_bytes().to_vec()))
            .delimiter(';')
            .header(["id", "product"]);
        for record in reader.records() {
            let record = record?;
            println!("   {} => {}", record.get("id").unwrap_or(""), record.get("product").unwrap_or(""));
        }
    }

    // Example 4: Shift_JIS bytes
    println!("\n4. Decoding Shift_JIS...");
    {
        let bytes = [b'n', b'a', b'm', b'e', b'\n', 0x82, 0xA0, 0x82, 0xA2, b'\n'];
        let records = parse_binary(
            &bytes,
            &ParseOptions::default(),
            &DecodeOptions::new().charset("shift_jis"),
        )?;
        println!("   name = {:?}", records[0].get("name"));
    }

    // Example 5: Row shape errors
    println!("\n5. Row shape errors...");
    {
        match parse_string("name,age\nAlice\n", &ParseOptions::default()) {
            Err(CsvError::RowShape { row, expected, actual }) => {
                println!("   row {}: expected {} fields, got {}", row, expected, actual)
            }
            other => println!("   unexpected: {:?}", other),
        }
    }

    Ok(())
}
