//! CSV Writer Examples
//!
//! Demonstrates CSV writing capabilities:
//! - Plain and compressed files (Zstd, Gzip)
//! - Custom delimiters, line endings and quoting
//! - In-memory output for HTTP response bodies
//!
//! Files are written to the system temp directory.

use csvstream::{escape_field, CompressionMethod, CsvWriter, EscapeOptions, LineEnding};
use std::error::Error;
use std::time::Instant;

fn main() -> Result<(), Box<dyn Error>> {
    println!("=== CSV Writer Examples ===\n");
    let dir = std::env::temp_dir();

    // Example 1: Plain CSV
    println!("1. Writing plain CSV...");
    {
        let path = dir.join("csvstream_people.csv");
        let mut writer = CsvWriter::create(&path)?;
        writer.write_header(["Name", "Age", "Note"])?;
        writer.write_row(["Alice", "30", "likes, commas"])?;
        writer.write_row(["Bob", "25", "says \"hi\""])?;
        writer.write_row(["Carol", "41", "two\nlines"])?;
        writer.save()?;
        println!("   ✓ Created {}", path.display());
    }

    // Example 2: Zstd compressed, 100K rows
    println!("\n2. Writing Zstd compressed CSV (100K rows)...");
    {
        let path = dir.join("csvstream_large.csv.zst");
        let start = Instant::now();
        let mut writer = CsvWriter::create(&path)?;
        writer.write_header(["ID", "Name", "Value"])?;
        for i in 0..100_000 {
            writer.write_row([i.to_string(), format!("Name_{}", i), (i * 100).to_string()])?;
        }
        writer.save()?;
        let size = std::fs::metadata(&path)?.len();
        println!("   ✓ Created {} ({} bytes) in {:?}", path.display(), size, start.elapsed());
    }

    // Example 3: Explicit Deflate level
    println!("\n3. Writing Deflate/Gzip compressed CSV...");
    {
        let path = dir.join("csvstream_data.csv.gz");
        let mut writer = CsvWriter::with_compression(&path, CompressionMethod::Deflate, 9)?;
        writer.write_header(["Month", "Sales"])?;
        writer.write_rows([["January", "50000"], ["February", "55000"]])?;
        writer.save()?;
        println!("   ✓ Created {}", path.display());
    }

    // Example 4: Semicolons, CRLF, every field quoted
    println!("\n4. Custom delimiter and line ending...");
    {
        let mut writer = CsvWriter::in_memory()
            .delimiter(';')
            .line_ending(LineEnding::CrLf)
            .always_quote(true);
        writer.write_header(["Product", "Price"])?;
        writer.write_row(["Widget; large", "9,99"])?;
        let text = String::from_utf8(writer.into_bytes()?)?;
        println!("   {:?}", text);
    }

    // Example 5: In-memory compressed body for an HTTP response
    println!("\n5. In-memory compressed output...");
    {
        let mut writer = CsvWriter::in_memory_compressed(6)?;
        writer.write_header(["ID", "Value"])?;
        for i in 0..1000 {
            writer.write_row([i.to_string(), format!("Value_{}", i)])?;
        }
        let rows = writer.row_count();
        let bytes = writer.into_bytes()?;
        println!("   {} rows -> {} bytes (application/zip)", rows, bytes.len());
    }

    // Example 6: Escaping single fields
    println!("\n6. Escaping fields...");
    {
        let options = EscapeOptions::default();
        for value in ["plain", "a,b", "\"", "multi\nline"] {
            println!("   {:?} -> {}", value, escape_field(value, &options));
        }
        let dollar = EscapeOptions::default().quotation('$');
        println!("   {:?} -> {}", "$", escape_field("$", &dollar));
    }

    Ok(())
}
