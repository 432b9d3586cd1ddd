//! CSV tokenizing, record assembly and escaping

mod assembler;
mod escape;
mod lexer;

pub use assembler::{Assemble, RecordAssembler};
pub use escape::{escape_field, CsvEncoder, EscapeOptions};
pub use lexer::Lexer;

// Re-export CompressionMethod from s-zip for convenience
pub use s_zip::CompressionMethod;
