//! File indexing and per-language static call-site extraction

pub mod error;
pub mod index;
pub mod languages;
pub mod scanner;


pub use error::IndexError;
pub use index::{AllowList, FileIndex, IndexedFile, SCRIPT_EXTENSIONS, is_script_path};
pub use scanner::Scanner;
