mod readers;
mod util;

pub use readers::{detect_reads_format, open_reads_reader, ReadsFormat};
pub use util::{handle_error_and_exit, Result};
