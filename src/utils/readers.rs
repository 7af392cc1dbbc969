use super::Result;
use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::{BufReader, Read as ioRead};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadsFormat {
    Fasta,
    Fastq,
}

fn is_gzipped(path: &Path) -> bool {
    let path_str = path.to_string_lossy().to_lowercase();
    path_str.ends_with(".gz") || path_str.ends_with(".gzip")
}

/// Infers the record format from the file name, ignoring a trailing gzip extension.
pub fn detect_reads_format(path: &Path) -> Result<ReadsFormat> {
    let name = path.to_string_lossy().to_lowercase();
    let name = name
        .strip_suffix(".gz")
        .or_else(|| name.strip_suffix(".gzip"))
        .unwrap_or(&name);
    match name.rsplit('.').next() {
        Some("fq") | Some("fastq") => Ok(ReadsFormat::Fastq),
        Some("fa") | Some("fasta") | Some("fna") => Ok(ReadsFormat::Fasta),
        _ => Err(format!(
            "Unrecognized reads file extension (expected .fa/.fasta/.fq/.fastq, optionally .gz): {}",
            path.display()
        )),
    }
}

pub fn open_reads_reader(path: &Path) -> Result<BufReader<Box<dyn ioRead + Send>>> {
    let file = File::open(path).map_err(|e| format!("File {}: {}", path.display(), e))?;
    if is_gzipped(path) {
        let gz_decoder = MultiGzDecoder::new(file);
        if gz_decoder.header().is_some() {
            Ok(BufReader::new(Box::new(gz_decoder)))
        } else {
            Err(format!("Invalid gzip header: {}", path.to_string_lossy()))
        }
    } else {
        Ok(BufReader::new(Box::new(file)))
    }
}
