use super::decision::{Decision, Verdict};
use crate::utils::{detect_reads_format, open_reads_reader, ReadsFormat, Result};
use bio::io::{fasta, fastq};
use crossbeam_channel::Sender;
use std::{fmt, path::Path};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Read {
    pub id: String,
    pub seq: Vec<u8>,
}

impl Read {
    pub fn new(id: &str, seq: &[u8]) -> Self {
        Read {
            id: id.to_string(),
            seq: seq.to_vec(),
        }
    }
}

/// Instrument action attached to a read with a terminal decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    StopReceiving,
    Eject,
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Marker::StopReceiving => write!(f, "accept"),
            Marker::Eject => write!(f, "reject"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotatedRead {
    pub read: Read,
    pub verdict: Verdict,
}

impl AnnotatedRead {
    /// No marker means the host should keep sequencing and re-submit later.
    pub fn marker(&self) -> Option<Marker> {
        match self.verdict.decision {
            Decision::Continue => None,
            Decision::Accept => Some(Marker::StopReceiving),
            Decision::Reject => Some(Marker::Eject),
        }
    }
}

pub fn stream_reads_into_channel(reads_path: &Path, sender: Sender<Result<Read>>) {
    let send = |item: Result<Read>| sender.send(item).is_ok();
    let reader = match open_reads_reader(reads_path) {
        Ok(reader) => reader,
        Err(e) => {
            send(Err(e));
            return;
        }
    };
    let format = match detect_reads_format(reads_path) {
        Ok(format) => format,
        Err(e) => {
            send(Err(e));
            return;
        }
    };

    match format {
        ReadsFormat::Fasta => {
            for (record_number, record) in fasta::Reader::new(reader).records().enumerate() {
                let item = record
                    .map(|r| Read::new(r.id(), r.seq()))
                    .map_err(|e| format!("Error at FASTA record {}: {}", record_number + 1, e));
                let failed = item.is_err();
                if !send(item) || failed {
                    return;
                }
            }
        }
        ReadsFormat::Fastq => {
            for (record_number, record) in fastq::Reader::new(reader).records().enumerate() {
                let item = record
                    .map(|r| Read::new(r.id(), r.seq()))
                    .map_err(|e| format!("Error at FASTQ record {}: {}", record_number + 1, e));
                let failed = item.is_err();
                if !send(item) || failed {
                    return;
                }
            }
        }
    }
}
