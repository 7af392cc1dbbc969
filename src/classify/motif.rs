use crate::utils::Result;
use std::{fmt, fs, io::BufRead};

/// Longest motif the bit-parallel locator can search for.
pub const MAX_MOTIF_LEN: usize = 64;

const VALID_SYMBOLS: &[u8] = b"ACGTUN";

/// Upper-cases bases and folds T into U so that DNA and RNA alphabets,
/// soft-masked or not, compare equal.
pub fn normalize_bases(seq: &[u8]) -> Vec<u8> {
    seq.iter()
        .map(|b| match b.to_ascii_uppercase() {
            b'T' => b'U',
            base => base,
        })
        .collect()
}

/// Poly(A) tail followed by the three barcode linkers of the split-pool
/// library design. Each linker tolerates up to 10 edits and is anchored
/// on its full 20 nt.
const POLYA_LINKERS: [(&str, u8); 3] = [
    ("AAAAAAAAAAGAUUCAGCAG", 10),
    ("AUACGGUCUGGAUCGUUGAC", 10),
    ("UAGCACUGAGGAAUCAGUCC", 10),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Motif {
    pub seq: Vec<u8>,
    pub max_edit_distance: u8,
    pub anchor_len: usize,
}

impl Motif {
    pub fn new(seq: &str, max_edit_distance: u8, anchor_len: Option<usize>) -> Result<Self> {
        let seq = normalize_bases(seq.trim().as_bytes());
        if seq.is_empty() {
            return Err("Motif sequence cannot be empty".to_string());
        }
        if seq.len() > MAX_MOTIF_LEN {
            return Err(format!(
                "Motif length {} exceeds the maximum of {}",
                seq.len(),
                MAX_MOTIF_LEN
            ));
        }
        if let Some(&bad) = seq.iter().find(|b| !VALID_SYMBOLS.contains(b)) {
            return Err(format!(
                "Invalid symbol '{}' in motif {}",
                bad as char,
                String::from_utf8_lossy(&seq)
            ));
        }
        if max_edit_distance as usize > seq.len() {
            return Err(format!(
                "Edit distance budget {} exceeds motif length {}",
                max_edit_distance,
                seq.len()
            ));
        }
        let anchor_len = anchor_len.unwrap_or(seq.len());
        if anchor_len == 0 {
            return Err("Anchor length must be at least 1".to_string());
        }
        Ok(Motif {
            seq,
            max_edit_distance,
            anchor_len,
        })
    }
}

impl fmt::Display for Motif {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (max_ed={}, anchor={})",
            String::from_utf8_lossy(&self.seq),
            self.max_edit_distance,
            self.anchor_len
        )
    }
}

/// Ordered motif table. The first motif is the one the seed pre-check
/// is associated with; every later motif is checked against its predecessor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MotifSet {
    motifs: Vec<Motif>,
}

impl MotifSet {
    /// Resolves a preset name, otherwise treats `encoding` as a path to a motif TSV.
    pub fn new(encoding: &str) -> Result<Self> {
        match encoding {
            "polya-linkers" => Self::polya_linkers(),
            _ => {
                let file =
                    fs::File::open(encoding).map_err(|e| format!("File {}: {}", encoding, e))?;
                let reader = std::io::BufReader::new(file);
                Self::from_reader(reader)
            }
        }
    }

    pub fn polya_linkers() -> Result<Self> {
        const ANCHOR_LEN: usize = 20;
        let motifs = POLYA_LINKERS
            .iter()
            .map(|&(seq, max_ed)| Motif::new(seq, max_ed, Some(ANCHOR_LEN)))
            .collect::<Result<Vec<_>>>()?;
        Self::from_motifs(motifs)
    }

    pub fn from_motifs(motifs: Vec<Motif>) -> Result<Self> {
        if motifs.len() < 2 {
            return Err(format!(
                "At least 2 motifs are required, found {}",
                motifs.len()
            ));
        }
        Ok(MotifSet { motifs })
    }

    /// Parses `SEQUENCE<TAB>MAX_ED[<TAB>ANCHOR_LEN]` lines; `#` starts a comment line.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut motifs = Vec::new();
        for (line_number, line) in reader.lines().enumerate() {
            let line =
                line.map_err(|e| format!("Error reading line {}: {}", line_number + 1, e))?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let fields: Vec<&str> = line.split_whitespace().collect();
            let (seq, max_ed, anchor) = match fields[..] {
                [seq, max_ed] => (seq, max_ed, None),
                [seq, max_ed, anchor] => (seq, max_ed, Some(anchor)),
                _ => {
                    return Err(format!(
                        "Expected 2 or 3 fields at line {}, found {}: {}",
                        line_number + 1,
                        fields.len(),
                        line
                    ))
                }
            };
            let max_ed = max_ed.parse::<u8>().map_err(|e| {
                format!("Invalid edit distance at line {}: {}", line_number + 1, e)
            })?;
            let anchor = anchor
                .map(|a| a.parse::<usize>())
                .transpose()
                .map_err(|e| format!("Invalid anchor length at line {}: {}", line_number + 1, e))?;
            let motif = Motif::new(seq, max_ed, anchor)
                .map_err(|e| format!("Invalid motif at line {}: {}", line_number + 1, e))?;
            motifs.push(motif);
        }
        Self::from_motifs(motifs)
    }

    pub fn motifs(&self) -> &[Motif] {
        &self.motifs
    }

    pub fn len(&self) -> usize {
        self.motifs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.motifs.is_empty()
    }
}
