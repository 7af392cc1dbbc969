use super::{
    locate::{MotifLocator, PositionEstimate},
    motif::normalize_bases,
};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Decision {
    /// Keep sequencing and re-submit once more bases are available.
    Continue,
    /// All motifs found at valid spacing (stop_receiving).
    Accept,
    /// Motif structure is missing or mis-spaced (eject).
    Reject,
}

impl Decision {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Decision::Continue)
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Decision::Continue => "continue",
            Decision::Accept => "accept",
            Decision::Reject => "reject",
        };
        write!(f, "{}", s)
    }
}

/// Gate that settled a decision. Motif numbers are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Gate {
    Seed,
    FirstMotif,
    TailLength,
    MotifOrder { motif: usize },
    MotifSpacing { motif: usize },
    PrefixLimit,
}

impl fmt::Display for Gate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Gate::Seed => write!(f, "seed"),
            Gate::FirstMotif => write!(f, "motif1"),
            Gate::TailLength => write!(f, "tail"),
            Gate::MotifOrder { motif } => write!(f, "motif{}", motif),
            Gate::MotifSpacing { motif } => write!(f, "spacing{}", motif),
            Gate::PrefixLimit => write!(f, "prefix_limit"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub decision: Decision,
    /// `None` when every gate passed, or when classification faulted.
    pub gate: Option<Gate>,
    pub hits: Vec<PositionEstimate>,
}

impl Verdict {
    fn new(decision: Decision, gate: Gate, hits: Vec<PositionEstimate>) -> Self {
        Verdict {
            decision,
            gate: Some(gate),
            hits,
        }
    }

    pub fn accept(hits: Vec<PositionEstimate>) -> Self {
        Verdict {
            decision: Decision::Accept,
            gate: None,
            hits,
        }
    }

    pub fn faulted() -> Self {
        Verdict {
            decision: Decision::Continue,
            gate: None,
            hits: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecisionParams {
    pub seed: Vec<u8>,
    pub min_tail: usize,
    pub gap_min: isize,
    pub gap_max: isize,
    pub max_prefix_len: Option<usize>,
}

impl Default for DecisionParams {
    fn default() -> Self {
        DecisionParams {
            seed: b"AAAAAAAAAA".to_vec(),
            min_tail: 100,
            gap_min: 25,
            gap_max: 45,
            max_prefix_len: None,
        }
    }
}

impl DecisionParams {
    pub fn validate(&self) -> Result<(), String> {
        if self.gap_min >= self.gap_max {
            return Err(format!(
                "Minimum motif gap ({}) must be smaller than maximum motif gap ({})",
                self.gap_min, self.gap_max
            ));
        }
        if self.gap_min < 0 {
            return Err(format!(
                "Minimum motif gap must be non-negative, got {}",
                self.gap_min
            ));
        }
        if self.max_prefix_len == Some(0) {
            return Err("Maximum prefix length must be at least 1".to_string());
        }
        Ok(())
    }

    /// Exclusive on both ends.
    pub fn gap_ok(&self, gap: isize) -> bool {
        self.gap_min < gap && gap < self.gap_max
    }

    fn has_seed(&self, seq: &[u8]) -> bool {
        self.seed.is_empty() || seq.windows(self.seed.len()).any(|w| w == self.seed.as_slice())
    }
}

/// Stateless gate machine: every call is computed from the full prefix seen so far.
pub struct DecisionEngine {
    locator: MotifLocator,
    params: DecisionParams,
}

impl DecisionEngine {
    pub fn new(locator: MotifLocator, mut params: DecisionParams) -> Self {
        params.seed = normalize_bases(&params.seed);
        DecisionEngine { locator, params }
    }

    pub fn params(&self) -> &DecisionParams {
        &self.params
    }

    /// Reads may be soft-masked and in either DNA or RNA alphabet.
    pub fn classify(&self, seq: &[u8]) -> Verdict {
        let seq = normalize_bases(seq);
        let verdict = self.run_gates(&seq);
        match self.params.max_prefix_len {
            Some(limit) if verdict.decision == Decision::Continue && seq.len() >= limit => {
                Verdict::new(Decision::Reject, Gate::PrefixLimit, verdict.hits)
            }
            _ => verdict,
        }
    }

    fn run_gates(&self, seq: &[u8]) -> Verdict {
        if seq.is_empty() || !self.params.has_seed(seq) {
            return Verdict::new(Decision::Continue, Gate::Seed, Vec::new());
        }

        let hits = self.locator.locate(seq);
        let first = match hits[0] {
            Some(hit) if hit.offset >= 0 => hit.offset,
            _ => return Verdict::new(Decision::Continue, Gate::FirstMotif, hits),
        };

        if (seq.len() as isize - first) < self.params.min_tail as isize {
            return Verdict::new(Decision::Continue, Gate::TailLength, hits);
        }

        let mut prev = first;
        for (idx, estimate) in hits.iter().enumerate().skip(1) {
            let motif = idx + 1;
            let offset = match estimate {
                Some(hit) if hit.offset > prev => hit.offset,
                _ => return Verdict::new(Decision::Reject, Gate::MotifOrder { motif }, hits),
            };
            if !self.params.gap_ok(offset - prev) {
                return Verdict::new(Decision::Reject, Gate::MotifSpacing { motif }, hits);
            }
            prev = offset;
        }

        Verdict::accept(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::locate::DEFAULT_MIN_REMAINING;
    use crate::classify::motif::{Motif, MotifSet};

    const LINKER_1: &str = "AAAAAAAAAAGAUUCAGCAG";
    const LINKER_2: &str = "AUACGGUCUGGAUCGUUGAC";
    const LINKER_3: &str = "UAGCACUGAGGAAUCAGUCC";

    fn strict_engine(params: DecisionParams) -> DecisionEngine {
        let set = MotifSet::from_motifs(vec![
            Motif::new(LINKER_1, 3, None).unwrap(),
            Motif::new(LINKER_2, 3, None).unwrap(),
            Motif::new(LINKER_3, 3, None).unwrap(),
        ])
        .unwrap();
        DecisionEngine::new(MotifLocator::new(&set, DEFAULT_MIN_REMAINING), params)
    }

    fn preset_engine() -> DecisionEngine {
        let set = MotifSet::polya_linkers().unwrap();
        DecisionEngine::new(
            MotifLocator::new(&set, DEFAULT_MIN_REMAINING),
            DecisionParams::default(),
        )
    }

    fn filler(n: usize) -> String {
        "C".repeat(n)
    }

    /// Linker 1 at offset 40, linker 2 `gap2` bases later and linker 3 `gap3` after that.
    fn three_linkers(gap2: usize, gap3: usize) -> String {
        format!(
            "{}{}{}{}{}{}{}",
            filler(40),
            LINKER_1,
            filler(gap2 - 20),
            LINKER_2,
            filler(gap3 - 20),
            LINKER_3,
            filler(60)
        )
    }

    #[test]
    fn test_no_seed_continues() {
        let engine = strict_engine(DecisionParams::default());
        let verdict = engine.classify(filler(200).as_bytes());
        assert_eq!(verdict.decision, Decision::Continue);
        assert_eq!(verdict.gate, Some(Gate::Seed));
        assert!(verdict.hits.is_empty());
    }

    #[test]
    fn test_empty_sequence_continues() {
        let engine = strict_engine(DecisionParams::default());
        assert_eq!(engine.classify(b"").decision, Decision::Continue);

        let no_seed = DecisionParams {
            seed: Vec::new(),
            ..DecisionParams::default()
        };
        assert_eq!(strict_engine(no_seed).classify(b"").decision, Decision::Continue);
    }

    #[test]
    fn test_seed_without_first_motif_continues() {
        let engine = strict_engine(DecisionParams::default());
        let seq = format!("{}AAAAAAAAAAAA{}", filler(30), filler(150));
        let verdict = engine.classify(seq.as_bytes());
        assert_eq!(verdict.decision, Decision::Continue);
        assert_eq!(verdict.gate, Some(Gate::FirstMotif));
    }

    #[test]
    fn test_short_tail_continues() {
        let engine = strict_engine(DecisionParams::default());
        let seq = format!("{}{}{}", filler(40), LINKER_1, filler(50));
        let verdict = engine.classify(seq.as_bytes());
        assert_eq!(verdict.decision, Decision::Continue);
        assert_eq!(verdict.gate, Some(Gate::TailLength));
        assert_eq!(verdict.hits[0].unwrap().offset, 40);
    }

    #[test]
    fn test_missing_second_motif_rejects() {
        let engine = strict_engine(DecisionParams::default());
        let seq = format!("{}{}{}", filler(40), LINKER_1, filler(120));
        let verdict = engine.classify(seq.as_bytes());
        assert_eq!(verdict.decision, Decision::Reject);
        assert_eq!(verdict.gate, Some(Gate::MotifOrder { motif: 2 }));
    }

    #[test]
    fn test_missing_third_motif_rejects() {
        let engine = strict_engine(DecisionParams::default());
        let seq = format!(
            "{}{}{}{}{}",
            filler(40),
            LINKER_1,
            filler(10),
            LINKER_2,
            filler(100)
        );
        let verdict = engine.classify(seq.as_bytes());
        assert_eq!(verdict.decision, Decision::Reject);
        assert_eq!(verdict.gate, Some(Gate::MotifOrder { motif: 3 }));
        assert_eq!(verdict.hits[1].unwrap().offset, 70);
    }

    #[test]
    fn test_all_motifs_accept() {
        let seq = three_linkers(30, 32);
        let verdict = strict_engine(DecisionParams::default()).classify(seq.as_bytes());
        assert_eq!(verdict.decision, Decision::Accept);
        assert_eq!(verdict.gate, None);
        let offsets: Vec<isize> = verdict.hits.iter().map(|h| h.unwrap().offset).collect();
        assert_eq!(offsets, vec![40, 70, 102]);
    }

    #[test]
    fn test_all_motifs_accept_with_preset() {
        let seq = three_linkers(30, 32);
        let verdict = preset_engine().classify(seq.as_bytes());
        assert_eq!(verdict.decision, Decision::Accept);
    }

    #[test]
    fn test_soft_masked_and_dna_reads_accept() {
        let engine = preset_engine();
        let lowercase = three_linkers(30, 32).to_ascii_lowercase();
        assert_eq!(engine.classify(lowercase.as_bytes()).decision, Decision::Accept);

        let dna = three_linkers(30, 32).replace('U', "T");
        let verdict = engine.classify(dna.as_bytes());
        assert_eq!(verdict.decision, Decision::Accept);
        let offsets: Vec<isize> = verdict.hits.iter().map(|h| h.unwrap().offset).collect();
        assert_eq!(offsets, vec![40, 70, 102]);

        let dna_seed = DecisionParams {
            seed: b"aaaaaaaaaagattc".to_vec(),
            ..DecisionParams::default()
        };
        let verdict = strict_engine(dna_seed).classify(dna.to_ascii_lowercase().as_bytes());
        assert_eq!(verdict.decision, Decision::Accept);
    }

    #[test]
    fn test_second_motif_too_close_rejects() {
        let seq = three_linkers(20, 32);
        let verdict = strict_engine(DecisionParams::default()).classify(seq.as_bytes());
        assert_eq!(verdict.decision, Decision::Reject);
        assert_eq!(verdict.gate, Some(Gate::MotifSpacing { motif: 2 }));
    }

    #[test]
    fn test_third_motif_too_far_rejects() {
        let seq = three_linkers(30, 50);
        let verdict = strict_engine(DecisionParams::default()).classify(seq.as_bytes());
        assert_eq!(verdict.decision, Decision::Reject);
        assert_eq!(verdict.gate, Some(Gate::MotifSpacing { motif: 3 }));
    }

    #[test]
    fn test_gap_bounds_are_exclusive() {
        let engine = strict_engine(DecisionParams::default());
        for (gap, expected) in [
            (25, Decision::Reject),
            (26, Decision::Accept),
            (44, Decision::Accept),
            (45, Decision::Reject),
        ] {
            let verdict = engine.classify(three_linkers(gap, 30).as_bytes());
            assert_eq!(verdict.decision, expected, "gap2 = {}", gap);
            let verdict = engine.classify(three_linkers(30, gap).as_bytes());
            assert_eq!(verdict.decision, expected, "gap3 = {}", gap);
        }
    }

    #[test]
    fn test_gap_ok() {
        let params = DecisionParams::default();
        for gap in -5..60 {
            assert_eq!(params.gap_ok(gap), gap > 25 && gap < 45);
        }
    }

    #[test]
    fn test_classify_is_idempotent() {
        let engine = preset_engine();
        for seq in [three_linkers(30, 32), three_linkers(20, 32), filler(80)] {
            assert_eq!(engine.classify(seq.as_bytes()), engine.classify(seq.as_bytes()));
        }
    }

    #[test]
    fn test_prefix_limit() {
        let seq = filler(300);
        let unlimited = strict_engine(DecisionParams::default());
        assert_eq!(unlimited.classify(seq.as_bytes()).decision, Decision::Continue);

        let limited = strict_engine(DecisionParams {
            max_prefix_len: Some(250),
            ..DecisionParams::default()
        });
        let verdict = limited.classify(seq.as_bytes());
        assert_eq!(verdict.decision, Decision::Reject);
        assert_eq!(verdict.gate, Some(Gate::PrefixLimit));
        assert_eq!(limited.classify(&seq.as_bytes()[..200]).decision, Decision::Continue);

        // Terminal decisions are left alone
        let accepted = three_linkers(30, 32);
        assert_eq!(limited.classify(accepted.as_bytes()).decision, Decision::Accept);
    }

    #[test]
    fn test_params_validate() {
        assert!(DecisionParams::default().validate().is_ok());
        let bad = DecisionParams {
            gap_min: 45,
            gap_max: 45,
            ..DecisionParams::default()
        };
        assert!(bad.validate().is_err());
        let bad = DecisionParams {
            max_prefix_len: Some(0),
            ..DecisionParams::default()
        };
        assert!(bad.validate().is_err());
    }
}
