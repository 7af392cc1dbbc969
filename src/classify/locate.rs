use super::motif::{Motif, MotifSet};
use bio::pattern_matching::myers::Myers;

/// Best approximate occurrence of a motif in a read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotifHit {
    /// Estimated motif start: match end minus the motif anchor length.
    /// Negative when a truncated match sits at the very start of the read.
    pub offset: isize,
    /// Absolute, exclusive right boundary of the match.
    pub end: usize,
    pub distance: u8,
}

pub type PositionEstimate = Option<MotifHit>;

/// Stop scanning once fewer bases than this remain past the last match.
pub const DEFAULT_MIN_REMAINING: usize = 15;

struct MotifSearcher {
    motif: Motif,
    myers: Myers<u64>,
}

/// Locates an ordered motif table in a read, each motif searched only past
/// the previous motif's match.
pub struct MotifLocator {
    searchers: Vec<MotifSearcher>,
    min_remaining: usize,
}

impl MotifLocator {
    pub fn new(motifs: &MotifSet, min_remaining: usize) -> Self {
        let searchers = motifs
            .motifs()
            .iter()
            .map(|motif| MotifSearcher {
                motif: motif.clone(),
                myers: Myers::<u64>::new(&motif.seq),
            })
            .collect();
        MotifLocator {
            searchers,
            min_remaining,
        }
    }

    /// Returns one estimate per motif, in motif order.
    pub fn locate(&self, seq: &[u8]) -> Vec<PositionEstimate> {
        let mut estimates = vec![None; self.searchers.len()];
        let mut start = 0;
        for (searcher, estimate) in self.searchers.iter().zip(estimates.iter_mut()) {
            if start >= seq.len() {
                break;
            }
            let Some((rel_end, distance)) = searcher.best_end(&seq[start..]) else {
                continue;
            };
            let end = start + rel_end;
            *estimate = Some(MotifHit {
                offset: end as isize - searcher.motif.anchor_len as isize,
                end,
                distance,
            });
            start = end;
            if seq.len() - end < self.min_remaining {
                break;
            }
        }
        estimates
    }
}

impl MotifSearcher {
    /// Exclusive end and distance of the lowest-distance match within budget.
    /// Ties go to the earliest end.
    fn best_end(&self, text: &[u8]) -> Option<(usize, u8)> {
        self.myers
            .find_all_end(text, self.motif.max_edit_distance)
            .min_by_key(|&(end, dist)| (dist, end))
            .map(|(end, dist)| (end + 1, dist))
    }
}
