use super::{
    decision::{DecisionEngine, Verdict},
    read::{AnnotatedRead, Read},
};
use rayon::{
    iter::{IntoParallelIterator, ParallelIterator},
    ThreadPool, ThreadPoolBuilder,
};
use std::{
    panic::{self, AssertUnwindSafe},
    sync::Arc,
};

/// Classifies independent reads on a dedicated thread pool, returning results in input order.
pub struct BatchDispatcher {
    engine: Arc<DecisionEngine>,
    pool: Option<ThreadPool>,
}

impl BatchDispatcher {
    pub fn new(engine: DecisionEngine, num_threads: usize) -> Result<Self, String> {
        if num_threads == 0 {
            return Err("Number of threads must be at least 1".into());
        }
        log::debug!("Initializing thread pool with {} threads...", num_threads);
        let pool = ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .thread_name(|i| format!("linkerfish-{}", i))
            .start_handler(|_thread_index| {
                log::trace!("Initialized thread {:?}", std::thread::current().id());
            })
            .build()
            .map_err(|e| format!("Failed to initialize thread pool: {}", e))?;
        Ok(BatchDispatcher {
            engine: Arc::new(engine),
            pool: Some(pool),
        })
    }

    pub fn is_ready(&self) -> bool {
        self.pool.is_some()
    }

    pub fn engine(&self) -> &DecisionEngine {
        &self.engine
    }

    /// Blocks until every read has been classified. Returns `None` after shutdown.
    pub fn dispatch(&self, reads: Vec<Read>) -> Option<Vec<AnnotatedRead>> {
        let pool = self.pool.as_ref()?;
        let engine = &self.engine;
        Some(annotate_batch(pool, reads, |seq| engine.classify(seq)))
    }

    /// Releases the pool; idle workers exit once it is dropped.
    pub fn shutdown(&mut self) {
        if self.pool.take().is_some() {
            log::debug!("Thread pool released");
        }
    }
}

impl Drop for BatchDispatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn annotate_batch<F>(pool: &ThreadPool, reads: Vec<Read>, classify: F) -> Vec<AnnotatedRead>
where
    F: Fn(&[u8]) -> Verdict + Sync,
{
    pool.install(|| {
        reads
            .into_par_iter()
            .map(|read| {
                let verdict = classify_isolated(&read, &classify);
                AnnotatedRead { read, verdict }
            })
            .collect()
    })
}

/// A panic while classifying one read leaves that read at Continue.
fn classify_isolated<F>(read: &Read, classify: &F) -> Verdict
where
    F: Fn(&[u8]) -> Verdict,
{
    match panic::catch_unwind(AssertUnwindSafe(|| classify(&read.seq))) {
        Ok(verdict) => {
            log::trace!(
                "{}: {} at {} bp (gate: {:?})",
                read.id,
                verdict.decision,
                read.seq.len(),
                verdict.gate
            );
            verdict
        }
        Err(_) => {
            log::error!("{}: classification failed, keeping read", read.id);
            Verdict::faulted()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{
        decision::{Decision, DecisionParams, Gate},
        locate::{MotifLocator, DEFAULT_MIN_REMAINING},
        motif::MotifSet,
    };

    const LINKER_1: &str = "AAAAAAAAAAGAUUCAGCAG";
    const LINKER_2: &str = "AUACGGUCUGGAUCGUUGAC";
    const LINKER_3: &str = "UAGCACUGAGGAAUCAGUCC";

    fn engine() -> DecisionEngine {
        let set = MotifSet::polya_linkers().unwrap();
        DecisionEngine::new(
            MotifLocator::new(&set, DEFAULT_MIN_REMAINING),
            DecisionParams::default(),
        )
    }

    fn accept_seq() -> String {
        format!(
            "{}{}{}{}{}{}{}",
            "C".repeat(40),
            LINKER_1,
            "C".repeat(10),
            LINKER_2,
            "C".repeat(12),
            LINKER_3,
            "C".repeat(60)
        )
    }

    fn mixed_batch(n: usize) -> Vec<Read> {
        (0..n)
            .map(|i| {
                let seq = match i % 3 {
                    0 => accept_seq(),
                    1 => "C".repeat(150),
                    _ => accept_seq()[..90].to_string(),
                };
                Read::new(&format!("read{}", i), seq.as_bytes())
            })
            .collect()
    }

    #[test]
    fn test_dispatch_preserves_order() {
        let n = 12;
        for threads in 1..=n {
            let dispatcher = BatchDispatcher::new(engine(), threads).unwrap();
            let reads = mixed_batch(n);
            let annotated = dispatcher.dispatch(reads.clone()).unwrap();
            assert_eq!(annotated.len(), n);
            for (i, (input, output)) in reads.iter().zip(annotated.iter()).enumerate() {
                assert_eq!(input, &output.read);
                let expected = if i % 3 == 0 {
                    Decision::Accept
                } else {
                    Decision::Continue
                };
                assert_eq!(output.verdict.decision, expected, "read {}", i);
            }
        }
    }

    #[test]
    fn test_dispatch_empty_batch() {
        let dispatcher = BatchDispatcher::new(engine(), 2).unwrap();
        assert_eq!(dispatcher.dispatch(Vec::new()).unwrap(), Vec::new());
    }

    #[test]
    fn test_zero_threads_rejected() {
        assert!(BatchDispatcher::new(engine(), 0).is_err());
    }

    #[test]
    fn test_panicking_read_is_isolated() {
        let engine = engine();
        let pool = ThreadPoolBuilder::new().num_threads(3).build().unwrap();
        let mut reads = mixed_batch(6);
        reads.insert(2, Read::new("faulty", b"NNNNNNNNNN"));

        let annotated = annotate_batch(&pool, reads.clone(), |seq| {
            if seq == b"NNNNNNNNNN" {
                panic!("unexpected symbol");
            }
            engine.classify(seq)
        });

        assert_eq!(annotated.len(), 7);
        for (input, output) in reads.iter().zip(annotated.iter()) {
            assert_eq!(input, &output.read);
        }
        assert_eq!(annotated[2].verdict, Verdict::faulted());
        let decisions: Vec<Decision> = annotated.iter().map(|a| a.verdict.decision).collect();
        assert_eq!(
            decisions,
            vec![
                Decision::Accept,
                Decision::Continue,
                Decision::Continue,
                Decision::Continue,
                Decision::Accept,
                Decision::Continue,
                Decision::Continue,
            ]
        );
        assert_eq!(annotated[1].verdict.gate, Some(Gate::Seed));
    }

    #[test]
    fn test_shutdown_is_idempotent() {
        let mut dispatcher = BatchDispatcher::new(engine(), 2).unwrap();
        assert!(dispatcher.is_ready());
        dispatcher.shutdown();
        dispatcher.shutdown();
        assert!(!dispatcher.is_ready());
        assert!(dispatcher.dispatch(mixed_batch(3)).is_none());
    }
}
