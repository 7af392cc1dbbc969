use super::{
    decision::{Decision, DecisionEngine, DecisionParams},
    dispatch::BatchDispatcher,
    locate::{MotifLocator, DEFAULT_MIN_REMAINING},
    motif::MotifSet,
    read::{AnnotatedRead, Read},
};
use itertools::Itertools;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassifierError {
    /// Invalid or missing configuration; raised before any read is processed.
    Config(String),
    /// The worker pool is no longer available.
    Resource(String),
}

impl fmt::Display for ClassifierError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassifierError::Config(msg) => write!(f, "Configuration error: {}", msg),
            ClassifierError::Resource(msg) => write!(f, "Resource error: {}", msg),
        }
    }
}

impl std::error::Error for ClassifierError {}

impl From<ClassifierError> for String {
    fn from(err: ClassifierError) -> Self {
        err.to_string()
    }
}

#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    pub num_threads: Option<usize>,
    pub motifs: Option<MotifSet>,
    pub params: DecisionParams,
    pub min_remaining: usize,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        ClassifierConfig {
            num_threads: None,
            motifs: None,
            params: DecisionParams::default(),
            min_remaining: DEFAULT_MIN_REMAINING,
        }
    }
}

/// What a host scheduler needs from a read classifier.
pub trait ReadClassifier {
    fn is_ready(&self) -> bool;

    /// One annotated read per input read, in input order.
    fn classify_batch(&self, reads: Vec<Read>) -> Result<Vec<AnnotatedRead>, ClassifierError>;

    fn shutdown(&mut self);

    fn describe(&self) -> String;
}

pub struct MotifClassifier {
    motifs: MotifSet,
    num_threads: usize,
    dispatcher: BatchDispatcher,
}

impl MotifClassifier {
    pub fn initialize(config: ClassifierConfig) -> Result<Self, ClassifierError> {
        let num_threads = config.num_threads.ok_or_else(|| {
            ClassifierError::Config("Number of threads must be specified".to_string())
        })?;
        let motifs = config
            .motifs
            .ok_or_else(|| ClassifierError::Config("Motif set must be specified".to_string()))?;
        config.params.validate().map_err(ClassifierError::Config)?;

        let locator = MotifLocator::new(&motifs, config.min_remaining);
        let engine = DecisionEngine::new(locator, config.params);
        let dispatcher =
            BatchDispatcher::new(engine, num_threads).map_err(ClassifierError::Config)?;

        Ok(MotifClassifier {
            motifs,
            num_threads,
            dispatcher,
        })
    }
}

impl ReadClassifier for MotifClassifier {
    fn is_ready(&self) -> bool {
        self.dispatcher.is_ready()
    }

    fn classify_batch(&self, reads: Vec<Read>) -> Result<Vec<AnnotatedRead>, ClassifierError> {
        let batch_size = reads.len();
        let annotated = self.dispatcher.dispatch(reads).ok_or_else(|| {
            ClassifierError::Resource("Classifier has been shut down".to_string())
        })?;
        log::debug!(
            "Classified batch of {} reads: {} accepted, {} rejected",
            batch_size,
            count_decisions(&annotated, Decision::Accept),
            count_decisions(&annotated, Decision::Reject)
        );
        Ok(annotated)
    }

    fn shutdown(&mut self) {
        self.dispatcher.shutdown();
    }

    fn describe(&self) -> String {
        let params = self.dispatcher.engine().params();
        let seed = if params.seed.is_empty() {
            "none".to_string()
        } else {
            String::from_utf8_lossy(&params.seed).to_string()
        };
        let prefix_limit = params
            .max_prefix_len
            .map_or("none".to_string(), |l| format!("{} bp", l));
        let motifs = self
            .motifs
            .motifs()
            .iter()
            .enumerate()
            .map(|(i, m)| format!("  motif {}: {}", i + 1, m))
            .join("\n");
        format!(
            "Linker motif classifier ({} threads)\n{}\n  seed: {}\n  min tail: {} bp\n  motif gap: ({}, {}) exclusive\n  prefix limit: {}",
            self.num_threads, motifs, seed, params.min_tail, params.gap_min, params.gap_max, prefix_limit
        )
    }
}

fn count_decisions(annotated: &[AnnotatedRead], decision: Decision) -> usize {
    annotated
        .iter()
        .filter(|a| a.verdict.decision == decision)
        .count()
}
