mod classifier;
mod decision;
mod dispatch;
mod locate;
mod motif;
mod read;

pub use classifier::{ClassifierConfig, ClassifierError, MotifClassifier, ReadClassifier};
pub use decision::{Decision, DecisionEngine, DecisionParams, Gate, Verdict};
pub use dispatch::BatchDispatcher;
pub use locate::{MotifHit, MotifLocator, PositionEstimate, DEFAULT_MIN_REMAINING};
pub use motif::{Motif, MotifSet, MAX_MOTIF_LEN};
pub use read::{stream_reads_into_channel, AnnotatedRead, Marker, Read};
