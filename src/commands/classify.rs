use crate::classify::{
    stream_reads_into_channel, Decision, MotifClassifier, PositionEstimate, Read, ReadClassifier,
    Verdict,
};
use crate::cli::ClassifyArgs;
use crate::utils::Result;
use crossbeam_channel::{bounded, Receiver};
use itertools::Itertools;
use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::Path,
    thread,
};

const CHANNEL_BUFFER_SIZE: usize = 2048;

/// Final state of a read: the first terminal verdict, or the last one if the read ran out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadOutcome {
    pub id: String,
    pub bases_seen: usize,
    pub verdict: Verdict,
}

impl ReadOutcome {
    fn to_tsv(&self) -> String {
        let gate = self
            .verdict
            .gate
            .map_or(".".to_string(), |g| g.to_string());
        format!(
            "{}\t{}\t{}\t{}\t{}",
            self.id,
            self.verdict.decision,
            gate,
            self.bases_seen,
            format_offsets(&self.verdict.hits)
        )
    }
}

fn format_offsets(hits: &[PositionEstimate]) -> String {
    if hits.is_empty() {
        return ".".to_string();
    }
    hits.iter()
        .map(|hit| hit.map_or(".".to_string(), |h| h.offset.to_string()))
        .join(",")
}

pub fn classify(args: ClassifyArgs) -> Result<()> {
    let config = args.classifier.to_config(args.num_threads)?;
    let mut classifier = MotifClassifier::initialize(config)?;
    log::debug!("{}", classifier.describe());

    let writer = create_output_writer(args.output_path.as_deref())?;

    let (sender_read, receiver_read) = bounded(CHANNEL_BUFFER_SIZE);
    let reads_path = args.reads_path.clone();
    let read_stream_thread =
        thread::spawn(move || stream_reads_into_channel(&reads_path, sender_read));

    let (sender_result, receiver_result) = bounded(CHANNEL_BUFFER_SIZE);
    let writer_thread = thread::spawn(move || write_outcomes(writer, receiver_result));

    let mut counts = [0usize; 3];
    let mut status = Ok(());
    for chunk in &receiver_read.iter().chunks(args.batch_size) {
        let reads = match chunk.collect::<Result<Vec<Read>>>() {
            Ok(reads) => reads,
            Err(e) => {
                status = Err(e);
                break;
            }
        };
        let outcomes = match args.chunk_len {
            Some(chunk_len) => replay_batch(&classifier, reads, chunk_len),
            None => classify_full(&classifier, reads),
        };
        let outcomes = match outcomes {
            Ok(outcomes) => outcomes,
            Err(e) => {
                status = Err(e);
                break;
            }
        };
        for outcome in outcomes {
            counts[decision_index(outcome.verdict.decision)] += 1;
            if sender_result.send(outcome).is_err() {
                status = Err("Writer thread stopped unexpectedly".to_string());
                break;
            }
        }
        if status.is_err() {
            break;
        }
    }

    // Clean-up
    classifier.shutdown();
    drop(receiver_read);
    drop(sender_result);
    let write_status = writer_thread.join().expect("Writer thread panicked");
    read_stream_thread
        .join()
        .expect("Read stream thread panicked");
    log::trace!("Read stream thread finished");

    status?;
    write_status?;
    log::info!(
        "Classified {} reads: accept={}, reject={}, continue={}",
        counts.iter().sum::<usize>(),
        counts[decision_index(Decision::Accept)],
        counts[decision_index(Decision::Reject)],
        counts[decision_index(Decision::Continue)]
    );
    Ok(())
}

fn decision_index(decision: Decision) -> usize {
    match decision {
        Decision::Accept => 0,
        Decision::Reject => 1,
        Decision::Continue => 2,
    }
}

fn classify_full<C: ReadClassifier>(classifier: &C, reads: Vec<Read>) -> Result<Vec<ReadOutcome>> {
    let annotated = classifier.classify_batch(reads)?;
    Ok(annotated
        .into_iter()
        .map(|a| ReadOutcome {
            bases_seen: a.read.seq.len(),
            id: a.read.id,
            verdict: a.verdict,
        })
        .collect())
}

/// Submits growing prefixes of every read until each one reaches a terminal
/// decision or is exhausted, the way the instrument streams chunks.
pub fn replay_batch<C: ReadClassifier>(
    classifier: &C,
    reads: Vec<Read>,
    chunk_len: usize,
) -> Result<Vec<ReadOutcome>> {
    let mut outcomes: Vec<Option<ReadOutcome>> = vec![None; reads.len()];
    let mut seen = chunk_len;
    loop {
        let pending = outcomes
            .iter()
            .enumerate()
            .filter(|(_, outcome)| outcome.is_none())
            .map(|(i, _)| i)
            .collect_vec();
        if pending.is_empty() {
            break;
        }

        let prefixes = pending
            .iter()
            .map(|&i| {
                let read = &reads[i];
                Read::new(&read.id, &read.seq[..seen.min(read.seq.len())])
            })
            .collect_vec();
        let annotated = classifier.classify_batch(prefixes)?;

        for (&i, prefix) in pending.iter().zip(annotated) {
            let exhausted = prefix.read.seq.len() >= reads[i].seq.len();
            if prefix.verdict.decision.is_terminal() || exhausted {
                outcomes[i] = Some(ReadOutcome {
                    id: prefix.read.id,
                    bases_seen: prefix.read.seq.len(),
                    verdict: prefix.verdict,
                });
            }
        }
        seen += chunk_len;
    }
    Ok(outcomes.into_iter().flatten().collect())
}

fn create_output_writer(output_path: Option<&str>) -> Result<Box<dyn Write + Send>> {
    match output_path {
        Some(path) => {
            let file = File::create(Path::new(path))
                .map_err(|e| format!("Failed to create {}: {}", path, e))?;
            Ok(Box::new(BufWriter::new(file)))
        }
        None => Ok(Box::new(BufWriter::new(io::stdout()))),
    }
}

fn write_outcomes(mut writer: Box<dyn Write + Send>, receiver: Receiver<ReadOutcome>) -> Result<()> {
    let to_err = |e: io::Error| format!("Failed to write output: {}", e);
    writeln!(writer, "#read_id\tdecision\tgate\tbases_seen\toffsets").map_err(to_err)?;
    for outcome in &receiver {
        writeln!(writer, "{}", outcome.to_tsv()).map_err(to_err)?;
    }
    writer.flush().map_err(to_err)
}
