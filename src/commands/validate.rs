use crate::classify::{MotifClassifier, ReadClassifier};
use crate::cli::ValidateArgs;
use crate::utils::Result;

pub fn validate(args: ValidateArgs) -> Result<()> {
    let config = args.classifier.to_config(1)?;
    let num_motifs = config.motifs.as_ref().map_or(0, |m| m.len());
    let mut classifier = MotifClassifier::initialize(config)?;
    println!("{}", classifier.describe());
    classifier.shutdown();
    log::info!("Validation successful. Motifs={}", num_motifs);
    Ok(())
}
