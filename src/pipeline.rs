use std::path::PathBuf;

use indicatif::ProgressBar;
use tracing::info;

use crate::assemble::{Assembler, SkippedRecord};
use crate::config::Settings;
use crate::error::PipelineError;
use crate::files;
use crate::link::EdLinkResolver;
use crate::summary;

/// Outcome of a successful run.
#[derive(Debug)]
pub struct RunReport {
    pub total_records: usize,
    pub posts_written: usize,
    pub skipped: Vec<SkippedRecord>,
    pub output: PathBuf,
    /// Set when the summary artifact was written.
    pub summary_output: Option<PathBuf>,
}

/// Load, assemble, validate and publish the dataset. Nothing is written
/// unless the whole corpus passes the integrity checks.
pub fn run(settings: &Settings, pb: &ProgressBar) -> Result<RunReport, PipelineError> {
    let threads = files::load_threads(&settings.input)?;
    let manifest = files::load_manifest(&settings.manifest);

    pb.set_length(threads.len() as u64);
    let assembler = Assembler::new(
        settings.heuristics.clone(),
        Box::new(EdLinkResolver::new(settings.links.clone())),
    );
    let assembly = assembler.assemble(&threads, &manifest, pb)?;
    pb.finish_and_clear();

    files::write_json_atomic(&settings.output, &assembly.posts)?;
    info!(
        path = %settings.output.display(),
        posts = assembly.posts.len(),
        skipped = assembly.skipped.len(),
        "wrote processed dataset"
    );

    let summary_output = if settings.insights {
        let mut s = summary::summarize(assembly.posts.iter().map(|p| &p.metrics));
        s.skipped_records = assembly.skipped.len();
        s.generated_at = Some(chrono::Utc::now().to_rfc3339());
        files::write_json_atomic(&settings.summary_output, &s)?;
        info!(
            path = %settings.summary_output.display(),
            homework = s.homework.len(),
            models = s.models.len(),
            "wrote dataset summary"
        );
        Some(settings.summary_output.clone())
    } else {
        None
    };

    Ok(RunReport {
        total_records: threads.len(),
        posts_written: assembly.posts.len(),
        skipped: assembly.skipped,
        output: settings.output.clone(),
        summary_output,
    })
}
