use super::Stage;
use crate::collection::{sort_documents, Document};

/// Runs `stages` over documents already in memory, each stage consuming the
/// previous stage's output. Unsupported stages are skipped with a warning.
pub(crate) fn run_stages(backend: &str, mut documents: Vec<Document>, stages: &[Stage]) -> Vec<Document> {
    for stage in stages {
        documents = run_stage(backend, documents, stage);
    }
    documents
}

/// Runs a single stage.
pub(crate) fn run_stage(backend: &str, mut documents: Vec<Document>, stage: &Stage) -> Vec<Document> {
    match stage {
        Stage::Match(filter) => documents.retain(|doc| filter.apply(doc)),
        Stage::Sort(keys) => sort_documents(&mut documents, keys),
        Stage::Limit(limit) => {
            documents.truncate(usize::try_from(*limit).unwrap_or(usize::MAX));
        }
        Stage::Skip(skip) => {
            let skip = usize::try_from(*skip).unwrap_or(usize::MAX).min(documents.len());
            documents.drain(..skip);
        }
        Stage::Project(fields) => {
            documents = documents.iter().map(|doc| doc.project(fields)).collect();
        }
        Stage::Unsupported { name, .. } => {
            log::warn!("Aggregation stage {} is not supported by {}, skipping", name, backend);
        }
    }
    documents
}
