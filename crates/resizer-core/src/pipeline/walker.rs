//! Batch walker: visits every file of an extracted tree and accumulates
//! per-file outcomes.

use std::path::Path;
use walkdir::WalkDir;

use crate::types::BatchReport;

use super::processor::ImageProcessor;

/// Walks extracted archive contents and transforms each eligible file.
pub struct BatchWalker<'a> {
    processor: &'a ImageProcessor,
}

impl<'a> BatchWalker<'a> {
    pub fn new(processor: &'a ImageProcessor) -> Self {
        Self { processor }
    }

    /// Walk `root` in lexicographic order, writing outputs under `output_dir`
    /// at the same relative sub-directory as their source.
    ///
    /// A failing entry never stops the walk. Unreadable directory entries are
    /// logged and skipped; they are not counted since their names are unknown.
    pub fn walk(&self, root: &Path, output_dir: &Path) -> BatchReport {
        let mut report = BatchReport::default();

        for entry in WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("Skipping unreadable entry under {:?}: {}", root, e);
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let Ok(relative) = entry.path().strip_prefix(root) else {
                continue;
            };
            if !self.processor.is_eligible(relative) {
                tracing::trace!("Ignoring {:?}", relative);
                continue;
            }

            let target_dir = match relative.parent() {
                Some(parent) => output_dir.join(parent),
                None => output_dir.to_path_buf(),
            };
            report.record(self.processor.process(entry.path(), &target_dir));
        }

        tracing::debug!(
            "Walk of {:?} finished: {} ok, {} errors ({} aspect, {} failed)",
            root,
            report.success_count,
            report.error_count,
            report.aspect_rejections,
            report.failures
        );
        report
    }
}
