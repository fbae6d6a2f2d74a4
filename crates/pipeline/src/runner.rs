//! Batch orchestration over deck files.
//!
//! Files run on rayon workers, each reading and parsing its own deck. The
//! per-file results are merged in input order once every worker is done, so
//! the output never depends on scheduling.

use crate::cache::{CacheKey, ResultCache};
use crate::loader::DeckFile;
use deck_core::{
    CancellationToken, Clock, Config, DeckProcessor, DeckResult, Diagnostic, ExtractedRecord,
    ProcessingMetrics,
};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

/// What happened to one input file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    Processed,
    /// Result served from the cache.
    Cached,
    Failed,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileReport {
    pub path: PathBuf,
    pub status: FileStatus,
    pub records: usize,
}

/// Records, metrics and diagnostics of a run over one or more decks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessOutput {
    pub records: Vec<ExtractedRecord>,
    pub metrics: ProcessingMetrics,
    pub diagnostics: Vec<Diagnostic>,
    pub files: Vec<FileReport>,
}

impl ProcessOutput {
    fn absorb(&mut self, path: &Path, outcome: FileOutcome) {
        let status = match outcome {
            FileOutcome::Done { result, cached } => {
                self.metrics.merge(&result.metrics);
                if cached {
                    self.metrics.cache_hits += 1;
                }
                self.files.push(FileReport {
                    path: path.to_path_buf(),
                    status: if cached { FileStatus::Cached } else { FileStatus::Processed },
                    records: result.records.len(),
                });
                self.records.extend(result.records);
                self.diagnostics.extend(result.diagnostics);
                return;
            }
            FileOutcome::Failed(diagnostic) => {
                self.metrics.failed_files += 1;
                self.diagnostics.push(diagnostic);
                FileStatus::Failed
            }
            FileOutcome::Cancelled => {
                self.metrics.cancelled_files += 1;
                FileStatus::Cancelled
            }
        };
        self.metrics.total_files += 1;
        self.files.push(FileReport {
            path: path.to_path_buf(),
            status,
            records: 0,
        });
    }
}

enum FileOutcome {
    Done { result: DeckResult, cached: bool },
    Failed(Diagnostic),
    Cancelled,
}

/// Runs the extraction pipeline over batches of deck files.
#[derive(Clone)]
pub struct BatchRunner {
    processor: DeckProcessor,
    cache: Option<Arc<dyn ResultCache>>,
    cancel: CancellationToken,
}

impl BatchRunner {
    pub fn new(config: Arc<Config>) -> Self {
        Self {
            processor: DeckProcessor::new(config),
            cache: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Stamp records from `clock` instead of the system clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.processor = DeckProcessor::with_clock(self.processor.config().clone(), clock);
        self
    }

    pub fn with_cache(mut self, cache: Arc<dyn ResultCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Token that cancels this runner's work when triggered.
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Process every file. A file that cannot be read is recorded as failed
    /// and the batch continues.
    pub fn run<P: AsRef<Path> + Sync>(&self, paths: &[P]) -> ProcessOutput {
        let started = Instant::now();

        let outcomes: Vec<FileOutcome> = paths
            .par_iter()
            .map(|path| self.process_file(path.as_ref()))
            .collect();

        let mut output = ProcessOutput::default();
        for (path, outcome) in paths.iter().zip(outcomes) {
            output.absorb(path.as_ref(), outcome);
        }
        output.metrics.finalize(started.elapsed());

        let m = &output.metrics;
        log::info!(
            "Batch done: {} files ({} failed, {} cancelled, {} cached), {} records ({} valid) in {:.2}s",
            m.total_files,
            m.failed_files,
            m.cancelled_files,
            m.cache_hits,
            m.extracted_records,
            m.valid_records,
            m.processing_time_secs
        );
        output
    }

    fn process_file(&self, path: &Path) -> FileOutcome {
        if self.cancel.is_cancelled() {
            return FileOutcome::Cancelled;
        }

        let file = match DeckFile::read(path) {
            Ok(file) => file,
            Err(e) => return self.failed(path, &e),
        };

        let key = self
            .cache
            .as_ref()
            .map(|_| CacheKey::new(file.content_hash(), self.processor.config()));
        if let (Some(cache), Some(key)) = (&self.cache, &key) {
            if let Some(result) = cache.get(key) {
                log::debug!("{}: cache hit", file.filename);
                return FileOutcome::Done {
                    result,
                    cached: true,
                };
            }
        }

        let deck = match file.parse() {
            Ok(deck) => deck,
            Err(e) => return self.failed(path, &e),
        };

        let Some(result) = self.processor.process_deck(&deck, &self.cancel) else {
            return FileOutcome::Cancelled;
        };

        if let (Some(cache), Some(key)) = (&self.cache, &key) {
            cache.put(key, &result);
        }
        FileOutcome::Done {
            result,
            cached: false,
        }
    }

    fn failed(&self, path: &Path, error: &deck_core::Error) -> FileOutcome {
        log::warn!("Skipping {}: {}", path.display(), error);
        FileOutcome::Failed(Diagnostic::file_error(path.display().to_string(), error.to_string()))
    }
}

/// Process one deck with a loaded configuration.
pub fn process(path: impl AsRef<Path>, config: &Arc<Config>) -> ProcessOutput {
    BatchRunner::new(Arc::clone(config)).run(&[path.as_ref()])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use chrono::{TimeZone, Utc};
    use deck_core::{DashboardType, DiagnosticKind, FixedClock};
    use std::io::{Cursor, Write};
    use zip::write::FileOptions;
    use zip::ZipWriter;

    const YAML: &str = include_str!("../../../config/dashboard_config.yaml");
    const NS: &str = r#"xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main" xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships""#;

    fn config(yaml: &str) -> Arc<Config> {
        Arc::new(Config::from_yaml_str(yaml).unwrap())
    }

    fn slide(texts: &[&str]) -> String {
        let shapes: String = texts
            .iter()
            .enumerate()
            .map(|(i, t)| {
                format!(
                    r#"<p:sp><p:spPr><a:xfrm><a:off x="0" y="{}"/></a:xfrm></p:spPr><p:txBody><a:p><a:r><a:t>{t}</a:t></a:r></a:p></p:txBody></p:sp>"#,
                    i * 100
                )
            })
            .collect();
        format!(r#"<?xml version="1.0" encoding="UTF-8"?><p:sld {NS}><p:cSld><p:spTree>{shapes}</p:spTree></p:cSld></p:sld>"#)
    }

    fn pptx(slides: &[String]) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = FileOptions::default();
        let mut rels = String::from(
            r#"<?xml version="1.0" encoding="UTF-8"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
        );
        for i in 1..=slides.len() {
            rels.push_str(&format!(
                r#"<Relationship Id="rId{i}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide" Target="slides/slide{i}.xml"/>"#
            ));
        }
        rels.push_str("</Relationships>");
        zip.start_file("ppt/_rels/presentation.xml.rels", options).unwrap();
        zip.write_all(rels.as_bytes()).unwrap();
        for (i, xml) in slides.iter().enumerate() {
            zip.start_file(format!("ppt/slides/slide{}.xml", i + 1), options).unwrap();
            zip.write_all(xml.as_bytes()).unwrap();
        }
        zip.finish().unwrap().into_inner()
    }

    fn write_decks(dir: &Path, good: usize, broken: usize) -> Vec<PathBuf> {
        let mut paths = Vec::new();
        for i in 0..good {
            let path = dir.join(format!("good{}.pptx", i));
            let reach = format!("Reach: {}", (i + 1) * 1000);
            let bytes = pptx(&[
                slide(&["Monthly Report"]),
                slide(&["Sale Posts", reach.as_str()]),
            ]);
            std::fs::write(&path, bytes).unwrap();
            paths.push(path);
        }
        for i in 0..broken {
            let path = dir.join(format!("broken{}.pptx", i));
            std::fs::write(&path, b"PK\x03\x04 this is not a zip archive").unwrap();
            paths.push(path);
        }
        paths
    }

    fn runner(config: Arc<Config>) -> BatchRunner {
        let clock = FixedClock(Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap());
        BatchRunner::new(config).with_clock(Arc::new(clock))
    }

    #[test]
    fn test_unreadable_files_fail_alone() {
        let dir = tempfile::tempdir().unwrap();
        let paths = write_decks(dir.path(), 3, 2);

        let output = runner(config(YAML)).run(&paths);
        let m = &output.metrics;
        assert_eq!(m.total_files, 5);
        assert_eq!(m.failed_files, 2);
        assert_eq!(m.processed_files, 3);
        assert_eq!(m.extracted_records, 3);
        assert_eq!(m.records_by_type[&DashboardType::PromotionPosts], 3);
        assert!(output
            .records
            .iter()
            .all(|r| r.base().source_file.starts_with("good")));

        let file_errors: Vec<_> = output
            .diagnostics
            .iter()
            .filter(|d| d.kind == DiagnosticKind::FileError)
            .collect();
        assert_eq!(file_errors.len(), 2);
        assert!(file_errors.iter().all(|d| d.source_file.contains("broken")));

        let statuses: Vec<FileStatus> = output.files.iter().map(|f| f.status).collect();
        assert_eq!(
            statuses,
            vec![
                FileStatus::Processed,
                FileStatus::Processed,
                FileStatus::Processed,
                FileStatus::Failed,
                FileStatus::Failed,
            ]
        );
    }

    #[test]
    fn test_records_follow_input_order() {
        let dir = tempfile::tempdir().unwrap();
        let paths = write_decks(dir.path(), 4, 0);
        let output = runner(config(YAML)).run(&paths);
        let sources: Vec<&str> = output.records.iter().map(|r| r.base().source_file.as_str()).collect();
        assert_eq!(sources, vec!["good0.pptx", "good1.pptx", "good2.pptx", "good3.pptx"]);
    }

    #[test]
    fn test_cache_is_idempotent_and_tracks_config() {
        let dir = tempfile::tempdir().unwrap();
        let paths = write_decks(dir.path(), 2, 1);
        let cache = Arc::new(MemoryCache::new());

        let first = runner(config(YAML)).with_cache(cache.clone()).run(&paths);
        assert_eq!(first.metrics.cache_hits, 0);
        assert_eq!(cache.len(), 2);

        let second = runner(config(YAML)).with_cache(cache.clone()).run(&paths);
        assert_eq!(second.metrics.cache_hits, 2);
        assert_eq!(second.records, first.records);
        assert_eq!(second.diagnostics, first.diagnostics);
        assert_eq!(second.files[0].status, FileStatus::Cached);
        assert_eq!(second.files[2].status, FileStatus::Failed);

        let changed = config(&YAML.replace("\"Sale Posts\"", "\"Sale Post Recap\""));
        let third = runner(changed).with_cache(cache.clone()).run(&paths);
        assert_eq!(third.metrics.cache_hits, 0);
        assert_eq!(cache.len(), 4);
    }

    #[test]
    fn test_cancelled_batch_contributes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let paths = write_decks(dir.path(), 3, 0);
        let token = CancellationToken::new();
        token.cancel();

        let output = runner(config(YAML)).with_cancellation(token).run(&paths);
        assert!(output.records.is_empty());
        assert_eq!(output.metrics.total_files, 3);
        assert_eq!(output.metrics.cancelled_files, 3);
        assert_eq!(output.metrics.processed_files, 0);
        assert!(output.files.iter().all(|f| f.status == FileStatus::Cancelled));
    }

    #[test]
    fn test_process_single_deck() {
        let dir = tempfile::tempdir().unwrap();
        let paths = write_decks(dir.path(), 1, 0);
        let output = process(&paths[0], &config(YAML));
        assert_eq!(output.records.len(), 1);
        assert_eq!(output.metrics.total_slides, 2);
        assert_eq!(output.metrics.failed_slides, 1);

        let missing = process(dir.path().join("absent.pptx"), &config(YAML));
        assert_eq!(missing.metrics.failed_files, 1);
        assert_eq!(missing.diagnostics[0].kind, DiagnosticKind::FileError);
    }
}
