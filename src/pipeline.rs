use crate::catalog::{Component, SourceLocation, SourceOrigin};
use crate::classify::{classify, ClassifyLimits};
use crate::config::CatalogConfig;
use crate::dom::{Document, Node, NodeId, ParseMode};
use crate::errors::{FileError, FileErrorKind};
use crate::fingerprint::{Fingerprint, FingerprintEngine};
use crate::php::strip_php_blocks;
use crate::tailwind::TokenAnalyzer;
use indexmap::IndexMap;
use indicatif::ProgressBar;
use rayon::prelude::*;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use tracing::{debug, warn};

/// How a discovered file's markup is obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Plain markup file, scanned as-is.
    Static,
    /// PHP source: scanned with code blocks stripped, and optionally again
    /// through the interpreter's rendered output.
    Php,
}

/// A unit of work for the pipeline: either a file to read on the worker, or
/// markup that was already rendered (PHP stdout, stdin in pipe mode).
#[derive(Debug, Clone)]
pub enum SourceJob {
    File { path: PathBuf, kind: SourceKind },
    Rendered(RenderedSource),
}

impl SourceJob {
    pub fn path(&self) -> &PathBuf {
        match self {
            SourceJob::File { path, .. } => path,
            SourceJob::Rendered(r) => &r.path,
        }
    }
}

/// Markup ready for parsing, tagged with where it came from.
#[derive(Debug, Clone)]
pub struct RenderedSource {
    pub path: PathBuf,
    pub origin: SourceOrigin,
    pub content: String,
}

/// Outcome of one dedup-table insertion attempt.
#[derive(Debug, PartialEq, Eq)]
enum RecordOutcome {
    Inserted,
    Duplicate,
    Collision,
}

/// The shared deduplication table. Lookup-and-insert is one atomic operation
/// under the pipeline's mutex; first-seen ties between workers are resolved
/// here by claim ordering, never by arrival order.
#[derive(Debug, Default)]
pub struct DedupTable {
    components: IndexMap<Fingerprint, Component>,
}

impl DedupTable {
    fn record(&mut self, candidate: Component) -> RecordOutcome {
        let fingerprint = candidate.fingerprint.clone();
        match self.components.get_mut(&fingerprint) {
            None => {
                self.components.insert(fingerprint, candidate);
                RecordOutcome::Inserted
            }
            Some(existing) => {
                if existing.canonical != candidate.canonical {
                    // Same digest, different structure: canonicalization bug.
                    // Keep the first-seen component, drop this claim.
                    return RecordOutcome::Collision;
                }
                let claim = candidate.locations[0].clone();
                // The representative belongs to the lowest claim so reruns
                // agree regardless of which worker got here first.
                if existing
                    .first_claim()
                    .map(|first| claim < *first)
                    .unwrap_or(true)
                {
                    existing.markup = candidate.markup;
                    existing.category = candidate.category;
                    existing.tokens = candidate.tokens;
                }
                existing.locations.push(claim);
                RecordOutcome::Duplicate
            }
        }
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn into_components(self) -> Vec<Component> {
        self.components.into_values().collect()
    }
}

/// Everything the pipeline produced from one run, before catalog assembly.
#[derive(Debug)]
pub struct PipelineOutput {
    pub components: Vec<Component>,
    pub errors: Vec<FileError>,
    pub candidates_found: usize,
    pub duplicate_occurrences: usize,
}

/// Component keywords that qualify a classed node even without recognized
/// utility tokens, carried over from the original heuristics.
const COMPONENT_KEYWORDS: &[&str] = &["button", "card", "nav", "header", "footer", "form"];

/// The extraction pipeline: traversal, candidate selection, classification,
/// fingerprinting, and dedup-table maintenance across many sources.
pub struct Pipeline {
    analyzer: TokenAnalyzer,
    engine: FingerprintEngine,
    limits: ClassifyLimits,
    keep_attrs: Vec<String>,
}

impl Pipeline {
    pub fn from_config(config: &CatalogConfig) -> Self {
        Self {
            analyzer: TokenAnalyzer::new(config.tokens.extra_prefixes.clone()),
            engine: FingerprintEngine::new(config.fingerprint.attr_allowlist.clone()),
            limits: ClassifyLimits {
                ancestor_depth: config.classify.ancestor_depth,
                descendant_depth: config.classify.descendant_depth,
            },
            keep_attrs: config.markup.keep_attrs.clone(),
        }
    }

    /// Process every job on the rayon pool. The dedup table and the error
    /// list are the only cross-worker shared state. A set cancellation flag
    /// stops dispatch; jobs already running finish their current file.
    pub fn run(
        &self,
        jobs: Vec<SourceJob>,
        cancel: &AtomicBool,
        progress: Option<&ProgressBar>,
    ) -> PipelineOutput {
        let table = Mutex::new(DedupTable::default());
        let errors = Mutex::new(Vec::new());
        let candidates = AtomicUsize::new(0);
        let duplicates = AtomicUsize::new(0);
        let processed = AtomicUsize::new(0);

        jobs.par_iter().for_each(|job| {
            if cancel.load(Ordering::Relaxed) {
                return;
            }

            self.process_job(job, &table, &errors, &candidates, &duplicates);

            if let Some(pb) = progress {
                let done = processed.fetch_add(1, Ordering::Relaxed) + 1;
                pb.set_position(done as u64);
                pb.set_message(format!(
                    "Processing: {}",
                    job.path()
                        .file_name()
                        .unwrap_or_default()
                        .to_string_lossy()
                ));
            }
        });

        PipelineOutput {
            components: table
                .into_inner()
                .unwrap_or_else(|p| p.into_inner())
                .into_components(),
            errors: errors.into_inner().unwrap_or_else(|p| p.into_inner()),
            candidates_found: candidates.load(Ordering::Relaxed),
            duplicate_occurrences: duplicates.load(Ordering::Relaxed),
        }
    }

    fn process_job(
        &self,
        job: &SourceJob,
        table: &Mutex<DedupTable>,
        errors: &Mutex<Vec<FileError>>,
        candidates: &AtomicUsize,
        duplicates: &AtomicUsize,
    ) {
        let rendered = match job {
            SourceJob::Rendered(rendered) => rendered.clone(),
            SourceJob::File { path, kind } => match std::fs::read_to_string(path) {
                Ok(raw) => {
                    let content = match kind {
                        SourceKind::Php => strip_php_blocks(&raw),
                        SourceKind::Static => raw,
                    };
                    RenderedSource {
                        path: path.clone(),
                        origin: SourceOrigin::Static,
                        content,
                    }
                }
                Err(e) => {
                    warn!(path = %path.display(), "unreadable file: {}", e);
                    if let Ok(mut list) = errors.lock() {
                        list.push(FileError::new(
                            path.clone(),
                            FileErrorKind::UnreadableFile,
                            e.to_string(),
                        ));
                    }
                    return;
                }
            },
        };

        self.process_rendered(&rendered, table, errors, candidates, duplicates);
    }

    /// Parse one rendering and walk it: depth-first pre-order, capturing a
    /// node stops descent into its subtree so sub-fragments of a captured
    /// component do not flood the catalog.
    pub fn process_rendered(
        &self,
        rendered: &RenderedSource,
        table: &Mutex<DedupTable>,
        errors: &Mutex<Vec<FileError>>,
        candidates: &AtomicUsize,
        duplicates: &AtomicUsize,
    ) {
        if rendered.content.trim().is_empty() {
            return;
        }

        let mode = match rendered.origin {
            SourceOrigin::Static => ParseMode::Static,
            SourceOrigin::Dynamic => ParseMode::Dynamic,
        };
        let source_label = rendered.path.display().to_string();
        let doc = Document::parse(&rendered.content, mode, &source_label);

        let mut found = 0usize;
        // Children are pushed in reverse so the stack pops them in document
        // order; `position` is the element's pre-order index.
        let mut position = 0usize;
        let mut stack: Vec<NodeId> = rendered_roots(&doc);

        while let Some(id) = stack.pop() {
            let node = doc.get(id);
            if !node.is_element() {
                continue;
            }
            let my_position = position;
            position += 1;

            if self.is_candidate(node) {
                found += 1;
                let location = SourceLocation {
                    path: rendered.path.clone(),
                    position: my_position,
                    origin: rendered.origin,
                };
                let category = classify(&doc, id, self.limits);
                let tokens: Vec<String> = self.analyzer.extract_tokens(node).into_iter().collect();
                let (fingerprint, canonical) = self.engine.fingerprint(&doc, id);
                let markup = doc.serialize_cleaned(id, &self.keep_attrs);

                let outcome = {
                    let mut table = match table.lock() {
                        Ok(t) => t,
                        Err(poisoned) => poisoned.into_inner(),
                    };
                    table.record(Component {
                        fingerprint: fingerprint.clone(),
                        category,
                        tokens,
                        markup,
                        locations: vec![location.clone()],
                        canonical,
                    })
                };

                match outcome {
                    RecordOutcome::Inserted => {}
                    RecordOutcome::Duplicate => {
                        duplicates.fetch_add(1, Ordering::Relaxed);
                    }
                    RecordOutcome::Collision => {
                        warn!(
                            path = %rendered.path.display(),
                            fingerprint = %fingerprint,
                            "fingerprint collision: structurally different content, keeping first-seen"
                        );
                        if let Ok(mut list) = errors.lock() {
                            list.push(FileError::new(
                                rendered.path.clone(),
                                FileErrorKind::FingerprintCollision,
                                format!("conflicting claim for fingerprint {}", fingerprint),
                            ));
                        }
                    }
                }
                // Captured: do not descend into this subtree.
                continue;
            }

            for &child in doc.get(id).children.iter().rev() {
                stack.push(child);
            }
        }

        if found > 0 {
            debug!(path = %rendered.path.display(), found, "extracted candidates");
            candidates.fetch_add(found, Ordering::Relaxed);
        }
    }

    /// A node is a candidate when it carries at least one recognized utility
    /// token, or (fallback) a component-keyword class name.
    fn is_candidate(&self, node: &Node) -> bool {
        if node.classes().is_empty() {
            return false;
        }
        if self.analyzer.is_tailwind_node(node) {
            return true;
        }
        let class_text = node.classes().join(" ").to_lowercase();
        COMPONENT_KEYWORDS.iter().any(|k| class_text.contains(k))
    }
}

fn rendered_roots(doc: &Document) -> Vec<NodeId> {
    doc.roots().iter().rev().copied().collect()
}
