pub mod args;
pub mod catalog;
pub mod classify;
pub mod config;
pub mod dom;
pub mod errors;
pub mod fingerprint;
pub mod php;
pub mod pipeline;
pub mod report;
pub mod tailwind;

pub use args::{Cli, Commands, ExtractArgs, PipeArgs};
pub use catalog::{Catalog, CatalogBuilder, Component, RunStats, SourceLocation, SourceOrigin};
pub use classify::{classify, Category, ClassifyLimits};
pub use config::CatalogConfig;
pub use dom::{Document, NodeId, ParseMode};
pub use errors::{ExtractorError, FileError, FileErrorKind, Result};
pub use fingerprint::{Fingerprint, FingerprintEngine};
pub use pipeline::{Pipeline, RenderedSource, SourceJob, SourceKind};
pub use tailwind::TokenAnalyzer;

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use php::PhpExecutor;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use std::fs;
use tracing::warn;

/// Security configuration
#[derive(Debug, Clone)]
pub struct SecurityConfig {
    /// Maximum file size in bytes (default: 5MB)
    pub max_file_size: u64,
    /// Allow symbolic links
    pub allow_symlinks: bool,
    /// Working directory for path traversal checks
    pub working_directory: PathBuf,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_file_size: 5 * 1024 * 1024,
            allow_symlinks: false,
            working_directory: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }
}

/// Main extraction run configuration
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    pub execute_php: bool,
    pub verbose: bool,
    pub jobs: Option<usize>,
    pub security: SecurityConfig,
}

impl From<&ExtractArgs> for ExtractorConfig {
    fn from(args: &ExtractArgs) -> Self {
        Self {
            execute_php: args.execute_php,
            verbose: args.verbose,
            jobs: args.jobs,
            security: SecurityConfig::default(),
        }
    }
}

/// Performance statistics
#[derive(Debug, Clone)]
pub struct PerformanceStats {
    pub total_duration: Duration,
    pub render_duration: Duration,
    pub extraction_duration: Duration,
    pub files_per_second: f64,
    pub bytes_processed: u64,
}

/// Result of the extraction process
#[derive(Debug)]
pub struct ExtractionResult {
    pub catalog: Catalog,
    pub report: String,
    pub performance_stats: Option<PerformanceStats>,
}

/// Main extractor entry point: collect files, render dynamic PHP, run the
/// extraction pipeline, assemble the catalog, write outputs.
pub async fn extract(args: ExtractArgs) -> Result<ExtractionResult> {
    let start_time = Instant::now();

    args.validate().map_err(ExtractorError::InvalidInput)?;

    let run_config = ExtractorConfig::from(&args);
    // A config file layers on top of the defaults: list-valued fields union,
    // scalar sections are taken from the file.
    let mut catalog_config = if let Some(config_path) = &args.config {
        CatalogConfig::default().merge(CatalogConfig::from_file(config_path)?)
    } else {
        CatalogConfig::default()
    };
    if let Some(php_path) = &args.php_path {
        catalog_config.php.path = php_path.clone();
    }

    validate_output_path(&args.output_report, &run_config.security)?;
    validate_output_path(&args.output_catalog, &run_config.security)?;

    if run_config.verbose {
        eprintln!("Starting Tailwind component extraction...");
        eprintln!("Input patterns: {:?}", args.input);
        eprintln!("Output report: {}", args.output_report.display());
        eprintln!("Output catalog: {}", args.output_catalog.display());
        eprintln!(
            "PHP execution is {}",
            if run_config.execute_php { "enabled" } else { "disabled" }
        );
    }

    // Collect files matching the patterns
    let files = collect_files_with_security(&args.input, &args.exclude, &run_config.security)?;

    if files.is_empty() {
        return Err(ExtractorError::NoFilesFound);
    }

    if run_config.verbose {
        eprintln!("Found {} files to process", files.len());
    }

    // Ctrl-C stops dispatching new jobs; in-flight workers finish their
    // current file and the catalog is marked incomplete.
    let cancel = Arc::new(AtomicBool::new(false));
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupt received, finishing in-flight files");
                cancel.store(true, Ordering::Relaxed);
            }
        });
    }

    let mut stats = RunStats::default();
    stats.files_scanned = files.len();
    let bytes_processed: u64 = files.iter().map(|f| f.size).sum();

    let mut jobs: Vec<SourceJob> = Vec::with_capacity(files.len());
    for file in &files {
        match file.kind {
            SourceKind::Php => stats.php_files += 1,
            SourceKind::Static => stats.html_files += 1,
        }
        jobs.push(SourceJob::File {
            path: file.path.clone(),
            kind: file.kind,
        });
    }

    // Dynamic mode: render each PHP file through the interpreter up front.
    // Every success adds a second rendering of the same path to the job list.
    let render_start = Instant::now();
    let mut render_errors: Vec<FileError> = Vec::new();
    if run_config.execute_php && stats.php_files > 0 {
        let executor = PhpExecutor::new(&catalog_config.php);
        match executor.check_installation().await {
            Ok(_) => {
                let php_paths: Vec<PathBuf> = files
                    .iter()
                    .filter(|f| f.kind == SourceKind::Php)
                    .map(|f| f.path.clone())
                    .collect();
                let (rendered, errors) =
                    render_php_files(&executor, php_paths, cancel.clone()).await;
                stats.php_files_executed = rendered.len();
                stats.execution_errors = errors.len();
                jobs.extend(rendered.into_iter().map(SourceJob::Rendered));
                render_errors = errors;
            }
            Err(message) => {
                warn!("{}; PHP execution disabled for this run", message);
            }
        }
    }
    let render_duration = render_start.elapsed();

    // Configure thread pool if specified
    if let Some(num_jobs) = run_config.jobs {
        let _ = rayon::ThreadPoolBuilder::new()
            .num_threads(num_jobs)
            .build_global();
    }

    // Progress reporting in non-verbose mode
    let multi_progress = if !run_config.verbose {
        MultiProgress::new()
    } else {
        MultiProgress::with_draw_target(ProgressDrawTarget::hidden())
    };
    let progress_bar = if !run_config.verbose {
        let pb = multi_progress.add(ProgressBar::new(jobs.len() as u64));
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({msg})")
                .unwrap()
                .progress_chars("█▉▊▋▌▍▎▏  "),
        );
        pb.set_message("Starting extraction...");
        Some(pb)
    } else {
        None
    };

    let extraction_start = Instant::now();
    let pipeline = Pipeline::from_config(&catalog_config);
    let output = pipeline.run(jobs, &cancel, progress_bar.as_ref());
    let extraction_duration = extraction_start.elapsed();

    stats.candidates_found = output.candidates_found;
    stats.duplicate_occurrences = output.duplicate_occurrences;

    let mut errors = render_errors;
    errors.extend(output.errors);

    let catalog = CatalogBuilder::new()
        .with_stats(stats)
        .with_errors(errors)
        .with_complete(!cancel.load(Ordering::Relaxed))
        .finalize(output.components);

    let label = project_label(&args.input);
    let report = report::render_report(&catalog, &label);

    let total_duration = start_time.elapsed();
    let perf = PerformanceStats {
        total_duration,
        render_duration,
        extraction_duration,
        files_per_second: files.len() as f64 / total_duration.as_secs_f64().max(f64::EPSILON),
        bytes_processed,
    };

    if let Some(pb) = &progress_bar {
        pb.finish_with_message(format!("✓ Complete ({:.1} files/sec)", perf.files_per_second));
    }

    let result = ExtractionResult {
        catalog,
        report,
        performance_stats: Some(perf.clone()),
    };

    if !args.dry_run {
        write_output_files(&args, &result)?;
    }

    if run_config.verbose {
        eprintln!("\nExtraction complete:");
        eprintln!("  - Processed {} files", result.catalog.metadata.stats.files_scanned);
        eprintln!("  - Unique components: {}", result.catalog.component_count());
        eprintln!("  - Total sightings: {}", result.catalog.location_count());
        eprintln!("\nPerformance:");
        eprintln!("  - Total time: {:.2}s", perf.total_duration.as_secs_f64());
        eprintln!("  - PHP rendering: {:.2}s", perf.render_duration.as_secs_f64());
        eprintln!("  - Extraction: {:.2}s", perf.extraction_duration.as_secs_f64());
        eprintln!("  - Processing rate: {:.1} files/sec", perf.files_per_second);
    }

    Ok(result)
}

/// One discovered input file.
#[derive(Debug, Clone)]
struct DiscoveredFile {
    path: PathBuf,
    size: u64,
    kind: SourceKind,
}

fn kind_for_path(path: &Path) -> SourceKind {
    match path.extension().and_then(|e| e.to_str()) {
        Some("php") => SourceKind::Php,
        _ => SourceKind::Static,
    }
}

fn project_label(patterns: &[String]) -> String {
    patterns
        .first()
        .cloned()
        .unwrap_or_else(|| "input".to_string())
}

/// Validate that a relative output path stays inside the working directory.
/// The target usually does not exist yet, so containment is checked against
/// the deepest resolvable ancestor rather than the file itself. Absolute
/// paths are taken as explicit user intent and pass through.
fn validate_output_path(path: &Path, security: &SecurityConfig) -> Result<()> {
    if path.is_absolute() {
        return Ok(());
    }

    let traversal = || {
        ExtractorError::SecurityError(format!(
            "Output path '{}' appears to use path traversal",
            path.display()
        ))
    };

    if path
        .components()
        .any(|c| matches!(c, std::path::Component::ParentDir))
    {
        return Err(traversal());
    }

    let working_dir = security
        .working_directory
        .canonicalize()
        .unwrap_or_else(|_| security.working_directory.clone());
    let absolute = working_dir.join(path);
    let resolved = match absolute.canonicalize() {
        Ok(resolved) => resolved,
        Err(_) => {
            // Not created yet: resolve the parent instead so a symlinked
            // ancestor cannot smuggle the write outside the working tree.
            let file_name = absolute
                .file_name()
                .map(|n| n.to_os_string())
                .unwrap_or_default();
            match absolute.parent().and_then(|p| p.canonicalize().ok()) {
                Some(parent) => parent.join(file_name),
                None => absolute,
            }
        }
    };

    if !resolved.starts_with(&working_dir) {
        return Err(traversal());
    }

    Ok(())
}

/// Check if a file is safe to read
fn validate_input_file(path: &Path, security: &SecurityConfig) -> Result<()> {
    if !security.allow_symlinks && path.is_symlink() {
        return Err(ExtractorError::SecurityError(format!(
            "Symbolic link not allowed: {}",
            path.display()
        )));
    }

    let metadata = fs::metadata(path).map_err(|e| {
        ExtractorError::SecurityError(format!(
            "Cannot read file metadata for '{}': {}",
            path.display(),
            e
        ))
    })?;

    if metadata.len() > security.max_file_size {
        return Err(ExtractorError::SecurityError(format!(
            "File '{}' exceeds maximum size limit ({} MB > {} MB)",
            path.display(),
            metadata.len() / (1024 * 1024),
            security.max_file_size / (1024 * 1024)
        )));
    }

    Ok(())
}

/// Collect files matching the given patterns with security checks. The list
/// is sorted by path so runs over the same tree see the same order.
fn collect_files_with_security(
    patterns: &[String],
    exclude_patterns: &[String],
    security: &SecurityConfig,
) -> Result<Vec<DiscoveredFile>> {
    let mut files = Vec::new();
    let mut seen = std::collections::HashSet::new();
    let mut skipped_count = 0;

    for pattern in patterns {
        for entry in glob::glob(pattern)? {
            let path = entry?;

            if should_exclude(&path, exclude_patterns)? {
                continue;
            }
            if path.is_dir() {
                continue;
            }

            match validate_input_file(&path, security) {
                Ok(_) => {}
                Err(e) => {
                    warn!("skipping file: {}", e);
                    skipped_count += 1;
                    continue;
                }
            }

            let size = fs::metadata(&path).map(|m| m.len()).unwrap_or(0);

            if seen.insert(path.clone()) {
                files.push(DiscoveredFile {
                    kind: kind_for_path(&path),
                    path,
                    size,
                });
            }
        }
    }

    if skipped_count > 0 {
        warn!("skipped {} files due to security constraints", skipped_count);
    }

    files.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(files)
}

/// Check if a path should be excluded
fn should_exclude(path: &Path, exclude_patterns: &[String]) -> Result<bool> {
    for pattern in exclude_patterns {
        let pattern = glob::Pattern::new(pattern)?;
        if pattern.matches_path(path) {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Render PHP files concurrently, each bounded by the executor's timeout.
async fn render_php_files(
    executor: &PhpExecutor,
    paths: Vec<PathBuf>,
    cancel: Arc<AtomicBool>,
) -> (Vec<RenderedSource>, Vec<FileError>) {
    let mut set = tokio::task::JoinSet::new();
    for path in paths {
        if cancel.load(Ordering::Relaxed) {
            break;
        }
        let executor = executor.clone();
        set.spawn(async move {
            let result = executor.render(&path).await;
            (path, result)
        });
    }

    let mut rendered = Vec::new();
    let mut errors = Vec::new();
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((path, Ok(html))) => rendered.push(RenderedSource {
                path,
                origin: SourceOrigin::Dynamic,
                content: html,
            }),
            Ok((_, Err(file_error))) => errors.push(file_error),
            Err(e) => warn!("PHP render task failed to join: {}", e),
        }
    }

    (rendered, errors)
}

/// Write the report and catalog to their output files with atomic writes
fn write_output_files(args: &ExtractArgs, result: &ExtractionResult) -> Result<()> {
    if let Some(parent) = args.output_report.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    if let Some(parent) = args.output_catalog.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    write_atomic(&args.output_report, &result.report).map_err(|e| {
        ExtractorError::OutputError {
            path: args.output_report.display().to_string(),
            message: e.to_string(),
        }
    })?;

    let catalog_content = result.catalog.to_pretty_json()?;
    write_atomic(&args.output_catalog, &catalog_content).map_err(|e| {
        ExtractorError::OutputError {
            path: args.output_catalog.display().to_string(),
            message: e.to_string(),
        }
    })?;

    Ok(())
}

/// Write file atomically by writing to temp file then renaming
fn write_atomic<P: AsRef<Path>>(path: P, content: &str) -> std::io::Result<()> {
    use std::io::Write;

    let path = path.as_ref();
    let mut temp_name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    temp_name.push(".tmp");
    let temp_path = path.with_file_name(temp_name);

    let mut file = fs::File::create(&temp_path)?;
    file.write_all(content.as_bytes())?;
    file.sync_all()?;

    fs::rename(&temp_path, path)?;

    Ok(())
}

/// Handle pipe command: read HTML from stdin, write the catalog JSON to
/// stdout. One static rendering named "stdin", no file discovery.
pub async fn handle_pipe_command(args: PipeArgs) -> Result<()> {
    use tokio::io::{self, AsyncReadExt, AsyncWriteExt};

    let mut input = String::new();
    let mut stdin = io::stdin();
    stdin
        .read_to_string(&mut input)
        .await
        .map_err(|e| ExtractorError::InputError(format!("Failed to read from stdin: {}", e)))?;

    let catalog_config = if let Some(config_path) = &args.config {
        CatalogConfig::default().merge(CatalogConfig::from_file(config_path)?)
    } else {
        CatalogConfig::default()
    };

    let pipeline = Pipeline::from_config(&catalog_config);
    let cancel = AtomicBool::new(false);
    let jobs = if input.trim().is_empty() {
        Vec::new()
    } else {
        vec![SourceJob::Rendered(RenderedSource {
            path: PathBuf::from("stdin"),
            origin: SourceOrigin::Static,
            content: input,
        })]
    };

    let output = pipeline.run(jobs, &cancel, None);

    let mut stats = RunStats::default();
    stats.files_scanned = 1;
    stats.candidates_found = output.candidates_found;
    stats.duplicate_occurrences = output.duplicate_occurrences;

    let catalog = CatalogBuilder::new()
        .with_stats(stats)
        .with_errors(output.errors)
        .finalize(output.components);

    let content = if args.compact {
        catalog.to_compact_json()?
    } else {
        catalog.to_pretty_json()?
    };

    let mut stdout = io::stdout();
    stdout
        .write_all(content.as_bytes())
        .await
        .map_err(|e| ExtractorError::OutputError {
            path: "stdout".to_string(),
            message: e.to_string(),
        })?;
    stdout
        .write_all(b"\n")
        .await
        .map_err(|e| ExtractorError::OutputError {
            path: "stdout".to_string(),
            message: e.to_string(),
        })?;
    stdout.flush().await.map_err(|e| ExtractorError::OutputError {
        path: "stdout".to_string(),
        message: e.to_string(),
    })?;

    Ok(())
}
