use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::fs;
use std::path::Path;
use tailwind_catalog::{extract, ExtractArgs};
use tempfile::TempDir;

/// Create test files for benchmarking
fn create_test_files(dir: &Path, count: usize, size: &str) {
    let content = match size {
        "small" => {
            // One card per file
            r#"<div class="rounded-lg shadow-md p-4 bg-white">
                <h2 class="text-lg font-bold">Title</h2>
                <button class="px-4 py-2 bg-blue-500 text-white rounded">Go</button>
            </div>"#
                .to_string()
        }
        "medium" => {
            // A page with nav, cards, and a form
            let mut content = String::from(
                r#"<nav class="flex gap-4 bg-gray-800 text-white p-4">
                    <a href="/" class="hover:underline">Home</a>
                </nav>"#,
            );
            for i in 0..10 {
                content.push_str(&format!(
                    r#"<div class="rounded shadow p-6 bg-white mt-4">
                        <h3 class="text-md font-semibold">Card {}</h3>
                        <button class="px-4 py-2 bg-blue-500 text-white rounded">Open</button>
                    </div>"#,
                    i
                ));
            }
            content.push_str(
                r#"<form class="space-y-4 p-4">
                    <input class="border rounded px-2" type="text" placeholder="Name">
                    <button class="px-4 py-2 bg-green-500">Submit</button>
                </form>"#,
            );
            content
        }
        "large" => {
            let classes = [
                "flex", "flex-col", "items-center", "justify-center", "p-4", "m-2",
                "bg-blue-500", "text-white", "rounded-lg", "shadow-md",
                "hover:bg-blue-600", "transition-all", "duration-300", "grid",
                "grid-cols-3", "gap-4", "space-x-2", "space-y-4",
            ];
            let mut content = String::new();
            for i in 0..25 {
                content.push_str("<section class=\"py-8 px-4\">\n");
                for j in 0..20 {
                    let class_list = classes
                        .iter()
                        .cycle()
                        .skip(j % classes.len())
                        .take(8)
                        .cloned()
                        .collect::<Vec<_>>()
                        .join(" ");
                    content.push_str(&format!(
                        "  <div class=\"{}\">Content {}-{}</div>\n",
                        class_list, i, j
                    ));
                }
                content.push_str("</section>\n");
            }
            content
        }
        _ => panic!("Unknown size: {}", size),
    };

    for i in 0..count {
        fs::write(dir.join(format!("page_{}.html", i)), &content).unwrap();
    }
}

fn bench_args(dir: &Path, jobs: usize) -> ExtractArgs {
    ExtractArgs {
        input: vec![format!("{}/*.html", dir.display())],
        output_report: dir.join("components.txt"),
        output_catalog: dir.join("catalog.json"),
        config: None,
        execute_php: false,
        php_path: None,
        verbose: false,
        jobs: Some(jobs),
        exclude: vec![],
        dry_run: true, // Don't write files in benchmarks
    }
}

fn benchmark_extraction(c: &mut Criterion) {
    let mut group = c.benchmark_group("extraction");
    group.sample_size(10);

    for count in [10, 50, 100, 500].iter() {
        group.bench_with_input(BenchmarkId::new("file_count", count), count, |b, &count| {
            b.iter_with_setup(
                || {
                    let temp_dir = TempDir::new().unwrap();
                    create_test_files(temp_dir.path(), count, "medium");
                    let args = bench_args(temp_dir.path(), 4);
                    (temp_dir, args)
                },
                |(temp_dir, args)| {
                    let rt = tokio::runtime::Runtime::new().unwrap();
                    rt.block_on(async { extract(args).await.unwrap() });
                    black_box(temp_dir);
                },
            );
        });
    }

    for size in ["small", "medium", "large"].iter() {
        group.bench_with_input(BenchmarkId::new("file_size", size), size, |b, &size| {
            b.iter_with_setup(
                || {
                    let temp_dir = TempDir::new().unwrap();
                    create_test_files(temp_dir.path(), 100, size);
                    let args = bench_args(temp_dir.path(), 4);
                    (temp_dir, args)
                },
                |(temp_dir, args)| {
                    let rt = tokio::runtime::Runtime::new().unwrap();
                    rt.block_on(async { extract(args).await.unwrap() });
                    black_box(temp_dir);
                },
            );
        });
    }

    group.finish();
}

fn benchmark_parallel_processing(c: &mut Criterion) {
    let mut group = c.benchmark_group("parallel_processing");
    group.sample_size(10);

    for threads in [1, 2, 4, 8].iter() {
        group.bench_with_input(BenchmarkId::new("threads", threads), threads, |b, &threads| {
            b.iter_with_setup(
                || {
                    let temp_dir = TempDir::new().unwrap();
                    create_test_files(temp_dir.path(), 200, "medium");
                    let args = bench_args(temp_dir.path(), threads);
                    (temp_dir, args)
                },
                |(temp_dir, args)| {
                    let rt = tokio::runtime::Runtime::new().unwrap();
                    rt.block_on(async { extract(args).await.unwrap() });
                    black_box(temp_dir);
                },
            );
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_extraction, benchmark_parallel_processing);
criterion_main!(benches);
