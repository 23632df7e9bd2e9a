use std::fs;
use std::path::PathBuf;
use tailwind_catalog::{extract, Category, ExtractArgs};
use tempfile::tempdir;

fn args_for(dir: &std::path::Path) -> ExtractArgs {
    ExtractArgs {
        input: vec![
            format!("{}/*.html", dir.display()),
            format!("{}/*.php", dir.display()),
        ],
        output_report: dir.join("report.txt"),
        output_catalog: dir.join("catalog.json"),
        config: None,
        execute_php: false,
        php_path: None,
        verbose: false,
        jobs: None,
        exclude: vec![],
        dry_run: false,
    }
}

#[tokio::test]
async fn test_end_to_end_catalog_generation() {
    let temp_dir = tempdir().unwrap();

    let page = temp_dir.path().join("index.html");
    fs::write(
        &page,
        r##"<html><body>
            <nav class="flex gap-4 bg-gray-800 text-white p-4">
                <a href="/">Home</a><a href="/about">About</a>
            </nav>
            <div class="rounded shadow-lg p-6 bg-white">
                <img src="hero.png" alt="hero">
                <div class="mt-2">A</div>
                <div class="mt-2">B</div>
            </div>
            <button class="px-4 py-2 bg-blue-500 text-white rounded">Save</button>
        </body></html>"##,
    )
    .unwrap();

    let php = temp_dir.path().join("form.php");
    fs::write(
        &php,
        r##"<?php require 'header.php'; ?>
            <form class="space-y-4 p-4">
                <input class="border rounded px-2" type="text" placeholder="Name">
                <button class="px-4 py-2 bg-green-500">Submit</button>
            </form>"##,
    )
    .unwrap();

    let args = args_for(temp_dir.path());
    let result = extract(args.clone()).await.unwrap();

    assert_eq!(result.catalog.metadata.stats.files_scanned, 2);
    assert_eq!(result.catalog.metadata.stats.html_files, 1);
    assert_eq!(result.catalog.metadata.stats.php_files, 1);
    assert!(result.catalog.component_count() >= 3);
    assert!(result.catalog.metadata.complete);

    // Both output files written.
    assert!(args.output_report.exists());
    assert!(args.output_catalog.exists());

    let report = fs::read_to_string(&args.output_report).unwrap();
    assert!(report.contains("```html"));

    let catalog: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&args.output_catalog).unwrap()).unwrap();
    assert!(catalog["categories"].is_object());
    assert_eq!(catalog["metadata"]["complete"], true);
    assert!(catalog["categories"]["navigation"].is_array());
    assert!(catalog["categories"]["form"].is_array());
}

#[tokio::test]
async fn test_duplicate_button_across_files_collapses() {
    let temp_dir = tempdir().unwrap();
    let button = r#"<button class="px-4 py-2 bg-blue-500 text-white rounded">Save</button>"#;
    fs::write(temp_dir.path().join("a.html"), button).unwrap();
    fs::write(temp_dir.path().join("b.html"), button).unwrap();

    let result = extract(args_for(temp_dir.path())).await.unwrap();

    let buttons = result
        .catalog
        .categories
        .get(&Category::Button)
        .expect("button category present");
    assert_eq!(buttons.len(), 1);
    assert_eq!(buttons[0].locations.len(), 2);

    let paths: Vec<PathBuf> = buttons[0].locations.iter().map(|l| l.path.clone()).collect();
    assert!(paths[0].ends_with("a.html"));
    assert!(paths[1].ends_with("b.html"));
}

#[tokio::test]
async fn test_no_tailwind_classes_yields_no_components() {
    let temp_dir = tempdir().unwrap();
    fs::write(
        temp_dir.path().join("plain.html"),
        r#"<div class="foo bar"><span class="baz">x</span></div>"#,
    )
    .unwrap();

    let result = extract(args_for(temp_dir.path())).await.unwrap();
    assert_eq!(result.catalog.component_count(), 0);
}

#[tokio::test]
async fn test_malformed_markup_still_produces_component() {
    let temp_dir = tempdir().unwrap();
    fs::write(
        temp_dir.path().join("broken.html"),
        r#"<div class="p-4"><span>unclosed"#,
    )
    .unwrap();

    let result = extract(args_for(temp_dir.path())).await.unwrap();
    assert_eq!(result.catalog.component_count(), 1);
}

#[tokio::test]
async fn test_dry_run_writes_nothing() {
    let temp_dir = tempdir().unwrap();
    fs::write(
        temp_dir.path().join("a.html"),
        r#"<div class="p-4">x</div>"#,
    )
    .unwrap();

    let mut args = args_for(temp_dir.path());
    args.dry_run = true;
    let result = extract(args.clone()).await.unwrap();

    assert_eq!(result.catalog.component_count(), 1);
    assert!(!args.output_report.exists());
    assert!(!args.output_catalog.exists());
}

#[tokio::test]
async fn test_idempotent_catalog_structure() {
    let temp_dir = tempdir().unwrap();
    fs::write(
        temp_dir.path().join("a.html"),
        r##"<nav class="flex gap-2"><a href="/">x</a></nav>
            <button class="px-4 bg-blue-500">Go</button>
            <button class="px-4 bg-blue-500">Go</button>"##,
    )
    .unwrap();

    let mut args = args_for(temp_dir.path());
    args.dry_run = true;

    let first = extract(args.clone()).await.unwrap();
    let second = extract(args).await.unwrap();

    // Same categories, same component order, same fingerprints.
    let shape = |catalog: &tailwind_catalog::Catalog| {
        catalog
            .categories
            .iter()
            .map(|(cat, comps)| {
                (
                    *cat,
                    comps
                        .iter()
                        .map(|c| c.fingerprint.as_str().to_string())
                        .collect::<Vec<_>>(),
                )
            })
            .collect::<Vec<_>>()
    };
    assert_eq!(shape(&first.catalog), shape(&second.catalog));
}

#[tokio::test]
async fn test_config_file_layers_over_defaults() {
    let temp_dir = tempdir().unwrap();

    let config_path = temp_dir.path().join("catalog.yaml");
    fs::write(
        &config_path,
        r##"
tokens:
  extra_prefixes:
    - "acme-"
fingerprint:
  attr_allowlist:
    - "role"
"##,
    )
    .unwrap();

    // One fragment only a configured prefix recognizes, plus two inputs that
    // stay distinct only if the default "type" allowlist entry survived the
    // merge with the file's allowlist.
    fs::write(
        temp_dir.path().join("page.html"),
        r##"<div class="acme-pill">custom</div>
            <input class="border" type="text">
            <input class="border" type="checkbox">"##,
    )
    .unwrap();

    let mut args = args_for(temp_dir.path());
    args.config = Some(config_path);
    args.dry_run = true;
    let result = extract(args).await.unwrap();

    assert_eq!(result.catalog.component_count(), 3);
    let others = result
        .catalog
        .categories
        .get(&Category::Other)
        .expect("custom-prefix component present");
    assert_eq!(others[0].tokens, vec!["acme-pill".to_string()]);
}

#[tokio::test]
async fn test_exclude_patterns_respected() {
    let temp_dir = tempdir().unwrap();
    fs::write(
        temp_dir.path().join("keep.html"),
        r#"<button class="px-4 bg-blue-500">A</button>"#,
    )
    .unwrap();
    fs::write(
        temp_dir.path().join("skip.html"),
        r#"<button class="px-8 bg-red-500">B</button>"#,
    )
    .unwrap();

    let mut args = args_for(temp_dir.path());
    args.exclude = vec![format!("{}/skip.html", temp_dir.path().display())];
    let result = extract(args).await.unwrap();

    assert_eq!(result.catalog.metadata.stats.files_scanned, 1);
    assert_eq!(result.catalog.component_count(), 1);
}
