use crate::catalog::Catalog;
use std::fmt::Write;

const RULE: &str = "------------------------------------------------------------";
const DOUBLE_RULE: &str = "============================================================";

/// Render the human-readable component reference from a finished catalog.
/// Pure formatting; the catalog is the single source of truth.
pub fn render_report(catalog: &Catalog, project_label: &str) -> String {
    let mut out = String::new();
    let stats = &catalog.metadata.stats;

    let _ = writeln!(out, "TAILWIND COMPONENTS FROM {}", project_label);
    let _ = writeln!(out, "{}\n", DOUBLE_RULE);
    let _ = writeln!(
        out,
        "Extraction date: {}",
        catalog.metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    if let Some(version) = &catalog.metadata.tool_version {
        let _ = writeln!(out, "Generated by: tailwind-catalog-cli v{}", version);
    }
    let _ = writeln!(out, "Rule table: {}\n", catalog.metadata.rule_version);

    let _ = writeln!(out, "Files scanned: {}", stats.files_scanned);
    let _ = writeln!(out, "PHP files found: {}", stats.php_files);
    let _ = writeln!(out, "PHP files executed: {}", stats.php_files_executed);
    let _ = writeln!(out, "HTML files found: {}", stats.html_files);
    let _ = writeln!(out, "Total candidates found: {}", stats.candidates_found);
    let _ = writeln!(out, "Unique components: {}", stats.unique_components);
    let _ = writeln!(out, "Duplicate occurrences: {}", stats.duplicate_occurrences);

    if stats.execution_errors > 0 {
        let _ = writeln!(
            out,
            "\nNote: {} PHP execution errors occurred during processing.",
            stats.execution_errors
        );
    }
    if !catalog.metadata.complete {
        let _ = writeln!(
            out,
            "\nNOTE: the run was aborted before finishing; this catalog is INCOMPLETE."
        );
    }

    for (category, components) in &catalog.categories {
        let _ = writeln!(
            out,
            "\n{} ({} components)",
            category.label().to_uppercase(),
            components.len()
        );
        let _ = writeln!(out, "{}\n", RULE);

        for (i, component) in components.iter().enumerate() {
            let first = component
                .first_claim()
                .map(|loc| format!("{} (position {})", loc.path.display(), loc.position))
                .unwrap_or_else(|| "unknown".to_string());
            let _ = writeln!(
                out,
                "Component #{} from {}, seen {} time(s)",
                i + 1,
                first,
                component.locations.len()
            );
            if component.locations.len() > 1 {
                let _ = writeln!(out, "Also seen in:");
                for loc in component.locations.iter().skip(1) {
                    let _ = writeln!(out, "  - {} (position {})", loc.path.display(), loc.position);
                }
            }
            let _ = writeln!(out, "```html");
            let _ = writeln!(out, "{}", component.markup);
            let _ = writeln!(out, "```\n");
        }
    }

    if !catalog.errors.is_empty() {
        let _ = writeln!(out, "\nFILE ERRORS ({})", catalog.errors.len());
        let _ = writeln!(out, "{}\n", RULE);
        for err in &catalog.errors {
            let _ = writeln!(out, "{}: {:?}: {}", err.path.display(), err.kind, err.message);
        }
    }

    out
}
