use crate::classify::Category;
use crate::errors::FileError;
use crate::fingerprint::Fingerprint;
use crate::tailwind;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;

/// Which rendering of a source file a sighting came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceOrigin {
    Static,
    Dynamic,
}

/// One sighting of a component: source path plus the candidate's pre-order
/// position within that rendering. Ordered so claim resolution and output
/// sorting agree everywhere.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SourceLocation {
    pub path: PathBuf,
    pub position: usize,
    pub origin: SourceOrigin,
}

/// A unique component: first-seen representative markup, category, and every
/// location it was sighted at. Only the first sighting stores markup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Component {
    pub fingerprint: Fingerprint,
    pub category: Category,

    /// Recognized utility tokens on the representative's root element,
    /// deduplicated and in lexicographic order.
    pub tokens: Vec<String>,
    pub markup: String,
    pub locations: Vec<SourceLocation>,

    /// Canonical structural form backing the fingerprint. Kept for collision
    /// detection during the run; not part of the serialized catalog.
    #[serde(skip)]
    pub canonical: String,
}

impl Component {
    /// The deterministic first-seen claim: the lowest location.
    pub fn first_claim(&self) -> Option<&SourceLocation> {
        self.locations.iter().min()
    }
}

/// Aggregate counters for one run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunStats {
    pub files_scanned: usize,
    pub php_files: usize,
    pub html_files: usize,
    pub php_files_executed: usize,
    pub candidates_found: usize,
    pub unique_components: usize,
    pub duplicate_occurrences: usize,
    pub execution_errors: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_time_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogMetadata {
    /// Catalog format version.
    pub version: String,

    /// Version of the token recognition table used.
    pub rule_version: String,

    pub generated_at: DateTime<Utc>,

    /// False when the run was aborted and the catalog is partial.
    pub complete: bool,

    pub stats: RunStats,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_version: Option<String>,
}

/// The final output artifact: categories in taxonomy order, components in
/// first-seen order, plus per-file errors. Immutable once built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Catalog {
    pub metadata: CatalogMetadata,
    pub categories: IndexMap<Category, Vec<Component>>,
    pub errors: Vec<FileError>,
}

impl Catalog {
    pub fn component_count(&self) -> usize {
        self.categories.values().map(Vec::len).sum()
    }

    pub fn location_count(&self) -> usize {
        self.categories
            .values()
            .flatten()
            .map(|c| c.locations.len())
            .sum()
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| serde_json::json!({}))
    }

    pub fn to_pretty_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn to_compact_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Assembles the immutable catalog from the pipeline's dedup table output.
/// Pure grouping and sorting, no I/O.
pub struct CatalogBuilder {
    stats: RunStats,
    errors: Vec<FileError>,
    complete: bool,
    start_time: Option<std::time::Instant>,
}

impl CatalogBuilder {
    pub fn new() -> Self {
        Self {
            stats: RunStats::default(),
            errors: Vec::new(),
            complete: true,
            start_time: Some(std::time::Instant::now()),
        }
    }

    pub fn with_stats(mut self, stats: RunStats) -> Self {
        self.stats = stats;
        self
    }

    pub fn with_errors(mut self, errors: Vec<FileError>) -> Self {
        self.errors = errors;
        self
    }

    pub fn with_complete(mut self, complete: bool) -> Self {
        self.complete = complete;
        self
    }

    /// Group components by category in taxonomy order; within a category
    /// order by first-seen claim (lowest path, then lowest position), and
    /// sort each component's location list the same way. The result is
    /// independent of the order components arrive in.
    pub fn finalize(mut self, mut components: Vec<Component>) -> Catalog {
        for component in &mut components {
            component.locations.sort();
            component.locations.dedup();
        }
        components.sort_by(|a, b| a.first_claim().cmp(&b.first_claim()));

        self.stats.unique_components = components.len();

        let mut categories: IndexMap<Category, Vec<Component>> = IndexMap::new();
        for category in Category::ALL {
            let bucket: Vec<Component> = components
                .iter()
                .filter(|c| c.category == category)
                .cloned()
                .collect();
            if !bucket.is_empty() {
                categories.insert(category, bucket);
            }
        }

        self.stats.processing_time_ms =
            self.start_time.map(|t| t.elapsed().as_millis() as u64);

        Catalog {
            metadata: CatalogMetadata {
                version: "1.0.0".to_string(),
                rule_version: tailwind::RULE_VERSION.to_string(),
                generated_at: Utc::now(),
                complete: self.complete,
                stats: self.stats,
                tool_version: Some(env!("CARGO_PKG_VERSION").to_string()),
            },
            categories,
            errors: self.errors,
        }
    }
}

impl Default for CatalogBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn component(fp: &str, category: Category, path: &str, position: usize) -> Component {
        Component {
            fingerprint: serde_json::from_value(serde_json::json!(fp)).unwrap(),
            category,
            tokens: vec![],
            markup: format!("<div>{}</div>", fp),
            locations: vec![SourceLocation {
                path: PathBuf::from(path),
                position,
                origin: SourceOrigin::Static,
            }],
            canonical: String::new(),
        }
    }

    #[test]
    fn test_finalize_groups_in_taxonomy_order() {
        let components = vec![
            component("f1", Category::Grid, "a.html", 0),
            component("f2", Category::Button, "a.html", 3),
            component("f3", Category::Card, "b.html", 1),
        ];
        let catalog = CatalogBuilder::new().finalize(components);

        let order: Vec<Category> = catalog.categories.keys().copied().collect();
        assert_eq!(order, vec![Category::Button, Category::Card, Category::Grid]);
        assert_eq!(catalog.component_count(), 3);
    }

    #[test]
    fn test_finalize_orders_by_claim_not_arrival() {
        // Arrival order deliberately reversed from claim order.
        let components = vec![
            component("late", Category::Button, "z.html", 9),
            component("early", Category::Button, "a.html", 1),
        ];
        let catalog = CatalogBuilder::new().finalize(components);
        let buttons = &catalog.categories[&Category::Button];
        assert_eq!(buttons[0].fingerprint.as_str(), "early");
        assert_eq!(buttons[1].fingerprint.as_str(), "late");
    }

    #[test]
    fn test_locations_sorted_and_deduped() {
        let mut c = component("f", Category::Button, "b.html", 5);
        c.locations.push(SourceLocation {
            path: PathBuf::from("a.html"),
            position: 2,
            origin: SourceOrigin::Static,
        });
        c.locations.push(SourceLocation {
            path: PathBuf::from("a.html"),
            position: 2,
            origin: SourceOrigin::Static,
        });
        let catalog = CatalogBuilder::new().finalize(vec![c]);
        let locations = &catalog.categories[&Category::Button][0].locations;
        assert_eq!(locations.len(), 2);
        assert_eq!(locations[0].path, PathBuf::from("a.html"));
    }

    #[test]
    fn test_serialization_shape() {
        let catalog = CatalogBuilder::new()
            .with_complete(false)
            .finalize(vec![component("fp", Category::Button, "x.html", 0)]);
        let json = catalog.to_json();
        assert_eq!(json["metadata"]["complete"], false);
        assert_eq!(json["metadata"]["version"], "1.0.0");
        assert!(json["categories"]["button"].is_array());
        assert_eq!(json["categories"]["button"][0]["fingerprint"], "fp");
        assert!(json["categories"]["button"][0]["tokens"].is_array());
        // Canonical form is internal, never serialized.
        assert!(json["categories"]["button"][0].get("canonical").is_none());
    }

    #[test]
    fn test_empty_catalog() {
        let catalog = CatalogBuilder::new().finalize(vec![]);
        assert_eq!(catalog.component_count(), 0);
        assert!(catalog.categories.is_empty());
        assert!(catalog.metadata.complete);
    }
}
