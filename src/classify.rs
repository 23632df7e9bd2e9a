use crate::dom::{Document, Node, NodeId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Fixed component taxonomy. Enum order is the catalog's display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Button,
    Card,
    Form,
    Input,
    Navigation,
    Header,
    Footer,
    Modal,
    Table,
    Grid,
    Container,
    Section,
    Link,
    Other,
}

impl Category {
    pub const ALL: [Category; 14] = [
        Category::Button,
        Category::Card,
        Category::Form,
        Category::Input,
        Category::Navigation,
        Category::Header,
        Category::Footer,
        Category::Modal,
        Category::Table,
        Category::Grid,
        Category::Container,
        Category::Section,
        Category::Link,
        Category::Other,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Category::Button => "buttons",
            Category::Card => "cards",
            Category::Form => "forms",
            Category::Input => "inputs",
            Category::Navigation => "navigation",
            Category::Header => "headers",
            Category::Footer => "footers",
            Category::Modal => "modals",
            Category::Table => "tables",
            Category::Grid => "grids",
            Category::Container => "containers",
            Category::Section => "sections",
            Category::Link => "links",
            Category::Other => "other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Bounds on how far classification rules may look around a node. Keeps
/// classification cost flat on deeply nested trees.
#[derive(Debug, Clone, Copy)]
pub struct ClassifyLimits {
    pub ancestor_depth: usize,
    pub descendant_depth: usize,
}

impl Default for ClassifyLimits {
    fn default() -> Self {
        Self {
            ancestor_depth: 8,
            descendant_depth: 4,
        }
    }
}

fn class_text(node: &Node) -> String {
    node.classes().join(" ").to_lowercase()
}

fn tag_is(node: &Node, tag: &str) -> bool {
    node.tag() == Some(tag)
}

fn is_form_control(node: &Node) -> bool {
    matches!(node.tag(), Some("input") | Some("select") | Some("textarea"))
}

/// Map a node to its category. Rules run most-specific-first and the first
/// match wins; a node that matches nothing is `Other`.
///
/// Pure function of the node's tag, class tokens, and bounded local
/// structure, so repeated calls with the same context always agree.
pub fn classify(doc: &Document, id: NodeId, limits: ClassifyLimits) -> Category {
    let node = doc.get(id);
    let classes = class_text(node);
    let d = limits.descendant_depth;

    if tag_is(node, "dialog") || classes.contains("modal") || classes.contains("dialog") {
        return Category::Modal;
    }
    if tag_is(node, "nav")
        || classes.contains("nav")
        || classes.contains("navbar")
        || classes.contains("menu")
    {
        return Category::Navigation;
    }
    // A fragment living inside a <form> that carries controls is part of the
    // form, even when it would otherwise look like a button group.
    if doc.any_ancestor(id, limits.ancestor_depth, |n| tag_is(n, "form"))
        && doc.any_descendant(id, d, |n| is_form_control(n) || tag_is(n, "button"))
    {
        return Category::Form;
    }
    if tag_is(node, "form") || doc.any_descendant(id, d, |n| tag_is(n, "form")) {
        return Category::Form;
    }
    if tag_is(node, "button")
        || classes.contains("btn")
        || classes.contains("button")
        || (tag_is(node, "input")
            && matches!(node.attr("type"), Some("submit") | Some("button")))
    {
        return Category::Button;
    }
    if tag_is(node, "header")
        || classes.contains("header")
        || doc.any_descendant(id, d, |n| tag_is(n, "h1"))
    {
        return Category::Header;
    }
    if tag_is(node, "table") || doc.any_descendant(id, d, |n| tag_is(n, "table")) {
        return Category::Table;
    }
    if classes.contains("card")
        || (tag_is(node, "div")
            && doc.any_descendant(id, d, |n| tag_is(n, "img"))
            && doc.count_descendants(id, d, |n| tag_is(n, "div")) > 1)
    {
        return Category::Card;
    }
    if is_form_control(node) || doc.any_descendant(id, d, is_form_control) {
        return Category::Input;
    }
    if tag_is(node, "footer") || classes.contains("footer") {
        return Category::Footer;
    }
    if classes.contains("container") || classes.contains("wrapper") {
        return Category::Container;
    }
    if classes.contains("grid") || classes.contains("row") || classes.contains("flex") {
        return Category::Grid;
    }
    if tag_is(node, "section") || classes.contains("section") {
        return Category::Section;
    }
    if tag_is(node, "a") || doc.any_descendant(id, d, |n| tag_is(n, "a")) {
        return Category::Link;
    }
    Category::Other
}
