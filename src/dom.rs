use scraper::{Html, Node as HtmlNode};
use tracing::warn;

/// How the markup we are parsing was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    /// Raw file contents (or PHP contents with code blocks stripped).
    Static,
    /// HTML captured from executing a PHP file.
    Dynamic,
}

/// Index of a node within a [`Document`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

#[derive(Debug, Clone)]
pub enum NodeData {
    Element {
        tag: String,
        /// Attributes in source order, minus `class` which is split out.
        attrs: Vec<(String, String)>,
        /// Class attribute split on whitespace, in source order.
        classes: Vec<String>,
    },
    Text(String),
}

#[derive(Debug, Clone)]
pub struct Node {
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub data: NodeData,
}

impl Node {
    pub fn tag(&self) -> Option<&str> {
        match &self.data {
            NodeData::Element { tag, .. } => Some(tag),
            NodeData::Text(_) => None,
        }
    }

    pub fn classes(&self) -> &[String] {
        match &self.data {
            NodeData::Element { classes, .. } => classes,
            NodeData::Text(_) => &[],
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        match &self.data {
            NodeData::Element { attrs, .. } => attrs
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.as_str()),
            NodeData::Text(_) => None,
        }
    }

    pub fn is_element(&self) -> bool {
        matches!(self.data, NodeData::Element { .. })
    }
}

/// An owned node tree for one parsed input, laid out as an arena with
/// explicit parent/child indices. Produced once per source and discarded
/// after extraction.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    roots: Vec<NodeId>,
}

/// Elements that never take a closing tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Tags whose bodies are dropped from representative markup (the tag itself
/// is kept for structure).
const OPAQUE_ELEMENTS: &[&str] = &["script", "style"];

/// Text nodes longer than this are truncated in representative markup.
const MAX_TEXT_LEN: usize = 100;

impl Document {
    /// Parse markup into a node arena, best-effort.
    ///
    /// html5ever recovers from malformed input rather than failing; any
    /// recoverable syntax errors it reports are logged as warnings and the
    /// recovered tree is used as-is. `source` only labels the warnings.
    pub fn parse(content: &str, mode: ParseMode, source: &str) -> Document {
        let html = Html::parse_document(content);

        for error in &html.errors {
            warn!(source, ?mode, "recovered from markup error: {}", error);
        }

        let mut doc = Document {
            nodes: Vec::new(),
            roots: Vec::new(),
        };

        // Explicit work stack: nesting depth is attacker-controlled, so the
        // conversion must not recurse. Children are pushed in reverse so pop
        // order is document order.
        let mut stack: Vec<(ego_tree::NodeRef<'_, HtmlNode>, Option<NodeId>)> = html
            .tree
            .root()
            .children()
            .rev()
            .map(|child| (child, None))
            .collect();

        while let Some((node, parent)) = stack.pop() {
            let Some(data) = convert_value(node.value()) else {
                continue;
            };

            let id = NodeId(doc.nodes.len());
            doc.nodes.push(Node {
                parent,
                children: Vec::new(),
                data,
            });
            match parent {
                Some(p) => doc.nodes[p.0].children.push(id),
                None => doc.roots.push(id),
            }

            for child in node.children().rev() {
                stack.push((child, Some(id)));
            }
        }
        doc
    }

    pub fn get(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Walk up from `id`, yielding ancestor ids nearest-first.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        let mut current = self.get(id).parent;
        std::iter::from_fn(move || {
            let next = current?;
            current = self.get(next).parent;
            Some(next)
        })
    }

    /// True if any ancestor within `max_depth` levels satisfies the predicate.
    pub fn any_ancestor<F>(&self, id: NodeId, max_depth: usize, mut pred: F) -> bool
    where
        F: FnMut(&Node) -> bool,
    {
        self.ancestors(id)
            .take(max_depth)
            .any(|a| pred(self.get(a)))
    }

    /// True if any element strictly below `id`, within `max_depth` levels,
    /// satisfies the predicate.
    pub fn any_descendant<F>(&self, id: NodeId, max_depth: usize, mut pred: F) -> bool
    where
        F: FnMut(&Node) -> bool,
    {
        let mut stack: Vec<(NodeId, usize)> = self
            .get(id)
            .children
            .iter()
            .map(|&c| (c, 1))
            .collect();
        while let Some((current, depth)) = stack.pop() {
            let node = self.get(current);
            if node.is_element() {
                if pred(node) {
                    return true;
                }
                if depth < max_depth {
                    stack.extend(node.children.iter().map(|&c| (c, depth + 1)));
                }
            }
        }
        false
    }

    /// Count elements strictly below `id` (bounded depth) matching the
    /// predicate.
    pub fn count_descendants<F>(&self, id: NodeId, max_depth: usize, mut pred: F) -> usize
    where
        F: FnMut(&Node) -> bool,
    {
        let mut count = 0;
        let mut stack: Vec<(NodeId, usize)> = self
            .get(id)
            .children
            .iter()
            .map(|&c| (c, 1))
            .collect();
        while let Some((current, depth)) = stack.pop() {
            let node = self.get(current);
            if node.is_element() {
                if pred(node) {
                    count += 1;
                }
                if depth < max_depth {
                    stack.extend(node.children.iter().map(|&c| (c, depth + 1)));
                }
            }
        }
        count
    }

    /// Serialize the subtree rooted at `id` as cleaned representative markup:
    /// only allowlisted attributes are kept, script/style bodies are dropped,
    /// and long text runs are truncated.
    pub fn serialize_cleaned(&self, id: NodeId, attr_allowlist: &[String]) -> String {
        let mut out = String::new();
        self.serialize_node(id, attr_allowlist, &mut out);
        out
    }

    // Stack-driven like `parse`; subtree depth must not translate into call
    // depth.
    fn serialize_node(&self, root: NodeId, attr_allowlist: &[String], out: &mut String) {
        enum Step {
            Emit(NodeId),
            Close(NodeId),
        }

        let mut stack = vec![Step::Emit(root)];
        while let Some(step) = stack.pop() {
            let id = match step {
                Step::Close(id) => {
                    if let Some(tag) = self.get(id).tag() {
                        out.push_str("</");
                        out.push_str(tag);
                        out.push('>');
                    }
                    continue;
                }
                Step::Emit(id) => id,
            };

            let node = self.get(id);
            match &node.data {
                NodeData::Text(text) => {
                    if text.len() > MAX_TEXT_LEN {
                        let cut = text
                            .char_indices()
                            .take_while(|(i, _)| *i < MAX_TEXT_LEN)
                            .last()
                            .map(|(i, c)| i + c.len_utf8())
                            .unwrap_or(0);
                        escape_text(&text[..cut], out);
                        out.push_str("...");
                    } else {
                        escape_text(text, out);
                    }
                }
                NodeData::Element {
                    tag,
                    attrs,
                    classes,
                } => {
                    out.push('<');
                    out.push_str(tag);
                    if !classes.is_empty() {
                        out.push_str(" class=\"");
                        escape_attr(&classes.join(" "), out);
                        out.push('"');
                    }
                    for (name, value) in attrs {
                        if attr_allowlist.iter().any(|a| a == name) {
                            out.push(' ');
                            out.push_str(name);
                            out.push_str("=\"");
                            escape_attr(value, out);
                            out.push('"');
                        }
                    }
                    if VOID_ELEMENTS.contains(&tag.as_str()) {
                        out.push_str("/>");
                        continue;
                    }
                    out.push('>');
                    stack.push(Step::Close(id));
                    if !OPAQUE_ELEMENTS.contains(&tag.as_str()) {
                        for &child in node.children.iter().rev() {
                            stack.push(Step::Emit(child));
                        }
                    }
                }
            }
        }
    }
}

fn convert_value(value: &HtmlNode) -> Option<NodeData> {
    match value {
        HtmlNode::Element(el) => {
            let mut attrs = Vec::new();
            let mut classes = Vec::new();
            for (name, value) in el.attrs() {
                if name == "class" {
                    classes.extend(value.split_whitespace().map(str::to_string));
                } else {
                    attrs.push((name.to_string(), value.to_string()));
                }
            }
            Some(NodeData::Element {
                tag: el.name().to_string(),
                attrs,
                classes,
            })
        }
        HtmlNode::Text(text) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                return None;
            }
            Some(NodeData::Text(trimmed.to_string()))
        }
        // Comments, doctypes and processing instructions carry no structure
        // worth keeping.
        _ => None,
    }
}

fn escape_text(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
}

fn escape_attr(value: &str, out: &mut String) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn find_by_tag(doc: &Document, tag: &str) -> Option<NodeId> {
        (0..doc.len())
            .map(NodeId)
            .find(|&id| doc.get(id).tag() == Some(tag))
    }

    #[test]
    fn test_parse_builds_arena_with_links() {
        let doc = Document::parse(
            r#"<div class="p-4"><span>hi</span></div>"#,
            ParseMode::Static,
            "test",
        );
        let div = find_by_tag(&doc, "div").unwrap();
        let span = find_by_tag(&doc, "span").unwrap();
        assert_eq!(doc.get(span).parent, Some(div));
        assert!(doc.get(div).children.contains(&span));
        assert_eq!(doc.get(div).classes(), &["p-4".to_string()]);
    }

    #[test]
    fn test_malformed_markup_recovers() {
        let doc = Document::parse(
            r#"<div class="p-4"><span>unclosed"#,
            ParseMode::Static,
            "test",
        );
        let div = find_by_tag(&doc, "div").unwrap();
        assert_eq!(doc.get(div).classes(), &["p-4".to_string()]);
        assert!(find_by_tag(&doc, "span").is_some());
    }

    #[test]
    fn test_comments_and_blank_text_dropped() {
        let doc = Document::parse(
            "<div><!-- note -->   <p>x</p></div>",
            ParseMode::Static,
            "test",
        );
        let div = find_by_tag(&doc, "div").unwrap();
        // Only the <p> survives as a child.
        assert_eq!(doc.get(div).children.len(), 1);
    }

    #[test]
    fn test_ancestor_and_descendant_queries() {
        let doc = Document::parse(
            "<form><div><input type=\"text\"></div></form>",
            ParseMode::Static,
            "test",
        );
        let input = find_by_tag(&doc, "input").unwrap();
        let form = find_by_tag(&doc, "form").unwrap();
        assert!(doc.any_ancestor(input, 8, |n| n.tag() == Some("form")));
        assert!(doc.any_descendant(form, 4, |n| n.tag() == Some("input")));
        assert!(!doc.any_descendant(input, 4, |n| n.is_element()));
    }

    #[test]
    fn test_descendant_depth_bound() {
        let doc = Document::parse(
            "<div><div><div><div><em>deep</em></div></div></div></div>",
            ParseMode::Static,
            "test",
        );
        let outer = find_by_tag(&doc, "div").unwrap();
        assert!(doc.any_descendant(outer, 6, |n| n.tag() == Some("em")));
        assert!(!doc.any_descendant(outer, 2, |n| n.tag() == Some("em")));
    }

    #[test]
    fn test_serialize_cleaned_filters_attributes() {
        let doc = Document::parse(
            r#"<a class="text-blue-500" href="/x" data-track="7" onclick="evil()">go</a>"#,
            ParseMode::Static,
            "test",
        );
        let a = find_by_tag(&doc, "a").unwrap();
        let allow = vec!["href".to_string()];
        let html = doc.serialize_cleaned(a, &allow);
        assert_eq!(html, r#"<a class="text-blue-500" href="/x">go</a>"#);
    }

    #[test]
    fn test_serialize_cleaned_drops_script_body() {
        let doc = Document::parse(
            r#"<div class="p-2"><script>alert(1)</script></div>"#,
            ParseMode::Static,
            "test",
        );
        let div = find_by_tag(&doc, "div").unwrap();
        let html = doc.serialize_cleaned(div, &[]);
        assert!(html.contains("<script></script>"));
        assert!(!html.contains("alert"));
    }

    #[test]
    fn test_serialize_truncates_long_text() {
        let long = "x".repeat(300);
        let doc = Document::parse(
            &format!("<p class=\"text-sm\">{}</p>", long),
            ParseMode::Static,
            "test",
        );
        let p = find_by_tag(&doc, "p").unwrap();
        let html = doc.serialize_cleaned(p, &[]);
        assert!(html.contains("..."));
        assert!(html.len() < 200);
    }

    #[test]
    fn test_deeply_nested_markup_does_not_overflow() {
        let depth = 50_000;
        let mut html = String::new();
        for _ in 0..depth {
            html.push_str(r#"<div class="p-1">"#);
        }
        html.push('x');
        for _ in 0..depth {
            html.push_str("</div>");
        }

        let doc = Document::parse(&html, ParseMode::Static, "test");
        assert!(doc.len() >= depth);

        let outer = find_by_tag(&doc, "div").unwrap();
        let rendered = doc.serialize_cleaned(outer, &[]);
        assert!(rendered.starts_with(r#"<div class="p-1">"#));
        assert!(rendered.ends_with("</div>"));
    }

    #[test]
    fn test_void_elements_self_close() {
        let doc = Document::parse(
            r#"<input class="border rounded" type="text">"#,
            ParseMode::Static,
            "test",
        );
        let input = find_by_tag(&doc, "input").unwrap();
        let allow = vec!["type".to_string()];
        let html = doc.serialize_cleaned(input, &allow);
        assert_eq!(html, r#"<input class="border rounded" type="text"/>"#);
    }
}
