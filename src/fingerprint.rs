use crate::dom::{Document, NodeData, NodeId};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Deduplication key for a markup fragment: hex SHA-256 of its canonical
/// structural form. Stable across runs, platforms, and attribute/whitespace
/// reshuffling of the source.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Computes canonical forms and digests for candidate nodes.
///
/// The canonical form of an element is its tag, allowlisted structural
/// attributes sorted by name, class tokens sorted lexicographically, and the
/// canonical forms of its element children in document order. Text nodes,
/// comments, whitespace, and non-allowlisted attributes do not participate,
/// so fragments differing only in those details collapse to one fingerprint.
#[derive(Debug, Clone)]
pub struct FingerprintEngine {
    attr_allowlist: Vec<String>,
}

impl FingerprintEngine {
    pub fn new(mut attr_allowlist: Vec<String>) -> Self {
        attr_allowlist.sort();
        Self { attr_allowlist }
    }

    /// Canonical structural form of the subtree rooted at `id`.
    pub fn canonicalize(&self, doc: &Document, id: NodeId) -> String {
        let mut out = String::new();
        self.canonicalize_into(doc, id, &mut out);
        out
    }

    // Explicit work stack; candidate subtrees can be nested arbitrarily deep
    // and this must not abort the run.
    fn canonicalize_into(&self, doc: &Document, root: NodeId, out: &mut String) {
        enum Step {
            Node(NodeId),
            Lit(&'static str),
        }

        let mut stack = vec![Step::Node(root)];
        while let Some(step) = stack.pop() {
            let id = match step {
                Step::Lit(s) => {
                    out.push_str(s);
                    continue;
                }
                Step::Node(id) => id,
            };

            let node = doc.get(id);
            let (tag, attrs, classes) = match &node.data {
                NodeData::Element {
                    tag,
                    attrs,
                    classes,
                } => (tag, attrs, classes),
                NodeData::Text(_) => continue,
            };

            out.push_str(tag);
            out.push('{');
            // Allowlist is sorted at construction, so emission order is fixed
            // regardless of source attribute order.
            let mut first = true;
            for name in &self.attr_allowlist {
                for (attr_name, value) in attrs {
                    if attr_name == name {
                        if !first {
                            out.push(';');
                        }
                        out.push_str(name);
                        out.push('=');
                        out.push_str(value);
                        first = false;
                    }
                }
            }
            out.push('}');

            out.push('(');
            let mut sorted: Vec<&str> = classes.iter().map(String::as_str).collect();
            sorted.sort_unstable();
            sorted.dedup();
            out.push_str(&sorted.join(" "));
            out.push(')');

            out.push('[');
            stack.push(Step::Lit("]"));
            let kids: Vec<NodeId> = node
                .children
                .iter()
                .copied()
                .filter(|&child| doc.get(child).is_element())
                .collect();
            for (i, &child) in kids.iter().enumerate().rev() {
                stack.push(Step::Node(child));
                if i > 0 {
                    stack.push(Step::Lit(","));
                }
            }
        }
    }

    /// Digest the canonical form; returns the key together with the canonical
    /// form, which the dedup table keeps for collision detection.
    pub fn fingerprint(&self, doc: &Document, id: NodeId) -> (Fingerprint, String) {
        let canonical = self.canonicalize(doc, id);
        let digest = Sha256::digest(canonical.as_bytes());
        let mut hex = String::with_capacity(64);
        for byte in digest {
            use fmt::Write;
            let _ = write!(hex, "{:02x}", byte);
        }
        (Fingerprint(hex), canonical)
    }
}

impl Default for FingerprintEngine {
    fn default() -> Self {
        Self::new(vec!["type".to_string()])
    }
}
