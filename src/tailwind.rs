use crate::dom::Node;
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::OnceLock;

/// Version tag for the recognition table below. Bump when the table changes
/// so catalogs produced by different builds can be told apart.
pub const RULE_VERSION: &str = "tw3/1";

/// Utility names that match exactly, with no value suffix.
const EXACT_UTILITIES: &[&str] = &[
    "flex",
    "inline-flex",
    "grid",
    "inline-grid",
    "block",
    "inline-block",
    "inline",
    "hidden",
    "container",
    "rounded",
    "border",
    "shadow",
    "ring",
    "italic",
    "not-italic",
    "underline",
    "line-through",
    "no-underline",
    "uppercase",
    "lowercase",
    "capitalize",
    "normal-case",
    "truncate",
    "antialiased",
    "transition",
    "transform",
    "static",
    "fixed",
    "absolute",
    "relative",
    "sticky",
    "grow",
    "shrink",
    "flex-1",
    "flex-auto",
    "flex-none",
    "sr-only",
];

/// Utility family prefixes. A token matches when its base (after variant
/// stripping and an optional negative sign) starts with one of these.
const UTILITY_PREFIXES: &[&str] = &[
    // spacing
    "p-", "px-", "py-", "pt-", "pr-", "pb-", "pl-", "m-", "mx-", "my-", "mt-", "mr-", "mb-",
    "ml-", "space-x-", "space-y-", "gap-",
    // sizing
    "w-", "h-", "min-w-", "max-w-", "min-h-", "max-h-", "size-",
    // color and surface
    "bg-", "text-", "border-", "ring-", "divide-", "fill-", "stroke-", "shadow-", "outline-",
    "decoration-", "accent-", "caret-", "placeholder-",
    // typography
    "font-", "leading-", "tracking-", "whitespace-", "break-", "list-", "indent-", "align-",
    // flex and grid
    "flex-", "grid-", "col-", "row-", "items-", "justify-", "content-", "self-", "place-",
    "order-", "basis-",
    // layout
    "inset-", "top-", "right-", "bottom-", "left-", "z-", "float-", "clear-", "object-",
    "overflow-", "overscroll-", "aspect-", "columns-",
    // borders and effects
    "rounded-", "opacity-", "blur-", "brightness-", "contrast-", "grayscale-", "saturate-",
    "backdrop-",
    // interactivity and motion
    "cursor-", "select-", "pointer-events-", "scroll-", "snap-", "transition-", "duration-",
    "delay-", "ease-", "animate-", "scale-", "rotate-", "translate-", "skew-", "origin-",
    "will-change-",
];

/// Breakpoint and state variant prefixes (the part before a `:`).
const VARIANT_PREFIXES: &[&str] = &[
    "sm",
    "md",
    "lg",
    "xl",
    "2xl",
    "hover",
    "focus",
    "focus-within",
    "focus-visible",
    "active",
    "visited",
    "disabled",
    "checked",
    "first",
    "last",
    "odd",
    "even",
    "group-hover",
    "group-focus",
    "peer-hover",
    "peer-focus",
    "dark",
    "motion-safe",
    "motion-reduce",
    "print",
];

/// Arbitrary-property utilities, e.g. `[mask-type:luminance]`.
fn arbitrary_property_pattern() -> &'static Regex {
    static ARBITRARY: OnceLock<Regex> = OnceLock::new();
    ARBITRARY.get_or_init(|| Regex::new(r"^\[[a-z-]+:.+\]$").expect("valid regex"))
}

/// Recognizes Tailwind utility tokens against the static rule table.
/// Pure lookups, no side effects; extra prefixes come from configuration.
#[derive(Debug, Clone, Default)]
pub struct TokenAnalyzer {
    extra_prefixes: Vec<String>,
}

impl TokenAnalyzer {
    pub fn new(extra_prefixes: Vec<String>) -> Self {
        Self { extra_prefixes }
    }

    /// Whether a single class token follows a recognized Tailwind pattern.
    pub fn is_tailwind_token(&self, token: &str) -> bool {
        if !is_plausible_token(token) {
            return false;
        }

        let base = strip_variants(token);
        let base = base.strip_prefix('-').unwrap_or(base);

        if base.is_empty() {
            return false;
        }
        if EXACT_UTILITIES.contains(&base) {
            return true;
        }
        if UTILITY_PREFIXES.iter().any(|p| base.starts_with(p)) {
            return true;
        }
        if self.extra_prefixes.iter().any(|p| base.starts_with(p.as_str())) {
            return true;
        }
        arbitrary_property_pattern().is_match(base)
    }

    /// Whether the node's class attribute contains at least one recognized
    /// utility token.
    pub fn is_tailwind_node(&self, node: &Node) -> bool {
        node.classes().iter().any(|c| self.is_tailwind_token(c))
    }

    /// The recognized utility tokens of a node, deduplicated and in
    /// lexicographic order.
    pub fn extract_tokens(&self, node: &Node) -> BTreeSet<String> {
        node.classes()
            .iter()
            .filter(|c| self.is_tailwind_token(c))
            .cloned()
            .collect()
    }
}

/// Drop variant prefixes: `md:hover:bg-blue-500` -> `bg-blue-500`.
/// Unknown segments before a `:` are treated as variants too, so arbitrary
/// variants like `aria-checked:` do not hide the base utility. Colons inside
/// brackets belong to arbitrary values and do not split.
fn strip_variants(token: &str) -> &str {
    let mut depth = 0usize;
    let mut split = None;
    for (i, c) in token.char_indices() {
        match c {
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            ':' if depth == 0 => split = Some(i),
            _ => {}
        }
    }
    match split {
        Some(idx) => &token[idx + 1..],
        None => token,
    }
}

/// Whether the leading segment of a token is a known variant prefix.
fn has_known_variant(token: &str) -> bool {
    match token.split_once(':') {
        Some((head, _)) => VARIANT_PREFIXES.contains(&head),
        None => false,
    }
}

/// Cheap sanity filter carried over from class validation: reject strings
/// that cannot be class names at all.
fn is_plausible_token(token: &str) -> bool {
    if token.is_empty() || token.len() > 100 {
        return false;
    }
    !token.contains(['<', '>', '{', '}', ';'])
}
