//! Design token tables.
//!
//! A [`TokenTable`] maps a namespace (`colors`, `spacing`, ...) to a flat map of
//! token names to values. Config documents describe tokens as nested
//! [`TokenTree`]s which are flattened by joining keys with `-`.

use crate::errors::{GeneratorError, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Key that maps a nested group entry onto its parent name
pub const DEFAULT_KEY: &str = "DEFAULT";

/// A token value as written in a configuration document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TokenTree {
    Value(String),
    /// Joined with `", "` when flattened (font stacks)
    List(Vec<String>),
    Group(IndexMap<String, TokenTree>),
}

impl TokenTree {
    /// Build a group from `(name, value)` leaf pairs
    pub fn group<'a>(entries: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        Self::Group(
            entries
                .into_iter()
                .map(|(name, value)| (name.to_string(), Self::Value(value.to_string())))
                .collect(),
        )
    }
}

/// Recursive structural merge of two token trees.
///
/// Groups merge key by key, recursing into keys present on both sides. Any other
/// pairing takes the overlay.
pub fn merge_trees(base: &TokenTree, overlay: &TokenTree) -> TokenTree {
    match (base, overlay) {
        (TokenTree::Group(base_entries), TokenTree::Group(overlay_entries)) => {
            let mut merged = base_entries.clone();
            for (key, value) in overlay_entries {
                let next = match base_entries.get(key) {
                    Some(existing) => merge_trees(existing, value),
                    None => value.clone(),
                };
                merged.insert(key.clone(), next);
            }
            TokenTree::Group(merged)
        }
        _ => overlay.clone(),
    }
}

/// Merge two namespace maps of token trees
pub fn merge_theme(
    base: &IndexMap<String, TokenTree>,
    overlay: &IndexMap<String, TokenTree>,
) -> IndexMap<String, TokenTree> {
    let mut merged = base.clone();
    for (namespace, tree) in overlay {
        let next = match base.get(namespace) {
            Some(existing) => merge_trees(existing, tree),
            None => tree.clone(),
        };
        merged.insert(namespace.clone(), next);
    }
    merged
}

/// Immutable table of design tokens, keyed by namespace then token name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TokenTable {
    namespaces: BTreeMap<String, BTreeMap<String, String>>,
}

impl TokenTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Flatten a theme section into a table
    pub fn from_trees(theme: &IndexMap<String, TokenTree>) -> Result<Self> {
        let mut table = Self::new();
        for (namespace, tree) in theme {
            if namespace.trim().is_empty() {
                return Err(GeneratorError::config("theme namespace names must not be empty"));
            }
            let TokenTree::Group(entries) = tree else {
                return Err(GeneratorError::config(format!(
                    "theme namespace '{}' must be a mapping of token names to values",
                    namespace
                )));
            };
            let target = table.namespaces.entry(namespace.clone()).or_default();
            for (name, value) in entries {
                flatten_into(target, namespace, "", name, value)?;
            }
        }
        Ok(table)
    }

    /// Builder-style insertion used while a table is being constructed
    pub fn with_token(mut self, namespace: &str, name: &str, value: &str) -> Self {
        self.namespaces
            .entry(namespace.to_string())
            .or_default()
            .insert(name.to_string(), value.to_string());
        self
    }

    /// Layer `extension` over this table.
    ///
    /// Every entry of `self` survives unless `extension` defines the same name in
    /// the same namespace, in which case the extension value wins. Namespaces only
    /// present in `extension` are added wholesale.
    pub fn merge(&self, extension: &TokenTable) -> TokenTable {
        let mut namespaces = self.namespaces.clone();
        for (namespace, entries) in &extension.namespaces {
            let target = namespaces.entry(namespace.clone()).or_default();
            for (name, value) in entries {
                target.insert(name.clone(), value.clone());
            }
        }
        TokenTable { namespaces }
    }

    /// Replace whole namespaces of this table with those defined in `overrides`
    pub fn replace_namespaces(&self, overrides: &TokenTable) -> TokenTable {
        let mut namespaces = self.namespaces.clone();
        for (namespace, entries) in &overrides.namespaces {
            namespaces.insert(namespace.clone(), entries.clone());
        }
        TokenTable { namespaces }
    }

    pub fn get(&self, namespace: &str, name: &str) -> Option<&str> {
        self.namespaces
            .get(namespace)
            .and_then(|entries| entries.get(name))
            .map(String::as_str)
    }

    pub fn namespace(&self, namespace: &str) -> Option<&BTreeMap<String, String>> {
        self.namespaces.get(namespace)
    }

    pub fn namespace_names(&self) -> impl Iterator<Item = &str> {
        self.namespaces.keys().map(String::as_str)
    }

    /// Total number of tokens across all namespaces
    pub fn len(&self) -> usize {
        self.namespaces.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The built-in design tokens
    pub fn base() -> Self {
        let mut theme = IndexMap::new();

        let mut colors = IndexMap::new();
        for (name, value) in [
            ("inherit", "inherit"),
            ("current", "currentColor"),
            ("transparent", "transparent"),
            ("black", "#000"),
            ("white", "#fff"),
        ] {
            colors.insert(name.to_string(), TokenTree::Value(value.to_string()));
        }
        for (palette, shades) in [
            ("gray", GRAY),
            ("red", RED),
            ("green", GREEN),
            ("blue", BLUE),
        ] {
            colors.insert(palette.to_string(), TokenTree::group(shades.iter().copied()));
        }
        theme.insert("colors".to_string(), TokenTree::Group(colors));

        theme.insert("spacing".to_string(), TokenTree::group(SPACING.iter().copied()));
        theme.insert(
            "width".to_string(),
            TokenTree::group([
                ("auto", "auto"),
                ("full", "100%"),
                ("screen", "100vw"),
                ("min", "min-content"),
                ("max", "max-content"),
                ("fit", "fit-content"),
            ]),
        );
        theme.insert(
            "height".to_string(),
            TokenTree::group([
                ("auto", "auto"),
                ("full", "100%"),
                ("screen", "100vh"),
                ("min", "min-content"),
                ("max", "max-content"),
                ("fit", "fit-content"),
            ]),
        );
        theme.insert(
            "fontSize".to_string(),
            TokenTree::group([
                ("xs", "0.75rem"),
                ("sm", "0.875rem"),
                ("base", "1rem"),
                ("lg", "1.125rem"),
                ("xl", "1.25rem"),
                ("2xl", "1.5rem"),
                ("3xl", "1.875rem"),
                ("4xl", "2.25rem"),
            ]),
        );
        theme.insert(
            "fontWeight".to_string(),
            TokenTree::group([
                ("thin", "100"),
                ("extralight", "200"),
                ("light", "300"),
                ("normal", "400"),
                ("medium", "500"),
                ("semibold", "600"),
                ("bold", "700"),
                ("extrabold", "800"),
                ("black", "900"),
            ]),
        );
        let mut font_family = IndexMap::new();
        for (name, stack) in [
            ("sans", &["ui-sans-serif", "system-ui", "sans-serif"][..]),
            ("serif", &["ui-serif", "Georgia", "serif"][..]),
            ("mono", &["ui-monospace", "SFMono-Regular", "monospace"][..]),
        ] {
            font_family.insert(
                name.to_string(),
                TokenTree::List(stack.iter().map(|s| s.to_string()).collect()),
            );
        }
        theme.insert("fontFamily".to_string(), TokenTree::Group(font_family));
        theme.insert(
            "borderRadius".to_string(),
            TokenTree::group([
                ("none", "0px"),
                ("sm", "0.125rem"),
                (DEFAULT_KEY, "0.25rem"),
                ("md", "0.375rem"),
                ("lg", "0.5rem"),
                ("xl", "0.75rem"),
                ("full", "9999px"),
            ]),
        );
        theme.insert(
            "borderWidth".to_string(),
            TokenTree::group([
                (DEFAULT_KEY, "1px"),
                ("0", "0px"),
                ("2", "2px"),
                ("4", "4px"),
                ("8", "8px"),
            ]),
        );
        theme.insert(
            "opacity".to_string(),
            TokenTree::group([
                ("0", "0"),
                ("25", "0.25"),
                ("50", "0.5"),
                ("75", "0.75"),
                ("100", "1"),
            ]),
        );
        theme.insert(
            "zIndex".to_string(),
            TokenTree::group([
                ("auto", "auto"),
                ("0", "0"),
                ("10", "10"),
                ("20", "20"),
                ("30", "30"),
                ("40", "40"),
                ("50", "50"),
            ]),
        );
        theme.insert(
            "screens".to_string(),
            TokenTree::group([
                ("sm", "640px"),
                ("md", "768px"),
                ("lg", "1024px"),
                ("xl", "1280px"),
                ("2xl", "1536px"),
            ]),
        );

        // The built-in theme is well formed, flattening cannot fail.
        Self::from_trees(&theme).unwrap_or_default()
    }
}

fn flatten_into(
    target: &mut BTreeMap<String, String>,
    namespace: &str,
    prefix: &str,
    key: &str,
    tree: &TokenTree,
) -> Result<()> {
    if key.is_empty() {
        return Err(GeneratorError::config(format!(
            "empty token name in theme namespace '{}'",
            namespace
        )));
    }
    let name = match (prefix.is_empty(), key == DEFAULT_KEY) {
        (true, _) => key.to_string(),
        (false, true) => prefix.to_string(),
        (false, false) => format!("{}-{}", prefix, key),
    };
    match tree {
        TokenTree::Value(value) => {
            target.insert(name, value.clone());
        }
        TokenTree::List(values) => {
            target.insert(name, values.join(", "));
        }
        TokenTree::Group(entries) => {
            for (child, value) in entries {
                flatten_into(target, namespace, &name, child, value)?;
            }
        }
    }
    Ok(())
}

const GRAY: &[(&str, &str)] = &[
    ("100", "#f3f4f6"),
    ("200", "#e5e7eb"),
    ("300", "#d1d5db"),
    ("400", "#9ca3af"),
    ("500", "#6b7280"),
    ("600", "#4b5563"),
    ("700", "#374151"),
    ("800", "#1f2937"),
    ("900", "#111827"),
];

const RED: &[(&str, &str)] = &[
    ("100", "#fee2e2"),
    ("200", "#fecaca"),
    ("300", "#fca5a5"),
    ("400", "#f87171"),
    ("500", "#ef4444"),
    ("600", "#dc2626"),
    ("700", "#b91c1c"),
    ("800", "#991b1b"),
    ("900", "#7f1d1d"),
];

const GREEN: &[(&str, &str)] = &[
    ("100", "#dcfce7"),
    ("200", "#bbf7d0"),
    ("300", "#86efac"),
    ("400", "#4ade80"),
    ("500", "#22c55e"),
    ("600", "#16a34a"),
    ("700", "#15803d"),
    ("800", "#166534"),
    ("900", "#14532d"),
];

const BLUE: &[(&str, &str)] = &[
    ("100", "#dbeafe"),
    ("200", "#bfdbfe"),
    ("300", "#93c5fd"),
    ("400", "#60a5fa"),
    ("500", "#3b82f6"),
    ("600", "#2563eb"),
    ("700", "#1d4ed8"),
    ("800", "#1e40af"),
    ("900", "#1e3a8a"),
];

const SPACING: &[(&str, &str)] = &[
    ("px", "1px"),
    ("0", "0px"),
    ("1", "0.25rem"),
    ("2", "0.5rem"),
    ("3", "0.75rem"),
    ("4", "1rem"),
    ("5", "1.25rem"),
    ("6", "1.5rem"),
    ("8", "2rem"),
    ("10", "2.5rem"),
    ("12", "3rem"),
    ("16", "4rem"),
    ("20", "5rem"),
    ("24", "6rem"),
    ("32", "8rem"),
    ("40", "10rem"),
    ("48", "12rem"),
    ("64", "16rem"),
    ("96", "24rem"),
];
