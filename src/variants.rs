use std::collections::{BTreeMap, HashMap};

/// Ranks at or above this value belong to media variants, which always sort
/// after pseudo-class variants.
const MEDIA_RANK_BASE: u32 = 1_000_000;

/// How a variant changes the rule it is applied to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VariantKind {
    /// Appended to the selector, e.g. `:hover`
    PseudoClass(String),
    /// Wraps the rule in `@media <condition>`
    Media(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variant {
    pub name: String,
    pub kind: VariantKind,
    pub rank: u32,
}

/// Ordering key contributed by the variants of a class.
///
/// Holds the ranks of the applied variants, highest first. Plain utilities
/// have an empty key and sort before every variant.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VariantKey(Vec<u32>);

impl VariantKey {
    pub fn from_ranks(mut ranks: Vec<u32>) -> Self {
        ranks.sort_unstable_by(|a, b| b.cmp(a));
        Self(ranks)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Known variants by name
#[derive(Debug, Clone, Default)]
pub struct VariantRegistry {
    variants: HashMap<String, Variant>,
    pseudo_count: u32,
    media_count: u32,
}

impl VariantRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Built-in variants plus one responsive variant per `screens` token
    pub fn builtin(screens: Option<&BTreeMap<String, String>>) -> Self {
        let mut registry = Self::new();

        for (name, pseudo) in [
            ("first", ":first-child"),
            ("last", ":last-child"),
            ("odd", ":nth-child(odd)"),
            ("even", ":nth-child(even)"),
            ("visited", ":visited"),
            ("focus-within", ":focus-within"),
            ("hover", ":hover"),
            ("focus", ":focus"),
            ("focus-visible", ":focus-visible"),
            ("active", ":active"),
            ("disabled", ":disabled"),
        ] {
            registry.register_pseudo_class(name, pseudo);
        }

        registry.register_media("motion-safe", "(prefers-reduced-motion: no-preference)");
        registry.register_media("motion-reduce", "(prefers-reduced-motion: reduce)");
        registry.register_media("dark", "(prefers-color-scheme: dark)");
        registry.register_media("print", "print");

        if let Some(screens) = screens {
            let mut ordered: Vec<(&String, &String)> = screens.iter().collect();
            ordered.sort_by(|(a_name, a_width), (b_name, b_width)| {
                breakpoint_px(a_width)
                    .total_cmp(&breakpoint_px(b_width))
                    .then_with(|| a_name.cmp(b_name))
            });
            for (name, width) in ordered {
                registry.register_media(name, &format!("(min-width: {})", width));
            }
        }

        registry
    }

    pub fn register_pseudo_class(&mut self, name: &str, pseudo: &str) {
        let rank = self.pseudo_count;
        self.pseudo_count += 1;
        self.insert(name, VariantKind::PseudoClass(pseudo.to_string()), rank);
    }

    pub fn register_media(&mut self, name: &str, condition: &str) {
        let rank = MEDIA_RANK_BASE + self.media_count;
        self.media_count += 1;
        self.insert(name, VariantKind::Media(condition.to_string()), rank);
    }

    fn insert(&mut self, name: &str, kind: VariantKind, rank: u32) {
        if self.variants.contains_key(name) {
            tracing::debug!("Variant '{}' re-registered", name);
        }
        self.variants.insert(
            name.to_string(),
            Variant {
                name: name.to_string(),
                kind,
                rank,
            },
        );
    }

    pub fn get(&self, name: &str) -> Option<&Variant> {
        self.variants.get(name)
    }

    pub fn len(&self) -> usize {
        self.variants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }
}

/// Approximate pixel width of a breakpoint, for ordering only
fn breakpoint_px(width: &str) -> f64 {
    let width = width.trim();
    let split = width
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(width.len());
    let (number, unit) = width.split_at(split);
    let number: f64 = number.parse().unwrap_or(f64::MAX);
    match unit {
        "em" | "rem" => number * 16.0,
        _ => number,
    }
}
