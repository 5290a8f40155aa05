//! Maps candidate class names to style declarations.

use crate::tokens::{TokenTable, DEFAULT_KEY};
use crate::utilities::{Category, Utility, UtilityRegistry, UtilityRule, ValueType};
use crate::variants::{VariantKey, VariantKind, VariantRegistry};
use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

/// A single `property: value` pair
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Declaration {
    pub property: String,
    pub value: String,
}

impl Declaration {
    pub fn new(property: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            value: value.into(),
        }
    }
}

/// A candidate class that maps onto a known utility
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedUtility {
    /// The class as written in the source
    pub class: String,
    /// Escaped class selector with pseudo-classes applied
    pub selector: String,
    /// Media conditions the rule is wrapped in
    pub media: Vec<String>,
    pub declarations: Vec<Declaration>,
    pub category: Category,
    pub variant_key: VariantKey,
}

/// Capability interface for extending the resolver with extra utilities and
/// variants. Plugins only contribute registry data; they run once when the
/// resolver is built.
pub trait Plugin {
    fn name(&self) -> &str;

    fn register_utilities(&self, _utilities: &mut UtilityRegistry) {}

    fn register_variants(&self, _variants: &mut VariantRegistry) {}
}

/// Resolves candidates against a token table and the utility/variant registries
#[derive(Debug, Clone)]
pub struct Resolver {
    tokens: TokenTable,
    utilities: UtilityRegistry,
    variants: VariantRegistry,
}

impl Resolver {
    pub fn new(tokens: TokenTable) -> Self {
        let variants = VariantRegistry::builtin(tokens.namespace("screens"));
        Self {
            tokens,
            utilities: UtilityRegistry::builtin(),
            variants,
        }
    }

    /// Let a plugin add to the registries
    pub fn with_plugin<P: Plugin + ?Sized>(mut self, plugin: &P) -> Self {
        tracing::debug!("Registering plugin '{}'", plugin.name());
        plugin.register_utilities(&mut self.utilities);
        plugin.register_variants(&mut self.variants);
        self
    }

    pub fn tokens(&self) -> &TokenTable {
        &self.tokens
    }

    /// Resolve a candidate. `None` means the candidate is not a utility and is
    /// dropped from the output.
    pub fn resolve(&self, candidate: &str) -> Option<ResolvedUtility> {
        let parts = split_variants(candidate)?;
        let (body, variant_names) = parts.split_last()?;

        let mut pseudo = String::new();
        let mut media: Vec<String> = Vec::new();
        let mut ranks = Vec::with_capacity(variant_names.len());
        for name in variant_names {
            let variant = self.variants.get(name)?;
            ranks.push(variant.rank);
            match &variant.kind {
                VariantKind::PseudoClass(suffix) => pseudo.push_str(suffix),
                VariantKind::Media(condition) => {
                    if !media.contains(condition) {
                        media.push(condition.clone());
                    }
                }
            }
        }

        // A media type such as `print` has to lead the query
        media.sort_by_key(|condition| condition.starts_with('('));

        let (category, declarations) = self.resolve_body(body)?;

        Some(ResolvedUtility {
            class: candidate.to_string(),
            selector: format!(".{}{}", escape_class(candidate), pseudo),
            media,
            declarations,
            category,
            variant_key: VariantKey::from_ranks(ranks),
        })
    }

    fn resolve_body(&self, body: &str) -> Option<(Category, Vec<Declaration>)> {
        if let Some(found) = arbitrary_property(body) {
            return Some(found);
        }

        let (negative, body) = match body.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, body),
        };
        if body.is_empty() {
            return None;
        }

        if !negative {
            if let Some(utility) = self.utilities.static_utility(body) {
                if let UtilityRule::Static { declarations } = &utility.rule {
                    let declarations = declarations
                        .iter()
                        .map(|(property, value)| Declaration::new(property, value))
                        .collect();
                    return Some((utility.category, declarations));
                }
            }
        }

        if let Some((prefix, raw)) = split_arbitrary(body) {
            let value = decode_arbitrary(raw)?;
            return self.utilities.themed(prefix).iter().find_map(|utility| {
                apply_themed(utility, negative, |value_type| value_type.accept(&value))
            });
        }

        // Leftmost split first, so the longest token name wins.
        for (index, _) in body.match_indices('-') {
            let (prefix, value) = (&body[..index], &body[index + 1..]);
            if value.is_empty() || value == DEFAULT_KEY {
                continue;
            }
            let found = self.utilities.themed(prefix).iter().find_map(|utility| {
                apply_themed(utility, negative, |_| self.lookup(utility, value))
            });
            if found.is_some() {
                return found;
            }
        }

        self.utilities.themed(body).iter().find_map(|utility| {
            apply_themed(utility, negative, |_| self.lookup(utility, DEFAULT_KEY))
        })
    }

    fn lookup(&self, utility: &Utility, name: &str) -> Option<String> {
        let UtilityRule::Themed { namespaces, .. } = &utility.rule else {
            return None;
        };
        namespaces
            .iter()
            .find_map(|namespace| self.tokens.get(namespace, name))
            .map(str::to_string)
    }
}

fn apply_themed(
    utility: &Utility,
    negative: bool,
    value_for: impl FnOnce(ValueType) -> Option<String>,
) -> Option<(Category, Vec<Declaration>)> {
    let UtilityRule::Themed {
        properties,
        value_type,
        negatable,
        ..
    } = &utility.rule
    else {
        return None;
    };
    if negative && !negatable {
        return None;
    }
    let mut value = value_for(*value_type)?;
    if negative {
        value = negate(&value);
    }
    let declarations = properties
        .iter()
        .map(|property| Declaration::new(property, value.clone()))
        .collect();
    Some((utility.category, declarations))
}

fn negate(value: &str) -> String {
    match value.strip_prefix('-') {
        Some(positive) => positive.to_string(),
        None if value.starts_with("var(") || value.starts_with("calc(") => {
            format!("calc({} * -1)", value)
        }
        None => format!("-{}", value),
    }
}

/// Split on `:` outside of brackets. Empty parts make the candidate invalid.
fn split_variants(candidate: &str) -> Option<Vec<&str>> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (index, ch) in candidate.char_indices() {
        match ch {
            '[' => depth += 1,
            ']' => depth = depth.checked_sub(1)?,
            ':' if depth == 0 => {
                parts.push(&candidate[start..index]);
                start = index + 1;
            }
            _ => {}
        }
    }
    parts.push(&candidate[start..]);
    if depth != 0 || parts.iter().any(|part| part.is_empty()) {
        return None;
    }
    Some(parts)
}

/// `prefix-[value]` into `(prefix, value)`
fn split_arbitrary(body: &str) -> Option<(&str, &str)> {
    if !body.ends_with(']') {
        return None;
    }
    let open = body.find("-[")?;
    let prefix = &body[..open];
    let raw = &body[open + 2..body.len() - 1];
    if prefix.is_empty() {
        return None;
    }
    Some((prefix, raw))
}

/// Underscores stand for spaces; `\_` keeps a literal underscore. Values that
/// could break out of a declaration are refused.
fn decode_arbitrary(raw: &str) -> Option<String> {
    if raw.is_empty() || raw.contains(['{', '}', ';']) {
        return None;
    }
    let mut decoded = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' if chars.peek() == Some(&'_') => {
                decoded.push('_');
                chars.next();
            }
            '_' => decoded.push(' '),
            other => decoded.push(other),
        }
    }
    Some(decoded)
}

/// `[property:value]`
fn arbitrary_property(body: &str) -> Option<(Category, Vec<Declaration>)> {
    static PROPERTY: OnceLock<Regex> = OnceLock::new();
    let inner = body.strip_prefix('[')?.strip_suffix(']')?;
    let (property, raw) = inner.split_once(':')?;
    let pattern = PROPERTY
        .get_or_init(|| Regex::new(r"^-?[a-z][a-z-]*$").expect("property pattern is valid"));
    if !pattern.is_match(property) {
        return None;
    }
    let value = decode_arbitrary(raw)?;
    Some((Category::Arbitrary, vec![Declaration::new(property, value)]))
}

/// Escape a class name for use in a CSS selector
pub fn escape_class(class: &str) -> String {
    let mut escaped = String::with_capacity(class.len() + 8);
    for (index, ch) in class.chars().enumerate() {
        let leading_digit = ch.is_ascii_digit()
            && (index == 0 || (index == 1 && class.starts_with('-')));
        if leading_digit {
            escaped.push_str(&format!("\\{:x} ", ch as u32));
        } else if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' || !ch.is_ascii() {
            escaped.push(ch);
        } else {
            escaped.push('\\');
            escaped.push(ch);
        }
    }
    escaped
}
