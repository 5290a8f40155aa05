//! Deterministic stylesheet generation.
//!
//! Rules are deduplicated and sorted by `(layer, variant key, category,
//! selector)`, so the output only depends on the set of resolved utilities and
//! never on the order files were scanned in.

use crate::resolver::{Declaration, ResolvedUtility};
use crate::tokens::TokenTable;
use crate::utilities::Category;
use crate::variants::VariantKey;
use std::collections::BTreeMap;
use std::fmt::Write;

/// Cascade layer; base rules always precede utilities
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Layer {
    Base,
    Utilities,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct RuleKey {
    layer: Layer,
    variants: VariantKey,
    category: Category,
    selector: String,
    media: Vec<String>,
}

/// One emitted rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub layer: Layer,
    pub selector: String,
    pub media: Vec<String>,
    pub declarations: Vec<Declaration>,
}

/// Rendering switches
#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    pub minify: bool,
    /// Prepend a "generated by" comment
    pub header: bool,
}

/// Ordered, deduplicated rules ready to render
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stylesheet {
    rules: BTreeMap<RuleKey, Rule>,
}

/// Build a stylesheet from resolved utilities
pub fn generate(resolved: impl IntoIterator<Item = ResolvedUtility>) -> Stylesheet {
    let mut sheet = Stylesheet::default();
    for utility in resolved {
        let key = RuleKey {
            layer: Layer::Utilities,
            variants: utility.variant_key,
            category: utility.category,
            selector: utility.selector.clone(),
            media: utility.media.clone(),
        };
        sheet.rules.entry(key).or_insert(Rule {
            layer: Layer::Utilities,
            selector: utility.selector,
            media: utility.media,
            declarations: utility.declarations,
        });
    }
    sheet
}

impl Stylesheet {
    /// Add the base reset layer
    pub fn with_preflight(mut self, tokens: &TokenTable) -> Self {
        for rule in preflight(tokens) {
            let key = RuleKey {
                layer: Layer::Base,
                variants: VariantKey::default(),
                category: Category::Layout,
                selector: rule.selector.clone(),
                media: Vec::new(),
            };
            self.rules.insert(key, rule);
        }
        self
    }

    pub fn rules(&self) -> impl Iterator<Item = &Rule> {
        self.rules.values()
    }

    /// Number of utility rules, excluding the base layer
    pub fn utility_count(&self) -> usize {
        self.rules().filter(|r| r.layer == Layer::Utilities).count()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn render(&self, options: &RenderOptions) -> String {
        let mut out = String::new();
        if options.header {
            out.push_str(&header());
            if !options.minify {
                out.push('\n');
            }
        }

        let rules: Vec<&Rule> = self.rules().collect();
        let mut index = 0;
        let mut first_block = true;
        while index < rules.len() {
            let media = &rules[index].media;
            let end = rules[index..]
                .iter()
                .position(|rule| &rule.media != media)
                .map_or(rules.len(), |offset| index + offset);

            if !options.minify && (!first_block || options.header) {
                out.push('\n');
            }
            first_block = false;

            if media.is_empty() {
                for (n, rule) in rules[index..end].iter().enumerate() {
                    if n > 0 && !options.minify {
                        out.push('\n');
                    }
                    write_rule(&mut out, rule, "", options.minify);
                }
            } else if options.minify {
                let _ = write!(out, "@media {}{{", media.join(" and "));
                for rule in &rules[index..end] {
                    write_rule(&mut out, rule, "", true);
                }
                out.push('}');
            } else {
                let _ = writeln!(out, "@media {} {{", media.join(" and "));
                for rule in &rules[index..end] {
                    write_rule(&mut out, rule, "  ", false);
                }
                out.push_str("}\n");
            }

            index = end;
        }

        out
    }
}

fn header() -> String {
    format!("/* Generated by tailwind-generator v{} */", env!("CARGO_PKG_VERSION"))
}

fn write_rule(out: &mut String, rule: &Rule, indent: &str, minify: bool) {
    if minify {
        out.push_str(&rule.selector);
        out.push('{');
        let body: Vec<String> = rule
            .declarations
            .iter()
            .map(|d| format!("{}:{}", d.property, d.value))
            .collect();
        out.push_str(&body.join(";"));
        out.push('}');
    } else {
        let _ = writeln!(out, "{}{} {{", indent, rule.selector);
        for declaration in &rule.declarations {
            let _ = writeln!(out, "{}  {}: {};", indent, declaration.property, declaration.value);
        }
        let _ = writeln!(out, "{}}}", indent);
    }
}

/// Minimal reset emitted ahead of the utilities
fn preflight(tokens: &TokenTable) -> Vec<Rule> {
    let font = tokens
        .get("fontFamily", "sans")
        .unwrap_or("ui-sans-serif, system-ui, sans-serif");

    let base = |selector: &str, declarations: &[(&str, &str)]| Rule {
        layer: Layer::Base,
        selector: selector.to_string(),
        media: Vec::new(),
        declarations: declarations
            .iter()
            .map(|(property, value)| Declaration::new(*property, *value))
            .collect(),
    };

    vec![
        base(
            "*, ::before, ::after",
            &[
                ("box-sizing", "border-box"),
                ("border-width", "0"),
                ("border-style", "solid"),
                ("border-color", "currentColor"),
            ],
        ),
        base(
            "html",
            &[
                ("line-height", "1.5"),
                ("-webkit-text-size-adjust", "100%"),
                ("font-family", font),
            ],
        ),
        base("body", &[("margin", "0"), ("line-height", "inherit")]),
        base(
            "h1, h2, h3, h4, h5, h6",
            &[("font-size", "inherit"), ("font-weight", "inherit")],
        ),
        base("a", &[("color", "inherit"), ("text-decoration", "inherit")]),
        base(
            "img, svg, video",
            &[("display", "block"), ("max-width", "100%"), ("height", "auto")],
        ),
    ]
}
