//! Registry of known utility kinds.
//!
//! Utilities are plain data: either a fixed class name with fixed
//! declarations, or a prefix whose value is looked up in one or more token
//! namespaces (or given as an arbitrary `[...]` value).

use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Declaration category, the second component of rule ordering
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Category {
    Layout,
    Position,
    Spacing,
    Sizing,
    Typography,
    Background,
    Border,
    Effects,
    Arbitrary,
}

/// What an arbitrary value must look like for a themed utility to accept it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Color,
    Length,
    Number,
    Any,
}

impl ValueType {
    fn hint(self) -> &'static str {
        match self {
            ValueType::Color => "color",
            ValueType::Length => "length",
            ValueType::Number => "number",
            ValueType::Any => "any",
        }
    }

    /// Check an arbitrary value, honouring an explicit `type:` hint
    pub fn accept(self, raw: &str) -> Option<String> {
        let value = match raw.split_once(':') {
            Some((hint, rest)) if is_type_hint(hint) => {
                if hint != self.hint() {
                    return None;
                }
                rest
            }
            _ => raw,
        };
        if value.is_empty() {
            return None;
        }
        let matches = match self {
            ValueType::Color => {
                patterns().color.is_match(value) || patterns().function.is_match(value)
            }
            ValueType::Length => {
                patterns().length.is_match(value) || patterns().function.is_match(value)
            }
            ValueType::Number => {
                patterns().number.is_match(value) || patterns().function.is_match(value)
            }
            ValueType::Any => true,
        };
        matches.then(|| value.to_string())
    }
}

fn is_type_hint(hint: &str) -> bool {
    matches!(hint, "color" | "length" | "number" | "any")
}

struct ValuePatterns {
    color: Regex,
    length: Regex,
    number: Regex,
    function: Regex,
}

fn patterns() -> &'static ValuePatterns {
    static PATTERNS: OnceLock<ValuePatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| ValuePatterns {
        color: Regex::new(
            r"^(#([0-9a-fA-F]{3,4}|[0-9a-fA-F]{6}|[0-9a-fA-F]{8})|(rgba?|hsla?|hwb|lab|lch|oklab|oklch|color)\(.+\)|transparent|currentColor)$",
        )
        .expect("color pattern is valid"),
        length: Regex::new(
            r"^(-?(\d+\.?\d*|\.\d+)(px|rem|em|%|vh|vw|vmin|vmax|svh|lvh|dvh|ch|ex|fr|pt|pc|cm|mm|in)|0)$",
        )
        .expect("length pattern is valid"),
        number: Regex::new(r"^-?(\d+\.?\d*|\.\d+)$").expect("number pattern is valid"),
        function: Regex::new(r"^(var|calc|min|max|clamp)\(.+\)$").expect("function pattern is valid"),
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UtilityRule {
    /// A complete class name with fixed declarations
    Static { declarations: Vec<(String, String)> },
    /// `prefix-<token>` or `prefix-[<arbitrary>]`
    Themed {
        namespaces: Vec<String>,
        properties: Vec<String>,
        value_type: ValueType,
        negatable: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Utility {
    pub rule: UtilityRule,
    pub category: Category,
}

/// Known utilities, keyed by full name (static) or prefix (themed)
#[derive(Debug, Clone, Default)]
pub struct UtilityRegistry {
    statics: HashMap<String, Utility>,
    themed: HashMap<String, Vec<Utility>>,
}

impl UtilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_static(&mut self, name: &str, category: Category, declarations: &[(&str, &str)]) {
        let declarations = declarations
            .iter()
            .map(|(property, value)| (property.to_string(), value.to_string()))
            .collect();
        self.statics.insert(
            name.to_string(),
            Utility {
                rule: UtilityRule::Static { declarations },
                category,
            },
        );
    }

    /// Register a themed utility. Several kinds may share a prefix; they are
    /// tried in registration order.
    pub fn register_themed(
        &mut self,
        prefix: &str,
        category: Category,
        namespaces: &[&str],
        properties: &[&str],
        value_type: ValueType,
        negatable: bool,
    ) {
        self.themed.entry(prefix.to_string()).or_default().push(Utility {
            rule: UtilityRule::Themed {
                namespaces: namespaces.iter().map(|s| s.to_string()).collect(),
                properties: properties.iter().map(|s| s.to_string()).collect(),
                value_type,
                negatable,
            },
            category,
        });
    }

    pub fn static_utility(&self, name: &str) -> Option<&Utility> {
        self.statics.get(name)
    }

    pub fn themed(&self, prefix: &str) -> &[Utility] {
        self.themed.get(prefix).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.statics.len() + self.themed.values().map(Vec::len).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The built-in utilities
    pub fn builtin() -> Self {
        use Category::*;
        use ValueType::*;

        let mut registry = Self::new();

        for (name, display) in [
            ("block", "block"),
            ("inline-block", "inline-block"),
            ("inline", "inline"),
            ("flex", "flex"),
            ("inline-flex", "inline-flex"),
            ("grid", "grid"),
            ("inline-grid", "inline-grid"),
            ("contents", "contents"),
            ("hidden", "none"),
        ] {
            registry.register_static(name, Layout, &[("display", display)]);
        }
        for (name, property, value) in [
            ("flex-row", "flex-direction", "row"),
            ("flex-col", "flex-direction", "column"),
            ("flex-wrap", "flex-wrap", "wrap"),
            ("flex-nowrap", "flex-wrap", "nowrap"),
            ("items-start", "align-items", "flex-start"),
            ("items-center", "align-items", "center"),
            ("items-end", "align-items", "flex-end"),
            ("items-baseline", "align-items", "baseline"),
            ("items-stretch", "align-items", "stretch"),
            ("justify-start", "justify-content", "flex-start"),
            ("justify-center", "justify-content", "center"),
            ("justify-end", "justify-content", "flex-end"),
            ("justify-between", "justify-content", "space-between"),
            ("justify-around", "justify-content", "space-around"),
            ("justify-evenly", "justify-content", "space-evenly"),
            ("overflow-auto", "overflow", "auto"),
            ("overflow-hidden", "overflow", "hidden"),
            ("overflow-scroll", "overflow", "scroll"),
            ("overflow-visible", "overflow", "visible"),
        ] {
            registry.register_static(name, Layout, &[(property, value)]);
        }
        for position in ["static", "fixed", "absolute", "relative", "sticky"] {
            registry.register_static(position, Position, &[("position", position)]);
        }
        for (name, property, value) in [
            ("italic", "font-style", "italic"),
            ("not-italic", "font-style", "normal"),
            ("underline", "text-decoration-line", "underline"),
            ("line-through", "text-decoration-line", "line-through"),
            ("no-underline", "text-decoration-line", "none"),
            ("uppercase", "text-transform", "uppercase"),
            ("lowercase", "text-transform", "lowercase"),
            ("capitalize", "text-transform", "capitalize"),
            ("text-left", "text-align", "left"),
            ("text-center", "text-align", "center"),
            ("text-right", "text-align", "right"),
            ("text-justify", "text-align", "justify"),
        ] {
            registry.register_static(name, Typography, &[(property, value)]);
        }
        registry.register_static(
            "truncate",
            Typography,
            &[
                ("overflow", "hidden"),
                ("text-overflow", "ellipsis"),
                ("white-space", "nowrap"),
            ],
        );
        for style in ["solid", "dashed", "dotted", "double", "none"] {
            registry.register_static(&format!("border-{}", style), Border, &[("border-style", style)]);
        }
        registry.register_static("cursor-pointer", Effects, &[("cursor", "pointer")]);

        for (prefix, properties) in [
            ("inset", &["inset"][..]),
            ("top", &["top"][..]),
            ("right", &["right"][..]),
            ("bottom", &["bottom"][..]),
            ("left", &["left"][..]),
        ] {
            registry.register_themed(prefix, Position, &["spacing"], properties, Length, true);
        }
        registry.register_themed("z", Position, &["zIndex"], &["z-index"], Number, true);

        for (prefix, properties) in [
            ("p", &["padding"][..]),
            ("px", &["padding-left", "padding-right"][..]),
            ("py", &["padding-top", "padding-bottom"][..]),
            ("pt", &["padding-top"][..]),
            ("pr", &["padding-right"][..]),
            ("pb", &["padding-bottom"][..]),
            ("pl", &["padding-left"][..]),
        ] {
            registry.register_themed(prefix, Spacing, &["spacing"], properties, Length, false);
        }
        for (prefix, properties) in [
            ("m", &["margin"][..]),
            ("mx", &["margin-left", "margin-right"][..]),
            ("my", &["margin-top", "margin-bottom"][..]),
            ("mt", &["margin-top"][..]),
            ("mr", &["margin-right"][..]),
            ("mb", &["margin-bottom"][..]),
            ("ml", &["margin-left"][..]),
        ] {
            registry.register_themed(prefix, Spacing, &["spacing"], properties, Length, true);
        }
        registry.register_themed("gap", Spacing, &["spacing"], &["gap"], Length, false);
        registry.register_themed("gap-x", Spacing, &["spacing"], &["column-gap"], Length, false);
        registry.register_themed("gap-y", Spacing, &["spacing"], &["row-gap"], Length, false);

        registry.register_themed("w", Sizing, &["width", "spacing"], &["width"], Length, false);
        registry.register_themed("h", Sizing, &["height", "spacing"], &["height"], Length, false);

        registry.register_themed("text", Typography, &["colors"], &["color"], Color, false);
        registry.register_themed("text", Typography, &["fontSize"], &["font-size"], Length, false);
        registry.register_themed("font", Typography, &["fontWeight"], &["font-weight"], Number, false);
        registry.register_themed("font", Typography, &["fontFamily"], &["font-family"], Any, false);

        registry.register_themed("bg", Background, &["colors"], &["background-color"], Color, false);

        registry.register_themed("border", Border, &["borderWidth"], &["border-width"], Length, false);
        registry.register_themed("border", Border, &["colors"], &["border-color"], Color, false);
        for (prefix, property) in [
            ("border-t", "border-top-width"),
            ("border-r", "border-right-width"),
            ("border-b", "border-bottom-width"),
            ("border-l", "border-left-width"),
        ] {
            registry.register_themed(prefix, Border, &["borderWidth"], &[property], Length, false);
        }
        registry.register_themed("rounded", Border, &["borderRadius"], &["border-radius"], Length, false);

        registry.register_themed("opacity", Effects, &["opacity"], &["opacity"], Number, false);

        registry
    }
}
