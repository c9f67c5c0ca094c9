//! Rendered style and geometry as reported by the render context.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum PseudoElement {
    #[serde(rename = "::first-letter")]
    FirstLetter,
    #[serde(rename = "::before")]
    Before,
    #[serde(rename = "::after")]
    After,
}

impl PseudoElement {
    pub const FONT_SAMPLED: [PseudoElement; 3] = [
        PseudoElement::FirstLetter,
        PseudoElement::Before,
        PseudoElement::After,
    ];
}

/// Resolved values of the properties the capture pass reads.
///
/// Lookups behave like `CSSStyleDeclaration.getPropertyValue`: unknown properties read as
/// the empty string.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComputedStyle {
    properties: HashMap<String, String>,
}

impl ComputedStyle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: &str) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: &str, value: &str) {
        self.properties.insert(name.to_string(), value.to_string());
    }

    pub fn property(&self, name: &str) -> &str {
        self.properties
            .get(name)
            .map(String::as_str)
            .unwrap_or_default()
    }
}

impl<'a> FromIterator<(&'a str, &'a str)> for ComputedStyle {
    fn from_iter<T: IntoIterator<Item = (&'a str, &'a str)>>(iter: T) -> Self {
        let mut style = ComputedStyle::new();
        for (name, value) in iter {
            style.set(name, value);
        }
        style
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn sized(width: f64, height: f64) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width,
            height,
        }
    }

    pub fn is_empty(&self) -> bool {
        let zero = |value: f64| value == 0.0 || value.is_nan();
        zero(self.width) && zero(self.height)
    }
}
