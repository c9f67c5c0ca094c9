use serde::{Deserialize, Serialize};

use crate::font::normalize_font_family;

/// A font face the page finished loading; restricts which used fonts are reported.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadedFont {
    pub family: String,
    pub style: String,
}

/// Policies applied by a capture pass.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CaptureOptions {
    pub remove_hidden_elements: bool,
    pub remove_unused_fonts: bool,
    pub compress_html: bool,
    pub load_deferred_images: bool,
    pub auto_save_external_save: bool,
    pub move_styles_in_head: bool,
    /// Allow-list for used fonts. `None` reports every font; `Some(vec![])` reports none.
    pub loaded_fonts: Option<Vec<LoadedFont>>,
}

impl CaptureOptions {
    /// Whether the walker needs computed styles at all.
    pub fn samples_style(&self) -> bool {
        self.remove_hidden_elements || self.remove_unused_fonts || self.compress_html
    }

    /// Whether a live snapshot must carry computed styles and boxes. Movable `<style>`
    /// detection reads them even when the walker does not.
    pub fn needs_render_styles(&self) -> bool {
        self.samples_style() || self.move_styles_in_head
    }

    /// `family` must already be normalized; `style` is compared verbatim.
    pub fn allows_font(&self, family: &str, style: &str) -> bool {
        match &self.loaded_fonts {
            None => true,
            Some(fonts) => fonts
                .iter()
                .any(|font| normalize_font_family(&font.family) == family && font.style == style),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allow_list_matches_normalized_family_and_exact_style() {
        let options = CaptureOptions {
            loaded_fonts: Some(vec![LoadedFont {
                family: "\"Open Sans\"".into(),
                style: "italic".into(),
            }]),
            ..CaptureOptions::default()
        };
        assert!(options.allows_font("open sans", "italic"));
        assert!(!options.allows_font("open sans", "normal"));
        assert!(CaptureOptions::default().allows_font("anything", "normal"));

        let empty = CaptureOptions {
            loaded_fonts: Some(Vec::new()),
            ..CaptureOptions::default()
        };
        assert!(!empty.allows_font("arial", "normal"));
    }

    #[test]
    fn deserializes_camel_case_with_defaults() {
        let options: CaptureOptions =
            serde_json::from_str(r#"{"removeHiddenElements":true,"compressHtml":true}"#).unwrap();
        assert!(options.remove_hidden_elements);
        assert!(options.compress_html);
        assert!(options.samples_style());
        assert_eq!(options.loaded_fonts, None);
    }

    #[test]
    fn moving_styles_needs_render_styles_only() {
        let options = CaptureOptions {
            move_styles_in_head: true,
            ..CaptureOptions::default()
        };
        assert!(!options.samples_style());
        assert!(options.needs_render_styles());
        assert!(!CaptureOptions::default().needs_render_styles());
    }
}
