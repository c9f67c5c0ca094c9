use crate::style::{ComputedStyle, Rect};

/// Effective invisibility of an element.
///
/// `display: none` is hidden unconditionally. `opacity: 0` and `visibility: hidden` only
/// count when the element also has an empty bounding box; an invisible element that still
/// takes layout space stays visible. Geometry is only requested in that second case.
pub fn is_hidden<F>(style: Option<&ComputedStyle>, bounds: F) -> bool
where
    F: FnOnce() -> Option<Rect>,
{
    let Some(style) = style else {
        return false;
    };
    if style.property("display") == "none" {
        return true;
    }
    if style.property("opacity") == "0" || style.property("visibility") == "hidden" {
        return bounds().map(|rect| rect.is_empty()).unwrap_or(false);
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn style(pairs: &[(&str, &str)]) -> ComputedStyle {
        pairs.iter().copied().collect()
    }

    #[test]
    fn display_none_ignores_geometry() {
        let style = style(&[("display", "none")]);
        assert!(is_hidden(Some(&style), || panic!("geometry must not be read")));
    }

    #[test]
    fn transparent_element_with_layout_stays_visible() {
        let style = style(&[("display", "block"), ("opacity", "0")]);
        assert!(!is_hidden(Some(&style), || Some(Rect::sized(10.0, 0.0))));
        assert!(is_hidden(Some(&style), || Some(Rect::sized(0.0, 0.0))));
    }

    #[test]
    fn visibility_hidden_needs_empty_box() {
        let style = style(&[("visibility", "hidden")]);
        assert!(!is_hidden(Some(&style), || Some(Rect::sized(3.0, 4.0))));
        assert!(is_hidden(Some(&style), || Some(Rect::default())));
        assert!(!is_hidden(Some(&style), || None));
    }

    #[test]
    fn missing_style_is_visible() {
        assert!(!is_hidden(None, || Some(Rect::default())));
    }
}
