//! Capabilities the capture pass needs from the rendering environment.
//!
//! The walker never probes the environment itself: everything that only a rendering engine
//! knows (computed style, geometry, pixels, parsed stylesheets, shadow roots) arrives
//! through these ports.

use page_dom::{Document, NodeId, ShadowRootMode};

use crate::errors::CaptureError;
use crate::model::FontFaceData;
use crate::style::{ComputedStyle, PseudoElement, Rect};

/// Read access to the rendered state of a document.
pub trait RenderPort {
    /// `getComputedStyle(element, pseudo)`; `None` when the element is not rendered.
    fn computed_style(&self, node: NodeId, pseudo: Option<PseudoElement>) -> Option<ComputedStyle>;

    /// `getBoundingClientRect()`; `None` when geometry is unavailable.
    fn bounding_rect(&self, node: NodeId) -> Option<Rect>;

    /// `clientWidth` / `clientHeight`.
    fn client_size(&self, node: NodeId) -> (u32, u32);

    /// PNG data URI of a canvas' current pixels.
    fn canvas_data_uri(&self, node: NodeId) -> Result<String, CaptureError>;

    /// PNG data URI of the current frame of a video drawn at `width` x `height`.
    fn video_frame_data_uri(
        &self,
        node: NodeId,
        width: u32,
        height: u32,
    ) -> Result<String, CaptureError>;

    /// `cssText` of every rule of the live sheet owned by a `<style>` element.
    fn stylesheet_rules(&self, node: NodeId) -> Result<Vec<String>, CaptureError>;
}

/// Resolves the shadow root attached to a host element.
pub trait ShadowAccessor {
    fn shadow_root(&self, doc: &Document, host: NodeId) -> Option<NodeId>;
}

/// Reaches open and closed shadow roots alike (`openOrClosedShadowRoot`).
#[derive(Clone, Copy, Debug, Default)]
pub struct AnyShadowRoot;

impl ShadowAccessor for AnyShadowRoot {
    fn shadow_root(&self, doc: &Document, host: NodeId) -> Option<NodeId> {
        doc.shadow_root_of(host)
    }
}

/// Only what `element.shadowRoot` exposes to page scripts.
#[derive(Clone, Copy, Debug, Default)]
pub struct OpenShadowRootOnly;

impl ShadowAccessor for OpenShadowRootOnly {
    fn shadow_root(&self, doc: &Document, host: NodeId) -> Option<NodeId> {
        let shadow = doc.shadow_root_of(host)?;
        match doc.shadow_data(shadow)?.mode {
            ShadowRootMode::Open => Some(shadow),
            ShadowRootMode::Closed => None,
        }
    }
}

/// Font faces declared by the page (`document.fonts`).
pub trait FontFaceSource {
    fn font_faces(&self) -> Vec<FontFaceData>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NoFontFaces;

impl FontFaceSource for NoFontFaces {
    fn font_faces(&self) -> Vec<FontFaceData> {
        Vec::new()
    }
}
