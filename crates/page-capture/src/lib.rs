//! Page-state extraction for PageFreeze.
//!
//! A capture pass walks a rendered [`page_dom::Document`], records runtime state that markup
//! does not carry (canvas pixels, video frames, form values, shadow trees, used fonts,
//! runtime-edited stylesheets) into a [`PageCaptureResult`], and annotates the document with
//! `data-pagefreeze-*` attributes joining elements to those side-tables. [`post_process`]
//! removes every annotation again.

pub mod collector;
pub mod context;
pub mod errors;
pub mod font;
pub mod live;
pub mod markers;
pub mod model;
pub mod options;
pub mod ports;
pub mod processor;
pub mod style;
pub mod stylesheets;
pub mod visibility;
pub mod walker;

pub use collector::{collect_resources, ElementKind, ElementScope};
pub use context::CaptureContext;
pub use errors::CaptureError;
pub use font::{font_weight, normalize_font_family, remove_quotes};
pub use live::{LivePage, SnapshotRender, LIVE_TREE_SCRIPT};
pub use markers::{MarkedElements, Marker, UI_ELEMENT_CLASS};
pub use model::{
    CanvasData, FontFaceData, ImageData, ImportData, PageCaptureResult, ShadowRootInfo,
    UsedFont, EMPTY_IMAGE_DATA_URI,
};
pub use options::{CaptureOptions, LoadedFont};
pub use ports::{
    AnyShadowRoot, FontFaceSource, NoFontFaces, OpenShadowRootOnly, RenderPort, ShadowAccessor,
};
pub use processor::{disable_meta_refresh, post_process, pre_process, CaptureEnv};
pub use style::{ComputedStyle, PseudoElement, Rect};
pub use stylesheets::{count_rules, extract_stylesheets};
pub use visibility::is_hidden;
pub use walker::{Walker, KEPT_TAG_NAMES};
