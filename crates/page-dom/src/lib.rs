//! Arena DOM used by the PageFreeze capture engine.
//!
//! The tree mirrors a rendered page: besides markup it keeps the runtime properties a
//! browser exposes (form values, `currentSrc`, script `async`, shadow roots, HTML imports)
//! so the capture pass can read them and annotate the tree in place.

pub mod document;
pub mod errors;
pub mod node;
pub mod parse;
pub mod serialize;

pub use document::Document;
pub use errors::DomError;
pub use node::{
    Attribute, Doctype, ElementData, ElementProps, Namespace, NodeData, NodeId, ShadowRootData,
    ShadowRootMode,
};
pub use parse::parse_html;
pub use serialize::{document_html, inner_html, outer_html, serialize_document};
