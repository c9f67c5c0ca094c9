//! Bridge between a page rendered in a browser and the capture pass.
//!
//! [`LIVE_TREE_SCRIPT`] runs inside the page and returns a [`LiveSnapshot`];
//! [`LivePage::from_json`] turns it into a document plus a render context.

mod snapshot;
mod wire;

pub use snapshot::{LivePage, SnapshotRender};
pub use wire::{
    LiveAttribute, LiveCharacterData, LiveDoctype, LiveElement, LiveNode, LiveShadowRoot,
    LiveSnapshot,
};

/// Function expression taking an options object (`{ sampleStyles }`) and returning the
/// snapshot of the current document.
pub const LIVE_TREE_SCRIPT: &str = include_str!("live_tree.js");
