//! Placeholder elements: their attribute serialization, element layout and
//! the side table tracking their render state.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use uuid::Uuid;
use vellum_tools::ArtifactKind;

use crate::dom::{Document, Markup, NodeId};
use crate::render::RenderError;

pub const ATTR_ID: &str = "id";
pub const ATTR_KIND: &str = "data-artifact-kind";
pub const ATTR_PAYLOAD: &str = "data-payload";
pub const ATTR_LAST_RENDERED: &str = "data-last-rendered";
pub const ATTR_CLICK_LISTENER: &str = "data-has-click-listener";
pub const ATTR_TOOL_SOURCE: &str = "data-tool-source";

pub const CLASS_ARTIFACT: &str = "tool-artifact";
pub const CLASS_LOADED: &str = "loaded";
pub const CLASS_BODY: &str = "artifact-body";
pub const CLASS_TOOLBAR: &str = "artifact-toolbar";
pub const CLASS_ERROR: &str = "artifact-error";
pub const CLASS_LOADING: &str = "artifact-loading";
pub const CLASS_CONTENT: &str = "artifact-content";
pub const CLASS_BUTTON: &str = "artifact-button";
pub const CLASS_REFRESH: &str = "artifact-refresh";
pub const CLASS_ZOOM: &str = "artifact-zoom";
pub const CLASS_TOOL_CALL: &str = "tool-call";

pub const DEFERRED_MESSAGE: &str = "rendering deferred";

/// Characters `encodeURIComponent` leaves alone.
const PAYLOAD_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

pub fn encode_payload(source: &str) -> String {
    utf8_percent_encode(source, PAYLOAD_ENCODE_SET).to_string()
}

pub fn decode_payload(payload: &str) -> Result<String, RenderError> {
    percent_decode_str(payload)
        .decode_utf8()
        .map(|s| s.into_owned())
        .map_err(|e| RenderError::Payload(e.to_string()))
}

pub fn new_placeholder_id(kind: ArtifactKind) -> String {
    format!("{}-{}", kind.as_str(), Uuid::new_v4())
}

pub fn kind_class(kind: ArtifactKind) -> String {
    format!("{}-artifact", kind.as_str())
}

/// Builds the placeholder element for `source`.
///
/// `body` becomes the content of the `.artifact-body` child. The toolbar is
/// left empty; the interaction binder owns its buttons.
pub fn placeholder_markup(kind: ArtifactKind, id: &str, source: &str, body: Markup) -> Markup {
    Markup::div()
        .id(id)
        .class(CLASS_ARTIFACT)
        .class(kind_class(kind))
        .attr(ATTR_KIND, kind.as_str())
        .attr(ATTR_PAYLOAD, encode_payload(source))
        .child(Markup::div().class(CLASS_BODY).child(body))
        .child(Markup::div().class(CLASS_TOOLBAR))
}

pub fn loading_panel(kind: ArtifactKind, message: &str) -> Markup {
    Markup::div()
        .class(CLASS_LOADING)
        .text(&format!("{}: {message}", kind.label()))
}

/// Wraps rendered output (usually an `<svg>`) for the body slot.
pub fn content_panel(html: &str) -> Markup {
    Markup::div().class(CLASS_CONTENT).html(html)
}

/// Inline error panel. Always carries the original source.
pub fn error_panel(kind: ArtifactKind, error: &RenderError, source: &str) -> Markup {
    Markup::div()
        .class(CLASS_ERROR)
        .attr("data-error-kind", error.kind_name())
        .child(
            Markup::element("p")
                .class("artifact-error-message")
                .text(&format!("{} failed: {error}", kind.label())),
        )
        .child(
            Markup::element("pre")
                .class("artifact-source")
                .text(source),
        )
}

/// Marks a freshly built placeholder as rendered from `source`.
pub fn mark_loaded(markup: Markup, source: &str) -> Markup {
    markup
        .class(CLASS_LOADED)
        .attr(ATTR_LAST_RENDERED, encode_payload(source))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderState {
    Pending,
    Loading,
    Loaded,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Entry {
    state: PlaceholderState,
    last_rendered: Option<String>,
}

/// Render state per placeholder id.
///
/// The placeholder's attributes are the persisted form of this table: ids
/// the table has not seen are hydrated from them, and every transition is
/// written back so the document stays self-describing.
#[derive(Debug, Default)]
pub struct StateTable {
    entries: Mutex<HashMap<String, Entry>>,
}

impl StateTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn hydrate(doc: &Document, node: NodeId) -> Entry {
        let loaded = doc.has_class(node, CLASS_LOADED);
        let failed = doc.first_class(node, CLASS_ERROR).is_some();
        let state = match (loaded, failed) {
            (true, false) => PlaceholderState::Loaded,
            (_, true) => PlaceholderState::Failed,
            _ => PlaceholderState::Pending,
        };
        Entry {
            state,
            last_rendered: doc.attribute(node, ATTR_LAST_RENDERED),
        }
    }

    pub fn state(&self, doc: &Document, id: &str, node: NodeId) -> PlaceholderState {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries
            .entry(id.to_string())
            .or_insert_with(|| Self::hydrate(doc, node))
            .state
    }

    pub fn last_rendered(&self, doc: &Document, id: &str, node: NodeId) -> Option<String> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries
            .entry(id.to_string())
            .or_insert_with(|| Self::hydrate(doc, node))
            .last_rendered
            .clone()
    }

    /// Moves `id` to `Loading` unless it already is. Returns `false` when a
    /// render for it is in flight.
    pub fn try_begin(&self, doc: &Document, id: &str, node: NodeId) -> bool {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let entry = entries
            .entry(id.to_string())
            .or_insert_with(|| Self::hydrate(doc, node));
        if entry.state == PlaceholderState::Loading {
            return false;
        }
        entry.state = PlaceholderState::Loading;
        true
    }

    pub fn mark_loaded(&self, doc: &Document, id: &str, node: NodeId, payload: &str) {
        doc.add_class(node, CLASS_LOADED);
        doc.set_attribute(node, ATTR_LAST_RENDERED, payload);
        self.set(
            id,
            Entry {
                state: PlaceholderState::Loaded,
                last_rendered: Some(payload.to_string()),
            },
        );
    }

    /// Restores the loaded marker of a placeholder whose payload is unchanged.
    pub fn restore_loaded(&self, doc: &Document, id: &str, node: NodeId) {
        doc.add_class(node, CLASS_LOADED);
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let entry = entries
            .entry(id.to_string())
            .or_insert_with(|| Self::hydrate(doc, node));
        entry.state = PlaceholderState::Loaded;
    }

    pub fn mark_failed(&self, doc: &Document, id: &str, node: NodeId) {
        doc.remove_class(node, CLASS_LOADED);
        doc.remove_attribute(node, ATTR_LAST_RENDERED);
        self.set(
            id,
            Entry {
                state: PlaceholderState::Failed,
                last_rendered: None,
            },
        );
    }

    /// Clears loaded and last-rendered so the next sweep renders `id` again.
    pub fn reset(&self, doc: &Document, id: &str, node: NodeId) {
        doc.remove_class(node, CLASS_LOADED);
        doc.remove_attribute(node, ATTR_LAST_RENDERED);
        self.set(
            id,
            Entry {
                state: PlaceholderState::Pending,
                last_rendered: None,
            },
        );
    }

    pub fn forget(&self, id: &str) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id);
    }

    /// Drops entries whose placeholder is no longer in the document.
    pub fn prune(&self, doc: &Document) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.retain(|id, _| doc.find_by_dom_id(id).is_some());
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn set(&self, id: &str, entry: Entry) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.to_string(), entry);
    }
}
