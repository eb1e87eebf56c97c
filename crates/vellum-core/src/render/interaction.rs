//! Refresh, zoom and click-to-expand affordances for rendered artifacts.
//!
//! Binding is idempotent: listeners are keyed, buttons are looked up before
//! they are created, and affordances that no longer apply are removed.

use std::sync::{Arc, Weak};

use tracing::debug;

use super::RenderEngine;
use crate::dom::{ClickEvent, Document, Markup, NodeId};
use crate::events::OutboundEvent;
use crate::placeholder::{
    ATTR_CLICK_LISTENER, ATTR_PAYLOAD, CLASS_BUTTON, CLASS_CONTENT, CLASS_ERROR, CLASS_REFRESH,
    CLASS_TOOLBAR, CLASS_ZOOM, PlaceholderState, decode_payload,
};

pub const REFRESH_LISTENER: &str = "refresh";
pub const ZOOM_LISTENER: &str = "zoom";
pub const EXPAND_LISTENER: &str = "expand";

fn button(class: &str, title: &str) -> Markup {
    Markup::element("button")
        .class(CLASS_BUTTON)
        .class(class)
        .attr("type", "button")
        .attr("title", title)
        .text(title)
}

/// Keeps exactly one `class` button in `toolbar`, creating it if needed.
fn ensure_single_button(doc: &Document, toolbar: NodeId, class: &str, title: &str) -> Option<NodeId> {
    let mut existing = doc.query_class(toolbar, class).into_iter();
    let keep = match existing.next() {
        Some(node) => node,
        None => doc.append_markup(toolbar, &button(class, title))?,
    };
    for extra in existing {
        doc.remove(extra);
    }
    Some(keep)
}

fn remove_buttons(doc: &Document, toolbar: NodeId, class: &str) {
    for node in doc.query_class(toolbar, class) {
        doc.remove(node);
    }
}

fn open_viewer_event(doc: &Document, placeholder: NodeId) -> Option<OutboundEvent> {
    let content = doc.first_class(placeholder, CLASS_CONTENT)?;
    let payload = doc.attribute(placeholder, ATTR_PAYLOAD).unwrap_or_default();
    Some(OutboundEvent::OpenViewer {
        rendered_markup: doc.inner_html(content).unwrap_or_default(),
        raw_source: decode_payload(&payload).unwrap_or(payload),
    })
}

pub fn bind_interactions(engine: &Arc<RenderEngine>, container: NodeId) {
    let doc = engine.document();
    for (node, id) in engine.placeholders(container) {
        let toolbar = match doc.first_class(node, CLASS_TOOLBAR) {
            Some(toolbar) => Some(toolbar),
            None => doc.append_markup(node, &Markup::div().class(CLASS_TOOLBAR)),
        };
        let Some(toolbar) = toolbar else {
            continue;
        };

        if let Some(refresh) = ensure_single_button(doc, toolbar, CLASS_REFRESH, "Refresh") {
            let weak: Weak<RenderEngine> = Arc::downgrade(engine);
            let dom_id = id.clone();
            doc.add_listener(
                refresh,
                REFRESH_LISTENER,
                Arc::new(move |_: &ClickEvent| {
                    let Some(engine) = weak.upgrade() else {
                        return;
                    };
                    debug!(target: "render::interaction", id = %dom_id, "Refresh requested");
                    let task = engine.clone().refresh(container, dom_id.clone());
                    engine.spawn(async move {
                        task.await;
                    });
                }),
            );
        }

        let healthy = engine.states().state(doc, &id, node) == PlaceholderState::Loaded
            && doc.first_class(node, CLASS_ERROR).is_none();

        if healthy {
            if let Some(zoom) = ensure_single_button(doc, toolbar, CLASS_ZOOM, "Zoom") {
                let events = engine.events().clone();
                let handle = doc.clone();
                doc.add_listener(
                    zoom,
                    ZOOM_LISTENER,
                    Arc::new(move |_: &ClickEvent| {
                        if let Some(event) = open_viewer_event(&handle, node) {
                            events.emit(event);
                        }
                    }),
                );
            }

            let events = engine.events().clone();
            let handle = doc.clone();
            doc.add_listener(
                node,
                EXPAND_LISTENER,
                Arc::new(move |click: &ClickEvent| {
                    // Toolbar buttons bubble through here and handle themselves.
                    if handle.closest_class(click.target, CLASS_BUTTON).is_some() {
                        return;
                    }
                    if let Some(event) = open_viewer_event(&handle, node) {
                        events.emit(event);
                    }
                }),
            );
            doc.set_attribute(node, ATTR_CLICK_LISTENER, "true");
        } else {
            remove_buttons(doc, toolbar, CLASS_ZOOM);
            doc.remove_listener(node, EXPAND_LISTENER);
            doc.remove_attribute(node, ATTR_CLICK_LISTENER);
        }
    }
}
