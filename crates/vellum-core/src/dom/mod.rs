//! In-memory document tree shared by handlers, render engines and the
//! interaction binder.
//!
//! The tree lives behind a [`std::sync::Mutex`]. Every operation takes the
//! lock for the duration of one synchronous mutation only; click listeners
//! run after it has been released, so a listener may freely mutate the
//! document or spawn work that does.

mod markup;

pub use markup::Markup;

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use markup::{write_close_tag, write_open_tag};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClickEvent {
    /// Node the click originated on.
    pub target: NodeId,
    /// Node whose listener is being invoked.
    pub current: NodeId,
}

pub type Listener = Arc<dyn Fn(&ClickEvent) + Send + Sync>;

struct Element {
    tag: String,
    attributes: Vec<(String, String)>,
    classes: Vec<String>,
    html: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    listeners: Vec<(String, Listener)>,
}

impl Element {
    fn new(tag: impl Into<String>, parent: Option<NodeId>) -> Self {
        Self {
            tag: tag.into(),
            attributes: Vec::new(),
            classes: Vec::new(),
            html: String::new(),
            parent,
            children: Vec::new(),
            listeners: Vec::new(),
        }
    }

    fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Read-only view of one element, handed to [`Document::query`] predicates.
pub struct ElementView<'a> {
    element: &'a Element,
}

impl ElementView<'_> {
    pub fn tag(&self) -> &str {
        &self.element.tag
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.element.attribute(name)
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.element.classes.iter().any(|c| c == class)
    }
}

struct Tree {
    elements: HashMap<NodeId, Element>,
    root: NodeId,
    next_id: u64,
}

impl Tree {
    fn alloc(&mut self, tag: &str, parent: NodeId) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.elements.insert(id, Element::new(tag, Some(parent)));
        if let Some(parent) = self.elements.get_mut(&parent) {
            parent.children.push(id);
        }
        id
    }

    fn insert_markup(&mut self, parent: NodeId, markup: &Markup) -> NodeId {
        let id = self.alloc(&markup.tag, parent);
        if let Some(element) = self.elements.get_mut(&id) {
            element.attributes = markup.attributes.clone();
            element.classes = markup.classes.clone();
            element.html = markup.html.clone();
        }
        for child in &markup.children {
            self.insert_markup(id, child);
        }
        id
    }

    fn collect_descendants(&self, node: NodeId, out: &mut Vec<NodeId>) {
        if let Some(element) = self.elements.get(&node) {
            for child in &element.children {
                out.push(*child);
                self.collect_descendants(*child, out);
            }
        }
    }

    fn drop_subtree(&mut self, node: NodeId) {
        if let Some(element) = self.elements.remove(&node) {
            for child in element.children {
                self.drop_subtree(child);
            }
        }
    }

    fn detach(&mut self, node: NodeId) {
        let parent = self.elements.get(&node).and_then(|e| e.parent);
        if let Some(parent) = parent.and_then(|p| self.elements.get_mut(&p)) {
            parent.children.retain(|c| *c != node);
        }
        self.drop_subtree(node);
    }

    fn write_html(&self, node: NodeId, out: &mut String, outer: bool) {
        let Some(element) = self.elements.get(&node) else {
            return;
        };
        if outer {
            write_open_tag(
                out,
                &element.tag,
                &element.classes,
                element
                    .attributes
                    .iter()
                    .map(|(n, v)| (n.as_str(), v.as_str())),
            );
        }
        out.push_str(&element.html);
        for child in &element.children {
            self.write_html(*child, out, true);
        }
        if outer {
            write_close_tag(out, &element.tag);
        }
    }
}

/// Cloneable handle to a shared document tree.
#[derive(Clone)]
pub struct Document {
    tree: Arc<Mutex<Tree>>,
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tree = self.lock();
        f.debug_struct("Document")
            .field("root", &tree.root)
            .field("elements", &tree.elements.len())
            .finish()
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        let root = NodeId(0);
        let mut elements = HashMap::new();
        elements.insert(root, Element::new("body", None));
        Self {
            tree: Arc::new(Mutex::new(Tree {
                elements,
                root,
                next_id: 1,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Tree> {
        self.tree.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn root(&self) -> NodeId {
        self.lock().root
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.lock().elements.contains_key(&node)
    }

    pub fn create_element(&self, parent: NodeId, tag: &str) -> Option<NodeId> {
        let mut tree = self.lock();
        tree.elements.contains_key(&parent).then(|| tree.alloc(tag, parent))
    }

    /// Inserts `markup` as the last child of `parent`.
    pub fn append_markup(&self, parent: NodeId, markup: &Markup) -> Option<NodeId> {
        let mut tree = self.lock();
        tree.elements
            .contains_key(&parent)
            .then(|| tree.insert_markup(parent, markup))
    }

    /// Replaces everything inside `node` (inner markup and child elements)
    /// with `children`.
    pub fn replace_children(&self, node: NodeId, children: &[Markup]) -> bool {
        let mut tree = self.lock();
        let Some(element) = tree.elements.get_mut(&node) else {
            return false;
        };
        element.html.clear();
        let old = std::mem::take(&mut element.children);
        for child in old {
            tree.drop_subtree(child);
        }
        for child in children {
            tree.insert_markup(node, child);
        }
        true
    }

    pub fn clear_children(&self, node: NodeId) -> bool {
        self.replace_children(node, &[])
    }

    /// Removes `node` with its whole subtree and all their listeners.
    pub fn remove(&self, node: NodeId) -> bool {
        let mut tree = self.lock();
        if node == tree.root || !tree.elements.contains_key(&node) {
            return false;
        }
        tree.detach(node);
        true
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.lock().elements.get(&node).and_then(|e| e.parent)
    }

    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.lock()
            .elements
            .get(&node)
            .map(|e| e.children.clone())
            .unwrap_or_default()
    }

    /// All nodes below `container` in document order, excluding `container`.
    pub fn descendants(&self, container: NodeId) -> Vec<NodeId> {
        let tree = self.lock();
        let mut out = Vec::new();
        tree.collect_descendants(container, &mut out);
        out
    }

    pub fn query(
        &self,
        container: NodeId,
        predicate: impl Fn(&ElementView<'_>) -> bool,
    ) -> Vec<NodeId> {
        let tree = self.lock();
        let mut nodes = Vec::new();
        tree.collect_descendants(container, &mut nodes);
        nodes
            .into_iter()
            .filter(|node| {
                tree.elements
                    .get(node)
                    .is_some_and(|element| predicate(&ElementView { element }))
            })
            .collect()
    }

    pub fn query_class(&self, container: NodeId, class: &str) -> Vec<NodeId> {
        self.query(container, |el| el.has_class(class))
    }

    pub fn first_class(&self, container: NodeId, class: &str) -> Option<NodeId> {
        self.query_class(container, class).into_iter().next()
    }

    /// Finds the first element in the document whose `id` attribute equals `id`.
    pub fn find_by_dom_id(&self, id: &str) -> Option<NodeId> {
        let root = self.root();
        self.query(root, |el| el.attribute("id") == Some(id))
            .into_iter()
            .next()
    }

    /// `node` itself followed by its ancestors up to the root.
    pub fn ancestors_or_self(&self, node: NodeId) -> Vec<NodeId> {
        let tree = self.lock();
        let mut path = Vec::new();
        let mut current = tree.elements.contains_key(&node).then_some(node);
        while let Some(id) = current {
            path.push(id);
            current = tree.elements.get(&id).and_then(|e| e.parent);
        }
        path
    }

    /// Nearest node in `ancestors_or_self(node)` carrying `class`.
    pub fn closest_class(&self, node: NodeId, class: &str) -> Option<NodeId> {
        self.ancestors_or_self(node)
            .into_iter()
            .find(|n| self.has_class(*n, class))
    }

    pub fn tag(&self, node: NodeId) -> Option<String> {
        self.lock().elements.get(&node).map(|e| e.tag.clone())
    }

    pub fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.lock()
            .elements
            .get(&node)
            .and_then(|e| e.attribute(name))
            .map(str::to_string)
    }

    pub fn set_attribute(&self, node: NodeId, name: &str, value: &str) -> bool {
        let mut tree = self.lock();
        let Some(element) = tree.elements.get_mut(&node) else {
            return false;
        };
        if let Some(slot) = element.attributes.iter_mut().find(|(n, _)| n == name) {
            slot.1 = value.to_string();
        } else {
            element
                .attributes
                .push((name.to_string(), value.to_string()));
        }
        true
    }

    pub fn remove_attribute(&self, node: NodeId, name: &str) -> bool {
        let mut tree = self.lock();
        let Some(element) = tree.elements.get_mut(&node) else {
            return false;
        };
        let before = element.attributes.len();
        element.attributes.retain(|(n, _)| n != name);
        element.attributes.len() != before
    }

    pub fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.lock()
            .elements
            .get(&node)
            .is_some_and(|e| e.classes.iter().any(|c| c == class))
    }

    pub fn add_class(&self, node: NodeId, class: &str) {
        if let Some(element) = self.lock().elements.get_mut(&node)
            && !element.classes.iter().any(|c| c == class)
        {
            element.classes.push(class.to_string());
        }
    }

    pub fn remove_class(&self, node: NodeId, class: &str) {
        if let Some(element) = self.lock().elements.get_mut(&node) {
            element.classes.retain(|c| c != class);
        }
    }

    /// Serialized content of `node` without its own tag.
    pub fn inner_html(&self, node: NodeId) -> Option<String> {
        let tree = self.lock();
        tree.elements.contains_key(&node).then(|| {
            let mut out = String::new();
            tree.write_html(node, &mut out, false);
            out
        })
    }

    /// Replaces the content of `node` with raw markup.
    pub fn set_inner_html(&self, node: NodeId, html: &str) -> bool {
        let mut tree = self.lock();
        let Some(element) = tree.elements.get_mut(&node) else {
            return false;
        };
        element.html = html.to_string();
        let old = std::mem::take(&mut element.children);
        for child in old {
            tree.drop_subtree(child);
        }
        true
    }

    /// Serialized `node` including its own tag. Empty if `node` is gone.
    pub fn to_html(&self, node: NodeId) -> String {
        let tree = self.lock();
        let mut out = String::new();
        tree.write_html(node, &mut out, true);
        out
    }

    /// Attaches `listener` under `key`, replacing any listener with the same key.
    pub fn add_listener(&self, node: NodeId, key: &str, listener: Listener) -> bool {
        let mut tree = self.lock();
        let Some(element) = tree.elements.get_mut(&node) else {
            return false;
        };
        if let Some(slot) = element.listeners.iter_mut().find(|(k, _)| k == key) {
            slot.1 = listener;
        } else {
            element.listeners.push((key.to_string(), listener));
        }
        true
    }

    pub fn remove_listener(&self, node: NodeId, key: &str) -> bool {
        let mut tree = self.lock();
        let Some(element) = tree.elements.get_mut(&node) else {
            return false;
        };
        let before = element.listeners.len();
        element.listeners.retain(|(k, _)| k != key);
        element.listeners.len() != before
    }

    pub fn has_listener(&self, node: NodeId, key: &str) -> bool {
        self.lock()
            .elements
            .get(&node)
            .is_some_and(|e| e.listeners.iter().any(|(k, _)| k == key))
    }

    pub fn listener_count(&self, node: NodeId) -> usize {
        self.lock()
            .elements
            .get(&node)
            .map_or(0, |e| e.listeners.len())
    }

    /// Dispatches a click on `target`, bubbling up to the root.
    ///
    /// Returns the number of listeners invoked.
    pub fn click(&self, target: NodeId) -> usize {
        let pending: Vec<(NodeId, Listener)> = {
            let tree = self.lock();
            let mut pending = Vec::new();
            let mut current = tree.elements.contains_key(&target).then_some(target);
            while let Some(id) = current {
                let Some(element) = tree.elements.get(&id) else {
                    break;
                };
                pending.extend(element.listeners.iter().map(|(_, l)| (id, l.clone())));
                current = element.parent;
            }
            pending
        };

        for (current, listener) in &pending {
            listener(&ClickEvent {
                target,
                current: *current,
            });
        }
        pending.len()
    }
}
