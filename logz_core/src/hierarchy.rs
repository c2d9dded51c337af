//! The underlying logging facility: a tree of named logger nodes.
//!
//! Names are dotted paths (`app.db.pool`); a node's parent is the longest
//! existing prefix, and every node without a dot hangs off the root. Nodes
//! are created on first lookup together with any missing ancestors and are
//! never removed, so parent links are fixed for the node's lifetime.
//!
//! A record dispatched on a node runs through that node's handlers and then
//! through each ancestor's, stopping after the first node that does not
//! propagate.

use crate::format::Record;
use crate::handler::Handler;
use crate::Severity;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, RwLock};

/// Level the root node starts with
pub const ROOT_LEVEL: Severity = Severity::Warning;

const LEVEL_UNSET: u8 = 0;

/// One named logger in the hierarchy
pub struct Node {
    name: String,
    parent: Option<Arc<Node>>,
    level: AtomicU8,
    propagate: AtomicBool,
    handlers: RwLock<Vec<Arc<dyn Handler>>>,
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("name", &self.name)
            .field("level", &self.level())
            .field("propagate", &self.propagate())
            .field("handlers", &self.handler_count())
            .finish()
    }
}

impl Node {
    fn new(name: &str, parent: Option<Arc<Node>>, level: Option<Severity>) -> Self {
        Self {
            name: name.to_string(),
            parent,
            level: AtomicU8::new(level.map_or(LEVEL_UNSET, Severity::as_u8)),
            propagate: AtomicBool::new(true),
            handlers: RwLock::new(Vec::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<&Arc<Node>> {
        self.parent.as_ref()
    }

    /// Explicitly set level, if any
    pub fn level(&self) -> Option<Severity> {
        Severity::from_u8(self.level.load(Ordering::Acquire))
    }

    pub fn set_level(&self, level: Severity) {
        self.level.store(level.as_u8(), Ordering::Release);
    }

    /// First explicit level found walking up to the root
    pub fn effective_level(&self) -> Severity {
        let mut node = Some(self);
        while let Some(current) = node {
            if let Some(level) = current.level() {
                return level;
            }
            node = current.parent.as_deref();
        }
        ROOT_LEVEL
    }

    pub fn is_enabled_for(&self, level: Severity) -> bool {
        level >= self.effective_level()
    }

    pub fn propagate(&self) -> bool {
        self.propagate.load(Ordering::Acquire)
    }

    pub fn set_propagate(&self, propagate: bool) {
        self.propagate.store(propagate, Ordering::Release);
    }

    pub fn add_handler(&self, handler: Arc<dyn Handler>) {
        self.handlers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(handler);
    }

    pub fn clear_handlers(&self) {
        self.handlers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }

    /// Detach one handler, matched by identity. Returns false if it was not
    /// attached here.
    pub fn remove_handler(&self, handler: &Arc<dyn Handler>) -> bool {
        let mut handlers = self.handlers.write().unwrap_or_else(|e| e.into_inner());
        let target = Arc::as_ptr(handler) as *const ();
        let before = handlers.len();
        handlers.retain(|h| Arc::as_ptr(h) as *const () != target);
        handlers.len() != before
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn has_handlers(&self) -> bool {
        self.handler_count() > 0
    }

    /// Run the record through this node's handlers and its ancestors'.
    ///
    /// Only handler levels are checked here; the caller decides whether the
    /// record passes this node's own level. Handler errors are reported and
    /// do not stop delivery to the remaining handlers.
    pub fn dispatch(&self, record: &Record) {
        let mut node = Some(self);
        while let Some(current) = node {
            let handlers = current.handlers.read().unwrap_or_else(|e| e.into_inner());
            for handler in handlers.iter().filter(|h| record.level >= h.level()) {
                if let Err(e) = handler.handle(record) {
                    tracing::warn!(
                        "Failed to write record for logger {:?} on node {:?}: {}",
                        record.name,
                        current.name,
                        e
                    );
                }
            }
            if !current.propagate() {
                break;
            }
            node = current.parent.as_deref();
        }
    }
}

/// Process-wide tree of logger nodes
#[derive(Debug)]
pub struct Hierarchy {
    root: Arc<Node>,
    nodes: Mutex<HashMap<String, Arc<Node>>>,
}

impl Default for Hierarchy {
    fn default() -> Self {
        Self::new()
    }
}

impl Hierarchy {
    pub fn new() -> Self {
        Self {
            root: Arc::new(Node::new("", None, Some(ROOT_LEVEL))),
            nodes: Mutex::new(HashMap::new()),
        }
    }

    pub fn root(&self) -> Arc<Node> {
        Arc::clone(&self.root)
    }

    /// Existing node for `name`, without creating it
    pub fn get(&self, name: &str) -> Option<Arc<Node>> {
        if name.is_empty() {
            return Some(self.root());
        }
        let nodes = self.nodes.lock().unwrap_or_else(|e| e.into_inner());
        nodes.get(name).cloned()
    }

    /// Node for `name`, created with its missing ancestors if needed.
    /// The empty name is the root.
    pub fn node(&self, name: &str) -> Arc<Node> {
        if name.is_empty() {
            return self.root();
        }
        let mut nodes = self.nodes.lock().unwrap_or_else(|e| e.into_inner());
        self.get_or_create(&mut nodes, name)
    }

    fn get_or_create(&self, nodes: &mut HashMap<String, Arc<Node>>, name: &str) -> Arc<Node> {
        if let Some(node) = nodes.get(name) {
            return Arc::clone(node);
        }

        let parent = match name.rsplit_once('.') {
            Some((prefix, _)) if !prefix.is_empty() => self.get_or_create(nodes, prefix),
            _ => self.root(),
        };

        let node = Arc::new(Node::new(name, Some(parent), None));
        nodes.insert(name.to_string(), Arc::clone(&node));
        tracing::trace!("Created logger node {:?}", name);
        node
    }

    /// Number of named nodes (root excluded)
    pub fn len(&self) -> usize {
        self.nodes.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::ColorFormatter;
    use crate::handler::{CaptureBuffer, ConsoleHandler, ConsoleOutput};

    fn capture(node: &Node, level: Severity) -> CaptureBuffer {
        let buffer = CaptureBuffer::new();
        let formatter = ColorFormatter::new("{name}: {message}", "%H", false);
        node.add_handler(Arc::new(ConsoleHandler::new(
            ConsoleOutput::Capture(buffer.clone()),
            level,
            formatter,
        )));
        buffer
    }

    #[test]
    fn test_node_creates_ancestors() {
        let hierarchy = Hierarchy::new();
        let leaf = hierarchy.node("app.db.pool");

        assert_eq!(hierarchy.len(), 3);
        assert_eq!(leaf.parent().unwrap().name(), "app.db");
        assert_eq!(leaf.parent().unwrap().parent().unwrap().name(), "app");
        assert_eq!(
            leaf.parent().unwrap().parent().unwrap().parent().unwrap().name(),
            ""
        );
        assert!(Arc::ptr_eq(&leaf, &hierarchy.node("app.db.pool")));
        assert!(hierarchy.get("app.db").is_some());
        assert!(hierarchy.get("other").is_none());
    }

    #[test]
    fn test_effective_level_inherits() {
        let hierarchy = Hierarchy::new();
        let leaf = hierarchy.node("a.b");
        assert_eq!(leaf.level(), None);
        assert_eq!(leaf.effective_level(), ROOT_LEVEL);

        hierarchy.node("a").set_level(Severity::Debug);
        assert_eq!(leaf.effective_level(), Severity::Debug);
        assert!(leaf.is_enabled_for(Severity::Debug));

        leaf.set_level(Severity::Error);
        assert!(!leaf.is_enabled_for(Severity::Warning));
    }

    #[test]
    fn test_dispatch_propagates_to_ancestors() {
        let hierarchy = Hierarchy::new();
        let root_buf = capture(&hierarchy.root(), Severity::Debug);
        let parent_buf = capture(&hierarchy.node("svc"), Severity::Debug);
        let child = hierarchy.node("svc.worker");
        let child_buf = capture(&child, Severity::Debug);

        child.dispatch(&Record::new(Severity::Info, "svc.worker", "hi"));

        assert_eq!(child_buf.lines(), vec!["svc.worker: hi"]);
        assert_eq!(parent_buf.lines(), vec!["svc.worker: hi"]);
        assert_eq!(root_buf.lines(), vec!["svc.worker: hi"]);
    }

    #[test]
    fn test_dispatch_stops_without_propagation() {
        let hierarchy = Hierarchy::new();
        let root_buf = capture(&hierarchy.root(), Severity::Debug);
        let node = hierarchy.node("svc");
        let node_buf = capture(&node, Severity::Debug);
        node.set_propagate(false);

        node.dispatch(&Record::new(Severity::Info, "svc", "local"));

        assert_eq!(node_buf.lines(), vec!["svc: local"]);
        assert!(root_buf.lines().is_empty());
    }

    #[test]
    fn test_handler_level_filters() {
        let hierarchy = Hierarchy::new();
        let node = hierarchy.node("svc");
        let buf = capture(&node, Severity::Warning);

        node.dispatch(&Record::new(Severity::Info, "svc", "dropped"));
        node.dispatch(&Record::new(Severity::Error, "svc", "kept"));

        assert_eq!(buf.lines(), vec!["svc: kept"]);
    }

    #[test]
    fn test_clear_handlers() {
        let hierarchy = Hierarchy::new();
        let node = hierarchy.node("svc");
        capture(&node, Severity::Debug);
        capture(&node, Severity::Debug);
        assert_eq!(node.handler_count(), 2);

        node.clear_handlers();
        assert!(!node.has_handlers());
    }

    #[test]
    fn test_remove_handler_by_identity() {
        let hierarchy = Hierarchy::new();
        let node = hierarchy.node("svc");
        let kept = capture(&node, Severity::Debug);

        let removed = CaptureBuffer::new();
        let handler: Arc<dyn Handler> = Arc::new(ConsoleHandler::new(
            ConsoleOutput::Capture(removed.clone()),
            Severity::Debug,
            ColorFormatter::new("{message}", "%H", false),
        ));
        node.add_handler(Arc::clone(&handler));
        assert_eq!(node.handler_count(), 2);

        assert!(node.remove_handler(&handler));
        assert!(!node.remove_handler(&handler));
        assert_eq!(node.handler_count(), 1);

        node.dispatch(&Record::new(Severity::Info, "svc", "after"));
        assert_eq!(kept.lines(), vec!["svc: after"]);
        assert!(removed.contents().is_empty());
    }
}
