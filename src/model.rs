//! XML document tree model
//!
//! Nodes live in a flat arena owned by the [`Document`]; they refer to their
//! parent and children by [`NodeId`] index, so the parent back-edge is a
//! plain number instead of an aliased pointer. The arena is append-only:
//! nodes are created while parsing and only read afterwards.

/// Index of a node within its document's arena
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// A single key/value attribute pair
///
/// Keys are not required to be unique within a node; lookups return the
/// first match in insertion order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attribute {
    pub key: String,
    pub value: String,
}

impl Attribute {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// One element of the document tree
///
/// A node with children is serialized ignoring its `inner_text`; a node
/// with neither children nor text serializes as a self-closing tag.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Node {
    tag: Option<String>,
    inner_text: Option<String>,
    attributes: Vec<Attribute>,
    children: Vec<NodeId>,
    parent: Option<NodeId>,
}

impl Node {
    /// Create a detached node with the given tag
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: Some(tag.into()),
            ..Self::default()
        }
    }

    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    pub fn inner_text(&self) -> Option<&str> {
        self.inner_text.as_deref()
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub const fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// First attribute value whose key matches exactly
    pub fn attribute_value(&self, key: &str) -> Option<&str> {
        self.attribute(key).map(|attr| attr.value.as_str())
    }

    /// First attribute whose key matches exactly
    pub fn attribute(&self, key: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|attr| attr.key == key)
    }

    /// Mutable form of [`Node::attribute`], for editing a value in place
    pub fn attribute_mut(&mut self, key: &str) -> Option<&mut Attribute> {
        self.attributes.iter_mut().find(|attr| attr.key == key)
    }

    /// Append an attribute, keeping insertion order and duplicates
    pub fn push_attribute(&mut self, attr: Attribute) {
        self.attributes.push(attr);
    }

    /// Replace the inner text
    pub fn set_inner_text(&mut self, text: impl Into<String>) {
        self.inner_text = Some(text.into());
    }

    pub(crate) fn set_tag(&mut self, tag: impl Into<String>) {
        self.tag = Some(tag.into());
    }
}

/// A parsed XML document
///
/// The root node is a synthetic container without a tag; its children are
/// the real top-level elements.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Document {
    nodes: Vec<Node>,
    version: Option<String>,
    encoding: Option<String>,
}

impl Document {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::default()],
            version: None,
            encoding: None,
        }
    }

    /// Id of the synthetic root node
    pub const fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    /// Append `node` to `parent`'s children, returning the new node's id
    pub fn add_child(&mut self, parent: NodeId, mut node: Node) -> NodeId {
        node.parent = Some(parent);
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        self.nodes[parent.0].children.push(id);
        id
    }

    /// Direct children of `parent` whose tag equals `tag`, in document order
    pub fn children_by_tag(&self, parent: NodeId, tag: &str) -> Vec<NodeId> {
        self.node(parent)
            .children
            .iter()
            .copied()
            .filter(|&child| self.node(child).tag() == Some(tag))
            .collect()
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn encoding(&self) -> Option<&str> {
        self.encoding.as_deref()
    }

    pub fn set_version(&mut self, version: Option<String>) {
        self.version = version;
    }

    pub fn set_encoding(&mut self, encoding: Option<String>) {
        self.encoding = encoding;
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_child_links_both_ways() {
        let mut doc = Document::new();
        let root = doc.root();
        let item = doc.add_child(root, Node::new("item"));

        assert_eq!(doc.node(root).children(), &[item]);
        assert_eq!(doc.node(item).parent(), Some(root));
        assert_eq!(doc.node(item).tag(), Some("item"));
    }

    #[test]
    fn test_children_by_tag_in_document_order() {
        let mut doc = Document::new();
        let root = doc.root();
        let first = doc.add_child(root, Node::new("item"));
        doc.add_child(root, Node::new("other"));
        let second = doc.add_child(root, Node::new("item"));

        assert_eq!(doc.children_by_tag(root, "item"), vec![first, second]);
        assert!(doc.children_by_tag(root, "missing").is_empty());
    }

    #[test]
    fn test_children_by_tag_is_case_sensitive() {
        let mut doc = Document::new();
        let root = doc.root();
        doc.add_child(root, Node::new("Item"));

        assert!(doc.children_by_tag(root, "item").is_empty());
    }

    #[test]
    fn test_attribute_lookup_first_match() {
        let mut node = Node::new("item");
        node.push_attribute(Attribute::new("id", "1"));
        node.push_attribute(Attribute::new("name", "left"));
        node.push_attribute(Attribute::new("id", "2"));

        assert_eq!(node.attribute_value("id"), Some("1"));
        assert_eq!(node.attribute_value("name"), Some("left"));
        assert_eq!(node.attribute_value("missing"), None);
    }

    #[test]
    fn test_attribute_mut_edits_in_place() {
        let mut node = Node::new("item");
        node.push_attribute(Attribute::new("id", "1"));

        if let Some(attr) = node.attribute_mut("id") {
            attr.value = "9".to_string();
        }
        assert_eq!(node.attribute_value("id"), Some("9"));
    }

    #[test]
    fn test_root_has_no_tag() {
        let doc = Document::new();
        assert_eq!(doc.node(doc.root()).tag(), None);
        assert_eq!(doc.node(doc.root()).parent(), None);
    }
}
