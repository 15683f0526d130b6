//! Defines the core abstraction for a navigable, read-only document tree.
use std::hash::Hash;

/// An expanded name: the namespace URI (if any) and the local part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QName<'a> {
    pub namespace: Option<&'a str>,
    pub local_part: &'a str,
}

/// The type of a node in the tree, aligned with the XPath 1.0 data model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeType {
    Root,
    Element,
    Attribute,
    Text,
    Comment,
    ProcessingInstruction,
}

/// The contract for a node in a read-only, hierarchical document.
///
/// The engine is written exclusively against this trait, so any tree that
/// implements it (a parsed XML document, an in-memory mock) can be queried.
///
/// `Ord` must follow document order: the engine sorts and de-duplicates every
/// node-set it produces with it.
///
/// `'a` is the lifetime of the underlying document.
pub trait DataSourceNode<'a>:
    std::fmt::Debug + Clone + Copy + PartialEq + Eq + Hash + PartialOrd + Ord
{
    fn node_type(&self) -> NodeType;

    /// The expanded name of the node. `None` for text, comment and root nodes.
    /// For a processing-instruction, this is its target.
    fn name(&self) -> Option<QName<'a>>;

    /// The string value of the node, as defined by the XPath 1.0 `string()` function.
    /// - For a text node, this is its content.
    /// - For an element or the root, the concatenation of all descendant text nodes.
    /// - For an attribute, this is its value.
    fn string_value(&self) -> String;

    /// The attribute nodes of this node. Empty for non-element nodes.
    fn attributes(&self) -> Box<dyn Iterator<Item = Self> + 'a>;

    /// The child nodes of this node, in document order.
    fn children(&self) -> Box<dyn Iterator<Item = Self> + 'a>;

    /// The parent node. `None` only for the root.
    fn parent(&self) -> Option<Self>;

    /// Walks up the parent chain to the document root.
    fn root(&self) -> Self {
        let mut current = *self;
        while let Some(parent) = current.parent() {
            current = parent;
        }
        current
    }
}

// Test utilities - publicly available for integration testing in downstream crates
pub mod tests {
    use super::*;
    use std::cmp::Ordering;
    use std::collections::HashMap;
    use std::hash::Hasher;

    pub const TEST_NS: &str = "urn:test:catalog";
    pub const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";

    #[derive(Debug, Clone)]
    struct MockNodeData<'a> {
        node_type: NodeType,
        name: Option<QName<'a>>,
        value: String,
        children: Vec<usize>,
        attributes: Vec<usize>,
    }

    #[derive(Debug)]
    pub struct MockTree<'a> {
        nodes: HashMap<usize, MockNodeData<'a>>,
        parent_map: HashMap<usize, usize>,
    }

    /// A node handle that borrows its tree so it can navigate itself.
    /// Node ids are assigned in document order, so `Ord` compares ids.
    #[derive(Debug, Clone, Copy)]
    pub struct MockNode<'a> {
        pub id: usize,
        pub tree: &'a MockTree<'a>,
    }

    impl<'a> PartialEq for MockNode<'a> {
        fn eq(&self, other: &Self) -> bool {
            self.id == other.id
        }
    }
    impl<'a> Eq for MockNode<'a> {}

    impl<'a> PartialOrd for MockNode<'a> {
        fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
            Some(self.cmp(other))
        }
    }
    impl<'a> Ord for MockNode<'a> {
        fn cmp(&self, other: &Self) -> Ordering {
            self.id.cmp(&other.id)
        }
    }

    impl<'a> Hash for MockNode<'a> {
        fn hash<H: Hasher>(&self, state: &mut H) {
            self.id.hash(state);
        }
    }

    impl<'a> DataSourceNode<'a> for MockNode<'a> {
        fn node_type(&self) -> NodeType {
            self.tree.nodes[&self.id].node_type
        }

        fn name(&self) -> Option<QName<'a>> {
            self.tree.nodes[&self.id].name
        }

        fn string_value(&self) -> String {
            self.tree.nodes[&self.id].value.clone()
        }

        fn attributes(&self) -> Box<dyn Iterator<Item = Self> + 'a> {
            let tree = self.tree;
            let attribute_ids = tree.nodes[&self.id].attributes.clone();
            Box::new(
                attribute_ids
                    .into_iter()
                    .map(move |id| MockNode { id, tree }),
            )
        }

        fn children(&self) -> Box<dyn Iterator<Item = Self> + 'a> {
            let tree = self.tree;
            let children_ids = tree.nodes[&self.id].children.clone();
            Box::new(
                children_ids
                    .into_iter()
                    .map(move |id| MockNode { id, tree }),
            )
        }

        fn parent(&self) -> Option<Self> {
            self.tree.parent_map.get(&self.id).map(|&pid| MockNode {
                id: pid,
                tree: self.tree,
            })
        }
    }

    impl<'a> MockTree<'a> {
        fn insert(&mut self, id: usize, parent: Option<usize>, data: MockNodeData<'a>) {
            self.nodes.insert(id, data);
            if let Some(pid) = parent {
                self.parent_map.insert(id, pid);
            }
        }

        pub fn node(&'a self, id: usize) -> MockNode<'a> {
            MockNode { id, tree: self }
        }
    }

    fn element<'a>(
        namespace: Option<&'a str>,
        local_part: &'a str,
        value: &str,
        children: Vec<usize>,
        attributes: Vec<usize>,
    ) -> MockNodeData<'a> {
        MockNodeData {
            node_type: NodeType::Element,
            name: Some(QName {
                namespace,
                local_part,
            }),
            value: value.to_string(),
            children,
            attributes,
        }
    }

    fn leaf<'a>(node_type: NodeType, name: Option<QName<'a>>, value: &str) -> MockNodeData<'a> {
        MockNodeData {
            node_type,
            name,
            value: value.to_string(),
            children: vec![],
            attributes: vec![],
        }
    }

    /// Creates a small catalog tree, ids in document order:
    /// ```text
    /// (root)                                   0
    ///   <catalog>                              1
    ///     <item sku="A1" xml:lang="en">        2, attrs 3 4
    ///       Widget                             5 (text)
    ///     </item>
    ///     <!-- discontinued -->                6
    ///     <c:box xmlns:c="urn:test:catalog"/>  7
    ///     <?render fast?>                      8
    ///     <item>Gadget</item>                  9, text 10
    ///   </catalog>
    /// ```
    pub fn create_test_tree<'a>() -> MockTree<'a> {
        let mut tree = MockTree {
            nodes: HashMap::new(),
            parent_map: HashMap::new(),
        };

        tree.insert(
            0,
            None,
            MockNodeData {
                node_type: NodeType::Root,
                name: None,
                value: "WidgetGadget".to_string(),
                children: vec![1],
                attributes: vec![],
            },
        );
        tree.insert(
            1,
            Some(0),
            element(None, "catalog", "WidgetGadget", vec![2, 6, 7, 8, 9], vec![]),
        );
        tree.insert(2, Some(1), element(None, "item", "Widget", vec![5], vec![3, 4]));
        tree.insert(
            3,
            Some(2),
            leaf(
                NodeType::Attribute,
                Some(QName {
                    namespace: None,
                    local_part: "sku",
                }),
                "A1",
            ),
        );
        tree.insert(
            4,
            Some(2),
            leaf(
                NodeType::Attribute,
                Some(QName {
                    namespace: Some(XML_NS),
                    local_part: "lang",
                }),
                "en",
            ),
        );
        tree.insert(5, Some(2), leaf(NodeType::Text, None, "Widget"));
        tree.insert(6, Some(1), leaf(NodeType::Comment, None, " discontinued "));
        tree.insert(7, Some(1), element(Some(TEST_NS), "box", "", vec![], vec![]));
        tree.insert(
            8,
            Some(1),
            leaf(
                NodeType::ProcessingInstruction,
                Some(QName {
                    namespace: None,
                    local_part: "render",
                }),
                "fast",
            ),
        );
        tree.insert(9, Some(1), element(None, "item", "Gadget", vec![10], vec![]));
        tree.insert(10, Some(9), leaf(NodeType::Text, None, "Gadget"));

        tree
    }
}
