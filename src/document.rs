// XML input documents, exposed to the XPath engine through `DataSourceNode`
use roxmltree::{Node, ParsingOptions};
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};
use xml2csv_xpath1::{DataSourceNode, NodeType, QName};

/// Wrapper around a parsed `roxmltree::Document`.
pub struct XmlDocument<'input> {
    doc: roxmltree::Document<'input>,
}

impl<'input> XmlDocument<'input> {
    pub fn parse(text: &'input str) -> Result<Self, roxmltree::Error> {
        let options = ParsingOptions {
            allow_dtd: true,
            ..ParsingOptions::default()
        };
        let doc = roxmltree::Document::parse_with_options(text, options)?;
        Ok(Self { doc })
    }

    /// The document node, parent of the document element.
    pub fn root_node(&self) -> XmlNode<'_, 'input> {
        XmlNode::Node(self.doc.root())
    }
}

/// Either a tree node (root, element, text, comment, processing instruction)
/// or an attribute. roxmltree keeps attributes as data on their element, so an
/// attribute is addressed by its element and index.
#[derive(Debug, Clone, Copy)]
pub enum XmlNode<'a, 'input> {
    Node(Node<'a, 'input>),
    Attribute { parent: Node<'a, 'input>, index: usize },
}

impl<'a, 'input> XmlNode<'a, 'input> {
    fn document_position(&self) -> (usize, usize) {
        match self {
            XmlNode::Node(node) => (node.id().get_usize(), 0),
            XmlNode::Attribute { parent, index } => (parent.id().get_usize(), index + 1),
        }
    }
}

impl<'a, 'input> PartialEq for XmlNode<'a, 'input> {
    fn eq(&self, other: &Self) -> bool {
        self.document_position() == other.document_position()
    }
}

impl<'a, 'input> Eq for XmlNode<'a, 'input> {}

impl<'a, 'input> PartialOrd for XmlNode<'a, 'input> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Document order: node ids are assigned in document order, and the attributes
/// of an element sort after it and before its first child.
impl<'a, 'input> Ord for XmlNode<'a, 'input> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.document_position().cmp(&other.document_position())
    }
}

impl<'a, 'input> Hash for XmlNode<'a, 'input> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.document_position().hash(state);
    }
}

impl<'a> DataSourceNode<'a> for XmlNode<'a, 'a> {
    fn node_type(&self) -> NodeType {
        match self {
            XmlNode::Node(node) => {
                if node.is_root() {
                    NodeType::Root
                } else if node.is_text() {
                    NodeType::Text
                } else if node.is_comment() {
                    NodeType::Comment
                } else if node.is_pi() {
                    NodeType::ProcessingInstruction
                } else {
                    NodeType::Element
                }
            }
            XmlNode::Attribute { .. } => NodeType::Attribute,
        }
    }

    fn name(&self) -> Option<QName<'a>> {
        match self {
            XmlNode::Node(node) if node.is_element() => {
                let tag = node.tag_name();
                Some(QName {
                    namespace: tag.namespace(),
                    local_part: tag.name(),
                })
            }
            XmlNode::Node(node) => node.pi().map(|pi| QName {
                namespace: None,
                local_part: pi.target,
            }),
            XmlNode::Attribute { parent, index } => {
                parent.attributes().nth(*index).map(|attr| QName {
                    namespace: attr.namespace(),
                    local_part: attr.name(),
                })
            }
        }
    }

    fn string_value(&self) -> String {
        match self {
            XmlNode::Node(node) => {
                if node.is_element() || node.is_root() {
                    node.descendants()
                        .filter(|n| n.is_text())
                        .filter_map(|n| n.text())
                        .collect()
                } else if node.is_pi() {
                    node.pi()
                        .and_then(|pi| pi.value)
                        .unwrap_or_default()
                        .to_string()
                } else {
                    node.text().unwrap_or_default().to_string()
                }
            }
            XmlNode::Attribute { parent, index } => parent
                .attributes()
                .nth(*index)
                .map(|attr| attr.value().to_string())
                .unwrap_or_default(),
        }
    }

    fn attributes(&self) -> Box<dyn Iterator<Item = Self> + 'a> {
        match self {
            XmlNode::Node(node) if node.is_element() => {
                let parent = *node;
                let count = node.attributes().len();
                Box::new((0..count).map(move |index| XmlNode::Attribute { parent, index }))
            }
            _ => Box::new(std::iter::empty()),
        }
    }

    fn children(&self) -> Box<dyn Iterator<Item = Self> + 'a> {
        match self {
            XmlNode::Node(node) => Box::new(node.children().map(XmlNode::Node)),
            XmlNode::Attribute { .. } => Box::new(std::iter::empty()),
        }
    }

    fn parent(&self) -> Option<Self> {
        match self {
            XmlNode::Node(node) => node.parent().map(XmlNode::Node),
            XmlNode::Attribute { parent, .. } => Some(XmlNode::Node(*parent)),
        }
    }
}
