//! Ordered, attributed, labeled trees.
//!
//! A [`Tree`] is the data model of the graft wire format: every node has a
//! tag, optional flat text, a set of string attributes and an ordered list
//! of children. Trees are plain values with no back-references, and render
//! to (and parse from) an XML document whose root element is [`ROOT_TAG`].
//!
//! ```text
//! <?xml version="1.0" encoding="utf-8"?>
//! <pnml>
//!  <object type="int">42</object>
//! </pnml>
//! ```

mod xml;

use std::collections::BTreeMap;

use thiserror::Error;

pub use xml::parse;

/// Tag of the document root element.
pub const ROOT_TAG: &str = "pnml";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    #[error("tag mismatch '{expected}', '{got}'")]
    TagMismatch { expected: String, got: String },

    #[error("no child '{0}'")]
    NoChild(String),

    #[error("multiple children '{0}'")]
    MultipleChildren(String),

    #[error("missing attribute '{attribute}' on <{tag}>")]
    MissingAttribute { tag: String, attribute: String },

    #[error("parse error at {line}:{column}: {message}")]
    Parse {
        line: usize,
        column: usize,
        message: String,
    },
}

pub type Result<T> = std::result::Result<T, TreeError>;

/// A node of the wire format.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tree {
    pub tag: String,
    text: Option<String>,
    pub children: Vec<Tree>,
    pub attributes: BTreeMap<String, String>,
}

fn blank_to_none(text: Option<String>) -> Option<String> {
    text.filter(|t| !t.trim().is_empty())
}

impl Tree {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            text: None,
            children: Vec::new(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.set_text(Some(text.into()));
        self
    }

    pub fn with_child(mut self, child: Tree) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Text content, `None` when absent or whitespace only.
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn set_text(&mut self, text: Option<String>) {
        self.text = blank_to_none(text);
    }

    /// Append stripped `data` to the text, separated by `sep`.
    ///
    /// Whitespace-only data is ignored.
    pub fn add_text(&mut self, data: &str, sep: &str) {
        let data = data.trim();
        if data.is_empty() {
            return;
        }
        match &mut self.text {
            Some(text) => {
                text.push_str(sep);
                text.push_str(data);
            }
            None => self.text = Some(data.to_string()),
        }
    }

    pub fn add_child(&mut self, child: Tree) {
        self.children.push(child);
    }

    /// Attribute value, or `MissingAttribute`.
    pub fn attr(&self, name: &str) -> Result<&str> {
        self.get_attr(name).ok_or_else(|| TreeError::MissingAttribute {
            tag: self.tag.clone(),
            attribute: name.to_string(),
        })
    }

    pub fn get_attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(name.into(), value.into());
    }

    pub fn has_child(&self, name: &str) -> bool {
        self.children.iter().any(|c| c.tag == name)
    }

    /// The unique direct child tagged `name`.
    pub fn child(&self, name: &str) -> Result<&Tree> {
        let mut found = None;
        for child in self.children.iter().filter(|c| c.tag == name) {
            if found.is_some() {
                return Err(TreeError::MultipleChildren(name.to_string()));
            }
            found = Some(child);
        }
        found.ok_or_else(|| TreeError::NoChild(name.to_string()))
    }

    /// Like [`child`](Self::child), but a missing child is `None`.
    /// Several children tagged `name` are still an error.
    pub fn optional_child(&self, name: &str) -> Result<Option<&Tree>> {
        match self.child(name) {
            Ok(child) => Ok(Some(child)),
            Err(TreeError::NoChild(_)) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// The only child of this node, whatever its tag.
    pub fn only_child(&self) -> Result<&Tree> {
        match self.children.as_slice() {
            [child] => Ok(child),
            [] => Err(TreeError::NoChild(String::new())),
            _ => Err(TreeError::MultipleChildren(String::new())),
        }
    }

    pub fn children_named<'a, 'b>(&'a self, name: &'b str) -> impl Iterator<Item = &'a Tree> + 'b
    where
        'a: 'b,
    {
        self.children.iter().filter(move |c| c.tag == name)
    }

    /// Remove and return every direct child tagged `name`.
    pub fn take_children(&mut self, name: &str) -> Vec<Tree> {
        let (taken, kept) = std::mem::take(&mut self.children)
            .into_iter()
            .partition(|c| c.tag == name);
        self.children = kept;
        taken
    }

    /// Pre-order traversal, starting with this node.
    pub fn nodes(&self) -> Nodes<'_> {
        Nodes { stack: vec![self] }
    }

    /// Incorporate children, attributes and text from `other`.
    pub fn update(&mut self, other: Tree) -> Result<()> {
        if self.tag != other.tag {
            return Err(TreeError::TagMismatch {
                expected: self.tag.clone(),
                got: other.tag,
            });
        }
        self.children.extend(other.children);
        self.attributes.extend(other.attributes);
        if let Some(text) = other.text {
            self.add_text(&text, "\n");
        }
        Ok(())
    }

    /// Render as an XML document rooted at [`ROOT_TAG`].
    pub fn to_xml(&self) -> String {
        if self.tag == ROOT_TAG {
            xml::render(self)
        } else {
            xml::render(&Tree::new(ROOT_TAG).with_child(self.clone()))
        }
    }
}

impl std::fmt::Display for Tree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<tree '{}'>", self.tag)
    }
}

pub struct Nodes<'a> {
    stack: Vec<&'a Tree>,
}

impl<'a> Iterator for Nodes<'a> {
    type Item = &'a Tree;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Tree {
        Tree::new("foo")
            .with_child(Tree::new("egg").with_text("first"))
            .with_child(Tree::new("egg").with_text("second"))
            .with_child(Tree::new("spam").with_child(Tree::new("bar")))
    }

    #[test]
    fn test_whitespace_text_is_absent() {
        let tree = Tree::new("foo").with_text("  \n ");
        assert_eq!(tree.text(), None);
    }

    #[test]
    fn test_child_lookup() {
        let tree = sample();
        assert_eq!(tree.child("spam").unwrap().children.len(), 1);
        assert_eq!(
            tree.child("egg"),
            Err(TreeError::MultipleChildren("egg".to_string()))
        );
        assert_eq!(tree.child("bar"), Err(TreeError::NoChild("bar".to_string())));
        assert!(tree.has_child("egg"));
        assert!(!tree.has_child("bar"));
        assert_eq!(tree.children_named("egg").count(), 2);

        assert_eq!(tree.optional_child("spam").unwrap().map(|c| c.tag.as_str()), Some("spam"));
        assert_eq!(tree.optional_child("bar"), Ok(None));
        assert_eq!(
            tree.optional_child("egg"),
            Err(TreeError::MultipleChildren("egg".to_string()))
        );
    }

    #[test]
    fn test_lookups_outlive_the_name() {
        let tree = sample();
        let spam = {
            let name = String::from("spam");
            tree.child(&name).unwrap()
        };
        let eggs: Vec<&Tree> = {
            let name = String::from("egg");
            tree.children_named(&name).collect()
        };
        assert_eq!(spam.tag, "spam");
        assert_eq!(eggs.len(), 2);
        assert_eq!(eggs[1].text(), Some("second"));
    }

    #[test]
    fn test_nodes_preorder() {
        let tags: Vec<_> = sample().nodes().map(|n| n.tag.clone()).collect();
        assert_eq!(tags, ["foo", "egg", "egg", "spam", "bar"]);
    }

    #[test]
    fn test_add_text_appends_with_separator() {
        let mut tree = Tree::new("foo");
        tree.add_text(" hello ", "\n");
        tree.add_text("world", "\n");
        tree.add_text("!", "");
        tree.add_text("   ", "\n");
        assert_eq!(tree.text(), Some("hello\nworld!"));
    }

    #[test]
    fn test_update_merges() {
        let mut tree = Tree::new("foo").with_text("hello").with_child(Tree::new("bar"));
        let other = Tree::new("foo")
            .with_text("world")
            .with_child(Tree::new("python"))
            .with_attr("attr", "value");
        tree.update(other).unwrap();
        assert_eq!(tree.children.len(), 2);
        assert_eq!(tree.get_attr("attr"), Some("value"));
        assert_eq!(tree.text(), Some("hello\nworld"));

        let err = tree.update(Tree::new("oops")).unwrap_err();
        assert_eq!(err.to_string(), "tag mismatch 'foo', 'oops'");
    }

    #[test]
    fn test_take_children() {
        let mut tree = sample();
        let eggs = tree.take_children("egg");
        assert_eq!(eggs.len(), 2);
        assert_eq!(tree.children.len(), 1);
    }

    #[test]
    fn test_missing_attribute() {
        let err = Tree::new("object").attr("type").unwrap_err();
        assert_eq!(err.to_string(), "missing attribute 'type' on <object>");
    }
}
