//! Hierarchy normalization
//!
//! Converts the native UI tree of each platform into a [`UiNode`] tree:
//! - `android`: uiautomator XML
//! - `ios`: WebDriverAgent JSON source
//!
//! All conversions are pure. Every node gets a fresh `_id`, so two
//! conversions of the same input differ only in their ids.

mod android;
mod ios;

use quick_xml::events::Event;
use quick_xml::{Reader, Writer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::{DeviceError, Result};

pub use android::{android_xml_to_tree, parse_bounds};
pub use ios::ios_source_to_tree;

/// Bounding rectangle of a node in screen pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// One node of a normalized UI tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UiNode {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_type")]
    pub node_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xpath: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rect: Option<Rect>,
    /// Remaining platform attributes, kept with their native keys
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<UiNode>,
}

impl UiNode {
    pub fn new(node_type: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            node_type: node_type.into(),
            xpath: None,
            rect: None,
            attributes: Map::new(),
            children: Vec::new(),
        }
    }

    /// String attribute by native key
    pub fn attr_str(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(Value::as_str)
    }

    /// Depth-first search including `self`
    pub fn find<P>(&self, predicate: P) -> Option<&UiNode>
    where
        P: Fn(&UiNode) -> bool + Copy,
    {
        if predicate(self) {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(predicate))
    }

    /// Number of nodes in this subtree, `self` included
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(UiNode::node_count).sum::<usize>()
    }
}

/// Re-indent an XML document with two spaces per level
pub fn pretty_xml(xml: &str) -> Result<String> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

    loop {
        match reader.read_event()? {
            Event::Eof => break,
            event => writer
                .write_event(event)
                .map_err(|e| DeviceError::Parse(e.to_string()))?,
        }
    }

    String::from_utf8(writer.into_inner()).map_err(|e| DeviceError::Parse(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pretty_xml_indents_nested_elements() {
        let xml = r#"<hierarchy rotation="0"><node index="0"><node index="1"/></node></hierarchy>"#;
        let pretty = pretty_xml(xml).unwrap();
        let lines: Vec<&str> = pretty.lines().collect();

        assert_eq!(lines[0], r#"<hierarchy rotation="0">"#);
        assert_eq!(lines[1], r#"  <node index="0">"#);
        assert_eq!(lines[2], r#"    <node index="1"/>"#);
        assert_eq!(lines[4], "</hierarchy>");
    }

    #[test]
    fn test_pretty_xml_rejects_broken_markup() {
        let err = pretty_xml("<hierarchy><node></hierarchy>").unwrap_err();
        assert!(matches!(err, DeviceError::Parse(_)));
    }

    #[test]
    fn test_node_serializes_with_flattened_attributes() {
        let mut node = UiNode::new("android.widget.TextView");
        node.attributes
            .insert("text".to_string(), Value::String("Hello".to_string()));
        node.rect = Some(Rect {
            x: 0.0,
            y: 10.0,
            width: 100.0,
            height: 20.0,
        });

        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["_type"], "android.widget.TextView");
        assert_eq!(json["text"], "Hello");
        assert_eq!(json["rect"]["height"], 20.0);
        assert!(json.get("children").is_none());
        assert!(json.get("xpath").is_none());
    }
}
