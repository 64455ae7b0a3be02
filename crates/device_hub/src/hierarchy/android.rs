//! uiautomator XML to [`UiNode`] conversion

use lazy_static::lazy_static;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;

use super::{Rect, UiNode};
use crate::error::{DeviceError, Result};

lazy_static! {
    static ref BOUNDS_RE: Regex =
        Regex::new(r"^\[(-?\d+),(-?\d+)\]\[(-?\d+),(-?\d+)\]$").expect("valid bounds regex");
}

/// Nodes with these bounds are invisible placeholders and are dropped
const EMPTY_BOUNDS: &str = "[0,0][0,0]";

/// Element being built while its end tag is pending
struct Frame {
    node: UiNode,
    xpath: String,
    tag_counts: HashMap<String, usize>,
    dropped: bool,
}

/// Parse `[left,top][right,bottom]` into a rect
pub fn parse_bounds(bounds: &str) -> Option<Rect> {
    let caps = BOUNDS_RE.captures(bounds.trim())?;
    let n = |i: usize| caps[i].parse::<f64>().ok();
    let (left, top, right, bottom) = (n(1)?, n(2)?, n(3)?, n(4)?);
    Some(Rect {
        x: left,
        y: top,
        width: right - left,
        height: bottom - top,
    })
}

/// Convert a uiautomator dump into a normalized tree
pub fn android_xml_to_tree(xml: &[u8]) -> Result<UiNode> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut stack: Vec<Frame> = Vec::new();
    let mut root: Option<UiNode> = None;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                let frame = open_element(&e, stack.last_mut())?;
                stack.push(frame);
            }
            Event::Empty(e) => {
                let frame = open_element(&e, stack.last_mut())?;
                close_frame(frame, &mut stack, &mut root);
            }
            Event::End(_) => {
                let frame = stack
                    .pop()
                    .ok_or_else(|| DeviceError::Parse("unbalanced end tag".to_string()))?;
                close_frame(frame, &mut stack, &mut root);
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if !stack.is_empty() {
        return Err(DeviceError::Parse("unexpected end of document".to_string()));
    }
    root.ok_or_else(|| DeviceError::Parse("hierarchy contains no elements".to_string()))
}

fn open_element(e: &BytesStart<'_>, parent: Option<&mut Frame>) -> Result<Frame> {
    let tag = String::from_utf8_lossy(e.name().as_ref()).into_owned();

    let xpath = match parent {
        Some(parent) => {
            let position = parent.tag_counts.entry(tag.clone()).or_insert(0);
            *position += 1;
            format!("{}/{}[{}]", parent.xpath, tag, position)
        }
        None => format!("/{}", tag),
    };

    let mut attrs = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|err| DeviceError::Parse(err.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        attrs.push((key, value));
    }

    let dropped = attrs
        .iter()
        .any(|(k, v)| k == "bounds" && v == EMPTY_BOUNDS);

    let mut node = build_node(&tag, attrs);
    node.xpath = Some(xpath.clone());

    Ok(Frame {
        node,
        xpath,
        tag_counts: HashMap::new(),
        dropped,
    })
}

fn close_frame(frame: Frame, stack: &mut [Frame], root: &mut Option<UiNode>) {
    if frame.dropped {
        return;
    }
    match stack.last_mut() {
        Some(parent) => parent.node.children.push(frame.node),
        None => {
            if root.is_none() {
                *root = Some(frame.node);
            }
        }
    }
}

/// Type the native attributes of one element
fn build_node(tag: &str, attrs: Vec<(String, String)>) -> UiNode {
    let node_type = attrs
        .iter()
        .find(|(k, _)| k == "class")
        .map(|(_, v)| v.clone())
        .unwrap_or_else(|| tag.to_string());
    let mut node = UiNode::new(node_type);

    for (key, value) in attrs {
        if key == "bounds" {
            if let Some(rect) = parse_bounds(&value) {
                node.rect = Some(rect);
                continue;
            }
        }

        let value = match value.as_str() {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            _ if key == "index" => value
                .parse::<i64>()
                .map(Value::from)
                .unwrap_or(Value::String(value)),
            _ => Value::String(value),
        };
        node.attributes.insert(key, value);
    }

    node
}

#[cfg(test)]
mod tests {
    use super::*;

    const DUMP: &str = r#"<?xml version='1.0' encoding='UTF-8' standalone='yes' ?>
<hierarchy rotation="0">
  <node index="0" text="" resource-id="" class="android.widget.FrameLayout" package="com.example.app" clickable="false" bounds="[0,0][1080,2400]">
    <node index="0" text="Sign in" resource-id="com.example.app:id/login" class="android.widget.Button" package="com.example.app" clickable="true" bounds="[100,200][500,300]" />
    <node index="1" text="" class="android.view.View" bounds="[0,0][0,0]">
      <node index="0" text="hidden" class="android.widget.TextView" bounds="[1,1][2,2]" />
    </node>
    <node index="2" text="Tom &amp; Jerry" class="android.widget.TextView" bounds="[0,400][1080,480]" />
  </node>
</hierarchy>"#;

    #[test]
    fn test_parse_bounds() {
        let rect = parse_bounds("[100,200][500,300]").unwrap();
        assert_eq!(rect.x, 100.0);
        assert_eq!(rect.y, 200.0);
        assert_eq!(rect.width, 400.0);
        assert_eq!(rect.height, 100.0);

        assert!(parse_bounds("100,200,500,300").is_none());
    }

    #[test]
    fn test_android_tree_structure() {
        let tree = android_xml_to_tree(DUMP.as_bytes()).unwrap();

        assert_eq!(tree.node_type, "hierarchy");
        assert_eq!(tree.xpath.as_deref(), Some("/hierarchy"));
        assert_eq!(tree.children.len(), 1);

        let frame = &tree.children[0];
        assert_eq!(frame.node_type, "android.widget.FrameLayout");
        assert_eq!(frame.xpath.as_deref(), Some("/hierarchy/node[1]"));
        // the [0,0][0,0] subtree is gone
        assert_eq!(frame.children.len(), 2);
        assert_eq!(tree.node_count(), 4);
        assert!(tree.find(|n| n.attr_str("text") == Some("hidden")).is_none());
    }

    #[test]
    fn test_android_attribute_types() {
        let tree = android_xml_to_tree(DUMP.as_bytes()).unwrap();
        let button = tree
            .find(|n| n.node_type == "android.widget.Button")
            .unwrap();

        assert_eq!(button.attributes["clickable"], Value::Bool(true));
        assert_eq!(button.attributes["index"], Value::from(0));
        assert_eq!(button.attr_str("resource-id"), Some("com.example.app:id/login"));
        assert!(button.attributes.get("bounds").is_none());
        assert_eq!(button.rect.unwrap().width, 400.0);
        assert_eq!(button.xpath.as_deref(), Some("/hierarchy/node[1]/node[1]"));

        let text = tree
            .find(|n| n.attr_str("text") == Some("Tom & Jerry"))
            .unwrap();
        assert_eq!(text.xpath.as_deref(), Some("/hierarchy/node[1]/node[3]"));
    }

    #[test]
    fn test_android_ids_are_unique() {
        let tree = android_xml_to_tree(DUMP.as_bytes()).unwrap();
        let child = &tree.children[0];
        assert_ne!(tree.id, child.id);
        assert_ne!(child.children[0].id, child.children[1].id);
    }

    #[test]
    fn test_android_malformed_xml() {
        let err = android_xml_to_tree(b"<hierarchy><node>").unwrap_err();
        assert!(matches!(err, DeviceError::Parse(_)));

        let err = android_xml_to_tree(b"").unwrap_err();
        assert!(matches!(err, DeviceError::Parse(_)));
    }
}
