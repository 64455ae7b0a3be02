//! WebDriverAgent JSON source to [`UiNode`] conversion

use serde_json::Value;

use super::{Rect, UiNode};
use crate::error::{DeviceError, Result};

/// Convert a WebDriverAgent `source?format=json` tree into a normalized tree.
///
/// WDA reports geometry in points; `scale` converts it to screenshot pixels.
pub fn ios_source_to_tree(source: &Value, scale: f64) -> Result<UiNode> {
    let object = source
        .as_object()
        .ok_or_else(|| DeviceError::Parse(format!("expected a JSON object, got {}", source)))?;

    let node_type = object
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| DeviceError::Parse("node without a type".to_string()))?;
    let mut node = UiNode::new(node_type);

    for (key, value) in object {
        match key.as_str() {
            "type" => {}
            "rect" => node.rect = Some(scaled_rect(value, scale)?),
            "children" => {
                let children = value
                    .as_array()
                    .ok_or_else(|| DeviceError::Parse("children is not an array".to_string()))?;
                for child in children {
                    node.children.push(ios_source_to_tree(child, scale)?);
                }
            }
            _ => {
                node.attributes.insert(key.clone(), value.clone());
            }
        }
    }

    Ok(node)
}

fn scaled_rect(value: &Value, scale: f64) -> Result<Rect> {
    let field = |name: &str| {
        value
            .get(name)
            .and_then(Value::as_f64)
            .map(|v| v * scale)
            .ok_or_else(|| DeviceError::Parse(format!("rect is missing {}", name)))
    };
    Ok(Rect {
        x: field("x")?,
        y: field("y")?,
        width: field("width")?,
        height: field("height")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn source() -> Value {
        json!({
            "type": "XCUIElementTypeApplication",
            "name": "Settings",
            "isEnabled": "1",
            "rect": {"x": 0, "y": 0, "width": 390, "height": 844},
            "children": [
                {
                    "type": "XCUIElementTypeButton",
                    "label": "General",
                    "rect": {"x": 16, "y": 100.5, "width": 358, "height": 44}
                }
            ]
        })
    }

    #[test]
    fn test_ios_tree_is_scaled() {
        let tree = ios_source_to_tree(&source(), 3.0).unwrap();

        assert_eq!(tree.node_type, "XCUIElementTypeApplication");
        assert_eq!(tree.rect.unwrap().width, 1170.0);
        assert_eq!(tree.attr_str("name"), Some("Settings"));
        assert!(tree.attributes.get("type").is_none());

        let button = &tree.children[0];
        assert_eq!(button.node_type, "XCUIElementTypeButton");
        assert_eq!(button.attr_str("label"), Some("General"));
        let rect = button.rect.unwrap();
        assert_eq!(rect.x, 48.0);
        assert_eq!(rect.y, 301.5);
        assert_eq!(rect.height, 132.0);
    }

    #[test]
    fn test_ios_tree_rejects_untyped_nodes() {
        let err = ios_source_to_tree(&json!({"name": "x"}), 1.0).unwrap_err();
        assert!(matches!(err, DeviceError::Parse(_)));

        let err = ios_source_to_tree(&json!("<xml/>"), 1.0).unwrap_err();
        assert!(matches!(err, DeviceError::Parse(_)));
    }
}
