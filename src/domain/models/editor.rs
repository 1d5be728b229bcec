#[cfg(test)]
#[path = "editor_test.rs"]
mod tests;

use serde_json::json;
use serde_json::Map;
use serde_json::Value;

use super::SyncError;

fn text_node(text: &str) -> Value {
    return json!({
        "detail": 0,
        "format": 0,
        "mode": "normal",
        "style": "",
        "text": text,
        "type": "text",
        "version": 1,
    });
}

fn linebreak_node() -> Value {
    return json!({ "type": "linebreak", "version": 1 });
}

/// A paragraph block holding `text`, with newlines mapped to linebreak nodes.
pub fn paragraph_node(text: &str) -> Value {
    let mut children: Vec<Value> = vec![];
    for (idx, line) in text.split('\n').enumerate() {
        if idx > 0 {
            children.push(linebreak_node());
        }
        if !line.is_empty() {
            children.push(text_node(line));
        }
    }

    let direction = if children.is_empty() {
        Value::Null
    } else {
        Value::String("ltr".to_string())
    };

    return json!({
        "children": children,
        "direction": direction,
        "format": "",
        "indent": 0,
        "type": "paragraph",
        "version": 1,
    });
}

fn root_attributes() -> Map<String, Value> {
    let mut root = Map::new();
    root.insert("direction".to_string(), Value::Null);
    root.insert("format".to_string(), Value::String("".to_string()));
    root.insert("indent".to_string(), json!(0));
    root.insert("type".to_string(), Value::String("root".to_string()));
    root.insert("version".to_string(), json!(1));
    return root;
}

/// Content for a freshly created document: a root holding one empty paragraph.
pub fn empty_content() -> Value {
    return EditorSurface::empty().snapshot();
}

fn collect_text(node: &Value, out: &mut String) {
    match node.get("type").and_then(Value::as_str) {
        Some("text") => {
            if let Some(text) = node.get("text").and_then(Value::as_str) {
                out.push_str(text);
            }
        }
        Some("linebreak") => out.push('\n'),
        _ => {
            if let Some(children) = node.get("children").and_then(Value::as_array) {
                for child in children {
                    collect_text(child, out);
                }
            }
        }
    }
}

/// The engine's view of the rich-text editor: it renders a serializable
/// snapshot and hands one back after every change. Only the block list and
/// the selected block are interpreted, everything else round-trips as is.
#[derive(Clone, Debug, PartialEq)]
pub struct EditorSurface {
    state: Map<String, Value>,
    root: Map<String, Value>,
    blocks: Vec<Value>,
    selection: Option<usize>,
}

impl Default for EditorSurface {
    fn default() -> EditorSurface {
        return EditorSurface::empty();
    }
}

impl EditorSurface {
    pub fn empty() -> EditorSurface {
        return EditorSurface {
            state: Map::new(),
            root: root_attributes(),
            blocks: vec![paragraph_node("")],
            selection: None,
        };
    }

    /// Loads a persisted snapshot. `null` and `{}` are what a never-edited
    /// document carries and load as the empty state.
    pub fn load(snapshot: &Value) -> Result<EditorSurface, SyncError> {
        let mut state = match snapshot {
            Value::Null => return Ok(EditorSurface::empty()),
            Value::Object(map) if map.is_empty() => return Ok(EditorSurface::empty()),
            Value::Object(map) => map.clone(),
            other => {
                return Err(SyncError::Parse(format!(
                    "expected an object snapshot, found {}",
                    json_kind(other)
                )))
            }
        };

        let mut root = match state.remove("root") {
            Some(Value::Object(root)) => root,
            Some(other) => {
                return Err(SyncError::Parse(format!(
                    "root node must be an object, found {}",
                    json_kind(&other)
                )))
            }
            None => return Err(SyncError::Parse("snapshot has no root node".to_string())),
        };

        let blocks = match root.remove("children") {
            Some(Value::Array(blocks)) => blocks,
            Some(other) => {
                return Err(SyncError::Parse(format!(
                    "root children must be an array, found {}",
                    json_kind(&other)
                )))
            }
            None => vec![],
        };

        for (idx, block) in blocks.iter().enumerate() {
            if block.get("type").and_then(Value::as_str).is_none() {
                return Err(SyncError::Parse(format!("block {idx} has no type")));
            }
        }

        return Ok(EditorSurface {
            state,
            root,
            blocks,
            selection: None,
        });
    }

    /// Never fails: malformed content leaves an empty, editable surface.
    pub fn load_or_empty(snapshot: &Value) -> EditorSurface {
        match EditorSurface::load(snapshot) {
            Ok(surface) => return surface,
            Err(err) => {
                tracing::warn!(error = %err, "Failed to parse document content, starting empty");
                return EditorSurface::empty();
            }
        }
    }

    pub fn snapshot(&self) -> Value {
        let mut root = self.root.clone();
        root.insert("children".to_string(), Value::Array(self.blocks.clone()));

        let mut state = self.state.clone();
        state.insert("root".to_string(), Value::Object(root));

        return Value::Object(state);
    }

    pub fn selection(&self) -> Option<usize> {
        return self.selection;
    }

    /// Appends a paragraph after the last block and selects it. Returns the
    /// index of the new block.
    pub fn append_paragraph(&mut self, text: &str) -> usize {
        self.blocks.push(paragraph_node(text));
        let idx = self.blocks.len() - 1;
        self.selection = Some(idx);

        return idx;
    }

    pub fn plain_text(&self) -> String {
        return self
            .blocks
            .iter()
            .map(|block| {
                let mut text = String::new();
                collect_text(block, &mut text);
                return text;
            })
            .collect::<Vec<String>>()
            .join("\n");
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => return "null",
        Value::Bool(_) => return "a boolean",
        Value::Number(_) => return "a number",
        Value::String(_) => return "a string",
        Value::Array(_) => return "an array",
        Value::Object(_) => return "an object",
    }
}
