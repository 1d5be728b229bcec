use serde_json::json;
use serde_json::Value;

/// Editor snapshot with a heading and a paragraph split by a linebreak. Carries
/// fields the engine does not interpret, which must survive a load.
pub fn lexical_fixture() -> &'static str {
    return r#"
{
  "root": {
    "children": [
      {
        "children": [
          {
            "detail": 0,
            "format": 1,
            "mode": "normal",
            "style": "",
            "text": "Shopping list",
            "type": "text",
            "version": 1
          }
        ],
        "direction": "ltr",
        "format": "",
        "indent": 0,
        "tag": "h1",
        "type": "heading",
        "version": 1
      },
      {
        "children": [
          {
            "detail": 0,
            "format": 0,
            "mode": "normal",
            "style": "",
            "text": "Eggs",
            "type": "text",
            "version": 1
          },
          {
            "type": "linebreak",
            "version": 1
          },
          {
            "detail": 0,
            "format": 2,
            "mode": "normal",
            "style": "color: red;",
            "text": "Milk",
            "type": "text",
            "version": 1
          }
        ],
        "direction": "ltr",
        "format": "",
        "indent": 0,
        "type": "paragraph",
        "version": 1
      }
    ],
    "direction": "ltr",
    "format": "",
    "indent": 0,
    "type": "root",
    "version": 1
  },
  "selectionHint": "end"
}
"#
    .trim();
}

/// A post record the way the document API returns it.
pub fn record(id: &str, title: &str) -> Value {
    return json!({
        "id": id,
        "title": title,
        "content": {},
        "status": "draft",
        "created_at": "2024-01-15T10:30:00Z",
        "updated_at": "2024-01-15T10:30:00Z",
    });
}
