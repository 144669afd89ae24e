//! Speech tree walker.
//!
//! Debate documents are irregular: a node is a container if it carries a
//! `children` field, a speech if it has a speaker name plus `text` or `body`,
//! and noise otherwise. The shape is resolved once in [`DebateNode::parse`];
//! traversal then matches on the variant.

use hansard_common::{House, SpeechRecord};
use serde_json::{Map, Value};
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DebateNode {
    Container {
        title: Option<String>,
        children: Vec<DebateNode>,
    },
    Speech {
        member: String,
        party: Option<String>,
        text: String,
    },
    /// Neither shape. Kept so sibling order is preserved; yields nothing.
    Skipped,
}

impl DebateNode {
    pub fn parse(value: &Value) -> DebateNode {
        match value {
            Value::Array(items) => DebateNode::Container {
                title: None,
                children: items.iter().map(DebateNode::parse).collect(),
            },
            Value::Object(map) => Self::parse_object(map),
            _ => DebateNode::Skipped,
        }
    }

    fn parse_object(map: &Map<String, Value>) -> DebateNode {
        if let Some(children) = map.get("children") {
            let title = string_field(map, "title");
            return match children {
                Value::Array(items) => DebateNode::Container {
                    title,
                    children: items.iter().map(DebateNode::parse).collect(),
                },
                Value::Null => DebateNode::Container {
                    title,
                    children: Vec::new(),
                },
                other => {
                    warn!(
                        title = title.as_deref().unwrap_or(""),
                        kind = json_kind(other),
                        "Malformed node: `children` is not a list, skipping subtree"
                    );
                    DebateNode::Skipped
                }
            };
        }

        let (member, party) = speaker_of(map);
        let text = string_field(map, "text").or_else(|| string_field(map, "body"));
        if let (Some(member), Some(text)) = (member, text) {
            return DebateNode::Speech {
                member,
                party,
                text,
            };
        }

        // Wrapper objects such as `{"section": {...}}` carry the real node one level down.
        if map.len() == 1 {
            if let Some(inner @ (Value::Object(_) | Value::Array(_))) = map.values().next() {
                return DebateNode::parse(inner);
            }
        }

        debug!(keys = ?map.keys().collect::<Vec<_>>(), "Skipping node with no children and no speech");
        DebateNode::Skipped
    }

    /// First non-empty container title, depth-first.
    pub fn title(&self) -> Option<&str> {
        match self {
            DebateNode::Container { title: Some(t), .. } => Some(t.as_str()),
            DebateNode::Container { children, .. } => children.iter().find_map(|c| c.title()),
            _ => None,
        }
    }
}

fn string_field(map: &Map<String, Value>, key: &str) -> Option<String> {
    map.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// `speaker` is usually `{"name": .., "party": ..}`; older records use a plain string.
fn speaker_of(map: &Map<String, Value>) -> (Option<String>, Option<String>) {
    match map.get("speaker") {
        Some(Value::Object(speaker)) => (
            string_field(speaker, "name"),
            string_field(speaker, "party"),
        ),
        Some(Value::String(name)) if !name.trim().is_empty() => {
            (Some(name.trim().to_string()), string_field(map, "party"))
        }
        _ => (None, None),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Lazy pre-order walk over a parsed tree, yielding speeches in document order.
pub struct SpeechWalker<'a> {
    stack: Vec<&'a DebateNode>,
    house: House,
    debate_title: &'a str,
}

impl<'a> Iterator for SpeechWalker<'a> {
    type Item = SpeechRecord;

    fn next(&mut self) -> Option<SpeechRecord> {
        while let Some(node) = self.stack.pop() {
            match node {
                DebateNode::Container { children, .. } => {
                    self.stack.extend(children.iter().rev());
                }
                DebateNode::Speech {
                    member,
                    party,
                    text,
                } => {
                    return Some(SpeechRecord {
                        house: self.house,
                        debate_title: self.debate_title.to_string(),
                        member: member.clone(),
                        party: party.clone(),
                        text: text.clone(),
                    });
                }
                DebateNode::Skipped => {}
            }
        }
        None
    }
}

/// Walk one debate. `house` is attached to every record; the walk has no
/// state beyond the tree, so calling it twice yields the same sequence.
pub fn walk<'a>(root: &'a DebateNode, house: House, debate_title: &'a str) -> SpeechWalker<'a> {
    SpeechWalker {
        stack: vec![root],
        house,
        debate_title,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn members(root: &DebateNode) -> Vec<String> {
        walk(root, House::Commons, "Debate")
            .map(|s| s.member)
            .collect()
    }

    #[test]
    fn walks_nested_speeches_in_document_order() {
        let doc = json!({
            "title": "Aliens Bill",
            "children": [
                {"speaker": {"name": "Mr. A", "party": "Liberal"}, "text": "first"},
                {"title": "Clause 1", "children": [
                    {"speaker": {"name": "Mr. B"}, "body": "second"},
                    {"children": [{"speaker": "Mr. C", "text": "third"}]}
                ]},
                {"speaker": {"name": "Mr. D"}, "text": "fourth"}
            ]
        });
        let root = DebateNode::parse(&doc);
        assert_eq!(members(&root), vec!["Mr. A", "Mr. B", "Mr. C", "Mr. D"]);

        let first = walk(&root, House::Lords, "Aliens Bill").next().unwrap();
        assert_eq!(first.house, House::Lords);
        assert_eq!(first.party.as_deref(), Some("Liberal"));
        assert_eq!(first.debate_title, "Aliens Bill");
        assert_eq!(root.title(), Some("Aliens Bill"));
    }

    #[test]
    fn shapeless_nodes_are_skipped_and_siblings_still_walked() {
        let doc = json!({
            "children": [
                {"title": "Orders of the Day"},
                {"speaker": {"name": "Mr. A"}},
                {"text": "anonymous text"},
                {"speaker": {"name": "Mr. B"}, "text": "kept"},
                42,
                null
            ]
        });
        let root = DebateNode::parse(&doc);
        assert_eq!(members(&root), vec!["Mr. B"]);
    }

    #[test]
    fn children_wins_over_speech_fields() {
        let doc = json!({
            "speaker": {"name": "Mr. Outer"},
            "text": "outer text",
            "children": [{"speaker": {"name": "Mr. Inner"}, "text": "inner"}]
        });
        assert_eq!(members(&DebateNode::parse(&doc)), vec!["Mr. Inner"]);
    }

    #[test]
    fn malformed_children_skip_only_that_subtree() {
        let doc = json!([
            {"children": "not a list"},
            {"speaker": {"name": "Mr. B"}, "text": "kept"}
        ]);
        assert_eq!(members(&DebateNode::parse(&doc)), vec!["Mr. B"]);
    }

    #[test]
    fn wrappers_are_unwrapped() {
        let doc = json!({"section": {"title": "Aliens", "children": [
            {"speaker": {"name": "Mr. A"}, "text": "hello"}
        ]}});
        let root = DebateNode::parse(&doc);
        assert_eq!(members(&root), vec!["Mr. A"]);
        assert_eq!(root.title(), Some("Aliens"));
    }

    #[test]
    fn walk_is_restartable() {
        let doc = json!({"children": [
            {"speaker": {"name": "Mr. A"}, "text": "one"},
            {"speaker": {"name": "Mr. B"}, "text": "two"}
        ]});
        let root = DebateNode::parse(&doc);
        let first: Vec<_> = walk(&root, House::Commons, "t").collect();
        let second: Vec<_> = walk(&root, House::Commons, "t").collect();
        assert_eq!(first, second);
    }
}
