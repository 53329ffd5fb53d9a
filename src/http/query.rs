// Query string / form body parsing
// Expands bracket keys into nested maps and lists:
//   a[b]=1        -> {"a": {"b": "1"}}
//   a[]=1&a[]=2   -> {"a": ["1", "2"]}

use serde_json::{Map, Value};
use std::collections::HashMap;

use crate::store::ParamMap;

/// Keys nested deeper than this are dropped, as PHP's `max_input_nesting_level`
const MAX_NESTING: usize = 64;

/// Decode `application/x-www-form-urlencoded` data into a nested map
pub fn parse_nested(input: &[u8]) -> ParamMap {
    let mut root = Branch::new();
    for (raw_key, value) in form_urlencoded::parse(input) {
        let Some((base, path)) = split_key(&raw_key) else {
            continue;
        };
        if base.is_empty() {
            continue;
        }
        root.slot(base.to_string()).insert(&path, value.into_owned());
    }
    root.into_map()
}

/// Split `a[b][]` into `("a", ["b", ""])`; malformed brackets keep the raw key.
/// `None` when the key nests past `MAX_NESTING`.
fn split_key(raw: &str) -> Option<(&str, Vec<&str>)> {
    let Some(open) = raw.find('[') else {
        return Some((raw, Vec::new()));
    };

    let mut segments = Vec::new();
    let mut rest = &raw[open..];
    while let Some(inner) = rest.strip_prefix('[') {
        let Some(close) = inner.find(']') else {
            break;
        };
        if segments.len() == MAX_NESTING {
            return None;
        }
        segments.push(&inner[..close]);
        rest = &inner[close + 1..];
    }

    if segments.is_empty() {
        Some((raw, Vec::new()))
    } else {
        Some((&raw[..open], segments))
    }
}

/// Canonical decimal keys (`0`, `17`, not `007` or `+1`) count as list indexes
fn index_key(key: &str) -> Option<usize> {
    let canonical = !key.is_empty()
        && key.bytes().all(|b| b.is_ascii_digit())
        && (key == "0" || !key.starts_with('0'));
    if canonical {
        key.parse().ok()
    } else {
        None
    }
}

enum Node {
    Leaf(String),
    Branch(Branch),
}

/// Insertion-ordered map that tracks the index the next `[]` key receives
struct Branch {
    positions: HashMap<String, usize>,
    entries: Vec<(String, Node)>,
    /// `None` once an index of `usize::MAX` has been used
    next_index: Option<usize>,
}

impl Branch {
    fn new() -> Self {
        Self {
            positions: HashMap::new(),
            entries: Vec::new(),
            next_index: Some(0),
        }
    }

    /// Node stored under `key`; a new key keeps its first insertion position
    fn slot(&mut self, key: String) -> &mut Node {
        if let (Some(index), Some(next)) = (index_key(&key), self.next_index) {
            if index >= next {
                self.next_index = index.checked_add(1);
            }
        }

        let position = if let Some(&position) = self.positions.get(&key) {
            position
        } else {
            let position = self.entries.len();
            self.positions.insert(key.clone(), position);
            self.entries.push((key, Node::Leaf(String::new())));
            position
        };
        &mut self.entries[position].1
    }

    fn into_map(self) -> Map<String, Value> {
        self.entries
            .into_iter()
            .map(|(key, node)| (key, node.into_value()))
            .collect()
    }

    /// Branches keyed exactly 0..n in order become lists
    fn into_value(self) -> Value {
        let sequential = !self.entries.is_empty()
            && self
                .entries
                .iter()
                .enumerate()
                .all(|(i, (key, _))| index_key(key) == Some(i));
        if sequential {
            Value::Array(self.entries.into_iter().map(|(_, node)| node.into_value()).collect())
        } else {
            Value::Object(self.into_map())
        }
    }
}

impl Node {
    fn insert(&mut self, path: &[&str], value: String) {
        let Some((next, rest)) = path.split_first() else {
            *self = Self::Leaf(value);
            return;
        };

        if let Self::Leaf(_) = self {
            *self = Self::Branch(Branch::new());
        }
        if let Self::Branch(branch) = self {
            let key = if next.is_empty() {
                // No index left after usize::MAX; the pair is dropped
                let Some(index) = branch.next_index else {
                    return;
                };
                index.to_string()
            } else {
                (*next).to_string()
            };
            branch.slot(key).insert(rest, value);
        }
    }

    fn into_value(self) -> Value {
        match self {
            Self::Leaf(value) => Value::String(value),
            Self::Branch(branch) => branch.into_value(),
        }
    }
}
