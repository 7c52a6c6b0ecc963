use crate::domain::reference::VideoReference;
use serde_json::Value;
use std::fs;
use std::path::Path;

/// Field name looked up in each line of a newline-delimited input file.
const FILE_VIDEOS_FIELD: &str = "videos";

/// Turn one raw input item into zero or more references.
///
/// Priority order:
/// 1. an existing file: newline-delimited JSON objects, `videos` arrays
/// 2. a JSON literal (detected by the presence of any bracket/brace)
/// 3. the literal itself as a single reference
///
/// Malformed JSON never fails the run; it just contributes nothing.
pub fn extract(item: &str, input_key: &str) -> Vec<VideoReference> {
    if Path::new(item).is_file() {
        return extract_from_file(item);
    }

    if item.contains(['[', ']', '{', '}']) {
        return extract_from_json_literal(item, input_key);
    }

    // plain video URL or platform ID
    vec![VideoReference::new(item)]
}

fn extract_from_file(path: &str) -> Vec<VideoReference> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(_) => return Vec::new(),
    };

    let mut references = Vec::new();
    for line in contents.lines() {
        if line.trim().is_empty() {
            continue;
        }
        let Ok(object) = serde_json::from_str::<Value>(line) else {
            continue;
        };
        // only objects with a non-empty `videos` array contribute
        if let Some(videos) = object.get(FILE_VIDEOS_FIELD).and_then(Value::as_array) {
            references.extend(videos.iter().map(value_to_reference));
        }
    }
    references
}

fn extract_from_json_literal(item: &str, input_key: &str) -> Vec<VideoReference> {
    let Ok(data) = serde_json::from_str::<Value>(item) else {
        // not JSON after all; skip silently
        return Vec::new();
    };

    match data {
        Value::Array(ref items) if !items.is_empty() => items
            .iter()
            .filter_map(|element| match element {
                Value::String(reference) => Some(VideoReference::new(reference.clone())),
                Value::Object(_) => resolve_path(element, input_key).map(value_to_reference),
                _ => None,
            })
            .collect(),
        Value::Object(ref fields) if !fields.is_empty() => resolve_path(&data, input_key)
            .map(value_to_reference)
            .into_iter()
            .collect(),
        // empty array/object or scalar: nothing to extract
        _ => Vec::new(),
    }
}

/// A resolved string emits its contents; any other resolved value is
/// rendered as compact JSON and occupies a single reference slot.
fn value_to_reference(value: &Value) -> VideoReference {
    match value {
        Value::String(reference) => VideoReference::new(reference.clone()),
        other => VideoReference::new(other.to_string()),
    }
}

enum PathSegment {
    Key(String),
    Index(usize),
}

/// Walk a dotted/bracketed path (`a.b`, `a[0].b`, `a["b"]`) into a JSON value.
fn resolve_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = value;
    for segment in path_segments(path) {
        current = match segment {
            PathSegment::Key(key) => current.get(key.as_str())?,
            PathSegment::Index(index) => current.get(index)?,
        };
    }
    Some(current)
}

fn path_segments(path: &str) -> Vec<PathSegment> {
    let mut segments = Vec::new();
    let mut buffer = String::new();
    let mut chars = path.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '.' => {
                if !buffer.is_empty() {
                    segments.push(PathSegment::Key(std::mem::take(&mut buffer)));
                }
            }
            '[' => {
                if !buffer.is_empty() {
                    segments.push(PathSegment::Key(std::mem::take(&mut buffer)));
                }
                let mut inner = String::new();
                for c in chars.by_ref() {
                    if c == ']' {
                        break;
                    }
                    inner.push(c);
                }
                let inner = inner.trim_matches(|c| c == '"' || c == '\'');
                match inner.parse::<usize>() {
                    Ok(index) => segments.push(PathSegment::Index(index)),
                    Err(_) => segments.push(PathSegment::Key(inner.to_owned())),
                }
            }
            _ => buffer.push(c),
        }
    }
    if !buffer.is_empty() {
        segments.push(PathSegment::Key(buffer));
    }
    segments
}
