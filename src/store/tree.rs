use serde_json::{Map, Value};

pub fn get_at<'a>(root: &'a Value, path: &[&str]) -> Option<&'a Value> {
    let mut cursor = root;
    for key in path {
        cursor = cursor.as_object()?.get(*key)?;
    }
    if cursor.is_null() { None } else { Some(cursor) }
}

fn remove_at(node: &mut Value, path: &[&str]) {
    let Some((head, tail)) = path.split_first() else {
        *node = Value::Null;
        return;
    };
    let Some(obj) = node.as_object_mut() else {
        return;
    };
    if tail.is_empty() {
        obj.remove(*head);
        return;
    }
    let Some(child) = obj.get_mut(*head) else {
        return;
    };
    remove_at(child, tail);
    // Empty branches do not exist in the tree.
    if child.is_null() || child.as_object().is_some_and(Map::is_empty) {
        obj.remove(*head);
    }
}

/// Set `value` at `path`, creating intermediate objects. `null` removes.
pub fn set_at(root: &mut Value, path: &[&str], value: Value) {
    if value.is_null() {
        remove_at(root, path);
        return;
    }
    let Some((last, parents)) = path.split_last() else {
        *root = value;
        return;
    };

    let mut cursor = root;
    for key in parents {
        if !cursor.is_object() {
            *cursor = Value::Object(Map::new());
        }
        let Some(obj) = cursor.as_object_mut() else {
            return;
        };
        cursor = obj
            .entry((*key).to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }

    if !cursor.is_object() {
        *cursor = Value::Object(Map::new());
    }
    if let Some(obj) = cursor.as_object_mut() {
        obj.insert((*last).to_string(), value);
    }
}
