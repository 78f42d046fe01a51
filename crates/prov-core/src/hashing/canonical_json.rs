//! Canonical JSON minimal: claves de objeto ordenadas, sin whitespace.
//! Suficiente para que dos procesos deriven el mismo tx-id del mismo input.

use serde_json::Value;
use std::collections::BTreeMap;

pub fn to_canonical_json(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => serde_json::to_string(s).unwrap_or_default(),
        Value::Array(arr) => {
            let items: Vec<String> = arr.iter().map(to_canonical_json).collect();
            format!("[{}]", items.join(","))
        }
        Value::Object(map) => {
            let tree: BTreeMap<&String, String> =
                map.iter().map(|(k, v)| (k, to_canonical_json(v))).collect();
            let items: Vec<String> = tree.into_iter()
                                         .map(|(k, v)| {
                                             format!("{}:{}",
                                                     serde_json::to_string(k).unwrap_or_default(),
                                                     v)
                                         })
                                         .collect();
            format!("{{{}}}", items.join(","))
        }
    }
}
