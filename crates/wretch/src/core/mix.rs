use serde_json::Value;

/// Deep-merge two option trees into a fresh one.
///
/// Keys of `two` win over keys of `one`. Nested objects merge key by key.
/// Arrays found on both sides are replaced by `two`'s array, or
/// concatenated when `concat` is set. If either side is not an object,
/// `one` is returned as is.
///
/// Neither input is modified.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use wretch::mix;
///
/// let one = json!({ "a": 1, "c": [3, 4] });
/// let two = json!({ "a": 0, "c": [5, 6] });
///
/// assert_eq!(mix(&one, &two, false), json!({ "a": 0, "c": [5, 6] }));
/// assert_eq!(mix(&one, &two, true), json!({ "a": 0, "c": [3, 4, 5, 6] }));
/// ```
pub fn mix(one: &Value, two: &Value, concat: bool) -> Value {
    let (Value::Object(left), Value::Object(right)) = (one, two) else {
        return one.clone();
    };

    let mut merged = left.clone();
    for (key, incoming) in right {
        let value = match (left.get(key), incoming) {
            (Some(Value::Array(current)), Value::Array(extra)) if concat => {
                Value::Array(current.iter().chain(extra).cloned().collect())
            }
            (Some(current @ Value::Object(_)), Value::Object(_)) => mix(current, incoming, concat),
            _ => incoming.clone(),
        };
        merged.insert(key.clone(), value);
    }
    Value::Object(merged)
}
