//! Flattening of parameter objects into string pairs, and the
//! `application/x-www-form-urlencoded` body encoder.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde_json::Value;

use crate::error::{Error, Result};

/// Bytes left untouched by `encodeURIComponent`.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Render a parameter value the way it is sent on the wire.
///
/// Strings are kept verbatim. Nested objects and arrays are serialized as
/// JSON.
pub fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Flatten a parameter object into ordered key/value pairs.
///
/// Array values yield one pair per element, in element order.
pub fn param_pairs(params: &Value) -> Result<Vec<(String, String)>> {
    let Value::Object(map) = params else {
        return Err(Error::InvalidParams(format!(
            "expected an object of parameters, got {params}"
        )));
    };

    let mut pairs = Vec::with_capacity(map.len());
    for (key, value) in map {
        match value {
            Value::Array(items) => {
                pairs.extend(items.iter().map(|item| (key.clone(), stringify(item))));
            }
            other => pairs.push((key.clone(), stringify(other))),
        }
    }
    Ok(pairs)
}

/// Encode an object as a url-encoded form body.
///
/// Keys keep their insertion order. Keys and values are escaped like
/// `encodeURIComponent`, so a space becomes `%20`, not `+`.
pub fn form_url(fields: &Value) -> Result<String> {
    let Value::Object(map) = fields else {
        return Err(Error::InvalidParams(format!(
            "expected an object of form fields, got {fields}"
        )));
    };

    let encoded: Vec<String> = map
        .iter()
        .map(|(key, value)| {
            format!(
                "{}={}",
                utf8_percent_encode(key, URI_COMPONENT),
                utf8_percent_encode(&stringify(value), URI_COMPONENT)
            )
        })
        .collect();
    Ok(encoded.join("&"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_form_url_reference_encoding() {
        let fields = json!({ "a": 1, "b": 2, " c": " 3", "d": { "a": 1 } });

        assert_eq!(
            form_url(&fields).unwrap(),
            "a=1&b=2&%20c=%203&d=%7B%22a%22%3A1%7D"
        );
    }

    #[test]
    fn test_form_url_keeps_unreserved_marks() {
        let fields = json!({ "mark": "a-b_c.d!e~f*g'h(i)" });

        assert_eq!(form_url(&fields).unwrap(), "mark=a-b_c.d!e~f*g'h(i)");
    }

    #[test]
    fn test_form_url_rejects_scalars() {
        assert!(matches!(form_url(&json!(3)), Err(Error::InvalidParams(_))));
    }

    #[test]
    fn test_param_pairs_repeats_array_keys() {
        let pairs = param_pairs(&json!({ "c": 6, "d": [7, 8] })).unwrap();

        assert_eq!(
            pairs,
            vec![
                ("c".to_string(), "6".to_string()),
                ("d".to_string(), "7".to_string()),
                ("d".to_string(), "8".to_string()),
            ]
        );
    }

    #[test]
    fn test_stringify_scalars() {
        assert_eq!(stringify(&json!("1!")), "1!");
        assert_eq!(stringify(&json!(true)), "true");
        assert_eq!(stringify(&json!(null)), "null");
        assert_eq!(stringify(&json!([1, 2])), "[1,2]");
    }
}
