use bytes::Bytes;
use serde_json::Value;

/// Request payload handed to the transport.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Text(String),
    Bytes(Bytes),
    /// Multipart form. The transport chooses the boundary.
    Form(FormData),
}

impl Body {
    /// Raw bytes of a text or binary body. Multipart forms have no
    /// canonical encoding before the transport writes them.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Body::Text(text) => Some(text.as_bytes()),
            Body::Bytes(bytes) => Some(bytes),
            Body::Form(_) => None,
        }
    }
}

impl From<String> for Body {
    fn from(text: String) -> Self {
        Body::Text(text)
    }
}

impl From<&str> for Body {
    fn from(text: &str) -> Self {
        Body::Text(text.to_owned())
    }
}

impl From<Bytes> for Body {
    fn from(bytes: Bytes) -> Self {
        Body::Bytes(bytes)
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self {
        Body::Bytes(Bytes::from(bytes))
    }
}

impl From<FormData> for Body {
    fn from(form: FormData) -> Self {
        Body::Form(form)
    }
}

/// Input of a url-encoded form body: either an already encoded string,
/// sent untouched, or an object of fields to encode.
#[derive(Debug, Clone, PartialEq)]
pub enum FormUrl {
    Encoded(String),
    Fields(Value),
}

impl From<&str> for FormUrl {
    fn from(encoded: &str) -> Self {
        FormUrl::Encoded(encoded.to_owned())
    }
}

impl From<String> for FormUrl {
    fn from(encoded: String) -> Self {
        FormUrl::Encoded(encoded)
    }
}

impl From<Value> for FormUrl {
    fn from(fields: Value) -> Self {
        match fields {
            Value::String(encoded) => FormUrl::Encoded(encoded),
            other => FormUrl::Fields(other),
        }
    }
}

/// One value of a multipart form entry.
#[derive(Debug, Clone, PartialEq)]
pub enum FormValue {
    Text(String),
    File {
        file_name: Option<String>,
        content_type: Option<String>,
        bytes: Bytes,
    },
}

impl FormValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FormValue::Text(text) => Some(text),
            FormValue::File { .. } => None,
        }
    }
}

impl From<String> for FormValue {
    fn from(text: String) -> Self {
        FormValue::Text(text)
    }
}

impl From<&str> for FormValue {
    fn from(text: &str) -> Self {
        FormValue::Text(text.to_owned())
    }
}

/// Ordered multipart container. A name may appear more than once.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormData {
    entries: Vec<(String, FormValue)>,
}

impl FormData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, name: impl Into<String>, value: impl Into<FormValue>) {
        self.entries.push((name.into(), value.into()));
    }

    /// First value stored under `name`.
    pub fn get(&self, name: &str) -> Option<&FormValue> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a FormValue> + 'a {
        self.entries
            .iter()
            .filter(move |(key, _)| key == name)
            .map(|(_, value)| value)
    }

    pub fn entries(&self) -> &[(String, FormValue)] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<(String, FormValue)> {
        self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Decode an `application/x-www-form-urlencoded` payload.
    pub fn parse_urlencoded(input: &[u8]) -> Self {
        let entries = form_urlencoded::parse(input)
            .map(|(key, value)| (key.into_owned(), FormValue::Text(value.into_owned())))
            .collect();
        Self { entries }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_form_data_keeps_repeated_names() {
        let mut form = FormData::new();
        form.append("arr", "1");
        form.append("arr", "2");
        form.append("duck", "Muscovy");

        let arr: Vec<_> = form.get_all("arr").filter_map(FormValue::as_text).collect();
        assert_eq!(arr, vec!["1", "2"]);
        assert_eq!(form.get("duck").and_then(FormValue::as_text), Some("Muscovy"));
        assert_eq!(form.len(), 3);
    }

    #[test]
    fn test_parse_urlencoded() {
        let form = FormData::parse_urlencoded(b"hello=world&duck=Muscovy+duck");

        assert_eq!(form.get("hello").and_then(FormValue::as_text), Some("world"));
        assert_eq!(form.get("duck").and_then(FormValue::as_text), Some("Muscovy duck"));
    }

    #[test]
    fn test_form_url_from_string_value_is_encoded() {
        assert_eq!(
            FormUrl::from(json!("a=1")),
            FormUrl::Encoded("a=1".to_string())
        );
        assert!(matches!(FormUrl::from(json!({ "a": 1 })), FormUrl::Fields(_)));
    }

    #[test]
    fn test_body_bytes() {
        assert_eq!(Body::from("hi").as_bytes(), Some(&b"hi"[..]));
        assert_eq!(Body::from(FormData::new()).as_bytes(), None);
    }
}
