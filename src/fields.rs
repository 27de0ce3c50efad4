//! Tolerant field extraction for backend JSON.
//!
//! The backend answers with two casings for the same field depending on the
//! endpoint (`saldoInicial` from one path, `SaldoInicial` from another).
//! Every response shape declares one [`FieldMap`] mapping a canonical name to
//! its variant keys in preference order, and all reads go through it.

use serde_json::{Map, Value};

/// Canonical name → variant keys, first match wins.
pub struct FieldMap {
    entries: &'static [(&'static str, &'static [&'static str])],
}

impl FieldMap {
    pub const fn new(entries: &'static [(&'static str, &'static [&'static str])]) -> Self {
        Self { entries }
    }

    /// Variant keys for a canonical field, or an empty slice if the shape
    /// does not declare it.
    pub fn keys(&self, canonical: &str) -> &'static [&'static str] {
        let found = self.entries.iter().find(|(name, _)| *name == canonical);
        debug_assert!(found.is_some(), "undeclared field {canonical}");
        found.map(|(_, keys)| *keys).unwrap_or(&[])
    }

    /// First variant whose value `read` accepts. Values of the wrong shape
    /// do not hide later variants.
    fn first_readable<'a, T>(
        &self,
        v: &'a Value,
        canonical: &str,
        read: impl Fn(&'a Value) -> Option<T>,
    ) -> Option<T> {
        self.keys(canonical)
            .iter()
            .filter_map(|key| v.get(*key))
            .find_map(read)
    }

    /// First present, non-null value among the variants.
    pub fn get<'a>(&self, v: &'a Value, canonical: &str) -> Option<&'a Value> {
        self.keys(canonical)
            .iter()
            .filter_map(|key| v.get(*key))
            .find(|value| !value.is_null())
    }

    pub fn number(&self, v: &Value, canonical: &str) -> Option<f64> {
        self.get(v, canonical).and_then(as_number)
    }

    /// Like [`FieldMap::number`] but absent or unreadable fields count as zero.
    pub fn amount(&self, v: &Value, canonical: &str) -> f64 {
        self.number(v, canonical).unwrap_or(0.0)
    }

    pub fn integer(&self, v: &Value, canonical: &str) -> Option<i64> {
        self.get(v, canonical).and_then(|value| {
            value
                .as_i64()
                .or_else(|| value.as_f64().map(|n| n as i64))
                .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
        })
    }

    pub fn text(&self, v: &Value, canonical: &str) -> Option<String> {
        self.first_readable(v, canonical, as_text)
    }

    pub fn boolean(&self, v: &Value, canonical: &str) -> Option<bool> {
        self.get(v, canonical).and_then(|value| match value {
            Value::Bool(b) => Some(*b),
            Value::Number(n) => n.as_i64().map(|n| n != 0),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" | "si" | "sí" => Some(true),
                "false" | "0" | "no" => Some(false),
                _ => None,
            },
            _ => None,
        })
    }

    pub fn object<'a>(&self, v: &'a Value, canonical: &str) -> Option<&'a Map<String, Value>> {
        self.first_readable(v, canonical, Value::as_object)
    }
}

/// Numbers and numeric strings; anything else is unreadable.
pub fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    }
}

/// Identifiers arrive as strings or numbers; both become trimmed text.
pub fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SHAPE: FieldMap = FieldMap::new(&[
        ("opening", &["saldoInicial", "SaldoInicial"]),
        ("id", &["id", "Id"]),
        ("flag", &["activo", "Activo"]),
    ]);

    #[test]
    fn lowercase_variant_wins_over_capitalized() {
        let v = json!({ "saldoInicial": 10.0, "SaldoInicial": 99.0 });
        assert_eq!(SHAPE.number(&v, "opening"), Some(10.0));
    }

    #[test]
    fn null_variant_falls_through_to_next() {
        let v = json!({ "saldoInicial": null, "SaldoInicial": 42.5 });
        assert_eq!(SHAPE.number(&v, "opening"), Some(42.5));
    }

    #[test]
    fn missing_amount_defaults_to_zero() {
        assert_eq!(SHAPE.amount(&json!({}), "opening"), 0.0);
        assert_eq!(SHAPE.amount(&json!({ "saldoInicial": "abc" }), "opening"), 0.0);
    }

    #[test]
    fn numeric_strings_are_numbers() {
        let v = json!({ "SaldoInicial": " 120.50 " });
        assert_eq!(SHAPE.number(&v, "opening"), Some(120.5));
    }

    #[test]
    fn numeric_ids_become_text() {
        assert_eq!(SHAPE.text(&json!({ "Id": 7 }), "id").as_deref(), Some("7"));
        assert_eq!(SHAPE.text(&json!({ "id": "  " }), "id"), None);
    }

    #[test]
    fn text_skips_variants_of_the_wrong_shape() {
        let v = json!({ "id": { "nested": 1 }, "Id": "c-3" });
        assert_eq!(SHAPE.text(&v, "id").as_deref(), Some("c-3"));
    }

    #[test]
    fn booleans_accept_flags_and_words() {
        assert_eq!(SHAPE.boolean(&json!({ "activo": 1 }), "flag"), Some(true));
        assert_eq!(SHAPE.boolean(&json!({ "Activo": "false" }), "flag"), Some(false));
    }
}
