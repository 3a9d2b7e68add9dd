//! Table-driven mapping of inbound form fields onto the normalized contact
//! columns. Submitted field names vary wildly between sources (and
//! languages), so each canonical field carries an ordered list of candidate
//! substrings; matching is case-insensitive containment, first canonical in
//! priority order wins, and everything unmatched is preserved verbatim in
//! `extra_data`.

use serde_json::{Map, Value};

use leadflow_store::models::Category;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactField {
    FirstName,
    LastName,
    Email,
    Phone,
    PostalCode,
    City,
}

pub struct FieldMatcher {
    rules: Vec<(ContactField, Vec<&'static str>)>,
}

impl Default for FieldMatcher {
    fn default() -> Self {
        Self {
            rules: vec![
                (
                    ContactField::FirstName,
                    vec!["first_name", "firstname", "first name", "vorname"],
                ),
                (
                    ContactField::LastName,
                    vec!["last_name", "lastname", "surname", "nachname", "name"],
                ),
                (ContactField::Email, vec!["email", "e-mail", "mail"]),
                (
                    ContactField::Phone,
                    vec!["phone", "telefon", "mobil", "handy", "tel"],
                ),
                (
                    ContactField::PostalCode,
                    vec!["postal_code", "postleitzahl", "plz", "zip"],
                ),
                (
                    ContactField::City,
                    vec!["city", "stadt", "wohnort", "ort"],
                ),
            ],
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct NormalizedFields {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub postal_code: Option<String>,
    pub city: Option<String>,
    /// Every submitted field that did not map to a contact column.
    pub extra_data: Map<String, Value>,
}

impl FieldMatcher {
    /// Map a raw submission onto the contact columns. Each canonical field
    /// takes the first matching submitted key; a submitted key feeds at most
    /// one canonical field.
    pub fn normalize(&self, fields: &Map<String, Value>) -> NormalizedFields {
        let mut out = NormalizedFields::default();
        let mut consumed: Vec<&str> = Vec::new();

        for (canonical, synonyms) in &self.rules {
            let matched = fields.iter().find(|(key, _)| {
                if consumed.contains(&key.as_str()) {
                    return false;
                }
                let lower = key.to_lowercase();
                synonyms.iter().any(|syn| lower.contains(syn))
            });

            if let Some((key, value)) = matched {
                consumed.push(key.as_str());
                let text = value_text(value);
                match canonical {
                    ContactField::FirstName => out.first_name = Some(text),
                    ContactField::LastName => out.last_name = Some(text),
                    ContactField::Email => out.email = Some(text),
                    ContactField::Phone => out.phone = Some(text),
                    ContactField::PostalCode => out.postal_code = Some(text),
                    ContactField::City => out.city = Some(text),
                }
            }
        }

        for (key, value) in fields {
            if !consumed.contains(&key.as_str()) {
                out.extra_data.insert(key.clone(), value.clone());
            }
        }

        out
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        other => other.to_string(),
    }
}

/// Match a submitted form/category name against the configured categories by
/// case-insensitive substring (either direction). Falls back to the first
/// configured category.
pub fn match_category(categories: &[Category], submitted: Option<&str>) -> Option<Uuid> {
    let fallback = categories.first().map(|c| c.id);
    let Some(submitted) = submitted else {
        return fallback;
    };
    let needle = submitted.trim().to_lowercase();
    if needle.is_empty() {
        return fallback;
    }

    categories
        .iter()
        .find(|c| {
            let name = c.name.to_lowercase();
            needle.contains(&name) || name.contains(&needle)
        })
        .map(|c| c.id)
        .or(fallback)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn fields(pairs: &[(&str, &str)]) -> Map<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
            .collect()
    }

    fn category(name: &str, position: i32) -> Category {
        Category {
            id: Uuid::new_v4(),
            name: name.to_string(),
            position,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn maps_english_fields() {
        let m = FieldMatcher::default();
        let out = m.normalize(&fields(&[
            ("first_name", "Jane"),
            ("last_name", "Doe"),
            ("email", "jane@example.com"),
            ("phone", "+4915112345678"),
            ("zip", "10115"),
            ("city", "Berlin"),
        ]));
        assert_eq!(out.first_name.as_deref(), Some("Jane"));
        assert_eq!(out.last_name.as_deref(), Some("Doe"));
        assert_eq!(out.email.as_deref(), Some("jane@example.com"));
        assert_eq!(out.phone.as_deref(), Some("+4915112345678"));
        assert_eq!(out.postal_code.as_deref(), Some("10115"));
        assert_eq!(out.city.as_deref(), Some("Berlin"));
        assert!(out.extra_data.is_empty());
    }

    #[test]
    fn maps_localized_fields() {
        let m = FieldMatcher::default();
        let out = m.normalize(&fields(&[
            ("Vorname", "Hans"),
            ("Nachname", "Meier"),
            ("E-Mail", "hans@example.de"),
            ("Telefon", "030123456"),
            ("PLZ", "80331"),
            ("Wohnort", "München"),
        ]));
        assert_eq!(out.first_name.as_deref(), Some("Hans"));
        assert_eq!(out.last_name.as_deref(), Some("Meier"));
        assert_eq!(out.email.as_deref(), Some("hans@example.de"));
        assert_eq!(out.phone.as_deref(), Some("030123456"));
        assert_eq!(out.postal_code.as_deref(), Some("80331"));
        assert_eq!(out.city.as_deref(), Some("München"));
    }

    #[test]
    fn ambiguous_key_goes_to_the_higher_priority_field() {
        // "email_telefon" matches both the email and phone synonym lists;
        // email sits earlier in the table, so it wins.
        let m = FieldMatcher::default();
        let out = m.normalize(&fields(&[("email_telefon", "jane@example.com")]));
        assert_eq!(out.email.as_deref(), Some("jane@example.com"));
        assert_eq!(out.phone, None);
    }

    #[test]
    fn firstname_is_not_stolen_by_the_name_synonym() {
        let m = FieldMatcher::default();
        let out = m.normalize(&fields(&[("firstname", "Jane"), ("surname", "Doe")]));
        assert_eq!(out.first_name.as_deref(), Some("Jane"));
        assert_eq!(out.last_name.as_deref(), Some("Doe"));
    }

    #[test]
    fn unmatched_fields_land_in_extra_data_verbatim() {
        let m = FieldMatcher::default();
        let mut input = fields(&[("email", "a@b.c"), ("budget", "5000")]);
        input.insert("consent".to_string(), json!(true));
        let out = m.normalize(&input);
        assert_eq!(out.extra_data.get("budget"), Some(&json!("5000")));
        assert_eq!(out.extra_data.get("consent"), Some(&json!(true)));
        assert!(!out.extra_data.contains_key("email"));
    }

    #[test]
    fn non_string_values_are_stringified() {
        let m = FieldMatcher::default();
        let mut input = Map::new();
        input.insert("plz".to_string(), json!(10115));
        let out = m.normalize(&input);
        assert_eq!(out.postal_code.as_deref(), Some("10115"));
    }

    #[test]
    fn category_matches_by_substring_in_either_direction() {
        let cats = vec![category("Health", 0), category("Solar", 1)];
        assert_eq!(
            match_category(&cats, Some("Solar Leads Q3")),
            Some(cats[1].id)
        );
        assert_eq!(match_category(&cats, Some("health")), Some(cats[0].id));
    }

    #[test]
    fn category_defaults_to_first_configured() {
        let cats = vec![category("Health", 0), category("Solar", 1)];
        assert_eq!(match_category(&cats, Some("Crypto")), Some(cats[0].id));
        assert_eq!(match_category(&cats, None), Some(cats[0].id));
        assert_eq!(match_category(&[], Some("x")), None);
    }
}
