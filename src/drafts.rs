//! Lenient mapping of an [`ExtractionResult`] onto form drafts.
//!
//! Models name fields however they like: `"Property name"`, `property_name`,
//! `propertyName`. Keys are compared after lower-casing and dropping spaces,
//! underscores and hyphens, and each form field accepts a few aliases.
//! Fields that are missing or of an unusable type stay `None`; extra keys are
//! ignored. Building a draft never fails.

use crate::output::ExtractionResult;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Pre-fill values for the property form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertyDraft {
    pub name: Option<String>,
    pub address: Option<String>,
    pub property_type: Option<String>,
    pub total_units: Option<u32>,
    pub features: Option<Value>,
    pub amenities: Option<Value>,
}

/// Pre-fill values for the tenant form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TenantDraft {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub emergency_contact: Option<Value>,
    pub lease_terms: Option<Value>,
}

impl PropertyDraft {
    pub fn from_result(result: &ExtractionResult) -> Self {
        let fields = Normalised::new(result.fields());
        Self {
            name: fields.string(&["propertyname", "name"]),
            address: fields.string(&["address", "propertyaddress"]),
            property_type: fields.string(&["type", "propertytype"]),
            total_units: fields.count(&["totalunits", "units", "numberofunits"]),
            features: fields.value(&["features", "propertyfeatures"]),
            amenities: fields.value(&["amenities"]),
        }
    }
}

impl TenantDraft {
    pub fn from_result(result: &ExtractionResult) -> Self {
        let fields = Normalised::new(result.fields());
        let mut draft = Self {
            first_name: fields.string(&["firstname", "givenname"]),
            last_name: fields.string(&["lastname", "surname", "familyname"]),
            email: fields.string(&["email", "emailaddress"]),
            phone_number: fields.string(&["phonenumber", "phone", "telephone"]),
            emergency_contact: fields.value(&["emergencycontact", "emergencycontactdetails"]),
            lease_terms: fields.value(&["leaseterms", "lease"]),
        };

        // A single "name" field is split when no explicit parts were given.
        if draft.first_name.is_none() && draft.last_name.is_none() {
            if let Some(full) = fields.string(&["name", "fullname", "tenantname"]) {
                let mut parts = full.splitn(2, char::is_whitespace);
                draft.first_name = parts.next().map(str::to_string);
                draft.last_name = parts
                    .next()
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string);
            }
        }
        draft
    }
}

struct Normalised<'a> {
    entries: Vec<(String, &'a Value)>,
}

impl<'a> Normalised<'a> {
    fn new(map: &'a Map<String, Value>) -> Self {
        Self {
            entries: map.iter().map(|(k, v)| (normalise_key(k), v)).collect(),
        }
    }

    /// First non-null value under any alias, in alias order.
    fn value(&self, aliases: &[&str]) -> Option<Value> {
        aliases.iter().find_map(|alias| {
            self.entries
                .iter()
                .find(|(k, v)| k == alias && !v.is_null())
                .map(|(_, v)| (*v).clone())
        })
    }

    fn string(&self, aliases: &[&str]) -> Option<String> {
        match self.value(aliases)? {
            Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    fn count(&self, aliases: &[&str]) -> Option<u32> {
        match self.value(aliases)? {
            Value::Number(n) => n.as_u64().and_then(|v| u32::try_from(v).ok()),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

fn normalise_key(key: &str) -> String {
    key.chars()
        .filter(|c| !matches!(c, ' ' | '_' | '-'))
        .flat_map(char::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::parse::parse_completion;

    #[test]
    fn property_keys_in_any_style() {
        let result = parse_completion(
            r#"{"Property name":"Maple Court","ADDRESS":"1 Main St","type":"residential","total-units":"12","Features":["parking"],"amenities":{"pool":true},"extra":"ignored"}"#,
        )
        .unwrap();
        let draft = PropertyDraft::from_result(&result);
        assert_eq!(draft.name.as_deref(), Some("Maple Court"));
        assert_eq!(draft.address.as_deref(), Some("1 Main St"));
        assert_eq!(draft.property_type.as_deref(), Some("residential"));
        assert_eq!(draft.total_units, Some(12));
        assert_eq!(draft.features, Some(serde_json::json!(["parking"])));
        assert_eq!(draft.amenities, Some(serde_json::json!({"pool": true})));
    }

    #[test]
    fn tenant_camel_case_and_missing_fields() {
        let result =
            parse_completion(r#"{"firstName":"Ada","lastName":"Lovelace","email":null}"#).unwrap();
        let draft = TenantDraft::from_result(&result);
        assert_eq!(draft.first_name.as_deref(), Some("Ada"));
        assert_eq!(draft.last_name.as_deref(), Some("Lovelace"));
        assert_eq!(draft.email, None);
        assert_eq!(draft.phone_number, None);
    }

    #[test]
    fn tenant_full_name_is_split() {
        let result = parse_completion(r#"{"name":"Grace Brewster Hopper"}"#).unwrap();
        let draft = TenantDraft::from_result(&result);
        assert_eq!(draft.first_name.as_deref(), Some("Grace"));
        assert_eq!(draft.last_name.as_deref(), Some("Brewster Hopper"));
    }

    #[test]
    fn wrong_types_are_left_unset() {
        let result = parse_completion(r#"{"total_units":-3,"name":["a"]}"#).unwrap();
        let draft = PropertyDraft::from_result(&result);
        assert_eq!(draft.total_units, None);
        assert_eq!(draft.name, None);
    }

    #[test]
    fn empty_result_gives_empty_draft() {
        let draft = TenantDraft::from_result(&ExtractionResult::default());
        assert_eq!(draft, TenantDraft::default());
    }
}
