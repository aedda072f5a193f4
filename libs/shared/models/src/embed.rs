//! Shapes of rows embedded by PostgREST resource embedding,
//! e.g. `select=*,clinic:clinics(name)`.

use serde::{Deserialize, Serialize};

use crate::full_name;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedRef {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonRef {
    pub firstname: String,
    pub lastname: String,
}

impl PersonRef {
    pub fn full_name(&self) -> String {
        full_name(&self.firstname, &self.lastname)
    }
}

/// Name of an embedded row, or `fallback` when the relation is null.
pub fn name_or(named: &Option<NamedRef>, fallback: &str) -> String {
    named.as_ref()
        .map(|n| n.name.clone())
        .unwrap_or_else(|| fallback.to_string())
}

pub fn person_or(person: &Option<PersonRef>, fallback: &str) -> String {
    person.as_ref()
        .map(PersonRef::full_name)
        .unwrap_or_else(|| fallback.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_person_renders_full_name() {
        let person: PersonRef = serde_json::from_value(serde_json::json!({
            "firstname": "Gregory",
            "lastname": "House"
        })).unwrap();
        assert_eq!(person.full_name(), "Gregory House");
    }

    #[test]
    fn missing_relations_use_fallback() {
        assert_eq!(name_or(&None, "Unknown Clinic"), "Unknown Clinic");
        assert_eq!(person_or(&None, "Unknown Patient"), "Unknown Patient");
        let clinic = Some(NamedRef { name: "Clinic A".into() });
        assert_eq!(name_or(&clinic, "Unknown Clinic"), "Clinic A");
    }
}
