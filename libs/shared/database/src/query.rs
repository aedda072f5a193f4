//! PostgREST query-string builder.
//!
//! Values are percent-encoded; column names and operators are trusted
//! and written as-is.

use std::fmt::Display;

#[derive(Debug, Default, Clone)]
pub struct PostgrestQuery {
    parts: Vec<String>,
}

impl PostgrestQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select(mut self, columns: &str) -> Self {
        self.parts.push(format!("select={}", columns));
        self
    }

    pub fn eq(self, column: &str, value: impl Display) -> Self {
        self.filter(column, "eq", value)
    }

    pub fn neq(self, column: &str, value: impl Display) -> Self {
        self.filter(column, "neq", value)
    }

    pub fn gte(self, column: &str, value: impl Display) -> Self {
        self.filter(column, "gte", value)
    }

    pub fn lt(self, column: &str, value: impl Display) -> Self {
        self.filter(column, "lt", value)
    }

    pub fn order(mut self, column: &str) -> Self {
        self.parts.push(format!("order={}.asc", column));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.parts.push(format!("limit={}", limit));
        self
    }

    fn filter(mut self, column: &str, op: &str, value: impl Display) -> Self {
        let value = value.to_string();
        self.parts.push(format!("{}={}.{}", column, op, urlencoding::encode(&value)));
        self
    }

    pub fn build(&self) -> String {
        self.parts.join("&")
    }
}

impl Display for PostgrestQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_filters_in_insertion_order() {
        let query = PostgrestQuery::new()
            .select("id,name")
            .eq("id", 3)
            .neq("name", "Clinic A")
            .order("id")
            .limit(1)
            .build();

        assert_eq!(query, "select=id,name&id=eq.3&name=neq.Clinic%20A&order=id.asc&limit=1");
    }

    #[test]
    fn encodes_reserved_characters_in_values() {
        let query = PostgrestQuery::new()
            .eq("email", "a+b@example.com")
            .gte("date", "2025-01-01T09:00:00")
            .build();

        assert_eq!(query, "email=eq.a%2Bb%40example.com&date=gte.2025-01-01T09%3A00%3A00");
    }

    #[test]
    fn empty_query_builds_empty_string() {
        assert_eq!(PostgrestQuery::new().build(), "");
    }
}
