//! Filter expressions for queries against the CMS tables
//!
//! Filters are plain data so a query's shape can be hashed for the
//! remembered-query cache and evaluated by in-memory query layers.

use serde::{Deserialize, Serialize};

/// Filter operator for field comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterOperator {
    /// Equal to
    Eq,
    /// Not equal to
    Ne,
    /// In list of values
    In,
}

/// A single column predicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterExpr {
    /// Column to filter on
    pub field: String,
    /// Operator to apply
    pub operator: FilterOperator,
    /// Value to compare against (an array for `In`)
    pub value: serde_json::Value,
}

impl FilterExpr {
    /// Create a new filter expression.
    pub fn new(
        field: impl Into<String>,
        operator: FilterOperator,
        value: serde_json::Value,
    ) -> Self {
        Self {
            field: field.into(),
            operator,
            value,
        }
    }

    /// Create an equality filter.
    pub fn eq(field: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        Self::new(field, FilterOperator::Eq, value.into())
    }

    /// Create an inequality filter.
    pub fn ne(field: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        Self::new(field, FilterOperator::Ne, value.into())
    }

    /// Create a membership filter.
    pub fn is_in<V: Into<serde_json::Value>>(
        field: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        let values = values.into_iter().map(Into::into).collect();
        Self::new(field, FilterOperator::In, serde_json::Value::Array(values))
    }

    /// Evaluate this filter against a row encoded as a JSON object.
    ///
    /// A missing column compares as `null`.
    pub fn matches(&self, row: &serde_json::Value) -> bool {
        let actual = row.get(&self.field).unwrap_or(&serde_json::Value::Null);
        match self.operator {
            FilterOperator::Eq => actual == &self.value,
            FilterOperator::Ne => actual != &self.value,
            FilterOperator::In => self
                .value
                .as_array()
                .map(|values| values.contains(actual))
                .unwrap_or(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_eq_filter() {
        let row = json!({"post_status": "publish", "ID": 4});
        assert!(FilterExpr::eq("post_status", "publish").matches(&row));
        assert!(!FilterExpr::eq("post_status", "draft").matches(&row));
        assert!(FilterExpr::eq("ID", 4).matches(&row));
    }

    #[test]
    fn test_ne_filter() {
        let row = json!({"post_status": "draft"});
        assert!(FilterExpr::ne("post_status", "publish").matches(&row));
    }

    #[test]
    fn test_in_filter() {
        let row = json!({"meta_key": "price"});
        assert!(FilterExpr::is_in("meta_key", ["price", "colour"]).matches(&row));
        assert!(!FilterExpr::is_in("meta_key", ["colour"]).matches(&row));
    }

    #[test]
    fn test_missing_column_is_null() {
        let row = json!({});
        assert!(!FilterExpr::eq("post_status", "publish").matches(&row));
        assert!(FilterExpr::eq("post_status", serde_json::Value::Null).matches(&row));
    }
}
