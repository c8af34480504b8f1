use serde_json::Value;

use super::error::FilterError;
use super::filter_order::FilterOrder;
use super::filter_where::FilterWhere;
use super::types::{FilterOp, FilterOrderInfo, FilterWhereInfo, SqlResult};

/// Deferred read-query handle. Stages mutate it; nothing executes until the
/// caller compiles it with [`Filter::to_sql`] and runs the result.
pub struct Filter {
    table_name: String,
    select_columns: Vec<String>,
    raw_scopes: Vec<&'static str>,
    scope_conditions: Vec<FilterWhereInfo>,
    conditions: Vec<FilterWhereInfo>,
    order_data: Vec<FilterOrderInfo>,
    limit: Option<i64>,
    offset: Option<i64>,
}

impl Filter {
    pub fn new(table_name: impl Into<String>) -> Result<Self, FilterError> {
        let table_name = table_name.into();
        if !is_valid_identifier(&table_name) {
            return Err(FilterError::InvalidTableName(table_name));
        }
        Ok(Self {
            table_name,
            select_columns: vec![],
            raw_scopes: vec![],
            scope_conditions: vec![],
            conditions: vec![],
            order_data: vec![],
            limit: None,
            offset: None,
        })
    }

    /// Attach a trusted static predicate (resource visibility scoping).
    pub fn scope_raw(&mut self, predicate: &'static str) -> &mut Self {
        if !self.raw_scopes.contains(&predicate) {
            self.raw_scopes.push(predicate);
        }
        self
    }

    /// Attach an ancestor equality constraint (nested-resource scoping).
    pub fn scope_eq(&mut self, column: &str, value: Value) -> Result<&mut Self, FilterError> {
        if !is_valid_identifier(column) {
            return Err(FilterError::InvalidColumn(column.to_string()));
        }
        self.scope_conditions.push(FilterWhereInfo {
            column: column.to_string(),
            operator: FilterOp::Eq,
            data: value,
        });
        Ok(self)
    }

    /// Replace the parameter-derived conditions wholesale; re-applying the
    /// same set leaves the filter unchanged.
    pub fn set_conditions(
        &mut self,
        conditions: Vec<FilterWhereInfo>,
    ) -> Result<&mut Self, FilterError> {
        for condition in &conditions {
            if !is_valid_identifier(&condition.column) {
                return Err(FilterError::InvalidColumn(condition.column.clone()));
            }
        }
        self.conditions = conditions;
        Ok(self)
    }

    pub fn set_order(&mut self, order: Vec<FilterOrderInfo>) -> Result<&mut Self, FilterError> {
        for info in &order {
            if !is_valid_identifier(&info.column) {
                return Err(FilterError::InvalidColumn(info.column.clone()));
            }
        }
        self.order_data = order;
        Ok(self)
    }

    pub fn set_window(&mut self, limit: Option<i64>, offset: Option<i64>) -> &mut Self {
        // Cap against the configured maximum result window
        let max_limit = crate::config::config().filter.max_limit;
        self.limit = match (limit, max_limit) {
            (Some(l), Some(max)) => Some(l.min(max)),
            (l, _) => l,
        };
        self.offset = offset;
        self
    }

    /// Replace the projection include-list; `id` is always carried along.
    pub fn set_select(&mut self, columns: Vec<String>) -> Result<&mut Self, FilterError> {
        for column in &columns {
            if !is_valid_identifier(column) {
                return Err(FilterError::InvalidColumn(column.clone()));
            }
        }
        let mut columns = columns;
        if !columns.is_empty() && !columns.iter().any(|c| c == "id") {
            columns.insert(0, "id".to_string());
        }
        self.select_columns = columns;
        Ok(self)
    }

    pub fn clear_select(&mut self) -> &mut Self {
        self.select_columns.clear();
        self
    }

    pub fn to_sql(&self) -> Result<SqlResult, FilterError> {
        let select_clause = self.build_select_clause();

        let mut all_conditions = self.scope_conditions.clone();
        all_conditions.extend(self.conditions.iter().cloned());
        let (where_clause, params) = FilterWhere::generate(&self.raw_scopes, &all_conditions)?;

        let order_clause = FilterOrder::generate(&self.order_data);
        let limit_clause = self.build_limit_clause();

        let query = [
            format!("SELECT {}", select_clause),
            format!("FROM \"{}\"", self.table_name),
            if where_clause.is_empty() {
                String::new()
            } else {
                format!("WHERE {}", where_clause)
            },
            order_clause,
            limit_clause,
        ]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

        Ok(SqlResult { query, params })
    }

    fn build_select_clause(&self) -> String {
        if self.select_columns.is_empty() {
            "*".to_string()
        } else {
            self.select_columns
                .iter()
                .map(|c| format!("\"{}\"", c))
                .collect::<Vec<_>>()
                .join(", ")
        }
    }

    fn build_limit_clause(&self) -> String {
        match (self.limit, self.offset) {
            (Some(l), Some(o)) => format!("LIMIT {} OFFSET {}", l, o),
            (Some(l), None) => format!("LIMIT {}", l),
            _ => String::new(),
        }
    }
}

pub fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rejects_invalid_identifiers() {
        assert!(Filter::new("products; DROP TABLE users").is_err());
        assert!(Filter::new("9products").is_err());
        let mut filter = Filter::new("products").unwrap();
        assert!(filter
            .set_conditions(vec![FilterWhereInfo {
                column: "price\" OR 1=1".into(),
                operator: FilterOp::Eq,
                data: json!(1),
            }])
            .is_err());
    }

    #[test]
    fn compiles_scopes_conditions_order_and_window() {
        let mut filter = Filter::new("products").unwrap();
        filter.scope_raw("\"secret\" IS DISTINCT FROM TRUE");
        filter
            .set_conditions(vec![FilterWhereInfo {
                column: "price".into(),
                operator: FilterOp::Gte,
                data: json!(2),
            }])
            .unwrap();
        filter
            .set_order(super::super::filter_order::FilterOrder::parse("-price"))
            .map(|_| ())
            .unwrap();
        filter.set_window(Some(5), Some(0));

        let sql = filter.to_sql().unwrap();
        assert_eq!(
            sql.query,
            "SELECT * FROM \"products\" \
             WHERE \"secret\" IS DISTINCT FROM TRUE AND \"price\" >= $1 \
             ORDER BY \"price\" DESC LIMIT 5 OFFSET 0"
        );
        assert_eq!(sql.params, vec![json!(2)]);
    }

    #[test]
    fn projection_always_includes_id() {
        let mut filter = Filter::new("products").unwrap();
        filter
            .set_select(vec!["name".to_string(), "price".to_string()])
            .unwrap();
        let sql = filter.to_sql().unwrap();
        assert!(sql.query.starts_with("SELECT \"id\", \"name\", \"price\""));
    }

    #[test]
    fn scope_raw_is_idempotent() {
        let mut filter = Filter::new("products").unwrap();
        filter.scope_raw("\"secret\" IS DISTINCT FROM TRUE");
        filter.scope_raw("\"secret\" IS DISTINCT FROM TRUE");
        let sql = filter.to_sql().unwrap();
        assert_eq!(sql.query.matches("secret").count(), 1);
    }
}
