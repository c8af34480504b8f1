use serde_json::Value;

use super::error::FilterError;
use super::types::{FilterOp, FilterWhereInfo};

pub struct FilterWhere {
    param_values: Vec<Value>,
    param_index: usize,
}

impl FilterWhere {
    /// Render conditions as an ANDed WHERE clause with positional binds.
    /// `raw_scopes` are trusted static predicates contributed by resource
    /// descriptors (e.g. visibility scoping) and are emitted verbatim.
    pub fn generate(
        raw_scopes: &[&'static str],
        conditions: &[FilterWhereInfo],
    ) -> Result<(String, Vec<Value>), FilterError> {
        let mut filter_where = Self {
            param_values: vec![],
            param_index: 0,
        };

        let mut sql_conditions: Vec<String> =
            raw_scopes.iter().map(|s| (*s).to_string()).collect();
        for condition in conditions {
            sql_conditions.push(filter_where.build_sql_condition(condition));
        }

        let where_clause = sql_conditions.join(" AND ");
        Ok((where_clause, filter_where.param_values))
    }

    fn build_sql_condition(&mut self, condition: &FilterWhereInfo) -> String {
        let quoted_column = format!("\"{}\"", condition.column);
        match condition.operator {
            FilterOp::Eq if condition.data.is_null() => format!("{} IS NULL", quoted_column),
            FilterOp::Ne if condition.data.is_null() => format!("{} IS NOT NULL", quoted_column),
            op => format!(
                "{} {} {}",
                quoted_column,
                op.to_sql(),
                self.param(condition.data.clone())
            ),
        }
    }

    fn param(&mut self, value: Value) -> String {
        self.param_values.push(value);
        self.param_index += 1;
        format!("${}", self.param_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn conditions_are_anded_in_order() {
        let conditions = vec![
            FilterWhereInfo {
                column: "price".into(),
                operator: FilterOp::Gte,
                data: json!(2),
            },
            FilterWhereInfo {
                column: "gender".into(),
                operator: FilterOp::Eq,
                data: json!("unisex"),
            },
        ];
        let (sql, params) = FilterWhere::generate(&[], &conditions).unwrap();
        assert_eq!(sql, "\"price\" >= $1 AND \"gender\" = $2");
        assert_eq!(params, vec![json!(2), json!("unisex")]);
    }

    #[test]
    fn raw_scopes_precede_parameter_conditions() {
        let conditions = vec![FilterWhereInfo {
            column: "quantity".into(),
            operator: FilterOp::Gt,
            data: json!(0),
        }];
        let (sql, params) =
            FilterWhere::generate(&["\"secret\" IS DISTINCT FROM TRUE"], &conditions).unwrap();
        assert_eq!(
            sql,
            "\"secret\" IS DISTINCT FROM TRUE AND \"quantity\" > $1"
        );
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn null_equality_renders_is_null() {
        let conditions = vec![FilterWhereInfo {
            column: "best_rating".into(),
            operator: FilterOp::Eq,
            data: Value::Null,
        }];
        let (sql, params) = FilterWhere::generate(&[], &conditions).unwrap();
        assert_eq!(sql, "\"best_rating\" IS NULL");
        assert!(params.is_empty());
    }
}
