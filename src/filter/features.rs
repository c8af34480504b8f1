use std::collections::HashMap;

use serde_json::Value;

use super::error::FilterError;
use super::filter::Filter;
use super::filter_order::FilterOrder;
use super::types::{FilterOp, FilterOrderInfo, FilterWhereInfo, SortDirection};

/// Parameters consumed by the non-filter stages
const RESERVED_PARAMS: &[&str] = &["page", "limit", "sort", "fields"];

/// Builds a refined [`Filter`] from raw query-string parameters through four
/// composable stages: filter, sort, paginate, limit_fields. Each stage
/// replaces its slice of the filter state wholesale, so stages may run in any
/// order and re-running one with the same parameters is a no-op. Pagination
/// is compiled after sorting regardless of call order.
pub struct QueryFeatures {
    params: HashMap<String, String>,
}

impl QueryFeatures {
    pub fn new(params: HashMap<String, String>) -> Self {
        Self { params }
    }

    /// Run all four stages in canonical order.
    pub fn apply(&self, filter: &mut Filter) -> Result<(), FilterError> {
        self.filter(filter)?;
        self.sort(filter)?;
        self.paginate(filter)?;
        self.limit_fields(filter)?;
        Ok(())
    }

    /// Stage 1: every non-reserved parameter becomes an equality constraint,
    /// except `field[op]` keys with op in {gte, gt, lte, lt, ne}, which become
    /// the matching relational constraint. Constraints are ANDed.
    pub fn filter(&self, filter: &mut Filter) -> Result<(), FilterError> {
        // Sort keys so the compiled SQL is deterministic
        let mut keys: Vec<&String> = self
            .params
            .keys()
            .filter(|k| !RESERVED_PARAMS.contains(&k.as_str()))
            .collect();
        keys.sort();

        let mut conditions = Vec::with_capacity(keys.len());
        for key in keys {
            let raw = &self.params[key];
            let (column, operator) = parse_constraint_key(key);
            conditions.push(FilterWhereInfo {
                column: column.to_string(),
                operator,
                data: coerce_value(raw),
            });
        }
        filter.set_conditions(conditions)?;
        Ok(())
    }

    /// Stage 2: `sort=a,-b` applies in listed order; otherwise newest first
    /// with the document id as a deterministic tiebreak.
    pub fn sort(&self, filter: &mut Filter) -> Result<(), FilterError> {
        let order = match self.params.get("sort") {
            Some(spec) => FilterOrder::parse(spec),
            None => vec![
                FilterOrderInfo {
                    column: "created_at".to_string(),
                    sort: SortDirection::Desc,
                },
                FilterOrderInfo {
                    column: "id".to_string(),
                    sort: SortDirection::Asc,
                },
            ],
        };
        filter.set_order(order)?;
        Ok(())
    }

    /// Stage 3: `page` and `limit` together open a result window of `limit`
    /// rows starting at `(page-1)*limit`; absent parameters mean no limit.
    pub fn paginate(&self, filter: &mut Filter) -> Result<(), FilterError> {
        let page = self.params.get("page");
        let limit = self.params.get("limit");

        match (page, limit) {
            (Some(page), Some(limit)) => {
                let page: i64 = page
                    .parse()
                    .map_err(|_| FilterError::InvalidPage(page.clone()))?;
                let limit: i64 = limit
                    .parse()
                    .map_err(|_| FilterError::InvalidLimit(limit.clone()))?;
                if page < 1 {
                    return Err(FilterError::InvalidPage(page.to_string()));
                }
                if limit < 1 {
                    return Err(FilterError::InvalidLimit(limit.to_string()));
                }
                filter.set_window(Some(limit), Some((page - 1) * limit));
            }
            (None, Some(limit)) => {
                let limit: i64 = limit
                    .parse()
                    .map_err(|_| FilterError::InvalidLimit(limit.clone()))?;
                if limit < 1 {
                    return Err(FilterError::InvalidLimit(limit.to_string()));
                }
                filter.set_window(Some(limit), None);
            }
            _ => {
                filter.set_window(None, None);
            }
        }
        Ok(())
    }

    /// Stage 4: `fields=a,b` becomes an include-projection (id always kept);
    /// absent means all persisted columns.
    pub fn limit_fields(&self, filter: &mut Filter) -> Result<(), FilterError> {
        match self.params.get("fields") {
            Some(fields) => {
                let columns: Vec<String> = fields
                    .split(',')
                    .map(|f| f.trim().to_string())
                    .filter(|f| !f.is_empty())
                    .collect();
                filter.set_select(columns)?;
            }
            None => {
                filter.clear_select();
            }
        }
        Ok(())
    }
}

fn parse_constraint_key(key: &str) -> (&str, FilterOp) {
    // "price[gte]" -> ("price", Gte); unknown suffixes stay equality on the full key
    if let Some(open) = key.find('[') {
        if let Some(stripped) = key[open + 1..].strip_suffix(']') {
            if let Some(op) = FilterOp::from_suffix(stripped) {
                return (&key[..open], op);
            }
        }
    }
    (key, FilterOp::Eq)
}

/// Query-string values are untyped; numbers and booleans compare correctly
/// only if bound with their native types.
fn coerce_value(raw: &str) -> Value {
    if let Ok(i) = raw.parse::<i64>() {
        return Value::Number(i.into());
    }
    if let Ok(f) = raw.parse::<f64>() {
        if let Some(n) = serde_json::Number::from_f64(f) {
            return Value::Number(n);
        }
    }
    match raw {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => Value::String(raw.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn compile(pairs: &[(&str, &str)]) -> (String, Vec<Value>) {
        let features = QueryFeatures::new(params(pairs));
        let mut filter = Filter::new("products").unwrap();
        features.apply(&mut filter).unwrap();
        let sql = filter.to_sql().unwrap();
        (sql.query, sql.params)
    }

    #[test]
    fn catalog_listing_example() {
        // price[gte]=2&sort=-price&limit=5&page=1&fields=name,price
        let (query, params) = compile(&[
            ("price[gte]", "2"),
            ("sort", "-price"),
            ("limit", "5"),
            ("page", "1"),
            ("fields", "name,price"),
        ]);
        assert_eq!(
            query,
            "SELECT \"id\", \"name\", \"price\" FROM \"products\" \
             WHERE \"price\" >= $1 ORDER BY \"price\" DESC LIMIT 5 OFFSET 0"
        );
        assert_eq!(params, vec![Value::Number(2.into())]);
    }

    #[test]
    fn bare_keys_are_equality_constraints() {
        let (query, params) = compile(&[("gender", "unisex"), ("quality", "used")]);
        assert!(query.contains("\"gender\" = $1"));
        assert!(query.contains("\"quality\" = $2"));
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn relational_suffixes_translate() {
        let (query, _) = compile(&[
            ("price[lt]", "5"),
            ("quantity[gt]", "0"),
            ("best_rating[ne]", "3"),
        ]);
        assert!(query.contains("\"best_rating\" <> $1"));
        assert!(query.contains("\"price\" < $2"));
        assert!(query.contains("\"quantity\" > $3"));
    }

    #[test]
    fn default_sort_is_newest_first_with_id_tiebreak() {
        let (query, _) = compile(&[]);
        assert!(query.contains("ORDER BY \"created_at\" DESC, \"id\" ASC"));
    }

    #[test]
    fn absent_pagination_means_no_limit() {
        let (query, _) = compile(&[("sort", "name")]);
        assert!(!query.contains("LIMIT"));
        assert!(!query.contains("OFFSET"));
    }

    #[test]
    fn page_computes_offset() {
        let (query, _) = compile(&[("page", "3"), ("limit", "10")]);
        assert!(query.ends_with("LIMIT 10 OFFSET 20"));
    }

    #[test]
    fn stages_commute_to_canonical_order() {
        let features = QueryFeatures::new(params(&[
            ("price[gte]", "2"),
            ("sort", "-price"),
            ("limit", "5"),
            ("page", "1"),
            ("fields", "name,price"),
        ]));

        let mut canonical = Filter::new("products").unwrap();
        features.filter(&mut canonical).unwrap();
        features.sort(&mut canonical).unwrap();
        features.paginate(&mut canonical).unwrap();
        features.limit_fields(&mut canonical).unwrap();

        let mut shuffled = Filter::new("products").unwrap();
        features.limit_fields(&mut shuffled).unwrap();
        features.paginate(&mut shuffled).unwrap();
        features.filter(&mut shuffled).unwrap();
        features.sort(&mut shuffled).unwrap();

        assert_eq!(
            canonical.to_sql().unwrap().query,
            shuffled.to_sql().unwrap().query
        );
    }

    #[test]
    fn stages_are_idempotent() {
        let features = QueryFeatures::new(params(&[
            ("price[gte]", "2"),
            ("sort", "-price"),
            ("limit", "5"),
            ("page", "2"),
        ]));

        let mut once = Filter::new("products").unwrap();
        features.apply(&mut once).unwrap();

        let mut twice = Filter::new("products").unwrap();
        features.apply(&mut twice).unwrap();
        features.apply(&mut twice).unwrap();

        assert_eq!(once.to_sql().unwrap().query, twice.to_sql().unwrap().query);
        assert_eq!(
            once.to_sql().unwrap().params,
            twice.to_sql().unwrap().params
        );
    }

    #[test]
    fn invalid_page_or_limit_is_rejected() {
        let features = QueryFeatures::new(params(&[("page", "0"), ("limit", "5")]));
        let mut filter = Filter::new("products").unwrap();
        assert!(features.paginate(&mut filter).is_err());

        let features = QueryFeatures::new(params(&[("page", "1"), ("limit", "abc")]));
        assert!(features.paginate(&mut filter).is_err());
    }

    #[test]
    fn coerces_parameter_values() {
        assert_eq!(coerce_value("2"), Value::Number(2.into()));
        assert_eq!(coerce_value("true"), Value::Bool(true));
        assert_eq!(coerce_value("toys"), Value::String("toys".into()));
        assert!(coerce_value("4.5").is_f64());
    }
}
