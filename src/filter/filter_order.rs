use super::types::{FilterOrderInfo, SortDirection};

pub struct FilterOrder;

impl FilterOrder {
    /// Parse a `sort` parameter: comma-separated field names, each optionally
    /// prefixed with `-` for descending (e.g. "-price,name").
    pub fn parse(spec: &str) -> Vec<FilterOrderInfo> {
        let mut out = Vec::new();
        for part in spec.split(',') {
            let trimmed = part.trim();
            if trimmed.is_empty() {
                continue;
            }
            let (column, sort) = match trimmed.strip_prefix('-') {
                Some(column) => (column, SortDirection::Desc),
                None => (trimmed, SortDirection::Asc),
            };
            out.push(FilterOrderInfo {
                column: column.to_string(),
                sort,
            });
        }
        out
    }

    pub fn generate(infos: &[FilterOrderInfo]) -> String {
        if infos.is_empty() {
            return String::new();
        }
        let parts: Vec<String> = infos
            .iter()
            .map(|i| format!("\"{}\" {}", i.column, i.sort.to_sql()))
            .collect();
        format!("ORDER BY {}", parts.join(", "))
    }
}
