//! `WHERE` clauses from provider-neutral filters

use crate::config::SqlDriver;
use crate::row::SqlValue;
use galactic_identity::SearchFilter;

/// `LIKE` escape character; `!` needs no quoting in any supported dialect
const LIKE_ESCAPE: char = '!';

fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '%' | '_' | LIKE_ESCAPE) {
            escaped.push(LIKE_ESCAPE);
        }
        escaped.push(c);
    }
    escaped
}

/// Render `filter` as a `WHERE` clause body. Values are appended to `params`
/// and referenced through the driver's bind markers, never inlined.
pub fn filter_to_sql(filter: &SearchFilter, driver: SqlDriver, params: &mut Vec<SqlValue>) -> String {
    match filter {
        SearchFilter::Equals { attribute, value } => {
            params.push(SqlValue::Text(value.clone()));
            format!(
                "{} = {}",
                driver.quote_identifier(attribute),
                driver.placeholder(params.len())
            )
        }
        SearchFilter::StartsWith { attribute, value } => {
            params.push(SqlValue::Text(format!("{}%", escape_like(value))));
            format!(
                "{} LIKE {} ESCAPE '{}'",
                driver.quote_identifier(attribute),
                driver.placeholder(params.len()),
                LIKE_ESCAPE
            )
        }
        SearchFilter::Present { attribute } => {
            format!("{} IS NOT NULL", driver.quote_identifier(attribute))
        }
        SearchFilter::And(filters) => join(filters, " AND ", "1 = 1", driver, params),
        SearchFilter::Or(filters) => join(filters, " OR ", "1 = 0", driver, params),
        SearchFilter::Not(inner) => format!("NOT ({})", filter_to_sql(inner, driver, params)),
    }
}

fn join(
    filters: &[SearchFilter],
    separator: &str,
    empty: &str,
    driver: SqlDriver,
    params: &mut Vec<SqlValue>,
) -> String {
    if filters.is_empty() {
        return empty.to_string();
    }
    let clauses: Vec<String> = filters
        .iter()
        .map(|f| format!("({})", filter_to_sql(f, driver, params)))
        .collect();
    clauses.join(separator)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equals_uses_positional_parameters() {
        let mut params = Vec::new();
        let filter = SearchFilter::and(vec![
            SearchFilter::eq("department", "R&D"),
            SearchFilter::eq("title", "x' OR '1'='1"),
        ]);
        assert_eq!(
            filter_to_sql(&filter, SqlDriver::Postgres, &mut params),
            "(\"department\" = $1) AND (\"title\" = $2)"
        );
        assert_eq!(
            params,
            vec![SqlValue::from("R&D"), SqlValue::from("x' OR '1'='1")]
        );
    }

    #[test]
    fn test_starts_with_escapes_wildcards() {
        let mut params = Vec::new();
        let sql = filter_to_sql(
            &SearchFilter::starts_with("name", "50%_off!"),
            SqlDriver::Sqlite,
            &mut params,
        );
        assert_eq!(sql, "\"name\" LIKE ? ESCAPE '!'");
        assert_eq!(params, vec![SqlValue::from("50!%!_off!!%")]);
    }

    #[test]
    fn test_not_present_or() {
        let mut params = Vec::new();
        let filter = SearchFilter::or(vec![
            SearchFilter::not(SearchFilter::present("mail")),
            SearchFilter::eq("mail", "a@example.com"),
        ]);
        assert_eq!(
            filter_to_sql(&filter, SqlDriver::MySql, &mut params),
            "(NOT (`mail` IS NOT NULL)) OR (`mail` = ?)"
        );
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn test_empty_groups() {
        let mut params = Vec::new();
        assert_eq!(filter_to_sql(&SearchFilter::and(vec![]), SqlDriver::Postgres, &mut params), "1 = 1");
        assert_eq!(filter_to_sql(&SearchFilter::or(vec![]), SqlDriver::Postgres, &mut params), "1 = 0");
    }
}
