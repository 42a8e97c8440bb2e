//! Helpers for caller-supplied SQL fragments.

use sea_orm::sea_query::Order;
use sea_orm::DbBackend;

use crate::errors::StoreError;

/// Rewrite `?` placeholders into the backend's native form.
///
/// Postgres gets `$1, $2, ...`; other backends keep `?`. Placeholders inside
/// quoted literals or identifiers are left untouched.
pub fn bind_placeholders(backend: DbBackend, sql: &str) -> String {
    if backend != DbBackend::Postgres {
        return sql.to_string();
    }
    let mut out = String::with_capacity(sql.len() + 8);
    let mut quote: Option<char> = None;
    let mut n = 0;
    for ch in sql.chars() {
        match quote {
            Some(q) => {
                out.push(ch);
                if ch == q {
                    quote = None;
                }
            }
            None => match ch {
                '\'' | '"' => {
                    quote = Some(ch);
                    out.push(ch);
                }
                '?' => {
                    n += 1;
                    out.push('$');
                    out.push_str(&n.to_string());
                }
                _ => out.push(ch),
            },
        }
    }
    out
}

/// Parse an ordering clause such as `"created_at desc, name"`.
pub fn parse_order(order_by: &str) -> Result<Vec<(String, Order)>, StoreError> {
    let mut out = Vec::new();
    for part in order_by.split(',') {
        let tokens: Vec<&str> = part.split_whitespace().collect();
        let (column, order) = match tokens.as_slice() {
            [] => continue,
            [column] => (*column, Order::Asc),
            [column, dir] if dir.eq_ignore_ascii_case("asc") => (*column, Order::Asc),
            [column, dir] if dir.eq_ignore_ascii_case("desc") => (*column, Order::Desc),
            _ => return Err(StoreError::Validation(format!("invalid order clause: {}", part.trim()))),
        };
        if !column.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.') {
            return Err(StoreError::Validation(format!("invalid order column: {column}")));
        }
        out.push((column.to_string(), order));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn postgres_placeholders_are_numbered() {
        let sql = bind_placeholders(DbBackend::Postgres, "UPDATE t SET a = ? WHERE b = ? AND c = '?'");
        assert_eq!(sql, "UPDATE t SET a = $1 WHERE b = $2 AND c = '?'");
    }

    #[test]
    fn escaped_quotes_stay_inside_literal() {
        let sql = bind_placeholders(DbBackend::Postgres, "SELECT 'it''s ?' WHERE x = ?");
        assert_eq!(sql, "SELECT 'it''s ?' WHERE x = $1");
    }

    #[test]
    fn sqlite_keeps_question_marks() {
        assert_eq!(bind_placeholders(DbBackend::Sqlite, "a = ?"), "a = ?");
    }

    #[test]
    fn order_clauses_parse() {
        let order = parse_order("created_at desc, name").unwrap();
        assert_eq!(order.len(), 2);
        assert_eq!(order[0].0, "created_at");
        assert!(matches!(order[0].1, Order::Desc));
        assert!(matches!(order[1].1, Order::Asc));
        assert!(parse_order("  ").unwrap().is_empty());
    }

    #[test]
    fn order_injection_is_rejected() {
        assert!(parse_order("name; drop table x").is_err());
        assert!(parse_order("name sideways").is_err());
    }
}
