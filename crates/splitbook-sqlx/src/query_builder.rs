// SQL generation helpers shared by the pool adapter and the transaction
// adapter. All statements use positional $N bind placeholders.

use serde_json::Value;
use splitbook_core::db::adapter::{Connector, Operator, SortBy, SortDirection, WhereClause};

/// A fragment of SQL plus the values to bind, in order.
#[derive(Debug, Clone)]
pub struct SqlFragment {
    pub sql: String,
    pub binds: Vec<Value>,
}

impl SqlFragment {
    pub fn empty() -> Self {
        Self {
            sql: String::new(),
            binds: Vec::new(),
        }
    }
}

/// Quote an identifier for interpolation into SQL. Strips any embedded
/// double quotes, then wraps the name in double quotes.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', ""))
}

/// Build a WHERE clause from the query's conditions. `bind_offset` is the
/// number of placeholders already consumed by the statement ahead of this
/// fragment.
pub fn build_where(clauses: &[WhereClause], bind_offset: usize) -> SqlFragment {
    if clauses.is_empty() {
        return SqlFragment::empty();
    }

    let mut sql = String::from(" WHERE ");
    let mut binds: Vec<Value> = Vec::new();
    let mut placeholder = bind_offset;

    for (i, clause) in clauses.iter().enumerate() {
        if i > 0 {
            // The connector that joins clause N to clause N+1 lives on
            // clause N.
            let connector = clauses[i - 1].connector.unwrap_or(Connector::And);
            match connector {
                Connector::And => sql.push_str(" AND "),
                Connector::Or => sql.push_str(" OR "),
            }
        }

        let field = quote_identifier(&clause.field);
        match clause.operator {
            Operator::Eq => {
                if clause.value.is_null() {
                    sql.push_str(&format!("{} IS NULL", field));
                } else {
                    placeholder += 1;
                    sql.push_str(&format!("{} = ${}", field, placeholder));
                    binds.push(clause.value.clone());
                }
            }
            Operator::Ne => {
                if clause.value.is_null() {
                    sql.push_str(&format!("{} IS NOT NULL", field));
                } else {
                    placeholder += 1;
                    sql.push_str(&format!("{} != ${}", field, placeholder));
                    binds.push(clause.value.clone());
                }
            }
            Operator::Lt => {
                placeholder += 1;
                sql.push_str(&format!("{} < ${}", field, placeholder));
                binds.push(clause.value.clone());
            }
            Operator::Lte => {
                placeholder += 1;
                sql.push_str(&format!("{} <= ${}", field, placeholder));
                binds.push(clause.value.clone());
            }
            Operator::Gt => {
                placeholder += 1;
                sql.push_str(&format!("{} > ${}", field, placeholder));
                binds.push(clause.value.clone());
            }
            Operator::Gte => {
                placeholder += 1;
                sql.push_str(&format!("{} >= ${}", field, placeholder));
                binds.push(clause.value.clone());
            }
            Operator::In => match &clause.value {
                Value::Array(items) => {
                    let mut placeholders: Vec<String> = Vec::with_capacity(items.len());
                    for item in items {
                        placeholder += 1;
                        placeholders.push(format!("${}", placeholder));
                        binds.push(item.clone());
                    }
                    if placeholders.is_empty() {
                        // IN over an empty set matches nothing.
                        sql.push_str("1 = 0");
                    } else {
                        sql.push_str(&format!("{} IN ({})", field, placeholders.join(", ")));
                    }
                }
                other => {
                    placeholder += 1;
                    sql.push_str(&format!("{} = ${}", field, placeholder));
                    binds.push(other.clone());
                }
            },
        }
    }

    SqlFragment { sql, binds }
}

/// Build an ORDER BY fragment, or an empty string when no sort is requested.
pub fn build_order_by(sort_by: &Option<SortBy>) -> String {
    match sort_by {
        Some(sort) => {
            let direction = match sort.direction {
                SortDirection::Asc => "ASC",
                SortDirection::Desc => "DESC",
            };
            format!(" ORDER BY {} {}", quote_identifier(&sort.field), direction)
        }
        None => String::new(),
    }
}

/// Build LIMIT/OFFSET. SQLite requires a LIMIT when OFFSET is present, so a
/// bare offset gets `LIMIT -1`.
pub fn build_limit_offset(limit: Option<i64>, offset: Option<i64>) -> String {
    match (limit, offset) {
        (Some(limit), Some(offset)) => format!(" LIMIT {} OFFSET {}", limit, offset),
        (Some(limit), None) => format!(" LIMIT {}", limit),
        (None, Some(offset)) => format!(" LIMIT -1 OFFSET {}", offset),
        (None, None) => String::new(),
    }
}

/// Build an INSERT statement from a JSON object. Keys are emitted in
/// serde_json's map order, which is alphabetical.
pub fn build_insert(model: &str, data: &Value) -> SqlFragment {
    let obj = match data.as_object() {
        Some(obj) if !obj.is_empty() => obj,
        _ => {
            return SqlFragment {
                sql: format!("INSERT INTO {} DEFAULT VALUES", quote_identifier(model)),
                binds: Vec::new(),
            }
        }
    };

    let mut columns: Vec<String> = Vec::with_capacity(obj.len());
    let mut placeholders: Vec<String> = Vec::with_capacity(obj.len());
    let mut binds: Vec<Value> = Vec::with_capacity(obj.len());

    for (i, (key, value)) in obj.iter().enumerate() {
        columns.push(quote_identifier(key));
        placeholders.push(format!("${}", i + 1));
        binds.push(value.clone());
    }

    SqlFragment {
        sql: format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote_identifier(model),
            columns.join(", "),
            placeholders.join(", ")
        ),
        binds,
    }
}

/// Build the SET portion of an UPDATE from a JSON object.
pub fn build_update_set(data: &Value, bind_offset: usize) -> SqlFragment {
    let obj = match data.as_object() {
        Some(obj) => obj,
        None => return SqlFragment::empty(),
    };

    let mut assignments: Vec<String> = Vec::with_capacity(obj.len());
    let mut binds: Vec<Value> = Vec::with_capacity(obj.len());
    let mut placeholder = bind_offset;

    for (key, value) in obj {
        placeholder += 1;
        assignments.push(format!("{} = ${}", quote_identifier(key), placeholder));
        binds.push(value.clone());
    }

    SqlFragment {
        sql: format!(" SET {}", assignments.join(", ")),
        binds,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_build_where_single_clause() {
        let clauses = vec![WhereClause::eq("id", json!("abc"))];
        let fragment = build_where(&clauses, 0);
        assert_eq!(fragment.sql, " WHERE \"id\" = $1");
        assert_eq!(fragment.binds, vec![json!("abc")]);
    }

    #[test]
    fn test_build_where_empty() {
        let fragment = build_where(&[], 0);
        assert_eq!(fragment.sql, "");
        assert!(fragment.binds.is_empty());
    }

    #[test]
    fn test_build_where_and_connector() {
        let clauses = vec![
            WhereClause::eq("groupId", json!("g1")).and(),
            WhereClause::eq("userId", json!("u1")),
        ];
        let fragment = build_where(&clauses, 0);
        assert_eq!(fragment.sql, " WHERE \"groupId\" = $1 AND \"userId\" = $2");
        assert_eq!(fragment.binds.len(), 2);
    }

    #[test]
    fn test_build_where_or_connector() {
        let clauses = vec![
            WhereClause::eq("status", json!("pending")).or(),
            WhereClause::eq("status", json!("accepted")),
        ];
        let fragment = build_where(&clauses, 0);
        assert_eq!(
            fragment.sql,
            " WHERE \"status\" = $1 OR \"status\" = $2"
        );
    }

    #[test]
    fn test_build_where_null_eq_becomes_is_null() {
        let clauses = vec![WhereClause::eq("groupId", Value::Null)];
        let fragment = build_where(&clauses, 0);
        assert_eq!(fragment.sql, " WHERE \"groupId\" IS NULL");
        assert!(fragment.binds.is_empty());
    }

    #[test]
    fn test_build_where_null_ne_becomes_is_not_null() {
        let clauses = vec![WhereClause::with_operator(
            "groupId",
            Value::Null,
            Operator::Ne,
        )];
        let fragment = build_where(&clauses, 0);
        assert_eq!(fragment.sql, " WHERE \"groupId\" IS NOT NULL");
    }

    #[test]
    fn test_build_where_in_expands_array() {
        let clauses = vec![WhereClause::with_operator(
            "id",
            json!(["a", "b", "c"]),
            Operator::In,
        )];
        let fragment = build_where(&clauses, 0);
        assert_eq!(fragment.sql, " WHERE \"id\" IN ($1, $2, $3)");
        assert_eq!(fragment.binds.len(), 3);
    }

    #[test]
    fn test_build_where_in_empty_array_matches_nothing() {
        let clauses = vec![WhereClause::with_operator("id", json!([]), Operator::In)];
        let fragment = build_where(&clauses, 0);
        assert_eq!(fragment.sql, " WHERE 1 = 0");
    }

    #[test]
    fn test_build_where_respects_bind_offset() {
        let clauses = vec![WhereClause::eq("id", json!("abc"))];
        let fragment = build_where(&clauses, 2);
        assert_eq!(fragment.sql, " WHERE \"id\" = $3");
    }

    #[test]
    fn test_build_insert() {
        let data = json!({"id": "e1", "amount": 12.5});
        let fragment = build_insert("entry", &data);
        // serde_json maps iterate alphabetically
        assert_eq!(
            fragment.sql,
            "INSERT INTO \"entry\" (\"amount\", \"id\") VALUES ($1, $2)"
        );
        assert_eq!(fragment.binds, vec![json!(12.5), json!("e1")]);
    }

    #[test]
    fn test_build_update_set() {
        let data = json!({"role": "admin"});
        let fragment = build_update_set(&data, 0);
        assert_eq!(fragment.sql, " SET \"role\" = $1");
        assert_eq!(fragment.binds, vec![json!("admin")]);
    }

    #[test]
    fn test_build_limit_offset_variants() {
        assert_eq!(build_limit_offset(Some(10), Some(5)), " LIMIT 10 OFFSET 5");
        assert_eq!(build_limit_offset(Some(10), None), " LIMIT 10");
        assert_eq!(build_limit_offset(None, Some(5)), " LIMIT -1 OFFSET 5");
        assert_eq!(build_limit_offset(None, None), "");
    }

    #[test]
    fn test_quote_identifier_strips_embedded_quotes() {
        assert_eq!(quote_identifier("user\"; DROP TABLE"), "\"user; DROP TABLE\"");
    }

    #[test]
    fn test_build_order_by() {
        let sort = Some(SortBy {
            field: "createdAt".to_string(),
            direction: SortDirection::Desc,
        });
        assert_eq!(build_order_by(&sort), " ORDER BY \"createdAt\" DESC");
        assert_eq!(build_order_by(&None), "");
    }
}
