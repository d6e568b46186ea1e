// SQL識別子・リテラルのクォートユーティリティ
//
// 各データベース方言用の識別子クォート関数と、文字列リテラルのエスケープを提供します。
// sql_generatorとデータ転送の両方から使用される共有モジュールです。

use crate::core::config::Dialect;

/// PostgreSQL/SQLite用識別子クォート（ダブルクォート）
///
/// 識別子内のダブルクォートは二重にエスケープします。
pub fn quote_identifier_double(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// MySQL用識別子クォート（バッククォート）
///
/// 識別子内のバッククォートは二重にエスケープします。
pub fn quote_identifier_mysql(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// 方言に応じて識別子をクォート
pub fn quote_identifier(dialect: Dialect, name: &str) -> String {
    match dialect {
        Dialect::MySQL => quote_identifier_mysql(name),
        Dialect::PostgreSQL | Dialect::SQLite => quote_identifier_double(name),
    }
}

/// カラム名リストをクォートしてカンマ区切りで結合
pub fn quote_columns(dialect: Dialect, columns: &[String]) -> String {
    columns
        .iter()
        .map(|c| quote_identifier(dialect, c))
        .collect::<Vec<_>>()
        .join(", ")
}

/// 値を文字列リテラルに変換（NoneはNULL）
///
/// シングルクォートは二重にエスケープします。
pub fn quote_literal(value: Option<&str>) -> String {
    match value {
        Some(v) => format!("'{}'", v.replace('\'', "''")),
        None => "NULL".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_identifier_double_with_embedded_quote() {
        assert_eq!(quote_identifier_double("users"), r#""users""#);
        assert_eq!(quote_identifier_double(r#"table"name"#), r#""table""name""#);
    }

    #[test]
    fn test_quote_identifier_mysql_with_embedded_backtick() {
        assert_eq!(quote_identifier_mysql("users"), "`users`");
        assert_eq!(quote_identifier_mysql("table`name"), "`table``name`");
    }

    #[test]
    fn test_quote_columns_per_dialect() {
        let columns = vec!["id".to_string(), "name".to_string()];
        assert_eq!(quote_columns(Dialect::PostgreSQL, &columns), r#""id", "name""#);
        assert_eq!(quote_columns(Dialect::MySQL, &columns), "`id`, `name`");
        assert_eq!(quote_columns(Dialect::SQLite, &columns), r#""id", "name""#);
    }

    #[test]
    fn test_quote_literal() {
        assert_eq!(quote_literal(Some("abc")), "'abc'");
        assert_eq!(quote_literal(Some("O'Brien")), "'O''Brien'");
        assert_eq!(quote_literal(None), "NULL");
    }
}
