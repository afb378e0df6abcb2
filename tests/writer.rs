mod common;

use common::schema_rows;
use indoc::indoc;
use rowmap::{
    GenericSqlWriter, MysqlSqlWriter, PostgresSqlWriter, RawOverrides, SqlWriter, TableSchema,
    TransformMap, Value, row, truncate_long,
};
use rust_decimal::Decimal;
use time::macros::{date, datetime, time};
use uuid::Uuid;

const WRITER: GenericSqlWriter = GenericSqlWriter::new();

fn user_schema() -> TableSchema {
    TableSchema::new(
        "user",
        "id",
        vec!["id".to_owned(), "account".to_owned(), "is_active".to_owned()],
    )
    .unwrap()
}

#[test]
fn escapes_scalar_values() {
    assert_eq!(WRITER.escape(&Value::Null), "NULL");
    assert_eq!(WRITER.escape(&Value::Varchar(None)), "NULL");
    assert_eq!(WRITER.escape(&Value::from(true)), "true");
    assert_eq!(WRITER.escape(&Value::from(-7i64)), "-7");
    assert_eq!(WRITER.escape(&Value::from(2.5f64)), "2.5");
    assert_eq!(WRITER.escape(&Value::from("O'Brien")), "'O''Brien'");
    assert_eq!(
        WRITER.escape(&Value::Decimal(Some(Decimal::new(1234, 2)))),
        "12.34"
    );
    assert_eq!(
        WRITER.escape(&Value::from(vec![0xDEu8, 0xAD])),
        r"'\xDE\xAD'"
    );
    assert_eq!(WRITER.escape(&Value::from(date!(2024 - 05 - 01))), "'2024-05-01'");
    assert_eq!(WRITER.escape(&Value::from(time!(13:30:00))), "'13:30:00'");
    assert_eq!(
        WRITER.escape(&Value::from(datetime!(2024 - 05 - 01 13:30:00))),
        "'2024-05-01T13:30:00'"
    );
    let uuid = Uuid::nil();
    assert_eq!(
        WRITER.escape(&Value::from(uuid)),
        "'00000000-0000-0000-0000-000000000000'"
    );
}

#[test]
fn quotes_identifiers() {
    let mut out = String::new();
    WRITER.write_identifier_quoted(&mut out, r#"my"col"#);
    assert_eq!(out, r#""my""col""#);

    let mut out = String::new();
    MysqlSqlWriter::new().write_identifier_quoted(&mut out, "my`col");
    assert_eq!(out, "`my``col`");
}

#[test]
fn mysql_strings_escape_with_backslashes() {
    let mut out = String::new();
    MysqlSqlWriter::new().write_value_string(&mut out, "it's a \\ line\nbreak");
    assert_eq!(out, r"'it\'s a \\ line\nbreak'");
}

#[test]
fn substitutes_positional_placeholders() {
    let sql = WRITER
        .substitute("name = '?' AND id = ? AND account = ?", &[
            7i64.into(),
            "fred".into(),
        ])
        .unwrap();
    assert_eq!(sql, "name = '?' AND id = 7 AND account = 'fred'");

    assert!(WRITER.substitute("id = ?", &[]).is_err());
    assert!(
        WRITER
            .substitute("id = ?", &[1i64.into(), 2i64.into()])
            .is_err()
    );
}

#[test]
fn select_lists_columns_and_calculated() {
    let mut out = String::new();
    WRITER.write_select(
        &mut out,
        &user_schema(),
        &[rowmap::CalculatedColumn::new("account_upper", "upper(account)")],
        &TransformMap::new(),
        "1 = 1",
        Some(5),
    );
    assert_eq!(
        out,
        indoc! {r#"
            SELECT "id", "account", "is_active", upper(account) AS "account_upper"
            FROM "user"
            WHERE 1 = 1
            LIMIT 5"#}
    );
}

#[test]
fn read_transform_wraps_its_column_in_place() {
    let mut transforms = TransformMap::new();
    transforms.entry("account".to_owned()).or_default().read =
        Some(Box::new(|col| format!("lower({col})")));
    let mut out = String::new();
    WRITER.write_select(&mut out, &user_schema(), &[], &transforms, "1 = 1", None);
    assert_eq!(
        out,
        indoc! {r#"
            SELECT "id", lower("account") AS "account", "is_active"
            FROM "user"
            WHERE 1 = 1"#}
    );
}

#[test]
fn insert_omits_absent_primary_key() {
    let schema = user_schema();
    let row = row! { "id" => Option::<i64>::None, "account" => "fred", "is_active" => true };
    let mut out = String::new();
    WRITER.write_insert(&mut out, &schema, &row, None).unwrap();
    assert_eq!(
        out,
        r#"INSERT INTO "user" ("account", "is_active") VALUES ('fred', true)"#
    );
}

#[test]
fn insert_keeps_provided_primary_key() {
    let schema = user_schema();
    let row = row! { "id" => 42i64, "account" => "fred", "is_active" => true };
    let mut out = String::new();
    WRITER.write_insert(&mut out, &schema, &row, None).unwrap();
    assert_eq!(
        out,
        r#"INSERT INTO "user" ("id", "account", "is_active") VALUES (42, 'fred', true)"#
    );
}

#[test]
fn raw_fragment_replaces_escaped_value_in_place() {
    let schema = user_schema();
    let row = row! { "account" => "fred", "is_active" => true };
    let mut raw = RawOverrides::new();
    raw.insert("account".to_owned(), "upper('fred')".to_owned());
    let mut out = String::new();
    WRITER
        .write_insert(&mut out, &schema, &row, Some(&raw))
        .unwrap();
    assert_eq!(
        out,
        r#"INSERT INTO "user" ("account", "is_active") VALUES (upper('fred'), true)"#
    );
}

#[test]
fn write_set_never_empty() {
    let schema = user_schema();
    let row = row! { "unrelated" => 1i64 };
    let mut out = String::new();
    assert!(WRITER.write_insert(&mut out, &schema, &row, None).is_err());
    assert!(WRITER.write_update(&mut out, &schema, &row, None).is_err());
}

#[test]
fn update_sets_all_columns_but_the_key() {
    let schema = user_schema();
    let row = row! { "id" => 42i64, "account" => "fred", "is_active" => false };
    let mut out = String::new();
    WRITER.write_update(&mut out, &schema, &row, None).unwrap();
    assert_eq!(
        out,
        indoc! {r#"
            UPDATE "user" SET "account" = 'fred', "is_active" = false
            WHERE "id" = 42"#}
    );
}

#[test]
fn update_without_key_is_an_error() {
    let schema = user_schema();
    let row = row! { "account" => "fred" };
    let mut out = String::new();
    let error = WRITER.write_update(&mut out, &schema, &row, None).unwrap_err();
    assert!(error.to_string().contains("Primary key `id` not provided"));
}

#[test]
fn delete_and_count_wrap_their_condition() {
    let schema = user_schema();
    let mut out = String::new();
    WRITER.write_delete(&mut out, &schema, r#""id" = 42"#);
    assert_eq!(
        out,
        indoc! {r#"
            DELETE FROM "user"
            WHERE "id" = 42"#}
    );

    let mut out = String::new();
    WRITER.write_count(&mut out, &schema, "is_active = true");
    assert_eq!(
        out,
        indoc! {r#"
            SELECT COUNT(*) AS tally
            FROM "user"
            WHERE is_active = true"#}
    );
}

#[test]
fn log_truncation_lands_on_char_boundaries() {
    let long = format!("{}établi", "a".repeat(496));
    assert_eq!(
        format!("{}", truncate_long!(long)),
        format!("{}...", "a".repeat(496))
    );

    let exact = "a".repeat(497);
    assert_eq!(format!("{}", truncate_long!(exact)), exact);

    let short = "SELECT 'é'";
    assert_eq!(format!("{}", truncate_long!(short)), short);
}

#[test]
fn generic_introspection_reads_information_schema() {
    let mut out = String::new();
    WRITER.write_table_columns(&mut out, "the'table");
    assert!(out.contains("information_schema.columns"));
    assert!(out.contains("constraint_type = 'PRIMARY KEY'"));
    assert!(out.contains("'the''table'"));
    assert!(out.ends_with("ORDER BY c.ordinal_position"));

    let schema = WRITER
        .parse_table_columns("user", schema_rows("id", &["id", "account", "is_active"]))
        .unwrap();
    assert_eq!(schema.primary_key, "id");
    assert_eq!(schema.columns, ["id", "account", "is_active"]);
}

#[test]
fn introspection_failures_are_fatal() {
    assert!(WRITER.parse_table_columns("ghost", Vec::new()).is_err());
    let no_key = schema_rows("none", &["a", "b"]);
    assert!(WRITER.parse_table_columns("user", no_key).is_err());
    let composite = schema_rows("a", &["a", "b"])
        .into_iter()
        .map(|mut row| {
            row.insert("pk".to_owned(), Value::from(1i64));
            row
        })
        .collect();
    let error = WRITER.parse_table_columns("user", composite).unwrap_err();
    assert!(error.to_string().contains("composite primary key"));
}

#[test]
fn mysql_introspects_with_describe() {
    let writer = MysqlSqlWriter::new();
    let mut out = String::new();
    writer.write_table_columns(&mut out, "user");
    assert_eq!(out, "DESCRIBE `user`");

    let rows = vec![
        row! { "Field" => "id", "Key" => "PRI" },
        row! { "Field" => "account", "Key" => "" },
    ];
    let schema = writer.parse_table_columns("user", rows).unwrap();
    assert_eq!(schema.primary_key, "id");
    assert_eq!(schema.columns, ["id", "account"]);
}

#[test]
fn postgres_appends_returning_clause() {
    let writer = PostgresSqlWriter::new();
    let schema = user_schema();
    let row = row! { "account" => "fred" };
    let mut out = String::new();
    writer.write_insert(&mut out, &schema, &row, None).unwrap();
    writer.write_insert_returning(&mut out, &schema.primary_key);
    assert_eq!(
        out,
        indoc! {r#"
            INSERT INTO "user" ("account") VALUES ('fred')
            RETURNING "id""#}
    );
}
