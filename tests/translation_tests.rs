//! SQL-AST translation across vendors: pagination, locking, bind order and warnings

use ormdialect::ast::{
    Assignment, ComparisonOperator, DeleteStatement, Expression, InsertSource, InsertStatement, LockOptions, Predicate,
    QueryGroup, QuerySpec, SelectStatement, SetOperator, SortSpec, Statement, TableReference,
};
use ormdialect::dialect::temporal::TemporalUnit;
use ormdialect::sql::{BindVariableMode, DialectError, SqlRendering, TranslationWarning};
use ormdialect::{DatabaseVersion, Dialect};
use pretty_assertions::assert_eq;

fn names() -> QuerySpec {
    QuerySpec::from_table("person", "t0").select(Expression::column("t0", "name"))
}

fn translate(dialect: &Dialect, statement: Statement) -> Result<SqlRendering, DialectError> {
    dialect.sql_ast_translator().translate(&statement)
}

fn select_sql(product: &str, version: impl Into<DatabaseVersion>, query: QuerySpec) -> Result<String, DialectError> {
    let dialect = Dialect::resolve(product, version)?;
    Ok(translate(&dialect, Statement::Select(SelectStatement::new(query)))?.sql)
}

fn page(query: QuerySpec, limit: Option<i64>, offset: Option<i64>) -> QuerySpec {
    let query = match limit {
        Some(limit) => query.limit(Expression::integer(limit)),
        None => query,
    };
    match offset {
        Some(offset) => query.offset(Expression::integer(offset)),
        None => query,
    }
}

fn ordered() -> QuerySpec {
    names().order(SortSpec::asc(Expression::column("t0", "name")))
}

#[test]
fn test_pagination_by_vendor() {
    let cases: Vec<(&str, DatabaseVersion, Option<i64>, Option<i64>, &str)> = vec![
        (
            "postgresql",
            DatabaseVersion::new(15, 0),
            Some(10),
            Some(20),
            "select t0.name from person t0 order by t0.name limit 10 offset 20",
        ),
        (
            "mysql",
            DatabaseVersion::new(8, 0),
            None,
            Some(20),
            "select t0.name from person t0 order by t0.name limit 18446744073709551615 offset 20",
        ),
        (
            "sqlite",
            DatabaseVersion::new(3, 45),
            None,
            Some(20),
            "select t0.name from person t0 order by t0.name limit -1 offset 20",
        ),
        (
            "sqlserver",
            DatabaseVersion::new(11, 0),
            Some(10),
            Some(20),
            "select t0.name from person t0 order by t0.name offset 20 rows fetch next 10 rows only",
        ),
        (
            "sqlserver",
            DatabaseVersion::new(10, 0),
            Some(10),
            None,
            "select top (10) t0.name from person t0 order by t0.name",
        ),
        (
            "ingres",
            DatabaseVersion::new(9, 2),
            Some(10),
            None,
            "select first 10 t0.name from person t0 order by t0.name",
        ),
        (
            "ingres",
            DatabaseVersion::new(10, 0),
            Some(10),
            Some(20),
            "select t0.name from person t0 order by t0.name offset 20 fetch next 10 rows only",
        ),
    ];
    for (product, version, limit, offset, expected) in cases {
        assert_eq!(
            select_sql(product, version, page(ordered(), limit, offset)).unwrap(),
            expected,
            "{} {}",
            product,
            version
        );
    }
}

#[test]
fn test_sql_server_fetch_needs_order_by() {
    assert_eq!(
        select_sql("sqlserver", 11, page(names(), Some(5), Some(5))).unwrap(),
        "select t0.name from person t0 order by @@version offset 5 rows fetch next 5 rows only"
    );
}

#[test]
fn test_offset_rejected_before_support() {
    for (product, version, minimum) in [
        ("ingres", DatabaseVersion::new(9, 2), DatabaseVersion::new(9, 3)),
        ("sqlserver", DatabaseVersion::new(10, 0), DatabaseVersion::new(11, 0)),
    ] {
        match select_sql(product, version, page(ordered(), Some(10), Some(20))).unwrap_err() {
            DialectError::UnsupportedSqlConstruct { minimum_version, .. } => {
                assert_eq!(minimum_version, Some(minimum), "{}", product);
            }
            other => panic!("unexpected error: {}", other),
        }
    }
}

#[test]
fn test_lock_rendering_by_vendor() {
    let locked = |product: &str, version: DatabaseVersion, lock: LockOptions| {
        let dialect = Dialect::resolve(product, version).unwrap();
        translate(&dialect, Statement::Select(SelectStatement::new(names()).with_lock(lock))).unwrap()
    };

    let pg = locked("postgresql", DatabaseVersion::new(15, 0), LockOptions::write().nowait());
    assert_eq!(pg.sql, "select t0.name from person t0 for update nowait");
    assert!(pg.warnings.is_empty());

    let pg94 = locked("postgresql", DatabaseVersion::new(9, 4), LockOptions::write().skip_locked());
    assert_eq!(pg94.sql, "select t0.name from person t0 for update");
    assert_eq!(
        pg94.warnings,
        vec![TranslationWarning::LockOptionIgnored {
            dialect: "PostgreSQL 9.4".to_string(),
            option: "skip locked".to_string(),
        }]
    );

    let mssql = locked("sqlserver", DatabaseVersion::new(16, 0), LockOptions::write().nowait());
    assert_eq!(mssql.sql, "select t0.name from person t0 with (updlock, rowlock, nowait)");

    let mysql = locked("mysql", DatabaseVersion::new(5, 7), LockOptions::read());
    assert_eq!(mysql.sql, "select t0.name from person t0 lock in share mode");

    let ingres = locked("ingres", DatabaseVersion::new(10, 0), LockOptions::write());
    assert_eq!(ingres.sql, "select t0.name from person t0");
    assert_eq!(
        ingres.warnings,
        vec![TranslationWarning::LockClauseOmitted {
            dialect: "Ingres 10.0".to_string()
        }]
    );
}

#[test]
fn test_bind_parameters_follow_text_order() {
    let dialect = Dialect::resolve("postgresql", 15).unwrap();
    let query = QuerySpec::from_table("person", "t0")
        .select(Expression::function(
            "coalesce",
            vec![Expression::column("t0", "nickname"), Expression::named_param("fallback")],
        ))
        .filter(Predicate::eq(Expression::column("t0", "id"), Expression::named_param("id")))
        .filter(Predicate::eq(Expression::column("t0", "name"), Expression::named_param("fallback")));
    let rendering = translate(&dialect, Statement::Select(SelectStatement::new(query))).unwrap();

    assert_eq!(
        rendering.sql,
        "select coalesce(t0.nickname, $1) from person t0 where t0.id = $2 and t0.name = $3"
    );
    let sources: Vec<String> = rendering.parameters.iter().map(|p| p.source.to_string()).collect();
    assert_eq!(sources, vec![":fallback", ":id", ":fallback"]);
    let positions: Vec<usize> = rendering.parameters.iter().map(|p| p.position).collect();
    assert_eq!(positions, vec![1, 2, 3]);
}

#[test]
fn test_placeholder_mode_inlines_names() {
    let dialect = Dialect::resolve("postgresql", 15).unwrap();
    let query = names().filter(Predicate::eq(Expression::column("t0", "id"), Expression::named_param("id")));
    let rendering = dialect
        .sql_ast_translator()
        .with_bind_mode(BindVariableMode::Placeholder)
        .translate(&Statement::Select(SelectStatement::new(query)))
        .unwrap();
    assert_eq!(rendering.sql, "select t0.name from person t0 where t0.id = :id");
}

#[test]
fn test_subquery_order_by_dropped_with_warning() {
    let subquery = QuerySpec::from_table("address", "t1")
        .select(Expression::column("t1", "id"))
        .order(SortSpec::asc(Expression::column("t1", "city")));
    let query = names().filter(Predicate::InSubquery {
        expression: Expression::column("t0", "address_id"),
        query: Box::new(subquery.into()),
        negated: false,
    });
    let statement = Statement::Select(SelectStatement::new(query));

    let ingres = Dialect::resolve("ingres", 10).unwrap();
    let rendering = translate(&ingres, statement.clone()).unwrap();
    assert_eq!(
        rendering.sql,
        "select t0.name from person t0 where t0.address_id in (select t1.id from address t1)"
    );
    assert_eq!(rendering.warnings, vec![TranslationWarning::SubqueryOrderByRemoved]);

    let pg = Dialect::resolve("postgresql", 15).unwrap();
    let rendering = translate(&pg, statement).unwrap();
    assert_eq!(
        rendering.sql,
        "select t0.name from person t0 where t0.address_id in (select t1.id from address t1 order by t1.city)"
    );
    assert!(rendering.warnings.is_empty());
}

#[test]
fn test_union_all_gated_on_ingres() {
    let group = QueryGroup::new(
        SetOperator::UnionAll,
        vec![
            QuerySpec::from_table("person", "t0").select(Expression::column("t0", "id")).into(),
            QuerySpec::from_table("address", "t1").select(Expression::column("t1", "id")).into(),
        ],
    );
    let statement = Statement::Select(SelectStatement::new(group));

    let v93 = Dialect::resolve("ingres", (9, 3)).unwrap();
    assert_eq!(
        translate(&v93, statement.clone()).unwrap().sql,
        "select t0.id from person t0 union all select t1.id from address t1"
    );
    let v92 = Dialect::resolve("ingres", (9, 2)).unwrap();
    assert!(matches!(
        translate(&v92, statement),
        Err(DialectError::UnsupportedSqlConstruct { .. })
    ));
}

#[test]
fn test_insert_update_delete() {
    let pg = Dialect::resolve("postgresql", 15).unwrap();
    let insert = Statement::Insert(InsertStatement {
        table: "person".to_string(),
        columns: vec!["id".to_string(), "name".to_string()],
        source: InsertSource::Values(vec![
            vec![Expression::positional_param(1), Expression::positional_param(2)],
            vec![Expression::positional_param(3), Expression::positional_param(4)],
        ]),
    });
    let rendering = translate(&pg, insert).unwrap();
    assert_eq!(rendering.sql, "insert into person (id, name) values ($1, $2), ($3, $4)");
    assert!(rendering.affected_tables.contains("person"));

    let mssql = Dialect::resolve("sqlserver", 16).unwrap();
    let update = Statement::Update(ormdialect::ast::UpdateStatement {
        table: TableReference::new("person", "t0"),
        assignments: vec![Assignment::new("active", Expression::boolean(false))],
        where_clause: Some(Predicate::eq(Expression::column("t0", "id"), Expression::integer(3))),
    });
    assert_eq!(
        translate(&mssql, update).unwrap().sql,
        "update person set active = 0 where id = 3"
    );

    let delete = Statement::Delete(DeleteStatement {
        table: TableReference::new("person", "t0"),
        where_clause: Some(Predicate::is_null(Expression::column("t0", "name"))),
    });
    assert_eq!(translate(&mssql, delete).unwrap().sql, "delete from person where name is null");
}

#[test]
fn test_quoted_identifiers() {
    let mssql = Dialect::resolve("sqlserver", 16).unwrap();
    let rendering = mssql
        .sql_ast_translator()
        .quoting_identifiers(true)
        .translate(&Statement::Select(SelectStatement::new(names())))
        .unwrap();
    assert_eq!(rendering.sql, "select t0.[name] from [person] t0");
}

#[test]
fn test_ingres_temporal_functions() {
    let dialect = Dialect::resolve("ingres", 10).unwrap();
    let query = QuerySpec::from_table("person", "t0")
        .select(Expression::Extract {
            unit: TemporalUnit::DayOfMonth,
            source: Box::new(Expression::column("t0", "born")),
        })
        .select(Expression::TimestampAdd {
            unit: TemporalUnit::Day,
            magnitude: Box::new(Expression::named_param("days")),
            timestamp: Box::new(Expression::column("t0", "born")),
        });
    assert_eq!(
        translate(&dialect, Statement::Select(SelectStatement::new(query))).unwrap().sql,
        "select date_part('day',t0.born), timestampadd(day,?,t0.born) from person t0"
    );
}

#[test]
fn test_malformed_tree_is_internal() {
    let dialect = Dialect::resolve("postgresql", 15).unwrap();
    let empty = QuerySpec::from_table("person", "t0");
    let err = translate(&dialect, Statement::Select(SelectStatement::new(empty))).unwrap_err();
    assert!(err.is_internal());
}

#[test]
fn test_repeated_translation_is_identical() {
    let keyset = || {
        ordered()
            .filter(Predicate::compare(
                Expression::Tuple(vec![Expression::column("t0", "name"), Expression::column("t0", "id")]),
                ComparisonOperator::GreaterThan,
                Expression::Tuple(vec![Expression::named_param("name"), Expression::named_param("id")]),
            ))
            .filter(Predicate::eq(Expression::column("t0", "active"), Expression::named_param("active")))
            .limit(Expression::named_param("rows"))
            .offset(Expression::named_param("skip"))
    };
    // row values are expanded before SQLite 3.15
    for (product, version) in [("sqlite", (3, 8)), ("sqlite", (3, 45)), ("postgresql", (15, 0))] {
        let dialect = Dialect::resolve(product, version).unwrap();
        let statement = Statement::Select(SelectStatement::new(keyset()));
        let first = translate(&dialect, statement.clone()).unwrap();
        let second = translate(&dialect, statement).unwrap();
        assert_eq!(first, second, "{} {:?}", product, version);
        assert_eq!(first.sql.as_bytes(), second.sql.as_bytes());

        let sources: Vec<String> = first.parameters.iter().map(|p| p.source.to_string()).collect();
        let expected_names = if dialect.supports(ormdialect::Capability::RowValueConstructorSyntax) {
            vec![":name", ":id", ":active", ":rows", ":skip"]
        } else {
            vec![":name", ":name", ":id", ":active", ":rows", ":skip"]
        };
        assert_eq!(sources, expected_names, "{}", first.sql);
    }
}
