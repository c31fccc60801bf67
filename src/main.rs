use std::process::ExitCode;

use ormdialect::ast::{ComparisonOperator, JoinKind, LockOptions};
use ormdialect::dialect::column_types::SqlType;
use ormdialect::sql::mapping::{AttributeMapping, EntityMapping, IdGeneration, MappingModel, ToOneMapping};
use ormdialect::sql::translator::SqlAstTranslator;
use ormdialect::sql::DdlGenerator;
use ormdialect::sqm::{SqmExpression, SqmPredicate, SqmQuerySpec, SqmSelect, SqmSortSpec};
use ormdialect::DialectSettings;
use tracing_subscriber::EnvFilter;

fn model() -> MappingModel {
    MappingModel::new()
        .with_entity(
            EntityMapping::new("Person")
                .with_id_generation(IdGeneration::Identity)
                .attribute(AttributeMapping::new("name", SqlType::Varchar).with_length(100).not_null())
                .attribute(AttributeMapping::new("active", SqlType::Boolean))
                .to_one(ToOneMapping::new("address", "Address")),
        )
        .with_entity(
            EntityMapping::new("Address").attribute(AttributeMapping::new("city", SqlType::Varchar)),
        )
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut settings = match DialectSettings::load(None) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Settings error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let mut args = std::env::args().skip(1);
    if let Some(product) = args.next() {
        settings.product = product;
    }
    if let Some(version) = args.next() {
        settings.version = Some(version);
    }

    let dialect = match settings.resolve_dialect() {
        Ok(dialect) => dialect,
        Err(e) => {
            eprintln!("Dialect error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    println!("=== {} ===\n", dialect.name());

    println!("--- Capabilities ---");
    for (capability, supported) in dialect.capabilities().resolved() {
        println!("  {:<48} {}", capability.name(), supported);
    }
    println!();

    let model = model();

    println!("--- Schema ---");
    match DdlGenerator::new(&dialect).create_schema(&model) {
        Ok(statements) => {
            for statement in statements {
                println!("  {};", statement);
            }
        }
        Err(e) => eprintln!("  DDL error: {}", e),
    }
    println!();

    println!("--- Query ---");
    let query = SqmQuerySpec::from_entity("Person", "p")
        .join(JoinKind::Left, "p.address", "a")
        .select(SqmExpression::path("p.name"))
        .select(SqmExpression::path("a.city"))
        .filter(SqmPredicate::Boolean(SqmExpression::path("p.active")))
        .filter(SqmPredicate::compare(
            SqmExpression::function("length", vec![SqmExpression::path("p.name")]),
            ComparisonOperator::GreaterThan,
            SqmExpression::param("min_length"),
        ))
        .order(SqmSortSpec::asc(SqmExpression::path("p.name")))
        .limit(SqmExpression::integer(10));
    let select = SqmSelect::new(query).with_lock(LockOptions::write().nowait());

    let rendered = dialect
        .sqm_converter(&model)
        .convert(&select.into())
        .and_then(|statement| {
            SqlAstTranslator::new(&dialect, settings.translation_config(&dialect)).translate(&statement)
        });
    match rendered {
        Ok(rendering) => {
            println!("  SQL: {}", rendering.sql);
            for parameter in &rendering.parameters {
                println!("  Param {}: {} <- {}", parameter.position, parameter.placeholder, parameter.source);
            }
            for warning in &rendering.warnings {
                println!("  Warning: {}", warning);
            }
        }
        Err(e) => eprintln!("  Translation error: {}", e),
    }

    ExitCode::SUCCESS
}
