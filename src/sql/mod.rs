//! SQL rendering and schema generation
//!
//! This module turns dialect-neutral trees into vendor SQL:
//!
//! 1. [`SqlAstTranslator`] renders a [`crate::ast::Statement`] to SQL text
//!    plus its ordered bind parameters
//! 2. [`DdlGenerator`] renders `create`/`drop` statements for a
//!    [`MappingModel`]
//!
//! # Example
//!
//! ```rust
//! use ormdialect::ast::{Expression, Predicate, QuerySpec, SelectStatement, Statement};
//! use ormdialect::Dialect;
//!
//! let dialect = Dialect::resolve("ingres", 10).unwrap();
//! let query = QuerySpec::from_table("person", "t0")
//!     .select(Expression::column("t0", "name"))
//!     .filter(Predicate::eq(Expression::column("t0", "id"), Expression::named_param("id")));
//!
//! let rendering = dialect
//!     .sql_ast_translator()
//!     .translate(&Statement::Select(SelectStatement::new(query)))
//!     .unwrap();
//! assert_eq!(rendering.sql, "select t0.name from person t0 where t0.id = ?");
//! assert_eq!(rendering.parameters.len(), 1);
//! ```

pub mod ddl;
pub mod error;
pub mod mapping;
pub mod translator;

pub use ddl::DdlGenerator;
pub use error::{DialectError, DialectResult, TranslationWarning};
pub use mapping::{
    AttributeMapping, CollectionStorage, EntityMapping, IdGeneration, MappingModel, Property,
    ToManyMapping, ToOneMapping,
};
pub use translator::{
    BindVariableMode, SqlAstTranslator, SqlParameter, SqlRendering, TranslationConfig,
};
