//! Schema DDL for mapped entities

use tracing::debug;

use crate::dialect::capability::Capability;
use crate::dialect::Dialect;

use super::error::{DialectError, DialectResult};
use super::mapping::{
    AttributeMapping, CollectionStorage, EntityMapping, IdGeneration, MappingModel, ToManyMapping,
};

/// Generator for `create`/`drop` statements on one dialect
pub struct DdlGenerator<'d> {
    dialect: &'d Dialect,
    quote_identifiers: bool,
}

impl<'d> DdlGenerator<'d> {
    pub fn new(dialect: &'d Dialect) -> Self {
        Self {
            dialect,
            quote_identifiers: false,
        }
    }

    pub fn quoting_identifiers(mut self, quote: bool) -> Self {
        self.quote_identifiers = quote;
        self
    }

    fn ident(&self, name: &str) -> String {
        if self.quote_identifiers {
            self.dialect.quote_identifier(name)
        } else {
            name.to_string()
        }
    }

    fn column_type(&self, attribute: &AttributeMapping) -> DialectResult<String> {
        self.dialect.column_type_for(
            attribute.sql_type,
            attribute.length,
            attribute.precision,
            attribute.scale,
        )
    }

    /// `name type [not null|<null string>] [unique]`
    fn column_definition(&self, attribute: &AttributeMapping) -> DialectResult<String> {
        let mut column = format!("{} {}", self.ident(&attribute.column), self.column_type(attribute)?);
        if attribute.nullable {
            column.push_str(self.dialect.null_column_string());
        } else {
            column.push_str(" not null");
        }
        if attribute.unique {
            column.push_str(" unique");
        }
        Ok(column)
    }

    fn id_column(&self, entity: &EntityMapping) -> DialectResult<(String, bool)> {
        let id = &entity.id;
        if entity.id_generation != IdGeneration::Identity {
            return Ok((self.column_definition(id)?, false));
        }
        let strategy = self.dialect.identity_strategy();
        let type_name = self.column_type(id)?;
        let big = matches!(id.sql_type, crate::dialect::column_types::SqlType::BigInt);
        let definition = strategy.column_definition(&type_name, big).ok_or_else(|| {
            DialectError::unsupported(
                self.dialect.name(),
                "identity columns",
                self.dialect.minimum_version(Capability::IdentityColumns),
            )
        })?;
        Ok((
            format!("{} {}", self.ident(&id.column), definition),
            strategy.includes_primary_key(),
        ))
    }

    /// `create table` for an entity, with to-one foreign key columns
    pub fn create_table(&self, entity: &EntityMapping, model: &MappingModel) -> DialectResult<String> {
        let (id_column, inline_primary_key) = self.id_column(entity)?;
        let mut columns = vec![id_column];

        for attribute in entity.attributes() {
            columns.push(self.column_definition(attribute)?);
        }

        for association in entity.to_one_associations() {
            let target = model.require_entity(&association.target_entity)?;
            let mut fk = target.id.clone().with_column(association.fk_column.clone());
            fk.nullable = association.optional;
            fk.unique = false;
            columns.push(self.column_definition(&fk)?);
        }

        // foreign-key-mapped collections put their column on the element table
        for owner in model.entities() {
            for collection in owner.to_many_associations() {
                if !collection.element_entity.eq_ignore_ascii_case(&entity.name) {
                    continue;
                }
                if let CollectionStorage::ForeignKey { ref column } = collection.storage {
                    let declared = entity
                        .to_one_associations()
                        .iter()
                        .any(|a| a.fk_column.eq_ignore_ascii_case(column));
                    if !declared {
                        let mut fk = owner.id.clone().with_column(column.clone());
                        fk.nullable = true;
                        columns.push(self.column_definition(&fk)?);
                    }
                }
            }
        }

        if !inline_primary_key {
            columns.push(format!("primary key ({})", self.ident(&entity.id.column)));
        }

        let ddl = format!("create table {} ({})", self.ident(&entity.table), columns.join(", "));
        debug!(dialect = self.dialect.name(), entity = %entity.name, "generated table ddl");
        Ok(ddl)
    }

    /// Link table for a join-table collection
    pub fn create_join_table(
        &self,
        owner: &EntityMapping,
        collection: &ToManyMapping,
        model: &MappingModel,
    ) -> DialectResult<Option<String>> {
        let CollectionStorage::JoinTable {
            ref table,
            ref owner_column,
            ref element_column,
        } = collection.storage
        else {
            return Ok(None);
        };
        let element = model.require_entity(&collection.element_entity)?;
        let owner_key = owner.id.clone().with_column(owner_column.clone()).not_null();
        let element_key = element.id.clone().with_column(element_column.clone()).not_null();
        Ok(Some(format!(
            "create table {} ({}, {}, primary key ({}, {}))",
            self.ident(table),
            self.column_definition(&owner_key)?,
            self.column_definition(&element_key)?,
            self.ident(owner_column),
            self.ident(element_column),
        )))
    }

    /// `drop table`, with `if exists` where the dialect allows it
    pub fn drop_table(&self, table: &str) -> String {
        if self.dialect.supports(Capability::IfExistsBeforeTableName) {
            format!("drop table if exists {}", self.ident(table))
        } else if self.dialect.supports(Capability::IfExistsAfterTableName) {
            format!("drop table {} if exists", self.ident(table))
        } else {
            format!("drop table {}", self.ident(table))
        }
    }

    fn foreign_key_name(table: &str, column: &str) -> String {
        format!("fk_{}_{}", table, column)
    }

    /// `alter table ... add constraint` for each to-one association and join table
    pub fn foreign_keys(&self, entity: &EntityMapping, model: &MappingModel) -> DialectResult<Vec<String>> {
        if !self.dialect.supports(Capability::ForeignKeyConstraints) {
            return Ok(Vec::new());
        }
        let mut statements = Vec::new();
        for association in entity.to_one_associations() {
            let target = model.require_entity(&association.target_entity)?;
            statements.push(self.add_foreign_key(&entity.table, &association.fk_column, target));
        }
        for collection in entity.to_many_associations() {
            match collection.storage {
                CollectionStorage::JoinTable {
                    ref table,
                    ref owner_column,
                    ref element_column,
                } => {
                    let element = model.require_entity(&collection.element_entity)?;
                    statements.push(self.add_foreign_key(table, owner_column, entity));
                    statements.push(self.add_foreign_key(table, element_column, element));
                }
                CollectionStorage::ForeignKey { ref column } => {
                    let element = model.require_entity(&collection.element_entity)?;
                    let declared = element
                        .to_one_associations()
                        .iter()
                        .any(|a| a.fk_column.eq_ignore_ascii_case(column));
                    if !declared {
                        statements.push(self.add_foreign_key(&element.table, column, entity));
                    }
                }
            }
        }
        Ok(statements)
    }

    fn add_foreign_key(&self, table: &str, column: &str, target: &EntityMapping) -> String {
        format!(
            "alter table {} add constraint {} foreign key ({}) references {} ({})",
            self.ident(table),
            Self::foreign_key_name(table, column),
            self.ident(column),
            self.ident(&target.table),
            self.ident(&target.id.column),
        )
    }

    /// Constraint drops to run before dropping tables; empty when the dialect
    /// drops constraints with the table
    pub fn drop_foreign_keys(&self, entity: &EntityMapping) -> Vec<String> {
        if !self.dialect.drop_constraints() || !self.dialect.supports(Capability::ForeignKeyConstraints) {
            return Vec::new();
        }
        let keyword = match self.dialect.product() {
            crate::dialect::Product::MySql => "drop foreign key",
            _ => "drop constraint",
        };
        entity
            .to_one_associations()
            .iter()
            .map(|association| {
                format!(
                    "alter table {} {} {}",
                    self.ident(&entity.table),
                    keyword,
                    Self::foreign_key_name(&entity.table, &association.fk_column)
                )
            })
            .collect()
    }

    /// One index per to-one foreign key column
    pub fn create_indexes(&self, entity: &EntityMapping) -> Vec<String> {
        entity
            .to_one_associations()
            .iter()
            .map(|association| {
                format!(
                    "create index {} on {} ({})",
                    self.ident(&format!("idx_{}_{}", entity.table, association.fk_column)),
                    self.ident(&entity.table),
                    self.ident(&association.fk_column)
                )
            })
            .collect()
    }

    pub fn create_sequence(&self, name: &str, start: i64, increment: i64) -> DialectResult<String> {
        self.dialect
            .sequence_strategy()
            .create_sequence(name, start, increment)
            .ok_or_else(|| self.sequences_unsupported())
    }

    pub fn drop_sequence(&self, name: &str) -> DialectResult<String> {
        self.dialect
            .sequence_strategy()
            .drop_sequence(name)
            .ok_or_else(|| self.sequences_unsupported())
    }

    fn sequences_unsupported(&self) -> DialectError {
        DialectError::unsupported(
            self.dialect.name(),
            "sequences",
            self.dialect.minimum_version(Capability::Sequences),
        )
    }

    /// Create and drop statements for the temporary id table of an entity
    pub fn temporary_id_table(&self, entity: &EntityMapping) -> DialectResult<(String, String)> {
        let strategy = self.dialect.temporary_table_strategy();
        let name = strategy.id_table_name(&entity.table);
        let id = entity.id.clone().not_null();
        let columns = vec![self.column_definition(&id)?];
        Ok((strategy.create_ddl(&name, &columns), strategy.drop_ddl(&name)))
    }

    /// Full schema in execution order: sequences, tables, join tables, constraints, indexes
    pub fn create_schema(&self, model: &MappingModel) -> DialectResult<Vec<String>> {
        let mut statements = Vec::new();
        for entity in model.entities() {
            if let IdGeneration::Sequence {
                ref name,
                start,
                increment,
            } = entity.id_generation
            {
                statements.push(self.create_sequence(name, start, increment)?);
            }
        }
        for entity in model.entities() {
            statements.push(self.create_table(entity, model)?);
        }
        for entity in model.entities() {
            for collection in entity.to_many_associations() {
                if let Some(ddl) = self.create_join_table(entity, collection, model)? {
                    statements.push(ddl);
                }
            }
        }
        for entity in model.entities() {
            statements.extend(self.foreign_keys(entity, model)?);
        }
        for entity in model.entities() {
            statements.extend(self.create_indexes(entity));
        }
        debug!(
            dialect = self.dialect.name(),
            statements = statements.len(),
            "generated schema ddl"
        );
        Ok(statements)
    }

    /// Reverse of [`DdlGenerator::create_schema`]
    pub fn drop_schema(&self, model: &MappingModel) -> DialectResult<Vec<String>> {
        let mut statements = Vec::new();
        for entity in model.entities() {
            statements.extend(self.drop_foreign_keys(entity));
        }
        for entity in model.entities() {
            for collection in entity.to_many_associations() {
                if let CollectionStorage::JoinTable { ref table, .. } = collection.storage {
                    statements.push(self.drop_table(table));
                }
            }
        }
        for entity in model.entities() {
            statements.push(self.drop_table(&entity.table));
        }
        for entity in model.entities() {
            if let IdGeneration::Sequence { ref name, .. } = entity.id_generation {
                statements.push(self.drop_sequence(name)?);
            }
        }
        Ok(statements)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::column_types::SqlType;
    use crate::sql::mapping::ToOneMapping;
    use pretty_assertions::assert_eq;

    fn model() -> MappingModel {
        MappingModel::new()
            .with_entity(
                EntityMapping::new("Person")
                    .with_id_generation(IdGeneration::Identity)
                    .attribute(AttributeMapping::new("name", SqlType::Varchar).with_length(100).not_null())
                    .attribute(AttributeMapping::new("nickname", SqlType::Varchar).with_length(50))
                    .to_one(ToOneMapping::new("address", "Address")),
            )
            .with_entity(
                EntityMapping::new("Address").attribute(AttributeMapping::new("city", SqlType::Varchar)),
            )
    }

    #[test]
    fn test_create_table_postgres() {
        let dialect = Dialect::resolve("postgresql", 15).unwrap();
        let model = model();
        let ddl = DdlGenerator::new(&dialect)
            .create_table(model.entity("Person").unwrap(), &model)
            .unwrap();
        assert_eq!(
            ddl,
            "create table person (id bigint generated by default as identity, \
             name varchar(100) not null, nickname varchar(50), address_id bigint, primary key (id))"
        );
    }

    #[test]
    fn test_ingres_null_column_string() {
        let dialect = Dialect::resolve("ingres", 10).unwrap();
        let model = model();
        let ddl = DdlGenerator::new(&dialect)
            .create_table(model.entity("Address").unwrap(), &model)
            .unwrap();
        assert_eq!(
            ddl,
            "create table address (id bigint not null, city varchar(255) with null, primary key (id))"
        );
    }

    #[test]
    fn test_identity_unsupported_before_ingres_9_3() {
        let dialect = Dialect::resolve("ingres", (9, 2)).unwrap();
        let model = model();
        let err = DdlGenerator::new(&dialect)
            .create_table(model.entity("Person").unwrap(), &model)
            .unwrap_err();
        assert!(matches!(err, DialectError::UnsupportedSqlConstruct { .. }));
    }

    #[test]
    fn test_sqlite_rowid_identity() {
        let dialect = Dialect::resolve("sqlite", (3, 45)).unwrap();
        let model = model();
        let generator = DdlGenerator::new(&dialect);
        let ddl = generator.create_table(model.entity("Person").unwrap(), &model).unwrap();
        assert!(ddl.starts_with("create table person (id integer primary key autoincrement, "));
        assert!(!ddl.contains("primary key (id)"));
        assert!(generator.foreign_keys(model.entity("Person").unwrap(), &model).unwrap().is_empty());
    }

    #[test]
    fn test_drop_table_if_exists() {
        let model = model();
        let pg = Dialect::resolve("postgresql", 15).unwrap();
        assert_eq!(DdlGenerator::new(&pg).drop_table("person"), "drop table if exists person");
        let mssql = Dialect::resolve("sqlserver", 11).unwrap();
        assert_eq!(DdlGenerator::new(&mssql).drop_table("person"), "drop table person");
        let ingres = Dialect::resolve("ingres", 10).unwrap();
        assert!(DdlGenerator::new(&ingres)
            .drop_foreign_keys(model.entity("Person").unwrap())
            .is_empty());
    }

    #[test]
    fn test_sequences() {
        let mysql = Dialect::resolve("mysql", 8).unwrap();
        assert!(DdlGenerator::new(&mysql).create_sequence("person_seq", 1, 50).is_err());
        let pg = Dialect::resolve("postgresql", 15).unwrap();
        assert_eq!(
            DdlGenerator::new(&pg).create_sequence("person_seq", 1, 50).unwrap(),
            "create sequence person_seq start with 1 increment by 50"
        );
    }

    #[test]
    fn test_temporary_id_table() {
        let ingres = Dialect::resolve("ingres", 10).unwrap();
        let model = model();
        let (create, drop) = DdlGenerator::new(&ingres)
            .temporary_id_table(model.entity("Person").unwrap())
            .unwrap();
        assert_eq!(
            create,
            "declare global temporary table session.HT_person (id bigint not null) \
             on commit preserve rows with norecovery"
        );
        assert_eq!(drop, "drop table session.HT_person");
    }
}
