//! Entity mapping metadata consulted by the converter and DDL generation

use std::collections::BTreeMap;

use crate::dialect::column_types::SqlType;

use super::error::{DialectError, DialectResult};

/// All mapped entities, keyed case-insensitively by entity name
#[derive(Debug, Clone, Default)]
pub struct MappingModel {
    entities: BTreeMap<String, EntityMapping>,
}

impl MappingModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_entity(&mut self, entity: EntityMapping) {
        self.entities.insert(entity.name.to_lowercase(), entity);
    }

    pub fn with_entity(mut self, entity: EntityMapping) -> Self {
        self.add_entity(entity);
        self
    }

    pub fn entity(&self, name: &str) -> Option<&EntityMapping> {
        self.entities.get(&name.to_lowercase())
    }

    /// Like [`MappingModel::entity`], failing with `UnknownEntity`
    pub fn require_entity(&self, name: &str) -> DialectResult<&EntityMapping> {
        self.entity(name)
            .ok_or_else(|| DialectError::UnknownEntity(name.to_string()))
    }

    /// Entities in name order
    pub fn entities(&self) -> impl Iterator<Item = &EntityMapping> {
        self.entities.values()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entities.contains_key(&name.to_lowercase())
    }
}

/// How an entity's identifier is generated
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum IdGeneration {
    #[default]
    Assigned,
    Identity,
    Sequence {
        name: String,
        start: i64,
        increment: i64,
    },
}

/// A mapped entity and its table
#[derive(Debug, Clone)]
pub struct EntityMapping {
    pub name: String,
    pub table: String,
    pub id: AttributeMapping,
    pub id_generation: IdGeneration,
    attributes: Vec<AttributeMapping>,
    to_one: Vec<ToOneMapping>,
    to_many: Vec<ToManyMapping>,
}

impl EntityMapping {
    /// Entity with a `bigint` id named `id` and a snake_case table name
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let table = to_snake_case(&name);
        Self {
            name,
            table,
            id: AttributeMapping::new("id", SqlType::BigInt).not_null(),
            id_generation: IdGeneration::Assigned,
            attributes: Vec::new(),
            to_one: Vec::new(),
            to_many: Vec::new(),
        }
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    pub fn with_id(mut self, id: AttributeMapping) -> Self {
        self.id = id.not_null();
        self
    }

    pub fn with_id_generation(mut self, generation: IdGeneration) -> Self {
        self.id_generation = generation;
        self
    }

    pub fn attribute(mut self, attribute: AttributeMapping) -> Self {
        self.attributes.push(attribute);
        self
    }

    pub fn to_one(mut self, association: ToOneMapping) -> Self {
        self.to_one.push(association);
        self
    }

    pub fn to_many(mut self, association: ToManyMapping) -> Self {
        self.to_many.push(association);
        self
    }

    /// Basic attributes in declaration order, without the id
    pub fn attributes(&self) -> &[AttributeMapping] {
        &self.attributes
    }

    pub fn to_one_associations(&self) -> &[ToOneMapping] {
        &self.to_one
    }

    pub fn to_many_associations(&self) -> &[ToManyMapping] {
        &self.to_many
    }

    /// Look up a property by name (case-insensitive); the id is a basic attribute
    pub fn property(&self, name: &str) -> Option<Property<'_>> {
        if self.id.name.eq_ignore_ascii_case(name) {
            return Some(Property::Basic(&self.id));
        }
        if let Some(attribute) = self.attributes.iter().find(|a| a.name.eq_ignore_ascii_case(name)) {
            return Some(Property::Basic(attribute));
        }
        if let Some(association) = self.to_one.iter().find(|a| a.name.eq_ignore_ascii_case(name)) {
            return Some(Property::ToOne(association));
        }
        self.to_many
            .iter()
            .find(|a| a.name.eq_ignore_ascii_case(name))
            .map(Property::ToMany)
    }

    /// Like [`EntityMapping::property`], failing with `UnknownAttribute`
    pub fn require_property(&self, name: &str) -> DialectResult<Property<'_>> {
        self.property(name).ok_or_else(|| DialectError::UnknownAttribute {
            entity: self.name.clone(),
            attribute: name.to_string(),
        })
    }
}

/// A resolved entity property
#[derive(Debug, Clone, Copy)]
pub enum Property<'a> {
    Basic(&'a AttributeMapping),
    ToOne(&'a ToOneMapping),
    ToMany(&'a ToManyMapping),
}

/// A column-backed attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeMapping {
    pub name: String,
    pub column: String,
    pub sql_type: SqlType,
    pub length: Option<u64>,
    pub precision: Option<u32>,
    pub scale: Option<u32>,
    pub nullable: bool,
    pub unique: bool,
}

impl AttributeMapping {
    pub fn new(name: impl Into<String>, sql_type: SqlType) -> Self {
        let name = name.into();
        let column = to_snake_case(&name);
        Self {
            name,
            column,
            sql_type,
            length: None,
            precision: None,
            scale: None,
            nullable: true,
            unique: false,
        }
    }

    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.column = column.into();
        self
    }

    pub fn with_length(mut self, length: u64) -> Self {
        self.length = Some(length);
        self
    }

    pub fn with_precision(mut self, precision: u32, scale: u32) -> Self {
        self.precision = Some(precision);
        self.scale = Some(scale);
        self
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }
}

/// Many-to-one or one-to-one through a foreign key on the owning table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToOneMapping {
    pub name: String,
    pub target_entity: String,
    pub fk_column: String,
    pub optional: bool,
}

impl ToOneMapping {
    /// Foreign key column defaults to `<name>_id`
    pub fn new(name: impl Into<String>, target_entity: impl Into<String>) -> Self {
        let name = name.into();
        let fk_column = format!("{}_id", to_snake_case(&name));
        Self {
            name,
            target_entity: target_entity.into(),
            fk_column,
            optional: true,
        }
    }

    pub fn with_fk_column(mut self, column: impl Into<String>) -> Self {
        self.fk_column = column.into();
        self
    }

    pub fn required(mut self) -> Self {
        self.optional = false;
        self
    }
}

/// How a to-many association is stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectionStorage {
    /// Foreign key on the element table pointing back at the owner
    ForeignKey { column: String },
    /// Separate link table
    JoinTable {
        table: String,
        owner_column: String,
        element_column: String,
    },
}

/// One-to-many or many-to-many collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToManyMapping {
    pub name: String,
    pub element_entity: String,
    pub storage: CollectionStorage,
}

impl ToManyMapping {
    pub fn foreign_key(
        name: impl Into<String>,
        element_entity: impl Into<String>,
        column: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            element_entity: element_entity.into(),
            storage: CollectionStorage::ForeignKey {
                column: column.into(),
            },
        }
    }

    pub fn join_table(
        name: impl Into<String>,
        element_entity: impl Into<String>,
        table: impl Into<String>,
        owner_column: impl Into<String>,
        element_column: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            element_entity: element_entity.into(),
            storage: CollectionStorage::JoinTable {
                table: table.into(),
                owner_column: owner_column.into(),
                element_column: element_column.into(),
            },
        }
    }
}

/// Convert a CamelCase name to snake_case ("OrderLine" -> "order_line")
pub fn to_snake_case(s: &str) -> String {
    let mut result = String::with_capacity(s.len() + 4);
    let mut chars = s.chars().peekable();
    let mut prev_was_upper = false;
    // start of input counts as a word boundary
    let mut prev_was_underscore = true;

    while let Some(c) = chars.next() {
        if c == '_' {
            result.push('_');
            prev_was_underscore = true;
            prev_was_upper = false;
        } else if c.is_uppercase() {
            // "HTTPApi" -> "http_api"
            if !prev_was_underscore {
                let next_is_lower = chars.peek().map(|c| c.is_lowercase()).unwrap_or(false);
                if !prev_was_upper || next_is_lower {
                    result.push('_');
                }
            }
            result.extend(c.to_lowercase());
            prev_was_upper = true;
            prev_was_underscore = false;
        } else {
            result.extend(c.to_lowercase());
            prev_was_upper = false;
            prev_was_underscore = false;
        }
    }

    result
}
