//! SQM to SQL-AST lowering

use std::collections::BTreeMap;

use tracing::debug;

use crate::ast::{
    AggregateFunction, Assignment, CaseBranch, DeleteStatement, Expression, JoinKind, Predicate,
    QueryGroup, QueryPart, QuerySpec, SelectItem, SelectStatement, SetOperator, SortSpec, Statement,
    TableGroup, TableJoin, TableReference, UpdateStatement,
};
use crate::dialect::capability::Capability;
use crate::dialect::Dialect;
use crate::sql::error::{DialectError, DialectResult};
use crate::sql::mapping::{CollectionStorage, EntityMapping, MappingModel, Property};

use super::{
    SqmCaseBranch, SqmDelete, SqmExpression, SqmJoin, SqmPath, SqmPredicate, SqmQueryGroup,
    SqmQueryPart, SqmQuerySpec, SqmSelect, SqmSortSpec, SqmStatement, SqmUpdate,
};

/// An identification variable bound to a table alias
#[derive(Debug, Clone)]
struct Binding<'a> {
    entity: &'a EntityMapping,
    alias: String,
    /// Index of the table group the alias lives in
    group: usize,
}

/// Per query spec state
#[derive(Debug, Default)]
struct Scope<'a> {
    variables: BTreeMap<String, Binding<'a>>,
    /// (parent alias, attribute) -> joined alias
    implicit_joins: BTreeMap<(String, String), String>,
    groups: Vec<TableGroup>,
    implicit_joins_allowed: bool,
    grouped: bool,
    size_rewrites: usize,
    /// Owner ids of rewritten size() joins; each owner stays its own group
    size_owners: Vec<Expression>,
}

/// Where a path walk ended up
struct Navigation<'a> {
    scope: usize,
    group: usize,
    entity: &'a EntityMapping,
    alias: String,
}

/// Lowers one SQM statement; consumed by [`SqmToSqlAstConverter::convert`]
pub struct SqmToSqlAstConverter<'a> {
    dialect: &'a Dialect,
    mapping: &'a MappingModel,
    next_alias: usize,
    scopes: Vec<Scope<'a>>,
    in_select: bool,
}

impl<'a> SqmToSqlAstConverter<'a> {
    pub fn new(dialect: &'a Dialect, mapping: &'a MappingModel) -> Self {
        Self {
            dialect,
            mapping,
            next_alias: 0,
            scopes: Vec::new(),
            in_select: false,
        }
    }

    pub fn convert(mut self, statement: &SqmStatement) -> DialectResult<Statement> {
        let converted = match statement {
            SqmStatement::Select(select) => Statement::Select(self.convert_select(select)?),
            SqmStatement::Update(update) => Statement::Update(self.convert_update(update)?),
            SqmStatement::Delete(delete) => Statement::Delete(self.convert_delete(delete)?),
        };
        debug!(
            dialect = self.dialect.name(),
            aliases = self.next_alias,
            "converted sqm statement"
        );
        Ok(converted)
    }

    fn alloc_alias(&mut self) -> String {
        let alias = format!("t{}", self.next_alias);
        self.next_alias += 1;
        alias
    }

    fn unsupported(&self, construct: &str, capability: Option<Capability>) -> DialectError {
        DialectError::unsupported(
            self.dialect.name(),
            construct,
            capability.and_then(|c| self.dialect.minimum_version(c)),
        )
    }

    fn current_scope(&mut self) -> DialectResult<&mut Scope<'a>> {
        self.scopes
            .last_mut()
            .ok_or_else(|| DialectError::malformed("expression outside of a query"))
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    fn convert_select(&mut self, select: &SqmSelect) -> DialectResult<SelectStatement> {
        let query = self.convert_query_part(&select.query, false)?;
        Ok(SelectStatement {
            query,
            lock: select.lock,
        })
    }

    /// Scope holding a single target entity, without implicit joins
    fn push_mutation_scope(
        &mut self,
        entity_name: &str,
        variable: &str,
    ) -> DialectResult<(&'a EntityMapping, String)> {
        let entity = self.mapping.require_entity(entity_name)?;
        let alias = self.alloc_alias();
        let mut scope = Scope {
            implicit_joins_allowed: false,
            ..Scope::default()
        };
        scope.groups.push(TableGroup::new(TableReference::new(&entity.table, &alias)));
        scope.variables.insert(
            variable.to_string(),
            Binding {
                entity,
                alias: alias.clone(),
                group: 0,
            },
        );
        self.scopes.push(scope);
        Ok((entity, alias))
    }

    fn convert_update(&mut self, update: &SqmUpdate) -> DialectResult<UpdateStatement> {
        let (entity, alias) = self.push_mutation_scope(&update.entity, &update.alias)?;
        let mut assignments = Vec::with_capacity(update.assignments.len());
        for assignment in &update.assignments {
            let column = match entity.require_property(&assignment.attribute)? {
                Property::Basic(attribute) => attribute.column.clone(),
                Property::ToOne(association) => association.fk_column.clone(),
                Property::ToMany(_) => {
                    return Err(self.unsupported(
                        &format!("assignment to collection {}", assignment.attribute),
                        None,
                    ))
                }
            };
            let value = self.convert_expression(&assignment.value)?;
            assignments.push(Assignment { column, value });
        }
        let where_clause = update
            .where_clause
            .as_ref()
            .map(|p| self.convert_predicate(p))
            .transpose()?;
        self.scopes.pop();
        Ok(UpdateStatement {
            table: TableReference::new(&entity.table, &alias),
            assignments,
            where_clause,
        })
    }

    fn convert_delete(&mut self, delete: &SqmDelete) -> DialectResult<DeleteStatement> {
        let (entity, alias) = self.push_mutation_scope(&delete.entity, &delete.alias)?;
        let where_clause = delete
            .where_clause
            .as_ref()
            .map(|p| self.convert_predicate(p))
            .transpose()?;
        self.scopes.pop();
        Ok(DeleteStatement {
            table: TableReference::new(&entity.table, &alias),
            where_clause,
        })
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    fn convert_query_part(&mut self, part: &SqmQueryPart, nested: bool) -> DialectResult<QueryPart> {
        if nested
            && !part.order_by().is_empty()
            && part.has_pagination()
            && !self.dialect.supports(Capability::OrderByInSubquery)
        {
            return Err(self.unsupported(
                "order by in a paginated subquery",
                Some(Capability::OrderByInSubquery),
            ));
        }
        match part {
            SqmQueryPart::Spec(spec) => Ok(self.convert_query_spec(spec)?.into()),
            SqmQueryPart::Group(group) => Ok(self.convert_query_group(group, nested)?.into()),
        }
    }

    fn convert_query_group(&mut self, group: &SqmQueryGroup, nested: bool) -> DialectResult<QueryGroup> {
        if group.operator == SetOperator::UnionAll {
            self.dialect.require(Capability::UnionAll, "union all")?;
        }
        if nested {
            self.dialect
                .require(Capability::UnionInSubquery, "set operation in a subquery")?;
        }
        let parts = group
            .parts
            .iter()
            .map(|part| self.convert_query_part(part, nested))
            .collect::<DialectResult<Vec<_>>>()?;
        let mut converted = QueryGroup::new(group.operator, parts);
        converted.order_by = group
            .order_by
            .iter()
            .map(|sort| self.convert_sort_spec(sort))
            .collect::<DialectResult<Vec<_>>>()?;
        converted.limit = group.limit.as_ref().map(|e| self.convert_expression(e)).transpose()?;
        converted.offset = group.offset.as_ref().map(|e| self.convert_expression(e)).transpose()?;
        Ok(converted)
    }

    fn convert_query_spec(&mut self, spec: &SqmQuerySpec) -> DialectResult<QuerySpec> {
        if spec.roots.is_empty() {
            return Err(DialectError::malformed("query without a root entity"));
        }
        let grouped = !spec.group_by.is_empty()
            || spec.having.is_some()
            || spec.selections.iter().any(|s| s.expression.contains_aggregate());
        self.scopes.push(Scope {
            implicit_joins_allowed: true,
            grouped,
            ..Scope::default()
        });
        let result = self.convert_query_spec_body(spec);
        self.scopes.pop();
        result
    }

    fn convert_query_spec_body(&mut self, spec: &SqmQuerySpec) -> DialectResult<QuerySpec> {
        for (index, root) in spec.roots.iter().enumerate() {
            let entity = self.mapping.require_entity(&root.entity)?;
            let alias = self.alloc_alias();
            let scope = self.current_scope()?;
            scope.groups.push(TableGroup::new(TableReference::new(&entity.table, &alias)));
            scope.variables.insert(
                root.alias.clone(),
                Binding {
                    entity,
                    alias,
                    group: index,
                },
            );
            for join in &root.joins {
                self.convert_explicit_join(join)?;
            }
        }

        let mut select = Vec::new();
        // selections untouched by the size() rewrite, candidates for group by
        let mut plain = Vec::new();
        for selection in &spec.selections {
            if let SqmExpression::Path(ref path) = selection.expression {
                if path.attributes.is_empty() {
                    for column in self.entity_columns(path)? {
                        plain.push(column.clone());
                        select.push(SelectItem::new(column));
                    }
                    continue;
                }
            }
            let before = self.current_scope()?.size_rewrites;
            self.in_select = true;
            let converted = self.convert_expression(&selection.expression);
            self.in_select = false;
            let converted = converted?;
            if self.current_scope()?.size_rewrites == before {
                plain.push(converted.clone());
            }
            select.push(SelectItem {
                expression: converted,
                alias: selection.alias.clone(),
            });
        }

        let where_clause = spec
            .where_clause
            .as_ref()
            .map(|p| self.convert_predicate(p))
            .transpose()?;
        let mut group_by = spec
            .group_by
            .iter()
            .map(|e| self.convert_expression(e))
            .collect::<DialectResult<Vec<_>>>()?;
        let having = spec.having.as_ref().map(|p| self.convert_predicate(p)).transpose()?;
        let order_by = spec
            .order_by
            .iter()
            .map(|sort| self.convert_sort_spec(sort))
            .collect::<DialectResult<Vec<_>>>()?;
        let limit = spec.limit.as_ref().map(|e| self.convert_expression(e)).transpose()?;
        let offset = spec.offset.as_ref().map(|e| self.convert_expression(e)).transpose()?;

        let scope = self.current_scope()?;
        if scope.size_rewrites > 0 {
            group_by = std::mem::take(&mut scope.size_owners);
            for expression in plain {
                if !group_by.contains(&expression) {
                    group_by.push(expression);
                }
            }
        }
        let from = std::mem::take(&mut scope.groups);

        Ok(QuerySpec {
            distinct: spec.distinct,
            select,
            from,
            where_clause,
            group_by,
            having,
            order_by,
            limit,
            offset,
        })
    }

    /// Columns selected for a bare entity reference (`select p`)
    fn entity_columns(&mut self, path: &SqmPath) -> DialectResult<Vec<Expression>> {
        let nav = self.navigate(path, 0)?;
        let entity = nav.entity;
        let mut columns = vec![Expression::column(&nav.alias, &entity.id.column)];
        columns.extend(
            entity
                .attributes()
                .iter()
                .map(|a| Expression::column(&nav.alias, &a.column)),
        );
        columns.extend(
            entity
                .to_one_associations()
                .iter()
                .map(|a| Expression::column(&nav.alias, &a.fk_column)),
        );
        Ok(columns)
    }

    fn convert_explicit_join(&mut self, join: &SqmJoin) -> DialectResult<()> {
        let [attribute] = join.path.attributes.as_slice() else {
            return Err(DialectError::malformed(format!(
                "join path {} must name one attribute",
                join.path
            )));
        };
        let parent = self.navigate(&join.path, 0)?;
        let mut joins = Vec::new();
        let (entity, alias) = match parent.entity.require_property(attribute)? {
            Property::Basic(_) => {
                return Err(DialectError::malformed(format!(
                    "join over basic attribute {}",
                    join.path
                )))
            }
            Property::ToOne(association) => {
                let target = self.mapping.require_entity(&association.target_entity)?;
                let alias = self.alloc_alias();
                joins.push(TableJoin::new(
                    join.kind,
                    TableReference::new(&target.table, &alias),
                    Predicate::eq(
                        Expression::column(&alias, &target.id.column),
                        Expression::column(&parent.alias, &association.fk_column),
                    ),
                ));
                (target, alias)
            }
            Property::ToMany(collection) => {
                let element = self.mapping.require_entity(&collection.element_entity)?;
                match collection.storage {
                    CollectionStorage::ForeignKey { ref column } => {
                        let alias = self.alloc_alias();
                        joins.push(TableJoin::new(
                            join.kind,
                            TableReference::new(&element.table, &alias),
                            Predicate::eq(
                                Expression::column(&alias, column),
                                Expression::column(&parent.alias, &parent.entity.id.column),
                            ),
                        ));
                        (element, alias)
                    }
                    CollectionStorage::JoinTable {
                        ref table,
                        ref owner_column,
                        ref element_column,
                    } => {
                        let link = self.alloc_alias();
                        let alias = self.alloc_alias();
                        joins.push(TableJoin::new(
                            join.kind,
                            TableReference::new(table, &link),
                            Predicate::eq(
                                Expression::column(&link, owner_column),
                                Expression::column(&parent.alias, &parent.entity.id.column),
                            ),
                        ));
                        joins.push(TableJoin::new(
                            join.kind,
                            TableReference::new(&element.table, &alias),
                            Predicate::eq(
                                Expression::column(&alias, &element.id.column),
                                Expression::column(&link, element_column),
                            ),
                        ));
                        (element, alias)
                    }
                }
            }
        };

        let scope = self.current_scope()?;
        let group = scope
            .groups
            .get_mut(parent.group)
            .ok_or_else(|| DialectError::malformed("join target outside of the current query"))?;
        group.joins.extend(joins);
        scope.variables.insert(
            join.alias.clone(),
            Binding {
                entity,
                alias,
                group: parent.group,
            },
        );
        Ok(())
    }

    // ------------------------------------------------------------------
    // Paths
    // ------------------------------------------------------------------

    fn lookup(&self, variable: &str) -> DialectResult<(usize, Binding<'a>)> {
        self.scopes
            .iter()
            .enumerate()
            .rev()
            .find_map(|(index, scope)| scope.variables.get(variable).map(|b| (index, b.clone())))
            .ok_or_else(|| {
                DialectError::malformed(format!("unbound identification variable {}", variable))
            })
    }

    /// Walk the first `upto` attributes of `path`, joining each to-one association
    fn navigate(&mut self, path: &SqmPath, upto: usize) -> DialectResult<Navigation<'a>> {
        let (scope, binding) = self.lookup(&path.variable)?;
        let mut nav = Navigation {
            scope,
            group: binding.group,
            entity: binding.entity,
            alias: binding.alias,
        };
        for attribute in &path.attributes[..upto] {
            match nav.entity.require_property(attribute)? {
                Property::ToOne(association) => {
                    let target = self.mapping.require_entity(&association.target_entity)?;
                    nav.alias = self.implicit_join(&nav, association.name.as_str(), &association.fk_column, target)?;
                    nav.entity = target;
                }
                Property::Basic(_) => {
                    return Err(DialectError::malformed(format!(
                        "{} dereferences basic attribute {}",
                        path, attribute
                    )))
                }
                Property::ToMany(_) => {
                    return Err(self.unsupported(
                        &format!("implicit join over collection in {}", path),
                        None,
                    ))
                }
            }
        }
        Ok(nav)
    }

    fn implicit_join(
        &mut self,
        from: &Navigation<'a>,
        attribute: &str,
        fk_column: &str,
        target: &'a EntityMapping,
    ) -> DialectResult<String> {
        let allowed = self
            .scopes
            .get(from.scope)
            .map_or(false, |scope| scope.implicit_joins_allowed);
        if !allowed {
            return Err(self.unsupported("implicit join in update or delete", None));
        }
        let key = (from.alias.clone(), attribute.to_lowercase());
        if let Some(existing) = self.scopes[from.scope].implicit_joins.get(&key) {
            return Ok(existing.clone());
        }
        let alias = self.alloc_alias();
        let join = TableJoin::new(
            JoinKind::Inner,
            TableReference::new(&target.table, &alias),
            Predicate::eq(
                Expression::column(&alias, &target.id.column),
                Expression::column(&from.alias, fk_column),
            ),
        );
        let scope = &mut self.scopes[from.scope];
        let group = scope
            .groups
            .get_mut(from.group)
            .ok_or_else(|| DialectError::malformed("implicit join outside of a table group"))?;
        group.joins.push(join);
        scope.implicit_joins.insert(key, alias.clone());
        Ok(alias)
    }

    fn resolve_path(&mut self, path: &SqmPath) -> DialectResult<Expression> {
        let n = path.attributes.len();
        if n == 0 {
            let nav = self.navigate(path, 0)?;
            return Ok(Expression::column(&nav.alias, &nav.entity.id.column));
        }
        // `p.address.id` reads the foreign key, no join
        if n >= 2 {
            let nav = self.navigate(path, n - 2)?;
            if let Property::ToOne(association) = nav.entity.require_property(&path.attributes[n - 2])? {
                let target = self.mapping.require_entity(&association.target_entity)?;
                if target.id.name.eq_ignore_ascii_case(&path.attributes[n - 1]) {
                    return Ok(Expression::column(&nav.alias, &association.fk_column));
                }
            }
        }
        let nav = self.navigate(path, n - 1)?;
        match nav.entity.require_property(&path.attributes[n - 1])? {
            Property::Basic(attribute) => Ok(Expression::column(&nav.alias, &attribute.column)),
            Property::ToOne(association) => Ok(Expression::column(&nav.alias, &association.fk_column)),
            Property::ToMany(_) => Err(self.unsupported(&format!("collection-valued path {}", path), None)),
        }
    }

    /// `size(path)`: a correlated count, or a left join plus group by where
    /// the select list cannot hold subqueries
    fn convert_collection_size(&mut self, path: &SqmPath) -> DialectResult<Expression> {
        let Some(last) = path.attributes.last() else {
            return Err(DialectError::malformed(format!("size({}) without a collection", path)));
        };
        let nav = self.navigate(path, path.attributes.len() - 1)?;
        let Property::ToMany(collection) = nav.entity.require_property(last)? else {
            return Err(DialectError::malformed(format!("size({}) over a non-collection", path)));
        };
        let element = self.mapping.require_entity(&collection.element_entity)?;
        let (table, correlation, counted) = match collection.storage {
            CollectionStorage::ForeignKey { ref column } => (&element.table, column, &element.id.column),
            CollectionStorage::JoinTable {
                ref table,
                ref owner_column,
                ref element_column,
            } => (table, owner_column, element_column),
        };
        let owner_id = Expression::column(&nav.alias, &nav.entity.id.column);

        if self.in_select && !self.dialect.supports(Capability::SubqueryInSelect) {
            if self.current_scope()?.grouped {
                return Err(self.unsupported(
                    "size() in the select list of a grouped query",
                    Some(Capability::SubqueryInSelect),
                ));
            }
            if nav.scope + 1 != self.scopes.len() {
                return Err(self.unsupported(
                    "size() of an outer query's collection in a subquery select list",
                    Some(Capability::SubqueryInSelect),
                ));
            }
            let alias = self.alloc_alias();
            let join = TableJoin::new(
                JoinKind::Left,
                TableReference::new(table, &alias),
                Predicate::eq(Expression::column(&alias, correlation), owner_id.clone()),
            );
            let scope = &mut self.scopes[nav.scope];
            scope
                .groups
                .get_mut(nav.group)
                .ok_or_else(|| DialectError::malformed("size() outside of a table group"))?
                .joins
                .push(join);
            scope.size_rewrites += 1;
            if !scope.size_owners.contains(&owner_id) {
                scope.size_owners.push(owner_id);
            }
            return Ok(Expression::Aggregate {
                function: AggregateFunction::Count,
                distinct: true,
                argument: Some(Box::new(Expression::column(&alias, counted))),
            });
        }

        let alias = self.alloc_alias();
        let count = QuerySpec::from_table(table, &alias)
            .select(Expression::count_star())
            .filter(Predicate::eq(Expression::column(&alias, correlation), owner_id));
        Ok(Expression::Subquery(Box::new(count.into())))
    }

    // ------------------------------------------------------------------
    // Expressions and predicates
    // ------------------------------------------------------------------

    fn convert_subquery(&mut self, part: &SqmQueryPart) -> DialectResult<QueryPart> {
        let in_select = std::mem::replace(&mut self.in_select, false);
        let converted = self.convert_query_part(part, true);
        self.in_select = in_select;
        converted
    }

    fn convert_boxed(&mut self, expression: &SqmExpression) -> DialectResult<Box<Expression>> {
        self.convert_expression(expression).map(Box::new)
    }

    fn convert_expressions(&mut self, expressions: &[SqmExpression]) -> DialectResult<Vec<Expression>> {
        expressions.iter().map(|e| self.convert_expression(e)).collect()
    }

    fn convert_expression(&mut self, expression: &SqmExpression) -> DialectResult<Expression> {
        Ok(match expression {
            SqmExpression::Path(path) => self.resolve_path(path)?,
            SqmExpression::Literal(literal) => Expression::Literal(literal.clone()),
            SqmExpression::Parameter(parameter) => Expression::Parameter(parameter.clone()),
            SqmExpression::Function { name, arguments } => {
                let template = self.dialect.function_template_for(name).ok_or_else(|| {
                    DialectError::UnknownFunction {
                        dialect: self.dialect.name().to_string(),
                        function: name.clone(),
                    }
                })?;
                template.check_arity(arguments.len())?;
                Expression::Function {
                    name: name.clone(),
                    arguments: self.convert_expressions(arguments)?,
                }
            }
            SqmExpression::Aggregate {
                function,
                distinct,
                argument,
            } => Expression::Aggregate {
                function: *function,
                distinct: *distinct,
                argument: argument.as_deref().map(|a| self.convert_boxed(a)).transpose()?,
            },
            SqmExpression::Extract { unit, source } => Expression::Extract {
                unit: *unit,
                source: self.convert_boxed(source)?,
            },
            SqmExpression::TimestampAdd {
                unit,
                magnitude,
                timestamp,
            } => Expression::TimestampAdd {
                unit: *unit,
                magnitude: self.convert_boxed(magnitude)?,
                timestamp: self.convert_boxed(timestamp)?,
            },
            SqmExpression::TimestampDiff { unit, from, to } => Expression::TimestampDiff {
                unit: *unit,
                from: self.convert_boxed(from)?,
                to: self.convert_boxed(to)?,
            },
            SqmExpression::Format { source, pattern } => Expression::Format {
                source: self.convert_boxed(source)?,
                pattern: pattern.clone(),
            },
            SqmExpression::Binary {
                left,
                operator,
                right,
            } => Expression::Binary {
                left: self.convert_boxed(left)?,
                operator: *operator,
                right: self.convert_boxed(right)?,
            },
            SqmExpression::Negate(inner) => Expression::Negate(self.convert_boxed(inner)?),
            SqmExpression::Case {
                branches,
                otherwise,
            } => Expression::Case {
                branches: branches
                    .iter()
                    .map(|SqmCaseBranch { when, then }| {
                        Ok(CaseBranch {
                            when: self.convert_predicate(when)?,
                            then: self.convert_expression(then)?,
                        })
                    })
                    .collect::<DialectResult<Vec<_>>>()?,
                otherwise: otherwise.as_deref().map(|o| self.convert_boxed(o)).transpose()?,
            },
            SqmExpression::Cast { expression, target } => Expression::Cast {
                expression: self.convert_boxed(expression)?,
                target: *target,
            },
            SqmExpression::Subquery(query) => {
                if self.in_select && !self.dialect.supports(Capability::SubqueryInSelect) {
                    return Err(self.unsupported("subquery in the select list", Some(Capability::SubqueryInSelect)));
                }
                Expression::Subquery(Box::new(self.convert_subquery(query)?))
            }
            SqmExpression::Tuple(elements) => Expression::Tuple(self.convert_expressions(elements)?),
            SqmExpression::CollectionSize(path) => self.convert_collection_size(path)?,
        })
    }

    fn check_in_lhs(&self, expression: &SqmExpression) -> DialectResult<()> {
        match expression {
            SqmExpression::Tuple(_) => self
                .dialect
                .require(Capability::SubselectAsInPredicateLhs, "tuple on the left of in"),
            SqmExpression::Subquery(_) => self
                .dialect
                .require(Capability::SubselectAsInPredicateLhs, "subquery on the left of in"),
            _ => Ok(()),
        }
    }

    fn convert_predicate(&mut self, predicate: &SqmPredicate) -> DialectResult<Predicate> {
        Ok(match predicate {
            SqmPredicate::Comparison {
                left,
                operator,
                right,
            } => Predicate::Comparison {
                left: self.convert_expression(left)?,
                operator: *operator,
                right: self.convert_expression(right)?,
            },
            SqmPredicate::And(items) => Predicate::And(
                items
                    .iter()
                    .map(|p| self.convert_predicate(p))
                    .collect::<DialectResult<Vec<_>>>()?,
            ),
            SqmPredicate::Or(items) => Predicate::Or(
                items
                    .iter()
                    .map(|p| self.convert_predicate(p))
                    .collect::<DialectResult<Vec<_>>>()?,
            ),
            SqmPredicate::Not(inner) => Predicate::Not(Box::new(self.convert_predicate(inner)?)),
            SqmPredicate::IsNull {
                expression,
                negated,
            } => Predicate::IsNull {
                expression: self.convert_expression(expression)?,
                negated: *negated,
            },
            SqmPredicate::InList {
                expression,
                list,
                negated,
            } => {
                self.check_in_lhs(expression)?;
                Predicate::InList {
                    expression: self.convert_expression(expression)?,
                    list: self.convert_expressions(list)?,
                    negated: *negated,
                }
            }
            SqmPredicate::InSubquery {
                expression,
                query,
                negated,
            } => {
                self.check_in_lhs(expression)?;
                Predicate::InSubquery {
                    expression: self.convert_expression(expression)?,
                    query: Box::new(self.convert_subquery(query)?),
                    negated: *negated,
                }
            }
            SqmPredicate::Exists { query, negated } => Predicate::Exists {
                query: Box::new(self.convert_subquery(query)?),
                negated: *negated,
            },
            SqmPredicate::Like {
                expression,
                pattern,
                escape,
                case_insensitive,
                negated,
            } => Predicate::Like {
                expression: self.convert_expression(expression)?,
                pattern: self.convert_expression(pattern)?,
                escape: *escape,
                case_insensitive: *case_insensitive,
                negated: *negated,
            },
            SqmPredicate::Between {
                expression,
                low,
                high,
                negated,
            } => Predicate::Between {
                expression: self.convert_expression(expression)?,
                low: self.convert_expression(low)?,
                high: self.convert_expression(high)?,
                negated: *negated,
            },
            SqmPredicate::Boolean(expression) => Predicate::Boolean(self.convert_expression(expression)?),
        })
    }

    fn convert_sort_spec(&mut self, sort: &SqmSortSpec) -> DialectResult<SortSpec> {
        Ok(SortSpec {
            expression: self.convert_expression(&sort.expression)?,
            direction: sort.direction,
            nulls: sort.nulls,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::column_types::SqlType;
    use crate::sql::mapping::{AttributeMapping, ToManyMapping, ToOneMapping};
    use crate::sqm::SqmQueryGroup;
    use pretty_assertions::assert_eq;

    fn model() -> MappingModel {
        MappingModel::new()
            .with_entity(
                EntityMapping::new("Person")
                    .attribute(AttributeMapping::new("name", SqlType::Varchar))
                    .attribute(AttributeMapping::new("age", SqlType::Integer))
                    .to_one(ToOneMapping::new("address", "Address"))
                    .to_many(ToManyMapping::foreign_key("nicknames", "Nickname", "person_id"))
                    .to_many(ToManyMapping::join_table("tags", "Tag", "person_tag", "person_id", "tag_id")),
            )
            .with_entity(EntityMapping::new("Address").attribute(AttributeMapping::new("city", SqlType::Varchar)))
            .with_entity(EntityMapping::new("Nickname").attribute(AttributeMapping::new("value", SqlType::Varchar)))
            .with_entity(EntityMapping::new("Tag").attribute(AttributeMapping::new("label", SqlType::Varchar)))
    }

    fn sql(dialect: &Dialect, statement: impl Into<SqmStatement>) -> DialectResult<String> {
        let model = model();
        let converted = dialect.sqm_converter(&model).convert(&statement.into())?;
        Ok(dialect.sql_ast_translator().translate(&converted)?.sql)
    }

    #[test]
    fn test_implicit_joins_are_shared() {
        let dialect = Dialect::resolve("postgresql", 15).unwrap();
        let query = SqmQuerySpec::from_entity("Person", "p")
            .select(SqmExpression::path("p.address.city"))
            .filter(SqmPredicate::eq(SqmExpression::path("p.address.city"), SqmExpression::param("city")));
        assert_eq!(
            sql(&dialect, SqmSelect::new(query)).unwrap(),
            "select t1.city from person t0 join address t1 on t1.id = t0.address_id where t1.city = $1"
        );
    }

    #[test]
    fn test_foreign_key_shortcut() {
        let dialect = Dialect::resolve("postgresql", 15).unwrap();
        let query = SqmQuerySpec::from_entity("Person", "p").select(SqmExpression::path("p.address.id"));
        assert_eq!(sql(&dialect, SqmSelect::new(query)).unwrap(), "select t0.address_id from person t0");
    }

    #[test]
    fn test_entity_selection_expands_columns() {
        let dialect = Dialect::resolve("postgresql", 15).unwrap();
        let query = SqmQuerySpec::from_entity("Person", "p").select(SqmExpression::path("p"));
        assert_eq!(
            sql(&dialect, SqmSelect::new(query)).unwrap(),
            "select t0.id, t0.name, t0.age, t0.address_id from person t0"
        );
    }

    #[test]
    fn test_size_as_correlated_subquery() {
        let dialect = Dialect::resolve("postgresql", 15).unwrap();
        let query = SqmQuerySpec::from_entity("Person", "p")
            .select(SqmExpression::path("p.name"))
            .select(SqmExpression::size("p.nicknames"));
        assert_eq!(
            sql(&dialect, SqmSelect::new(query)).unwrap(),
            "select t0.name, (select count(*) from nickname t1 where t1.person_id = t0.id) from person t0"
        );
    }

    #[test]
    fn test_size_rewritten_to_left_join() {
        let dialect = Dialect::resolve("ingres", (9, 3)).unwrap();
        let query = SqmQuerySpec::from_entity("Person", "p")
            .select(SqmExpression::path("p.name"))
            .select(SqmExpression::size("p.tags"));
        assert_eq!(
            sql(&dialect, SqmSelect::new(query)).unwrap(),
            "select t0.name, count(distinct t1.tag_id) from person t0 \
             left join person_tag t1 on t1.person_id = t0.id group by t0.id, t0.name"
        );
    }

    #[test]
    fn test_size_rewrite_rejected_with_aggregates() {
        let dialect = Dialect::resolve("ingres", (9, 3)).unwrap();
        let query = SqmQuerySpec::from_entity("Person", "p")
            .select(SqmExpression::aggregate(AggregateFunction::Max, SqmExpression::path("p.age")))
            .select(SqmExpression::size("p.nicknames"));
        let err = sql(&dialect, SqmSelect::new(query)).unwrap_err();
        assert!(matches!(err, DialectError::UnsupportedSqlConstruct { .. }));
    }

    #[test]
    fn test_subquery_in_select_requires_ingres_10() {
        let dialect = Dialect::resolve("ingres", (9, 3)).unwrap();
        let inner = SqmQuerySpec::from_entity("Address", "a").select(SqmExpression::count_star());
        let query = SqmQuerySpec::from_entity("Person", "p").select(SqmExpression::subquery(inner));
        match sql(&dialect, SqmSelect::new(query)).unwrap_err() {
            DialectError::UnsupportedSqlConstruct { minimum_version, .. } => {
                assert_eq!(minimum_version.map(|v| v.to_string()).as_deref(), Some("10.0"));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_explicit_join_through_join_table() {
        let dialect = Dialect::resolve("mysql", 8).unwrap();
        let query = SqmQuerySpec::from_entity("Person", "p")
            .join(JoinKind::Left, "p.tags", "t")
            .select(SqmExpression::path("t.label"));
        assert_eq!(
            sql(&dialect, SqmSelect::new(query)).unwrap(),
            "select t2.label from person t0 left join person_tag t1 on t1.person_id = t0.id \
             left join tag t2 on t2.id = t1.tag_id"
        );
    }

    #[test]
    fn test_unknown_entity_and_attribute() {
        let dialect = Dialect::resolve("postgresql", 15).unwrap();
        let query = SqmQuerySpec::from_entity("Car", "c").select(SqmExpression::path("c"));
        assert!(matches!(
            sql(&dialect, SqmSelect::new(query)).unwrap_err(),
            DialectError::UnknownEntity(_)
        ));
        let query = SqmQuerySpec::from_entity("Person", "p").select(SqmExpression::path("p.salary"));
        assert!(matches!(
            sql(&dialect, SqmSelect::new(query)).unwrap_err(),
            DialectError::UnknownAttribute { .. }
        ));
    }

    #[test]
    fn test_update_rejects_implicit_join() {
        let dialect = Dialect::resolve("postgresql", 15).unwrap();
        let update = SqmUpdate::new("Person", "p")
            .set("name", SqmExpression::param("name"))
            .filter(SqmPredicate::eq(SqmExpression::path("p.address.city"), SqmExpression::string("Oslo")));
        let err = sql(&dialect, SqmStatement::Update(update)).unwrap_err();
        assert!(matches!(err, DialectError::UnsupportedSqlConstruct { .. }));

        let update = SqmUpdate::new("Person", "p")
            .set("name", SqmExpression::param("name"))
            .filter(SqmPredicate::eq(SqmExpression::path("p.address.id"), SqmExpression::integer(7)));
        assert_eq!(
            sql(&dialect, SqmStatement::Update(update)).unwrap(),
            "update person set name = $1 where address_id = 7"
        );
    }

    #[test]
    fn test_function_checked_at_conversion() {
        let dialect = Dialect::resolve("postgresql", 15).unwrap();
        let model = model();
        let query = SqmQuerySpec::from_entity("Person", "p")
            .select(SqmExpression::function("upper", vec![]));
        let err = dialect
            .sqm_converter(&model)
            .convert(&SqmSelect::new(query).into())
            .unwrap_err();
        assert!(matches!(err, DialectError::FunctionArity { .. }));
    }

    #[test]
    fn test_union_all_requires_ingres_9_3() {
        let dialect = Dialect::resolve("ingres", (9, 2)).unwrap();
        let part = |entity: &str| -> SqmQueryPart {
            SqmQuerySpec::from_entity(entity, "x").select(SqmExpression::path("x.id")).into()
        };
        let group = SqmQueryGroup::new(SetOperator::UnionAll, vec![part("Person"), part("Address")]);
        match sql(&dialect, SqmSelect::new(group)).unwrap_err() {
            DialectError::UnsupportedSqlConstruct { minimum_version, .. } => {
                assert_eq!(minimum_version.map(|v| v.to_string()).as_deref(), Some("9.3"));
            }
            other => panic!("unexpected error: {}", other),
        }
    }
}
