//! Semantic query model: a bound, entity-level query tree.
//!
//! An SQM tree names entities and attribute paths (`p.address.city`), not
//! tables and columns. [`converter::SqmToSqlAstConverter`] lowers it to
//! [`crate::ast`] using a [`crate::sql::mapping::MappingModel`].

pub mod converter;

use crate::ast::{
    AggregateFunction, ArithmeticOperator, BindParameter, CastTarget, ComparisonOperator, JoinKind,
    Literal, LockOptions, NullPrecedence, ParameterSource, SetOperator, SortDirection,
};
use crate::dialect::temporal::TemporalUnit;

#[derive(Debug, Clone, PartialEq)]
pub enum SqmStatement {
    Select(SqmSelect),
    Update(SqmUpdate),
    Delete(SqmDelete),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SqmSelect {
    pub query: SqmQueryPart,
    pub lock: Option<LockOptions>,
}

impl SqmSelect {
    pub fn new(query: impl Into<SqmQueryPart>) -> Self {
        Self {
            query: query.into(),
            lock: None,
        }
    }

    pub fn with_lock(mut self, lock: LockOptions) -> Self {
        self.lock = Some(lock);
        self
    }
}

impl From<SqmSelect> for SqmStatement {
    fn from(select: SqmSelect) -> Self {
        SqmStatement::Select(select)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SqmQueryPart {
    Spec(Box<SqmQuerySpec>),
    Group(SqmQueryGroup),
}

impl SqmQueryPart {
    pub fn order_by(&self) -> &[SqmSortSpec] {
        match self {
            SqmQueryPart::Spec(spec) => &spec.order_by,
            SqmQueryPart::Group(group) => &group.order_by,
        }
    }

    pub fn has_pagination(&self) -> bool {
        match self {
            SqmQueryPart::Spec(spec) => spec.limit.is_some() || spec.offset.is_some(),
            SqmQueryPart::Group(group) => group.limit.is_some() || group.offset.is_some(),
        }
    }
}

impl From<SqmQuerySpec> for SqmQueryPart {
    fn from(spec: SqmQuerySpec) -> Self {
        SqmQueryPart::Spec(Box::new(spec))
    }
}

impl From<SqmQueryGroup> for SqmQueryPart {
    fn from(group: SqmQueryGroup) -> Self {
        SqmQueryPart::Group(group)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SqmQueryGroup {
    pub operator: SetOperator,
    pub parts: Vec<SqmQueryPart>,
    pub order_by: Vec<SqmSortSpec>,
    pub limit: Option<SqmExpression>,
    pub offset: Option<SqmExpression>,
}

impl SqmQueryGroup {
    pub fn new(operator: SetOperator, parts: Vec<SqmQueryPart>) -> Self {
        Self {
            operator,
            parts,
            order_by: Vec::new(),
            limit: None,
            offset: None,
        }
    }
}

/// `from <entity> <alias>` with its explicit attribute joins
#[derive(Debug, Clone, PartialEq)]
pub struct SqmRoot {
    pub entity: String,
    pub alias: String,
    pub joins: Vec<SqmJoin>,
}

/// `join p.address a`
#[derive(Debug, Clone, PartialEq)]
pub struct SqmJoin {
    pub kind: JoinKind,
    pub path: SqmPath,
    pub alias: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SqmQuerySpec {
    pub distinct: bool,
    pub selections: Vec<SqmSelection>,
    pub roots: Vec<SqmRoot>,
    pub where_clause: Option<SqmPredicate>,
    pub group_by: Vec<SqmExpression>,
    pub having: Option<SqmPredicate>,
    pub order_by: Vec<SqmSortSpec>,
    pub limit: Option<SqmExpression>,
    pub offset: Option<SqmExpression>,
}

impl SqmQuerySpec {
    pub fn from_entity(entity: &str, alias: &str) -> Self {
        Self {
            roots: vec![SqmRoot {
                entity: entity.to_string(),
                alias: alias.to_string(),
                joins: Vec::new(),
            }],
            ..Self::default()
        }
    }

    /// Add another root (`from Person p, Address a`)
    pub fn also_from(mut self, entity: &str, alias: &str) -> Self {
        self.roots.push(SqmRoot {
            entity: entity.to_string(),
            alias: alias.to_string(),
            joins: Vec::new(),
        });
        self
    }

    pub fn select(mut self, expression: SqmExpression) -> Self {
        self.selections.push(SqmSelection {
            expression,
            alias: None,
        });
        self
    }

    pub fn select_as(mut self, expression: SqmExpression, alias: &str) -> Self {
        self.selections.push(SqmSelection {
            expression,
            alias: Some(alias.to_string()),
        });
        self
    }

    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    /// Explicit join on the root owning `path`'s variable
    pub fn join(mut self, kind: JoinKind, path: &str, alias: &str) -> Self {
        let path = SqmPath::parse(path);
        let join = SqmJoin {
            kind,
            path,
            alias: alias.to_string(),
        };
        if let Some(root) = self.roots.first_mut() {
            root.joins.push(join);
        }
        self
    }

    pub fn filter(mut self, predicate: SqmPredicate) -> Self {
        self.where_clause = Some(match self.where_clause.take() {
            Some(existing) => SqmPredicate::And(vec![existing, predicate]),
            None => predicate,
        });
        self
    }

    pub fn group(mut self, expression: SqmExpression) -> Self {
        self.group_by.push(expression);
        self
    }

    pub fn having(mut self, predicate: SqmPredicate) -> Self {
        self.having = Some(predicate);
        self
    }

    pub fn order(mut self, sort: SqmSortSpec) -> Self {
        self.order_by.push(sort);
        self
    }

    pub fn limit(mut self, limit: SqmExpression) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: SqmExpression) -> Self {
        self.offset = Some(offset);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SqmSelection {
    pub expression: SqmExpression,
    pub alias: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SqmSortSpec {
    pub expression: SqmExpression,
    pub direction: SortDirection,
    pub nulls: Option<NullPrecedence>,
}

impl SqmSortSpec {
    pub fn asc(expression: SqmExpression) -> Self {
        Self {
            expression,
            direction: SortDirection::Ascending,
            nulls: None,
        }
    }

    pub fn desc(expression: SqmExpression) -> Self {
        Self {
            expression,
            direction: SortDirection::Descending,
            nulls: None,
        }
    }

    pub fn nulls(mut self, precedence: NullPrecedence) -> Self {
        self.nulls = Some(precedence);
        self
    }
}

/// An identification variable followed by attribute names
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqmPath {
    pub variable: String,
    pub attributes: Vec<String>,
}

impl SqmPath {
    /// `"p.address.city"`
    pub fn parse(path: &str) -> Self {
        let mut parts = path.split('.').map(str::trim);
        let variable = parts.next().unwrap_or_default().to_string();
        Self {
            variable,
            attributes: parts.map(str::to_string).collect(),
        }
    }
}

impl std::fmt::Display for SqmPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.variable)?;
        for attribute in &self.attributes {
            write!(f, ".{}", attribute)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SqmCaseBranch {
    pub when: SqmPredicate,
    pub then: SqmExpression,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SqmExpression {
    Path(SqmPath),
    Literal(Literal),
    Parameter(BindParameter),
    Function {
        name: String,
        arguments: Vec<SqmExpression>,
    },
    Aggregate {
        function: AggregateFunction,
        distinct: bool,
        argument: Option<Box<SqmExpression>>,
    },
    Extract {
        unit: TemporalUnit,
        source: Box<SqmExpression>,
    },
    TimestampAdd {
        unit: TemporalUnit,
        magnitude: Box<SqmExpression>,
        timestamp: Box<SqmExpression>,
    },
    TimestampDiff {
        unit: TemporalUnit,
        from: Box<SqmExpression>,
        to: Box<SqmExpression>,
    },
    Format {
        source: Box<SqmExpression>,
        pattern: String,
    },
    Binary {
        left: Box<SqmExpression>,
        operator: ArithmeticOperator,
        right: Box<SqmExpression>,
    },
    Negate(Box<SqmExpression>),
    Case {
        branches: Vec<SqmCaseBranch>,
        otherwise: Option<Box<SqmExpression>>,
    },
    Cast {
        expression: Box<SqmExpression>,
        target: CastTarget,
    },
    Subquery(Box<SqmQueryPart>),
    Tuple(Vec<SqmExpression>),
    /// `size(p.nicknames)`
    CollectionSize(SqmPath),
}

impl SqmExpression {
    pub fn path(path: &str) -> Self {
        SqmExpression::Path(SqmPath::parse(path))
    }

    pub fn integer(value: i64) -> Self {
        SqmExpression::Literal(Literal::Integer(value))
    }

    pub fn string(value: &str) -> Self {
        SqmExpression::Literal(Literal::String(value.to_string()))
    }

    pub fn boolean(value: bool) -> Self {
        SqmExpression::Literal(Literal::Boolean(value))
    }

    pub fn param(name: &str) -> Self {
        SqmExpression::Parameter(BindParameter {
            source: ParameterSource::Named(name.to_string()),
            sql_type: None,
        })
    }

    pub fn positional(position: usize) -> Self {
        SqmExpression::Parameter(BindParameter {
            source: ParameterSource::Positional(position),
            sql_type: None,
        })
    }

    pub fn function(name: &str, arguments: Vec<SqmExpression>) -> Self {
        SqmExpression::Function {
            name: name.to_string(),
            arguments,
        }
    }

    pub fn count_star() -> Self {
        SqmExpression::Aggregate {
            function: AggregateFunction::Count,
            distinct: false,
            argument: None,
        }
    }

    pub fn aggregate(function: AggregateFunction, argument: SqmExpression) -> Self {
        SqmExpression::Aggregate {
            function,
            distinct: false,
            argument: Some(Box::new(argument)),
        }
    }

    pub fn size(path: &str) -> Self {
        SqmExpression::CollectionSize(SqmPath::parse(path))
    }

    pub fn subquery(query: impl Into<SqmQueryPart>) -> Self {
        SqmExpression::Subquery(Box::new(query.into()))
    }

    /// Whether an aggregate appears anywhere outside nested subqueries
    pub fn contains_aggregate(&self) -> bool {
        match self {
            SqmExpression::Aggregate { .. } => true,
            SqmExpression::Function { arguments, .. } | SqmExpression::Tuple(arguments) => {
                arguments.iter().any(SqmExpression::contains_aggregate)
            }
            SqmExpression::Extract { source, .. } | SqmExpression::Format { source, .. } => {
                source.contains_aggregate()
            }
            SqmExpression::TimestampAdd {
                magnitude: a,
                timestamp: b,
                ..
            }
            | SqmExpression::TimestampDiff { from: a, to: b, .. }
            | SqmExpression::Binary {
                left: a, right: b, ..
            } => a.contains_aggregate() || b.contains_aggregate(),
            SqmExpression::Negate(inner) => inner.contains_aggregate(),
            SqmExpression::Cast { expression, .. } => expression.contains_aggregate(),
            SqmExpression::Case {
                branches,
                otherwise,
            } => {
                branches.iter().any(|b| b.then.contains_aggregate())
                    || otherwise.as_ref().map_or(false, |o| o.contains_aggregate())
            }
            SqmExpression::Path(_)
            | SqmExpression::Literal(_)
            | SqmExpression::Parameter(_)
            | SqmExpression::Subquery(_)
            | SqmExpression::CollectionSize(_) => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SqmPredicate {
    Comparison {
        left: SqmExpression,
        operator: ComparisonOperator,
        right: SqmExpression,
    },
    And(Vec<SqmPredicate>),
    Or(Vec<SqmPredicate>),
    Not(Box<SqmPredicate>),
    IsNull {
        expression: SqmExpression,
        negated: bool,
    },
    InList {
        expression: SqmExpression,
        list: Vec<SqmExpression>,
        negated: bool,
    },
    InSubquery {
        expression: SqmExpression,
        query: Box<SqmQueryPart>,
        negated: bool,
    },
    Exists {
        query: Box<SqmQueryPart>,
        negated: bool,
    },
    Like {
        expression: SqmExpression,
        pattern: SqmExpression,
        escape: Option<char>,
        case_insensitive: bool,
        negated: bool,
    },
    Between {
        expression: SqmExpression,
        low: SqmExpression,
        high: SqmExpression,
        negated: bool,
    },
    Boolean(SqmExpression),
}

impl SqmPredicate {
    pub fn compare(left: SqmExpression, operator: ComparisonOperator, right: SqmExpression) -> Self {
        SqmPredicate::Comparison {
            left,
            operator,
            right,
        }
    }

    pub fn eq(left: SqmExpression, right: SqmExpression) -> Self {
        Self::compare(left, ComparisonOperator::Equal, right)
    }

    pub fn in_subquery(expression: SqmExpression, query: impl Into<SqmQueryPart>) -> Self {
        SqmPredicate::InSubquery {
            expression,
            query: Box::new(query.into()),
            negated: false,
        }
    }

    pub fn exists(query: impl Into<SqmQueryPart>) -> Self {
        SqmPredicate::Exists {
            query: Box::new(query.into()),
            negated: false,
        }
    }

    pub fn like(expression: SqmExpression, pattern: SqmExpression) -> Self {
        SqmPredicate::Like {
            expression,
            pattern,
            escape: None,
            case_insensitive: false,
            negated: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SqmAssignment {
    /// Attribute of the target entity
    pub attribute: String,
    pub value: SqmExpression,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SqmUpdate {
    pub entity: String,
    pub alias: String,
    pub assignments: Vec<SqmAssignment>,
    pub where_clause: Option<SqmPredicate>,
}

impl SqmUpdate {
    pub fn new(entity: &str, alias: &str) -> Self {
        Self {
            entity: entity.to_string(),
            alias: alias.to_string(),
            assignments: Vec::new(),
            where_clause: None,
        }
    }

    pub fn set(mut self, attribute: &str, value: SqmExpression) -> Self {
        self.assignments.push(SqmAssignment {
            attribute: attribute.to_string(),
            value,
        });
        self
    }

    pub fn filter(mut self, predicate: SqmPredicate) -> Self {
        self.where_clause = Some(predicate);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SqmDelete {
    pub entity: String,
    pub alias: String,
    pub where_clause: Option<SqmPredicate>,
}

impl SqmDelete {
    pub fn new(entity: &str, alias: &str) -> Self {
        Self {
            entity: entity.to_string(),
            alias: alias.to_string(),
            where_clause: None,
        }
    }

    pub fn filter(mut self, predicate: SqmPredicate) -> Self {
        self.where_clause = Some(predicate);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_parse() {
        let path = SqmPath::parse("p.address.city");
        assert_eq!(path.variable, "p");
        assert_eq!(path.attributes, vec!["address", "city"]);
        assert_eq!(path.to_string(), "p.address.city");
        assert!(SqmPath::parse("p").attributes.is_empty());
    }

    #[test]
    fn test_contains_aggregate() {
        let sum = SqmExpression::aggregate(AggregateFunction::Sum, SqmExpression::path("p.age"));
        assert!(sum.contains_aggregate());
        assert!(SqmExpression::function("abs", vec![sum]).contains_aggregate());
        assert!(!SqmExpression::size("p.nicknames").contains_aggregate());
    }
}
