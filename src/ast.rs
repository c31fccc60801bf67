//! Vendor-neutral SQL statement trees, rendered by `sql::translator`

use crate::dialect::column_types::SqlType;
use crate::dialect::temporal::TemporalUnit;

/// A statement ready for translation
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Select(SelectStatement),
    Insert(InsertStatement),
    Update(UpdateStatement),
    Delete(DeleteStatement),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectStatement {
    pub query: QueryPart,
    pub lock: Option<LockOptions>,
}

impl SelectStatement {
    pub fn new(query: impl Into<QueryPart>) -> Self {
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

/// A query spec or a set operation over query parts
#[derive(Debug, Clone, PartialEq)]
pub enum QueryPart {
    Spec(Box<QuerySpec>),
    Group(QueryGroup),
}

impl QueryPart {
    pub fn is_group(&self) -> bool {
        matches!(self, QueryPart::Group(_))
    }

    pub fn order_by(&self) -> &[SortSpec] {
        match self {
            QueryPart::Spec(spec) => &spec.order_by,
            QueryPart::Group(group) => &group.order_by,
        }
    }

    pub fn has_pagination(&self) -> bool {
        match self {
            QueryPart::Spec(spec) => spec.limit.is_some() || spec.offset.is_some(),
            QueryPart::Group(group) => group.limit.is_some() || group.offset.is_some(),
        }
    }
}

impl From<QuerySpec> for QueryPart {
    fn from(spec: QuerySpec) -> Self {
        QueryPart::Spec(Box::new(spec))
    }
}

impl From<QueryGroup> for QueryPart {
    fn from(group: QueryGroup) -> Self {
        QueryPart::Group(group)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOperator {
    Union,
    UnionAll,
    Intersect,
    Except,
}

impl SetOperator {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SetOperator::Union => "union",
            SetOperator::UnionAll => "union all",
            SetOperator::Intersect => "intersect",
            SetOperator::Except => "except",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryGroup {
    pub operator: SetOperator,
    pub parts: Vec<QueryPart>,
    pub order_by: Vec<SortSpec>,
    pub limit: Option<Expression>,
    pub offset: Option<Expression>,
}

impl QueryGroup {
    pub fn new(operator: SetOperator, parts: Vec<QueryPart>) -> Self {
        Self {
            operator,
            parts,
            order_by: Vec::new(),
            limit: None,
            offset: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct QuerySpec {
    pub distinct: bool,
    pub select: Vec<SelectItem>,
    pub from: Vec<TableGroup>,
    pub where_clause: Option<Predicate>,
    pub group_by: Vec<Expression>,
    pub having: Option<Predicate>,
    pub order_by: Vec<SortSpec>,
    pub limit: Option<Expression>,
    pub offset: Option<Expression>,
}

impl QuerySpec {
    pub fn from_table(table: &str, alias: &str) -> Self {
        Self {
            from: vec![TableGroup::new(TableReference::new(table, alias))],
            ..Self::default()
        }
    }

    pub fn select(mut self, expression: Expression) -> Self {
        self.select.push(SelectItem::new(expression));
        self
    }

    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.where_clause = Some(match self.where_clause.take() {
            Some(existing) => Predicate::and(vec![existing, predicate]),
            None => predicate,
        });
        self
    }

    pub fn order(mut self, sort: SortSpec) -> Self {
        self.order_by.push(sort);
        self
    }

    pub fn limit(mut self, limit: Expression) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: Expression) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn join(mut self, join: TableJoin) -> Self {
        if let Some(group) = self.from.last_mut() {
            group.joins.push(join);
        }
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectItem {
    pub expression: Expression,
    pub alias: Option<String>,
}

impl SelectItem {
    pub fn new(expression: Expression) -> Self {
        Self {
            expression,
            alias: None,
        }
    }

    pub fn aliased(expression: Expression, alias: &str) -> Self {
        Self {
            expression,
            alias: Some(alias.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableReference {
    pub table: String,
    pub alias: String,
}

impl TableReference {
    pub fn new(table: &str, alias: &str) -> Self {
        Self {
            table: table.to_string(),
            alias: alias.to_string(),
        }
    }
}

/// A root table and the joins hanging off it
#[derive(Debug, Clone, PartialEq)]
pub struct TableGroup {
    pub root: TableReference,
    pub joins: Vec<TableJoin>,
}

impl TableGroup {
    pub fn new(root: TableReference) -> Self {
        Self {
            root,
            joins: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    Full,
    Cross,
}

impl JoinKind {
    pub fn as_sql(&self) -> &'static str {
        match self {
            JoinKind::Inner => "join",
            JoinKind::Left => "left join",
            JoinKind::Right => "right join",
            JoinKind::Full => "full join",
            JoinKind::Cross => "cross join",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableJoin {
    pub kind: JoinKind,
    pub table: TableReference,
    pub on: Option<Predicate>,
}

impl TableJoin {
    pub fn new(kind: JoinKind, table: TableReference, on: Predicate) -> Self {
        Self {
            kind,
            table,
            on: Some(on),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NullPrecedence {
    First,
    Last,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SortSpec {
    pub expression: Expression,
    pub direction: SortDirection,
    pub nulls: Option<NullPrecedence>,
}

impl SortSpec {
    pub fn asc(expression: Expression) -> Self {
        Self {
            expression,
            direction: SortDirection::Ascending,
            nulls: None,
        }
    }

    pub fn desc(expression: Expression) -> Self {
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

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    /// `for share`
    Read,
    /// `for update`
    Write,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LockWait {
    #[default]
    Wait,
    NoWait,
    SkipLocked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockOptions {
    pub mode: LockMode,
    pub wait: LockWait,
}

impl LockOptions {
    pub fn write() -> Self {
        Self {
            mode: LockMode::Write,
            wait: LockWait::Wait,
        }
    }

    pub fn read() -> Self {
        Self {
            mode: LockMode::Read,
            wait: LockWait::Wait,
        }
    }

    pub fn nowait(mut self) -> Self {
        self.wait = LockWait::NoWait;
        self
    }

    pub fn skip_locked(mut self) -> Self {
        self.wait = LockWait::SkipLocked;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InsertStatement {
    pub table: String,
    pub columns: Vec<String>,
    pub source: InsertSource,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InsertSource {
    Values(Vec<Vec<Expression>>),
    Query(QueryPart),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub column: String,
    pub value: Expression,
}

impl Assignment {
    pub fn new(column: &str, value: Expression) -> Self {
        Self {
            column: column.to_string(),
            value,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateStatement {
    pub table: TableReference,
    pub assignments: Vec<Assignment>,
    pub where_clause: Option<Predicate>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeleteStatement {
    pub table: TableReference,
    pub where_clause: Option<Predicate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOperator {
    Equal,
    NotEqual,
    LessThan,
    LessOrEqual,
    GreaterThan,
    GreaterOrEqual,
}

impl ComparisonOperator {
    pub fn as_sql(&self) -> &'static str {
        match self {
            ComparisonOperator::Equal => "=",
            ComparisonOperator::NotEqual => "<>",
            ComparisonOperator::LessThan => "<",
            ComparisonOperator::LessOrEqual => "<=",
            ComparisonOperator::GreaterThan => ">",
            ComparisonOperator::GreaterOrEqual => ">=",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Comparison {
        left: Expression,
        operator: ComparisonOperator,
        right: Expression,
    },
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Not(Box<Predicate>),
    IsNull {
        expression: Expression,
        negated: bool,
    },
    InList {
        expression: Expression,
        list: Vec<Expression>,
        negated: bool,
    },
    InSubquery {
        expression: Expression,
        query: Box<QueryPart>,
        negated: bool,
    },
    Exists {
        query: Box<QueryPart>,
        negated: bool,
    },
    Like {
        expression: Expression,
        pattern: Expression,
        escape: Option<char>,
        case_insensitive: bool,
        negated: bool,
    },
    Between {
        expression: Expression,
        low: Expression,
        high: Expression,
        negated: bool,
    },
    /// A boolean-valued expression used as a condition
    Boolean(Expression),
}

impl Predicate {
    pub fn compare(left: Expression, operator: ComparisonOperator, right: Expression) -> Self {
        Predicate::Comparison {
            left,
            operator,
            right,
        }
    }

    pub fn eq(left: Expression, right: Expression) -> Self {
        Self::compare(left, ComparisonOperator::Equal, right)
    }

    pub fn and(predicates: Vec<Predicate>) -> Self {
        Predicate::And(predicates)
    }

    pub fn or(predicates: Vec<Predicate>) -> Self {
        Predicate::Or(predicates)
    }

    pub fn is_null(expression: Expression) -> Self {
        Predicate::IsNull {
            expression,
            negated: false,
        }
    }

    pub fn in_list(expression: Expression, list: Vec<Expression>) -> Self {
        Predicate::InList {
            expression,
            list,
            negated: false,
        }
    }

    pub fn like(expression: Expression, pattern: Expression) -> Self {
        Predicate::Like {
            expression,
            pattern,
            escape: None,
            case_insensitive: false,
            negated: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl ArithmeticOperator {
    pub fn as_sql(&self) -> &'static str {
        match self {
            ArithmeticOperator::Add => "+",
            ArithmeticOperator::Subtract => "-",
            ArithmeticOperator::Multiply => "*",
            ArithmeticOperator::Divide => "/",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFunction {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl AggregateFunction {
    pub fn as_sql(&self) -> &'static str {
        match self {
            AggregateFunction::Count => "count",
            AggregateFunction::Sum => "sum",
            AggregateFunction::Avg => "avg",
            AggregateFunction::Min => "min",
            AggregateFunction::Max => "max",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnReference {
    pub qualifier: Option<String>,
    pub column: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

/// Where a bind value comes from
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ParameterSource {
    Named(String),
    Positional(usize),
}

impl std::fmt::Display for ParameterSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParameterSource::Named(name) => write!(f, ":{}", name),
            ParameterSource::Positional(position) => write!(f, "?{}", position),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindParameter {
    pub source: ParameterSource,
    pub sql_type: Option<SqlType>,
}

/// Target of a `cast`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CastTarget {
    pub code: SqlType,
    pub length: Option<u64>,
    pub precision: Option<u32>,
    pub scale: Option<u32>,
}

impl CastTarget {
    pub fn new(code: SqlType) -> Self {
        Self {
            code,
            length: None,
            precision: None,
            scale: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaseBranch {
    pub when: Predicate,
    pub then: Expression,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Column(ColumnReference),
    Literal(Literal),
    Parameter(BindParameter),
    /// A portable function, resolved through the dialect's registry
    Function {
        name: String,
        arguments: Vec<Expression>,
    },
    /// `argument: None` renders `count(*)`
    Aggregate {
        function: AggregateFunction,
        distinct: bool,
        argument: Option<Box<Expression>>,
    },
    Extract {
        unit: TemporalUnit,
        source: Box<Expression>,
    },
    TimestampAdd {
        unit: TemporalUnit,
        magnitude: Box<Expression>,
        timestamp: Box<Expression>,
    },
    TimestampDiff {
        unit: TemporalUnit,
        from: Box<Expression>,
        to: Box<Expression>,
    },
    /// Datetime formatting with a portable (`yyyy-MM-dd`) pattern
    Format {
        source: Box<Expression>,
        pattern: String,
    },
    Binary {
        left: Box<Expression>,
        operator: ArithmeticOperator,
        right: Box<Expression>,
    },
    Negate(Box<Expression>),
    Case {
        branches: Vec<CaseBranch>,
        otherwise: Option<Box<Expression>>,
    },
    Cast {
        expression: Box<Expression>,
        target: CastTarget,
    },
    Subquery(Box<QueryPart>),
    Tuple(Vec<Expression>),
    /// `*` or `alias.*`
    Star(Option<String>),
}

impl Expression {
    pub fn column(qualifier: &str, column: &str) -> Self {
        Expression::Column(ColumnReference {
            qualifier: Some(qualifier.to_string()),
            column: column.to_string(),
        })
    }

    pub fn unqualified(column: &str) -> Self {
        Expression::Column(ColumnReference {
            qualifier: None,
            column: column.to_string(),
        })
    }

    pub fn integer(value: i64) -> Self {
        Expression::Literal(Literal::Integer(value))
    }

    pub fn string(value: &str) -> Self {
        Expression::Literal(Literal::String(value.to_string()))
    }

    pub fn boolean(value: bool) -> Self {
        Expression::Literal(Literal::Boolean(value))
    }

    pub fn null() -> Self {
        Expression::Literal(Literal::Null)
    }

    pub fn named_param(name: &str) -> Self {
        Expression::Parameter(BindParameter {
            source: ParameterSource::Named(name.to_string()),
            sql_type: None,
        })
    }

    pub fn positional_param(position: usize) -> Self {
        Expression::Parameter(BindParameter {
            source: ParameterSource::Positional(position),
            sql_type: None,
        })
    }

    pub fn function(name: &str, arguments: Vec<Expression>) -> Self {
        Expression::Function {
            name: name.to_string(),
            arguments,
        }
    }

    pub fn count_star() -> Self {
        Expression::Aggregate {
            function: AggregateFunction::Count,
            distinct: false,
            argument: None,
        }
    }

    pub fn aggregate(function: AggregateFunction, argument: Expression) -> Self {
        Expression::Aggregate {
            function,
            distinct: false,
            argument: Some(Box::new(argument)),
        }
    }

    pub fn is_aggregate(&self) -> bool {
        matches!(self, Expression::Aggregate { .. })
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, Expression::Literal(_))
    }
}
