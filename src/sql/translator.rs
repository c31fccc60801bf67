//! SQL-AST translator: renders a statement tree to SQL text for one dialect

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::ast::{
    AggregateFunction, Assignment, CaseBranch, ColumnReference, ComparisonOperator,
    DeleteStatement, Expression, InsertSource, InsertStatement, Literal, LockMode, LockOptions,
    LockWait, NullPrecedence, ParameterSource, Predicate, QueryGroup, QueryPart, QuerySpec,
    SelectStatement, SetOperator, SortDirection, SortSpec, Statement, TableGroup, TableReference,
    UpdateStatement,
};
use crate::dialect::capability::Capability;
use crate::dialect::column_types::SqlType;
use crate::dialect::functions::FunctionTemplate;
use crate::dialect::strategy::{LimitStrategy, LockRendering, PlaceholderStyle};
use crate::dialect::temporal::{translate_datetime_format, TemporalUnit};
use crate::dialect::Dialect;

use super::error::{DialectError, DialectResult, TranslationWarning};

/// How to render bind parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BindVariableMode {
    /// Dialect placeholders (`?`, `?1`, `$1`)
    #[default]
    Parameterized,
    /// `:name` markers, for logging and debugging
    Placeholder,
}

/// Per-translation options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationConfig {
    pub bind_mode: BindVariableMode,
    pub placeholder_style: PlaceholderStyle,
    /// Quote table and column names with the dialect's quote characters
    pub quote_identifiers: bool,
}

impl TranslationConfig {
    pub fn for_dialect(dialect: &Dialect) -> Self {
        Self {
            bind_mode: BindVariableMode::Parameterized,
            placeholder_style: dialect.placeholder_style(),
            quote_identifiers: false,
        }
    }
}

/// A bind parameter in the rendered SQL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlParameter {
    /// 1-based position in the SQL text
    pub position: usize,
    /// Text written for it (`?1`, `$1`, `:name`)
    pub placeholder: String,
    pub source: ParameterSource,
    pub sql_type: Option<SqlType>,
}

/// Result of translating one statement
#[derive(Debug, Clone, PartialEq)]
pub struct SqlRendering {
    pub sql: String,
    /// Parameters in the order they appear in `sql`
    pub parameters: Vec<SqlParameter>,
    pub affected_tables: BTreeSet<String>,
    pub warnings: Vec<TranslationWarning>,
}

/// An argument handed to a function template
enum TemplateArg<'a> {
    Expr(&'a Expression),
    Sql(String),
}

/// Renders one statement; consumed by [`SqlAstTranslator::translate`]
pub struct SqlAstTranslator<'d> {
    dialect: &'d Dialect,
    config: TranslationConfig,
    sql: String,
    parameters: Vec<SqlParameter>,
    affected_tables: BTreeSet<String>,
    warnings: Vec<TranslationWarning>,
    /// Subquery nesting level
    depth: usize,
    /// Lock hint waiting for the root table of the locked query
    pending_table_hint: Option<String>,
    /// Alias rendered without a qualifier (update/delete targets)
    unqualified_alias: Option<String>,
}

impl<'d> SqlAstTranslator<'d> {
    pub fn new(dialect: &'d Dialect, config: TranslationConfig) -> Self {
        Self {
            dialect,
            config,
            sql: String::with_capacity(256),
            parameters: Vec::new(),
            affected_tables: BTreeSet::new(),
            warnings: Vec::new(),
            depth: 0,
            pending_table_hint: None,
            unqualified_alias: None,
        }
    }

    pub fn with_bind_mode(mut self, mode: BindVariableMode) -> Self {
        self.config.bind_mode = mode;
        self
    }

    pub fn quoting_identifiers(mut self, quote: bool) -> Self {
        self.config.quote_identifiers = quote;
        self
    }

    /// Render a whole statement, or fail without partial output
    pub fn translate(mut self, statement: &Statement) -> DialectResult<SqlRendering> {
        match statement {
            Statement::Select(select) => self.render_select_statement(select)?,
            Statement::Insert(insert) => self.render_insert(insert)?,
            Statement::Update(update) => self.render_update(update)?,
            Statement::Delete(delete) => self.render_delete(delete)?,
        }

        debug!(
            dialect = self.dialect.name(),
            sql = %self.sql,
            parameters = self.parameters.len(),
            "rendered statement"
        );

        Ok(SqlRendering {
            sql: self.sql,
            parameters: self.parameters,
            affected_tables: self.affected_tables,
            warnings: self.warnings,
        })
    }

    pub fn translate_select(self, select: &SelectStatement) -> DialectResult<SqlRendering> {
        self.translate(&Statement::Select(select.clone()))
    }

    fn unsupported(
        &self,
        construct: &str,
        minimum_version: Option<crate::dialect::version::DatabaseVersion>,
    ) -> DialectError {
        DialectError::unsupported(self.dialect.name(), construct, minimum_version)
    }

    fn require(&self, capability: Capability, construct: &str) -> DialectResult<()> {
        self.dialect.require(capability, construct)
    }

    fn warn(&mut self, warning: TranslationWarning) {
        warn!(dialect = self.dialect.name(), "{}", warning);
        self.warnings.push(warning);
    }

    fn push(&mut self, text: &str) {
        self.sql.push_str(text);
    }

    fn push_identifier(&mut self, name: &str) {
        if self.config.quote_identifiers {
            let quoted = self.dialect.quote_identifier(name);
            self.sql.push_str(&quoted);
        } else {
            self.sql.push_str(name);
        }
    }

    // ------------------------------------------------------------------
    // Select
    // ------------------------------------------------------------------

    fn render_select_statement(&mut self, select: &SelectStatement) -> DialectResult<()> {
        let lock = match select.lock {
            Some(lock) => self.prepare_lock(&select.query, lock)?,
            None => None,
        };
        self.render_query_part(&select.query)?;
        if let Some(clause) = lock {
            self.push(&clause);
        }
        Ok(())
    }

    /// Decide how the lock is rendered; returns a trailing clause if any
    fn prepare_lock(&mut self, query: &QueryPart, lock: LockOptions) -> DialectResult<Option<String>> {
        if query.is_group() {
            return Err(self.unsupported("locking a set operation", None));
        }
        let dialect = self.dialect;
        let rules = dialect.rules();
        let wait_option = |translator: &mut Self| -> Option<String> {
            let (capability, option, text) = match lock.wait {
                LockWait::Wait => return None,
                LockWait::NoWait => (Capability::LockNoWait, "nowait", &rules.nowait),
                LockWait::SkipLocked => (Capability::LockSkipLocked, "skip locked", &rules.skip_locked),
            };
            if translator.dialect.supports(capability) {
                Some(text.clone())
            } else {
                translator.warn(TranslationWarning::LockOptionIgnored {
                    dialect: translator.dialect.name().to_string(),
                    option: option.to_string(),
                });
                None
            }
        };

        match &rules.lock_rendering {
            LockRendering::Clause => {
                let mut clause = match lock.mode {
                    LockMode::Write => rules.for_update.clone(),
                    LockMode::Read => rules.for_share.clone(),
                };
                if let Some(option) = wait_option(self) {
                    clause.push_str(&option);
                }
                Ok(Some(clause))
            }
            LockRendering::TableHint { update, share } => {
                let mut hint = String::from(" with (");
                hint.push_str(match lock.mode {
                    LockMode::Write => update,
                    LockMode::Read => share,
                });
                if let Some(option) = wait_option(self) {
                    hint.push_str(&option);
                }
                hint.push(')');
                self.pending_table_hint = Some(hint);
                Ok(None)
            }
            LockRendering::Omitted => {
                self.warn(TranslationWarning::LockClauseOmitted {
                    dialect: self.dialect.name().to_string(),
                });
                Ok(None)
            }
        }
    }

    fn render_query_part(&mut self, part: &QueryPart) -> DialectResult<()> {
        match part {
            QueryPart::Spec(spec) => self.render_query_spec(spec),
            QueryPart::Group(group) => self.render_query_group(group),
        }
    }

    /// Render a query nested inside another statement
    fn render_subquery(&mut self, part: &QueryPart) -> DialectResult<()> {
        self.depth += 1;
        self.push("(");
        let result = self.render_query_part(part);
        self.push(")");
        self.depth -= 1;
        result
    }

    /// Whether this query's ORDER BY is rendered; drops it (with a warning)
    /// from subqueries on dialects that reject it there
    fn keep_order_by(&mut self, order_by: &[SortSpec], paginated: bool) -> DialectResult<bool> {
        if order_by.is_empty() {
            return Ok(false);
        }
        if self.depth == 0 || self.dialect.supports(Capability::OrderByInSubquery) {
            return Ok(true);
        }
        if paginated {
            return Err(self.unsupported(
                "order by in a paginated subquery",
                self.dialect.minimum_version(Capability::OrderByInSubquery),
            ));
        }
        self.warn(TranslationWarning::SubqueryOrderByRemoved);
        Ok(false)
    }

    fn render_query_group(&mut self, group: &QueryGroup) -> DialectResult<()> {
        if group.parts.len() < 2 {
            return Err(DialectError::malformed(format!(
                "{} with {} operand(s)",
                group.operator.as_sql(),
                group.parts.len()
            )));
        }
        if group.operator == SetOperator::UnionAll {
            self.require(Capability::UnionAll, "union all")?;
        }
        if self.depth > 0 {
            self.require(Capability::UnionInSubquery, "set operation in a subquery")?;
        }
        let paginated = group.limit.is_some() || group.offset.is_some();
        if paginated && self.dialect.limit_strategy().is_prefix() {
            return Err(self.unsupported(
                "row limiting over a set operation",
                self.dialect.limit_strategy().offset_since(),
            ));
        }

        for (i, part) in group.parts.iter().enumerate() {
            if i > 0 {
                self.push(" ");
                self.push(group.operator.as_sql());
                self.push(" ");
            }
            let wrap = part.is_group() || !part.order_by().is_empty() || part.has_pagination();
            if wrap {
                // A parenthesized operand is still part of this query level
                self.push("(");
                self.render_query_part(part)?;
                self.push(")");
            } else {
                self.render_query_part(part)?;
            }
        }

        let keep_order = self.keep_order_by(&group.order_by, paginated)?;
        if keep_order {
            self.render_order_by(&group.order_by)?;
        }
        self.render_pagination_suffix(keep_order, group.limit.as_ref(), group.offset.as_ref())
    }

    fn render_query_spec(&mut self, spec: &QuerySpec) -> DialectResult<()> {
        if spec.select.is_empty() {
            return Err(DialectError::malformed("query spec with an empty select list"));
        }
        if spec.from.is_empty() {
            return Err(DialectError::malformed("query spec without a from clause"));
        }
        self.check_pagination(spec.limit.as_ref(), spec.offset.as_ref())?;
        let paginated = spec.limit.is_some() || spec.offset.is_some();
        let strategy = self.dialect.limit_strategy();

        self.push("select ");
        if let (LimitStrategy::First { .. }, Some(limit)) = (strategy, spec.limit.as_ref()) {
            self.push("first ");
            self.render_expression(limit)?;
            self.push(" ");
        }
        if spec.distinct {
            self.push("distinct ");
        }
        if let (LimitStrategy::Top { .. }, Some(limit)) = (strategy, spec.limit.as_ref()) {
            self.push("top (");
            self.render_expression(limit)?;
            self.push(") ");
        }

        for (i, item) in spec.select.iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            self.render_expression(&item.expression)?;
            if let Some(ref alias) = item.alias {
                self.push(" as ");
                self.push(alias);
            }
        }

        self.push(" from ");
        for (i, group) in spec.from.iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            self.render_table_group(group)?;
        }

        if let Some(ref predicate) = spec.where_clause {
            self.push(" where ");
            self.render_predicate(predicate)?;
        }

        if !spec.group_by.is_empty() {
            self.push(" group by ");
            for (i, expression) in spec.group_by.iter().enumerate() {
                if i > 0 {
                    self.push(", ");
                }
                self.render_expression(expression)?;
            }
        }

        if let Some(ref predicate) = spec.having {
            self.push(" having ");
            self.render_predicate(predicate)?;
        }

        let keep_order = self.keep_order_by(&spec.order_by, paginated)?;
        if keep_order {
            self.render_order_by(&spec.order_by)?;
        }

        self.render_pagination_suffix(keep_order, spec.limit.as_ref(), spec.offset.as_ref())
    }

    fn render_table_group(&mut self, group: &TableGroup) -> DialectResult<()> {
        self.render_table_reference(&group.root);
        if self.depth == 0 {
            if let Some(hint) = self.pending_table_hint.take() {
                self.push(&hint);
            }
        }
        for join in &group.joins {
            self.push(" ");
            self.push(join.kind.as_sql());
            self.push(" ");
            self.render_table_reference(&join.table);
            match (&join.on, join.kind) {
                (Some(predicate), _) => {
                    self.push(" on ");
                    self.render_predicate(predicate)?;
                }
                (None, crate::ast::JoinKind::Cross) => {}
                (None, _) => {
                    return Err(DialectError::malformed(format!(
                        "join to {} without a condition",
                        join.table.table
                    )))
                }
            }
        }
        Ok(())
    }

    fn render_table_reference(&mut self, table: &TableReference) {
        self.affected_tables.insert(table.table.clone());
        self.push_identifier(&table.table);
        if !table.alias.is_empty() {
            self.push(" ");
            self.push(&table.alias);
        }
    }

    fn render_order_by(&mut self, order_by: &[SortSpec]) -> DialectResult<()> {
        self.push(" order by ");
        for (i, sort) in order_by.iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            self.render_sort_spec(sort)?;
        }
        Ok(())
    }

    fn render_sort_spec(&mut self, sort: &SortSpec) -> DialectResult<()> {
        let emulate_nulls = sort.nulls.is_some() && !self.dialect.supports(Capability::NullsOrdering);
        if emulate_nulls {
            let (null_key, other_key) = match sort.nulls {
                Some(NullPrecedence::First) => ("0", "1"),
                _ => ("1", "0"),
            };
            self.push("case when ");
            self.render_expression(&sort.expression)?;
            self.push(" is null then ");
            self.push(null_key);
            self.push(" else ");
            self.push(other_key);
            self.push(" end, ");
        }
        self.render_expression(&sort.expression)?;
        if sort.direction == SortDirection::Descending {
            self.push(" desc");
        }
        if !emulate_nulls {
            match sort.nulls {
                Some(NullPrecedence::First) => self.push(" nulls first"),
                Some(NullPrecedence::Last) => self.push(" nulls last"),
                None => {}
            }
        }
        Ok(())
    }

    fn check_pagination(&self, limit: Option<&Expression>, offset: Option<&Expression>) -> DialectResult<()> {
        if limit.is_none() && offset.is_none() {
            return Ok(());
        }
        match self.dialect.limit_strategy() {
            LimitStrategy::Unsupported => Err(self.unsupported("row limiting", None)),
            strategy @ (LimitStrategy::First { offset_since } | LimitStrategy::Top { offset_since }) => {
                if offset.is_some() {
                    return Err(self.unsupported("offset", *offset_since));
                }
                if !strategy.supports_variable_limit()
                    && !matches!(limit, Some(Expression::Literal(Literal::Integer(_))))
                {
                    return Err(self.unsupported("a non-literal row limit", *offset_since));
                }
                Ok(())
            }
            LimitStrategy::LimitOffset { .. } | LimitStrategy::OffsetFetch { .. } => Ok(()),
        }
    }

    fn render_pagination_suffix(
        &mut self,
        has_order_by: bool,
        limit: Option<&Expression>,
        offset: Option<&Expression>,
    ) -> DialectResult<()> {
        if limit.is_none() && offset.is_none() {
            return Ok(());
        }
        match self.dialect.limit_strategy() {
            LimitStrategy::LimitOffset { max_rows } => {
                match (limit, max_rows) {
                    (Some(limit), _) => {
                        self.push(" limit ");
                        self.render_expression(limit)?;
                    }
                    (None, Some(max_rows)) => {
                        self.push(" limit ");
                        self.push(max_rows);
                    }
                    (None, None) => {}
                }
                if let Some(offset) = offset {
                    self.push(" offset ");
                    self.render_expression(offset)?;
                }
            }
            LimitStrategy::OffsetFetch {
                offset_rows_keyword,
                requires_order_by,
            } => {
                if *requires_order_by && !has_order_by {
                    self.push(" order by @@version");
                }
                if let Some(offset) = offset {
                    self.push(" offset ");
                    self.render_expression(offset)?;
                    if *offset_rows_keyword {
                        self.push(" rows");
                    }
                }
                if let Some(limit) = limit {
                    self.push(if offset.is_some() { " fetch next " } else { " fetch first " });
                    self.render_expression(limit)?;
                    self.push(" rows only");
                }
            }
            // rendered after `select`
            LimitStrategy::First { .. } | LimitStrategy::Top { .. } => {}
            LimitStrategy::Unsupported => return Err(self.unsupported("row limiting", None)),
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    fn render_insert(&mut self, insert: &InsertStatement) -> DialectResult<()> {
        if insert.columns.is_empty() {
            return Err(DialectError::malformed("insert without columns"));
        }
        self.affected_tables.insert(insert.table.clone());
        self.push("insert into ");
        self.push_identifier(&insert.table);
        self.push(" (");
        for (i, column) in insert.columns.iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            self.push_identifier(column);
        }
        self.push(") ");

        match &insert.source {
            InsertSource::Values(rows) => {
                if rows.is_empty() {
                    return Err(DialectError::malformed("insert without rows"));
                }
                self.push("values ");
                for (r, row) in rows.iter().enumerate() {
                    if row.len() != insert.columns.len() {
                        return Err(DialectError::malformed(format!(
                            "insert row {} has {} values for {} columns",
                            r,
                            row.len(),
                            insert.columns.len()
                        )));
                    }
                    if r > 0 {
                        self.push(", ");
                    }
                    self.push("(");
                    for (i, value) in row.iter().enumerate() {
                        if i > 0 {
                            self.push(", ");
                        }
                        self.render_expression(value)?;
                    }
                    self.push(")");
                }
            }
            InsertSource::Query(query) => {
                self.depth += 1;
                let result = self.render_query_part(query);
                self.depth -= 1;
                result?;
            }
        }
        Ok(())
    }

    fn render_update(&mut self, update: &UpdateStatement) -> DialectResult<()> {
        if update.assignments.is_empty() {
            return Err(DialectError::malformed("update without assignments"));
        }
        self.unqualified_alias = Some(update.table.alias.clone());
        self.affected_tables.insert(update.table.table.clone());
        self.push("update ");
        self.push_identifier(&update.table.table);
        self.push(" set ");
        for (i, Assignment { column, value }) in update.assignments.iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            self.push_identifier(column);
            self.push(" = ");
            self.render_expression(value)?;
        }
        if let Some(ref predicate) = update.where_clause {
            self.push(" where ");
            self.render_predicate(predicate)?;
        }
        Ok(())
    }

    fn render_delete(&mut self, delete: &DeleteStatement) -> DialectResult<()> {
        self.unqualified_alias = Some(delete.table.alias.clone());
        self.affected_tables.insert(delete.table.table.clone());
        self.push("delete from ");
        self.push_identifier(&delete.table.table);
        if let Some(ref predicate) = delete.where_clause {
            self.push(" where ");
            self.render_predicate(predicate)?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Predicates
    // ------------------------------------------------------------------

    fn render_predicate(&mut self, predicate: &Predicate) -> DialectResult<()> {
        match predicate {
            Predicate::Comparison {
                left,
                operator,
                right,
            } => self.render_comparison(left, *operator, right),
            Predicate::And(items) => {
                if items.is_empty() {
                    self.push("1=1");
                    return Ok(());
                }
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        self.push(" and ");
                    }
                    let wrap = matches!(item, Predicate::Or(inner) if inner.len() > 1);
                    if wrap {
                        self.push("(");
                    }
                    self.render_predicate(item)?;
                    if wrap {
                        self.push(")");
                    }
                }
                Ok(())
            }
            Predicate::Or(items) => {
                if items.is_empty() {
                    self.push("1=0");
                    return Ok(());
                }
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        self.push(" or ");
                    }
                    self.render_predicate(item)?;
                }
                Ok(())
            }
            Predicate::Not(inner) => {
                self.push("not (");
                self.render_predicate(inner)?;
                self.push(")");
                Ok(())
            }
            Predicate::IsNull {
                expression,
                negated,
            } => {
                self.render_expression(expression)?;
                self.push(if *negated { " is not null" } else { " is null" });
                Ok(())
            }
            Predicate::InList {
                expression,
                list,
                negated,
            } => {
                if list.is_empty() {
                    self.push(if *negated { "1=1" } else { "1=0" });
                    return Ok(());
                }
                self.check_in_lhs(expression)?;
                self.render_expression(expression)?;
                self.push(if *negated { " not in (" } else { " in (" });
                for (i, item) in list.iter().enumerate() {
                    if i > 0 {
                        self.push(", ");
                    }
                    self.render_expression(item)?;
                }
                self.push(")");
                Ok(())
            }
            Predicate::InSubquery {
                expression,
                query,
                negated,
            } => {
                self.check_in_lhs(expression)?;
                self.render_expression(expression)?;
                self.push(if *negated { " not in " } else { " in " });
                self.render_subquery(query)
            }
            Predicate::Exists { query, negated } => {
                self.push(if *negated { "not exists " } else { "exists " });
                self.render_subquery(query)
            }
            Predicate::Like {
                expression,
                pattern,
                escape,
                case_insensitive,
                negated,
            } => {
                let native = *case_insensitive && self.dialect.supports(Capability::CaseInsensitiveLike);
                let lowered = *case_insensitive && !native;
                self.render_lowered(expression, lowered)?;
                self.push(match (*negated, native) {
                    (false, false) => " like ",
                    (true, false) => " not like ",
                    (false, true) => " ilike ",
                    (true, true) => " not ilike ",
                });
                self.render_lowered(pattern, lowered)?;
                if let Some(escape) = escape {
                    self.push(" escape ");
                    let literal = quote_string(&escape.to_string());
                    self.push(&literal);
                }
                Ok(())
            }
            Predicate::Between {
                expression,
                low,
                high,
                negated,
            } => {
                self.render_expression(expression)?;
                self.push(if *negated { " not between " } else { " between " });
                self.render_expression(low)?;
                self.push(" and ");
                self.render_expression(high)?;
                Ok(())
            }
            Predicate::Boolean(expression) => {
                self.render_expression(expression)?;
                self.push(" = ");
                self.push(self.dialect.boolean_literal(true));
                Ok(())
            }
        }
    }

    fn render_lowered(&mut self, expression: &Expression, lowered: bool) -> DialectResult<()> {
        if lowered {
            let function = self.dialect.lowercase_function().to_string();
            self.push(&function);
            self.push("(");
            self.render_expression(expression)?;
            self.push(")");
            Ok(())
        } else {
            self.render_expression(expression)
        }
    }

    fn check_in_lhs(&self, expression: &Expression) -> DialectResult<()> {
        match expression {
            Expression::Tuple(_) => self.require(Capability::SubselectAsInPredicateLhs, "tuple on the left of in"),
            Expression::Subquery(_) => {
                self.require(Capability::SubselectAsInPredicateLhs, "subquery on the left of in")
            }
            _ => Ok(()),
        }
    }

    fn render_comparison(
        &mut self,
        left: &Expression,
        operator: ComparisonOperator,
        right: &Expression,
    ) -> DialectResult<()> {
        match (left, right) {
            (Expression::Tuple(lhs), Expression::Tuple(rhs)) => {
                if lhs.len() < 2 || lhs.len() != rhs.len() {
                    return Err(DialectError::malformed(format!(
                        "tuple comparison between {} and {} elements",
                        lhs.len(),
                        rhs.len()
                    )));
                }
                if self.dialect.supports(Capability::RowValueConstructorSyntax) {
                    self.render_simple_comparison(left, operator, right)
                } else {
                    self.render_expanded_tuple_comparison(lhs, operator, rhs)
                }
            }
            (Expression::Tuple(elements), _) | (_, Expression::Tuple(elements)) => {
                if elements.len() < 2 {
                    return Err(DialectError::malformed("tuple with fewer than two elements"));
                }
                self.require(Capability::RowValueConstructorSyntax, "row value comparison")?;
                self.render_simple_comparison(left, operator, right)
            }
            _ => self.render_simple_comparison(left, operator, right),
        }
    }

    fn render_simple_comparison(
        &mut self,
        left: &Expression,
        operator: ComparisonOperator,
        right: &Expression,
    ) -> DialectResult<()> {
        self.render_expression(left)?;
        self.push(" ");
        self.push(operator.as_sql());
        self.push(" ");
        self.render_expression(right)
    }

    /// `(a, b) < (x, y)` as `(a < x or (a = x and b < y))`
    fn render_expanded_tuple_comparison(
        &mut self,
        lhs: &[Expression],
        operator: ComparisonOperator,
        rhs: &[Expression],
    ) -> DialectResult<()> {
        match operator {
            ComparisonOperator::Equal | ComparisonOperator::NotEqual => {
                let joiner = if operator == ComparisonOperator::Equal { " and " } else { " or " };
                self.push("(");
                for (i, (l, r)) in lhs.iter().zip(rhs).enumerate() {
                    if i > 0 {
                        self.push(joiner);
                    }
                    self.render_simple_comparison(l, operator, r)?;
                }
                self.push(")");
                Ok(())
            }
            _ => {
                let strict = match operator {
                    ComparisonOperator::LessThan | ComparisonOperator::LessOrEqual => {
                        ComparisonOperator::LessThan
                    }
                    _ => ComparisonOperator::GreaterThan,
                };
                let last = lhs.len() - 1;
                self.push("(");
                for i in 0..lhs.len() {
                    if i > 0 {
                        self.push(" or ");
                    }
                    if i > 0 {
                        self.push("(");
                    }
                    for j in 0..i {
                        self.render_simple_comparison(&lhs[j], ComparisonOperator::Equal, &rhs[j])?;
                        self.push(" and ");
                    }
                    let op = if i == last { operator } else { strict };
                    self.render_simple_comparison(&lhs[i], op, &rhs[i])?;
                    if i > 0 {
                        self.push(")");
                    }
                }
                self.push(")");
                Ok(())
            }
        }
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    fn render_expression(&mut self, expression: &Expression) -> DialectResult<()> {
        match expression {
            Expression::Column(column) => {
                self.render_column(column);
                Ok(())
            }
            Expression::Literal(literal) => self.render_literal(literal),
            Expression::Parameter(parameter) => {
                let position = self.parameters.len() + 1;
                let placeholder = match self.config.bind_mode {
                    BindVariableMode::Parameterized => self.config.placeholder_style.placeholder(position),
                    BindVariableMode::Placeholder => match &parameter.source {
                        ParameterSource::Named(name) => format!(":{}", name),
                        ParameterSource::Positional(p) => format!(":{}", p),
                    },
                };
                self.push(&placeholder);
                self.parameters.push(SqlParameter {
                    position,
                    placeholder,
                    source: parameter.source.clone(),
                    sql_type: parameter.sql_type,
                });
                Ok(())
            }
            Expression::Function { name, arguments } => {
                let dialect = self.dialect;
                let template = dialect.function_template_for(name).ok_or_else(|| {
                    DialectError::UnknownFunction {
                        dialect: dialect.name().to_string(),
                        function: name.clone(),
                    }
                })?;
                let args: Vec<TemplateArg<'_>> = arguments.iter().map(TemplateArg::Expr).collect();
                self.render_template(template, &args)
            }
            Expression::Aggregate {
                function,
                distinct,
                argument,
            } => self.render_aggregate(*function, *distinct, argument.as_deref()),
            Expression::Extract { unit, source } => self.render_extract(*unit, source),
            Expression::TimestampAdd {
                unit,
                magnitude,
                timestamp,
            } => {
                let pattern = self.dialect.timestampadd_pattern(*unit)?;
                let template = FunctionTemplate::pattern("timestampadd", &pattern, None);
                self.render_template(
                    &template,
                    &[
                        TemplateArg::Sql(unit.duration_field().to_string()),
                        TemplateArg::Expr(magnitude),
                        TemplateArg::Expr(timestamp),
                    ],
                )
            }
            Expression::TimestampDiff { unit, from, to } => {
                let pattern = self.dialect.timestampdiff_pattern(*unit)?;
                let template = FunctionTemplate::pattern("timestampdiff", &pattern, None);
                self.render_template(
                    &template,
                    &[
                        TemplateArg::Sql(unit.duration_field().to_string()),
                        TemplateArg::Expr(from),
                        TemplateArg::Expr(to),
                    ],
                )
            }
            Expression::Format { source, pattern } => {
                let dialect = self.dialect;
                let template = dialect.function_template_for("format").ok_or_else(|| {
                    DialectError::UnknownFunction {
                        dialect: dialect.name().to_string(),
                        function: "format".to_string(),
                    }
                })?;
                let translated = translate_datetime_format(pattern, dialect.datetime_format_style());
                self.render_template(
                    template,
                    &[TemplateArg::Expr(source), TemplateArg::Sql(quote_string(&translated))],
                )
            }
            Expression::Binary {
                left,
                operator,
                right,
            } => {
                self.push("(");
                self.render_expression(left)?;
                self.push(" ");
                self.push(operator.as_sql());
                self.push(" ");
                self.render_expression(right)?;
                self.push(")");
                Ok(())
            }
            Expression::Negate(inner) => {
                self.push("-(");
                self.render_expression(inner)?;
                self.push(")");
                Ok(())
            }
            Expression::Case {
                branches,
                otherwise,
            } => self.render_case(branches, otherwise.as_deref()),
            Expression::Cast { expression, target } => {
                let type_name = self.dialect.column_type_for(
                    target.code,
                    target.length,
                    target.precision,
                    target.scale,
                )?;
                self.push("cast(");
                self.render_expression(expression)?;
                self.push(" as ");
                self.push(&type_name);
                self.push(")");
                Ok(())
            }
            Expression::Subquery(query) => self.render_subquery(query),
            Expression::Tuple(elements) => {
                if elements.is_empty() {
                    return Err(DialectError::malformed("empty tuple"));
                }
                self.push("(");
                for (i, element) in elements.iter().enumerate() {
                    if i > 0 {
                        self.push(", ");
                    }
                    self.render_expression(element)?;
                }
                self.push(")");
                Ok(())
            }
            Expression::Star(qualifier) => {
                if let Some(qualifier) = qualifier {
                    self.push(qualifier);
                    self.push(".");
                }
                self.push("*");
                Ok(())
            }
        }
    }

    fn render_column(&mut self, column: &ColumnReference) {
        if let Some(ref qualifier) = column.qualifier {
            let unqualified = self.unqualified_alias.as_deref() == Some(qualifier.as_str()) && self.depth == 0;
            if !unqualified {
                self.push(qualifier);
                self.push(".");
            }
        }
        self.push_identifier(&column.column);
    }

    fn render_literal(&mut self, literal: &Literal) -> DialectResult<()> {
        match literal {
            Literal::Null => self.push("null"),
            Literal::Boolean(value) => self.push(self.dialect.boolean_literal(*value)),
            Literal::Integer(value) => self.push(&value.to_string()),
            Literal::Float(value) => {
                if !value.is_finite() {
                    return Err(DialectError::malformed(format!("non-finite literal {}", value)));
                }
                let mut text = value.to_string();
                if !text.contains('.') {
                    text.push_str(".0");
                }
                self.push(&text);
            }
            Literal::String(value) => {
                let quoted = quote_string(value);
                self.push(&quoted);
            }
        }
        Ok(())
    }

    fn render_aggregate(
        &mut self,
        function: AggregateFunction,
        distinct: bool,
        argument: Option<&Expression>,
    ) -> DialectResult<()> {
        self.push(function.as_sql());
        self.push("(");
        match argument {
            None if function == AggregateFunction::Count => self.push("*"),
            None => {
                return Err(DialectError::malformed(format!(
                    "{} without an argument",
                    function.as_sql()
                )))
            }
            Some(argument) => {
                if distinct {
                    if let Expression::Tuple(_) = argument {
                        self.require(Capability::TupleDistinctCounts, "count(distinct) over a tuple")?;
                    }
                    self.push("distinct ");
                }
                self.render_expression(argument)?;
            }
        }
        self.push(")");
        Ok(())
    }

    /// Unit pattern, then the dialect's `extract` template, then ANSI `extract`
    fn render_extract(&mut self, unit: TemporalUnit, source: &Expression) -> DialectResult<()> {
        let dialect = self.dialect;
        let field = dialect.translate_extract_field(unit).to_string();
        if let Some(pattern) = dialect.rules().extract_patterns.get(&unit) {
            let template = FunctionTemplate::pattern("extract", pattern, Some(SqlType::Integer));
            return self.render_template(&template, &[TemplateArg::Sql(field), TemplateArg::Expr(source)]);
        }
        if let Some(template) = dialect.function_template_for("extract") {
            return self.render_template(template, &[TemplateArg::Sql(field), TemplateArg::Expr(source)]);
        }
        self.push("extract(");
        self.push(&field);
        self.push(" from ");
        self.render_expression(source)?;
        self.push(")");
        Ok(())
    }

    fn render_case(&mut self, branches: &[CaseBranch], otherwise: Option<&Expression>) -> DialectResult<()> {
        if branches.is_empty() {
            return Err(DialectError::malformed("case expression without branches"));
        }
        self.push("case");
        for branch in branches {
            self.push(" when ");
            self.render_predicate(&branch.when)?;
            self.push(" then ");
            self.render_expression(&branch.then)?;
        }
        if let Some(otherwise) = otherwise {
            self.push(" else ");
            self.render_expression(otherwise)?;
        }
        self.push(" end");
        Ok(())
    }

    /// Render a template whose `?N` occurrences render the arguments in place
    fn render_template(&mut self, template: &FunctionTemplate, args: &[TemplateArg<'_>]) -> DialectResult<()> {
        let mut buffer = std::mem::take(&mut self.sql);
        let result = template.render_with(&mut buffer, args.len(), |out, index| {
            std::mem::swap(&mut self.sql, out);
            let rendered = match args.get(index) {
                Some(TemplateArg::Expr(expression)) => self.render_expression(expression),
                Some(TemplateArg::Sql(sql)) => {
                    self.sql.push_str(sql);
                    Ok(())
                }
                None => Err(DialectError::malformed(format!(
                    "{} has no argument {}",
                    template.name,
                    index + 1
                ))),
            };
            std::mem::swap(&mut self.sql, out);
            rendered
        });
        self.sql = buffer;
        result
    }
}

/// SQL string literal with embedded quotes doubled
pub fn quote_string(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{CastTarget, JoinKind, TableJoin};
    use pretty_assertions::assert_eq;

    fn person_query() -> QuerySpec {
        QuerySpec::from_table("person", "t0")
            .select(Expression::column("t0", "id"))
            .select(Expression::column("t0", "name"))
    }

    fn render(dialect: &Dialect, statement: Statement) -> DialectResult<SqlRendering> {
        dialect.sql_ast_translator().translate(&statement)
    }

    fn select(query: impl Into<QueryPart>) -> Statement {
        Statement::Select(SelectStatement::new(query))
    }

    #[test]
    fn test_simple_select_with_parameters() {
        let dialect = Dialect::resolve("postgresql", 15).unwrap();
        let query = person_query()
            .filter(Predicate::eq(Expression::column("t0", "name"), Expression::named_param("name")))
            .filter(Predicate::compare(
                Expression::column("t0", "age"),
                ComparisonOperator::GreaterThan,
                Expression::named_param("age"),
            ));
        let rendering = render(&dialect, select(query)).unwrap();
        assert_eq!(
            rendering.sql,
            "select t0.id, t0.name from person t0 where t0.name = $1 and t0.age > $2"
        );
        assert_eq!(rendering.parameters.len(), 2);
        assert_eq!(rendering.parameters[0].source, ParameterSource::Named("name".to_string()));
        assert_eq!(rendering.parameters[1].placeholder, "$2");
        assert!(rendering.affected_tables.contains("person"));
    }

    #[test]
    fn test_placeholder_mode() {
        let dialect = Dialect::resolve("sqlite", (3, 45)).unwrap();
        let query = person_query()
            .filter(Predicate::eq(Expression::column("t0", "name"), Expression::named_param("name")));
        let rendering = dialect
            .sql_ast_translator()
            .with_bind_mode(BindVariableMode::Placeholder)
            .translate(&select(query))
            .unwrap();
        assert_eq!(rendering.sql, "select t0.id, t0.name from person t0 where t0.name = :name");
    }

    #[test]
    fn test_boolean_literals() {
        let query = person_query().filter(Predicate::eq(
            Expression::column("t0", "active"),
            Expression::boolean(true),
        ));
        let ingres9 = Dialect::resolve("ingres", (9, 3)).unwrap();
        let ingres10 = Dialect::resolve("ingres", 10).unwrap();
        assert!(render(&ingres9, select(query.clone())).unwrap().sql.ends_with("t0.active = 1"));
        assert!(render(&ingres10, select(query)).unwrap().sql.ends_with("t0.active = true"));
    }

    #[test]
    fn test_empty_in_list() {
        let dialect = Dialect::resolve("mysql", 8).unwrap();
        let query = person_query().filter(Predicate::in_list(Expression::column("t0", "id"), vec![]));
        let sql = render(&dialect, select(query)).unwrap().sql;
        assert!(sql.ends_with("where 1=0"));
    }

    #[test]
    fn test_tuple_comparison_expands_without_row_values() {
        let dialect = Dialect::resolve("ingres", 10).unwrap();
        let query = person_query().filter(Predicate::compare(
            Expression::Tuple(vec![Expression::column("t0", "a"), Expression::column("t0", "b")]),
            ComparisonOperator::LessThan,
            Expression::Tuple(vec![Expression::integer(1), Expression::integer(2)]),
        ));
        let sql = render(&dialect, select(query)).unwrap().sql;
        assert!(sql.ends_with("where (t0.a < 1 or (t0.a = 1 and t0.b < 2))"), "{}", sql);
    }

    #[test]
    fn test_tuple_comparison_native() {
        let dialect = Dialect::resolve("postgresql", 15).unwrap();
        let query = person_query().filter(Predicate::eq(
            Expression::Tuple(vec![Expression::column("t0", "a"), Expression::column("t0", "b")]),
            Expression::Tuple(vec![Expression::integer(1), Expression::integer(2)]),
        ));
        let sql = render(&dialect, select(query)).unwrap().sql;
        assert!(sql.ends_with("where (t0.a, t0.b) = (1, 2)"));
    }

    #[test]
    fn test_single_element_tuple_is_malformed() {
        let dialect = Dialect::resolve("postgresql", 15).unwrap();
        let query = person_query().filter(Predicate::eq(
            Expression::Tuple(vec![Expression::column("t0", "a")]),
            Expression::Tuple(vec![Expression::integer(1)]),
        ));
        let err = render(&dialect, select(query)).unwrap_err();
        assert!(err.is_internal());
    }

    #[test]
    fn test_nulls_ordering_emulation() {
        let dialect = Dialect::resolve("mysql", 8).unwrap();
        let query = person_query().order(SortSpec::asc(Expression::column("t0", "name")).nulls(NullPrecedence::Last));
        let sql = render(&dialect, select(query)).unwrap().sql;
        assert!(sql.ends_with("order by case when t0.name is null then 1 else 0 end, t0.name"));

        let pg = Dialect::resolve("postgresql", 15).unwrap();
        let query = person_query().order(SortSpec::desc(Expression::column("t0", "name")).nulls(NullPrecedence::First));
        assert!(render(&pg, select(query)).unwrap().sql.ends_with("order by t0.name desc nulls first"));
    }

    #[test]
    fn test_cast_uses_column_types() {
        let dialect = Dialect::resolve("ingres", 10).unwrap();
        let query = QuerySpec::from_table("person", "t0").select(Expression::Cast {
            expression: Box::new(Expression::column("t0", "age")),
            target: CastTarget::new(SqlType::Varchar),
        });
        let sql = render(&dialect, select(query)).unwrap().sql;
        assert_eq!(sql, "select cast(t0.age as varchar(255)) from person t0");
    }

    #[test]
    fn test_unknown_function() {
        let dialect = Dialect::resolve("sqlite", (3, 45)).unwrap();
        let query = QuerySpec::from_table("person", "t0")
            .select(Expression::function("squeeze", vec![Expression::column("t0", "name")]));
        let err = render(&dialect, select(query)).unwrap_err();
        assert!(matches!(err, DialectError::UnknownFunction { .. }));
    }

    #[test]
    fn test_repeated_template_argument_binds_each_occurrence() {
        let dialect = Dialect::resolve("postgresql", 15).unwrap();
        let query = QuerySpec::from_table("person", "t0").select(Expression::function(
            "locate",
            vec![
                Expression::named_param("needle"),
                Expression::column("t0", "name"),
                Expression::named_param("start"),
            ],
        ));
        let rendering = render(&dialect, select(query)).unwrap();
        assert_eq!(
            rendering.sql,
            "select (position($1 in substring(t0.name from $2))+($3)-1) from person t0"
        );
        let sources: Vec<String> = rendering.parameters.iter().map(|p| p.source.to_string()).collect();
        assert_eq!(sources, vec![":needle", ":start", ":start"]);
    }

    #[test]
    fn test_join_rendering() {
        let dialect = Dialect::resolve("postgresql", 15).unwrap();
        let query = person_query().join(TableJoin::new(
            JoinKind::Left,
            TableReference::new("address", "t1"),
            Predicate::eq(Expression::column("t1", "person_id"), Expression::column("t0", "id")),
        ));
        let rendering = render(&dialect, select(query)).unwrap();
        assert_eq!(
            rendering.sql,
            "select t0.id, t0.name from person t0 left join address t1 on t1.person_id = t0.id"
        );
        assert_eq!(rendering.affected_tables.len(), 2);
    }

    #[test]
    fn test_mutations() {
        let dialect = Dialect::resolve("sqlite", (3, 45)).unwrap();
        let update = Statement::Update(UpdateStatement {
            table: TableReference::new("person", "t0"),
            assignments: vec![Assignment::new("name", Expression::named_param("name"))],
            where_clause: Some(Predicate::eq(Expression::column("t0", "id"), Expression::named_param("id"))),
        });
        assert_eq!(
            render(&dialect, update).unwrap().sql,
            "update person set name = ?1 where id = ?2"
        );

        let insert = Statement::Insert(InsertStatement {
            table: "person".to_string(),
            columns: vec!["id".to_string(), "name".to_string()],
            source: InsertSource::Values(vec![vec![Expression::integer(1)]]),
        });
        assert!(render(&dialect, insert).unwrap_err().is_internal());
    }

    #[test]
    fn test_case_without_branches_is_malformed() {
        let dialect = Dialect::resolve("sqlite", (3, 45)).unwrap();
        let query = QuerySpec::from_table("person", "t0").select(Expression::Case {
            branches: vec![],
            otherwise: None,
        });
        assert!(render(&dialect, select(query)).unwrap_err().is_internal());
    }

    #[test]
    fn test_case_insensitive_like() {
        let like = Predicate::Like {
            expression: Expression::column("t0", "name"),
            pattern: Expression::string("a%"),
            escape: None,
            case_insensitive: true,
            negated: false,
        };
        let ingres = Dialect::resolve("ingres", 10).unwrap();
        let sql = render(&ingres, select(person_query().filter(like.clone()))).unwrap().sql;
        assert!(sql.ends_with("where lowercase(t0.name) like lowercase('a%')"));
        let pg = Dialect::resolve("postgresql", 15).unwrap();
        let sql = render(&pg, select(person_query().filter(like))).unwrap().sql;
        assert!(sql.ends_with("where t0.name ilike 'a%'"));
    }
}
