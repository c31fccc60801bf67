//! Function registry: portable function names to vendor SQL

use std::collections::BTreeMap;

use crate::dialect::column_types::SqlType;
use crate::lexer::{tokenize, Token, TokenKind};
use crate::sql::error::{DialectError, DialectResult};

/// A parsed call pattern such as `position(?1 in ?2)`
#[derive(Debug, Clone, PartialEq)]
pub struct PatternTemplate {
    source: String,
    tokens: Vec<Token>,
    arity: usize,
}

impl PatternTemplate {
    pub fn parse(source: impl Into<String>) -> Self {
        let source = source.into();
        let tokens = tokenize(&source);
        let arity = tokens
            .iter()
            .filter_map(|t| match t.kind {
                TokenKind::Argument(n) => Some(n),
                _ => None,
            })
            .max()
            .unwrap_or(0);
        Self {
            source,
            tokens,
            arity,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Highest `?N` in the pattern
    pub fn arity(&self) -> usize {
        self.arity
    }

    /// Render the pattern, asking `arg` for every `?N` occurrence (0-based index)
    pub fn render<F>(&self, out: &mut String, arg: &mut F) -> DialectResult<()>
    where
        F: FnMut(&mut String, usize) -> DialectResult<()>,
    {
        for token in &self.tokens {
            match token.kind {
                TokenKind::Argument(n) => arg(out, n - 1)?,
                _ => out.push_str(token.text(&self.source)),
            }
        }
        Ok(())
    }
}

/// How a function call is turned into SQL
#[derive(Debug, Clone, PartialEq)]
pub enum FunctionRendering {
    /// One pattern per accepted argument count
    Patterns(BTreeMap<usize, PatternTemplate>),
    /// `sql_name(a, b, ...)`
    Named { sql_name: String },
    /// `(a op b op ...)`
    Infix { operator: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionTemplate {
    pub name: String,
    pub min_args: usize,
    pub max_args: Option<usize>,
    pub rendering: FunctionRendering,
    /// `None` when the result type follows the arguments
    pub result_type: Option<SqlType>,
}

impl FunctionTemplate {
    pub fn pattern(name: &str, pattern: &str, result_type: Option<SqlType>) -> Self {
        let pattern = PatternTemplate::parse(pattern);
        let arity = pattern.arity();
        let mut patterns = BTreeMap::new();
        patterns.insert(arity, pattern);
        Self {
            name: name.to_lowercase(),
            min_args: arity,
            max_args: Some(arity),
            rendering: FunctionRendering::Patterns(patterns),
            result_type,
        }
    }

    pub fn named(
        name: &str,
        sql_name: &str,
        min_args: usize,
        max_args: Option<usize>,
        result_type: Option<SqlType>,
    ) -> Self {
        Self {
            name: name.to_lowercase(),
            min_args,
            max_args,
            rendering: FunctionRendering::Named {
                sql_name: sql_name.to_string(),
            },
            result_type,
        }
    }

    pub fn infix(name: &str, operator: &str, min_args: usize, result_type: Option<SqlType>) -> Self {
        Self {
            name: name.to_lowercase(),
            min_args,
            max_args: None,
            rendering: FunctionRendering::Infix {
                operator: operator.to_string(),
            },
            result_type,
        }
    }

    pub fn accepts(&self, actual: usize) -> bool {
        actual >= self.min_args && self.max_args.map_or(true, |max| actual <= max)
    }

    pub fn check_arity(&self, actual: usize) -> DialectResult<()> {
        let supported = match &self.rendering {
            FunctionRendering::Patterns(patterns) => patterns.contains_key(&actual),
            _ => self.accepts(actual),
        };
        if supported {
            Ok(())
        } else {
            Err(DialectError::FunctionArity {
                function: self.name.clone(),
                min: self.min_args,
                max: self.max_args,
                actual,
            })
        }
    }

    /// Render a call with `argc` arguments.
    ///
    /// `arg` writes the SQL of one argument; it is called once per
    /// occurrence, in textual order, so bind parameters come out in the
    /// order they appear in the SQL.
    pub fn render_with<F>(&self, out: &mut String, argc: usize, mut arg: F) -> DialectResult<()>
    where
        F: FnMut(&mut String, usize) -> DialectResult<()>,
    {
        self.check_arity(argc)?;
        match &self.rendering {
            FunctionRendering::Patterns(patterns) => match patterns.get(&argc) {
                Some(pattern) => pattern.render(out, &mut arg),
                None => Err(DialectError::malformed(format!(
                    "no pattern for {} with {} arguments",
                    self.name, argc
                ))),
            },
            FunctionRendering::Named { sql_name } => {
                out.push_str(sql_name);
                out.push('(');
                for i in 0..argc {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    arg(out, i)?;
                }
                out.push(')');
                Ok(())
            }
            FunctionRendering::Infix { operator } => {
                out.push('(');
                for i in 0..argc {
                    if i > 0 {
                        out.push_str(operator);
                    }
                    arg(out, i)?;
                }
                out.push(')');
                Ok(())
            }
        }
    }

    /// Render with arguments that are already SQL text
    pub fn render(&self, args: &[&str]) -> DialectResult<String> {
        let mut out = String::new();
        self.render_with(&mut out, args.len(), |out, i| {
            let arg = args
                .get(i)
                .ok_or_else(|| DialectError::malformed(format!("missing argument ?{}", i + 1)))?;
            out.push_str(arg);
            Ok(())
        })?;
        Ok(out)
    }
}

/// Portable function name to template, keyed case-insensitively
#[derive(Debug, Clone, Default)]
pub struct FunctionRegistry {
    functions: BTreeMap<String, FunctionTemplate>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a pattern whose exact arity is its highest `?N`
    pub fn register_pattern(&mut self, name: &str, pattern: &str, result_type: Option<SqlType>) {
        self.register_template(FunctionTemplate::pattern(name, pattern, result_type));
    }

    /// Register distinct patterns for the 2 and 3 argument forms
    pub fn register_binary_ternary_pattern(
        &mut self,
        name: &str,
        result_type: Option<SqlType>,
        binary: &str,
        ternary: &str,
    ) {
        let mut patterns = BTreeMap::new();
        patterns.insert(2, PatternTemplate::parse(binary));
        patterns.insert(3, PatternTemplate::parse(ternary));
        self.register_template(FunctionTemplate {
            name: name.to_lowercase(),
            min_args: 2,
            max_args: Some(3),
            rendering: FunctionRendering::Patterns(patterns),
            result_type,
        });
    }

    pub fn register_named(
        &mut self,
        name: &str,
        min_args: usize,
        max_args: Option<usize>,
        result_type: Option<SqlType>,
    ) {
        self.register_template(FunctionTemplate::named(
            name,
            name,
            min_args,
            max_args,
            result_type,
        ));
    }

    /// Register `name` as a call to a differently named SQL function
    pub fn register_alias(
        &mut self,
        name: &str,
        sql_name: &str,
        min_args: usize,
        max_args: Option<usize>,
        result_type: Option<SqlType>,
    ) {
        self.register_template(FunctionTemplate::named(
            name,
            sql_name,
            min_args,
            max_args,
            result_type,
        ));
    }

    pub fn register_infix(
        &mut self,
        name: &str,
        operator: &str,
        min_args: usize,
        result_type: Option<SqlType>,
    ) {
        self.register_template(FunctionTemplate::infix(name, operator, min_args, result_type));
    }

    /// Insert or replace a template
    pub fn register_template(&mut self, template: FunctionTemplate) {
        self.functions.insert(template.name.clone(), template);
    }

    pub fn unregister(&mut self, name: &str) -> Option<FunctionTemplate> {
        self.functions.remove(&name.to_lowercase())
    }

    pub fn get(&self, name: &str) -> Option<&FunctionTemplate> {
        self.functions.get(&name.to_lowercase())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

/// Reusable registrations shared by several vendor layers
pub struct CommonFunctions<'r> {
    registry: &'r mut FunctionRegistry,
}

impl<'r> CommonFunctions<'r> {
    pub fn new(registry: &'r mut FunctionRegistry) -> Self {
        Self { registry }
    }

    /// Functions every supported product spells the same way
    pub fn standard(&mut self) {
        for name in ["lower", "upper"] {
            self.registry.register_named(name, 1, Some(1), Some(SqlType::Varchar));
        }
        self.registry.register_named("length", 1, Some(1), Some(SqlType::Integer));
        self.registry.register_named("abs", 1, Some(1), None);
        self.registry.register_named("mod", 2, Some(2), Some(SqlType::Integer));
        self.registry.register_named("sqrt", 1, Some(1), Some(SqlType::Double));
        self.registry.register_named("coalesce", 1, None, None);
        self.registry.register_named("nullif", 2, Some(2), None);
        self.registry.register_pattern("current_date", "current_date", Some(SqlType::Date));
        self.registry.register_pattern("current_time", "current_time", Some(SqlType::Time));
        self.registry
            .register_pattern("current_timestamp", "current_timestamp", Some(SqlType::Timestamp));
    }

    pub fn log(&mut self) {
        self.registry.register_named("log", 2, Some(2), Some(SqlType::Double));
        self.registry.register_named("ln", 1, Some(1), Some(SqlType::Double));
    }

    pub fn rand(&mut self) {
        self.registry.register_named("rand", 0, Some(1), Some(SqlType::Double));
    }

    pub fn soundex(&mut self) {
        self.registry.register_named("soundex", 1, Some(1), Some(SqlType::Varchar));
    }

    pub fn octet_length(&mut self) {
        self.registry.register_named("octet_length", 1, Some(1), Some(SqlType::Integer));
    }

    pub fn bit_length_pattern(&mut self, pattern: &str) {
        self.registry.register_pattern("bit_length", pattern, Some(SqlType::Integer));
    }

    pub fn repeat(&mut self) {
        self.registry.register_named("repeat", 2, Some(2), Some(SqlType::Varchar));
    }

    /// `ltrim`/`rtrim` with an optional trim character
    pub fn trim2(&mut self) {
        for name in ["ltrim", "rtrim"] {
            self.registry.register_named(name, 1, Some(2), Some(SqlType::Varchar));
        }
    }

    pub fn trunc(&mut self) {
        self.registry.register_named("trunc", 1, Some(2), None);
    }

    pub fn truncate(&mut self) {
        self.registry.register_named("truncate", 1, Some(2), None);
    }

    pub fn initcap(&mut self) {
        self.registry.register_named("initcap", 1, Some(1), Some(SqlType::Varchar));
    }

    pub fn year_month_day(&mut self) {
        for name in ["year", "month", "day"] {
            self.registry.register_named(name, 1, Some(1), Some(SqlType::Integer));
        }
    }

    pub fn hour_minute_second(&mut self) {
        for name in ["hour", "minute", "second"] {
            self.registry.register_named(name, 1, Some(1), Some(SqlType::Integer));
        }
    }

    pub fn dayofweek_month_year(&mut self) {
        for name in ["dayofweek", "dayofmonth", "dayofyear"] {
            self.registry.register_named(name, 1, Some(1), Some(SqlType::Integer));
        }
    }

    pub fn week_quarter(&mut self) {
        for name in ["week", "quarter"] {
            self.registry.register_named(name, 1, Some(1), Some(SqlType::Integer));
        }
    }

    pub fn last_day(&mut self) {
        self.registry.register_named("last_day", 1, Some(1), Some(SqlType::Date));
    }

    pub fn concat_pipe_operator(&mut self) {
        self.registry.register_infix("concat", "||", 1, Some(SqlType::Varchar));
    }

    pub fn substr(&mut self) {
        self.registry.register_named("substr", 2, Some(3), Some(SqlType::Varchar));
    }

    /// `substring(..)` rendered through `substr(..)`
    pub fn substring_substr(&mut self) {
        self.registry
            .register_alias("substring", "substr", 2, Some(3), Some(SqlType::Varchar));
    }

    pub fn months_between(&mut self) {
        self.registry.register_named("months_between", 2, Some(2), Some(SqlType::Double));
    }

    pub fn ascii(&mut self) {
        self.registry.register_named("ascii", 1, Some(1), Some(SqlType::Integer));
    }

    /// `chr(..)`, also reachable as `char(..)`
    pub fn char_chr(&mut self) {
        self.registry.register_named("chr", 1, Some(1), Some(SqlType::Char));
        self.registry.register_alias("char", "chr", 1, Some(1), Some(SqlType::Char));
    }

    pub fn sysdate(&mut self) {
        self.registry.register_pattern("sysdate", "sysdate", Some(SqlType::Timestamp));
    }

    pub fn position(&mut self) {
        self.registry
            .register_pattern("position", "position(?1 in ?2)", Some(SqlType::Integer));
    }

    pub fn date_trunc(&mut self) {
        self.registry
            .register_pattern("date_trunc", "date_trunc('?1',?2)", Some(SqlType::Timestamp));
    }

    /// `format(value, pattern)` through MySQL-style `date_format`
    pub fn format_date_format(&mut self) {
        self.registry
            .register_pattern("format", "date_format(?1,?2)", Some(SqlType::Varchar));
    }

    pub fn bitand_or_xor_not(&mut self) {
        for name in ["bitand", "bitor", "bitxor"] {
            self.registry.register_named(name, 2, Some(2), Some(SqlType::Integer));
        }
        self.registry.register_named("bitnot", 1, Some(1), Some(SqlType::Integer));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn locate_registry() -> FunctionRegistry {
        let mut registry = FunctionRegistry::new();
        registry.register_binary_ternary_pattern(
            "locate",
            Some(SqlType::Integer),
            "position(?1 in ?2)",
            "(position(?1 in substring(?2 from ?3))+(?3)-1)",
        );
        registry
    }

    #[test]
    fn test_binary_and_ternary_patterns() {
        let registry = locate_registry();
        let locate = registry.get("locate").unwrap();
        assert_eq!(locate.render(&["'a'", "name"]).unwrap(), "position('a' in name)");
        assert_eq!(
            locate.render(&["'a'", "name", "5"]).unwrap(),
            "(position('a' in substring(name from 5))+(5)-1)"
        );
    }

    #[test]
    fn test_arity_outside_bounds() {
        let registry = locate_registry();
        let locate = registry.get("LOCATE").unwrap();
        for args in [&["x"][..], &["a", "b", "c", "d"][..]] {
            let err = locate.render(args).unwrap_err();
            assert_eq!(
                err,
                DialectError::FunctionArity {
                    function: "locate".to_string(),
                    min: 2,
                    max: Some(3),
                    actual: args.len(),
                }
            );
        }
    }

    #[test]
    fn test_repeated_argument_renders_each_occurrence() {
        let template = FunctionTemplate::pattern("twice", "(?1 + ?1)", None);
        let mut calls = Vec::new();
        let mut out = String::new();
        template
            .render_with(&mut out, 1, |out, i| {
                calls.push(i);
                out.push('?');
                Ok(())
            })
            .unwrap();
        assert_eq!(out, "(? + ?)");
        assert_eq!(calls, vec![0, 0]);
    }

    #[test]
    fn test_pattern_arity_is_highest_argument() {
        let template = FunctionTemplate::pattern("extract", "date_part('?1',?2)", None);
        assert_eq!(template.min_args, 2);
        assert_eq!(template.max_args, Some(2));
        let sysdate = FunctionTemplate::pattern("sysdate", "sysdate", None);
        assert_eq!(sysdate.render(&[]).unwrap(), "sysdate");
    }

    #[test]
    fn test_named_and_infix() {
        let mut registry = FunctionRegistry::new();
        let mut common = CommonFunctions::new(&mut registry);
        common.standard();
        common.concat_pipe_operator();
        common.substring_substr();

        assert_eq!(
            registry.get("coalesce").unwrap().render(&["a", "b", "c"]).unwrap(),
            "coalesce(a, b, c)"
        );
        assert_eq!(
            registry.get("concat").unwrap().render(&["a", "b"]).unwrap(),
            "(a||b)"
        );
        assert_eq!(
            registry.get("substring").unwrap().render(&["s", "1", "2"]).unwrap(),
            "substr(s, 1, 2)"
        );
        assert!(registry.get("concat").unwrap().render(&[]).is_err());
    }

    #[test]
    fn test_later_registration_overrides() {
        let mut registry = FunctionRegistry::new();
        registry.register_named("lower", 1, Some(1), None);
        registry.register_alias("lower", "lowercase", 1, Some(1), None);
        assert_eq!(registry.get("lower").unwrap().render(&["x"]).unwrap(), "lowercase(x)");
        assert_eq!(registry.len(), 1);
    }
}
