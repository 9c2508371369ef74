use parking_lot::RwLock;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::domain::Value;

/// Errors an operator function can return.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OperatorError {
    #[error("expected {expected} operand(s), got {actual}")]
    Arity { expected: usize, actual: usize },

    #[error("operand {index} has unsupported type {actual}")]
    Type { index: usize, actual: &'static str },

    #[error("operand {index} is not an integer: {value:?}")]
    NotNumeric { index: usize, value: String },

    #[error("invalid pattern {pattern:?}: {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

pub type OperatorResult = Result<Value, OperatorError>;

/// Pure function over an ordered list of evaluated operands.
pub type OperatorFn = Arc<dyn Fn(&[Value]) -> OperatorResult + Send + Sync>;

/// Upper bound on patterns compiled at evaluation time and kept for reuse.
pub const PATTERN_CACHE_CAPACITY: usize = 256;

/// Operators available to every registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinOperator {
    Length,
    EqualTo,
    GreaterThan,
    Or,
    And,
    RegexMatch,
}

impl BuiltinOperator {
    pub const ALL: [BuiltinOperator; 6] = [
        BuiltinOperator::Length,
        BuiltinOperator::EqualTo,
        BuiltinOperator::GreaterThan,
        BuiltinOperator::Or,
        BuiltinOperator::And,
        BuiltinOperator::RegexMatch,
    ];

    /// Name used in rule definitions.
    pub fn name(&self) -> &'static str {
        match self {
            BuiltinOperator::Length => "LENGTH",
            BuiltinOperator::EqualTo => "EQUAL_TO",
            BuiltinOperator::GreaterThan => "GREATER_THAN",
            BuiltinOperator::Or => "OR",
            BuiltinOperator::And => "AND",
            BuiltinOperator::RegexMatch => "REGEX_MATCH",
        }
    }

    fn function(&self, patterns: &Arc<PatternCache>) -> OperatorFn {
        match self {
            BuiltinOperator::Length => Arc::new(length),
            BuiltinOperator::EqualTo => Arc::new(equal_to),
            BuiltinOperator::GreaterThan => Arc::new(greater_than),
            BuiltinOperator::Or => Arc::new(|args: &[Value]| logical(args, |a, b| a || b)),
            BuiltinOperator::And => Arc::new(|args: &[Value]| logical(args, |a, b| a && b)),
            BuiltinOperator::RegexMatch => {
                let patterns = patterns.clone();
                Arc::new(move |args: &[Value]| regex_match(args, &patterns))
            }
        }
    }
}

impl fmt::Display for BuiltinOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Name-to-function table consulted by the parser.
///
/// Read-only once built; share it behind an `Arc`.
#[derive(Clone, Default)]
pub struct OperatorRegistry {
    operators: HashMap<String, OperatorFn>,
    /// Names still bound to their built-in implementation
    builtins: HashSet<String>,
    patterns: Arc<PatternCache>,
}

impl OperatorRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        OperatorRegistry::default()
    }

    /// Create a registry holding the built-in operators.
    pub fn with_builtins() -> Self {
        let mut registry = OperatorRegistry::new();
        for op in BuiltinOperator::ALL {
            let function = op.function(&registry.patterns);
            registry.operators.insert(op.name().to_string(), function);
            registry.builtins.insert(op.name().to_string());
        }
        registry
    }

    /// Add or replace an operator.
    pub fn register(&mut self, name: impl Into<String>, function: OperatorFn) {
        let name = name.into();
        self.builtins.remove(&name);
        self.operators.insert(name, function);
    }

    /// Resolve an operator by its exact name.
    pub fn resolve(&self, name: &str) -> Option<OperatorFn> {
        self.operators.get(name).cloned()
    }

    /// Resolve an operator for a term whose first operand is the literal
    /// `first_literal`.
    ///
    /// The built-in REGEX_MATCH gets its pattern compiled here, once per
    /// rule, instead of on every evaluation. Patterns that fail to compile
    /// fall back to the plain operator so the error surfaces at evaluation.
    pub fn resolve_for(&self, name: &str, first_literal: Option<&str>) -> Option<OperatorFn> {
        let function = self.resolve(name)?;

        match first_literal {
            Some(pattern)
                if name == BuiltinOperator::RegexMatch.name() && self.builtins.contains(name) =>
            {
                match compile(pattern) {
                    Ok(re) => Some(Arc::new(move |args: &[Value]| regex_match_compiled(args, &re))),
                    Err(_) => Some(function),
                }
            }
            _ => Some(function),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.operators.contains_key(name)
    }

    /// Registered operator names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.operators.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of patterns currently held by the evaluation-time cache.
    pub fn cached_patterns(&self) -> usize {
        self.patterns.len()
    }
}

impl fmt::Debug for OperatorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperatorRegistry")
            .field("operators", &self.names())
            .finish()
    }
}

/// Compiled regular expressions keyed by pattern source.
///
/// Holds at most `PATTERN_CACHE_CAPACITY` entries; once full, new
/// patterns are compiled per call and not retained.
#[derive(Default)]
struct PatternCache {
    compiled: RwLock<HashMap<String, Regex>>,
}

impl PatternCache {
    fn get_or_compile(&self, pattern: &str) -> Result<Regex, OperatorError> {
        if let Some(re) = self.compiled.read().get(pattern) {
            return Ok(re.clone());
        }

        let re = compile(pattern)?;

        let mut compiled = self.compiled.write();
        if compiled.len() < PATTERN_CACHE_CAPACITY {
            compiled
                .entry(pattern.to_string())
                .or_insert_with(|| re.clone());
        }
        Ok(re)
    }

    fn len(&self) -> usize {
        self.compiled.read().len()
    }
}

fn compile(pattern: &str) -> Result<Regex, OperatorError> {
    Regex::new(pattern).map_err(|e| OperatorError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })
}

#[inline]
fn expect_arity(args: &[Value], expected: usize) -> Result<(), OperatorError> {
    if args.len() != expected {
        return Err(OperatorError::Arity {
            expected,
            actual: args.len(),
        });
    }
    Ok(())
}

fn expect_str(args: &[Value], index: usize) -> Result<&str, OperatorError> {
    args[index].as_str().ok_or(OperatorError::Type {
        index,
        actual: args[index].type_name(),
    })
}

fn expect_bool(args: &[Value], index: usize) -> Result<bool, OperatorError> {
    args[index].as_bool().ok_or(OperatorError::Type {
        index,
        actual: args[index].type_name(),
    })
}

/// LENGTH(s): character count of a string.
fn length(args: &[Value]) -> OperatorResult {
    expect_arity(args, 1)?;
    let s = expect_str(args, 0)?;
    Ok(Value::Int(s.chars().count() as i64))
}

/// EQUAL_TO(a, b): string or integer equality; `Int(6)` equals `Str("6")`.
fn equal_to(args: &[Value]) -> OperatorResult {
    expect_arity(args, 2)?;

    let text = |index: usize| match &args[index] {
        Value::Str(s) => Ok(s.clone()),
        Value::Int(i) => Ok(i.to_string()),
        other => Err(OperatorError::Type {
            index,
            actual: other.type_name(),
        }),
    };

    Ok(Value::Bool(text(0)? == text(1)?))
}

/// GREATER_THAN(a, b): integer comparison `a > b`.
fn greater_than(args: &[Value]) -> OperatorResult {
    expect_arity(args, 2)?;

    let number = |index: usize| match &args[index] {
        Value::Int(i) => Ok(*i),
        Value::Str(s) => s.parse::<i64>().map_err(|_| OperatorError::NotNumeric {
            index,
            value: s.clone(),
        }),
        other => Err(OperatorError::Type {
            index,
            actual: other.type_name(),
        }),
    };

    Ok(Value::Bool(number(0)? > number(1)?))
}

fn logical(args: &[Value], combine: impl Fn(bool, bool) -> bool) -> OperatorResult {
    expect_arity(args, 2)?;
    let lhs = expect_bool(args, 0)?;
    let rhs = expect_bool(args, 1)?;
    Ok(Value::Bool(combine(lhs, rhs)))
}

/// REGEX_MATCH(pattern, subject): unanchored search.
fn regex_match(args: &[Value], patterns: &PatternCache) -> OperatorResult {
    expect_arity(args, 2)?;
    let pattern = expect_str(args, 0)?;
    let subject = expect_str(args, 1)?;

    let re = patterns.get_or_compile(pattern)?;
    Ok(Value::Bool(re.is_match(subject)))
}

/// REGEX_MATCH with its literal pattern compiled when the rule was parsed.
fn regex_match_compiled(args: &[Value], re: &Regex) -> OperatorResult {
    expect_arity(args, 2)?;
    expect_str(args, 0)?;
    let subject = expect_str(args, 1)?;

    Ok(Value::Bool(re.is_match(subject)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(name: &str, args: Vec<Value>) -> OperatorResult {
        let registry = OperatorRegistry::with_builtins();
        let function = registry.resolve(name).unwrap();
        function(&args)
    }

    #[test]
    fn test_builtins_registered() {
        let registry = OperatorRegistry::with_builtins();
        for op in BuiltinOperator::ALL {
            assert!(registry.contains(op.name()), "missing {}", op);
        }
        assert!(!registry.contains("length"));
        assert_eq!(registry.names().len(), 6);
    }

    #[test]
    fn test_length() {
        assert_eq!(call("LENGTH", vec!["bwillis".into()]), Ok(Value::Int(7)));
        assert_eq!(call("LENGTH", vec!["".into()]), Ok(Value::Int(0)));
        // Characters, not bytes
        assert_eq!(call("LENGTH", vec!["héllo".into()]), Ok(Value::Int(5)));
    }

    #[test]
    fn test_length_errors() {
        assert_eq!(
            call("LENGTH", vec!["a".into(), "b".into()]),
            Err(OperatorError::Arity { expected: 1, actual: 2 })
        );
        assert_eq!(
            call("LENGTH", vec![Value::Int(3)]),
            Err(OperatorError::Type { index: 0, actual: "int" })
        );
    }

    #[test]
    fn test_equal_to() {
        assert_eq!(call("EQUAL_TO", vec!["a".into(), "a".into()]), Ok(Value::Bool(true)));
        assert_eq!(call("EQUAL_TO", vec!["a".into(), "b".into()]), Ok(Value::Bool(false)));
        assert_eq!(call("EQUAL_TO", vec![Value::Int(0), "0".into()]), Ok(Value::Bool(true)));
        assert_eq!(call("EQUAL_TO", vec!["0".into(), Value::Int(0)]), Ok(Value::Bool(true)));
        assert_eq!(
            call("EQUAL_TO", vec![Value::Bool(true), "true".into()]),
            Err(OperatorError::Type { index: 0, actual: "bool" })
        );
    }

    #[test]
    fn test_greater_than() {
        assert_eq!(call("GREATER_THAN", vec![Value::Int(7), "6".into()]), Ok(Value::Bool(true)));
        assert_eq!(call("GREATER_THAN", vec![Value::Int(6), "6".into()]), Ok(Value::Bool(false)));
        assert_eq!(call("GREATER_THAN", vec!["10".into(), "9".into()]), Ok(Value::Bool(true)));
        assert!(matches!(
            call("GREATER_THAN", vec!["ten".into(), "9".into()]),
            Err(OperatorError::NotNumeric { index: 0, .. })
        ));
        // Surrounding whitespace is not an integer
        assert!(matches!(
            call("GREATER_THAN", vec![Value::Int(7), " 6".into()]),
            Err(OperatorError::NotNumeric { index: 1, .. })
        ));
        assert_eq!(
            call("GREATER_THAN", vec![Value::Int(1)]),
            Err(OperatorError::Arity { expected: 2, actual: 1 })
        );
    }

    #[test]
    fn test_logical() {
        assert_eq!(call("OR", vec![false.into(), true.into()]), Ok(Value::Bool(true)));
        assert_eq!(call("OR", vec![false.into(), false.into()]), Ok(Value::Bool(false)));
        assert_eq!(call("AND", vec![true.into(), true.into()]), Ok(Value::Bool(true)));
        assert_eq!(call("AND", vec![true.into(), false.into()]), Ok(Value::Bool(false)));
        assert_eq!(
            call("AND", vec![true.into(), "true".into()]),
            Err(OperatorError::Type { index: 1, actual: "string" })
        );
    }

    #[test]
    fn test_regex_match() {
        let pattern = Value::from(r"^\d{3}-\d{3}-\d{4}$");
        assert_eq!(
            call("REGEX_MATCH", vec![pattern.clone(), "424-288-2000".into()]),
            Ok(Value::Bool(true))
        );
        assert_eq!(
            call("REGEX_MATCH", vec![pattern, "42R-288-2000".into()]),
            Ok(Value::Bool(false))
        );
        // Unanchored patterns search anywhere in the subject
        assert_eq!(
            call("REGEX_MATCH", vec!["[0-9]".into(), "abc1".into()]),
            Ok(Value::Bool(true))
        );
        assert!(matches!(
            call("REGEX_MATCH", vec!["(".into(), "x".into()]),
            Err(OperatorError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn test_pattern_cache_reuse() {
        let cache = PatternCache::default();
        cache.get_or_compile("^a+$").unwrap();
        cache.get_or_compile("^a+$").unwrap();
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_pattern_cache_is_bounded() {
        let registry = OperatorRegistry::with_builtins();
        let regex_match = registry.resolve("REGEX_MATCH").unwrap();

        for i in 0..(PATTERN_CACHE_CAPACITY * 4) {
            let pattern = Value::Str(format!("user-{}", i));
            let subject = Value::Str(format!("user-{}", i));
            assert_eq!(regex_match(&[pattern, subject]), Ok(Value::Bool(true)));
        }

        assert_eq!(registry.cached_patterns(), PATTERN_CACHE_CAPACITY);
    }

    #[test]
    fn test_resolve_for_precompiles_literal_pattern() {
        let registry = OperatorRegistry::with_builtins();
        let zip_code = registry.resolve_for("REGEX_MATCH", Some(r"^\d{5}$")).unwrap();

        let pattern = Value::from(r"^\d{5}$");
        assert_eq!(zip_code(&[pattern.clone(), "90067".into()]), Ok(Value::Bool(true)));
        assert_eq!(zip_code(&[pattern.clone(), "9o067".into()]), Ok(Value::Bool(false)));
        assert_eq!(
            zip_code(&[pattern, Value::Int(90067)]),
            Err(OperatorError::Type { index: 1, actual: "int" })
        );
        assert_eq!(registry.cached_patterns(), 0);

        // An invalid literal still fails at evaluation time
        let broken = registry.resolve_for("REGEX_MATCH", Some("(")).unwrap();
        assert!(matches!(
            broken(&["(".into(), "x".into()]),
            Err(OperatorError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn test_resolve_for_respects_overrides() {
        let mut registry = OperatorRegistry::with_builtins();
        registry.register("REGEX_MATCH", Arc::new(|_: &[Value]| Ok(Value::Bool(false))));

        let overridden = registry.resolve_for("REGEX_MATCH", Some("^a$")).unwrap();
        assert_eq!(overridden(&["^a$".into(), "a".into()]), Ok(Value::Bool(false)));

        let length = registry.resolve_for("LENGTH", Some("abc")).unwrap();
        assert_eq!(length(&["abc".into()]), Ok(Value::Int(3)));
        assert!(registry.resolve_for("NOPE", None).is_none());
    }

    #[test]
    fn test_custom_operator() {
        let mut registry = OperatorRegistry::with_builtins();
        registry.register(
            "NOT",
            Arc::new(|args: &[Value]| {
                expect_arity(args, 1)?;
                Ok(Value::Bool(!expect_bool(args, 0)?))
            }),
        );

        let not = registry.resolve("NOT").unwrap();
        assert_eq!(not(&[Value::Bool(true)]), Ok(Value::Bool(false)));
    }
}
