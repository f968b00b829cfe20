//! SPDX expression parsing and dual-license algebra (C3 + C4).
//!
//! Parses an SPDX-like license expression (`AND`/`OR`/`WITH`, parenthesised)
//! into an AST, then expands that AST to disjunctive normal form over
//! [`DualUnit`] atoms: `DualLicense` is OR-of-groups, AND-within-a-group.
//!
//! The [`spdx`] crate is used only as a cheap validity/classification
//! sanity check (permissive/copyleft family), mirroring the way the teacher
//! wraps it in its license model rather than relying on it for the DNF
//! algebra itself.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::OnceLock;

use crate::error::{LicCompatError, ParseErrorKind, Result};
use crate::scope::Scope;

fn token_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"WITH|AND|OR|\(|\)|[A-Za-z0-9.\-]+").expect("static regex"))
}

fn tokenize(expression: &str) -> Vec<String> {
    token_pattern()
        .find_iter(expression)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// A single license atom: an SPDX id, an optional usage condition it is
/// scoped under, and an ordered list of `WITH` exception ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DualUnit {
    pub spdx_id: String,
    pub condition: Option<String>,
    pub exceptions: Vec<String>,
}

impl DualUnit {
    #[must_use]
    pub fn new(spdx_id: impl Into<String>) -> Self {
        Self {
            spdx_id: spdx_id.into(),
            condition: None,
            exceptions: Vec::new(),
        }
    }

    /// `spdx_id` joined with any `WITH` exceptions, e.g. `GPL-2.0-with-Classpath-exception-2.0`.
    #[must_use]
    pub fn unit_spdx(&self) -> String {
        if self.exceptions.is_empty() {
            self.spdx_id.clone()
        } else {
            format!("{}-with-{}", self.spdx_id, self.exceptions.join("-with-"))
        }
    }

    #[must_use]
    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }
}

/// A parsed AST node: either a single license atom, or a compound expression
/// `term op term op term ...` (left-associative, ops recorded verbatim).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Unit(DualUnit),
    Compound(Vec<ExprPart>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExprPart {
    And,
    Or,
    Term(Expr),
}

struct Parser {
    tokens: Vec<String>,
    current: usize,
}

impl Parser {
    fn peek(&self) -> Option<&str> {
        self.tokens.get(self.current).map(String::as_str)
    }

    fn parse_expression(&mut self) -> Result<Expr> {
        let first = self.parse_term()?;
        let mut parts = vec![ExprPart::Term(first)];

        while let Some(tok) = self.peek() {
            match tok {
                "AND" | "OR" => {
                    let op = tok.to_string();
                    self.current += 1;
                    let term = self.parse_term()?;
                    parts.push(if op == "AND" {
                        ExprPart::And
                    } else {
                        ExprPart::Or
                    });
                    parts.push(ExprPart::Term(term));
                }
                "WITH" => {
                    self.current += 1;
                    let exception = self
                        .peek()
                        .ok_or_else(|| {
                            LicCompatError::parse("SPDX expression", ParseErrorKind::UnexpectedEnd)
                        })?
                        .to_string();
                    self.current += 1;

                    match parts.last_mut() {
                        Some(ExprPart::Term(Expr::Unit(unit))) => {
                            unit.exceptions.push(exception);
                        }
                        _ => {
                            return Err(LicCompatError::parse(
                                "SPDX expression",
                                ParseErrorKind::WithAfterCompound,
                            ));
                        }
                    }
                }
                _ => break,
            }
        }

        if parts.len() == 1 {
            if let ExprPart::Term(expr) = parts.into_iter().next().unwrap() {
                return Ok(expr);
            }
            unreachable!()
        }
        Ok(Expr::Compound(parts))
    }

    fn parse_term(&mut self) -> Result<Expr> {
        match self.peek() {
            None => Err(LicCompatError::parse(
                "SPDX expression",
                ParseErrorKind::UnexpectedEnd,
            )),
            Some("(") => {
                self.current += 1;
                let expr = self.parse_expression()?;
                match self.peek() {
                    Some(")") => {
                        self.current += 1;
                        Ok(expr)
                    }
                    _ => Err(LicCompatError::parse(
                        "SPDX expression",
                        ParseErrorKind::UnclosedParen,
                    )),
                }
            }
            Some(")") => Err(LicCompatError::parse(
                "SPDX expression",
                ParseErrorKind::UnexpectedCloseParen {
                    position: self.current,
                },
            )),
            Some(tok) => {
                let unit = DualUnit::new(tok);
                self.current += 1;
                Ok(Expr::Unit(unit))
            }
        }
    }
}

/// Parse an SPDX-like expression string into an AST.
pub fn parse(expression: &str) -> Result<Expr> {
    let tokens = tokenize(expression);
    let mut parser = Parser { tokens, current: 0 };
    let expr = parser.parse_expression()?;
    if parser.current < parser.tokens.len() {
        return Err(LicCompatError::parse(
            "SPDX expression",
            ParseErrorKind::TrailingTokens(parser.tokens[parser.current..].to_vec()),
        ));
    }
    Ok(expr)
}

/// A group of [`DualUnit`]s ANDed together.
pub type Group = BTreeSet<DualUnit>;

impl Ord for DualUnit {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (&self.spdx_id, &self.condition, &self.exceptions).cmp(&(
            &other.spdx_id,
            &other.condition,
            &other.exceptions,
        ))
    }
}
impl PartialOrd for DualUnit {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Disjunctive normal form over license atoms: OR of groups, AND within a group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DualLicense(BTreeSet<Group>);

impl DualLicense {
    #[must_use]
    pub fn empty() -> Self {
        Self(BTreeSet::new())
    }

    #[must_use]
    pub fn from_groups(groups: impl IntoIterator<Item = Group>) -> Self {
        Self(groups.into_iter().collect())
    }

    #[must_use]
    pub fn single(unit: DualUnit) -> Self {
        Self(BTreeSet::from([BTreeSet::from([unit])]))
    }

    /// Falsy iff there are no groups, or the only group is empty (`{∅}`).
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        !(self.0.is_empty() || (self.0.len() == 1 && self.0.iter().next().unwrap().is_empty()))
    }

    #[must_use]
    pub fn groups(&self) -> impl Iterator<Item = &Group> {
        self.0.iter()
    }

    /// `A ∧ B = { a ∪ b | a∈A, b∈B }`.
    #[must_use]
    pub fn and(&self, other: &Self) -> Self {
        if self.0.is_empty() {
            return other.clone();
        }
        if other.0.is_empty() {
            return self.clone();
        }
        let mut groups = BTreeSet::new();
        for a in &self.0 {
            for b in &other.0 {
                let merged: Group = a.union(b).cloned().collect();
                groups.insert(merged);
            }
        }
        Self(groups)
    }

    /// `A ∨ B = A ∪ B`.
    #[must_use]
    pub fn or(&self, other: &Self) -> Self {
        Self(self.0.union(&other.0).cloned().collect())
    }

    /// Annotate every unit across every group with `condition`.
    #[must_use]
    pub fn add_condition(&self, condition: impl Into<String>) -> Self {
        let condition = condition.into();
        let groups = self
            .0
            .iter()
            .map(|group| {
                group
                    .iter()
                    .cloned()
                    .map(|u| u.with_condition(condition.clone()))
                    .collect()
            })
            .collect();
        Self(groups)
    }
}

/// Expand a parsed AST to disjunctive normal form.
#[must_use]
pub fn expand(expr: &Expr) -> DualLicense {
    match expr {
        Expr::Unit(unit) => DualLicense::single(unit.clone()),
        Expr::Compound(parts) => {
            let mut result = DualLicense::from_groups([Group::new()]);
            let mut pending_op: Option<&ExprPart> = None;
            for part in parts {
                match part {
                    ExprPart::And | ExprPart::Or => pending_op = Some(part),
                    ExprPart::Term(term) => {
                        let current = expand(term);
                        result = match pending_op {
                            Some(ExprPart::Or) => result.or(&current),
                            _ => result.and(&current),
                        };
                        pending_op = None;
                    }
                }
            }
            result
        }
    }
}

/// Parse and expand in one step.
pub fn parse_to_dnf(expression: &str) -> Result<DualLicense> {
    let ast = parse(expression)?;
    Ok(expand(&ast))
}

/// Cheap SPDX-validity classification, mirroring the teacher's
/// `LicenseExpression` wrapper: used as a sanity check alongside (never in
/// place of) the domain-specific parser above.
pub struct SpdxClassification {
    pub is_valid_spdx: bool,
    pub is_permissive: bool,
    pub is_copyleft: bool,
}

#[must_use]
pub fn classify(spdx_id: &str) -> SpdxClassification {
    match spdx::Expression::parse_mode(spdx_id, spdx::ParseMode::LAX) {
        Ok(expr) => {
            let is_copyleft = expr.requirements().any(|req| {
                matches!(req.req.license, spdx::LicenseItem::Spdx { id, .. } if id.is_copyleft())
            });
            SpdxClassification {
                is_valid_spdx: true,
                is_permissive: !is_copyleft,
                is_copyleft,
            }
        }
        Err(_) => {
            let lowered = spdx_id.to_ascii_lowercase();
            let is_copyleft = ["gpl", "agpl", "mpl", "lgpl", "cddl"]
                .iter()
                .any(|frag| lowered.contains(frag));
            SpdxClassification {
                is_valid_spdx: false,
                is_permissive: !is_copyleft,
                is_copyleft,
            }
        }
    }
}

/// Placeholder scope hook used by [`DualLicense::add_condition`] callers
/// that need a concrete [`Scope`] rather than a bare condition token.
#[must_use]
pub fn condition_scope(condition: &str) -> Scope {
    Scope::single(condition)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenizes_basic_expression() {
        let tokens = tokenize("MIT OR (GPL-2.0-only WITH Classpath-exception-2.0)");
        assert_eq!(
            tokens,
            vec!["MIT", "OR", "(", "GPL-2.0-only", "WITH", "Classpath-exception-2.0", ")"]
        );
    }

    #[test]
    fn single_license_expands_to_one_group_one_unit() {
        let dnf = parse_to_dnf("MIT").unwrap();
        assert_eq!(dnf.groups().count(), 1);
        assert_eq!(dnf.groups().next().unwrap().len(), 1);
    }

    #[test]
    fn or_expands_to_two_groups() {
        let dnf = parse_to_dnf("MIT OR Apache-2.0").unwrap();
        assert_eq!(dnf.groups().count(), 2);
    }

    #[test]
    fn and_expands_to_one_group_two_units() {
        let dnf = parse_to_dnf("MIT AND Apache-2.0").unwrap();
        assert_eq!(dnf.groups().count(), 1);
        assert_eq!(dnf.groups().next().unwrap().len(), 2);
    }

    #[test]
    fn distributes_and_over_or() {
        let dnf = parse_to_dnf("(MIT OR Apache-2.0) AND GPL-2.0-only").unwrap();
        assert_eq!(dnf.groups().count(), 2);
        for group in dnf.groups() {
            assert_eq!(group.len(), 2);
        }
    }

    #[test]
    fn with_attaches_exception_to_preceding_unit() {
        let ast = parse("GPL-2.0-only WITH Classpath-exception-2.0").unwrap();
        match ast {
            Expr::Unit(unit) => {
                assert_eq!(unit.spdx_id, "GPL-2.0-only");
                assert_eq!(unit.exceptions, vec!["Classpath-exception-2.0"]);
                assert_eq!(unit.unit_spdx(), "GPL-2.0-only-with-Classpath-exception-2.0");
            }
            other => panic!("expected a unit, got {other:?}"),
        }
    }

    #[test]
    fn with_after_compound_is_an_error() {
        let err = parse("(MIT OR Apache-2.0) WITH Classpath-exception-2.0").unwrap_err();
        assert!(matches!(
            err,
            LicCompatError::Parse {
                source: ParseErrorKind::WithAfterCompound,
                ..
            }
        ));
    }

    #[test]
    fn unclosed_paren_is_an_error() {
        let err = parse("(MIT OR Apache-2.0").unwrap_err();
        assert!(matches!(
            err,
            LicCompatError::Parse {
                source: ParseErrorKind::UnclosedParen,
                ..
            }
        ));
    }

    #[test]
    fn empty_dual_license_is_falsy() {
        assert!(!DualLicense::empty().is_truthy());
        assert!(!DualLicense::from_groups([Group::new()]).is_truthy());
        assert!(DualLicense::single(DualUnit::new("MIT")).is_truthy());
    }

    #[test]
    fn add_condition_annotates_every_unit() {
        let dnf = parse_to_dnf("MIT OR Apache-2.0").unwrap();
        let conditioned = dnf.add_condition("DYNAMIC_LINKING");
        for group in conditioned.groups() {
            for unit in group {
                assert_eq!(unit.condition.as_deref(), Some("DYNAMIC_LINKING"));
            }
        }
    }
}
