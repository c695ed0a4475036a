//! Column filters and their translation into backend queries.
//!
//! A [`FilterPredicate`] both selects a column for the result set and,
//! when it carries a comparator, restricts which rows are returned. Every
//! driver implements [`PredicateTranslator`] to turn a filter list into its
//! native query form, or to hand the predicates back for in-memory
//! evaluation after the fetch.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use super::row::ResultSet;
use crate::error::{Error, Result};

/// Comparison operators understood by every backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Comparator {
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Le,
}

impl Comparator {
    /// Two-character symbols come first so `>=` is never read as `>`.
    const SYMBOLS: [(&'static str, Comparator); 6] = [
        ("==", Comparator::Eq),
        ("!=", Comparator::Ne),
        (">=", Comparator::Ge),
        ("<=", Comparator::Le),
        (">", Comparator::Gt),
        ("<", Comparator::Lt),
    ];

    /// Symbol form, as written in filter expressions
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Lt => "<",
            Self::Le => "<=",
        }
    }

    /// Parse a symbol. The empty string is not a comparator; see
    /// [`FilterPredicate::from_parts`].
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        Self::SYMBOLS
            .iter()
            .find(|(s, _)| *s == symbol)
            .map(|(_, c)| *c)
    }

    /// Whether this comparator orders values rather than testing equality
    pub fn is_ordering(&self) -> bool {
        !matches!(self, Self::Eq | Self::Ne)
    }

    /// Compare a stored value against a comparand.
    ///
    /// Equality compares the text directly. Ordering compares numerically when
    /// both sides parse as numbers, and byte-wise as text otherwise.
    pub fn evaluate(&self, stored: &str, comparand: &str) -> bool {
        let ordering = match self {
            Self::Eq => return stored == comparand,
            Self::Ne => return stored != comparand,
            _ => match (parse_number(stored), parse_number(comparand)) {
                (Some(a), Some(b)) => match a.partial_cmp(&b) {
                    Some(ord) => ord,
                    None => return false,
                },
                _ => stored.cmp(comparand),
            },
        };

        match self {
            Self::Gt => ordering == Ordering::Greater,
            Self::Ge => ordering != Ordering::Less,
            Self::Lt => ordering == Ordering::Less,
            Self::Le => ordering != Ordering::Greater,
            Self::Eq | Self::Ne => unreachable!("handled above"),
        }
    }
}

impl std::fmt::Display for Comparator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parse text as a finite number.
pub fn parse_number(text: &str) -> Option<f64> {
    text.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// A column selection with an optional condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterPredicate {
    /// Column to select (and test, if a comparator is present)
    pub column: String,
    /// `None` selects the column without restricting rows
    pub comparator: Option<Comparator>,
    /// Value to compare against, carried as text
    pub comparand: String,
}

impl FilterPredicate {
    /// Select a column with no condition
    pub fn column(name: impl Into<String>) -> Self {
        Self {
            column: name.into(),
            comparator: None,
            comparand: String::new(),
        }
    }

    /// Select a column and keep only rows where `column comparator comparand` holds
    pub fn new(column: impl Into<String>, comparator: Comparator, comparand: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            comparator: Some(comparator),
            comparand: comparand.into(),
        }
    }

    /// Build from the three textual parts; an empty comparator selects only.
    pub fn from_parts(column: &str, comparator: &str, comparand: &str) -> Result<Self> {
        if column.is_empty() {
            return Err(Error::InvalidPredicate(format!("{}{}{}", column, comparator, comparand)));
        }
        if comparator.is_empty() {
            return Ok(Self::column(column));
        }
        let op = Comparator::from_symbol(comparator)
            .ok_or_else(|| Error::InvalidPredicate(comparator.to_string()))?;
        Ok(Self::new(column, op, comparand))
    }

    /// Whether this predicate restricts rows
    pub fn is_active(&self) -> bool {
        self.comparator.is_some()
    }

    /// Test a cell. Inactive predicates accept everything; a missing cell
    /// never satisfies an active one.
    pub fn matches(&self, value: Option<&str>) -> bool {
        match (self.comparator, value) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some(op), Some(v)) => op.evaluate(v, &self.comparand),
        }
    }
}

impl std::str::FromStr for FilterPredicate {
    type Err = Error;

    /// Parse `column`, `column==value`, `price >= 60` and the like.
    fn from_str(s: &str) -> Result<Self> {
        let found = s.char_indices().find_map(|(idx, _)| {
            Comparator::SYMBOLS
                .iter()
                .find(|(sym, _)| s[idx..].starts_with(sym))
                .map(|(sym, op)| (idx, sym.len(), *op))
        });

        match found {
            Some((idx, len, op)) => {
                let column = s[..idx].trim();
                if column.is_empty() {
                    return Err(Error::InvalidPredicate(s.to_string()));
                }
                Ok(Self::new(column, op, s[idx + len..].trim()))
            }
            None => {
                let column = s.trim();
                if column.is_empty() || column.contains('=') {
                    return Err(Error::InvalidPredicate(s.to_string()));
                }
                Ok(Self::column(column))
            }
        }
    }
}

impl std::fmt::Display for FilterPredicate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.comparator {
            Some(op) => write!(f, "{} {} {:?}", self.column, op, self.comparand),
            None => write!(f, "{}", self.column),
        }
    }
}

/// Column names selected by a filter list, in order.
pub fn selected_columns(filters: &[FilterPredicate]) -> Vec<String> {
    filters.iter().map(|f| f.column.clone()).collect()
}

/// How a backend will apply a filter list.
#[derive(Debug, Clone, PartialEq)]
pub enum Translation<F> {
    /// The backend evaluates this native fragment itself.
    Native(F),
    /// The backend cannot filter; apply these predicates after fetching.
    InMemory(Vec<FilterPredicate>),
    /// The fragment covers some predicates; the residual ones are checked
    /// on each fetched row before it counts against the limit.
    Split {
        native: F,
        residual: Vec<FilterPredicate>,
    },
}

/// Maps backend-agnostic predicates onto a backend's query mechanism.
pub trait PredicateTranslator {
    /// The native query fragment produced for this backend.
    type Fragment;

    /// Translate the active predicates of `filters`.
    fn translate(&self, filters: &[FilterPredicate]) -> Translation<Self::Fragment>;
}

/// Whether `row`, laid out as `columns`, satisfies every active predicate.
/// A predicate on a column that is not in the layout fails.
pub fn row_matches(
    columns: &[String],
    row: &[Option<String>],
    predicates: &[FilterPredicate],
) -> bool {
    predicates.iter().filter(|p| p.is_active()).all(|predicate| {
        match columns.iter().position(|c| *c == predicate.column) {
            Some(idx) => predicate.matches(row.get(idx).and_then(|c| c.as_deref())),
            None => false,
        }
    })
}

/// Keep only the rows that satisfy every active predicate.
pub fn apply_in_memory(result: &mut ResultSet, predicates: &[FilterPredicate]) {
    let columns = result.columns.clone();
    result
        .rows
        .retain(|row| row_matches(&columns, row, predicates));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_ordering_beats_lexical() {
        // lexically "9" > "10", numerically it is not
        assert!(!Comparator::Gt.evaluate("9", "10"));
        assert!(Comparator::Lt.evaluate("9", "10"));
        assert!(Comparator::Gt.evaluate("63.99", "60"));
        assert!(!Comparator::Gt.evaluate("56.99", "60"));
        assert!(Comparator::Ge.evaluate("60.0", "60"));
        assert!(Comparator::Le.evaluate("-1e2", "0"));
    }

    #[test]
    fn test_text_ordering_when_not_numeric() {
        assert!(Comparator::Gt.evaluate("banana", "apple"));
        assert!(Comparator::Lt.evaluate("Apple", "apple"));
        // mixed: one side is not a number, so compare as text
        assert!(Comparator::Gt.evaluate("abc", "60"));
    }

    #[test]
    fn test_equality_compares_text() {
        assert!(Comparator::Eq.evaluate("John Coltrane", "John Coltrane"));
        assert!(!Comparator::Eq.evaluate("60.0", "60"));
        assert!(Comparator::Ne.evaluate("60.0", "60"));
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number("56.99"), Some(56.99));
        assert_eq!(parse_number("-3"), Some(-3.0));
        assert_eq!(parse_number("inf"), None);
        assert_eq!(parse_number("NaN"), None);
        assert_eq!(parse_number("12abc"), None);
        assert_eq!(parse_number(""), None);
    }

    #[test]
    fn test_predicate_from_str() {
        let p: FilterPredicate = "price>=60".parse().unwrap();
        assert_eq!(p, FilterPredicate::new("price", Comparator::Ge, "60"));

        let p: FilterPredicate = "artist == John Coltrane".parse().unwrap();
        assert_eq!(p, FilterPredicate::new("artist", Comparator::Eq, "John Coltrane"));

        let p: FilterPredicate = "price<5".parse().unwrap();
        assert_eq!(p.comparator, Some(Comparator::Lt));

        let p: FilterPredicate = " title ".parse().unwrap();
        assert_eq!(p, FilterPredicate::column("title"));
        assert!(!p.is_active());

        assert!("==x".parse::<FilterPredicate>().is_err());
        assert!("a=b".parse::<FilterPredicate>().is_err());
        assert!("".parse::<FilterPredicate>().is_err());
    }

    #[test]
    fn test_from_parts() {
        assert_eq!(
            FilterPredicate::from_parts("title", "", "").unwrap(),
            FilterPredicate::column("title")
        );
        assert_eq!(
            FilterPredicate::from_parts("price", ">", "60").unwrap(),
            FilterPredicate::new("price", Comparator::Gt, "60")
        );
        assert!(FilterPredicate::from_parts("price", "~", "60").is_err());
        assert!(FilterPredicate::from_parts("", "==", "60").is_err());
    }

    #[test]
    fn test_missing_cell_fails_active_predicate() {
        let p = FilterPredicate::new("price", Comparator::Lt, "100");
        assert!(!p.matches(None));
        assert!(p.matches(Some("5")));
        assert!(FilterPredicate::column("price").matches(None));
    }

    #[test]
    fn test_apply_in_memory_is_conjunctive() {
        let filters = vec![
            FilterPredicate::column("title"),
            FilterPredicate::new("artist", Comparator::Eq, "John Coltrane"),
            FilterPredicate::new("price", Comparator::Gt, "60"),
        ];
        let mut rs = ResultSet::new(selected_columns(&filters));
        for (title, artist, price) in [
            ("Blue Train", "John Coltrane", "56.99"),
            ("Giant Steps", "John Coltrane", "63.99"),
            ("Jeru", "Gerry Mulligan", "17.99"),
            ("Sarah Vaughan", "Sarah Vaughan", "34.98"),
        ] {
            rs.push_row(vec![
                Some(title.to_string()),
                Some(artist.to_string()),
                Some(price.to_string()),
            ]);
        }
        rs.push_row(vec![None, None, None]);

        apply_in_memory(&mut rs, &filters);

        assert_eq!(rs.len(), 1);
        assert_eq!(rs.get(0, "title"), Some("Giant Steps"));
    }

    #[test]
    fn test_row_matches() {
        let columns = vec!["title".to_string(), "price".to_string()];
        let over_60 = vec![FilterPredicate::new("price", Comparator::Gt, "60")];

        assert!(row_matches(&columns, &[Some("Giant Steps".into()), Some("63.99".into())], &over_60));
        assert!(!row_matches(&columns, &[Some("Blue Train".into()), Some("56.99".into())], &over_60));
        // Out of f64 range: compared as text, "1" sorts before "6".
        assert!(!row_matches(&columns, &[Some("Huge".into()), Some("1e400".into())], &over_60));
        assert!(!row_matches(&columns, &[Some("Tiny".into()), Some("1e-400".into())], &over_60));

        let unknown = vec![FilterPredicate::new("label", Comparator::Eq, "Blue Note")];
        assert!(!row_matches(&columns, &[None, None], &unknown));
        assert!(row_matches(&columns, &[None, None], &[FilterPredicate::column("title")]));
    }

    #[test]
    fn test_predicate_display() {
        assert_eq!(
            FilterPredicate::new("artist", Comparator::Eq, "Jeru").to_string(),
            "artist == \"Jeru\""
        );
        assert_eq!(FilterPredicate::column("title").to_string(), "title");
    }
}
