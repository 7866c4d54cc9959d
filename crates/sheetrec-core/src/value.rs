//! Scalar cell values shared by grids and records

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single cell value
///
/// `Empty` is the blank-cell marker. A `String("")` is treated the same as
/// `Empty` by every check in this crate, since grid backends disagree on
/// which of the two a blank cell reads back as.
///
/// In JSON a value is written bare: numbers, strings, booleans, and `null`
/// for `Empty`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum CellValue {
    /// Integer value
    Integer(i64),
    /// Floating-point value
    Float(f64),
    /// Boolean value
    Bool(bool),
    /// String value
    String(String),
    /// Empty/blank cell
    #[default]
    Empty,
}

impl CellValue {
    /// Type-detect text read from a file
    ///
    /// Surrounding whitespace is dropped. Integers win over floats; infinite
    /// and NaN floats stay text so they never become numeric cells.
    pub fn parse(s: &str) -> Self {
        let text = s.trim();
        if text.is_empty() {
            CellValue::Empty
        } else if let Ok(i) = text.parse::<i64>() {
            CellValue::Integer(i)
        } else if let Some(f) = text.parse::<f64>().ok().filter(|f| f.is_finite()) {
            CellValue::Float(f)
        } else {
            CellValue::String(text.to_string())
        }
    }

    /// Type-detect stored text without changing it
    ///
    /// Text is only retyped when the detected number prints back as exactly
    /// the same text, so `"007"`, `" 7"` and `"1.50"` stay strings.
    pub fn parse_exact(s: &str) -> Self {
        if s.is_empty() {
            return CellValue::Empty;
        }
        match CellValue::parse(s) {
            value @ (CellValue::Integer(_) | CellValue::Float(_)) if value.to_string_value() == s => value,
            _ => CellValue::String(s.to_string()),
        }
    }

    /// Check if the cell is blank
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::String(s) => s.is_empty(),
            _ => false,
        }
    }

    /// Check if the value is the number zero
    pub fn is_zero(&self) -> bool {
        match self {
            CellValue::Integer(i) => *i == 0,
            CellValue::Float(f) => *f == 0.0,
            _ => false,
        }
    }

    /// Whether the value counts as "set"
    ///
    /// Blank cells, `false`, zero and NaN are all unset.
    pub fn is_truthy(&self) -> bool {
        match self {
            CellValue::Integer(i) => *i != 0,
            CellValue::Float(f) => *f != 0.0 && !f.is_nan(),
            CellValue::Bool(b) => *b,
            CellValue::String(s) => !s.is_empty(),
            CellValue::Empty => false,
        }
    }

    /// Convert to the text used for headers and join keys
    ///
    /// Whole floats print without a fractional part, so `12345.0` and
    /// `12345` produce the same text.
    pub fn to_string_value(&self) -> String {
        match self {
            CellValue::Integer(i) => i.to_string(),
            CellValue::Float(f) => f.to_string(),
            CellValue::Bool(b) => b.to_string(),
            CellValue::String(s) => s.clone(),
            CellValue::Empty => String::new(),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Integer(i) => write!(f, "{}", i),
            CellValue::Float(fl) => write!(f, "{}", fl),
            CellValue::Bool(b) => write!(f, "{}", b),
            CellValue::String(s) => write!(f, "{}", s),
            CellValue::Empty => write!(f, ""),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::String(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::String(s)
    }
}

impl From<i64> for CellValue {
    fn from(i: i64) -> Self {
        CellValue::Integer(i)
    }
}

impl From<i32> for CellValue {
    fn from(i: i32) -> Self {
        CellValue::Integer(i64::from(i))
    }
}

impl From<f64> for CellValue {
    fn from(f: f64) -> Self {
        CellValue::Float(f)
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Bool(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_value_parse_integer() {
        assert_eq!(CellValue::parse("42"), CellValue::Integer(42));
        assert_eq!(CellValue::parse("-123"), CellValue::Integer(-123));
        assert_eq!(CellValue::parse("0"), CellValue::Integer(0));
    }

    #[test]
    fn test_cell_value_parse_float() {
        assert_eq!(CellValue::parse("3.5"), CellValue::Float(3.5));
        assert_eq!(CellValue::parse("-2.5"), CellValue::Float(-2.5));
    }

    #[test]
    fn test_cell_value_parse_string() {
        assert_eq!(CellValue::parse("hello"), CellValue::from("hello"));
        assert_eq!(CellValue::parse("NaN"), CellValue::from("NaN"));
        assert_eq!(CellValue::parse(""), CellValue::Empty);
        assert_eq!(CellValue::parse("   "), CellValue::Empty);
    }

    #[test]
    fn test_parse_exact_keeps_text_that_would_change() {
        assert_eq!(CellValue::parse_exact("42"), CellValue::Integer(42));
        assert_eq!(CellValue::parse_exact("-2.5"), CellValue::Float(-2.5));
        assert_eq!(CellValue::parse_exact("007"), CellValue::from("007"));
        assert_eq!(CellValue::parse_exact(" 7"), CellValue::from(" 7"));
        assert_eq!(CellValue::parse_exact("1.50"), CellValue::from("1.50"));
        assert_eq!(CellValue::parse_exact("   "), CellValue::from("   "));
        assert_eq!(CellValue::parse_exact(""), CellValue::Empty);
    }

    #[test]
    fn test_cell_value_is_empty() {
        assert!(CellValue::Empty.is_empty());
        assert!(CellValue::from("").is_empty());
        assert!(!CellValue::Integer(0).is_empty());
        assert!(!CellValue::Bool(false).is_empty());
    }

    #[test]
    fn test_truthiness() {
        assert!(!CellValue::Integer(0).is_truthy());
        assert!(!CellValue::Float(0.0).is_truthy());
        assert!(!CellValue::Float(f64::NAN).is_truthy());
        assert!(!CellValue::Bool(false).is_truthy());
        assert!(!CellValue::Empty.is_truthy());
        assert!(CellValue::from("0").is_truthy());
        assert!(CellValue::Integer(-1).is_truthy());
    }

    #[test]
    fn test_whole_float_text_matches_integer() {
        assert_eq!(CellValue::Float(12345.0).to_string_value(), "12345");
        assert_eq!(CellValue::Integer(12345).to_string_value(), "12345");
        assert_eq!(CellValue::Float(1.25).to_string_value(), "1.25");
    }

    #[test]
    fn test_json_form_is_untagged() {
        let values: Vec<CellValue> = serde_json::from_str(r#"[1, 2.5, true, "x", null]"#).unwrap();
        assert_eq!(
            values,
            vec![
                CellValue::Integer(1),
                CellValue::Float(2.5),
                CellValue::Bool(true),
                CellValue::from("x"),
                CellValue::Empty,
            ]
        );
        assert_eq!(serde_json::to_string(&CellValue::Empty).unwrap(), "null");
    }
}
