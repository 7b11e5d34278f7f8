// src/formula/builtin.rs

//! Formulas shipped inside the binary

use crate::error::Result;
use crate::formula::format::PackageFormula;
use crate::formula::parser::parse_formula;

/// `logformat 0.0.1`
pub const LOGFORMAT: &str = include_str!("../../Formula/logformat.toml");

const BUILTIN_SOURCES: &[(&str, &str)] = &[("logformat", LOGFORMAT)];

/// Parse every built-in formula
pub fn builtin_formulas() -> Result<Vec<PackageFormula>> {
    BUILTIN_SOURCES
        .iter()
        .map(|(_, source)| parse_formula(source))
        .collect()
}
