// src/formula/license.rs

//! Recognized license tags

/// SPDX identifiers accepted in `package.license`
pub const RECOGNIZED_LICENSES: &[&str] = &[
    "0BSD",
    "AGPL-3.0-only",
    "AGPL-3.0-or-later",
    "Apache-2.0",
    "BSD-2-Clause",
    "BSD-3-Clause",
    "BSL-1.0",
    "CC0-1.0",
    "GPL-2.0-only",
    "GPL-2.0-or-later",
    "GPL-3.0-only",
    "GPL-3.0-or-later",
    "ISC",
    "LGPL-2.1-only",
    "LGPL-2.1-or-later",
    "LGPL-3.0-only",
    "LGPL-3.0-or-later",
    "MIT",
    "MPL-2.0",
    "Unlicense",
    "Zlib",
];

/// Check a single identifier or an `OR`/`AND` expression of identifiers
///
/// Parentheses are accepted around the whole expression or operands, so
/// `(MIT OR Apache-2.0)` is fine; `WITH` exceptions are not.
pub fn is_recognized(expr: &str) -> bool {
    let cleaned = expr.replace(['(', ')'], " ");
    let mut expect_operand = true;
    let mut saw_operand = false;

    for token in cleaned.split_whitespace() {
        if expect_operand {
            if !RECOGNIZED_LICENSES.contains(&token) {
                return false;
            }
            saw_operand = true;
        } else if token != "OR" && token != "AND" {
            return false;
        }
        expect_operand = !expect_operand;
    }

    // Expression must end on an operand
    saw_operand && !expect_operand
}
