//! Fixed-width rendering of result rows.

/// Minimum width of every field
pub const FIELD_WIDTH: usize = 10;

/// Render one header or data row: each field left-justified to
/// [`FIELD_WIDTH`] and followed by a space, the whole row parenthesized.
pub fn format_row<S: AsRef<str>>(fields: &[S]) -> String {
    let mut line = String::with_capacity(2 + fields.len() * (FIELD_WIDTH + 1));
    line.push('(');
    for field in fields {
        line.push_str(&format!("{:<width$} ", field.as_ref(), width = FIELD_WIDTH));
    }
    line.push(')');
    line
}
