//! Pluggable rendering of parameterized log lines.
//!
//! The decoder never substitutes arguments into format text. Rendering goes
//! through a [`Formatter`] supplied by the caller, which receives the stored
//! format text and the decoded arguments in order.

use super::Value;

/// Turns format text plus arguments into display text.
///
/// Any `Fn(&str, &[Value]) -> String` closure is a formatter:
///
/// ```
/// use p7d_core::{Formatter, Value};
///
/// let collapse = |text: &str, _values: &[Value]| text.replace("%llx", "%x");
/// assert_eq!(collapse.format("at %llx", &[]), "at %x");
/// ```
pub trait Formatter {
    /// Render `text` with `values`
    fn format(&self, text: &str, values: &[Value]) -> String;
}

impl<F> Formatter for F
where
    F: Fn(&str, &[Value]) -> String,
{
    fn format(&self, text: &str, values: &[Value]) -> String {
        self(text, values)
    }
}

/// Returns the format text unchanged
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityFormatter;

impl Formatter for IdentityFormatter {
    fn format(&self, text: &str, _values: &[Value]) -> String {
        text.to_string()
    }
}

/// Appends the arguments after the format text, space separated
#[derive(Debug, Clone, Copy, Default)]
pub struct AppendArgsFormatter;

impl Formatter for AppendArgsFormatter {
    fn format(&self, text: &str, values: &[Value]) -> String {
        if values.is_empty() {
            return text.to_string();
        }
        let args: Vec<String> = values.iter().map(Value::to_string).collect();
        format!("{} [{}]", text, args.join(", "))
    }
}
