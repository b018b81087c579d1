//! CLI output formatting

use console::Emoji;

// Re-export style
pub use console::style;

// Emojis for output
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "✓ ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "✗ ");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "i ");

/// Format an aggregated validation report for the terminal, one styled
/// line per violation.
pub fn format_validation_errors(errors: &[String]) -> String {
    errors
        .iter()
        .map(|error| format!("  {}", style(error).red()))
        .collect::<Vec<_>>()
        .join("\n")
}
