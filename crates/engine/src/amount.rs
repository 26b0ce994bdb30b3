use tally_core::DecimalSeparator;

/// Parse a raw amount cell under the file's decimal-separator convention.
/// Missing or unparseable input yields 0.0; this parser never fails.
///
/// With a comma separator only the FIRST comma becomes a dot. A
/// thousands-grouped value like "1.234,56" therefore cleans to "1.234.56"
/// and falls back to 0.0. Deliberate: guessing grouping intent would be
/// worse than a visible zero.
pub fn parse_amount(raw: &str, separator: DecimalSeparator) -> f64 {
    let raw = if raw.is_empty() { "0" } else { raw };

    let normalized = match separator {
        DecimalSeparator::Comma => raw.replacen(',', ".", 1),
        DecimalSeparator::Dot => raw.to_string(),
    };

    let cleaned: String = normalized
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | '-'))
        .collect();

    cleaned.parse().unwrap_or(0.0)
}
