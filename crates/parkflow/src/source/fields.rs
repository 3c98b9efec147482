//! Comma splitting for a single CSV line.
//!
//! A double quote toggles the in-quotes state and is not copied into the
//! field; commas inside quotes are kept as literal text. This accepts the
//! quoting the transaction exports use. It is not a full RFC 4180
//! parser: quoted newlines are not supported.

/// Split one line into its raw (untrimmed) fields.
///
/// An empty line yields a single empty field.
pub fn split_fields(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for ch in line.chars() {
        match ch {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => fields.push(std::mem::take(&mut current)),
            _ => current.push(ch),
        }
    }
    fields.push(current);

    fields
}
