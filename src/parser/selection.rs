//! Parsing of numbered selections typed at interactive prompts.

use tracing::trace;

use super::error::SelectionError;

/// Parses a 1-based selection: a single number, a list separated by
/// whitespace or commas, or an inclusive `start-end` range.
///
/// Order is preserved and duplicates are kept so that the caller sees exactly
/// what was typed. Bounds are not checked here; the list being selected from
/// reports out-of-range indices itself.
///
/// # Errors
///
/// Returns [`SelectionError`] for empty input, non-numeric tokens, zero, or
/// reversed ranges.
///
/// # Examples
///
/// ```
/// use tunefetch_core::parser::parse_selection;
///
/// assert_eq!(parse_selection("3").unwrap(), vec![3]);
/// assert_eq!(parse_selection("1 4, 5").unwrap(), vec![1, 4, 5]);
/// assert_eq!(parse_selection("4-6").unwrap(), vec![4, 5, 6]);
/// ```
pub fn parse_selection(input: &str) -> Result<Vec<usize>, SelectionError> {
    let tokens: Vec<&str> = input
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|token| !token.is_empty())
        .collect();
    if tokens.is_empty() {
        return Err(SelectionError::Empty);
    }

    let mut indices = Vec::new();
    for token in tokens {
        if let Some((start, end)) = token.split_once('-') {
            let start = parse_index(start, token)?;
            let end = parse_index(end, token)?;
            if end < start {
                return Err(SelectionError::ReversedRange { start, end });
            }
            indices.extend(start..=end);
        } else {
            indices.push(parse_index(token, token)?);
        }
    }
    trace!(count = indices.len(), "parsed selection");
    Ok(indices)
}

fn parse_index(value: &str, token: &str) -> Result<usize, SelectionError> {
    match value.trim().parse::<usize>() {
        Ok(0) | Err(_) => Err(SelectionError::malformed(token)),
        Ok(index) => Ok(index),
    }
}
