//! SQL `LIKE` pattern conversion.

/// Converts a `LIKE` pattern into an anchored regular expression.
///
/// `%` matches any sequence and `_` any single character. A backslash
/// escapes the following character, so `\%`, `\_` and `\\` are literals.
/// Every literal is regex-escaped. A trailing lone backslash is a literal
/// backslash.
pub fn like_to_regex(pattern: &str) -> String {
    let mut regex = String::with_capacity(pattern.len() + 2);
    let mut literal = String::new();
    regex.push('^');

    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => literal.push(chars.next().unwrap_or('\\')),
            '%' => {
                flush(&mut regex, &mut literal);
                regex.push_str(".*");
            }
            '_' => {
                flush(&mut regex, &mut literal);
                regex.push('.');
            }
            other => literal.push(other),
        }
    }
    flush(&mut regex, &mut literal);

    regex.push('$');
    regex
}

fn flush(regex: &mut String, literal: &mut String) {
    if !literal.is_empty() {
        regex.push_str(&regex::escape(literal));
        literal.clear();
    }
}
