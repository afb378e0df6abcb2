/// Writes `values` into `out` through `f`, inserting `separator` between the
/// fragments that actually produced output.
pub fn separated_by<T, F>(
    out: &mut String,
    values: impl IntoIterator<Item = T>,
    mut f: F,
    separator: &str,
) where
    F: FnMut(&mut String, T),
{
    let mut len = out.len();
    for v in values {
        if out.len() > len {
            out.push_str(separator);
        }
        len = out.len();
        f(out, v);
    }
}

/// Longest prefix of `text` that fits in `limit` bytes and ends on a char
/// boundary.
pub fn clip(text: &str, mut limit: usize) -> &str {
    if limit >= text.len() {
        return text;
    }
    while !text.is_char_boundary(limit) {
        limit -= 1;
    }
    &text[..limit]
}

/// Caps a statement for log output so multi-megabyte INSERTs do not flood
/// the log sink.
#[macro_export]
macro_rules! truncate_long {
    ($query:expr) => {
        format_args!(
            "{}{}",
            $crate::clip(&$query, 497).trim_end(),
            if $query.len() > 497 { "..." } else { "" },
        )
    };
}
