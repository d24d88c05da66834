/// Savepoint name for the given 1-based nesting depth.
pub fn savepoint_name(depth: u64) -> String {
    format!("sp_{}", depth)
}

/// Longest prefix of `value` within `max` bytes that ends on a char boundary.
pub fn truncate_str(value: &str, max: usize) -> &str {
    if value.len() <= max {
        return value;
    }
    let mut end = max;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    &value[..end]
}

#[macro_export]
macro_rules! truncate_long {
    ($query:expr) => {
        format_args!(
            "{}{}",
            $crate::truncate_str(&$query, 497).trim_end(),
            if $query.len() > 497 { "..." } else { "" },
        )
    };
}

/// Logs the error and hands it back, for use in `map_err`.
#[macro_export]
macro_rules! log_error {
    ($error:expr) => {{
        let error = $error;
        log::error!("{:#}", error);
        error
    }};
}
