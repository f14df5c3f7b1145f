use crate::Result;
use std::future::Future;

pub fn separated_by<T, F>(
    out: &mut String,
    values: impl IntoIterator<Item = T>,
    mut f: F,
    separator: &str,
) where
    F: FnMut(&mut String, T),
{
    let mut first = true;
    for v in values {
        if !first {
            out.push_str(separator);
        }
        first = false;
        f(out, v);
    }
}

/// Run a cleanup step whose failure must not reach the caller.
///
/// The error is logged and dropped, the returned flag tells whether the step succeeded.
pub async fn best_effort(what: &str, cleanup: impl Future<Output = Result<()>>) -> bool {
    match cleanup.await {
        Ok(()) => true,
        Err(e) => {
            log::warn!("Ignoring failure while {}: {:#}", what, e);
            false
        }
    }
}

/// Longest prefix of `value` not exceeding `max` bytes, cut on a char boundary.
pub fn truncate_head(value: &str, max: usize) -> &str {
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
    ($query:expr) => {{
        let query: &str = &$query;
        let head = $crate::truncate_head(query, 497);
        format!(
            "{}{}",
            head.trim_end(),
            if head.len() < query.len() { "..." } else { "" }
        )
    }};
}
