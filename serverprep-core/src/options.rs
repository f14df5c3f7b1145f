use crate::{Error, Result, truncate_long};
use anyhow::Context;
use url::Url;

/// Protocol session settings the statement engine reads but does not own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    /// Pipeline the commands of a batch without waiting for each answer.
    pub use_batch_multi_send: bool,
    /// Send a batch as one bulk command when the server supports it.
    pub use_bulk_stmts: bool,
    /// Keep executing the rows of a batch after one failed.
    pub continue_batch_on_error: bool,
    /// Append the query to error messages.
    pub dump_queries_on_exception: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            use_batch_multi_send: false,
            use_bulk_stmts: false,
            continue_batch_on_error: true,
            dump_queries_on_exception: false,
        }
    }
}

impl SessionOptions {
    /// Read the options from the query string of a connection url, for example
    /// `mariadb://localhost:3306/db?useBulkStmts=true&continueBatchOnError=false`.
    ///
    /// Keys other than the ones known here are left to other layers.
    pub fn from_url(url: &str) -> Result<Self> {
        let context = || format!("While reading the options of `{}`", truncate_long!(url));
        let url = Url::parse(url).with_context(context)?;
        Self::from_pairs(url.query_pairs()).with_context(context)
    }

    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Result<Self>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut options = Self::default();
        for (key, value) in pairs {
            let (key, value) = (key.as_ref(), value.as_ref());
            let target = match key {
                "useBatchMultiSend" => &mut options.use_batch_multi_send,
                "useBulkStmts" => &mut options.use_bulk_stmts,
                "continueBatchOnError" => &mut options.continue_batch_on_error,
                "dumpQueriesOnException" => &mut options.dump_queries_on_exception,
                _ => {
                    log::debug!("Option `{}` is not a statement option, skipping", key);
                    continue;
                }
            };
            *target = parse_bool(value).with_context(|| format!("Invalid value for `{key}`"))?;
        }
        Ok(options)
    }

    /// Whether a batch may be sent in a single round trip.
    pub fn supports_batch_fast_path(&self) -> bool {
        self.use_batch_multi_send || self.use_bulk_stmts
    }
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(Error::msg(format!("`{value}` is not a boolean"))),
    }
}
