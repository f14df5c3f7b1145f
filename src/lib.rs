//! Server-side prepared statements for drivers speaking the MariaDB/MySQL binary
//! protocol.
//!
//! A driver provides a [`ProtocolSession`] doing the round trips, wraps it in a
//! [`Connection`] and prepares statements on it:
//! ```rust,ignore
//! let connection = Connection::new(session);
//! let mut statement = connection
//!     .prepare_statement("INSERT INTO t (id, name) VALUES (?, ?)")
//!     .await?;
//! statement.bind(1)?.bind("first")?;
//! statement.add_batch()?;
//! statement.bind_index(2, 0)?;
//! statement.add_batch()?;
//! let counts = statement.execute_batch().await?;
//! statement.close().await;
//! ```
pub use ::serverprep_core::*;
