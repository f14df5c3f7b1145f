mod as_value;
mod batch;
mod connection;
mod context;
mod error;
mod handle;
mod options;
mod parameter;
mod prepared;
mod results;
mod session;
mod statement;
mod timer;
mod util;
mod value;

pub use ::anyhow::Context;
pub use as_value::*;
pub use batch::*;
pub use connection::*;
pub use context::*;
pub use error::*;
pub use handle::*;
pub use options::*;
pub use parameter::*;
pub use prepared::*;
pub use results::*;
pub use session::*;
pub use statement::*;
pub use timer::*;
pub use util::*;
pub use value::*;
pub use ::futures::future;

pub type Result<T> = anyhow::Result<T>;
pub type Error = anyhow::Error;
