pub mod config;
pub mod dao;
pub mod db;
pub mod error;
pub mod logging;
pub mod model;

pub use dao::SqliteDao;
pub use error::{DaoError, SchemaError};
pub use model::{Document, DocumentKind, Instance, MemoryRegistry, Model, ModelKind, ModelRegistry, Record};
