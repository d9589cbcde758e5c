//! Storage core for wobble_tracker.
//! Owns the cat data model, schema migrations and the SQLite storage handle.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;

pub use config::{AppEnv, DbConfig, StorageLocation};
pub use db::migrations::{MigrationError, MigrationReport};
pub use db::{initialize, ConnectionError, Database, StorageError};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::cat::{
    Cat, CatFilter, CatId, CatValidationError, CreateCatRequest, ListCatsRequest, UpdateCatRequest,
};
pub use repo::cat_repo::{
    CatRepository, RepoError, RepoResult, Repositories, SqliteCatRepository,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
