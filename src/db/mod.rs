// src/db/mod.rs
// DOCUMENTATION: Database module organization
// PURPOSE: Re-export data sources, the generic repository layer and the
// entity repositories

pub mod comment_repository;
pub mod crud;
pub mod datasource;
pub mod filter;
pub mod memory;
pub mod photo_repository;
pub mod postgres;
pub mod relation;

pub use comment_repository::*;
pub use datasource::*;
pub use filter::*;
pub use memory::*;
pub use photo_repository::*;
pub use postgres::*;
