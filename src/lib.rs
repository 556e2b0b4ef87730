mod database {
    pub mod actions;
    pub mod connection;
    pub mod error;
    pub mod filters;
    pub mod form;
    pub mod pagination;
    pub mod schema;
    pub mod shopping_list;
    pub mod validation;
}
mod authentication {
    pub mod cryptography;
    pub mod jwt;
    pub mod middleware;
    pub mod permissions;
}
mod config;
mod constants;
mod images;
mod reply;

pub use authentication::*;
pub use config::*;
pub use constants::*;
pub use database::*;
pub use images::*;
pub use reply::*;
