pub mod domain;
pub mod entity;
pub mod error;
pub mod protocol;
pub mod record;
pub mod store;
