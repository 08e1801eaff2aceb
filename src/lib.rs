#![allow(async_fn_in_trait)]
pub mod config;
pub mod download_plan;
pub mod error;
pub mod key_prefix;
pub mod object_store;
pub mod product_id;
pub mod provider;
pub mod s3;
pub mod safe;

pub use error::{Error, Result};
pub use object_store::ObjectStore;
pub use product_id::ProductId;
