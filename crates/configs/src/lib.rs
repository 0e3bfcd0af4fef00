//! Shared configuration deserialization helpers used by the `aggregator`
//! binary's TOML/env configuration layer.

pub(crate) mod deserialize_env;

mod database;

pub use database::DatabasePoolConfig;
