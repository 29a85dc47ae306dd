//! Builders turning configuration into ready assigners.

pub mod assigner_builder;

pub use assigner_builder::AssignerBuilder;
