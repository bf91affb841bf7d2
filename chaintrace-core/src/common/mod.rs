//! Common utilities shared by the model, frontend and walker.

mod path_builder;
mod visibility;
mod warnings;

pub use path_builder::QualifiedNameBuilder;
pub use visibility::Visibility;
pub use warnings::Warnings;
