//! Command implementations for itest

pub mod list;
pub mod probe;
pub mod run;

pub use list::list;
pub use probe::probe;
pub use run::run;
