//! Built-in test programs
//!
//! Demo modules available to every worker started from the CLI.
//!
//! ## Modules
//!
//! - `good.mod`: Good, Hello, Echo
//! - `bad.mod`: Bad, Twice, Panicky
//! - `util.mod`: Sleepy, Stall

mod basic;

pub use basic::{Bad, Echo, Good, Hello, Panicky, Sleepy, Stall, Twice};

use crate::registry::{Module, ModuleCatalog};

/// Catalog with every built-in module
pub fn builtin_catalog() -> ModuleCatalog {
    ModuleCatalog::new()
        .with_module(
            Module::new("good.mod")
                .export("Good", || Box::new(Good))
                .export("Hello", || Box::new(Hello))
                .export("Echo", || Box::new(Echo)),
        )
        .with_module(
            Module::new("bad.mod")
                .export("Bad", || Box::new(Bad))
                .export("Twice", || Box::new(Twice))
                .export("Panicky", || Box::new(Panicky)),
        )
        .with_module(
            Module::new("util.mod")
                .export("Sleepy", || Box::new(Sleepy))
                .export("Stall", || Box::new(Stall)),
        )
}
