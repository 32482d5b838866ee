// src/filter/mod.rs

//! Path filtering.
//!
//! This module is responsible for:
//! - Compiling include / exclude glob patterns into a [`GlobFilter`].
//! - The built-in ignore set (editor droppings, `.git` internals).
//! - Ingesting `.gitignore` files into per-directory [`IgnoreLayers`].
//!
//! It does **not** know about watches or processes; it only answers "is this
//! path interesting" and "should this directory be descended into".

pub mod glob;
pub mod ignore;

pub use glob::GlobFilter;
pub use ignore::{read_gitignore, IgnoreLayers, DEFAULT_IGNORES, GITIGNORE_FILE};
