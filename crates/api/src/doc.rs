//! Documentation module for the batchfetch project.
//!
//! This module contains high-level documentation to explain the project and define terms.

pub mod glossary;
