//! Render pipeline definitions.

pub mod basic;
