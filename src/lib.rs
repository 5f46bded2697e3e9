//! Observable state models behind the new tab page.
//!
//! A [`store::Store`] holds one immutable snapshot and notifies listeners on
//! every update. Three models (new tab, search, top sites) each wrap a store
//! and an injected host handler from [`host`]; views read them through a
//! [`binding::ModelBinding`].

pub mod binding;
pub mod config;
pub mod debounce;
pub mod host;
pub mod models;
pub mod store;
