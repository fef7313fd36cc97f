//! Policy-driven sanitizer for untrusted HTML fragments.
//!
//! Markup is parsed with html5ever into an arena, every element and attribute is checked against
//! a [`Policy`], and whatever survives is serialized back out. Elements and attributes that are
//! not explicitly allowed are removed, so the output is safe to embed in a trusted page.

#![warn(clippy::all)]
#[macro_use]
extern crate lazy_static;
#[macro_use]
extern crate html5ever;
#[macro_use]
extern crate maplit;

mod arena_dom;
pub mod config;
mod error;
mod options;
mod policy;
mod sanitizer;
mod url_check;
mod walker;

pub use error::{Error, Result};
pub use options::Options;
pub use policy::{resolve_default_attribute, AttributeDecision, DefaultPolicy, Policy};
pub use sanitizer::{sanitize, Sanitizer};
pub use url_check::{is_navigational_url, is_resource_url};
