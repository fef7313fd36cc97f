//! Policy hooks consulted by the walker for every element and attribute.
//!
//! Tag names reach a [`Policy`] upper-cased (`"A"`, `"IMG"`) and attribute names lower-cased
//! (`"href"`), whatever case the markup used.

use crate::config::default::{attribute_validator, is_allowed_element, is_global_attribute};

/// What happens to a single attribute.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AttributeDecision {
    Unchanged,
    Edit(String),
    Remove,
}

/// Decides which elements and attributes survive sanitization.
///
/// Every method has a default that matches [`DefaultPolicy`], so an implementation only needs
/// to override what it changes. Overriding a method replaces the built-in behavior for it
/// entirely; nothing is merged.
pub trait Policy {
    /// Whether an element is kept. Rejected elements go through [`Policy::removes_contents_of`].
    fn is_tag_allowed(&self, tag: &str) -> bool {
        is_allowed_element(tag)
    }

    fn resolve_attribute(&self, tag: &str, name: &str, value: &str) -> AttributeDecision {
        resolve_default_attribute(self, tag, name, value)
    }

    /// Whether an `id` value is kept. Denies everything unless overridden.
    fn is_id_allowed(&self, _id: &str) -> bool {
        false
    }

    /// Whether a single `class` token is kept. Denies everything unless overridden.
    fn is_class_allowed(&self, _class_name: &str) -> bool {
        false
    }

    /// `rel` tokens to set on a kept element that still has an `href` after attribute filtering.
    /// `None` or an empty list leaves the element alone.
    fn link_rel(&self, _tag: &str, _href: &str) -> Option<Vec<String>> {
        None
    }

    /// For a rejected element: `true` drops it with everything inside, `false` keeps its
    /// children in its place.
    fn removes_contents_of(&self, _tag: &str) -> bool {
        true
    }
}

/// The static allow-lists with ids, classes and link relations all switched off.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultPolicy;

impl Policy for DefaultPolicy {}

/// The built-in attribute rules, for [`Policy`] implementations that only tweak parts of them.
///
/// `id` is kept when [`Policy::is_id_allowed`] accepts it. `class` is narrowed to the tokens
/// [`Policy::is_class_allowed`] accepts and dropped when none are left. Anything else must be a
/// global attribute or pass the validator registered for it on `tag`.
pub fn resolve_default_attribute<P: Policy + ?Sized>(
    policy: &P,
    tag: &str,
    name: &str,
    value: &str,
) -> AttributeDecision {
    match name.to_ascii_lowercase().as_str() {
        "id" => {
            if policy.is_id_allowed(value) {
                AttributeDecision::Unchanged
            } else {
                AttributeDecision::Remove
            }
        }
        "class" => {
            let kept = class_tokens(value)
                .filter(|token| policy.is_class_allowed(token))
                .collect::<Vec<_>>();
            if kept.is_empty() {
                AttributeDecision::Remove
            } else {
                AttributeDecision::Edit(kept.join(" "))
            }
        }
        name => {
            let valid = is_global_attribute(name)
                || attribute_validator(tag, name).map_or(false, |validate| validate(value));
            if valid {
                AttributeDecision::Unchanged
            } else {
                AttributeDecision::Remove
            }
        }
    }
}

/// Splits a `class` value into tokens on ASCII whitespace, the way `classList` does.
pub(crate) fn class_tokens(value: &str) -> impl Iterator<Item = &str> {
    value
        .split(|c: char| c.is_ascii_whitespace())
        .filter(|token| !token.is_empty())
}
