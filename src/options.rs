use std::fmt;

use crate::config::default::is_allowed_element;
use crate::policy::{resolve_default_attribute, AttributeDecision, Policy};

type Predicate = Box<dyn Fn(&str) -> bool + Send + Sync>;
type LinkRel = Box<dyn Fn(&str) -> Option<Vec<String>> + Send + Sync>;
type AttributeResolver = Box<dyn Fn(&str, &str, &str) -> AttributeDecision + Send + Sync>;

/// Caller-supplied overrides for the default policy.
///
/// A missing `allow_element_id`/`allow_class_name` predicate means ids/classes are always
/// stripped. Callbacks run inline for every element and attribute, so they should be cheap and
/// free of side effects. A callback that panics aborts the whole sanitize call.
///
/// ```
/// use scrubber::{sanitize, Options};
///
/// let options = Options::new()
///     .allow_class_name(|class| class.starts_with("md-"))
///     .add_link_rel(|_| Some(vec!["nofollow".to_string()]));
/// let html = sanitize(r#"<a class="md-link x" href="/a" onclick="x()">a</a>"#, &options).unwrap();
/// assert_eq!(html, r#"<a class="md-link" href="/a" rel="nofollow">a</a>"#);
/// ```
pub struct Options {
    allow_element_id: Option<Predicate>,
    allow_class_name: Option<Predicate>,
    add_link_rel: Option<LinkRel>,
    allow_tag: Option<Predicate>,
    allow_attribute: Option<AttributeResolver>,
    remove_content_tag: Option<Predicate>,
    remove_contents: bool,
}

impl Options {
    pub fn new() -> Self {
        Options {
            allow_element_id: None,
            allow_class_name: None,
            add_link_rel: None,
            allow_tag: None,
            allow_attribute: None,
            remove_content_tag: None,
            remove_contents: true,
        }
    }

    /// Keeps `id` attributes whose value `f` accepts.
    pub fn allow_element_id<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.allow_element_id = Some(Box::new(f));
        self
    }

    /// Keeps the `class` tokens `f` accepts.
    pub fn allow_class_name<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.allow_class_name = Some(Box::new(f));
        self
    }

    /// Sets `rel` on anchors from their `href`. Ignored when [`Options::allow_tag`] is set.
    pub fn add_link_rel<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) -> Option<Vec<String>> + Send + Sync + 'static,
    {
        self.add_link_rel = Some(Box::new(f));
        self
    }

    /// Replaces the default element allow-list. `f` receives upper-cased tag names.
    pub fn allow_tag<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.allow_tag = Some(Box::new(f));
        self
    }

    /// Replaces every built-in attribute rule, including `id`/`class` handling.
    ///
    /// `f` receives the upper-cased tag, the lower-cased attribute name and the value.
    pub fn allow_attribute<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, &str, &str) -> AttributeDecision + Send + Sync + 'static,
    {
        self.allow_attribute = Some(Box::new(f));
        self
    }

    /// Rejected tags for which `f` returns `true` lose their contents even when
    /// `remove_contents` is off.
    pub fn remove_content_tag<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.remove_content_tag = Some(Box::new(f));
        self
    }

    /// Whether rejected elements are dropped with their contents (the default) or replaced by
    /// their children.
    pub fn remove_contents(mut self, remove_contents: bool) -> Self {
        self.remove_contents = remove_contents;
        self
    }
}

impl Default for Options {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("allow_element_id", &self.allow_element_id.is_some())
            .field("allow_class_name", &self.allow_class_name.is_some())
            .field("add_link_rel", &self.add_link_rel.is_some())
            .field("allow_tag", &self.allow_tag.is_some())
            .field("allow_attribute", &self.allow_attribute.is_some())
            .field("remove_content_tag", &self.remove_content_tag.is_some())
            .field("remove_contents", &self.remove_contents)
            .finish()
    }
}

impl Policy for Options {
    fn is_tag_allowed(&self, tag: &str) -> bool {
        match self.allow_tag {
            Some(ref allow_tag) => allow_tag(tag),
            None => is_allowed_element(tag),
        }
    }

    fn resolve_attribute(&self, tag: &str, name: &str, value: &str) -> AttributeDecision {
        match self.allow_attribute {
            Some(ref allow_attribute) => allow_attribute(tag, name, value),
            None => resolve_default_attribute(self, tag, name, value),
        }
    }

    fn is_id_allowed(&self, id: &str) -> bool {
        self.allow_element_id
            .as_ref()
            .map_or(false, |allow_element_id| allow_element_id(id))
    }

    fn is_class_allowed(&self, class_name: &str) -> bool {
        self.allow_class_name
            .as_ref()
            .map_or(false, |allow_class_name| allow_class_name(class_name))
    }

    // Anchor rel injection belongs to the default tag policy, so a custom tag allow-list
    // turns it off.
    fn link_rel(&self, tag: &str, href: &str) -> Option<Vec<String>> {
        if self.allow_tag.is_some() || !tag.eq_ignore_ascii_case("A") {
            return None;
        }
        self.add_link_rel
            .as_ref()
            .and_then(|add_link_rel| add_link_rel(href))
            .filter(|rels| !rels.is_empty())
    }

    fn removes_contents_of(&self, tag: &str) -> bool {
        self.remove_contents
            || self
                .remove_content_tag
                .as_ref()
                .map_or(false, |remove_content_tag| remove_content_tag(tag))
    }
}
