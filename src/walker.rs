use std::collections::HashSet;
use std::ptr;

use html5ever::tendril::StrTendril;
use tracing::{debug, trace};

use crate::arena_dom::{create_element, Arena, Node, NodeData, Ref};
use crate::policy::{class_tokens, AttributeDecision, Policy};

/// Holds children spliced directly under the fragment root when there is more than one.
const ROOT_SPLICE_WRAPPER: &str = "span";

/// Applies a [`Policy`] to a parsed fragment, mutating it in place.
pub struct Walker<'p> {
    policy: &'p dyn Policy,
}

impl<'p> Walker<'p> {
    pub fn new(policy: &'p dyn Policy) -> Walker<'p> {
        Walker { policy }
    }

    /// Visits every descendant of `root`; `root` itself is never checked.
    ///
    /// Nodes are taken off an explicit stack. A node's children are snapshotted when it
    /// survives and pushed in document order, so siblings are popped last to first and a
    /// removal or splice never disturbs a sibling still waiting on the stack. Removed subtrees
    /// are never pushed; spliced children are pushed again at their new position.
    ///
    /// Returns whether any element was spliced. Splicing can leave a tree the parser would
    /// never build (an `<a>` directly inside an `<a>`, say), so its serialization may parse
    /// back into a different shape.
    pub fn walk<'arena>(&self, arena: Arena<'arena>, root: Ref<'arena>) -> bool {
        let mut pending = root.children();
        let mut spliced = false;
        while let Some(node) = pending.pop() {
            spliced |= self.visit(arena, root, node, &mut pending);
        }
        spliced
    }

    fn visit<'arena>(
        &self,
        arena: Arena<'arena>,
        root: Ref<'arena>,
        node: Ref<'arena>,
        pending: &mut Vec<Ref<'arena>>,
    ) -> bool {
        let tag = match node.tag_name() {
            Some(tag) => tag,
            None => return false,
        };

        if !self.policy.is_tag_allowed(&tag) {
            return self.remove_element(arena, root, node, &tag, pending);
        }

        self.filter_attributes(node, &tag);
        self.add_link_rel(node, &tag);
        pending.extend(node.children());
        false
    }

    fn remove_element<'arena>(
        &self,
        arena: Arena<'arena>,
        root: Ref<'arena>,
        node: Ref<'arena>,
        tag: &str,
        pending: &mut Vec<Ref<'arena>>,
    ) -> bool {
        if self.policy.removes_contents_of(tag) {
            debug!(%tag, "removing disallowed element and its contents");
            node.detach();
            return false;
        }

        debug!(%tag, "replacing disallowed element with its children");
        let at_root = node
            .parent
            .get()
            .map_or(false, |parent| ptr::eq::<Node>(parent, root));
        let children = node.content_children();
        if at_root && children.len() > 1 {
            let wrapper = create_element(arena, ROOT_SPLICE_WRAPPER);
            node.replace_with(wrapper);
            for &child in children.iter() {
                wrapper.append(child);
            }
        } else {
            node.replace_with_children();
        }
        pending.extend(children);
        true
    }

    fn filter_attributes(&self, node: Ref, tag: &str) {
        let attrs = match node.data {
            NodeData::Element { ref attrs, .. } => attrs,
            _ => return,
        };

        let current = attrs.take();
        let mut kept = Vec::with_capacity(current.len());
        for mut attr in current {
            let name = (&*attr.name.local).to_ascii_lowercase();
            match self.policy.resolve_attribute(tag, &name, &attr.value) {
                AttributeDecision::Unchanged => kept.push(attr),
                AttributeDecision::Remove => {
                    trace!(%tag, attribute = %name, "removing attribute");
                }
                AttributeDecision::Edit(value) => {
                    let value = if name == "class" {
                        reconcile_class_tokens(&attr.value, &value)
                    } else {
                        Some(value)
                    };
                    match value {
                        Some(value) => {
                            trace!(%tag, attribute = %name, %value, "editing attribute");
                            attr.value = StrTendril::from(value);
                            kept.push(attr);
                        }
                        None => {
                            trace!(%tag, attribute = %name, "no class tokens left, removing");
                        }
                    }
                }
            }
        }
        *attrs.borrow_mut() = kept;
    }

    fn add_link_rel(&self, node: Ref, tag: &str) {
        let href = match node.attribute("href") {
            Some(href) => href,
            None => return,
        };
        if let Some(rels) = self.policy.link_rel(tag, &href) {
            if !rels.is_empty() {
                let rel = rels.join(" ");
                trace!(%tag, %rel, "setting link relation");
                node.set_attribute("rel", &rel);
            }
        }
    }
}

/// Narrows the element's current class tokens to those present in `edited`.
///
/// Tokens keep their current order and duplicates collapse, as with `classList.remove`.
/// Returns `None` when nothing is left.
fn reconcile_class_tokens(current: &str, edited: &str) -> Option<String> {
    let edited = class_tokens(edited).collect::<HashSet<_>>();
    let mut seen = HashSet::new();
    let kept = class_tokens(current)
        .filter(|token| edited.contains(token) && seen.insert(*token))
        .collect::<Vec<_>>();
    if kept.is_empty() {
        None
    } else {
        Some(kept.join(" "))
    }
}
