// Majority of this file is from the html5ever project.
// https://github.com/servo/html5ever/blob/45b2fca5c6/html5ever/examples/arena.rs
//
// Copyright 2014-2017 The html5ever Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::borrow::Cow;
use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::io;
use std::ptr;

use html5ever::interface::tree_builder::{ElementFlags, NodeOrText, QuirksMode, TreeSink};
use html5ever::serialize::TraversalScope::{ChildrenOnly, IncludeNode};
use html5ever::serialize::{Serialize, Serializer, TraversalScope};
use html5ever::tendril::{StrTendril, TendrilSink};
use html5ever::{Attribute, ExpandedName, LocalName, QualName};
use tracing::trace;

pub type Arena<'arena> = &'arena typed_arena::Arena<Node<'arena>>;

pub type Ref<'arena> = &'arena Node<'arena>;

pub type Link<'arena> = Cell<Option<Ref<'arena>>>;

/// Allocates a detached, attribute-less HTML element in `arena`.
pub fn create_element<'arena>(arena: Arena<'arena>, name: &str) -> Ref<'arena> {
    arena.alloc(Node::new(NodeData::Element {
        name: QualName::new(None, ns!(html), LocalName::from(name)),
        attrs: RefCell::new(vec![]),
        template_contents: None,
        mathml_annotation_xml_integration_point: false,
    }))
}

/// Parses `markup` as a `<body>` fragment and returns the fragment root.
///
/// html5ever never fails on malformed input; it recovers the way browsers do. The returned node
/// is the synthetic `<html>` element the fragment parser hangs the top-level nodes under, so it
/// should be serialized with [`ChildrenOnly`] scope.
pub fn parse_fragment<'arena>(arena: Arena<'arena>, markup: &str) -> Ref<'arena> {
    let document = html5ever::parse_fragment(
        Sink::new(arena),
        Default::default(),
        QualName::new(None, ns!(html), local_name!("body")),
        vec![],
    )
    .one(markup);
    document.first_child.get().unwrap_or(document)
}

/// Same as [`parse_fragment`] but for raw bytes. Invalid UTF-8 is replaced, not rejected.
pub fn parse_fragment_bytes<'arena>(arena: Arena<'arena>, bytes: &[u8]) -> Ref<'arena> {
    let document = html5ever::parse_fragment(
        Sink::new(arena),
        Default::default(),
        QualName::new(None, ns!(html), local_name!("body")),
        vec![],
    )
    .from_utf8()
    .one(bytes);
    document.first_child.get().unwrap_or(document)
}

pub struct Sink<'arena> {
    pub arena: Arena<'arena>,
    pub document: Ref<'arena>,
    pub quirks_mode: QuirksMode,
}

pub struct Node<'arena> {
    pub parent: Link<'arena>,
    pub next_sibling: Link<'arena>,
    pub previous_sibling: Link<'arena>,
    pub first_child: Link<'arena>,
    pub last_child: Link<'arena>,
    pub data: NodeData<'arena>,
}

pub enum NodeData<'arena> {
    Document,
    Doctype {
        name: StrTendril,
    },
    Text {
        contents: RefCell<StrTendril>,
    },
    Comment {
        contents: StrTendril,
    },
    Element {
        name: QualName,
        attrs: RefCell<Vec<Attribute>>,
        template_contents: Option<Ref<'arena>>,
        mathml_annotation_xml_integration_point: bool,
    },
    ProcessingInstruction {
        target: StrTendril,
        contents: StrTendril,
    },
}

impl<'arena> Node<'arena> {
    pub fn new(data: NodeData<'arena>) -> Self {
        Node {
            parent: Cell::new(None),
            previous_sibling: Cell::new(None),
            next_sibling: Cell::new(None),
            first_child: Cell::new(None),
            last_child: Cell::new(None),
            data,
        }
    }

    /// Canonical (upper-cased) tag name, or `None` for anything that isn't an element.
    pub fn tag_name(&self) -> Option<String> {
        match self.data {
            NodeData::Element { ref name, .. } => Some((&*name.local).to_ascii_uppercase()),
            _ => None,
        }
    }

    /// Value of the attribute whose local name matches `name` case-insensitively.
    pub fn attribute(&self, name: &str) -> Option<String> {
        match self.data {
            NodeData::Element { ref attrs, .. } => attrs
                .borrow()
                .iter()
                .find(|attr| (&*attr.name.local).eq_ignore_ascii_case(name))
                .map(|attr| attr.value.to_string()),
            _ => None,
        }
    }

    /// Sets `name` to `value`, overwriting an existing attribute of the same name in place.
    pub fn set_attribute(&self, name: &str, value: &str) {
        if let NodeData::Element { ref attrs, .. } = self.data {
            let mut attrs = attrs.borrow_mut();
            if let Some(attr) = attrs
                .iter_mut()
                .find(|attr| (&*attr.name.local).eq_ignore_ascii_case(name))
            {
                attr.value = StrTendril::from_slice(value);
            } else {
                attrs.push(Attribute {
                    name: QualName::new(None, ns!(), LocalName::from(name)),
                    value: StrTendril::from_slice(value),
                });
            }
        }
    }

    /// Snapshot of the current child list, in document order.
    pub fn children(&self) -> Vec<Ref<'arena>> {
        let mut children = Vec::new();
        let mut next = self.first_child.get();
        while let Some(child) = next {
            children.push(child);
            next = child.next_sibling.get();
        }
        children
    }

    pub fn detach(&self) {
        let parent = self.parent.take();
        let previous_sibling = self.previous_sibling.take();
        let next_sibling = self.next_sibling.take();

        if let Some(next_sibling) = next_sibling {
            next_sibling.previous_sibling.set(previous_sibling);
        } else if let Some(parent) = parent {
            parent.last_child.set(previous_sibling);
        }

        if let Some(previous_sibling) = previous_sibling {
            previous_sibling.next_sibling.set(next_sibling);
        } else if let Some(parent) = parent {
            parent.first_child.set(next_sibling);
        }
    }

    /// Puts `replacement` at this node's position and detaches this node.
    pub fn replace_with(&'arena self, replacement: &'arena Self) {
        self.insert_before(replacement);
        self.detach();
    }

    /// The nodes a splice of this node hoists: the children of a `<template>`'s content
    /// document, or the plain child list for everything else.
    pub fn content_children(&self) -> Vec<Ref<'arena>> {
        match self.data {
            NodeData::Element {
                template_contents: Some(contents),
                ..
            } => contents.children(),
            _ => self.children(),
        }
    }

    /// Moves this node's [`content_children`](Node::content_children), in order, into its
    /// position and detaches it.
    ///
    /// Returns the moved children so the caller can keep visiting them.
    pub fn replace_with_children(&'arena self) -> Vec<Ref<'arena>> {
        let children = self.content_children();
        for &child in children.iter() {
            self.insert_before(child);
        }
        self.detach();
        children
    }

    pub fn append(&'arena self, new_child: &'arena Self) {
        new_child.detach();
        new_child.parent.set(Some(self));
        if let Some(last_child) = self.last_child.take() {
            new_child.previous_sibling.set(Some(last_child));
            debug_assert!(last_child.next_sibling.get().is_none());
            last_child.next_sibling.set(Some(new_child));
        } else {
            debug_assert!(self.first_child.get().is_none());
            self.first_child.set(Some(new_child));
        }
        self.last_child.set(Some(new_child));
    }

    pub fn insert_before(&'arena self, new_sibling: &'arena Self) {
        new_sibling.detach();
        new_sibling.parent.set(self.parent.get());
        new_sibling.next_sibling.set(Some(self));
        if let Some(previous_sibling) = self.previous_sibling.take() {
            new_sibling.previous_sibling.set(Some(previous_sibling));
            debug_assert!(previous_sibling
                .next_sibling
                .get()
                .map_or(false, |next| ptr::eq::<Node>(next, self)));
            previous_sibling.next_sibling.set(Some(new_sibling));
        } else if let Some(parent) = self.parent.get() {
            debug_assert!(parent
                .first_child
                .get()
                .map_or(false, |first| ptr::eq::<Node>(first, self)));
            parent.first_child.set(Some(new_sibling));
        }
        self.previous_sibling.set(Some(new_sibling));
    }
}

impl<'arena> Sink<'arena> {
    pub fn new(arena: Arena<'arena>) -> Self {
        Sink {
            arena,
            document: arena.alloc(Node::new(NodeData::Document)),
            quirks_mode: QuirksMode::NoQuirks,
        }
    }

    fn new_node(&self, data: NodeData<'arena>) -> Ref<'arena> {
        self.arena.alloc(Node::new(data))
    }

    fn append_common<P, A>(&self, child: NodeOrText<Ref<'arena>>, previous: P, append: A)
    where
        P: FnOnce() -> Option<Ref<'arena>>,
        A: FnOnce(Ref<'arena>),
    {
        let new_node = match child {
            NodeOrText::AppendText(text) => {
                // Append to an existing Text node if we have one.
                if let Some(&Node {
                    data: NodeData::Text { ref contents },
                    ..
                }) = previous()
                {
                    contents.borrow_mut().push_tendril(&text);
                    return;
                }
                self.new_node(NodeData::Text {
                    contents: RefCell::new(text),
                })
            }
            NodeOrText::AppendNode(node) => node,
        };

        append(new_node)
    }
}

impl<'arena> TreeSink for Sink<'arena> {
    type Handle = Ref<'arena>;
    type Output = Ref<'arena>;

    fn finish(self) -> Ref<'arena> {
        self.document
    }

    fn parse_error(&mut self, message: Cow<'static, str>) {
        trace!(%message, "recovered from markup parse error");
    }

    fn get_document(&mut self) -> Ref<'arena> {
        self.document
    }

    fn set_quirks_mode(&mut self, mode: QuirksMode) {
        self.quirks_mode = mode;
    }

    fn same_node(&self, x: &Ref<'arena>, y: &Ref<'arena>) -> bool {
        ptr::eq::<Node>(*x, *y)
    }

    fn elem_name<'a>(&self, target: &'a Ref<'arena>) -> ExpandedName<'a> {
        match target.data {
            NodeData::Element { ref name, .. } => name.expanded(),
            _ => panic!("not an element!"),
        }
    }

    fn get_template_contents(&mut self, target: &Ref<'arena>) -> Ref<'arena> {
        if let NodeData::Element {
            template_contents: Some(ref contents),
            ..
        } = target.data
        {
            contents
        } else {
            panic!("not a template element!")
        }
    }

    fn is_mathml_annotation_xml_integration_point(&self, target: &Ref<'arena>) -> bool {
        if let NodeData::Element {
            mathml_annotation_xml_integration_point,
            ..
        } = target.data
        {
            mathml_annotation_xml_integration_point
        } else {
            panic!("not an element!")
        }
    }

    fn create_element(
        &mut self,
        name: QualName,
        attrs: Vec<Attribute>,
        flags: ElementFlags,
    ) -> Ref<'arena> {
        self.new_node(NodeData::Element {
            name,
            attrs: RefCell::new(attrs),
            template_contents: if flags.template {
                Some(self.new_node(NodeData::Document))
            } else {
                None
            },
            mathml_annotation_xml_integration_point: flags.mathml_annotation_xml_integration_point,
        })
    }

    fn create_comment(&mut self, text: StrTendril) -> Ref<'arena> {
        self.new_node(NodeData::Comment { contents: text })
    }

    fn create_pi(&mut self, target: StrTendril, data: StrTendril) -> Ref<'arena> {
        self.new_node(NodeData::ProcessingInstruction {
            target,
            contents: data,
        })
    }

    fn append(&mut self, parent: &Ref<'arena>, child: NodeOrText<Ref<'arena>>) {
        self.append_common(
            child,
            || parent.last_child.get(),
            |new_node| parent.append(new_node),
        )
    }

    fn append_before_sibling(&mut self, sibling: &Ref<'arena>, child: NodeOrText<Ref<'arena>>) {
        self.append_common(
            child,
            || sibling.previous_sibling.get(),
            |new_node| sibling.insert_before(new_node),
        )
    }

    fn append_based_on_parent_node(
        &mut self,
        element: &Ref<'arena>,
        prev_element: &Ref<'arena>,
        child: NodeOrText<Ref<'arena>>,
    ) {
        if element.parent.get().is_some() {
            self.append_before_sibling(element, child)
        } else {
            self.append(prev_element, child)
        }
    }

    fn append_doctype_to_document(
        &mut self,
        name: StrTendril,
        _public_id: StrTendril,
        _system_id: StrTendril,
    ) {
        self.document.append(self.new_node(NodeData::Doctype { name }))
    }

    fn add_attrs_if_missing(&mut self, target: &Ref<'arena>, attrs: Vec<Attribute>) {
        let mut existing = if let NodeData::Element { ref attrs, .. } = target.data {
            attrs.borrow_mut()
        } else {
            panic!("not an element")
        };

        let existing_names = existing
            .iter()
            .map(|e| e.name.clone())
            .collect::<HashSet<_>>();
        existing.extend(
            attrs
                .into_iter()
                .filter(|attr| !existing_names.contains(&attr.name)),
        );
    }

    fn remove_from_parent(&mut self, target: &Ref<'arena>) {
        target.detach()
    }

    fn reparent_children(&mut self, node: &Ref<'arena>, new_parent: &Ref<'arena>) {
        let mut next_child = node.first_child.get();
        while let Some(child) = next_child {
            next_child = child.next_sibling.get();
            new_parent.append(child)
        }
    }
}

// Implementation adapted from implementation for RcDom:
// https://github.com/servo/html5ever/blob/45b2fca5c6/markup5ever/rcdom.rs#L410
//
// Nodes are written from an explicit stack instead of by recursion, so nesting depth is bounded
// by the heap rather than the call stack.
enum SerializeStep<'a, 'arena> {
    Open(&'a Node<'arena>),
    Close(&'a QualName),
}

fn push_children<'a, 'arena>(stack: &mut Vec<SerializeStep<'a, 'arena>>, node: &'a Node<'arena>) {
    stack.extend(
        node.children()
            .into_iter()
            .rev()
            .map(|child| SerializeStep::Open(child)),
    );
}

impl<'arena> Serialize for Node<'arena> {
    fn serialize<S>(&self, serializer: &mut S, traversal_scope: TraversalScope) -> io::Result<()>
    where
        S: Serializer,
    {
        let mut stack = Vec::new();
        match traversal_scope {
            IncludeNode => stack.push(SerializeStep::Open(self)),
            ChildrenOnly(_) => match self.data {
                NodeData::Element { .. } | NodeData::Document => push_children(&mut stack, self),
                _ => {}
            },
        }

        while let Some(step) = stack.pop() {
            let node = match step {
                SerializeStep::Close(name) => {
                    serializer.end_elem(name.clone())?;
                    continue;
                }
                SerializeStep::Open(node) => node,
            };
            match node.data {
                NodeData::Element {
                    ref name,
                    ref attrs,
                    ..
                } => {
                    {
                        let attrs = attrs.borrow();
                        serializer.start_elem(
                            name.clone(),
                            attrs.iter().map(|at| (&at.name, &at.value[..])),
                        )?;
                    }
                    stack.push(SerializeStep::Close(name));
                    push_children(&mut stack, node);
                }
                NodeData::Document => push_children(&mut stack, node),
                NodeData::Doctype { ref name } => serializer.write_doctype(name)?,
                NodeData::Text { ref contents } => serializer.write_text(&contents.borrow())?,
                NodeData::Comment { ref contents } => serializer.write_comment(contents)?,
                NodeData::ProcessingInstruction {
                    ref target,
                    ref contents,
                } => serializer.write_processing_instruction(target, contents)?,
            }
        }

        Ok(())
    }
}
