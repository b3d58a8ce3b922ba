//! Pre-order traversal over the descendants of a group, in read order

use crate::model::{GroupNode, MetadataNode};

/// What to do after visiting a node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visit {
    Continue,
    /// Do not descend into this node's children
    SkipChildren,
    Stop,
}

/// Visit every descendant of `group`. Returns `true` when the visitor stopped the walk.
pub fn for_each<F>(group: &GroupNode, mut visit: F) -> bool
where
    F: FnMut(&str, &MetadataNode) -> Visit,
{
    for_each_inner(group, &mut visit)
}

fn for_each_inner(group: &GroupNode, visit: &mut dyn FnMut(&str, &MetadataNode) -> Visit) -> bool {
    for (suffix, node) in group.children() {
        match visit(suffix, node) {
            Visit::Stop => return true,
            Visit::SkipChildren => continue,
            Visit::Continue => {}
        }
        if let MetadataNode::Group(child) = node {
            if for_each_inner(child, visit) {
                return true;
            }
        }
    }
    false
}

/// Mutate every descendant of `group` in place. Children are visited after their
/// parent was updated, so a replaced group is walked in its new shape.
pub fn map<F>(group: &mut GroupNode, mut visit: F) -> bool
where
    F: FnMut(&str, &mut MetadataNode) -> Visit,
{
    map_inner(group, &mut visit)
}

fn map_inner(group: &mut GroupNode, visit: &mut dyn FnMut(&str, &mut MetadataNode) -> Visit) -> bool {
    let GroupNode { read_order, fields, .. } = group;
    for suffix in read_order.iter() {
        let Some(node) = fields.get_mut(suffix) else {
            continue;
        };
        match visit(suffix, node) {
            Visit::Stop => return true,
            Visit::SkipChildren => continue,
            Visit::Continue => {}
        }
        if let MetadataNode::Group(child) = node {
            if map_inner(child, visit) {
                return true;
            }
        }
    }
    false
}

/// Remove every descendant for which `keep` returns `false`, from both the read
/// order and the child map. Kept groups are filtered recursively.
pub fn filter<F>(group: &mut GroupNode, mut keep: F)
where
    F: FnMut(&str, &MetadataNode) -> bool,
{
    filter_inner(group, &mut keep);
}

fn filter_inner(group: &mut GroupNode, keep: &mut dyn FnMut(&str, &MetadataNode) -> bool) {
    let GroupNode { read_order, fields, .. } = group;
    read_order.retain(|suffix| {
        let kept = fields.get(suffix).is_some_and(|node| keep(suffix, node));
        if !kept {
            fields.remove(suffix);
        }
        kept
    });
    for suffix in read_order.iter() {
        if let Some(MetadataNode::Group(child)) = fields.get_mut(suffix) {
            filter_inner(child, keep);
        }
    }
}
