/// Strip parenting: a weak name-keyed relationship graph.
///
/// Parent links are plain name references resolved lazily; a dangling
/// reference degrades to "no parent" everywhere.
use std::collections::HashSet;

use crate::Strip;

pub fn find_children<'a>(strips: &'a [Strip], parent: &str) -> Vec<&'a Strip> {
    strips
        .iter()
        .filter(|s| s.parent.as_deref() == Some(parent))
        .collect()
}

pub fn find_parent<'a>(strips: &'a [Strip], child: &Strip) -> Option<&'a Strip> {
    let name = child.parent.as_deref()?;
    if name.is_empty() {
        return None;
    }
    strips.iter().find(|s| s.name == name)
}

/// Depth-first collection of all descendants of `root`, excluding
/// locked and effect strips (neither is draggable as part of a family).
///
/// Well-formed data is acyclic, but the visited set keeps a corrupted
/// graph from looping.
pub fn recursive_descendants<'a>(strips: &'a [Strip], root: &str) -> Vec<&'a Strip> {
    let mut visited: HashSet<&str> = HashSet::new();
    visited.insert(root);
    let mut out = Vec::new();
    let mut stack = vec![root];
    while let Some(current) = stack.pop() {
        for s in strips {
            if s.parent.as_deref() != Some(current) || visited.contains(s.name.as_str()) {
                continue;
            }
            visited.insert(&s.name);
            if s.lock || s.is_effect() {
                continue;
            }
            out.push(s);
            stack.push(&s.name);
        }
    }
    out
}

/// True when `candidate` sits anywhere below `root` in the parent
/// graph. Used to refuse link assignments that would close a cycle.
pub fn is_descendant(strips: &[Strip], root: &str, candidate: &str) -> bool {
    recursive_descendants(strips, root)
        .iter()
        .any(|s| s.name == candidate)
}

pub fn add_children(strips: &mut [Strip], parent: &str, children: &[String]) {
    for s in strips.iter_mut() {
        if s.name != parent && children.iter().any(|c| *c == s.name) {
            s.parent = Some(parent.to_string());
        }
    }
}

/// Idempotent; a child with no parent stays that way.
pub fn clear_parent(strips: &mut [Strip], child: &str) {
    if let Some(s) = strips.iter_mut().find(|s| s.name == child) {
        s.parent = None;
    }
}

pub fn clear_children(strips: &mut [Strip], parent: &str) {
    for s in strips.iter_mut() {
        if s.parent.as_deref() == Some(parent) {
            s.parent = None;
        }
    }
}

/// Expand the current selection to every draggable descendant, so a
/// grab picks up whole families.
pub fn expand_selection_to_children(strips: &mut [Strip]) {
    let roots: Vec<String> = strips
        .iter()
        .filter(|s| s.any_select())
        .map(|s| s.name.clone())
        .collect();
    let mut to_select: HashSet<String> = HashSet::new();
    for root in &roots {
        for d in recursive_descendants(strips, root) {
            to_select.insert(d.name.clone());
        }
    }
    for s in strips.iter_mut() {
        if to_select.contains(&s.name) {
            s.select = true;
        }
    }
}
