//! Category summary tree with tri-state selection.
//!
//! Nodes live in one arena (`Vec<CategoryNode>`) and link by index; the root
//! is always index 0 and every other node is one of its children.

use std::collections::{BTreeSet, HashSet};
use std::fmt;

use modeldiff_core::{CategoryId, ElementId, Snapshot};
use serde::Serialize;

use crate::model::ReconciliationResult;

pub const ROOT: usize = 0;

const ROOT_NAME: &str = "All";
const UNCATEGORIZED_NAME: &str = "Others";

/// Display name of `id`: the new snapshot's name table first, then the old
/// one, with a leading `OST_` stripped.
pub fn category_display_name(old: &Snapshot, new: &Snapshot, id: CategoryId) -> String {
    match new.category_name(id).or_else(|| old.category_name(id)) {
        Some(name) => name.strip_prefix("OST_").unwrap_or(name).to_string(),
        None => format!("Category {id}"),
    }
}

// ---------------------------------------------------------------------------
// Nodes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Selection {
    Checked,
    Unchecked,
    Mixed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKey {
    Root,
    Category(Option<CategoryId>),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ChangeCounts {
    pub all: usize,
    pub modified: usize,
    pub added: usize,
    pub deleted: usize,
}

impl ChangeCounts {
    fn of(ids: &[ElementId], result: &ReconciliationResult) -> Self {
        Self {
            all: ids.len(),
            modified: ids.iter().filter(|id| result.modified.contains(id)).count(),
            added: ids.iter().filter(|id| result.added.contains(id)).count(),
            deleted: ids.iter().filter(|id| result.deleted.contains(id)).count(),
        }
    }

    pub fn changed(&self) -> usize {
        self.modified + self.added + self.deleted
    }

    pub fn unchanged(&self) -> usize {
        self.all.saturating_sub(self.changed())
    }

    fn add(&mut self, other: &ChangeCounts) {
        self.all += other.all;
        self.modified += other.modified;
        self.added += other.added;
        self.deleted += other.deleted;
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryNode {
    pub key: NodeKey,
    pub name: String,
    pub counts: ChangeCounts,
    pub selection: Selection,
    /// Ids listed under this node when it is checked.
    #[serde(skip)]
    pub ids: Vec<ElementId>,
    #[serde(skip)]
    parent: Option<usize>,
    #[serde(skip)]
    children: Vec<usize>,
}

impl CategoryNode {
    pub fn parent(&self) -> Option<usize> {
        self.parent
    }

    pub fn children(&self) -> &[usize] {
        &self.children
    }
}

// ---------------------------------------------------------------------------
// Tree
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct CategoryTree {
    nodes: Vec<CategoryNode>,
}

impl CategoryTree {
    /// Root "All" over every category present in both snapshots, children
    /// ordered by descending churn. Everything starts checked.
    pub fn build(result: &ReconciliationResult, old: &Snapshot, new: &Snapshot) -> Self {
        let all = result.all();
        let root_counts = ChangeCounts {
            all: all.len(),
            modified: result.modified.len(),
            added: result.added.len(),
            deleted: result.deleted.len(),
        };
        let mut nodes = vec![CategoryNode {
            key: NodeKey::Root,
            name: ROOT_NAME.to_string(),
            counts: root_counts,
            selection: Selection::Checked,
            ids: all,
            parent: None,
            children: Vec::new(),
        }];

        let old_categories: BTreeSet<Option<CategoryId>> = old.categories().collect();
        let rename_sources = result.rename_sources();

        let mut children: Vec<CategoryNode> = new
            .categories()
            .filter(|c| old_categories.contains(c))
            .map(|category| {
                let ids = category_ids(category, old, new, &rename_sources);
                let name = match category {
                    Some(id) => category_display_name(old, new, id),
                    None => UNCATEGORIZED_NAME.to_string(),
                };
                CategoryNode {
                    key: NodeKey::Category(category),
                    name,
                    counts: ChangeCounts::of(&ids, result),
                    selection: Selection::Checked,
                    ids,
                    parent: Some(ROOT),
                    children: Vec::new(),
                }
            })
            .collect();
        children.sort_by(|a, b| b.counts.changed().cmp(&a.counts.changed()));

        for child in children {
            let idx = nodes.len();
            nodes.push(child);
            nodes[ROOT].children.push(idx);
        }

        log::debug!(
            "category tree: {} categories, {} changed elements",
            nodes.len() - 1,
            root_counts.changed()
        );
        Self { nodes }
    }

    pub fn root(&self) -> &CategoryNode {
        &self.nodes[ROOT]
    }

    pub fn node(&self, idx: usize) -> Option<&CategoryNode> {
        self.nodes.get(idx)
    }

    pub fn nodes(&self) -> &[CategoryNode] {
        &self.nodes
    }

    /// Category nodes in display order.
    pub fn categories(&self) -> impl Iterator<Item = &CategoryNode> + '_ {
        self.nodes[ROOT].children.iter().map(move |&i| &self.nodes[i])
    }

    pub fn find(&self, key: NodeKey) -> Option<usize> {
        self.nodes.iter().position(|n| n.key == key)
    }

    /// Check or uncheck `idx` and its descendants, then re-derive ancestors.
    /// Unknown indices are ignored.
    pub fn set_selected(&mut self, idx: usize, checked: bool) {
        if idx >= self.nodes.len() {
            return;
        }
        let state = if checked {
            Selection::Checked
        } else {
            Selection::Unchecked
        };

        let mut stack = vec![idx];
        while let Some(i) = stack.pop() {
            self.nodes[i].selection = state;
            stack.extend(self.nodes[i].children.iter().copied());
        }

        let mut parent = self.nodes[idx].parent;
        while let Some(p) = parent {
            self.nodes[p].selection = self.derived_selection(p);
            parent = self.nodes[p].parent;
        }
    }

    fn derived_selection(&self, idx: usize) -> Selection {
        let mut states = self.nodes[idx]
            .children
            .iter()
            .map(|&c| self.nodes[c].selection);
        let Some(first) = states.next() else {
            return Selection::Mixed;
        };
        if states.all(|s| s == first) {
            first
        } else {
            Selection::Mixed
        }
    }

    /// Ids the current selection lists.
    pub fn filter_ids(&self) -> Vec<ElementId> {
        let root = &self.nodes[ROOT];
        if root.selection == Selection::Checked {
            return root.ids.clone();
        }
        let mut seen = HashSet::new();
        self.categories()
            .filter(|n| n.selection == Selection::Checked)
            .flat_map(|n| n.ids.iter().copied())
            .filter(|id| seen.insert(*id))
            .collect()
    }

    pub fn selection_summary(&self) -> SelectionSummary {
        let root = &self.nodes[ROOT];
        match root.selection {
            Selection::Checked => SelectionSummary {
                categories: root.children.len(),
                counts: Some(root.counts),
            },
            Selection::Unchecked => SelectionSummary {
                categories: 0,
                counts: None,
            },
            Selection::Mixed => {
                let mut counts = ChangeCounts::default();
                let mut categories = 0;
                for n in self.categories().filter(|n| n.selection == Selection::Checked) {
                    counts.add(&n.counts);
                    categories += 1;
                }
                SelectionSummary {
                    categories,
                    counts: Some(counts),
                }
            }
        }
    }
}

/// New ids in `category`, then old ids in it that no rename consumed.
fn category_ids(
    category: Option<CategoryId>,
    old: &Snapshot,
    new: &Snapshot,
    rename_sources: &BTreeSet<ElementId>,
) -> Vec<ElementId> {
    let mut seen = HashSet::new();
    new.ids_in_category(category)
        .iter()
        .chain(
            old.ids_in_category(category)
                .iter()
                .filter(|id| !rename_sources.contains(id)),
        )
        .copied()
        .filter(|id| seen.insert(*id))
        .collect()
}

// ---------------------------------------------------------------------------
// Selection abstract
// ---------------------------------------------------------------------------

/// Totals over the selected categories; `counts` is `None` when nothing is
/// selected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectionSummary {
    pub categories: usize,
    pub counts: Option<ChangeCounts>,
}

impl fmt::Display for SelectionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} categories are selected.\n\n", self.categories)?;
        if let Some(c) = &self.counts {
            write!(
                f,
                "{} elements in selected categories\n{} elements are changed\n({} modified/ {} deleted/ {} added)",
                c.all,
                c.changed(),
                c.modified,
                c.deleted,
                c.added
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modeldiff_core::Element;

    const WALLS: i64 = -2000011;
    const DOORS: i64 = -2000023;
    const VIEWS: i64 = -2000279;

    fn fixture() -> (Snapshot, Snapshot, ReconciliationResult) {
        let old = Snapshot::new(
            "old.rvt",
            vec![
                Element::new(1, "w1").with_category(WALLS),
                Element::new(2, "w2").with_category(WALLS),
                Element::new(3, "d1").with_category(DOORS),
                Element::new(4, "d2").with_category(DOORS),
                Element::new(5, "v1").with_category(VIEWS),
                Element::new(6, "loose"),
            ],
        )
        .unwrap()
        .with_category_names([
            (CategoryId(WALLS), "OST_Walls".to_string()),
            (CategoryId(DOORS), "OST_Doors".to_string()),
        ]);
        let new = Snapshot::new(
            "new.rvt",
            vec![
                Element::new(1, "w1").with_category(WALLS),
                Element::new(2, "w2 moved").with_category(WALLS),
                Element::new(7, "w3").with_category(WALLS),
                Element::new(9, "d2").with_category(DOORS),
                Element::new(5, "v1").with_category(VIEWS),
                Element::new(6, "loose"),
            ],
        )
        .unwrap()
        .with_category_names([(CategoryId(WALLS), "OST_Walls".to_string())]);

        let mut result = ReconciliationResult::default();
        result.unchanged.extend([1, 5, 6, 9].map(ElementId));
        result.modified.insert(ElementId(2));
        result.added.insert(ElementId(7));
        result.deleted.insert(ElementId(3));
        result.renames.insert(ElementId(9), ElementId(4));
        (old, new, result)
    }

    #[test]
    fn build_counts_and_order() {
        let (old, new, result) = fixture();
        let tree = CategoryTree::build(&result, &old, &new);

        let root = tree.root();
        assert_eq!(root.name, "All");
        assert_eq!(root.counts.all, 7);
        assert_eq!(root.counts.changed(), 3);
        assert_eq!(root.counts.unchanged(), 4);

        let names: Vec<&str> = tree.categories().map(|n| n.name.as_str()).collect();
        assert_eq!(names[0], "Walls");
        assert_eq!(names[1], "Doors");
        assert!(names.contains(&"Others"));
        assert!(names.contains(&format!("Category {VIEWS}").as_str()));

        let walls = tree.categories().next().unwrap();
        assert_eq!(walls.counts, ChangeCounts { all: 3, modified: 1, added: 1, deleted: 0 });
    }

    #[test]
    fn rename_sources_are_not_double_counted() {
        let (old, new, result) = fixture();
        let tree = CategoryTree::build(&result, &old, &new);
        let doors = tree.find(NodeKey::Category(Some(CategoryId(DOORS)))).unwrap();
        let node = tree.node(doors).unwrap();
        assert_eq!(node.ids, vec![ElementId(9), ElementId(3)]);
        assert_eq!(node.counts.all, node.counts.changed() + node.counts.unchanged());
    }

    #[test]
    fn selection_propagates_both_ways() {
        let (old, new, result) = fixture();
        let mut tree = CategoryTree::build(&result, &old, &new);
        let walls = tree.find(NodeKey::Category(Some(CategoryId(WALLS)))).unwrap();

        tree.set_selected(ROOT, false);
        assert!(tree.nodes().iter().all(|n| n.selection == Selection::Unchecked));

        tree.set_selected(walls, true);
        assert_eq!(tree.root().selection, Selection::Mixed);
        assert_eq!(
            tree.filter_ids(),
            vec![ElementId(1), ElementId(2), ElementId(7)]
        );

        for idx in tree.root().children().to_vec() {
            tree.set_selected(idx, true);
        }
        assert_eq!(tree.root().selection, Selection::Checked);
        assert_eq!(tree.filter_ids(), result.all());
    }

    #[test]
    fn abstract_text() {
        let (old, new, result) = fixture();
        let mut tree = CategoryTree::build(&result, &old, &new);
        assert_eq!(
            tree.selection_summary().to_string(),
            "4 categories are selected.\n\n7 elements in selected categories\n3 elements are changed\n(1 modified/ 1 deleted/ 1 added)"
        );

        let doors = tree.find(NodeKey::Category(Some(CategoryId(DOORS)))).unwrap();
        tree.set_selected(ROOT, false);
        assert_eq!(tree.selection_summary().to_string(), "0 categories are selected.\n\n");

        tree.set_selected(doors, true);
        assert_eq!(
            tree.selection_summary().to_string(),
            "1 categories are selected.\n\n2 elements in selected categories\n1 elements are changed\n(0 modified/ 1 deleted/ 0 added)"
        );
    }

    #[test]
    fn only_shared_categories_appear() {
        let old = Snapshot::new("a", vec![Element::new(1, "x").with_category(1)]).unwrap();
        let new = Snapshot::new("b", vec![Element::new(2, "y").with_category(2)]).unwrap();
        let mut result = ReconciliationResult::default();
        result.deleted.insert(ElementId(1));
        result.added.insert(ElementId(2));
        let tree = CategoryTree::build(&result, &old, &new);
        assert_eq!(tree.categories().count(), 0);
        assert_eq!(tree.root().counts.all, 2);
    }

    #[test]
    fn unknown_index_is_ignored() {
        let (old, new, result) = fixture();
        let mut tree = CategoryTree::build(&result, &old, &new);
        tree.set_selected(99, false);
        assert_eq!(tree.root().selection, Selection::Checked);
    }
}
