// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::collections::BTreeMap;
use std::fmt;
use std::sync::mpsc::Receiver;

use tracing::{debug, warn};

use crate::error::{ViewError, ViewResult};
use crate::events::ViewEvent;
use crate::paged::{PagedView, ViewChange};
use crate::schema::Row;
use crate::source::TreeSource;

/// Index path of a node: the root's index on the current page, then the
/// child index at each level below it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TreePath(Vec<usize>);

impl TreePath {
    pub fn new(indices: Vec<usize>) -> Self {
        Self(indices)
    }

    pub fn root(index: usize) -> Self {
        Self(vec![index])
    }

    pub fn child(&self, index: usize) -> Self {
        let mut indices = self.0.clone();
        indices.push(index);
        Self(indices)
    }

    pub fn parent(&self) -> Option<Self> {
        if self.0.len() <= 1 {
            return None;
        }
        Some(Self(self.0[..self.0.len() - 1].to_vec()))
    }

    pub fn indices(&self) -> &[usize] {
        &self.0
    }

    pub fn depth(&self) -> usize {
        self.0.len()
    }

    /// True when `self` is a strict ancestor of `other`.
    pub fn is_ancestor_of(&self, other: &Self) -> bool {
        self.0.len() < other.0.len() && other.0.starts_with(&self.0)
    }
}

impl fmt::Display for TreePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts = self.0.iter().map(usize::to_string).collect::<Vec<_>>();
        f.write_str(&parts.join(":"))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VisibleNode {
    pub path: TreePath,
    pub row: Row,
    pub expanded: bool,
}

/// Outcome of re-deriving every expanded level after a store write.
#[derive(Debug, Default)]
pub struct RefreshReport {
    pub refreshed: usize,
    pub stale: Vec<ViewError>,
}

/// Paged roots plus lazily expanded children.
///
/// Children are cached under the identity lineage of their parent, so a
/// cache entry survives re-sorting of the level above it. The cache is
/// dropped when the page moves and on reset or reload.
pub struct PagedTree<S> {
    view: PagedView<S>,
    expanded: BTreeMap<Vec<String>, Vec<Row>>,
}

impl<S: TreeSource> PagedTree<S> {
    pub fn new(source: S, per_page: usize) -> ViewResult<Self> {
        Ok(Self {
            view: PagedView::new(source, per_page)?,
            expanded: BTreeMap::new(),
        })
    }

    pub fn view(&self) -> &PagedView<S> {
        &self.view
    }

    pub fn source(&self) -> &S {
        self.view.source()
    }

    pub(crate) fn source_mut(&mut self) -> &mut S {
        self.view.source_mut()
    }

    pub fn subscribe(&mut self) -> Receiver<ViewEvent> {
        self.view.subscribe()
    }

    pub(crate) fn emit(&mut self, event: ViewEvent) {
        self.view.emit(event);
    }

    pub fn set_page(&mut self, page: usize) -> ViewResult<()> {
        let before = self.view.page();
        self.view.set_page(page)?;
        self.forget_if_moved(before);
        Ok(())
    }

    pub fn next_page(&mut self) -> ViewResult<bool> {
        let moved = self.view.next_page()?;
        if moved {
            self.expanded.clear();
        }
        Ok(moved)
    }

    pub fn prev_page(&mut self) -> ViewResult<bool> {
        let moved = self.view.prev_page()?;
        if moved {
            self.expanded.clear();
        }
        Ok(moved)
    }

    pub fn goto_first_page(&mut self) -> ViewResult<()> {
        self.set_page(0)
    }

    pub fn goto_last_page(&mut self) -> ViewResult<()> {
        self.set_page(self.view.get_last_page())
    }

    pub fn change_view(&mut self, source: S, change: ViewChange) -> ViewResult<()> {
        self.view.change_view(source, change)?;
        if change != ViewChange::Refine {
            self.expanded.clear();
        }
        Ok(())
    }

    /// Re-reads root `index` of the current page.
    pub fn update_root(&mut self, index: usize) -> ViewResult<bool> {
        self.view.update_row(index)
    }

    pub fn node(&self, path: &TreePath) -> ViewResult<Row> {
        let lineage = self.lineage(path)?;
        lineage.last().cloned().ok_or_else(|| stale(path))
    }

    /// Rows from the root down to the node at `path`.
    pub fn lineage(&self, path: &TreePath) -> ViewResult<Vec<Row>> {
        let Some((&root, rest)) = path.indices().split_first() else {
            return Err(stale(path));
        };
        let mut row = self.view.row_at(root).ok_or_else(|| stale(path))?.clone();
        let mut ids = vec![self.source().identity(&row)];
        let mut lineage = Vec::with_capacity(path.depth());
        for &index in rest {
            let child = self
                .expanded
                .get(&ids)
                .and_then(|children| children.get(index))
                .ok_or_else(|| stale(path))?
                .clone();
            lineage.push(row);
            ids.push(self.source().identity(&child));
            row = child;
        }
        lineage.push(row);
        Ok(lineage)
    }

    pub fn identities(&self, lineage: &[Row]) -> Vec<String> {
        lineage
            .iter()
            .map(|row| self.source().identity(row))
            .collect()
    }

    /// Children of the node at `path`, queried on first expansion only.
    /// Leaves expand to nothing.
    pub fn expand(&mut self, path: &TreePath) -> ViewResult<&[Row]> {
        let lineage = self.lineage(path)?;
        let Some(node) = lineage.last() else {
            return Err(stale(path));
        };
        if !self.source().is_expandable(node) {
            return Ok(&[]);
        }
        let ids = self.identities(&lineage);
        if !self.expanded.contains_key(&ids) {
            let children = self.source().children(&lineage)?;
            debug!(%path, children = children.len(), "expanded tree node");
            self.expanded.insert(ids.clone(), children);
        }
        Ok(self
            .expanded
            .get(&ids)
            .map(Vec::as_slice)
            .unwrap_or_default())
    }

    pub fn is_expanded(&self, path: &TreePath) -> bool {
        self.lineage(path)
            .map(|lineage| self.expanded.contains_key(&self.identities(&lineage)))
            .unwrap_or(false)
    }

    /// Cached children of `path`, without querying.
    pub fn children(&self, path: &TreePath) -> Option<&[Row]> {
        let lineage = self.lineage(path).ok()?;
        self.expanded
            .get(&self.identities(&lineage))
            .map(Vec::as_slice)
    }

    /// Forgets the children of `path` and of everything below it.
    pub fn collapse(&mut self, path: &TreePath) -> ViewResult<bool> {
        let lineage = self.lineage(path)?;
        let prefix = self.identities(&lineage);
        let before = self.expanded.len();
        self.expanded.retain(|ids, _| !ids.starts_with(&prefix));
        Ok(self.expanded.len() != before)
    }

    /// Depth-first listing of the page: roots, then the children of every
    /// expanded node beneath them.
    pub fn visible_rows(&self) -> Vec<VisibleNode> {
        let mut nodes = Vec::new();
        for (index, row) in self.view.rows().iter().enumerate() {
            let ids = vec![self.source().identity(row)];
            self.push_visible(TreePath::root(index), ids, row, &mut nodes);
        }
        nodes
    }

    fn push_visible(
        &self,
        path: TreePath,
        ids: Vec<String>,
        row: &Row,
        nodes: &mut Vec<VisibleNode>,
    ) {
        let children = self.expanded.get(&ids);
        nodes.push(VisibleNode {
            path: path.clone(),
            row: row.clone(),
            expanded: children.is_some(),
        });
        for (index, child) in children.into_iter().flatten().enumerate() {
            let mut child_ids = ids.clone();
            child_ids.push(self.source().identity(child));
            self.push_visible(path.child(index), child_ids, child, nodes);
        }
    }

    /// Moves cached expansions from under `from` to under `to` after the
    /// node named by `from` was renamed.
    pub(crate) fn rekey(&mut self, from: &[String], to: &[String]) {
        if from == to {
            return;
        }
        let moved = self
            .expanded
            .keys()
            .filter(|ids| ids.starts_with(from))
            .cloned()
            .collect::<Vec<_>>();
        for ids in moved {
            if let Some(children) = self.expanded.remove(&ids) {
                let mut renamed = to.to_vec();
                renamed.extend_from_slice(&ids[from.len()..]);
                self.expanded.insert(renamed, children);
            }
        }
    }

    /// Re-queries every expanded level, parents before children, and
    /// emits `RowChanged` for each re-derived row, then `ChildrenChanged`
    /// when the level grew or shrank. Levels whose lineage no longer
    /// resolves are dropped and reported, not fatal.
    pub fn refresh_expanded(&mut self) -> ViewResult<RefreshReport> {
        let mut levels = self.expanded.keys().cloned().collect::<Vec<_>>();
        levels.sort_by_key(Vec::len);

        let mut report = RefreshReport::default();
        for ids in levels {
            match self.locate(&ids) {
                Ok((lineage, path)) => {
                    let children = self.source().children(&lineage)?;
                    for (index, row) in children.iter().enumerate() {
                        self.emit(ViewEvent::RowChanged {
                            path: path.child(index),
                            row: row.clone(),
                        });
                    }
                    let new_length = children.len();
                    let before = self.expanded.insert(ids, children).map(|old| old.len());
                    if before != Some(new_length) {
                        self.emit(ViewEvent::ChildrenChanged { path, new_length });
                    }
                    report.refreshed += 1;
                }
                Err(error @ ViewError::StaleNode { .. }) => {
                    warn!(%error, "skipping stale tree node");
                    self.expanded.remove(&ids);
                    report.stale.push(error);
                }
                Err(error) => return Err(error),
            }
        }
        Ok(report)
    }

    /// Finds the rows and current path of the node named by `ids`.
    fn locate(&self, ids: &[String]) -> ViewResult<(Vec<Row>, TreePath)> {
        let stale_ids = || ViewError::StaleNode {
            path: ids.join(" / "),
        };
        let Some((root_id, rest)) = ids.split_first() else {
            return Err(stale_ids());
        };
        let root = self
            .view
            .rows()
            .iter()
            .position(|row| self.source().identity(row) == *root_id)
            .ok_or_else(stale_ids)?;
        let mut path = TreePath::root(root);
        let mut lineage = vec![self.view.rows()[root].clone()];
        for depth in 0..rest.len() {
            let siblings = self.expanded.get(&ids[..=depth]).ok_or_else(stale_ids)?;
            let index = siblings
                .iter()
                .position(|row| self.source().identity(row) == rest[depth])
                .ok_or_else(stale_ids)?;
            path = path.child(index);
            lineage.push(siblings[index].clone());
        }
        Ok((lineage, path))
    }

    fn forget_if_moved(&mut self, before: usize) {
        if self.view.page() != before {
            self.expanded.clear();
        }
    }
}

fn stale(path: &TreePath) -> ViewError {
    ViewError::StaleNode {
        path: path.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::{PagedTree, TreePath};
    use crate::error::{ViewError, ViewResult};
    use crate::events::ViewEvent;
    use crate::paged::ViewChange;
    use crate::schema::{FieldKind, Row, RowSchema, Value};
    use crate::source::{TreeSource, ViewSource};
    use std::cell::RefCell;
    use std::collections::BTreeMap;
    use std::rc::Rc;

    /// Roots `r0..rN`; every node has the children listed in `shape`
    /// under its name, or none.
    struct Outline {
        schema: RowSchema,
        roots: Vec<String>,
        shape: Rc<RefCell<BTreeMap<String, Vec<String>>>>,
        queried: Rc<RefCell<Vec<String>>>,
    }

    impl Outline {
        fn new(roots: &[&str], shape: &[(&str, &[&str])]) -> Self {
            Self {
                schema: RowSchema::new(&[("name", FieldKind::Text)]).expect("schema"),
                roots: roots.iter().map(|root| (*root).to_owned()).collect(),
                shape: Rc::new(RefCell::new(
                    shape
                        .iter()
                        .map(|(name, children)| {
                            (
                                (*name).to_owned(),
                                children.iter().map(|child| (*child).to_owned()).collect(),
                            )
                        })
                        .collect(),
                )),
                queried: Rc::default(),
            }
        }

        fn named(&self, name: &str) -> ViewResult<Row> {
            self.schema.row(vec![Value::from(name)])
        }
    }

    impl ViewSource for Outline {
        fn schema(&self) -> &RowSchema {
            &self.schema
        }

        fn len(&self) -> usize {
            self.roots.len()
        }

        fn row(&self, index: usize) -> ViewResult<Row> {
            self.named(&self.roots[index])
        }
    }

    impl TreeSource for Outline {
        fn children(&self, lineage: &[Row]) -> ViewResult<Vec<Row>> {
            let name = lineage.last().map(|row| row.text("name")).unwrap_or("");
            self.queried.borrow_mut().push(name.to_owned());
            self.shape
                .borrow()
                .get(name)
                .into_iter()
                .flatten()
                .map(|child| self.named(child))
                .collect()
        }

        fn is_expandable(&self, row: &Row) -> bool {
            !row.text("name").starts_with("leaf")
        }

        fn identity(&self, row: &Row) -> String {
            row.text("name").to_owned()
        }
    }

    fn names(rows: &[Row]) -> Vec<&str> {
        rows.iter().map(|row| row.text("name")).collect()
    }

    fn sample() -> Outline {
        Outline::new(
            &["a", "b", "c"],
            &[
                ("a", &["a1", "a2"]),
                ("a1", &["leaf-x"]),
                ("b", &["b1"]),
            ],
        )
    }

    #[test]
    fn tree_path_relations() {
        let path = TreePath::new(vec![1, 0, 2]);
        assert_eq!(path.to_string(), "1:0:2");
        assert_eq!(path.parent(), Some(TreePath::new(vec![1, 0])));
        assert!(TreePath::root(1).is_ancestor_of(&path));
        assert!(!path.is_ancestor_of(&path));
        assert!(!TreePath::root(0).is_ancestor_of(&path));
    }

    #[test]
    fn expansion_is_lazy_and_cached() -> ViewResult<()> {
        let source = sample();
        let queried = source.queried.clone();
        let mut tree = PagedTree::new(source, 10)?;
        assert!(queried.borrow().is_empty());

        assert_eq!(names(tree.expand(&TreePath::root(0))?), vec!["a1", "a2"]);
        tree.expand(&TreePath::root(0))?;
        assert_eq!(*queried.borrow(), vec!["a"]);

        assert_eq!(
            names(tree.expand(&TreePath::new(vec![0, 0]))?),
            vec!["leaf-x"]
        );
        assert!(tree.expand(&TreePath::new(vec![0, 0, 0]))?.is_empty());
        assert_eq!(*queried.borrow(), vec!["a", "a1"]);
        Ok(())
    }

    #[test]
    fn unexpanded_paths_are_stale() -> ViewResult<()> {
        let mut tree = PagedTree::new(sample(), 10)?;
        assert!(matches!(
            tree.expand(&TreePath::new(vec![1, 0])),
            Err(ViewError::StaleNode { .. })
        ));
        assert!(matches!(
            tree.node(&TreePath::root(9)),
            Err(ViewError::StaleNode { .. })
        ));
        Ok(())
    }

    #[test]
    fn visible_rows_flatten_expanded_nodes() -> ViewResult<()> {
        let mut tree = PagedTree::new(sample(), 10)?;
        tree.expand(&TreePath::root(0))?;
        tree.expand(&TreePath::new(vec![0, 1]))?;
        tree.expand(&TreePath::root(2))?;

        let visible = tree.visible_rows();
        let listed = visible
            .iter()
            .map(|node| (node.path.to_string(), node.row.text("name").to_owned()))
            .collect::<Vec<_>>();
        assert_eq!(
            listed,
            vec![
                ("0".to_owned(), "a".to_owned()),
                ("0:0".to_owned(), "a1".to_owned()),
                ("0:1".to_owned(), "a2".to_owned()),
                ("1".to_owned(), "b".to_owned()),
                ("2".to_owned(), "c".to_owned()),
            ]
        );
        assert!(visible[0].expanded);
        assert!(visible[2].expanded);
        assert!(!visible[3].expanded);
        Ok(())
    }

    #[test]
    fn collapse_drops_descendants() -> ViewResult<()> {
        let mut tree = PagedTree::new(sample(), 10)?;
        tree.expand(&TreePath::root(0))?;
        tree.expand(&TreePath::new(vec![0, 0]))?;
        assert!(tree.collapse(&TreePath::root(0))?);
        assert!(!tree.is_expanded(&TreePath::root(0)));
        assert_eq!(tree.visible_rows().len(), 3);
        Ok(())
    }

    #[test]
    fn page_change_and_reset_clear_expansions_but_refine_keeps_them() -> ViewResult<()> {
        let mut tree = PagedTree::new(sample(), 2)?;
        tree.expand(&TreePath::root(0))?;
        tree.set_page(0)?;
        assert!(tree.is_expanded(&TreePath::root(0)));

        tree.next_page()?;
        tree.prev_page()?;
        assert!(!tree.is_expanded(&TreePath::root(0)));

        tree.expand(&TreePath::root(0))?;
        tree.change_view(sample(), ViewChange::Refine)?;
        assert!(tree.is_expanded(&TreePath::root(0)));

        tree.change_view(sample(), ViewChange::Reset)?;
        assert!(!tree.is_expanded(&TreePath::root(0)));
        Ok(())
    }

    #[test]
    fn refresh_requeries_and_skips_vanished_nodes() -> ViewResult<()> {
        let source = sample();
        let shape = source.shape.clone();
        let mut tree = PagedTree::new(source, 10)?;
        tree.expand(&TreePath::root(0))?;
        tree.expand(&TreePath::new(vec![0, 1]))?;
        tree.expand(&TreePath::new(vec![0, 0]))?;
        let rx = tree.subscribe();

        shape
            .borrow_mut()
            .insert("a".to_owned(), vec!["a0".to_owned(), "a2".to_owned()]);
        let report = tree.refresh_expanded()?;

        assert_eq!(report.refreshed, 2);
        assert_eq!(report.stale.len(), 1);
        assert!(report.stale[0].to_string().contains("a / a1"));
        assert_eq!(
            names(tree.children(&TreePath::root(0)).unwrap_or_default()),
            vec!["a0", "a2"]
        );

        let changed = rx
            .try_iter()
            .filter_map(|event| match event {
                ViewEvent::RowChanged { path, row } => {
                    Some((path.to_string(), row.text("name").to_owned()))
                }
                _ => None,
            })
            .collect::<Vec<_>>();
        assert_eq!(
            changed,
            vec![
                ("0:0".to_owned(), "a0".to_owned()),
                ("0:1".to_owned(), "a2".to_owned()),
            ]
        );
        Ok(())
    }

    #[test]
    fn refresh_reports_levels_that_shrink() -> ViewResult<()> {
        let source = sample();
        let shape = source.shape.clone();
        let mut tree = PagedTree::new(source, 10)?;
        tree.expand(&TreePath::root(0))?;
        tree.expand(&TreePath::root(1))?;
        let rx = tree.subscribe();

        shape
            .borrow_mut()
            .insert("a".to_owned(), vec!["a2".to_owned()]);
        tree.refresh_expanded()?;

        let resized = rx
            .try_iter()
            .filter_map(|event| match event {
                ViewEvent::ChildrenChanged { path, new_length } => {
                    Some((path.to_string(), new_length))
                }
                _ => None,
            })
            .collect::<Vec<_>>();
        assert_eq!(resized, vec![("0".to_owned(), 1)]);
        Ok(())
    }

    #[test]
    fn rekey_moves_descendant_expansions() -> ViewResult<()> {
        let source = sample();
        let shape = source.shape.clone();
        let mut tree = PagedTree::new(source, 10)?;
        tree.expand(&TreePath::root(0))?;
        tree.expand(&TreePath::new(vec![0, 0]))?;

        {
            let mut shape = shape.borrow_mut();
            let children = shape.remove("a1").unwrap_or_default();
            shape.insert("z1".to_owned(), children);
            shape.insert("a".to_owned(), vec!["a2".to_owned(), "z1".to_owned()]);
        }
        tree.rekey(&["a".to_owned(), "a1".to_owned()], &["a".to_owned(), "z1".to_owned()]);
        let report = tree.refresh_expanded()?;

        assert!(report.stale.is_empty());
        assert_eq!(
            names(tree.children(&TreePath::new(vec![0, 1])).unwrap_or_default()),
            vec!["leaf-x"]
        );
        Ok(())
    }
}
