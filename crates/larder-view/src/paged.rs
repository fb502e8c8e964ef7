// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::collections::HashMap;
use std::sync::mpsc::Receiver;

use tracing::debug;

use crate::error::ViewResult;
use crate::events::{Notifier, ViewEvent};
use crate::schema::Row;
use crate::source::ViewSource;
use crate::tree::TreePath;
use crate::window::PageWindow;

/// How a replacement source relates to the one it replaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewChange {
    /// Unrelated query: back to the first page, nothing reused.
    Reset,
    /// Narrower query: back to the first page, projected rows reused.
    Refine,
    /// Same query after a store write: page kept (re-clamped), nothing
    /// reused.
    Reload,
}

/// Page window over a source, materialising only the rows of the current
/// page.
pub struct PagedView<S> {
    source: S,
    window: PageWindow,
    rows: Vec<Row>,
    memo: HashMap<i64, Row>,
    notifier: Notifier,
}

impl<S: ViewSource> PagedView<S> {
    pub fn new(source: S, per_page: usize) -> ViewResult<Self> {
        let mut window = PageWindow::new(per_page)?;
        window.set_length(source.len());
        let mut view = Self {
            source,
            window,
            rows: Vec::new(),
            memo: HashMap::new(),
            notifier: Notifier::default(),
        };
        view.materialize()?;
        Ok(view)
    }

    pub fn subscribe(&mut self) -> Receiver<ViewEvent> {
        self.notifier.subscribe()
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub(crate) fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    pub fn window(&self) -> &PageWindow {
        &self.window
    }

    pub fn page(&self) -> usize {
        self.window.page()
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    pub fn get_last_page(&self) -> usize {
        self.window.last_page()
    }

    pub fn showing(&self) -> (usize, usize, usize) {
        self.window.showing()
    }

    pub fn status_text(&self, noun: &str) -> String {
        self.window.status_text(noun)
    }

    /// Clamps `page` into range and always reports the resulting window.
    /// A new page is projected afresh; nothing from the old page is reused.
    pub fn set_page(&mut self, page: usize) -> ViewResult<()> {
        let mut window = self.window;
        window.set_page(page);
        if window.page() != self.window.page() {
            let (rows, memo) = project_window(&self.source, &window, None)?;
            self.window = window;
            self.rows = rows;
            self.memo = memo;
        }
        self.emit(ViewEvent::PageChanged(self.window.snapshot()));
        Ok(())
    }

    pub fn next_page(&mut self) -> ViewResult<bool> {
        if self.window.page() >= self.window.last_page() {
            return Ok(false);
        }
        self.set_page(self.window.page() + 1)?;
        Ok(true)
    }

    pub fn prev_page(&mut self) -> ViewResult<bool> {
        if self.window.page() == 0 {
            return Ok(false);
        }
        self.set_page(self.window.page() - 1)?;
        Ok(true)
    }

    pub fn goto_first_page(&mut self) -> ViewResult<()> {
        self.set_page(0)
    }

    pub fn goto_last_page(&mut self) -> ViewResult<()> {
        self.set_page(self.window.last_page())
    }

    /// Rows of the current page.
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Row `index` of the current page.
    pub fn row_at(&self, index: usize) -> Option<&Row> {
        self.rows.get(index)
    }

    /// Page-relative `[bottom, top)`, clamped to the rows on the page.
    pub fn slice(&self, bottom: usize, top: usize) -> &[Row] {
        let top = top.min(self.rows.len());
        let bottom = bottom.min(top);
        &self.rows[bottom..top]
    }

    /// Re-reads and re-projects one row of the current page in place.
    /// Returns false when `index` is off the page.
    pub fn update_row(&mut self, index: usize) -> ViewResult<bool> {
        if index >= self.rows.len() {
            return Ok(false);
        }
        let (bottom, _) = self.window.bounds();
        let absolute = bottom + index;
        if let Some(key) = self.source.row_key(absolute) {
            self.memo.remove(&key);
        }
        self.source.reload(absolute)?;
        let row = self.source.row(absolute)?;
        if let Some(key) = self.source.row_key(absolute) {
            self.memo.insert(key, row.clone());
        }
        self.rows[index] = row.clone();
        self.emit(ViewEvent::RowChanged {
            path: TreePath::root(index),
            row,
        });
        Ok(true)
    }

    /// Swaps in the result of a new query. Events are sent once the page,
    /// length and rows all describe the new source. On error the view
    /// keeps showing the old source.
    pub fn change_view(&mut self, source: S, change: ViewChange) -> ViewResult<()> {
        let mut window = self.window;
        if change != ViewChange::Reload {
            window.set_page(0);
        }
        window.set_length(source.len());
        let reuse = (change == ViewChange::Refine).then_some(&self.memo);
        let (rows, memo) = project_window(&source, &window, reuse)?;

        let before = self.window.page();
        self.source = source;
        self.window = window;
        self.rows = rows;
        self.memo = memo;
        debug!(
            ?change,
            length = self.window.len(),
            page = self.window.page(),
            "view changed"
        );

        if self.window.page() != before {
            self.emit(ViewEvent::PageChanged(self.window.snapshot()));
        }
        self.emit(ViewEvent::ViewChanged {
            new_length: self.window.len(),
        });
        Ok(())
    }

    pub(crate) fn emit(&mut self, event: ViewEvent) {
        self.notifier.emit(event);
    }

    fn materialize(&mut self) -> ViewResult<()> {
        let (rows, memo) = project_window(&self.source, &self.window, None)?;
        self.rows = rows;
        self.memo = memo;
        Ok(())
    }
}

/// Projects the rows of `window`, taking keyed rows from `reuse` when
/// present. The returned memo holds exactly the window's keyed rows.
fn project_window<S: ViewSource>(
    source: &S,
    window: &PageWindow,
    reuse: Option<&HashMap<i64, Row>>,
) -> ViewResult<(Vec<Row>, HashMap<i64, Row>)> {
    let (bottom, top) = window.bounds();
    let mut rows = Vec::with_capacity(top - bottom);
    let mut memo = HashMap::new();
    for index in bottom..top {
        let key = source.row_key(index);
        let cached = key.and_then(|key| reuse.and_then(|reuse| reuse.get(&key)));
        let row = match cached {
            Some(row) => row.clone(),
            None => source.row(index)?,
        };
        if let Some(key) = key {
            memo.insert(key, row.clone());
        }
        rows.push(row);
    }
    Ok((rows, memo))
}
