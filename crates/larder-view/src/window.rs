// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::error::{ViewError, ViewResult};
use crate::events::WindowSnapshot;

/// Page number, page size and source length. `page` is always within
/// `[0, last_page]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    page: usize,
    per_page: usize,
    length: usize,
}

impl PageWindow {
    pub fn new(per_page: usize) -> ViewResult<Self> {
        if per_page == 0 {
            return Err(ViewError::InvalidSpec(
                "per_page must be positive".to_owned(),
            ));
        }
        Ok(Self {
            page: 0,
            per_page,
            length: 0,
        })
    }

    pub const fn page(&self) -> usize {
        self.page
    }

    pub const fn per_page(&self) -> usize {
        self.per_page
    }

    pub const fn len(&self) -> usize {
        self.length
    }

    pub const fn is_empty(&self) -> bool {
        self.length == 0
    }

    pub const fn last_page(&self) -> usize {
        if self.length == 0 {
            0
        } else {
            (self.length - 1) / self.per_page
        }
    }

    pub fn set_page(&mut self, page: usize) {
        self.page = page.min(self.last_page());
    }

    pub fn next(&mut self) -> bool {
        if self.page >= self.last_page() {
            return false;
        }
        self.page += 1;
        true
    }

    pub fn prev(&mut self) -> bool {
        if self.page == 0 {
            return false;
        }
        self.page -= 1;
        true
    }

    /// Updates the length and re-clamps; returns whether the page moved.
    pub fn set_length(&mut self, length: usize) -> bool {
        self.length = length;
        let before = self.page;
        self.page = self.page.min(self.last_page());
        self.page != before
    }

    /// Absolute `[bottom, top)` of the current page.
    pub fn bounds(&self) -> (usize, usize) {
        let bottom = (self.page * self.per_page).min(self.length);
        let top = (bottom + self.per_page).min(self.length);
        (bottom, top)
    }

    /// 1-indexed first row, last row and total, or all zeros when empty.
    pub fn showing(&self) -> (usize, usize, usize) {
        if self.length == 0 {
            return (0, 0, 0);
        }
        let (bottom, top) = self.bounds();
        (bottom + 1, top, self.length)
    }

    pub fn status_text(&self, noun: &str) -> String {
        if self.length <= self.per_page {
            return format!("{} {noun}", self.length);
        }
        let (first, last, total) = self.showing();
        format!("Showing {noun} {first} to {last} of {total}")
    }

    pub fn snapshot(&self) -> WindowSnapshot {
        WindowSnapshot {
            page: self.page,
            per_page: self.per_page,
            length: self.length,
            last_page: self.last_page(),
        }
    }
}
