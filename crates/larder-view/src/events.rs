// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::sync::mpsc::{self, Receiver, Sender};

use larder_app::SortKey;

use crate::schema::Row;
use crate::tree::TreePath;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSnapshot {
    pub page: usize,
    pub per_page: usize,
    pub length: usize,
    pub last_page: usize,
}

/// Resynchronisation events for whatever renders a view.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewEvent {
    PageChanged(WindowSnapshot),
    ViewChanged { new_length: usize },
    RowChanged { path: TreePath, row: Row },
    /// An expanded node gained or lost children; rows past `new_length`
    /// under `path` are gone.
    ChildrenChanged { path: TreePath, new_length: usize },
    ViewSort(Vec<SortKey<String>>),
}

/// Fan-out of view events to channel subscribers.
///
/// Delivery is synchronous and ordered: every subscriber has received an
/// event by the time `emit` returns. Subscribers whose receiver was dropped
/// are pruned on the next emit.
#[derive(Debug, Default)]
pub struct Notifier {
    subscribers: Vec<Sender<ViewEvent>>,
}

impl Notifier {
    pub fn subscribe(&mut self) -> Receiver<ViewEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    pub(crate) fn emit(&mut self, event: ViewEvent) {
        self.subscribers
            .retain(|subscriber| subscriber.send(event.clone()).is_ok());
    }
}
