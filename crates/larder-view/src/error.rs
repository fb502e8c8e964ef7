// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ViewError {
    /// The backing store failed. Never reported as an empty view.
    #[error("{context}")]
    Query {
        context: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("tree node {path} no longer resolves")]
    StaleNode { path: String },
    #[error("invalid view spec: {0}")]
    InvalidSpec(String),
    #[error("invalid value: {0}")]
    InvalidValue(String),
}

pub type ViewResult<T> = std::result::Result<T, ViewError>;

pub(crate) fn query_failed(context: impl Into<String>) -> impl FnOnce(anyhow::Error) -> ViewError {
    let context = context.into();
    move |source| ViewError::Query { context, source }
}
