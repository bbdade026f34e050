// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

pub mod api;
pub mod cli;
pub mod completion;
pub mod config;
pub mod controller;
pub mod document;
pub mod error;
pub mod phase;
pub mod progress;
pub mod retry;
pub mod runtime;
pub mod session;
pub mod snapshot;
pub mod stream;
pub mod test_support;
pub mod wire;
