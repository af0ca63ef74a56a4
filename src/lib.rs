// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! memesmith - place captions over an image and export a flattened PNG.
//!
//! The editor core (`models`, `controller`, `render`) is independent of the
//! windowing layer; `app` and `ui` host it in an eframe window.

pub mod app;
pub mod config;
pub mod controller;
pub mod error;
pub mod io;
pub mod models;
pub mod render;
pub mod state;
pub mod ui;
pub mod util;
