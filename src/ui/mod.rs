// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! UI components for the memesmith application.

pub mod canvas;
pub mod feed;
pub mod notifications;
pub mod properties;
pub mod submit;
pub mod toolbar;
