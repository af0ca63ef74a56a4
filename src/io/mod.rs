// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! I/O: image decoding and template fetching, settings files and the
//! backend collaborator.

pub mod backend;
pub mod media;
pub mod serialization;
