// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Data model: the editable composition, the template catalog, the
//! meme records handed to the backend and the community data around them.

pub mod composition;
pub mod meme;
pub mod social;
pub mod template;
