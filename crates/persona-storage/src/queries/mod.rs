// SPDX-FileCopyrightText: 2026 Persona Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query modules for the profile store tables.

pub mod jobs;
pub mod memories;
pub mod subjects;
