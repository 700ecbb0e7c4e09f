// SPDX-License-Identifier: GPL-3.0-only

//! Device backend abstractions

pub mod camera;
