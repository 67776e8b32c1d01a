// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

// Library entry exposing the expansion core, shipped libraries and driver.
pub mod core;
pub mod libraries;
pub mod registry_defaults;
pub mod translator;
