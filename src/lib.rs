// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

pub mod browser;
pub mod capabilities;
pub mod cli;
pub mod commands;
pub mod dates;
pub mod db;
pub mod error;
pub mod extract;
pub mod mapper;
pub mod models;
pub mod paginate;
pub mod scheduler;
pub mod sites;
pub mod telemetry;
pub mod utils;
