// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

pub mod delete;
pub mod fetch;
pub mod list;

pub use delete::delete_command;
pub use fetch::{LATEST, backup_fetch_command};
pub use list::backup_list_command;
