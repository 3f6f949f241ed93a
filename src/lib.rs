// SPDX-License-Identifier: MIT

pub mod bank;
pub mod flow;
