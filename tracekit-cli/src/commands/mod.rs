// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! CLI Commands

pub mod exposures;
pub mod keys;
pub mod provide;
pub mod run;
pub mod session;
pub mod status;
pub mod uninstall;
