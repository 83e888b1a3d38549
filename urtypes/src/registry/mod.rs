// SPDX-FileCopyrightText: © 2024 QRLink Contributors <dev@qrlink.dev>
// SPDX-License-Identifier: MIT

//! Uniform Resources registry shapes.

mod address;
mod bip39;
mod coininfo;
mod eckey;
mod hdkey;
mod keypath;
mod output;

pub use self::address::*;
pub use self::bip39::*;
pub use self::coininfo::*;
pub use self::eckey::*;
pub use self::hdkey::*;
pub use self::keypath::*;
pub use self::output::*;
