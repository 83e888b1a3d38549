// SPDX-FileCopyrightText: © 2024 QRLink Contributors <dev@qrlink.dev>
// SPDX-License-Identifier: MIT

#![no_main]

use libfuzzer_sys::fuzz_target;
use qrlink_ur::bytewords::{decode, Style};

fuzz_target!(|data: &str| {
    for style in [Style::Standard, Style::Uri, Style::Minimal] {
        let _ = decode(data, style);
    }
});
