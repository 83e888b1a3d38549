// SPDX-FileCopyrightText: © 2024 QRLink Contributors <dev@qrlink.dev>
// SPDX-License-Identifier: MIT

#![no_main]

use libfuzzer_sys::fuzz_target;
use qrlink_ur::UR;

fuzz_target!(|data: &str| {
    let _ = UR::parse(data);
});
