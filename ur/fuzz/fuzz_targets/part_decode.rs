// SPDX-FileCopyrightText: © 2024 QRLink Contributors <dev@qrlink.dev>
// SPDX-License-Identifier: MIT

#![no_main]

use libfuzzer_sys::fuzz_target;
use qrlink_ur::fountain::part::Part;

fuzz_target!(|data: &[u8]| {
    if let Ok(part) = minicbor::decode::<Part>(data) {
        let _ = part.is_valid();
    }
});
