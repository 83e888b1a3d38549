// SPDX-FileCopyrightText: © 2024 QRLink Contributors <dev@qrlink.dev>
// SPDX-License-Identifier: MIT

#![no_main]

use libfuzzer_sys::fuzz_target;
use qrlink_urtypes::registry::Address;

fuzz_target!(|data: &[u8]| {
    minicbor::decode::<Address>(data).ok();
});
