// SPDX-FileCopyrightText: © 2024 QRLink Contributors <dev@qrlink.dev>
// SPDX-License-Identifier: MIT

#![no_main]

use libfuzzer_sys::fuzz_target;
use qrlink_arena::Arena;
use qrlink_urtypes::registry::Terminal;

fuzz_target!(|data: &[u8]| {
    let arena: Arena<_, 32> = Arena::new();
    minicbor::decode_with::<_, Terminal>(data, &mut &arena).ok();
});
