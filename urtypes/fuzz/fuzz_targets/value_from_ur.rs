// SPDX-FileCopyrightText: © 2024 QRLink Contributors <dev@qrlink.dev>
// SPDX-License-Identifier: MIT

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use qrlink_urtypes::value::Value;

#[derive(Debug, Arbitrary)]
pub struct Data<'a> {
    pub ur_type: &'a str,
    pub payload: &'a [u8],
}

fuzz_target!(|data: Data| {
    Value::from_ur(data.ur_type, data.payload).ok();
});
