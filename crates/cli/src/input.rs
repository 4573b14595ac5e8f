// SPDX-License-Identifier: MIT

//! JSON-body-from-arg-or-stdin helper, grounded on the teacher's
//! `emit::AgentDone` payload handling ("JSON payload... if omitted, reads
//! from stdin").

use std::io::Read;

pub fn read_json_payload(payload: Option<String>) -> anyhow::Result<String> {
    match payload {
        Some(s) => Ok(s),
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
    }
}
