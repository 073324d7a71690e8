use bytes::Bytes;

use crate::error::Error;

const ALERT_LEVEL_WARNING: u8 = 1;
const ALERT_DESCRIPTION_CLOSE_NOTIFY: u8 = 0;

/// Builds the two-byte `close_notify` alert body (a warning-level alert,
/// per RFC 8446 §6.1).
pub fn encode_close_notify() -> Bytes {
    Bytes::from_static(&[ALERT_LEVEL_WARNING, ALERT_DESCRIPTION_CLOSE_NOTIFY])
}

/// Parses a two-byte alert record body into `(level, description)`.
pub fn parse_alert(body: &[u8]) -> Result<(u8, u8), Error> {
    if body.len() != 2 {
        return Err(Error::decode("alert body must be exactly 2 bytes"));
    }
    Ok((body[0], body[1]))
}

/// Only a warning-level close_notify is a clean EOF; a fatal-level alert is
/// always fatal regardless of its description (§7: "Fatal if level=fatal").
pub fn is_close_notify(level: u8, description: u8) -> bool {
    level == ALERT_LEVEL_WARNING && description == ALERT_DESCRIPTION_CLOSE_NOTIFY
}
