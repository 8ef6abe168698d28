//! ANSI escape stripping.
//!
//! Container output and some journal entries carry terminal color codes.
//! They must go before timestamp parsing and grouping, otherwise the same
//! event printed with and without color would land in different groups.

use std::borrow::Cow;

const ESC: u8 = 0x1b;
const BEL: u8 = 0x07;

enum State {
    Text,
    Escape,
    /// `ESC [` … final byte in 0x40..=0x7E.
    Csi,
    /// `ESC ]` … terminated by BEL or `ESC \`.
    Osc,
    OscEscape,
}

/// Remove CSI, OSC and two-byte Fe escape sequences.
///
/// Borrows when the input holds no ESC byte.
pub fn strip_ansi_codes(input: &[u8]) -> Cow<'_, [u8]> {
    if !input.contains(&ESC) {
        return Cow::Borrowed(input);
    }

    let mut out = Vec::with_capacity(input.len());
    let mut state = State::Text;

    for &b in input {
        state = match state {
            State::Text if b == ESC => State::Escape,
            State::Text => {
                out.push(b);
                State::Text
            }
            State::Escape => match b {
                b'[' => State::Csi,
                b']' => State::Osc,
                0x40..=0x5f => State::Text,
                // Not a recognized sequence: keep the byte, drop the ESC.
                _ => {
                    out.push(b);
                    State::Text
                }
            },
            State::Csi if (0x40..=0x7e).contains(&b) => State::Text,
            State::Csi => State::Csi,
            State::Osc if b == BEL => State::Text,
            State::Osc if b == ESC => State::OscEscape,
            State::Osc => State::Osc,
            State::OscEscape if b == b'\\' => State::Text,
            State::OscEscape => State::Osc,
        };
    }

    Cow::Owned(out)
}
