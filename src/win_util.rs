//! Decoding helpers for window-message parameters.
//!
//! Kept free of platform types so they are testable everywhere.

use crate::ink::model::Point;
use crate::ink::pointer::{PointerFlags, PressedButtons};

const POINTER_MESSAGE_FLAG_INCONTACT: u32 = 0x0004;
const POINTER_MESSAGE_FLAG_FIRSTBUTTON: u32 = 0x0010;
const POINTER_MESSAGE_FLAG_SECONDBUTTON: u32 = 0x0020;
const POINTER_MESSAGE_FLAG_THIRDBUTTON: u32 = 0x0040;
const POINTER_MESSAGE_FLAG_PRIMARY: u32 = 0x2000;
const POINTER_MESSAGE_FLAG_CONFIDENCE: u32 = 0x4000;
const POINTER_MESSAGE_FLAG_CANCELED: u32 = 0x8000;

pub fn loword(value: usize) -> u32 {
    (value & 0xffff) as u32
}

pub fn hiword(value: usize) -> u32 {
    ((value >> 16) & 0xffff) as u32
}

/// Signed coordinates packed into an `LPARAM`, as `GET_X/Y_LPARAM` do.
pub fn point_from_lparam(lparam: isize) -> Point {
    let x = (lparam & 0xffff) as i16 as i32;
    let y = ((lparam >> 16) & 0xffff) as i16 as i32;
    Point::new(x, y)
}

pub fn pointer_id_from_wparam(wparam: usize) -> u32 {
    loword(wparam)
}

pub fn wheel_delta_from_wparam(wparam: usize) -> i16 {
    hiword(wparam) as u16 as i16
}

pub fn pointer_flags_from_wparam(wparam: usize) -> PointerFlags {
    let flags = hiword(wparam);
    PointerFlags {
        in_contact: flags & POINTER_MESSAGE_FLAG_INCONTACT != 0,
        primary: flags & POINTER_MESSAGE_FLAG_PRIMARY != 0,
        confidence: flags & POINTER_MESSAGE_FLAG_CONFIDENCE != 0,
        canceled: flags & POINTER_MESSAGE_FLAG_CANCELED != 0,
    }
}

pub fn pointer_buttons_from_wparam(wparam: usize) -> PressedButtons {
    let flags = hiword(wparam);
    PressedButtons {
        primary: flags & POINTER_MESSAGE_FLAG_FIRSTBUTTON != 0,
        secondary: flags & POINTER_MESSAGE_FLAG_SECONDBUTTON != 0,
        middle: flags & POINTER_MESSAGE_FLAG_THIRDBUTTON != 0,
    }
}

pub fn to_wide(value: &str) -> Vec<u16> {
    value.encode_utf16().chain(std::iter::once(0)).collect()
}
