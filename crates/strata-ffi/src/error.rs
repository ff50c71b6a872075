// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Per-thread last-error text.

use std::cell::RefCell;

thread_local! {
    static LAST_ERROR: RefCell<String> = const { RefCell::new(String::new()) };
}

/// Replaces the calling thread's message.
pub(crate) fn set(message: &str) {
    LAST_ERROR.with(|slot| {
        let mut slot = slot.borrow_mut();
        slot.clear();
        // The C side reads up to the first NUL.
        slot.extend(message.chars().map(|c| if c == '\0' { ' ' } else { c }));
    });
}

/// Empties the calling thread's message.
pub(crate) fn clear() {
    LAST_ERROR.with(|slot| slot.borrow_mut().clear());
}

/// A copy of the calling thread's message.
pub fn last_error() -> Option<String> {
    LAST_ERROR.with(|slot| {
        let slot = slot.borrow();
        (!slot.is_empty()).then(|| slot.clone())
    })
}

/// Copies the message into `buffer`, truncated and NUL-terminated.
///
/// Truncation never splits a UTF-8 sequence.
///
/// ## Returns
/// The length needed to hold the whole message and its terminator, or zero
/// when no error is recorded.
///
/// ## Safety
/// `buffer` must be null or valid for `buffer_len` bytes.
pub(crate) unsafe fn copy_into(buffer: *mut u8, buffer_len: usize) -> usize {
    LAST_ERROR.with(|slot| {
        let slot = slot.borrow();
        let bytes = slot.as_bytes();
        if !buffer.is_null() && buffer_len > 0 {
            let mut count = bytes.len().min(buffer_len - 1);
            while !slot.is_char_boundary(count) {
                count -= 1;
            }
            // SAFETY: the caller guarantees `buffer_len` writable bytes.
            unsafe {
                std::ptr::copy_nonoverlapping(bytes.as_ptr(), buffer, count);
                *buffer.add(count) = 0;
            }
        }
        if bytes.is_empty() {
            0
        } else {
            bytes.len() + 1
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_truncated_with_a_terminator() {
        set("frame already active");
        let mut buffer = [0xffu8; 6];
        let required = unsafe { copy_into(buffer.as_mut_ptr(), buffer.len()) };
        assert_eq!(required, "frame already active".len() + 1);
        assert_eq!(&buffer, b"frame\0");
    }

    #[test]
    fn truncation_keeps_multibyte_characters_whole() {
        // Four bytes of text would end inside the two-byte "é".
        set("café au lait");
        let mut buffer = [0xffu8; 5];
        let required = unsafe { copy_into(buffer.as_mut_ptr(), buffer.len()) };
        assert_eq!(required, "café au lait".len() + 1);
        assert_eq!(&buffer[..4], b"caf\0");
        let text = std::ffi::CStr::from_bytes_until_nul(&buffer).unwrap();
        assert_eq!(text.to_str().unwrap(), "caf");

        let mut exact = [0xffu8; 6];
        unsafe { copy_into(exact.as_mut_ptr(), exact.len()) };
        assert_eq!(&exact, "café\0".as_bytes());
    }

    #[test]
    fn null_buffers_only_report_the_length() {
        set("abc");
        assert_eq!(unsafe { copy_into(std::ptr::null_mut(), 16) }, 4);
        clear();
        assert_eq!(unsafe { copy_into(std::ptr::null_mut(), 0) }, 0);
        assert_eq!(last_error(), None);
    }

    #[test]
    fn each_thread_has_its_own_slot() {
        set("main thread");
        std::thread::spawn(|| {
            assert_eq!(last_error(), None);
            set("worker");
        })
        .join()
        .unwrap();
        assert_eq!(last_error().as_deref(), Some("main thread"));
    }

    #[test]
    fn interior_nul_bytes_are_replaced() {
        set("bad\0name");
        assert_eq!(last_error().as_deref(), Some("bad name"));
    }
}
