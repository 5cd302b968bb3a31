//! Per-connection reassembly of fragmented payment payloads.
//!
//! The transport caps each write at a few hundred bytes, so a signed payment
//! arrives as `X-PAYMENT:START…`, zero or more `X-PAYMENT…`, then
//! `X-PAYMENT:END…`. The transport delivers one connection's writes in order
//! and without loss; nothing here checks lengths, checksums or sequence
//! numbers.
//!
//! A START always wins: it discards whatever partial assembly was in
//! progress, since the sender may have restarted after an error the device
//! cannot see. A middle or end fragment without a START is a protocol
//! violation and resets the buffer.

use crate::error::ReassemblyError;
use crate::request::{Fragment, Marker};

/// Default upper bound on an assembled payload.
pub const DEFAULT_MAX_PAYLOAD_BYTES: usize = 8 * 1024;

/// Capacity reserved on the first START, sized for a typical signed payload.
const INITIAL_CAPACITY: usize = 1024;

/// Result of feeding one fragment to a [`Reassembler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assembly<'a> {
    /// More fragments are expected.
    Incomplete,
    /// The END fragment arrived; this is the full payload.
    ///
    /// The bytes stay in the reassembler until the next fragment or
    /// [`Reassembler::reset`].
    Complete(&'a [u8]),
}

/// Fragment reassembly state for one connection.
#[derive(Debug)]
pub struct Reassembler {
    content: Vec<u8>,
    in_progress: bool,
    max_payload: usize,
}

impl Default for Reassembler {
    fn default() -> Self {
        Self::new()
    }
}

impl Reassembler {
    /// Creates an idle reassembler with the default payload limit.
    #[must_use]
    pub const fn new() -> Self {
        Self::with_max_payload(DEFAULT_MAX_PAYLOAD_BYTES)
    }

    /// Creates an idle reassembler that rejects payloads over `max_payload` bytes.
    #[must_use]
    pub const fn with_max_payload(max_payload: usize) -> Self {
        Self {
            content: Vec::new(),
            in_progress: false,
            max_payload,
        }
    }

    /// Feeds one fragment.
    ///
    /// # Errors
    ///
    /// Returns [`ReassemblyError::UnexpectedChunk`] for a middle or end
    /// fragment with no assembly in progress, [`ReassemblyError::PayloadTooLarge`]
    /// when the payload limit would be exceeded and
    /// [`ReassemblyError::OutOfMemory`] when the buffer cannot grow. The
    /// reassembler is reset and idle after any error.
    pub fn on_fragment(&mut self, fragment: Fragment<'_>) -> Result<Assembly<'_>, ReassemblyError> {
        if !self.in_progress {
            // Drops a payload completed on the previous call.
            self.content.clear();
        }

        match fragment.marker {
            Marker::Start => {
                self.content.clear();
                if self.content.capacity() == 0 {
                    // Best effort; `append` reports a real shortage.
                    let _ = self.content.try_reserve(INITIAL_CAPACITY.min(self.max_payload));
                }
                self.in_progress = true;
                self.append(fragment.data)?;
                Ok(Assembly::Incomplete)
            }
            Marker::Middle => {
                self.expect_in_progress(Marker::Middle)?;
                self.append(fragment.data)?;
                Ok(Assembly::Incomplete)
            }
            Marker::End => {
                self.expect_in_progress(Marker::End)?;
                self.append(fragment.data)?;
                self.in_progress = false;
                Ok(Assembly::Complete(&self.content))
            }
        }
    }

    /// Discards any buffered bytes and returns to idle. Keeps the buffer's
    /// capacity for the next assembly.
    pub fn reset(&mut self) {
        self.content.clear();
        self.in_progress = false;
    }

    /// Returns `true` between a START and the following END.
    #[must_use]
    pub const fn is_in_progress(&self) -> bool {
        self.in_progress
    }

    /// Number of bytes currently buffered.
    #[must_use]
    pub const fn buffered_len(&self) -> usize {
        self.content.len()
    }

    /// The configured payload limit in bytes.
    #[must_use]
    pub const fn max_payload(&self) -> usize {
        self.max_payload
    }

    fn expect_in_progress(&mut self, marker: Marker) -> Result<(), ReassemblyError> {
        if self.in_progress {
            Ok(())
        } else {
            self.reset();
            Err(ReassemblyError::UnexpectedChunk { marker })
        }
    }

    fn append(&mut self, data: &[u8]) -> Result<(), ReassemblyError> {
        if self.content.len().saturating_add(data.len()) > self.max_payload {
            self.reset();
            return Err(ReassemblyError::PayloadTooLarge {
                limit: self.max_payload,
            });
        }
        if self.content.try_reserve(data.len()).is_err() {
            self.reset();
            return Err(ReassemblyError::OutOfMemory);
        }
        self.content.extend_from_slice(data);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn start(data: &[u8]) -> Fragment<'_> {
        Fragment {
            marker: Marker::Start,
            data,
        }
    }

    fn middle(data: &[u8]) -> Fragment<'_> {
        Fragment {
            marker: Marker::Middle,
            data,
        }
    }

    fn end(data: &[u8]) -> Fragment<'_> {
        Fragment {
            marker: Marker::End,
            data,
        }
    }

    #[test]
    fn test_start_middle_end_completes_once() {
        let mut r = Reassembler::new();
        assert_eq!(r.on_fragment(start(b"aa")), Ok(Assembly::Incomplete));
        assert_eq!(r.on_fragment(middle(b"bb")), Ok(Assembly::Incomplete));
        assert_eq!(r.on_fragment(middle(b"")), Ok(Assembly::Incomplete));
        assert_eq!(r.on_fragment(end(b"cc")), Ok(Assembly::Complete(b"aabbcc")));
        assert!(!r.is_in_progress());
    }

    #[test]
    fn test_start_then_end_without_middle() {
        let mut r = Reassembler::new();
        r.on_fragment(start(b"{\"x402")).unwrap();
        assert_eq!(
            r.on_fragment(end(b"Version\":1}")),
            Ok(Assembly::Complete(b"{\"x402Version\":1}"))
        );
    }

    #[test]
    fn test_middle_without_start_is_rejected() {
        let mut r = Reassembler::new();
        assert_eq!(
            r.on_fragment(middle(b"xx")),
            Err(ReassemblyError::UnexpectedChunk {
                marker: Marker::Middle
            })
        );
        assert!(!r.is_in_progress());
        assert_eq!(r.buffered_len(), 0);
    }

    #[test]
    fn test_end_without_start_is_rejected() {
        let mut r = Reassembler::new();
        assert_eq!(
            r.on_fragment(end(b"xx")),
            Err(ReassemblyError::UnexpectedChunk {
                marker: Marker::End
            })
        );
        assert!(!r.is_in_progress());
        assert_eq!(r.buffered_len(), 0);
    }

    #[test]
    fn test_fragment_after_completion_is_out_of_sequence() {
        let mut r = Reassembler::new();
        r.on_fragment(start(b"a")).unwrap();
        r.on_fragment(end(b"b")).unwrap();
        assert!(r.on_fragment(middle(b"c")).is_err());
        assert_eq!(r.buffered_len(), 0);
    }

    #[test]
    fn test_second_start_discards_partial() {
        let mut r = Reassembler::new();
        r.on_fragment(start(b"stale")).unwrap();
        r.on_fragment(middle(b"-stale")).unwrap();
        r.on_fragment(start(b"fresh")).unwrap();
        assert_eq!(r.on_fragment(end(b"!")), Ok(Assembly::Complete(b"fresh!")));
    }

    #[test]
    fn test_payload_limit() {
        let mut r = Reassembler::with_max_payload(4);
        r.on_fragment(start(b"ab")).unwrap();
        assert_eq!(
            r.on_fragment(middle(b"cde")),
            Err(ReassemblyError::PayloadTooLarge { limit: 4 })
        );
        assert!(!r.is_in_progress());
        assert_eq!(r.buffered_len(), 0);

        r.on_fragment(start(b"ab")).unwrap();
        assert_eq!(r.on_fragment(end(b"cd")), Ok(Assembly::Complete(b"abcd")));
    }

    #[test]
    fn test_completed_payload_cleared_on_next_fragment() {
        let mut r = Reassembler::new();
        r.on_fragment(start(b"one")).unwrap();
        r.on_fragment(end(b"")).unwrap();
        assert_eq!(r.buffered_len(), 3);
        r.on_fragment(start(b"two")).unwrap();
        assert_eq!(r.buffered_len(), 3);
        assert_eq!(r.on_fragment(end(b"!")), Ok(Assembly::Complete(b"two!")));
    }
}
