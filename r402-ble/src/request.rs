//! Classification of raw transport writes.
//!
//! Every inbound write is classified exactly once into a [`Request`]:
//! either a payment [`Fragment`] (case-sensitive `X-PAYMENT` tags) or an
//! informational [`Command`] (case-insensitive bracketed tags). Anything
//! that matches neither is a price query.

/// Tag opening a payment assembly.
pub const START_TAG: &[u8] = b"X-PAYMENT:START";

/// Tag closing a payment assembly.
pub const END_TAG: &[u8] = b"X-PAYMENT:END";

/// Tag of a middle payment fragment. Also the common prefix of the other two.
pub const CHUNK_TAG: &[u8] = b"X-PAYMENT";

/// Position of a fragment within a payment assembly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Marker {
    /// First fragment; resets any assembly in progress.
    Start,
    /// Continuation fragment.
    Middle,
    /// Final fragment; completes the assembly.
    End,
}

/// One piece of a fragmented payment payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fragment<'a> {
    /// Where this fragment sits in the assembly.
    pub marker: Marker,
    /// The bytes following the tag.
    pub data: &'a [u8],
}

impl<'a> Fragment<'a> {
    /// Classifies `raw` as a payment fragment, or returns `None` if it
    /// carries none of the payment tags.
    ///
    /// Tags are matched case-sensitively in the order start, end, chunk.
    #[must_use]
    pub fn classify(raw: &'a [u8]) -> Option<Self> {
        [
            (START_TAG, Marker::Start),
            (END_TAG, Marker::End),
            (CHUNK_TAG, Marker::Middle),
        ]
        .into_iter()
        .find_map(|(tag, marker)| {
            raw.strip_prefix(tag)
                .map(|data| Self { marker, data })
        })
    }
}

/// An informational request answered by the [`router`](crate::router).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// `[LOGO]`
    Logo,
    /// `[BANNER]`
    Banner,
    /// `[DESC]`
    Description,
    /// `[CONFIG]`
    Config,
    /// `[OPTIONS]`
    Options,
    /// Anything else: a price and terms query.
    Quote,
}

impl Command {
    /// Recognized tags in precedence order. First match wins.
    pub const TAGS: [(&'static str, Self); 5] = [
        ("[LOGO]", Self::Logo),
        ("[BANNER]", Self::Banner),
        ("[DESC]", Self::Description),
        ("[CONFIG]", Self::Config),
        ("[OPTIONS]", Self::Options),
    ];

    /// Classifies `raw` by case-insensitive prefix. Total: unknown input is
    /// [`Command::Quote`].
    #[must_use]
    pub fn classify(raw: &[u8]) -> Self {
        Self::TAGS
            .iter()
            .find(|(tag, _)| {
                raw.get(..tag.len())
                    .is_some_and(|prefix| prefix.eq_ignore_ascii_case(tag.as_bytes()))
            })
            .map_or(Self::Quote, |&(_, command)| command)
    }
}

/// A classified inbound write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request<'a> {
    /// A piece of a payment payload, for the reassembler.
    Payment(Fragment<'a>),
    /// Anything else, for the command router.
    Command(Command),
}

impl<'a> Request<'a> {
    /// Classifies a raw write.
    #[must_use]
    pub fn classify(raw: &'a [u8]) -> Self {
        Fragment::classify(raw).map_or_else(|| Self::Command(Command::classify(raw)), Self::Payment)
    }
}
