//! NNTP response types.

use std::fmt;

/// Selected newsgroup summary from `GROUP` (211).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupInfo {
    /// Estimated number of articles.
    pub count: u64,
    /// Low water mark.
    pub low: u64,
    /// High water mark.
    pub high: u64,
    /// Group name as echoed by the server.
    pub name: String,
}

/// Article number and message-id, as reported by `STAT`, `NEXT`, `LAST`
/// and the article retrieval commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticlePointer {
    /// Article number; 0 when the article was requested by message-id.
    pub number: u64,
    /// Message-id including angle brackets.
    pub message_id: String,
}

/// Article data from `ARTICLE`, `HEAD` or `BODY`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Article {
    /// Which article the server returned.
    pub pointer: ArticlePointer,
    /// Un-stuffed content with CRLF line endings.
    pub content: Vec<u8>,
}

/// How an article is addressed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArticleId {
    /// The current article of the selected group.
    Current,
    /// Article number in the selected group.
    Number(u64),
    /// Message-id, angle brackets included.
    MessageId(String),
}

impl From<u64> for ArticleId {
    fn from(n: u64) -> Self {
        Self::Number(n)
    }
}

impl From<&str> for ArticleId {
    fn from(id: &str) -> Self {
        Self::MessageId(id.to_string())
    }
}

/// Posting status of a group in `LIST ACTIVE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostingStatus {
    /// `y`: posting permitted.
    Allowed,
    /// `n`: posting not permitted.
    Denied,
    /// `m`: postings are moderated.
    Moderated,
    /// Any other status letter.
    Other(char),
}

impl PostingStatus {
    /// Parses the status field.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "y" => Self::Allowed,
            "n" => Self::Denied,
            "m" => Self::Moderated,
            other => Self::Other(other.chars().next().unwrap_or('?')),
        }
    }
}

/// One line of `LIST ACTIVE`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveGroup {
    /// Group name.
    pub name: String,
    /// High water mark.
    pub high: u64,
    /// Low water mark.
    pub low: u64,
    /// Posting status.
    pub status: PostingStatus,
}

/// Server time from `DATE` (111), always UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ServerDate {
    /// Four-digit year.
    pub year: u16,
    /// Month, 1 to 12.
    pub month: u8,
    /// Day of month, 1 to 31.
    pub day: u8,
    /// Hour, 0 to 23.
    pub hour: u8,
    /// Minute, 0 to 59.
    pub minute: u8,
    /// Second, 0 to 60.
    pub second: u8,
}

impl fmt::Display for ServerDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02} UTC",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )
    }
}
