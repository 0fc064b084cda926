//! Session flag set.

use bitflags::bitflags;

bitflags! {
    /// Per-session condition bits.
    #[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SessionFlags: u16 {
        /// Server greeting has been received.
        const CONNECTED = 0b0000_0001;
        /// Server accepted EHLO (SMTP service extensions are available).
        const ESMTP     = 0b0000_0010;
        /// A transcript layer is interposed on the carrier.
        const TRACE     = 0b0000_0100;
        /// The carrier runs over TLS.
        const TLS       = 0b0000_1000;
        /// A multi-line reply is being accumulated.
        const MULTILINE = 0b0001_0000;
        /// Authentication succeeded.
        const AUTH      = 0b0010_0000;
        /// The session is latched in its error state.
        const ERROR     = 0b0100_0000;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_empty() {
        assert!(SessionFlags::default().is_empty());
    }

    #[test]
    fn bits_are_independent() {
        let mut flags = SessionFlags::CONNECTED | SessionFlags::TLS;
        flags.insert(SessionFlags::ESMTP);
        flags.remove(SessionFlags::TLS);
        assert!(flags.contains(SessionFlags::CONNECTED | SessionFlags::ESMTP));
        assert!(!flags.contains(SessionFlags::TLS));
    }
}
