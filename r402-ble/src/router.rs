//! Informational command replies.

use crate::profile::DeviceProfile;
use crate::reply::Reply;
use crate::request::Command;

/// Answers an informational command from the device profile.
///
/// Pure and total: every [`Command`] has a reply, and nothing here touches
/// the network or the payment pipeline.
#[must_use]
pub fn route(command: Command, profile: &DeviceProfile) -> Reply {
    match command {
        Command::Logo => Reply::Logo(profile.logo().to_owned()),
        Command::Banner => Reply::Banner(profile.banner().to_owned()),
        Command::Description => Reply::Description(profile.description().to_owned()),
        Command::Config => Reply::Config {
            frequency: profile.frequency(),
            allow_custom_content: profile.allow_custom_content(),
        },
        Command::Options => Reply::Options(profile.options().to_vec()),
        Command::Quote => {
            let terms = profile.terms();
            Reply::Quote {
                price: terms.amount().to_owned(),
                pay_to: terms.pay_to().to_owned(),
                network: terms.network().to_owned(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terms::PaymentTerms;
    use std::sync::Arc;

    fn profile() -> DeviceProfile {
        let terms = PaymentTerms::new("base-sepolia", "0xABC", "1000000").unwrap();
        DeviceProfile::new("Coffee Machine", Arc::new(terms))
            .with_logo("https://example.com/logo.png")
            .with_banner("https://example.com/banner.png")
            .with_description("Fresh coffee")
            .with_options(["small", "large"])
            .with_frequency(7)
            .with_custom_content(true)
    }

    fn route_raw(raw: &[u8]) -> String {
        route(Command::classify(raw), &profile()).to_string()
    }

    #[test]
    fn test_tag_case_is_ignored() {
        let upper = route_raw(b"[LOGO]");
        assert_eq!(upper, "LOGO://https://example.com/logo.png");
        assert_eq!(route_raw(b"[logo]"), upper);
        assert_eq!(route_raw(b"[LoGo]"), upper);
    }

    #[test]
    fn test_profile_replies() {
        assert_eq!(route_raw(b"[BANNER]"), "BANNER://https://example.com/banner.png");
        assert_eq!(route_raw(b"[desc]"), "DESC://Fresh coffee");
        assert_eq!(
            route_raw(b"[CONFIG]"),
            r#"CONFIG://{"frequency":7,"allowCustomContent":true}"#
        );
        assert_eq!(route_raw(b"[OPTIONS]"), "OPTIONS://small,large");
    }

    #[test]
    fn test_unrecognized_is_quote() {
        assert_eq!(
            route_raw(b"anything-unrecognized"),
            r#"402://{"price":"1000000","payTo":"0xABC","network":"base-sepolia"}"#
        );
    }
}
