//! Absolute links embedded in notifications.

use url::Url;

use super::{InvitationKind, InvitationToken, ResponseToken};

/// Builds public URLs from the configured base.
#[derive(Debug, Clone)]
pub struct PublicLinks {
    base: Url,
}

impl PublicLinks {
    /// Use `base` as the origin for every link.
    ///
    /// A missing trailing slash is added so relative joins keep any path
    /// prefix the deployment is mounted under.
    pub fn new(base: &str) -> Result<Self, url::ParseError> {
        let mut base = Url::parse(base)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self { base })
    }

    /// `/borrow-approval/{token}`.
    #[must_use]
    pub fn borrow_approval(&self, token: &ResponseToken) -> String {
        self.join(&format!("borrow-approval/{token}"))
    }

    /// `/invite/{token}` for libraries, `/invitations/{token}` for branches.
    #[must_use]
    pub fn invitation(&self, kind: InvitationKind, token: &InvitationToken) -> String {
        self.join(&format!("{}/{token}", kind.redemption_path_segment()))
    }

    fn join(&self, relative: &str) -> String {
        self.base
            .join(relative)
            .map_or_else(|_| format!("{}{relative}", self.base), String::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("https://lend.example.org", "https://lend.example.org/borrow-approval/")]
    #[case("https://example.org/app", "https://example.org/app/borrow-approval/")]
    #[case("https://example.org/app/", "https://example.org/app/borrow-approval/")]
    fn approval_links_respect_mount_path(#[case] base: &str, #[case] prefix: &str) {
        let links = PublicLinks::new(base).expect("base url");
        let token = ResponseToken::generate();
        assert_eq!(links.borrow_approval(&token), format!("{prefix}{token}"));
    }

    #[test]
    fn invitation_links_use_kind_specific_paths() {
        let links = PublicLinks::new("https://example.org").expect("base url");
        let token = InvitationToken::generate();
        assert_eq!(
            links.invitation(InvitationKind::Library, &token),
            format!("https://example.org/invite/{token}")
        );
        assert_eq!(
            links.invitation(InvitationKind::Branch, &token),
            format!("https://example.org/invitations/{token}")
        );
    }

    #[test]
    fn rejects_relative_base() {
        assert!(PublicLinks::new("/relative").is_err());
    }
}
