//! Login success detection
//!
//! The portal gives no structured signal for a successful login. The only
//! evidence is markup that appears on the post-login page (a user label or a
//! welcome banner), so every caller goes through [`is_authenticated`].

/// True when `body` contains at least one non-empty marker.
pub fn is_authenticated<S: AsRef<str>>(body: &str, markers: &[S]) -> bool {
    markers
        .iter()
        .map(AsRef::as_ref)
        .filter(|m| !m.is_empty())
        .any(|m| body.contains(m))
}
