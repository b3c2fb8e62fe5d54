//! Admin endpoints. Every route requires the `admin` role via the
//! [`crate::auth::AdminUser`] extractor.

pub mod categories;
pub mod inventory;
pub mod orders;
pub mod products;

/// Lowercase, hyphen-separated slug from a display name.
pub(crate) fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut last_was_dash = true;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_was_dash = false;
        } else if !last_was_dash {
            slug.push('-');
            last_was_dash = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::slugify;

    #[test]
    fn slugify_collapses_punctuation() {
        assert_eq!(slugify("Wireless Mouse"), "wireless-mouse");
        assert_eq!(slugify("  Fancy!! Socks  "), "fancy-socks");
        assert_eq!(slugify("Café au lait"), "caf-au-lait");
    }
}
