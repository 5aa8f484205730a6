use uuid::Uuid;

/// Lowercase, drop punctuation, collapse whitespace runs to single hyphens.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_hyphen = false;

    for ch in name.trim().chars() {
        let lower = ch.to_ascii_lowercase();
        if lower.is_ascii_alphanumeric() || lower == '_' {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(lower);
        } else if ch.is_whitespace() || ch == '-' {
            pending_hyphen = true;
        }
    }

    slug
}

/// The slug printed in a merchant's QR code: slugified business name plus
/// the first segment of the merchant id, so two "Joe's Coffee" shops never
/// collide. Derived on the fly, never stored.
pub fn unique_slug(business_name: &str, merchant_id: Uuid) -> String {
    let id = merchant_id.to_string();
    let short = id.split('-').next().unwrap_or_default().to_owned();
    format!("{}-{}", slugify(business_name), short)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_drops_punctuation_and_collapses_spaces() {
        assert_eq!(slugify("Joe's Coffee"), "joes-coffee");
        assert_eq!(slugify("  Bagel   Bros #1  "), "bagel-bros-1");
        assert_eq!(slugify("Sweet--Treats"), "sweet-treats");
        assert_eq!(slugify("---"), "");
    }

    #[test]
    fn unique_slug_appends_id_prefix() {
        let id = Uuid::parse_str("a1b2c3d4-0000-4000-8000-000000000000").unwrap();
        assert_eq!(unique_slug("Joe's Coffee", id), "joes-coffee-a1b2c3d4");
    }

    #[test]
    fn unique_slug_is_deterministic() {
        let id = Uuid::new_v4();
        assert_eq!(unique_slug("Cafe Uno", id), unique_slug("Cafe Uno", id));
    }
}
