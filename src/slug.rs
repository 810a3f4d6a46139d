/// Lowercases, drops punctuation, joins words with single dashes and trims
/// dashes from both ends. Whitespace, `_` and `-` separate words; any other
/// symbol is removed without leaving a gap.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_dash = false;

    for ch in title.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch.to_ascii_lowercase());
        } else if ch.is_whitespace() || ch == '_' || ch == '-' {
            pending_dash = true;
        }
    }

    slug
}

/// Picks `base`, or `base-1`, `base-2`, ... until `is_taken` reports a free slot.
pub fn unique_slug<F>(title: &str, mut is_taken: F) -> Result<String, diesel::result::Error>
where
    F: FnMut(&str) -> Result<bool, diesel::result::Error>,
{
    let mut base = slugify(title);
    if base.is_empty() {
        base = "job".to_string();
    }

    if !is_taken(&base)? {
        return Ok(base);
    }

    let mut suffix = 1;
    loop {
        let candidate = format!("{base}-{suffix}");
        if !is_taken(&candidate)? {
            return Ok(candidate);
        }
        suffix += 1;
    }
}
