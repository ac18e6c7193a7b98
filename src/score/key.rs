/// Display names are cut to this many characters.
pub const NAME_LIMIT: usize = 40;

/// Trims the submitted name and caps it at [`NAME_LIMIT`] characters.
pub fn display_name(name: &str) -> String {
    name.trim().chars().take(NAME_LIMIT).collect()
}

/// Derives the storage key for a player name.
///
/// The name is lowercased and every run of characters outside `[a-z0-9]` becomes
/// a single hyphen, with no hyphen at either end: `"Bob Smith!!"` and
/// `"bob   smith"` both give `"bob-smith"`. Applying it to its own output
/// changes nothing.
pub fn canonical_key(name: &str) -> String {
    let mut key = String::with_capacity(name.len());
    let mut separated = false;

    for c in name.trim().chars().flat_map(char::to_lowercase) {
        if c.is_ascii_alphanumeric() {
            if separated && !key.is_empty() {
                key.push('-');
            }
            separated = false;
            key.push(c);
        } else {
            separated = true;
        }
    }

    key
}
