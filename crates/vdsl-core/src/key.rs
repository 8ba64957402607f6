//! Output key normalization.

/// Suffix for the near-end (modem) half of a paired field.
pub const NEAR_SUFFIX: &str = "_near";
/// Suffix for the far-end (DSLAM) half of a paired field.
pub const FAR_SUFFIX: &str = "_far";

/// Turn a field label or description into a record key.
///
/// Lowercases, collapses any run of spaces into one, then replaces spaces
/// with underscores: `"FE  ES Count"` becomes `"fe_es_count"`.
pub fn normalize(text: &str) -> String {
    let mut key = String::with_capacity(text.len());
    let mut previous_space = false;

    for c in text.chars() {
        if c == ' ' {
            if !previous_space {
                key.push('_');
            }
            previous_space = true;
        } else {
            key.extend(c.to_lowercase());
            previous_space = false;
        }
    }

    key
}

/// Keys of the two halves of a paired field.
pub fn paired(base: &str) -> (String, String) {
    (
        format!("{}{}", base, NEAR_SUFFIX),
        format!("{}{}", base, FAR_SUFFIX),
    )
}
