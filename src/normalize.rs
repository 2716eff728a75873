//! Orthographic folding for Arabic text.
//!
//! Every lexical comparison in the engine runs on normalized text, so that
//! "أحمد", "احمد" and "إحمد" are the same token and diacritics never
//! influence a match.

const DISTRICT_PREFIX: &str = "حي ";

/// Folds letter variants without touching ASCII, so it is safe to run over
/// regex sources as well as user text.
pub fn fold_letters(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            // alef with hamza above/below, madda, wasla
            'أ' | 'إ' | 'آ' | 'ٱ' => out.push('ا'),
            // alef maksura and farsi yeh
            'ى' | 'ی' => out.push('ي'),
            'ة' => out.push('ه'),
            'ؤ' => out.push('و'),
            'ئ' => out.push('ي'),
            // tanween, harakat, shadda, sukun, small marks and superscript alef
            '\u{064B}'..='\u{065F}' | '\u{0670}' => {}
            // tatweel
            'ـ' => {}
            '٠'..='٩' => out.push(char::from(b'0' + (c as u32 - '٠' as u32) as u8)),
            '۰'..='۹' => out.push(char::from(b'0' + (c as u32 - '۰' as u32) as u8)),
            _ => out.push(c),
        }
    }
    out
}

/// Canonical form used for matching: folded letters, lowercased Latin.
pub fn normalize(text: &str) -> String {
    fold_letters(text).to_lowercase()
}

/// Strips a leading "حي " from an already normalized name.
pub fn strip_district_prefix(name: &str) -> &str {
    let trimmed = name.trim();
    trimmed
        .strip_prefix(DISTRICT_PREFIX)
        .map(str::trim_start)
        .unwrap_or(trimmed)
}

/// Normalizes a neighborhood name for comparisons that must ignore the
/// "حي " prefix on either side.
pub fn district_key(name: &str) -> String {
    let normalized = normalize(name);
    strip_district_prefix(&normalized).to_string()
}

pub fn token_count(text: &str) -> usize {
    text.split_whitespace().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alef_variants_collapse() {
        assert_eq!(normalize("أحمد"), normalize("احمد"));
        assert_eq!(normalize("إسكان"), "اسكان");
        assert_eq!(normalize("آمنة"), "امنه");
    }

    #[test]
    fn yaa_and_taa_marbuta() {
        assert_eq!(normalize("مستشفى"), "مستشفي");
        assert_eq!(normalize("مدرسة"), "مدرسه");
        assert_eq!(normalize("على"), normalize("علي"));
    }

    #[test]
    fn diacritics_and_tatweel_are_removed() {
        assert_eq!(normalize("مَدْرَسَةٌ"), "مدرسه");
        assert_eq!(normalize("حــي"), "حي");
    }

    #[test]
    fn idempotent() {
        for sample in ["أين توجد مدرسة النور؟", "راتبي ١٥٬٠٠٠ ريال", "OK تمام", ""] {
            let once = normalize(sample);
            assert_eq!(normalize(&once), once);
        }
    }

    #[test]
    fn digits_and_latin_fold() {
        assert_eq!(normalize("٨٠٠٠"), "8000");
        assert_eq!(normalize("OK"), "ok");
    }

    #[test]
    fn fold_letters_keeps_regex_escapes() {
        assert_eq!(fold_letters(r"(\S+) أين"), r"(\S+) اين");
    }

    #[test]
    fn district_prefix_is_optional() {
        assert_eq!(district_key("حي الملقا"), "الملقا");
        assert_eq!(district_key("الملقا"), "الملقا");
        assert_eq!(strip_district_prefix("حيالملقا"), "حيالملقا");
    }
}
