//! Turkish-aware text folding shared by the classifiers.

/// Lowercase using Turkish casing rules.
///
/// `İ` folds to `i` and `I` folds to `ı`, so "İHALE İLANI" becomes
/// "ihale ilanı" rather than the dotted-i sequence the default Unicode
/// mapping produces.
pub fn turkish_lowercase(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            'İ' => out.push('i'),
            'I' => out.push('ı'),
            other => out.extend(other.to_lowercase()),
        }
    }
    out
}

/// Lowercase and replace Turkish letters with their ASCII base.
///
/// Filenames are written inconsistently ("Şartname", "sartname",
/// "SARTNAME"), so matching happens on this folded form.
pub fn fold_ascii(text: &str) -> String {
    turkish_lowercase(text)
        .chars()
        .map(|c| match c {
            'ç' => 'c',
            'ğ' => 'g',
            'ı' => 'i',
            'ö' => 'o',
            'ş' => 's',
            'ü' => 'u',
            'â' => 'a',
            'î' => 'i',
            'û' => 'u',
            other => other,
        })
        .collect()
}

/// The first `max_chars` characters of `text`, on a char boundary.
pub fn leading_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turkish_lowercase() {
        assert_eq!(turkish_lowercase("İHALE İLANI"), "ihale ilanı");
        assert_eq!(turkish_lowercase("Teknik ŞARTNAME"), "teknik şartname");
    }

    #[test]
    fn test_fold_ascii() {
        assert_eq!(fold_ascii("Teknik_Şartname.PDF"), "teknik_sartname.pdf");
        assert_eq!(fold_ascii("SÖZLEŞME Tasarısı"), "sozlesme tasarisi");
    }

    #[test]
    fn test_leading_chars_respects_boundaries() {
        assert_eq!(leading_chars("şişe", 2), "şi");
        assert_eq!(leading_chars("abc", 10), "abc");
    }
}
