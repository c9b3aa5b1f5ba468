//! Language code canonicalization.

/// Region-qualified codes that collapse onto a single DeepL code.
const LANG_MAP: &[(&str, &str)] = &[("zh-CN", "ZH"), ("zh-TW", "ZH")];

/// Convert a host language code into the form DeepL expects.
///
/// Mapped codes are replaced; everything else is upper-cased.
pub fn convert_lang(src: &str) -> String {
    LANG_MAP
        .iter()
        .find(|(code, _)| *code == src)
        .map(|(_, canonical)| (*canonical).to_string())
        .unwrap_or_else(|| src.to_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn chinese_variants_collapse() {
        assert_eq!(convert_lang("zh-CN"), "ZH");
        assert_eq!(convert_lang("zh-TW"), "ZH");
    }

    #[test]
    fn other_codes_upper_case() {
        assert_eq!(convert_lang("fr"), "FR");
        assert_eq!(convert_lang("en"), "EN");
        assert_eq!(convert_lang("auto"), "AUTO");
        assert_eq!(convert_lang("pt-br"), "PT-BR");
        assert_eq!(convert_lang(""), "");
    }

    #[test]
    fn mapping_is_case_sensitive() {
        // Only the exact region-qualified spellings are mapped.
        assert_eq!(convert_lang("zh-cn"), "ZH-CN");
    }
}
