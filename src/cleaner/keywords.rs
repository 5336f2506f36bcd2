//! Keyword list parsing for form fields and CLI flags

/// Split a comma-separated keyword list, trimming entries and dropping empties
pub fn parse_keyword_list(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .collect()
}

/// Join keywords the way [`parse_keyword_list`] reads them back
pub fn join_keyword_list<S: AsRef<str>>(keywords: &[S]) -> String {
    keywords
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_keyword_list() {
        assert_eq!(
            parse_keyword_list(" DRAFT , Confidential,,  "),
            vec!["DRAFT", "Confidential"]
        );
        assert!(parse_keyword_list("").is_empty());
        assert!(parse_keyword_list(" , ,").is_empty());
    }

    #[test]
    fn test_inner_spaces_are_kept() {
        assert_eq!(
            parse_keyword_list("CONFIDENTIAL DRAFT"),
            vec!["CONFIDENTIAL DRAFT"]
        );
    }

    #[test]
    fn test_join_keyword_list() {
        assert_eq!(join_keyword_list(&["a", "b c"]), "a, b c");
        assert_eq!(join_keyword_list::<String>(&[]), "");
    }
}
