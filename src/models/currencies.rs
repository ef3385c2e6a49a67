use std::collections::HashMap;

/// A currency the rates service knows about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub code: String,
    pub name: String,
    pub localized_name: Option<String>,
}

impl DirectoryEntry {
    pub fn new(code: &str, name: &str, localized: &HashMap<String, String>) -> Self {
        Self {
            code: code.to_string(),
            name: name.to_string(),
            localized_name: localized.get(code).cloned(),
        }
    }

    pub fn display_name(&self) -> &str {
        self.localized_name.as_deref().unwrap_or(&self.name)
    }

    /// "{name} - {code}", preferring the localized name.
    pub fn label(&self) -> String {
        format!("{} - {}", self.display_name(), self.code)
    }
}

/// Full list of supported currencies, in the order the service returned them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CurrencyDirectory {
    entries: Vec<DirectoryEntry>,
}

impl CurrencyDirectory {
    pub fn new(entries: Vec<DirectoryEntry>) -> Self {
        Self { entries }
    }

    pub fn from_supported_codes(
        codes: &[(String, String)],
        localized: &HashMap<String, String>,
    ) -> Self {
        Self::new(
            codes
                .iter()
                .map(|(code, name)| DirectoryEntry::new(code, name, localized))
                .collect(),
        )
    }

    /// Shortlist without English names; labels fall back to the code itself.
    pub fn popular(codes: &[String], localized: &HashMap<String, String>) -> Self {
        Self::new(
            codes
                .iter()
                .map(|code| DirectoryEntry::new(code, code, localized))
                .collect(),
        )
    }

    pub fn entries(&self) -> &[DirectoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries whose label contains `query`, ignoring case. An empty query matches everything.
    pub fn search(&self, query: &str) -> Vec<&DirectoryEntry> {
        if query.is_empty() {
            return self.entries.iter().collect();
        }
        let needle = query.to_lowercase();
        self.entries
            .iter()
            .filter(|entry| entry.label().to_lowercase().contains(&needle))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn localized() -> HashMap<String, String> {
        HashMap::from([
            ("USD".to_string(), "Доллар".to_string()),
            ("RUB".to_string(), "Рубль".to_string()),
        ])
    }

    fn directory() -> CurrencyDirectory {
        let codes = [
            ("AED", "UAE Dirham"),
            ("EUR", "Euro"),
            ("RUB", "Russian Ruble"),
            ("USD", "United States Dollar"),
            ("AUD", "Australian Dollar"),
        ]
        .iter()
        .map(|(c, n)| (c.to_string(), n.to_string()))
        .collect::<Vec<_>>();
        CurrencyDirectory::from_supported_codes(&codes, &localized())
    }

    #[test]
    fn test_labels_prefer_localized_names() {
        let dir = directory();
        let labels: Vec<String> = dir.entries().iter().map(DirectoryEntry::label).collect();
        assert_eq!(
            labels,
            vec![
                "UAE Dirham - AED",
                "Euro - EUR",
                "Рубль - RUB",
                "Доллар - USD",
                "Australian Dollar - AUD",
            ]
        );
    }

    #[test]
    fn test_empty_query_returns_everything() {
        let dir = directory();
        assert_eq!(dir.search("").len(), dir.len());
    }

    #[test]
    fn test_search_is_case_insensitive() {
        let dir = directory();
        for query in ["dollar", "eur", "рубль", "РУБ", "- a", "x"] {
            let needle = query.to_lowercase();
            for entry in dir.search(query) {
                assert!(entry.label().to_lowercase().contains(&needle), "{query} vs {}", entry.label());
            }
        }

        let codes: Vec<&str> = dir.search("DOLLAR").iter().map(|e| e.code.as_str()).collect();
        assert_eq!(codes, vec!["AUD"]);

        let codes: Vec<&str> = dir.search("usd").iter().map(|e| e.code.as_str()).collect();
        assert_eq!(codes, vec!["USD"]);

        assert!(dir.search("zzz").is_empty());
    }

    #[test]
    fn test_popular_labels() {
        let codes = vec!["USD".to_string(), "JPY".to_string()];
        let popular = CurrencyDirectory::popular(&codes, &localized());
        let labels: Vec<String> = popular.entries().iter().map(DirectoryEntry::label).collect();
        assert_eq!(labels, vec!["Доллар - USD", "JPY - JPY"]);
    }
}
