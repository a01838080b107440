//! Keyword classification of listings into submission types

use crate::model::SubmissionType;

/// Keyword sets in priority order; the first category with any hit wins
const KEYWORDS: &[(SubmissionType, &[&str])] = &[
    (
        SubmissionType::Exhibition,
        &["exhibition", "gallery", "museum", "show", "display", "展览", "画廊", "美术馆"],
    ),
    (
        SubmissionType::Residency,
        &["residency", "residence", "artist-in-residence", "驻地", "驻留"],
    ),
    (
        SubmissionType::Competition,
        &["competition", "contest", "award", "prize", "比赛", "竞赛", "奖项"],
    ),
    (
        SubmissionType::Grant,
        &["grant", "funding", "scholarship", "fellowship", "资助", "基金", "奖学金"],
    ),
    (
        SubmissionType::Conference,
        &["conference", "symposium", "workshop", "seminar", "会议", "研讨会", "论坛"],
    ),
];

/// Classifies a listing from its title and description
///
/// Matching is substring-based on the lower-cased `title + " " + description`.
pub fn classify(title: &str, description: &str) -> SubmissionType {
    let text = format!("{} {}", title, description).to_lowercase();

    KEYWORDS
        .iter()
        .find(|(_, words)| words.iter().any(|word| text.contains(word)))
        .map(|(kind, _)| *kind)
        .unwrap_or(SubmissionType::Other)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_each_category() {
        assert_eq!(classify("Summer Gallery Open Call", ""), SubmissionType::Exhibition);
        assert_eq!(classify("Artist-in-Residence 2025", ""), SubmissionType::Residency);
        assert_eq!(classify("Young Painters Contest", ""), SubmissionType::Competition);
        assert_eq!(classify("Research Fellowship", ""), SubmissionType::Grant);
        assert_eq!(classify("Media Art Symposium", ""), SubmissionType::Conference);
        assert_eq!(classify("Call for zines", "Send us your zines"), SubmissionType::Other);
    }

    #[test]
    fn test_priority_order() {
        assert_eq!(
            classify("Exhibition Grant", "funding for a show"),
            SubmissionType::Exhibition
        );
        assert_eq!(
            classify("Travel award", "a fellowship"),
            SubmissionType::Competition
        );
    }

    #[test]
    fn test_description_and_case() {
        assert_eq!(
            classify("Open call", "A three-month RESIDENCY in the mountains"),
            SubmissionType::Residency
        );
    }

    #[test]
    fn test_chinese_keywords() {
        assert_eq!(classify("青年艺术家驻留计划", ""), SubmissionType::Residency);
        assert_eq!(classify("国际研讨会征稿", ""), SubmissionType::Conference);
        assert_eq!(classify("当代艺术展览", "征集作品"), SubmissionType::Exhibition);
    }
}
