use serde::Serialize;
use std::fmt;

/// Application-tracking platform hosting a job's apply form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Platform {
    LinkedIn,
    Greenhouse,
    Ashby,
    Lever,
    Workday,
    BambooHR,
    Workable,
    Generic,
}

impl Platform {
    pub fn label(&self) -> &'static str {
        match self {
            Platform::LinkedIn => "LinkedIn",
            Platform::Greenhouse => "Greenhouse",
            Platform::Ashby => "Ashby",
            Platform::Lever => "Lever",
            Platform::Workday => "Workday",
            Platform::BambooHR => "BambooHR",
            Platform::Workable => "Workable",
            Platform::Generic => "Generic",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}

// Checked top to bottom, first hit wins. LinkedIn comes first so a LinkedIn
// page whose query string mentions an ATS domain still counts as LinkedIn;
// the executor reclassifies after following the apply redirect anyway.
const RULES: &[(&str, Platform)] = &[
    ("linkedin.com", Platform::LinkedIn),
    ("greenhouse.io", Platform::Greenhouse),
    // bare "ashby" covers jobs.ashbyhq.com and company-hosted ashby embeds
    ("ashby", Platform::Ashby),
    ("lever.co", Platform::Lever),
    ("workday.com", Platform::Workday),
    ("myworkdayjobs.com", Platform::Workday),
    ("bamboohr.com", Platform::BambooHR),
    ("workable.com", Platform::Workable),
];

/// Classify an apply URL. Never fails: empty or malformed input is `Generic`.
pub fn classify(url: &str) -> Platform {
    let lower = url.to_ascii_lowercase();
    RULES
        .iter()
        .find(|(fragment, _)| lower.contains(fragment))
        .map(|(_, platform)| *platform)
        .unwrap_or(Platform::Generic)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_known_platforms() {
        assert_eq!(classify("https://www.linkedin.com/jobs/view/123"), Platform::LinkedIn);
        assert_eq!(classify("https://boards.greenhouse.io/acme/jobs/1"), Platform::Greenhouse);
        assert_eq!(classify("https://jobs.ashbyhq.com/acme/abc"), Platform::Ashby);
        assert_eq!(classify("https://jobs.lever.co/acme/2"), Platform::Lever);
        assert_eq!(classify("https://acme.wd5.myworkdayjobs.com/en-US/careers"), Platform::Workday);
        assert_eq!(classify("https://www.workday.com/careers/123"), Platform::Workday);
        assert_eq!(classify("https://acme.bamboohr.com/careers/42"), Platform::BambooHR);
        assert_eq!(classify("https://apply.workable.com/acme/j/ABC/"), Platform::Workable);
    }

    #[test]
    fn test_classify_falls_back_to_generic() {
        assert_eq!(classify("https://careers.acme.com/jobs/7"), Platform::Generic);
        assert_eq!(classify(""), Platform::Generic);
        assert_eq!(classify("not a url at all"), Platform::Generic);
        assert_eq!(classify("://::??"), Platform::Generic);
    }

    #[test]
    fn test_classify_is_case_insensitive() {
        assert_eq!(classify("HTTPS://BOARDS.GREENHOUSE.IO/ACME"), Platform::Greenhouse);
    }

    #[test]
    fn test_classify_first_rule_wins() {
        let url = "https://www.linkedin.com/jobs/view/1?redirect=https://jobs.lever.co/acme/2";
        assert_eq!(classify(url), Platform::LinkedIn);

        let url = "https://boards.greenhouse.io/ashby-labs/jobs/9";
        assert_eq!(classify(url), Platform::Greenhouse);
    }

    #[test]
    fn test_classify_is_pure() {
        let url = "https://jobs.lever.co/acme/2";
        let first = classify(url);
        for _ in 0..10 {
            assert_eq!(classify(url), first);
        }
    }

    #[test]
    fn test_labels() {
        assert_eq!(Platform::Greenhouse.to_string(), "Greenhouse");
        assert_eq!(Platform::BambooHR.label(), "BambooHR");
        assert_eq!(Platform::Generic.label(), "Generic");
    }
}
