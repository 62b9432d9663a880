use std::cmp::Ordering;

use crate::config::SelectionConfig;
use crate::db::ApplicationStore;
use crate::error::StoreError;
use crate::models::JobPosting;

/// Picks the eligible, relevant postings for a run in a reproducible order.
pub struct WorkSelector {
    keywords: Vec<String>, // lowercased
    unknown_company: String,
}

impl WorkSelector {
    pub fn new(config: &SelectionConfig) -> Self {
        Self {
            keywords: config.title_keywords.iter().map(|k| k.to_lowercase()).collect(),
            unknown_company: config.unknown_company.trim().to_string(),
        }
    }

    pub fn is_relevant_title(&self, title: &str) -> bool {
        let title = title.to_lowercase();
        self.keywords.iter().any(|keyword| title.contains(keyword.as_str()))
    }

    pub fn is_unknown_company(&self, company: &str) -> bool {
        company.trim().eq_ignore_ascii_case(&self.unknown_company)
    }

    /// Eligible postings, highest match score first (unscored last), ties by
    /// ascending id. Never writes to the store.
    pub fn select(
        &self,
        store: &dyn ApplicationStore,
        limit: Option<usize>,
    ) -> Result<Vec<JobPosting>, StoreError> {
        let mut jobs: Vec<JobPosting> = store
            .unapplied_postings()?
            .into_iter()
            .filter(|job| !self.is_unknown_company(&job.company))
            .filter(|job| self.is_relevant_title(&job.title))
            .collect();

        jobs.sort_by(queue_order);
        if let Some(limit) = limit {
            jobs.truncate(limit);
        }
        Ok(jobs)
    }
}

fn queue_order(a: &JobPosting, b: &JobPosting) -> Ordering {
    let by_score = match (a.match_score, b.match_score) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_score.then_with(|| a.id.cmp(&b.id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ApplicationStatus;
    use crate::testing::{posting, MemoryStore};

    fn selector() -> WorkSelector {
        WorkSelector::new(&SelectionConfig::default())
    }

    #[test]
    fn test_relevant_titles() {
        let s = selector();
        assert!(s.is_relevant_title("Senior Software Engineer"));
        assert!(s.is_relevant_title("backend developer"));
        assert!(s.is_relevant_title("Full Stack Developer"));
        assert!(s.is_relevant_title("AI Researcher"));
        assert!(!s.is_relevant_title("Product Designer"));
        assert!(!s.is_relevant_title(""));
    }

    #[test]
    fn test_unknown_company_sentinel() {
        let s = selector();
        assert!(s.is_unknown_company("Unknown"));
        assert!(s.is_unknown_company(" unknown "));
        assert!(!s.is_unknown_company("Unknown Labs"));
        assert!(!s.is_unknown_company("Acme"));
    }

    #[test]
    fn test_select_filters_status_company_and_title() {
        let store = MemoryStore::new(vec![
            posting("1", "Software Engineer", "Acme", "https://x/1", None),
            posting("2", "Software Engineer", "Unknown", "https://x/2", None),
            posting("3", "Office Manager", "Acme", "https://x/3", None),
            posting("4", "Backend Engineer", "Initech", "https://x/4", None),
        ]);
        store.set_status("4", ApplicationStatus::Applied);

        let jobs = selector().select(&store, None).unwrap();
        let ids: Vec<&str> = jobs.iter().map(|j| j.id.as_str()).collect();
        assert_eq!(ids, vec!["1"]);
        for job in &jobs {
            assert_eq!(store.status(&job.id), Some(ApplicationStatus::Unapplied));
            assert_ne!(job.company, "Unknown");
        }
    }

    #[test]
    fn test_select_orders_by_score_then_id() {
        // store hands them back in arbitrary order
        let store = MemoryStore::new(vec![
            posting("b", "Engineer", "Acme", "https://x/b", None),
            posting("c", "Engineer", "Acme", "https://x/c", Some(0.4)),
            posting("a", "Engineer", "Acme", "https://x/a", None),
            posting("e", "Engineer", "Acme", "https://x/e", Some(0.9)),
            posting("d", "Engineer", "Acme", "https://x/d", Some(0.9)),
        ]);

        let ids: Vec<String> = selector()
            .select(&store, None)
            .unwrap()
            .into_iter()
            .map(|j| j.id)
            .collect();
        assert_eq!(ids, vec!["d", "e", "c", "a", "b"]);
    }

    #[test]
    fn test_select_limit_applies_after_filtering() {
        let store = MemoryStore::new(vec![
            posting("1", "Designer", "Acme", "https://x/1", None),
            posting("2", "Engineer", "Acme", "https://x/2", None),
            posting("3", "Engineer", "Acme", "https://x/3", None),
            posting("4", "Engineer", "Acme", "https://x/4", None),
        ]);
        let ids: Vec<String> = selector()
            .select(&store, Some(2))
            .unwrap()
            .into_iter()
            .map(|j| j.id)
            .collect();
        assert_eq!(ids, vec!["2", "3"]);
    }

    #[test]
    fn test_select_empty_is_not_error() {
        let store = MemoryStore::new(vec![]);
        assert!(selector().select(&store, Some(5)).unwrap().is_empty());
    }

    #[test]
    fn test_select_is_read_only() {
        let store = MemoryStore::new(vec![posting("1", "Engineer", "Acme", "https://x/1", None)]);
        selector().select(&store, None).unwrap();
        selector().select(&store, None).unwrap();
        assert!(store.updates().is_empty());
    }

    #[test]
    fn test_select_propagates_store_error() {
        let store = MemoryStore::new(vec![]);
        store.fail_reads();
        assert!(selector().select(&store, None).is_err());
    }
}
