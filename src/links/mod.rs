//! Interlink allocation.
//!
//! Selection is a pure function over the link pool and the site's usage rows
//! so the exclusion rules stay testable; the stores only fetch and record.

use crate::entities::{RewriteLink, RewriteLinkUsage};
use rand::seq::SliceRandom;
use std::collections::{HashMap, HashSet};

/// Host component of a link URL; empty when the URL does not parse.
pub fn domain_of(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_owned))
        .unwrap_or_default()
}

/// Pick an interlink candidate for a site, uniformly at random among links
/// that are not yet used on the site, whose domain has fewer than
/// `domain_limit` usages on the site, and whose domain is not the site's own
/// host. `None` when nothing qualifies.
pub fn allocate<'a>(
    links: &'a [RewriteLink],
    usages: &[RewriteLinkUsage],
    site_host: &str,
    domain_limit: i64,
) -> Option<&'a RewriteLink> {
    let used_ids: HashSet<i64> = usages.iter().map(|u| u.rewrite_link_id).collect();

    let domains: HashMap<i64, &str> = links.iter().map(|l| (l.id, l.domain.as_str())).collect();
    let mut domain_counts: HashMap<&str, i64> = HashMap::new();
    for usage in usages {
        if let Some(domain) = domains.get(&usage.rewrite_link_id) {
            *domain_counts.entry(domain).or_insert(0) += 1;
        }
    }

    let candidates: Vec<&RewriteLink> = links
        .iter()
        .filter(|link| !used_ids.contains(&link.id))
        .filter(|link| domain_counts.get(link.domain.as_str()).copied().unwrap_or(0) < domain_limit)
        .filter(|link| site_host.is_empty() || link.domain != site_host)
        .collect();

    candidates.choose(&mut rand::thread_rng()).copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn link(id: i64, domain: &str) -> RewriteLink {
        RewriteLink {
            id,
            url: format!("https://{domain}/page-{id}"),
            domain: domain.to_string(),
            anchor: None,
            created_at: Utc::now(),
        }
    }

    fn usage(link_id: i64) -> RewriteLinkUsage {
        RewriteLinkUsage {
            id: link_id,
            site_id: 1,
            rewrite_link_id: link_id,
            article_id: 100 + link_id,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn domain_is_derived_from_url() {
        assert_eq!(domain_of("https://partner.com/a/b"), "partner.com");
        assert_eq!(domain_of("not a url"), "");
    }

    #[test]
    fn used_links_are_excluded() {
        let links = vec![link(1, "a.com"), link(2, "b.com")];
        let usages = vec![usage(1)];
        let chosen = allocate(&links, &usages, "mysite.com", 5).unwrap();
        assert_eq!(chosen.id, 2);
    }

    #[test]
    fn saturated_domains_are_excluded() {
        // two b.com links, one already used, domain limit 1
        let links = vec![link(1, "b.com"), link(2, "b.com"), link(3, "c.com")];
        let usages = vec![usage(1)];
        let chosen = allocate(&links, &usages, "mysite.com", 1).unwrap();
        assert_eq!(chosen.id, 3);
    }

    #[test]
    fn own_host_is_excluded() {
        let links = vec![link(1, "mysite.com"), link(2, "partner.com")];
        let chosen = allocate(&links, &[], "mysite.com", 5).unwrap();
        assert_eq!(chosen.id, 2);
    }

    #[test]
    fn nothing_left_means_none() {
        let links = vec![link(1, "a.com")];
        let usages = vec![usage(1)];
        assert!(allocate(&links, &usages, "mysite.com", 5).is_none());
        assert!(allocate(&[], &[], "mysite.com", 5).is_none());
    }

    #[test]
    fn higher_limit_readmits_a_domain() {
        let links = vec![link(1, "b.com"), link(2, "b.com")];
        let usages = vec![usage(1)];
        assert!(allocate(&links, &usages, "mysite.com", 1).is_none());
        let chosen = allocate(&links, &usages, "mysite.com", 2).unwrap();
        assert_eq!(chosen.id, 2);
    }
}
