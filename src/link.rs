//! Best-effort deep links back to the source forum.
//!
//! Links are plain string formatting against the forum's current URL scheme.
//! Nothing checks that they resolve; if the scheme changes they are wrong.

use serde::Deserialize;

/// Identity of a thread as the resolver sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThreadRef {
    pub id: u64,
    pub number: u64,
    /// Course id recorded on the thread itself, if any.
    pub course_id: Option<u64>,
}

pub trait LinkResolver: Send + Sync {
    fn resolve(&self, thread: &ThreadRef) -> Option<String>;
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    pub base_url: String,
    pub region: String,
    pub course_id: Option<u64>,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            base_url: "https://edstem.org".to_string(),
            region: "us".to_string(),
            course_id: None,
        }
    }
}

/// `{base}/{region}/courses/{course}/discussion/{thread id}`.
#[derive(Debug, Clone)]
pub struct EdLinkResolver {
    config: LinkConfig,
}

impl EdLinkResolver {
    pub fn new(config: LinkConfig) -> Self {
        EdLinkResolver { config }
    }
}

impl LinkResolver for EdLinkResolver {
    fn resolve(&self, thread: &ThreadRef) -> Option<String> {
        let course_id = self.config.course_id.or(thread.course_id).filter(|c| *c > 0)?;
        if thread.id == 0 {
            return None;
        }
        let base = self.config.base_url.trim_end_matches('/');
        let region = self.config.region.trim_matches('/');
        let prefix = if region.is_empty() {
            base.to_string()
        } else {
            format!("{}/{}", base, region)
        };
        Some(format!("{}/courses/{}/discussion/{}", prefix, course_id, thread.id))
    }
}

/// Resolver for runs that should emit no links.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLinks;

impl LinkResolver for NoLinks {
    fn resolve(&self, _thread: &ThreadRef) -> Option<String> {
        None
    }
}
