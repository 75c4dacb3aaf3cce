use std::sync::Arc;

use tracing::{info, warn};

use crate::cache::{cache_key, ResultCache, INSTAGRAM_NAMESPACE};
use crate::clock::Clock;
use crate::error::ResolveError;
use crate::fetcher::MediaFetcher;
use crate::history::RequestHistory;
use crate::media::normalize::{normalize, RequestContext};
use crate::media::types::MediaItem;
use crate::utils::instagram::extract_canonical_url;

/// Resolved lists are shared between the cache and every response built from it.
pub type MediaCache = ResultCache<Arc<Vec<MediaItem>>>;

#[derive(Debug, Clone)]
pub struct Resolved {
    pub media: Arc<Vec<MediaItem>>,
    pub canonical_url: String,
    pub cached: bool,
}

impl Resolved {
    pub fn count(&self) -> usize {
        self.media.len()
    }
}

/// Validate, check the cache, fetch, normalize, populate the cache.
///
/// Nothing is retried and nothing is cached on failure. Two concurrent
/// resolutions of the same link may both reach the fetcher; the later `set`
/// wins.
pub struct Resolver {
    fetcher: Box<dyn MediaFetcher>,
    cache: Arc<MediaCache>,
    history: Arc<RequestHistory>,
    clock: Arc<dyn Clock>,
}

impl Resolver {
    pub fn new(
        fetcher: Box<dyn MediaFetcher>,
        cache: Arc<MediaCache>,
        history: Arc<RequestHistory>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            fetcher,
            cache,
            history,
            clock,
        }
    }

    pub async fn resolve(&self, raw_input: &str, session_id: &str) -> Result<Resolved, ResolveError> {
        let canonical_url = extract_canonical_url(raw_input).ok_or(ResolveError::InvalidUrl)?;
        self.history.record(session_id, &canonical_url);

        let key = cache_key(INSTAGRAM_NAMESPACE, &canonical_url);
        if let Some(media) = self.cache.get(&key) {
            info!(url = %canonical_url, count = media.len(), "[pipeline] cache HIT");
            return Ok(Resolved {
                media,
                canonical_url,
                cached: true,
            });
        }
        info!(url = %canonical_url, session = %session_id, "[pipeline] cache MISS, fetching");

        let raw = self.fetcher.fetch(&canonical_url).await.map_err(|e| {
            warn!(url = %canonical_url, error = %e, "[pipeline] fetch failed");
            ResolveError::from(e)
        })?;

        let ctx = RequestContext {
            timestamp_ms: self.clock.now_ms(),
        };
        let media = normalize(&raw, ctx);
        if media.is_empty() {
            warn!(url = %canonical_url, raw = raw.len(), "[pipeline] no usable media");
            return Err(ResolveError::NoMediaFound);
        }

        let media = Arc::new(media);
        self.cache.set(key, Arc::clone(&media));
        info!(url = %canonical_url, count = media.len(), "[pipeline] resolved");

        Ok(Resolved {
            media,
            canonical_url,
            cached: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use futures::executor::block_on;

    use super::*;
    use crate::cache::DEFAULT_TTL;
    use crate::clock::ManualClock;
    use crate::error::{ErrorKind, FetchError};
    use crate::history::HISTORY_RETENTION;
    use crate::media::types::{MediaKind, RawMedia};

    struct ScriptedFetcher {
        reply: Result<Vec<RawMedia>, FetchError>,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait(?Send)]
    impl MediaFetcher for ScriptedFetcher {
        async fn fetch(&self, _canonical_url: &str) -> Result<Vec<RawMedia>, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.reply.clone()
        }
    }

    struct Harness {
        resolver: Resolver,
        cache: Arc<MediaCache>,
        history: Arc<RequestHistory>,
        clock: Arc<ManualClock>,
        calls: Arc<AtomicUsize>,
    }

    fn harness(reply: Result<Vec<RawMedia>, FetchError>) -> Harness {
        let clock = Arc::new(ManualClock::new(1_700_000_000_000));
        let cache = Arc::new(MediaCache::new(clock.clone(), DEFAULT_TTL));
        let history = Arc::new(RequestHistory::new(clock.clone(), HISTORY_RETENTION));
        let calls = Arc::new(AtomicUsize::new(0));
        let fetcher = ScriptedFetcher {
            reply,
            calls: calls.clone(),
        };
        let resolver = Resolver::new(Box::new(fetcher), cache.clone(), history.clone(), clock.clone());

        Harness {
            resolver,
            cache,
            history,
            clock,
            calls,
        }
    }

    const POST: &str = "https://www.instagram.com/p/Cabc123/";

    #[test]
    fn resolves_single_image() {
        let h = harness(Ok(vec![RawMedia::from_url("https://cdn/x.jpg")]));
        let resolved = block_on(h.resolver.resolve(POST, "s1")).unwrap();

        assert_eq!(resolved.count(), 1);
        assert_eq!(resolved.canonical_url, POST);
        assert_eq!(resolved.media[0].kind, MediaKind::Image);
        assert!(!resolved.cached);
    }

    #[test]
    fn second_resolution_is_served_from_cache() {
        let h = harness(Ok(vec![
            RawMedia::from_url("https://cdn/x.jpg"),
            RawMedia::from_url("https://cdn/y.mp4"),
        ]));
        let first = block_on(h.resolver.resolve(POST, "s1")).unwrap();
        h.clock.advance(Duration::from_secs(60));
        let second = block_on(h.resolver.resolve(&format!("look {POST}?igsh=1"), "s1")).unwrap();

        assert!(second.cached);
        assert_eq!(first.canonical_url, second.canonical_url);
        let urls = |r: &Resolved| r.media.iter().map(|m| m.canonical_url.clone()).collect::<Vec<_>>();
        assert_eq!(urls(&first), urls(&second));
        assert_eq!(h.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn expired_entry_triggers_new_fetch() {
        let h = harness(Ok(vec![RawMedia::from_url("https://cdn/x.jpg")]));
        block_on(h.resolver.resolve(POST, "s1")).unwrap();
        h.clock.advance(DEFAULT_TTL);
        let again = block_on(h.resolver.resolve(POST, "s1")).unwrap();

        assert!(!again.cached);
        assert_eq!(h.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn populates_namespaced_cache_key() {
        let h = harness(Ok(vec![RawMedia::from_url("https://cdn/x.jpg")]));
        block_on(h.resolver.resolve(POST, "s1")).unwrap();

        assert!(h.cache.get(&format!("instagram:{POST}")).is_some());
        assert!(h.cache.get(POST).is_none());
    }

    #[test]
    fn invalid_input_never_reaches_fetcher() {
        let h = harness(Ok(vec![RawMedia::from_url("https://cdn/x.jpg")]));
        let err = block_on(h.resolver.resolve("not a url", "s1")).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InvalidUrl);
        assert_eq!(h.calls.load(Ordering::SeqCst), 0);
        assert!(h.history.is_empty());
    }

    #[test]
    fn network_failure_leaves_cache_untouched() {
        let h = harness(Err(FetchError::Network("connection refused".into())));
        let err = block_on(h.resolver.resolve(POST, "s1")).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::NetworkError);
        assert!(h.cache.is_empty());
    }

    #[test]
    fn fetch_error_kinds_pass_through() {
        for (reply, kind) in [
            (FetchError::Timeout, ErrorKind::Timeout),
            (FetchError::AccessRestricted("private".into()), ErrorKind::AccessRestricted),
            (FetchError::Unknown("boom".into()), ErrorKind::Unknown),
        ] {
            let h = harness(Err(reply));
            let err = block_on(h.resolver.resolve(POST, "s1")).unwrap_err();
            assert_eq!(err.kind(), kind);
        }
    }

    #[test]
    fn empty_fetch_is_no_media_found() {
        let h = harness(Ok(vec![]));
        let err = block_on(h.resolver.resolve(POST, "s1")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NoMediaFound);
        assert!(h.cache.is_empty());
    }

    #[test]
    fn all_items_filtered_is_no_media_found() {
        let h = harness(Ok(vec![RawMedia::default(), RawMedia::from_url("")]));
        let err = block_on(h.resolver.resolve(POST, "s1")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NoMediaFound);
    }

    #[test]
    fn valid_requests_are_recorded_per_session() {
        let h = harness(Err(FetchError::Timeout));
        let _ = block_on(h.resolver.resolve(POST, "s1"));

        let history = h.history.for_session("s1");
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].url, POST);
    }
}
