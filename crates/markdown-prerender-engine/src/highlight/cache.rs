use std::collections::{HashMap, VecDeque};

use super::{HighlightMap, Lookup, clip_map, hash128};

/// Sizing of a [`RenderCache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HighlightCacheConfig {
    /// Total entries across all buckets before the oldest is evicted.
    pub ceiling: usize,
    /// Characters of content that go into the bucket key.
    pub prefix_length: usize,
}

impl Default for HighlightCacheConfig {
    fn default() -> Self {
        Self {
            ceiling: 256,
            prefix_length: 8,
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    sequence: u64,
    /// Lowercased.
    language: String,
    content: String,
    map: HighlightMap,
}

/// Computed highlight maps, bucketed by language and leading characters.
///
/// Within a bucket, entries are in insertion order. Inserting content that
/// extends cached content replaces the shorter entry, so a block that grows
/// while streaming occupies one slot.
#[derive(Debug, Clone)]
pub struct RenderCache {
    config: HighlightCacheConfig,
    buckets: HashMap<u128, VecDeque<CacheEntry>>,
    len: usize,
    next_sequence: u64,
}

impl RenderCache {
    pub fn new(config: HighlightCacheConfig) -> Self {
        Self {
            config,
            buckets: HashMap::new(),
            len: 0,
            next_sequence: 0,
        }
    }

    pub fn config(&self) -> HighlightCacheConfig {
        self.config
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn clear(&mut self) {
        self.buckets.clear();
        self.len = 0;
    }

    fn bucket_key(&self, language: &str, content: &str) -> u128 {
        let prefix = content
            .char_indices()
            .nth(self.config.prefix_length)
            .map(|(end, _)| &content[..end])
            .or_else(|| (content.chars().count() == self.config.prefix_length).then_some(content));
        hash128(&(language, prefix))
    }

    /// Probes the cache for `content`. The first entry in the bucket that
    /// matches at all decides the answer: an identical entry gives `Full`, one
    /// sharing a non-empty prefix shorter than `content` gives a clipped map.
    ///
    /// An entry that is a strict prefix of `content` yields `Prefix`, never
    /// `Full`, so the extension still gets scheduled and the cache converges.
    pub fn lookup(&self, language: &str, content: &str) -> Lookup {
        let language = language.to_lowercase();
        let Some(bucket) = self.buckets.get(&self.bucket_key(&language, content)) else {
            return Lookup::None;
        };

        bucket
            .iter()
            .filter(|e| e.language == language)
            .find_map(|entry| {
                if entry.content == content {
                    return Some(Lookup::Full(entry.map.clone()));
                }
                let shared = common_prefix_len(&entry.content, content);
                (shared > 0 && shared < content.len())
                    .then(|| Lookup::Prefix(clip_map(&entry.map, shared)))
            })
            .unwrap_or(Lookup::None)
    }

    /// The map for exactly `content`, if cached, wherever it sits in the
    /// bucket.
    pub fn get_exact(&self, language: &str, content: &str) -> Option<HighlightMap> {
        let language = language.to_lowercase();
        self.buckets
            .get(&self.bucket_key(&language, content))?
            .iter()
            .find(|e| e.language == language && e.content == content)
            .map(|e| e.map.clone())
    }

    /// Stores `map` for `content`, replacing entries whose content it extends,
    /// then evicts the globally oldest entries down to the ceiling.
    pub fn insert(&mut self, language: &str, content: &str, map: HighlightMap) {
        let language = language.to_lowercase();
        let key = self.bucket_key(&language, content);
        let sequence = self.next_sequence;
        self.next_sequence += 1;

        let bucket = self.buckets.entry(key).or_default();
        let before = bucket.len();
        bucket.retain(|e| !(e.language == language && content.starts_with(e.content.as_str())));
        let replaced = before - bucket.len();
        bucket.push_back(CacheEntry {
            sequence,
            language,
            content: content.to_string(),
            map,
        });
        self.len = self.len + 1 - replaced;
        log::trace!("cached highlight #{sequence}, replaced {replaced}, {} total", self.len);

        self.evict();
    }

    fn evict(&mut self) {
        while self.len > self.config.ceiling {
            let oldest = self
                .buckets
                .iter()
                .filter_map(|(key, bucket)| bucket.front().map(|e| (e.sequence, *key)))
                .min();
            let Some((sequence, key)) = oldest else {
                break;
            };
            if let Some(bucket) = self.buckets.get_mut(&key) {
                bucket.pop_front();
                if bucket.is_empty() {
                    self.buckets.remove(&key);
                }
            }
            self.len -= 1;
            log::trace!("evicted highlight #{sequence}");
        }
    }
}

impl Default for RenderCache {
    fn default() -> Self {
        Self::new(HighlightCacheConfig::default())
    }
}

/// Length in bytes of the longest common prefix, on a character boundary.
fn common_prefix_len(a: &str, b: &str) -> usize {
    a.chars()
        .zip(b.chars())
        .take_while(|(x, y)| x == y)
        .map(|(c, _)| c.len_utf8())
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::highlight::{HighlightSpan, Rgba};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    const KEYWORD: Rgba = Rgba::new(180, 142, 173, 255);
    const STRING: Rgba = Rgba::new(163, 190, 140, 255);

    fn span(range: std::ops::Range<usize>, color: Rgba) -> HighlightSpan {
        HighlightSpan { range, color }
    }

    fn cache(ceiling: usize) -> RenderCache {
        RenderCache::new(HighlightCacheConfig {
            ceiling,
            prefix_length: 8,
        })
    }

    #[rstest]
    #[case("", "", 0)]
    #[case("abc", "abd", 2)]
    #[case("abc", "abcdef", 3)]
    #[case("héllo", "hélp", 4)]
    #[case("x", "y", 0)]
    fn common_prefix(#[case] a: &str, #[case] b: &str, #[case] expected: usize) {
        assert_eq!(common_prefix_len(a, b), expected);
    }

    #[test]
    fn exact_match_is_full() {
        let mut cache = cache(16);
        let map = vec![span(0..2, KEYWORD)];
        cache.insert("Rust", "fn main() {}", map.clone());

        assert_eq!(cache.lookup("rust", "fn main() {}"), Lookup::Full(map));
        assert_eq!(cache.get_exact("RUST", "fn main() {}").map(|m| m.len()), Some(1));
    }

    #[test]
    fn extension_gets_clipped_prefix() {
        let mut cache = cache(16);
        cache.insert(
            "rust",
            "let s = \"ab",
            vec![span(0..3, KEYWORD), span(8..11, STRING)],
        );

        assert_eq!(
            cache.lookup("rust", "let s = \"abc\";"),
            Lookup::Prefix(vec![span(0..3, KEYWORD), span(8..11, STRING)])
        );
        assert_eq!(
            cache.lookup("rust", "let s = \"x\";"),
            Lookup::Prefix(vec![span(0..3, KEYWORD), span(8..9, STRING)])
        );
    }

    #[test]
    fn other_language_or_bucket_misses() {
        let mut cache = cache(16);
        cache.insert("rust", "fn main() {}", vec![]);

        assert_eq!(cache.lookup("python", "fn main() {}"), Lookup::None);
        assert_eq!(cache.lookup("rust", "struct Foo;"), Lookup::None);
    }

    #[test]
    fn short_content_shares_language_bucket() {
        let mut cache = cache(16);
        cache.insert("rust", "fn", vec![span(0..2, KEYWORD)]);
        assert_eq!(
            cache.lookup("rust", "fn a"),
            Lookup::Prefix(vec![span(0..2, KEYWORD)])
        );
    }

    #[test]
    fn first_match_in_bucket_order_wins() {
        let mut cache = cache(16);
        cache.insert("rust", "fn main() { a }", vec![span(0..2, KEYWORD)]);
        cache.insert("rust", "fn main() { b }", vec![span(0..2, STRING)]);

        // The older entry shares "fn main() { " and answers first.
        assert_eq!(
            cache.lookup("rust", "fn main() { b }"),
            Lookup::Prefix(vec![span(0..2, KEYWORD)])
        );
        assert_eq!(
            cache.get_exact("rust", "fn main() { b }"),
            Some(vec![span(0..2, STRING)])
        );
        assert_eq!(
            cache.lookup("rust", "fn main() { a }"),
            Lookup::Full(vec![span(0..2, KEYWORD)])
        );
    }

    #[test]
    fn content_shorter_than_cached_entry_misses() {
        let mut cache = cache(16);
        cache.insert("rust", "fn main() {}", vec![span(0..2, KEYWORD), span(3..7, STRING)]);

        assert_eq!(cache.lookup("rust", "fn main()"), Lookup::None);
        assert_eq!(cache.get_exact("rust", "fn main()"), None);
        assert_eq!(
            cache.lookup("rust", "fn main(x)"),
            Lookup::Prefix(vec![span(0..2, KEYWORD), span(3..7, STRING)])
        );
    }

    #[test]
    fn growing_content_replaces_its_prefix() {
        let mut cache = cache(16);
        cache.insert("rust", "fn main()", vec![]);
        cache.insert("rust", "fn main() {", vec![]);
        cache.insert("rust", "fn main() {}", vec![]);

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.lookup("rust", "fn main() {"), Lookup::None);
        assert_eq!(cache.lookup("rust", "fn main() {}\n").kind_name(), "prefix");
    }

    #[test]
    fn reinserting_same_content_keeps_one_entry() {
        let mut cache = cache(16);
        cache.insert("rust", "fn main()", vec![span(0..2, KEYWORD)]);
        cache.insert("rust", "fn main()", vec![span(0..2, STRING)]);

        assert_eq!(cache.len(), 1);
        assert_eq!(
            cache.lookup("rust", "fn main()"),
            Lookup::Full(vec![span(0..2, STRING)])
        );
    }

    #[test]
    fn evicts_globally_oldest_first() {
        let mut cache = cache(2);
        cache.insert("rust", "first entry", vec![]);
        cache.insert("python", "second entry", vec![]);
        cache.insert("go", "third entry", vec![]);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.lookup("rust", "first entry"), Lookup::None);
        assert!(matches!(cache.lookup("python", "second entry"), Lookup::Full(_)));
        assert!(matches!(cache.lookup("go", "third entry"), Lookup::Full(_)));
    }

    #[test]
    fn refreshed_bucket_survives_eviction() {
        let mut cache = cache(2);
        cache.insert("rust", "streaming block", vec![]);
        cache.insert("go", "cold block", vec![]);
        cache.insert("rust", "streaming block grows", vec![]);
        cache.insert("python", "another block", vec![]);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.lookup("go", "cold block"), Lookup::None);
        assert!(matches!(
            cache.lookup("rust", "streaming block grows"),
            Lookup::Full(_)
        ));
    }

    #[test]
    fn clear_empties() {
        let mut cache = cache(4);
        cache.insert("rust", "x", vec![]);
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.lookup("rust", "x"), Lookup::None);
    }
}
