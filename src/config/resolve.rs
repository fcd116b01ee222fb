//! Placeholder resolution over a merged property table.
//!
//! A placeholder is `<start>key<end>` or `<start>key:default<end>`, with
//! `${` and `}` as the default delimiters. Placeholders nest: in
//! `${${name}}` the inner placeholder yields the key looked up by the outer
//! one. After every substitution the updated string is scanned again, until
//! only text and unresolvable placeholders remain. Each key is resolved at
//! most once; referenced keys are resolved on demand through an explicit
//! stack of in-progress keys, which also detects cycles.

use std::collections::{BTreeMap, HashMap};

use super::key::KeyNormalizer;
use super::merge::MergedTable;
use super::PropertiesError;

/// Separates a placeholder key from its default value.
pub const DEFAULT_SEPARATOR: char = ':';

/// Normalized key to final text.
pub type ResolvedTable = BTreeMap<String, String>;

/// Start and end markers of a placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delimiters {
    start: String,
    end: String,
}

impl Delimiters {
    /// # Panics
    ///
    /// Panics if either delimiter is empty or both are equal, since nesting
    /// could not be told apart.
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        let (start, end) = (start.into(), end.into());
        assert!(!start.is_empty(), "start delimiter must not be empty");
        assert!(!end.is_empty(), "end delimiter must not be empty");
        assert_ne!(start, end, "start and end delimiters must differ");
        Self { start, end }
    }

    pub fn start(&self) -> &str {
        &self.start
    }

    pub fn end(&self) -> &str {
        &self.end
    }
}

impl Default for Delimiters {
    fn default() -> Self {
        Self::new("${", "}")
    }
}

/// Settings controlling one resolution run.
#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    pub delimiters: Delimiters,
    pub normalizer: KeyNormalizer,
    /// Leave unresolvable placeholders in the text instead of failing.
    pub ignore_unresolvable: bool,
}

/// Substitutes every placeholder in `merged`.
///
/// Literal values are copied unchanged, although text substituted from a
/// literal into a resolvable value is scanned like any other. Fails with
/// [`PropertiesError::CyclicPlaceholder`] when a key depends on itself, and
/// with [`PropertiesError::UnresolvablePlaceholders`] when a placeholder
/// names a missing key without a default, unless
/// [`ResolveOptions::ignore_unresolvable`] is set.
pub fn resolve(merged: &MergedTable, options: &ResolveOptions) -> Result<ResolvedTable, PropertiesError> {
    let mut resolver = Resolver {
        merged,
        options,
        done: HashMap::with_capacity(merged.len()),
    };

    let mut resolved = ResolvedTable::new();
    let mut offending = Vec::new();

    for (key, entry) in merged {
        if !entry.value.is_resolvable() {
            resolved.insert(key.clone(), entry.value.value().to_string());
            continue;
        }
        let Some(resolution) = resolver.resolve_key(key)? else {
            continue;
        };

        if resolution.unresolved && !options.ignore_unresolvable {
            offending.push(key.clone());
        }
        resolved.insert(key.clone(), resolution.text);
    }

    if !offending.is_empty() {
        return Err(PropertiesError::UnresolvablePlaceholders { keys: offending });
    }
    Ok(resolved)
}

#[derive(Debug, Clone)]
struct Resolution {
    text: String,
    /// The text still holds a placeholder naming a missing key.
    unresolved: bool,
}

/// A key whose value is being scanned.
///
/// Everything before `cursor` is settled: it holds no placeholder, or only
/// placeholders that could not be resolved.
#[derive(Debug)]
struct Frame {
    key: String,
    text: String,
    cursor: usize,
    unresolved: bool,
}

enum Step {
    /// The text changed or the cursor moved; scan again.
    Rescan,
    Finished,
    /// The named key must be resolved before this frame can continue.
    Needs(String),
}

/// Byte offsets of one balanced placeholder.
#[derive(Debug, Clone, Copy)]
struct Placeholder {
    open: usize,
    key_start: usize,
    key_end: usize,
    default_start: Option<usize>,
    close: usize,
    after: usize,
}

struct Resolver<'a> {
    merged: &'a MergedTable,
    options: &'a ResolveOptions,
    done: HashMap<String, Resolution>,
}

impl Resolver<'_> {
    /// Scanned value of a normalized key; `None` if no source defines it.
    ///
    /// Keys referenced along the way are pushed onto an explicit stack, so
    /// the length of a reference chain is bounded by memory only.
    fn resolve_key(&mut self, key: &str) -> Result<Option<Resolution>, PropertiesError> {
        if let Some(done) = self.done.get(key) {
            return Ok(Some(done.clone()));
        }
        let Some(root) = self.frame(key) else {
            return Ok(None);
        };

        let mut in_progress = vec![root];
        while let Some(frame) = in_progress.last_mut() {
            match self.step(frame) {
                Step::Rescan => {}
                Step::Finished => {
                    if let Some(Frame { key, text, unresolved, .. }) = in_progress.pop() {
                        self.done.insert(key, Resolution { text, unresolved });
                    }
                }
                Step::Needs(needed) => {
                    if let Some(pos) = in_progress.iter().position(|f| f.key == needed) {
                        let mut chain: Vec<String> = in_progress[pos..].iter().map(|f| f.key.clone()).collect();
                        chain.push(needed);
                        return Err(PropertiesError::CyclicPlaceholder { chain });
                    }
                    in_progress.extend(self.frame(&needed));
                }
            }
        }

        Ok(self.done.get(key).cloned())
    }

    fn frame(&self, key: &str) -> Option<Frame> {
        self.merged.get(key).map(|entry| Frame {
            key: key.to_string(),
            text: entry.value.value().to_string(),
            cursor: 0,
            unresolved: false,
        })
    }

    /// Substitutes the first placeholder after the frame's cursor whose key
    /// is plain text, then asks for a rescan of the updated string.
    fn step(&self, frame: &mut Frame) -> Step {
        let Some(chain) = self.locate(&frame.text, frame.cursor) else {
            return Step::Finished;
        };
        let Some(&innermost) = chain.last() else {
            return Step::Finished;
        };

        let name = &frame.text[innermost.key_start..innermost.key_end];
        let key = self.options.normalizer.normalize(name).into_owned();
        if let Some(found) = self.done.get(&key) {
            frame.text.replace_range(innermost.open..innermost.after, &found.text);
            return Step::Rescan;
        }
        if self.merged.contains_key(&key) {
            return Step::Needs(key);
        }

        // a placeholder whose key cannot be named falls back to the
        // default of the nearest enclosing placeholder that has one
        for placeholder in chain.iter().rev() {
            if let Some(default_start) = placeholder.default_start {
                let default = frame.text[default_start..placeholder.close].to_string();
                frame.text.replace_range(placeholder.open..placeholder.after, &default);
                return Step::Rescan;
            }
        }

        let outermost = chain[0];
        frame.unresolved = true;
        if self.options.ignore_unresolvable {
            let placeholder = &frame.text[outermost.open..outermost.after];
            tracing::warn!(key = %frame.key, %placeholder, "leaving unresolvable placeholder in place");
        }
        frame.cursor = outermost.after;
        Step::Rescan
    }

    /// Leftmost placeholder at or after `from`, followed by the placeholders
    /// nested in its key part, down to one whose key has no placeholder.
    fn locate(&self, text: &str, from: usize) -> Option<Vec<Placeholder>> {
        let pairs = self.pairs(text, from);
        let (&open, &close) = pairs.iter().next()?;

        let mut chain = vec![self.placeholder(text, &pairs, open, close)];
        loop {
            let outer = chain[chain.len() - 1];
            match pairs.range(outer.key_start..outer.key_end).next() {
                Some((&open, &close)) => chain.push(self.placeholder(text, &pairs, open, close)),
                None => return Some(chain),
            }
        }
    }

    /// Matches start and end delimiters in `text[from..]`, innermost first.
    /// Maps the offset of each start delimiter to that of its end delimiter;
    /// unmatched delimiters are plain text.
    fn pairs(&self, text: &str, from: usize) -> BTreeMap<usize, usize> {
        let start = self.options.delimiters.start();
        let end = self.options.delimiters.end();
        let mut open = Vec::new();
        let mut pairs = BTreeMap::new();
        let mut i = from;

        while i < text.len() {
            let rest = &text[i..];
            if rest.starts_with(start) {
                open.push(i);
                i += start.len();
            } else if !open.is_empty() && rest.starts_with(end) {
                if let Some(o) = open.pop() {
                    pairs.insert(o, i);
                }
                i += end.len();
            } else {
                i += rest.chars().next().map_or(1, char::len_utf8);
            }
        }
        pairs
    }

    /// Splits the placeholder opened at `open` into key and default at the
    /// first separator outside any nested placeholder.
    fn placeholder(&self, text: &str, pairs: &BTreeMap<usize, usize>, open: usize, close: usize) -> Placeholder {
        let key_start = open + self.options.delimiters.start().len();
        let end_len = self.options.delimiters.end().len();

        let mut separator = None;
        let mut i = key_start;
        while i < close {
            if let Some(&nested_close) = pairs.get(&i) {
                i = nested_close + end_len;
                continue;
            }
            let rest = &text[i..close];
            if rest.starts_with(DEFAULT_SEPARATOR) {
                separator = Some(i);
                break;
            }
            i += rest.chars().next().map_or(1, char::len_utf8);
        }

        Placeholder {
            open,
            key_start,
            key_end: separator.unwrap_or(close),
            default_start: separator.map(|at| at + DEFAULT_SEPARATOR.len_utf8()),
            close,
            after: close + end_len,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::merge::MergedValue;
    use crate::source::PropertyValue;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tracing_subscriber::layer::{Context, SubscriberExt};
    use tracing_subscriber::Layer;

    fn merged(pairs: &[(&str, &str)]) -> MergedTable {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), PropertyValue::resolvable(*v)))
            .map(into_merged)
            .collect()
    }

    fn into_merged((key, value): (String, PropertyValue)) -> (String, MergedValue) {
        (
            key,
            MergedValue {
                value,
                priority: 0,
                sequence: 0,
            },
        )
    }

    fn strict() -> ResolveOptions {
        ResolveOptions::default()
    }

    fn lenient() -> ResolveOptions {
        ResolveOptions {
            ignore_unresolvable: true,
            ..ResolveOptions::default()
        }
    }

    #[test]
    fn test_chain_reaches_fixed_point() {
        let resolved = resolve(&merged(&[("a", "${b}"), ("b", "${c}"), ("c", "X")]), &strict()).unwrap();
        assert_eq!(resolved["a"], "X");
        assert_eq!(resolved["b"], "X");
        assert_eq!(resolved["c"], "X");
    }

    #[test]
    fn test_nested_placeholder() {
        let table = merged(&[("key1", "V"), ("key2", "${${key3}}__${key1}"), ("key3", "key1")]);
        let resolved = resolve(&table, &strict()).unwrap();
        assert_eq!(resolved["key2"], "V__V");
    }

    #[test]
    fn test_custom_delimiters() {
        let table = merged(&[
            ("key1", "value1"),
            ("key2", "((((key3))))__((key1))"),
            ("key3", "key1"),
        ]);
        let options = ResolveOptions {
            delimiters: Delimiters::new("((", "))"),
            ..ResolveOptions::default()
        };

        let resolved = resolve(&table, &options).unwrap();
        assert_eq!(resolved["key2"], "value1__value1");
    }

    #[test]
    fn test_default_clause() {
        let resolved = resolve(&merged(&[("a", "${missing:fallback}")]), &strict()).unwrap();
        assert_eq!(resolved["a"], "fallback");
    }

    #[test]
    fn test_default_is_ignored_when_key_exists() {
        let table = merged(&[("a", "${b:${never}}"), ("b", "present")]);
        let resolved = resolve(&table, &strict()).unwrap();
        assert_eq!(resolved["a"], "present");
    }

    #[test]
    fn test_default_with_placeholder() {
        let table = merged(&[("a", "${missing:${b}-x}"), ("b", "bee")]);
        let resolved = resolve(&table, &strict()).unwrap();
        assert_eq!(resolved["a"], "bee-x");
    }

    #[test]
    fn test_default_may_contain_separator() {
        let resolved = resolve(&merged(&[("url", "${endpoint:http://localhost:8080}")]), &strict()).unwrap();
        assert_eq!(resolved["url"], "http://localhost:8080");
    }

    #[test]
    fn test_empty_default() {
        let resolved = resolve(&merged(&[("a", "[${missing:}]")]), &strict()).unwrap();
        assert_eq!(resolved["a"], "[]");
    }

    #[test]
    fn test_ignore_unresolvable_leaves_text() {
        let table = merged(&[("k2", "${${k3}}__${k1}"), ("k3", "k1")]);
        let resolved = resolve(&table, &lenient()).unwrap();
        assert_eq!(resolved["k2"], "${k1}__${k1}");
        assert_eq!(resolved["k3"], "k1");
    }

    #[derive(Clone, Default)]
    struct WarnCounter(Arc<AtomicUsize>);

    impl<S: tracing::Subscriber> Layer<S> for WarnCounter {
        fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
            if *event.metadata().level() == tracing::Level::WARN {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    #[test]
    fn test_warns_once_per_placeholder_left_in_place() {
        let counter = WarnCounter::default();
        let subscriber = tracing_subscriber::registry().with(counter.clone());
        let table = merged(&[("url", "${scheme}://${host}/x"), ("path", "/x")]);

        let resolved = tracing::subscriber::with_default(subscriber, || resolve(&table, &lenient())).unwrap();
        assert_eq!(resolved["url"], "${scheme}://${host}/x");
        assert_eq!(counter.0.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_strict_mode_reports_offending_keys() {
        let table = merged(&[("k2", "${${k3}}__${k1}"), ("k3", "k1"), ("k4", "${k2}")]);
        let err = resolve(&table, &strict()).unwrap_err();
        match err {
            PropertiesError::UnresolvablePlaceholders { keys } => {
                assert_eq!(keys, vec!["k2".to_string(), "k4".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_cycle_fails_in_both_modes() {
        let table = merged(&[("a", "${b}"), ("b", "${a}")]);
        for options in [strict(), lenient()] {
            let err = resolve(&table, &options).unwrap_err();
            match err {
                PropertiesError::CyclicPlaceholder { chain } => {
                    assert_eq!(chain, vec!["a".to_string(), "b".to_string(), "a".to_string()]);
                }
                other => panic!("unexpected error: {other}"),
            }
        }
    }

    #[test]
    fn test_self_reference_is_a_cycle() {
        let err = resolve(&merged(&[("a", "x${a:y}")]), &lenient()).unwrap_err();
        assert!(matches!(err, PropertiesError::CyclicPlaceholder { .. }));
    }

    #[test]
    fn test_literal_values_are_not_scanned() {
        let mut table = merged(&[("home", "/root")]);
        table.extend([into_merged(("raw".to_string(), PropertyValue::literal("${missing}")))]);

        let resolved = resolve(&table, &strict()).unwrap();
        assert_eq!(resolved["raw"], "${missing}");
    }

    #[test]
    fn test_substituted_text_is_rescanned() {
        let mut table = merged(&[("home", "/root"), ("a", "${env}/bin")]);
        table.extend([into_merged(("env".to_string(), PropertyValue::literal("${home}")))]);

        let resolved = resolve(&table, &strict()).unwrap();
        assert_eq!(resolved["env"], "${home}");
        assert_eq!(resolved["a"], "/root/bin");
    }

    #[test]
    fn test_substitution_may_complete_a_placeholder() {
        let table = merged(&[("open", "${"), ("a", "${open}b}"), ("b", "bee")]);
        let resolved = resolve(&table, &strict()).unwrap();
        assert_eq!(resolved["a"], "bee");
        assert_eq!(resolved["open"], "${");
    }

    #[test]
    fn test_literal_referencing_itself_is_a_cycle() {
        let mut table = merged(&[("a", "${loop}")]);
        table.extend([into_merged(("loop".to_string(), PropertyValue::literal("${loop}")))]);

        let err = resolve(&table, &lenient()).unwrap_err();
        assert!(matches!(err, PropertiesError::CyclicPlaceholder { .. }));
    }

    #[test]
    fn test_missing_nested_key_falls_back_to_outer_default() {
        let resolved = resolve(&merged(&[("a", "${${nope}:fallback}")]), &strict()).unwrap();
        assert_eq!(resolved["a"], "fallback");
    }

    #[test]
    fn test_unresolved_text_propagates_to_referencing_keys() {
        let table = merged(&[("a", "${b}!"), ("b", "<${missing}>")]);
        let resolved = resolve(&table, &lenient()).unwrap();
        assert_eq!(resolved["a"], "<${missing}>!");
        assert_eq!(resolved["b"], "<${missing}>");
    }

    #[test]
    fn test_long_reference_chain() {
        let depth = 5_000;
        let mut pairs: Vec<(String, String)> = (0..depth).map(|i| (format!("k{i}"), format!("${{k{}}}", i + 1))).collect();
        pairs.push((format!("k{depth}"), "end".to_string()));
        let table: MergedTable = pairs
            .into_iter()
            .map(|(k, v)| (k, PropertyValue::resolvable(v)))
            .map(into_merged)
            .collect();

        let resolved = resolve(&table, &strict()).unwrap();
        assert_eq!(resolved["k0"], "end");
        assert_eq!(resolved.len(), depth + 1);
    }

    #[test]
    fn test_long_cycle_reports_whole_chain() {
        let depth = 3_000;
        let table: MergedTable = (0..depth)
            .map(|i| (format!("k{i}"), PropertyValue::resolvable(format!("${{k{}}}", (i + 1) % depth))))
            .map(into_merged)
            .collect();

        match resolve(&table, &strict()).unwrap_err() {
            PropertiesError::CyclicPlaceholder { chain } => assert_eq!(chain.len(), depth + 1),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_deeply_nested_defaults() {
        let depth = 2_000;
        let value = format!("{}x{}", "${".repeat(depth), ":d}".repeat(depth));

        let resolved = resolve(&merged(&[("deep", value.as_str())]), &lenient()).unwrap();
        assert_eq!(resolved["deep"], "d");
    }

    #[test]
    fn test_deeply_nested_unresolvable_is_kept() {
        let depth = 2_000;
        let value = format!("{}missing{}", "${".repeat(depth), "}".repeat(depth));

        let resolved = resolve(&merged(&[("deep", value.as_str())]), &lenient()).unwrap();
        assert_eq!(resolved["deep"], value);

        let err = resolve(&merged(&[("deep", value.as_str())]), &strict()).unwrap_err();
        assert!(matches!(err, PropertiesError::UnresolvablePlaceholders { .. }));
    }

    #[test]
    fn test_case_insensitive_placeholder_names() {
        let options = ResolveOptions {
            normalizer: KeyNormalizer::CaseInsensitive,
            ..ResolveOptions::default()
        };
        let table = merged(&[("key.one", "${value1:defaultValue1}"), ("key.two", "${KEY.one:defaultValue2}")]);

        let resolved = resolve(&table, &options).unwrap();
        assert_eq!(resolved["key.two"], "defaultValue1");
    }

    #[test]
    fn test_case_sensitive_placeholder_names() {
        let table = merged(&[("key.one", "v"), ("key.two", "${KEY.one:defaultValue2}")]);
        let resolved = resolve(&table, &strict()).unwrap();
        assert_eq!(resolved["key.two"], "defaultValue2");
    }

    #[test]
    fn test_unclosed_placeholder_is_literal() {
        let table = merged(&[("a", "${oops ${b}"), ("b", "bee"), ("c", "50% } off")]);
        let resolved = resolve(&table, &strict()).unwrap();
        assert_eq!(resolved["a"], "${oops bee");
        assert_eq!(resolved["c"], "50% } off");
    }

    #[test]
    fn test_multibyte_text_around_placeholders() {
        let table = merged(&[("greeting", "héllo ${name} ✓"), ("name", "wörld")]);
        let resolved = resolve(&table, &strict()).unwrap();
        assert_eq!(resolved["greeting"], "héllo wörld ✓");
    }

    #[test]
    fn test_no_placeholders_is_identity() {
        let table = merged(&[("a", "plain"), ("b", "$ not {a} placeholder"), ("c", "")]);
        let resolved = resolve(&table, &strict()).unwrap();
        for (key, value) in &table {
            assert_eq!(&resolved[key], value.value.value());
        }
    }
}
