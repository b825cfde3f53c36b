//! Mirror substitution for flaky distribution hosts.
//!
//! Two classes of hosts are recognized: source-hosting sites (anything with
//! "sourceforge" in the host name) and package indexes (anything with "pypi"
//! in the host name). Each class gets a colon-separated list of replacement
//! hosts, usually taken from the environment:
//!
//! ```text
//! SOURCEFORGE_MIRRORS=aarnet.dl.sourceforge.net:citylan.dl.sourceforge.net
//! PYPI_MIRRORS=pypi.hustunique.com
//! ```
//!
//! A [`MirrorTable`] is built fresh for every download. Retries within that
//! download walk the same table, so each mirror is tried at most once and the
//! table eventually runs dry.

use std::sync::OnceLock;
use std::vec;

use regex::Regex;
use tracing::{info, warn};
use url::Url;

/// Environment variable holding package-index mirror hosts.
pub const PYPI_MIRRORS_ENV: &str = "PYPI_MIRRORS";

/// Environment variable holding source-hosting mirror hosts.
pub const SOURCEFORGE_MIRRORS_ENV: &str = "SOURCEFORGE_MIRRORS";

/// A category of hosts eligible for mirror substitution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MirrorClass {
    /// Source-hosting sites such as `downloads.sourceforge.net`.
    SourceForge,
    /// Package indexes such as `pypi.python.org`.
    Pypi,
}

impl MirrorClass {
    /// All classes, in the order their substitutions are applied.
    pub const ALL: [MirrorClass; 2] = [MirrorClass::SourceForge, MirrorClass::Pypi];

    /// Environment variable that lists mirrors for this class.
    pub fn env_var(&self) -> &'static str {
        match self {
            Self::SourceForge => SOURCEFORGE_MIRRORS_ENV,
            Self::Pypi => PYPI_MIRRORS_ENV,
        }
    }

    /// Compiled host pattern for this class.
    fn host_pattern(&self) -> &'static Regex {
        static SOURCEFORGE: OnceLock<Regex> = OnceLock::new();
        static PYPI: OnceLock<Regex> = OnceLock::new();
        match self {
            Self::SourceForge => SOURCEFORGE.get_or_init(|| Regex::new(r"^.*sourceforge.*").unwrap()),
            Self::Pypi => PYPI.get_or_init(|| Regex::new(r"^.*pypi.*").unwrap()),
        }
    }

    /// Whether `host` belongs to this class.
    pub fn matches_host(&self, host: &str) -> bool {
        self.host_pattern().is_match(host)
    }
}

/// Split a colon-separated mirror list into host names.
///
/// Empty segments are dropped, so an empty string yields no mirrors.
pub fn parse_mirror_list(value: &str) -> Vec<String> {
    value
        .split(':')
        .map(str::trim)
        .filter(|host| !host.is_empty())
        .map(str::to_string)
        .collect()
}

/// Configured mirror hosts for each class.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MirrorConfig {
    /// Replacement hosts for source-hosting URLs.
    pub sourceforge: Vec<String>,
    /// Replacement hosts for package-index URLs.
    pub pypi: Vec<String>,
}

impl MirrorConfig {
    /// Create a mirror configuration from explicit host lists.
    pub fn new(sourceforge: Vec<String>, pypi: Vec<String>) -> Self {
        Self { sourceforge, pypi }
    }

    /// Read mirror lists through a variable lookup function.
    ///
    /// Missing variables yield empty lists.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |class: MirrorClass| {
            lookup(class.env_var())
                .map(|value| parse_mirror_list(&value))
                .unwrap_or_default()
        };

        Self {
            sourceforge: read(MirrorClass::SourceForge),
            pypi: read(MirrorClass::Pypi),
        }
    }

    /// Read mirror lists from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Mirror hosts for a class.
    pub fn hosts(&self, class: MirrorClass) -> &[String] {
        match class {
            MirrorClass::SourceForge => &self.sourceforge,
            MirrorClass::Pypi => &self.pypi,
        }
    }

    /// Whether no mirrors are configured at all.
    pub fn is_empty(&self) -> bool {
        self.sourceforge.is_empty() && self.pypi.is_empty()
    }
}

/// One host class paired with its remaining candidates.
#[derive(Debug)]
struct MirrorEntry {
    class: MirrorClass,
    remaining: vec::IntoIter<String>,
}

/// Per-download mirror state.
///
/// Each class's candidates are consumed as substitutions are requested.
/// Once a matching class runs out, no further substitutes are produced for
/// it.
#[derive(Debug)]
pub struct MirrorTable {
    entries: Vec<MirrorEntry>,
}

impl MirrorTable {
    /// Build a fresh table from the configured host lists.
    pub fn new(config: &MirrorConfig) -> Self {
        let entries = MirrorClass::ALL
            .iter()
            .map(|&class| MirrorEntry {
                class,
                remaining: config.hosts(class).to_vec().into_iter(),
            })
            .collect();

        Self { entries }
    }

    /// Number of candidates not yet handed out for a class.
    pub fn remaining(&self, class: MirrorClass) -> usize {
        self.entries
            .iter()
            .find(|entry| entry.class == class)
            .map(|entry| entry.remaining.len())
            .unwrap_or(0)
    }

    /// Replace the host of `url` with the next mirror of every matching class.
    ///
    /// Classes are applied in order, so when more than one matches the later
    /// substitution wins. Returns `None` when no class matches the host, or
    /// when the first matching class is already exhausted. A class running
    /// dry stops the walk; a substitution made by an earlier class is still
    /// returned.
    pub fn next_url(&mut self, url: &str) -> Option<String> {
        let mut parsed = match Url::parse(url) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(url, error = %e, "Cannot substitute mirror for unparsable URL");
                return None;
            }
        };
        parsed.host_str()?;

        let mut new_url = None;
        for entry in &mut self.entries {
            // Matched against the current host, which an earlier class may have replaced.
            let matched = parsed
                .host_str()
                .is_some_and(|host| entry.class.matches_host(host));
            if !matched {
                continue;
            }

            let Some(mirror) = entry.remaining.next() else {
                info!(class = ?entry.class, "Ran out of mirrors");
                break;
            };

            if let Err(e) = parsed.set_host(Some(&mirror)) {
                warn!(mirror = %mirror, error = %e, "Skipping invalid mirror host");
                continue;
            }
            new_url = Some(parsed.to_string());
        }

        new_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn config(sourceforge: &[&str], pypi: &[&str]) -> MirrorConfig {
        MirrorConfig::new(
            sourceforge.iter().map(|s| s.to_string()).collect(),
            pypi.iter().map(|s| s.to_string()).collect(),
        )
    }

    #[test]
    fn test_parse_mirror_list() {
        assert_eq!(
            parse_mirror_list("a.example.org:b.example.org"),
            vec!["a.example.org", "b.example.org"]
        );
        assert!(parse_mirror_list("").is_empty());
        assert_eq!(parse_mirror_list(":a::b:"), vec!["a", "b"]);
    }

    #[test]
    fn test_from_lookup_reads_both_classes() {
        let config = MirrorConfig::from_lookup(|key| match key {
            PYPI_MIRRORS_ENV => Some("pypi.mirror.org".to_string()),
            SOURCEFORGE_MIRRORS_ENV => Some("aarnet.dl.sourceforge.net:citylan.dl.sourceforge.net".to_string()),
            _ => None,
        });

        assert_eq!(config.pypi, vec!["pypi.mirror.org"]);
        assert_eq!(config.sourceforge.len(), 2);
    }

    #[test]
    fn test_from_lookup_missing_is_empty() {
        let config = MirrorConfig::from_lookup(|_| None);
        assert!(config.is_empty());
    }

    #[test]
    fn test_class_matching() {
        assert!(MirrorClass::Pypi.matches_host("pypi.python.org"));
        assert!(MirrorClass::SourceForge.matches_host("downloads.sourceforge.net"));
        assert!(!MirrorClass::Pypi.matches_host("example.org"));
    }

    #[test]
    fn test_substitutes_matching_host() {
        let mut table = MirrorTable::new(&config(&[], &["pypi.mirror.org"]));
        let next = table.next_url("http://pypi.python.org/packages/source/p/pep8/pep8-0.5.0.tar.gz#md5=512a");

        assert_eq!(
            next.as_deref(),
            Some("http://pypi.mirror.org/packages/source/p/pep8/pep8-0.5.0.tar.gz#md5=512a")
        );
    }

    #[test]
    fn test_keeps_port() {
        let mut table = MirrorTable::new(&config(&[], &["mirror.local"]));
        let next = table.next_url("http://pypi.example.org:8080/pkg.zip").unwrap();
        assert_eq!(next, "http://mirror.local:8080/pkg.zip");
    }

    #[test]
    fn test_exhausts_in_order() {
        let mut table = MirrorTable::new(&config(
            &["aarnet.dl.sourceforge.net", "citylan.dl.sourceforge.net"],
            &[],
        ));
        let url = "http://downloads.sourceforge.net/project/pkg.tar.bz2";

        let first = table.next_url(url).unwrap();
        assert_eq!(first, "http://aarnet.dl.sourceforge.net/project/pkg.tar.bz2");

        let second = table.next_url(&first).unwrap();
        assert_eq!(second, "http://citylan.dl.sourceforge.net/project/pkg.tar.bz2");

        assert_eq!(table.next_url(&second), None);
        assert_eq!(table.remaining(MirrorClass::SourceForge), 0);
    }

    #[test]
    fn test_no_match_returns_none() {
        let mut table = MirrorTable::new(&config(&["m1.sf.net"], &["p1.org"]));
        assert_eq!(table.next_url("http://example.org/pkg.tar.gz"), None);
        assert_eq!(table.remaining(MirrorClass::SourceForge), 1);
        assert_eq!(table.remaining(MirrorClass::Pypi), 1);
    }

    #[test]
    fn test_later_match_wins() {
        let mut table = MirrorTable::new(&config(
            &["pypi-files.sourceforge.net"],
            &["pypi-mirror.org"],
        ));
        let next = table.next_url("http://pypi.sourceforge.net/pkg.zip").unwrap();

        assert_eq!(next, "http://pypi-mirror.org/pkg.zip");
        assert_eq!(table.remaining(MirrorClass::SourceForge), 0);
        assert_eq!(table.remaining(MirrorClass::Pypi), 0);
    }

    #[test]
    fn test_later_class_sees_substituted_host() {
        let mut table = MirrorTable::new(&config(&["sf-mirror.org"], &["pypi-mirror.org"]));
        let next = table.next_url("http://pypi.sourceforge.net/pkg.zip").unwrap();

        assert_eq!(next, "http://sf-mirror.org/pkg.zip");
        assert_eq!(table.remaining(MirrorClass::Pypi), 1);
    }

    #[test]
    fn test_file_url_has_no_host() {
        let mut table = MirrorTable::new(&config(&["m1"], &["p1"]));
        assert_eq!(table.next_url("file:///tmp/pypi/pkg.zip"), None);
    }

    #[test]
    fn test_fresh_table_restarts() {
        let mirrors = config(&[], &["p1.org"]);
        let url = "http://pypi.python.org/pkg.zip";

        let mut first = MirrorTable::new(&mirrors);
        assert!(first.next_url(url).is_some());
        assert!(first.next_url(url).is_none());

        let mut second = MirrorTable::new(&mirrors);
        assert!(second.next_url(url).is_some());
    }

    proptest! {
        #[test]
        fn prop_parse_mirror_list_has_no_empty_hosts(value in "[a-z.:]{0,40}") {
            let hosts = parse_mirror_list(&value);
            prop_assert!(hosts.iter().all(|h| !h.is_empty() && !h.contains(':')));
        }

        #[test]
        fn prop_table_yields_at_most_n_substitutions(n in 0usize..6) {
            let hosts: Vec<String> = (0..n).map(|i| format!("m{}.pypi.org", i)).collect();
            let mut table = MirrorTable::new(&MirrorConfig::new(Vec::new(), hosts));
            let mut count = 0;
            while table.next_url("http://pypi.python.org/p.zip").is_some() {
                count += 1;
                prop_assert!(count <= n);
            }
            prop_assert_eq!(count, n);
        }
    }
}
