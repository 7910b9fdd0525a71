//! The torrc file as an ordered list of lines.
//!
//! Comments, blank lines and lines that do not split into a key and a value are
//! kept verbatim so that a load followed by a save reproduces the file exactly.
//! Lines are held as raw bytes; a stray Latin-1 comment is written back as it
//! was read, and only the key/value view is decoded (lossily) as UTF-8.
//! Lookups are linear scans: keys may repeat (`HiddenServiceDir` declares one
//! hidden service per occurrence) and the first occurrence wins for single-valued
//! reads and writes.

use std::ffi::OsString;
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use bstr::{BStr, BString, ByteSlice};
use tracing::{debug, warn};

use crate::torrc::error::TorrcError;

/// Key that declares one hidden service directory per occurrence.
pub const HIDDEN_SERVICE_DIR: &str = "HiddenServiceDir";

/// Suffix appended to the torrc path for the copy kept by [`Torrc::save`].
pub const BACKUP_SUFFIX: &str = ".bak";

/// One line of a torrc file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TorrcEntry {
    raw_line: BString,
    is_comment: bool,
    key: Option<String>,
    value: Option<String>,
}

impl TorrcEntry {
    /// Classifies a single line, given without its line terminator.
    ///
    /// Blank lines and lines starting with `#` (after leading whitespace) are
    /// comments. Any other line with at least two whitespace-separated tokens
    /// yields a key and a value; a lone token yields neither but is still kept.
    #[must_use]
    pub fn parse<L: AsRef<[u8]>>(line: L) -> Self {
        let raw_line = BString::from(line.as_ref());
        let (is_comment, key, value) = classify(&raw_line.to_str_lossy());
        Self {
            raw_line,
            is_comment,
            key,
            value,
        }
    }

    fn key_value(key: &str, value: &str) -> Self {
        Self {
            raw_line: BString::from(format!("{key} {value}")),
            is_comment: false,
            key: Some(key.to_owned()),
            value: Some(value.to_owned()),
        }
    }

    /// The line exactly as it will be written back.
    #[must_use]
    pub fn raw_line(&self) -> &BStr {
        self.raw_line.as_bstr()
    }

    /// `true` for blank lines and `#` comments.
    #[must_use]
    pub const fn is_comment(&self) -> bool {
        self.is_comment
    }

    /// First token of a key/value line. `None` for comments and lone tokens.
    #[must_use]
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    /// Remaining tokens joined by single spaces. `None` whenever [`key`](Self::key) is.
    #[must_use]
    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    fn matches(&self, key: &str) -> bool {
        !self.is_comment && self.key.as_deref() == Some(key)
    }
}

fn classify(line: &str) -> (bool, Option<String>, Option<String>) {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return (true, None, None);
    }

    let mut fields = trimmed.split_whitespace();
    let key = fields.next().map(str::to_owned);
    let rest: Vec<&str> = fields.collect();
    if rest.is_empty() {
        return (false, None, None);
    }
    (false, key, Some(rest.join(" ")))
}

/// A parsed torrc, in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Torrc {
    entries: Vec<TorrcEntry>,
}

impl Torrc {
    /// Parses torrc text held in memory.
    #[must_use]
    pub fn parse(content: &str) -> Self {
        Self::parse_bytes(content.as_bytes())
    }

    /// Parses torrc content that may not be valid UTF-8.
    ///
    /// Lines end at `\n`; a trailing `\r` is dropped like [`str::lines`] does.
    #[must_use]
    pub fn parse_bytes(content: &[u8]) -> Self {
        Self {
            entries: content.lines().map(TorrcEntry::parse).collect(),
        }
    }

    /// Reads and parses the file at `path`.
    ///
    /// # Errors
    /// Returns [`TorrcError::Io`] if the file is missing or unreadable. Callers
    /// decide whether a missing file means "not configured yet".
    pub fn load(path: &Path) -> Result<Self, TorrcError> {
        let content = std::fs::read(path)?;
        let torrc = Self::parse_bytes(&content);
        debug!(path = %path.display(), entries = torrc.entries.len(), "loaded torrc");
        Ok(torrc)
    }

    /// Every line in file order, comments and lone tokens included.
    #[must_use]
    pub fn entries(&self) -> &[TorrcEntry] {
        &self.entries
    }

    /// Every key/value pair in file order, duplicates included.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .filter(|entry| !entry.is_comment)
            .filter_map(|entry| Some((entry.key()?, entry.value()?)))
    }

    /// Value of the first entry for `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|entry| entry.matches(key))
            .and_then(TorrcEntry::value)
    }

    /// Values of every entry for `key`, in file order.
    ///
    /// # Errors
    /// Returns [`TorrcError::NoSuchKey`] when the key does not occur at all.
    pub fn get_all(&self, key: &str) -> Result<Vec<&str>, TorrcError> {
        let values: Vec<&str> = self
            .entries
            .iter()
            .filter(|entry| entry.matches(key))
            .filter_map(TorrcEntry::value)
            .collect();

        if values.is_empty() {
            return Err(TorrcError::NoSuchKey(key.to_owned()));
        }
        Ok(values)
    }

    /// Every configured hidden service directory.
    ///
    /// # Errors
    /// Returns [`TorrcError::NoSuchKey`] when no hidden service is configured.
    pub fn hidden_service_dirs(&self) -> Result<Vec<&str>, TorrcError> {
        self.get_all(HIDDEN_SERVICE_DIR)
    }

    /// Updates the first entry for `key` in place, or appends a new entry.
    ///
    /// The rewritten line is always `key + " " + value`; spacing and trailing
    /// comments of the replaced line are not kept. Later duplicates are untouched.
    pub fn set(&mut self, key: &str, value: &str) {
        let entry = TorrcEntry::key_value(key, value);
        match self.entries.iter_mut().find(|existing| existing.matches(key)) {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
    }

    /// Writes every line to `path`, keeping the previous file as `<path>.bak`.
    ///
    /// The backup rename is best effort: a missing previous file or a failed
    /// rename never blocks the write. The write itself is not atomic; a failure
    /// part-way through can leave `path` truncated, with the backup as the
    /// recovery copy.
    ///
    /// # Errors
    /// Returns [`TorrcError::Io`] if the file cannot be created or written.
    pub fn save(&self, path: &Path) -> Result<(), TorrcError> {
        let backup = backup_path(path);
        match std::fs::rename(path, &backup) {
            Ok(()) => debug!(backup = %backup.display(), "backed up previous torrc"),
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => warn!(
                path = %path.display(),
                backup = %backup.display(),
                error = %err,
                "could not back up torrc, saving anyway"
            ),
        }

        let mut writer = BufWriter::new(File::create(path)?);
        for entry in &self.entries {
            writer.write_all(&entry.raw_line)?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;

        debug!(path = %path.display(), entries = self.entries.len(), "saved torrc");
        Ok(())
    }
}

impl fmt::Display for Torrc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.entries {
            writeln!(f, "{}", entry.raw_line)?;
        }
        Ok(())
    }
}

/// `<path>.bak`, appended to the full file name rather than replacing an extension.
#[must_use]
pub fn backup_path(path: &Path) -> PathBuf {
    let mut backup = OsString::from(path.as_os_str());
    backup.push(BACKUP_SUFFIX);
    PathBuf::from(backup)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "## Sample torrc\n\nSocksPort 9050\nLog notice   stdout\nHiddenServiceDir /var/lib/tor/hs1\nHiddenServicePort 80 127.0.0.1:8080\nHiddenServiceDir /var/lib/tor/hs2\n";

    #[test]
    fn classifies_comments_and_blank_lines() {
        let comment = TorrcEntry::parse("  # ControlPort 9051");
        assert!(comment.is_comment());
        assert_eq!(comment.key(), None);
        assert_eq!(comment.value(), None);

        let blank = TorrcEntry::parse(" \t ");
        assert!(blank.is_comment());
        assert_eq!(blank.raw_line(), " \t ");
    }

    #[test]
    fn collapses_whitespace_in_values_but_keeps_raw_line() {
        let entry = TorrcEntry::parse("Log\tnotice    stdout");
        assert!(!entry.is_comment());
        assert_eq!(entry.key(), Some("Log"));
        assert_eq!(entry.value(), Some("notice stdout"));
        assert_eq!(entry.raw_line(), "Log\tnotice    stdout");
    }

    #[test]
    fn single_token_line_has_no_key_but_is_kept() {
        let torrc = Torrc::parse("RunAsDaemon\nSocksPort 9050\n");
        let first = &torrc.entries()[0];
        assert!(!first.is_comment());
        assert_eq!(first.key(), None);
        assert_eq!(first.value(), None);
        assert_eq!(torrc.to_string(), "RunAsDaemon\nSocksPort 9050\n");
    }

    #[test]
    fn set_never_targets_single_token_lines() {
        let mut torrc = Torrc::parse("RunAsDaemon\n");
        torrc.set("RunAsDaemon", "1");
        assert_eq!(torrc.entries().len(), 2);
        assert_eq!(torrc.to_string(), "RunAsDaemon\nRunAsDaemon 1\n");
    }

    #[test]
    fn get_returns_first_match_and_skips_comments() {
        let torrc = Torrc::parse("#SocksPort 1\nSocksPort 9050\nSocksPort 9150\n");
        assert_eq!(torrc.get("SocksPort"), Some("9050"));
        assert_eq!(torrc.get("ControlPort"), None);
    }

    #[test]
    fn get_all_returns_every_match_in_order() {
        let torrc = Torrc::parse(SAMPLE);
        assert_eq!(
            torrc.hidden_service_dirs().unwrap(),
            vec!["/var/lib/tor/hs1", "/var/lib/tor/hs2"]
        );
    }

    #[test]
    fn get_all_without_matches_is_no_such_key() {
        let torrc = Torrc::parse("SocksPort 9050\n# HiddenServiceDir /var/lib/tor/old\n");
        let err = torrc.hidden_service_dirs().unwrap_err();
        assert!(matches!(err, TorrcError::NoSuchKey(ref key) if key == HIDDEN_SERVICE_DIR));
    }

    #[test]
    fn set_updates_first_match_in_place() {
        let mut torrc = Torrc::parse("SocksPort 9050\nLog notice stdout\nSocksPort 9150\n");
        torrc.set("SocksPort", "9999");

        let lines: Vec<&BStr> = torrc.entries().iter().map(TorrcEntry::raw_line).collect();
        assert_eq!(lines, vec!["SocksPort 9999", "Log notice stdout", "SocksPort 9150"]);
        assert_eq!(torrc.get("SocksPort"), Some("9999"));
    }

    #[test]
    fn set_appends_unknown_keys_at_the_end() {
        let mut torrc = Torrc::parse(SAMPLE);
        let before = torrc.entries().len();
        torrc.set("ExitRelay", "0");

        assert_eq!(torrc.entries().len(), before + 1);
        assert_eq!(torrc.entries().last().unwrap().raw_line(), "ExitRelay 0");
    }

    #[test]
    fn set_is_idempotent() {
        let mut once = Torrc::parse(SAMPLE);
        once.set("ControlPort", "9051");
        let mut twice = once.clone();
        twice.set("ControlPort", "9051");
        assert_eq!(once, twice);
    }

    #[test]
    fn set_drops_trailing_comment_of_rewritten_line() {
        let mut torrc = Torrc::parse("SocksPort 9050 # local only\n");
        torrc.set("SocksPort", "9150");
        assert_eq!(torrc.to_string(), "SocksPort 9150\n");
    }

    #[test]
    fn display_reproduces_newline_terminated_input() {
        let torrc = Torrc::parse(SAMPLE);
        assert_eq!(torrc.to_string(), SAMPLE);
    }

    #[test]
    fn pairs_lists_key_values_with_duplicates() {
        let torrc = Torrc::parse(SAMPLE);
        let keys: Vec<&str> = torrc.pairs().map(|(key, _)| key).collect();
        assert_eq!(
            keys,
            vec![
                "SocksPort",
                "Log",
                "HiddenServiceDir",
                "HiddenServicePort",
                "HiddenServiceDir"
            ]
        );
    }

    #[test]
    fn invalid_utf8_lines_are_kept_as_bytes() {
        let torrc = Torrc::parse_bytes(b"# Caf\xe9 relay\nNickname caf\xe9\nSocksPort 9050\n");

        assert!(torrc.entries()[0].is_comment());
        assert_eq!(torrc.entries()[0].raw_line(), &b"# Caf\xe9 relay"[..]);
        assert_eq!(torrc.get("Nickname"), Some("caf\u{fffd}"));
        assert_eq!(torrc.get("SocksPort"), Some("9050"));
    }

    #[test]
    fn crlf_line_endings_are_stripped() {
        let torrc = Torrc::parse_bytes(b"SocksPort 9050\r\nLog notice stdout\r\n");
        assert_eq!(torrc.get("SocksPort"), Some("9050"));
        assert_eq!(torrc.entries()[1].raw_line(), "Log notice stdout");
    }

    #[test]
    fn backup_path_appends_suffix() {
        assert_eq!(
            backup_path(Path::new("/etc/tor/torrc")),
            PathBuf::from("/etc/tor/torrc.bak")
        );
        assert_eq!(
            backup_path(Path::new("torrc.conf")),
            PathBuf::from("torrc.conf.bak")
        );
    }
}
