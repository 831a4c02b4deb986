/// One lazily-resolved per-file field.
///
/// Fields only move forward: `Unresolved` → `InProgress` → `Resolved` or
/// `Failed`. A failed field is terminal; nothing is retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileResult<T> {
    Unresolved,
    InProgress,
    Failed(String),
    Resolved(T),
}

impl<T> FileResult<T> {
    pub fn is_resolved(&self) -> bool {
        matches!(self, FileResult::Resolved(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, FileResult::Failed(_))
    }

    pub fn resolved(&self) -> Option<&T> {
        match self {
            FileResult::Resolved(value) => Some(value),
            _ => None,
        }
    }
}

/// Visual grouping token shared by records currently believed to be exact
/// duplicates of one another. Presentation only; carries no meaning for
/// ordering or counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupTag {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

/// One filesystem entry in the index.
///
/// The canonical path is the record's identity and the final ordering
/// tie-breaker. The three resolvable fields are mutated only by the
/// coordinating thread, and only while the record is outside the ordered
/// structure.
#[derive(Debug, Clone)]
pub struct Entry {
    pub(crate) id: u64,
    pub path: String,
    pub size: FileResult<u64>,
    pub partial_checksum: FileResult<u32>,
    pub full_checksum: FileResult<u32>,
    pub group_tag: GroupTag,
}

impl Entry {
    pub(crate) fn new(id: u64, path: String, group_tag: GroupTag) -> Self {
        Self {
            id,
            path,
            size: FileResult::Unresolved,
            partial_checksum: FileResult::Unresolved,
            full_checksum: FileResult::Unresolved,
            group_tag,
        }
    }

    /// Human-readable size with the raw byte count, e.g. `1.50KB (1536)`.
    pub fn size_display(&self) -> String {
        match &self.size {
            FileResult::Unresolved => "-".to_string(),
            FileResult::InProgress => "...".to_string(),
            FileResult::Failed(_) => "!".to_string(),
            FileResult::Resolved(n) => format_size(*n),
        }
    }

    pub fn partial_checksum_display(&self) -> String {
        checksum_display(&self.partial_checksum)
    }

    pub fn full_checksum_display(&self) -> String {
        checksum_display(&self.full_checksum)
    }
}

fn checksum_display(result: &FileResult<u32>) -> String {
    match result {
        FileResult::Unresolved => "-".to_string(),
        FileResult::InProgress => "...".to_string(),
        FileResult::Failed(_) => "!".to_string(),
        FileResult::Resolved(value) => format!("{value:08X}"),
    }
}

fn format_size(n: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * KB;
    const GB: u64 = 1024 * MB;

    if n < KB {
        format!("{n}B ({n})")
    } else if n < MB {
        format!("{:.2}KB ({n})", n as f64 / KB as f64)
    } else if n < GB {
        format!("{:.2}MB ({n})", n as f64 / MB as f64)
    } else {
        format!("{:.2}GB ({n})", n as f64 / GB as f64)
    }
}

/// Two records are definitely equal iff both full checksums are resolved
/// and numerically equal. Matching sizes or partial checksums alone only
/// make a candidate duplicate.
pub fn is_definitely_equal(lhs: &Entry, rhs: &Entry) -> bool {
    matches!(
        (&lhs.full_checksum, &rhs.full_checksum),
        (FileResult::Resolved(a), FileResult::Resolved(b)) if a == b
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> Entry {
        Entry::new(0, "/tmp/a".to_string(), GroupTag { r: 0, g: 0, b: 0 })
    }

    #[test]
    fn test_size_display_states() {
        let mut e = entry();
        assert_eq!(e.size_display(), "-");
        e.size = FileResult::InProgress;
        assert_eq!(e.size_display(), "...");
        e.size = FileResult::Failed("nope".to_string());
        assert_eq!(e.size_display(), "!");
        e.size = FileResult::Resolved(4);
        assert_eq!(e.size_display(), "4B (4)");
        e.size = FileResult::Resolved(1536);
        assert_eq!(e.size_display(), "1.50KB (1536)");
        e.size = FileResult::Resolved(2 * 1024 * 1024);
        assert_eq!(e.size_display(), "2.00MB (2097152)");
    }

    #[test]
    fn test_checksum_display_is_uppercase_hex() {
        let mut e = entry();
        e.full_checksum = FileResult::Resolved(0xCBF43926);
        assert_eq!(e.full_checksum_display(), "CBF43926");
        e.partial_checksum = FileResult::Resolved(0xAB);
        assert_eq!(e.partial_checksum_display(), "000000AB");
    }

    #[test]
    fn test_definitely_equal_requires_resolved_full_checksums() {
        let mut a = entry();
        let mut b = entry();
        b.path = "/tmp/b".to_string();

        assert!(!is_definitely_equal(&a, &b));

        a.size = FileResult::Resolved(4);
        b.size = FileResult::Resolved(4);
        a.partial_checksum = FileResult::Resolved(7);
        b.partial_checksum = FileResult::Resolved(7);
        // candidate only — full checksums still pending
        assert!(!is_definitely_equal(&a, &b));

        a.full_checksum = FileResult::Resolved(7);
        b.full_checksum = FileResult::InProgress;
        assert!(!is_definitely_equal(&a, &b));

        b.full_checksum = FileResult::Resolved(7);
        assert!(is_definitely_equal(&a, &b));

        b.full_checksum = FileResult::Resolved(8);
        assert!(!is_definitely_equal(&a, &b));
    }
}
