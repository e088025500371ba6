//! Plain-text rendering of a digest for stdout.

use std::fmt::Write;

use crate::models::Digest;

pub fn render_digest(digest: &Digest) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} news digest, {} {} ({} edition)",
        digest.display_name, digest.local_date, digest.local_time, digest.edition
    );

    if digest.entries.is_empty() {
        let _ = writeln!(out, "\nNo stories were summarized.");
        return out;
    }

    for (i, entry) in digest.entries.iter().enumerate() {
        let _ = writeln!(out, "\n{}. {}", i + 1, entry.title);
        if !entry.link.is_empty() {
            let _ = writeln!(out, "   {}", entry.link);
        }
        let _ = writeln!(out, "   [{} via {}]", entry.source_name, entry.provider);
        for line in entry.summary.lines() {
            let _ = writeln!(out, "   {line}");
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DigestEntry, ProviderKind, ProviderRole};

    #[test]
    fn test_render_entries() {
        let digest = Digest {
            display_name: "Apple".into(),
            local_date: "2025-11-05".into(),
            local_time: "07:00:00".into(),
            edition: "morning".into(),
            entries: vec![DigestEntry {
                title: "M5 MacBook Pro".into(),
                link: "https://macrumors.com/m5".into(),
                source_name: "MacRumors".into(),
                published: None,
                summary: "Line one\nLine two".into(),
                provider: ProviderKind::Gemini,
                role: ProviderRole::Primary,
            }],
        };
        let text = render_digest(&digest);
        assert!(text.starts_with("Apple news digest, 2025-11-05 07:00:00 (morning edition)\n"));
        assert!(text.contains("\n1. M5 MacBook Pro\n   https://macrumors.com/m5\n   [MacRumors via gemini]\n   Line one\n   Line two\n"));
    }

    #[test]
    fn test_render_empty() {
        let digest = Digest {
            display_name: "Apple".into(),
            local_date: "2025-11-05".into(),
            local_time: "07:00:00".into(),
            edition: "morning".into(),
            entries: Vec::new(),
        };
        assert!(render_digest(&digest).contains("No stories were summarized."));
    }
}
