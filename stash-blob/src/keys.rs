use uuid::Uuid;

/// Strategy for generating blob storage keys
pub trait KeyStrategy: Send + Sync {
    /// Generate a key for an uploaded file
    fn object_key(&self, uploaded_by: &str, filename: &str) -> String;
}

/// Default key strategy: `user/uuid-filename`
///
/// The uuid prefix keeps keys globally unique even when one user
/// uploads the same filename twice.
#[derive(Debug, Clone)]
pub struct DefaultKeyStrategy;

impl KeyStrategy for DefaultKeyStrategy {
    fn object_key(&self, uploaded_by: &str, filename: &str) -> String {
        format!(
            "{}/{}-{}",
            uploaded_by,
            Uuid::new_v4().simple(),
            sanitize_filename(filename)
        )
    }
}

/// Keep keys URL- and path-safe regardless of the original filename.
fn sanitize_filename(filename: &str) -> String {
    filename
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '-'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_replaces_unsafe_characters() {
        assert_eq!(sanitize_filename("héllo wörld.png"), "h-llo-w-rld.png");
        assert_eq!(sanitize_filename("../../etc/passwd"), "..-..-etc-passwd");
        assert_eq!(sanitize_filename("report_v2.pdf"), "report_v2.pdf");
    }

    #[test]
    fn object_keys_are_unique_per_call() {
        let strategy = DefaultKeyStrategy;
        let a = strategy.object_key("u1", "a.png");
        let b = strategy.object_key("u1", "a.png");

        assert!(a.starts_with("u1/"));
        assert!(a.ends_with("a.png"));
        assert_ne!(a, b);
    }
}
