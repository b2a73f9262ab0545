use std::sync::atomic::{AtomicI64, Ordering};

/// Object keys of the form `<unix-nanos><ext>`.
///
/// Timestamps handed out by one generator are strictly increasing, so two
/// uploads landing in the same clock tick still get distinct keys.
#[derive(Debug, Default)]
pub struct KeyGenerator {
    last: AtomicI64,
}

impl KeyGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Key for an upload whose client-side name was `filename`
    pub fn next_key(&self, filename: &str) -> String {
        format!("{}{}", self.next_timestamp(), file_extension(filename))
    }

    fn next_timestamp(&self) -> i64 {
        let now = chrono::Utc::now().timestamp_nanos_opt().unwrap_or(i64::MAX);
        match self
            .last
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| Some(now.max(last.saturating_add(1))))
        {
            Ok(prev) | Err(prev) => now.max(prev.saturating_add(1)),
        }
    }
}

/// Extension of the last path element, dot included. Empty when there is none.
pub fn file_extension(filename: &str) -> &str {
    let name_start = filename.rfind('/').map(|i| i + 1).unwrap_or(0);
    match filename[name_start..].rfind('.') {
        Some(dot) => &filename[name_start + dot..],
        None => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn test_file_extension() {
        assert_eq!(file_extension("cat.png"), ".png");
        assert_eq!(file_extension("archive.tar.gz"), ".gz");
        assert_eq!(file_extension("PHOTO.JPG"), ".JPG");
        assert_eq!(file_extension("README"), "");
        assert_eq!(file_extension(""), "");
        assert_eq!(file_extension("trailing."), ".");
        assert_eq!(file_extension("dir.d/noext"), "");
        assert_eq!(file_extension("dir/.hidden"), ".hidden");
    }

    #[test]
    fn test_key_shape() {
        let key = KeyGenerator::new().next_key("holiday.jpeg");
        let (stamp, ext) = key.split_at(key.len() - ".jpeg".len());
        assert_eq!(ext, ".jpeg");
        assert!(stamp.parse::<i64>().unwrap() > 0);
    }

    #[test]
    fn test_keys_are_unique_across_threads() {
        let keys = Arc::new(KeyGenerator::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let keys = Arc::clone(&keys);
                std::thread::spawn(move || (0..500).map(|_| keys.next_key("a.png")).collect::<Vec<_>>())
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for key in handle.join().unwrap() {
                assert!(seen.insert(key));
            }
        }
        assert_eq!(seen.len(), 2000);
    }
}
