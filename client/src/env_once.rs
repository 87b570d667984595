use once_cell::sync::OnceCell;
use std::fmt;

type Lookup = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Looks up an environment variable, optionally under several names, at
/// most once. Later calls return the cached value.
pub struct EnvOnce {
    names: Vec<String>,
    lookup: Lookup,
    val: OnceCell<String>,
}

impl EnvOnce {
    pub fn new<S: AsRef<str>>(names: &[S]) -> Self {
        Self::with_lookup(names, |name| {
            std::env::var_os(name).map(|v| v.to_string_lossy().into_owned())
        })
    }

    /// Same as [`EnvOnce::new`] but reads values through `lookup` instead
    /// of the process environment.
    pub fn with_lookup<S, F>(names: &[S], lookup: F) -> Self
    where
        S: AsRef<str>,
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        Self {
            names: names.iter().map(|n| n.as_ref().to_owned()).collect(),
            lookup: Box::new(lookup),
            val: OnceCell::new(),
        }
    }

    /// First non-empty value among the configured names, or `""`.
    pub fn get(&self) -> &str {
        self.val.get_or_init(|| self.init())
    }

    fn init(&self) -> String {
        for name in &self.names {
            if let Some(val) = (self.lookup)(name) {
                if !val.is_empty() {
                    log::debug!("using {name} from environment");
                    return val;
                }
            }
        }
        String::new()
    }

    #[cfg(test)]
    pub(crate) fn reset(&mut self) {
        self.val = OnceCell::new();
    }
}

impl fmt::Debug for EnvOnce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvOnce")
            .field("names", &self.names)
            .field("resolved", &self.val.get().is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Barrier};

    fn fixed(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> + Send + Sync + 'static {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| vars.get(name).cloned()
    }

    #[test]
    fn first_non_empty_wins() {
        let env = EnvOnce::with_lookup(
            &["ALL_PROXY", "all_proxy"],
            fixed(&[("ALL_PROXY", ""), ("all_proxy", "socks5://lower")]),
        );
        assert_eq!(env.get(), "socks5://lower");

        let env = EnvOnce::with_lookup(
            &["ALL_PROXY", "all_proxy"],
            fixed(&[("ALL_PROXY", "socks5://upper"), ("all_proxy", "socks5://lower")]),
        );
        assert_eq!(env.get(), "socks5://upper");
    }

    #[test]
    fn unset_is_empty() {
        let env = EnvOnce::with_lookup(&["ALL_PROXY", "all_proxy"], fixed(&[]));
        assert_eq!(env.get(), "");
    }

    #[test]
    fn value_is_cached_until_reset() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let mut env = EnvOnce::with_lookup(&["ALL_PROXY"], move |_| {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            Some(format!("socks5://proxy{n}"))
        });

        assert_eq!(env.get(), "socks5://proxy0");
        assert_eq!(env.get(), "socks5://proxy0");
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        env.reset();
        assert_eq!(env.get(), "socks5://proxy1");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn concurrent_first_access_scans_once() {
        const THREADS: usize = 16;

        let scans = Arc::new(AtomicUsize::new(0));
        let counter = scans.clone();
        let env = EnvOnce::with_lookup(&["ALL_PROXY", "all_proxy"], move |name| {
            if name == "ALL_PROXY" {
                counter.fetch_add(1, Ordering::SeqCst);
                std::thread::sleep(std::time::Duration::from_millis(20));
            }
            (name == "all_proxy").then(|| "socks5://127.0.0.1:1080".to_string())
        });
        let barrier = Barrier::new(THREADS);

        let seen: Vec<String> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..THREADS)
                .map(|_| {
                    s.spawn(|| {
                        barrier.wait();
                        env.get().to_string()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(scans.load(Ordering::SeqCst), 1);
        assert!(seen.iter().all(|v| v == "socks5://127.0.0.1:1080"));
    }
}
