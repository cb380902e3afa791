/// The recorded result of fetching one target. "Has no data" and "could
/// not be fetched" are kept distinct so downstream joins never have to
/// guess which one an absent value means.
#[derive(Debug)]
pub enum Outcome<P> {
    /// The fetch succeeded and returned data.
    Success(P),
    /// The fetch succeeded and the target verifiably has nothing.
    Empty,
    /// The fetch gave up. `code` is the HTTP status when one was seen,
    /// 0 otherwise.
    Failed { code: u16 },
}

impl<P> Outcome<P> {
    pub fn status(&self) -> &'static str {
        match self {
            Self::Success(_) => "ok",
            Self::Empty => "empty",
            Self::Failed { .. } => "error",
        }
    }

    pub fn error_code(&self) -> u16 {
        match self {
            Self::Failed { code } => *code,
            _ => 0,
        }
    }

    /// A 401 means the credential is dead, not the target.
    pub fn credential_dead(&self) -> bool {
        matches!(self, Self::Failed { code: 401 })
    }
}

impl<T> Outcome<Vec<T>> {
    /// Classify a finished list fetch, mapping a zero-item success to
    /// Empty.
    pub fn from_list(result: Result<Vec<T>, u16>) -> Self {
        match result {
            Ok(items) if items.is_empty() => Self::Empty,
            Ok(items) => Self::Success(items),
            Err(code) => Self::Failed { code },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_and_failed_are_distinct() {
        let empty = Outcome::<Vec<u32>>::from_list(Ok(vec![]));
        let failed = Outcome::<Vec<u32>>::from_list(Err(503));
        assert_eq!(empty.status(), "empty");
        assert_eq!(failed.status(), "error");
        assert_eq!(empty.error_code(), 0);
        assert_eq!(failed.error_code(), 503);
    }

    #[test]
    fn success_keeps_items() {
        let outcome = Outcome::from_list(Ok(vec![1, 2, 3]));
        assert_eq!(outcome.status(), "ok");
        match outcome {
            Outcome::Success(items) => assert_eq!(items, vec![1, 2, 3]),
            _ => panic!("expected success"),
        }
    }

    #[test]
    fn only_401_marks_the_credential_dead() {
        assert!(Outcome::<Vec<u32>>::Failed { code: 401 }.credential_dead());
        assert!(!Outcome::<Vec<u32>>::Failed { code: 403 }.credential_dead());
        assert!(!Outcome::<Vec<u32>>::Empty.credential_dead());
    }
}
