//! Classification of a response status code against per-method whitelists.

use indexmap::IndexMap;

/// Outcome of classifying a status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseClass {
    /// Neither whitelisted for the method nor 2xx.
    Fail = 0,
    /// Whitelisted for the request method.
    SuccessMethod = 1,
    /// Not whitelisted, but in the 2xx range.
    Success2xx = 2,
}

impl ResponseClass {
    pub fn is_success(self) -> bool {
        self != ResponseClass::Fail
    }
}

/// Acceptable status codes per HTTP method.
///
/// One whitelist lives for a whole step invocation, so extending it (see
/// [`StatusWhitelist::extend_get_with_404`]) affects every later
/// classification in that invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusWhitelist {
    codes: IndexMap<&'static str, Vec<u16>>,
}

impl Default for StatusWhitelist {
    fn default() -> Self {
        let mut codes = IndexMap::new();
        codes.insert("GET", vec![200, 204]);
        codes.insert("POST", vec![200, 201, 202]);
        codes.insert("PUT", vec![200, 202]);
        codes.insert("PATCH", vec![200, 202]);
        codes.insert("DELETE", vec![200, 202, 204]);
        Self { codes }
    }
}

impl StatusWhitelist {
    /// Accept 404 for GET (e.g. polling until a resource is gone). Idempotent.
    pub fn extend_get_with_404(&mut self) {
        if let Some(get) = self.codes.get_mut("GET") {
            if !get.contains(&404) {
                get.push(404);
            }
        }
    }

    pub fn codes_for(&self, method: &str) -> Option<&[u16]> {
        self.codes.get(method).map(Vec::as_slice)
    }

    /// Classify `status` for `method`. Method names are matched exactly
    /// (upper case); unknown methods only get the 2xx fallback.
    pub fn classify(&self, method: &str, status: u16) -> ResponseClass {
        if self
            .codes_for(method)
            .is_some_and(|codes| codes.contains(&status))
        {
            return ResponseClass::SuccessMethod;
        }
        if (200..300).contains(&status) {
            return ResponseClass::Success2xx;
        }
        ResponseClass::Fail
    }
}

/// Ledger label for the status-code check of `method`.
pub fn status_test_name(method: &str) -> String {
    format!("[{method} Response Code]=")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whitelisted_codes_succeed_by_method() {
        let table = StatusWhitelist::default();
        assert_eq!(table.classify("GET", 200), ResponseClass::SuccessMethod);
        assert_eq!(table.classify("POST", 201), ResponseClass::SuccessMethod);
        assert_eq!(table.classify("DELETE", 204), ResponseClass::SuccessMethod);
    }

    #[test]
    fn other_2xx_codes_fall_back() {
        let table = StatusWhitelist::default();
        assert_eq!(table.classify("PUT", 201), ResponseClass::Success2xx);
        assert_eq!(table.classify("HEAD", 200), ResponseClass::Success2xx);
    }

    #[test]
    fn non_2xx_codes_fail() {
        let table = StatusWhitelist::default();
        assert_eq!(table.classify("GET", 404), ResponseClass::Fail);
        assert_eq!(table.classify("POST", 500), ResponseClass::Fail);
        assert_eq!(table.classify("GET", 302), ResponseClass::Fail);
    }

    #[test]
    fn extending_get_with_404_is_idempotent() {
        let mut table = StatusWhitelist::default();
        table.extend_get_with_404();
        table.extend_get_with_404();
        assert_eq!(table.codes_for("GET"), Some(&[200, 204, 404][..]));
        assert_eq!(table.classify("GET", 404), ResponseClass::SuccessMethod);
        assert_eq!(table.classify("DELETE", 404), ResponseClass::Fail);
    }

    #[test]
    fn classification_is_deterministic() {
        let table = StatusWhitelist::default();
        for _ in 0..3 {
            assert_eq!(table.classify("PATCH", 202), ResponseClass::SuccessMethod);
        }
    }
}
