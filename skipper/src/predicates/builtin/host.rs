//! `Host`/`HostRegex` - spec.md §4.2 criterion 3 ("host-exact >
//! host-regex > no host constraint").

use regex::Regex;

use crate::route::predicate::{Facet, HostSpecificity};
use crate::route::{Predicate, PredicateError, PredicateSpec, RequestInfo, Value};

fn request_host<'a>(req: &RequestInfo<'a>) -> Option<&'a str> {
    req.headers
        .get(http::header::HOST)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(':').next().unwrap_or(v))
}

pub struct Host {
    host: String,
}

impl Predicate for Host {
    fn matches(&self, req: &RequestInfo<'_>) -> bool {
        request_host(req).is_some_and(|h| h.eq_ignore_ascii_case(&self.host))
    }

    fn facet(&self) -> Facet {
        Facet::Host(HostSpecificity::Exact)
    }
}

pub struct HostSpec;
impl PredicateSpec for HostSpec {
    fn name(&self) -> &str {
        "Host"
    }

    fn create(&self, args: &[Value]) -> Result<Box<dyn Predicate>, PredicateError> {
        match args {
            [Value::Str(host)] => Ok(Box::new(Host { host: host.clone() })),
            _ => Err(PredicateError::Arity {
                name: "Host".to_string(),
                expected: "1 string argument",
                got: args.len(),
            }),
        }
    }
}

pub struct HostRegex {
    regex: Regex,
}

impl Predicate for HostRegex {
    fn matches(&self, req: &RequestInfo<'_>) -> bool {
        request_host(req).is_some_and(|h| self.regex.is_match(h))
    }

    fn facet(&self) -> Facet {
        Facet::Host(HostSpecificity::Regex)
    }
}

pub struct HostRegexSpec;
impl PredicateSpec for HostRegexSpec {
    fn name(&self) -> &str {
        "HostRegex"
    }

    fn create(&self, args: &[Value]) -> Result<Box<dyn Predicate>, PredicateError> {
        match args {
            [Value::Str(pattern)] => {
                let regex = Regex::new(pattern).map_err(|e| PredicateError::InvalidArgument {
                    name: "HostRegex".to_string(),
                    index: 0,
                    reason: e.to_string(),
                })?;
                Ok(Box::new(HostRegex { regex }))
            }
            _ => Err(PredicateError::Arity {
                name: "HostRegex".to_string(),
                expected: "1 string argument",
                got: args.len(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info_with_host<'a>(
        uri: &'a http::Uri,
        headers: &'a http::HeaderMap,
    ) -> RequestInfo<'a> {
        RequestInfo {
            method: &http::Method::GET,
            uri,
            headers,
            client_addr: None,
        }
    }

    #[test]
    fn host_matches_case_insensitively_and_ignores_port() {
        let p = HostSpec.create(&[Value::from("example.com")]).unwrap();
        let uri: http::Uri = "/".parse().unwrap();
        let mut headers = http::HeaderMap::new();
        headers.insert(http::header::HOST, "EXAMPLE.com:8080".parse().unwrap());
        assert!(p.matches(&info_with_host(&uri, &headers)));
    }

    #[test]
    fn host_regex_matches_subdomains() {
        let p = HostRegexSpec.create(&[Value::from("^.*\\.example\\.com$")]).unwrap();
        let uri: http::Uri = "/".parse().unwrap();
        let mut headers = http::HeaderMap::new();
        headers.insert(http::header::HOST, "api.example.com".parse().unwrap());
        assert!(p.matches(&info_with_host(&uri, &headers)));
    }
}
