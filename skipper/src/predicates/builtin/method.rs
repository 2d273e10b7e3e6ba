//! `Method("POST")` - spec.md §4.2 criterion 4.

use crate::route::predicate::Facet;
use crate::route::{Predicate, PredicateError, PredicateSpec, RequestInfo, Value};

pub struct Method {
    method: http::Method,
}

impl Predicate for Method {
    fn matches(&self, req: &RequestInfo<'_>) -> bool {
        req.method == self.method
    }

    fn facet(&self) -> Facet {
        Facet::Method
    }
}

pub struct MethodSpec;
impl PredicateSpec for MethodSpec {
    fn name(&self) -> &str {
        "Method"
    }

    fn create(&self, args: &[Value]) -> Result<Box<dyn Predicate>, PredicateError> {
        match args {
            [Value::Str(name)] => {
                let method = http::Method::from_bytes(name.as_bytes()).map_err(|_| PredicateError::InvalidArgument {
                    name: "Method".to_string(),
                    index: 0,
                    reason: format!("{name:?} is not a valid HTTP method"),
                })?;
                Ok(Box::new(Method { method }))
            }
            _ => Err(PredicateError::Arity {
                name: "Method".to_string(),
                expected: "1 string argument",
                got: args.len(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_matches_by_name() {
        let p = MethodSpec.create(&[Value::from("POST")]).unwrap();
        let uri: http::Uri = "/".parse().unwrap();
        let headers = http::HeaderMap::new();
        let req = RequestInfo {
            method: &http::Method::POST,
            uri: &uri,
            headers: &headers,
            client_addr: None,
        };
        assert!(p.matches(&req));

        let req_get = RequestInfo {
            method: &http::Method::GET,
            ..req
        };
        assert!(!p.matches(&req_get));
    }
}
